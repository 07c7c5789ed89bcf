//! Chrysalis: metadata-driven transformation between plain data and typed
//! instances.
//!
//! Classes are described once in a [`MetadataStorage`] (which properties to
//! expose or exclude, their types, custom transform functions) and the
//! [`ClassTransformer`] walks value graphs in one of three directions:
//! plain→class, class→plain and class→class.

mod class;
mod describe;
mod executor;
mod json;
mod metadata;
mod options;
mod storage;
mod transformer;
mod value;

pub use class::{ClassDef, ClassId, ComputedProperty, Getter, Initializer, Setter};
pub use describe::ClassBuilder;
pub use executor::TransformOperationExecutor;
pub use json::JsonError;
pub use metadata::{
    Direction, DirectionFlags, Discriminator, DiscriminatorSubType, ExcludeMetadata,
    ExcludeOptions, ExposeMetadata, ExposeOptions, MetadataRecord, TransformFn,
    TransformFnOptions, TransformFnParams, TransformMetadata, TransformStep, TypeFn,
    TypeHelpOptions, TypeMetadata, TypeOptions, TypeRef,
};
pub use options::{OptionsError, Strategy, TargetMap, TransformOptions};
pub use storage::{MetadataError, MetadataStorage, default_metadata_storage};
pub use transformer::{
    ClassTransformer, SerializeError, deserialize, deserialize_array, instance_to_instance,
    instance_to_instance_from_exist, instance_to_plain, instance_to_plain_from_exist,
    plain_to_instance, plain_to_instance_from_exist, serialize,
};
pub use value::{Object, ObjectRef, Value};
