//! Class registration builder.
//!
//! Collects everything known about one class (its descriptor and its
//! metadata records) and stores it in one go:
//!
//! ```ignore
//! storage
//!     .describe("User")
//!     .exclude("password")
//!     .type_of("photos", "Photo")
//!     .hint("photos", TypeRef::Array)
//!     .register()?;
//! ```

use crate::class::{ClassDef, ClassId, ComputedProperty};
use crate::metadata::{
    Direction, ExcludeMetadata, ExcludeOptions, ExposeMetadata, ExposeOptions, MetadataRecord,
    TransformFnOptions,
    TransformFnParams, TransformMetadata, TransformStep, TypeFn, TypeHelpOptions, TypeMetadata,
    TypeOptions, TypeRef,
};
use crate::storage::{MetadataError, MetadataStorage};
use crate::value::{Object, Value};
use indexmap::IndexMap;
use std::sync::Arc;

struct PendingType {
    type_fn: Option<TypeFn>,
    options: TypeOptions,
}

/// Builder returned by [`MetadataStorage::describe`].
pub struct ClassBuilder<'s> {
    storage: &'s mut MetadataStorage,
    def: ClassDef,
    exposes: Vec<ExposeMetadata>,
    excludes: Vec<ExcludeMetadata>,
    types: IndexMap<String, Vec<PendingType>>,
    transforms: IndexMap<String, Vec<TransformStep>>,
}

impl<'s> ClassBuilder<'s> {
    pub(crate) fn new(storage: &'s mut MetadataStorage, class: ClassId) -> Self {
        Self {
            storage,
            def: ClassDef::new(class),
            exposes: Vec::new(),
            excludes: Vec::new(),
            types: IndexMap::new(),
            transforms: IndexMap::new(),
        }
    }

    fn id(&self) -> ClassId {
        self.def.id().clone()
    }

    pub fn extends(mut self, parent: impl Into<ClassId>) -> Self {
        self.def.set_parent(parent);
        self
    }

    /// Class-level Expose: every own key is included unless excluded.
    pub fn expose_all(mut self) -> Self {
        self.exposes.push(ExposeMetadata {
            target: self.id(),
            property_name: None,
            options: ExposeOptions::new(),
        });
        self
    }

    /// Class-level Exclude: only exposed properties are included.
    pub fn exclude_all(mut self) -> Self {
        self.excludes.push(ExcludeMetadata {
            target: self.id(),
            property_name: None,
            options: ExcludeOptions::new(),
        });
        self
    }

    pub fn expose(self, property: impl Into<String>) -> Self {
        self.expose_with(property, ExposeOptions::new())
    }

    /// Expose a property. Repeated calls stack.
    pub fn expose_with(mut self, property: impl Into<String>, options: ExposeOptions) -> Self {
        self.exposes.push(ExposeMetadata {
            target: self.id(),
            property_name: Some(property.into()),
            options,
        });
        self
    }

    pub fn exclude(self, property: impl Into<String>) -> Self {
        self.exclude_with(property, ExcludeOptions::new())
    }

    pub fn exclude_with(mut self, property: impl Into<String>, options: ExcludeOptions) -> Self {
        self.excludes.push(ExcludeMetadata {
            target: self.id(),
            property_name: Some(property.into()),
            options,
        });
        self
    }

    /// Use `name` as the external name of `property`, in `direction` only.
    ///
    /// Plain→class and class→class share the "to class" flag, so either of
    /// them aliases both.
    pub fn alias(
        self,
        property: impl Into<String>,
        name: impl Into<String>,
        direction: Direction,
    ) -> Self {
        let options = ExposeOptions::new().name(name);
        let options = match direction {
            Direction::ClassToPlain => options.to_plain_only(),
            Direction::PlainToClass | Direction::ClassToClass => options.to_class_only(),
        };
        self.expose_with(property, options)
    }

    /// Declare the type of a property.
    pub fn type_of(self, property: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        self.type_with(property, ty, TypeOptions::new())
    }

    pub fn type_with(
        mut self,
        property: impl Into<String>,
        ty: impl Into<TypeRef>,
        options: TypeOptions,
    ) -> Self {
        let ty = ty.into();
        self.types
            .entry(property.into())
            .or_default()
            .push(PendingType {
                type_fn: Some(Arc::new(move |_: &TypeHelpOptions<'_>| ty.clone())),
                options,
            });
        self
    }

    /// Declare the type of a property as a function of the data around it.
    pub fn type_fn<F>(mut self, property: impl Into<String>, type_fn: F) -> Self
    where
        F: Fn(&TypeHelpOptions<'_>) -> TypeRef + Send + Sync + 'static,
    {
        self.types
            .entry(property.into())
            .or_default()
            .push(PendingType {
                type_fn: Some(Arc::new(type_fn)),
                options: TypeOptions::new(),
            });
        self
    }

    /// Declare a discriminated union. The reflected type (from [`hint`]) is
    /// the fallback for data without a known marker.
    ///
    /// [`hint`]: ClassBuilder::hint
    pub fn discriminated(mut self, property: impl Into<String>, options: TypeOptions) -> Self {
        self.types
            .entry(property.into())
            .or_default()
            .push(PendingType {
                type_fn: None,
                options,
            });
        self
    }

    /// Design-time type of a property.
    pub fn hint(mut self, property: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        self.def.add_hint(property, ty.into());
        self
    }

    /// Add a transform function. Functions of one property run in the order
    /// they are added.
    pub fn transform<F>(self, property: impl Into<String>, func: F) -> Self
    where
        F: Fn(TransformFnParams<'_>) -> Value + Send + Sync + 'static,
    {
        self.transform_with(property, func, TransformFnOptions::new())
    }

    pub fn transform_with<F>(
        mut self,
        property: impl Into<String>,
        func: F,
        options: TransformFnOptions,
    ) -> Self
    where
        F: Fn(TransformFnParams<'_>) -> Value + Send + Sync + 'static,
    {
        self.transforms
            .entry(property.into())
            .or_default()
            .push(TransformStep {
                func: Arc::new(func),
                options,
            });
        self
    }

    /// A read-only derived property.
    pub fn computed<G>(mut self, property: impl Into<String>, getter: G) -> Self
    where
        G: Fn(&Object) -> Value + Send + Sync + 'static,
    {
        self.def.add_computed(
            property,
            ComputedProperty {
                getter: Arc::new(getter),
                setter: None,
            },
        );
        self
    }

    pub fn computed_with_setter<G, S>(
        mut self,
        property: impl Into<String>,
        getter: G,
        setter: S,
    ) -> Self
    where
        G: Fn(&Object) -> Value + Send + Sync + 'static,
        S: Fn(&mut Object, Value) + Send + Sync + 'static,
    {
        self.def.add_computed(
            property,
            ComputedProperty {
                getter: Arc::new(getter),
                setter: Some(Arc::new(setter)),
            },
        );
        self
    }

    pub fn method(mut self, name: impl Into<String>) -> Self {
        self.def.add_method(name);
        self
    }

    /// Field initializer run for every fresh instance.
    pub fn default_value<F>(mut self, property: impl Into<String>, init: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.def.add_default(property, Arc::new(init));
        self
    }

    /// Store the descriptor and every collected record.
    ///
    /// Every record is checked first; on error the storage is left untouched.
    pub fn register(self) -> Result<(), MetadataError> {
        let ClassBuilder {
            storage,
            def,
            exposes,
            excludes,
            types,
            transforms,
        } = self;
        let target = def.id().clone();

        let mut records: Vec<MetadataRecord> = Vec::new();
        records.extend(exposes.into_iter().map(MetadataRecord::from));
        records.extend(excludes.into_iter().map(MetadataRecord::from));
        for (property, pending) in types {
            if pending.len() > 1 {
                return Err(MetadataError::DuplicateMetadata {
                    kind: "type",
                    target,
                    property,
                });
            }
            for pending in pending {
                records.push(MetadataRecord::from(TypeMetadata {
                    target: target.clone(),
                    reflected_type: def.hint(&property).cloned(),
                    property_name: property.clone(),
                    type_fn: pending.type_fn,
                    options: pending.options,
                }));
            }
        }
        for (property_name, steps) in transforms {
            records.push(MetadataRecord::from(TransformMetadata {
                target: target.clone(),
                property_name,
                steps,
            }));
        }

        for record in &records {
            storage.check_metadata(record)?;
        }

        storage.define_class(def);
        for record in records {
            storage.insert_metadata(record);
        }
        Ok(())
    }
}
