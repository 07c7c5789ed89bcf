//! Metadata records: per-class and per-property transformation decisions.

use crate::class::ClassId;
use crate::options::TransformOptions;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which way a transformation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Plain data into typed instances.
    PlainToClass,
    /// Typed instances into plain data.
    ClassToPlain,
    /// Typed instances into fresh typed instances.
    ClassToClass,
}

impl Direction {
    /// Whether the output of this direction is made of class instances.
    pub fn targets_class(self) -> bool {
        matches!(self, Direction::PlainToClass | Direction::ClassToClass)
    }
}

/// A type the engine can produce.
///
/// Spelled as a string in configuration: `"String"`, `"Number"`,
/// `"Boolean"`, `"Date"`, `"Array"`, `"Set"`, `"Map"`, `"Object"`, and any
/// other name refers to a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TypeRef {
    String,
    Number,
    Boolean,
    Date,
    Array,
    Set,
    Map,
    /// A plain object.
    Object,
    Class(ClassId),
}

impl TypeRef {
    pub fn class(id: impl Into<ClassId>) -> Self {
        TypeRef::Class(id.into())
    }

    pub fn as_class(&self) -> Option<&ClassId> {
        match self {
            TypeRef::Class(id) => Some(id),
            _ => None,
        }
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        match name {
            "String" => TypeRef::String,
            "Number" => TypeRef::Number,
            "Boolean" => TypeRef::Boolean,
            "Date" => TypeRef::Date,
            "Array" => TypeRef::Array,
            "Set" => TypeRef::Set,
            "Map" => TypeRef::Map,
            "Object" => TypeRef::Object,
            other => TypeRef::Class(ClassId::from(other)),
        }
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        TypeRef::from(name.as_str())
    }
}

impl From<ClassId> for TypeRef {
    fn from(id: ClassId) -> Self {
        TypeRef::Class(id)
    }
}

impl From<TypeRef> for String {
    fn from(ty: TypeRef) -> Self {
        match ty {
            TypeRef::String => "String".into(),
            TypeRef::Number => "Number".into(),
            TypeRef::Boolean => "Boolean".into(),
            TypeRef::Date => "Date".into(),
            TypeRef::Array => "Array".into(),
            TypeRef::Set => "Set".into(),
            TypeRef::Map => "Map".into(),
            TypeRef::Object => "Object".into(),
            TypeRef::Class(id) => id.into(),
        }
    }
}

/// Restricts a record to one direction.
///
/// Unset flags mean "every direction". Setting both to `true` is the same as
/// setting neither. A lone explicit `false` is rejected at registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionFlags {
    pub to_class_only: Option<bool>,
    pub to_plain_only: Option<bool>,
}

impl DirectionFlags {
    pub fn to_class_only() -> Self {
        Self {
            to_class_only: Some(true),
            to_plain_only: None,
        }
    }

    pub fn to_plain_only() -> Self {
        Self {
            to_class_only: None,
            to_plain_only: Some(true),
        }
    }

    /// Whether a record with these flags applies to `direction`.
    pub fn is_active(&self, direction: Direction) -> bool {
        match (self.to_class_only, self.to_plain_only) {
            (Some(true), Some(true)) => true,
            (Some(true), _) => direction.targets_class(),
            (_, Some(true)) => direction == Direction::ClassToPlain,
            _ => true,
        }
    }

    /// The flag that is explicitly `false` while the other is unset.
    pub(crate) fn ambiguous_flag(&self) -> Option<&'static str> {
        match (self.to_class_only, self.to_plain_only) {
            (Some(false), None) => Some("toClassOnly"),
            (None, Some(false)) => Some("toPlainOnly"),
            _ => None,
        }
    }
}

/// Options of an Expose record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExposeOptions {
    /// External name of the property.
    pub name: Option<String>,
    /// First version (inclusive) in which the property exists.
    pub since: Option<f64>,
    /// First version (exclusive) in which the property no longer exists.
    pub until: Option<f64>,
    /// Groups the property belongs to. Empty means ungrouped.
    pub groups: Vec<String>,
    pub flags: DirectionFlags,
}

impl ExposeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn since(mut self, version: f64) -> Self {
        self.since = Some(version);
        self
    }

    pub fn until(mut self, version: f64) -> Self {
        self.until = Some(version);
        self
    }

    pub fn groups<S: Into<String>>(mut self, groups: impl IntoIterator<Item = S>) -> Self {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn to_class_only(mut self) -> Self {
        self.flags.to_class_only = Some(true);
        self
    }

    pub fn to_plain_only(mut self) -> Self {
        self.flags.to_plain_only = Some(true);
        self
    }

    pub fn flags(mut self, flags: DirectionFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Options of an Exclude record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExcludeOptions {
    pub flags: DirectionFlags,
}

impl ExcludeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_class_only(mut self) -> Self {
        self.flags.to_class_only = Some(true);
        self
    }

    pub fn to_plain_only(mut self) -> Self {
        self.flags.to_plain_only = Some(true);
        self
    }

    pub fn flags(mut self, flags: DirectionFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Options of one custom transform function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformFnOptions {
    pub since: Option<f64>,
    pub until: Option<f64>,
    pub groups: Vec<String>,
    pub flags: DirectionFlags,
}

impl TransformFnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since(mut self, version: f64) -> Self {
        self.since = Some(version);
        self
    }

    pub fn until(mut self, version: f64) -> Self {
        self.until = Some(version);
        self
    }

    pub fn groups<S: Into<String>>(mut self, groups: impl IntoIterator<Item = S>) -> Self {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn to_class_only(mut self) -> Self {
        self.flags.to_class_only = Some(true);
        self
    }

    pub fn to_plain_only(mut self) -> Self {
        self.flags.to_plain_only = Some(true);
        self
    }

    pub fn flags(mut self, flags: DirectionFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Marks a property, or a whole class when `property_name` is `None`, as
/// included.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposeMetadata {
    pub target: ClassId,
    pub property_name: Option<String>,
    pub options: ExposeOptions,
}

/// Marks a property, or a whole class when `property_name` is `None`, as
/// excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludeMetadata {
    pub target: ClassId,
    pub property_name: Option<String>,
    pub options: ExcludeOptions,
}

/// Context handed to a type function.
pub struct TypeHelpOptions<'a> {
    /// The container being built. `Undefined` while building a sequence.
    pub new_object: &'a Value,
    /// The source node that holds the property.
    pub object: &'a Value,
    pub property: Option<&'a str>,
}

/// Computes the target type of a property from its context.
pub type TypeFn = Arc<dyn Fn(&TypeHelpOptions<'_>) -> TypeRef + Send + Sync>;

/// One candidate of a discriminated union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscriminatorSubType {
    /// Marker value written into the data.
    pub name: String,
    pub value: ClassId,
}

/// Selects among subtypes by a marker field in the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discriminator {
    pub property: String,
    pub sub_types: Vec<DiscriminatorSubType>,
}

impl Discriminator {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            sub_types: Vec::new(),
        }
    }

    pub fn sub_type(mut self, name: impl Into<String>, class: impl Into<ClassId>) -> Self {
        self.sub_types.push(DiscriminatorSubType {
            name: name.into(),
            value: class.into(),
        });
        self
    }

    /// Class registered under a marker value.
    pub fn class_for(&self, name: &str) -> Option<&ClassId> {
        self.sub_types
            .iter()
            .find(|sub| sub.name == name)
            .map(|sub| &sub.value)
    }

    /// Marker value registered for a class.
    pub fn name_for(&self, class: &ClassId) -> Option<&str> {
        self.sub_types
            .iter()
            .find(|sub| &sub.value == class)
            .map(|sub| sub.name.as_str())
    }
}

/// Options of a Type record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeOptions {
    pub discriminator: Option<Discriminator>,
    /// Keep the marker field on instances built in plain→class.
    pub keep_discriminator_property: bool,
}

impl TypeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn discriminator(mut self, discriminator: Discriminator) -> Self {
        self.discriminator = Some(discriminator);
        self
    }

    pub fn keep_discriminator_property(mut self, keep: bool) -> Self {
        self.keep_discriminator_property = keep;
        self
    }
}

/// Declares the type of a property.
#[derive(Clone)]
pub struct TypeMetadata {
    pub target: ClassId,
    pub property_name: String,
    pub type_fn: Option<TypeFn>,
    /// Design-time type of the property, e.g. `Array` for a list of photos.
    pub reflected_type: Option<TypeRef>,
    pub options: TypeOptions,
}

impl TypeMetadata {
    /// Evaluate the type function, falling back to the reflected type.
    pub fn resolve(&self, help: &TypeHelpOptions<'_>) -> Option<TypeRef> {
        match &self.type_fn {
            Some(type_fn) => Some(type_fn(help)),
            None => self.reflected_type.clone(),
        }
    }

    /// The discriminator, when it is usable (has a property and subtypes).
    pub fn discriminator(&self) -> Option<&Discriminator> {
        self.options
            .discriminator
            .as_ref()
            .filter(|d| !d.property.is_empty() && !d.sub_types.is_empty())
    }
}

impl fmt::Debug for TypeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMetadata")
            .field("target", &self.target)
            .field("property_name", &self.property_name)
            .field("has_type_fn", &self.type_fn.is_some())
            .field("reflected_type", &self.reflected_type)
            .field("options", &self.options)
            .finish()
    }
}

/// Arguments of a custom transform function.
pub struct TransformFnParams<'a> {
    pub value: Value,
    pub key: &'a str,
    /// The source node that holds the property.
    pub obj: &'a Value,
    pub direction: Direction,
    pub options: &'a TransformOptions,
}

pub type TransformFn = Arc<dyn Fn(TransformFnParams<'_>) -> Value + Send + Sync>;

/// One custom transform function with its filters.
#[derive(Clone)]
pub struct TransformStep {
    pub func: TransformFn,
    pub options: TransformFnOptions,
}

impl fmt::Debug for TransformStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformStep")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// The ordered transform functions of one property. Steps run in
/// declaration order.
#[derive(Debug, Clone)]
pub struct TransformMetadata {
    pub target: ClassId,
    pub property_name: String,
    pub steps: Vec<TransformStep>,
}

/// Any record accepted by [`MetadataStorage::set_metadata`](crate::MetadataStorage::set_metadata).
#[derive(Debug, Clone)]
pub enum MetadataRecord {
    Expose(ExposeMetadata),
    Exclude(ExcludeMetadata),
    Type(TypeMetadata),
    Transform(TransformMetadata),
}

impl MetadataRecord {
    pub fn target(&self) -> &ClassId {
        match self {
            MetadataRecord::Expose(m) => &m.target,
            MetadataRecord::Exclude(m) => &m.target,
            MetadataRecord::Type(m) => &m.target,
            MetadataRecord::Transform(m) => &m.target,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MetadataRecord::Expose(_) => "expose",
            MetadataRecord::Exclude(_) => "exclude",
            MetadataRecord::Type(_) => "type",
            MetadataRecord::Transform(_) => "transform",
        }
    }
}

impl From<ExposeMetadata> for MetadataRecord {
    fn from(m: ExposeMetadata) -> Self {
        MetadataRecord::Expose(m)
    }
}

impl From<ExcludeMetadata> for MetadataRecord {
    fn from(m: ExcludeMetadata) -> Self {
        MetadataRecord::Exclude(m)
    }
}

impl From<TypeMetadata> for MetadataRecord {
    fn from(m: TypeMetadata) -> Self {
        MetadataRecord::Type(m)
    }
}

impl From<TransformMetadata> for MetadataRecord {
    fn from(m: TransformMetadata) -> Self {
        MetadataRecord::Transform(m)
    }
}
