//! Public operations: one executor per call, with the right direction.

use crate::class::ClassId;
use crate::executor::TransformOperationExecutor;
use crate::json::JsonError;
use crate::metadata::{Direction, TypeRef};
use crate::options::TransformOptions;
use crate::storage::{MetadataStorage, default_metadata_storage};
use crate::value::Value;
use std::sync::PoisonError;
use tracing::debug;

/// Errors of the JSON string operations.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Encode(#[from] JsonError),

    #[error("expected a JSON array")]
    NotAnArray,
}

/// Transformation operations over one metadata storage.
#[derive(Debug, Clone, Copy)]
pub struct ClassTransformer<'s> {
    storage: &'s MetadataStorage,
}

impl<'s> ClassTransformer<'s> {
    pub fn new(storage: &'s MetadataStorage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &'s MetadataStorage {
        self.storage
    }

    fn run(
        &self,
        direction: Direction,
        source: Option<&Value>,
        value: &Value,
        target: Option<&TypeRef>,
        options: &TransformOptions,
    ) -> Value {
        debug!(?direction, target = ?target, from_exist = source.is_some(), "transforming");
        TransformOperationExecutor::new(direction, self.storage, options)
            .transform(source, value, target, None, false, 0)
    }

    /// Build instances of `class` from plain data. Arrays produce arrays of
    /// instances.
    pub fn plain_to_instance(
        &self,
        class: impl Into<ClassId>,
        plain: &Value,
        options: &TransformOptions,
    ) -> Value {
        let target = TypeRef::Class(class.into());
        self.run(Direction::PlainToClass, None, plain, Some(&target), options)
    }

    /// Write plain data into an existing instance (or array of instances).
    pub fn plain_to_instance_from_exist(
        &self,
        existing: &Value,
        plain: &Value,
        options: &TransformOptions,
    ) -> Value {
        self.run(Direction::PlainToClass, Some(existing), plain, None, options)
    }

    pub fn instance_to_plain(&self, instance: &Value, options: &TransformOptions) -> Value {
        self.run(Direction::ClassToPlain, None, instance, None, options)
    }

    /// Write an instance's plain form into an existing plain object.
    pub fn instance_to_plain_from_exist(
        &self,
        existing: &Value,
        instance: &Value,
        options: &TransformOptions,
    ) -> Value {
        self.run(Direction::ClassToPlain, Some(existing), instance, None, options)
    }

    /// Deep-copy an instance graph into fresh instances.
    pub fn instance_to_instance(&self, instance: &Value, options: &TransformOptions) -> Value {
        self.run(Direction::ClassToClass, None, instance, None, options)
    }

    pub fn instance_to_instance_from_exist(
        &self,
        existing: &Value,
        instance: &Value,
        options: &TransformOptions,
    ) -> Value {
        self.run(Direction::ClassToClass, Some(existing), instance, None, options)
    }

    /// Encode an instance graph as a JSON string.
    pub fn serialize(
        &self,
        instance: &Value,
        options: &TransformOptions,
    ) -> Result<String, SerializeError> {
        let plain = self.instance_to_plain(instance, options);
        Ok(serde_json::to_string(&plain.to_json()?)?)
    }

    /// Parse a JSON string into instances of `class`.
    pub fn deserialize(
        &self,
        class: impl Into<ClassId>,
        json: &str,
        options: &TransformOptions,
    ) -> Result<Value, SerializeError> {
        let plain = Value::from_json(serde_json::from_str(json)?);
        Ok(self.plain_to_instance(class, &plain, options))
    }

    /// Parse a JSON array into instances of `class`.
    pub fn deserialize_array(
        &self,
        class: impl Into<ClassId>,
        json: &str,
        options: &TransformOptions,
    ) -> Result<Vec<Value>, SerializeError> {
        let parsed: serde_json::Value = serde_json::from_str(json)?;
        if !parsed.is_array() {
            return Err(SerializeError::NotAnArray);
        }
        match self.plain_to_instance(class, &Value::from_json(parsed), options) {
            Value::Array(items) => Ok(items),
            _ => Err(SerializeError::NotAnArray),
        }
    }
}

fn with_default<R>(f: impl FnOnce(ClassTransformer<'_>) -> R) -> R {
    let storage = default_metadata_storage()
        .read()
        .unwrap_or_else(PoisonError::into_inner);
    f(ClassTransformer::new(&storage))
}

/// [`ClassTransformer::plain_to_instance`] on the default storage.
pub fn plain_to_instance(
    class: impl Into<ClassId>,
    plain: &Value,
    options: &TransformOptions,
) -> Value {
    with_default(|t| t.plain_to_instance(class, plain, options))
}

pub fn plain_to_instance_from_exist(
    existing: &Value,
    plain: &Value,
    options: &TransformOptions,
) -> Value {
    with_default(|t| t.plain_to_instance_from_exist(existing, plain, options))
}

/// [`ClassTransformer::instance_to_plain`] on the default storage.
pub fn instance_to_plain(instance: &Value, options: &TransformOptions) -> Value {
    with_default(|t| t.instance_to_plain(instance, options))
}

pub fn instance_to_plain_from_exist(
    existing: &Value,
    instance: &Value,
    options: &TransformOptions,
) -> Value {
    with_default(|t| t.instance_to_plain_from_exist(existing, instance, options))
}

/// [`ClassTransformer::instance_to_instance`] on the default storage.
pub fn instance_to_instance(instance: &Value, options: &TransformOptions) -> Value {
    with_default(|t| t.instance_to_instance(instance, options))
}

pub fn instance_to_instance_from_exist(
    existing: &Value,
    instance: &Value,
    options: &TransformOptions,
) -> Value {
    with_default(|t| t.instance_to_instance_from_exist(existing, instance, options))
}

pub fn serialize(instance: &Value, options: &TransformOptions) -> Result<String, SerializeError> {
    with_default(|t| t.serialize(instance, options))
}

pub fn deserialize(
    class: impl Into<ClassId>,
    json: &str,
    options: &TransformOptions,
) -> Result<Value, SerializeError> {
    with_default(|t| t.deserialize(class, json, options))
}

pub fn deserialize_array(
    class: impl Into<ClassId>,
    json: &str,
    options: &TransformOptions,
) -> Result<Vec<Value>, SerializeError> {
    with_default(|t| t.deserialize_array(class, json, options))
}
