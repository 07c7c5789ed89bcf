//! Transform operation executor: one directional walk over a value graph.
//!
//! An executor is built per call and dropped afterwards. The only state it
//! keeps is the map of objects on the current path, used when circular
//! checking is enabled.

use crate::class::ClassId;
use crate::metadata::{
    Direction, Discriminator, TransformFnParams, TypeHelpOptions, TypeMetadata, TypeRef,
};
use crate::options::{Strategy, TransformOptions};
use crate::storage::MetadataStorage;
use crate::value::{Object, Value, set_insert};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use tracing::trace;

/// An object on the current path and the node built for it.
struct Visit {
    depth: usize,
    result: Value,
}

/// What a node should become.
#[derive(Clone)]
enum Target<'a> {
    None,
    Type(TypeRef),
    /// A union resolved per value from a marker field.
    Discriminated {
        meta: &'a TypeMetadata,
        discriminator: &'a Discriminator,
        new_object: Value,
        property: Option<&'a str>,
    },
}

impl Target<'_> {
    fn from_type(ty: Option<TypeRef>) -> Self {
        ty.map_or(Target::None, Target::Type)
    }
}

/// Runs one transformation in one direction.
pub struct TransformOperationExecutor<'a> {
    direction: Direction,
    storage: &'a MetadataStorage,
    options: &'a TransformOptions,
    visited: HashMap<usize, Visit>,
}

impl<'a> TransformOperationExecutor<'a> {
    pub fn new(
        direction: Direction,
        storage: &'a MetadataStorage,
        options: &'a TransformOptions,
    ) -> Self {
        Self {
            direction,
            storage,
            options,
            visited: HashMap::new(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Transform `value`.
    ///
    /// `source` is an existing node to write into (the "from exist"
    /// variants). `target` is the type the node should become; `collection`
    /// is the declared collection type of a sequence (only honoured
    /// plain→class). `is_map` treats an object node as a keyed collection
    /// whose entries all have type `target`.
    pub fn transform(
        &mut self,
        source: Option<&Value>,
        value: &Value,
        target: Option<&TypeRef>,
        collection: Option<&TypeRef>,
        is_map: bool,
        depth: usize,
    ) -> Value {
        self.transform_node(
            source,
            value,
            Target::from_type(target.cloned()),
            collection,
            is_map,
            depth,
        )
    }

    fn transform_node(
        &mut self,
        source: Option<&Value>,
        value: &Value,
        target: Target<'a>,
        collection: Option<&TypeRef>,
        is_map: bool,
        depth: usize,
    ) -> Value {
        if let Value::Array(items) | Value::Set(items) = value {
            return self.transform_sequence(source, value, items, target, collection, depth);
        }

        let (target, is_map) = match target {
            Target::Type(TypeRef::Map) => (Target::None, true),
            target => (target, is_map),
        };

        if let Target::Discriminated {
            meta,
            discriminator,
            new_object,
            property,
        } = target
        {
            return self.transform_discriminated(
                source,
                value,
                meta,
                discriminator,
                &new_object,
                property,
                depth,
            );
        }

        if !is_map {
            match &target {
                Target::Type(TypeRef::String) => {
                    return if value.is_nullish() {
                        value.clone()
                    } else {
                        Value::String(value.to_js_string())
                    };
                }
                Target::Type(TypeRef::Number) => {
                    return if value.is_nullish() {
                        value.clone()
                    } else {
                        value.to_js_number()
                    };
                }
                Target::Type(TypeRef::Boolean) => {
                    return if value.is_nullish() {
                        value.clone()
                    } else {
                        Value::Bool(value.to_js_boolean())
                    };
                }
                Target::Type(TypeRef::Date) => return coerce_date(value),
                _ => {}
            }
            if let Value::Date(date) = value {
                return Value::Date(*date);
            }
        }

        match value {
            Value::Object(_) | Value::Map(_) => {
                let is_map = is_map || matches!(value, Value::Map(_));
                self.transform_object(source, value, target, is_map, depth)
            }
            _ => value.clone(),
        }
    }

    fn transform_sequence(
        &mut self,
        source: Option<&Value>,
        value: &Value,
        items: &[Value],
        target: Target<'a>,
        collection: Option<&TypeRef>,
        depth: usize,
    ) -> Value {
        let (element, collection) = match target {
            Target::Type(ty @ (TypeRef::Array | TypeRef::Set)) => (Target::None, Some(ty)),
            Target::Discriminated {
                meta,
                discriminator,
                ..
            } => (
                Target::Discriminated {
                    meta,
                    discriminator,
                    new_object: Value::Undefined,
                    property: None,
                },
                collection.cloned(),
            ),
            target => (target, collection.cloned()),
        };

        let as_set = match self.direction {
            Direction::ClassToPlain => false,
            Direction::ClassToClass => matches!(value, Value::Set(_)),
            Direction::PlainToClass => match collection {
                Some(TypeRef::Set) => true,
                Some(TypeRef::Array) => false,
                _ => matches!(value, Value::Set(_)),
            },
        };

        let mut out = Vec::with_capacity(items.len());
        let push = |out: &mut Vec<Value>, item: Value| {
            if as_set {
                set_insert(out, item);
            } else {
                out.push(item);
            }
        };

        for (index, item) in items.iter().enumerate() {
            if let Some(existing) = self.circular(item, depth) {
                trace!(index, depth, "circular reference in sequence");
                if self.direction == Direction::ClassToClass {
                    push(&mut out, existing);
                }
                continue;
            }

            let sub_source = source
                .filter(|s| s.is_sequence())
                .map(|s| s.index(index))
                .filter(|s| !s.is_undefined());
            let result = self.transform_node(
                sub_source.as_ref(),
                item,
                element.clone(),
                None,
                matches!(item, Value::Map(_)),
                depth + 1,
            );
            push(&mut out, result);
        }

        if as_set {
            Value::Set(out)
        } else {
            Value::Array(out)
        }
    }

    /// Resolve a union member, transform it, and fix up its marker field.
    #[allow(clippy::too_many_arguments)]
    fn transform_discriminated(
        &mut self,
        source: Option<&Value>,
        value: &Value,
        meta: &'a TypeMetadata,
        discriminator: &'a Discriminator,
        new_object: &Value,
        property: Option<&str>,
        depth: usize,
    ) -> Value {
        let is_map = matches!(value, Value::Map(_));
        match self.direction {
            Direction::PlainToClass => {
                let marker = value.get(&discriminator.property);
                let ty = marker
                    .as_str()
                    .and_then(|name| discriminator.class_for(name))
                    .map(|class| TypeRef::Class(class.clone()))
                    .or_else(|| {
                        meta.resolve(&TypeHelpOptions {
                            new_object,
                            object: value,
                            property,
                        })
                    });
                let result =
                    self.transform_node(source, value, Target::from_type(ty), None, is_map, depth);
                if !marker.is_undefined() && !meta.options.keep_discriminator_property {
                    if let Some(obj) = result.as_object() {
                        obj.borrow_mut().remove(&discriminator.property);
                    }
                }
                result
            }
            Direction::ClassToClass => {
                let ty = value.class_id().map(TypeRef::Class);
                self.transform_node(source, value, Target::from_type(ty), None, is_map, depth)
            }
            Direction::ClassToPlain => {
                let result = self.transform_node(source, value, Target::None, None, is_map, depth);
                let name = value
                    .class_id()
                    .and_then(|class| discriminator.name_for(&class).map(str::to_string));
                if let (Some(name), Some(obj)) = (name, result.as_object()) {
                    obj.borrow_mut().set(discriminator.property.clone(), name);
                }
                result
            }
        }
    }

    fn transform_object(
        &mut self,
        source: Option<&Value>,
        value: &Value,
        target: Target<'a>,
        is_map: bool,
        depth: usize,
    ) -> Value {
        let storage = self.storage;
        let source = source.filter(|s| matches!(s, Value::Object(_) | Value::Map(_)));

        // Map entries all share the node's target; object properties get
        // their own.
        let element = match &target {
            Target::Type(TypeRef::Object) => Target::None,
            other if is_map => other.clone(),
            _ => Target::None,
        };
        let class = if is_map {
            None
        } else {
            match target {
                Target::Type(TypeRef::Class(id)) => Some(id),
                Target::Type(TypeRef::Object) => None,
                _ => value
                    .class_id()
                    .or_else(|| source.and_then(Value::class_id)),
            }
        };

        let mut container = match source {
            Some(existing) => existing.clone(),
            None if is_map && self.direction != Direction::ClassToPlain => {
                Value::Map(IndexMap::new())
            }
            None => match &class {
                Some(class) if self.direction.targets_class() => {
                    Value::Object(storage.instantiate(class).into_ref())
                }
                _ => Value::Object(Object::plain().into_ref()),
            },
        };

        let visit_id = if self.options.enable_circular_check {
            value.object_id()
        } else {
            None
        };
        if let Some(id) = visit_id {
            self.visited.insert(
                id,
                Visit {
                    depth,
                    result: container.clone(),
                },
            );
        }

        let keys = self.get_keys(class.as_ref(), value, is_map);
        trace!(
            class = ?class,
            direction = ?self.direction,
            depth,
            keys = ?keys,
            "transforming object"
        );

        for key in keys {
            let mut property = key.clone();
            let mut new_key = key.clone();
            if let (false, false, Some(class)) = (is_map, self.options.ignore_decorators, &class) {
                if self.direction == Direction::PlainToClass {
                    if let Some(name) = storage
                        .find_expose_metadata_by_custom_name(class, &key, self.direction)
                        .and_then(|meta| meta.property_name.clone())
                    {
                        property = name.clone();
                        new_key = name;
                    }
                } else if let Some(name) = storage
                    .find_expose_metadata(class, &key, self.direction)
                    .and_then(|meta| meta.options.name.clone())
                {
                    new_key = name;
                }
            }

            let sub_value = self.read(value, &key);

            let mut sub_is_map = matches!(sub_value, Value::Map(_));
            let mut sub_target = Target::None;
            let mut collection = None;
            if is_map {
                sub_target = element.clone();
            } else if let Some(class) = &class {
                let type_meta = storage.find_type_metadata(class, &property);
                match type_meta {
                    Some(meta) => {
                        sub_target = match meta.discriminator() {
                            Some(discriminator) => Target::Discriminated {
                                meta,
                                discriminator,
                                new_object: container.clone(),
                                property: Some(meta.property_name.as_str()),
                            },
                            None => Target::from_type(meta.resolve(&TypeHelpOptions {
                                new_object: &container,
                                object: value,
                                property: Some(&property),
                            })),
                        };
                        sub_is_map |= meta.reflected_type == Some(TypeRef::Map);
                    }
                    None => {
                        if let Some(ty) = self.options.target_map_type(class, &property) {
                            sub_target = Target::Type(ty.clone());
                        } else if self.options.enable_implicit_conversion
                            && self.direction == Direction::PlainToClass
                        {
                            sub_target = Target::from_type(storage.hint(class, &property).cloned());
                        }
                    }
                }
                if sub_value.is_sequence() {
                    collection = type_meta
                        .and_then(|meta| meta.reflected_type.clone())
                        .or_else(|| storage.hint(class, &property).cloned());
                }
            }

            // Never clobber behaviour on a class destination.
            let mut setter = None;
            if self.direction.targets_class() {
                if let Some(dest) = container.class_id() {
                    if storage.has_method(&dest, &new_key) {
                        trace!(key = %new_key, "skipping method");
                        continue;
                    }
                    if let Some(computed) = storage.computed(&dest, &new_key) {
                        match &computed.setter {
                            Some(set) => setter = Some(set.clone()),
                            None => {
                                trace!(key = %new_key, "skipping read-only computed property");
                                continue;
                            }
                        }
                    }
                }
            }

            let transform_class = if is_map { None } else { class.as_ref() };

            if let Some(existing) = self.circular(&sub_value, depth) {
                trace!(key = %key, depth, "circular reference");
                if self.direction == Direction::ClassToClass {
                    let final_value =
                        self.apply_custom_transformations(existing, transform_class, &property, value);
                    if !final_value.is_undefined() || self.options.expose_unset_fields {
                        assign(&mut container, new_key, final_value);
                    }
                }
                continue;
            }

            let sub_source = source
                .map(|s| s.get(&key))
                .filter(|s| !s.is_undefined());
            let final_value = if self.direction == Direction::ClassToPlain {
                let input =
                    self.apply_custom_transformations(sub_value, transform_class, &property, value);
                self.transform_node(
                    sub_source.as_ref(),
                    &input,
                    sub_target,
                    collection.as_ref(),
                    sub_is_map,
                    depth + 1,
                )
            } else if sub_value.is_undefined() && self.options.expose_default_values {
                container.get(&new_key)
            } else {
                let result = self.transform_node(
                    sub_source.as_ref(),
                    &sub_value,
                    sub_target,
                    collection.as_ref(),
                    sub_is_map,
                    depth + 1,
                );
                self.apply_custom_transformations(result, transform_class, &property, value)
            };

            if final_value.is_undefined() && !self.options.expose_unset_fields {
                continue;
            }
            match setter {
                Some(set) => {
                    if let Value::Object(obj) = &container {
                        set(&mut obj.borrow_mut(), final_value);
                    }
                }
                None => assign(&mut container, new_key, final_value),
            }
        }

        if let Some(id) = visit_id {
            self.visited.remove(&id);
        }
        container
    }

    /// Read a property of a source node. Outside plain→class, computed
    /// properties of instances are evaluated.
    fn read(&self, value: &Value, key: &str) -> Value {
        if self.direction != Direction::PlainToClass {
            if let Value::Object(obj) = value {
                let obj = obj.borrow();
                if let Some(computed) = obj.class().and_then(|class| self.storage.computed(class, key))
                {
                    return (computed.getter)(&*obj);
                }
            }
        }
        value.get(key)
    }

    /// The node built for `value` when `value` is an object already on the
    /// current path.
    fn circular(&self, value: &Value, depth: usize) -> Option<Value> {
        if !self.options.enable_circular_check {
            return None;
        }
        let id = value.object_id()?;
        self.visited
            .get(&id)
            .filter(|visit| visit.depth <= depth)
            .map(|visit| visit.result.clone())
    }

    /// The property a key of the source refers to.
    fn property_for_key(&self, class: &ClassId, key: &str) -> String {
        if self.direction == Direction::PlainToClass && !self.options.ignore_decorators {
            if let Some(name) = self
                .storage
                .find_expose_metadata_by_custom_name(class, key, self.direction)
                .and_then(|meta| meta.property_name.clone())
            {
                return name;
            }
        }
        key.to_string()
    }

    /// Select the keys of an object node.
    fn get_keys(&self, class: Option<&ClassId>, value: &Value, is_map: bool) -> Vec<String> {
        let storage = self.storage;
        let direction = self.direction;
        let options = self.options;

        let strategy = class
            .and_then(|class| storage.get_strategy(class))
            .or(options.strategy)
            .unwrap_or(Strategy::ExposeAll);

        let mut keys = if strategy == Strategy::ExposeAll || is_map {
            value.keys()
        } else {
            Vec::new()
        };
        if is_map {
            return keys;
        }

        if let Some(class) = class {
            if options.ignore_decorators && options.exclude_extraneous_values {
                keys = storage.get_exposed_properties(class, direction);
                keys.extend(storage.get_excluded_properties(class, direction));
            }

            if !options.ignore_decorators {
                let mut exposed = storage.get_exposed_properties(class, direction);
                if direction == Direction::PlainToClass {
                    exposed = exposed
                        .into_iter()
                        .map(|property| {
                            storage
                                .find_expose_metadata(class, &property, direction)
                                .and_then(|meta| meta.options.name.clone())
                                .unwrap_or(property)
                        })
                        .collect();
                }
                if options.exclude_extraneous_values {
                    keys = exposed;
                } else {
                    keys.extend(exposed);
                }

                let excluded = storage.get_excluded_properties(class, direction);
                if !excluded.is_empty() {
                    keys.retain(|key| !excluded.contains(&self.property_for_key(class, key)));
                }

                let expose_meta = |key: &str| {
                    storage.find_expose_metadata(class, &self.property_for_key(class, key), direction)
                };
                if options.version.is_some() {
                    keys.retain(|key| {
                        expose_meta(key.as_str()).is_none_or(|meta| {
                            options.version_allows(meta.options.since, meta.options.until)
                        })
                    });
                }
                keys.retain(|key| {
                    expose_meta(key.as_str()).is_none_or(|meta| options.groups_allow(&meta.options.groups))
                });
            }
        }

        if strategy == Strategy::ExposeAll && !options.exclude_prefixes.is_empty() {
            keys.retain(|key| {
                !options
                    .exclude_prefixes
                    .iter()
                    .any(|prefix| key.starts_with(prefix.as_str()))
            });
        }

        keys.into_iter()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// Run the transform functions of `property` that are active for this
    /// call.
    fn apply_custom_transformations(
        &self,
        value: Value,
        class: Option<&ClassId>,
        property: &str,
        obj: &Value,
    ) -> Value {
        let Some(class) = class else {
            return value;
        };
        self.storage
            .find_transform_metadatas(class, property, self.direction)
            .into_iter()
            .filter(|step| {
                self.options
                    .version_allows(step.options.since, step.options.until)
                    && self.options.groups_allow(&step.options.groups)
            })
            .fold(value, |value, step| {
                (step.func)(TransformFnParams {
                    value,
                    key: property,
                    obj,
                    direction: self.direction,
                    options: self.options,
                })
            })
    }
}

fn coerce_date(value: &Value) -> Value {
    match value {
        Value::Date(date) => Value::Date(*date),
        other if other.is_nullish() => other.clone(),
        other => other.to_date().map(Value::Date).unwrap_or_else(|| other.clone()),
    }
}

fn assign(container: &mut Value, key: String, value: Value) {
    match container {
        Value::Map(entries) => {
            entries.insert(key, value);
        }
        Value::Object(obj) => obj.borrow_mut().set(key, value),
        _ => {}
    }
}
