//! Metadata storage: class descriptors and metadata records, indexed by
//! class and property, with ancestor-aware lookup.

use crate::class::{ClassDef, ClassId, ComputedProperty};
use crate::describe::ClassBuilder;
use crate::metadata::{
    Direction, DirectionFlags, ExcludeMetadata, ExposeMetadata, MetadataRecord, TransformMetadata,
    TransformStep, TypeMetadata, TypeRef,
};
use crate::options::Strategy;
use crate::value::{Object, Value};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use tracing::debug;

/// Errors raised while registering metadata.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("duplicate {kind} metadata for {target}.{property}")]
    DuplicateMetadata {
        kind: &'static str,
        target: ClassId,
        property: String,
    },

    #[error(
        "ambiguous {kind} metadata on {target}{}: `{flag}: false` without the opposite flag; set `{flag}: true` or leave it unset",
        property_suffix(.property)
    )]
    AmbiguousDirectionFlag {
        kind: &'static str,
        target: ClassId,
        property: Option<String>,
        flag: &'static str,
    },
}

/// Store of class descriptors and metadata records.
///
/// Writes need `&mut self` and happen while classes are being described;
/// lookups take `&self`, so one storage (typically behind an `Arc`) can serve
/// any number of concurrent transformations.
#[derive(Default)]
pub struct MetadataStorage {
    classes: HashMap<ClassId, ClassDef>,
    type_metadatas: HashMap<ClassId, IndexMap<String, TypeMetadata>>,
    transform_metadatas: HashMap<ClassId, IndexMap<String, TransformMetadata>>,
    expose_metadatas: HashMap<ClassId, Vec<ExposeMetadata>>,
    exclude_metadatas: HashMap<ClassId, Vec<ExcludeMetadata>>,
    /// Superclasses per class, nearest first. Filled lazily.
    ancestors: RwLock<HashMap<ClassId, Arc<[ClassId]>>>,
}

fn property_suffix(property: &Option<String>) -> String {
    property
        .as_deref()
        .map(|p| format!(".{}", p))
        .unwrap_or_default()
}

static DEFAULT_STORAGE: LazyLock<RwLock<MetadataStorage>> =
    LazyLock::new(|| RwLock::new(MetadataStorage::new()));

/// Process-wide storage used by the free transformation functions.
pub fn default_metadata_storage() -> &'static RwLock<MetadataStorage> {
    &DEFAULT_STORAGE
}

impl MetadataStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start describing a class.
    pub fn describe(&mut self, class: impl Into<ClassId>) -> ClassBuilder<'_> {
        ClassBuilder::new(self, class.into())
    }

    /// Register a class descriptor, merging it into an existing one.
    pub fn define_class(&mut self, def: ClassDef) {
        debug!(class = %def.id(), parent = ?def.parent(), "defining class");
        match self.classes.get_mut(def.id()) {
            Some(existing) => existing.merge(def),
            None => {
                self.classes.insert(def.id().clone(), def);
            }
        }
        self.ancestors
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn class(&self, id: &ClassId) -> Option<&ClassDef> {
        self.classes.get(id)
    }

    /// Store a metadata record.
    ///
    /// Expose and Exclude records stack. A second Type or Transform record for
    /// the same class and property is rejected; a subclass may still declare
    /// its own.
    pub fn set_metadata(&mut self, record: impl Into<MetadataRecord>) -> Result<(), MetadataError> {
        let record = record.into();
        self.check_metadata(&record)?;
        self.insert_metadata(record);
        Ok(())
    }

    /// Check a record against its direction flags and the records already
    /// stored, without storing it.
    pub(crate) fn check_metadata(&self, record: &MetadataRecord) -> Result<(), MetadataError> {
        validate_flags(record)?;
        let taken = match record {
            MetadataRecord::Expose(_) | MetadataRecord::Exclude(_) => false,
            MetadataRecord::Type(meta) => self
                .type_metadatas
                .get(&meta.target)
                .is_some_and(|by_property| by_property.contains_key(&meta.property_name)),
            MetadataRecord::Transform(meta) => self
                .transform_metadatas
                .get(&meta.target)
                .is_some_and(|by_property| by_property.contains_key(&meta.property_name)),
        };
        match (taken, record) {
            (true, MetadataRecord::Type(meta)) => Err(MetadataError::DuplicateMetadata {
                kind: "type",
                target: meta.target.clone(),
                property: meta.property_name.clone(),
            }),
            (true, MetadataRecord::Transform(meta)) => Err(MetadataError::DuplicateMetadata {
                kind: "transform",
                target: meta.target.clone(),
                property: meta.property_name.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Store a record that already passed [`Self::check_metadata`].
    pub(crate) fn insert_metadata(&mut self, record: MetadataRecord) {
        debug!(kind = record.kind(), target = %record.target(), "registering metadata");

        match record {
            MetadataRecord::Expose(meta) => {
                self.expose_metadatas
                    .entry(meta.target.clone())
                    .or_default()
                    .push(meta);
            }
            MetadataRecord::Exclude(meta) => {
                self.exclude_metadatas
                    .entry(meta.target.clone())
                    .or_default()
                    .push(meta);
            }
            MetadataRecord::Type(meta) => {
                self.type_metadatas
                    .entry(meta.target.clone())
                    .or_default()
                    .insert(meta.property_name.clone(), meta);
            }
            MetadataRecord::Transform(meta) => {
                self.transform_metadatas
                    .entry(meta.target.clone())
                    .or_default()
                    .insert(meta.property_name.clone(), meta);
            }
        }
    }

    /// Superclasses of `target`, nearest first. Memoized per class.
    pub fn ancestors(&self, target: &ClassId) -> Arc<[ClassId]> {
        if let Some(found) = self
            .ancestors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(target)
        {
            return Arc::clone(found);
        }

        let mut chain: Vec<ClassId> = Vec::new();
        let mut current = self.classes.get(target).and_then(|def| def.parent().cloned());
        while let Some(parent) = current {
            // A malformed hierarchy that loops back ends the chain.
            if &parent == target || chain.contains(&parent) {
                break;
            }
            current = self.classes.get(&parent).and_then(|def| def.parent().cloned());
            chain.push(parent);
        }

        let chain: Arc<[ClassId]> = chain.into();
        self.ancestors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(target.clone(), Arc::clone(&chain));
        chain
    }

    /// Whether `value` is an instance of `class` or one of its subclasses.
    pub fn is_instance_of(&self, value: &Value, class: &ClassId) -> bool {
        match value.class_id() {
            Some(own) => &own == class || self.ancestors(&own).contains(class),
            None => false,
        }
    }

    /// Create a bare instance, running initializers from the farthest
    /// ancestor down to the class itself.
    pub fn instantiate(&self, class: &ClassId) -> Object {
        let mut object = Object::instance(class.clone());
        for ancestor in self.ancestors(class).iter().rev() {
            if let Some(def) = self.classes.get(ancestor) {
                def.initialize(&mut object);
            }
        }
        if let Some(def) = self.classes.get(class) {
            def.initialize(&mut object);
        }
        object
    }

    /// Computed property of `class` or its nearest ancestor declaring it.
    pub fn computed(&self, class: &ClassId, property: &str) -> Option<&ComputedProperty> {
        self.lineage(class)
            .into_iter()
            .find_map(|id| self.classes.get(&id).and_then(|def| def.computed(property)))
    }

    pub fn has_method(&self, class: &ClassId, name: &str) -> bool {
        self.lineage(class)
            .into_iter()
            .any(|id| self.classes.get(&id).is_some_and(|def| def.has_method(name)))
    }

    /// Design-time type hint for a property.
    pub fn hint(&self, class: &ClassId, property: &str) -> Option<&TypeRef> {
        self.lineage(class)
            .into_iter()
            .find_map(|id| self.classes.get(&id).and_then(|def| def.hint(property)))
    }

    /// Class-wide strategy declared by `target` itself; `None` when it
    /// declares neither or both.
    pub fn get_strategy(&self, target: &ClassId) -> Option<Strategy> {
        let expose = self
            .expose_metadatas
            .get(target)
            .is_some_and(|metas| metas.iter().any(|m| m.property_name.is_none()));
        let exclude = self
            .exclude_metadatas
            .get(target)
            .is_some_and(|metas| metas.iter().any(|m| m.property_name.is_none()));

        match (expose, exclude) {
            (true, false) => Some(Strategy::ExposeAll),
            (false, true) => Some(Strategy::ExcludeAll),
            _ => None,
        }
    }

    /// Property-level Expose records of `target` and its ancestors, farthest
    /// ancestor first.
    pub fn exposed_metadatas(&self, target: &ClassId) -> Vec<&ExposeMetadata> {
        self.hierarchy_records(&self.expose_metadatas, target, |m| m.property_name.is_some())
    }

    /// Property-level Exclude records of `target` and its ancestors, farthest
    /// ancestor first.
    pub fn excluded_metadatas(&self, target: &ClassId) -> Vec<&ExcludeMetadata> {
        self.hierarchy_records(&self.exclude_metadatas, target, |m| m.property_name.is_some())
    }

    /// Names of the properties exposed for `direction`.
    pub fn get_exposed_properties(&self, target: &ClassId, direction: Direction) -> Vec<String> {
        self.exposed_metadatas(target)
            .into_iter()
            .filter(|m| m.options.flags.is_active(direction))
            .filter_map(|m| m.property_name.clone())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// Names of the properties excluded for `direction`.
    pub fn get_excluded_properties(&self, target: &ClassId, direction: Direction) -> Vec<String> {
        self.excluded_metadatas(target)
            .into_iter()
            .filter(|m| m.options.flags.is_active(direction))
            .filter_map(|m| m.property_name.clone())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// The Expose record that governs `property` for `direction`: the latest
    /// active one on the class itself, else on the nearest ancestor.
    pub fn find_expose_metadata(
        &self,
        target: &ClassId,
        property: &str,
        direction: Direction,
    ) -> Option<&ExposeMetadata> {
        self.lineage(target).into_iter().find_map(|id| {
            self.expose_metadatas.get(&id).and_then(|metas| {
                metas.iter().rev().find(|m| {
                    m.property_name.as_deref() == Some(property)
                        && m.options.flags.is_active(direction)
                })
            })
        })
    }

    /// The Exclude record that governs `property` for `direction`.
    pub fn find_exclude_metadata(
        &self,
        target: &ClassId,
        property: &str,
        direction: Direction,
    ) -> Option<&ExcludeMetadata> {
        self.lineage(target).into_iter().find_map(|id| {
            self.exclude_metadatas.get(&id).and_then(|metas| {
                metas.iter().rev().find(|m| {
                    m.property_name.as_deref() == Some(property)
                        && m.options.flags.is_active(direction)
                })
            })
        })
    }

    /// The active Expose record whose external name is `name`.
    pub fn find_expose_metadata_by_custom_name(
        &self,
        target: &ClassId,
        name: &str,
        direction: Direction,
    ) -> Option<&ExposeMetadata> {
        self.exposed_metadatas(target).into_iter().rev().find(|m| {
            m.options.name.as_deref() == Some(name) && m.options.flags.is_active(direction)
        })
    }

    /// Type record of `property`: the class's own, else the nearest
    /// ancestor's.
    pub fn find_type_metadata(&self, target: &ClassId, property: &str) -> Option<&TypeMetadata> {
        self.lineage(target).into_iter().find_map(|id| {
            self.type_metadatas
                .get(&id)
                .and_then(|by_property| by_property.get(property))
        })
    }

    /// Transform steps of `property` active for `direction`, in run order:
    /// farthest ancestor's steps first, the class's own steps last, each list
    /// in declaration order.
    pub fn find_transform_metadatas(
        &self,
        target: &ClassId,
        property: &str,
        direction: Direction,
    ) -> Vec<&TransformStep> {
        self.lineage(target)
            .into_iter()
            .rev()
            .filter_map(|id| {
                self.transform_metadatas
                    .get(&id)
                    .and_then(|by_property| by_property.get(property))
            })
            .flat_map(|meta| meta.steps.iter())
            .filter(|step| step.options.flags.is_active(direction))
            .collect()
    }

    /// Drop every class descriptor, record and cached ancestor chain.
    pub fn clear(&mut self) {
        debug!("clearing metadata storage");
        self.classes.clear();
        self.type_metadatas.clear();
        self.transform_metadatas.clear();
        self.expose_metadatas.clear();
        self.exclude_metadatas.clear();
        self.ancestors
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// The class followed by its ancestors, nearest first.
    fn lineage(&self, target: &ClassId) -> Vec<ClassId> {
        let mut out = vec![target.clone()];
        out.extend(self.ancestors(target).iter().cloned());
        out
    }

    fn hierarchy_records<'s, T>(
        &'s self,
        records: &'s HashMap<ClassId, Vec<T>>,
        target: &ClassId,
        keep: impl Fn(&T) -> bool,
    ) -> Vec<&'s T> {
        self.lineage(target)
            .into_iter()
            .rev()
            .filter_map(|id| records.get(&id))
            .flat_map(|metas| metas.iter())
            .filter(|m| keep(*m))
            .collect()
    }
}

impl fmt::Debug for MetadataStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataStorage")
            .field("classes", &self.classes.len())
            .field("type_metadatas", &self.type_metadatas.len())
            .field("transform_metadatas", &self.transform_metadatas.len())
            .field("expose_metadatas", &self.expose_metadatas.len())
            .field("exclude_metadatas", &self.exclude_metadatas.len())
            .finish()
    }
}

fn validate_flags(record: &MetadataRecord) -> Result<(), MetadataError> {
    let check = |kind: &'static str, property: Option<&str>, flags: &DirectionFlags| match flags
        .ambiguous_flag()
    {
        Some(flag) => Err(MetadataError::AmbiguousDirectionFlag {
            kind,
            target: record.target().clone(),
            property: property.map(str::to_string),
            flag,
        }),
        None => Ok(()),
    };

    match record {
        MetadataRecord::Expose(m) => check("expose", m.property_name.as_deref(), &m.options.flags),
        MetadataRecord::Exclude(m) => {
            check("exclude", m.property_name.as_deref(), &m.options.flags)
        }
        MetadataRecord::Transform(m) => m
            .steps
            .iter()
            .try_for_each(|step| check("transform", Some(&m.property_name), &step.options.flags)),
        MetadataRecord::Type(_) => Ok(()),
    }
}
