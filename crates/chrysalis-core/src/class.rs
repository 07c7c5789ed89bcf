//! Class descriptors.
//!
//! A class is known to the engine only through its descriptor: its parent,
//! the field initializers its constructor would run, its computed properties,
//! the names of its methods, and design-time type hints for its fields.

use crate::metadata::TypeRef;
use crate::value::{Object, Value};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Identity of a class.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ClassId(Arc<str>);

impl ClassId {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ClassId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClassId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ClassId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&ClassId> for ClassId {
    fn from(id: &ClassId) -> Self {
        id.clone()
    }
}

impl From<ClassId> for String {
    fn from(id: ClassId) -> Self {
        id.0.to_string()
    }
}

/// Reads a derived value from an instance.
pub type Getter = Arc<dyn Fn(&Object) -> Value + Send + Sync>;
/// Writes a derived value back into an instance.
pub type Setter = Arc<dyn Fn(&mut Object, Value) + Send + Sync>;
/// Produces the initial value of a field for a fresh instance.
pub type Initializer = Arc<dyn Fn() -> Value + Send + Sync>;

/// A named read-only (or read-write, when a setter is present) derivation.
#[derive(Clone)]
pub struct ComputedProperty {
    pub getter: Getter,
    pub setter: Option<Setter>,
}

impl ComputedProperty {
    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }
}

impl fmt::Debug for ComputedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedProperty")
            .field("read_only", &self.is_read_only())
            .finish_non_exhaustive()
    }
}

/// Descriptor of one class.
#[derive(Clone)]
pub struct ClassDef {
    id: ClassId,
    parent: Option<ClassId>,
    defaults: IndexMap<String, Initializer>,
    computed: IndexMap<String, ComputedProperty>,
    methods: IndexSet<String>,
    hints: IndexMap<String, TypeRef>,
}

impl ClassDef {
    pub fn new(id: impl Into<ClassId>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            defaults: IndexMap::new(),
            computed: IndexMap::new(),
            methods: IndexSet::new(),
            hints: IndexMap::new(),
        }
    }

    pub fn id(&self) -> &ClassId {
        &self.id
    }

    pub fn parent(&self) -> Option<&ClassId> {
        self.parent.as_ref()
    }

    pub fn set_parent(&mut self, parent: impl Into<ClassId>) {
        self.parent = Some(parent.into());
    }

    pub fn add_default(&mut self, property: impl Into<String>, init: Initializer) {
        self.defaults.insert(property.into(), init);
    }

    pub fn add_computed(&mut self, property: impl Into<String>, computed: ComputedProperty) {
        self.computed.insert(property.into(), computed);
    }

    pub fn add_method(&mut self, name: impl Into<String>) {
        self.methods.insert(name.into());
    }

    pub fn add_hint(&mut self, property: impl Into<String>, hint: TypeRef) {
        self.hints.insert(property.into(), hint);
    }

    pub fn computed(&self, property: &str) -> Option<&ComputedProperty> {
        self.computed.get(property)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains(name)
    }

    pub fn hint(&self, property: &str) -> Option<&TypeRef> {
        self.hints.get(property)
    }

    /// Run this class's own field initializers against `object`.
    pub fn initialize(&self, object: &mut Object) {
        for (property, init) in &self.defaults {
            object.set(property.clone(), init());
        }
    }

    /// Fold another descriptor of the same class into this one. Later
    /// declarations win on conflicting names.
    pub fn merge(&mut self, other: ClassDef) {
        if other.parent.is_some() {
            self.parent = other.parent;
        }
        self.defaults.extend(other.defaults);
        self.computed.extend(other.computed);
        self.methods.extend(other.methods);
        self.hints.extend(other.hints);
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("defaults", &self.defaults.keys().collect::<Vec<_>>())
            .field("computed", &self.computed)
            .field("methods", &self.methods)
            .field("hints", &self.hints)
            .finish()
    }
}
