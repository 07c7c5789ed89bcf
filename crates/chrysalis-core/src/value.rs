//! Values: the object graph the engine walks.
//!
//! Plain data and typed instances share one representation. An object is
//! plain when it carries no class and an instance when it does. Objects have
//! identity (they live behind an `Rc`), everything else is copied by value.

use crate::class::ClassId;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to an object. Two handles to the same allocation are the
/// same object.
pub type ObjectRef = Rc<RefCell<Object>>;

/// A JSON-like value extended with identity-bearing objects, dates, sets and
/// maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// An absent slot. Distinct from `Null`.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<Value>),
    /// Insertion-ordered collection without duplicates (by [`Value::same_value`]).
    Set(Vec<Value>),
    /// Keyed collection. Unlike objects, map keys are never filtered by
    /// expose/exclude rules.
    Map(IndexMap<String, Value>),
    Object(ObjectRef),
}

/// An object node: an optional class tag plus ordered own fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    class: Option<ClassId>,
    fields: IndexMap<String, Value>,
}

impl Object {
    /// Create an empty plain object.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Create an empty instance of `class`.
    ///
    /// This does not run field initializers; use
    /// [`MetadataStorage::instantiate`](crate::MetadataStorage::instantiate) for that.
    pub fn instance(class: impl Into<ClassId>) -> Self {
        Self {
            class: Some(class.into()),
            fields: IndexMap::new(),
        }
    }

    pub fn class(&self) -> Option<&ClassId> {
        self.class.as_ref()
    }

    pub fn is_plain(&self) -> bool {
        self.class.is_none()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Set a field. An existing key keeps its position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Remove a field, preserving the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    /// Own keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_ref(self) -> ObjectRef {
        Rc::new(RefCell::new(self))
    }
}

impl Value {
    /// Build a plain object from key/value pairs.
    pub fn plain<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        let mut object = Object::plain();
        for (key, value) in fields {
            object.set(key, value);
        }
        Value::Object(object.into_ref())
    }

    /// Build an instance of `class` from key/value pairs.
    pub fn instance<K: Into<String>>(
        class: impl Into<ClassId>,
        fields: impl IntoIterator<Item = (K, Value)>,
    ) -> Self {
        let mut object = Object::instance(class);
        for (key, value) in fields {
            object.set(key, value);
        }
        Value::Object(object.into_ref())
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(items.into_iter().collect())
    }

    /// Build a set, dropping duplicates.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        let mut out = Vec::new();
        for item in items {
            set_insert(&mut out, item);
        }
        Value::Set(out)
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `null` or `undefined`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    /// Arrays and sets.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Set(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }

    /// Items of an array or set.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Read a field of an object or an entry of a map. Missing keys and
    /// non-keyed values read as `Undefined`.
    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(obj) => obj.borrow().get(key).cloned().unwrap_or_default(),
            Value::Map(entries) => entries.get(key).cloned().unwrap_or_default(),
            _ => Value::Undefined,
        }
    }

    /// Read an element of an array or set.
    pub fn index(&self, index: usize) -> Value {
        self.as_sequence()
            .and_then(|items| items.get(index))
            .cloned()
            .unwrap_or_default()
    }

    /// Own keys of an object or map, in order.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Value::Object(obj) => obj.borrow().keys().map(str::to_string).collect(),
            Value::Map(entries) => entries.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Class of an instance; `None` for plain objects and non-objects.
    pub fn class_id(&self) -> Option<ClassId> {
        self.as_object().and_then(|obj| obj.borrow().class().cloned())
    }

    /// Address of the underlying object, used as its identity.
    pub fn object_id(&self) -> Option<usize> {
        self.as_object().map(|obj| Rc::as_ptr(obj) as *const () as usize)
    }

    /// Identity comparison: objects compare by reference, `NaN` equals
    /// itself, everything else compares structurally. Containers compare
    /// element-wise with the same rule, so nested objects are never entered.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Float(a), Value::Float(b)) if a.is_nan() && b.is_nan() => true,
            (Value::Array(a), Value::Array(b)) | (Value::Set(a), Value::Set(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_value(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, x)| b.get(key).is_some_and(|y| x.same_value(y)))
            }
            _ => self == other,
        }
    }

    /// Loose string coercion.
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => js_number_string(*n),
            Value::String(s) => s.clone(),
            Value::Date(d) => format_date(d),
            Value::Array(items) | Value::Set(items) => items
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Map(_) => "[object Map]".into(),
            Value::Object(_) => "[object Object]".into(),
        }
    }

    /// Loose numeric coercion. Integral results come back as `Int`,
    /// anything non-numeric as `Float(NaN)`.
    pub fn to_js_number(&self) -> Value {
        match self {
            Value::Undefined => Value::Float(f64::NAN),
            Value::Null => Value::Int(0),
            Value::Bool(b) => Value::Int(i64::from(*b)),
            Value::Int(_) | Value::Float(_) => self.clone(),
            Value::String(s) => parse_js_number(s),
            Value::Date(d) => Value::Int(d.timestamp_millis()),
            Value::Array(items) => match items.as_slice() {
                [] => Value::Int(0),
                [single] => single.to_js_number(),
                _ => Value::Float(f64::NAN),
            },
            Value::Set(_) | Value::Map(_) | Value::Object(_) => Value::Float(f64::NAN),
        }
    }

    /// Loose truthiness.
    pub fn to_js_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Interpret the value as a point in time: dates, epoch milliseconds, or
    /// date strings (RFC 3339, `YYYY-MM-DD`, or a naive UTC date-time).
    pub fn to_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Int(ms) => Utc.timestamp_millis_opt(*ms).single(),
            Value::Float(ms) if ms.is_finite() => Utc.timestamp_millis_opt(*ms as i64).single(),
            Value::String(s) => parse_date(s.trim()),
            _ => None,
        }
    }
}

/// Insert into a set-shaped vector unless an identical value is present.
pub(crate) fn set_insert(items: &mut Vec<Value>, value: Value) {
    if !items.iter().any(|existing| existing.same_value(&value)) {
        items.push(value);
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub(crate) fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn js_number_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n == 0.0 {
        "0".into()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let exp = format!("{:e}", n);
        match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => {
                format!("{}e+{}", mantissa, power)
            }
            _ => exp,
        }
    } else if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

fn number_value(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::Int(n as i64)
    } else {
        Value::Float(n)
    }
}

fn parse_js_number(raw: &str) -> Value {
    let s = raw.trim();
    if s.is_empty() {
        return Value::Int(0);
    }
    match s {
        "Infinity" | "+Infinity" => return Value::Float(f64::INFINITY),
        "-Infinity" => return Value::Float(f64::NEG_INFINITY),
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        let Some(digits) = strip_prefix_ignore_case(s, prefix) else {
            continue;
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Value::Float(f64::NAN);
        }
        return u128::from_str_radix(digits, radix)
            .map(|n| number_value(n as f64))
            .unwrap_or(Value::Float(f64::NAN));
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return Value::Float(f64::NAN);
    }
    if let Ok(n) = s.parse::<i64>() {
        return Value::Int(n);
    }
    s.parse::<f64>()
        .map(number_value)
        .unwrap_or(Value::Float(f64::NAN))
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj.into_ref())
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(arr: Vec<T>) -> Self {
        Value::Array(arr.into_iter().map(Into::into).collect())
    }
}
