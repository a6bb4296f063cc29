//! Dynamic values traversed by property paths and held by collections.
//!
//! The framework works on loosely typed data: ordered maps that double as lists,
//! records with properties, and scalars. This module models that data as a closed
//! [`Value`] enum:
//!
//! - [`Array`] is an insertion-ordered `Key -> Value` map that also tracks the next
//!   append index, so it behaves as a list and as a dictionary at the same time.
//! - [`Object`] is a record with named properties and zero-argument methods.
//!
//! ```rust
//! use sledge_query::value::{Array, Key, Value};
//!
//! let mut list = Array::new();
//! list.push("a");
//! list.push("b");
//! assert!(list.is_list());
//!
//! list.insert("name", "sledge");
//! assert!(!list.is_list());
//! assert_eq!(list.get(&Key::from("0")), Some(&Value::from("a")));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

/// A key inside an [`Array`].
///
/// Strings holding a canonical decimal integer (`"7"`, `"-3"`, but not `"07"` or `"+7"`)
/// are normalized to [`Key::Int`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Integer key.
    Int(i64),
    /// String key.
    Str(String),
}

impl Key {
    /// Get the integer value of this key.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Str(_) => None,
        }
    }

    /// Get the string value of this key.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Int(_) => None,
            Self::Str(s) => Some(s),
        }
    }

    /// Convert to a value (`Int` or `String`).
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(i) => Value::Int(*i),
            Self::Str(s) => Value::String(s.clone()),
        }
    }

    /// Build a key from a value, the way array keys are derived from scalars.
    ///
    /// Returns `None` for arrays and objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Str(String::new())),
            Value::Bool(b) => Some(Self::Int(i64::from(*b))),
            Value::Int(i) => Some(Self::Int(*i)),
            Value::Float(f) => Some(Self::Int(f.trunc() as i64)),
            Value::String(s) => Some(Self::from(s.as_str())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

fn canonical_int(s: &str) -> Option<i64> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    if s == "-0" {
        return None;
    }
    s.parse().ok()
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        match canonical_int(s) {
            Some(i) => Self::Int(i),
            None => Self::Str(s.to_string()),
        }
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        match canonical_int(&s) {
            Some(i) => Self::Int(i),
            None => Self::Str(s),
        }
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Self::Int(i as i64)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

/// An insertion-ordered map that doubles as a list.
///
/// Appending with [`Array::push`] uses the next free integer key, which is one past
/// the largest integer key ever inserted (removals never lower it).
#[derive(Debug, Clone, Default)]
pub struct Array {
    entries: IndexMap<Key, Value>,
    next_index: i64,
}

impl Array {
    /// Create an empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty array with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
            next_index: 0,
        }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the array has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a value by key.
    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Look up a value by key for mutation.
    pub fn get_mut(&mut self, key: &Key) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Check if a key is present (a `Null` value still counts as present).
    pub fn contains_key(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace a value, returning the previous one.
    ///
    /// Replacing keeps the entry's position.
    pub fn insert(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        if let Key::Int(i) = key {
            if i >= self.next_index {
                self.next_index = i.saturating_add(1);
            }
        }
        self.entries.insert(key, value.into())
    }

    /// The key [`Array::push`] would use.
    pub fn next_key(&self) -> Key {
        Key::Int(self.next_index)
    }

    /// Append a value under the next free integer key.
    pub fn push(&mut self, value: impl Into<Value>) -> Key {
        let key = self.next_key();
        self.insert(key.clone(), value);
        key
    }

    /// Get the value at `key`, inserting `Null` first when absent.
    pub fn entry_or_null(&mut self, key: Key) -> &mut Value {
        if let Key::Int(i) = key {
            if i >= self.next_index {
                self.next_index = i.saturating_add(1);
            }
        }
        self.entries.entry(key).or_insert(Value::Null)
    }

    /// Remove an entry, preserving the order of the remaining ones.
    pub fn remove(&mut self, key: &Key) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// Iterate over entries in order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, Key, Value> {
        self.entries.iter()
    }

    /// Iterate mutably over entries in order.
    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, Key, Value> {
        self.entries.iter_mut()
    }

    /// Iterate over keys in order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, Key, Value> {
        self.entries.keys()
    }

    /// Iterate over values in order.
    pub fn values(&self) -> indexmap::map::Values<'_, Key, Value> {
        self.entries.values()
    }

    /// First entry.
    pub fn first(&self) -> Option<(&Key, &Value)> {
        self.entries.first()
    }

    /// Last entry.
    pub fn last(&self) -> Option<(&Key, &Value)> {
        self.entries.last()
    }

    /// Check whether keys are exactly `0..len` in order.
    pub fn is_list(&self) -> bool {
        self.entries
            .keys()
            .enumerate()
            .all(|(i, key)| *key == Key::Int(i as i64))
    }

    /// Copy the values into a fresh list, dropping keys.
    pub fn to_list(&self) -> Array {
        self.entries.values().cloned().collect()
    }

    /// Take a slice with array-slice semantics.
    ///
    /// Integer keys are renumbered from zero; string keys are preserved.
    pub fn slice(&self, offset: usize, length: Option<usize>) -> Array {
        let take = length.unwrap_or(usize::MAX);
        let mut sliced = Array::new();
        for (key, value) in self.entries.iter().skip(offset).take(take) {
            match key {
                Key::Int(_) => {
                    sliced.push(value.clone());
                }
                Key::Str(_) => {
                    sliced.insert(key.clone(), value.clone());
                }
            }
        }
        sliced
    }

    /// Reverse the entries.
    ///
    /// With `preserve_keys == false`, integer keys are renumbered from zero.
    pub fn reversed(&self, preserve_keys: bool) -> Array {
        let mut reversed = Array::with_capacity(self.len());
        for (key, value) in self.entries.iter().rev() {
            match key {
                Key::Int(_) if !preserve_keys => {
                    reversed.push(value.clone());
                }
                _ => {
                    reversed.insert(key.clone(), value.clone());
                }
            }
        }
        reversed
    }
}

impl PartialEq for Array {
    /// Arrays are equal when they hold the same entries in the same order.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.entries.iter().eq(other.entries.iter())
    }
}

impl FromIterator<(Key, Value)> for Array {
    fn from_iter<I: IntoIterator<Item = (Key, Value)>>(iter: I) -> Self {
        let mut array = Array::new();
        for (key, value) in iter {
            array.insert(key, value);
        }
        array
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut array = Array::new();
        for value in iter {
            array.push(value);
        }
        array
    }
}

impl IntoIterator for Array {
    type Item = (Key, Value);
    type IntoIter = indexmap::map::IntoIter<Key, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = (&'a Key, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, Key, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A zero-argument method on an [`Object`].
pub type Method = Arc<dyn Fn(&Object) -> Value + Send + Sync>;

/// A record with named properties and callable methods.
#[derive(Clone, Default)]
pub struct Object {
    class: String,
    properties: IndexMap<String, Value>,
    methods: IndexMap<String, Method>,
}

impl Object {
    /// Create an object of the given class with no properties.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            properties: IndexMap::new(),
            methods: IndexMap::new(),
        }
    }

    /// Add a property (builder style).
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Add a method (builder style).
    pub fn with_method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Object) -> Value + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    /// The class name.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Check if a property is declared (a `Null` value still counts).
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Read a property.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Read a property for mutation.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.properties.get_mut(name)
    }

    /// Write a property, declaring it when absent.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties.insert(name.into(), value.into())
    }

    /// Get the property, declaring it as `Null` first when absent.
    pub fn property_or_null(&mut self, name: &str) -> &mut Value {
        self.properties
            .entry(name.to_string())
            .or_insert(Value::Null)
    }

    /// Iterate over properties in declaration order.
    pub fn properties(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.properties.iter()
    }

    /// Check if a method is available.
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Invoke a zero-argument method.
    pub fn call(&self, name: &str) -> Option<Value> {
        self.methods.get(name).map(|method| method(self))
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class
            && self.properties.len() == other.properties.len()
            && self.properties.iter().eq(other.properties.iter())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class)
            .field("properties", &self.properties)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A dynamically typed value.
///
/// `PartialEq` is strict (`Int(1) != Float(1.0)`); loose comparisons live in
/// [`Value::loose_cmp`] and the filter module's `equals`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Null value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// Ordered map / list.
    Array(Array),
    /// Record with properties.
    Object(Object),
}

impl Value {
    /// Check if this is a null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Get the string slice, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the boolean, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the array, if this is an array.
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get the array for mutation, if this is an array.
    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get the object, if this is an object.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get the object for mutation, if this is an object.
    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Check if the value is a number or a numeric string.
    pub fn is_numeric(&self) -> bool {
        match self {
            Self::Int(_) | Self::Float(_) => true,
            Self::String(s) => parse_numeric(s).is_some(),
            _ => false,
        }
    }

    /// Numeric interpretation used by loose comparisons.
    ///
    /// Booleans count as `0/1` and null as `0`; non-numeric strings, arrays and
    /// objects have none.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Null => Some(0.0),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::String(s) => parse_numeric(s),
            Self::Array(_) | Self::Object(_) => None,
        }
    }

    /// Boolean interpretation.
    pub fn truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty() && s != "0",
            Self::Array(a) => !a.is_empty(),
            Self::Object(_) => true,
        }
    }

    /// String conversion following scalar-to-string casting rules.
    pub fn to_php_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(true) => "1".to_string(),
            Self::Bool(false) => String::new(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::String(s) => s.clone(),
            Self::Array(_) => "Array".to_string(),
            Self::Object(o) => o.class().to_string(),
        }
    }

    /// Ordering with loose type juggling.
    ///
    /// Not transitive across types (`null == 0`, `null < -1`, `-1 < 0`), so don't
    /// hand it to `slice::sort_by`. Numbers and numeric strings compare numerically, other strings byte-wise,
    /// booleans and null against non-strings compare by truthiness, arrays by length.
    pub fn loose_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => match (parse_numeric(a), parse_numeric(b)) {
                (Some(x), Some(y)) => cmp_f64(x, y),
                _ => a.cmp(b),
            },
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, Self::String(s)) => "".cmp(s.as_str()),
            (Self::String(s), Self::Null) => s.as_str().cmp(""),
            (Self::Bool(_), _) | (_, Self::Bool(_)) | (Self::Null, _) | (_, Self::Null) => {
                self.truthy().cmp(&other.truthy())
            }
            (Self::Array(a), Self::Array(b)) => a.len().cmp(&b.len()),
            (Self::Array(_), _) => Ordering::Greater,
            (_, Self::Array(_)) => Ordering::Less,
            (Self::Object(_), Self::Object(_)) => Ordering::Equal,
            (Self::Object(_), _) => Ordering::Greater,
            (_, Self::Object(_)) => Ordering::Less,
            _ => match (self.as_number(), other.as_number()) {
                (Some(x), Some(y)) => cmp_f64(x, y),
                _ => self.to_php_string().cmp(&other.to_php_string()),
            },
        }
    }

    /// Convert to JSON. Lists become JSON arrays, keyed arrays and objects JSON objects.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::Number((*i).into()),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Self::String(s) => Json::String(s.clone()),
            Self::Array(a) if a.is_list() => Json::Array(a.values().map(Value::to_json).collect()),
            Self::Array(a) => Json::Object(
                a.iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
            Self::Object(o) => Json::Object(
                o.properties()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Parse a numeric string (optional surrounding whitespace, sign, decimals, exponent).
pub fn parse_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    let body = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('+'))
        .unwrap_or(trimmed);
    if !body.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

pub(crate) fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NAN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    if f.fract() == 0.0 && f.abs() < 1e15 {
        return format!("{}", f as i64);
    }
    format!("{}", f)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_php_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Self {
        Self::Array(v)
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Self::Object(v)
    }
}

impl From<Key> for Value {
    fn from(k: Key) -> Self {
        k.to_value()
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(0.0)),
            },
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Self::Array(
                map.into_iter()
                    .map(|(k, v)| (Key::from(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_key_normalization() {
        assert_eq!(Key::from("12"), Key::Int(12));
        assert_eq!(Key::from("-3"), Key::Int(-3));
        assert_eq!(Key::from("012"), Key::Str("012".into()));
        assert_eq!(Key::from("-0"), Key::Str("-0".into()));
        assert_eq!(Key::from("+1"), Key::Str("+1".into()));
        assert_eq!(Key::from("1.5"), Key::Str("1.5".into()));
        assert_eq!(Key::from("name"), Key::Str("name".into()));
    }

    #[test]
    fn test_push_uses_next_index() {
        let mut array = Array::new();
        array.insert(5, "five");
        assert_eq!(array.push("six"), Key::Int(6));

        array.remove(&Key::Int(6));
        assert_eq!(array.push("seven"), Key::Int(7));
    }

    #[test]
    fn test_push_after_negative_key() {
        let mut array = Array::new();
        array.insert(-5, "neg");
        assert_eq!(array.push("first"), Key::Int(0));
    }

    #[test]
    fn test_is_list() {
        let list: Array = vec![Value::from(1), Value::from(2)].into_iter().collect();
        assert!(list.is_list());

        let mut keyed = list.clone();
        keyed.remove(&Key::Int(0));
        assert!(!keyed.is_list());
        assert!(Array::new().is_list());
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let mut a = Array::new();
        a.insert("x", 1);
        a.insert("y", 2);
        let mut b = Array::new();
        b.insert("y", 2);
        b.insert("x", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_slice_renumbers_int_keys() {
        let mut array = Array::new();
        array.insert(10, "a");
        array.insert("name", "b");
        array.insert(11, "c");

        let sliced = array.slice(1, None);
        let mut expected = Array::new();
        expected.insert("name", "b");
        expected.insert(0, "c");
        assert_eq!(sliced, expected);
    }

    #[test]
    fn test_reversed() {
        let list: Array = vec![Value::from(1), Value::from(2), Value::from(3)]
            .into_iter()
            .collect();
        let reversed = list.reversed(false);
        assert_eq!(
            reversed,
            vec![3, 2, 1].into_iter().map(Value::from).collect::<Array>()
        );

        let kept = list.reversed(true);
        assert_eq!(kept.first(), Some((&Key::Int(2), &Value::Int(3))));
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric("42"), Some(42.0));
        assert_eq!(parse_numeric(" 1.5 "), Some(1.5));
        assert_eq!(parse_numeric("-1e3"), Some(-1000.0));
        assert_eq!(parse_numeric(".5"), Some(0.5));
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("abc"), None);
        assert_eq!(parse_numeric("inf"), None);
        assert_eq!(parse_numeric("12abc"), None);
    }

    #[test]
    fn test_to_php_string() {
        assert_eq!(Value::Null.to_php_string(), "");
        assert_eq!(Value::Bool(true).to_php_string(), "1");
        assert_eq!(Value::Float(2.0).to_php_string(), "2");
        assert_eq!(Value::Float(1.5).to_php_string(), "1.5");
    }

    #[test]
    fn test_loose_cmp() {
        assert_eq!(Value::from("10").loose_cmp(&Value::from("9")), Ordering::Greater);
        assert_eq!(Value::from("apple").loose_cmp(&Value::from("banana")), Ordering::Less);
        assert_eq!(Value::from(2).loose_cmp(&Value::from(2.5)), Ordering::Less);
        assert_eq!(Value::from("3").loose_cmp(&Value::from(3)), Ordering::Equal);
        assert_eq!(Value::Null.loose_cmp(&Value::from(0)), Ordering::Equal);
        assert_eq!(Value::Null.loose_cmp(&Value::from("a")), Ordering::Less);
    }

    #[test]
    fn test_json_round_trip_shapes() {
        let json = serde_json::json!({"id": 1, "tags": ["a", "b"], "0": true});
        let value = Value::from(json);
        let array = value.as_array().unwrap();
        assert_eq!(array.get(&Key::Int(0)), Some(&Value::Bool(true)));
        assert!(array.get(&Key::from("tags")).unwrap().as_array().unwrap().is_list());
        assert_eq!(value.to_json()["id"], serde_json::json!(1));
    }

    #[test]
    fn test_object_methods() {
        let object = Object::new("User")
            .with_property("first", "Ada")
            .with_method("shout", |o| {
                Value::from(o.get("first").map(|v| v.to_php_string().to_uppercase()))
            });
        assert!(object.has_method("shout"));
        assert_eq!(object.call("shout"), Some(Value::from("ADA")));
        assert_eq!(object.call("missing"), None);
    }
}
