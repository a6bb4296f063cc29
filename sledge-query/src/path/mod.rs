//! Property paths: a small expression language for reading and writing nested data.
//!
//! A path chains accessors, each introduced by its own syntax:
//!
//! | Syntax | Step | Meaning |
//! |--------|------|---------|
//! | `name` / `.name` | [`Step::Any`] | property of an object, or key of an array |
//! | `->name` | [`Step::Property`] | object property only |
//! | `[name]` | [`Step::Element`] | array key only |
//! | `name()` | [`Step::MethodCall`] | zero-argument method call |
//! | `name?`, `->name?`, `[name?]` | `Optional*` | `null` instead of a warning when absent |
//! | `[*]` | [`Step::SubPath`] | evaluate the rest of the path against every element |
//! | `.` | [`Step::SelfReference`] | the data itself |
//!
//! A backslash makes the next character literal (`"a\.b"` reads the key `a.b`).
//!
//! ```rust
//! use sledge_query::path::PropertyPath;
//! use sledge_query::{array, list};
//!
//! let order = array! {
//!     "customer" => array! { "name" => "Ada" },
//!     "items" => list![
//!         array! { "sku" => "A-1", "qty" => 2 },
//!         array! { "sku" => "B-7", "qty" => 1 },
//!     ],
//! };
//!
//! assert_eq!(PropertyPath::get("customer.name", &order).unwrap(), "Ada".into());
//! assert_eq!(
//!     PropertyPath::get("items[*].sku", &order).unwrap(),
//!     list!["A-1", "B-7"],
//! );
//! assert!(PropertyPath::get("customer.email?", &order).unwrap().is_null());
//! ```
//!
//! Parsed paths are memoized process-wide in [`PathCache::global`].

mod cache;
mod parser;
mod tokenizer;

use std::fmt;
use std::sync::Arc;

use tracing::warn;

pub use cache::{PathCache, PathCacheStats};
pub use parser::Steps;

use crate::error::{QueryError, QueryResult};
use crate::value::{Array, Key, Object, Value};

/// One accessor in a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Object property or array key, whichever the data is.
    Any(String),
    /// Object property.
    Property(String),
    /// Array key.
    Element(String),
    /// Zero-argument method call.
    MethodCall(String),
    /// Like [`Step::Any`], but a missing name yields `null`.
    OptionalAny(String),
    /// Like [`Step::Property`], but a missing property yields `null`.
    OptionalProperty(String),
    /// Like [`Step::Element`], but a missing key yields `null`.
    OptionalElement(String),
    /// Remainder of the path after `[*]`, applied to every element.
    SubPath(String),
    /// The data itself.
    SelfReference,
}

impl Step {
    /// Check if the step tolerates a missing name.
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            Self::OptionalAny(_) | Self::OptionalProperty(_) | Self::OptionalElement(_)
        )
    }
}

/// Signature of a compiled path.
pub type CompiledPath = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Outcome of applying a single step to a value.
enum Lookup<'a> {
    Found(&'a Value),
    Computed(Value),
    Absent,
    Mismatch(String),
}

/// A parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    source: String,
    steps: Steps,
}

impl PathExpression {
    /// Parse a path through the global cache.
    pub fn parse(path: &str) -> QueryResult<Arc<PathExpression>> {
        PathCache::global().get_or_parse(path)
    }

    /// Parse a path without consulting any cache.
    pub fn parse_uncached(path: &str) -> QueryResult<PathExpression> {
        Ok(Self {
            source: path.to_string(),
            steps: parser::parse(path)?,
        })
    }

    /// The literal path this was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed steps.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The column name when the path is a single plain accessor (`name`, `->name`
    /// or `[name]`).
    pub fn as_column(&self) -> Option<&str> {
        match self.steps.as_slice() {
            [Step::Any(name)] | [Step::Property(name)] | [Step::Element(name)] => Some(name),
            _ => None,
        }
    }

    /// Read the value at this path.
    ///
    /// Type mismatches and missing non-optional names are logged as warnings and
    /// yield `Null`.
    pub fn get(&self, data: &Value) -> Value {
        self.evaluate(&self.steps, data)
    }

    fn evaluate(&self, steps: &[Step], data: &Value) -> Value {
        let Some((step, rest)) = steps.split_first() else {
            return data.clone();
        };
        match self.lookup(step, data) {
            Lookup::Found(next) => self.evaluate(rest, next),
            Lookup::Computed(next) => self.evaluate(rest, &next),
            Lookup::Absent => Value::Null,
            Lookup::Mismatch(reason) => {
                warn!(path = %self.source, "{}", reason);
                Value::Null
            }
        }
    }

    fn lookup<'a>(&self, step: &Step, data: &'a Value) -> Lookup<'a> {
        match step {
            Step::Any(name) => match data {
                Value::Object(object) => property(object, name, false),
                Value::Array(array) => element(array, name, false),
                other => Lookup::Mismatch(format!(
                    "Unexpected type: {}, expecting an object or array for \"{}\"",
                    other.type_name(),
                    name
                )),
            },
            Step::OptionalAny(name) => match data {
                Value::Null => Lookup::Absent,
                Value::Object(object) => property(object, name, true),
                Value::Array(array) => element(array, name, true),
                other => Lookup::Mismatch(format!(
                    "Unexpected type: {}, expecting an object or array for \"{}\"",
                    other.type_name(),
                    name
                )),
            },
            Step::Property(name) | Step::OptionalProperty(name) => match data {
                Value::Null if step.is_optional() => Lookup::Absent,
                Value::Object(object) => property(object, name, step.is_optional()),
                other => Lookup::Mismatch(format!(
                    "Unexpected type: {}, expecting an object for \"->{}\"",
                    other.type_name(),
                    name
                )),
            },
            Step::Element(name) | Step::OptionalElement(name) => match data {
                Value::Null if step.is_optional() => Lookup::Absent,
                Value::Array(array) => element(array, name, step.is_optional()),
                other => Lookup::Mismatch(format!(
                    "Unexpected type: {}, expecting an array for \"[{}]\"",
                    other.type_name(),
                    name
                )),
            },
            Step::MethodCall(name) => match data {
                Value::Object(object) => match object.call(name) {
                    Some(result) => Lookup::Computed(result),
                    None => Lookup::Mismatch(format!(
                        "Method \"{}\" doesn't exist in a {} object",
                        name,
                        object.class()
                    )),
                },
                other => Lookup::Mismatch(format!(
                    "Unexpected type: {}, expecting an object for \"{}()\"",
                    other.type_name(),
                    name
                )),
            },
            Step::SubPath(subpath) => {
                // Validated while parsing, so this is a cache hit.
                let expression = match PathExpression::parse(subpath) {
                    Ok(expression) => expression,
                    Err(err) => return Lookup::Mismatch(err.message),
                };
                match data {
                    Value::Array(array) => Lookup::Computed(Value::Array(
                        array
                            .iter()
                            .map(|(key, item)| (key.clone(), expression.get(item)))
                            .collect(),
                    )),
                    Value::Object(object) => Lookup::Computed(Value::Array(
                        object
                            .properties()
                            .map(|(name, item)| (Key::from(name.as_str()), expression.get(item)))
                            .collect(),
                    )),
                    other => Lookup::Mismatch(format!(
                        "Unexpected type: {}, expecting an iterable for \"[*]\"",
                        other.type_name()
                    )),
                }
            }
            Step::SelfReference => Lookup::Found(data),
        }
    }

    /// Get a mutable reference to the value at this path.
    ///
    /// Missing keys and properties are created as `Null`, and a `Null` container is
    /// turned into an empty array (`name`, `[name]`) or object (`->name`). Only plain
    /// accessors can be followed this way.
    pub fn get_mut<'a>(&self, data: &'a mut Value) -> QueryResult<&'a mut Value> {
        let mut current = data;
        for step in self.steps.iter() {
            current = self.step_mut(step, current)?;
        }
        Ok(current)
    }

    fn step_mut<'a>(&self, step: &Step, data: &'a mut Value) -> QueryResult<&'a mut Value> {
        match step {
            Step::Any(name) => {
                if data.is_null() {
                    *data = Value::Array(Array::new());
                }
                match data {
                    Value::Object(object) => Ok(object.property_or_null(name)),
                    Value::Array(array) => Ok(array.entry_or_null(Key::from(name.as_str()))),
                    other => Err(self.mismatch(other, "an object or array")),
                }
            }
            Step::Element(name) => {
                if data.is_null() {
                    *data = Value::Array(Array::new());
                }
                match data {
                    Value::Array(array) => Ok(array.entry_or_null(Key::from(name.as_str()))),
                    other => Err(self.mismatch(other, "an array")),
                }
            }
            Step::Property(name) => {
                if data.is_null() {
                    *data = Value::Object(Object::new("stdClass"));
                }
                match data {
                    Value::Object(object) => Ok(object.property_or_null(name)),
                    other => Err(self.mismatch(other, "an object")),
                }
            }
            other => Err(QueryError::not_supported(format!(
                "{:?} can't be followed by reference",
                other
            ))
            .with_path(self.source.clone())),
        }
    }

    fn mismatch(&self, data: &Value, expecting: &str) -> QueryError {
        QueryError::type_mismatch(format!(
            "Unexpected type: {}, expecting {}",
            data.type_name(),
            expecting
        ))
        .with_path(self.source.clone())
    }

    /// Assign `value` at this path, creating intermediate containers as needed.
    pub fn set(&self, data: &mut Value, value: impl Into<Value>) -> QueryResult<()> {
        let value = value.into();
        let Some((last, parents)) = self.steps.split_last() else {
            return Err(QueryError::invalid_path(&self.source, "path is empty"));
        };

        let mut container = data;
        for step in parents {
            container = self.step_mut(step, container)?;
        }

        match last {
            Step::Any(name) | Step::OptionalAny(name) => {
                if container.is_null() {
                    *container = Value::Array(Array::new());
                }
                match container {
                    Value::Object(object) => {
                        object.set(name.clone(), value);
                    }
                    Value::Array(array) => {
                        array.insert(Key::from(name.as_str()), value);
                    }
                    other => return Err(self.mismatch(other, "an object or array")),
                }
            }
            Step::Element(name) | Step::OptionalElement(name) => {
                if container.is_null() {
                    *container = Value::Array(Array::new());
                }
                match container {
                    Value::Array(array) => {
                        array.insert(Key::from(name.as_str()), value);
                    }
                    other => return Err(self.mismatch(other, "an array")),
                }
            }
            Step::Property(name) | Step::OptionalProperty(name) => {
                if container.is_null() {
                    *container = Value::Object(Object::new("stdClass"));
                }
                match container {
                    Value::Object(object) => {
                        object.set(name.clone(), value);
                    }
                    other => return Err(self.mismatch(other, "an object")),
                }
            }
            Step::MethodCall(_) | Step::SubPath(_) | Step::SelfReference => {
                return Err(QueryError::not_supported(format!(
                    "Can't assign through {:?}",
                    last
                ))
                .with_path(self.source.clone()));
            }
        }
        Ok(())
    }
}

fn property<'a>(object: &'a Object, name: &str, optional: bool) -> Lookup<'a> {
    match object.get(name) {
        Some(value) => Lookup::Found(value),
        None if optional => Lookup::Absent,
        None => Lookup::Mismatch(format!(
            "Property \"{}\" doesn't exist in a {} object",
            name,
            object.class()
        )),
    }
}

fn element<'a>(array: &'a Array, name: &str, optional: bool) -> Lookup<'a> {
    match array.get(&Key::from(name)) {
        Some(value) => Lookup::Found(value),
        None if optional => Lookup::Absent,
        None => Lookup::Mismatch(format!("Index \"{}\" not found", name)),
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Static entry points that parse through the global cache.
pub struct PropertyPath;

impl PropertyPath {
    /// Parse a path.
    pub fn parse(path: &str) -> QueryResult<Arc<PathExpression>> {
        PathExpression::parse(path)
    }

    /// Read the value at `path`.
    pub fn get(path: &str, data: &Value) -> QueryResult<Value> {
        Ok(PathExpression::parse(path)?.get(data))
    }

    /// Get a mutable reference to the value at `path`.
    pub fn get_mut<'a>(path: &str, data: &'a mut Value) -> QueryResult<&'a mut Value> {
        PathExpression::parse(path)?.get_mut(data)
    }

    /// Assign `value` at `path`.
    pub fn set(path: &str, value: impl Into<Value>, data: &mut Value) -> QueryResult<()> {
        PathExpression::parse(path)?.set(data, value)
    }

    /// Copy values from `source` into `target`.
    ///
    /// Each mapping pair is `(target_path, source_path)`.
    pub fn map<I, T, S>(source: &Value, target: &mut Value, mapping: I) -> QueryResult<()>
    where
        I: IntoIterator<Item = (T, S)>,
        T: AsRef<str>,
        S: AsRef<str>,
    {
        for (target_path, source_path) in mapping {
            let value = Self::get(source_path.as_ref(), source)?;
            Self::set(target_path.as_ref(), value, target)?;
        }
        Ok(())
    }

    /// Compile `path` into a reusable getter.
    pub fn compile(path: &str) -> QueryResult<CompiledPath> {
        let expression = PathExpression::parse(path)?;
        Ok(Arc::new(move |data: &Value| expression.get(data)))
    }
}
