//! Lazily materialized collections with LINQ-style operators.
//!
//! A [`Collection`] wraps an [`Array`], a lazy iterator or a deferred loader. The
//! first operation that needs random access, a count or a mutation materializes the
//! source into an array; that conversion happens once.
//!
//! Operators return new collections and never touch the receiver. Key handling
//! follows the dual list/map nature of [`Array`]: operators that reorder or drop
//! elements renumber the keys of a list (`0..n-1`) but keep the keys of a map.
//!
//! ```rust
//! use sledge_query::collection::Collection;
//! use sledge_query::filter::Conditions;
//! use sledge_query::{array, list};
//!
//! let fruit = Collection::from(list![
//!     array! { "name" => "pear", "price" => 3 },
//!     array! { "name" => "apple", "price" => 1 },
//!     array! { "name" => "kiwi", "price" => 2 },
//! ]);
//!
//! let names = fruit
//!     .where_(Conditions::all([("price >", 1)]))
//!     .unwrap()
//!     .order_by("price", Default::default())
//!     .unwrap()
//!     .select("name", Default::default())
//!     .unwrap();
//!
//! assert_eq!(names.to_array().unwrap(), list!["kiwi", "pear"].as_array().cloned().unwrap());
//! ```

mod events;
mod sort;

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

pub use events::{CollectionEvent, EventKind};
pub use sort::{SortMethod, natural_cmp};

use sort::merge_sort_by;

use events::Listeners;

use crate::database::Statement;
use crate::error::{QueryError, QueryResult};
use crate::filter::{Conditions, Filter};
use crate::path::{PathExpression, PropertyPath};
use crate::value::{Array, Key, Value};

/// Closure mapping an element and its key to a value.
pub type Projection = Rc<dyn Fn(&Value, &Key) -> Value>;

/// What `select` and `order_by` project each element to.
#[derive(Clone)]
pub enum Selector {
    /// A property path (`"."` is the element itself).
    Path(String),
    /// `(target_path, source_path)` pairs copied into a fresh array per element.
    Mapping(Vec<(String, String)>),
    /// A closure over `(item, key)`.
    Closure(Projection),
}

impl Selector {
    /// Wrap a closure.
    pub fn closure<F>(f: F) -> Self
    where
        F: Fn(&Value, &Key) -> Value + 'static,
    {
        Self::Closure(Rc::new(f))
    }

    /// Build a mapping selector from `(target_path, source_path)` pairs.
    pub fn mapping<I, T, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, S)>,
        T: Into<String>,
        S: Into<String>,
    {
        Self::Mapping(
            pairs
                .into_iter()
                .map(|(target, source)| (target.into(), source.into()))
                .collect(),
        )
    }

    fn compile(&self) -> QueryResult<CompiledSelector<'_>> {
        Ok(match self {
            Self::Path(path) => CompiledSelector::Path(PathExpression::parse(path)?),
            Self::Mapping(pairs) => {
                // Parse up front so malformed paths fail before any element is visited.
                for (target, source) in pairs {
                    PathExpression::parse(target)?;
                    PathExpression::parse(source)?;
                }
                CompiledSelector::Mapping(pairs)
            }
            Self::Closure(f) => CompiledSelector::Closure(f),
        })
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::Path(".".to_string())
    }
}

impl From<&str> for Selector {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for Selector {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Mapping(pairs) => f.debug_tuple("Mapping").field(pairs).finish(),
            Self::Closure(_) => f.write_str("Closure(<closure>)"),
        }
    }
}

enum CompiledSelector<'a> {
    Path(std::sync::Arc<PathExpression>),
    Mapping(&'a [(String, String)]),
    Closure(&'a Projection),
}

impl CompiledSelector<'_> {
    fn apply(&self, item: &Value, key: &Key) -> QueryResult<Value> {
        match self {
            Self::Path(path) => Ok(path.get(item)),
            Self::Mapping(pairs) => {
                let mut target = Value::Array(Array::new());
                PropertyPath::map(item, &mut target, pairs.iter().map(|(t, s)| (t, s)))?;
                Ok(target)
            }
            Self::Closure(f) => Ok(f(item, key)),
        }
    }
}

/// How `select` derives the keys of its result.
#[derive(Clone, Default)]
pub enum KeySelector {
    /// Keep the original keys.
    #[default]
    Preserve,
    /// Number the results `0..n-1`.
    Reindex,
    /// Use the value at a path of each element.
    Path(String),
    /// Compute the key with a closure over `(item, key)`.
    Closure(Projection),
}

impl KeySelector {
    /// Wrap a closure.
    pub fn closure<F>(f: F) -> Self
    where
        F: Fn(&Value, &Key) -> Value + 'static,
    {
        Self::Closure(Rc::new(f))
    }
}

impl From<&str> for KeySelector {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl fmt::Debug for KeySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preserve => f.write_str("Preserve"),
            Self::Reindex => f.write_str("Reindex"),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Closure(_) => f.write_str("Closure(<closure>)"),
        }
    }
}

type Loader = Box<dyn Fn() -> QueryResult<Array>>;

enum Source {
    Array(Array),
    Iter {
        iter: Box<dyn Iterator<Item = (Key, Value)>>,
        /// Set when no two pairs can share a key.
        unique_keys: bool,
    },
    Deferred(Loader),
}

/// A lazily materialized sequence of keyed values.
pub struct Collection {
    source: RefCell<Source>,
    listeners: Listeners,
}

impl Collection {
    /// Wrap an array.
    pub fn new(data: Array) -> Self {
        Self::with_source(Source::Array(data))
    }

    /// Wrap an iterator of key/value pairs, read on first use.
    ///
    /// Later pairs overwrite earlier pairs with the same key.
    pub fn lazy<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (Key, Value)>,
        I::IntoIter: 'static,
    {
        Self::with_source(Source::Iter {
            iter: Box::new(iter.into_iter()),
            unique_keys: false,
        })
    }

    /// Wrap an iterator of values, keyed `0..n-1`.
    pub fn lazy_values<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: 'static,
    {
        Self::with_source(Source::Iter {
            iter: Box::new(
                iter.into_iter()
                    .enumerate()
                    .map(|(i, value)| (Key::from(i), value)),
            ),
            unique_keys: true,
        })
    }

    /// Load the data with `loader` on first use.
    ///
    /// A failed load is reported to the caller and retried on the next access.
    pub fn deferred<F>(loader: F) -> Self
    where
        F: Fn() -> QueryResult<Array> + 'static,
    {
        Self::with_source(Source::Deferred(Box::new(loader)))
    }

    /// Build a collection from an array or an object's properties.
    pub fn from_value(value: Value) -> QueryResult<Self> {
        match value {
            Value::Array(array) => Ok(Self::new(array)),
            Value::Object(object) => Ok(Self::new(
                object
                    .properties()
                    .map(|(name, value)| (Key::from(name.as_str()), value.clone()))
                    .collect(),
            )),
            other => Err(QueryError::type_mismatch(format!(
                "A collection needs an array, object or iterator, got {}",
                other.type_name()
            ))),
        }
    }

    fn with_source(source: Source) -> Self {
        Self {
            source: RefCell::new(source),
            listeners: Listeners::default(),
        }
    }

    /// Check if the source has been read into an array.
    pub fn is_materialized(&self) -> bool {
        matches!(&*self.source.borrow(), Source::Array(_))
    }

    /// Read the source into an array. Later calls are no-ops.
    pub fn materialize(&self) -> QueryResult<()> {
        let mut source = self.source.borrow_mut();
        let loaded = match &mut *source {
            Source::Array(_) => return Ok(()),
            Source::Iter { iter, .. } => iter.by_ref().collect::<Array>(),
            Source::Deferred(loader) => loader()?,
        };
        trace!(len = loaded.len(), "Materialized collection");
        *source = Source::Array(loaded);
        Ok(())
    }

    fn data(&self) -> QueryResult<Ref<'_, Array>> {
        self.materialize()?;
        Ref::filter_map(self.source.borrow(), |source| match source {
            Source::Array(array) => Some(array),
            _ => None,
        })
        .map_err(|_| QueryError::internal("collection source was not materialized"))
    }

    fn data_mut(&mut self) -> QueryResult<&mut Array> {
        self.materialize()?;
        match self.source.get_mut() {
            Source::Array(array) => Ok(array),
            _ => Err(QueryError::internal("collection source was not materialized")),
        }
    }

    /// Replace the data, discarding any unread source. Listeners are kept.
    pub(crate) fn replace_source_with(&mut self, loader: Loader) {
        *self.source.get_mut() = Source::Deferred(loader);
    }

    // ============== Conversion ==============

    /// Copy the data into an array.
    pub fn to_array(&self) -> QueryResult<Array> {
        Ok(self.data()?.clone())
    }

    /// Take the data as an array.
    pub fn into_array(self) -> QueryResult<Array> {
        self.materialize()?;
        match self.source.into_inner() {
            Source::Array(array) => Ok(array),
            _ => Err(QueryError::internal("collection source was not materialized")),
        }
    }

    /// Clone the collection.
    ///
    /// The source is materialized first so that the copies never share iterator
    /// state; listeners are copied too.
    pub fn try_clone(&self) -> QueryResult<Self> {
        let data = self.to_array()?;
        Ok(Self {
            source: RefCell::new(Source::Array(data)),
            listeners: self.listeners.clone(),
        })
    }

    /// Iterate over a snapshot of the entries.
    pub fn iter(&self) -> QueryResult<indexmap::map::IntoIter<Key, Value>> {
        Ok(self.to_array()?.into_iter())
    }

    // ============== Inspection ==============

    /// Number of elements.
    ///
    /// A [`Collection::lazy_values`] iterator that knows its exact length is counted
    /// without being read. Keyed iterators may repeat keys, so they are read first.
    pub fn count(&self) -> QueryResult<usize> {
        if let Source::Iter {
            iter,
            unique_keys: true,
        } = &*self.source.borrow()
        {
            if let (lower, Some(upper)) = iter.size_hint() {
                if lower == upper {
                    return Ok(lower);
                }
            }
        }
        Ok(self.data()?.len())
    }

    /// Check if there are no elements.
    pub fn is_empty(&self) -> QueryResult<bool> {
        Ok(self.count()? == 0)
    }

    /// The keys, in order.
    pub fn keys(&self) -> QueryResult<Vec<Key>> {
        Ok(self.data()?.keys().cloned().collect())
    }

    /// The values, in order.
    pub fn values(&self) -> QueryResult<Vec<Value>> {
        Ok(self.data()?.values().cloned().collect())
    }

    /// The first element.
    pub fn first(&self) -> QueryResult<Option<Value>> {
        Ok(self.data()?.first().map(|(_, value)| value.clone()))
    }

    /// The last element.
    pub fn last(&self) -> QueryResult<Option<Value>> {
        Ok(self.data()?.last().map(|(_, value)| value.clone()))
    }

    /// Check if a key exists.
    pub fn contains_key(&self, key: impl Into<Key>) -> QueryResult<bool> {
        Ok(self.data()?.contains_key(&key.into()))
    }

    /// Read the element at `key`.
    pub fn get(&self, key: impl Into<Key>) -> QueryResult<Option<Value>> {
        Ok(self.data()?.get(&key.into()).cloned())
    }

    // ============== Projection ==============

    /// Project every element through `selector`.
    ///
    /// ```rust
    /// use sledge_query::collection::{Collection, KeySelector};
    /// use sledge_query::{array, list};
    ///
    /// let users = Collection::from(list![
    ///     array! { "id" => 7, "name" => "Ada" },
    ///     array! { "id" => 9, "name" => "Grace" },
    /// ]);
    /// let by_id = users.select("name", KeySelector::from("id")).unwrap();
    /// assert_eq!(
    ///     by_id.to_array().unwrap(),
    ///     array! { 7 => "Ada", 9 => "Grace" }.as_array().cloned().unwrap(),
    /// );
    /// ```
    pub fn select(
        &self,
        selector: impl Into<Selector>,
        key_selector: KeySelector,
    ) -> QueryResult<Collection> {
        let selector = selector.into();
        let compiled = selector.compile()?;
        let key_path = match &key_selector {
            KeySelector::Path(path) => Some(PathExpression::parse(path)?),
            _ => None,
        };

        let data = self.data()?;
        let mut result = Array::with_capacity(data.len());
        for (key, item) in data.iter() {
            let value = compiled.apply(item, key)?;
            match &key_selector {
                KeySelector::Preserve => {
                    result.insert(key.clone(), value);
                }
                KeySelector::Reindex => {
                    result.push(value);
                }
                KeySelector::Path(_) => {
                    let raw = key_path.as_ref().map(|p| p.get(item)).unwrap_or_default();
                    result.insert(to_key(&raw)?, value);
                }
                KeySelector::Closure(f) => {
                    result.insert(to_key(&f(item, key))?, value);
                }
            }
        }
        Ok(Collection::new(result))
    }

    /// Re-key the elements without changing them.
    pub fn select_key(&self, key_selector: KeySelector) -> QueryResult<Collection> {
        self.select(Selector::default(), key_selector)
    }

    /// Apply `f` to every value. Keys are not kept.
    pub fn map<F>(&self, f: F) -> QueryResult<Collection>
    where
        F: Fn(&Value) -> Value,
    {
        Ok(Collection::new(self.data()?.values().map(f).collect()))
    }

    /// Fold the values left to right.
    pub fn reduce<F>(&self, f: F, initial: impl Into<Value>) -> QueryResult<Value>
    where
        F: Fn(Value, &Value) -> Value,
    {
        Ok(self.data()?.values().fold(initial.into(), f))
    }

    // ============== Filtering ==============

    /// Keep the elements matching `conditions`.
    ///
    /// An element whose key equals its position is renumbered; any other key is
    /// kept.
    pub fn where_(&self, conditions: impl Into<Conditions>) -> QueryResult<Collection> {
        let filter = Filter::build(&conditions.into())?;
        let data = self.data()?;
        let mut result = Array::new();
        for (position, (key, item)) in data.iter().enumerate() {
            if !filter.matches(item, key)? {
                continue;
            }
            if *key == Key::from(position) {
                result.push(item.clone());
            } else {
                result.insert(key.clone(), item.clone());
            }
        }
        debug!(input = data.len(), output = result.len(), "Filtered collection");
        Ok(Collection::new(result))
    }

    /// The first element matching `conditions`.
    ///
    /// Without a match this is an error unless `allow_none` is set.
    pub fn find(
        &self,
        conditions: impl Into<Conditions>,
        allow_none: bool,
    ) -> QueryResult<Option<Value>> {
        let filter = Filter::build(&conditions.into())?;
        for (key, item) in self.data()?.iter() {
            if filter.matches(item, key)? {
                return Ok(Some(item.clone()));
            }
        }
        if allow_none {
            Ok(None)
        } else {
            Err(QueryError::no_match("find"))
        }
    }

    /// The key of the first element matching `conditions`.
    pub fn index_of(&self, conditions: impl Into<Conditions>) -> QueryResult<Option<Key>> {
        let filter = Filter::build(&conditions.into())?;
        for (key, item) in self.data()?.iter() {
            if filter.matches(item, key)? {
                return Ok(Some(key.clone()));
            }
        }
        Ok(None)
    }

    /// Remove every element matching `conditions`.
    ///
    /// A list is renumbered afterwards. Without a match this is an error unless
    /// `allow_none` is set. Returns whether anything was removed.
    pub fn remove(&mut self, conditions: impl Into<Conditions>, allow_none: bool) -> QueryResult<bool> {
        let filter = Filter::build(&conditions.into())?;
        let (was_list, matched) = {
            let data = self.data()?;
            let mut matched = Vec::new();
            for (key, item) in data.iter() {
                if filter.matches(item, key)? {
                    matched.push(key.clone());
                }
            }
            (data.is_list(), matched)
        };

        if matched.is_empty() {
            return if allow_none {
                Ok(false)
            } else {
                Err(QueryError::no_match("remove"))
            };
        }

        for key in &matched {
            self.unset(key.clone())?;
        }
        if was_list {
            let data = self.data_mut()?;
            *data = data.to_list();
        }
        debug!(removed = matched.len(), "Removed elements from collection");
        Ok(true)
    }

    // ============== Ordering ==============

    /// Sort by the value `selector` projects each element to.
    ///
    /// The sort is stable. A list comes back renumbered, a map keeps its keys.
    pub fn order_by(
        &self,
        selector: impl Into<Selector>,
        method: SortMethod,
    ) -> QueryResult<Collection> {
        let selector = selector.into();
        let compiled = selector.compile()?;
        let data = self.data()?;

        let mut entries = Vec::with_capacity(data.len());
        for (key, item) in data.iter() {
            entries.push((compiled.apply(item, key)?, key, item));
        }
        let entries = merge_sort_by(entries, |a, b| method.compare(&a.0, &b.0));

        let mut result = Array::with_capacity(entries.len());
        if data.is_list() {
            for (_, _, item) in entries {
                result.push(item.clone());
            }
        } else {
            for (_, key, item) in entries {
                result.insert(key.clone(), item.clone());
            }
        }
        Ok(Collection::new(result))
    }

    /// Sort descending: [`Collection::order_by`] followed by [`Collection::reverse`].
    pub fn order_by_descending(
        &self,
        selector: impl Into<Selector>,
        method: SortMethod,
    ) -> QueryResult<Collection> {
        self.order_by(selector, method)?.reverse()
    }

    /// Reverse the order. A list comes back renumbered, a map keeps its keys.
    pub fn reverse(&self) -> QueryResult<Collection> {
        let data = self.data()?;
        Ok(Collection::new(data.reversed(!data.is_list())))
    }

    /// Skip the first `offset` elements.
    pub fn skip(&self, offset: usize) -> QueryResult<Collection> {
        Ok(Collection::new(self.data()?.slice(offset, None)))
    }

    /// Keep the first `length` elements.
    pub fn take(&self, length: usize) -> QueryResult<Collection> {
        Ok(Collection::new(self.data()?.slice(0, Some(length))))
    }

    // ============== Aggregates ==============

    /// The largest projected value, or `Null` when empty.
    pub fn max(&self, selector: impl Into<Selector>) -> QueryResult<Value> {
        self.extreme(selector.into(), std::cmp::Ordering::Greater)
    }

    /// The smallest projected value, or `Null` when empty.
    pub fn min(&self, selector: impl Into<Selector>) -> QueryResult<Value> {
        self.extreme(selector.into(), std::cmp::Ordering::Less)
    }

    fn extreme(&self, selector: Selector, wanted: std::cmp::Ordering) -> QueryResult<Value> {
        let compiled = selector.compile()?;
        let mut best: Option<Value> = None;
        for (key, item) in self.data()?.iter() {
            let value = compiled.apply(item, key)?;
            let better = match &best {
                None => true,
                Some(current) => value.loose_cmp(current) == wanted,
            };
            if better {
                best = Some(value);
            }
        }
        Ok(best.unwrap_or_default())
    }

    // ============== Mutation ==============

    /// Register a listener for mutation events.
    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> &mut Self
    where
        F: Fn(&CollectionEvent) + 'static,
    {
        self.listeners.add(kind, Rc::new(listener));
        self
    }

    /// Store `value` at `key`, or append it when `key` is `None`.
    ///
    /// Fires `adding`, then `removing`/`removed` around the write when a value is
    /// replaced, then `added`. Writing a value identical to the stored one does
    /// nothing.
    pub fn set(&mut self, key: Option<Key>, value: impl Into<Value>) -> QueryResult<()> {
        let value = value.into();
        let (key, old) = {
            let data = self.data_mut()?;
            let key = key.unwrap_or_else(|| data.next_key());
            let old = data.get(&key).cloned();
            (key, old)
        };
        if old.as_ref() == Some(&value) {
            return Ok(());
        }

        self.listeners.fire(EventKind::Adding, &key, &value);
        if let Some(old) = &old {
            self.listeners.fire(EventKind::Removing, &key, old);
        }
        self.data_mut()?.insert(key.clone(), value.clone());
        if let Some(old) = &old {
            self.listeners.fire(EventKind::Removed, &key, old);
        }
        self.listeners.fire(EventKind::Added, &key, &value);
        Ok(())
    }

    /// Append `value`.
    pub fn push(&mut self, value: impl Into<Value>) -> QueryResult<()> {
        self.set(None, value)
    }

    /// Delete the element at `key`, firing `removing` and `removed`.
    pub fn unset(&mut self, key: impl Into<Key>) -> QueryResult<Option<Value>> {
        let key = key.into();
        let Some(old) = self.data_mut()?.get(&key).cloned() else {
            return Ok(None);
        };
        self.listeners.fire(EventKind::Removing, &key, &old);
        let removed = self.data_mut()?.remove(&key);
        self.listeners.fire(EventKind::Removed, &key, &old);
        Ok(removed)
    }

    // ============== Query ==============

    /// The statement behind the collection. Only database collections have one.
    pub fn get_query(&self) -> QueryResult<Statement> {
        Err(QueryError::not_supported(
            "The query can't be read from an in-memory collection",
        )
        .with_help("Wrap the statement in a DatabaseCollection to work with its query"))
    }

    /// Replace the statement behind the collection. Only database collections have
    /// one.
    pub fn set_query(&mut self, _statement: Statement) -> QueryResult<()> {
        Err(QueryError::not_supported(
            "The query can't be changed on an in-memory collection",
        )
        .with_help("Wrap the statement in a DatabaseCollection to work with its query"))
    }
}

fn to_key(value: &Value) -> QueryResult<Key> {
    Key::from_value(value).ok_or_else(|| {
        QueryError::type_mismatch(format!("A {} can't be used as a key", value.type_name()))
    })
}

impl From<Array> for Collection {
    fn from(data: Array) -> Self {
        Self::new(data)
    }
}

impl From<Value> for Collection {
    /// Arrays are wrapped as-is; any other value becomes a one-element list.
    fn from(value: Value) -> Self {
        match value {
            Value::Array(array) => Self::new(array),
            other => Self::new(std::iter::once(other).collect()),
        }
    }
}

impl Default for Collection {
    fn default() -> Self {
        Self::new(Array::new())
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Collection");
        match &*self.source.borrow() {
            Source::Array(array) => s.field("data", array),
            Source::Iter { .. } => s.field("data", &"<iterator>"),
            Source::Deferred(_) => s.field("data", &"<deferred>"),
        };
        s.field("listeners", &self.listeners.len()).finish()
    }
}
