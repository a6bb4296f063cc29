//! Literal construction macros for [`Value`](crate::Value) arrays.
//!
//! ```rust
//! use sledge_query::{array, list, Value};
//!
//! let user = array! {
//!     "name" => "Ada",
//!     "roles" => list!["admin", "dev"],
//!     7 => true,
//! };
//! assert!(matches!(user, Value::Array(_)));
//! ```

/// Build a keyed [`Value::Array`](crate::Value::Array).
///
/// Keys go through [`Key::from`](crate::Key), so `"3"` and `3` are the same key.
#[macro_export]
macro_rules! array {
    () => {
        $crate::Value::Array($crate::Array::new())
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut array = $crate::Array::new();
        $(
            array.insert($crate::Key::from($key), $crate::Value::from($value));
        )+
        $crate::Value::Array(array)
    }};
}

/// Build a [`Value::Array`](crate::Value::Array) keyed `0..n-1`.
#[macro_export]
macro_rules! list {
    () => {
        $crate::Value::Array($crate::Array::new())
    };
    ($($value:expr),+ $(,)?) => {{
        let mut array = $crate::Array::new();
        $(
            array.push($crate::Value::from($value));
        )+
        $crate::Value::Array(array)
    }};
}

#[cfg(test)]
mod tests {
    use crate::{Array, Key, Value};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_array_normalizes_keys() {
        let value = array! { "1" => "a", 1 => "b", "x" => list![1, 2] };
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array.get(&Key::Int(1)), Some(&Value::from("b")));
        assert_eq!(array.get(&Key::from("x")).unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_list_is_linear() {
        let value = list!["a", "b", "c"];
        assert!(value.as_array().unwrap().is_list());
        assert_eq!(list![], Value::Array(Array::new()));
        assert_eq!(array! {}, Value::Array(Array::new()));
    }
}
