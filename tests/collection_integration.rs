//! Integration tests for paths, filters and in-memory collections.

use pretty_assertions::assert_eq;
use sledgehammer::prelude::*;

fn catalog() -> Collection {
    Collection::from(list![
        array! { "sku" => "a-10", "name" => "Anvil", "price" => 120, "tags" => list!["heavy"] },
        array! { "sku" => "b-2", "name" => "Bolt", "price" => 2, "tags" => list![] },
        array! { "sku" => "c-7", "name" => "Crate", "price" => 35, "tags" => list!["wood", "heavy"] },
    ])
}

#[test]
fn test_paths_reach_into_objects_and_arrays() {
    let order = Value::from(
        Object::new("Order")
            .with_property("id", 17)
            .with_property("customer", array! { "name" => "Ada", "email" => Value::Null }),
    );

    assert_eq!(PropertyPath::get("customer.name", &order).unwrap(), "Ada".into());
    assert_eq!(PropertyPath::get("->customer[name]", &order).unwrap(), "Ada".into());
    assert!(PropertyPath::get("customer.email", &order).unwrap().is_null());
    assert!(PropertyPath::get("shipping?.city", &order).unwrap().is_null());

    let err = PropertyPath::parse("customer[name").unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidPath);
}

#[test]
fn test_compiled_path_is_reusable() {
    let name = PropertyPath::compile("name").unwrap();
    let names: Vec<Value> = catalog()
        .values()
        .unwrap()
        .iter()
        .map(|item| name(item))
        .collect();
    assert_eq!(names, vec!["Anvil".into(), "Bolt".into(), "Crate".into()]);
}

#[test]
fn test_filter_sort_and_project() {
    let expensive = catalog()
        .where_(Conditions::all([("price >", 10)]))
        .unwrap()
        .order_by_descending("price", SortMethod::Numeric)
        .unwrap()
        .select("name", KeySelector::from("sku"))
        .unwrap();

    assert_eq!(
        expensive.keys().unwrap(),
        vec![Key::from("a-10"), Key::from("c-7")]
    );
    assert_eq!(expensive.values().unwrap(), vec!["Anvil".into(), "Crate".into()]);
}

#[test]
fn test_find_and_remove() {
    let mut items = catalog();
    let bolt = items
        .find(Conditions::all([("name LIKE", "bo%")]), false)
        .unwrap();
    assert_eq!(PropertyPath::get("sku", &bolt.unwrap()).unwrap(), "b-2".into());

    let err = items
        .find(Conditions::all([("price >", 1000)]), false)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NoMatch);

    assert!(items.remove(Conditions::all([("sku", "a-10")]), false).unwrap());
    assert_eq!(items.keys().unwrap(), vec![Key::Int(0), Key::Int(1)]);
    assert!(!items.remove(Conditions::all([("sku", "a-10")]), true).unwrap());
}

#[test]
fn test_lazy_collection_reads_source_once() {
    use std::cell::Cell;
    use std::rc::Rc;

    let pulled = Rc::new(Cell::new(0));
    let counter = Rc::clone(&pulled);
    let lazy = Collection::lazy_values((1..=5).map(move |n| {
        counter.set(counter.get() + 1);
        Value::from(n * n)
    }));
    assert!(!lazy.is_materialized());

    let odd = lazy
        .where_(Conditions::predicate(|item, _| {
            item.as_number().is_some_and(|n| n as i64 % 2 == 1)
        }))
        .unwrap();
    assert_eq!(odd.values().unwrap(), vec![1.into(), 9.into(), 25.into()]);
    assert_eq!(lazy.max(".").unwrap(), Value::Int(25));
    assert_eq!(pulled.get(), 5);
}

#[test]
fn test_sql_builder_is_immutable() {
    let base = SqlBuilder::new()
        .select(["id", "name"])
        .from("products p")
        .unwrap();
    let cheap = base.where_("price < 10").limit(5, None);
    let joined = base
        .left_join("stock s", "s.product_id = p.id")
        .unwrap()
        .and_where("s.quantity > 0");

    assert_eq!(base.compose().unwrap(), "SELECT id, name FROM products AS p");
    assert_eq!(
        cheap.compose().unwrap(),
        "SELECT id, name FROM products AS p WHERE price < 10 LIMIT 5"
    );
    assert_eq!(
        joined.compose().unwrap(),
        "SELECT id, name FROM products AS p LEFT JOIN stock AS s ON (s.product_id = p.id) WHERE s.quantity > 0"
    );
}
