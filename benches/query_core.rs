//! Benchmarks for path parsing, collection filtering and SQL composition.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sledgehammer::prelude::*;
use std::hint::black_box;

fn records(count: usize) -> Collection {
    Collection::lazy_values((0..count).map(|i| {
        array! {
            "id" => i,
            "name" => format!("user_{}", i),
            "score" => (i * 7 % 100),
            "role" => if i % 3 == 0 { "admin" } else { "dev" },
        }
    }))
}

fn bench_path_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_parse");

    for path in ["name", "user.address.city", "->items[*].product->name", "a?.b[c?]"] {
        group.bench_with_input(BenchmarkId::new("uncached", path), &path, |b, path| {
            b.iter(|| black_box(PathExpression::parse_uncached(path)))
        });
        group.bench_with_input(BenchmarkId::new("cached", path), &path, |b, path| {
            b.iter(|| black_box(PathExpression::parse(path)))
        });
    }

    group.finish();
}

fn bench_path_get(c: &mut Criterion) {
    let data = array! {
        "user" => array! {
            "address" => array! { "city" => "London" },
            "tags" => list!["a", "b", "c"],
        },
    };

    c.bench_function("path_get_nested", |b| {
        b.iter(|| black_box(PropertyPath::get("user.address.city", &data)))
    });

    let compiled = PropertyPath::compile("user.address.city").unwrap();
    c.bench_function("path_get_compiled", |b| {
        b.iter(|| black_box(compiled(&data)))
    });
}

fn bench_where(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_where");

    for size in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("condition_map", size), &size, |b, &size| {
            b.iter_batched(
                || records(size),
                |items| {
                    black_box(
                        items
                            .where_(Conditions::all([
                                ("role", Value::from("admin")),
                                ("score >=", Value::from(50)),
                            ]))
                            .map(|c| c.count()),
                    )
                },
                criterion::BatchSize::SmallInput,
            )
        });
        group.bench_with_input(BenchmarkId::new("predicate", size), &size, |b, &size| {
            b.iter_batched(
                || records(size),
                |items| {
                    black_box(items.where_(Conditions::predicate(|_, key| {
                        key.as_int().is_some_and(|i| i % 2 == 0)
                    })))
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_order_by(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_order_by");

    for method in [SortMethod::Regular, SortMethod::Natural] {
        group.bench_function(format!("{:?}", method), |b| {
            b.iter_batched(
                || records(1000),
                |items| black_box(items.order_by("name", method)),
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_sql_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_compose");

    group.bench_function("simple_select", |b| {
        b.iter(|| {
            let builder = SqlBuilder::new()
                .select("*")
                .from("users")
                .unwrap()
                .where_("active = 1");
            black_box(builder.compose())
        })
    });

    let complex = SqlBuilder::new()
        .select(["u.id", "u.name", "COUNT(o.id)"])
        .from("users u")
        .unwrap()
        .left_join("orders o", "o.user_id = u.id")
        .unwrap()
        .where_("u.active = 1")
        .and_where("o.total > 100")
        .or_where("u.role = 'admin'")
        .group_by("u.id")
        .having("COUNT(o.id) > 2")
        .order_by("u.name", Direction::Asc)
        .limit(20, Some(10));

    group.bench_function("complex_select", |b| {
        b.iter(|| black_box(complex.compose()))
    });

    for count in [5, 20, 100] {
        group.bench_with_input(BenchmarkId::new("and_where", count), &count, |b, &count| {
            b.iter(|| {
                let mut builder = SqlBuilder::new().select("*").from("t").unwrap();
                for i in 0..count {
                    builder = builder.and_where(format!("field_{} = {}", i, i));
                }
                black_box(builder.compose())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_path_parsing,
    bench_path_get,
    bench_where,
    bench_order_by,
    bench_sql_compose,
);

criterion_main!(benches);
