use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use quarry::condition::{Connective, PredicateList};
use quarry::{Dialect, Params, Value, placeholder};

/// `SELECT * FROM t WHERE c0 = ? AND c1 = ? ...` with `n` binds.
fn positional_sql(n: usize) -> (String, Params) {
    let mut sql = String::from("SELECT * FROM t WHERE ");
    for i in 0..n {
        if i > 0 {
            sql.push_str(" AND ");
        }
        sql.push_str(&format!("c{i} = ?"));
    }
    (sql, Params::positional((0..n as i64).map(Value::from)))
}

fn predicates(n: usize) -> PredicateList {
    let mut list = PredicateList::new();
    for i in 0..n {
        let connective = if i % 3 == 2 {
            Connective::Or
        } else {
            Connective::And
        };
        list.push(connective, format!("c{i} = ?"), vec![Value::from(i as i64)]);
    }
    list
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("placeholder/scan");

    for n in [1, 10, 100] {
        let (sql, _) = positional_sql(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &sql, |b, sql| {
            b.iter(|| black_box(placeholder::scan(sql)));
        });
    }

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("placeholder/validate");

    for n in [1, 10, 100] {
        let input = positional_sql(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &input, |b, (sql, params)| {
            b.iter(|| black_box(placeholder::validate(sql, params)));
        });
    }

    group.finish();
}

fn bench_substitute(c: &mut Criterion) {
    let mut group = c.benchmark_group("placeholder/substitute");

    for n in [1, 10, 100] {
        let input = positional_sql(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &input, |b, (sql, params)| {
            b.iter(|| black_box(placeholder::substitute(sql, params)));
        });
    }

    group.finish();
}

fn bench_predicates(c: &mut Criterion) {
    let mut group = c.benchmark_group("condition/render");

    for n in [1, 10, 50] {
        let list = predicates(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &list, |b, list| {
            b.iter(|| black_box(list.render()));
        });
    }

    group.finish();
}

fn bench_apply_limit(c: &mut Criterion) {
    let mut group = c.benchmark_group("dialect/apply_limit");
    let sql = "SELECT `users`.* FROM `users` WHERE status = ? ORDER BY `id` DESC";

    for dialect in [Dialect::MySql, Dialect::MsSql, Dialect::Oracle, Dialect::Firebird] {
        group.bench_with_input(
            BenchmarkId::from_parameter(dialect.name()),
            &dialect,
            |b, dialect| {
                b.iter(|| black_box(dialect.apply_limit(sql, Some(25), Some(50), true)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_scan,
    bench_validate,
    bench_substitute,
    bench_predicates,
    bench_apply_limit
);
criterion_main!(benches);
