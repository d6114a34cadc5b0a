use cmdforge::{
    CommandBuilder, ConditionLogic, DocumentCommandBuilder, ElasticDialect, InPredicate,
    MongoDialect, MySqlDialect, NullsOrder, OrderType, PostgresDialect, Predicate,
    SearchCommandBuilder, SqlCommandBuilder, Target, TypelessPaths,
};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

/// Fill `b` with `n` projections and `n` AND-connected equality predicates:
/// SELECT col0, col1, ... FROM t WHERE col0 = ? AND col1 = ? ... ORDER BY col0 DESC
fn fill<B: CommandBuilder>(b: &mut B, n: usize) {
    b.set_target(Target::new("t"));
    for i in 0..n {
        b.add_select(&format!("col{i}"), None).unwrap();
    }
    for i in 0..n {
        b.add_condition(ConditionLogic::And, Predicate::eq(format!("col{i}"), i as i64))
            .unwrap();
    }
    b.add_order_by("col0", None, OrderType::Desc, NullsOrder::Default)
        .unwrap();
}

fn bench_sql_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/sql_select");

    for n in [1, 5, 10, 50, 100] {
        let mut b = SqlCommandBuilder::new();
        fill(&mut b, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, _| {
            bench.iter(|| {
                b.clear_args();
                black_box(b.build_select(&PostgresDialect, false).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_sql_build_and_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/sql_build_and_render");

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, &n| {
            bench.iter(|| {
                let mut b = SqlCommandBuilder::new();
                fill(&mut b, n);
                black_box(b.build_select(&MySqlDialect, true).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_in_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/in_list");

    for n in [5, 20, 100, 500] {
        let values: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |bench, values| {
            bench.iter(|| {
                let mut b = SqlCommandBuilder::for_target("t");
                b.add_in(ConditionLogic::And, InPredicate::new("id", values.iter().copied()))
                    .unwrap();
                black_box(b.build_select(&PostgresDialect, false).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_document_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/document_find");

    for n in [1, 5, 10, 50] {
        let mut b = DocumentCommandBuilder::new();
        fill(&mut b, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, _| {
            bench.iter(|| {
                b.clear_args();
                black_box(b.build_select(&MongoDialect, false).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_search_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/search_body");

    for n in [1, 5, 10, 50] {
        let mut b = SearchCommandBuilder::new(TypelessPaths);
        fill(&mut b, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, _| {
            bench.iter(|| {
                b.clear_args();
                black_box(b.build_select(&ElasticDialect, false).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_sql_render,
    bench_sql_build_and_render,
    bench_in_list,
    bench_document_render,
    bench_search_render
);
criterion_main!(benches);
