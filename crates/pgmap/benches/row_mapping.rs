use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgmap::{BufferedRow, ColumnPlan, Command, Entity, Naming, RowMapper, Value, build_insert};

#[derive(Debug, Default, Entity)]
#[orm(table = "events")]
struct Event {
    id: i64,
    kind: String,
    payload: Option<String>,
    score: f64,
    created_at: chrono::NaiveDateTime,
}

fn rows(n: usize) -> Vec<BufferedRow> {
    (0..n)
        .map(|i| {
            let mut row = BufferedRow::default();
            row.push("ID", i as i64)
                .push("Kind", format!("kind-{}", i % 7))
                .push("payload", (i % 3 == 0).then(|| "payload".to_string()))
                .push("score", i as f64 * 0.5)
                .push("created_at", chrono::NaiveDateTime::default());
            row
        })
        .collect()
}

fn bench_map_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_mapping/map_rows");

    for n in [1, 10, 100, 1000] {
        let rows = rows(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &rows, |b, rows| {
            b.iter(|| {
                let mut mapper = RowMapper::<Event>::new();
                let mapped: Vec<Event> = rows.iter().filter_map(|r| mapper.map(r).ok()).collect();
                black_box(mapped);
            });
        });
    }

    group.finish();
}

fn bench_scalar_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_mapping/scalar");

    for n in [10, 1000] {
        let rows: Vec<BufferedRow> = (0..n)
            .map(|i| BufferedRow::new([("count".to_string(), Value::I64(i))]))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &rows, |b, rows| {
            b.iter(|| {
                let mut mapper = RowMapper::<i32>::new();
                let sum: i64 = rows
                    .iter()
                    .filter_map(|r| mapper.map(r).ok())
                    .map(i64::from)
                    .sum();
                black_box(sum);
            });
        });
    }

    group.finish();
}

/// `INSERT ... SELECT @c0, @c1, ... WHERE NOT EXISTS (...)` with `n` parameters.
fn named_command(n: usize) -> Command {
    let columns: Vec<String> = (0..n).map(|i| format!("c{i}")).collect();
    let params: Vec<String> = columns.iter().map(|c| format!("@{c}")).collect();
    let mut command = Command::new(format!(
        "INSERT INTO t({}) SELECT {} WHERE NOT EXISTS (SELECT 1 FROM t x WHERE x.c0 = @c0) -- @c1",
        columns.join(","),
        params.join(",")
    ));
    for (i, column) in columns.iter().enumerate() {
        command.add_with_value(column, i as i64);
    }
    command
}

fn bench_to_positional(c: &mut Criterion) {
    let mut group = c.benchmark_group("command/to_positional");

    for n in [1, 5, 20, 100] {
        let command = named_command(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &command, |b, command| {
            b.iter(|| black_box(command.to_positional()));
        });
    }

    group.finish();
}

fn bench_build_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement/build_insert");

    let plain: ColumnPlan<Event> = ColumnPlan::new(&[] as &[&str], Naming::Lowercase);
    let checked: [&str; 1] = ["id"];
    group.bench_function("plain", |b| {
        b.iter(|| black_box(build_insert(Event::TABLE, &plain, &[] as &[&str])));
    });
    group.bench_function("exists_check", |b| {
        b.iter(|| black_box(build_insert(Event::TABLE, &plain, &checked)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_map_rows,
    bench_scalar_projection,
    bench_to_positional,
    bench_build_insert
);
criterion_main!(benches);
