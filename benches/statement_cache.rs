//! Criterion comparison of statement-cache reuse vs. fresh compilation for a
//! single-row SELECT. Both variants run the same lookup against the same
//! seeded data; the cached one compiles it once, the uncached one recompiles
//! on every call.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sqlite_direct::{Connection, params};

const ROW_COUNT: i64 = 1_000;

fn seeded_connection(cache: bool) -> Connection {
    let mut conn = Connection::memory();
    assert!(conn.open());
    conn.set_statement_caching(cache);
    assert!(
        conn.execute_batch("CREATE TABLE lookup (id INTEGER PRIMARY KEY, body TEXT NOT NULL)")
    );
    assert!(conn.begin_deferred_transaction());
    for id in 0..ROW_COUNT {
        assert!(conn.execute(
            "INSERT INTO lookup (id, body) VALUES (?, ?)",
            params![id, format!("body for row {id}")],
        ));
    }
    assert!(conn.commit());
    conn
}

fn bench_single_row_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_row_lookup");

    let cached = seeded_connection(true);
    group.bench_function("cached_statement", |b| {
        let mut id: i64 = 0;
        b.iter(|| {
            id = (id + 1) % ROW_COUNT;
            let found = cached
                .i64_for_query("SELECT id FROM lookup WHERE id = ?", params![id])
                .expect("row exists");
            black_box(found);
        });
    });

    let uncached = seeded_connection(false);
    group.bench_function("fresh_statement", |b| {
        let mut id: i64 = 0;
        b.iter(|| {
            id = (id + 1) % ROW_COUNT;
            let found = uncached
                .i64_for_query("SELECT id FROM lookup WHERE id = ?", params![id])
                .expect("row exists");
            black_box(found);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_single_row_lookup);
criterion_main!(benches);
