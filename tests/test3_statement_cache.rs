use sqlite_direct::{Connection, params};

fn seeded() -> Connection {
    let mut conn = Connection::memory();
    assert!(conn.open());
    conn.set_statement_caching(true);
    assert!(conn.execute_batch(
        "CREATE TABLE nums (n INTEGER);
         INSERT INTO nums (n) VALUES (1), (2), (3);",
    ));
    conn
}

#[test]
fn cache_reuse_grows_the_use_counter() {
    let conn = seeded();
    let sql = "SELECT n FROM nums WHERE n >= ?";
    {
        let args = params![1_i32];
        let cursor = conn.query(sql, args).expect("first run");
        assert_eq!(cursor.statement_use_count(), 1);
    }
    {
        let args = params![2_i32];
        let cursor = conn.query(sql, args).expect("second run");
        assert_eq!(cursor.statement_use_count(), 2, "compiled once, executed twice");
    }
    assert_eq!(conn.cached_statement_count(), 1);
}

#[test]
fn without_caching_each_run_compiles_fresh() {
    let mut conn = Connection::memory();
    assert!(conn.open());
    assert!(conn.execute_batch("CREATE TABLE nums (n INTEGER)"));
    for _ in 0..2 {
        let cursor = conn.query("SELECT n FROM nums", &[]).expect("select");
        assert_eq!(cursor.statement_use_count(), 1);
    }
    assert_eq!(conn.cached_statement_count(), 0);
}

#[test]
fn cache_keys_on_exact_text() {
    let conn = seeded();
    assert!(conn.query("SELECT n FROM nums", &[]).is_some());
    assert!(conn.query("SELECT  n  FROM nums", &[]).is_some());
    assert_eq!(
        conn.cached_statement_count(),
        2,
        "whitespace variants compile separately"
    );
}

#[test]
fn updates_reuse_cached_statements_too() {
    let conn = seeded();
    let sql = "INSERT INTO nums (n) VALUES (?)";
    for i in 4..7 {
        assert!(conn.execute(sql, params![i]));
    }
    assert_eq!(
        conn.cached_statement_count(),
        1,
        "three runs share one compiled INSERT"
    );
    assert_eq!(conn.i64_for_query("SELECT count(*) FROM nums", &[]), Some(6));
    assert_eq!(conn.cached_statement_count(), 2);
}

#[test]
fn clearing_and_disabling_drop_cached_statements() {
    let mut conn = seeded();
    assert!(conn.query("SELECT n FROM nums", &[]).is_some());
    assert_eq!(conn.cached_statement_count(), 1);

    conn.clear_cached_statements();
    assert_eq!(conn.cached_statement_count(), 0);
    {
        let cursor = conn.query("SELECT n FROM nums", &[]).expect("recompiled");
        assert_eq!(
            cursor.statement_use_count(),
            1,
            "a cleared entry does not carry its counter over"
        );
    }

    conn.set_statement_caching(false);
    assert_eq!(conn.cached_statement_count(), 0);
    assert!(conn.query("SELECT n FROM nums", &[]).is_some());
    assert_eq!(conn.cached_statement_count(), 0);
}

/// Shrinking the cache may drop an entry whose statement a cursor is still
/// iterating; the cursor keeps its handle alive and finishes normally.
#[test]
fn eviction_never_breaks_a_live_cursor() {
    let conn = seeded();
    conn.set_cache_capacity(1);
    let mut held = conn
        .query("SELECT n FROM nums ORDER BY n", &[])
        .expect("held");
    assert!(held.next_row());
    assert_eq!(held.column_i64(0), Some(1));

    // A different query displaces the held statement from the bounded cache.
    assert!(conn.query("SELECT count(*) FROM nums", &[]).is_some());
    assert_eq!(conn.cached_statement_count(), 1);

    assert!(held.next_row());
    assert_eq!(held.column_i64(0), Some(2));
    assert!(held.next_row());
    assert!(!held.next_row());
}

/// Running the same text again while an older cursor is live must not hand
/// out the shared statement: the newer call compiles its own, the cache slot
/// is replaced, and each cursor keeps its own position.
#[test]
fn an_in_use_statement_is_never_handed_out_again() {
    let conn = seeded();
    let sql = "SELECT n FROM nums ORDER BY n";
    let mut first = conn.query(sql, &[]).expect("first");
    assert!(first.next_row());
    assert_eq!(first.column_i64(0), Some(1));

    let mut second = conn.query(sql, &[]).expect("second");
    assert_eq!(second.statement_use_count(), 1, "compiled afresh, not reused");
    assert_eq!(conn.cached_statement_count(), 1, "still one slot per text");
    assert!(second.next_row());
    assert_eq!(second.column_i64(0), Some(1), "the newer cursor starts at the top");
    assert!(first.next_row());
    assert_eq!(first.column_i64(0), Some(2), "the older cursor kept its position");

    drop(first);
    let mut seen = Vec::new();
    while second.next_row() {
        seen.push(second.column_i64(0).expect("integer row"));
    }
    assert_eq!(seen, vec![2, 3]);

    let third = conn.query(sql, &[]).expect("third");
    assert_eq!(
        third.statement_use_count(),
        2,
        "the replacement entry is reused once it is free"
    );
}

/// Two live cursors over one parameterized text keep their own bindings;
/// closing either one never strips the other's parameters mid-iteration.
#[test]
fn overlapping_cursors_keep_their_own_bindings() {
    let conn = seeded();
    let sql = "SELECT n FROM nums WHERE n >= ? ORDER BY n";
    let low = params![1_i32];
    let high = params![2_i32];

    let mut first = conn.query(sql, low).expect("first");
    assert!(first.next_row());
    assert_eq!(first.column_i64(0), Some(1));

    let mut second = conn.query(sql, high).expect("second");
    drop(first);

    let mut seen = Vec::new();
    while second.next_row() {
        seen.push(second.column_i64(0).expect("integer row"));
    }
    assert_eq!(seen, vec![2, 3], "the second cursor's binding survived");
    assert_eq!(conn.cached_statement_count(), 1);
}
