use sqlite_direct::{Connection, params};

fn ledger() -> Connection {
    let mut conn = Connection::memory();
    assert!(conn.open());
    assert!(conn.execute_batch("CREATE TABLE entries (id INTEGER PRIMARY KEY, body TEXT)"));
    conn
}

#[test]
fn committed_work_is_visible() {
    let conn = ledger();
    assert!(!conn.in_transaction());
    assert!(conn.begin_deferred_transaction());
    assert!(conn.in_transaction());
    assert!(conn.execute("INSERT INTO entries (body) VALUES (?)", params!["kept"]));
    assert!(conn.commit());
    assert!(!conn.in_transaction());
    assert_eq!(conn.i64_for_query("SELECT count(*) FROM entries", &[]), Some(1));
}

#[test]
fn rolled_back_work_disappears() {
    let conn = ledger();
    assert!(conn.begin_exclusive_transaction());
    assert!(conn.execute("INSERT INTO entries (body) VALUES (?)", params!["discarded"]));
    assert_eq!(
        conn.i64_for_query("SELECT count(*) FROM entries", &[]),
        Some(1),
        "visible inside the transaction"
    );
    assert!(conn.rollback());
    assert!(!conn.in_transaction());
    assert_eq!(conn.i64_for_query("SELECT count(*) FROM entries", &[]), Some(0));
}

#[test]
fn bulk_insert_commits_as_one_unit() {
    let mut conn = ledger();
    conn.set_statement_caching(true);
    assert!(conn.begin_deferred_transaction());
    for i in 0..10_000_i64 {
        assert!(conn.execute(
            "INSERT INTO entries (id, body) VALUES (?, ?)",
            params![i, format!("row {i}")],
        ));
    }
    assert!(conn.commit());
    assert_eq!(
        conn.i64_for_query("SELECT count(*) FROM entries", &[]),
        Some(10_000)
    );
}

#[test]
fn bulk_insert_rolls_back_to_nothing() {
    let conn = ledger();
    assert!(conn.begin_deferred_transaction());
    for i in 0..10_000_i64 {
        assert!(conn.execute(
            "INSERT INTO entries (id, body) VALUES (?, ?)",
            params![i, format!("row {i}")],
        ));
    }
    assert_eq!(
        conn.i64_for_query("SELECT count(*) FROM entries", &[]),
        Some(10_000)
    );
    assert!(conn.rollback());
    assert_eq!(conn.i64_for_query("SELECT count(*) FROM entries", &[]), Some(0));
}

#[test]
fn nested_begin_fails_and_keeps_the_transaction_open() {
    let conn = ledger();
    assert!(conn.begin_deferred_transaction());
    assert!(
        !conn.begin_deferred_transaction(),
        "engine rejects a BEGIN inside a transaction"
    );
    assert!(conn.in_transaction(), "failed begin leaves the flag untouched");
    assert!(conn.had_error());
    assert!(conn.rollback());
    assert!(!conn.in_transaction());
}

#[test]
fn commit_without_a_transaction_fails() {
    let conn = ledger();
    assert!(!conn.commit());
    assert!(!conn.in_transaction());
    assert!(conn.had_error());
}
