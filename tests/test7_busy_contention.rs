use std::rc::Rc;

use sqlite_direct::{Connection, MemorySink, Severity, Step, params};
use tempfile::tempdir;

/// Two connections to one database file: while the first holds an exclusive
/// transaction, the second's statements exhaust their small retry budget and
/// fail; once the lock is released the same statements run.
#[test]
fn lock_contention_exhausts_the_retry_budget_then_recovers() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("contention.db");

    let mut writer = Connection::new(&path);
    assert!(writer.open());
    assert!(writer.execute_batch("CREATE TABLE t (n INTEGER); INSERT INTO t (n) VALUES (1);"));

    let mut blocked = Connection::new(&path);
    assert!(blocked.open());
    blocked.set_statement_caching(true);
    blocked.set_busy_retry_attempts(3);
    let sink = Rc::new(MemorySink::new());
    blocked.set_diagnostic_sink(sink.clone());

    // Warm the cache while the database is unlocked, so the busy statuses
    // below surface from stepping rather than compiling.
    assert!(blocked.execute("INSERT INTO t (n) VALUES (?)", params![2_i32]));
    assert_eq!(blocked.i64_for_query("SELECT count(*) FROM t", &[]), Some(2));

    assert!(writer.begin_exclusive_transaction());

    assert!(
        !blocked.execute("INSERT INTO t (n) VALUES (?)", params![3_i32]),
        "write blocks while the exclusive lock is held"
    );
    assert!(sink.contains("busy retry limit reached"));
    assert!(sink.count_at(Severity::Error) >= 1);

    {
        let mut rows = blocked
            .query("SELECT count(*) FROM t", &[])
            .expect("cached statement binds without touching the lock");
        assert_eq!(rows.advance(), Step::Failed, "reads block too");
    }

    assert!(writer.commit());

    assert!(blocked.execute("INSERT INTO t (n) VALUES (?)", params![3_i32]));
    assert_eq!(blocked.i64_for_query("SELECT count(*) FROM t", &[]), Some(3));
}

/// The retry budget is per engine call, so a freshly raised budget applies
/// to the next statement without reopening the connection.
#[test]
fn retry_budget_is_consulted_per_call() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("budget.db");

    let mut writer = Connection::new(&path);
    assert!(writer.open());
    assert!(writer.execute_batch("CREATE TABLE t (n INTEGER)"));

    let mut blocked = Connection::new(&path);
    assert!(blocked.open());
    blocked.set_statement_caching(true);
    assert!(blocked.execute("INSERT INTO t (n) VALUES (?)", params![1_i32]));

    blocked.set_busy_retry_attempts(1);
    assert_eq!(blocked.busy_retry_attempts(), 1);
    assert!(writer.begin_exclusive_transaction());
    assert!(!blocked.execute("INSERT INTO t (n) VALUES (?)", params![2_i32]));
    assert!(writer.commit());

    blocked.set_busy_retry_attempts(1_000);
    assert!(blocked.execute("INSERT INTO t (n) VALUES (?)", params![2_i32]));
    assert_eq!(blocked.i64_for_query("SELECT count(*) FROM t", &[]), Some(2));
}
