use super::Connection;

impl Connection {
    /// Open a deferred transaction; locks are taken lazily on first use.
    /// `true` on success, which also sets the in-transaction flag.
    pub fn begin_deferred_transaction(&self) -> bool {
        self.begin_with("BEGIN DEFERRED TRANSACTION")
    }

    /// Open an exclusive transaction, taking the write lock up front.
    pub fn begin_exclusive_transaction(&self) -> bool {
        self.begin_with("BEGIN EXCLUSIVE TRANSACTION")
    }

    /// Commit the open transaction. The in-transaction flag clears only on
    /// success; a failed commit leaves the transaction open for a retry or a
    /// rollback.
    pub fn commit(&self) -> bool {
        let committed = self.execute("COMMIT TRANSACTION", &[]);
        if committed {
            self.note_transaction(false);
        }
        committed
    }

    /// Roll the open transaction back, discarding its writes.
    pub fn rollback(&self) -> bool {
        let rolled_back = self.execute("ROLLBACK TRANSACTION", &[]);
        if rolled_back {
            self.note_transaction(false);
        }
        rolled_back
    }

    fn begin_with(&self, sql: &str) -> bool {
        let began = self.execute(sql, &[]);
        if began {
            self.note_transaction(true);
        }
        began
    }
}
