use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::SessionRow;
use crate::txn::WriteTxn;
use crate::Database;

/// Timestamps are stored as fixed-width RFC 3339 UTC text so that string
/// comparison in SQL orders them correctly.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl Database {
    /// Load a session that has not expired as of `now`.
    pub fn find_live_session(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<SessionRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT s.user_id, u.username, s.expires_at
                     FROM sessions s
                     JOIN users u ON s.user_id = u.id
                     WHERE s.id = ?1 AND s.expires_at > ?2",
                    (id.to_string(), format_ts(now)),
                    |row| {
                        Ok(SessionRow {
                            user_id: row.get(0)?,
                            username: row.get(1)?,
                            expires_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Delete every session whose expiry is at or before `now`.
    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        self.write("purge_sessions", |txn| {
            let purged = txn
                .conn()
                .execute("DELETE FROM sessions WHERE expires_at <= ?1", [format_ts(now)])?;
            Ok(purged)
        })
    }
}

impl WriteTxn<'_> {
    pub fn insert_session(
        &self,
        id: Uuid,
        user_id: i64,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.conn().execute(
            "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            (id.to_string(), user_id, format_ts(created_at), format_ts(expires_at)),
        )?;
        Ok(())
    }

    pub fn delete_session(&self, id: Uuid) -> StoreResult<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", [id.to_string()])?;
        Ok(deleted == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::open_temp;
    use chrono::Duration;

    #[test]
    fn test_session_expiry() {
        let (_dir, db) = open_temp();
        let now = Utc::now();
        let sid = Uuid::new_v4();

        db.write("test", |txn| {
            let uid = txn.insert_user("alice", "h")?;
            txn.insert_session(sid, uid, now, now + Duration::hours(1))
        })
        .unwrap();

        let live = db.find_live_session(sid, now).unwrap().unwrap();
        assert_eq!(live.username, "alice");
        assert_eq!(live.expires_at, format_ts(now + Duration::hours(1)));

        assert!(db.find_live_session(sid, now + Duration::hours(2)).unwrap().is_none());

        assert_eq!(db.purge_expired_sessions(now + Duration::hours(2)).unwrap(), 1);
        assert_eq!(db.purge_expired_sessions(now + Duration::hours(2)).unwrap(), 0);
    }

    #[test]
    fn test_sessions_cascade_with_user() {
        let (_dir, db) = open_temp();
        let now = Utc::now();
        let sid = Uuid::new_v4();

        let uid = db
            .write("test", |txn| {
                let uid = txn.insert_user("alice", "h")?;
                txn.insert_session(sid, uid, now, now + Duration::hours(1))?;
                Ok(uid)
            })
            .unwrap();

        db.write("test", |txn| txn.delete_user(uid, "h")).unwrap();
        assert!(db.find_live_session(sid, now).unwrap().is_none());
    }

    #[test]
    fn test_delete_session() {
        let (_dir, db) = open_temp();
        let now = Utc::now();
        let sid = Uuid::new_v4();

        db.write("test", |txn| {
            let uid = txn.insert_user("alice", "h")?;
            txn.insert_session(sid, uid, now, now + Duration::hours(1))
        })
        .unwrap();

        assert!(db.write("test", |txn| txn.delete_session(sid)).unwrap());
        assert!(!db.write("test", |txn| txn.delete_session(sid)).unwrap());
        assert!(db.find_live_session(sid, now).unwrap().is_none());
    }
}
