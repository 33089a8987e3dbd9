use rusqlite::{Connection, OptionalExtension};

use crate::error::StoreResult;
use crate::models::UserRow;
use crate::txn::WriteTxn;
use crate::Database;

const USER_COLUMNS: &str = "id, username, password_hash";

impl Database {
    pub fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: i64) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                    [id],
                    map_user,
                )
                .optional()?;
            Ok(row)
        })
    }
}

impl WriteTxn<'_> {
    pub fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRow>> {
        query_user_by_username(self.conn(), username)
    }

    pub fn insert_user(&self, username: &str, password_hash: &str) -> StoreResult<i64> {
        self.conn().execute(
            "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
            (username, password_hash),
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    /// Delete the user only if its stored hash is still `password_hash`.
    /// Returns false when no such row exists (deleted or password changed
    /// since the caller verified it).
    pub fn delete_user(&self, id: i64, password_hash: &str) -> StoreResult<bool> {
        let deleted = self.conn().execute(
            "DELETE FROM users WHERE id = ?1 AND password_hash = ?2",
            (id, password_hash),
        )?;
        Ok(deleted == 1)
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> StoreResult<Option<UserRow>> {
    let mut stmt =
        conn.prepare_cached(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"))?;

    let row = stmt.query_row([username], map_user).optional()?;
    Ok(row)
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::StoreError;
    use crate::test_support::open_temp;

    #[test]
    fn test_username_lookup_is_case_sensitive() {
        let (_dir, db) = open_temp();
        db.write("test", |txn| txn.insert_user("Alice", "h")).unwrap();

        assert!(db.find_user_by_username("Alice").unwrap().is_some());
        assert!(db.find_user_by_username("alice").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_insert_maps_to_already_exists() {
        let (_dir, db) = open_temp();
        db.write("test", |txn| txn.insert_user("alice", "h1")).unwrap();

        let err = db.write("test", |txn| txn.insert_user("alice", "h2")).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[test]
    fn test_delete_requires_matching_hash() {
        let (_dir, db) = open_temp();
        let id = db.write("test", |txn| txn.insert_user("alice", "h1")).unwrap();

        assert!(!db.write("test", |txn| txn.delete_user(id, "other")).unwrap());
        assert!(db.get_user_by_id(id).unwrap().is_some());

        assert!(db.write("test", |txn| txn.delete_user(id, "h1")).unwrap());
        assert!(db.get_user_by_id(id).unwrap().is_none());
    }
}
