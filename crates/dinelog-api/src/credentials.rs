//! Credential store: salted Argon2id hashes over the `users` table.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand_core::OsRng;
use tracing::{info, warn};

use dinelog_db::models::UserRow;
use dinelog_db::{Database, StoreError};

use crate::error::{ApiError, ApiResult};

/// Create a user. Fails with `AlreadyExists` if the exact username is taken.
pub fn register(db: &Database, username: &str, password: &str) -> ApiResult<i64> {
    // Hash before opening the write transaction so the lock is not held
    // across the KDF.
    let password_hash = hash_password(password)?;

    let user_id = db.write("register", |txn| {
        if txn.find_user_by_username(username)?.is_some() {
            return Err(StoreError::AlreadyExists);
        }
        txn.insert_user(username, &password_hash)
    })?;

    info!("Registered user {} ({})", username, user_id);
    Ok(user_id)
}

/// Check a username/password pair and return the user.
pub fn verify(db: &Database, username: &str, password: &str) -> ApiResult<UserRow> {
    let user = db
        .find_user_by_username(username)?
        .ok_or(ApiError::InvalidCredentials)?;

    if !password_matches(&user.password_hash, password)? {
        warn!("Failed password check for {}", username);
        return Err(ApiError::InvalidCredentials);
    }
    Ok(user)
}

/// Delete a user after re-verifying the password.
pub fn delete(db: &Database, username: &str, password: &str) -> ApiResult<()> {
    let user = verify(db, username, password)?;

    let deleted = db.write("delete_account", |txn| {
        txn.delete_user(user.id, &user.password_hash)
    })?;
    if !deleted {
        return Err(ApiError::InvalidCredentials);
    }

    info!("Deleted user {} ({})", username, user.id);
    Ok(())
}

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

fn password_matches(stored_hash: &str, password: &str) -> ApiResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| ApiError::Internal(format!("Corrupt password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::open_temp_db;

    #[test]
    fn test_register_rejects_duplicate_username() {
        let (_dir, db) = open_temp_db();

        register(&db, "alice", "pw1").unwrap();
        let err = register(&db, "alice", "pw2").unwrap_err();
        assert!(matches!(err, ApiError::AlreadyExists));
        assert_eq!(err.to_string(), "User already exists!");

        // Usernames are matched exactly.
        register(&db, "Alice", "pw2").unwrap();
    }

    #[test]
    fn test_verify_only_accepts_registered_password() {
        let (_dir, db) = open_temp_db();
        let id = register(&db, "alice", "pw1").unwrap();

        assert_eq!(verify(&db, "alice", "pw1").unwrap().id, id);
        assert!(matches!(verify(&db, "alice", "pw2"), Err(ApiError::InvalidCredentials)));
        assert!(matches!(verify(&db, "bob", "pw1"), Err(ApiError::InvalidCredentials)));
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
        assert!(password_matches(&a, "same").unwrap());
        assert!(password_matches(&b, "same").unwrap());
    }

    #[test]
    fn test_delete_requires_password() {
        let (_dir, db) = open_temp_db();
        register(&db, "alice", "pw1").unwrap();

        assert!(matches!(delete(&db, "alice", "wrong"), Err(ApiError::InvalidCredentials)));
        assert!(db.find_user_by_username("alice").unwrap().is_some());

        delete(&db, "alice", "pw1").unwrap();
        assert!(db.find_user_by_username("alice").unwrap().is_none());
        assert!(matches!(verify(&db, "alice", "pw1"), Err(ApiError::InvalidCredentials)));
    }
}
