use rusqlite::ErrorCode;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("User already exists!")]
    AlreadyExists,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Not found")]
    NotFound,

    /// The engine could not serialize this write against a concurrent one.
    /// The caller must resubmit.
    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref err, _) = e {
            match err.code {
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                    return Self::Conflict(e.to_string());
                }
                ErrorCode::ConstraintViolation
                    if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    return Self::AlreadyExists;
                }
                _ => {}
            }
        }
        Self::Store(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ffi;

    fn failure(code: std::os::raw::c_int) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), None)
    }

    #[test]
    fn test_busy_and_locked_are_conflicts() {
        assert!(matches!(StoreError::from(failure(ffi::SQLITE_BUSY)), StoreError::Conflict(_)));
        assert!(matches!(StoreError::from(failure(ffi::SQLITE_LOCKED)), StoreError::Conflict(_)));
    }

    #[test]
    fn test_engine_failures_stay_store_errors() {
        for code in [ffi::SQLITE_IOERR, ffi::SQLITE_FULL, ffi::SQLITE_CORRUPT] {
            assert!(matches!(StoreError::from(failure(code)), StoreError::Store(_)));
        }
    }

    #[test]
    fn test_unique_violation_is_already_exists() {
        let err = StoreError::from(failure(ffi::SQLITE_CONSTRAINT_UNIQUE));
        assert!(matches!(err, StoreError::AlreadyExists));

        let err = StoreError::from(failure(ffi::SQLITE_CONSTRAINT_NOTNULL));
        assert!(matches!(err, StoreError::Store(_)));
    }
}
