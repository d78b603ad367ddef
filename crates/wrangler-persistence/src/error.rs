//! Errores de persistencia.
//! Mapea errores de diesel / conexión a variantes semánticas, y estas al
//! `SinkError` que entiende el pipeline.

use diesel::result::{ConnectionError, DatabaseErrorKind, Error as DieselError};
use thiserror::Error;
use wrangler_core::SinkError;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("not found")]
    NotFound,
    #[error("connection error: {0}")]
    Connection(String),
    #[error("migration error: {0}")]
    Migration(String),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => {
                let msg = info.message().to_string();
                match kind {
                    DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(msg),
                    DatabaseErrorKind::CheckViolation => Self::CheckViolation(msg),
                    DatabaseErrorKind::ForeignKeyViolation => Self::ForeignKeyViolation(msg),
                    DatabaseErrorKind::ClosedConnection => Self::Connection(msg),
                    other => Self::Unknown(format!("db error kind {other:?}: {msg}")),
                }
            }
            DieselError::DeserializationError(e) => Self::Unknown(format!("deser: {e}")),
            DieselError::SerializationError(e) => Self::Unknown(format!("ser: {e}")),
            DieselError::AlreadyInTransaction => Self::Unknown("already in transaction".into()),
            DieselError::RollbackErrorOnCommit {
                rollback_error,
                commit_error,
            } => Self::Unknown(format!("rollback={rollback_error}; commit={commit_error}")),
            DieselError::BrokenTransactionManager => {
                Self::Unknown("broken transaction manager".into())
            }
            DieselError::QueryBuilderError(e) => Self::Unknown(format!("query builder: {e}")),
            DieselError::InvalidCString(e) => Self::Unknown(format!("invalid cstring: {e}")),
            DieselError::NotInTransaction => Self::Unknown("not in transaction".into()),
            other => Self::Unknown(format!("unhandled diesel error: {other:?}")),
        }
    }
}

impl From<ConnectionError> for PersistenceError {
    fn from(err: ConnectionError) -> Self {
        Self::Connection(err.to_string())
    }
}

impl From<PersistenceError> for SinkError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::UniqueViolation(m) => SinkError::UniqueViolation(m),
            PersistenceError::ForeignKeyViolation(m) => SinkError::ForeignKeyViolation(m),
            other => SinkError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violations_keep_their_kind_across_layers() {
        let e: SinkError = PersistenceError::UniqueViolation(
            "UNIQUE constraint failed: points.event, points.label".into(),
        )
        .into();
        assert!(matches!(e, SinkError::UniqueViolation(_)));
        let e: SinkError = PersistenceError::Migration("boom".into()).into();
        assert_eq!(e.to_string(), "backend error: migration error: boom");
        assert!(matches!(
            PersistenceError::from(DieselError::NotFound),
            PersistenceError::NotFound
        ));
    }
}
