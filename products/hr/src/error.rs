use platform_api::ApiError;
use platform_authz::AuthzError;
use sea_orm::{DbErr, SqlErr};

/// Classify a store failure. Uniqueness violations surface as conflicts so a
/// concurrent duplicate create is rejected by the store, not by locking.
pub(crate) fn db_error(err: DbErr) -> ApiError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ApiError::conflict("A record with this username or email already exists")
        }
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            ApiError::conflict("Referenced record does not exist")
        }
        _ => ApiError::internal(anyhow::Error::new(err).context("database error")),
    }
}

pub(crate) fn denied(err: AuthzError) -> ApiError {
    tracing::debug!(reason = %err, "access denied");
    ApiError::Unauthorized
}
