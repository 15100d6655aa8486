use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or missing input. Always raised before a transaction opens.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: i64, available: i64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage failure inside an atomic unit of work. The transaction has
    /// been rolled back; nothing it wrote is visible.
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Storage failure outside of any transaction (plain reads, admin writes).
    #[error("Database error: {0}")]
    Database(String),

    #[error("Integration error: {0}")]
    Integration(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{} {} not found", entity, id))
    }

    /// Re-tags a storage error raised inside a transaction. Domain errors
    /// (not found, conflict, inventory) pass through unchanged.
    pub fn into_transactional(self) -> Self {
        match self {
            AppError::Database(msg) => AppError::Transaction(msg),
            other => other,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(format!("migration failed: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Integration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_transactional_only_retags_storage_errors() {
        let err = AppError::Database("disk I/O error".to_string()).into_transactional();
        assert!(matches!(err, AppError::Transaction(ref m) if m == "disk I/O error"));

        let err = AppError::Conflict("already cancelled".to_string()).into_transactional();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_insufficient_inventory_message() {
        let err = AppError::InsufficientInventory { requested: 3, available: 2 };
        assert_eq!(err.to_string(), "Insufficient inventory: requested 3, available 2");
    }
}
