use common::ProductId;
use thiserror::Error;

/// Errors that can occur when interacting with the storefront store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed cart line does not exist for the given user.
    ///
    /// Also returned when the line exists but belongs to another user, so
    /// callers cannot distinguish the two cases.
    #[error("cart line not found")]
    LineNotFound,

    /// A cart write referenced a product the catalog does not know.
    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),

    /// The transaction lost a conflict with a concurrent one and was rolled
    /// back. Safe to retry from the top.
    #[error("transaction conflict")]
    Conflict,

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A backend fault that is not a database protocol error.
    #[error("storage fault: {0}")]
    Internal(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
