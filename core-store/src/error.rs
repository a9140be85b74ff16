use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unknown progress status: {0}")]
    InvalidStatus(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
