use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("referenced row is missing or still in use")]
    ForeignKey,

    #[error("token lookup collision")]
    TokenLookupCollision,

    #[error("unsupported license family: {0}")]
    UnsupportedFamily(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid token format")]
    InvalidTokenFormat,

    #[error("template error: {0}")]
    Template(String),

    #[error("template history error: {0}")]
    Git(#[from] git2::Error),

    #[error("document conversion failed: {0}")]
    Conversion(String),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
