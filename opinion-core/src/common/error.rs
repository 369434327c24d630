use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {message}")]
    Database { message: String },

    #[error("connection failure: {message}")]
    Connection { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
