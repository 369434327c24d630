use std::path::PathBuf;

use opinion_core::common::error::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("source file unavailable: {}: {reason}", path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("no rows survived cleaning for {file}")]
    EmptyAfterCleaning { file: String },

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {message}")]
    Database { message: String },

    #[error("connection failure: {message}")]
    Connection { message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<StoreError> for EtlError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database { message } => EtlError::Database { message },
            StoreError::Connection { message } => EtlError::Connection { message },
            StoreError::Io(e) => EtlError::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
