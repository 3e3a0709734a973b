use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    #[error("failed to decompress {filename}: {message}")]
    Decompress { filename: String, message: String },

    #[error("failed to read metadata file {filename}: {message}")]
    Metadata { filename: String, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read location reference file at {0}")]
    LocationsRead(PathBuf),

    #[error("failed to parse location reference file: {0}")]
    LocationsParse(String),

    #[error("unknown metadata field: {0}")]
    UnknownField(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
