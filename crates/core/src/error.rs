use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a trained blocking model or evaluating it.
#[derive(Error, Debug)]
pub enum CoreError {
    /// No trained model at the configured location.
    #[error("trained model unavailable at {}: {source}", path.display())]
    ModelUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("trained model is not valid JSON: {0}")]
    ModelFormat(#[from] serde_json::Error),

    #[error("invalid blocking model: {0}")]
    InvalidModel(String),

    /// An index predicate was evaluated before `index()` ran for its field.
    #[error("index predicate on field `{field}` evaluated before the field was indexed")]
    IndexNotBuilt { field: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
