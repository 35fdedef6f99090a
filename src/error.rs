//! Error taxonomy: `InputValidation` and `Internal`, one variant per
//! failure class, with messages usable directly as log/UI text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
pub enum EngineError {
    #[error("invalid transaction at index {index}: {reason}")]
    InputValidation { index: usize, reason: String },

    #[error("internal invariant violated: {0}")]
    Internal(String),
}
