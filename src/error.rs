// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Errors surfaced by the ledger, the report façade and the storage glue.
///
/// Data-quality problems (unparsable amounts, orphaned categories) are not
/// represented here: they are logged and recovered from where they occur.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Error::InvalidQuery(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}
