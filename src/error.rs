//! Error taxonomy for the catalog store and the actions built on top of it.
//!
//! Malformed values found while importing are never errors: the coercion
//! helpers in [`crate::reconcile`] absorb them into documented defaults.

use std::path::PathBuf;

use thiserror::Error;

use crate::record::Location;

/// Failures reported by a [`crate::store::CatalogStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network, quota or otherwise temporary failure; reads are retried.
    #[error("catalog store temporarily unavailable: {0}")]
    Transient(String),
    #[error("catalog store read failed: {0}")]
    Permanent(String),
    #[error("catalog store write failed: {0}")]
    Write(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Raised whenever a write of an empty record set is requested.
    #[error("refusing to replace the catalog with an empty table; operation cancelled")]
    EmptyWriteGuard,
    #[error("no wine with id {id} in the catalog")]
    RecordNotFound { id: u64 },
    #[error("wine {id} is stored at '{location}', only consumed wines can be restored")]
    NotConsumed { id: u64, location: Location },
    #[error("cannot read {path:?} as a table: {detail}")]
    ImportParse { path: PathBuf, detail: String },
    #[error("invalid wine: {0}")]
    Invalid(String),
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::RecordNotFound { .. })
    }
}
