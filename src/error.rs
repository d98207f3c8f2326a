//! Error taxonomy for catalog access and search.
//!
//! Only [`StoreError::Unavailable`] crosses the search boundary. Missing and
//! malformed records are absorbed by the engine, which skips the node.

use crate::song::SongId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The record does not exist (or no longer exists).
    #[error("song {0} not found")]
    NotFound(SongId),

    /// The record exists but could not be decoded.
    #[error("malformed record for song {id}: {reason}")]
    Malformed { id: SongId, reason: String },

    /// The backing store could not be reached or failed mid-query.
    #[error("catalog store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Hard failures abort a search. Everything else only skips a node.
    #[must_use]
    pub const fn is_hard(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search failed: {0}")]
    Store(#[from] StoreError),

    #[error("search cancelled")]
    Cancelled,

    #[error("search exceeded its deadline")]
    TimedOut,

    #[error("could not build search worker pool: {0}")]
    WorkerPool(String),
}
