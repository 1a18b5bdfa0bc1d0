//! Error types for `ripple-core`.

use thiserror::Error;

/// Error source reported by an [`EntityFetcher`](crate::registry::EntityFetcher).
pub type FetchError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// A reference names an entity kind with no registered fetcher. This is a
  /// configuration error, surfaced to the caller and never retried.
  #[error("unknown entity kind: {0:?}")]
  UnknownEntityKind(String),

  #[error("bulk fetch for entity kind {kind:?} failed: {source}")]
  Fetch {
    kind:   String,
    #[source]
    source: FetchError,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
