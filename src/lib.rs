//! Batch-oriented client layer for S3-style vector index stores.
//!
//! Partitions large insert/select/delete operations into service-sized
//! chunks, provisions buckets and indexes idempotently, round-trips typed
//! metadata through a self-describing document encoding, and runs
//! similarity queries. The remote protocol lives behind the
//! [`store::VectorStore`] trait; this crate owns the batching, failure, and
//! retry semantics on top of it.

pub mod bulk;
pub mod metadata;
pub mod model;
pub mod partition;
pub mod provision;
pub mod query;
pub mod retry;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use bulk::{
    BulkExecutor, BulkOptions, BulkReport, BulkSelection, ChunkOutcome, ChunkStatus, FailureMode,
};
pub use errors::{Error, Result};
pub use model::*;
pub use provision::Provisioner;
pub use query::SearchClient;
pub use retry::RetryPolicy;
pub use store::{StoreError, VectorStore};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    use crate::model::MIN_SUSTAINED_WRITE_RPS;

    pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
    /// Base backoff delay, sized to the store's guaranteed write floor.
    pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000 / MIN_SUSTAINED_WRITE_RPS as u64;
    pub const DEFAULT_MAX_IN_FLIGHT: usize = 1;
}

/// Error types for the client
pub mod errors {
    use crate::store::StoreError;

    pub type Result<T> = std::result::Result<T, Error>;

    /// What a caller gets when a bulk call, provisioning call, or query does
    /// not produce a definite result.
    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("validation failed: {0}")]
        Validation(String),

        /// A chunk failed mid-run; `offset` is the failing chunk's starting
        /// position in the input. Earlier chunks stay applied.
        #[error("chunk at offset {offset} failed: {source}")]
        Chunk {
            offset: usize,
            source: StoreError,
        },

        /// The caller's cancellation token stopped issuance; `completed`
        /// items had already been applied.
        #[error("operation cancelled after {completed} items")]
        Cancelled { completed: usize },

        #[error(transparent)]
        Store(#[from] StoreError),
    }
}
