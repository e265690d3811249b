//! Bulk insert/select/delete against one (bucket, index) pair.
//!
//! Operations are partitioned to the per-operation batch caps and driven
//! chunk by chunk. Chunks that succeeded stay applied regardless of what
//! happens later; there is no cross-batch atomicity.

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::errors::{Error, Result};
use crate::metadata;
use crate::model::{BatchLimits, IndexRef, VectorDocument};
use crate::partition::partition;
use crate::retry::RetryPolicy;
use crate::store::{
    DeleteVectorsRequest, GetVectorsRequest, PutVectorsRequest, StoreError, VectorData,
    VectorEntry, VectorPayload, VectorStore,
};

/// What to do when a chunk fails mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Stop issuing further chunks and surface the failure (default).
    #[default]
    FailFast,
    /// Attempt every chunk and return the per-chunk report.
    ContinueOnError,
}

/// Per-executor dispatch options. The failure mode is an explicit choice
/// here rather than a process-wide default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkOptions {
    pub mode: FailureMode,
    /// Chunks dispatched concurrently; 1 awaits each chunk before issuing
    /// the next. Cross-key ordering carries no semantic guarantee, so values
    /// above 1 only change scheduling, not results.
    pub max_in_flight: usize,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            mode: FailureMode::FailFast,
            max_in_flight: crate::defaults::DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// Outcome of one chunk, identified by its starting offset in the input.
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub offset: usize,
    pub size: usize,
    pub status: ChunkStatus,
}

#[derive(Debug, Clone)]
pub enum ChunkStatus {
    /// Remote call succeeded; carries the applied item count.
    Applied(usize),
    Failed(StoreError),
    /// Never issued: a prior failure aborted the run or the caller
    /// cancelled.
    Skipped,
}

/// Per-chunk outcomes of one bulk call, in input order.
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    pub chunks: Vec<ChunkOutcome>,
}

impl BulkReport {
    /// Total items applied, summed over successfully processed chunks.
    pub fn processed(&self) -> usize {
        self.chunks
            .iter()
            .map(|c| match c.status {
                ChunkStatus::Applied(n) => n,
                _ => 0,
            })
            .sum()
    }

    pub fn failed(&self) -> usize {
        self.chunks
            .iter()
            .filter(|c| matches!(c.status, ChunkStatus::Failed(_)))
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.chunks
            .iter()
            .all(|c| matches!(c.status, ChunkStatus::Applied(_)))
    }
}

/// Documents found by a bulk select plus the chunk report. Requested keys
/// missing from the index are simply absent from `documents`.
#[derive(Debug, Clone)]
pub struct BulkSelection {
    pub documents: Vec<VectorDocument>,
    pub report: BulkReport,
}

#[derive(Clone)]
enum ChunkCall {
    Put(Vec<VectorPayload>),
    Get(Vec<String>),
    Delete(Vec<String>),
}

struct DriveChunk {
    outcome: ChunkOutcome,
    entries: Vec<VectorEntry>,
}

/// Drives partitioned bulk operations against a [`VectorStore`].
pub struct BulkExecutor<S> {
    store: S,
    target: IndexRef,
    limits: BatchLimits,
    retry: RetryPolicy,
    options: BulkOptions,
    cancel: CancellationToken,
}

impl<S: VectorStore> BulkExecutor<S> {
    pub fn new(store: S, target: IndexRef) -> Self {
        Self {
            store,
            target,
            limits: BatchLimits::default(),
            retry: RetryPolicy::default(),
            options: BulkOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_options(mut self, options: BulkOptions) -> Self {
        self.options = options;
        self
    }

    /// Attach a cancellation token. Cancelling prevents issuance of chunks
    /// that have not started; in-flight remote calls run to completion and
    /// their outcomes are still recorded.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Insert (upsert) documents in chunks of at most `limits.insert`.
    pub async fn insert(&self, documents: &[VectorDocument]) -> Result<BulkReport> {
        if documents.is_empty() {
            tracing::warn!("bulk insert called with no documents");
            return Ok(BulkReport::default());
        }
        validate_keys(documents.iter().map(|d| d.key.as_str()))?;

        let payloads: Vec<VectorPayload> = documents
            .iter()
            .map(|d| VectorPayload {
                key: d.key.clone(),
                data: VectorData::new(d.embedding.clone()),
                metadata: d.metadata.as_ref().map(metadata::encode),
            })
            .collect();
        let calls = partition(&payloads, self.limits.insert)
            .into_iter()
            .map(|c| (c.offset, c.items.len(), ChunkCall::Put(c.items.to_vec())))
            .collect();

        let (report, _) = self.drive("insert", calls).await?;
        Ok(report)
    }

    /// Look up documents by key in chunks of at most `limits.select`.
    pub async fn select(&self, keys: &[String]) -> Result<BulkSelection> {
        if keys.is_empty() {
            tracing::warn!("bulk select called with no keys");
            return Ok(BulkSelection {
                documents: Vec::new(),
                report: BulkReport::default(),
            });
        }
        validate_keys(keys.iter().map(String::as_str))?;

        let calls = partition(keys, self.limits.select)
            .into_iter()
            .map(|c| (c.offset, c.items.len(), ChunkCall::Get(c.items.to_vec())))
            .collect();

        let (report, entries) = self.drive("select", calls).await?;
        let documents = entries.into_iter().map(decode_entry).collect();
        Ok(BulkSelection { documents, report })
    }

    /// Delete keys in chunks of at most `limits.delete`.
    pub async fn delete(&self, keys: &[String]) -> Result<BulkReport> {
        if keys.is_empty() {
            tracing::warn!("bulk delete called with no keys");
            return Ok(BulkReport::default());
        }
        validate_keys(keys.iter().map(String::as_str))?;

        let calls = partition(keys, self.limits.delete)
            .into_iter()
            .map(|c| (c.offset, c.items.len(), ChunkCall::Delete(c.items.to_vec())))
            .collect();

        let (report, _) = self.drive("delete", calls).await?;
        Ok(report)
    }

    /// Dispatch chunks through an ordered stream with bounded concurrency.
    /// The gate stops issuance after a fail-fast failure; the caller token
    /// stops issuance on cancellation. Both are checked when a chunk would
    /// start, so in-flight calls always finish and get recorded.
    async fn drive(
        &self,
        op: &'static str,
        calls: Vec<(usize, usize, ChunkCall)>,
    ) -> Result<(BulkReport, Vec<VectorEntry>)> {
        let gate = CancellationToken::new();
        let futures: Vec<_> = calls
            .into_iter()
            .map(|(offset, size, call)| {
                let gate = gate.clone();
                async move {
                    if self.cancel.is_cancelled() || gate.is_cancelled() {
                        return DriveChunk {
                            outcome: ChunkOutcome {
                                offset,
                                size,
                                status: ChunkStatus::Skipped,
                            },
                            entries: Vec::new(),
                        };
                    }
                    match self.execute_call(&call).await {
                        Ok((applied, entries)) => {
                            tracing::info!(
                                "{} chunk of {} items applied at offset {}",
                                op,
                                applied,
                                offset
                            );
                            DriveChunk {
                                outcome: ChunkOutcome {
                                    offset,
                                    size,
                                    status: ChunkStatus::Applied(applied),
                                },
                                entries,
                            }
                        }
                        Err(err) => {
                            tracing::error!("{} chunk at offset {} failed: {}", op, offset, err);
                            if self.options.mode == FailureMode::FailFast {
                                gate.cancel();
                            }
                            DriveChunk {
                                outcome: ChunkOutcome {
                                    offset,
                                    size,
                                    status: ChunkStatus::Failed(err),
                                },
                                entries: Vec::new(),
                            }
                        }
                    }
                }
            })
            .collect();

        let results: Vec<DriveChunk> = stream::iter(futures)
            .buffered(self.options.max_in_flight.max(1))
            .collect()
            .await;

        let mut entries = Vec::new();
        let mut chunks = Vec::with_capacity(results.len());
        for chunk in results {
            entries.extend(chunk.entries);
            chunks.push(chunk.outcome);
        }
        let report = BulkReport { chunks };

        if self.options.mode == FailureMode::FailFast {
            if let Some(failed) = report
                .chunks
                .iter()
                .find(|c| matches!(c.status, ChunkStatus::Failed(_)))
            {
                let ChunkStatus::Failed(source) = &failed.status else {
                    unreachable!()
                };
                return Err(Error::Chunk {
                    offset: failed.offset,
                    source: source.clone(),
                });
            }
            if report
                .chunks
                .iter()
                .any(|c| matches!(c.status, ChunkStatus::Skipped))
            {
                return Err(Error::Cancelled {
                    completed: report.processed(),
                });
            }
        }
        Ok((report, entries))
    }

    async fn execute_call(&self, call: &ChunkCall) -> std::result::Result<(usize, Vec<VectorEntry>), StoreError> {
        match call {
            ChunkCall::Put(vectors) => {
                let applied = self
                    .retry
                    .run("put_vectors", || {
                        let request = PutVectorsRequest {
                            vector_bucket_name: self.target.vector_bucket_name.clone(),
                            index_name: self.target.index_name.clone(),
                            vectors: vectors.clone(),
                        };
                        async move { self.store.put_vectors(request).await }
                    })
                    .await?;
                Ok((applied, Vec::new()))
            }
            ChunkCall::Get(keys) => {
                let entries = self
                    .retry
                    .run("get_vectors", || {
                        let request = GetVectorsRequest {
                            vector_bucket_name: self.target.vector_bucket_name.clone(),
                            index_name: self.target.index_name.clone(),
                            keys: keys.clone(),
                            return_data: true,
                            return_metadata: true,
                        };
                        async move { self.store.get_vectors(request).await }
                    })
                    .await?;
                // A processed select chunk counts its requested keys; keys
                // the index does not hold are just absent from the entries.
                Ok((keys.len(), entries))
            }
            ChunkCall::Delete(keys) => {
                let processed = self
                    .retry
                    .run("delete_vectors", || {
                        let request = DeleteVectorsRequest {
                            vector_bucket_name: self.target.vector_bucket_name.clone(),
                            index_name: self.target.index_name.clone(),
                            keys: keys.clone(),
                        };
                        async move { self.store.delete_vectors(request).await }
                    })
                    .await?;
                Ok((processed, Vec::new()))
            }
        }
    }
}

fn validate_keys<'a>(keys: impl Iterator<Item = &'a str>) -> Result<()> {
    for (position, key) in keys.enumerate() {
        if key.is_empty() {
            return Err(Error::Validation(format!(
                "empty key at position {position}"
            )));
        }
    }
    Ok(())
}

fn decode_entry(entry: VectorEntry) -> VectorDocument {
    VectorDocument {
        key: entry.key,
        embedding: entry.data.map(|d| d.float32).unwrap_or_default(),
        metadata: entry.metadata.as_ref().map(metadata::decode),
    }
}
