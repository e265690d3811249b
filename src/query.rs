//! Similarity queries against one (bucket, index) pair.

use std::cmp::Ordering;

use crate::errors::{Error, Result};
use crate::metadata;
use crate::model::{IndexRef, Metadata, SearchResult, MAX_TOP_K};
use crate::retry::RetryPolicy;
use crate::store::{QueryVectorsRequest, VectorData, VectorStore};

/// Issues nearest-neighbor queries, encoding filters through the metadata
/// codec and returning results in deterministic order.
pub struct SearchClient<S> {
    store: S,
    target: IndexRef,
    max_top_k: usize,
    retry: RetryPolicy,
}

impl<S: VectorStore> SearchClient<S> {
    pub fn new(store: S, target: IndexRef) -> Self {
        Self {
            store,
            target,
            max_top_k: MAX_TOP_K,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_top_k(mut self, max_top_k: usize) -> Self {
        self.max_top_k = max_top_k;
        self
    }

    /// Return up to `top_k` nearest neighbors of `embedding`, closest first.
    ///
    /// `top_k` is clamped to the store maximum; zero returns no results
    /// without a remote call. `filter`, when present, restricts matches to
    /// documents whose metadata satisfies it and is passed to the store in
    /// encoded form, unchanged. Results come back ascending by distance with
    /// ties broken by key, and no match is an empty list, not an error.
    pub async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&Metadata>,
    ) -> Result<Vec<SearchResult>> {
        if embedding.is_empty() {
            return Err(Error::Validation("query vector must not be empty".into()));
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let clamped = top_k.min(self.max_top_k);
        if clamped < top_k {
            tracing::debug!("clamped topK from {} to {}", top_k, clamped);
        }

        let matches = self
            .retry
            .run("query_vectors", || {
                let request = QueryVectorsRequest {
                    vector_bucket_name: self.target.vector_bucket_name.clone(),
                    index_name: self.target.index_name.clone(),
                    query_vector: VectorData::new(embedding.to_vec()),
                    top_k: clamped,
                    filter: filter.map(metadata::encode),
                    return_metadata: true,
                    return_distance: true,
                };
                async move { self.store.query_vectors(request).await }
            })
            .await?;

        let mut results: Vec<SearchResult> = matches
            .into_iter()
            .map(|m| SearchResult {
                key: m.key,
                distance: m.distance,
                metadata: m.metadata.as_ref().map(metadata::decode),
            })
            .collect();
        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });
        Ok(results)
    }
}
