//! Idempotent bucket and index provisioning.

use crate::errors::{Error, Result};
use crate::model::{DistanceMetric, IndexRef, MAX_DIMENSION};
use crate::store::{CreateIndexRequest, DataType, VectorStore};

/// Ensures buckets and indexes exist. A store-reported conflict means the
/// resource is already there, which is exactly the desired state; any other
/// failure propagates unchanged, with no retry at this layer.
pub struct Provisioner<S> {
    store: S,
}

impl<S: VectorStore> Provisioner<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create_vector_bucket(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::Validation("bucket name must not be empty".into()));
        }
        match self.store.create_vector_bucket(name).await {
            Ok(()) => {
                tracing::info!("created vector bucket {}", name);
                Ok(())
            }
            Err(err) if err.is_conflict() => {
                tracing::info!("vector bucket {} already exists", name);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Create an index of `dimension`-wide float32 vectors ranked by
    /// `metric`. `dimension` must be in `1..=MAX_DIMENSION`.
    pub async fn create_index(
        &self,
        target: &IndexRef,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<()> {
        if target.index_name.is_empty() {
            return Err(Error::Validation("index name must not be empty".into()));
        }
        if dimension == 0 || dimension > MAX_DIMENSION {
            return Err(Error::Validation(format!(
                "dimension must be in 1..={MAX_DIMENSION}, got {dimension}"
            )));
        }
        let request = CreateIndexRequest {
            vector_bucket_name: target.vector_bucket_name.clone(),
            index_name: target.index_name.clone(),
            dimension,
            distance_metric: metric,
            data_type: DataType::Float32,
        };
        match self.store.create_index(request).await {
            Ok(()) => {
                tracing::info!(
                    "created index {}/{} ({}d, {})",
                    target.vector_bucket_name,
                    target.index_name,
                    dimension,
                    metric.as_str()
                );
                Ok(())
            }
            Err(err) if err.is_conflict() => {
                tracing::info!(
                    "index {}/{} already exists",
                    target.vector_bucket_name,
                    target.index_name
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
