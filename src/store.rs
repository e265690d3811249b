//! Transport seam to the remote vector store.
//!
//! The vendor protocol lives behind [`VectorStore`]; this module only fixes
//! the request/response shapes and the error kinds the rest of the crate
//! dispatches on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::DistanceMetric;

/// Error kinds produced uniformly by every transport implementation.
///
/// Policy code matches on these variants instead of downcasting transport
/// internals: conflicts are absorbed by provisioning, throttles are retried,
/// everything else propagates unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{resource} already exists")]
    AlreadyExists { resource: String },

    #[error("store rejected request: {0}")]
    Validation(String),

    #[error("request throttled: {0}")]
    Throttled(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

impl StoreError {
    pub fn already_exists(resource: impl Into<String>) -> Self {
        StoreError::AlreadyExists {
            resource: resource.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, StoreError::Throttled(_))
    }
}

/// Fixed element type of stored vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float32,
}

/// Embedding payload in the store's `{"float32": [...]}` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorData {
    pub float32: Vec<f32>,
}

impl VectorData {
    pub fn new(float32: Vec<f32>) -> Self {
        Self { float32 }
    }
}

/// One vector as the store accepts it on writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorPayload {
    pub key: String,
    pub data: VectorData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// One vector as the store returns it on reads; `data` and `metadata` are
/// present only when the matching return flag was set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorEntry {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<VectorData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIndexRequest {
    pub vector_bucket_name: String,
    pub index_name: String,
    pub dimension: usize,
    pub distance_metric: DistanceMetric,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutVectorsRequest {
    pub vector_bucket_name: String,
    pub index_name: String,
    pub vectors: Vec<VectorPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetVectorsRequest {
    pub vector_bucket_name: String,
    pub index_name: String,
    pub keys: Vec<String>,
    pub return_data: bool,
    pub return_metadata: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVectorsRequest {
    pub vector_bucket_name: String,
    pub index_name: String,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryVectorsRequest {
    pub vector_bucket_name: String,
    pub index_name: String,
    pub query_vector: VectorData,
    pub top_k: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    pub return_metadata: bool,
    pub return_distance: bool,
}

/// One query match as the store returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMatch {
    pub key: String,
    pub distance: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Remote vector store operations this client consumes.
///
/// Implementations translate these calls into the vendor protocol and map
/// vendor failures onto [`StoreError`] kinds. Batch caps are the caller's
/// responsibility; implementations may reject oversized requests with
/// [`StoreError::Validation`].
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn create_vector_bucket(&self, name: &str) -> Result<(), StoreError>;

    async fn create_index(&self, request: CreateIndexRequest) -> Result<(), StoreError>;

    /// Upserts the given vectors and returns the applied count.
    async fn put_vectors(&self, request: PutVectorsRequest) -> Result<usize, StoreError>;

    /// Looks up vectors by key; keys absent from the index are silently
    /// missing from the result.
    async fn get_vectors(&self, request: GetVectorsRequest) -> Result<Vec<VectorEntry>, StoreError>;

    /// Removes the given keys and returns the processed count.
    async fn delete_vectors(&self, request: DeleteVectorsRequest) -> Result<usize, StoreError>;

    async fn query_vectors(&self, request: QueryVectorsRequest)
        -> Result<Vec<QueryMatch>, StoreError>;
}
