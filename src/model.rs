use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hard service caps for one remote call, per operation kind.
pub const MAX_INSERT_BATCH: usize = 500;
pub const MAX_SELECT_BATCH: usize = 100;
pub const MAX_DELETE_BATCH: usize = 500;
/// Largest neighbor count one query may request.
pub const MAX_TOP_K: usize = 30;
/// Largest index dimension the store accepts.
pub const MAX_DIMENSION: usize = 4096;
/// Sustained write rate the store guarantees per index (requests/second).
pub const MIN_SUSTAINED_WRITE_RPS: usize = 5;

/// One metadata value in the store's closed primitive set.
///
/// Values outside this set are carried through [`crate::metadata::coerce`]
/// as their textual form, which is lossy but never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Str(String),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Bool(bool),
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::Str(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::Str(v)
    }
}

impl From<i32> for MetadataValue {
    fn from(v: i32) -> Self {
        MetadataValue::Int32(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Int64(v)
    }
}

impl From<f32> for MetadataValue {
    fn from(v: f32) -> Self {
        MetadataValue::Float32(v)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float64(v)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Bool(v)
    }
}

/// Key-to-primitive metadata mapping attached to a vector document.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A vector with its key and optional metadata. The remote store is the sole
/// source of truth; re-inserting an existing key is a service-side upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorDocument {
    pub key: String,
    pub embedding: Vec<f32>,
    pub metadata: Option<Metadata>,
}

impl VectorDocument {
    pub fn new(key: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            key: key.into(),
            embedding,
            metadata: None,
        }
    }

    /// Mint a document with a fresh UUIDv4 key.
    pub fn generate(embedding: Vec<f32>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), embedding)
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// One similarity match. Smaller distance means more similar.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub key: String,
    pub distance: f32,
    pub metadata: Option<Metadata>,
}

/// Distance function an index ranks neighbors with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    Cosine,
    Euclidean,
    DotProduct,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::DotProduct => "dotproduct",
        }
    }
}

/// Per-operation batch ceilings. Defaults match the service caps; lower
/// values are fine, zero is not a valid limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub insert: usize,
    pub select: usize,
    pub delete: usize,
    pub top_k: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            insert: MAX_INSERT_BATCH,
            select: MAX_SELECT_BATCH,
            delete: MAX_DELETE_BATCH,
            top_k: MAX_TOP_K,
        }
    }
}

/// Names the (bucket, index) pair every remote call is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRef {
    pub vector_bucket_name: String,
    pub index_name: String,
}

impl IndexRef {
    pub fn new(bucket: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            vector_bucket_name: bucket.into(),
            index_name: index.into(),
        }
    }
}
