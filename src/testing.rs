//! In-memory [`VectorStore`] double for tests: records every call, supports
//! scripted per-call failures, and answers queries by brute-force scan.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::model::DistanceMetric;
use crate::store::{
    CreateIndexRequest, DeleteVectorsRequest, GetVectorsRequest, PutVectorsRequest, QueryMatch,
    QueryVectorsRequest, StoreError, VectorData, VectorEntry, VectorStore,
};

/// Install a subscriber so test runs show the client's log side effects.
pub(crate) fn init_tracing() {
    use tracing_subscriber::util::SubscriberInitExt;
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .finish()
        .try_init();
}

#[derive(Clone)]
struct StoredVector {
    data: Vec<f32>,
    metadata: Option<Value>,
}

struct IndexState {
    dimension: usize,
    metric: DistanceMetric,
    vectors: BTreeMap<String, StoredVector>,
}

#[derive(Default)]
struct Inner {
    buckets: HashSet<String>,
    indexes: HashMap<(String, String), IndexState>,
    calls: Vec<(&'static str, usize)>,
    scripted_failures: HashMap<(&'static str, usize), StoreError>,
}

/// Cheap-to-clone handle over shared state, like a real client handle.
#[derive(Clone)]
pub(crate) struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Create a bucket and index directly, bypassing call recording.
    pub fn seed_index(&self, bucket: &str, index: &str, dimension: usize, metric: DistanceMetric) {
        let mut inner = self.inner.lock().unwrap();
        inner.buckets.insert(bucket.to_string());
        inner.indexes.insert(
            (bucket.to_string(), index.to_string()),
            IndexState {
                dimension,
                metric,
                vectors: BTreeMap::new(),
            },
        );
    }

    /// Fail the `ordinal`-th call (0-based) of `op` with `error`. Retried
    /// attempts count as separate calls.
    pub fn fail_call(&self, op: &'static str, ordinal: usize, error: StoreError) {
        self.inner
            .lock()
            .unwrap()
            .scripted_failures
            .insert((op, ordinal), error);
    }

    /// Item counts of every recorded call of `op`, in call order.
    pub fn call_sizes(&self, op: &'static str) -> Vec<usize> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(name, _)| *name == op)
            .map(|(_, size)| *size)
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    pub fn vector_count(&self, bucket: &str, index: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .indexes
            .get(&(bucket.to_string(), index.to_string()))
            .map(|state| state.vectors.len())
            .unwrap_or(0)
    }

    /// Records the call and pops any failure scripted for it.
    fn admit(inner: &mut Inner, op: &'static str, size: usize) -> Result<(), StoreError> {
        let ordinal = inner.calls.iter().filter(|(name, _)| *name == op).count();
        inner.calls.push((op, size));
        match inner.scripted_failures.remove(&(op, ordinal)) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn create_vector_bucket(&self, name: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        MemoryStore::admit(&mut inner, "create_vector_bucket", 1)?;
        if !inner.buckets.insert(name.to_string()) {
            return Err(StoreError::already_exists(format!("bucket {name}")));
        }
        Ok(())
    }

    async fn create_index(&self, request: CreateIndexRequest) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        MemoryStore::admit(&mut inner, "create_index", 1)?;
        let id = (request.vector_bucket_name, request.index_name);
        if inner.indexes.contains_key(&id) {
            return Err(StoreError::already_exists(format!("index {}", id.1)));
        }
        inner.indexes.insert(
            id,
            IndexState {
                dimension: request.dimension,
                metric: request.distance_metric,
                vectors: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn put_vectors(&self, request: PutVectorsRequest) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        MemoryStore::admit(&mut inner, "put_vectors", request.vectors.len())?;
        let id = (request.vector_bucket_name, request.index_name);
        let state = inner
            .indexes
            .get_mut(&id)
            .ok_or_else(|| StoreError::Validation(format!("index {} not found", id.1)))?;
        for vector in &request.vectors {
            if vector.data.float32.len() != state.dimension {
                return Err(StoreError::Validation(format!(
                    "vector {} has dimension {}, index expects {}",
                    vector.key,
                    vector.data.float32.len(),
                    state.dimension
                )));
            }
        }
        let count = request.vectors.len();
        for vector in request.vectors {
            state.vectors.insert(
                vector.key,
                StoredVector {
                    data: vector.data.float32,
                    metadata: vector.metadata,
                },
            );
        }
        Ok(count)
    }

    async fn get_vectors(&self, request: GetVectorsRequest) -> Result<Vec<VectorEntry>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        MemoryStore::admit(&mut inner, "get_vectors", request.keys.len())?;
        let id = (request.vector_bucket_name, request.index_name);
        let state = inner
            .indexes
            .get(&id)
            .ok_or_else(|| StoreError::Validation(format!("index {} not found", id.1)))?;
        let entries = request
            .keys
            .iter()
            .filter_map(|key| {
                state.vectors.get(key).map(|stored| VectorEntry {
                    key: key.clone(),
                    data: request
                        .return_data
                        .then(|| VectorData::new(stored.data.clone())),
                    metadata: if request.return_metadata {
                        stored.metadata.clone()
                    } else {
                        None
                    },
                })
            })
            .collect();
        Ok(entries)
    }

    async fn delete_vectors(&self, request: DeleteVectorsRequest) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        MemoryStore::admit(&mut inner, "delete_vectors", request.keys.len())?;
        let id = (request.vector_bucket_name, request.index_name);
        let state = inner
            .indexes
            .get_mut(&id)
            .ok_or_else(|| StoreError::Validation(format!("index {} not found", id.1)))?;
        for key in &request.keys {
            state.vectors.remove(key);
        }
        Ok(request.keys.len())
    }

    async fn query_vectors(
        &self,
        request: QueryVectorsRequest,
    ) -> Result<Vec<QueryMatch>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        MemoryStore::admit(&mut inner, "query_vectors", request.top_k)?;
        let id = (request.vector_bucket_name, request.index_name);
        let state = inner
            .indexes
            .get(&id)
            .ok_or_else(|| StoreError::Validation(format!("index {} not found", id.1)))?;
        let query = &request.query_vector.float32;
        if query.len() != state.dimension {
            return Err(StoreError::Validation(format!(
                "query has dimension {}, index expects {}",
                query.len(),
                state.dimension
            )));
        }

        let mut matches: Vec<QueryMatch> = state
            .vectors
            .iter()
            .filter(|(_, stored)| filter_accepts(request.filter.as_ref(), stored.metadata.as_ref()))
            .map(|(key, stored)| QueryMatch {
                key: key.clone(),
                distance: distance(state.metric, query, &stored.data),
                metadata: if request.return_metadata {
                    stored.metadata.clone()
                } else {
                    None
                },
            })
            .collect();
        matches.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });
        matches.truncate(request.top_k);
        Ok(matches)
    }
}

/// Equality filter: every filter field must be present in the stored
/// metadata document with the same encoded value.
fn filter_accepts(filter: Option<&Value>, metadata: Option<&Value>) -> bool {
    let Some(Value::Object(wanted)) = filter else {
        return true;
    };
    let Some(Value::Object(actual)) = metadata else {
        return wanted.is_empty();
    };
    wanted
        .iter()
        .all(|(key, value)| actual.get(key) == Some(value))
}

fn distance(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::Cosine => {
            let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
            let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm_a == 0.0 || norm_b == 0.0 {
                1.0
            } else {
                1.0 - dot / (norm_a * norm_b)
            }
        }
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
        DistanceMetric::DotProduct => -a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_distance_is_zero_for_parallel_vectors() {
        let d = distance(DistanceMetric::Cosine, &[1.0, 0.0], &[2.0, 0.0]);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn euclidean_distance_matches_hand_computation() {
        let d = distance(DistanceMetric::Euclidean, &[0.0, 0.0], &[3.0, 4.0]);
        assert!((d - 5.0).abs() < 1e-6);
    }

    #[test]
    fn filter_requires_all_fields_to_match() {
        let stored = serde_json::json!({"a": 1, "b": 2});
        let matching = serde_json::json!({"a": 1});
        let missing = serde_json::json!({"c": 3});
        assert!(filter_accepts(Some(&matching), Some(&stored)));
        assert!(!filter_accepts(Some(&missing), Some(&stored)));
        assert!(filter_accepts(None, Some(&stored)));
        assert!(filter_accepts(None, None));
    }
}
