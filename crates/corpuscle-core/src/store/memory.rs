//! In-memory [`VectorIndex`] implementation for tests.
//!
//! Brute-force reference semantics behind `std::sync::RwLock`:
//! stage 1 ranks every point by cosine similarity against the dense
//! query, stage 2 re-ranks the stage-1 candidates by IDF-modified
//! sparse dot product, and the two ranked lists are merged with
//! Reciprocal Rank Fusion.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::embedding::{cosine_similarity, sparse_dot};
use crate::fusion::{reciprocal_rank_fusion, DEFAULT_RRF_K};

use super::{CollectionSchema, HybridQuery, ScoredPayload, StoredPoint, VectorIndex};
use crate::error::Result;

struct Collection {
    schema: CollectionSchema,
    points: Vec<StoredPoint>,
}

/// Brute-force in-memory index.
#[derive(Default)]
pub struct InMemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

/// BM25-style inverse document frequency per term index.
fn idf_weights(points: &[StoredPoint]) -> HashMap<u32, f32> {
    let n = points.len() as f32;
    let mut df: HashMap<u32, f32> = HashMap::new();
    for point in points {
        for &idx in &point.sparse.indices {
            *df.entry(idx).or_insert(0.0) += 1.0;
        }
    }
    df.into_iter()
        .map(|(idx, d)| (idx, ((n - d + 0.5) / (d + 0.5) + 1.0).ln()))
        .collect()
}

/// Rank point ids best-first by `score`, keeping the top `limit`.
fn rank_by<F>(points: &[StoredPoint], limit: usize, score: F) -> Vec<Uuid>
where
    F: Fn(&StoredPoint) -> f32,
{
    let mut scored: Vec<(Uuid, f32)> = points.iter().map(|p| (p.id, score(p))).collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored.into_iter().map(|(id, _)| id).collect()
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn recreate_collection(&self, name: &str, schema: &CollectionSchema) -> Result<()> {
        let mut collections = self.collections.write().unwrap();
        collections.insert(
            name.to_string(),
            Collection {
                schema: schema.clone(),
                points: Vec::new(),
            },
        );
        Ok(())
    }

    async fn schema(&self, name: &str) -> Result<Option<CollectionSchema>> {
        let collections = self.collections.read().unwrap();
        Ok(collections.get(name).map(|c| c.schema.clone()))
    }

    async fn upsert(&self, name: &str, points: Vec<StoredPoint>, _wait: bool) -> Result<()> {
        let mut collections = self.collections.write().unwrap();
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| Collection {
                schema: points
                    .first()
                    .map(|p| placeholder_schema(p.dense.len()))
                    .unwrap_or_else(|| placeholder_schema(0)),
                points: Vec::new(),
            });
        for point in points {
            collection.points.retain(|p| p.id != point.id);
            collection.points.push(point);
        }
        Ok(())
    }

    async fn query(&self, name: &str, query: &HybridQuery) -> Result<Vec<ScoredPayload>> {
        query.validate()?;

        let collections = self.collections.read().unwrap();
        let collection = match collections.get(name) {
            Some(c) => c,
            None => return Ok(Vec::new()),
        };
        if collection.points.is_empty() {
            return Ok(Vec::new());
        }

        let points = &collection.points;
        let idf = idf_weights(points);

        // Stage 1: coarse dense recall over the whole collection.
        let dense_ranked = rank_by(points, query.prefetch_limit, |p| {
            cosine_similarity(&query.dense, &p.dense)
        });

        // Stage 2: sparse precision re-rank within the stage-1 set.
        let candidates: Vec<StoredPoint> = points
            .iter()
            .filter(|p| dense_ranked.contains(&p.id))
            .cloned()
            .collect();
        let sparse_ranked = rank_by(&candidates, query.rescore_limit, |p| {
            sparse_dot(&query.sparse, &p.sparse, &idf)
        });

        let fused = reciprocal_rank_fusion(&[dense_ranked, sparse_ranked], DEFAULT_RRF_K);

        let by_id: HashMap<Uuid, &StoredPoint> = points.iter().map(|p| (p.id, p)).collect();
        Ok(fused
            .into_iter()
            .take(query.limit)
            .filter_map(|(id, score)| {
                by_id.get(&id).map(|p| ScoredPayload {
                    payload: p.payload.clone(),
                    score,
                })
            })
            .collect())
    }

    async fn count(&self, name: &str) -> Result<usize> {
        let collections = self.collections.read().unwrap();
        Ok(collections.get(name).map(|c| c.points.len()).unwrap_or(0))
    }
}

/// Schema synthesized when points are upserted into a collection that
/// was never explicitly created. Test-only convenience.
fn placeholder_schema(dims: usize) -> CollectionSchema {
    use super::{DenseVectorSchema, Distance, SparseModifier, SparseVectorSchema};
    CollectionSchema {
        dense: DenseVectorSchema {
            name: "dense".to_string(),
            dims,
            distance: Distance::Cosine,
        },
        sparse: SparseVectorSchema {
            name: "sparse".to_string(),
            modifier: SparseModifier::Idf,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::SparseVector;

    fn point(dense: Vec<f32>, sparse_indices: Vec<u32>, payload: &str) -> StoredPoint {
        let values = vec![1.0; sparse_indices.len()];
        StoredPoint {
            id: Uuid::new_v4(),
            dense,
            sparse: SparseVector::new(sparse_indices, values),
            payload: payload.to_string(),
        }
    }

    fn query(dense: Vec<f32>, sparse_indices: Vec<u32>, limit: usize) -> HybridQuery {
        let values = vec![1.0; sparse_indices.len()];
        HybridQuery {
            dense,
            sparse: SparseVector::new(sparse_indices, values),
            prefetch_limit: 250,
            rescore_limit: 50,
            limit,
        }
    }

    #[tokio::test]
    async fn test_missing_collection_yields_empty_result() {
        let index = InMemoryIndex::new();
        let results = index
            .query("nope", &query(vec![1.0, 0.0], vec![1], 5))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_recreate_drops_previous_points() {
        let index = InMemoryIndex::new();
        index
            .upsert("c", vec![point(vec![1.0, 0.0], vec![1], "old")], true)
            .await
            .unwrap();
        assert_eq!(index.count("c").await.unwrap(), 1);

        let schema = placeholder_schema(2);
        index.recreate_collection("c", &schema).await.unwrap();
        assert_eq!(index.count("c").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_ranks_matching_point_first() {
        let index = InMemoryIndex::new();
        index
            .upsert(
                "c",
                vec![
                    point(vec![1.0, 0.0, 0.0], vec![10, 11], "alpha"),
                    point(vec![0.0, 1.0, 0.0], vec![20, 21], "beta"),
                    point(vec![0.0, 0.0, 1.0], vec![30, 31], "gamma"),
                ],
                true,
            )
            .await
            .unwrap();

        // Query aligned with "beta" on both representations.
        let results = index
            .query("c", &query(vec![0.0, 1.0, 0.0], vec![20], 2))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].payload, "beta");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_limit_truncates() {
        let index = InMemoryIndex::new();
        index
            .upsert(
                "c",
                vec![
                    point(vec![1.0, 0.0], vec![1], "a"),
                    point(vec![0.9, 0.1], vec![2], "b"),
                    point(vec![0.8, 0.2], vec![3], "c"),
                ],
                true,
            )
            .await
            .unwrap();

        let results = index
            .query("c", &query(vec![1.0, 0.0], vec![1], 1))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_limits_rejected() {
        let index = InMemoryIndex::new();
        let mut q = query(vec![1.0], vec![1], 0);
        assert!(index.query("c", &q).await.is_err());

        q.limit = 10;
        q.rescore_limit = 5;
        assert!(index.query("c", &q).await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let index = InMemoryIndex::new();
        let mut p = point(vec![1.0], vec![1], "first");
        let id = p.id;
        index.upsert("c", vec![p.clone()], true).await.unwrap();
        p.payload = "second".to_string();
        p.id = id;
        index.upsert("c", vec![p], true).await.unwrap();
        assert_eq!(index.count("c").await.unwrap(), 1);
    }
}
