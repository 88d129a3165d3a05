//! Qdrant-backed [`VectorIndex`] implementation.
//!
//! Talks to the Qdrant HTTP API with reqwest: collection
//! delete/create with a named dense field and a named IDF-modified
//! sparse field, acknowledged (`wait=true`) point upsert, and the
//! two-stage `points/query` with a nested dense prefetch, sparse
//! re-score, and RRF fusion.
//!
//! Error mapping: connection failures, timeouts, and 5xx responses are
//! retryable [`PipelineError::IndexUnavailable`]; other HTTP errors
//! are non-retryable. Request bodies and response parsing are pure
//! functions so they can be unit-tested without a running index.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use corpuscle_core::error::{PipelineError, Result};
use corpuscle_core::store::{
    CollectionSchema, DenseVectorSchema, Distance, HybridQuery, ScoredPayload, SparseModifier,
    SparseVectorSchema, StoredPoint, VectorIndex,
};

use crate::config::IndexConfig;

/// HTTP client for one Qdrant deployment.
pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    dense_field: String,
    sparse_field: String,
}

impl QdrantIndex {
    pub fn new(config: &IndexConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            dense_field: config.dense_field.clone(),
            sparse_field: config.sparse_field.clone(),
        })
    }

    fn collection_url(&self, name: &str) -> String {
        format!("{}/collections/{}", self.base_url, name)
    }
}

fn transport_error(e: reqwest::Error) -> PipelineError {
    if e.is_timeout() || e.is_connect() {
        PipelineError::index_retryable(e)
    } else {
        PipelineError::index_fatal(e)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = format!("index returned {status}: {text}");
    if status.is_server_error() {
        Err(PipelineError::index_retryable(message))
    } else {
        Err(PipelineError::index_fatal(message))
    }
}

/// Body for `PUT /collections/{name}`.
pub fn build_create_body(schema: &CollectionSchema) -> Value {
    json!({
        "vectors": {
            schema.dense.name.as_str(): {
                "size": schema.dense.dims,
                "distance": "Cosine",
            }
        },
        "sparse_vectors": {
            schema.sparse.name.as_str(): {
                "modifier": "idf",
            }
        }
    })
}

/// Body for `PUT /collections/{name}/points?wait=true`.
pub fn build_upsert_body(points: &[StoredPoint], dense_field: &str, sparse_field: &str) -> Value {
    let points: Vec<Value> = points
        .iter()
        .map(|p| {
            json!({
                "id": p.id.to_string(),
                "vector": {
                    dense_field: p.dense,
                    sparse_field: {
                        "indices": p.sparse.indices,
                        "values": p.sparse.values,
                    }
                },
                "payload": { "text": p.payload }
            })
        })
        .collect();
    json!({ "points": points })
}

/// Body for `POST /collections/{name}/points/query`: dense prefetch,
/// sparse re-score within it, RRF fusion on top.
pub fn build_query_body(query: &HybridQuery, dense_field: &str, sparse_field: &str) -> Value {
    json!({
        "prefetch": {
            "prefetch": {
                "query": query.dense,
                "using": dense_field,
                "limit": query.prefetch_limit,
            },
            "query": {
                "indices": query.sparse.indices,
                "values": query.sparse.values,
            },
            "using": sparse_field,
            "limit": query.rescore_limit,
        },
        "query": { "fusion": "rrf" },
        "limit": query.limit,
        "with_payload": true,
    })
}

/// Extract the dual-vector schema from a `GET /collections/{name}` response.
pub fn parse_schema(info: &Value) -> Option<CollectionSchema> {
    let params = info.get("result")?.get("config")?.get("params")?;

    let (dense_name, dense_cfg) = params.get("vectors")?.as_object()?.iter().next()?;
    let dims = dense_cfg.get("size")?.as_u64()? as usize;
    let distance = match dense_cfg.get("distance")?.as_str()? {
        "Cosine" => Distance::Cosine,
        _ => return None,
    };

    let (sparse_name, sparse_cfg) = params.get("sparse_vectors")?.as_object()?.iter().next()?;
    let modifier = match sparse_cfg.get("modifier").and_then(|m| m.as_str()) {
        Some("idf") | Some("Idf") => SparseModifier::Idf,
        _ => return None,
    };

    Some(CollectionSchema {
        dense: DenseVectorSchema {
            name: dense_name.clone(),
            dims,
            distance,
        },
        sparse: SparseVectorSchema {
            name: sparse_name.clone(),
            modifier,
        },
    })
}

/// Extract ranked payloads from a `points/query` response.
pub fn parse_query_response(body: &Value) -> Vec<ScoredPayload> {
    body.get("result")
        .and_then(|r| r.get("points"))
        .and_then(|p| p.as_array())
        .map(|points| {
            points
                .iter()
                .filter_map(|point| {
                    let payload = point
                        .get("payload")?
                        .get("text")?
                        .as_str()?
                        .to_string();
                    let score = point.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0);
                    Some(ScoredPayload { payload, score })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn recreate_collection(&self, name: &str, schema: &CollectionSchema) -> Result<()> {
        // Drop; a 404 just means there was nothing to drop.
        let response = self
            .client
            .delete(self.collection_url(name))
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() && response.status() != reqwest::StatusCode::NOT_FOUND {
            check_status(response).await?;
        }

        let response = self
            .client
            .put(self.collection_url(name))
            .json(&build_create_body(schema))
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        tracing::info!(collection = name, "collection recreated");
        Ok(())
    }

    async fn schema(&self, name: &str) -> Result<Option<CollectionSchema>> {
        let response = self
            .client
            .get(self.collection_url(name))
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        let info: Value = response
            .json()
            .await
            .map_err(|e| PipelineError::index_fatal(format!("invalid collection info: {e}")))?;
        Ok(parse_schema(&info))
    }

    async fn upsert(&self, name: &str, points: Vec<StoredPoint>, wait: bool) -> Result<()> {
        let body = build_upsert_body(&points, &self.dense_field, &self.sparse_field);
        let url = format!("{}/points?wait={}", self.collection_url(name), wait);
        let response = self
            .client
            .put(url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        tracing::debug!(collection = name, wait, "upsert acknowledged by index");
        Ok(())
    }

    async fn query(&self, name: &str, query: &HybridQuery) -> Result<Vec<ScoredPayload>> {
        query.validate()?;

        let body = build_query_body(query, &self.dense_field, &self.sparse_field);
        let url = format!("{}/points/query", self.collection_url(name));
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        // A missing collection is an empty result, not an error.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let response = check_status(response).await?;
        let parsed: Value = response
            .json()
            .await
            .map_err(|e| PipelineError::index_fatal(format!("invalid query response: {e}")))?;
        Ok(parse_query_response(&parsed))
    }

    async fn count(&self, name: &str) -> Result<usize> {
        let response = self
            .client
            .get(self.collection_url(name))
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(0);
        }
        let response = check_status(response).await?;
        let info: Value = response
            .json()
            .await
            .map_err(|e| PipelineError::index_fatal(format!("invalid collection info: {e}")))?;
        Ok(info
            .get("result")
            .and_then(|r| r.get("points_count"))
            .and_then(|c| c.as_u64())
            .unwrap_or(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpuscle_core::embedding::SparseVector;
    use uuid::Uuid;

    fn schema() -> CollectionSchema {
        CollectionSchema {
            dense: DenseVectorSchema {
                name: "dense".to_string(),
                dims: 384,
                distance: Distance::Cosine,
            },
            sparse: SparseVectorSchema {
                name: "sparse".to_string(),
                modifier: SparseModifier::Idf,
            },
        }
    }

    #[test]
    fn test_create_body_declares_both_fields() {
        let body = build_create_body(&schema());
        assert_eq!(body["vectors"]["dense"]["size"], 384);
        assert_eq!(body["vectors"]["dense"]["distance"], "Cosine");
        assert_eq!(body["sparse_vectors"]["sparse"]["modifier"], "idf");
    }

    #[test]
    fn test_upsert_body_carries_both_vectors_and_payload() {
        let point = StoredPoint {
            id: Uuid::new_v4(),
            dense: vec![0.1, 0.2],
            sparse: SparseVector::new(vec![7], vec![1.5]),
            payload: "chunk text".to_string(),
        };
        let body = build_upsert_body(&[point.clone()], "dense", "sparse");
        let entry = &body["points"][0];
        assert_eq!(entry["id"], point.id.to_string());
        assert_eq!(entry["vector"]["sparse"]["indices"][0], 7);
        assert_eq!(entry["payload"]["text"], "chunk text");
    }

    #[test]
    fn test_query_body_nests_prefetch_and_fuses_with_rrf() {
        let q = HybridQuery {
            dense: vec![0.5; 4],
            sparse: SparseVector::new(vec![1, 2], vec![1.0, 2.0]),
            prefetch_limit: 250,
            rescore_limit: 50,
            limit: 5,
        };
        let body = build_query_body(&q, "dense", "sparse");
        assert_eq!(body["prefetch"]["prefetch"]["using"], "dense");
        assert_eq!(body["prefetch"]["prefetch"]["limit"], 250);
        assert_eq!(body["prefetch"]["using"], "sparse");
        assert_eq!(body["prefetch"]["limit"], 50);
        assert_eq!(body["query"]["fusion"], "rrf");
        assert_eq!(body["limit"], 5);
    }

    #[test]
    fn test_parse_schema_roundtrip() {
        let info = serde_json::json!({
            "result": {
                "config": {
                    "params": {
                        "vectors": { "dense": { "size": 384, "distance": "Cosine" } },
                        "sparse_vectors": { "sparse": { "modifier": "idf" } }
                    }
                }
            }
        });
        let parsed = parse_schema(&info).unwrap();
        assert!(parsed.matches(&schema()));
    }

    #[test]
    fn test_parse_schema_rejects_wrong_distance() {
        let info = serde_json::json!({
            "result": {
                "config": {
                    "params": {
                        "vectors": { "dense": { "size": 384, "distance": "Dot" } },
                        "sparse_vectors": { "sparse": { "modifier": "idf" } }
                    }
                }
            }
        });
        assert!(parse_schema(&info).is_none());
    }

    #[test]
    fn test_parse_query_response_orders_payloads() {
        let body = serde_json::json!({
            "result": {
                "points": [
                    { "id": "a", "score": 0.9, "payload": { "text": "first" } },
                    { "id": "b", "score": 0.5, "payload": { "text": "second" } }
                ]
            }
        });
        let results = parse_query_response(&body);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].payload, "first");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_parse_query_response_tolerates_missing_result() {
        assert!(parse_query_response(&serde_json::json!({})).is_empty());
    }
}
