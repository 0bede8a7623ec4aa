use crate::error::SearchError;
use crate::models::{EmbeddingRecord, RetrievedChunk};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Qdrant-backed vector index, driven over its HTTP API. Point ids are
/// UUIDs derived from the record id, so upserts by the same
/// `doc_<id>_chunk_<index>` key overwrite prior entries.
pub struct QdrantIndex {
    endpoint: String,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantIndex {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        vector_size: usize,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            collection: collection.into(),
            client: Client::new(),
            vector_size,
        }
    }

    /// Creates the collection with a cosine-distance vector schema; an
    /// already-existing collection is left untouched.
    pub async fn ensure_collection(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .put(format!("{}/collections/{}", self.endpoint, self.collection))
            .json(&json!({
                "vectors": { "size": self.vector_size, "distance": "Cosine" },
            }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::CONFLICT {
            return Ok(());
        }

        Err(SearchError::BackendResponse {
            backend: "qdrant".to_string(),
            details: status.to_string(),
        })
    }

    /// Qdrant point ids must be integers or UUIDs; record ids are hashed
    /// into a stable UUID so the same record always maps to the same point.
    fn point_uuid(record_id: &str) -> Uuid {
        let digest = Sha256::digest(record_id.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Uuid::from_bytes(bytes)
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, record: EmbeddingRecord) -> Result<(), SearchError> {
        if record.vector.len() != self.vector_size {
            return Err(SearchError::Request(format!(
                "embedding dimension {} != {}",
                record.vector.len(),
                self.vector_size
            )));
        }

        let point = json!({
            "id": Self::point_uuid(&record.id).to_string(),
            "vector": record.vector,
            "payload": {
                "record_id": record.id,
                "document_id": record.document_id,
                "chunk_index": record.chunk_index,
                "document_title": record.document_title,
                "text": record.text,
            },
        });

        let response = self
            .client
            .put(format!(
                "{}/collections/{}/points?wait=true",
                self.endpoint, self.collection
            ))
            .json(&json!({ "points": [point] }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
        document_id: Option<i64>,
    ) -> Result<Vec<RetrievedChunk>, SearchError> {
        if query_vector.len() != self.vector_size {
            return Err(SearchError::Request(format!(
                "query vector dim {} is not {}",
                query_vector.len(),
                self.vector_size
            )));
        }

        let mut body = json!({
            "vector": query_vector,
            "limit": limit,
            "with_payload": true,
        });

        if let Some(document_id) = document_id {
            body["filter"] = json!({
                "must": [{ "key": "document_id", "match": { "value": document_id } }],
            });
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/search",
                self.endpoint, self.collection
            ))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut result = Vec::new();
        for hit in hits {
            let id = hit
                .pointer("/payload/record_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let text = hit
                .pointer("/payload/text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let document_id = hit
                .pointer("/payload/document_id")
                .and_then(Value::as_i64)
                .unwrap_or_default();
            let chunk_index = hit
                .pointer("/payload/chunk_index")
                .and_then(Value::as_u64)
                .unwrap_or_default() as usize;
            let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0) as f32;

            result.push(RetrievedChunk {
                id,
                text,
                score,
                document_id,
                chunk_index,
            });
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::QdrantIndex;

    #[test]
    fn point_uuids_are_stable_per_record_id() {
        let first = QdrantIndex::point_uuid("doc_1_chunk_0");
        let second = QdrantIndex::point_uuid("doc_1_chunk_0");
        let other = QdrantIndex::point_uuid("doc_1_chunk_1");

        assert_eq!(first, second);
        assert_ne!(first, other);
    }
}
