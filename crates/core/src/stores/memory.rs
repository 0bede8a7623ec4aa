use crate::error::{SearchError, StoreError};
use crate::models::{Document, DocumentChunk, EmbeddingRecord, NewDocument, ProcessingStatus, RetrievedChunk};
use crate::traits::{ChunkStore, DocumentStore, VectorIndex};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory document and chunk store. Backs the CLI's single-run flows and
/// the engine tests; a deployment would put a relational database behind the
/// same traits.
pub struct MemoryStore {
    documents: Arc<RwLock<HashMap<i64, Document>>>,
    chunks: Arc<RwLock<Vec<DocumentChunk>>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
            chunks: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, id: i64) -> Result<Option<Document>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents.get(&id).cloned())
    }

    async fn create(&self, new_document: NewDocument) -> Result<Document, StoreError> {
        let now = Utc::now();
        let document = Document {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            title: new_document.title,
            file_path: new_document.file_path,
            file_type: new_document.file_type,
            file_size: new_document.file_size,
            pages_count: 0,
            processing_status: ProcessingStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let mut documents = self.documents.write().await;
        documents.insert(document.id, document.clone());
        debug!(document_id = document.id, title = %document.title, "document registered");
        Ok(document)
    }

    async fn save(&self, document: &Document) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        if !documents.contains_key(&document.id) {
            return Err(StoreError::NotFound(format!("document {}", document.id)));
        }

        let mut updated = document.clone();
        updated.updated_at = Utc::now();
        documents.insert(updated.id, updated);
        Ok(())
    }

    async fn count_chunks(&self, document_id: i64) -> Result<usize, StoreError> {
        let chunks = self.chunks.read().await;
        Ok(chunks
            .iter()
            .filter(|chunk| chunk.document_id == document_id)
            .count())
    }

    async fn list(&self) -> Result<Vec<Document>, StoreError> {
        let documents = self.documents.read().await;
        let mut listed: Vec<Document> = documents.values().cloned().collect();
        listed.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(listed)
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    async fn create_chunk(&self, chunk: DocumentChunk) -> Result<(), StoreError> {
        let mut chunks = self.chunks.write().await;
        chunks.push(chunk);
        Ok(())
    }
}

/// Brute-force cosine-similarity index kept in memory. Honors the
/// document-id filter; a deployment swaps in [`super::QdrantIndex`].
#[derive(Default)]
pub struct MemoryVectorIndex {
    records: Arc<RwLock<HashMap<String, EmbeddingRecord>>>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.records.read().await.contains_key(id)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, record: EmbeddingRecord) -> Result<(), SearchError> {
        let mut records = self.records.write().await;
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
        document_id: Option<i64>,
    ) -> Result<Vec<RetrievedChunk>, SearchError> {
        let records = self.records.read().await;

        let mut scored: Vec<(f32, &EmbeddingRecord)> = records
            .values()
            .filter(|record| document_id.map_or(true, |id| record.document_id == id))
            .map(|record| (cosine_similarity(query_vector, &record.vector), record))
            .collect();

        scored.sort_by(|left, right| {
            right
                .0
                .partial_cmp(&left.0)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(score, record)| RetrievedChunk {
                id: record.id.clone(),
                text: record.text.clone(),
                score,
                document_id: record.document_id,
                chunk_index: record.chunk_index,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{cosine_similarity, MemoryStore, MemoryVectorIndex};
    use crate::models::{embedding_record_id, DocumentChunk, EmbeddingRecord, NewDocument, ProcessingStatus};
    use crate::traits::{ChunkStore, DocumentStore, VectorIndex};
    use chrono::Utc;
    use std::path::PathBuf;

    fn record(document_id: i64, chunk_index: usize, vector: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            id: embedding_record_id(document_id, chunk_index),
            vector,
            text: format!("chunk {chunk_index} of document {document_id}"),
            document_id,
            chunk_index,
            document_title: "fixture".to_string(),
        }
    }

    #[tokio::test]
    async fn created_documents_start_pending_and_round_trip() {
        let store = MemoryStore::new();
        let document = store
            .create(NewDocument {
                title: "resume.pdf".to_string(),
                file_path: PathBuf::from("/tmp/resume.pdf"),
                file_type: "pdf".to_string(),
                file_size: 1024,
            })
            .await
            .expect("create succeeds");

        assert_eq!(document.processing_status, ProcessingStatus::Pending);

        let fetched = store.get(document.id).await.expect("get succeeds");
        assert_eq!(fetched.map(|d| d.title), Some("resume.pdf".to_string()));
        assert!(store.get(999).await.expect("get succeeds").is_none());
    }

    #[tokio::test]
    async fn save_persists_status_mutations() {
        let store = MemoryStore::new();
        let mut document = store
            .create(NewDocument {
                title: "a.txt".to_string(),
                file_path: PathBuf::from("/tmp/a.txt"),
                file_type: "txt".to_string(),
                file_size: 10,
            })
            .await
            .expect("create succeeds");

        document.processing_status = ProcessingStatus::Completed;
        document.pages_count = 4;
        store.save(&document).await.expect("save succeeds");

        let fetched = store
            .get(document.id)
            .await
            .expect("get succeeds")
            .expect("document exists");
        assert_eq!(fetched.processing_status, ProcessingStatus::Completed);
        assert_eq!(fetched.pages_count, 4);
    }

    #[tokio::test]
    async fn chunk_counts_are_scoped_per_document() {
        let store = MemoryStore::new();
        for (document_id, chunk_index) in [(1, 0), (1, 1), (2, 0)] {
            store
                .create_chunk(DocumentChunk {
                    document_id,
                    chunk_index,
                    text_content: "text".to_string(),
                    page_number: 1,
                    embedding_id: embedding_record_id(document_id, chunk_index),
                    created_at: Utc::now(),
                })
                .await
                .expect("create_chunk succeeds");
        }

        assert_eq!(store.count_chunks(1).await.expect("count"), 2);
        assert_eq!(store.count_chunks(2).await.expect("count"), 1);
        assert_eq!(store.count_chunks(3).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn documents_list_newest_first() {
        let store = MemoryStore::new();
        for name in ["first.txt", "second.txt"] {
            store
                .create(NewDocument {
                    title: name.to_string(),
                    file_path: PathBuf::from(format!("/tmp/{name}")),
                    file_type: "txt".to_string(),
                    file_size: 1,
                })
                .await
                .expect("create succeeds");
        }

        let listed = store.list().await.expect("list succeeds");
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at >= listed[1].created_at);
    }

    #[tokio::test]
    async fn upsert_by_id_is_idempotent() {
        let index = MemoryVectorIndex::new();
        index
            .upsert(record(1, 0, vec![1.0, 0.0]))
            .await
            .expect("upsert succeeds");
        index
            .upsert(record(1, 0, vec![0.0, 1.0]))
            .await
            .expect("upsert succeeds");

        assert_eq!(index.len().await, 1);
        assert!(index.contains("doc_1_chunk_0").await);
    }

    #[tokio::test]
    async fn search_honors_the_document_filter() {
        let index = MemoryVectorIndex::new();
        index.upsert(record(1, 0, vec![1.0, 0.0])).await.expect("upsert");
        index.upsert(record(2, 0, vec![1.0, 0.0])).await.expect("upsert");

        let hits = index
            .search(&[1.0, 0.0], 10, Some(2))
            .await
            .expect("search succeeds");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, 2);
    }

    #[tokio::test]
    async fn search_ranks_by_similarity_and_respects_limit() {
        let index = MemoryVectorIndex::new();
        index.upsert(record(1, 0, vec![1.0, 0.0])).await.expect("upsert");
        index.upsert(record(1, 1, vec![0.9, 0.1])).await.expect("upsert");
        index.upsert(record(1, 2, vec![0.0, 1.0])).await.expect("upsert");

        let hits = index
            .search(&[1.0, 0.0], 2, Some(1))
            .await
            .expect("search succeeds");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_index, 0);
        assert_eq!(hits[1].chunk_index, 1);
    }

    #[test]
    fn cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
