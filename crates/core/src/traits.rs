use crate::error::{SearchError, StoreError};
use crate::models::{Document, DocumentChunk, EmbeddingRecord, NewDocument, RetrievedChunk};
use async_trait::async_trait;

/// Relational record store for documents. Carries no algorithmic weight;
/// the engine only needs create/read/update keyed by id.
#[async_trait]
pub trait DocumentStore {
    async fn get(&self, id: i64) -> Result<Option<Document>, StoreError>;

    async fn create(&self, new_document: NewDocument) -> Result<Document, StoreError>;

    /// Persists status and page-count mutations made by the engine.
    async fn save(&self, document: &Document) -> Result<(), StoreError>;

    async fn count_chunks(&self, document_id: i64) -> Result<usize, StoreError>;

    async fn list(&self) -> Result<Vec<Document>, StoreError>;
}

/// Chunk records are created in bulk during ingest and never updated; they
/// disappear only with their parent document.
#[async_trait]
pub trait ChunkStore {
    async fn create_chunk(&self, chunk: DocumentChunk) -> Result<(), StoreError>;
}

/// Similarity index over embedding records.
#[async_trait]
pub trait VectorIndex {
    /// Idempotent upsert keyed by `record.id`.
    async fn upsert(&self, record: EmbeddingRecord) -> Result<(), SearchError>;

    /// Up to `limit` nearest entries, restricted to `document_id` when the
    /// filter is given. Implementations that cannot filter should fail so
    /// the engine can retry unfiltered.
    async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
        document_id: Option<i64>,
    ) -> Result<Vec<RetrievedChunk>, SearchError>;
}

/// Completion endpoint used to compose answers from retrieved context.
#[async_trait]
pub trait LanguageModel {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, SearchError>;
}
