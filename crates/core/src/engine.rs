use crate::chunking::{Chunker, ChunkingConfig};
use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::extractor::TextExtractor;
use crate::models::{
    embedding_record_id, Document, DocumentChunk, EmbeddingRecord, FileFormat, ProcessingStatus,
    QueryAnswer, QueryOutcome,
};
use crate::traits::{ChunkStore, DocumentStore, LanguageModel, VectorIndex};
use chrono::Utc;
use tracing::{info, warn};

/// Default number of chunks retrieved per question; the outer interface
/// bounds requests to [1, 10].
pub const DEFAULT_NUM_CHUNKS: usize = 3;

const DEGRADED_CONTEXT_CHARS: usize = 300;

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub chunking: ChunkingConfig,
    pub answer_max_tokens: u32,
    pub answer_temperature: f32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            answer_max_tokens: 500,
            answer_temperature: 0.3,
        }
    }
}

/// Orchestrates the document pipeline: extraction, chunking, embedding, and
/// indexing at ingest time; retrieval and answer composition at query time.
/// Collaborators are injected once at construction and shared by reference
/// with the request handlers.
pub struct RetrievalEngine<S, V, L, E> {
    store: S,
    index: V,
    llm: L,
    embedder: E,
    extractor: TextExtractor,
    chunker: Chunker,
    options: EngineOptions,
}

impl<S, V, L, E> RetrievalEngine<S, V, L, E>
where
    S: DocumentStore + ChunkStore + Send + Sync,
    V: VectorIndex + Send + Sync,
    L: LanguageModel + Send + Sync,
    E: Embedder + Send + Sync,
{
    pub fn new(
        store: S,
        index: V,
        llm: L,
        embedder: E,
        options: EngineOptions,
    ) -> Result<Self, IngestError> {
        Ok(Self {
            extractor: TextExtractor::new()?,
            chunker: Chunker::new(options.chunking)?,
            store,
            index,
            llm,
            embedder,
            options,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs the ingest state machine for one document. The document ends in
    /// `completed` on success or `failed` on any error; there is no partial
    /// state. Chunks written before a mid-loop failure are not rolled back.
    pub async fn process_document(&self, document: &mut Document) -> Result<(), IngestError> {
        document.processing_status = ProcessingStatus::Processing;
        self.store.save(document).await?;

        match self.ingest(document).await {
            Ok(()) => {
                document.processing_status = ProcessingStatus::Completed;
                self.store.save(document).await?;
                info!(document_id = document.id, "document processing completed");
                Ok(())
            }
            Err(error) => {
                document.processing_status = ProcessingStatus::Failed;
                if let Err(save_error) = self.store.save(document).await {
                    warn!(document_id = document.id, %save_error, "failed to persist failed status");
                }
                warn!(document_id = document.id, %error, "document processing failed");
                Err(error)
            }
        }
    }

    async fn ingest(&self, document: &mut Document) -> Result<(), IngestError> {
        let format = FileFormat::from_tag(&document.file_type);
        let extracted = self.extractor.extract_file(&document.file_path, format);

        if extracted.text.trim().is_empty() {
            return Err(IngestError::EmptyDocument);
        }

        document.pages_count = extracted.pages_count;
        self.store.save(document).await?;

        let chunks = self.chunker.chunk(&extracted.text);
        if chunks.is_empty() {
            return Err(IngestError::NoChunks);
        }

        info!(
            document_id = document.id,
            chunk_count = chunks.len(),
            pages = extracted.pages_count,
            "indexing document chunks"
        );

        for (chunk_index, text) in chunks.iter().enumerate() {
            let vector = self.embedder.embed(text);
            let embedding_id = embedding_record_id(document.id, chunk_index);

            self.index
                .upsert(EmbeddingRecord {
                    id: embedding_id.clone(),
                    vector,
                    text: text.clone(),
                    document_id: document.id,
                    chunk_index,
                    document_title: document.title.clone(),
                })
                .await?;

            self.store
                .create_chunk(DocumentChunk {
                    document_id: document.id,
                    chunk_index,
                    text_content: text.clone(),
                    page_number: 1,
                    embedding_id,
                    created_at: Utc::now(),
                })
                .await?;
        }

        Ok(())
    }

    /// Answers a question against one completed document. This path never
    /// returns an error: soft failures come back as `Info` text and a
    /// language-model failure degrades to a context-derived answer.
    pub async fn query_documents(
        &self,
        document_id: i64,
        question: &str,
        num_chunks: usize,
    ) -> QueryOutcome {
        let document = match self.store.get(document_id).await {
            Ok(Some(document)) => document,
            Ok(None) => return QueryOutcome::Info("Document not found.".to_string()),
            Err(error) => {
                return QueryOutcome::Info(format!("Error processing query: {error}"));
            }
        };

        if document.processing_status != ProcessingStatus::Completed {
            return QueryOutcome::Info(format!(
                "Document is not ready. Status: {}",
                document.processing_status
            ));
        }

        let chunk_count = match self.store.count_chunks(document_id).await {
            Ok(count) => count,
            Err(error) => {
                return QueryOutcome::Info(format!("Error processing query: {error}"));
            }
        };

        if chunk_count == 0 {
            return QueryOutcome::Info("No chunks found for this document.".to_string());
        }

        let question_vector = self.embedder.embed(question);
        let limit = num_chunks.min(chunk_count);

        let hits = match self
            .index
            .search(&question_vector, limit, Some(document_id))
            .await
        {
            Ok(hits) => hits,
            Err(error) => {
                warn!(document_id, %error, "filtered vector search failed, retrying unfiltered");
                match self.index.search(&question_vector, limit, None).await {
                    Ok(hits) => hits,
                    Err(error) => {
                        return QueryOutcome::Info(format!("Error processing query: {error}"));
                    }
                }
            }
        };

        if hits.is_empty() {
            return QueryOutcome::Info(
                "No relevant information found in the document.".to_string(),
            );
        }

        let context: Vec<String> = hits.into_iter().map(|hit| hit.text).collect();
        let joined = context.join("\n\n");
        let prompt = build_answer_prompt(&joined, question);

        let (answer, degraded) = match self
            .llm
            .complete(
                &prompt,
                self.options.answer_max_tokens,
                self.options.answer_temperature,
            )
            .await
        {
            Ok(answer) => (answer, false),
            Err(error) => {
                warn!(document_id, %error, "language model call failed, degrading answer");
                (degraded_answer(&joined), true)
            }
        };

        let sources = (1..=context.len()).map(|n| format!("Chunk {n}")).collect();

        QueryOutcome::Answered(QueryAnswer {
            answer,
            context,
            sources,
            document_title: document.title,
            degraded,
        })
    }
}

fn build_answer_prompt(context: &str, question: &str) -> String {
    format!(
        "Based on the following context from the document, answer the question accurately and concisely.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}\n\
         \n\
         Answer:"
    )
}

fn degraded_answer(context: &str) -> String {
    let prefix: String = context.chars().take(DEGRADED_CONTEXT_CHARS).collect();
    format!("Based on the document content: {prefix}...")
}
