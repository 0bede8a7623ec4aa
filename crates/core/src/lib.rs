pub mod chunking;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod sections;
pub mod stores;
pub mod traits;

pub use chunking::{Chunker, ChunkingConfig};
pub use embeddings::{Embedder, HashingEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use engine::{EngineOptions, RetrievalEngine, DEFAULT_NUM_CHUNKS};
pub use error::{IngestError, SearchError, StoreError};
pub use extractor::{ExtractedText, TextExtractor};
pub use llm::OpenAiChatModel;
pub use models::{
    embedding_record_id, Document, DocumentChunk, EmbeddingRecord, FileFormat, NewDocument,
    ProcessingStatus, QueryAnswer, QueryOutcome, RetrievedChunk, ALLOWED_FILE_TYPES,
};
pub use normalize::TextNormalizer;
pub use sections::SectionSplitter;
pub use stores::{MemoryStore, MemoryVectorIndex, QdrantIndex};
pub use traits::{ChunkStore, DocumentStore, LanguageModel, VectorIndex};
