use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// File tags accepted at upload. `.doc` files go through the same
/// paragraph-extraction path as `.docx`.
pub const ALLOWED_FILE_TYPES: [&str; 4] = ["txt", "pdf", "docx", "doc"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Txt,
    Pdf,
    Docx,
    Doc,
    Unsupported,
}

impl FileFormat {
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_lowercase().as_str() {
            "txt" => Self::Txt,
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "doc" => Self::Doc,
            _ => Self::Unsupported,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// A stored document record. The ingest pipeline mutates `pages_count` and
/// `processing_status` and persists them through the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub file_path: PathBuf,
    pub file_type: String,
    pub file_size: u64,
    pub pages_count: u32,
    pub processing_status: ProcessingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when registering an uploaded file; the store assigns the
/// id, timestamps, and the initial `pending` status.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub file_path: PathBuf,
    pub file_type: String,
    pub file_size: u64,
}

/// One bounded span of a document's text, created in chunk order during
/// ingest and never updated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub document_id: i64,
    pub chunk_index: usize,
    pub text_content: String,
    pub page_number: u32,
    pub embedding_id: String,
    pub created_at: DateTime<Utc>,
}

/// Payload stored in the vector index, one per chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub document_id: i64,
    pub chunk_index: usize,
    pub document_title: String,
}

/// A similarity-search hit returned by a vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub score: f32,
    pub document_id: i64,
    pub chunk_index: usize,
}

/// Outcome of the query flow. The query path never returns an error to its
/// caller: soft failures (unknown document, not yet processed, nothing
/// retrieved) come back as `Info` text, and a language-model failure comes
/// back as an `Answered` value with `degraded` set.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Answered(QueryAnswer),
    Info(String),
}

#[derive(Debug, Clone)]
pub struct QueryAnswer {
    pub answer: String,
    pub context: Vec<String>,
    pub sources: Vec<String>,
    pub document_title: String,
    pub degraded: bool,
}

/// Deterministic vector-index id for a chunk. Re-ingesting a document under
/// the same id overwrites prior entries per chunk index.
pub fn embedding_record_id(document_id: i64, chunk_index: usize) -> String {
    format!("doc_{document_id}_chunk_{chunk_index}")
}

#[cfg(test)]
mod tests {
    use super::{embedding_record_id, FileFormat, ProcessingStatus};

    #[test]
    fn file_format_tag_is_case_insensitive() {
        assert_eq!(FileFormat::from_tag("PDF"), FileFormat::Pdf);
        assert_eq!(FileFormat::from_tag("docx"), FileFormat::Docx);
        assert_eq!(FileFormat::from_tag("odt"), FileFormat::Unsupported);
    }

    #[test]
    fn status_displays_lowercase() {
        assert_eq!(ProcessingStatus::Pending.to_string(), "pending");
        assert_eq!(ProcessingStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn record_ids_encode_document_and_index() {
        assert_eq!(embedding_record_id(7, 0), "doc_7_chunk_0");
        assert_eq!(embedding_record_id(12, 3), "doc_12_chunk_3");
    }
}
