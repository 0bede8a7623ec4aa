use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("word document parse error: {0}")]
    DocParse(String),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("no text content found in document")]
    EmptyDocument,

    #[error("no chunks created from document")]
    NoChunks,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("layout extraction failed: {0}")]
    LayoutExtract(String),

    #[error("record store error: {0}")]
    Store(#[from] StoreError),

    #[error("embedding index error: {0}")]
    Index(#[from] SearchError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("search request failed: {0}")]
    Request(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
