use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use doc_qa_core::{
    Document, DocumentStore, Embedder, EngineOptions, HashingEmbedder, MemoryStore,
    MemoryVectorIndex, NewDocument, OpenAiChatModel, QdrantIndex, QueryOutcome, RetrievalEngine,
    VectorIndex, ALLOWED_FILE_TYPES, DEFAULT_NUM_CHUNKS,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-qa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// OpenAI-compatible chat endpoint used when no API key is configured
    /// (LM Studio, llama.cpp server, and friends).
    #[arg(long, env = "CHAT_BASE_URL", default_value = "http://localhost:1234/v1")]
    chat_base_url: String,

    /// API key for the hosted chat API; when set, the hosted endpoint wins.
    #[arg(long, env = "OPENAI_API_KEY")]
    openai_api_key: Option<String>,

    /// Chat model name.
    #[arg(long, default_value = "gpt-3.5-turbo")]
    chat_model: String,

    /// Qdrant base URL; omit to keep embeddings in process memory.
    #[arg(long, env = "QDRANT_URL")]
    qdrant_url: Option<String>,

    /// Qdrant collection.
    #[arg(long, default_value = "document_chunks")]
    qdrant_collection: String,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a document and print its processing summary.
    Ingest {
        /// Path to a .txt, .pdf, .docx, or .doc file.
        #[arg(long)]
        file: PathBuf,
    },
    /// Ingest a document and answer a question about it.
    Ask {
        /// Path to a .txt, .pdf, .docx, or .doc file.
        #[arg(long)]
        file: PathBuf,
        /// Natural-language question about the document.
        #[arg(long)]
        question: String,
        /// Number of chunks to retrieve as grounding context.
        #[arg(long, default_value_t = DEFAULT_NUM_CHUNKS as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
        num_chunks: u8,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let embedder = HashingEmbedder::default();
    let llm = match &cli.openai_api_key {
        Some(key) => OpenAiChatModel::hosted(key.clone(), cli.chat_model.clone()),
        None => OpenAiChatModel::local(cli.chat_base_url.clone(), cli.chat_model.clone()),
    }
    .context("failed to build chat client")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "doc-qa boot"
    );

    match &cli.qdrant_url {
        Some(url) => {
            let index = QdrantIndex::new(
                url.clone(),
                cli.qdrant_collection.clone(),
                embedder.dimensions(),
            );
            index
                .ensure_collection()
                .await
                .context("failed to prepare qdrant collection")?;
            let engine = RetrievalEngine::new(
                MemoryStore::new(),
                index,
                llm,
                embedder,
                EngineOptions::default(),
            )?;
            run(cli.command, &engine).await
        }
        None => {
            let engine = RetrievalEngine::new(
                MemoryStore::new(),
                MemoryVectorIndex::new(),
                llm,
                embedder,
                EngineOptions::default(),
            )?;
            run(cli.command, &engine).await
        }
    }
}

async fn run<V>(
    command: Command,
    engine: &RetrievalEngine<MemoryStore, V, OpenAiChatModel, HashingEmbedder>,
) -> anyhow::Result<()>
where
    V: VectorIndex + Send + Sync,
{
    match command {
        Command::Ingest { file } => {
            let mut document = register_document(engine.store(), &file).await?;
            engine
                .process_document(&mut document)
                .await
                .context("document processing failed")?;

            let chunk_count = engine.store().count_chunks(document.id).await?;
            println!(
                "processed {} at {}",
                document.title,
                Utc::now().to_rfc3339()
            );
            println!(
                "  status={} pages={} chunks={}",
                document.processing_status, document.pages_count, chunk_count
            );
        }
        Command::Ask {
            file,
            question,
            num_chunks,
        } => {
            let mut document = register_document(engine.store(), &file).await?;
            engine
                .process_document(&mut document)
                .await
                .context("document processing failed")?;

            let outcome = engine
                .query_documents(document.id, &question, num_chunks as usize)
                .await;

            match outcome {
                QueryOutcome::Answered(answer) => {
                    println!("document: {}", answer.document_title);
                    if answer.degraded {
                        println!("(language model unavailable, answer derived from retrieved context)");
                    }
                    println!("answer: {}", answer.answer);
                    for (source, text) in answer.sources.iter().zip(answer.context.iter()) {
                        println!("[{source}]\n{text}");
                    }
                }
                QueryOutcome::Info(message) => println!("{message}"),
            }
        }
    }

    Ok(())
}

async fn register_document(store: &MemoryStore, file: &Path) -> anyhow::Result<Document> {
    let extension = file
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_lowercase();

    if !ALLOWED_FILE_TYPES.contains(&extension.as_str()) {
        bail!(
            "file type {extension:?} not supported, allowed types: {}",
            ALLOWED_FILE_TYPES.join(", ")
        );
    }

    let metadata = tokio::fs::metadata(file)
        .await
        .with_context(|| format!("cannot read {}", file.display()))?;

    let title = file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document")
        .to_string();

    let document = store
        .create(NewDocument {
            title,
            file_path: file.to_path_buf(),
            file_type: extension,
            file_size: metadata.len(),
        })
        .await?;

    info!(document_id = document.id, title = %document.title, "document registered");
    Ok(document)
}
