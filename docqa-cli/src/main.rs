use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use docqa_rag::{
    OpenAIChatProvider, OpenAIEmbeddingProvider, RagConfig, RagPipeline, load_text_documents,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ask")]
#[command(about = "Answer one question from a set of UTF-8 text files", long_about = None)]
#[command(version)]
struct Cli {
    /// Text files to index
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Question to answer from the files
    #[arg(short, long)]
    question: String,

    /// JSON file with pipeline parameters (missing fields use defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum chunk size in characters
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long)]
    overlap: Option<usize>,

    /// Passages retrieved per question
    #[arg(long)]
    top_k: Option<usize>,

    /// Maximum context length in characters handed to the model
    #[arg(long)]
    context_chars: Option<usize>,

    /// Chat backend used for answering
    #[arg(long, value_enum, default_value_t = Llm::Groq)]
    llm: Llm,

    /// Override the chat model id
    #[arg(long)]
    chat_model: Option<String>,

    /// Base URL of an OpenAI-compatible embeddings server
    #[arg(long)]
    embedding_base_url: Option<String>,

    /// Embedding model id (requires --embedding-dims)
    #[arg(long, requires = "embedding_dims")]
    embedding_model: Option<String>,

    /// Dimensionality of the embedding model's vectors
    #[arg(long)]
    embedding_dims: Option<usize>,

    /// Per-request timeout in seconds for both backends
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Print the answer and its supporting chunks as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log only warnings and errors
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Llm {
    /// Groq, key from GROQ_API_KEY
    Groq,
    /// OpenAI, key from OPENAI_API_KEY
    Openai,
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // stdout carries the answer.
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn load_config(cli: &Cli) -> Result<RagConfig> {
    let base = match &cli.config {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str::<RagConfig>(&raw)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => RagConfig::default(),
    };

    let config = RagConfig {
        max_chunk_size: cli.chunk_size.unwrap_or(base.max_chunk_size),
        overlap: cli.overlap.unwrap_or(base.overlap),
        top_k: cli.top_k.unwrap_or(base.top_k),
        max_context_characters: cli.context_chars.unwrap_or(base.max_context_characters),
    };
    config.validate()?;
    Ok(config)
}

fn embedding_provider(cli: &Cli, timeout: Duration) -> Result<OpenAIEmbeddingProvider> {
    let mut provider = OpenAIEmbeddingProvider::from_env()?;
    if let Some(url) = &cli.embedding_base_url {
        provider = provider.with_base_url(url);
    }
    provider = match (&cli.embedding_model, cli.embedding_dims) {
        (Some(model), Some(dims)) => provider.with_model(model, dims),
        (None, Some(dims)) => provider.with_dimensions(dims),
        (None, None) => provider,
        (Some(_), None) => bail!("--embedding-model requires --embedding-dims"),
    };
    Ok(provider.with_timeout(timeout)?)
}

fn chat_provider(cli: &Cli, timeout: Duration) -> Result<OpenAIChatProvider> {
    let mut provider = match cli.llm {
        Llm::Groq => OpenAIChatProvider::groq_from_env()?,
        Llm::Openai => OpenAIChatProvider::from_env()?,
    };
    if let Some(model) = &cli.chat_model {
        provider = provider.with_model(model);
    }
    Ok(provider.with_timeout(timeout)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    if cli.question.trim().is_empty() {
        bail!("question must not be empty");
    }

    let config = load_config(&cli).await?;
    let timeout = Duration::from_secs(cli.timeout_secs);

    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(embedding_provider(&cli, timeout)?))
        .generation_provider(Arc::new(chat_provider(&cli, timeout)?))
        .build()?;

    let documents = load_text_documents(&cli.files).await?;
    let summary = pipeline.ingest(&documents).await.context("failed to index documents")?;
    info!(
        documents = summary.documents,
        chunks = summary.chunks,
        dimensions = summary.dimensions,
        "ready for questions"
    );

    let answer = pipeline.answer(&cli.question).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!("{}", answer.answer_text);
    if !answer.supporting_chunks.is_empty() {
        println!();
        println!("Sources:");
        for chunk in &answer.supporting_chunks {
            println!(
                "  {} [{}..{}] chunk {}",
                chunk.source_id, chunk.start_offset, chunk.end_offset, chunk.index
            );
        }
    }

    Ok(())
}
