//! docchat CLI - chat with the documents in a folder
//!
//! # Commands
//!
//! ```bash
//! # Parse, chunk and embed everything under data/ into storage/index/
//! docchat ingest
//!
//! # Ask questions about the indexed documents
//! docchat chat --model gemini-2.5-pro --top-k 6
//!
//! # Show whether an index exists and what it holds
//! docchat status
//! ```
//!
//! # Exit codes
//!
//! | Code | Meaning                          |
//! |------|----------------------------------|
//! | 0    | success                          |
//! | 1    | any other failure                |
//! | 2    | data directory missing           |
//! | 3    | no usable documents found        |
//! | 4    | `GOOGLE_API_KEY` not set         |
//! | 5    | no index, run `docchat ingest`   |

mod repl;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docchat_lib::{
    config::{
        ChainConfig, Credentials, Settings, Temperature, TopK, DATA_DIR_VAR, DEFAULT_DATA_DIR,
        DEFAULT_STORAGE_DIR, STORAGE_DIR_VAR,
    },
    embed::MiniLmEmbedder,
    ingest::ingest,
    llm::{GeminiProvider, Model},
    session::Session,
    store::{BuildMode, VectorIndex, VectorStore},
    Error,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docchat")]
#[command(about = "Chat with your documents using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Paths {
    /// Folder holding the documents (.txt, .md, .pdf, .docx)
    #[arg(long, env = DATA_DIR_VAR, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Folder the vector index is persisted to
    #[arg(long, env = STORAGE_DIR_VAR, default_value = DEFAULT_STORAGE_DIR)]
    storage_dir: PathBuf,
}

impl Paths {
    fn settings(&self) -> Settings {
        Settings {
            data_dir: self.data_dir.clone(),
            storage_dir: self.storage_dir.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load, chunk and embed documents into the vector index
    Ingest {
        #[command(flatten)]
        paths: Paths,

        /// Discard the existing index instead of adding to it
        #[arg(long)]
        rebuild: bool,

        /// Where the embedding model is downloaded to
        #[arg(long, env = "FASTEMBED_CACHE_DIR")]
        model_cache: Option<PathBuf>,
    },

    /// Interactive question answering over the indexed documents
    Chat {
        #[command(flatten)]
        paths: Paths,

        /// Gemini model
        #[arg(short, long, default_value_t = Model::default())]
        model: Model,

        /// Sampling temperature, 0 to 1
        #[arg(short, long, default_value_t = Temperature::DEFAULT.get())]
        temperature: f32,

        /// Number of fragments retrieved per question
        #[arg(short = 'k', long, default_value_t = TopK::DEFAULT.get())]
        top_k: usize,

        /// Where the embedding model is downloaded to
        #[arg(long, env = "FASTEMBED_CACHE_DIR")]
        model_cache: Option<PathBuf>,
    },

    /// Show whether an index exists and what it holds
    Status {
        #[command(flatten)]
        paths: Paths,
    },
}

fn main() -> ExitCode {
    // a missing .env is fine, the environment may already carry the key
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_code(&e)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ingest {
            paths,
            rebuild,
            model_cache,
        } => run_ingest(&paths.settings(), rebuild, model_cache),

        Commands::Chat {
            paths,
            model,
            temperature,
            top_k,
            model_cache,
        } => {
            let config = ChainConfig {
                model,
                temperature: Temperature::new(temperature)?,
                top_k: TopK::new(top_k)?,
            };
            run_chat(&paths.settings(), config, model_cache)
        }

        Commands::Status { paths } => run_status(&paths.settings()),
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<Error>() {
        Some(Error::DataDirMissing(_)) => ExitCode::from(2),
        Some(Error::NoDocuments(_)) => ExitCode::from(3),
        Some(Error::Config(_)) => ExitCode::from(4),
        Some(Error::IndexNotFound(_)) => ExitCode::from(5),
        _ => ExitCode::FAILURE,
    }
}

fn load_embedder(model_cache: Option<PathBuf>) -> docchat_lib::Result<MiniLmEmbedder> {
    eprintln!("Loading embedding model (first run downloads ~90MB)...");
    match model_cache {
        Some(dir) => MiniLmEmbedder::with_cache_dir(dir),
        None => MiniLmEmbedder::new(),
    }
}

fn run_ingest(settings: &Settings, rebuild: bool, model_cache: Option<PathBuf>) -> Result<()> {
    let mode = if rebuild { BuildMode::Rebuild } else { BuildMode::Append };
    println!("Loading documents from {}...", settings.data_dir.display());

    let report = ingest(settings, mode, || load_embedder(model_cache))?;

    for (path, reason) in &report.failures {
        eprintln!("warning: skipped {}: {reason}", path.display());
    }
    println!(
        "Loaded {} files into {} fragments ({} new, {} in index)",
        report.files_loaded, report.fragments, report.added, report.total
    );
    println!("Ingestion complete. Index persisted to {}", report.index_dir.display());
    Ok(())
}

fn run_chat(settings: &Settings, config: ChainConfig, model_cache: Option<PathBuf>) -> Result<()> {
    let credentials = Credentials::from_env()?;
    let index = VectorIndex::load(&settings.storage_dir)?;

    let embedder = load_embedder(model_cache)?;
    index.check_embedder(&embedder)?;
    let llm = GeminiProvider::new(credentials.api_key())?;

    println!(
        "Loaded index with {} fragments from {}",
        index.len(),
        settings.storage_dir.display()
    );
    tracing::info!(
        model = %config.model,
        temperature = %config.temperature,
        top_k = %config.top_k,
        "starting chat session"
    );
    let mut session = Session::new(config, index, embedder, llm);
    repl::run(&mut session, &settings.data_dir).context("interactive session failed")
}

fn run_status(settings: &Settings) -> Result<()> {
    let dir = &settings.storage_dir;
    if !VectorIndex::exists(dir) {
        println!("Index: not found at {}", dir.display());
        println!("Put documents in {} and run `docchat ingest`.", settings.data_dir.display());
        return Ok(());
    }

    let index = VectorIndex::load(dir)?;
    let manifest = index.manifest();
    println!("Index: found at {}", dir.display());
    println!("  Fragments: {}", index.len());
    println!("  Embedding model: {} ({} dims)", manifest.model, manifest.dimension);
    println!("  Data directory: {}", settings.data_dir.display());
    Ok(())
}
