use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use hr_rag::RagPipeline;
use hr_rag_cli::{Overrides, Settings, Source, open, render_answer, write_index};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hr-rag")]
#[command(about = "Answer questions about an HR policy document", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML settings file with [rag], [generation] and [provider] sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API key for the embedding and chat service
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of an OpenAI-compatible service
    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    base_url: Option<String>,

    /// Embedding model id
    #[arg(long, global = true)]
    embedding_model: Option<String>,

    /// Chat model id
    #[arg(long, global = true)]
    chat_model: Option<String>,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a policy document and save the index as JSON
    Index(IndexArgs),

    /// Answer a single question
    Ask(AskArgs),

    /// Answer questions interactively until EOF or `exit`
    Chat(ChatArgs),
}

#[derive(Args)]
struct IndexArgs {
    /// Policy document (.pdf or plain text)
    document: PathBuf,

    /// Where to write the index
    #[arg(short, long)]
    output: PathBuf,

    /// Maximum segment size in characters
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared by consecutive segments
    #[arg(long)]
    overlap: Option<usize>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Policy document to index before answering
    #[arg(long)]
    document: Option<PathBuf>,

    /// Index written by `hr-rag index`
    #[arg(long)]
    index: Option<PathBuf>,
}

impl SourceArgs {
    fn into_source(self) -> Option<Source> {
        match (self.document, self.index) {
            (Some(path), _) => Some(Source::Document(path)),
            (None, Some(path)) => Some(Source::Index(path)),
            (None, None) => None,
        }
    }
}

#[derive(Args)]
struct AskArgs {
    /// The question to answer
    question: String,

    #[command(flatten)]
    source: SourceArgs,

    /// Number of segments used as context
    #[arg(short)]
    k: Option<usize>,

    /// Print the retrieved segments after the answer
    #[arg(long)]
    show_sources: bool,
}

#[derive(Args)]
struct ChatArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Number of segments used as context
    #[arg(short)]
    k: Option<usize>,

    /// Print the retrieved segments after each answer
    #[arg(long)]
    show_sources: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut overrides = Overrides {
        base_url: cli.base_url,
        embedding_model: cli.embedding_model,
        chat_model: cli.chat_model,
        ..Overrides::default()
    };
    match &cli.command {
        Commands::Index(args) => {
            overrides.chunk_size = args.chunk_size;
            overrides.chunk_overlap = args.overlap;
        }
        Commands::Ask(AskArgs { k, .. }) | Commands::Chat(ChatArgs { k, .. }) => {
            overrides.top_k = *k;
        }
    }

    let settings = Settings::load(cli.config.as_deref())?.apply(overrides);
    settings.validate()?;
    let api_key = cli
        .api_key
        .filter(|key| !key.is_empty())
        .context("an API key is required: pass --api-key or set OPENAI_API_KEY")?;

    match cli.command {
        Commands::Index(args) => {
            let summary = write_index(&settings, &api_key, &args.document, &args.output).await?;
            println!("{summary}");
        }
        Commands::Ask(args) => {
            let source = args.source.into_source().context("--document or --index is required")?;
            let pipeline = open(&settings, &api_key, &source).await?;
            let answer = pipeline.ask(&args.question, settings.rag.top_k).await?;
            println!("{}", render_answer(&answer, args.show_sources));
        }
        Commands::Chat(args) => {
            let source = args.source.into_source().context("--document or --index is required")?;
            let pipeline = open(&settings, &api_key, &source).await?;
            chat(&pipeline, settings.rag.top_k, args.show_sources).await?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn chat(pipeline: &RagPipeline, k: usize, show_sources: bool) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("Ask a question about the policy. Type `exit` or press Ctrl-D to quit.");

    loop {
        let line = match editor.readline("hr> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }
        if let Err(e) = editor.add_history_entry(question) {
            debug!(error = %e, "could not record history entry");
        }

        match pipeline.ask(question, k).await {
            Ok(answer) => println!("{}\n", render_answer(&answer, show_sources)),
            Err(e) => eprintln!("error: {e}\n"),
        }
    }

    Ok(())
}
