//! Mizan CLI — the main entry point.
//!
//! Commands:
//! - `research`  — Answer one legal-research query
//! - `batch`     — Run several queries and write a timing summary
//! - `feedback`  — Inspect the learned-optimization history
//! - `knowledge` — Inspect and search the knowledge base
//! - `config`    — Show, initialise or validate configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "mizan",
    about = "Mizan — multi-agent legal research for Saudi labour law",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.mizan/config.toml)
    #[arg(short, long, global = true, env = "MIZAN_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a legal-research query
    Research {
        /// The question to research
        query: String,

        /// Chunks handed to the extractor (defaults to knowledge.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Use the think/answer reasoning protocol
        #[arg(long)]
        reasoning: bool,

        /// Skip the post-query self-evaluation
        #[arg(long)]
        no_self_improve: bool,

        /// Print the intermediate agent outputs
        #[arg(long)]
        details: bool,

        /// Print the execution trace as JSON
        #[arg(long)]
        trace: bool,
    },

    /// Run several queries sequentially
    Batch {
        /// Queries to run (one per argument)
        queries: Vec<String>,

        /// Read queries from a file, one per line
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Write the summary JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect the feedback history
    Feedback {
        #[command(subcommand)]
        action: FeedbackAction,
    },

    /// Inspect the knowledge base
    Knowledge {
        #[command(subcommand)]
        action: KnowledgeAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum FeedbackAction {
    /// List recorded feedback, oldest first
    List {
        /// Only show records for this role
        #[arg(short, long)]
        role: Option<String>,
    },
    /// Show the tip currently injected for a role
    Best {
        /// Role name, e.g. Synthesizer
        role: String,
    },
}

#[derive(Subcommand)]
enum KnowledgeAction {
    /// Show chunk statistics
    Stats,
    /// Run keyword retrieval for a query
    Search {
        query: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file path
    Path,
    /// Validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Research {
            query,
            top_k,
            reasoning,
            no_self_improve,
            details,
            trace,
        } => {
            let options = commands::research::Options {
                top_k,
                reasoning,
                self_improve: !no_self_improve,
                details,
                trace,
            };
            commands::research::run(config_path, &query, options).await?
        }
        Commands::Batch {
            queries,
            file,
            output,
        } => commands::batch::run(config_path, queries, file, output).await?,
        Commands::Feedback { action } => match action {
            FeedbackAction::List { role } => commands::feedback::list(config_path, role).await?,
            FeedbackAction::Best { role } => commands::feedback::best(config_path, &role).await?,
        },
        Commands::Knowledge { action } => match action {
            KnowledgeAction::Stats => commands::knowledge::stats(config_path)?,
            KnowledgeAction::Search { query, top_k } => {
                commands::knowledge::search(config_path, &query, top_k)?
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path)?,
            ConfigAction::Init { force } => commands::config_cmd::init(config_path, force)?,
            ConfigAction::Path => commands::config_cmd::path(config_path),
            ConfigAction::Validate => commands::config_cmd::validate(config_path)?,
        },
    }

    Ok(())
}
