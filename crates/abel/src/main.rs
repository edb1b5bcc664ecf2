// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Abel - a personal AI assistant with long-term memory.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;
mod commands;
mod shell;

use std::path::PathBuf;

use abel_config::model::AbelConfig;
use abel_core::AbelError;
use abel_memory::{
    MemoryCategory, MemoryUpdate, NewMemory, SearchQuery, DEFAULT_IMPORTANCE, DEFAULT_LIST_LIMIT,
    DEFAULT_MIN_SIMILARITY, DEFAULT_SEARCH_LIMIT,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::error;

use crate::app::App;

/// Abel - a personal AI assistant with long-term memory.
#[derive(Parser, Debug)]
#[command(name = "abel", version, about, long_about = None)]
struct Cli {
    /// User whose memories are read and written.
    #[arg(long, global = true, default_value = "local")]
    user: String,

    /// Explicit config file; replaces the standard search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a new memory.
    Remember {
        content: String,
        #[arg(short, long, default_value = "knowledge")]
        category: MemoryCategory,
        #[arg(short, long, default_value_t = DEFAULT_IMPORTANCE)]
        importance: f64,
        /// Topic tag; may be repeated.
        #[arg(short, long = "topic")]
        topics: Vec<String>,
    },
    /// Semantic search over your memories.
    Search {
        query: String,
        #[arg(short, long)]
        category: Option<MemoryCategory>,
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = DEFAULT_MIN_SIMILARITY)]
        min_similarity: f64,
    },
    /// List memories by importance.
    List {
        #[arg(short, long)]
        category: Option<MemoryCategory>,
        #[arg(short, long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    /// Show memory statistics.
    Stats,
    /// Change the importance or content of a memory.
    Update {
        id: String,
        #[arg(short, long)]
        importance: Option<f64>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete one memory.
    Forget { id: String },
    /// Delete all of your memories.
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Send one message and print the reply.
    Chat { message: String },
    /// Launch an interactive chat session.
    Shell,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => abel_config::load_and_validate_path(path),
        None => abel_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            abel_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.assistant.log_level);

    if let Err(e) = run(cli, config).await {
        error!(error = %e, "command failed");
        eprintln!("{}: {}", "error".red(), e.user_message());
        if matches!(e, AbelError::Config(_)) {
            eprintln!("{e}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: AbelConfig) -> Result<(), AbelError> {
    let app = App::init(config).await?;
    let user = cli.user.as_str();
    let json = cli.json;

    let result = match cli.command {
        Commands::Remember {
            content,
            category,
            importance,
            topics,
        } => {
            let memory = NewMemory::new(category, content).with_importance(importance);
            commands::remember(&app, user, memory, topics, json).await
        }
        Commands::Search {
            query,
            category,
            limit,
            min_similarity,
        } => {
            let mut query = SearchQuery::new(query)
                .with_limit(limit)
                .with_min_similarity(min_similarity);
            query.category = category;
            commands::search(&app, user, query, json).await
        }
        Commands::List { category, limit } => {
            commands::list(&app, user, category, limit, json).await
        }
        Commands::Stats => commands::stats(&app, user, json).await,
        Commands::Update {
            id,
            importance,
            content,
        } => {
            let update = MemoryUpdate {
                importance,
                content,
            };
            commands::update(&app, user, &id, update, json).await
        }
        Commands::Forget { id } => commands::forget(&app, user, &id).await,
        Commands::Clear { yes } => commands::clear(&app, user, yes).await,
        Commands::Chat { message } => commands::chat(&app, user, &message, json).await,
        Commands::Shell => shell::run_shell(&app, user).await,
    };

    app.shutdown().await;
    result
}

/// Installs the global subscriber; `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("abel={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
