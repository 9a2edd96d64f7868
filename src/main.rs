//! # Threadline CLI (`threadline`)
//!
//! ## Usage
//!
//! ```bash
//! threadline --config ./config/threadline.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `threadline init` | Create the SQLite database and schema |
//! | `threadline seed` | Load articles from `seed.articles_dir` into an empty store |
//! | `threadline articles` | List articles |
//! | `threadline get <id>` | Print one article |
//! | `threadline comments <article_id>` | Print the reply tree |
//! | `threadline comment <article_id> --text ...` | Post a comment or reply |
//! | `threadline stats` | Counts and database size |
//! | `threadline serve` | Seed if needed and start the HTTP server |
//!
//! Log verbosity follows `RUST_LOG` (default `threadline=info,tower_http=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use threadline::{articles, config, migrate, seed, server, sqlite_store, stats};

#[derive(Parser)]
#[command(
    name = "threadline",
    about = "Articles with threaded reader comments",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/threadline.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Seed articles (and demo comments) if the store is empty.
    Seed,

    /// List article summaries.
    Articles,

    /// Print one article.
    Get {
        /// Article id.
        id: String,
    },

    /// Print the comments of an article.
    Comments {
        article_id: String,

        /// One comment per line in creation order instead of the reply tree.
        #[arg(long)]
        flat: bool,
    },

    /// Post a comment, or a reply with `--reply-to`.
    Comment {
        article_id: String,

        #[arg(long)]
        text: String,

        /// Defaults to "Guest user".
        #[arg(long)]
        username: Option<String>,

        /// Id of the comment being replied to.
        #[arg(long)]
        reply_to: Option<String>,
    },

    /// Show article and comment counts.
    Stats,

    /// Start the HTTP server.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("threadline=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized at {}", cfg.db.path.display());
        }
        Commands::Seed => {
            let store = sqlite_store::SqliteStore::open(&cfg).await?;
            let report = seed::seed_if_empty(&store, &cfg).await?;
            store.close().await;
            if report.skipped {
                println!("Using existing database; nothing seeded.");
            } else {
                println!(
                    "Seeded {} articles and {} comments.",
                    report.articles, report.comments
                );
            }
        }
        Commands::Articles => {
            articles::run_articles(&cfg).await?;
        }
        Commands::Get { id } => {
            articles::run_get(&cfg, &id).await?;
        }
        Commands::Comments { article_id, flat } => {
            articles::run_comments(&cfg, &article_id, flat).await?;
        }
        Commands::Comment {
            article_id,
            text,
            username,
            reply_to,
        } => {
            articles::run_comment(&cfg, &article_id, &text, username, reply_to).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
