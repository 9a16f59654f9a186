use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use idea_playground::logging::{LogFormat, init_tracing};

mod cmd;

#[derive(Parser)]
#[command(name = "idea-playground")]
#[command(version, about = "Capture, tag and order ideas on a readiness kanban board")]
pub struct Cli {
    /// Log level for this crate (overridden by RUST_LOG)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Log output format: pretty or json
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server until SIGTERM or Ctrl-C
    Serve(cmd::ServeArgs),
    /// Create the database, optionally seeding the dimensions registry
    Init {
        /// SQLite database path
        #[arg(long, env = "DB_PATH", default_value = ".playground/ideas.db")]
        db_path: PathBuf,

        /// JSON file to store as the dimensions registry
        #[arg(long)]
        dimensions: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    let result = match cli.command {
        Commands::Serve(args) => cmd::cmd_serve(args).await,
        Commands::Init {
            db_path,
            dimensions,
        } => cmd::cmd_init(&db_path, dimensions.as_deref()),
    };

    if let Err(e) = &result {
        tracing::error!(error = %format!("{:#}", e), "Command failed");
    }
    result
}
