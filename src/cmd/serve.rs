//! HTTP server command: `idea-playground serve`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use idea_playground::config::{Environment, ServerConfig};
use idea_playground::service::start_server;

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to serve on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// SQLite database path
    #[arg(long, env = "DB_PATH", default_value = ".playground/ideas.db")]
    pub db_path: PathBuf,

    /// Deployment environment: development, test, production
    #[arg(long = "env", env = "APP_ENV", default_value = "development")]
    pub environment: Environment,

    /// Comma-separated CORS origins. Defaults depend on the environment.
    #[arg(long, env = "CORS_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,
}

impl ServeArgs {
    pub fn into_config(self) -> ServerConfig {
        let allowed_origins = if self.cors_origins.is_empty() {
            self.environment.default_allowed_origins()
        } else {
            self.cors_origins
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect()
        };
        ServerConfig {
            host: self.host,
            port: self.port,
            db_path: self.db_path,
            environment: self.environment,
            allowed_origins,
        }
    }
}

pub async fn cmd_serve(args: ServeArgs) -> Result<()> {
    let config = args.into_config();
    tracing::debug!(origins = ?config.allowed_origins, "CORS allow-list");
    start_server(config).await
}
