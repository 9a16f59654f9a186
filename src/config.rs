use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Deployment environment, reported by `/health` and used to pick the
/// default CORS allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }

    /// Origins allowed when `CORS_ALLOWED_ORIGINS` is not set.
    pub fn default_allowed_origins(&self) -> Vec<String> {
        let origins: &[&str] = match self {
            Self::Production => &[
                "https://idea-playground-1f730.web.app",
                "https://idea-playground-1f730.firebaseapp.com",
            ],
            Self::Development | Self::Test => &["http://localhost:3000", "http://localhost:5000"],
        };
        origins.iter().map(|o| o.to_string()).collect()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(format!(
                "Invalid environment '{}'. Valid values: development, test, production",
                s
            )),
        }
    }
}

/// Resolved configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub environment: Environment,
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let environment = Environment::default();
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            db_path: PathBuf::from(".playground/ideas.db"),
            environment,
            allowed_origins: environment.default_allowed_origins(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_roundtrip() {
        for env in [
            Environment::Development,
            Environment::Test,
            Environment::Production,
        ] {
            assert_eq!(Environment::from_str(env.as_str()).unwrap(), env);
        }
        assert_eq!(
            Environment::from_str("PROD").unwrap(),
            Environment::Production
        );
        assert!(Environment::from_str("staging").is_err());
    }

    #[test]
    fn test_default_origins_follow_environment() {
        let dev = Environment::Development.default_allowed_origins();
        assert!(dev.contains(&"http://localhost:3000".to_string()));

        let prod = Environment::Production.default_allowed_origins();
        assert!(prod.iter().all(|o| o.starts_with("https://")));
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.db_path, PathBuf::from(".playground/ideas.db"));
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.allowed_origins.len(), 2);
    }
}
