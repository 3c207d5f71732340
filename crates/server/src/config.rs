//! Runtime configuration read from the environment.

use std::{net::SocketAddr, str::FromStr};

use thiserror::Error;
use utils::logging::LogFormat;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub run_migrations: bool,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
    pub log_format: LogFormat,
    pub sentry_dsn: Option<String>,
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let port = match var("BACKEND_PORT") {
            Some(v) => parse("BACKEND_PORT", v)?,
            None => match var("PORT") {
                Some(v) => parse("PORT", v)?,
                None => DEFAULT_PORT,
            },
        };

        let max_connections = match var("DB_MAX_CONNECTIONS") {
            Some(v) => parse("DB_MAX_CONNECTIONS", v)?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                name: "DB_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        let run_migrations = match var("RUN_MIGRATIONS") {
            Some(v) => parse_bool("RUN_MIGRATIONS", v)?,
            None => true,
        };

        let log_format = match var("LOG_FORMAT") {
            Some(v) => parse("LOG_FORMAT", v)?,
            None => LogFormat::default(),
        };

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            max_connections,
            run_migrations,
            cors_allowed_origins,
            log_format,
            sentry_dsn: var("SENTRY_DSN"),
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::Invalid {
            name: "HOST",
            value: self.host.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("DATABASE_URL", "mysql://farm@localhost/ferme")]).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_connections, 10);
        assert!(config.run_migrations);
        assert!(config.cors_allowed_origins.is_empty());
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.sentry_dsn, None);
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn database_url_is_required() {
        assert_eq!(config(&[]), Err(ConfigError::Missing("DATABASE_URL")));
        assert_eq!(
            config(&[("DATABASE_URL", "  ")]),
            Err(ConfigError::Missing("DATABASE_URL"))
        );
    }

    #[test]
    fn backend_port_wins_over_port() {
        let config = config(&[
            ("DATABASE_URL", "mysql://localhost/ferme"),
            ("PORT", "3000"),
            ("BACKEND_PORT", "3001"),
        ])
        .unwrap();
        assert_eq!(config.port, 3001);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let url = ("DATABASE_URL", "mysql://localhost/ferme");
        assert!(matches!(
            config(&[url, ("PORT", "http")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        assert!(matches!(
            config(&[url, ("DB_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::Invalid { name: "DB_MAX_CONNECTIONS", .. })
        ));
        assert!(matches!(
            config(&[url, ("RUN_MIGRATIONS", "maybe")]),
            Err(ConfigError::Invalid { name: "RUN_MIGRATIONS", .. })
        ));
    }

    #[test]
    fn cors_origins_and_log_format() {
        let config = config(&[
            ("DATABASE_URL", "mysql://localhost/ferme"),
            ("CORS_ALLOWED_ORIGINS", "http://localhost:5173, https://erp.example.com,"),
            ("LOG_FORMAT", "JSON"),
            ("RUN_MIGRATIONS", "false"),
        ])
        .unwrap();
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://localhost:5173", "https://erp.example.com"]
        );
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.run_migrations);
    }
}
