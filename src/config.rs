use std::time::Duration;

use once_cell::sync::OnceCell;
use thiserror::Error;

use crate::fixtures::StreamFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid CHAT_BASE_URL {value:?}: {reason}")]
    InvalidBaseUrl { value: String, reason: String },
    #[error("invalid MOCK_STREAM_FORMAT {0:?}, expected ndjson or concat")]
    InvalidStreamFormat(String),
    #[error("config already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub chat_base_url: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_max_files: String,
    pub cors_origins: Vec<String>,
    pub mock_stream_format: StreamFormat,
    pub mock_chunk_delay: Duration,
    pub request_timeout: Option<Duration>,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    pub fn init_global() -> Result<&'static Config, ConfigError> {
        let cfg = Config::from_env()?;
        CONFIG.set(cfg).map_err(|_| ConfigError::AlreadyInitialized)?;
        Ok(CONFIG.get().expect("config"))
    }

    pub fn get() -> &'static Config {
        CONFIG.get().expect("Config not initialized")
    }

    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read_u64 = |key: &str, def: u64| -> u64 {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(def)
        };

        let chat_base_url =
            lookup("CHAT_BASE_URL").unwrap_or_else(|| "http://127.0.0.1:3001".to_string());
        if let Err(err) = url::Url::parse(&chat_base_url) {
            return Err(ConfigError::InvalidBaseUrl {
                value: chat_base_url,
                reason: err.to_string(),
            });
        }

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("PORT")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(3001);

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let log_max_files = lookup("LOG_MAX_FILES").unwrap_or_else(|| "7d".to_string());

        let cors_origins = match lookup("CORS_ORIGINS") {
            Some(v) => v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => vec!["*".to_string()],
        };

        let mock_stream_format = match lookup("MOCK_STREAM_FORMAT") {
            Some(v) => v
                .parse::<StreamFormat>()
                .map_err(|_| ConfigError::InvalidStreamFormat(v.clone()))?,
            None => StreamFormat::Ndjson,
        };
        let mock_chunk_delay = Duration::from_millis(read_u64("MOCK_CHUNK_DELAY_MS", 500));

        let request_timeout = match read_u64("REQUEST_TIMEOUT_SECS", 0) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Config {
            chat_base_url,
            host,
            port,
            log_level,
            log_max_files,
            cors_origins,
            mock_stream_format,
            mock_chunk_delay,
            request_timeout,
        })
    }

    pub fn print(&self) {
        println!("Current config:");
        println!("  - HOST: {}", self.host);
        println!("  - PORT: {}", self.port);
        println!("  - CHAT_BASE_URL: {}", self.chat_base_url);
        println!("  - LOG_LEVEL: {}", self.log_level);
        println!("  - CORS_ORIGINS: {}", self.cors_origins.join(","));
        println!("  - Mock server:");
        println!("    • MOCK_STREAM_FORMAT: {}", self.mock_stream_format);
        println!("    • MOCK_CHUNK_DELAY_MS: {}", self.mock_chunk_delay.as_millis());
        println!(
            "  - REQUEST_TIMEOUT_SECS: {}",
            self.request_timeout
                .map(|t| t.as_secs().to_string())
                .unwrap_or_else(|| "none".to_string())
        );
    }
}
