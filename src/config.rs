use crate::constants::*;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: String,
    pub data_path: String,
    pub token_expiry_minutes: i64,
    pub cors_origins: Vec<String>,
    pub ollama_base_url: Option<String>,
    pub ollama_model: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort(String),
    InvalidTokenExpiry(String),
    InvalidCorsOrigin(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort(port) => {
                write!(f, "Invalid port number: {}", port)
            }
            ConfigError::InvalidTokenExpiry(value) => {
                write!(f, "Invalid token expiry (minutes): {}", value)
            }
            ConfigError::InvalidCorsOrigin(origin) => {
                write!(f, "Invalid CORS origin: {}", origin)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("SERVER_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = env::var("SERVER_PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
        let data_path = env::var("DATABASE_PATH").unwrap_or_else(|_| DEFAULT_DATA_PATH.to_string());

        // Validate port is a valid number
        if port.parse::<u16>().is_err() {
            return Err(ConfigError::InvalidPort(port));
        }

        let token_expiry_minutes = match env::var("TOKEN_EXPIRY_MINUTES") {
            Ok(raw) => match raw.parse::<i64>() {
                Ok(minutes) if minutes > 0 => minutes,
                _ => return Err(ConfigError::InvalidTokenExpiry(raw)),
            },
            Err(_) => DEFAULT_TOKEN_EXPIRY_MINUTES,
        };

        let raw_origins =
            env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string());
        let cors_origins = parse_origins(&raw_origins)?;

        let ollama_base_url = env::var("OLLAMA_BASE_URL")
            .ok()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        let ollama_model =
            env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_OLLAMA_MODEL.to_string());

        Ok(Config {
            host,
            port,
            data_path,
            token_expiry_minutes,
            cors_origins,
            ollama_base_url,
            ollama_model,
        })
    }

    /// Configuration for tests and embedded use: local data directory, no LLM.
    pub fn for_data_path(data_path: &str) -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: "0".to_string(),
            data_path: data_path.to_string(),
            token_expiry_minutes: DEFAULT_TOKEN_EXPIRY_MINUTES,
            cors_origins: vec![DEFAULT_CORS_ORIGINS.to_string()],
            ollama_base_url: None,
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut origins = Vec::new();
    for origin in raw.split(',').map(str::trim).filter(|o| !o.is_empty()) {
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            return Err(ConfigError::InvalidCorsOrigin(origin.to_string()));
        }
        origins.push(origin.trim_end_matches('/').to_string());
    }
    Ok(origins)
}
