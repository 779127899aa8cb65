use crate::constants::{ALPHA_VANTAGE_URL, DEFAULT_DATABASE_PATH, DEFAULT_PORT};
use crate::error::{AppError, Result};
use std::path::PathBuf;

/// Runtime configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: PathBuf,
    pub provider_url: String,
    pub api_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| AppError::Config(format!("invalid PORT: {raw}")))?,
            Err(_) => DEFAULT_PORT,
        };

        let database_path = std::env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATABASE_PATH));

        let provider_url =
            std::env::var("ALPHA_VANTAGE_URL").unwrap_or_else(|_| ALPHA_VANTAGE_URL.to_string());

        let api_key = std::env::var("ALPHA_VANTAGE_APIKEY")
            .map_err(|_| AppError::Config("ALPHA_VANTAGE_APIKEY is not set".to_string()))?;

        Ok(Self {
            port,
            database_path,
            provider_url,
            api_key,
        })
    }
}
