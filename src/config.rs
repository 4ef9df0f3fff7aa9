use std::env;
use std::sync::Arc;

use crate::conversion::{convention_named, DecimalConvention};
use crate::report::DEFAULT_ITEMS_PER_PAGE;
use crate::session::DEFAULT_SESSION_CAPACITY;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown decimal convention: {0} (expected 'comma' or 'point')")]
    DecimalConvention(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub max_upload_bytes: usize,
    pub items_per_page: usize,
    pub session_capacity: usize,
    pub decimal_convention: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| (20 * 1024 * 1024).to_string())
                .parse()
                .unwrap_or(20 * 1024 * 1024),
            items_per_page: env::var("ITEMS_PER_PAGE")
                .unwrap_or_else(|_| DEFAULT_ITEMS_PER_PAGE.to_string())
                .parse()
                .unwrap_or(DEFAULT_ITEMS_PER_PAGE),
            session_capacity: env::var("SESSION_CAPACITY")
                .unwrap_or_else(|_| DEFAULT_SESSION_CAPACITY.to_string())
                .parse()
                .unwrap_or(DEFAULT_SESSION_CAPACITY),
            decimal_convention: env::var("DECIMAL_CONVENTION")
                .unwrap_or_else(|_| "comma".to_string()),
        };

        // Fail at startup rather than on the first upload
        config.decimal()?;
        Ok(config)
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Decimal convention used to parse measurement text
    pub fn decimal(&self) -> Result<Arc<dyn DecimalConvention>, ConfigError> {
        convention_named(&self.decimal_convention)
            .ok_or_else(|| ConfigError::DecimalConvention(self.decimal_convention.clone()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 5000,
            max_upload_bytes: 20 * 1024 * 1024,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            session_capacity: DEFAULT_SESSION_CAPACITY,
            decimal_convention: "comma".to_string(),
        }
    }
}
