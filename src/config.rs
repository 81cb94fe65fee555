use secrecy::SecretString;
use std::env;

use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: SecretString,
    pub mongo_db_name: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub identity_header: String,
    pub shingle_size: usize,
    pub similarity_top_k: usize,
    pub overlap_sample_limit: usize,
    pub default_xp_per_question: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: SecretString::from(
                env::var("MONGO_CONN_STRING")
                    .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            ),
            mongo_db_name: env::var("MONGO_DB_NAME")
                .unwrap_or_else(|_| "classroom-local".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: parse_env("WEB_SERVER_PORT", 8080),
            identity_header: env::var("IDENTITY_HEADER")
                .unwrap_or_else(|_| "x-user-id".to_string()),
            shingle_size: parse_env("SHINGLE_SIZE", 3),
            similarity_top_k: parse_env("SIMILARITY_TOP_K", 3),
            overlap_sample_limit: parse_env("OVERLAP_SAMPLE_LIMIT", 10),
            default_xp_per_question: parse_env("DEFAULT_XP_PER_QUESTION", 5),
        }
    }

    /// Rejects tuning values that would make similarity or XP meaningless.
    pub fn validate_for_production(&self) -> AppResult<()> {
        if self.shingle_size == 0 {
            return Err(AppError::ValidationError(
                "SHINGLE_SIZE must be at least 1".to_string(),
            ));
        }
        if self.similarity_top_k == 0 {
            return Err(AppError::ValidationError(
                "SIMILARITY_TOP_K must be at least 1".to_string(),
            ));
        }
        if self.default_xp_per_question < 0 {
            return Err(AppError::ValidationError(
                "DEFAULT_XP_PER_QUESTION cannot be negative".to_string(),
            ));
        }
        if self.identity_header.trim().is_empty() {
            return Err(AppError::ValidationError(
                "IDENTITY_HEADER cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: SecretString::from("mongodb://localhost:27017".to_string()),
            mongo_db_name: "classroom-test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            identity_header: "x-user-id".to_string(),
            shingle_size: 3,
            similarity_top_k: 3,
            overlap_sample_limit: 10,
            default_xp_per_question: 5,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
