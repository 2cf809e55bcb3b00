//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honoured for local development.

use std::env;

/// Reference activity types loaded when `ACTIVITY_TYPES` is unset.
const DEFAULT_ACTIVITY_TYPES: &[&str] = &[
    "Athletics",
    "Biking",
    "Climbing",
    "Hiking",
    "Kayaking",
    "Mountain Biking",
    "Running",
    "Swimming",
    "Tramping",
    "Walking",
];

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Session token lifetime in days
    pub session_days: u32,
    /// Email of the undeletable admin seeded at startup
    pub default_admin_email: String,
    /// Password of the seeded admin
    pub default_admin_password: String,
    /// Reference activity type names
    pub activity_types: Vec<String>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            session_days: 30,
            default_admin_email: "admin@localhost".to_string(),
            default_admin_password: "test_admin_password".to_string(),
            activity_types: default_activity_types(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: parse_or("PORT", 8080)?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            session_days: parse_or("SESSION_DAYS", 30)?,
            default_admin_email: env::var("DEFAULT_ADMIN_EMAIL")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|_| "admin@localhost".to_string()),
            default_admin_password: env::var("DEFAULT_ADMIN_PASSWORD")
                .map_err(|_| ConfigError::Missing("DEFAULT_ADMIN_PASSWORD"))?,
            activity_types: env::var("ACTIVITY_TYPES")
                .map(|v| split_list(&v))
                .unwrap_or_else(|_| default_activity_types()),
        })
    }
}

fn default_activity_types() -> Vec<String> {
    DEFAULT_ACTIVITY_TYPES.iter().map(|s| s.to_string()).collect()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
