use anyhow::{Context, Result};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;
const DEFAULT_MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// Absent key means AI features are unconfigured (503 on generation endpoints).
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub embedding_dimensions: usize,
    pub mail_api_key: Option<String>,
    pub mail_from: String,
    pub public_base_url: String,
    pub max_resume_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            openai_api_key: optional_env("OPENAI_API_KEY"),
            openai_base_url: optional_env("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            embedding_dimensions: parse_env("EMBEDDING_DIMENSIONS", DEFAULT_EMBEDDING_DIMENSIONS)?,
            mail_api_key: optional_env("MAIL_API_KEY"),
            mail_from: optional_env("MAIL_FROM")
                .unwrap_or_else(|| "Careers <no-reply@careers.local>".to_string()),
            public_base_url: optional_env("PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            max_resume_bytes: parse_env("MAX_RESUME_BYTES", DEFAULT_MAX_RESUME_BYTES)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Treats empty values the same as unset ones.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
