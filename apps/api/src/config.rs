use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub pandoc_bin: String,
    pub pandoc_pdf_engine: Option<String>,
    pub soffice_bin: String,
    pub convert_timeout: Duration,
    /// Overrides the built-in résumé template when set.
    pub template_path: Option<PathBuf>,
    /// Overrides the built-in key mapping when set.
    pub key_mapping_path: Option<PathBuf>,
    pub remap_string_values: bool,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")
                .or_else(|_| require_env("api_key"))
                .context("Set GEMINI_API_KEY to a Gemini API key")?,
            gemini_model: env_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            gemini_base_url: env_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            pandoc_bin: env_or("PANDOC_BIN", "pandoc"),
            pandoc_pdf_engine: optional_env("PANDOC_PDF_ENGINE"),
            soffice_bin: env_or("SOFFICE_BIN", "soffice"),
            convert_timeout: Duration::from_secs(
                env_or("CONVERT_TIMEOUT_SECS", "120")
                    .parse::<u64>()
                    .context("CONVERT_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            template_path: optional_env("TEMPLATE_PATH").map(PathBuf::from),
            key_mapping_path: optional_env("KEY_MAPPING_PATH").map(PathBuf::from),
            remap_string_values: parse_bool(&env_or("REMAP_STRING_VALUES", "false"))
                .context("REMAP_STRING_VALUES must be true or false")?,
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", &DEFAULT_MAX_UPLOAD_BYTES.to_string())
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("unrecognised boolean '{other}'"),
    }
}
