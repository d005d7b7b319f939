use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Which search backend answers company lookups
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupBackend {
    /// Gemini REST API with Google Search grounding
    Gemini,
    /// Any OpenAI-compatible chat endpoint
    OpenAi,
}

impl FromStr for LookupBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(LookupBackend::Gemini),
            "openai" | "open_ai" | "open-ai" => Ok(LookupBackend::OpenAi),
            other => anyhow::bail!("unknown lookup backend: {}", other),
        }
    }
}

/// Program configuration
///
/// Defaults, then an optional TOML file, then environment variables.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: LookupBackend,
    // --- Gemini ---
    pub gemini_api_key: String,
    pub gemini_api_base_url: String,
    pub gemini_model: String,
    // --- OpenAI-compatible LLM ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// Courtesy pause before every lookup in a batch run
    pub request_delay_ms: u64,
    /// First backoff delay for transient lookup errors, doubled per retry
    pub retry_base_delay_ms: u64,
    pub max_retries: u32,
    pub lookup_timeout_secs: u64,
    pub sheet_fetch_timeout_secs: u64,
    /// Run log file
    pub output_log_file: String,
    /// Failed items of the last run, one `name<TAB>error` line each
    pub failed_file: String,
    pub verbose_logging: bool,
    /// Items per page when listing results
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: LookupBackend::Gemini,
            gemini_api_key: String::new(),
            gemini_api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            gemini_model: "gemini-2.5-flash".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            request_delay_ms: 2000,
            retry_base_delay_ms: 2000,
            max_retries: 3,
            lookup_timeout_secs: 60,
            sheet_fetch_timeout_secs: 30,
            output_log_file: "bizsearch_log.txt".to_string(),
            failed_file: "failed.txt".to_string(),
            verbose_logging: false,
            page_size: 100,
        }
    }
}

impl Config {
    /// Load the TOML file (if any) and apply environment overrides on top
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        base.with_env_overrides()
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(self) -> Result<Self> {
        Ok(Self {
            backend: env_parse("LOOKUP_BACKEND")?.unwrap_or(self.backend),
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("API_KEY"))
                .unwrap_or(self.gemini_api_key),
            gemini_api_base_url: std::env::var("GEMINI_API_BASE_URL").unwrap_or(self.gemini_api_base_url),
            gemini_model: std::env::var("GEMINI_MODEL").unwrap_or(self.gemini_model),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            request_delay_ms: env_parse("REQUEST_DELAY_MS")?.unwrap_or(self.request_delay_ms),
            retry_base_delay_ms: env_parse("RETRY_BASE_DELAY_MS")?.unwrap_or(self.retry_base_delay_ms),
            max_retries: env_parse("MAX_RETRIES")?.unwrap_or(self.max_retries),
            lookup_timeout_secs: env_parse("LOOKUP_TIMEOUT_SECS")?.unwrap_or(self.lookup_timeout_secs),
            sheet_fetch_timeout_secs: env_parse("SHEET_FETCH_TIMEOUT_SECS")?
                .unwrap_or(self.sheet_fetch_timeout_secs),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
            failed_file: std::env::var("FAILED_FILE").unwrap_or(self.failed_file),
            verbose_logging: env_parse("VERBOSE_LOGGING")?.unwrap_or(self.verbose_logging),
            page_size: env_parse("PAGE_SIZE")?.unwrap_or(self.page_size),
        })
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn sheet_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.sheet_fetch_timeout_secs)
    }
}

/// Parse an environment variable; a set-but-unparsable value is an error
fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("environment variable {} has invalid value '{}': {}", name, raw, e)),
        Err(_) => Ok(None),
    }
}
