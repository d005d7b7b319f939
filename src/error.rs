//! Error types for the service boundaries
//!
//! The orchestrator and `main` work with `anyhow::Result`; everything below
//! the orchestrator returns one of the typed errors here so callers can tell
//! a retryable lookup failure from a terminal one, or an unshared sheet from
//! a flaky proxy.

use thiserror::Error;

/// Substrings that mark a lookup failure as retryable.
const TRANSIENT_SIGNATURES: &[&str] = &[
    "overloaded",
    "timed out",
    "timeout",
    "429",
    "503",
    "504",
    "rate limit",
    "too many requests",
    "resource exhausted",
    "resource_exhausted",
];

/// Lookup service error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// Rate limit, timeout or overload; worth another attempt
    #[error("{0}")]
    Transient(String),
    /// Anything else; surfaced to the item as-is
    #[error("{0}")]
    Terminal(String),
}

impl LookupError {
    /// Classify a failure by its message signature
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if TRANSIENT_SIGNATURES.iter().any(|sig| lower.contains(sig)) {
            LookupError::Transient(message)
        } else {
            LookupError::Terminal(message)
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, LookupError::Transient(_))
    }

    pub fn message(&self) -> &str {
        match self {
            LookupError::Transient(msg) | LookupError::Terminal(msg) => msg,
        }
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LookupError::Transient("request timed out".to_string())
        } else {
            LookupError::classify(err.to_string())
        }
    }
}

/// Sheet download error
///
/// `Display` is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("invalid Google Sheet link, please check the URL")]
    InvalidUrl,
    #[error("sheet is not shared publicly (Anyone with the link)")]
    AuthRequired,
    #[error("proxy error, please retry in a few seconds")]
    Markup,
    #[error("connection error: empty response. Check the file's access permissions")]
    Empty,
    #[error("timed out: file too large or network too slow")]
    Timeout,
    #[error("connection error: HTTP {0}. Check the file's access permissions")]
    Http(u16),
    #[error("connection error: {0}. Check the file's access permissions")]
    Network(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Http(status.as_u16())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Tabular data error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed CSV at line {line}: {message}")]
    Malformed { line: u64, message: String },
    #[error("sheet is empty")]
    EmptySheet,
    #[error(
        "no company names found in column D after dropping blank rows\n- valid rows: {rows}\n- tab id (gid): {gid}"
    )]
    MissingNameColumn { rows: usize, gid: String },
}

impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        ParseError::Malformed {
            line,
            message: err.to_string(),
        }
    }
}

/// Sheet loading error: either the download or the parse failed
#[derive(Debug, Error)]
pub enum SheetError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Export error
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write XLSX file: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("failed to write CSV file: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to serialize JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_transient_signatures() {
        assert!(LookupError::classify("Server overloaded or timed out").is_transient());
        assert!(LookupError::classify("HTTP 429 Too Many Requests").is_transient());
        assert!(LookupError::classify("upstream returned 504").is_transient());
        assert!(LookupError::classify("RESOURCE_EXHAUSTED: quota").is_transient());
    }

    #[test]
    fn test_classify_terminal() {
        let err = LookupError::classify("API key not valid");
        assert!(!err.is_transient());
        assert_eq!(err.message(), "API key not valid");
        assert_eq!(err.to_string(), "API key not valid");
    }

    #[test]
    fn test_fetch_error_messages_are_distinct() {
        let messages = [
            FetchError::AuthRequired.to_string(),
            FetchError::Markup.to_string(),
            FetchError::Timeout.to_string(),
            FetchError::Network("dns".into()).to_string(),
        ];
        assert!(messages[0].contains("not shared publicly"));
        assert!(messages[1].contains("proxy error"));
        assert!(messages[2].contains("timed out"));
        assert!(messages[3].starts_with("connection error: dns"));
    }
}
