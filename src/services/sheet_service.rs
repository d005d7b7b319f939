//! Google Sheet import - capability layer
//!
//! Download a published sheet as CSV (trying several endpoints, since any of
//! them may be blocked or rate limited), parse it and clean it into the
//! reference table shape: header plus rows that have a company name in
//! column D, each padded to six cells.

use futures::future::BoxFuture;
use regex::Regex;
use reqwest::Url;
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::clients::SheetClient;
use crate::config::Config;
use crate::error::{FetchError, ParseError, SheetError};
use crate::models::loaders::{names_from_rows, parse_csv};
use crate::models::table::{pad_row, ReferenceTable, MIN_ROW_WIDTH, NAME_COL};

/// Anything that can turn a sheet link into raw rows
pub trait SheetFetch: Send + Sync {
    fn fetch_rows<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<Vec<String>>, SheetError>>;
}

/// A sheet imported as both the reference table and the lookup queue
#[derive(Debug, Clone)]
pub struct SheetImport {
    pub table: ReferenceTable,
    pub names: Vec<String>,
}

/// One download endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub name: &'static str,
    pub url: String,
}

struct UrlPatterns {
    sheet_id: Regex,
    gid: Regex,
}

fn url_patterns() -> &'static UrlPatterns {
    static PATTERNS: OnceLock<UrlPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| UrlPatterns {
        sheet_id: Regex::new(r"/d/([a-zA-Z0-9_-]+)").expect("valid regex"),
        gid: Regex::new(r"[?&#]gid=([0-9]+)").expect("valid regex"),
    })
}

/// Spreadsheet id from a Google Sheets link
pub fn sheet_id(url: &str) -> Option<String> {
    url_patterns()
        .sheet_id
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Tab id (`gid`) from a Google Sheets link
pub fn sheet_gid(url: &str) -> Option<String> {
    url_patterns()
        .gid
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Endpoints in the order they are tried
pub fn strategies(sheet_id: &str, gid: Option<&str>) -> Vec<Strategy> {
    let gid_param = gid.map(|g| format!("&gid={}", g)).unwrap_or_default();
    let export = format!(
        "https://docs.google.com/spreadsheets/d/{}/export?format=csv{}",
        sheet_id, gid_param
    );
    let gviz = format!(
        "https://docs.google.com/spreadsheets/d/{}/gviz/tq?tqx=out:csv{}",
        sheet_id, gid_param
    );

    let mut list = vec![
        Strategy {
            name: "Export API (direct)",
            url: export.clone(),
        },
        Strategy {
            name: "Google Viz API (direct)",
            url: gviz,
        },
    ];

    let proxies: [(&'static str, &str, &str); 3] = [
        ("Export API (CorsProxy)", "https://corsproxy.io/", "url"),
        ("Export API (CodeTabs)", "https://api.codetabs.com/v1/proxy", "quest"),
        ("Export API (AllOrigins)", "https://api.allorigins.win/raw", "url"),
    ];
    for (name, base, param) in proxies {
        if let Ok(url) = Url::parse_with_params(base, &[(param, export.as_str())]) {
            list.push(Strategy {
                name,
                url: url.to_string(),
            });
        }
    }
    list
}

/// Reject bodies that are obviously not CSV
pub fn validate_body(text: &str) -> Result<(), FetchError> {
    if text.trim().is_empty() {
        return Err(FetchError::Empty);
    }
    if text.contains("google.com/accounts") {
        return Err(FetchError::AuthRequired);
    }
    if text.contains("<!DOCTYPE html>") || text.contains("<html") {
        return Err(FetchError::Markup);
    }
    Ok(())
}

/// Validate and clean parsed sheet rows
///
/// Keeps the header and every row with a non-blank column D, padded to six
/// cells. A header narrower than four columns is only warned about.
pub fn prepare_sheet_rows(rows: Vec<Vec<String>>) -> Result<Vec<Vec<String>>, ParseError> {
    let Some(header) = rows.first() else {
        return Err(ParseError::EmptySheet);
    };
    if header.len() < 4 {
        warn!(
            "⚠️ Sheet has {} columns; at least 4 are needed to read column D",
            header.len()
        );
    }

    let cleaned = if rows.len() < 2 {
        rows
    } else {
        let mut iter = rows.into_iter();
        let header = iter.next().into_iter();
        header
            .chain(iter.filter(|row| {
                row.get(NAME_COL)
                    .map_or(false, |name| !name.trim().is_empty())
            }))
            .collect()
    };

    Ok(cleaned
        .into_iter()
        .map(|mut row| {
            pad_row(&mut row, MIN_ROW_WIDTH);
            row
        })
        .collect())
}

/// Fetch a sheet and keep it as the reference table
pub async fn load_reference_table(
    fetcher: &dyn SheetFetch,
    url: &str,
) -> Result<ReferenceTable, SheetError> {
    let rows = prepare_sheet_rows(fetcher.fetch_rows(url).await?)?;
    Ok(ReferenceTable::new(rows))
}

/// Fetch a sheet as both reference table and list of names from column D
///
/// # Arguments
/// * `fetcher` - download strategy
/// * `url` - sheet link as pasted by the user
///
/// # Errors
/// The fetch error, or `MissingNameColumn` when column D holds no names.
pub async fn import_sheet(fetcher: &dyn SheetFetch, url: &str) -> Result<SheetImport, SheetError> {
    let rows = prepare_sheet_rows(fetcher.fetch_rows(url).await?)?;
    let names = names_from_rows(&rows);
    if names.is_empty() {
        return Err(ParseError::MissingNameColumn {
            rows: rows.len().saturating_sub(1),
            gid: sheet_gid(url).unwrap_or_else(|| "default (0)".to_string()),
        }
        .into());
    }
    Ok(SheetImport {
        table: ReferenceTable::new(rows),
        names,
    })
}

/// Sheet download over HTTP
pub struct SheetService {
    client: SheetClient,
}

impl SheetService {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        Ok(Self {
            client: SheetClient::new(config.sheet_fetch_timeout())?,
        })
    }

    /// First CSV body any strategy returns; otherwise the last error
    pub async fn fetch_csv_text(&self, sheet_id: &str, gid: Option<&str>) -> Result<String, FetchError> {
        let mut last_error = FetchError::Network("no download strategy available".to_string());

        for strategy in strategies(sheet_id, gid) {
            info!("🔍 Trying strategy: {}", strategy.name);
            let result = self
                .client
                .get_text(&strategy.url)
                .await
                .and_then(|text| validate_body(&text).map(|_| text));

            match result {
                Ok(text) => {
                    info!("✓ Sheet downloaded via {}", strategy.name);
                    return Ok(text);
                }
                Err(e) => {
                    warn!("⚠️ Strategy {} failed: {}", strategy.name, e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<Vec<String>>, SheetError> {
        let id = sheet_id(url).ok_or(FetchError::InvalidUrl)?;
        let gid = sheet_gid(url);
        let text = self.fetch_csv_text(&id, gid.as_deref()).await?;
        Ok(parse_csv(&text)?)
    }
}

impl SheetFetch for SheetService {
    fn fetch_rows<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<Vec<String>>, SheetError>> {
        Box::pin(self.fetch(url))
    }
}
