//! Answer parsing - pulls tax code and domain out of free-form model output
//!
//! Best effort only: a miss falls back to a fixed placeholder, it never
//! fails. The whole answer is kept as the summary.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::company::{CompanyData, Source};

/// Domain placeholder when none could be extracted
pub const DOMAIN_NOT_FOUND: &str = "Không tìm thấy";
/// Tax code placeholder when none could be extracted
pub const TAX_CODE_PENDING: &str = "Đang cập nhật";
/// Summary used when the backend returned no text at all
pub const EMPTY_ANSWER: &str = "Không tìm thấy thông tin.";

struct Patterns {
    tax_primary: Regex,
    tax_fallback: Regex,
    domain_primary: Regex,
    domain_fallback: Regex,
    scheme_prefix: Regex,
    url: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        tax_primary: Regex::new(r"(?i)MST:\s*([0-9-]+)").expect("valid regex"),
        tax_fallback: Regex::new(r"(?i)(?:Mã số thuế|MST)[:\s]+([0-9-]+)").expect("valid regex"),
        domain_primary: Regex::new(r"(?i)DOMAIN:\s*(@?[A-Za-z0-9_.-]+\.[A-Za-z0-9_]+)")
            .expect("valid regex"),
        domain_fallback: Regex::new(
            r"(?i)(?:Website|Domain)[:\s]+((?:https?://)?[A-Za-z0-9_.-]+\.[A-Za-z0-9_]+)",
        )
        .expect("valid regex"),
        scheme_prefix: Regex::new(r"(?i)^(?:https?://)?(?:www\.)?").expect("valid regex"),
        url: Regex::new(r#"https?://[^\s<>")\]]+"#).expect("valid regex"),
    })
}

/// Raw backend answer before field extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAnswer {
    pub text: String,
    pub sources: Vec<Source>,
}

/// Tax code digits and dashes, if the answer has one
pub fn extract_tax_code(text: &str) -> Option<String> {
    let p = patterns();
    p.tax_primary
        .captures(text)
        .or_else(|| p.tax_fallback.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Domain as `@host`, if the answer has one
pub fn extract_domain(text: &str) -> Option<String> {
    let p = patterns();
    p.domain_primary
        .captures(text)
        .or_else(|| p.domain_fallback.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| normalize_domain(m.as_str()))
}

/// Strip scheme, `www.` and a trailing slash, then prefix `@`
pub fn normalize_domain(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = patterns().scheme_prefix.replace(trimmed, "");
    let stripped = stripped.trim_end_matches('/');
    if stripped.starts_with('@') {
        stripped.to_string()
    } else {
        format!("@{}", stripped)
    }
}

/// URLs mentioned in the text, as sources titled by host
pub fn extract_url_sources(text: &str) -> Vec<Source> {
    let mut sources: Vec<Source> = Vec::new();
    for m in patterns().url.find_iter(text) {
        let uri = m.as_str().trim_end_matches(|c: char| matches!(c, '.' | ',' | ';')).to_string();
        if sources.iter().any(|s| s.uri == uri) {
            continue;
        }
        let title = uri
            .split("://")
            .nth(1)
            .and_then(|rest| rest.split('/').next())
            .unwrap_or(&uri)
            .to_string();
        sources.push(Source { title, uri });
    }
    sources
}

/// Turn a raw answer into company data, applying the fallbacks
pub fn parse_answer(company_name: &str, answer: RawAnswer) -> CompanyData {
    let text = if answer.text.trim().is_empty() {
        EMPTY_ANSWER.to_string()
    } else {
        answer.text
    };

    let domain = extract_domain(&text).unwrap_or_else(|| DOMAIN_NOT_FOUND.to_string());
    let tax_code = extract_tax_code(&text).unwrap_or_else(|| TAX_CODE_PENDING.to_string());

    CompanyData::new(company_name, domain, tax_code)
        .with_summary(text)
        .with_sources(answer.sources)
}
