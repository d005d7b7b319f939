use serde::{Deserialize, Serialize};

/// A web page the search backend cited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

/// Lookup result for one company
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyData {
    pub company_name: String,
    pub tax_code: String,
    pub domain: String,
    pub summary: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl CompanyData {
    pub fn new(
        company_name: impl Into<String>,
        domain: impl Into<String>,
        tax_code: impl Into<String>,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            tax_code: tax_code.into(),
            domain: domain.into(),
            summary: String::new(),
            sources: Vec::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }
}
