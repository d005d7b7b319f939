//! One company in the lookup queue

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::company::CompanyData;

/// Item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Loading,
    Success,
    Error,
    /// The reference table already had both cells for this company
    Skipped,
}

impl ItemStatus {
    /// Success or skipped: never re-enters a batch run
    pub fn is_done(self) -> bool {
        matches!(self, ItemStatus::Success | ItemStatus::Skipped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Loading => "loading",
            ItemStatus::Success => "success",
            ItemStatus::Error => "error",
            ItemStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A company name queued for lookup
///
/// Status changes go through the `mark_*` methods so that `data` is only
/// present for success/skipped and `error_message` only for error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub id: String,
    pub input_name: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CompanyData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_history: Option<String>,
    pub selected: bool,
}

impl SearchItem {
    pub fn pending(id: impl Into<String>, input_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            input_name: input_name.into(),
            status: ItemStatus::Pending,
            data: None,
            error_message: None,
            update_history: None,
            selected: true,
        }
    }

    pub fn skipped(id: impl Into<String>, input_name: impl Into<String>, data: CompanyData) -> Self {
        Self {
            id: id.into(),
            input_name: input_name.into(),
            status: ItemStatus::Skipped,
            data: Some(data),
            error_message: None,
            update_history: None,
            selected: false,
        }
    }

    /// Selected, not yet done and not already being looked up
    pub fn is_runnable(&self) -> bool {
        self.selected && !self.status.is_done() && !self.is_in_flight()
    }

    /// A lookup for this item is running
    pub fn is_in_flight(&self) -> bool {
        self.status == ItemStatus::Loading
    }

    pub fn mark_loading(&mut self) {
        self.status = ItemStatus::Loading;
        self.data = None;
        self.error_message = None;
    }

    pub fn mark_success(&mut self, data: CompanyData, history: Option<String>) {
        self.status = ItemStatus::Success;
        self.data = Some(data);
        self.error_message = None;
        self.update_history = history;
    }

    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.status = ItemStatus::Error;
        self.data = None;
        self.error_message = Some(message.into());
    }

    /// Prepare for a single-item retry under a possibly edited name
    pub fn begin_retry(&mut self, new_name: impl Into<String>) {
        self.input_name = new_name.into();
        self.selected = true;
        self.mark_loading();
    }
}
