//! Single-item procedure - workflow layer
//!
//! Order for one item:
//! 1. mark loading (under the lock)
//! 2. optional courtesy delay, then lookup (lock released)
//! 3. reconcile against the table if one is loaded, record the outcome
//!
//! Used by both the batch loop and single-item retry, so a retried item is
//! treated exactly like a batch item apart from the delay. The check and the
//! switch to loading happen under one lock, so an item never has two
//! lookups in flight.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::LookupError;
use crate::models::company::CompanyData;
use crate::models::result_set::ResultSet;
use crate::services::lookup_service::CompanyLookup;
use crate::services::row_merger::{reconcile, RowChange};
use crate::utils::logging::append_log_line;
use crate::utils::truncate_text;

/// What happened to one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Lookup succeeded; `change` is set when a table was reconciled
    Success { change: Option<RowChange> },
    /// Lookup failed with this message
    Failed(String),
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Success { .. })
    }
}

/// One-item lookup flow
pub struct ItemFlow {
    lookup: Arc<dyn CompanyLookup>,
    run_log: Option<String>,
}

impl ItemFlow {
    pub fn new(lookup: Arc<dyn CompanyLookup>) -> Self {
        Self {
            lookup,
            run_log: None,
        }
    }

    /// Also append one line per finished item to this file
    pub fn with_run_log(mut self, path: impl Into<String>) -> Self {
        self.run_log = Some(path.into());
        self
    }

    /// Process the item at `index`
    ///
    /// # Arguments
    /// * `state` - shared result set; locked only around the bookkeeping
    /// * `index` - position of the item in the result set
    /// * `delay` - courtesy pause before the lookup
    ///
    /// # Returns
    /// The outcome, or `None` when there is no such item or it is not
    /// runnable (unselected, done, or already in flight).
    pub async fn run(
        &self,
        state: &Mutex<ResultSet>,
        index: usize,
        delay: Duration,
    ) -> Option<ItemOutcome> {
        let name = {
            let mut results = state.lock().await;
            let item = results.item_mut(index)?;
            if !item.is_runnable() {
                return None;
            }
            item.mark_loading();
            item.input_name.clone()
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Some(self.lookup_and_record(state, index, &name).await)
    }

    /// Retry one item under `new_name` (or its current name), without delay
    ///
    /// `None` when the id is unknown or the item already has a lookup in
    /// flight, from the batch or an earlier retry.
    pub async fn retry(
        &self,
        state: &Mutex<ResultSet>,
        id: &str,
        new_name: Option<&str>,
    ) -> Option<ItemOutcome> {
        let (index, name) = {
            let mut results = state.lock().await;
            let index = results.position(id)?;
            let item = results.item_mut(index)?;
            if item.is_in_flight() {
                warn!("⚠️ {} is already being looked up, retry refused", item.input_name);
                return None;
            }
            let name = new_name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| item.input_name.clone());
            item.begin_retry(name.as_str());
            (index, name)
        };

        info!("🔁 Retrying: {}", name);
        Some(self.lookup_and_record(state, index, &name).await)
    }

    async fn lookup_and_record(&self, state: &Mutex<ResultSet>, index: usize, name: &str) -> ItemOutcome {
        info!("🔍 Looking up: {}", truncate_text(name, 80));
        let result = self.lookup.lookup(name).await;

        let outcome = {
            let mut results = state.lock().await;
            record(&mut results, index, name, result)
        };

        match &outcome {
            ItemOutcome::Success { change } => {
                info!(
                    "✓ {} ({})",
                    truncate_text(name, 80),
                    change
                        .as_ref()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "no table".to_string())
                );
            }
            ItemOutcome::Failed(message) => {
                error!("❌ {}: {}", truncate_text(name, 80), message);
            }
        }
        self.log_outcome(name, &outcome);
        outcome
    }

    fn log_outcome(&self, name: &str, outcome: &ItemOutcome) {
        let Some(path) = &self.run_log else {
            return;
        };
        let line = match outcome {
            ItemOutcome::Success { change: Some(change) } => format!("{} -> success ({})", name, change),
            ItemOutcome::Success { change: None } => format!("{} -> success", name),
            ItemOutcome::Failed(message) => format!("{} -> error: {}", name, message),
        };
        if let Err(e) = append_log_line(path, &line) {
            warn!("⚠️ Could not write run log {}: {}", path, e);
        }
    }
}

/// Apply a lookup result to the item and, on success, the table
fn record(
    results: &mut ResultSet,
    index: usize,
    name: &str,
    result: Result<CompanyData, LookupError>,
) -> ItemOutcome {
    match result {
        Ok(data) => {
            let change = results
                .table_mut()
                .map(|table| reconcile(table, name, &data));
            let history = change.as_ref().map(|c| c.to_string());
            if let Some(item) = results.item_mut(index) {
                item.mark_success(data, history);
            }
            ItemOutcome::Success { change }
        }
        Err(e) => {
            let message = e.message().to_string();
            if let Some(item) = results.item_mut(index) {
                item.mark_error(message.as_str());
            }
            ItemOutcome::Failed(message)
        }
    }
}
