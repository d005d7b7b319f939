//! Batch controller - orchestration layer
//!
//! Walks the item list in order and hands each runnable item to `ItemFlow`.
//! One lookup at a time; pause and stop are honoured only between items, an
//! in-flight lookup always finishes. A progress snapshot is published after
//! every processed item.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info};

use crate::models::item::SearchItem;
use crate::models::result_set::ResultSet;
use crate::models::table::ReferenceTable;
use crate::services::lookup_service::CompanyLookup;
use crate::workflow::ItemFlow;

/// Pause/stop flags of the current run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSignal {
    pub paused: bool,
    pub stopped: bool,
}

/// Cloneable pause/stop handle
///
/// Every clone drives the same run; waiters are woken on change, there is
/// no polling. Stop wins over pause.
#[derive(Debug, Clone)]
pub struct BatchControl {
    tx: Arc<watch::Sender<RunSignal>>,
}

impl Default for BatchControl {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchControl {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RunSignal::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn pause(&self, paused: bool) {
        self.tx.send_modify(|signal| signal.paused = paused);
    }

    /// Flip pause; returns the new state
    pub fn toggle_pause(&self) -> bool {
        let mut now_paused = false;
        self.tx.send_modify(|signal| {
            signal.paused = !signal.paused;
            now_paused = signal.paused;
        });
        now_paused
    }

    /// Request stop; also releases a paused run
    pub fn stop(&self) {
        self.tx.send_modify(|signal| {
            signal.stopped = true;
            signal.paused = false;
        });
    }

    /// Clear both flags (start of a run)
    pub fn reset(&self) {
        self.tx.send_replace(RunSignal::default());
    }

    pub fn signal(&self) -> RunSignal {
        *self.tx.borrow()
    }

    pub fn is_paused(&self) -> bool {
        self.signal().paused
    }

    pub fn is_stopped(&self) -> bool {
        self.signal().stopped
    }

    /// Item boundary: wait while paused; `false` means stop
    pub async fn wait_to_proceed(&self) -> bool {
        let mut rx = self.tx.subscribe();
        let proceed = match rx.wait_for(|signal| signal.stopped || !signal.paused).await {
            Ok(signal) => !signal.stopped,
            Err(_) => false,
        };
        proceed
    }
}

/// Snapshot published after each processed item
#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub items: Vec<SearchItem>,
    pub table: Option<ReferenceTable>,
    pub processed: usize,
    pub queue_total: usize,
    pub percent: u32,
    /// Id of the item that just finished
    pub last_item_id: String,
}

/// Result of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Lookups started in this run
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Items passed over: unselected, already done or already in flight
    pub passed_over: usize,
    /// Stop was requested before the end of the list
    pub stopped: bool,
    pub percent: u32,
}

/// Sequential batch runner over a shared result set
pub struct BatchController {
    state: Arc<Mutex<ResultSet>>,
    flow: ItemFlow,
    control: BatchControl,
    request_delay: Duration,
}

impl BatchController {
    pub fn new(
        state: Arc<Mutex<ResultSet>>,
        lookup: Arc<dyn CompanyLookup>,
        request_delay: Duration,
    ) -> Self {
        Self::with_flow(state, ItemFlow::new(lookup), request_delay)
    }

    pub fn with_flow(state: Arc<Mutex<ResultSet>>, flow: ItemFlow, request_delay: Duration) -> Self {
        Self {
            state,
            flow,
            control: BatchControl::new(),
            request_delay,
        }
    }

    pub fn control(&self) -> BatchControl {
        self.control.clone()
    }

    pub fn state(&self) -> Arc<Mutex<ResultSet>> {
        Arc::clone(&self.state)
    }

    pub fn pause(&self, paused: bool) {
        self.control.pause(paused);
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    /// Process every runnable item once, in order
    ///
    /// # Arguments
    /// * `progress` - receives one snapshot per finished item
    ///
    /// # Returns
    /// Counts for the run; `stopped` is set when it ended on a stop request.
    pub async fn run(&self, progress: &mpsc::UnboundedSender<BatchProgress>) -> BatchSummary {
        self.control.reset();

        let (total, runnable) = {
            let results = self.state.lock().await;
            (results.len(), results.selected_count())
        };
        info!("📦 Batch start: {} of {} items queued", runnable, total);

        let mut summary = BatchSummary::default();

        for index in 0..total {
            if !self.is_runnable(index).await {
                summary.passed_over += 1;
                continue;
            }

            if self.control.is_paused() {
                info!("⏸️ Paused, waiting to resume...");
            }
            if !self.control.wait_to_proceed().await {
                summary.stopped = true;
                break;
            }
            // selection may have changed while paused
            if !self.is_runnable(index).await {
                summary.passed_over += 1;
                continue;
            }

            match self.flow.run(&self.state, index, self.request_delay).await {
                Some(outcome) => {
                    summary.attempted += 1;
                    if outcome.is_success() {
                        summary.succeeded += 1;
                    } else {
                        summary.failed += 1;
                    }
                }
                None => {
                    // taken by a retry since the check above
                    debug!("Item {} already in flight, passed over", index);
                    summary.passed_over += 1;
                    continue;
                }
            }

            self.publish(progress, index).await;
        }

        summary.percent = self.state.lock().await.progress_percent();
        if summary.stopped {
            info!("🛑 Batch stopped after {} lookups", summary.attempted);
        } else {
            info!("✓ Batch finished: {} lookups", summary.attempted);
        }
        summary
    }

    /// Retry one item, optionally under a new name; usable during a run
    ///
    /// `None` when the id is unknown or the item is already being looked up.
    pub async fn retry(&self, id: &str, new_name: Option<&str>) -> Option<SearchItem> {
        self.flow.retry(&self.state, id, new_name).await?;
        self.state.lock().await.find(id).cloned()
    }

    async fn is_runnable(&self, index: usize) -> bool {
        self.state
            .lock()
            .await
            .item(index)
            .map_or(false, |item| item.is_runnable())
    }

    async fn publish(&self, progress: &mpsc::UnboundedSender<BatchProgress>, index: usize) {
        let snapshot = {
            let results = self.state.lock().await;
            BatchProgress {
                items: results.items().to_vec(),
                table: results.table().cloned(),
                processed: results.processed_count(),
                queue_total: results.queue_total(),
                percent: results.progress_percent(),
                last_item_id: results
                    .item(index)
                    .map(|item| item.id.clone())
                    .unwrap_or_default(),
            }
        };
        if progress.send(snapshot).is_err() {
            debug!("Progress receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_clears_pause_and_wins() {
        let control = BatchControl::new();
        control.pause(true);
        assert!(control.is_paused());

        control.stop();
        assert_eq!(control.signal(), RunSignal { paused: false, stopped: true });

        control.pause(true);
        assert!(control.is_stopped());

        control.reset();
        assert_eq!(control.signal(), RunSignal::default());
    }

    #[test]
    fn test_toggle_pause() {
        let control = BatchControl::new();
        assert!(control.toggle_pause());
        assert!(!control.toggle_pause());
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_running() {
        let control = BatchControl::new();
        assert!(control.wait_to_proceed().await);
    }

    #[tokio::test]
    async fn test_paused_wait_released_by_resume_or_stop() {
        let control = BatchControl::new();
        control.pause(true);

        let waiter = tokio::spawn({
            let control = control.clone();
            async move { control.wait_to_proceed().await }
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        control.pause(false);
        assert!(waiter.await.unwrap());

        control.pause(true);
        let waiter = tokio::spawn({
            let control = control.clone();
            async move { control.wait_to_proceed().await }
        });
        control.stop();
        assert!(!waiter.await.unwrap());
    }
}
