//! Orchestration layer
//!
//! Batch scheduling and the application lifecycle.
//!
//! ### `batch_controller`
//! - Walks the result set in order, one lookup at a time
//! - Pause/stop via the shared `BatchControl` handle
//! - Publishes a progress snapshot after every item
//! - Single-item retry, during or after a run
//!
//! ### `batch_processor`
//! - `App`: input loading, selection, export, failure file, final stats
//!
//! ### `console`
//! - stdin commands and Ctrl-C while a run is active
//!
//! ```text
//! batch_processor (one CLI invocation)
//!     ↓
//! batch_controller (Vec<SearchItem>)
//!     ↓
//! workflow::ItemFlow (one SearchItem)
//!     ↓
//! services (lookup / reconcile / export)
//!     ↓
//! clients (Gemini / OpenAI-compatible / sheet download)
//! ```

pub mod batch_controller;
pub mod batch_processor;
pub mod console;

pub use batch_controller::{BatchControl, BatchController, BatchProgress, BatchSummary, RunSignal};
pub use batch_processor::{App, RunReport};
