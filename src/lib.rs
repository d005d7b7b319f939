//! # bizsearch
//!
//! Bulk lookup of Vietnamese company tax codes (MST) and website domains,
//! with optional reconciliation against a reference spreadsheet.
//!
//! ## Layers
//!
//! ### ① Clients
//! - `clients/` - transport only: Gemini grounded search, OpenAI-compatible
//!   chat, sheet CSV download
//!
//! ### ② Services
//! - `services/` - one capability each, one company or one table at a time
//! - `row_matcher` / `row_merger` - find and fill the company's table row
//! - `lookup_service` - `CompanyLookup` with backoff for transient errors
//! - `sheet_service` - sheet link to cleaned reference rows
//! - `export_service` - XLSX/CSV grid and bulk-copy JSON
//!
//! ### ③ Workflow
//! - `workflow/` - `ItemFlow`, the procedure for a single item
//!
//! ### ④ Orchestration
//! - `orchestrator/` - `BatchController` (sequential run, pause/stop,
//!   progress) and `App` (one CLI invocation)

pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

pub use config::{Config, LookupBackend};
pub use error::{ExportError, FetchError, LookupError, ParseError, SheetError};
pub use models::{CompanyData, ItemStatus, ReferenceTable, ResultSet, SearchItem, Source};
pub use orchestrator::{App, BatchControl, BatchController, BatchProgress, BatchSummary};
pub use services::{CompanyLookup, SheetFetch};
pub use workflow::{ItemFlow, ItemOutcome};
