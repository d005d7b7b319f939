//! Application runner - orchestration layer
//!
//! Owns the services and drives one CLI invocation:
//! 1. load names and the optional reference table (file, sheet or both)
//! 2. build the result set and apply the selection
//! 3. run the batch with console controls and a progress reporter
//! 4. optionally retry failures, then export, write failures, print stats

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::cli::{FetchArgs, RunArgs};
use crate::config::Config;
use crate::models::item::ItemStatus;
use crate::models::loaders::{load_names_file, load_table_csv, unique_names};
use crate::models::result_set::{ItemFilter, ResultSet};
use crate::models::table::ReferenceTable;
use crate::orchestrator::batch_controller::{BatchController, BatchProgress, BatchSummary};
use crate::orchestrator::console;
use crate::services::export_service::{default_export_name, export_to_path, write_bulk_copy, write_csv};
use crate::services::failure_writer::FailureWriter;
use crate::services::lookup_service::{CompanyLookup, LookupService};
use crate::services::sheet_service::{import_sheet, load_reference_table, SheetFetch, SheetImport, SheetService};
use crate::utils::logging::{
    init_log_file, log_controls_hint, log_items_loaded, log_startup, print_final_stats,
};
use crate::utils::truncate_text;
use crate::workflow::ItemFlow;

/// Application
pub struct App {
    config: Config,
    lookup: Arc<dyn CompanyLookup>,
    sheets: Arc<dyn SheetFetch>,
}

/// What a run produced
#[derive(Debug)]
pub struct RunReport {
    pub summary: BatchSummary,
    pub results: ResultSet,
    pub export_path: Option<PathBuf>,
    /// Failed items recovered by `--retry-failed`
    pub recovered: usize,
}

impl App {
    /// Set up the run log and the real services
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)
            .with_context(|| format!("failed to create log file: {}", config.output_log_file))?;

        let lookup = LookupService::new(&config).context("failed to create lookup service")?;
        log_startup(&lookup.describe(), config.request_delay_ms);

        let sheets = SheetService::new(&config).context("failed to create sheet service")?;

        Ok(Self::with_services(config, Arc::new(lookup), Arc::new(sheets)))
    }

    pub fn with_services(
        config: Config,
        lookup: Arc<dyn CompanyLookup>,
        sheets: Arc<dyn SheetFetch>,
    ) -> Self {
        Self {
            config,
            lookup,
            sheets,
        }
    }

    /// Run the whole pipeline for one `run` invocation
    pub async fn run(&self, args: &RunArgs) -> Result<RunReport> {
        let (names, table) = self.load_inputs(args).await?;

        if names.is_empty() {
            warn!("⚠️ No company names given, nothing to do");
            return Ok(RunReport {
                summary: BatchSummary::default(),
                results: ResultSet::default(),
                export_path: None,
                recovered: 0,
            });
        }

        FailureWriter::with_path(self.config.failed_file.as_str())
            .reset()
            .with_context(|| format!("failed to clear {}", self.config.failed_file))?;

        let mut results = ResultSet::load_items(&names, table);
        if let Some(range) = args.select {
            let (start, end) = range.to_indices();
            results.select_all(false);
            results.select_range(start, end, true);
            info!("📋 Selection limited to items {}", range);
        }
        log_items_loaded(
            results.len(),
            results.selected_count(),
            results.count_status(ItemStatus::Skipped),
        );

        let state = Arc::new(Mutex::new(results));
        let delay = args
            .delay_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.request_delay());
        let flow = ItemFlow::new(Arc::clone(&self.lookup)).with_run_log(self.config.output_log_file.as_str());
        let controller = Arc::new(BatchController::with_flow(Arc::clone(&state), flow, delay));

        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = tokio::spawn(report_progress(rx));
        let console_handle = (!args.no_console).then(|| {
            log_controls_hint();
            console::spawn(Arc::clone(&controller))
        });

        let summary = controller.run(&tx).await;

        let recovered = if args.retry_failed && !summary.stopped {
            retry_failed(&controller).await
        } else {
            0
        };

        if let Some(handle) = console_handle {
            handle.abort();
        }
        drop(tx);
        if let Err(e) = reporter.await {
            warn!("⚠️ Progress reporter ended abnormally: {}", e);
        }

        let results = state.lock().await.clone();
        let export_path = self.write_outputs(&results, args)?;

        if args.list {
            print_page(&results, args, self.config.page_size);
        }

        print_final_stats(
            results.count_status(ItemStatus::Success),
            results.error_count(),
            results.count_status(ItemStatus::Skipped),
            results.len(),
            summary.stopped,
            &self.config.output_log_file,
        );

        Ok(RunReport {
            summary,
            results,
            export_path,
            recovered,
        })
    }

    /// Download a sheet and report what a run would use
    pub async fn fetch(&self, args: &FetchArgs) -> Result<SheetImport> {
        info!("📁 Connecting to sheet...");
        let import = import_sheet(self.sheets.as_ref(), &args.sheet)
            .await
            .context("failed to import sheet")?;

        info!(
            "✓ Sheet loaded: {} data rows, {} unique company names",
            import.table.len().saturating_sub(1),
            import.names.len()
        );
        for (i, name) in import.names.iter().take(10).enumerate() {
            info!("  {}. {}", i + 1, truncate_text(name, 80));
        }
        if import.names.len() > 10 {
            info!("  ... and {} more", import.names.len() - 10);
        }

        if let Some(path) = &args.output {
            write_csv(import.table.rows(), path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("✓ Cleaned rows saved to {}", path.display());
        }

        Ok(import)
    }

    async fn load_inputs(&self, args: &RunArgs) -> Result<(Vec<String>, Option<ReferenceTable>)> {
        let mut names = Vec::new();
        if let Some(path) = &args.names_file {
            info!("📁 Reading names from {}", path.display());
            names.extend(load_names_file(path).await?);
        }
        names.extend(args.names.iter().cloned());
        let mut names = unique_names(names);

        let mut table = None;
        if let Some(path) = &args.table {
            table = Some(load_table_csv(path).await?);
        }

        if let Some(url) = &args.sheet {
            info!("📁 Connecting to sheet...");
            if names.is_empty() {
                let import = import_sheet(self.sheets.as_ref(), url)
                    .await
                    .context("failed to import sheet")?;
                info!("✓ Sheet connected, {} company names in column D", import.names.len());
                names = import.names;
                table = Some(import.table);
            } else {
                let reference = load_reference_table(self.sheets.as_ref(), url)
                    .await
                    .context("failed to load reference sheet")?;
                info!("✓ Sheet connected, {} rows", reference.len());
                table = Some(reference);
            }
        }

        Ok((names, table))
    }

    fn write_outputs(&self, results: &ResultSet, args: &RunArgs) -> Result<Option<PathBuf>> {
        let path = args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_export_name(results)));
        export_to_path(results, &path).with_context(|| format!("failed to export {}", path.display()))?;

        if let Some(json_path) = &args.json {
            write_bulk_copy(results, json_path)
                .with_context(|| format!("failed to write {}", json_path.display()))?;
        }

        if results.error_count() > 0 {
            let writer = FailureWriter::with_path(self.config.failed_file.as_str());
            let written = writer.write_all(results.items())?;
            warn!("⚠️ {} failed items written to {}", written, writer.path());
        }

        Ok(Some(path))
    }
}

/// One retry per failed item, after the batch
async fn retry_failed(controller: &BatchController) -> usize {
    let ids: Vec<String> = {
        let state = controller.state();
        let results = state.lock().await;
        results
            .items()
            .iter()
            .filter(|item| item.status == ItemStatus::Error)
            .map(|item| item.id.clone())
            .collect()
    };
    if ids.is_empty() {
        return 0;
    }

    info!("🔁 Retrying {} failed items", ids.len());
    let mut recovered = 0;
    for id in ids {
        if controller.control().is_stopped() {
            break;
        }
        if let Some(item) = controller.retry(&id, None).await {
            if item.status == ItemStatus::Success {
                recovered += 1;
            }
        }
    }
    info!("✓ Recovered {} items on retry", recovered);
    recovered
}

async fn report_progress(mut rx: mpsc::UnboundedReceiver<BatchProgress>) {
    while let Some(progress) = rx.recv().await {
        info!(
            "📊 Progress: {}/{} ({}%)",
            progress.processed, progress.queue_total, progress.percent
        );
    }
}

fn print_page(results: &ResultSet, args: &RunArgs, page_size: usize) {
    let filter = ItemFilter {
        hide_completed: args.hide_completed,
        term: args.filter.clone(),
    };
    let view = results.page(&filter, args.page, page_size);

    info!("\n{}", "=".repeat(60));
    info!(
        "📋 Results {}-{} of {} (page {}/{})",
        view.start,
        view.end,
        view.total,
        view.page,
        view.total_pages.max(1)
    );
    info!("{}", "=".repeat(60));
    for item in &view.items {
        let position = results.position(&item.id).map_or(0, |i| i + 1);
        let detail = match (&item.data, &item.error_message) {
            (Some(data), _) => format!(
                "{} | {}{}",
                data.domain,
                data.tax_code,
                item.update_history
                    .as_deref()
                    .map(|h| format!(" | {}", h))
                    .unwrap_or_default()
            ),
            (None, Some(error)) => format!("error: {}", error),
            (None, None) => String::new(),
        };
        info!(
            "{:>4}. [{}] {} {}",
            position,
            item.status,
            truncate_text(&item.input_name, 60),
            detail
        );
    }
}
