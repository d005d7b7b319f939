//! Logging helpers
//!
//! Subscriber setup plus the banner-style progress lines used by the
//! orchestrator.

use anyhow::Result;
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` when verbose.
/// Calling it twice is harmless.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Write the run log header
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\nCompany lookup log - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// Append one line to the run log
pub fn append_log_line(log_file_path: &str, line: &str) -> Result<()> {
    use std::io::Write;

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%H:%M:%S"),
        line
    )?;
    Ok(())
}

pub fn log_startup(backend: &str, delay_ms: u64) {
    info!("{}", "=".repeat(60));
    info!("🚀 Starting company lookup - sequential batch mode");
    info!("🔎 Backend: {}", backend);
    info!("⏱️ Delay between requests: {} ms", delay_ms);
    info!("{}", "=".repeat(60));
}

pub fn log_items_loaded(total: usize, queued: usize, skipped: usize) {
    info!("✓ Loaded {} companies", total);
    info!("📋 Queued for lookup: {}", queued);
    if skipped > 0 {
        info!("💡 Already complete in the sheet, skipped: {}", skipped);
    }
}

pub fn log_controls_hint() {
    info!("⌨️ Controls: [p] pause/resume  [s] stop  [r <n> [name]] retry item n");
}

/// Print the final statistics
pub fn print_final_stats(
    success: usize,
    failed: usize,
    skipped: usize,
    total: usize,
    stopped: bool,
    log_file_path: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 Run statistics");
    info!(
        "Finished at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ Success: {}/{}", success, total);
    info!("❌ Failed: {}", failed);
    info!("⏭️ Skipped: {}", skipped);
    if stopped {
        info!("🛑 Run stopped before the queue was finished");
    }
    info!("{}", "=".repeat(60));
    info!("\nLog saved to: {}", log_file_path);
}

/// Truncate long text for log display
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("Công ty", 20), "Công ty");
        assert_eq!(truncate_text("Công ty Cổ phần", 7), "Công ty...");
    }

    #[test]
    fn test_log_file_header_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let path = path.to_str().unwrap();

        init_log_file(path).unwrap();
        append_log_line(path, "Vinamilk -> success").unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with(&"=".repeat(60)));
        assert!(content.contains("Company lookup log"));
        assert!(content.trim_end().ends_with("Vinamilk -> success"));
    }
}
