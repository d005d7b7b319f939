//! Interactive run controls
//!
//! While a batch runs, stdin accepts:
//! - `p` toggle pause
//! - `s` stop after the current item
//! - `r <n> [new name]` retry item `n` (1-based), optionally renamed
//!
//! Ctrl-C behaves like `s`.

use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::orchestrator::batch_controller::BatchController;

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    TogglePause,
    Stop,
    Retry { position: usize, new_name: Option<String> },
}

/// Parse one line; `None` for blank or unknown input
pub fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head.to_lowercase().as_str() {
        "p" | "pause" => Some(ConsoleCommand::TogglePause),
        "s" | "stop" => Some(ConsoleCommand::Stop),
        "r" | "retry" => {
            let (number, name) = match rest.split_once(char::is_whitespace) {
                Some((number, name)) => (number, name.trim()),
                None => (rest, ""),
            };
            let position = number.parse::<usize>().ok().filter(|&n| n > 0)?;
            Some(ConsoleCommand::Retry {
                position,
                new_name: (!name.is_empty()).then(|| name.to_string()),
            })
        }
        _ => None,
    }
}

/// Read stdin lines on a plain thread
///
/// A blocking stdin read would otherwise keep the runtime alive at exit;
/// the thread is detached and dies with the process.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

/// Start the stdin and Ctrl-C listeners for `controller`
///
/// Abort the returned handle once the run is over.
pub fn spawn(controller: Arc<BatchController>) -> JoinHandle<()> {
    let control = controller.control();
    tokio::spawn(async move {
        let mut lines = spawn_stdin_reader();
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    warn!("🛑 Ctrl-C received, stopping after the current item");
                    control.stop();
                }
                line = lines.recv() => {
                    let Some(line) = line else {
                        // stdin closed; Ctrl-C still works
                        if tokio::signal::ctrl_c().await.is_ok() {
                            warn!("🛑 Ctrl-C received, stopping after the current item");
                            control.stop();
                        }
                        return;
                    };
                    handle_line(&controller, &line).await;
                }
            }
        }
    })
}

async fn handle_line(controller: &Arc<BatchController>, line: &str) {
    match parse_command(line) {
        Some(ConsoleCommand::TogglePause) => {
            if controller.control().toggle_pause() {
                info!("⏸️ Pausing after the current item ([p] to resume)");
            } else {
                info!("▶️ Resumed");
            }
        }
        Some(ConsoleCommand::Stop) => {
            info!("🛑 Stopping after the current item");
            controller.stop();
        }
        Some(ConsoleCommand::Retry { position, new_name }) => {
            let id = {
                let state = controller.state();
                let results = state.lock().await;
                results
                    .item(position - 1)
                    .map(|item| (item.id.clone(), item.is_in_flight()))
            };
            let Some((id, in_flight)) = id else {
                warn!("⚠️ No item #{}", position);
                return;
            };
            if in_flight {
                warn!("⚠️ Item #{} is being looked up right now, try again when it finishes", position);
                return;
            }
            let controller = Arc::clone(controller);
            tokio::spawn(async move {
                match controller.retry(&id, new_name.as_deref()).await {
                    Some(item) => info!("🔁 Retry #{} finished: {}", position, item.status),
                    None => warn!("⚠️ Retry #{} refused, item already in flight", position),
                }
            });
        }
        None => {
            if !line.trim().is_empty() {
                warn!("⚠️ Unknown command: {}", line.trim());
                crate::utils::logging::log_controls_hint();
            }
        }
    }
}
