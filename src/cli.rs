use clap::{ArgAction, Args, Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(
    name = "bizsearch",
    version,
    about = "Bulk lookup of Vietnamese company tax codes and domains"
)]
pub struct Cli {
    /// TOML config file; environment variables override it
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look companies up, reconcile with a sheet and export
    Run(RunArgs),
    /// Download a sheet and show what would be processed
    Fetch(FetchArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// File with one company name per line
    #[arg(long = "names")]
    pub names_file: Option<PathBuf>,
    /// Company name (repeatable)
    #[arg(long = "name")]
    pub names: Vec<String>,
    /// Google Sheet link; the name source when no names are given,
    /// otherwise only the reference table
    #[arg(long, conflicts_with = "table")]
    pub sheet: Option<String>,
    /// Local CSV reference table
    #[arg(long)]
    pub table: Option<PathBuf>,
    /// Only run items in this 1-based range, e.g. `5-20`
    #[arg(long)]
    pub select: Option<SelectRange>,
    /// Export file (.xlsx or .csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Also write the bulk-copy JSON payload here
    #[arg(long)]
    pub json: Option<PathBuf>,
    /// Retry failed items once after the batch
    #[arg(long, default_value_t = false)]
    pub retry_failed: bool,
    /// Override the delay between lookups
    #[arg(long)]
    pub delay_ms: Option<u64>,
    /// Disable the stdin controls
    #[arg(long, default_value_t = false)]
    pub no_console: bool,
    /// Print a page of results at the end
    #[arg(long, default_value_t = false)]
    pub list: bool,
    #[arg(long, default_value_t = false)]
    pub hide_completed: bool,
    /// Only list names containing this text
    #[arg(long)]
    pub filter: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub page: usize,
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Google Sheet link
    pub sheet: String,
    /// Save the cleaned rows as CSV
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Inclusive 1-based item range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectRange {
    pub start: usize,
    pub end: usize,
}

impl SelectRange {
    /// 0-based inclusive bounds
    pub fn to_indices(self) -> (usize, usize) {
        (self.start - 1, self.end - 1)
    }
}

impl FromStr for SelectRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| format!("invalid item number '{}'", part.trim()))
        };
        match s.split_once('-') {
            Some((start, end)) => Ok(Self {
                start: parse(start)?,
                end: parse(end)?,
            }),
            None => {
                let n = parse(s)?;
                Ok(Self { start: n, end: n })
            }
        }
    }
}

impl fmt::Display for SelectRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
