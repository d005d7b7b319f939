mod common;

use bizsearch::cli::RunArgs;
use bizsearch::services::export_service::BulkCopyEntry;
use bizsearch::{App, CompanyData, CompanyLookup, Config, ItemStatus, LookupError};
use common::{row, FixedSheet, ScriptedLookup};
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

fn test_config(dir: &Path) -> Config {
    Config {
        output_log_file: dir.join("run.log").to_string_lossy().into_owned(),
        failed_file: dir.join("failed.txt").to_string_lossy().into_owned(),
        request_delay_ms: 0,
        ..Config::default()
    }
}

fn quiet_args() -> RunArgs {
    RunArgs {
        no_console: true,
        delay_ms: Some(0),
        page: 1,
        ..RunArgs::default()
    }
}

fn read_grid(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[tokio::test]
async fn test_run_with_local_files() {
    let dir = tempfile::tempdir().unwrap();
    let names_path = dir.path().join("names.txt");
    std::fs::write(&names_path, "Acme\nBeta\n\nBeta\nNobody\n").unwrap();
    let table_path = dir.path().join("table.csv");
    std::fs::write(
        &table_path,
        "STT,,,Tên công ty,Domain,MST\n1,,,Acme,@acme.com,111\n2,,,Beta,,\n",
    )
    .unwrap();

    let lookup = Arc::new(ScriptedLookup::new(&[("Beta", "@beta.vn", "222")]));
    let app = App::with_services(
        test_config(dir.path()),
        lookup.clone(),
        Arc::new(FixedSheet(Vec::new())),
    );

    let output = dir.path().join("out.csv");
    let json = dir.path().join("copy.json");
    let args = RunArgs {
        names_file: Some(names_path),
        table: Some(table_path),
        output: Some(output.clone()),
        json: Some(json.clone()),
        list: true,
        ..quiet_args()
    };

    let report = app.run(&args).await.unwrap();

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.summary.attempted, 2);
    assert_eq!((report.summary.succeeded, report.summary.failed), (1, 1));
    assert_eq!(report.export_path.as_deref(), Some(output.as_path()));
    assert_eq!(lookup.calls(), vec!["Beta", "Nobody"]);

    let grid = read_grid(&output);
    // failed lookups leave the table alone
    assert_eq!(grid.len(), 3);
    assert_eq!(grid[1], row(&["1", "", "", "Acme", "@acme.com", "111"]));
    assert_eq!(grid[2], row(&["2", "", "", "Beta", "@beta.vn", "222"]));

    let entries: Vec<BulkCopyEntry> =
        serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    let copied: HashSet<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(copied, HashSet::from(["Acme", "Beta"]));

    let failed = std::fs::read_to_string(dir.path().join("failed.txt")).unwrap();
    assert_eq!(failed, "Nobody\tnot found\n");

    let log = std::fs::read_to_string(dir.path().join("run.log")).unwrap();
    assert!(log.contains("Beta -> success (E3, F3)"));
    assert!(log.contains("Nobody -> error: not found"));
}

#[tokio::test]
async fn test_results_grid_without_table() {
    let dir = tempfile::tempdir().unwrap();
    let lookup = Arc::new(ScriptedLookup::new(&[("Acme", "@acme.com", "111")]));
    let app = App::with_services(
        test_config(dir.path()),
        lookup,
        Arc::new(FixedSheet(Vec::new())),
    );

    let output = dir.path().join("results.csv");
    let args = RunArgs {
        names: vec!["Acme".to_string(), " Nobody ".to_string()],
        output: Some(output.clone()),
        ..quiet_args()
    };
    app.run(&args).await.unwrap();

    assert_eq!(
        read_grid(&output),
        vec![
            row(&["Tên công ty", "Domain", "Mã số thuế"]),
            row(&["Acme", "@acme.com", "111"]),
            row(&["Nobody", "Lỗi", "Lỗi"]),
        ]
    );
}

#[tokio::test]
async fn test_sheet_is_name_source_without_names() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = FixedSheet(vec![
        row(&["STT", "", "", "Tên công ty", "Domain", "MST"]),
        row(&["1", "", "", "Acme", "", ""]),
        row(&["", "", "", "", "", ""]),
        row(&["2", "", "", "Beta", "@beta.vn", "222"]),
    ]);
    let lookup = Arc::new(ScriptedLookup::new(&[("Acme", "@acme.com", "111")]));
    let app = App::with_services(test_config(dir.path()), lookup.clone(), Arc::new(sheet));

    let output = dir.path().join("sheet.csv");
    let args = RunArgs {
        sheet: Some("https://docs.google.com/spreadsheets/d/abc123/edit#gid=0".to_string()),
        output: Some(output.clone()),
        ..quiet_args()
    };
    let report = app.run(&args).await.unwrap();

    assert_eq!(lookup.calls(), vec!["Acme"]);
    assert_eq!(report.results.item(1).unwrap().status, ItemStatus::Skipped);
    assert_eq!(
        read_grid(&output),
        vec![
            row(&["STT", "", "", "Tên công ty", "Domain", "MST"]),
            row(&["1", "", "", "Acme", "@acme.com", "111"]),
            row(&["2", "", "", "Beta", "@beta.vn", "222"]),
        ]
    );
}

#[tokio::test]
async fn test_selection_limits_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let lookup = Arc::new(ScriptedLookup::new(&[]));
    let app = App::with_services(
        test_config(dir.path()),
        lookup.clone(),
        Arc::new(FixedSheet(Vec::new())),
    );

    let args = RunArgs {
        names: ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect(),
        select: Some("2-3".parse().unwrap()),
        output: Some(dir.path().join("sel.csv")),
        ..quiet_args()
    };
    let report = app.run(&args).await.unwrap();

    assert_eq!(lookup.calls(), vec!["b", "c"]);
    assert_eq!(report.results.item(0).unwrap().status, ItemStatus::Pending);
    assert_eq!(report.results.item(3).unwrap().status, ItemStatus::Pending);
}

/// Fails the first call for every name, then answers
struct FlakyLookup {
    seen: Mutex<HashSet<String>>,
}

impl CompanyLookup for FlakyLookup {
    fn lookup<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<CompanyData, LookupError>> {
        Box::pin(async move {
            if self.seen.lock().unwrap().insert(name.to_string()) {
                Err(LookupError::Terminal("quota".to_string()))
            } else {
                Ok(CompanyData::new(name, "@ok.vn", "999"))
            }
        })
    }
}

#[tokio::test]
async fn test_retry_failed_recovers_items() {
    let dir = tempfile::tempdir().unwrap();
    let app = App::with_services(
        test_config(dir.path()),
        Arc::new(FlakyLookup {
            seen: Mutex::new(HashSet::new()),
        }),
        Arc::new(FixedSheet(Vec::new())),
    );

    let args = RunArgs {
        names: vec!["Acme".to_string(), "Beta".to_string()],
        retry_failed: true,
        output: Some(dir.path().join("retry.csv")),
        ..quiet_args()
    };
    let report = app.run(&args).await.unwrap();

    assert_eq!(report.summary.failed, 2);
    assert_eq!(report.recovered, 2);
    assert_eq!(report.results.error_count(), 0);
    assert!(!dir.path().join("failed.txt").exists());
}

#[tokio::test]
async fn test_no_names_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let lookup = Arc::new(ScriptedLookup::new(&[]));
    let app = App::with_services(
        test_config(dir.path()),
        lookup.clone(),
        Arc::new(FixedSheet(Vec::new())),
    );

    let report = app.run(&quiet_args()).await.unwrap();
    assert!(report.results.is_empty());
    assert!(report.export_path.is_none());
    assert!(lookup.calls().is_empty());
}

#[tokio::test]
async fn test_failure_file_is_per_run_and_reloadable() {
    let dir = tempfile::tempdir().unwrap();
    let failed_path = dir.path().join("failed.txt");
    let lookup = Arc::new(ScriptedLookup::new(&[("Beta", "@beta.vn", "222")]));
    let app = App::with_services(
        test_config(dir.path()),
        lookup.clone(),
        Arc::new(FixedSheet(Vec::new())),
    );

    let args = RunArgs {
        names: vec!["Nobody".to_string(), "Beta".to_string()],
        output: Some(dir.path().join("first.csv")),
        ..quiet_args()
    };
    app.run(&args).await.unwrap();
    app.run(&args).await.unwrap();
    assert_eq!(std::fs::read_to_string(&failed_path).unwrap(), "Nobody\tnot found\n");

    // the failure file doubles as a names file
    let rerun = RunArgs {
        names_file: Some(failed_path.clone()),
        output: Some(dir.path().join("rerun.csv")),
        ..quiet_args()
    };
    let report = app.run(&rerun).await.unwrap();
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results.item(0).unwrap().input_name, "Nobody");
    assert_eq!(std::fs::read_to_string(&failed_path).unwrap(), "Nobody\tnot found\n");
}
