#![allow(dead_code)]

use bizsearch::{CompanyData, CompanyLookup, LookupError, ReferenceTable, SheetError, SheetFetch};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};

/// Lookup fake answering from a fixed map
///
/// Unknown names fail with a terminal "not found". When gated, every call
/// reports its start on `started` and then waits for a permit.
pub struct ScriptedLookup {
    answers: HashMap<String, (String, String)>,
    calls: Mutex<Vec<String>>,
    gate: Option<Arc<Semaphore>>,
    started: Option<mpsc::UnboundedSender<String>>,
}

impl ScriptedLookup {
    pub fn new(answers: &[(&str, &str, &str)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(name, domain, tax)| (name.to_string(), (domain.to_string(), tax.to_string())))
                .collect(),
            calls: Mutex::new(Vec::new()),
            gate: None,
            started: None,
        }
    }

    /// Block each call until the returned semaphore hands out a permit
    pub fn gated(mut self) -> (Self, Arc<Semaphore>, mpsc::UnboundedReceiver<String>) {
        let gate = Arc::new(Semaphore::new(0));
        let (tx, rx) = mpsc::unbounded_channel();
        self.gate = Some(Arc::clone(&gate));
        self.started = Some(tx);
        (self, gate, rx)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CompanyLookup for ScriptedLookup {
    fn lookup<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<CompanyData, LookupError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(name.to_string());
            if let Some(started) = &self.started {
                let _ = started.send(name.to_string());
            }
            if let Some(gate) = &self.gate {
                gate.acquire().await.expect("gate closed").forget();
            }
            match self.answers.get(name) {
                Some((domain, tax)) => Ok(CompanyData::new(name, domain.as_str(), tax.as_str())
                    .with_summary(format!("MST: {}\nDOMAIN: {}", tax, domain))),
                None => Err(LookupError::Terminal("not found".to_string())),
            }
        })
    }
}

/// Sheet fake returning fixed rows
pub struct FixedSheet(pub Vec<Vec<String>>);

impl SheetFetch for FixedSheet {
    fn fetch_rows<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Vec<Vec<String>>, SheetError>> {
        Box::pin(async move { Ok::<_, SheetError>(self.0.clone()) })
    }
}

pub fn row(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn names(list: &[&str]) -> Vec<String> {
    row(list)
}

pub fn sample_table() -> ReferenceTable {
    ReferenceTable::new(vec![
        row(&["STT", "", "", "Tên công ty", "Domain", "MST"]),
        row(&["1", "", "", "Acme", "@acme.com", "111"]),
        row(&["2", "", "", "Beta", "", ""]),
        row(&["3", "", "", "", "", ""]),
    ])
}
