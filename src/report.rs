use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use parking_lot::Mutex;
use serde::Serialize;

/// One progress event from a pipeline run. The transforms emit these and
/// stay agnostic of where they end up.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    TableWritten { table: String, rows: usize },
    TableSkipped { table: String, reason: String },
    EntityFailed { entity: String, error: String },
}

pub trait Reporter {
    fn report(&self, event: &RunEvent);
}

/// Table counts for one batch run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {

    /// True when no entity branch failed.
    pub fn ok(&self) -> bool {
        self.failed == 0
    }
}

/// Prints events in the shape the batch jobs log to the terminal.
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, event: &RunEvent) {
        match event {
            RunEvent::TableWritten { table, rows } => println!("Wrote {} ({} rows)", table, rows),
            RunEvent::TableSkipped { table, reason } => println!("{} skipped ({})", table, reason),
            RunEvent::EntityFailed { entity, error } => eprintln!("{} failed: {}", entity, error),
        }
    }
}

/// Append-only event log, one timestamped JSON line per event.
pub struct FileReporter {
    writer: Mutex<BufWriter<std::fs::File>>,
}

impl FileReporter {

    pub fn new(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(FileReporter {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

#[derive(Serialize)]
struct LogLine<'a> {
    ts: String,
    #[serde(flatten)]
    event: &'a RunEvent,
}

impl Reporter for FileReporter {
    fn report(&self, event: &RunEvent) {
        let line = LogLine {
            ts: chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            event,
        };
        if let Ok(json) = serde_json::to_string(&line) {
            let mut writer = self.writer.lock();
            let _ = writeln!(writer, "{}", json);
            let _ = writer.flush();
        }
    }
}

/// Fans each event out to every inner reporter.
pub struct MultiReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl MultiReporter {

    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        MultiReporter { reporters }
    }
}

impl Reporter for MultiReporter {
    fn report(&self, event: &RunEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}

/// Console reporter, optionally teeing events into a JSON-lines log file.
pub fn build_reporter(log_file: Option<&Path>) -> std::io::Result<Box<dyn Reporter>> {
    match log_file {
        Some(path) => Ok(Box::new(MultiReporter::new(vec![
            Box::new(ConsoleReporter),
            Box::new(FileReporter::new(path)?),
        ]))),
        None => Ok(Box::new(ConsoleReporter)),
    }
}
