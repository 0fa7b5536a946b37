//! Observation log for harness runs.
//!
//! Every line goes to the console and, when a results file is attached, is appended to it.
//! Both writes happen under one lock so lines from concurrent tasks never interleave.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::Local;
use parking_lot::Mutex;

const BANNER: &str = "==================================================";
const SECTION: &str = "--------------------------------------------------";

struct Sinks {
    console: Box<dyn Write + Send>,
    file: Option<BufWriter<File>>,
}

/// Line-oriented writer shared by the driver and every request task.
pub(crate) struct ResultLog {
    sinks: Mutex<Sinks>,
}

impl ResultLog {
    /// Creates a log writing to `console` and, if present, to `file`.
    pub(crate) fn new(console: Box<dyn Write + Send>, file: Option<File>) -> Self {
        Self {
            sinks: Mutex::new(Sinks {
                console,
                file: file.map(BufWriter::new),
            }),
        }
    }

    /// Opens `path` for appending, creating it if needed.
    pub(crate) fn open_results_file(path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }

    pub(crate) fn has_file(&self) -> bool {
        self.sinks.lock().file.is_some()
    }

    /// Writes one whole line to every sink and flushes them.
    ///
    /// Write failures are reported through the diagnostic logger; an observation is never worth
    /// aborting a run for.
    pub(crate) fn line(&self, message: &str) {
        let mut sinks = self.sinks.lock();

        if let Err(e) = writeln!(sinks.console, "{}", message).and_then(|_| sinks.console.flush()) {
            warn!("Unable to write result line to console: {}", e);
        }

        if let Some(file) = sinks.file.as_mut() {
            if let Err(e) = writeln!(file, "{}", message).and_then(|_| file.flush()) {
                warn!("Unable to append result line to results file: {}", e);
            }
        }
    }

    /// Writes the banner that opens a new run.
    pub(crate) fn session_header(&self) {
        self.line("");
        self.line(BANNER);
        self.line(&format!(
            "NEW TEST RUN: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        self.line(BANNER);
    }

    /// Writes the banner that opens an isolation level's block of scenarios.
    pub(crate) fn section(&self, title: &str) {
        self.line("");
        self.line(SECTION);
        self.line(title);
        self.line(SECTION);
    }
}
