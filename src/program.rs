use std::env::current_dir;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Error;
use console::Term;

use crate::harness::results::ResultLog;
use crate::harness::{Driver, HarnessConfig};

/// The name of the cargo package.
const NAME: &str = env!("CARGO_PKG_NAME");

/// The version of the cargo package.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The authors who created the package.
const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

/// Handles the flow of a harness run from startup to the last scenario.
pub(crate) struct Program {
    config: HarnessConfig,
}

impl Program {
    /// Creates a new instance of the program with the fixed run settings.
    pub(crate) fn new() -> Self {
        Self {
            config: HarnessConfig::default(),
        }
    }

    /// Runs every scenario against the configured endpoint.
    pub(crate) fn run(&self) -> Result<(), Error> {
        Term::stdout().set_title("isolation probe");
        trace!("Starting isolation probe...");
        trace!("Program Name: {}", NAME);
        trace!("Program Version: {}", VERSION);
        trace!("Program Authors: {}", AUTHORS);
        match current_dir() {
            Ok(path) => trace!("Program Working Directory: {}", path.display()),
            Err(e) => warn!("Unable to get working directory: {}", e),
        }
        trace!("Harness configuration:\n{}", self.config.describe());

        let log = Arc::new(self.open_results(Box::new(io::stdout())));
        trace!("Results file attached: {}", log.has_file());
        log.session_header();

        info!(
            "Probing {}/{} across {} isolation levels...",
            self.config.base_url,
            self.config.target_id,
            self.config.isolation_levels.len()
        );
        let driver = Driver::new(self.config.clone(), Arc::clone(&log))?;
        driver.run()?;

        info!("Finished all scenarios!");
        Ok(())
    }

    /// Opens the results file, falling back to console output if it cannot be opened.
    fn open_results(&self, console: Box<dyn Write + Send>) -> ResultLog {
        let path = Path::new(&self.config.results_file);
        match ResultLog::open_results_file(path) {
            Ok(file) => {
                trace!("Appending results to \"{}\"...", path.display());
                ResultLog::new(console, Some(file))
            }
            Err(e) => {
                warn!(
                    "Failed to open results file \"{}\": {}. \
                     Results will only be printed to the terminal.",
                    path.display(),
                    e
                );
                ResultLog::new(console, None)
            }
        }
    }
}
