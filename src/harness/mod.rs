//! Concurrency probes against the user API.
//!
//! For each isolation level the driver runs three scenarios back to back, each racing two
//! simulated users against the same record and logging what they observed.

use std::io;
use std::sync::Arc;
use std::thread::{self, ScopedJoinHandle};
use std::time::Duration;

use thiserror::Error;

pub(crate) mod config;
pub(crate) mod gate;
pub(crate) mod request;
pub(crate) mod results;

#[cfg(test)]
pub(crate) mod test_server;

pub(crate) use config::{HarnessConfig, IsolationLevel};
use gate::StartGate;
use request::{Endpoint, Method, RequestError, RequestTask, TaskOutcome};
use results::ResultLog;

/// Value the record is restored to after the write vs read scenario.
const BASELINE_COUNTRY: &str = "Philippines";

#[derive(Error, Debug)]
pub(crate) enum HarnessError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Task for {0} panicked")]
    TaskPanicked(String),

    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Runs the scenarios and owns everything they share.
pub(crate) struct Driver {
    config: HarnessConfig,
    endpoint: Endpoint,
    log: Arc<ResultLog>,
}

impl Driver {
    pub(crate) fn new(config: HarnessConfig, log: Arc<ResultLog>) -> Result<Self, HarnessError> {
        let endpoint = Endpoint::new(&config)?;
        Ok(Self {
            config,
            endpoint,
            log,
        })
    }

    /// Runs every scenario for every configured isolation level, strictly in sequence.
    pub(crate) fn run(&self) -> Result<(), HarnessError> {
        for &level in &self.config.isolation_levels {
            self.run_level(level)?;
        }

        Ok(())
    }

    pub(crate) fn run_level(&self, level: IsolationLevel) -> Result<(), HarnessError> {
        info!("Testing isolation level {}", level);
        self.log.section(&format!("TESTING ISOLATION LEVEL: {}", level));

        self.concurrent_reads(level)?;
        pause(self.config.reads_cooldown());

        self.write_vs_read(level)?;
        pause(self.config.write_read_cooldown());

        self.concurrent_writes(level)?;
        pause(self.config.writes_cooldown());

        Ok(())
    }

    /// Case #1: two readers hit the record together.
    pub(crate) fn concurrent_reads(
        &self,
        level: IsolationLevel,
    ) -> Result<[TaskOutcome; 2], HarnessError> {
        self.log.line("");
        self.log.line("[Case #1] Concurrent Reads (User A & User B)");

        let gate = Arc::new(StartGate::new());
        self.race(
            RequestTask::get("User A", level, &gate),
            RequestTask::get("User B", level, &gate),
            &gate,
        )
    }

    /// Case #2: a writer and a reader hit the record together, then the record is reset.
    pub(crate) fn write_vs_read(
        &self,
        level: IsolationLevel,
    ) -> Result<[TaskOutcome; 2], HarnessError> {
        self.log.line("");
        self.log.line("[Case #2] Write (User A) vs Read (User B)");

        let gate = Arc::new(StartGate::new());
        let outcomes = self.race(
            RequestTask::put("User A [WRITE]", "Locked_Region", level, &gate),
            RequestTask::get("User B [READ]", level, &gate),
            &gate,
        )?;

        self.reset_record();
        Ok(outcomes)
    }

    /// Case #3: two writers hit the record together, then the surviving value is logged.
    pub(crate) fn concurrent_writes(
        &self,
        level: IsolationLevel,
    ) -> Result<[TaskOutcome; 2], HarnessError> {
        self.log.line("");
        self.log.line("[Case #3] Concurrent Writes (Race Condition)");

        let gate = Arc::new(StartGate::new());
        let outcomes = self.race(
            RequestTask::put("User A", "Country_A", level, &gate),
            RequestTask::put("User B", "Country_B", level, &gate),
            &gate,
        )?;

        self.log_final_state();
        Ok(outcomes)
    }

    /// Starts both tasks on their own threads, opens the gate and joins them.
    ///
    /// Returns only once both threads have finished.
    fn race(
        &self,
        first: RequestTask,
        second: RequestTask,
        gate: &StartGate,
    ) -> Result<[TaskOutcome; 2], HarnessError> {
        let endpoint = &self.endpoint;
        let log = self.log.as_ref();

        thread::scope(|scope| -> Result<[TaskOutcome; 2], HarnessError> {
            let first_actor = first.actor().to_string();
            let second_actor = second.actor().to_string();

            let first_handle = thread::Builder::new()
                .name(first_actor.clone())
                .spawn_scoped(scope, move || first.run(endpoint, log));
            let second_handle = thread::Builder::new()
                .name(second_actor.clone())
                .spawn_scoped(scope, move || second.run(endpoint, log));

            // Never leave a spawned task parked on a closed gate.
            gate.release();
            trace!("Released {} and {}", first_actor, second_actor);

            // Join both before reporting either failure.
            let first_joined = first_handle.map(ScopedJoinHandle::join);
            let second_joined = second_handle.map(ScopedJoinHandle::join);

            let first_outcome =
                first_joined?.map_err(|_| HarnessError::TaskPanicked(first_actor))?;
            let second_outcome =
                second_joined?.map_err(|_| HarnessError::TaskPanicked(second_actor))?;

            for outcome in [&first_outcome, &second_outcome] {
                if outcome.result.is_err() {
                    debug!("{} did not get a response", outcome.actor);
                }
            }

            Ok([first_outcome, second_outcome])
        })
    }

    /// Best effort: a failed reset is deliberately not reported.
    fn reset_record(&self) {
        let reset = self.endpoint.send(
            Method::Put,
            Some(BASELINE_COUNTRY),
            self.config.maintenance_level,
        );
        if let Err(e) = reset {
            debug!("Ignoring failed reset: {}", e);
        }
    }

    /// Best effort: a failed check leaves no result line.
    fn log_final_state(&self) {
        match self.endpoint.send(Method::Get, None, self.config.maintenance_level) {
            Ok(observation) => self.log.line(&format!("   -> Final DB Value: {}", observation)),
            Err(e) => debug!("Ignoring failed final state check: {}", e),
        }
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        trace!("Cooling down for {:?}", duration);
        thread::sleep(duration);
    }
}
