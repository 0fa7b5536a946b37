#[macro_use]
extern crate log;

use std::env::consts::{ARCH, FAMILY, OS};

use anyhow::Error;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

use crate::program::Program;

mod harness;
mod program;

fn main() -> Result<(), Error> {
    initialize_logger();
    log_system_information();

    let program = Program::new();
    program.run()
}

/// Initializes diagnostic logging on stderr, leaving stdout to the result lines.
fn initialize_logger() {
    let mut config = ConfigBuilder::new();
    config.add_filter_allow_str("isolation_probe");

    if let Err(e) = TermLogger::init(
        LevelFilter::Info,
        config.build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize terminal logger: {}. Diagnostics will not be shown.", e);
    }
}

/// Logs information about the system being used.
fn log_system_information() {
    trace!("Printing system information out into log for debug purposes...");
    trace!("ARCH:           \"{}\"", ARCH);
    trace!("FAMILY:         \"{}\"", FAMILY);
    trace!("OS:             \"{}\"", OS);
}
