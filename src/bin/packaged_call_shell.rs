//! Line-oriented request shell.
//!
//! Reads one JSON request per line from stdin and writes one JSON response per
//! line to stdout. Logging goes to stderr and is controlled with `RUST_LOG`.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use log::{error, info};
use packaged_call::Shell;

fn run() -> io::Result<()> {
    let shell = Shell::with_registered_filters();
    info!(
        "serving {} filters: {}",
        shell.registry().len(),
        shell.registry().names().collect::<Vec<_>>().join(", ")
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = shell.handle_line(&line);
        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("shell terminated: {e}");
            ExitCode::FAILURE
        }
    }
}
