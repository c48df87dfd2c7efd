use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunReport};
use crate::domain::ProcessResult;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Console,
    Json,
}

/// Prints progress lines to stdout as they arrive.
pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn print_run(report: &RunReport) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "CMS mirror summary (topic {})", report.topic)?;
        writeln!(
            stdout,
            "  updated: {}  skipped: {}  failed: {}",
            report.updated(),
            report.skipped(),
            report.failed()
        )?;
        for item in &report.items {
            if let ProcessResult::Failed { reason } = &item.result {
                writeln!(stdout, "  ! {}: {reason}", item.id)?;
            }
        }
        if report.metadata_advanced {
            writeln!(stdout, "  last run recorded as {}", report.started_at)?;
        } else {
            writeln!(stdout, "  last run timestamp left unchanged")?;
        }
        Ok(())
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => println!("{} [{} ms]", event.message, elapsed.as_millis()),
            None => println!("{}", event.message),
        }
    }
}

/// Stays quiet during the run and prints the report as JSON at the end.
pub struct JsonOutput;

impl JsonOutput {
    pub fn print_run(report: &RunReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
