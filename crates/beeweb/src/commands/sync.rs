//! `beeweb sync` command implementation.

use std::path::PathBuf;

use bw_config::Config;
use bw_sync::{CycleReport, Syncer};
use clap::Args;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the sync command.
#[derive(Args)]
pub(crate) struct SyncArgs {
    /// Path to configuration file (default: auto-discover beeweb.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl SyncArgs {
    /// Execute the sync command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or any group fails to sync.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;

        let syncer = Syncer::from_config(&config)?;
        let report = syncer.run_cycle();
        print_report(&output, &report);

        if report.is_success() {
            Ok(())
        } else {
            Err(CliError::Validation(format!(
                "{} group(s) failed to sync",
                report.failures.len()
            )))
        }
    }
}

fn print_report(output: &Output, report: &CycleReport) {
    for group in &report.groups {
        output.success(&format!(
            "{}: {} updated, {} tracked",
            group.name,
            group.updated.len(),
            group.tracked
        ));
        for path in &group.updated {
            output.detail(&format!("  {path}"));
        }
    }
    for (name, error) in &report.failures {
        output.error(&format!("{name}: {error}"));
    }
}
