//! Migrate command implementation.

use crate::cli::Cli;
use crate::config::Overrides;
use crate::error::Result;
use crate::storage::{SqliteStorage, StepOutcome, StepReport};
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct MigrateOutput<'a> {
    db_path: String,
    steps: &'a [StepReport],
}

/// Open the database, which runs every upgrade step, and report what each
/// step did.
///
/// A failed step is reported but does not fail the command; the server
/// starts in the same situation.
///
/// # Errors
///
/// Returns an error if the database cannot be opened at all.
pub fn execute(cli: &Cli, json: bool) -> Result<()> {
    let settings = cli.settings(Overrides::default())?;
    let storage = SqliteStorage::open(&settings.db_path)?;
    let steps = storage.upgrade_report();

    if json {
        let output = MigrateOutput {
            db_path: settings.db_path.display().to_string(),
            steps,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if cli.quiet {
        return Ok(());
    }

    println!("Database: {}", settings.db_path.display());
    for report in steps {
        let (label, detail) = match &report.outcome {
            StepOutcome::Skipped(d) => ("skipped".dimmed(), d),
            StepOutcome::Applied(d) => ("applied".green(), d),
            StepOutcome::Failed(d) => ("failed ".red().bold(), d),
        };
        println!("  {label}  {:<30} {}", report.step, detail.dimmed());
    }
    Ok(())
}
