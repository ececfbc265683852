//! Serve command implementation.

use super::{cancel_on_ctrl_c, runtime};
use crate::cli::{Cli, ServeArgs};
use crate::error::Result;
use crate::storage::{SqliteStorage, StepOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Open (or create) the database and run the API until Ctrl-C.
///
/// # Errors
///
/// Returns an error if settings are invalid, the database cannot be opened,
/// or the address cannot be bound.
pub fn execute(cli: &Cli, args: &ServeArgs) -> Result<()> {
    let settings = cli.settings(args.overrides())?;
    let storage = SqliteStorage::open(&settings.db_path)?;
    info!(path = %settings.db_path.display(), "Database opened");

    for report in storage.upgrade_report() {
        if let StepOutcome::Failed(detail) = &report.outcome {
            warn!(step = report.step, %detail, "Upgrade step failed; serving anyway");
        }
    }

    runtime()?.block_on(async {
        let shutdown = CancellationToken::new();
        cancel_on_ctrl_c(&shutdown);
        crate::api::serve(storage, &settings, shutdown).await
    })
}
