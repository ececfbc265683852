//! Command implementations.

pub mod completions;
pub mod intentions;
pub mod messages;
pub mod migrate;
pub mod serve;
pub mod version;

use crate::error::{Error, Result};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Create the tokio runtime for async commands.
pub(crate) fn runtime() -> Result<Runtime> {
    Runtime::new().map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

/// Cancel `token` on the first Ctrl-C.
pub(crate) fn cancel_on_ctrl_c(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            token.cancel();
        }
    });
}
