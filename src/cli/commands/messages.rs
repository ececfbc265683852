//! Contact message commands.

use super::{cancel_on_ctrl_c, runtime};
use crate::cli::backend::Backend;
use crate::cli::{Cli, ClientArgs, MessagesCommands};
use crate::client::MessagesApi;
use crate::error::Result;
use crate::poll::poll_unread;
use colored::Colorize;
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Execute a messages command.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
pub fn execute(cli: &Cli, command: &MessagesCommands, json: bool) -> Result<()> {
    match command {
        MessagesCommands::Unread { client } => unread(cli, client, json),
        MessagesCommands::Watch { interval, client } => watch(cli, client, *interval, json),
    }
}

fn unread(cli: &Cli, args: &ClientArgs, json: bool) -> Result<()> {
    let settings = cli.settings(args.overrides())?;
    let backend = Backend::connect(args, &settings, &cli.actor())?;
    let count = runtime()?.block_on(backend.unread_count())?;

    if json {
        println!("{}", json!({ "unread": count }));
    } else {
        println!("{count}");
    }
    Ok(())
}

fn watch(cli: &Cli, args: &ClientArgs, interval: Option<u64>, json: bool) -> Result<()> {
    let settings = cli.settings(args.overrides())?;
    let backend = Backend::connect(args, &settings, &cli.actor())?;
    let period = interval.map_or(settings.poll_interval, Duration::from_secs);

    if !json && !cli.quiet {
        println!(
            "Watching unread messages on {} every {}s (Ctrl-C to stop)",
            backend.describe(&settings),
            period.as_secs()
        );
    }

    runtime()?.block_on(async move {
        let stop = CancellationToken::new();
        cancel_on_ctrl_c(&stop);

        // Print only when the count changes.
        let last = Arc::new(AtomicI64::new(-1));
        let task = poll_unread(backend, period, move |count| {
            if last.swap(count, Ordering::SeqCst) == count {
                return;
            }
            if json {
                println!("{}", json!({ "unread": count }));
            } else if count > 0 {
                println!("{} unread", count.to_string().yellow().bold());
            } else {
                println!("{}", "no unread messages".dimmed());
            }
        });

        stop.cancelled().await;
        task.shutdown().await;
    });
    Ok(())
}
