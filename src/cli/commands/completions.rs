//! Shell completions command implementation.

use crate::cli::{Cli, Shell};
use crate::error::Result;
use clap::CommandFactory;
use clap_complete::{generate, shells};
use std::io;

/// Write completions for `shell` to stdout.
pub fn execute(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    let out = &mut io::stdout();

    match shell {
        Shell::Bash => generate(shells::Bash, &mut cmd, "parish", out),
        Shell::Zsh => generate(shells::Zsh, &mut cmd, "parish", out),
        Shell::Fish => generate(shells::Fish, &mut cmd, "parish", out),
        Shell::PowerShell => generate(shells::PowerShell, &mut cmd, "parish", out),
        Shell::Elvish => generate(shells::Elvish, &mut cmd, "parish", out),
    }

    Ok(())
}
