use crate::cli_args::{Cli, CompletionArgs};
use anyhow::{Result, bail};
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::io;

pub fn handle_completion_command(args: &CompletionArgs) -> Result<()> {
    let shell = match args.shell.as_deref().unwrap_or("fish") {
        "fish" => Shell::Fish,
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        other => bail!("Unsupported shell '{}'. Use fish, bash or zsh.", other),
    };
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
    Ok(())
}
