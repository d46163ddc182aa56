//! `fetcher --completions <SHELL>` – print a completion script to stdout.

use clap::Command;
use clap_complete::{generate, Shell};

pub fn print_completions(shell: Shell, cmd: &mut Command) {
    let name = cmd.get_name().to_string();
    generate(shell, cmd, name, &mut std::io::stdout());
}
