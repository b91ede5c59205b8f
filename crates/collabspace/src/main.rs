//! `collabspace` command-line interface.

/// CLI module - command-line interface for collabspace
mod cli;

fn main() {
    if !cli::run_cli() {
        std::process::exit(1);
    }
}
