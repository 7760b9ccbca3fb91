//! `vireo` command-line interface.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vireo", version, about = "PEG toolkit with labelled failures")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse and analyse a grammar, reporting diagnostics.
    Check {
        /// Grammar file.
        grammar: std::path::PathBuf,
    },
    /// Compile a grammar and print the bytecode disassembly.
    Dump {
        /// Grammar file.
        grammar: std::path::PathBuf,
    },
    /// Match an input file against a grammar and print the tree.
    Run {
        /// Grammar file.
        grammar: std::path::PathBuf,
        /// Input file to match.
        input: std::path::PathBuf,
        /// Print the tree as JSON instead of the text notation.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Check { grammar } => commands::check(&grammar),
        Command::Dump { grammar } => commands::dump(&grammar),
        Command::Run {
            grammar,
            input,
            json,
        } => commands::run(&grammar, &input, json),
    }
}
