//! Subcommand implementations: thin wrappers over the library crates.

use std::path::Path;
use std::process::ExitCode;

use vireo_compiler::diagnostics::DiagnosticsPrinter;
use vireo_compiler::{Loader, analyze, transform};
use vireo_core::FileId;
use vireo_lib::{Config, Matcher};

/// Parse and analyse a grammar; print every diagnostic with source
/// snippets. Exit code reflects error-level findings only.
pub fn check(grammar_path: &Path) -> ExitCode {
    let source = match std::fs::read_to_string(grammar_path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("vireo: cannot read {}: {err}", grammar_path.display());
            return ExitCode::FAILURE;
        }
    };

    let outcome = match Loader::new().load_file(grammar_path) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("vireo: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut diagnostics = outcome.diagnostics;
    let grammar = transform::apply(outcome.grammar, &Config::default().grammar);
    analyze::check_refs(&grammar, &mut diagnostics);
    analyze::check_loops(&grammar, &mut diagnostics);

    if diagnostics.is_empty() {
        println!("{}: ok", grammar_path.display());
        return ExitCode::SUCCESS;
    }

    // The root grammar file registers first, so its id is 0.
    let report = DiagnosticsPrinter::new(&diagnostics)
        .source(&source, FileId(0))
        .path(&grammar_path.display().to_string())
        .colored(true)
        .render();
    eprintln!("{report}");

    if diagnostics.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Compile a grammar and print its disassembly.
pub fn dump(grammar_path: &Path) -> ExitCode {
    match Matcher::from_file(grammar_path, Config::default()) {
        Ok(matcher) => {
            print!("{}", matcher.dump());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("vireo: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Match an input file against a grammar and print the result.
pub fn run(grammar_path: &Path, input_path: &Path, json: bool) -> ExitCode {
    let mut matcher = match Matcher::from_file(grammar_path, Config::default()) {
        Ok(matcher) => matcher,
        Err(err) => {
            eprintln!("vireo: {err}");
            return ExitCode::FAILURE;
        }
    };

    let file = match std::fs::File::open(input_path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("vireo: cannot open {}: {err}", input_path.display());
            return ExitCode::FAILURE;
        }
    };
    // Safety: the mapping is read-only and lives for the duration of
    // the match; concurrent truncation of the input file is the usual
    // memmap caveat and is accepted for a CLI.
    let mapped = match unsafe { memmap2::Mmap::map(&file) } {
        Ok(mapped) => mapped,
        Err(err) => {
            eprintln!("vireo: cannot map {}: {err}", input_path.display());
            return ExitCode::FAILURE;
        }
    };

    match matcher.parse(&mapped) {
        Ok(result) => {
            if json {
                match result.tree.to_owned() {
                    Some(owned) => match serde_json::to_string_pretty(&owned) {
                        Ok(rendered) => println!("{rendered}"),
                        Err(err) => {
                            eprintln!("vireo: {err}");
                            return ExitCode::FAILURE;
                        }
                    },
                    None => println!("null"),
                }
            } else {
                println!("{}", result.tree);
            }
            if result.consumed < mapped.len() {
                eprintln!(
                    "vireo: matched {} of {} bytes",
                    result.consumed,
                    mapped.len()
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("vireo: {err}");
            ExitCode::FAILURE
        }
    }
}
