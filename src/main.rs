mod cli;
mod logging;

use std::process::ExitCode;

use clap::Parser;
use cli::{parse_operation, render_error, Cli, ConsoleReporter, Invocation};
use fileutil::paths::is_directory;
use fileutil::{DirRole, FileUtilError, Settings, TaskBuilder};
use tracing::debug;

fn main() -> ExitCode {
    logging::init_logger();

    let args = Cli::parse();

    let Some(invocation) = Invocation::from_args(args.args) else {
        eprintln!("Invalid number of arguments");
        return ExitCode::FAILURE;
    };

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{}", render_error(&err));
            return ExitCode::FAILURE;
        }
    };
    debug!(?settings, "loaded settings");

    match run(invocation, settings) {
        Ok(code) => code,
        Err(err) => {
            report_fatal(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(invocation: Invocation, settings: Settings) -> Result<ExitCode, FileUtilError> {
    if !is_directory(invocation.root()) {
        eprintln!("Invalid rootDir");
        if let Invocation::Archive { storage, .. } = &invocation {
            if !is_directory(storage) {
                println!("Search Successful: Invalid storageDir");
            }
        }
        return Ok(ExitCode::FAILURE);
    }

    let task = TaskBuilder::new(invocation.root()).settings(settings);
    let mut reporter = ConsoleReporter;

    match invocation {
        Invocation::Search { name, .. } => {
            let outcome = task.search(name).run_with(&mut reporter)?;
            if outcome.found.is_none() {
                println!("Search Unsuccessful");
            }
        }
        Invocation::Transfer { storage, flag, name, .. } => {
            let operation = parse_operation(&flag)?;
            let outcome = task.transfer(storage, operation, name).run_with(&mut reporter)?;
            if outcome.found.is_none() {
                println!("Search Unsuccessful");
            }
        }
        Invocation::Archive { storage, pattern, .. } => {
            if !is_directory(&storage) {
                println!("Search Successful: Invalid storageDir");
                return Ok(ExitCode::FAILURE);
            }
            let outcome = task.archive(storage, pattern).run_with(&mut reporter)?;
            debug!(
                matches = outcome.matches,
                archived = outcome.archived,
                skipped = outcome.skipped,
                "archive finished"
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn report_fatal(err: &FileUtilError) {
    match err {
        // Already reported by the console reporter at the moment of the match.
        FileUtilError::InvalidDirectory { role: DirRole::Storage, .. } => {}
        FileUtilError::InvalidDirectory { role: DirRole::Root, .. } => eprintln!("Invalid rootDir"),
        FileUtilError::InvalidOperation(_) => eprintln!("Invalid operation"),
        other => eprintln!("fileutil: {}", render_error(other)),
    }
}
