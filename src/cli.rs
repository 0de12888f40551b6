use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use clap::Parser;
use fileutil::{FileUtilError, Operation, Reporter};

#[derive(Debug, Parser)]
#[command(name = "fileutil", version)]
#[command(about = "Find a file in a directory tree, then report, copy, move or archive it")]
#[command(after_help = "\
Modes (chosen by argument count):
  fileutil <rootDir> <fileName>                         report the first match
  fileutil <rootDir> <storageDir> -cp|-mv <fileName>    copy or move it to storageDir
  fileutil <rootDir> <storageDir> <extension>           gzip matches into storageDir/a1.tar")]
pub struct Cli {
    /// Positional arguments; their count selects the mode
    #[arg(value_name = "ARGS", num_args = 0.., allow_hyphen_values = true, trailing_var_arg = true)]
    pub args: Vec<OsString>,
}

/// A mode selected from the positional arguments, not yet validated.
#[derive(Debug, PartialEq, Eq)]
pub enum Invocation {
    Search {
        root: PathBuf,
        name: OsString,
    },
    Transfer {
        root: PathBuf,
        storage: PathBuf,
        flag: OsString,
        name: OsString,
    },
    Archive {
        root: PathBuf,
        storage: PathBuf,
        pattern: OsString,
    },
}

impl Invocation {
    /// Pick the mode from the argument count alone.
    pub fn from_args(args: Vec<OsString>) -> Option<Self> {
        let mut it = args.into_iter();
        match it.len() {
            2 => Some(Self::Search {
                root: it.next()?.into(),
                name: it.next()?,
            }),
            3 => Some(Self::Archive {
                root: it.next()?.into(),
                storage: it.next()?.into(),
                pattern: it.next()?,
            }),
            4 => Some(Self::Transfer {
                root: it.next()?.into(),
                storage: it.next()?.into(),
                flag: it.next()?,
                name: it.next()?,
            }),
            _ => None,
        }
    }

    pub fn root(&self) -> &Path {
        match self {
            Self::Search { root, .. } | Self::Transfer { root, .. } | Self::Archive { root, .. } => root,
        }
    }
}

/// Parse the transfer flag; non-UTF-8 flags are never valid.
pub fn parse_operation(flag: &OsStr) -> Result<Operation, FileUtilError> {
    flag.to_str()
        .ok_or_else(|| FileUtilError::InvalidOperation(flag.to_string_lossy().into_owned()))?
        .parse()
}

/// Prints run side effects the way the command line reports them: results
/// on stdout, per-match failures on stderr.
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn on_found(&mut self, path: &Path) {
        println!("{}", path.display());
    }

    fn on_transferred(&mut self, operation: Operation, _destination: &Path) {
        println!("Search Successful");
        println!("File {} to the storageDir", operation.past_tense());
    }

    fn on_storage_invalid(&mut self, _storage: &Path) {
        println!("Search Successful: Invalid storageDir");
    }

    fn on_entry_error(&mut self, error: &FileUtilError) {
        eprintln!("{}", render_error(error));
    }
}

/// One-line message with the error's source chain.
pub fn render_error(error: &dyn std::error::Error) -> String {
    let mut msg = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
