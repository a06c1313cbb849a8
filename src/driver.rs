//! Reads source files and runs the parser and checker over them.

use crate::language::{
    clauses::ClauseRegistry,
    errors::SyntaxError,
    parser::parse_unit,
    typecheck::{check_unit, CheckError, CheckOptions, TypeError},
};
use log::info;
use std::{
    fs, io,
    path::{Path, PathBuf},
    thread,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("internal error while checking {}: {source}", .path.display())]
    Check {
        path: PathBuf,
        #[source]
        source: CheckError,
    },
}

/// Diagnostics for one file.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub source: String,
    pub syntax: Vec<SyntaxError>,
    pub semantic: Vec<TypeError>,
    /// Diagnostics dropped because of `max_errors`.
    pub suppressed: usize,
}

impl FileReport {
    pub fn error_count(&self) -> usize {
        self.syntax.len() + self.semantic.len() + self.suppressed
    }

    pub fn is_clean(&self) -> bool {
        self.error_count() == 0
    }
}

/// Parses and checks `source`. The checker runs even when parsing reported
/// errors, over whatever the parser recovered.
pub fn check_source(
    registry: &ClauseRegistry,
    path: impl Into<PathBuf>,
    source: String,
    options: &CheckOptions,
) -> Result<FileReport, CheckError> {
    let path = path.into();
    let parsed = parse_unit(registry, &source);
    let mut syntax = parsed.errors;
    let mut semantic = check_unit(registry, &parsed.unit, options.clone())?;

    let mut suppressed = 0;
    if let Some(max) = options.max_errors {
        let total = syntax.len() + semantic.len();
        syntax.truncate(max);
        semantic.truncate(max - syntax.len());
        suppressed = total - syntax.len() - semantic.len();
    }

    info!(
        "{}: {} syntax error(s), {} semantic error(s)",
        path.display(),
        syntax.len(),
        semantic.len()
    );
    Ok(FileReport {
        path,
        source,
        syntax,
        semantic,
        suppressed,
    })
}

pub fn check_file(
    registry: &ClauseRegistry,
    path: &Path,
    options: &CheckOptions,
) -> Result<FileReport, DriverError> {
    let source = fs::read_to_string(path).map_err(|source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    check_source(registry, path, source, options).map_err(|source| DriverError::Check {
        path: path.to_path_buf(),
        source,
    })
}

/// Checks each file on its own thread, all sharing `registry`.
///
/// Results come back in the order of `paths`.
pub fn check_files(
    registry: &ClauseRegistry,
    paths: &[PathBuf],
    options: &CheckOptions,
) -> Vec<Result<FileReport, DriverError>> {
    info!("checking {} file(s)", paths.len());
    thread::scope(|scope| {
        let handles: Vec<_> = paths
            .iter()
            .map(|path| scope.spawn(move || check_file(registry, path, options)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    })
}
