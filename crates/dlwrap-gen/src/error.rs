use std::path::PathBuf;

use thiserror::Error;

use crate::parse::SkippedLine;

#[derive(Error, Debug)]
pub enum GenError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{count} declaration line(s) skipped, first at line {}: {} ({})", first.line_no, first.text, first.reason)]
    SkippedLines { count: usize, first: SkippedLine },
}

pub type Result<T> = std::result::Result<T, GenError>;
