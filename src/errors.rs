use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures of a MELs schedule run. Each variant names the stage that failed
/// and the path or room involved.
#[derive(Debug, Error)]
pub enum MelsError {
    #[error("Locating occupancy schedule failed: no file found (probed: {})", display_paths(.probed))]
    SourceNotFound { probed: Vec<PathBuf> },
    #[error("Parsing occupancy schedule {} failed: {reason}", .path.display())]
    MalformedSource { path: PathBuf, reason: String },
    #[error("Synthesizing schedule for room '{room}' failed: expected {expected} rows but found {found}")]
    InconsistentSeriesLength {
        room: String,
        expected: usize,
        found: usize,
    },
    #[error("Removing old electric equipment from room '{room}' failed: {source}")]
    HostRemoval {
        room: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Attaching new electric equipment to room '{room}' failed: {source}")]
    HostAttachment {
        room: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Writing equipment schedule to '{location}' failed: {source}")]
    Output {
        location: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Writing equipment schedule failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid configuration: {0}")]
    Config(anyhow::Error),
}

impl MelsError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedSource {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "none".to_string();
    }
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
