use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MultipartError {
    #[error("invalid boundary: {reason}")]
    InvalidBoundary { reason: String },

    #[error("can't open file part {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("file part {path:?} is not a regular file")]
    NotAFile { path: PathBuf },

    #[error("can't map file part {path:?} at offset {offset}: {source}")]
    Map {
        path: PathBuf,
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("body iterator is exhausted")]
    ExhaustedIterator,
}

impl MultipartError {
    pub fn invalid_boundary<S: ToString>(str: S) -> Self {
        Self::InvalidBoundary { reason: str.to_string() }
    }

    pub fn open<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Self::Open { path: path.into(), source }
    }

    pub fn not_a_file<P: Into<PathBuf>>(path: P) -> Self {
        Self::NotAFile { path: path.into() }
    }

    pub fn map<P: Into<PathBuf>>(path: P, offset: u64, source: io::Error) -> Self {
        Self::Map { path: path.into(), offset, source }
    }

    /// The underlying io error kind, if this error came from the file system.
    ///
    /// Lets callers tell `NotFound` from `PermissionDenied` without matching on variants.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Open { source, .. } | Self::Map { source, .. } => Some(source.kind()),
            Self::InvalidBoundary { .. } | Self::NotAFile { .. } | Self::ExhaustedIterator => None,
        }
    }
}
