//! Error types for the tail responder.

use crate::response::StreamOutcome;
use thiserror::Error;

/// Every failure that can happen before the response is committed.
#[derive(Error, Debug)]
pub enum Error {
    /// The CGI environment does not describe a usable request.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// The request path is not a single, safe file name.
    #[error("invalid request: {path:?}")]
    InvalidPath { path: String },

    /// The requested file does not exist.
    #[error("file not found")]
    FileNotFound { path: String },

    /// The file exists but could not be opened for reading.
    #[error("failed to open file: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The name resolves to something that cannot be tailed, such as a directory.
    #[error("not a regular file: {path:?}")]
    NotAFile { path: String },

    /// File watching errors from the notify crate.
    #[error("error creating watcher: {0}")]
    Watcher(#[from] notify::Error),

    /// The binary was started with command line arguments.
    #[error("unexpected arguments")]
    UnexpectedArguments,
}

impl Error {
    /// The requested file name, for errors tied to one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::InvalidPath { path }
            | Error::FileNotFound { path }
            | Error::Open { path, .. }
            | Error::NotAFile { path } => Some(path.as_str()),
            Error::InvalidRequest { .. } | Error::Watcher(_) | Error::UnexpectedArguments => None,
        }
    }

    /// The response outcome this error is reported as.
    pub fn outcome(&self) -> StreamOutcome {
        match self {
            Error::InvalidRequest { .. }
            | Error::InvalidPath { .. }
            | Error::Open { .. }
            | Error::NotAFile { .. } => StreamOutcome::BadRequest(self.to_string()),
            Error::FileNotFound { .. } => StreamOutcome::NotFound,
            Error::Watcher(_) | Error::UnexpectedArguments => {
                StreamOutcome::InternalError(self.to_string())
            }
        }
    }
}

/// A convenient Result type for tail operations.
pub type Result<T> = std::result::Result<T, Error>;
