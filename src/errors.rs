// Error types for the filemail client library
//
// The binary wraps these in `anyhow` for display; library callers can
// match on the variants directly.

use std::path::PathBuf;

use thiserror::Error;

/// Error code used locally when logout is attempted with unfinished transfers.
pub const TRANSFER_INCOMPLETE_CODE: i64 = 4003;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Non valid config key, \"{key}\" passed")]
    InvalidKey { key: String },

    #[error("Required key, \"{key}\" can't be empty")]
    RequiredKey { key: String },

    #[error("Please login to use {operation}")]
    AuthRequired { operation: &'static str },

    #[error("Remote error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Config file {path:?} could not be accessed")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file {path:?} could not be parsed: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("Value of \"{key}\" can't be stored in the config file: {reason}")]
    UnstorableValue { key: String, reason: &'static str },

    #[error("No location available for the config file")]
    NoConfigLocation,

    #[error("Malformed response to {operation}: {reason}")]
    MalformedResponse {
        operation: &'static str,
        reason: String,
    },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Check if this error is a client-side lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this error came from the login guard.
    pub fn is_auth_required(&self) -> bool {
        matches!(self, Error::AuthRequired { .. })
    }

    /// Check if this error is a config schema violation.
    pub fn is_schema(&self) -> bool {
        matches!(self, Error::InvalidKey { .. } | Error::RequiredKey { .. })
    }

    /// Check if this error is a value the ini file can't hold.
    pub fn is_unstorable(&self) -> bool {
        matches!(self, Error::UnstorableValue { .. })
    }

    /// Machine readable code of a remote error, if this is one.
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            Error::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
