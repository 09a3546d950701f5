//! Error types for the profile smoke test client.

use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;

/// Failure of a single call against the frontend API.
///
/// Only `Transport` is treated as a fault of the run itself. Every other variant
/// describes a response the scenario can report on and then abandon.
#[derive(Debug)]
pub enum Error {
    /// Connection refused, DNS failure or any other fault below HTTP.
    Transport(reqwest::Error),

    /// The server answered with something other than 200 OK.
    /// `details` holds the body parsed as JSON when that parse succeeded.
    Status {
        operation: &'static str,
        status: StatusCode,
        body: String,
        details: Option<Value>,
    },

    /// Login succeeded but no `access-token` cookie came back.
    MissingToken,

    /// A body that should have been JSON could not be parsed.
    Decode {
        operation: &'static str,
        message: String,
    },

    /// Email or password was empty, or could not be parsed.
    InvalidCredentials(String),
}

impl Error {
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(err) => write!(f, "Transport error: {}", err),
            Error::Status {
                operation,
                status,
                body,
                ..
            } => write!(f, "{} failed: {} - Response: {}", operation, status, body),
            Error::MissingToken => write!(f, "No access-token cookie in login response"),
            Error::Decode { operation, message } => {
                write!(f, "{} returned an unreadable body: {}", operation, message)
            }
            Error::InvalidCredentials(msg) => write!(f, "Invalid credentials: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err)
    }
}
