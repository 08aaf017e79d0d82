//! Requests understood by the admin endpoint.

use std::str::FromStr;

use thiserror::Error;

/// A parsed admin request line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminRequest {
    /// Shut the server down gracefully.
    Stop,
}

/// Errors produced while parsing an admin request line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdminRequestError {
    /// The line named no known request.
    #[error("unknown request {0:?}")]
    Unknown(String),
}

impl FromStr for AdminRequest {
    type Err = AdminRequestError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let verb = line.trim();
        if verb.eq_ignore_ascii_case("stop") {
            Ok(Self::Stop)
        } else {
            Err(AdminRequestError::Unknown(verb.to_owned()))
        }
    }
}
