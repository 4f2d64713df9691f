//! Error handling for tubeline.
//!
//! Every failure aborts the current call immediately and is classified by an
//! [`ErrorKind`], so that callers can tell a change in the platform's page
//! format apart from misuse of the API:
//!
//! * [`ErrorKind::Validation`] - a caller-supplied option violates a constraint
//! * [`ErrorKind::Extraction`] - a required marker is absent from fetched text
//! * [`ErrorKind::Structural`] - an expected field path is absent from a document
//! * [`ErrorKind::Network`] - a fetch returned a non-success status
//! * [`ErrorKind::Platform`] - the platform itself reported a failure
//! * [`ErrorKind::Evaluation`] - a compiled transform failed to run
//! * [`ErrorKind::Cancelled`] - the client's cancellation token fired
//! * [`ErrorKind::Internal`] - anything that should not happen
//!
//! No error is ever retried. The only non-error short-circuit in the crate is
//! the item-limit truncation of a listing.
//!
//! # Example
//!
//! ```rust
//! use tubeline::error::{Error, ErrorKind, Result};
//!
//! fn api_key(html: &str) -> Result<&str> {
//!     tubeline::util::extract(html, r#""INNERTUBE_API_KEY":""#, r#"""#)
//!         .ok_or_else(|| Error::extraction("`INNERTUBE_API_KEY` not found"))
//! }
//! ```

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type combining error kind and details.
#[derive(Debug)]
pub struct Error {
    /// Classification of the error
    pub kind: ErrorKind,

    /// HTTP status of the failed fetch, for [`ErrorKind::Network`] errors
    pub status: Option<StatusCode>,

    /// Details of the underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

/// Standard result type for tubeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories.
#[expect(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
pub enum ErrorKind {
    /// A caller-supplied option violates a documented constraint.
    #[error("invalid argument")]
    Validation,

    /// A required marker is absent from fetched text: player URL, API key,
    /// initial data, descrambling routine or its helper object, or any part
    /// of the `n` parameter routine.
    #[error("extraction failed")]
    Extraction,

    /// An expected field path is absent from a parsed document.
    #[error("unexpected document structure")]
    Structural,

    /// A fetch returned a non-success status or did not complete.
    #[error("network error")]
    Network,

    /// The platform reported a failure, e.g. an inline error banner.
    #[error("platform error")]
    Platform,

    /// A compiled transform threw, ran out of budget or returned garbage.
    #[error("transform evaluation failed")]
    Evaluation,

    /// The operation was cancelled through the client's cancellation token.
    #[error("operation was cancelled")]
    Cancelled,

    /// Unexpected internal error.
    #[error("internal error")]
    Internal,
}

impl Error {
    /// Creates a new error with specified kind and details.
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            status: None,
            error: error.into(),
        }
    }

    /// Creates an error for an option that violates a documented constraint.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let err = Error::validation("`maxPages` must be larger than or equal to 1");
    /// assert_eq!(err.kind, ErrorKind::Validation);
    /// ```
    pub fn validation<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Validation, error)
    }

    /// Creates an error for a marker that could not be found in fetched text.
    pub fn extraction<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Extraction, error)
    }

    /// Creates an error for a field path that is absent from a document.
    pub fn structural<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Structural, error)
    }

    /// Creates an error for a fetch that returned a non-success status.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let err = Error::network(StatusCode::BAD_REQUEST, "continuation failed (400)");
    /// assert_eq!(err.status, Some(StatusCode::BAD_REQUEST));
    /// ```
    pub fn network<E>(status: StatusCode, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::Network,
            status: Some(status),
            error: error.into(),
        }
    }

    /// Creates an error for a failure that the platform reported itself.
    pub fn platform<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Platform, error)
    }

    /// Creates an error for a transform that could not be evaluated.
    pub fn evaluation<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Evaluation, error)
    }

    /// Creates an error for a cancelled operation.
    pub fn cancelled<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Cancelled, error)
    }

    /// Creates an error for unexpected internal failures.
    pub fn internal<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Internal, error)
    }

    /// Attempts to downcast the underlying error to a concrete type.
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }
}

/// Returns the underlying error source.
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

/// Formats the error for display, showing both kind and details.
///
/// Format: "{kind}: {details}"
///
/// # Examples
///
/// ```rust
/// let err = Error::structural("continuation items not found");
/// assert_eq!(err.to_string(), "unexpected document structure: continuation items not found");
/// ```
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: ", self.kind)?;
        self.error.fmt(fmt)
    }
}

/// Converts HTTP client errors into network errors.
///
/// The status code is carried along when the client knows it; builder errors
/// are internal because they stem from our own request construction.
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            return Self::internal(err);
        }

        let status = err.status();
        let mut error = Self::new(ErrorKind::Network, err);
        error.status = status;
        error
    }
}

/// Converts JSON errors to `Structural`: the document is not shaped as expected.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::structural(err)
    }
}

/// Converts URL parsing errors to `Internal`.
impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::internal(e.to_string())
    }
}

/// Converts sandbox errors to `Evaluation`.
impl From<rquickjs::Error> for Error {
    fn from(e: rquickjs::Error) -> Self {
        Self::evaluation(e.to_string())
    }
}

/// Converts configuration file errors to `Validation`.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::validation(err)
    }
}

/// Converts configuration syntax errors to `Validation`.
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::validation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shows_kind_and_details() {
        let err = Error::structural("continuation items not found");
        assert_eq!(
            err.to_string(),
            "unexpected document structure: continuation items not found"
        );
    }

    #[test]
    fn network_errors_carry_status() {
        let err = Error::network(StatusCode::BAD_REQUEST, "continuation failed (400)");
        assert_eq!(err.kind, ErrorKind::Network);
        assert_eq!(err.status, Some(StatusCode::BAD_REQUEST));
        assert!(err.to_string().ends_with("continuation failed (400)"));
    }

    #[test]
    fn json_errors_are_structural() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_eq!(err.kind, ErrorKind::Structural);
    }
}
