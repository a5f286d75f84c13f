//! Normalisation of Akenza API failures into user-facing messages.
use serde::Deserialize;
use thiserror::Error;

/// Message shown for any request rejected with HTTP 401.
pub const UNAUTHORIZED_MESSAGE: &str = "401 Unauthorized - Specified API Key is invalid";

/// Message shown when a failure could not be attributed to a structured API error.
pub const UNKNOWN_ERROR_MESSAGE: &str =
    "An unknown error occurred, please contact Akenza Support: support@akenza.io";

/// The error document returned by the Akenza API alongside non-2xx responses.
///
/// Every field is optional; only `message` is used when building user-facing errors.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Short error name, e.g. `Bad Request`.
    pub error: Option<String>,
    /// Akenza's identifier for the error class.
    pub error_id: Option<String>,
    /// Human readable explanation of the failure.
    pub message: Option<String>,
    /// Request path that failed.
    pub path: Option<String>,
    /// Request identifier, useful for support requests.
    pub request_id: Option<String>,
    /// HTTP status as reported in the body.
    pub status: Option<u16>,
    /// Time the error occurred.
    pub timestamp: Option<String>,
    /// Trace identifier.
    pub trace_id: Option<String>,
}

/// Errors returned by the Akenza client.
///
/// The `Display` implementation of each variant is the message shown to users,
/// so it never contains transport internals.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The API key was rejected.
    #[error("{}", UNAUTHORIZED_MESSAGE)]
    Unauthorized,
    /// The API answered with a structured error.
    #[error("{status} {status_text}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// HTTP reason phrase.
        status_text: String,
        /// `message` from the error body.
        message: String,
    },
    /// Any other failure: transport errors, unexpected bodies, unstructured HTTP errors.
    #[error("{}", UNKNOWN_ERROR_MESSAGE)]
    Unknown {
        /// Diagnostic detail; logged but not shown to users.
        detail: String,
    },
}

impl Error {
    /// Classify a non-2xx response.
    ///
    /// A 401 always maps to [`Error::Unauthorized`], regardless of the body.
    /// Otherwise a non-empty status text together with a non-empty body message
    /// produces [`Error::Api`]; anything else is [`Error::Unknown`].
    pub fn from_response(status: u16, status_text: &str, body: Option<&ErrorBody>) -> Self {
        if status == 401 {
            return Self::Unauthorized;
        }
        let message = body
            .and_then(|b| b.message.as_deref())
            .filter(|m| !m.is_empty());
        match message {
            Some(message) if !status_text.is_empty() => Self::Api {
                status,
                status_text: status_text.to_string(),
                message: message.to_string(),
            },
            _ => Self::Unknown {
                detail: format!("unexpected response status {status} {status_text}"),
            },
        }
    }

    pub(crate) fn unknown(detail: impl Into<String>) -> Self {
        Self::Unknown {
            detail: detail.into(),
        }
    }

    /// The HTTP status associated with this error, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Api { status, .. } => Some(*status),
            Self::Unknown { .. } => None,
        }
    }
}

/// The user-facing message for a failed response.
pub fn error_message(status: u16, status_text: &str, body: Option<&ErrorBody>) -> String {
    Error::from_response(status, status_text, body).to_string()
}
