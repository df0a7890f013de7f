//! Unified client error model.
//! Every fallible operation in the session store, API client and router surfaces one of these
//! variants, so front-ends only have to match on a single type.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Credentials were rejected (or the login/registration response was unusable).
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// The server refused the current token; the session has already been cleared.
    #[error("session expired, please log in again")]
    AuthExpired,

    /// Any other non-2xx answer from the backend.
    #[error("server rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    /// No response could be obtained (connect failure, timeout, broken body stream).
    #[error("network error: {message}")]
    Network { message: String },

    /// A 2xx body that does not have the shape the caller expected.
    #[error("unexpected response: {message}")]
    Decode { message: String },

    /// Rejected before anything was sent (blank input, unbuildable URL).
    #[error("invalid request: {message}")]
    Invalid { message: String },
}

impl ClientError {
    pub fn auth<S: Into<String>>(msg: S) -> Self { ClientError::Auth { message: msg.into() } }
    pub fn api<S: Into<String>>(status: u16, msg: S) -> Self { ClientError::Api { status, message: msg.into() } }
    pub fn network<S: Into<String>>(msg: S) -> Self { ClientError::Network { message: msg.into() } }
    pub fn decode<S: Into<String>>(msg: S) -> Self { ClientError::Decode { message: msg.into() } }
    pub fn invalid<S: Into<String>>(msg: S) -> Self { ClientError::Invalid { message: msg.into() } }

    pub fn code_str(&self) -> &'static str {
        match self {
            ClientError::Auth { .. } => "auth_error",
            ClientError::AuthExpired => "auth_expired",
            ClientError::Api { .. } => "api_error",
            ClientError::Network { .. } => "network_error",
            ClientError::Decode { .. } => "decode_error",
            ClientError::Invalid { .. } => "invalid_request",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ClientError::Auth { message }
            | ClientError::Api { message, .. }
            | ClientError::Network { message }
            | ClientError::Decode { message }
            | ClientError::Invalid { message } => message.as_str(),
            ClientError::AuthExpired => "session expired",
        }
    }

    /// HTTP status that produced this error, when there was a response at all.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::AuthExpired => Some(401),
            _ => None,
        }
    }

    /// True when the caller must route back to the login view instead of retrying.
    pub fn forces_logout(&self) -> bool { matches!(self, ClientError::AuthExpired) }
}

pub type ClientResult<T> = Result<T, ClientError>;
