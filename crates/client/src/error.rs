//! Error taxonomy for People API calls.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by [`PeopleClient`](crate::PeopleClient) and the resource wrappers.
///
/// Nothing is retried locally: every failure reaches the caller as one of
/// these variants.
#[derive(Debug, Error)]
pub enum ClientError {
    /// An authenticated operation was invoked with no credentials configured
    #[error("Not authenticated: no credentials configured")]
    NotAuthenticated,

    /// Server rejected the credentials (401/403)
    #[error("Authentication failed (HTTP {status}): {body}")]
    Auth { status: u16, body: String },

    /// Bad parameters, rejected either locally against the schema or by the server (400/422)
    #[error("{0}")]
    Validation(String),

    /// Any other non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection, timeout, or body read failure
    #[error("Network error: {0}")]
    Network(String),

    /// Response or schema document could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// The requested link does not exist in the schema
    #[error("Schema error: {0}")]
    Schema(String),

    /// Base URL or link URL is malformed
    #[error("Invalid URL: {0}")]
    Url(String),

    /// HTTP client setup failure
    #[error("Config error: {0}")]
    Config(String),

    /// `queries.get` failed; every cause collapses into this one kind
    #[error("No queries present.")]
    NoQueries(#[source] Box<ClientError>),
}

impl ClientError {
    /// True for both missing local credentials and server-side auth rejection.
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::NotAuthenticated | ClientError::Auth { .. })
    }

    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Auth { status, .. } | ClientError::Http { status, .. } => Some(*status),
            ClientError::NoQueries(cause) => cause.status(),
            _ => None,
        }
    }
}
