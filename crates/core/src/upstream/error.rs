//! Error types for upstream access.

use thiserror::Error;

/// Errors returned by upstream calls.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection level failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Response body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Wrapper adding context to an inner error.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<UpstreamError>,
    },
}

impl UpstreamError {
    /// Wrap this error with a context message.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with every context wrapper removed.
    pub fn root_cause(&self) -> &UpstreamError {
        let mut current = self;
        while let Self::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// HTTP status of the root cause, if any.
    pub fn status(&self) -> Option<u16> {
        match self.root_cause() {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the root cause is a 401 or 403 response.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Http {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            Self::Transport(e.to_string())
        }
    }
}
