use std::fmt;

use cooking_core::TaskKey;

/// Body of a cook request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookRequest {
    pub key: TaskKey,
    pub email: Option<String>,
}

impl CookRequest {
    pub fn new(key: TaskKey, email: Option<String>) -> Self {
        Self { key, email }
    }
}

/// Outcome of probing a download link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Alive,
    /// The server answered, but not with the bundle.
    Dead { status: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultError {
    pub kind: FailureKind,
    pub message: String,
}

impl VaultError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for VaultError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    /// A credential or header value in the settings cannot be sent.
    InvalidSettings,
    HttpStatus(u16),
    Timeout,
    Network,
    /// The response body was not a status document.
    Decode,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::InvalidSettings => write!(f, "invalid client settings"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::Io => write!(f, "io error"),
        }
    }
}
