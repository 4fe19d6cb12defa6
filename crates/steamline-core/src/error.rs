//! Transport-level error type shared by every HTTP caller

/// Failure to complete an HTTP exchange.
///
/// A response that arrived, whatever its status code, is never a
/// `TransportError`; interpreting statuses is left to the caller.
#[derive(Debug)]
pub enum TransportError {
    /// Connect, TLS, timeout or body read failure
    Network { message: String },
    /// Request could not be built (malformed URL, invalid header)
    Request { message: String },
    /// Local I/O failure while setting up the transport
    Io(std::io::Error),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network { message } => write!(f, "network error: {message}"),
            Self::Request { message } => write!(f, "invalid request: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl TransportError {
    /// Classify a reqwest error. Builder errors are our fault; everything
    /// else happened on the wire.
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_builder() {
            Self::Request {
                message: e.to_string(),
            }
        } else {
            Self::Network {
                message: e.to_string(),
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}
