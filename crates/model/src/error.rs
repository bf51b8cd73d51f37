use std::fmt::{self, Display};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request never reached the server, or the connection broke
    /// while receiving the response.
    Transport,
    /// The server answered with a non-success HTTP status.
    Http(u16),
    /// The server answered, but the payload could not be understood.
    InvalidResponse,
    /// Any other errors.
    Other,
}

impl ErrorKind {
    /// Returns `true` if retrying the same request may succeed.
    #[inline]
    pub fn is_transient(&self) -> bool {
        match self {
            ErrorKind::Transport => true,
            ErrorKind::Http(status) => *status == 429 || *status >= 500,
            ErrorKind::InvalidResponse | ErrorKind::Other => false,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "Transport error"),
            ErrorKind::Http(status) => write!(f, "HTTP {status}"),
            ErrorKind::InvalidResponse => write!(f, "Invalid response"),
            ErrorKind::Other => write!(f, "Other error"),
        }
    }
}
