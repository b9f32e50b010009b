//! Backend failure values
//!
//! A [`BackendError`] is what an operation handed to the retry executor fails
//! with. It is inspected by the classifier and never edited once raised.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Category tag of a backend failure.
///
/// Tags are compared by value, so a [`ErrorKind::Custom`] tag registered as
/// retryable matches every error carrying the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request timed out (socket or client timeout).
    Timeout,
    /// The HTTP client failed to connect or the connection was reset.
    Connection,
    /// The response body ended before the advertised length.
    IncompleteRead,
    /// The response could not be parsed.
    ResponseParse,
    /// The response payload was corrupted in transit.
    Payload,
    /// The backend answered with a structured error (code, message, status).
    Service,
    /// The operation was cancelled by its caller.
    Cancelled,
    /// Application-defined tag.
    Custom(Cow<'static, str>),
}

impl ErrorKind {
    /// Tag derived from a Rust type, the stand-in for runtime type identity.
    pub fn of<T: ?Sized>() -> Self {
        ErrorKind::Custom(Cow::Borrowed(std::any::type_name::<T>()))
    }

    /// Tag with an arbitrary name.
    pub fn custom(name: impl Into<Cow<'static, str>>) -> Self {
        ErrorKind::Custom(name.into())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Connection => write!(f, "connection error"),
            ErrorKind::IncompleteRead => write!(f, "incomplete read"),
            ErrorKind::ResponseParse => write!(f, "response parse error"),
            ErrorKind::Payload => write!(f, "payload error"),
            ErrorKind::Service => write!(f, "service error"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// An opaque failure raised by a backend call.
#[derive(Debug, Clone)]
pub struct BackendError {
    kind: ErrorKind,
    code: Option<String>,
    message: Option<String>,
    status: Option<u16>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl BackendError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            code: None,
            message: None,
            status: None,
            source: None,
        }
    }

    /// A structured service error with the given backend code.
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Service)
            .with_code(code)
            .with_message(message)
    }

    /// Wrap any error, tagging it with [`ErrorKind::of`] its type.
    pub fn wrap<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let message = err.to_string();
        Self::new(ErrorKind::of::<E>())
            .with_message(message)
            .with_source(err)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Backend-assigned error code, if the failure carried one
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// HTTP status of the response that carried the failure
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }

    /// Borrow the wrapped source as a concrete type.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_deref()?.downcast_ref::<E>()
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(code) = &self.code {
            write!(f, " ({code})")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
