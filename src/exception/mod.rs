use crate::common::ControllerResponse;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub mod http;

pub use http::HttpExceptionFilter;

/// An error a controller raises on purpose, carrying the status to send.
///
/// Return it through [`HandlerError`] (`Err(ControllerError::not_found().into())`
/// or `?`) and the client receives an error envelope with this code and
/// message instead of a generic 500.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ControllerError {
    pub message: String,
    pub code: u16,
    pub errors: Option<Value>,
}

impl ControllerError {
    pub fn new(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code,
            errors: None,
        }
    }

    pub fn with_errors(mut self, errors: Value) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn bad_request() -> Self {
        Self::new("Bad Request", 400)
    }

    pub fn unauthorized() -> Self {
        Self::new("Unauthorized", 401)
    }

    pub fn forbidden() -> Self {
        Self::new("Forbidden", 403)
    }

    pub fn not_found() -> Self {
        Self::new("Not Found", 404)
    }

    pub fn payload_too_large() -> Self {
        Self::new("Payload Too Large", 413)
    }

    /// Generic client error.
    pub fn error() -> Self {
        Self::new("Something went wrong", 400)
    }

    /// The envelope sent for this error. Codes outside `[400, 600)` are sent as 400.
    pub fn to_envelope(&self) -> ControllerResponse {
        ControllerResponse::error_with(self.errors.clone(), self.code, self.message.clone())
    }
}

/// Anything a handler can fail with.
///
/// Every error type converts into it, so handlers can use `?` freely.
/// A wrapped [`ControllerError`] keeps its status; everything else is
/// reported as a 500 by the [`ExceptionFilter`].
pub struct HandlerError(anyhow::Error);

impl HandlerError {
    pub fn into_inner(self) -> anyhow::Error {
        self.0
    }

    pub fn controller_error(&self) -> Option<&ControllerError> {
        self.0.downcast_ref::<ControllerError>()
    }
}

impl<E> From<E> for HandlerError
where
    E: Into<anyhow::Error>,
{
    fn from(error: E) -> Self {
        Self(error.into())
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Turns errors that escape a handler or middleware into envelopes.
pub trait ExceptionFilter: Send + Sync + 'static {
    fn catch(&self, error: HandlerError) -> ControllerResponse;
}
