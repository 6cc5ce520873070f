use crate::common::ControllerResponse;
use crate::exception::{ControllerError, ExceptionFilter, HandlerError};
use std::any::Any;

const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

/// The default exception filter.
///
/// A [`ControllerError`] becomes its own envelope. Anything else is logged
/// and sent as a 500 carrying the error's message.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpExceptionFilter;

impl ExceptionFilter for HttpExceptionFilter {
    fn catch(&self, error: HandlerError) -> ControllerResponse {
        match error.into_inner().downcast::<ControllerError>() {
            Ok(controller_error) => controller_error.to_envelope(),
            Err(other) => {
                tracing::error!(error = ?other, "unhandled error while processing request");
                let message = other.to_string();
                let message = if message.trim().is_empty() {
                    INTERNAL_SERVER_ERROR.to_string()
                } else {
                    message
                };
                ControllerResponse::error_with(None, 500, message)
            }
        }
    }
}

/// Recover the message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        INTERNAL_SERVER_ERROR.to_string()
    }
}
