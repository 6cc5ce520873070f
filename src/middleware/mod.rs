use crate::exception::HandlerError;
use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub mod layer;
pub mod logging;

pub use layer::MiddlewareLayer;
pub use logging::LoggingMiddleware;

pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Standard return type for middleware
pub type MiddlewareResult = Result<Response, HandlerError>;

/// Represents the rest of the chain: later middleware, then the handler
pub struct Next {
    run: Box<dyn FnOnce(Request<Body>) -> BoxFuture<MiddlewareResult> + Send>,
}

impl Next {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request<Body>) -> BoxFuture<MiddlewareResult> + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Pass the request on
    pub async fn run(self, request: Request<Body>) -> MiddlewareResult {
        (self.run)(request).await
    }
}

/// Request middleware, run in registration order before the handler.
///
/// Middleware can inspect or modify the request, answer it without calling
/// `next` (short-circuit), or post-process the response. Returning an error
/// sends an error envelope; a [`ControllerError`](crate::ControllerError)
/// keeps its status code.
///
/// # Example
/// ```
/// use trellis::middleware::{Middleware, MiddlewareResult, Next};
/// use trellis::{ControllerError, async_trait};
/// use axum::{body::Body, http::Request};
///
/// struct RequireApiKey;
///
/// #[async_trait]
/// impl Middleware for RequireApiKey {
///     async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult {
///         if request.headers().contains_key("x-api-key") {
///             next.run(request).await
///         } else {
///             Err(ControllerError::unauthorized().into())
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult;
}

/// Middleware built from an async closure, see [`from_fn`].
pub struct FnMiddleware<F> {
    f: F,
}

/// Build middleware from an async function or closure.
///
/// ```
/// use trellis::middleware::{self, Next};
/// use trellis::HandlerError;
/// use axum::{body::Body, http::{HeaderValue, Request}};
///
/// let tag = middleware::from_fn(|request: Request<Body>, next: Next| async move {
///     let mut response = next.run(request).await?;
///     response
///         .headers_mut()
///         .insert("x-served-by", HeaderValue::from_static("trellis"));
///     Ok::<_, HandlerError>(response)
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> FnMiddleware<F>
where
    F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MiddlewareResult> + Send + 'static,
{
    FnMiddleware { f }
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MiddlewareResult> + Send + 'static,
{
    async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult {
        (self.f)(request, next).await
    }
}

/// Wrap `terminal` in `middleware`, the first element running outermost.
pub(crate) fn chain(middleware: &[Arc<dyn Middleware>], terminal: Next) -> Next {
    let mut next = terminal;
    for current in middleware.iter().rev() {
        let current = Arc::clone(current);
        let rest = next;
        next = Next::new(move |request| {
            Box::pin(async move { current.handle(request, rest).await })
        });
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::ControllerError;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::sync::Mutex;

    fn recorder(log: Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Arc<dyn Middleware> {
        Arc::new(from_fn(move |request, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name);
                next.run(request).await
            }
        }))
    }

    fn terminal(log: Arc<Mutex<Vec<&'static str>>>) -> Next {
        Next::new(move |_request| {
            Box::pin(async move {
                log.lock().unwrap().push("handler");
                Ok::<_, HandlerError>(StatusCode::NO_CONTENT.into_response())
            })
        })
    }

    #[tokio::test]
    async fn test_chain_runs_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let middleware = vec![
            recorder(Arc::clone(&log), "first"),
            recorder(Arc::clone(&log), "second"),
        ];

        let response = chain(&middleware, terminal(Arc::clone(&log)))
            .run(Request::new(Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "handler"]);
    }

    #[tokio::test]
    async fn test_chain_short_circuits_on_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let deny: Arc<dyn Middleware> = Arc::new(from_fn(|_request, _next: Next| async {
            Err::<axum::response::Response, HandlerError>(ControllerError::forbidden().into())
        }));

        let result = chain(&[deny], terminal(Arc::clone(&log)))
            .run(Request::new(Body::empty()))
            .await;

        let error = result.unwrap_err();
        assert_eq!(error.controller_error().map(|e| e.code), Some(403));
        assert!(log.lock().unwrap().is_empty());
    }
}
