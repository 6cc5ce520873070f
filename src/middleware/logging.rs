use crate::middleware::{Middleware, MiddlewareResult, Next};
use async_trait::async_trait;
use axum::{body::Body, http::Request};
use std::time::Instant;

/// Middleware that logs request timing and status
#[derive(Clone, Default)]
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult {
        let method = request.method().clone();
        let uri = request.uri().clone();
        let start = Instant::now();

        tracing::debug!("--> {} {}", method, uri);

        match next.run(request).await {
            Ok(response) => {
                tracing::info!(
                    "<-- {} {} {} {:?}",
                    method,
                    uri,
                    response.status(),
                    start.elapsed()
                );
                Ok(response)
            }
            Err(e) => {
                tracing::warn!("<-- {} {} ERROR: {} {:?}", method, uri, e, start.elapsed());
                Err(e)
            }
        }
    }
}
