use crate::common::ResponseOptions;
use crate::exception::{ExceptionFilter, HandlerError};
use crate::middleware::{Middleware, Next, chain};
use axum::{body::Body, http::Request, response::Response};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower layer running app-wide middleware in front of every route
#[derive(Clone)]
pub struct MiddlewareLayer {
    middleware: Arc<Vec<Arc<dyn Middleware>>>,
    filter: Arc<dyn ExceptionFilter>,
    options: ResponseOptions,
}

impl MiddlewareLayer {
    pub fn new(
        middleware: Vec<Arc<dyn Middleware>>,
        filter: Arc<dyn ExceptionFilter>,
        options: ResponseOptions,
    ) -> Self {
        Self {
            middleware: Arc::new(middleware),
            filter,
            options,
        }
    }
}

impl<S> Layer<S> for MiddlewareLayer {
    type Service = MiddlewareService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MiddlewareService {
            inner,
            middleware: Arc::clone(&self.middleware),
            filter: Arc::clone(&self.filter),
            options: self.options,
        }
    }
}

#[derive(Clone)]
pub struct MiddlewareService<S> {
    inner: S,
    middleware: Arc<Vec<Arc<dyn Middleware>>>,
    filter: Arc<dyn ExceptionFilter>,
    options: ResponseOptions,
}

impl<S> Service<Request<Body>> for MiddlewareService<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let middleware = Arc::clone(&self.middleware);
        let filter = Arc::clone(&self.filter);
        let options = self.options;
        // The clone may not be ready; take the ready one and leave the clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let terminal = Next::new(move |request| {
                Box::pin(async move {
                    match inner.call(request).await {
                        Ok(response) => Ok::<_, HandlerError>(response),
                        Err(never) => match never {},
                    }
                })
            });

            match chain(&middleware, terminal).run(request).await {
                Ok(response) => Ok(response),
                Err(error) => Ok(filter.catch(error).into_response_with(options)),
            }
        })
    }
}
