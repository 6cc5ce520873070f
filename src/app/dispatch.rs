use crate::common::ResponseOptions;
use crate::context::{ParamNames, RequestContext};
use crate::exception::{ExceptionFilter, HandlerError};
use crate::middleware::{Middleware, Next, chain};
use crate::registry::RouteConfig;
use axum::{body::Body, http::Request, response::Response};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// A controller route ready to serve: its action plus the middleware that
/// runs in front of it.
pub(crate) struct BoundRoute {
    pub(crate) route: RouteConfig,
    /// Route middleware, then schema validation.
    pub(crate) chain: Vec<Arc<dyn Middleware>>,
    pub(crate) filter: Arc<dyn ExceptionFilter>,
    pub(crate) options: ResponseOptions,
    pub(crate) body_limit: usize,
    /// The route's own parameter names, when the bound path uses others.
    pub(crate) params: Option<ParamNames>,
}

impl BoundRoute {
    fn reject(&self, error: HandlerError) -> Response {
        self.filter.catch(error).into_response_with(self.options)
    }

    async fn invoke(&self, request: Request<Body>) -> Response {
        let context = match RequestContext::from_request(request, self.body_limit).await {
            Ok(context) => context,
            Err(e) => return self.reject(e.into()),
        };
        match self.route.call(context).await {
            Ok(envelope) => envelope.into_response_with(self.options),
            Err(e) => self.reject(e),
        }
    }
}

pub(crate) async fn dispatch(bound: Arc<BoundRoute>, mut request: Request<Body>) -> Response {
    if let Some(names) = &bound.params {
        request.extensions_mut().insert(names.clone());
    }

    let span = tracing::info_span!(
        "request",
        id = %Uuid::new_v4(),
        route = %bound.route.key,
    );

    async move {
        tracing::info!("{} {}", request.method(), request.uri());

        let terminal = {
            let bound = Arc::clone(&bound);
            Next::new(move |request| {
                Box::pin(async move { Ok::<_, HandlerError>(bound.invoke(request).await) })
            })
        };

        match chain(&bound.chain, terminal).run(request).await {
            Ok(response) => response,
            Err(e) => bound.reject(e),
        }
    }
    .instrument(span)
    .await
}
