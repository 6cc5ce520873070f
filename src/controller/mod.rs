//! Controller declarations.
//!
//! A controller is a type whose actions are declared in
//! [`Controller::routes`], either by hand through [`RouteSet`] or with the
//! `#[controller]` and `#[routes]` attributes:
//!
//! ```
//! use std::sync::Arc;
//! use trellis::{Controller, ControllerResponse, HandlerResult, RequestContext, RouteSet};
//! use serde_json::json;
//!
//! struct Health;
//!
//! impl Health {
//!     async fn status(self: Arc<Self>, _context: RequestContext) -> HandlerResult {
//!         Ok(ControllerResponse::success(json!("up")))
//!     }
//! }
//!
//! impl Controller for Health {
//!     fn base_path() -> Option<&'static str> {
//!         Some("/health")
//!     }
//!
//!     fn routes(routes: &mut RouteSet<Self>) {
//!         routes.get(Self::status).path("/");
//!     }
//! }
//! ```

use crate::common::{ControllerResponse, Method};
use crate::context::RequestContext;
use crate::exception::HandlerError;
use crate::middleware::{BoxFuture, Middleware};
use crate::registry::{RouteConfig, short_type_name};
use crate::validation::Schema;
use std::any::type_name;
use std::future::Future;
use std::sync::Arc;

/// What a controller action returns.
pub type HandlerResult = Result<ControllerResponse, HandlerError>;

type Action<C> = Arc<dyn Fn(Arc<C>, RequestContext) -> BoxFuture<HandlerResult> + Send + Sync>;

pub trait Controller: Send + Sync + Sized + 'static {
    /// Name used in logs and as the default base path.
    fn name() -> &'static str {
        short_type_name::<Self>()
    }

    /// Base path of every route. `None` mounts the controller at `/{name}`.
    fn base_path() -> Option<&'static str> {
        None
    }

    fn routes(routes: &mut RouteSet<Self>);
}

/// Route declarations of one controller, in order.
pub struct RouteSet<C> {
    routes: Vec<RouteDef<C>>,
}

impl<C: Controller> RouteSet<C> {
    pub(crate) fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Declare an action under an explicit key. The key doubles as the
    /// path unless [`RouteDef::path`] sets one.
    pub fn add<F, Fut>(&mut self, method: Method, key: impl Into<String>, action: F) -> &mut RouteDef<C>
    where
        F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.routes.push(RouteDef {
            method,
            key: key.into(),
            path: None,
            schema: None,
            handlers: Vec::new(),
            action: Arc::new(move |controller, context| Box::pin(action(controller, context))),
        });
        let last = self.routes.len() - 1;
        &mut self.routes[last]
    }

    fn add_named<F, Fut>(&mut self, method: Method, action: F) -> &mut RouteDef<C>
    where
        F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add(method, action_name::<F>(), action)
    }

    pub fn get<F, Fut>(&mut self, action: F) -> &mut RouteDef<C>
    where
        F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_named(Method::Get, action)
    }

    pub fn post<F, Fut>(&mut self, action: F) -> &mut RouteDef<C>
    where
        F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_named(Method::Post, action)
    }

    pub fn put<F, Fut>(&mut self, action: F) -> &mut RouteDef<C>
    where
        F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_named(Method::Put, action)
    }

    pub fn delete<F, Fut>(&mut self, action: F) -> &mut RouteDef<C>
    where
        F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_named(Method::Delete, action)
    }

    pub fn patch<F, Fut>(&mut self, action: F) -> &mut RouteDef<C>
    where
        F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_named(Method::Patch, action)
    }

    pub fn options<F, Fut>(&mut self, action: F) -> &mut RouteDef<C>
    where
        F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_named(Method::Options, action)
    }

    pub fn head<F, Fut>(&mut self, action: F) -> &mut RouteDef<C>
    where
        F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_named(Method::Head, action)
    }

    /// Any method not claimed by a more specific route on the same path.
    pub fn all<F, Fut>(&mut self, action: F) -> &mut RouteDef<C>
    where
        F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_named(Method::All, action)
    }

    /// Same as [`RouteSet::get`].
    pub fn route<F, Fut>(&mut self, action: F) -> &mut RouteDef<C>
    where
        F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.get(action)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn into_routes(self) -> Vec<RouteDef<C>> {
        self.routes
    }
}

/// One declared action, refined through its builder methods.
pub struct RouteDef<C> {
    method: Method,
    key: String,
    path: Option<String>,
    schema: Option<Arc<Schema>>,
    handlers: Vec<Arc<dyn Middleware>>,
    action: Action<C>,
}

impl<C: Controller> RouteDef<C> {
    /// Path relative to the controller's base path. Empty means the key.
    pub fn path(&mut self, path: impl Into<String>) -> &mut Self {
        self.path = Some(path.into());
        self
    }

    pub fn key(&mut self, key: impl Into<String>) -> &mut Self {
        self.key = key.into();
        self
    }

    /// Validate requests against `schema` before the action runs.
    pub fn schema(&mut self, schema: Schema) -> &mut Self {
        self.schema = Some(Arc::new(schema));
        self
    }

    /// Run `middleware` before the action. Calls accumulate in order.
    pub fn middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.handlers.push(Arc::new(middleware));
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub(crate) fn bind(self, controller: Arc<C>) -> RouteConfig {
        let action = self.action;
        let mut config = RouteConfig::new(self.method, self.path.as_deref(), self.key, move |context| {
            action(Arc::clone(&controller), context)
        });
        config.handlers = self.handlers;
        config.schema = self.schema;
        config
    }
}

/// Name of a function item, e.g. `list` for `UserController::list`.
fn action_name<F>() -> String {
    let full = type_name::<F>();
    let last = full.rsplit("::").next().unwrap_or(full);
    let last = last.split('<').next().unwrap_or(last);
    if last.is_empty() || last.contains('{') {
        "handler".to_string()
    } else {
        last.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Field;
    use serde_json::json;

    struct UserController;

    impl UserController {
        async fn list(self: Arc<Self>, _context: RequestContext) -> HandlerResult {
            Ok(ControllerResponse::success(json!([])))
        }

        async fn create(self: Arc<Self>, _context: RequestContext) -> HandlerResult {
            Ok(ControllerResponse::success(json!({"id": 1})))
        }
    }

    impl Controller for UserController {
        fn routes(routes: &mut RouteSet<Self>) {
            routes.get(Self::list).path("/");
            routes
                .post(Self::create)
                .schema(Schema::new().field(Field::body("name").exists()));
        }
    }

    fn declared() -> Vec<RouteConfig> {
        let mut routes = RouteSet::new();
        UserController::routes(&mut routes);
        let controller = Arc::new(UserController);
        routes
            .into_routes()
            .into_iter()
            .map(|route| route.bind(Arc::clone(&controller)))
            .collect()
    }

    #[test]
    fn test_name_defaults_to_type_name() {
        assert_eq!(UserController::name(), "UserController");
        assert_eq!(UserController::base_path(), None);
    }

    #[test]
    fn test_key_is_inferred_from_function_name() {
        let routes = declared();
        assert_eq!(routes[0].key, "list");
        assert_eq!(routes[0].path, "/");
        assert_eq!(routes[1].key, "create");
        assert_eq!(routes[1].path, "/create");
        assert_eq!(routes[1].method, Method::Post);
        assert!(routes[1].schema.is_some());
    }

    #[test]
    fn test_closures_get_a_generic_key() {
        let mut routes = RouteSet::<UserController>::new();
        routes.get(|_controller, _context| async {
            Ok(ControllerResponse::success(json!(null)))
        });
        routes
            .all(|_controller, _context| async {
                Ok(ControllerResponse::success(json!(null)))
            })
            .key("fallback");

        let defs = routes.into_routes();
        assert_eq!(defs[0].key, "handler");
        assert_eq!(defs[1].key, "fallback");
        assert_eq!(defs[1].method(), Method::All);
    }

    #[tokio::test]
    async fn test_bound_route_calls_the_controller() {
        let routes = declared();
        let context = RequestContext::from_request(
            axum::http::Request::new(axum::body::Body::empty()),
            1024,
        )
        .await
        .unwrap();
        let response = routes[1].call(context).await.unwrap();
        assert_eq!(response.data, Some(json!({"id": 1})));
    }
}
