//! Route registry.
//!
//! Bookkeeping only: one entry per controller type holding its base path
//! and its route descriptors in declaration order. Nothing here touches the
//! router; [`App`](crate::App) reads the registry when it binds routes.

use crate::common::Method;
use crate::context::RequestContext;
use crate::controller::HandlerResult;
use crate::middleware::{BoxFuture, Middleware};
use crate::validation::Schema;
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub(crate) type BoxedHandler = Arc<dyn Fn(RequestContext) -> BoxFuture<HandlerResult> + Send + Sync>;

/// Last path segment of a type's name, without generic arguments.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Prefix `path` with `/` unless it already starts with one.
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// `base` followed by `route`, without doubling the slash between them.
pub fn join_paths(base: &str, route: &str) -> String {
    match (base.strip_suffix('/'), route.starts_with('/')) {
        (Some(trimmed), true) => format!("{trimmed}{route}"),
        _ => format!("{base}{route}"),
    }
}

/// One bound controller action.
#[derive(Clone)]
pub struct RouteConfig {
    pub path: String,
    pub method: Method,
    /// Name of the action, also the default path.
    pub key: String,
    /// Middleware run before the action, in order.
    pub handlers: Vec<Arc<dyn Middleware>>,
    pub schema: Option<Arc<Schema>>,
    pub(crate) handler: BoxedHandler,
}

impl RouteConfig {
    /// A route for `handler`. Without a path (or with an empty one) the key
    /// is used as the path.
    pub fn new<F, Fut>(method: Method, path: Option<&str>, key: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let key = key.into();
        let path = match path {
            Some(path) if !path.is_empty() => normalize_path(path),
            _ => normalize_path(&key),
        };
        Self {
            path,
            method,
            key,
            handlers: Vec::new(),
            schema: None,
            handler: Arc::new(move |context| Box::pin(handler(context))),
        }
    }

    pub fn with_schema(mut self, schema: Arc<Schema>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.handlers.push(middleware);
        self
    }

    /// Invoke the action directly, bypassing middleware and validation.
    pub async fn call(&self, context: RequestContext) -> HandlerResult {
        (self.handler)(context).await
    }
}

impl fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteConfig")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("key", &self.key)
            .field("handlers", &self.handlers.len())
            .field("schema", &self.schema.is_some())
            .finish()
    }
}

/// Everything registered for one controller type.
#[derive(Debug, Clone)]
pub struct ControllerMetadata {
    pub name: String,
    pub base_path: String,
    pub routes: Vec<RouteConfig>,
}

/// Metadata store keyed by controller type.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    order: Vec<TypeId>,
    controllers: HashMap<TypeId, ControllerMetadata>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry<C: 'static>(&mut self) -> &mut ControllerMetadata {
        let id = TypeId::of::<C>();
        if !self.controllers.contains_key(&id) {
            self.order.push(id);
        }
        self.controllers.entry(id).or_insert_with(|| {
            let name = short_type_name::<C>().to_string();
            ControllerMetadata {
                base_path: normalize_path(&name),
                name,
                routes: Vec::new(),
            }
        })
    }

    /// Set the base path of controller `C`, defaulting to its type name.
    /// Calling it again replaces the base path.
    pub fn register_controller<C: 'static>(&mut self, path: Option<&str>) {
        let metadata = self.entry::<C>();
        let base_path = normalize_path(path.unwrap_or(&metadata.name));
        if metadata.base_path != base_path {
            tracing::debug!(controller = %metadata.name, %base_path, "base path set");
        }
        metadata.base_path = base_path;
    }

    /// Append a route to controller `C`. Duplicates are kept.
    pub fn register_route<C: 'static>(&mut self, route: RouteConfig) {
        self.entry::<C>().routes.push(route);
    }

    pub fn get<C: 'static>(&self) -> Option<&ControllerMetadata> {
        self.controllers.get(&TypeId::of::<C>())
    }

    /// Controllers in the order they were first registered.
    pub fn iter(&self) -> impl Iterator<Item = &ControllerMetadata> {
        self.order.iter().filter_map(|id| self.controllers.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ControllerResponse;
    use serde_json::json;

    struct ExampleController;
    struct Accounts;

    fn route(method: Method, path: Option<&str>, key: &str) -> RouteConfig {
        RouteConfig::new(method, path, key, |_context| async {
            Ok(ControllerResponse::success(json!("ok")))
        })
    }

    #[test]
    fn test_base_path_defaults_to_type_name() {
        let mut registry = RouteRegistry::new();
        registry.register_controller::<ExampleController>(None);
        assert_eq!(
            registry.get::<ExampleController>().unwrap().base_path,
            "/ExampleController"
        );

        registry.register_controller::<Accounts>(Some("accounts"));
        assert_eq!(registry.get::<Accounts>().unwrap().base_path, "/accounts");
    }

    #[test]
    fn test_empty_controller_path_is_root() {
        let mut registry = RouteRegistry::new();
        registry.register_controller::<Accounts>(Some(""));
        assert_eq!(registry.get::<Accounts>().unwrap().base_path, "/");
    }

    #[test]
    fn test_route_path_defaults_to_key() {
        assert_eq!(route(Method::Get, None, "stream").path, "/stream");
        assert_eq!(route(Method::Get, Some(""), "stream").path, "/stream");
        assert_eq!(route(Method::Get, Some("items"), "list").path, "/items");
        assert_eq!(route(Method::Get, Some("/"), "index").path, "/");
    }

    #[test]
    fn test_duplicates_are_kept_in_order() {
        let mut registry = RouteRegistry::new();
        registry.register_controller::<ExampleController>(None);
        registry.register_route::<ExampleController>(route(Method::Get, Some("/error"), "error"));
        registry.register_route::<ExampleController>(route(Method::Get, Some("/error"), "with_error"));

        let routes = &registry.get::<ExampleController>().unwrap().routes;
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].key, "error");
        assert_eq!(routes[1].key, "with_error");
        assert_eq!(routes[0].path, routes[1].path);
    }

    #[test]
    fn test_routes_before_controller_keep_base_path_update() {
        let mut registry = RouteRegistry::new();
        registry.register_route::<Accounts>(route(Method::Post, None, "create"));
        registry.register_controller::<Accounts>(Some("/accounts"));

        let metadata = registry.get::<Accounts>().unwrap();
        assert_eq!(metadata.base_path, "/accounts");
        assert_eq!(metadata.routes.len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_iteration_follows_registration_order() {
        let mut registry = RouteRegistry::new();
        registry.register_controller::<Accounts>(None);
        registry.register_controller::<ExampleController>(None);
        registry.register_controller::<Accounts>(Some("/again"));

        let names: Vec<_> = registry.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Accounts", "ExampleController"]);
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/ExampleController", "/"), "/ExampleController/");
        assert_eq!(join_paths("/users", "/{id}"), "/users/{id}");
        assert_eq!(join_paths("/", "/health"), "/health");
        assert_eq!(join_paths("/api/", "/x"), "/api/x");
    }

    #[tokio::test]
    async fn test_call_invokes_handler() {
        let route = route(Method::Get, None, "index");
        let context = RequestContext::from_request(
            axum::http::Request::new(axum::body::Body::empty()),
            1024,
        )
        .await
        .unwrap();
        let response = route.call(context).await.unwrap();
        assert_eq!(response.data, Some(json!("ok")));
    }
}
