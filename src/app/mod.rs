//! The application shim: binds registered controllers onto an axum
//! [`Router`] and serves it.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trellis::{App, Controller, ControllerResponse, HandlerResult, RequestContext, RouteSet};
//! use serde_json::json;
//!
//! struct Hello;
//!
//! impl Hello {
//!     async fn index(self: Arc<Self>, _context: RequestContext) -> HandlerResult {
//!         Ok(ControllerResponse::success(json!("Hello World")))
//!     }
//! }
//!
//! impl Controller for Hello {
//!     fn routes(routes: &mut RouteSet<Self>) {
//!         routes.get(Self::index).path("/");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> trellis::Result<()> {
//!     App::new()
//!         .register_controller(Hello)
//!         .listen_with(3000, |addr| println!("listening on {addr}"))
//!         .await
//! }
//! ```

use crate::common::Method;
use crate::config::AppConfig;
use crate::context::ParamNames;
use crate::controller::{Controller, RouteSet};
use crate::error::{Result, TrellisError};
use crate::exception::{ExceptionFilter, HttpExceptionFilter, http::panic_message};
use crate::middleware::{Middleware, MiddlewareLayer};
use crate::registry::{ControllerMetadata, RouteConfig, RouteRegistry, join_paths, normalize_path};
use crate::validation::SchemaCheck;
use axum::{
    Router,
    body::Body,
    handler::Handler,
    http::Request,
    response::Response,
    routing::{MethodRouter, on},
};
use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;

mod dispatch;
pub mod shutdown;
pub mod table;

use dispatch::{BoundRoute, dispatch};
pub use shutdown::shutdown_signal;
pub use table::{Endpoint, RouteTable};

struct RawRoute {
    method: Method,
    path: String,
    router: MethodRouter,
}

enum Source {
    Controller { controller: usize, route: usize },
    Raw(usize),
}

struct Binding {
    method: Method,
    source: Source,
    label: String,
    /// Parameter names in the route's own path, in order.
    params: Vec<String>,
    /// Bound only so that a trailing-slash path also answers without it.
    alias: bool,
}

struct Replaced {
    method: Method,
    path: String,
    previous: String,
    current: String,
}

/// Routes sharing one path shape. axum allows a single set of parameter
/// names per shape, so the first registered path is the one bound.
struct PathEntry {
    shape: String,
    path: String,
    bindings: Vec<Binding>,
}

#[derive(Default)]
struct Plan {
    paths: Vec<PathEntry>,
    replaced: Vec<Replaced>,
}

impl Plan {
    fn add(&mut self, path: String, binding: Binding) {
        let shape = path_shape(&path);
        let index = match self.paths.iter().position(|entry| entry.shape == shape) {
            Some(index) => index,
            None => {
                self.paths.push(PathEntry {
                    shape,
                    path,
                    bindings: Vec::new(),
                });
                self.paths.len() - 1
            }
        };
        let entry = &mut self.paths[index];
        match entry.bindings.iter_mut().find(|b| b.method == binding.method) {
            // an explicit route is never displaced by a slash alias
            Some(existing) if binding.alias && !existing.alias => {}
            Some(existing) => {
                if !existing.alias {
                    self.replaced.push(Replaced {
                        method: binding.method,
                        path: entry.path.clone(),
                        previous: existing.label.clone(),
                        current: binding.label.clone(),
                    });
                }
                *existing = binding;
            }
            None => entry.bindings.push(binding),
        }
    }
}

/// `path` with parameter names blanked, e.g. `/users/{}/files/{*}`.
fn path_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) if name.starts_with('*') => "{*}",
            Some(_) => "{}",
            None => segment,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Parameter names of an axum path, in order.
fn path_params(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
        .map(|name| name.trim_start_matches('*').to_string())
        .collect()
}

/// Rewrite express-style segments (`:id`, `*`) to axum's `{id}`, `{*wildcard}`.
pub fn to_axum_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else if segment == "*" {
                "{*wildcard}".to_string()
            } else if let Some(name) = segment.strip_prefix('*') {
                format!("{{*{name}}}")
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Controllers, middleware, and raw routes collected into one server.
pub struct App {
    config: AppConfig,
    registry: RouteRegistry,
    middleware: Vec<Arc<dyn Middleware>>,
    raw_routes: Vec<RawRoute>,
    nested: Vec<(String, Router)>,
    filter: Arc<dyn ExceptionFilter>,
}

impl Default for App {
    fn default() -> Self {
        Self::with_config(AppConfig::default())
    }
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config,
            registry: RouteRegistry::new(),
            middleware: Vec::new(),
            raw_routes: Vec::new(),
            nested: Vec::new(),
            filter: Arc::new(HttpExceptionFilter),
        }
    }

    /// An app configured from the process environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_config(AppConfig::from_env()?))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    /// Replace the filter that turns handler and middleware errors into envelopes.
    pub fn exception_filter(mut self, filter: impl ExceptionFilter) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    pub fn register_controller<C: Controller>(self, controller: C) -> Self {
        self.register_shared_controller(Arc::new(controller))
    }

    /// Register a controller instance that is also used elsewhere.
    pub fn register_shared_controller<C: Controller>(mut self, controller: Arc<C>) -> Self {
        self.registry.register_controller::<C>(Some(C::base_path().unwrap_or(C::name())));

        let mut routes = RouteSet::new();
        C::routes(&mut routes);
        if routes.is_empty() {
            tracing::warn!(
                "No routes defined for {}. Did you forget to declare any?",
                C::name()
            );
        }

        for route in routes.into_routes() {
            self.registry
                .register_route::<C>(route.bind(Arc::clone(&controller)));
        }
        self
    }

    /// Run `middleware` in front of every route, before route middleware.
    pub fn register_middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Bind a plain axum handler, outside any controller.
    pub fn register_route<H, T>(mut self, method: Method, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let router = match method.filter() {
            Some(filter) => on(filter, handler),
            None => MethodRouter::new().fallback(handler),
        };
        self.raw_routes.push(RawRoute {
            method,
            path: to_axum_path(&normalize_path(path)),
            router,
        });
        self
    }

    /// Mount a whole router under `prefix`.
    pub fn nest(mut self, prefix: &str, router: Router) -> Self {
        self.nested.push((normalize_path(prefix), router));
        self
    }

    fn controllers(&self) -> Vec<&ControllerMetadata> {
        self.registry.iter().collect()
    }

    fn plan(&self) -> Plan {
        let mut plan = Plan::default();
        for (c, metadata) in self.controllers().into_iter().enumerate() {
            for (r, route) in metadata.routes.iter().enumerate() {
                let path = to_axum_path(&join_paths(&metadata.base_path, &route.path));
                let binding = |path: &str, alias: bool| Binding {
                    method: route.method,
                    source: Source::Controller {
                        controller: c,
                        route: r,
                    },
                    label: format!("{}::{}", metadata.name, route.key),
                    params: path_params(path),
                    alias,
                };
                plan.add(path.clone(), binding(&path, false));
                let trimmed = path.trim_end_matches('/');
                if !trimmed.is_empty() && trimmed != path {
                    plan.add(trimmed.to_string(), binding(&path, true));
                }
            }
        }
        for (i, raw) in self.raw_routes.iter().enumerate() {
            plan.add(
                raw.path.clone(),
                Binding {
                    method: raw.method,
                    source: Source::Raw(i),
                    label: format!("{} {}", raw.method, raw.path),
                    params: path_params(&raw.path),
                    alias: false,
                },
            );
        }
        plan
    }

    /// Every bound path with its methods, after duplicates are resolved.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let mut endpoints: Vec<Endpoint> = self
            .plan()
            .paths
            .into_iter()
            .filter_map(|entry| {
                let methods: Vec<Method> = entry
                    .bindings
                    .iter()
                    .filter(|b| !b.alias)
                    .map(|b| b.method)
                    .collect();
                (!methods.is_empty()).then_some(Endpoint {
                    methods,
                    path: entry.path,
                })
            })
            .collect();
        endpoints.extend(self.nested.iter().map(|(prefix, _)| Endpoint {
            methods: vec![Method::All],
            path: join_paths(prefix, "/*"),
        }));
        endpoints
    }

    pub fn route_table(&self) -> RouteTable {
        RouteTable::new(self.endpoints())
    }

    fn bind(&self, route: RouteConfig, params: Option<ParamNames>) -> BoundRoute {
        let mut chain = route.handlers.clone();
        if let Some(schema) = &route.schema {
            chain.push(Arc::new(SchemaCheck::new(
                Arc::clone(schema),
                self.config.body_limit,
            )));
        }
        BoundRoute {
            route,
            chain,
            filter: Arc::clone(&self.filter),
            options: self.config.response_options(),
            body_limit: self.config.body_limit,
            params,
        }
    }

    fn controller_router(
        &self,
        route: RouteConfig,
        method: Method,
        params: Option<ParamNames>,
    ) -> MethodRouter {
        let bound = Arc::new(self.bind(route, params));
        let handler = move |request: Request<Body>| dispatch(Arc::clone(&bound), request);
        match method.filter() {
            Some(filter) => on(filter, handler),
            None => MethodRouter::new().fallback(handler),
        }
    }

    /// Build the router. Later registrations of the same method and path
    /// replace earlier ones. Paths differing only in parameter names count
    /// as the same path.
    pub fn into_router(self) -> Router {
        let plan = self.plan();
        for replaced in &plan.replaced {
            tracing::warn!(
                "Duplicate route {} {}: {} replaces {}",
                replaced.method,
                replaced.path,
                replaced.current,
                replaced.previous
            );
        }

        let controllers = self.controllers();
        let mut router = Router::new();
        for entry in plan.paths {
            let bound_params = path_params(&entry.path);
            let mut method_router = MethodRouter::new();
            for binding in entry.bindings {
                let renamed = binding.params != bound_params;
                let endpoint = match binding.source {
                    Source::Controller { controller, route } => {
                        let route = controllers[controller].routes[route].clone();
                        if renamed {
                            tracing::debug!(
                                "{} is bound as {}; parameters {:?} are taken by position",
                                binding.label,
                                entry.path,
                                binding.params
                            );
                        }
                        let params = renamed.then(|| ParamNames(binding.params.into()));
                        self.controller_router(route, binding.method, params)
                    }
                    Source::Raw(index) => {
                        if renamed {
                            tracing::warn!(
                                "{} is bound as {}; its handler sees the parameter names {:?}",
                                binding.label,
                                entry.path,
                                bound_params
                            );
                        }
                        self.raw_routes[index].router.clone()
                    }
                };
                method_router = method_router.merge(endpoint);
            }
            router = router.route(&entry.path, method_router);
        }

        for (prefix, nested) in &self.nested {
            router = if prefix == "/" {
                router.merge(nested.clone())
            } else {
                router.nest(prefix, nested.clone())
            };
        }

        let options = self.config.response_options();
        if !self.middleware.is_empty() {
            router = router.layer(MiddlewareLayer::new(
                self.middleware.clone(),
                Arc::clone(&self.filter),
                options,
            ));
        }

        let filter = Arc::clone(&self.filter);
        let on_panic = move |payload: Box<dyn Any + Send + 'static>| -> Response {
            let message = panic_message(payload.as_ref());
            tracing::error!("handler panicked: {}", message);
            filter
                .catch(anyhow::anyhow!(message).into())
                .into_response_with(options)
        };
        router.layer(CatchPanicLayer::custom(on_panic))
    }

    /// Serve on the configured host and port until Ctrl+C or SIGTERM.
    pub async fn start(self) -> Result<()> {
        let port = self.config.port;
        self.listen(port).await
    }

    /// Serve on `port` until Ctrl+C or SIGTERM.
    pub async fn listen(self, port: u16) -> Result<()> {
        self.listen_with(port, |_| {}).await
    }

    /// Like [`App::listen`], calling `on_ready` once the socket is bound.
    pub async fn listen_with<F>(self, port: u16, on_ready: F) -> Result<()>
    where
        F: FnOnce(SocketAddr),
    {
        let addr = format!("{}:{}", self.config.host, port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| TrellisError::Bind { addr, source })?;
        self.serve(listener, on_ready, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` completes.
    pub async fn serve<F, S>(self, listener: TcpListener, on_ready: F, shutdown: S) -> Result<()>
    where
        F: FnOnce(SocketAddr),
        S: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr().map_err(|source| TrellisError::Bind {
            addr: "listener".to_string(),
            source,
        })?;

        if self.config.print_routes {
            tracing::info!("Available routes:\n{}", self.route_table());
        }
        let router = self.into_router();

        tracing::info!("Server running on http://{}", addr);
        on_ready(addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| TrellisError::Serve { addr, source })
    }
}
