//! # Trellis
//!
//! Controller-style routing on top of axum.
//!
//! Controllers declare their actions once; the [`App`] binds them under a
//! base path, runs middleware and request validation in front of them, and
//! writes every result through one response envelope:
//!
//! ```json
//! { "success": true, "message": "Success", "data": "Hello World" }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trellis::prelude::*;
//! use serde_json::json;
//!
//! #[controller(path = "/users")]
//! pub struct UserController;
//!
//! #[routes]
//! impl UserController {
//!     #[get("/:id")]
//!     async fn find(self: Arc<Self>, context: RequestContext) -> HandlerResult {
//!         let id = context.param("id").unwrap_or_default();
//!         Ok(ControllerResponse::success(json!({ "id": id })))
//!     }
//!
//!     #[post("/", schema = Schema::new().field(Field::body("email").is_email()))]
//!     async fn create(self: Arc<Self>, context: RequestContext) -> HandlerResult {
//!         Ok(ControllerResponse::success(context.body.clone()).with_message("Created"))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> trellis::Result<()> {
//!     App::new()
//!         .register_controller(UserController)
//!         .listen(3000)
//!         .await
//! }
//! ```
//!
//! Without the macros, implement [`Controller`] and declare routes through
//! [`RouteSet`].

extern crate self as trellis;

pub mod app;
pub mod common;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod exception;
pub mod middleware;
pub mod registry;
pub mod validation;

pub use app::{App, Endpoint, RouteTable, shutdown_signal};
pub use common::{ControllerResponse, EnvelopeError, Method, ResponseOptions};
pub use config::{AppConfig, ConfigService};
pub use context::RequestContext;
pub use controller::{Controller, HandlerResult, RouteDef, RouteSet};
pub use error::{Result, TrellisError};
pub use exception::{ControllerError, ExceptionFilter, HandlerError, HttpExceptionFilter};
pub use registry::{ControllerMetadata, RouteConfig, RouteRegistry};

pub use trellis_macro::{all, controller, delete, get, head, options, patch, post, put, route, routes};

pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use trellis::prelude::*;
/// ```
pub mod prelude {
    pub use crate::app::App;
    pub use crate::common::{ControllerResponse, Method};
    pub use crate::context::RequestContext;
    pub use crate::controller::{Controller, HandlerResult, RouteSet};
    pub use crate::exception::{ControllerError, HandlerError};
    pub use crate::middleware::{Middleware, MiddlewareResult, Next};
    pub use crate::validation::{Field, Schema};
    pub use crate::{all, controller, delete, get, head, options, patch, post, put, route, routes};
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
}
