use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use trellis::{App, AppConfig, Method};

mod example;
mod users;

use example::{Class2, ExampleController};
use users::UserController;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    let port = config.port;

    let api = Router::new()
        .route("/test", get(|| async { "Hello World" }))
        .layer(TraceLayer::new_for_http());

    let app = App::with_config(config)
        .register_controller(ExampleController)
        .register_controller(Class2)
        .register_controller(UserController::default())
        .register_route(Method::Get, "/health", || async { "ok" })
        .nest("/api", api);

    if let Err(e) = app
        .listen_with(port, |addr| tracing::info!("Listening on {}", addr))
        .await
    {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
