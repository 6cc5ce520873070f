use serde_json::json;
use trellis::prelude::*;

#[controller]
pub struct ExampleController;

#[routes]
impl ExampleController {
    #[get("/")]
    async fn example(self: Arc<Self>, _context: RequestContext) -> HandlerResult {
        let data = json!({ "message": "Hello World" });
        Ok(ControllerResponse::success(data))
    }

    #[get("/error")]
    async fn error(self: Arc<Self>, _context: RequestContext) -> HandlerResult {
        Ok(ControllerResponse::error_with(
            Some(json!(["Something went wrong"])),
            500,
            "Internal Server Error",
        ))
    }

    #[get("/success")]
    async fn with_success(self: Arc<Self>, _context: RequestContext) -> HandlerResult {
        Ok(ControllerResponse::success(json!({ "data": "Hello World" }))
            .with_meta(json!("Additional data like pagination, etc. goes here"))
            .with_message("Any friendly message goes here"))
    }

    // Same path as `error`; this one is bound.
    #[get("/error")]
    async fn with_error(self: Arc<Self>, _context: RequestContext) -> HandlerResult {
        Ok(ControllerResponse::error(json!(null)))
    }

    #[get("/stream")]
    async fn stream(self: Arc<Self>, _context: RequestContext) -> HandlerResult {
        Ok(ControllerResponse::stream(
            "test.txt",
            "Hello World",
            Some("text/plain"),
        ))
    }

    #[get("/redirect")]
    async fn redirect(self: Arc<Self>, _context: RequestContext) -> HandlerResult {
        Ok(ControllerResponse::redirect(
            "http://localhost:3000/ExampleController/",
        ))
    }
}

/// Declares no routes; registering it only logs a warning.
#[controller]
pub struct Class2;

#[routes]
impl Class2 {}
