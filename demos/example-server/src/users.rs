use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use trellis::middleware::LoggingMiddleware;
use trellis::prelude::*;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
}

fn create_user_schema() -> Schema {
    Schema::new()
        .field(
            Field::body("name")
                .exists()
                .with_message("Name is required")
                .is_string()
                .length(Some(2), Some(64)),
        )
        .field(
            Field::body("email")
                .exists()
                .with_message("Email is required")
                .is_email()
                .with_message("Invalid email"),
        )
}

#[controller(path = "/users")]
#[derive(Default)]
pub struct UserController {
    users: RwLock<HashMap<Uuid, User>>,
}

#[routes]
impl UserController {
    #[post("/", schema = create_user_schema(), middleware = [LoggingMiddleware])]
    async fn create(self: Arc<Self>, context: RequestContext) -> HandlerResult {
        let request: CreateUserRequest = context.body_as()?;
        let user = User {
            id: Uuid::new_v4(),
            name: request.name,
            email: request.email,
        };
        self.users.write().await.insert(user.id, user.clone());
        Ok(ControllerResponse::success_from(&user)?
            .with_code(201)?
            .with_message("User created"))
    }

    #[get("/")]
    async fn list(self: Arc<Self>, _context: RequestContext) -> HandlerResult {
        let users: Vec<User> = self.users.read().await.values().cloned().collect();
        let total = users.len();
        Ok(ControllerResponse::success_from(&users)?.with_meta(serde_json::json!({ "total": total })))
    }

    #[get("/:id")]
    async fn find(self: Arc<Self>, context: RequestContext) -> HandlerResult {
        let id: Uuid = context
            .param("id")
            .unwrap_or_default()
            .parse()
            .map_err(|_| ControllerError::bad_request().with_message("Invalid user id"))?;
        let users = self.users.read().await;
        let user = users.get(&id).ok_or_else(ControllerError::not_found)?;
        Ok(ControllerResponse::success_from(user)?)
    }

    #[delete("/:id")]
    async fn remove(self: Arc<Self>, context: RequestContext) -> HandlerResult {
        let id: Uuid = context
            .param("id")
            .and_then(|id| id.parse().ok())
            .ok_or_else(ControllerError::not_found)?;
        match self.users.write().await.remove(&id) {
            Some(user) => Ok(ControllerResponse::success_from(&user)?.with_message("User removed")),
            None => Err(ControllerError::not_found().into()),
        }
    }
}
