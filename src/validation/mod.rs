//! Request validation.
//!
//! A [`Schema`] lists fields, where to find each one, and the checks it must
//! pass. Attached to a route, it runs after the route's middleware and before
//! the handler; failures are answered with a 400 "Validation Error" envelope
//! whose `error` maps each field to its messages.
//!
//! ```
//! use trellis::validation::{Field, Schema};
//!
//! let schema = Schema::new()
//!     .field(Field::body("email").exists().is_email().with_message("Invalid email"))
//!     .field(Field::query("page").optional().is_int());
//! ```

use crate::context::{RequestContext, read_body};
use crate::exception::ControllerError;
use crate::middleware::{Middleware, MiddlewareResult, Next};
use async_trait::async_trait;
use axum::{body::Body, http::Request};
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use strum_macros::Display;

pub mod errors;
pub mod rules;

pub use errors::{ValidationError, ValidationErrors};
pub use rules::{Check, Rule};

pub const VALIDATION_ERROR_MESSAGE: &str = "Validation Error";

/// Part of the request a field is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Location {
    Body,
    Query,
    Params,
    Headers,
}

/// Anything a schema can read field values from.
pub trait FieldSource {
    fn lookup(&self, location: Location, path: &str) -> Option<Value>;
}

/// One field of a schema: its name, where to look, and its rules.
///
/// Rule methods append a check; [`Field::with_message`] sets the message
/// of the most recently added check.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    locations: Vec<Location>,
    rules: Vec<Rule>,
    optional: bool,
}

impl Field {
    /// A field looked up in every location, first match wins
    /// (body, query, params, headers).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locations: vec![
                Location::Body,
                Location::Query,
                Location::Params,
                Location::Headers,
            ],
            rules: Vec::new(),
            optional: false,
        }
    }

    pub fn body(name: impl Into<String>) -> Self {
        Self::new(name).locations([Location::Body])
    }

    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name).locations([Location::Query])
    }

    pub fn param(name: impl Into<String>) -> Self {
        Self::new(name).locations([Location::Params])
    }

    pub fn header(name: impl Into<String>) -> Self {
        Self::new(name).locations([Location::Headers])
    }

    pub fn locations(mut self, locations: impl IntoIterator<Item = Location>) -> Self {
        self.locations = locations.into_iter().collect();
        self
    }

    /// Skip every check when the field is absent.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.rules.push(Rule {
            check,
            message: None,
        });
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        if let Some(rule) = self.rules.last_mut() {
            rule.message = Some(message.into());
        }
        self
    }

    pub fn exists(self) -> Self {
        self.check(Check::Exists)
    }

    pub fn not_empty(self) -> Self {
        self.check(Check::NotEmpty)
    }

    pub fn is_string(self) -> Self {
        self.check(Check::IsString)
    }

    pub fn is_int(self) -> Self {
        self.check(Check::IsInt)
    }

    pub fn is_float(self) -> Self {
        self.check(Check::IsFloat)
    }

    pub fn is_boolean(self) -> Self {
        self.check(Check::IsBoolean)
    }

    pub fn is_email(self) -> Self {
        self.check(Check::IsEmail)
    }

    pub fn length(self, min: Option<usize>, max: Option<usize>) -> Self {
        self.check(Check::Length { min, max })
    }

    pub fn is_in<I, S>(self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check(Check::IsIn(options.into_iter().map(Into::into).collect()))
    }

    pub fn matches(self, regex: Regex) -> Self {
        self.check(Check::Matches(regex))
    }

    pub fn custom<F>(self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.check(Check::Custom(Arc::new(predicate)))
    }

    fn find(&self, source: &dyn FieldSource) -> (Location, Option<Value>) {
        for location in &self.locations {
            if let Some(value) = source.lookup(*location, &self.name) {
                return (*location, Some(value));
            }
        }
        let location = self.locations.first().copied().unwrap_or(Location::Body);
        (location, None)
    }

    fn validate(&self, source: &dyn FieldSource, errors: &mut ValidationErrors) {
        let (location, value) = self.find(source);
        if value.is_none() && self.optional {
            return;
        }
        for rule in &self.rules {
            if !rule.check.passes(value.as_ref()) {
                errors.add(ValidationError::new(
                    self.name.clone(),
                    rule.message_for(&self.name),
                    location,
                ));
            }
        }
    }
}

/// The validation schema attached to a route
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Run every rule of every field, collecting all failures.
    pub fn validate(&self, source: &dyn FieldSource) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        for field in &self.fields {
            field.validate(source, &mut errors);
        }
        errors
    }
}

/// Middleware that validates the request against a schema before the
/// handler runs.
///
/// The body is buffered for validation and handed on unchanged.
pub struct SchemaCheck {
    schema: Arc<Schema>,
    body_limit: usize,
}

impl SchemaCheck {
    pub fn new(schema: Arc<Schema>, body_limit: usize) -> Self {
        Self { schema, body_limit }
    }
}

#[async_trait]
impl Middleware for SchemaCheck {
    async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult {
        let (mut parts, body) = request.into_parts();
        let raw_body = read_body(body, self.body_limit).await?;
        let context = RequestContext::from_parts(&mut parts, raw_body.clone()).await?;

        let errors = self.schema.validate(&context);
        if !errors.is_empty() {
            tracing::debug!(uri = %parts.uri, %errors, "request failed validation");
            return Err(ControllerError::new(VALIDATION_ERROR_MESSAGE, 400)
                .with_errors(errors.to_value())
                .into());
        }

        next.run(Request::from_parts(parts, Body::from(raw_body))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Source {
        body: HashMap<String, Value>,
        query: HashMap<String, String>,
    }

    impl FieldSource for Source {
        fn lookup(&self, location: Location, path: &str) -> Option<Value> {
            match location {
                Location::Body => self.body.get(path).cloned(),
                Location::Query => self.query.get(path).cloned().map(Value::String),
                _ => None,
            }
        }
    }

    #[test]
    fn test_collects_every_failure_in_order() {
        let schema = Schema::new()
            .field(
                Field::body("email")
                    .exists()
                    .with_message("Email is required")
                    .is_email()
                    .with_message("Invalid email"),
            )
            .field(Field::body("name").is_string().length(Some(2), None));

        let mut source = Source::default();
        source.body.insert("name".into(), json!("a"));

        let errors = schema.validate(&source);
        assert_eq!(
            errors.to_value(),
            json!({
                "email": ["Email is required", "Invalid email"],
                "name": ["name must be at least 2 characters"],
            })
        );
    }

    #[test]
    fn test_optional_field_skipped_when_absent() {
        let schema = Schema::new().field(Field::query("page").optional().is_int());
        assert!(schema.validate(&Source::default()).is_empty());

        let mut source = Source::default();
        source.query.insert("page".into(), "two".into());
        let errors = schema.validate(&source);
        assert_eq!(errors.errors[0].location, Location::Query);
        assert_eq!(errors.errors[0].message, "page must be an integer");
    }

    #[test]
    fn test_first_location_with_a_value_wins() {
        let schema = Schema::new().field(Field::new("id").is_int());
        let mut source = Source::default();
        source.query.insert("id".into(), "12".into());
        assert!(schema.validate(&source).is_empty());
    }

    #[test]
    fn test_custom_predicate() {
        let schema = Schema::new().field(
            Field::body("age")
                .custom(|v| v.as_u64().is_some_and(|age| age >= 18))
                .with_message("Must be an adult"),
        );
        let mut source = Source::default();
        source.body.insert("age".into(), json!(12));
        let errors = schema.validate(&source);
        assert_eq!(errors.by_field()["age"], vec!["Must be an adult".to_string()]);
    }

    #[tokio::test]
    async fn test_schema_check_blocks_invalid_requests() {
        let schema = Arc::new(Schema::new().field(Field::body("email").is_email()));
        let check = SchemaCheck::new(schema, 1024);
        let next = Next::new(|_request| {
            Box::pin(async {
                Ok::<_, crate::exception::HandlerError>(axum::response::Response::default())
            })
        });
        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"email":"nope"}"#))
            .unwrap();

        let error = check.handle(request, next).await.unwrap_err();
        let error = error.controller_error().cloned().unwrap();
        assert_eq!(error.code, 400);
        assert_eq!(error.message, "Validation Error");
        assert_eq!(error.errors, Some(json!({"email": ["email must be a valid email"]})));
    }

    #[tokio::test]
    async fn test_schema_check_forwards_the_body() {
        let schema = Arc::new(Schema::new().field(Field::body("email").is_email()));
        let check = SchemaCheck::new(schema, 1024);
        let next = Next::new(|request: Request<Body>| {
            Box::pin(async move {
                let body = axum::body::to_bytes(request.into_body(), 1024).await.unwrap();
                assert_eq!(&body[..], br#"{"email":"a@b.io"}"#);
                Ok::<_, crate::exception::HandlerError>(axum::response::Response::default())
            })
        });
        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"email":"a@b.io"}"#))
            .unwrap();

        assert!(check.handle(request, next).await.is_ok());
    }
}
