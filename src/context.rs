use crate::exception::ControllerError;
use crate::validation::{FieldSource, Location};
use axum::{
    body::{Body, Bytes},
    extract::{FromRequestParts, Query, RawPathParams},
    http::{Extensions, HeaderMap, Method, Request, Uri, header, request::Parts},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Parameter names a route declared, for a route bound under a path whose
/// parameters are named differently. Values are matched by position.
#[derive(Debug, Clone)]
pub(crate) struct ParamNames(pub(crate) Arc<[String]>);

/// Everything a controller action gets to see of the request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    /// Parsed JSON body, `Value::Null` when the request carried no JSON.
    pub body: Value,
    pub raw_body: Bytes,
    pub extensions: Extensions,
}

impl RequestContext {
    /// Buffer the body (up to `body_limit` bytes) and collect the request data.
    pub async fn from_request(
        request: Request<Body>,
        body_limit: usize,
    ) -> Result<Self, ControllerError> {
        let (mut parts, body) = request.into_parts();
        let raw_body = read_body(body, body_limit).await?;
        Self::from_parts(&mut parts, raw_body).await
    }

    /// Build a context from request parts and an already buffered body.
    pub async fn from_parts(parts: &mut Parts, raw_body: Bytes) -> Result<Self, ControllerError> {
        let params = match RawPathParams::from_request_parts(parts, &()).await {
            Ok(raw) => {
                let names = parts.extensions.get::<ParamNames>();
                raw.iter()
                    .enumerate()
                    .map(|(i, (key, value))| {
                        let key = names.and_then(|names| names.0.get(i)).map_or(key, String::as_str);
                        (key.to_string(), value.to_string())
                    })
                    .collect()
            }
            Err(_) => HashMap::new(),
        };

        let query = match parts.uri.query() {
            Some(_) => {
                Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
                    .map_err(|e| {
                        ControllerError::bad_request().with_message(format!("Invalid query string: {e}"))
                    })?
                    .0
            }
            None => HashMap::new(),
        };

        let body = parse_body(&parts.headers, &raw_body)?;

        Ok(Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            params,
            query,
            body,
            raw_body,
            extensions: parts.extensions.clone(),
        })
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Deserialize the JSON body. A mismatch is reported as a 400.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, ControllerError> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            ControllerError::bad_request().with_message(format!("Invalid request body: {e}"))
        })
    }

    /// Typed request extension, e.g. one inserted by a middleware.
    pub fn extension<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.extensions.get::<T>().cloned()
    }
}

impl FieldSource for RequestContext {
    fn lookup(&self, location: Location, path: &str) -> Option<Value> {
        match location {
            Location::Body => {
                let mut current = &self.body;
                for segment in path.split('.') {
                    current = match current {
                        Value::Object(map) => map.get(segment)?,
                        Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                        _ => return None,
                    };
                }
                Some(current.clone())
            }
            Location::Query => self.query.get(path).cloned().map(Value::String),
            Location::Params => self.params.get(path).cloned().map(Value::String),
            Location::Headers => self.header(path).map(|v| Value::String(v.to_string())),
        }
    }
}

pub(crate) async fn read_body(body: Body, limit: usize) -> Result<Bytes, ControllerError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| ControllerError::payload_too_large())
}

fn parse_body(headers: &HeaderMap, raw: &Bytes) -> Result<Value, ControllerError> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("json"));
    if !is_json {
        return Ok(Value::Null);
    }
    serde_json::from_slice(raw)
        .map_err(|e| ControllerError::bad_request().with_message(format!("Invalid JSON body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-tenant", "acme")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_collects_query_headers_and_body() {
        let request = json_request("/users?page=2", json!({"user": {"name": "ada"}}));
        let context = RequestContext::from_request(request, 1024).await.unwrap();

        assert_eq!(context.query("page"), Some("2"));
        assert_eq!(context.header("x-tenant"), Some("acme"));
        assert_eq!(context.body["user"]["name"], "ada");
        assert!(context.params.is_empty());
    }

    #[tokio::test]
    async fn test_body_as_reports_bad_request() {
        #[derive(Deserialize)]
        struct Login {
            #[allow(dead_code)]
            email: String,
        }

        let request = json_request("/login", json!({"password": "x"}));
        let context = RequestContext::from_request(request, 1024).await.unwrap();
        let error = context.body_as::<Login>().err().unwrap();
        assert_eq!(error.code, 400);
    }

    #[tokio::test]
    async fn test_invalid_json_is_rejected() {
        let request = Request::builder()
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let error = RequestContext::from_request(request, 1024).await.unwrap_err();
        assert_eq!(error.code, 400);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let request = json_request("/", json!({"blob": "x".repeat(64)}));
        let error = RequestContext::from_request(request, 16).await.unwrap_err();
        assert_eq!(error.code, 413);
    }

    #[tokio::test]
    async fn test_non_json_body_is_kept_raw() {
        let request = Request::builder()
            .uri("/")
            .header("content-type", "text/plain")
            .body(Body::from("hello"))
            .unwrap();
        let context = RequestContext::from_request(request, 1024).await.unwrap();
        assert_eq!(context.body, Value::Null);
        assert_eq!(&context.raw_body[..], b"hello");
    }

    #[tokio::test]
    async fn test_lookup_walks_dotted_paths() {
        let request = json_request("/?q=rust", json!({"items": [{"id": 7}]}));
        let context = RequestContext::from_request(request, 1024).await.unwrap();

        assert_eq!(context.lookup(Location::Body, "items.0.id"), Some(json!(7)));
        assert_eq!(context.lookup(Location::Body, "items.1.id"), None);
        assert_eq!(context.lookup(Location::Query, "q"), Some(json!("rust")));
        assert_eq!(context.lookup(Location::Headers, "x-tenant"), Some(json!("acme")));
    }
}
