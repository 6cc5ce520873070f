use axum::{
    Json,
    body::{Body, Bytes},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Stand-in for "no code supplied". Outside every valid range, so the
/// derivation always replaces it.
const UNSET_CODE: u16 = 1000;

pub const DEFAULT_FILE_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Invalid status code: {0}")]
    InvalidStatusCode(u16),
}

/// The envelope state that influences which status code is sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodeFlags {
    pub has_error: bool,
    pub is_redirect: bool,
}

/// Derive the status code to send from the envelope flags and the raw code
/// a handler supplied.
///
/// Precedence is fixed: an error forces a 4xx/5xx code (500 if the raw code
/// is not one), then a redirect forces a 3xx code (302), then anything
/// outside `[200, 600)` falls back to 200.
pub fn resolve_code(flags: CodeFlags, raw: Option<u16>) -> u16 {
    let code = raw.unwrap_or(UNSET_CODE);
    if flags.has_error && !(400..600).contains(&code) {
        return 500;
    }
    if flags.is_redirect && !(300..400).contains(&code) {
        return 302;
    }
    if !(200..600).contains(&code) {
        return 200;
    }
    code
}

fn check_code(code: u16) -> Result<u16, EnvelopeError> {
    if (200..600).contains(&code) {
        Ok(code)
    } else {
        Err(EnvelopeError::InvalidStatusCode(code))
    }
}

/// How an envelope is written to the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseOptions {
    /// Repeat the status code inside the JSON body.
    pub include_code: bool,
}

/// JSON shape of a serialized envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeBody {
    pub success: bool,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// The value every controller action returns.
///
/// The status code is never stored as sent: [`ControllerResponse::code`]
/// recomputes it from the flags on every read, so an envelope carrying an
/// `error` can never go out with a 2xx status.
///
/// # Example
/// ```
/// use serde_json::json;
/// use trellis::common::ControllerResponse;
///
/// let ok = ControllerResponse::success(json!({ "id": 1 }))
///     .with_meta(json!({ "page": 1 }));
/// assert_eq!(ok.code(), 200);
///
/// let failed = ControllerResponse::error_with(Some(json!(["x"])), 999, "Failed");
/// assert_eq!(failed.code(), 400);
/// assert!(!failed.to_json().success);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerResponse {
    /// A human readable message for the client.
    pub message: String,
    code: Option<u16>,
    pub data: Option<Value>,
    /// Additional data such as pagination or totals.
    pub meta: Option<Value>,
    pub error: Option<Value>,

    /// Send `data` as a file download instead of a JSON envelope.
    pub is_stream: bool,
    pub file_name: String,
    /// Content type of the download. Empty means `application/octet-stream`.
    pub file_type: String,

    pub is_redirect: bool,
    pub redirect_url: String,

    body: Option<Bytes>,
}

impl ControllerResponse {
    /// Create an envelope with an optional explicit status code.
    ///
    /// An explicit code outside `[200, 600)` is rejected.
    pub fn new(message: impl Into<String>, code: Option<u16>) -> Result<Self, EnvelopeError> {
        let code = code.map(check_code).transpose()?;
        Ok(Self {
            message: message.into(),
            code,
            ..Self::default()
        })
    }

    fn preset(message: &str, code: u16) -> Self {
        Self {
            message: message.to_string(),
            code: Some(code),
            ..Self::default()
        }
    }

    /// A 200 response carrying `data`.
    pub fn success(data: Value) -> Self {
        let mut response = Self::preset("Success", 200);
        response.data = Some(data);
        response
    }

    /// A 200 response carrying any serializable value.
    pub fn success_from<T: Serialize>(data: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::success(serde_json::to_value(data)?))
    }

    /// A 400 "Failed" response carrying `errors`.
    pub fn error(errors: Value) -> Self {
        Self::error_with(Some(errors), 400, "Failed")
    }

    /// A failure response. Codes outside `[400, 600)` become 400.
    pub fn error_with(errors: Option<Value>, code: u16, message: impl Into<String>) -> Self {
        let code = if (400..600).contains(&code) { code } else { 400 };
        let mut response = Self::preset("", code);
        response.message = message.into();
        response.error = errors;
        response
    }

    /// A file download. `file_type` defaults to `application/octet-stream`.
    pub fn stream(
        file_name: impl Into<String>,
        data: impl Into<Bytes>,
        file_type: Option<&str>,
    ) -> Self {
        let mut response = Self::preset("Success", 200);
        response.is_stream = true;
        response.file_name = file_name.into();
        response.file_type = file_type.unwrap_or(DEFAULT_FILE_TYPE).to_string();
        response.body = Some(data.into());
        response
    }

    /// A 302 redirect to `url`.
    pub fn redirect(url: impl Into<String>) -> Self {
        Self::redirect_with(url, 302)
    }

    /// A redirect. Codes outside `[300, 400)` become 302.
    pub fn redirect_with(url: impl Into<String>, code: u16) -> Self {
        let code = if (300..400).contains(&code) { code } else { 302 };
        let mut response = Self::preset("Redirecting", code);
        response.is_redirect = true;
        response.redirect_url = url.into();
        response
    }

    /// Replace the raw status code. Codes outside `[200, 600)` are rejected.
    pub fn with_code(mut self, code: u16) -> Result<Self, EnvelopeError> {
        self.code = Some(check_code(code)?);
        Ok(self)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_error(mut self, error: Value) -> Self {
        self.error = Some(error);
        self
    }

    /// The code as supplied by the handler, before derivation.
    pub fn raw_code(&self) -> Option<u16> {
        self.code
    }

    pub fn flags(&self) -> CodeFlags {
        CodeFlags {
            has_error: matches!(self.error, Some(ref e) if !e.is_null()),
            is_redirect: self.is_redirect,
        }
    }

    /// The status code that will be sent.
    pub fn code(&self) -> u16 {
        resolve_code(self.flags(), self.code)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code())
    }

    pub fn to_json(&self) -> EnvelopeBody {
        EnvelopeBody {
            success: self.is_success(),
            message: self.message.clone(),
            code: Some(self.code()),
            data: self.data.clone(),
            meta: self.meta.clone(),
            error: self.error.clone(),
        }
    }

    /// The raw bytes of a stream response. Falls back to `data` when the
    /// envelope was flagged as a stream by hand: strings are sent verbatim,
    /// other values as JSON text.
    pub fn stream_body(&self) -> Bytes {
        if let Some(body) = &self.body {
            return body.clone();
        }
        match &self.data {
            Some(Value::String(text)) => Bytes::from(text.clone()),
            Some(value) => Bytes::from(value.to_string()),
            None => Bytes::new(),
        }
    }

    fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn into_response_with(self, options: ResponseOptions) -> Response {
        if self.is_stream {
            return self.stream_response(options);
        }
        if self.is_redirect {
            return self.redirect_response(options);
        }
        let status = self.status();
        let mut body = self.to_json();
        if !options.include_code {
            body.code = None;
        }
        (status, Json(body)).into_response()
    }

    fn stream_response(self, options: ResponseOptions) -> Response {
        let file_type = if self.file_type.is_empty() {
            DEFAULT_FILE_TYPE
        } else {
            self.file_type.as_str()
        };
        let disposition = format!("attachment; filename={}", self.file_name);
        match (
            HeaderValue::from_str(&disposition),
            HeaderValue::from_str(file_type),
        ) {
            (Ok(disposition), Ok(content_type)) => (
                self.status(),
                [
                    (header::CONTENT_DISPOSITION, disposition),
                    (header::CONTENT_TYPE, content_type),
                ],
                Body::from(self.stream_body()),
            )
                .into_response(),
            _ => {
                tracing::error!(file_name = %self.file_name, "stream headers are not valid header values");
                ControllerResponse::error_with(None, 500, "Internal Server Error")
                    .into_response_with(options)
            }
        }
    }

    fn redirect_response(self, options: ResponseOptions) -> Response {
        match HeaderValue::from_str(&self.redirect_url) {
            Ok(location) => (self.status(), [(header::LOCATION, location)]).into_response(),
            Err(_) => {
                tracing::error!(url = %self.redirect_url, "redirect url is not a valid header value");
                ControllerResponse::error_with(None, 500, "Internal Server Error")
                    .into_response_with(options)
            }
        }
    }
}

impl IntoResponse for ControllerResponse {
    fn into_response(self) -> Response {
        self.into_response_with(ResponseOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ERROR: CodeFlags = CodeFlags {
        has_error: true,
        is_redirect: false,
    };
    const REDIRECT: CodeFlags = CodeFlags {
        has_error: false,
        is_redirect: true,
    };

    #[test]
    fn test_resolve_code_error_forces_500() {
        assert_eq!(resolve_code(ERROR, None), 500);
        assert_eq!(resolve_code(ERROR, Some(200)), 500);
        assert_eq!(resolve_code(ERROR, Some(302)), 500);
        assert_eq!(resolve_code(ERROR, Some(404)), 404);
        assert_eq!(resolve_code(ERROR, Some(503)), 503);
    }

    #[test]
    fn test_resolve_code_redirect_forces_302() {
        assert_eq!(resolve_code(REDIRECT, None), 302);
        assert_eq!(resolve_code(REDIRECT, Some(201)), 302);
        assert_eq!(resolve_code(REDIRECT, Some(301)), 301);
    }

    #[test]
    fn test_resolve_code_error_beats_redirect() {
        let both = CodeFlags {
            has_error: true,
            is_redirect: true,
        };
        assert_eq!(resolve_code(both, None), 500);
        // A valid error code skips the error rule, so the redirect rule applies.
        assert_eq!(resolve_code(both, Some(404)), 302);
    }

    #[test]
    fn test_resolve_code_plain_fallback() {
        let plain = CodeFlags::default();
        assert_eq!(resolve_code(plain, None), 200);
        assert_eq!(resolve_code(plain, Some(150)), 200);
        assert_eq!(resolve_code(plain, Some(700)), 200);
        assert_eq!(resolve_code(plain, Some(201)), 201);
        assert_eq!(resolve_code(plain, Some(418)), 418);
    }

    #[test]
    fn test_new_rejects_invalid_code() {
        assert_eq!(
            ControllerResponse::new("x", Some(199)).unwrap_err(),
            EnvelopeError::InvalidStatusCode(199)
        );
        assert!(ControllerResponse::new("x", Some(600)).is_err());
        assert!(ControllerResponse::new("x", Some(599)).is_ok());
        assert!(ControllerResponse::new("x", None).is_ok());
        assert!(ControllerResponse::default().with_code(100).is_err());
    }

    #[test]
    fn test_error_overrides_success_code() {
        let response = ControllerResponse::new("Internal Server Error", Some(200))
            .unwrap()
            .with_error(json!(["Something went wrong"]));
        assert_eq!(response.code(), 500);
        assert!(!response.to_json().success);
    }

    #[test]
    fn test_null_error_is_not_an_error() {
        let response = ControllerResponse::default().with_error(Value::Null);
        assert_eq!(response.code(), 200);
    }

    #[test]
    fn test_success_is_derived_from_code() {
        for response in [
            ControllerResponse::success(json!(1)),
            ControllerResponse::error(json!("bad")),
            ControllerResponse::redirect("https://a.b"),
            ControllerResponse::new("created", Some(201)).unwrap(),
            ControllerResponse::default(),
        ] {
            let body = response.to_json();
            assert_eq!(body.success, (200..300).contains(&response.code()));
            assert_eq!(body.code, Some(response.code()));
        }
    }

    #[test]
    fn test_error_factory_clamps_code() {
        let response = ControllerResponse::error_with(Some(json!(["x"])), 999, "Failed");
        assert_eq!(response.code(), 400);
        assert!(!response.to_json().success);

        let response = ControllerResponse::error_with(None, 404, "Not Found");
        assert_eq!(response.code(), 404);
        assert_eq!(response.message, "Not Found");
    }

    #[test]
    fn test_redirect_factory_clamps_code() {
        let response = ControllerResponse::redirect_with("https://a.b", 201);
        assert_eq!(response.code(), 302);
        assert_eq!(response.message, "Redirecting");

        let response = ControllerResponse::redirect_with("https://a.b", 301);
        assert_eq!(response.code(), 301);
    }

    #[test]
    fn test_success_factory_defaults() {
        let response = ControllerResponse::success(json!({"data": "Hello World"}))
            .with_meta(json!("pagination"))
            .with_message("Any friendly message");
        let body = response.to_json();
        assert!(body.success);
        assert_eq!(body.message, "Any friendly message");
        assert_eq!(body.meta, Some(json!("pagination")));
    }

    #[test]
    fn test_envelope_body_omits_missing_fields() {
        let mut body = ControllerResponse::success(json!([1, 2])).to_json();
        body.code = None;
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({"success": true, "message": "Success", "data": [1, 2]})
        );
    }

    #[test]
    fn test_stream_body_falls_back_to_data() {
        let mut response = ControllerResponse::default();
        response.is_stream = true;
        response.data = Some(json!("Hello World"));
        assert_eq!(response.stream_body(), Bytes::from("Hello World"));

        response.data = Some(json!({"a": 1}));
        assert_eq!(response.stream_body(), Bytes::from(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_stream_response_headers_and_body() {
        let response = ControllerResponse::stream("f.csv", "a,b\n1,2", Some("text/csv")).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=f.csv"
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"a,b\n1,2");
    }

    #[tokio::test]
    async fn test_redirect_response_sets_location() {
        let response = ControllerResponse::redirect_with("/elsewhere", 301).into_response();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/elsewhere");
    }

    #[tokio::test]
    async fn test_stream_file_type_defaults_to_octet_stream() {
        let response = ControllerResponse::stream("f.bin", "x", None);
        assert_eq!(response.file_type, "application/octet-stream");

        let response = response.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
    }

    async fn envelope(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_unsendable_file_name_becomes_500() {
        let response = ControllerResponse::stream("bad\nname.txt", "x", Some("text/plain"))
            .into_response_with(ResponseOptions { include_code: true });
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());

        let json = envelope(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Internal Server Error");
        assert_eq!(json["code"], 500);
    }

    #[tokio::test]
    async fn test_unsendable_redirect_url_becomes_500() {
        let response = ControllerResponse::redirect("/next\r\nSet-Cookie: a=b").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::LOCATION).is_none());

        let json = envelope(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Internal Server Error");
    }

    #[tokio::test]
    async fn test_json_response_code_in_body_is_optional() {
        let response = ControllerResponse::error(json!(["x"])).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert!(json.get("code").is_none());
        assert_eq!(json["success"], false);

        let response = ControllerResponse::error(json!(["x"]))
            .into_response_with(ResponseOptions { include_code: true });
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 400);
    }
}
