/* armoire/src/api_client.rs

Single chokepoint for every request to the commerce backend.

- Exactly one place builds URLs, attaches the bearer token and classifies
  responses; domain services never touch reqwest directly.
- The in-memory token lives in a CurrentToken cell shared with the session
  manager. It is read at the moment a call is dispatched, so a token swap
  between two in-flight calls affects only calls dispatched afterwards.
- Responses are buffered and classified into ApiBody: JSON when the
  content-type says so and the body parses, raw text otherwise, Empty for
  blank or unparseable-JSON bodies. Non-2xx always carries the classified
  body inside ApiError::Status so callers can read backend messages.
- No retries and no auth-failure side effects here; a 401 is returned to the
  caller like any other status.

*/

use std::sync::{Arc, RwLock};

use http::Method;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::config::ClientConfig;
use crate::util;

// ==============================
// Current token cell
// ==============================

/// Shared handle to the in-memory bearer token.
///
/// Reads are open to the whole crate; writes are reserved to the session
/// manager, which is the only component that may change authentication state.
#[derive(Clone, Default)]
pub struct CurrentToken(Arc<RwLock<Option<String>>>);

impl CurrentToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the token at this instant.
    pub fn get(&self) -> Option<String> {
        self.0.read().expect("token lock").clone()
    }

    pub fn is_set(&self) -> bool {
        self.0.read().expect("token lock").is_some()
    }

    pub(crate) fn set(&self, token: Option<String>) {
        *self.0.write().expect("token lock") = token;
    }
}

// ==============================
// Request & response shapes
// ==============================

/// Body attached to an outgoing call. Content-type handling follows the
/// variant: JSON and form encode themselves, multipart sets its boundary.
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
    Multipart(reqwest::multipart::Form),
}

impl Default for RequestBody {
    fn default() -> Self {
        RequestBody::Empty
    }
}

/// Per-call options: extra headers plus the body.
#[derive(Default)]
pub struct RequestCall {
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl RequestCall {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self {
            body: RequestBody::Json(value),
            ..Default::default()
        }
    }

    pub fn form(fields: Vec<(String, String)>) -> Self {
        Self {
            body: RequestBody::Form(fields),
            ..Default::default()
        }
    }

    pub fn multipart(form: reqwest::multipart::Form) -> Self {
        Self {
            body: RequestBody::Multipart(form),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Classified response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    Json(serde_json::Value),
    Text(String),
    Empty,
}

impl ApiBody {
    fn kind(&self) -> &'static str {
        match self {
            ApiBody::Json(_) => "json",
            ApiBody::Text(_) => "text",
            ApiBody::Empty => "empty",
        }
    }

    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            ApiBody::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Deserialize the JSON body into `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            ApiBody::Json(value) => {
                serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
            }
            other => Err(ApiError::Decode(format!(
                "Expected JSON body, got {}",
                other.kind()
            ))),
        }
    }

    /// Like [`into_json`](Self::into_json), but unwraps a `{ "data": ... }`
    /// envelope first when the backend chose to wrap the record.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            ApiBody::Json(value) => {
                let value = match value {
                    serde_json::Value::Object(mut map) if map.contains_key("data") => {
                        map.remove("data").unwrap_or(serde_json::Value::Null)
                    }
                    other => other,
                };
                serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
            }
            other => Err(ApiError::Decode(format!(
                "Expected JSON body, got {}",
                other.kind()
            ))),
        }
    }

    /// Human-readable message the backend put in the body, if any.
    pub fn message(&self) -> Option<String> {
        let value = self.as_value()?;
        for field in ["message", "detail"] {
            if let Some(text) = value.get(field).and_then(|v| v.as_str()) {
                return Some(text.to_string());
            }
        }
        None
    }
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (DNS, connect, timeout...).
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// The backend answered with a non-2xx status; the classified body rides
    /// along for error-message extraction.
    #[error("API returned HTTP {status}")]
    Status { status: u16, body: ApiBody },
    /// A 2xx body did not match the shape the caller asked for.
    #[error("Response decode failure: {0}")]
    Decode(String),
    /// The call was rejected before it was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Best message for surfacing to an operator: the backend's own message
    /// when present, else the canonical reason phrase for the status.
    pub fn message(&self) -> String {
        match self {
            ApiError::Status { status, body } => body.message().unwrap_or_else(|| {
                http::StatusCode::from_u16(*status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {status}"))
            }),
            other => other.to_string(),
        }
    }
}

// ==============================
// Client
// ==============================

/// HTTP client bound to one backend origin.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    token: CurrentToken,
}

impl ApiClient {
    /// Build a client from configuration, honoring the configured timeout.
    pub fn new(cfg: &ClientConfig, token: CurrentToken) -> Self {
        let mut builder = reqwest::Client::builder()
            .user_agent(format!("armoire/{}", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = cfg.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().unwrap_or_else(|_| reqwest::Client::new());
        Self::with_http_client(cfg, token, http)
    }

    /// Use an externally constructed reqwest client (proxies, certs, tests).
    pub fn with_http_client(
        cfg: &ClientConfig,
        token: CurrentToken,
        http: reqwest::Client,
    ) -> Self {
        Self {
            base_url: cfg.base_url.clone(),
            http,
            token,
        }
    }

    /// Read handle to the shared token cell.
    pub fn current_token(&self) -> &CurrentToken {
        &self.token
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Dispatch one call. `path` is joined onto the base URL and may carry a
    /// query string. 2xx yields the classified body; anything else is an
    /// [`ApiError::Status`] carrying the classified body.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        call: RequestCall,
    ) -> Result<ApiBody, ApiError> {
        let url = self.endpoint_url(path);
        let request_id = util::request_id();
        let token = self.token.get();
        let has_bearer = token.is_some();
        debug!(%method, path, has_bearer, request_id = %request_id, "Dispatching API call");

        let mut rb = self
            .http
            .request(method, &url)
            .header("x-request-id", request_id.as_str());
        if let Some(tok) = token {
            rb = rb.bearer_auth(tok);
        }
        for (name, value) in &call.headers {
            rb = rb.header(name.as_str(), value.as_str());
        }
        rb = match call.body {
            RequestBody::Empty => rb,
            RequestBody::Json(value) => rb.json(&value),
            RequestBody::Form(fields) => rb.form(&fields),
            RequestBody::Multipart(form) => rb.multipart(form),
        };

        let resp = rb.send().await?;
        let status = resp.status();
        let is_json = resp
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);
        let text = resp.text().await?;

        let body = if is_json {
            // An unparseable JSON body downgrades to Empty rather than erroring.
            match serde_json::from_str(&text) {
                Ok(value) => ApiBody::Json(value),
                Err(_) => ApiBody::Empty,
            }
        } else if text.is_empty() {
            ApiBody::Empty
        } else {
            ApiBody::Text(text)
        };

        debug!(
            status = status.as_u16(),
            body = body.kind(),
            request_id = %request_id,
            "API call completed"
        );

        if status.is_success() {
            Ok(body)
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
