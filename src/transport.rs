use crate::error::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

const JSON_CONTENT_TYPE: &str = "application/json";
const BINARY_CONTENT_TYPE: &str = "application/octet-stream";
const USER_AGENT: &str = concat!("radstore-client/", env!("CARGO_PKG_VERSION"));

/// A single outgoing HTTP request, already resolved to an absolute URL.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub content_type: Option<&'static str>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: &str) -> Self {
        Self {
            method,
            url: url.to_string(),
            query: Vec::new(),
            content_type: None,
            body: None,
        }
    }

    /// Body as UTF-8 text, for logging and assertions.
    pub fn body_text(&self) -> Option<&str> {
        self.body
            .as_deref()
            .and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// Raw response as returned by the backend, before any envelope handling.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Only the 2xx range counts as success.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The seam between the resource model and the network.
pub trait HttpBackend {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Blocking reqwest implementation used outside of tests.
pub struct ReqwestBackend {
    client: reqwest::blocking::Client,
}

impl ReqwestBackend {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

impl HttpBackend for ReqwestBackend {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(request.method, request.url.as_str());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(content_type) = request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send()?;
        let status = response.status();
        let reason = status.canonical_reason().unwrap_or_default().to_string();
        let body = response.bytes()?.to_vec();

        Ok(HttpResponse {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: Value,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: Option<String>,
}

/// JSON and binary request helpers sharing one backend.
///
/// Every JSON call goes through the same envelope check: the HTTP status
/// must be ok, the body must parse as `{"status": "ok", "data": ...}`, and
/// the `data` member is handed back. `get_binary` only checks the status.
pub struct Transport {
    backend: Box<dyn HttpBackend>,
}

impl Transport {
    pub fn new(backend: Box<dyn HttpBackend>) -> Self {
        Self { backend }
    }

    pub fn post_json(&self, url: &str, data: &Value) -> Result<Value> {
        let request = json_request(Method::POST, url, data)?;
        unwrap_envelope(self.send(request)?)
    }

    pub fn put_json(&self, url: &str, data: &Value) -> Result<Value> {
        let request = json_request(Method::PUT, url, data)?;
        unwrap_envelope(self.send(request)?)
    }

    pub fn post_binary(&self, url: &str, data: Vec<u8>) -> Result<Value> {
        let mut request = HttpRequest::new(Method::POST, url);
        request.content_type = Some(BINARY_CONTENT_TYPE);
        request.body = Some(data);
        unwrap_envelope(self.send(request)?)
    }

    pub fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value> {
        let mut request = HttpRequest::new(Method::GET, url);
        request.query = query.to_vec();
        unwrap_envelope(self.send(request)?)
    }

    pub fn get_binary(&self, url: &str) -> Result<HttpResponse> {
        let response = self.send(HttpRequest::new(Method::GET, url))?;
        check_status(&response)?;
        Ok(response)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(target: "transport", "{} {}", request.method, request.url);
        self.backend.execute(request).map_err(|e| {
            warn!(target: "transport", "request failed: {}", e);
            e
        })
    }
}

fn json_request(method: Method, url: &str, data: &Value) -> Result<HttpRequest> {
    let mut request = HttpRequest::new(method, url);
    request.content_type = Some(JSON_CONTENT_TYPE);
    request.body = Some(serde_json::to_vec(data)?);
    Ok(request)
}

fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_ok() {
        return Ok(());
    }
    warn!(target: "transport", "HTTP {} {}", response.status, response.reason);
    Err(Error::Transport {
        status: response.status,
        reason: response.reason.clone(),
    })
}

pub(crate) fn unwrap_envelope(response: HttpResponse) -> Result<Value> {
    check_status(&response)?;

    let envelope: Envelope = serde_json::from_slice(&response.body)?;
    let status = match envelope.status {
        Value::String(s) => s,
        other => other.to_string(),
    };
    if status != "ok" {
        let message = envelope.message.unwrap_or_default();
        warn!(target: "transport", "server reported {}: {}", status, message);
        return Err(Error::Api { status, message });
    }

    Ok(envelope.data)
}
