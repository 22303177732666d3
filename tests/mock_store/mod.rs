//! In-memory stand-in for the radstore API, shared by the integration tests.
//!
//! Records every request, simulates the products/transformations
//! collections and their content endpoints, and can be told to answer the
//! next request with a canned response instead.
#![allow(dead_code)]

use radstore_client::{Client, HttpBackend, HttpRequest, HttpResponse, Result};
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

pub const BASE_URL: &str = "http://radstore.test/api/v1";

#[derive(Default)]
struct StoreState {
    requests: Vec<HttpRequest>,
    scripted: VecDeque<HttpResponse>,
    collections: HashMap<String, Vec<Map<String, Value>>>,
    contents: HashMap<String, Vec<u8>>,
    next_id: u32,
}

#[derive(Clone, Default)]
pub struct MockStore {
    state: Rc<RefCell<StoreState>>,
}

fn singular(endpoint: &str) -> &str {
    endpoint.strip_suffix('s').unwrap_or(endpoint)
}

fn content_key(endpoint: &str, id: &str) -> String {
    format!("{}/{}", endpoint, id)
}

fn raw(status: u16, reason: &str, body: Vec<u8>) -> HttpResponse {
    HttpResponse {
        status,
        reason: reason.to_string(),
        body,
    }
}

fn envelope(data: Value) -> HttpResponse {
    raw(200, "OK", json!({"status": "ok", "data": data}).to_string().into_bytes())
}

fn keyed(key: &str, item: Map<String, Value>) -> Value {
    let mut data = Map::new();
    data.insert(key.to_string(), Value::Object(item));
    Value::Object(data)
}

fn not_found() -> HttpResponse {
    raw(404, "Not Found", b"{\"status\":\"error\"}".to_vec())
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn lookup<'a>(item: &'a Map<String, Value>, dotted: &str) -> Option<&'a Value> {
    let mut parts = dotted.split('.');
    let mut current = item.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&self) -> Client {
        Client::with_backend(BASE_URL, Box::new(self.clone()))
    }

    /// Put an item straight into a collection. It must carry its `_id`.
    pub fn seed(&self, endpoint: &str, item: Value) {
        let item = match item {
            Value::Object(map) => map,
            _ => panic!("seeded items must be objects"),
        };
        self.state
            .borrow_mut()
            .collections
            .entry(endpoint.to_string())
            .or_default()
            .push(item);
    }

    pub fn seed_content(&self, endpoint: &str, id: &str, content: &[u8]) {
        self.state
            .borrow_mut()
            .contents
            .insert(content_key(endpoint, id), content.to_vec());
    }

    /// Answer the next request with this status and body, whatever it is.
    pub fn respond_with(&self, status: u16, reason: &str, body: &str) {
        self.state
            .borrow_mut()
            .scripted
            .push_back(raw(status, reason, body.as_bytes().to_vec()));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.borrow().requests.clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.state
            .borrow()
            .requests
            .last()
            .cloned()
            .expect("no request was made")
    }

    /// Requests with this method whose URL is `BASE_URL` + `path`.
    pub fn count_requests(&self, method: &str, path: &str) -> usize {
        let url = format!("{}{}", BASE_URL, path);
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|r| r.method.as_str() == method && r.url == url)
            .count()
    }

    pub fn stored(&self, endpoint: &str, id: &str) -> Option<Value> {
        self.state
            .borrow()
            .collections
            .get(endpoint)?
            .iter()
            .find(|item| item.get("_id") == Some(&Value::String(id.to_string())))
            .cloned()
            .map(Value::Object)
    }

    pub fn content_of(&self, endpoint: &str, id: &str) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .contents
            .get(&content_key(endpoint, id))
            .cloned()
    }

    fn list(state: &StoreState, endpoint: &str, query: &[(String, String)]) -> HttpResponse {
        let mut limit = None;
        let mut offset = 0usize;
        let mut filters: Vec<(&str, &str)> = Vec::new();
        for (key, value) in query {
            match key.as_str() {
                "limit" => limit = value.parse::<usize>().ok(),
                "offset" => offset = value.parse::<usize>().unwrap_or(0),
                _ => filters.push((key.as_str(), value.as_str())),
            }
        }

        let matched: Vec<&Map<String, Value>> = state
            .collections
            .get(endpoint)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| {
                        filters.iter().all(|(key, expected)| {
                            lookup(item, key).map(render).as_deref() == Some(*expected)
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let count = matched.len();
        let page: Vec<Value> = matched
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .map(Value::Object)
            .collect();

        let mut data = Map::new();
        data.insert(endpoint.to_string(), Value::Array(page));
        data.insert("count".to_string(), json!(count));
        envelope(Value::Object(data))
    }

    fn create(state: &mut StoreState, endpoint: &str, body: &[u8]) -> HttpResponse {
        let mut item: Map<String, Value> = match serde_json::from_slice(body) {
            Ok(item) => item,
            Err(_) => return raw(400, "Bad Request", Vec::new()),
        };
        state.next_id += 1;
        let id = format!("{}-{}", singular(endpoint), state.next_id);
        item.insert("_id".to_string(), Value::String(id));
        state
            .collections
            .entry(endpoint.to_string())
            .or_default()
            .push(item.clone());
        envelope(keyed(singular(endpoint), item))
    }

    fn update(state: &mut StoreState, endpoint: &str, id: &str, body: &[u8]) -> HttpResponse {
        let mut replacement: Map<String, Value> = match serde_json::from_slice(body) {
            Ok(item) => item,
            Err(_) => return raw(400, "Bad Request", Vec::new()),
        };
        replacement.insert("_id".to_string(), Value::String(id.to_string()));

        let items = state.collections.entry(endpoint.to_string()).or_default();
        match items
            .iter_mut()
            .find(|item| item.get("_id") == Some(&Value::String(id.to_string())))
        {
            Some(item) => {
                *item = replacement.clone();
                envelope(keyed(singular(endpoint), replacement))
            }
            None => not_found(),
        }
    }
}

impl HttpBackend for MockStore {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut state = self.state.borrow_mut();
        state.requests.push(request.clone());

        if let Some(response) = state.scripted.pop_front() {
            return Ok(response);
        }

        let path = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .trim_start_matches('/');
        let parts: Vec<&str> = path.split('/').collect();
        let body = request.body.clone().unwrap_or_default();

        let response = match (request.method.as_str(), parts.as_slice()) {
            ("GET", [endpoint]) => Self::list(&state, endpoint, &request.query),
            ("POST", [endpoint]) => Self::create(&mut state, endpoint, &body),
            ("PUT", [endpoint, id]) => Self::update(&mut state, endpoint, id, &body),
            ("GET", [endpoint, id, "content"]) => {
                match state.contents.get(&content_key(endpoint, id)) {
                    Some(content) => raw(200, "OK", content.clone()),
                    None => not_found(),
                }
            }
            ("POST", [endpoint, id, "content"]) => {
                state.contents.insert(content_key(endpoint, id), body);
                envelope(json!({}))
            }
            _ => not_found(),
        };

        Ok(response)
    }
}
