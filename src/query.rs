use crate::client::Client;
use crate::error::{Error, Result};
use crate::resource::Resource;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use tracing::debug;

/// Filter and pagination builder for one resource kind.
///
/// Builders consume and return the query, executors borrow it, so one
/// query can be run several times (`count()` then `all()`).
pub struct Query<'c, R> {
    client: &'c Client,
    params: Map<String, Value>,
    offset: Option<u64>,
    limit: Option<u64>,
    _resource: PhantomData<fn() -> R>,
}

impl<'c, R: Resource> Query<'c, R> {
    pub fn new(client: &'c Client) -> Self {
        Self {
            client,
            params: Map::new(),
            offset: None,
            limit: None,
            _resource: PhantomData,
        }
    }

    /// Merge criteria into the filter; a key given twice keeps the last value.
    pub fn filter<I, K, V>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in criteria {
            self.params.insert(key.into(), value.into());
        }
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Effective filter criteria, before flattening.
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Query-string pairs for a request with the given limit.
    pub fn query_pairs(&self, limit: Option<u64>) -> Vec<(String, String)> {
        let mut pairs = flatten_params(&self.params);
        if let Some(limit) = limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        pairs
    }

    /// Matching resources. Items are only turned into `R` as the iterator
    /// is advanced.
    pub fn all(&self) -> Result<impl Iterator<Item = Result<R>>> {
        let data = self.get_list(self.limit)?;
        let items = take_items(data, R::PLURAL)?;
        Ok(items.into_iter().map(R::from_value))
    }

    /// First match, asking the server for a single item.
    pub fn first(&self) -> Result<R> {
        let data = self.get_list(Some(1))?;
        let item = take_items(data, R::PLURAL)?
            .into_iter()
            .next()
            .ok_or(Error::EmptyResult {
                endpoint: R::ENDPOINT,
            })?;
        R::from_value(item)
    }

    pub fn count(&self) -> Result<u64> {
        let data = self.get_list(self.limit)?;
        data.get("count").and_then(Value::as_u64).ok_or_else(|| {
            Error::MalformedResponse(format!("{} listing has no count", R::ENDPOINT))
        })
    }

    pub fn exists(&self) -> Result<bool> {
        Ok(self.count()? > 0)
    }

    fn get_list(&self, limit: Option<u64>) -> Result<Value> {
        let url = self.client.collection_url(R::ENDPOINT);
        let pairs = self.query_pairs(limit);
        debug!(target: "query", "{} with {:?}", url, pairs);
        self.client.transport().get_json(&url, &pairs)
    }
}

fn take_items(data: Value, key: &str) -> Result<Vec<Value>> {
    match data {
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(Error::MalformedResponse(format!(
                "'{}' should be a list, got {}",
                key, other
            ))),
            None => Err(Error::MalformedResponse(format!(
                "listing has no '{}'",
                key
            ))),
        },
        other => Err(Error::MalformedResponse(format!(
            "listing data should be an object, got {}",
            other
        ))),
    }
}

/// Turn filter criteria into query-string pairs.
///
/// Nested objects become dotted keys (`{"meta": {"x": 1}}` gives
/// `meta.x=1`), arrays repeat their key once per element and nulls are
/// dropped. Strings go out verbatim, other scalars in JSON text form.
pub fn flatten_params(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        flatten_value(key.clone(), value, &mut pairs);
    }
    pairs
}

fn flatten_value(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (sub_key, sub_value) in map {
                flatten_value(format!("{}.{}", key, sub_key), sub_value, pairs);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten_value(key.clone(), item, pairs);
            }
        }
        Value::Null => {}
        Value::String(s) => pairs.push((key, s.clone())),
        other => pairs.push((key, other.to_string())),
    }
}
