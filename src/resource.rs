use crate::client::Client;
use crate::error::{Error, Result};
use crate::query::Query;
use serde::Serialize;
use serde_json::{Map, Value};

/// Fields starting with this prefix belong to the server (or to the client
/// itself) and are never part of the metadata sent on save.
pub const RESERVED_PREFIX: char = '_';
pub const ID_FIELD: &str = "_id";

/// Field storage shared by every resource kind.
///
/// `metadata` holds the open mapping that is persisted on save. `internal`
/// holds the `_`-prefixed fields received from the server, `_id` included,
/// so they can be read back but are never sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    id: Option<String>,
    metadata: Map<String, Value>,
    internal: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a server mapping. Anything but a JSON object is
    /// rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(Error::MalformedResponse(format!(
                    "expected a resource object, got {}",
                    other
                )))
            }
        };

        let mut record = Self::new();
        for (key, value) in map {
            if is_reserved(&key) {
                if key == ID_FIELD {
                    record.id = id_from_value(&value)?;
                }
                record.internal.insert(key, value);
            } else {
                record.metadata.insert(key, value);
            }
        }
        Ok(record)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Only the create path calls this; there is no public way to change an
    /// identifier once the server handed it out.
    pub(crate) fn assign_id(&mut self, id: String) {
        self.internal
            .insert(ID_FIELD.to_string(), Value::String(id.clone()));
        self.id = Some(id);
    }

    pub fn field(&self, name: &str) -> Result<&Value> {
        let source = if is_reserved(name) {
            &self.internal
        } else {
            &self.metadata
        };
        source
            .get(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }

    pub fn set_field<V: Serialize>(&mut self, name: &str, value: V) -> Result<()> {
        if is_reserved(name) {
            return Err(Error::ReservedField(name.to_string()));
        }
        let value = serde_json::to_value(value)?;
        self.metadata.insert(name.to_string(), value);
        Ok(())
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        self.metadata.remove(name)
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.metadata
    }

    /// Server-owned `_`-prefixed fields, `_id` included.
    pub fn internal(&self) -> &Map<String, Value> {
        &self.internal
    }

    /// A fresh, unsaved record with a copy of the metadata.
    pub fn detached(&self) -> Self {
        Self {
            id: None,
            metadata: self.metadata.clone(),
            internal: Map::new(),
        }
    }

    /// The body sent on create and update.
    pub fn to_payload(&self) -> Value {
        Value::Object(self.metadata.clone())
    }
}

fn is_reserved(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// Identifiers arrive as strings from most deployments but numeric ids are
/// accepted and rendered in decimal.
pub(crate) fn id_from_value(value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(Error::MalformedResponse(format!(
            "identifier must be a string or number, got {}",
            other
        ))),
    }
}

/// Behaviour shared by products and transformations.
///
/// Implementors only provide their endpoint names and access to their
/// [`Record`]; field access, persistence and querying come for free.
pub trait Resource: Sized {
    /// Collection path below the base URL.
    const ENDPOINT: &'static str;
    /// Key of the created object in a create response.
    const SINGULAR: &'static str;
    /// Key of the item list in a listing response.
    const PLURAL: &'static str;

    fn from_record(record: Record) -> Self;
    fn record(&self) -> &Record;
    fn record_mut(&mut self) -> &mut Record;

    fn from_value(value: Value) -> Result<Self> {
        Record::from_value(value).map(Self::from_record)
    }

    fn id(&self) -> Option<&str> {
        self.record().id()
    }

    fn field(&self, name: &str) -> Result<&Value> {
        self.record().field(name)
    }

    fn metadata(&self) -> &Map<String, Value> {
        self.record().metadata()
    }

    fn set_field<V: Serialize>(&mut self, name: &str, value: V) -> Result<&mut Self> {
        self.record_mut().set_field(name, value)?;
        Ok(self)
    }

    fn remove_field(&mut self, name: &str) -> Option<Value> {
        self.record_mut().remove_field(name)
    }

    /// Create on first save, update afterwards.
    fn save(&mut self, client: &Client) -> Result<()> {
        client.save_record(Self::ENDPOINT, Self::SINGULAR, self.record_mut())
    }

    /// New unsaved instance with the same metadata. Nothing mutable is
    /// shared with `self`.
    fn copy(&self) -> Self {
        Self::from_record(self.record().detached())
    }

    fn query(client: &Client) -> Query<'_, Self> {
        Query::new(client)
    }

    fn get(client: &Client, id: &str) -> Result<Self> {
        Self::query(client).filter([(ID_FIELD, id)]).first()
    }
}
