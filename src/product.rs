use crate::client::Client;
use crate::error::{Error, Result};
use crate::resource::{Record, Resource};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// A stored product: metadata plus a binary payload that lives at its own
/// `content` endpoint.
///
/// The payload is fetched on first read and cached. Assigning new content
/// marks it dirty; the next `save` (or `save_content`) uploads it.
#[derive(Debug, Clone, Default)]
pub struct Product {
    record: Record,
    content: Option<Vec<u8>>,
    content_dirty: bool,
}

impl Product {
    pub const CONTENT_FIELD: &'static str = "content";

    pub fn new() -> Self {
        Self::default()
    }

    /// Cached content, fetching it on first access.
    pub fn content(&mut self, client: &Client) -> Result<&[u8]> {
        if self.content.is_none() {
            let id = self.record.id().ok_or(Error::Unsaved {
                endpoint: Self::ENDPOINT,
            })?;
            let url = client.content_url(Self::ENDPOINT, id);
            let response = client.transport().get_binary(&url)?;
            debug!(target: "product", "Fetched {} bytes from {}", response.body.len(), url);
            self.content = Some(response.body);
            self.content_dirty = false;
        }
        Ok(self.content.as_deref().unwrap_or_default())
    }

    /// Content already held in memory, without touching the network.
    pub fn cached_content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    pub fn set_content(&mut self, content: impl Into<Vec<u8>>) -> &mut Self {
        self.content = Some(content.into());
        self.content_dirty = true;
        self
    }

    pub fn is_content_dirty(&self) -> bool {
        self.content_dirty
    }

    /// Upload pending content without saving metadata. Does nothing when
    /// the content is clean.
    pub fn save_content(&mut self, client: &Client) -> Result<()> {
        if !self.content_dirty {
            return Ok(());
        }
        let id = self.record.id().ok_or(Error::Unsaved {
            endpoint: Self::ENDPOINT,
        })?;
        let url = client.content_url(Self::ENDPOINT, id);
        let data = self.content.clone().unwrap_or_default();
        let size = data.len();
        client.transport().post_binary(&url, data)?;
        debug!(target: "product", "Uploaded {} bytes to {}", size, url);
        self.content_dirty = false;
        Ok(())
    }
}

impl Resource for Product {
    const ENDPOINT: &'static str = "products";
    const SINGULAR: &'static str = "product";
    const PLURAL: &'static str = "products";

    /// A `content` key in the mapping is never metadata: it becomes the
    /// product's pending content (strings as UTF-8, anything else as JSON
    /// text) and is uploaded by the next save.
    fn from_record(mut record: Record) -> Self {
        let content = record
            .metadata_mut()
            .remove(Self::CONTENT_FIELD)
            .map(|value| match value {
                Value::String(s) => s.into_bytes(),
                other => other.to_string().into_bytes(),
            });
        let content_dirty = content.is_some();
        Self {
            record,
            content,
            content_dirty,
        }
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn set_field<V: Serialize>(&mut self, name: &str, value: V) -> Result<&mut Self> {
        if name == Self::CONTENT_FIELD {
            return Err(Error::ReservedField(name.to_string()));
        }
        self.record.set_field(name, value)?;
        Ok(self)
    }

    fn save(&mut self, client: &Client) -> Result<()> {
        client.save_record(Self::ENDPOINT, Self::SINGULAR, &mut self.record)?;
        self.save_content(client)
    }
}
