use crate::config::Config;
use crate::error::{Error, Result};
use crate::query::Query;
use crate::resource::{id_from_value, Record, Resource, ID_FIELD};
use crate::transport::{HttpBackend, ReqwestBackend, Transport};
use tracing::{debug, info};

/// Entry point of the library: a base URL plus the transport every
/// resource operation goes through.
pub struct Client {
    base_url: String,
    transport: Transport,
}

impl Client {
    /// Client talking to `base_url` over blocking reqwest.
    pub fn new(base_url: &str) -> Result<Self> {
        let backend = ReqwestBackend::new()?;
        Ok(Self::with_backend(base_url, Box::new(backend)))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api.base_url)
    }

    /// Client over any backend, e.g. an in-memory one in tests.
    pub fn with_backend(base_url: &str, backend: Box<dyn HttpBackend>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport: Transport::new(backend),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn collection_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    pub fn item_url(&self, endpoint: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, endpoint, id)
    }

    pub fn content_url(&self, endpoint: &str, id: &str) -> String {
        format!("{}/{}/{}/content", self.base_url, endpoint, id)
    }

    pub fn query<R: Resource>(&self) -> Query<'_, R> {
        Query::new(self)
    }

    /// POST the metadata when the record has no identifier yet and keep the
    /// one the server assigns, PUT it to the item URL otherwise.
    pub(crate) fn save_record(
        &self,
        endpoint: &'static str,
        singular: &str,
        record: &mut Record,
    ) -> Result<()> {
        let payload = record.to_payload();

        match record.id().map(str::to_string) {
            None => {
                let data = self
                    .transport
                    .post_json(&self.collection_url(endpoint), &payload)?;
                let id = data
                    .get(singular)
                    .and_then(|created| created.get(ID_FIELD))
                    .map(id_from_value)
                    .transpose()?
                    .flatten()
                    .ok_or_else(|| {
                        Error::MalformedResponse(format!(
                            "create response has no {}.{}",
                            singular, ID_FIELD
                        ))
                    })?;
                info!(target: "resource", "Created {} {}", singular, id);
                record.assign_id(id);
            }
            Some(id) => {
                self.transport
                    .put_json(&self.item_url(endpoint, &id), &payload)?;
                debug!(target: "resource", "Updated {} {}", singular, id);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpRequest, HttpResponse};

    struct Unreachable;

    impl HttpBackend for Unreachable {
        fn execute(&self, _request: HttpRequest) -> Result<HttpResponse> {
            Err(Error::Transport {
                status: 503,
                reason: "Service Unavailable".to_string(),
            })
        }
    }

    #[test]
    fn test_urls_ignore_trailing_slash() {
        let client = Client::with_backend("http://store.local/api/v1/", Box::new(Unreachable));
        assert_eq!(client.base_url(), "http://store.local/api/v1");
        assert_eq!(
            client.collection_url("products"),
            "http://store.local/api/v1/products"
        );
        assert_eq!(
            client.item_url("products", "p1"),
            "http://store.local/api/v1/products/p1"
        );
        assert_eq!(
            client.content_url("products", "p1"),
            "http://store.local/api/v1/products/p1/content"
        );
    }

    #[test]
    fn test_failed_create_leaves_record_unsaved() {
        let client = Client::with_backend("http://store.local", Box::new(Unreachable));
        let mut record = Record::new();
        record.set_field("name", "x").unwrap();

        let err = client
            .save_record("products", "product", &mut record)
            .unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(record.id(), None);
    }
}
