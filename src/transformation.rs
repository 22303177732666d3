use crate::error::Result;
use crate::product::Product;
use crate::resource::{id_from_value, Record, Resource};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::warn;

const INPUTS: &str = "inputs";
const OUTPUTS: &str = "outputs";

/// Reference to a product inside a transformation's `inputs`/`outputs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    #[serde(rename = "_id", deserialize_with = "lenient_id", default)]
    pub id: Option<String>,
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(&value).map_err(serde::de::Error::custom)
}

/// A processing step linking input products to output products.
///
/// Both lists live in the metadata and keep insertion order. Products are
/// referenced by whatever identifier they have when added, which is
/// `null` for a product that was never saved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transformation {
    record: Record,
}

impl Transformation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, product: &Product) -> &mut Self {
        self.append_ref(INPUTS, product)
    }

    pub fn add_output(&mut self, product: &Product) -> &mut Self {
        self.append_ref(OUTPUTS, product)
    }

    pub fn inputs(&self) -> Result<Vec<ProductRef>> {
        self.refs(INPUTS)
    }

    pub fn outputs(&self) -> Result<Vec<ProductRef>> {
        self.refs(OUTPUTS)
    }

    fn refs(&self, key: &str) -> Result<Vec<ProductRef>> {
        match self.record.metadata().get(key) {
            None => Ok(Vec::new()),
            Some(value) => Ok(serde_json::from_value(value.clone())?),
        }
    }

    fn append_ref(&mut self, key: &str, product: &Product) -> &mut Self {
        let reference = json!({ "_id": product.id() });
        let slot = self
            .record
            .metadata_mut()
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()));

        if !slot.is_array() {
            warn!(target: "resource", "Replacing non-list '{}' on transformation", key);
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(items) = slot {
            items.push(reference);
        }
        self
    }
}

impl Resource for Transformation {
    const ENDPOINT: &'static str = "transformations";
    const SINGULAR: &'static str = "transformation";
    const PLURAL: &'static str = "transformations";

    fn from_record(record: Record) -> Self {
        Self { record }
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }
}
