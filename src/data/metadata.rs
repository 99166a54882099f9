//! Free-text sample metadata as supplied by a repository record

use std::collections::HashMap;

use serde::{Deserialize, Serialize, Serializer};

/// Metadata of one sample: key -> ordered list of free-text values
///
/// Keys follow the repository's own vocabulary (for GEO SOFT records:
/// `title`, `characteristics_ch1`, `source_name_ch1`, ...). When
/// deserialized, a bare string value is accepted as a one-element list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "HashMap<String, MetadataValue>")]
pub struct SampleMetadata {
    fields: HashMap<String, Vec<String>>,
}

/// A metadata value as written in a record: one string or a list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    One(String),
    Many(Vec<String>),
}

impl From<HashMap<String, MetadataValue>> for SampleMetadata {
    fn from(raw: HashMap<String, MetadataValue>) -> Self {
        let fields = raw
            .into_iter()
            .map(|(k, v)| {
                let values = match v {
                    MetadataValue::One(s) => vec![s],
                    MetadataValue::Many(v) => v,
                };
                (k, values)
            })
            .collect();
        Self { fields }
    }
}

impl Serialize for SampleMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl SampleMetadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, values: &[&str]) -> Self {
        self.insert(key, values.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Set the values of a key, replacing any previous ones
    pub fn insert(&mut self, key: &str, values: Vec<String>) {
        self.fields.insert(key.to_string(), values);
    }

    /// Values of a key, if present
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.fields.get(key).map(|v| v.as_slice())
    }

    /// Whether a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_metadata() {
        let meta = SampleMetadata::new()
            .with("title", &["Control brain 1"])
            .with("characteristics_ch1", &["tissue: cortex", "disease state: normal"]);

        assert!(meta.contains_key("title"));
        assert_eq!(meta.get("characteristics_ch1").unwrap().len(), 2);
        assert!(meta.get("source_name_ch1").is_none());
    }

    #[test]
    fn test_deserialize_string_or_list() {
        let meta: SampleMetadata =
            serde_json::from_str(r#"{"title": "AD patient 3", "characteristics_ch1": ["age: 80", "sex: F"]}"#)
                .unwrap();
        assert_eq!(meta.get("title").unwrap(), &["AD patient 3".to_string()]);
        assert_eq!(meta.get("characteristics_ch1").unwrap().len(), 2);
    }
}
