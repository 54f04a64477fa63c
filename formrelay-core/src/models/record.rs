use chrono::{DateTime, Local};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Reserved first field holding the receipt time.
pub const TIMESTAMP_FIELD: &str = "data";

/// `YYYY-MM-DD HH:MM:SS.ffffff`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Ordered field map built from one relayed submission.
///
/// The timestamp field is always first. Submitted fields follow in the order
/// their key was first seen; a repeated key replaces the value in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    fields: Vec<(String, String)>,
}

impl DecodedRecord {
    pub fn new(received_at: DateTime<Local>) -> Self {
        Self {
            fields: vec![(
                TIMESTAMP_FIELD.to_string(),
                received_at.format(TIMESTAMP_FORMAT).to_string(),
            )],
        }
    }

    pub fn stamped_now() -> Self {
        Self::new(Local::now())
    }

    /// Insert a submitted field. Returns `false` when `key` is the reserved
    /// timestamp field, which is left untouched.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if key == TIMESTAMP_FIELD {
            return false;
        }
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
        true
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn timestamp(&self) -> &str {
        &self.fields[0].1
    }

    /// Number of fields, timestamp included.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Submitted fields only, in output order.
    pub fn submitted_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().skip(1)
    }
}

impl Serialize for DecodedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
