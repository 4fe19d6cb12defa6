//! Raw records and the normalizer that flattens them

use serde_json::{Map, Value};

/// Field map of one upstream object
pub type Fields = Map<String, Value>;

/// One flat record, as handed out of the extraction engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record(Fields);

impl Record {
    pub fn new(fields: Fields) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Fields {
        &self.0
    }

    pub fn into_fields(self) -> Fields {
        self.0
    }
}

impl From<Fields> for Record {
    fn from(fields: Fields) -> Self {
        Self(fields)
    }
}

/// Which fields of an upstream review carry identity, nesting and bulk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordShape {
    /// Unique identifier used for deduplication
    pub id_field: String,
    /// Sub-mapping merged into the top level
    pub nested_field: String,
    /// Fields removed before the record leaves the engine
    pub dropped_fields: Vec<String>,
}

impl Default for RecordShape {
    /// Steam review: `recommendationid`, nested `author`, `review` text dropped
    fn default() -> Self {
        Self {
            id_field: "recommendationid".to_string(),
            nested_field: "author".to_string(),
            dropped_fields: vec!["review".to_string()],
        }
    }
}

impl RecordShape {
    /// Flatten one raw object.
    ///
    /// Every key of the nested mapping is moved to the top level and wins on
    /// collision; dropped fields are removed. A nested value that is not an
    /// object stays where it is.
    pub fn normalize(&self, mut raw: Fields) -> Record {
        for field in &self.dropped_fields {
            raw.remove(field);
        }
        match raw.remove(&self.nested_field) {
            Some(Value::Object(nested)) => {
                for (key, value) in nested {
                    raw.insert(key, value);
                }
            }
            Some(other) => {
                raw.insert(self.nested_field.clone(), other);
            }
            None => {}
        }
        Record(raw)
    }

    /// Identifier of a record, if present. Numbers are accepted and
    /// rendered in decimal so `"42"` and `42` collide.
    pub fn id_of(&self, record: &Record) -> Option<String> {
        match record.get(&self.id_field)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
