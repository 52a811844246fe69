//! Runtime record schemas built from a caller-supplied field list.
//!
//! The schema is plain data: an ordered map from field name to a
//! "required string" descriptor, wrapped as a list under [`LISTINGS_KEY`].
//! It renders to the two wire dialects the backends understand.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{ExtractionError, Result};

/// Key under which every backend is asked to return its records.
pub const LISTINGS_KEY: &str = "listings";

/// Ordered set of unique, non-empty field names.
///
/// Names are trimmed; repeats collapse onto the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldSpec(IndexSet<String>);

impl FieldSpec {
    /// Validate and collect field names.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fields = IndexSet::new();
        for (position, name) in names.into_iter().enumerate() {
            let name = name.as_ref().trim();
            if name.is_empty() {
                return Err(ExtractionError::input(format!(
                    "field name at position {} is empty",
                    position + 1
                )));
            }
            fields.insert(name.to_string());
        }

        if fields.is_empty() {
            return Err(ExtractionError::input("at least one field name is required"));
        }

        Ok(Self(fields))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a spec built by [`FieldSpec::new`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

/// Value type of an extracted field. Extraction output is always text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
}

/// Per-field descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
}

impl FieldDescriptor {
    pub const REQUIRED_STRING: Self = Self {
        field_type: FieldType::String,
        required: true,
    };
}

/// Shape of one extracted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSchema {
    fields: IndexMap<String, FieldDescriptor>,
}

impl RecordSchema {
    pub fn fields(&self) -> &IndexMap<String, FieldDescriptor> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// A list of records under [`LISTINGS_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSchema {
    key: &'static str,
    record: RecordSchema,
}

impl CollectionSchema {
    pub fn key(&self) -> &str {
        self.key
    }

    pub fn record(&self) -> &RecordSchema {
        &self.record
    }

    /// JSON Schema for OpenAI strict structured outputs.
    ///
    /// Strict mode rejects open objects, so every object is closed and lists
    /// all of its properties as required.
    pub fn to_json_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .record
            .field_names()
            .map(|name| (name.to_string(), json!({ "type": "string" })))
            .collect();
        let required: Vec<&str> = self.required_fields().collect();

        json!({
            "type": "object",
            "properties": {
                self.key: {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": properties,
                        "required": required,
                        "additionalProperties": false,
                    },
                },
            },
            "required": [self.key],
            "additionalProperties": false,
        })
    }

    /// `responseSchema` in Gemini's OpenAPI subset.
    ///
    /// Gemini orders generated properties alphabetically unless told
    /// otherwise, so `propertyOrdering` pins them to field order.
    pub fn to_gemini_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .record
            .field_names()
            .map(|name| (name.to_string(), json!({ "type": "STRING" })))
            .collect();
        let required: Vec<&str> = self.required_fields().collect();
        let ordering: Vec<&str> = self.record.field_names().collect();

        json!({
            "type": "OBJECT",
            "properties": {
                self.key: {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": properties,
                        "required": required,
                        "propertyOrdering": ordering,
                    },
                },
            },
            "required": [self.key],
        })
    }

    fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.record
            .fields
            .iter()
            .filter(|(_, descriptor)| descriptor.required)
            .map(|(name, _)| name.as_str())
    }
}

/// Build the record schema and its collection wrapper for `fields`.
pub fn build_schema(fields: &FieldSpec) -> (RecordSchema, CollectionSchema) {
    let record = RecordSchema {
        fields: fields
            .iter()
            .map(|name| (name.to_string(), FieldDescriptor::REQUIRED_STRING))
            .collect(),
    };
    let collection = CollectionSchema {
        key: LISTINGS_KEY,
        record: record.clone(),
    };
    (record, collection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_spec_collapses_duplicates_in_first_seen_order() {
        let spec = FieldSpec::new(["price", "name", "price", " name ", "rating"]).unwrap();
        assert_eq!(spec.to_vec(), vec!["price", "name", "rating"]);
    }

    #[test]
    fn test_field_spec_rejects_empty_list() {
        let err = FieldSpec::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, ExtractionError::Input { .. }));
    }

    #[test]
    fn test_field_spec_rejects_blank_name() {
        let err = FieldSpec::new(["name", "   "]).unwrap_err();
        match err {
            ExtractionError::Input { reason } => assert!(reason.contains("position 2")),
            other => panic!("expected input error, got {:?}", other),
        }
    }

    #[test]
    fn test_build_schema_one_required_string_per_field() {
        let spec = FieldSpec::new(["title", "price", "title"]).unwrap();
        let (record, collection) = build_schema(&spec);

        assert_eq!(record.len(), 2);
        assert!(record
            .fields()
            .values()
            .all(|d| *d == FieldDescriptor::REQUIRED_STRING));
        assert_eq!(collection.key(), "listings");
        assert_eq!(collection.record(), &record);
    }

    #[test]
    fn test_build_schema_is_deterministic() {
        let spec = FieldSpec::new(["a", "b"]).unwrap();
        assert_eq!(build_schema(&spec), build_schema(&spec));
    }

    #[test]
    fn test_json_schema_is_strict() {
        let spec = FieldSpec::new(["name", "price"]).unwrap();
        let (_, collection) = build_schema(&spec);
        let schema = collection.to_json_schema();

        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["required"], json!(["listings"]));

        let items = &schema["properties"]["listings"]["items"];
        assert_eq!(items["additionalProperties"], false);
        assert_eq!(items["required"], json!(["name", "price"]));
        assert_eq!(items["properties"]["price"]["type"], "string");
    }

    #[test]
    fn test_gemini_schema_pins_property_order() {
        let spec = FieldSpec::new(["zeta", "alpha"]).unwrap();
        let (_, collection) = build_schema(&spec);
        let schema = collection.to_gemini_schema();

        let items = &schema["properties"]["listings"]["items"];
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(items["type"], "OBJECT");
        assert_eq!(items["propertyOrdering"], json!(["zeta", "alpha"]));
        assert_eq!(items["properties"]["alpha"]["type"], "STRING");
    }

    #[test]
    fn test_schema_serializes() {
        let spec = FieldSpec::new(["name"]).unwrap();
        let (record, _) = build_schema(&spec);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({"fields": {"name": {"type": "string", "required": true}}})
        );
    }
}
