use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// A stored record: its id plus the remaining top-level fields
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: &str, fields: Map<String, Value>) -> Self {
        Self {
            id: id.to_string(),
            fields,
        }
    }

    /// Split a JSON row into id and fields. Numeric ids are accepted and
    /// kept as their decimal string.
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        let Value::Object(mut fields) = value else {
            return Err(StoreError::InvalidRecord(
                "expected a JSON object".to_string(),
            ));
        };
        let id = match fields.remove("id") {
            Some(Value::String(id)) => id,
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(StoreError::InvalidRecord(
                    "record has no id".to_string(),
                ))
            }
        };
        Ok(Self { id, fields })
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The document as one JSON object, `id` included
    pub fn to_value(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(object)
    }

    /// Decode into a typed record; the id is visible to the target as `id`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.to_value()).map_err(StoreError::from)
    }
}

/// Which documents a subscription matches
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    collection: String,
    equals: Vec<(String, Value)>,
}

impl Selector {
    /// Every document of `collection`
    pub fn all(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            equals: Vec::new(),
        }
    }

    /// Restrict to documents whose `field` equals `value`
    pub fn eq<T: Into<Value>>(mut self, field: &str, value: T) -> Self {
        self.equals.push((field.to_string(), value.into()));
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn is_unconditional(&self) -> bool {
        self.equals.is_empty()
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.equals.iter().all(|(field, expected)| {
            if field == "id" {
                expected.as_str() == Some(document.id.as_str())
            } else {
                document.get(field) == Some(expected)
            }
        })
    }

    /// PostgREST filter pairs, e.g. `("domain", "eq.Writing")`
    pub(crate) fn query_pairs(&self) -> Vec<(String, String)> {
        self.equals
            .iter()
            .map(|(field, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (field.clone(), format!("eq.{}", value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_requires_id() {
        assert!(Document::from_value(json!({"title": "x"})).is_err());
        assert!(Document::from_value(json!([1, 2])).is_err());

        let doc = Document::from_value(json!({"id": 7, "title": "x"})).unwrap();
        assert_eq!(doc.id, "7");
        assert_eq!(doc.get("title"), Some(&json!("x")));
        assert!(doc.get("id").is_none());
    }

    #[test]
    fn selector_matches_equality_constraints() {
        let doc = Document::from_value(json!({"id": "a", "domain": "Writing"})).unwrap();
        assert!(Selector::all("services").matches(&doc));
        assert!(Selector::all("services").eq("domain", "Writing").matches(&doc));
        assert!(!Selector::all("services").eq("domain", "Design").matches(&doc));
        assert!(Selector::all("services").eq("id", "a").matches(&doc));
    }

    #[test]
    fn selector_query_pairs() {
        let selector = Selector::all("services").eq("domain", "Writing").eq("rank", 3);
        assert_eq!(
            selector.query_pairs(),
            vec![
                ("domain".to_string(), "eq.Writing".to_string()),
                ("rank".to_string(), "eq.3".to_string())
            ]
        );
    }
}
