//! Delta protocol - the only sanctioned way to mutate a playbook
//!
//! A [`DeltaBatch`] is an ordered list of typed operations proposed by the
//! curator. The wire format is untrusted model output, so parsing is
//! tolerant: type tags match case-insensitively, unknown tags are skipped,
//! and metadata values coerce from numbers or numeric strings.

use serde_json::{json, Map, Value};
use tracing::debug;

use super::bullet::CounterMap;
use crate::error::ParseError;

/// One proposed edit. Each variant carries only the fields its semantics
/// need; apply sites match exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaOperation {
    /// Create a bullet, optionally with a caller-supplied id and initial
    /// counter values
    Add {
        section: String,
        content: String,
        bullet_id: Option<String>,
        metadata: CounterMap,
    },
    /// Rewrite content and/or overwrite counters of an existing bullet
    Update {
        bullet_id: String,
        content: Option<String>,
        metadata: CounterMap,
    },
    /// Increment counters of an existing bullet by the amounts in `metadata`
    Tag {
        bullet_id: String,
        metadata: CounterMap,
    },
    /// Delete a bullet
    Remove { bullet_id: String },
}

impl DeltaOperation {
    /// Parse one wire entry. Returns `None` for entries that can never
    /// apply: unknown type tags, or UPDATE/TAG/REMOVE without a target id.
    pub fn from_json(payload: &Map<String, Value>) -> Option<DeltaOperation> {
        let op_type = payload
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_uppercase)
            .unwrap_or_default();

        let section = payload
            .get("section")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let content = payload
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_string);
        let bullet_id = payload
            .get("bullet_id")
            .map(coerce_id)
            .filter(|id| !id.is_empty());
        let metadata = parse_counter_map(payload.get("metadata"));

        match op_type.as_str() {
            "ADD" => Some(DeltaOperation::Add {
                section,
                content: content.unwrap_or_default(),
                bullet_id,
                metadata,
            }),
            "UPDATE" => Some(DeltaOperation::Update {
                bullet_id: bullet_id?,
                content,
                metadata,
            }),
            "TAG" => Some(DeltaOperation::Tag {
                bullet_id: bullet_id?,
                metadata,
            }),
            "REMOVE" => Some(DeltaOperation::Remove {
                bullet_id: bullet_id?,
            }),
            other => {
                debug!(op_type = other, "skipping unknown delta operation type");
                None
            }
        }
    }

    /// Wire-format rendering, for audit trails and logs
    pub fn to_json(&self) -> Value {
        match self {
            DeltaOperation::Add {
                section,
                content,
                bullet_id,
                metadata,
            } => {
                let mut data = json!({ "type": "ADD", "section": section, "content": content });
                if let Some(id) = bullet_id {
                    data["bullet_id"] = json!(id);
                }
                if !metadata.is_empty() {
                    data["metadata"] = json!(metadata);
                }
                data
            }
            DeltaOperation::Update {
                bullet_id,
                content,
                metadata,
            } => {
                let mut data = json!({ "type": "UPDATE", "bullet_id": bullet_id });
                if let Some(content) = content {
                    data["content"] = json!(content);
                }
                if !metadata.is_empty() {
                    data["metadata"] = json!(metadata);
                }
                data
            }
            DeltaOperation::Tag {
                bullet_id,
                metadata,
            } => json!({ "type": "TAG", "bullet_id": bullet_id, "metadata": metadata }),
            DeltaOperation::Remove { bullet_id } => {
                json!({ "type": "REMOVE", "bullet_id": bullet_id })
            }
        }
    }
}

/// An ordered, best-effort batch of operations plus the curator's reasoning
/// (free text, never interpreted)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaBatch {
    pub reasoning: String,
    pub operations: Vec<DeltaOperation>,
}

impl DeltaBatch {
    pub fn new(reasoning: impl Into<String>, operations: Vec<DeltaOperation>) -> Self {
        Self {
            reasoning: reasoning.into(),
            operations,
        }
    }

    /// Parse a curator reply. `operations`, when present, must be an array;
    /// entries that are not objects or carry unusable type tags are skipped.
    pub fn from_json(payload: &Map<String, Value>) -> Result<DeltaBatch, ParseError> {
        let reasoning = payload
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut operations = Vec::new();
        match payload.get("operations") {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for item in items {
                    if let Some(entry) = item.as_object() {
                        if let Some(op) = DeltaOperation::from_json(entry) {
                            operations.push(op);
                        }
                    }
                }
            }
            Some(_) => {
                return Err(ParseError::Schema(
                    "operations must be an array".to_string(),
                ))
            }
        }

        Ok(DeltaBatch {
            reasoning,
            operations,
        })
    }

    pub fn to_json(&self) -> Value {
        json!({
            "reasoning": self.reasoning,
            "operations": self.operations.iter().map(DeltaOperation::to_json).collect::<Vec<_>>(),
        })
    }
}

/// Bullet ids sometimes arrive as numbers; stringify them
fn coerce_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Coerce a metadata object into counter-name -> i64, dropping anything
/// non-numeric
fn parse_counter_map(value: Option<&Value>) -> CounterMap {
    let mut map = CounterMap::new();
    if let Some(Value::Object(entries)) = value {
        for (key, value) in entries {
            let parsed = match value {
                Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
                Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
                _ => None,
            };
            if let Some(amount) = parsed {
                map.insert(key.clone(), amount);
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(raw: &str) -> Map<String, Value> {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_parse_add_with_case_insensitive_type() {
        let op = DeltaOperation::from_json(&obj(
            r#"{"type": "add", "section": "tips", "content": "beta", "bullet_id": "tips-123", "metadata": {"helpful": 2}}"#,
        ))
        .unwrap();

        match op {
            DeltaOperation::Add {
                section,
                content,
                bullet_id,
                metadata,
            } => {
                assert_eq!(section, "tips");
                assert_eq!(content, "beta");
                assert_eq!(bullet_id.as_deref(), Some("tips-123"));
                assert_eq!(metadata.get("helpful"), Some(&2));
            }
            other => panic!("expected Add, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_skips_unknown_type_and_missing_target() {
        assert!(DeltaOperation::from_json(&obj(r#"{"type": "MERGE", "section": "s"}"#)).is_none());
        assert!(DeltaOperation::from_json(&obj(r#"{"type": "REMOVE", "section": "s"}"#)).is_none());
    }

    #[test]
    fn test_metadata_coerces_numeric_strings() {
        let op = DeltaOperation::from_json(&obj(
            r#"{"type": "TAG", "bullet_id": "s-1", "metadata": {"helpful": "2", "harmful": 1.0, "note": "text"}}"#,
        ))
        .unwrap();
        match op {
            DeltaOperation::Tag { metadata, .. } => {
                assert_eq!(metadata.get("helpful"), Some(&2));
                assert_eq!(metadata.get("harmful"), Some(&1));
                assert!(!metadata.contains_key("note"));
            }
            other => panic!("expected Tag, got {:?}", other),
        }
    }

    #[test]
    fn test_batch_roundtrip() {
        let payload = obj(
            r#"{"reasoning": "merge overlapping tips", "operations": [
                {"type": "ADD", "section": "s", "content": "alpha"},
                {"type": "NOOP"},
                "not an object"
            ]}"#,
        );
        let batch = DeltaBatch::from_json(&payload).unwrap();
        assert_eq!(batch.reasoning, "merge overlapping tips");
        assert_eq!(batch.operations.len(), 1);

        let wire = batch.to_json();
        assert_eq!(wire["operations"][0]["type"], "ADD");
    }

    #[test]
    fn test_batch_rejects_non_array_operations() {
        let err = DeltaBatch::from_json(&obj(r#"{"reasoning": "", "operations": 5}"#)).unwrap_err();
        assert!(matches!(err, ParseError::Schema(_)));
    }
}
