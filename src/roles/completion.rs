//! Shared validated-completion helper
//!
//! All three roles follow the same discipline: call the provider, coerce the
//! reply into a strict schema, and on failure retry with a corrective suffix
//! appended to the base prompt. Implemented once here so the retry policy
//! cannot drift between roles.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{EngineError, ParseError, Role};
use crate::llm::{CompletionClient, CompletionOptions};

use super::prompts::RETRY_SUFFIX;

/// Default attempt budget shared by all roles
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Parse a reply as a single JSON object; arrays and primitives are
/// transient parse failures.
pub(crate) fn parse_json_object(text: &str) -> Result<Map<String, Value>, ParseError> {
    let value: Value = serde_json::from_str(text.trim())?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ParseError::NotAnObject),
    }
}

/// Read a string field. Numbers and bools stringify; absent/null and
/// structured values coerce to empty.
pub(crate) fn string_field(map: &Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

/// Call the provider and decode the reply, retrying on transient parse
/// failures up to `max_retries` attempts.
///
/// Provider errors are terminal immediately - cancellation and timeouts
/// belong to the provider, not this loop. Exhausting the budget yields
/// `GenerationFailed` naming the role and the last parse error.
pub(crate) async fn complete_validated<T, F>(
    client: &dyn CompletionClient,
    role: Role,
    base_prompt: &str,
    options: &CompletionOptions,
    max_retries: usize,
    decode: F,
) -> Result<T, EngineError>
where
    F: Fn(Map<String, Value>) -> Result<T, ParseError>,
{
    let attempts = max_retries.max(1);
    let mut prompt = base_prompt.to_string();
    let mut last_error: Option<ParseError> = None;

    for attempt in 1..=attempts {
        let response = client
            .complete(&prompt, options)
            .await
            .map_err(|source| EngineError::Completion { role, source })?;

        match parse_json_object(&response.text).and_then(&decode) {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(%role, attempt, attempts, error = %err, "discarding malformed reply");
                last_error = Some(err);
                prompt = format!("{}{}", base_prompt, RETRY_SUFFIX);
            }
        }
    }

    Err(EngineError::GenerationFailed {
        role,
        attempts,
        source: last_error
            .unwrap_or_else(|| ParseError::Schema("retry budget was zero".to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::QueueClient;

    #[test]
    fn test_parse_json_object_rejects_arrays_and_primitives() {
        assert!(parse_json_object(r#"{"a": 1}"#).is_ok());
        assert!(matches!(
            parse_json_object("[1]"),
            Err(ParseError::NotAnObject)
        ));
        assert!(matches!(
            parse_json_object("42"),
            Err(ParseError::NotAnObject)
        ));
        assert!(matches!(
            parse_json_object("nope"),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_string_field_stringifies_scalars() {
        let map = parse_json_object(r#"{"a": "x", "b": 42, "c": true, "d": null, "e": [1]}"#)
            .unwrap();
        assert_eq!(string_field(&map, "a"), "x");
        assert_eq!(string_field(&map, "b"), "42");
        assert_eq!(string_field(&map, "c"), "true");
        assert_eq!(string_field(&map, "d"), "");
        assert_eq!(string_field(&map, "e"), "");
        assert_eq!(string_field(&map, "missing"), "");
    }

    #[tokio::test]
    async fn test_retries_then_fails_with_role_name() {
        let client = QueueClient::new();
        client.push("bad");
        client.push("still bad");
        client.push("worse");

        let err = complete_validated(
            &client,
            Role::Curator,
            "prompt",
            &CompletionOptions::default(),
            3,
            |map| Ok::<_, ParseError>(map.len()),
        )
        .await
        .unwrap_err();

        match err {
            EngineError::GenerationFailed { role, attempts, .. } => {
                assert_eq!(role, Role::Curator);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected GenerationFailed, got {:?}", other),
        }
        assert_eq!(client.remaining(), 0);
    }

    #[tokio::test]
    async fn test_provider_error_is_terminal_without_retry() {
        let client = QueueClient::new(); // empty queue -> provider error

        let err = complete_validated(
            &client,
            Role::Generator,
            "prompt",
            &CompletionOptions::default(),
            3,
            |map| Ok::<_, ParseError>(map.len()),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::Completion { role, .. } if role == Role::Generator));
    }
}
