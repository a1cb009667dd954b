use serde_json::Value;

use crate::{
    error::{GenerationError, Result},
    prompt::{FieldType, OutputSchema},
    types::GenerationResult,
};

/// Strip a surrounding markdown code fence, if the model added one.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Check `value` against `schema`, reporting the first offending field.
pub fn validate(value: &Value, schema: &OutputSchema) -> Result<()> {
    let object = value
        .as_object()
        .ok_or_else(|| GenerationError::schema("$", format!("expected an object, got {}", type_name(value))))?;

    for field in schema.fields() {
        let Some(found) = object.get(field.name) else {
            return Err(GenerationError::schema(field.name, "required field is missing"));
        };

        let ok = match field.field_type {
            FieldType::String => found.is_string(),
            FieldType::StringArray => found
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        };

        if !ok {
            return Err(GenerationError::schema(
                field.name,
                format!("expected {}, got {}", field.field_type.describe(), type_name(found)),
            ));
        }
    }

    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(items) if items.iter().all(Value::is_string) => "an array of strings",
        Value::Array(_) => "an array with non-string items",
        Value::Object(_) => "an object",
    }
}

/// Parse the backend's text payload into a [`GenerationResult`].
///
/// Either all four fields are present and well-typed, or the whole payload is
/// rejected.
pub fn parse_result(text: &str) -> Result<GenerationResult> {
    let value: Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| GenerationError::malformed(format!("payload is not valid JSON: {e}")))?;

    validate(&value, &OutputSchema::repost_kit())?;

    serde_json::from_value(value)
        .map_err(|e| GenerationError::schema("$", format!("failed to decode result: {e}")))
}
