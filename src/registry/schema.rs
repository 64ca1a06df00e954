//! Output schemas for tool results.
//!
//! Every successful call returns the same envelope:
//!
//! ```json
//! { "data": <variant payload>, "output": { "tool": "...", "transport": "...", "session_id": "..." } }
//! ```
//!
//! A tool declares the payload shapes it can produce. One shape becomes the
//! `data` schema directly; several become a `oneOf` union.

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Operation metadata reported under `output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct OutputMetadata {
    /// Wire name of the tool that ran.
    pub tool: String,
    /// Transport that carried the call.
    pub transport: String,
    /// Session that served the call, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Connection group, if the transport captured one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Connection user, if the transport captured one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// One declared result shape.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputShape {
    /// Shape name, used as the schema title.
    pub name: &'static str,
    /// JSON Schema of the shape, possibly carrying `$defs`.
    pub schema: Value,
}

impl OutputShape {
    /// Generates the shape from a type's `JsonSchema` implementation.
    #[must_use]
    pub fn of<T: JsonSchema>(name: &'static str) -> Self {
        let schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({}));
        Self { name, schema }
    }
}

/// Splits `$defs` off a generated schema and drops the meta-schema marker.
fn detach_defs(schema: &Value, defs: &mut Map<String, Value>) -> Value {
    let mut schema = schema.clone();
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        if let Some(Value::Object(local)) = obj.remove("$defs") {
            defs.extend(local);
        }
    }
    schema
}

/// Builds the envelope schema for a tool's declared shapes.
///
/// Returns `None` when the tool declares no shapes.
#[must_use]
pub fn output_schema(shapes: &[OutputShape]) -> Option<Value> {
    if shapes.is_empty() {
        return None;
    }

    let mut defs = Map::new();
    let variants: Vec<Value> = shapes
        .iter()
        .map(|shape| {
            let mut variant = detach_defs(&shape.schema, &mut defs);
            if let Some(obj) = variant.as_object_mut() {
                obj.insert("title".to_string(), Value::String(shape.name.to_string()));
            }
            variant
        })
        .collect();

    let data = if variants.len() == 1 {
        variants.into_iter().next().unwrap_or_else(|| json!({}))
    } else {
        json!({ "oneOf": variants })
    };

    let metadata = detach_defs(&OutputShape::of::<OutputMetadata>("output").schema, &mut defs);

    let mut envelope = json!({
        "type": "object",
        "properties": {
            "data": data,
            "output": metadata,
        },
        "required": ["data", "output"],
    });
    if !defs.is_empty() {
        if let Some(obj) = envelope.as_object_mut() {
            obj.insert("$defs".to_string(), Value::Object(defs));
        }
    }
    Some(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct TextResult {
        text: String,
    }

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct CountResult {
        count: u64,
        items: Vec<Item>,
    }

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct Item {
        name: String,
    }

    #[test]
    fn no_shapes_no_schema() {
        assert!(output_schema(&[]).is_none());
    }

    #[test]
    fn single_shape_is_inlined() {
        let schema = output_schema(&[OutputShape::of::<TextResult>("text")]).unwrap();
        let data = &schema["properties"]["data"];
        assert_eq!(data["title"], "text");
        assert!(data["properties"]["text"].is_object());
        assert!(data.get("oneOf").is_none());
        assert!(data.get("$schema").is_none());
        assert_eq!(schema["required"], json!(["data", "output"]));
    }

    #[test]
    fn several_shapes_become_one_of() {
        let schema = output_schema(&[
            OutputShape::of::<TextResult>("text"),
            OutputShape::of::<CountResult>("count"),
        ])
        .unwrap();
        let variants = schema["properties"]["data"]["oneOf"].as_array().unwrap();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[1]["title"], "count");
        // nested definitions are hoisted to the envelope
        assert!(schema["$defs"]["Item"].is_object());
        assert!(schema["properties"]["output"]["properties"]["transport"].is_object());
    }
}
