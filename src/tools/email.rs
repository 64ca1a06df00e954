//! E-mail tools over RFC 822 messages.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};

use crate::registry::{Tool, ToolContext, ToolError, ToolOutput, ToolResult};
use crate::tools::{document_properties, optional_u64, read_text};

/// Default length of the body preview.
const DEFAULT_PREVIEW_CHARS: u64 = 200;

/// A message split into headers and body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedMessage {
    /// Header values by lower-cased name, in order of first appearance.
    pub headers: IndexMap<String, Vec<String>>,
    /// Everything after the first blank line.
    pub body: String,
}

impl ParsedMessage {
    /// First value of a header.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|v| v.first())
            .map(String::as_str)
    }
}

/// Splits a message into unfolded headers and body.
///
/// # Errors
///
/// Returns an invalid-argument error if the header block contains a line
/// that is neither `Name: value` nor a continuation.
pub fn parse_message(text: &str) -> ToolResult<ParsedMessage> {
    let mut message = ParsedMessage::default();
    let mut current: Option<(String, String)> = None;
    let mut lines = text.split_inclusive('\n');

    let flush = |message: &mut ParsedMessage, current: &mut Option<(String, String)>| {
        if let Some((name, value)) = current.take() {
            message
                .headers
                .entry(name)
                .or_default()
                .push(value.trim().to_string());
        }
    };

    for (number, raw) in lines.by_ref().enumerate() {
        let line = raw.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }

        if line.starts_with([' ', '\t']) {
            match current.as_mut() {
                Some((_, value)) => {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                None => {
                    return Err(ToolError::invalid(format!(
                        "malformed message: continuation without header on line {}",
                        number + 1
                    )))
                }
            }
            continue;
        }

        let (name, value) = line.split_once(':').ok_or_else(|| {
            ToolError::invalid(format!("malformed message: expected a header on line {}", number + 1))
        })?;

        flush(&mut message, &mut current);
        current = Some((name.trim().to_ascii_lowercase(), value.to_string()));
    }
    flush(&mut message, &mut current);

    message.body = lines.collect();
    Ok(message)
}

/// Parses the headers of an `.eml` message.
#[derive(Debug, Default)]
pub struct EmailParseHeadersTool;

#[async_trait]
impl Tool for EmailParseHeadersTool {
    fn description(&self) -> &'static str {
        "Parse the headers of an e-mail message (.eml) and preview its body."
    }

    fn input_schema(&self) -> Value {
        let mut props = document_properties();
        props.insert(
            "preview_chars".to_string(),
            json!({
                "type": "integer",
                "minimum": 0,
                "description": "Length of the body preview (default 200)"
            }),
        );
        json!({ "type": "object", "properties": props })
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let doc = ctx.resolve_document(&arguments).await?;
        let preview_chars = optional_u64(&arguments, "preview_chars")?.unwrap_or(DEFAULT_PREVIEW_CHARS);
        let message = parse_message(&read_text(&doc.path).await?)?;

        let preview: String = message
            .body
            .trim()
            .chars()
            .take(usize::try_from(preview_chars).unwrap_or(usize::MAX))
            .collect();

        Ok(ToolOutput::json(&json!({
            "subject": message.first("subject"),
            "from": message.first("from"),
            "to": message.first("to"),
            "date": message.first("date"),
            "message_id": message.first("message-id"),
            "headers": message.headers,
            "body_preview": preview,
        }))?
        .with_session(doc.session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = "From: Alice <alice@example.com>\r\n\
        To: bob@example.com\r\n\
        Subject: Quarterly\r\n numbers\r\n\
        Received: from a\r\n\
        Received: from b\r\n\
        \r\n\
        Hello Bob,\r\nsee attached.\r\n";

    #[test]
    fn unfolds_and_groups_headers() {
        let message = parse_message(MESSAGE).unwrap();
        assert_eq!(message.first("Subject"), Some("Quarterly numbers"));
        assert_eq!(message.headers["received"], ["from a", "from b"]);
        assert_eq!(
            message.headers.keys().collect::<Vec<_>>(),
            ["from", "to", "subject", "received"]
        );
        assert_eq!(message.body, "Hello Bob,\r\nsee attached.\r\n");
    }

    #[test]
    fn rejects_garbage_header_block() {
        let err = parse_message("not a header\n\nbody").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn rejects_leading_continuation() {
        assert!(parse_message(" folded\n\nbody").is_err());
    }
}
