//! Word-processing tools over plain-text and Markdown documents.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{json, Value};

use crate::registry::schema::OutputShape;
use crate::registry::{Tool, ToolAnnotations, ToolContext, ToolError, ToolOutput, ToolResult};
use crate::tools::{document_properties, optional_u64, read_text, required_str};

/// Splits a document into paragraphs (blocks separated by blank lines).
#[must_use]
pub fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current.join("\n"));
    }
    out
}

// ============================================================================
// word_get_text
// ============================================================================

/// Text extracted from a document.
#[derive(Debug, Serialize, JsonSchema)]
pub struct DocumentText {
    /// The text, possibly truncated.
    pub text: String,
    /// Character count of the full document.
    pub characters: usize,
    /// Whether `text` was cut at `max_chars`.
    pub truncated: bool,
}

/// Returns the text of a document.
#[derive(Debug, Default)]
pub struct WordGetTextTool;

#[async_trait]
impl Tool for WordGetTextTool {
    fn description(&self) -> &'static str {
        "Read the full text of a word-processing document (plain text or Markdown)."
    }

    fn input_schema(&self) -> Value {
        let mut props = document_properties();
        props.insert(
            "max_chars".to_string(),
            json!({
                "type": "integer",
                "minimum": 1,
                "description": "Truncate the returned text to this many characters"
            }),
        );
        json!({ "type": "object", "properties": props })
    }

    fn output_shapes(&self) -> Vec<OutputShape> {
        vec![OutputShape::of::<DocumentText>("document_text")]
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let doc = ctx.resolve_document(&arguments).await?;
        let max_chars = optional_u64(&arguments, "max_chars")?;
        let text = read_text(&doc.path).await?;

        let characters = text.chars().count();
        let (text, truncated) = match max_chars.and_then(|m| usize::try_from(m).ok()) {
            Some(0) => return Err(ToolError::invalid("max_chars must be at least 1")),
            Some(limit) if limit < characters => (text.chars().take(limit).collect(), true),
            _ => (text, false),
        };

        Ok(ToolOutput::json(&DocumentText {
            text,
            characters,
            truncated,
        })?
        .with_session(doc.session_id))
    }
}

// ============================================================================
// word_append_paragraph
// ============================================================================

/// Appends a paragraph to a document.
#[derive(Debug, Default)]
pub struct WordAppendParagraphTool;

#[async_trait]
impl Tool for WordAppendParagraphTool {
    fn description(&self) -> &'static str {
        "Append a paragraph to the end of a word-processing document."
    }

    fn input_schema(&self) -> Value {
        let mut props = document_properties();
        props.insert(
            "text".to_string(),
            json!({
                "type": "string",
                "description": "Paragraph text to append"
            }),
        );
        json!({ "type": "object", "properties": props, "required": ["text"] })
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::additive())
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let doc = ctx.resolve_document(&arguments).await?;
        let addition = required_str(&arguments, "text")?;

        let mut text = read_text(&doc.path).await?;
        let trimmed_len = text.trim_end().len();
        text.truncate(trimmed_len);
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(addition.trim());
        text.push('\n');

        tokio::fs::write(&doc.path, &text).await?;
        tracing::debug!(path = %doc.path.display(), "Paragraph appended");

        Ok(ToolOutput::json(&json!({
            "paragraphs": paragraphs(&text).len(),
        }))?
        .with_session(doc.session_id))
    }
}

// ============================================================================
// word_get_statistics
// ============================================================================

/// Counts describing a document.
#[derive(Debug, PartialEq, Eq, Serialize, JsonSchema)]
pub struct DocumentStatistics {
    /// Whitespace-separated words.
    pub words: usize,
    /// Unicode scalar values.
    pub characters: usize,
    /// Non-whitespace characters.
    pub characters_no_spaces: usize,
    /// Blank-line separated blocks.
    pub paragraphs: usize,
    /// Lines.
    pub lines: usize,
    /// Markdown headings (`#` lines).
    pub headings: usize,
}

impl DocumentStatistics {
    /// Computes statistics for `text`.
    #[must_use]
    pub fn of(text: &str) -> Self {
        Self {
            words: text.split_whitespace().count(),
            characters: text.chars().count(),
            characters_no_spaces: text.chars().filter(|c| !c.is_whitespace()).count(),
            paragraphs: paragraphs(text).len(),
            lines: text.lines().count(),
            headings: text
                .lines()
                .filter(|l| l.trim_start().starts_with('#'))
                .count(),
        }
    }
}

/// Reports word, character and paragraph counts.
#[derive(Debug, Default)]
pub struct WordGetStatisticsTool;

#[async_trait]
impl Tool for WordGetStatisticsTool {
    fn description(&self) -> &'static str {
        "Count words, characters, paragraphs, lines and headings in a word-processing document."
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": document_properties() })
    }

    fn output_shapes(&self) -> Vec<OutputShape> {
        vec![OutputShape::of::<DocumentStatistics>("statistics")]
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let doc = ctx.resolve_document(&arguments).await?;
        let text = read_text(&doc.path).await?;
        Ok(ToolOutput::json(&DocumentStatistics::of(&text))?.with_session(doc.session_id))
    }
}
