//! Presentation tools over Markdown slide decks.
//!
//! A deck is Markdown with slides separated by lines consisting only of
//! `---`. A slide's title is its first heading, or its first non-empty line.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{json, Value};

use crate::registry::schema::OutputShape;
use crate::registry::{Tool, ToolContext, ToolOutput, ToolResult};
use crate::tools::{document_properties, read_text};

/// One slide in an outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct SlideOutline {
    /// 1-based slide number.
    pub index: usize,
    /// Slide title.
    pub title: String,
    /// Bullet points on the slide.
    pub bullets: Vec<String>,
}

/// Outline of a deck.
#[derive(Debug, Serialize, JsonSchema)]
pub struct DeckOutline {
    /// Number of slides.
    pub slide_count: usize,
    /// Slides in order.
    pub slides: Vec<SlideOutline>,
}

/// Splits a deck into slide bodies. Empty slides are dropped.
#[must_use]
pub fn split_slides(text: &str) -> Vec<String> {
    let mut slides = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim() == "---" {
            slides.push(std::mem::take(&mut current));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    slides.push(current);
    slides.retain(|s| !s.trim().is_empty());
    slides
}

/// Builds the outline of one slide.
#[must_use]
pub fn outline_slide(index: usize, body: &str) -> SlideOutline {
    let lines: Vec<&str> = body.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let title = lines
        .iter()
        .find(|l| l.starts_with('#'))
        .or_else(|| lines.first())
        .map(|l| l.trim_start_matches('#').trim().to_string())
        .unwrap_or_default();

    let bullets = lines
        .iter()
        .filter_map(|l| {
            l.strip_prefix("- ")
                .or_else(|| l.strip_prefix("* "))
                .or_else(|| l.strip_prefix("+ "))
        })
        .map(str::to_string)
        .collect();

    SlideOutline {
        index,
        title,
        bullets,
    }
}

/// Lists slide titles and bullet points.
#[derive(Debug, Default)]
pub struct PptGetOutlineTool;

#[async_trait]
impl Tool for PptGetOutlineTool {
    fn description(&self) -> &'static str {
        "Get the outline (titles and bullet points) of a presentation written as a Markdown slide deck."
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": document_properties() })
    }

    fn output_shapes(&self) -> Vec<OutputShape> {
        vec![OutputShape::of::<DeckOutline>("outline")]
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let doc = ctx.resolve_document(&arguments).await?;
        let text = read_text(&doc.path).await?;

        let slides: Vec<SlideOutline> = split_slides(&text)
            .iter()
            .enumerate()
            .map(|(i, body)| outline_slide(i + 1, body))
            .collect();

        Ok(ToolOutput::json(&DeckOutline {
            slide_count: slides.len(),
            slides,
        })?
        .with_session(doc.session_id))
    }
}
