//! Cross-format conversion.
//!
//! Sources are loaded into a neutral [`Content`] and rendered into the
//! target format. Format identity comes from file extensions; see
//! [`Format`] for the supported pairs.

use std::path::Path;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{json, Value};

use crate::registry::schema::OutputShape;
use crate::registry::{Tool, ToolAnnotations, ToolContext, ToolError, ToolOutput, ToolResult};
use crate::tools::email::parse_message;
use crate::tools::excel::{parse_rows, write_rows};
use crate::tools::formats::Format;
use crate::tools::pdf::{extract_text, render_text_pdf, wrap_lines, LINES_PER_PAGE};
use crate::tools::word::paragraphs;
use crate::tools::{decode_text, document_properties, ensure_writable, flag, required_str};

/// Document content independent of its source format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Running text.
    Text(String),
    /// Tabular cells.
    Rows(Vec<Vec<String>>),
    /// An e-mail message.
    Message {
        /// Header lines to show, in order.
        headers: Vec<(String, String)>,
        /// Message body.
        body: String,
    },
}

impl Content {
    /// Loads content from raw file bytes.
    ///
    /// # Errors
    ///
    /// Propagates parse failures of the source format.
    pub fn load(format: Format, bytes: &[u8]) -> ToolResult<Self> {
        match format {
            Format::Text | Format::Markdown => Ok(Self::Text(decode_text(bytes))),
            Format::Csv => Ok(Self::Rows(parse_rows(&decode_text(bytes))?)),
            Format::Pdf => Ok(Self::Text(extract_text(bytes)?)),
            Format::Email => {
                let message = parse_message(&decode_text(bytes))?;
                let headers = ["subject", "from", "to", "date"]
                    .into_iter()
                    .filter_map(|name| {
                        let value = message.first(name)?;
                        let mut label = name.to_string();
                        label[..1].make_ascii_uppercase();
                        Some((label, value.to_string()))
                    })
                    .collect();
                Ok(Self::Message {
                    headers,
                    body: message.body.trim().to_string(),
                })
            }
        }
    }

    /// Plain-text rendering.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Rows(rows) => rows
                .iter()
                .map(|row| row.join(" | "))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Message { headers, body } => {
                let mut out: String = headers
                    .iter()
                    .map(|(name, value)| format!("{name}: {value}\n"))
                    .collect();
                out.push('\n');
                out.push_str(body);
                out
            }
        }
    }

    /// Markdown rendering. Tables take their first row as the header.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Rows(rows) => markdown_table(rows),
            Self::Message { headers, body } => {
                let mut out = String::new();
                for (name, value) in headers {
                    if name == "Subject" {
                        out.insert_str(0, &format!("# {value}\n\n"));
                    } else {
                        out.push_str(&format!("**{name}:** {value}  \n"));
                    }
                }
                out.push('\n');
                out.push_str(body);
                out
            }
        }
    }

    /// Tabular rendering. Text becomes one single-cell row per paragraph.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        match self {
            Self::Rows(rows) => rows.clone(),
            other => paragraphs(&other.to_text())
                .into_iter()
                .map(|p| vec![p])
                .collect(),
        }
    }
}

fn markdown_table(rows: &[Vec<String>]) -> String {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return String::new();
    }

    let cell = |row: &[String], i: usize| {
        row.get(i)
            .map(|c| c.replace('|', "\\|").replace('\n', " "))
            .unwrap_or_default()
    };
    let line = |row: &[String]| {
        let cells: Vec<String> = (0..width).map(|i| cell(row, i)).collect();
        format!("| {} |\n", cells.join(" | "))
    };

    let mut out = line(&rows[0]);
    out.push_str(&format!("|{}\n", " --- |".repeat(width)));
    for row in &rows[1..] {
        out.push_str(&line(row));
    }
    out
}

/// Renders content into the bytes of `target`.
///
/// # Errors
///
/// Returns an unsupported error if `target` cannot be written.
pub fn render(content: &Content, target: Format, title: &str) -> ToolResult<Vec<u8>> {
    match target {
        Format::Text => Ok(content.to_text().into_bytes()),
        Format::Markdown => Ok(content.to_markdown().into_bytes()),
        Format::Csv => write_rows(&content.to_rows()),
        Format::Pdf => render_text_pdf(title, &wrap_lines(&content.to_text())),
        Format::Email => Err(ToolError::unsupported("writing e-mail messages")),
    }
}

fn document_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn conversion_properties() -> serde_json::Map<String, Value> {
    let mut props = document_properties();
    props.insert(
        "output_path".to_string(),
        json!({
            "type": "string",
            "description": "Where to write the converted document"
        }),
    );
    props.insert(
        "overwrite".to_string(),
        json!({
            "type": "boolean",
            "description": "Replace output_path if it exists (default false)"
        }),
    );
    props
}

// ============================================================================
// convert_to_pdf
// ============================================================================

/// Result of a PDF rendering.
#[derive(Debug, Serialize, JsonSchema)]
pub struct PdfConversion {
    /// Written file.
    pub output_path: String,
    /// Pages in the PDF.
    pub pages: usize,
    /// File size in bytes.
    pub bytes: usize,
}

/// Renders a text, Markdown or CSV document to PDF.
#[derive(Debug, Default)]
pub struct ConvertToPdfTool;

#[async_trait]
impl Tool for ConvertToPdfTool {
    fn description(&self) -> &'static str {
        "Render a word-processing, spreadsheet or presentation document to PDF."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": conversion_properties(),
            "required": ["output_path"]
        })
    }

    fn output_shapes(&self) -> Vec<OutputShape> {
        vec![OutputShape::of::<PdfConversion>("pdf_conversion")]
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::additive())
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let doc = ctx.resolve_document(&arguments).await?;
        let output_path = Path::new(required_str(&arguments, "output_path")?);
        let overwrite = flag(&arguments, "overwrite")?;

        let source = Format::of_path(&doc.path)?;
        if !matches!(source, Format::Text | Format::Markdown | Format::Csv) {
            return Err(ToolError::unsupported(format!(
                "rendering {source} documents to PDF; use convert_document"
            )));
        }
        ensure_writable(output_path, overwrite).await?;

        let content = Content::load(source, &tokio::fs::read(&doc.path).await?)?;
        let lines = wrap_lines(&content.to_text());
        let pdf = render_text_pdf(&document_title(&doc.path), &lines)?;
        tokio::fs::write(output_path, &pdf).await?;

        Ok(ToolOutput::json(&PdfConversion {
            output_path: output_path.display().to_string(),
            pages: lines.len().div_ceil(LINES_PER_PAGE).max(1),
            bytes: pdf.len(),
        })?
        .with_session(doc.session_id))
    }
}

// ============================================================================
// convert_document
// ============================================================================

/// Result of a format conversion.
#[derive(Debug, Serialize, JsonSchema)]
pub struct DocumentConversion {
    /// Detected source format.
    pub source_format: Format,
    /// Written format.
    pub target_format: Format,
    /// Written file.
    pub output_path: String,
    /// File size in bytes.
    pub bytes: usize,
}

/// Converts a document between formats chosen by file extension.
#[derive(Debug, Default)]
pub struct ConvertDocumentTool;

#[async_trait]
impl Tool for ConvertDocumentTool {
    fn description(&self) -> &'static str {
        "Convert a document to another format. Source and target formats are taken from the \
         file extensions; see list_supported_formats for the available pairs."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": conversion_properties(),
            "required": ["output_path"]
        })
    }

    fn output_shapes(&self) -> Vec<OutputShape> {
        vec![OutputShape::of::<DocumentConversion>("conversion")]
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::additive())
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let doc = ctx.resolve_document(&arguments).await?;
        let output_path = Path::new(required_str(&arguments, "output_path")?);
        let overwrite = flag(&arguments, "overwrite")?;

        let source = Format::of_path(&doc.path)?;
        let target = Format::of_path(output_path)?;
        if !source.targets().contains(&target) {
            return Err(ToolError::unsupported(format!("conversion from {source} to {target}")));
        }
        ensure_writable(output_path, overwrite).await?;

        let content = Content::load(source, &tokio::fs::read(&doc.path).await?)?;
        let bytes = render(&content, target, &document_title(&doc.path))?;
        tokio::fs::write(output_path, &bytes).await?;
        tracing::debug!(%source, %target, path = %output_path.display(), "Document converted");

        Ok(ToolOutput::json(&DocumentConversion {
            source_format: source,
            target_format: target,
            output_path: output_path.display().to_string(),
            bytes: bytes.len(),
        })?
        .with_session(doc.session_id))
    }
}
