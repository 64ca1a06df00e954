//! Built-in tools.
//!
//! [`catalog`] is the closed, build-time table the registry discovers from.
//! Each entry pairs an implementation identity (from which the wire name is
//! derived) with a factory. Adding a tool means adding a row here.
//!
//! Documents are plain files on disk:
//!
//! | Category | Format |
//! |---|---|
//! | word | plain text or Markdown, paragraphs separated by blank lines |
//! | excel | CSV |
//! | ppt | Markdown, slides separated by `---` lines |
//! | pdf | PDF |
//! | email | RFC 822 message (`.eml`) |

pub mod barcode;
pub mod convert;
pub mod email;
pub mod excel;
pub mod formats;
pub mod pdf;
pub mod ppt;
pub mod session;
pub mod word;

use std::path::Path;

use serde_json::Value;

use crate::registry::{Tool, ToolEntry, ToolError, ToolResult};

/// Wraps a default-constructible tool as a catalog factory.
fn boxed<T: Tool + Default + 'static>() -> ToolResult<Box<dyn Tool>> {
    Ok(Box::new(T::default()))
}

static CATALOG: &[ToolEntry] = &[
    ToolEntry::new("WordGetTextTool", boxed::<word::WordGetTextTool>),
    ToolEntry::new("WordAppendParagraphTool", boxed::<word::WordAppendParagraphTool>),
    ToolEntry::new("WordGetStatisticsTool", boxed::<word::WordGetStatisticsTool>),
    ToolEntry::new("ExcelReadRangeTool", boxed::<excel::ExcelReadRangeTool>),
    ToolEntry::new("ExcelWriteCellTool", boxed::<excel::ExcelWriteCellTool>),
    ToolEntry::new("PptGetOutlineTool", boxed::<ppt::PptGetOutlineTool>),
    ToolEntry::new("PdfGetInfoTool", pdf::PdfGetInfoTool::create),
    ToolEntry::new("EmailParseHeadersTool", boxed::<email::EmailParseHeadersTool>),
    ToolEntry::new("BarcodeValidateTool", boxed::<barcode::BarcodeValidateTool>),
    ToolEntry::new("ConvertToPdfTool", boxed::<convert::ConvertToPdfTool>),
    ToolEntry::new("ConvertDocumentTool", boxed::<convert::ConvertDocumentTool>),
    ToolEntry::new("DocumentSessionTool", boxed::<session::DocumentSessionTool>),
    ToolEntry::new("ListSupportedFormatsTool", boxed::<formats::ListSupportedFormatsTool>),
];

/// The built-in tool catalog, in listing order.
#[must_use]
pub fn catalog() -> &'static [ToolEntry] {
    CATALOG
}

// ============================================================================
// Argument helpers
// ============================================================================

/// Reads a required, non-empty string argument.
///
/// # Errors
///
/// Returns `"{name} is required"` when absent or empty, or a type complaint.
pub fn required_str<'a>(args: &'a Value, name: &str) -> ToolResult<&'a str> {
    match args.get(name) {
        None | Some(Value::Null) => Err(ToolError::missing(name)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ToolError::missing(name)),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ToolError::invalid(format!("{name} must be a string"))),
    }
}

/// Reads an optional string argument.
///
/// # Errors
///
/// Returns a type complaint if the argument is present but not a string.
pub fn optional_str<'a>(args: &'a Value, name: &str) -> ToolResult<Option<&'a str>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ToolError::invalid(format!("{name} must be a string"))),
    }
}

/// Reads an optional non-negative integer argument.
///
/// # Errors
///
/// Returns a type complaint if the argument is present but not a
/// non-negative integer.
pub fn optional_u64(args: &Value, name: &str) -> ToolResult<Option<u64>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| ToolError::invalid(format!("{name} must be a non-negative integer"))),
    }
}

/// Reads an optional boolean argument, defaulting to `false`.
///
/// # Errors
///
/// Returns a type complaint if the argument is present but not a boolean.
pub fn flag(args: &Value, name: &str) -> ToolResult<bool> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(ToolError::invalid(format!("{name} must be a boolean"))),
    }
}

/// JSON Schema fragment for the `path` / `session_id` document selector.
pub(crate) fn document_properties() -> serde_json::Map<String, Value> {
    let mut props = serde_json::Map::new();
    props.insert(
        "path".to_string(),
        serde_json::json!({
            "type": "string",
            "description": "Path to the document"
        }),
    );
    props.insert(
        "session_id".to_string(),
        serde_json::json!({
            "type": "string",
            "description": "Open document session to use instead of path"
        }),
    );
    props
}

// ============================================================================
// File helpers
// ============================================================================

/// Reads a text document, accepting UTF-8 (with or without BOM) and falling
/// back to Windows-1252 for legacy files.
///
/// # Errors
///
/// Returns an I/O-derived error if the file cannot be read.
pub async fn read_text(path: &Path) -> ToolResult<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(decode_text(&bytes))
}

/// Decodes document bytes as UTF-8, or Windows-1252 if that fails.
#[must_use]
pub fn decode_text(bytes: &[u8]) -> String {
    let (text, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if !had_errors {
        return text.into_owned();
    }
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    text.into_owned()
}

/// Refuses to replace an existing file unless `overwrite` is set.
///
/// # Errors
///
/// Returns an invalid-argument error if the target exists.
pub async fn ensure_writable(path: &Path, overwrite: bool) -> ToolResult<()> {
    if !overwrite && tokio::fs::try_exists(path).await? {
        return Err(ToolError::invalid(
            "output_path already exists; set overwrite to true to replace it",
        ));
    }
    Ok(())
}

/// Lower-cased extension of `path`, if any.
#[must_use]
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}
