//! Document formats and the conversions between them.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{json, Value};

use crate::registry::schema::OutputShape;
use crate::registry::{Tool, ToolContext, ToolError, ToolOutput, ToolResult};
use crate::tools::extension;

/// A document format understood by the built-in tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Plain text.
    Text,
    /// Markdown, including slide decks.
    Markdown,
    /// Comma-separated values.
    Csv,
    /// RFC 822 e-mail message.
    Email,
    /// Portable Document Format.
    Pdf,
}

impl Format {
    /// Every format, in listing order.
    pub const ALL: [Self; 5] = [Self::Text, Self::Markdown, Self::Csv, Self::Email, Self::Pdf];

    /// File extensions, preferred first.
    #[must_use]
    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Text => &["txt", "text"],
            Self::Markdown => &["md", "markdown"],
            Self::Csv => &["csv"],
            Self::Email => &["eml"],
            Self::Pdf => &["pdf"],
        }
    }

    /// Tool categories that operate on this format.
    #[must_use]
    pub const fn categories(self) -> &'static [&'static str] {
        match self {
            Self::Text => &["word"],
            Self::Markdown => &["word", "ppt"],
            Self::Csv => &["excel"],
            Self::Email => &["email"],
            Self::Pdf => &["pdf"],
        }
    }

    /// Formats this one can be converted into.
    #[must_use]
    pub const fn targets(self) -> &'static [Self] {
        match self {
            Self::Text => &[Self::Markdown, Self::Csv, Self::Pdf],
            Self::Markdown => &[Self::Text, Self::Csv, Self::Pdf],
            Self::Csv => &[Self::Text, Self::Markdown, Self::Pdf],
            Self::Email => &[Self::Text, Self::Markdown, Self::Pdf],
            Self::Pdf => &[Self::Text, Self::Markdown],
        }
    }

    /// Identifies the format of a file by extension.
    ///
    /// # Errors
    ///
    /// Returns an unsupported error naming the extension.
    pub fn of_path(path: &Path) -> ToolResult<Self> {
        let ext = extension(path).unwrap_or_default();
        Self::ALL
            .into_iter()
            .find(|f| f.extensions().contains(&ext.as_str()))
            .ok_or_else(|| {
                if ext.is_empty() {
                    ToolError::unsupported(format!("file without extension: {}", path.display()))
                } else {
                    ToolError::unsupported(format!("format '.{ext}'"))
                }
            })
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extensions()[0])
    }
}

/// One row of the format table.
#[derive(Debug, Serialize, JsonSchema)]
pub struct FormatInfo {
    /// Format identifier.
    pub format: Format,
    /// Recognised file extensions.
    pub extensions: Vec<&'static str>,
    /// Tool categories that read the format.
    pub categories: Vec<&'static str>,
    /// Formats `convert_document` can produce from this one.
    pub convert_to: Vec<Format>,
}

/// The supported format table.
#[derive(Debug, Serialize, JsonSchema)]
pub struct FormatTable {
    /// Formats in listing order.
    pub formats: Vec<FormatInfo>,
}

impl FormatTable {
    /// Builds the table from [`Format::ALL`].
    #[must_use]
    pub fn build() -> Self {
        Self {
            formats: Format::ALL
                .into_iter()
                .map(|format| FormatInfo {
                    format,
                    extensions: format.extensions().to_vec(),
                    categories: format.categories().to_vec(),
                    convert_to: format.targets().to_vec(),
                })
                .collect(),
        }
    }
}

/// Lists document formats and conversions.
#[derive(Debug, Default)]
pub struct ListSupportedFormatsTool;

#[async_trait]
impl Tool for ListSupportedFormatsTool {
    fn description(&self) -> &'static str {
        "List supported document formats, their file extensions and available conversions."
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn output_shapes(&self) -> Vec<OutputShape> {
        vec![OutputShape::of::<FormatTable>("formats")]
    }

    async fn execute(&self, _arguments: Value, _ctx: &ToolContext) -> ToolResult<ToolOutput> {
        ToolOutput::json(&FormatTable::build())
    }
}
