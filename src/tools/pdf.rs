//! PDF inspection and a minimal text-to-PDF writer.

use std::io::{Read, Write};

use async_trait::async_trait;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use regex::bytes::Regex;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{json, Value};

use crate::mcp::protocol::SERVER_NAME;
use crate::registry::schema::OutputShape;
use crate::registry::{Tool, ToolContext, ToolError, ToolOutput, ToolResult};
use crate::tools::document_properties;

/// Text lines per generated page.
pub const LINES_PER_PAGE: usize = 50;

/// Characters per generated line before wrapping.
pub const CHARS_PER_LINE: usize = 95;

/// Largest decompressed size accepted for one content stream.
pub const MAX_INFLATED_STREAM: usize = 16 * 1024 * 1024;

// ============================================================================
// pdf_get_info
// ============================================================================

/// Facts about a PDF file.
#[derive(Debug, Serialize, JsonSchema)]
pub struct PdfInfo {
    /// Header version, e.g. `1.7`.
    pub version: String,
    /// Page count.
    pub pages: usize,
    /// Whether the document declares encryption.
    pub encrypted: bool,
    /// Document title from the info dictionary, if readable.
    pub title: Option<String>,
    /// File size in bytes.
    pub size_bytes: u64,
}

/// Reads version, page count, encryption and title from a PDF.
#[derive(Debug)]
pub struct PdfGetInfoTool {
    header: Regex,
    page: Regex,
    count: Regex,
    title: Regex,
}

impl PdfGetInfoTool {
    /// Compiles the inspection patterns.
    ///
    /// # Errors
    ///
    /// Returns an internal error if a pattern fails to compile.
    pub fn new() -> ToolResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ToolError::Internal(format!("bad PDF pattern: {e}")))
        };
        Ok(Self {
            header: compile(r"(?-u)^%PDF-([0-9]+\.[0-9]+)")?,
            page: compile(r"(?-u)/Type\s*/Page\b")?,
            count: compile(r"(?-u)/Count\s+([0-9]+)")?,
            title: compile(r"(?s-u)/Title\s*\(((?:[^()\\]|\\.)*)\)")?,
        })
    }

    /// Catalog factory.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn create() -> ToolResult<Box<dyn Tool>> {
        Ok(Box::new(Self::new()?))
    }

    /// Inspects PDF bytes.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if the bytes are not a PDF.
    pub fn inspect(&self, bytes: &[u8]) -> ToolResult<PdfInfo> {
        let version = self
            .header
            .captures(bytes)
            .and_then(|c| c.get(1))
            .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
            .ok_or_else(|| ToolError::invalid("file is not a PDF document (missing %PDF header)"))?;

        let mut pages = self.page.find_iter(bytes).count();
        if pages == 0 {
            // page objects may live in compressed object streams
            pages = self
                .count
                .captures_iter(bytes)
                .filter_map(|c| std::str::from_utf8(c.get(1)?.as_bytes()).ok()?.parse().ok())
                .max()
                .unwrap_or(0);
        }

        let title = self
            .title
            .captures(bytes)
            .and_then(|c| c.get(1))
            .map(|m| unescape(m.as_bytes()))
            .filter(|t| !t.is_empty());

        Ok(PdfInfo {
            version,
            pages,
            encrypted: bytes.windows(8).any(|w| w == b"/Encrypt"),
            title,
            size_bytes: bytes.len() as u64,
        })
    }
}

#[async_trait]
impl Tool for PdfGetInfoTool {
    fn description(&self) -> &'static str {
        "Get basic information about a PDF: version, page count, encryption and title."
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": document_properties() })
    }

    fn output_shapes(&self) -> Vec<OutputShape> {
        vec![OutputShape::of::<PdfInfo>("pdf_info")]
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let doc = ctx.resolve_document(&arguments).await?;
        let bytes = tokio::fs::read(&doc.path).await?;
        Ok(ToolOutput::json(&self.inspect(&bytes)?)?.with_session(doc.session_id))
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Escapes text for a PDF literal string, replacing non-ASCII characters.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\t' => out.push_str("    "),
            c if (' '..='~').contains(&c) => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

fn unescape(raw: &[u8]) -> String {
    let mut out = Vec::with_capacity(raw.len());
    let mut iter = raw.iter().copied();
    while let Some(b) = iter.next() {
        if b == b'\\' {
            if let Some(next) = iter.next() {
                out.push(next);
            }
        } else {
            out.push(b);
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Wraps text into lines of at most [`CHARS_PER_LINE`] characters.
#[must_use]
pub fn wrap_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        let chars: Vec<char> = raw.chars().collect();
        if chars.is_empty() {
            lines.push(String::new());
            continue;
        }
        for chunk in chars.chunks(CHARS_PER_LINE) {
            lines.push(chunk.iter().collect());
        }
    }
    lines
}

fn page_content(lines: &[String]) -> String {
    let mut content = String::from("BT\n/F1 10 Tf\n14 TL\n50 750 Td\n");
    for line in lines {
        content.push('(');
        content.push_str(&escape(line));
        content.push_str(") Tj T*\n");
    }
    content.push_str("ET\n");
    content
}

fn compress(data: &[u8]) -> ToolResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Renders lines of text as a paginated PDF with compressed content streams.
///
/// # Errors
///
/// Returns an error if compression fails.
pub fn render_text_pdf(title: &str, lines: &[String]) -> ToolResult<Vec<u8>> {
    let pages: Vec<&[String]> = if lines.is_empty() {
        vec![lines]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };

    // 1 catalog, 2 page tree, 3 font, 4 info, then a page/content pair per page
    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(4 + pages.len() * 2);
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());

    let kids = (0..pages.len())
        .map(|i| format!("{} 0 R", 5 + 2 * i))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", pages.len()).into_bytes());
    objects.push(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec());
    objects.push(
        format!(
            "<< /Title ({}) /Producer ({SERVER_NAME}) >>",
            escape(title)
        )
        .into_bytes(),
    );

    for (i, chunk) in pages.iter().enumerate() {
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                6 + 2 * i
            )
            .into_bytes(),
        );

        let stream = compress(page_content(chunk).as_bytes())?;
        let mut content =
            format!("<< /Length {} /Filter /FlateDecode >>\nstream\n", stream.len()).into_bytes();
        content.extend_from_slice(&stream);
        content.extend_from_slice(b"\nendstream");
        objects.push(content);
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (n, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", n + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R /Info 4 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );

    Ok(out)
}

// ============================================================================
// Text extraction
// ============================================================================

/// Reads one literal string starting just after its opening parenthesis.
/// Returns the raw (still escaped) bytes and the index after the closing
/// parenthesis.
fn literal_at(content: &[u8], start: usize) -> (&[u8], usize) {
    let mut depth = 1usize;
    let mut i = start;
    while i < content.len() {
        match content[i] {
            b'\\' => i += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return (&content[start..i], i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    (&content[start..], content.len())
}

/// Collects the strings shown by `Tj` and `'` operators, one per line.
fn shown_text(content: &[u8], out: &mut Vec<String>) {
    let mut i = 0;
    while i < content.len() {
        if content[i] != b'(' {
            i += 1;
            continue;
        }
        let (raw, next) = literal_at(content, i + 1);
        let rest = &content[next..];
        let operator = rest
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .map_or(&rest[rest.len()..], |p| &rest[p..]);
        if operator.starts_with(b"Tj") || operator.starts_with(b"'") {
            out.push(unescape(raw));
        }
        i = next;
    }
}

/// Inflates a zlib stream, giving up on corrupt data or output beyond
/// `limit` bytes.
fn inflate_bounded(data: &[u8], limit: usize) -> Option<Vec<u8>> {
    let mut inflated = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    if ZlibDecoder::new(data)
        .take(cap)
        .read_to_end(&mut inflated)
        .is_err()
    {
        tracing::debug!("Skipping undecodable PDF stream");
        return None;
    }
    if inflated.len() > limit {
        tracing::warn!(limit, "Skipping PDF stream that inflates past the size limit");
        return None;
    }
    Some(inflated)
}

/// Extracts text from the content streams of a PDF.
///
/// Only literal strings drawn with `Tj` or `'` are recovered, one line per
/// operator. Streams compressed with `FlateDecode` are inflated first;
/// other filters are skipped.
///
/// # Errors
///
/// Returns an invalid-argument error if the bytes are not a PDF.
pub fn extract_text(bytes: &[u8]) -> ToolResult<String> {
    if !bytes.starts_with(b"%PDF-") {
        return Err(ToolError::invalid("file is not a PDF document (missing %PDF header)"));
    }
    let stream = Regex::new(r"(?-u)/Length\s+([0-9]+)([^>]*)>>\s*stream\r?\n")
        .map_err(|e| ToolError::Internal(format!("bad PDF pattern: {e}")))?;

    let mut lines = Vec::new();
    for caps in stream.captures_iter(bytes) {
        let (Some(whole), Some(length), Some(filters)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let Some(length) = std::str::from_utf8(length.as_bytes())
            .ok()
            .and_then(|l| l.parse::<usize>().ok())
        else {
            continue;
        };
        let end = whole.end().saturating_add(length).min(bytes.len());
        let data = &bytes[whole.end()..end];

        let filters = filters.as_bytes();
        if filters.windows(11).any(|w| w == b"FlateDecode") {
            let Some(inflated) = inflate_bounded(data, MAX_INFLATED_STREAM) else {
                continue;
            };
            shown_text(&inflated, &mut lines);
        } else if !filters.contains(&b'/') {
            shown_text(data, &mut lines);
        }
    }
    Ok(lines.join("\n"))
}
