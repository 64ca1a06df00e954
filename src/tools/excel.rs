//! Spreadsheet tools over CSV files.
//!
//! Cells are addressed in A1 notation; columns are letters (`A`..`ZZ`..),
//! rows are 1-based. Rows may have differing lengths.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{json, Value};

use crate::registry::schema::OutputShape;
use crate::registry::{Tool, ToolAnnotations, ToolContext, ToolError, ToolOutput, ToolResult};
use crate::tools::{document_properties, optional_str, read_text, required_str};

/// Largest addressable row count, matching current spreadsheet applications.
pub const MAX_ROWS: usize = 1_048_576;

/// Largest addressable column count (`XFD`).
pub const MAX_COLUMNS: usize = 16_384;

/// A zero-based cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    /// Row index.
    pub row: usize,
    /// Column index.
    pub col: usize,
}

impl CellRef {
    /// Parses an A1-style reference such as `B12`.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error naming the bad reference, or one
    /// naming the cell when it lies beyond [`MAX_ROWS`] or [`MAX_COLUMNS`].
    pub fn parse(reference: &str) -> ToolResult<Self> {
        let reference = reference.trim();
        let bad = || ToolError::invalid(format!("invalid cell reference '{reference}'; expected A1 notation"));
        let outside = || ToolError::invalid(format!("cell '{reference}' is outside the sheet limits"));

        let split = reference
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(bad)?;
        let (letters, digits) = reference.split_at(split);
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(bad());
        }

        let mut col: usize = 0;
        for c in letters.chars() {
            let digit = (c.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
            col = col
                .checked_mul(26)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(bad)?;
            if col > MAX_COLUMNS {
                return Err(outside());
            }
        }

        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(bad());
        }
        let row = match digits.trim_start_matches('0') {
            "" => return Err(bad()),
            significant if significant.len() > 7 => return Err(outside()),
            significant => significant.parse::<usize>().map_err(|_| bad())?,
        };
        if row > MAX_ROWS {
            return Err(outside());
        }

        Ok(Self {
            row: row - 1,
            col: col - 1,
        })
    }
}

/// Parses `A1:C3` or a single cell into an inclusive, normalised range.
///
/// # Errors
///
/// Returns an invalid-argument error for malformed references.
pub fn parse_range(range: &str) -> ToolResult<(CellRef, CellRef)> {
    let (start, end) = match range.split_once(':') {
        Some((a, b)) => (CellRef::parse(a)?, CellRef::parse(b)?),
        None => {
            let cell = CellRef::parse(range)?;
            (cell, cell)
        }
    };
    Ok((
        CellRef {
            row: start.row.min(end.row),
            col: start.col.min(end.col),
        },
        CellRef {
            row: start.row.max(end.row),
            col: start.col.max(end.col),
        },
    ))
}

/// Parses CSV text into rows of cells.
///
/// # Errors
///
/// Returns an invalid-argument error if the CSV is malformed.
pub fn parse_rows(text: &str) -> ToolResult<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|e| ToolError::invalid(format!("malformed CSV: {e}")))
        })
        .collect()
}

/// Serialises rows to CSV text.
///
/// # Errors
///
/// Returns an internal error if encoding fails.
pub fn write_rows(rows: &[Vec<String>]) -> ToolResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| ToolError::Internal(format!("CSV encoding failed: {e}")))?;
    }
    writer
        .into_inner()
        .map_err(|e| ToolError::Internal(format!("CSV encoding failed: {e}")))
}

// ============================================================================
// excel_read_range
// ============================================================================

/// Cells read from a sheet.
#[derive(Debug, Serialize, JsonSchema)]
pub struct RangeValues {
    /// The requested range, or `all`.
    pub range: String,
    /// Cell values, row by row.
    pub rows: Vec<Vec<String>>,
    /// Rows returned.
    pub row_count: usize,
    /// Widest row returned.
    pub column_count: usize,
}

/// Reads a cell range from a CSV sheet.
#[derive(Debug, Default)]
pub struct ExcelReadRangeTool;

#[async_trait]
impl Tool for ExcelReadRangeTool {
    fn description(&self) -> &'static str {
        "Read cell values from a spreadsheet (CSV). Omit range to read the whole sheet."
    }

    fn input_schema(&self) -> Value {
        let mut props = document_properties();
        props.insert(
            "range".to_string(),
            json!({
                "type": "string",
                "description": "Cell range in A1 notation, e.g. \"A1:C10\""
            }),
        );
        json!({ "type": "object", "properties": props })
    }

    fn output_shapes(&self) -> Vec<OutputShape> {
        vec![OutputShape::of::<RangeValues>("range_values")]
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let doc = ctx.resolve_document(&arguments).await?;
        let range = optional_str(&arguments, "range")?
            .map(parse_range)
            .transpose()?;

        let rows = parse_rows(&read_text(&doc.path).await?)?;

        let selected: Vec<Vec<String>> = match range {
            None => rows,
            Some((start, end)) => rows
                .into_iter()
                .skip(start.row)
                .take(end.row - start.row + 1)
                .map(|row| {
                    row.into_iter()
                        .skip(start.col)
                        .take(end.col - start.col + 1)
                        .collect()
                })
                .collect(),
        };

        let values = RangeValues {
            range: optional_str(&arguments, "range")?
                .unwrap_or("all")
                .to_string(),
            row_count: selected.len(),
            column_count: selected.iter().map(Vec::len).max().unwrap_or(0),
            rows: selected,
        };
        Ok(ToolOutput::json(&values)?.with_session(doc.session_id))
    }
}

// ============================================================================
// excel_write_cell
// ============================================================================

/// Writes one cell of a CSV sheet, growing the sheet as needed.
#[derive(Debug, Default)]
pub struct ExcelWriteCellTool;

#[async_trait]
impl Tool for ExcelWriteCellTool {
    fn description(&self) -> &'static str {
        "Write a value into one spreadsheet cell (CSV). The sheet grows to fit the cell."
    }

    fn input_schema(&self) -> Value {
        let mut props = document_properties();
        props.insert(
            "cell".to_string(),
            json!({
                "type": "string",
                "description": "Target cell in A1 notation"
            }),
        );
        props.insert(
            "value".to_string(),
            json!({
                "type": ["string", "number", "boolean"],
                "description": "Value to store"
            }),
        );
        json!({ "type": "object", "properties": props, "required": ["cell", "value"] })
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::additive())
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let doc = ctx.resolve_document(&arguments).await?;
        let cell_name = required_str(&arguments, "cell")?;
        let cell = CellRef::parse(cell_name)?;
        let value = match arguments.get("value") {
            Some(Value::String(s)) => s.clone(),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
            None | Some(Value::Null) => return Err(ToolError::missing("value")),
            Some(_) => {
                return Err(ToolError::invalid(
                    "value must be a string, number or boolean",
                ))
            }
        };

        let mut rows = parse_rows(&read_text(&doc.path).await?)?;
        if rows.len() <= cell.row {
            rows.resize_with(cell.row + 1, Vec::new);
        }
        let row = &mut rows[cell.row];
        if row.len() <= cell.col {
            row.resize(cell.col + 1, String::new());
        }
        let previous = std::mem::replace(&mut row[cell.col], value);

        tokio::fs::write(&doc.path, write_rows(&rows)?).await?;

        Ok(ToolOutput::json(&json!({
            "cell": cell_name.trim().to_ascii_uppercase(),
            "previous": (!previous.is_empty()).then_some(previous),
        }))?
        .with_session(doc.session_id))
    }
}
