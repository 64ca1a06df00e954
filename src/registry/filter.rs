//! Tool enablement.
//!
//! Enablement is a pure, total function of `(wire name, configuration)`:
//!
//! | Tool | Enabled when |
//! |---|---|
//! | `word_*`, `excel_*`, `ppt_*`, `pdf_*`, `ocr_*`, `email_*`, `barcode_*` | owning category is enabled |
//! | [`CONVERT_TO_PDF_TOOL`] | any of [`Categories::PRODUCERS`] is enabled |
//! | [`CONVERT_DOCUMENT_TOOL`] | at least two of [`Categories::CONVERTIBLE`] are enabled |
//! | [`SESSION_TOOL`] | session support is enabled |
//! | anything else | always |

use bitflags::bitflags;

use crate::config::{Config, ToolsConfig};

bitflags! {
    /// A set of tool categories.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Categories: u16 {
        /// Word-processing documents.
        const WORD = 1 << 0;
        /// Spreadsheets.
        const EXCEL = 1 << 1;
        /// Presentations.
        const PPT = 1 << 2;
        /// PDF documents.
        const PDF = 1 << 3;
        /// Optical character recognition.
        const OCR = 1 << 4;
        /// E-mail messages.
        const EMAIL = 1 << 5;
        /// Barcodes.
        const BARCODE = 1 << 6;
    }
}

impl Categories {
    /// Categories whose documents can be rendered to PDF.
    pub const PRODUCERS: Self = Self::WORD.union(Self::EXCEL).union(Self::PPT);

    /// Categories taking part in cross-format conversion: the four primary
    /// categories plus e-mail.
    pub const CONVERTIBLE: Self = Self::WORD
        .union(Self::EXCEL)
        .union(Self::PPT)
        .union(Self::PDF)
        .union(Self::EMAIL);

    /// Builds the enabled set from configuration switches.
    #[must_use]
    pub fn from_tools_config(tools: &ToolsConfig) -> Self {
        let mut set = Self::empty();
        set.set(Self::WORD, tools.word);
        set.set(Self::EXCEL, tools.excel);
        set.set(Self::PPT, tools.ppt);
        set.set(Self::PDF, tools.pdf);
        set.set(Self::OCR, tools.ocr);
        set.set(Self::EMAIL, tools.email);
        set.set(Self::BARCODE, tools.barcode);
        set
    }
}

/// Wire-name prefixes owned by a category.
pub const CATEGORY_PREFIXES: &[(&str, Categories)] = &[
    ("word_", Categories::WORD),
    ("excel_", Categories::EXCEL),
    ("ppt_", Categories::PPT),
    ("pdf_", Categories::PDF),
    ("ocr_", Categories::OCR),
    ("email_", Categories::EMAIL),
    ("barcode_", Categories::BARCODE),
];

/// Renders any producing document to PDF.
pub const CONVERT_TO_PDF_TOOL: &str = "convert_to_pdf";

/// Converts between two enabled formats.
pub const CONVERT_DOCUMENT_TOOL: &str = "convert_document";

/// Opens, lists and closes document sessions.
pub const SESSION_TOOL: &str = "document_session";

/// Returns the category owning `name`'s prefix, if any.
#[must_use]
pub fn category_of(name: &str) -> Option<Categories> {
    CATEGORY_PREFIXES
        .iter()
        .find(|(prefix, _)| name.starts_with(*prefix))
        .map(|&(_, category)| category)
}

/// Returns `name` with its category prefix removed, if it has one.
#[must_use]
pub fn strip_category_prefix(name: &str) -> &str {
    CATEGORY_PREFIXES
        .iter()
        .find_map(|(prefix, _)| name.strip_prefix(*prefix))
        .unwrap_or(name)
}

/// The configuration inputs of the enablement predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolFilter {
    /// Enabled categories.
    pub categories: Categories,
    /// Whether session support is enabled.
    pub sessions: bool,
}

impl ToolFilter {
    /// Extracts the filter inputs from the server configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            categories: Categories::from_tools_config(&config.tools),
            sessions: config.session.enabled,
        }
    }

    /// Whether the tool called `name` is enabled.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        if let Some(category) = category_of(name) {
            return self.categories.contains(category);
        }

        match name {
            CONVERT_TO_PDF_TOOL => self.categories.intersects(Categories::PRODUCERS),
            CONVERT_DOCUMENT_TOOL => {
                self.categories
                    .intersection(Categories::CONVERTIBLE)
                    .bits()
                    .count_ones()
                    >= 2
            }
            SESSION_TOOL => self.sessions,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only(categories: Categories) -> ToolFilter {
        ToolFilter {
            categories,
            sessions: false,
        }
    }

    #[test]
    fn category_prefix_follows_flag() {
        let filter = only(Categories::WORD);
        assert!(filter.is_enabled("word_get_text"));
        assert!(!filter.is_enabled("excel_read_range"));
        assert!(!filter.is_enabled("barcode_validate"));
    }

    #[test]
    fn convert_to_pdf_needs_one_producer() {
        assert!(only(Categories::PPT).is_enabled(CONVERT_TO_PDF_TOOL));
        assert!(!only(Categories::PDF).is_enabled(CONVERT_TO_PDF_TOOL));
        assert!(!only(Categories::empty()).is_enabled(CONVERT_TO_PDF_TOOL));
    }

    #[test]
    fn convert_document_needs_two_participants() {
        assert!(!only(Categories::WORD).is_enabled(CONVERT_DOCUMENT_TOOL));
        assert!(only(Categories::WORD | Categories::PDF).is_enabled(CONVERT_DOCUMENT_TOOL));
        assert!(only(Categories::EXCEL | Categories::EMAIL).is_enabled(CONVERT_DOCUMENT_TOOL));
        // OCR and barcode do not count
        assert!(!only(Categories::WORD | Categories::OCR | Categories::BARCODE)
            .is_enabled(CONVERT_DOCUMENT_TOOL));
    }

    #[test]
    fn session_tool_follows_session_flag() {
        let mut filter = only(Categories::all());
        assert!(!filter.is_enabled(SESSION_TOOL));
        filter.sessions = true;
        assert!(filter.is_enabled(SESSION_TOOL));
    }

    #[test]
    fn other_tools_default_on() {
        assert!(only(Categories::empty()).is_enabled("list_supported_formats"));
    }

    #[test]
    fn from_config_reads_switches() {
        let mut config = Config::default();
        config.tools = ToolsConfig::none();
        config.tools.excel = true;
        config.session.enabled = true;

        let filter = ToolFilter::from_config(&config);
        assert_eq!(filter.categories, Categories::EXCEL);
        assert!(filter.sessions);
    }

    #[test]
    fn strips_prefixes() {
        assert_eq!(strip_category_prefix("word_get_text"), "get_text");
        assert_eq!(strip_category_prefix("list_supported_formats"), "list_supported_formats");
    }
}
