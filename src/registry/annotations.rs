//! Seed rules for tool annotations.
//!
//! Consulted once, at registration, for tools that do not declare their own
//! annotations. The result is stored in the tool's descriptor and never used
//! for routing or enablement.

use crate::registry::filter::strip_category_prefix;
use crate::registry::ToolAnnotations;

/// Action prefixes that mark a tool as read-only.
pub const READ_ONLY_PREFIXES: &[&str] = &["get_", "list_", "extract_", "read_"];

/// Action prefixes that mark a tool as destructive.
pub const DESTRUCTIVE_PREFIXES: &[&str] = &["delete_", "remove_", "clear_"];

/// Infers annotations from a wire name, ignoring any category prefix.
#[must_use]
pub fn infer_annotations(name: &str) -> Option<ToolAnnotations> {
    let action = strip_category_prefix(name);
    let matches = |prefixes: &[&str]| {
        prefixes
            .iter()
            .any(|p| action.starts_with(p) || name.starts_with(p))
    };

    if matches(DESTRUCTIVE_PREFIXES) {
        Some(ToolAnnotations::destructive())
    } else if matches(READ_ONLY_PREFIXES) {
        Some(ToolAnnotations::read_only())
    } else {
        None
    }
}
