//! Message sanitisation for caller-visible errors.
//!
//! Applied to every message that may carry detail from a fault:
//!
//! - absolute filesystem paths (Unix, home-relative, Windows drive, UNC,
//!   `file://` URLs) become `[path]`
//! - stack frames, backtraces and line-number indicators are stripped
//! - fully-qualified type names collapse to `[type]`
//! - the result is capped, with an explicit `...` marker when truncated

use std::sync::OnceLock;

use regex::Regex;

/// Length cap for messages whose detail is preserved (validation faults).
pub const DETAILED_MESSAGE_CAP: usize = 500;

/// Length cap for every other sanitised message.
pub const GENERIC_MESSAGE_CAP: usize = 200;

/// Marker appended to truncated messages.
pub const ELLIPSIS: &str = "...";

/// Replacement for redacted paths.
pub const PATH_LABEL: &str = "[path]";

/// Replacement for collapsed type names.
pub const TYPE_LABEL: &str = "[type]";

struct Patterns {
    trace_tail: Regex,
    inline_frame: Regex,
    source_location: Regex,
    line_marker: Regex,
    file_url: Regex,
    unc_path: Regex,
    windows_path: Regex,
    unix_path: Regex,
    path_position: Regex,
    rust_type: Regex,
    dotted_type: Regex,
    whitespace: Regex,
}

#[allow(clippy::expect_used)] // the patterns are constants
fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("sanitiser pattern must compile");
        Patterns {
            trace_tail: re(r"(?s)\r?\n\s*(?:at\s|stack backtrace:|Stack trace:|---\s*End of).*$"),
            inline_frame: re(r"\s+at\s+[\w.$`<>:]+\([^)]*\)"),
            source_location: re(r"[\w./\\-]+\.(?:rs|cs|java|py|go|js|ts):\d+(?::\d+)?"),
            line_marker: re(r"(?i)\s*:line\s+\d+"),
            file_url: re(r#"file://[^\s'"]+"#),
            unc_path: re(r#"\\\\[^\s'"\\]+\\[^\s'"]*"#),
            windows_path: re(r#"\b[A-Za-z]:[\\/][^\s'"]*"#),
            unix_path: re(r#"(^|[\s'"(\[=,])~?(?:/[^\s'"/()\[\],]+)+/?"#),
            path_position: re(r"\[path\](?::\d+)+"),
            rust_type: re(r"\b[A-Za-z_]\w*(?:::[A-Za-z_]\w*){2,}\b"),
            dotted_type: re(r"\b(?:[A-Za-z_]\w*\.){2,}[A-Za-z_]\w*(?:Exception|Error)\b"),
            whitespace: re(r"[ \t]{2,}"),
        }
    })
}

/// Redacts absolute filesystem paths only.
#[must_use]
pub fn redact_paths(message: &str) -> String {
    let p = patterns();
    let s = p.file_url.replace_all(message, PATH_LABEL);
    let s = p.unc_path.replace_all(&s, PATH_LABEL);
    let s = p.windows_path.replace_all(&s, PATH_LABEL);
    let s = p.unix_path.replace_all(&s, format!("${{1}}{PATH_LABEL}").as_str());
    p.path_position.replace_all(&s, PATH_LABEL).into_owned()
}

/// Applies every sanitisation rule and caps the result at `cap` characters.
#[must_use]
pub fn sanitize(message: &str, cap: usize) -> String {
    let p = patterns();
    let s = p.trace_tail.replace(message, "");
    let s = p.inline_frame.replace_all(&s, "");
    let s = p.source_location.replace_all(&s, "");
    let s = p.line_marker.replace_all(&s, "");
    let s = redact_paths(&s);
    let s = p.rust_type.replace_all(&s, TYPE_LABEL);
    let s = p.dotted_type.replace_all(&s, TYPE_LABEL);
    let s = p.whitespace.replace_all(&s, " ");
    truncate(s.trim(), cap)
}

/// Sanitises a message whose detail is meant for the caller.
#[must_use]
pub fn sanitize_detailed(message: &str) -> String {
    sanitize(message, DETAILED_MESSAGE_CAP)
}

/// Sanitises a message under the generic cap.
#[must_use]
pub fn sanitize_generic(message: &str) -> String {
    sanitize(message, GENERIC_MESSAGE_CAP)
}

/// Truncates to at most `cap` characters, ending with [`ELLIPSIS`] when cut.
#[must_use]
pub fn truncate(message: &str, cap: usize) -> String {
    if message.chars().count() <= cap {
        return message.to_string();
    }
    let keep = cap.saturating_sub(ELLIPSIS.len());
    let mut out: String = message.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
