//! Wire-name derivation.
//!
//! A tool's wire name is a pure function of its implementation identity:
//!
//! 1. A trailing [`IMPLEMENTATION_SUFFIX`] is stripped, unless nothing would remain.
//! 2. An underscore is inserted before an uppercase letter when the previous
//!    character is lowercase or a digit, or when the previous character is
//!    uppercase and the next one is lowercase (end of an acronym).
//! 3. Everything is lowercased, other non-alphanumerics become underscores,
//!    runs of underscores collapse and leading/trailing ones are trimmed.
//!
//! Leading digits are kept. See the tests for worked examples.

/// Suffix carried by implementation identities.
pub const IMPLEMENTATION_SUFFIX: &str = "Tool";

/// Derives the canonical wire name for an implementation identity.
#[must_use]
pub fn derive_wire_name(identity: &str) -> String {
    let base = identity
        .strip_suffix(IMPLEMENTATION_SUFFIX)
        .filter(|b| !b.is_empty())
        .unwrap_or(identity);

    let chars: Vec<char> = base.chars().collect();
    let mut raw = String::with_capacity(base.len() + 8);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                raw.push('_');
            }
        }

        if c.is_ascii_alphanumeric() {
            raw.push(c.to_ascii_lowercase());
        } else {
            raw.push('_');
        }
    }

    let mut name = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '_' && (name.is_empty() || name.ends_with('_')) {
            continue;
        }
        name.push(c);
    }
    while name.ends_with('_') {
        name.pop();
    }
    name
}
