//! Input sanitisation for identifiers and free text entering the audit trail.

use crate::error::{Result, SecurityError};
use crate::ownership::SCOPE_SEPARATOR;

/// Maximum identifier length in characters.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Cleans caller-supplied strings before they are trusted or recorded.
#[derive(Debug, Clone, Copy)]
pub struct InputSanitizer {
    max_text_len: usize,
}

impl Default for InputSanitizer {
    fn default() -> Self {
        Self { max_text_len: 512 }
    }
}

impl InputSanitizer {
    /// Creates a sanitizer truncating free text to `max_text_len` characters.
    #[must_use]
    pub const fn new(max_text_len: usize) -> Self {
        Self { max_text_len }
    }

    /// Strips control characters, trims, and truncates.
    #[must_use]
    pub fn clean(&self, input: &str) -> String {
        input
            .chars()
            .filter(|c| !c.is_control())
            .collect::<String>()
            .trim()
            .chars()
            .take(self.max_text_len)
            .collect()
    }

    /// Cleans and HTML-escapes free text such as user agents and justifications.
    #[must_use]
    pub fn sanitize_text(&self, input: &str) -> String {
        escape_html(&self.clean(input))
    }

    /// Cleans an identifier and checks it against the identifier alphabet.
    ///
    /// # Errors
    ///
    /// Returns `InvalidContext` naming `field` if the identifier is empty,
    /// too long, or contains characters outside `[A-Za-z0-9_.:@-]`.
    pub fn identifier(&self, field: &str, input: &str) -> Result<String> {
        let cleaned: String = input.chars().filter(|c| !c.is_control()).collect();
        let cleaned = cleaned.trim();

        if cleaned.is_empty() {
            return Err(SecurityError::invalid_context(format!("{field} is required")));
        }
        if cleaned.chars().count() > MAX_IDENTIFIER_LEN {
            return Err(SecurityError::invalid_context(format!(
                "{field} exceeds {MAX_IDENTIFIER_LEN} characters"
            )));
        }
        if !is_valid_identifier(cleaned) {
            return Err(SecurityError::invalid_context(format!(
                "{field} contains invalid characters"
            )));
        }
        Ok(cleaned.to_string())
    }

    /// Like [`identifier`](Self::identifier), but also rejects the scope
    /// separator: tenant ids prefix scoped resource ids and must not nest.
    ///
    /// # Errors
    ///
    /// Returns `InvalidContext` for anything `identifier` rejects, or if the
    /// id contains `:`.
    pub fn tenant_identifier(&self, field: &str, input: &str) -> Result<String> {
        let tenant = self.identifier(field, input)?;
        if tenant.contains(SCOPE_SEPARATOR) {
            return Err(SecurityError::invalid_context(format!(
                "{field} must not contain '{SCOPE_SEPARATOR}'"
            )));
        }
        Ok(tenant)
    }
}

/// Returns true if `value` is 1 to 128 characters of `[A-Za-z0-9_.:@-]`.
#[must_use]
pub fn is_valid_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.chars().count() <= MAX_IDENTIFIER_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '@' | '-'))
}

/// Escapes `< > & " '`.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
