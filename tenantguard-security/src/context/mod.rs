//! Request security context, shared vocabularies, and input sanitisation.

mod sanitize;
mod security;
mod types;

pub use sanitize::{InputSanitizer, MAX_IDENTIFIER_LEN, escape_html, is_valid_identifier};
pub use security::{ContextInput, ContextValidator, TenantSecurityContext};
pub use types::{DataClassification, DataOperation, IsolationLevel, Role};
