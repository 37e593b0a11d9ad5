//! Sensitive data masking for logs and audit forwarding.
//!
//! Credentials, security tokens, key material, and card numbers are replaced
//! with a short masked form before text leaves the process.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

struct SensitivePattern {
    name: &'static str,
    regex: Regex,
    group: usize,
}

static PATTERNS: LazyLock<Vec<SensitivePattern>> = LazyLock::new(|| {
    let compile = |re: &str| Regex::new(re).expect("masking pattern must compile");
    vec![
        SensitivePattern {
            name: "api_key",
            regex: compile(r#"(?i)(api[_-]?key|apikey)["\s:=]+["']?([A-Za-z0-9_\-]{16,128})["']?"#),
            group: 2,
        },
        SensitivePattern {
            name: "secret",
            regex: compile(
                r#"(?i)(secret|client[_-]?secret|master[_-]?key|signing[_-]?key)["\s:=]+["']?([^\s"',}]{8,})["']?"#,
            ),
            group: 2,
        },
        SensitivePattern {
            name: "password",
            regex: compile(r#"(?i)(password|passwd|pwd)["\s:=]+["']?([^\s"',}]{4,})["']?"#),
            group: 2,
        },
        SensitivePattern {
            name: "bearer_token",
            regex: compile(r"(?i)bearer\s+([A-Za-z0-9._~+/\-]{20,}=*)"),
            group: 1,
        },
        // Security tokens: base64url(claims) "." base64url(hmac-sha256)
        SensitivePattern {
            name: "security_token",
            regex: compile(r"\b[A-Za-z0-9_-]{24,}\.[A-Za-z0-9_-]{43}\b"),
            group: 0,
        },
        SensitivePattern {
            name: "hex_key",
            regex: compile(r"\b[a-fA-F0-9]{64}\b"),
            group: 0,
        },
        SensitivePattern {
            name: "card_number",
            regex: compile(r"\b(?:\d[ -]?){12,18}\d\b"),
            group: 0,
        },
    ]
});

/// Masks sensitive data in strings.
#[derive(Debug, Clone)]
pub struct SensitiveDataMasker {
    /// Minimum length of value that keeps a visible prefix and suffix
    min_length: usize,
    /// Characters to show at start of masked value
    show_start: usize,
    /// Characters to show at end of masked value
    show_end: usize,
    /// Mask character
    mask_char: char,
}

impl Default for SensitiveDataMasker {
    fn default() -> Self {
        Self::new()
    }
}

impl SensitiveDataMasker {
    /// Create a new masker with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_length: 12,
            show_start: 3,
            show_end: 3,
            mask_char: '*',
        }
    }

    /// Create a masker with custom settings.
    #[must_use]
    pub fn with_settings(min_length: usize, show_start: usize, show_end: usize) -> Self {
        Self {
            min_length,
            show_start,
            show_end,
            mask_char: '*',
        }
    }

    /// Mask a known sensitive value.
    ///
    /// # Example
    ///
    /// ```
    /// use tenantguard_telemetry::masking::SensitiveDataMasker;
    ///
    /// let masker = SensitiveDataMasker::new();
    /// let masked = masker.mask_value("sk_live_0123456789abcdef");
    /// assert!(masked.contains("***"));
    /// assert!(masked.starts_with("sk_"));
    /// ```
    #[must_use]
    pub fn mask_value(&self, value: &str) -> String {
        let chars: Vec<char> = value.chars().collect();
        let stars = self.mask_char.to_string().repeat(3);
        if chars.len() < self.min_length.max(self.show_start + self.show_end + 1) {
            return stars;
        }

        let start: String = chars[..self.show_start].iter().collect();
        let end: String = chars[chars.len() - self.show_end..].iter().collect();
        format!("{start}{stars}{end}")
    }

    /// Mask sensitive data in a string using pattern detection.
    ///
    /// # Example
    ///
    /// ```
    /// use tenantguard_telemetry::masking::SensitiveDataMasker;
    ///
    /// let masker = SensitiveDataMasker::new();
    /// let masked = masker.mask_string(r#"{"password": "hunter2hunter2"}"#);
    /// assert!(!masked.contains("hunter2hunter2"));
    /// ```
    #[must_use]
    pub fn mask_string<'a>(&self, input: &'a str) -> Cow<'a, str> {
        let mut current: Cow<'a, str> = Cow::Borrowed(input);

        for pattern in PATTERNS.iter() {
            if !pattern.regex.is_match(&current) {
                continue;
            }
            let replaced = pattern
                .regex
                .replace_all(&current, |caps: &Captures<'_>| {
                    let whole = &caps[0];
                    match caps.get(pattern.group) {
                        Some(secret) if pattern.group > 0 => {
                            whole.replacen(secret.as_str(), &self.mask_value(secret.as_str()), 1)
                        }
                        _ => self.mask_value(whole),
                    }
                })
                .into_owned();
            current = Cow::Owned(replaced);
        }

        current
    }

    /// Check if a string contains sensitive patterns.
    #[must_use]
    pub fn contains_sensitive(&self, input: &str) -> bool {
        PATTERNS.iter().any(|p| p.regex.is_match(input))
    }

    /// Names of the patterns matching the input, for diagnostics.
    #[must_use]
    pub fn matching_patterns(&self, input: &str) -> Vec<&'static str> {
        PATTERNS
            .iter()
            .filter(|p| p.regex.is_match(input))
            .map(|p| p.name)
            .collect()
    }
}

/// A wrapper type for sensitive values that masks them in Display/Debug.
#[derive(Clone)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    /// Wrap a value as sensitive.
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Get the inner value.
    pub fn expose(&self) -> &T {
        &self.0
    }

    /// Consume and return the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sensitive([REDACTED])")
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
