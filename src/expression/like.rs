//! SQL LIKE matching for text columns.
//!
//! `%` matches any run of characters, `_` exactly one character, and `\`
//! makes the next character literal. A trailing `\` matches itself.

use crate::expression::{ExpressionError, ExpressionResult};
use regex::bytes::Regex;

/// A compiled LIKE pattern
#[derive(Debug, Clone)]
pub struct LikeMatcher {
    regex: Regex,
}

impl LikeMatcher {
    /// Compile a serialized LIKE pattern
    pub fn new(pattern: &[u8]) -> ExpressionResult<Self> {
        let pattern = std::str::from_utf8(pattern)
            .map_err(|_| ExpressionError::invalid_request("LIKE pattern is not valid UTF-8"))?;
        let regex = Regex::new(&like_to_regex(pattern))
            .map_err(|e| ExpressionError::invalid_request(format!("Invalid LIKE pattern '{}': {}", pattern, e)))?;
        Ok(Self { regex })
    }

    /// Check whether `text` matches the whole pattern
    pub fn matches(&self, text: &[u8]) -> bool {
        self.regex.is_match(text)
    }
}

fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() * 2 + 6);
    regex.push_str("(?s)^");
    let mut literal = String::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' | '_' => {
                regex.push_str(&regex::escape(&literal));
                literal.clear();
                regex.push_str(if c == '%' { ".*" } else { "." });
            }
            '\\' => literal.push(chars.next().unwrap_or('\\')),
            other => literal.push(other),
        }
    }
    regex.push_str(&regex::escape(&literal));
    regex.push('$');
    regex
}

/// Match `text` against a LIKE `pattern`, compiling the pattern for this call
pub fn like(pattern: &[u8], text: &[u8]) -> ExpressionResult<bool> {
    Ok(LikeMatcher::new(pattern)?.matches(text))
}
