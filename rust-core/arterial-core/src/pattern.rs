//! # Path Pattern Compiler
//!
//! Compiles a path template with `:name` segments into a matchable pattern.
//! Templates without parameters match by exact string comparison; templates
//! with parameters compile to an anchored regex with one named capture per
//! token, preceded by a cheap literal-prefix reject so large route tables
//! skip the regex engine for most non-matching paths.
//!
//! Per-parameter regex fragments may override the default "one or more
//! non-slash characters" capture. Compilation failures are configuration
//! errors; they never surface at request time.

use crate::error::{Error, Result};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

/// Maximum allowed size for a compiled pattern regex (in bytes).
const MAX_REGEX_SIZE: usize = 1 << 20; // 1 MiB

/// A compiled path template
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// The original template, base path included
    template: String,
    /// Literal text before the first `:name` token (whole template if none)
    literal_prefix: String,
    /// Anchored regex; `None` for parameter-less templates (exact match)
    regex: Option<Regex>,
    /// Parameter names in token order; position is the capture index
    param_names: Vec<String>,
}

impl CompiledPattern {
    /// Compile a path template.
    ///
    /// `overrides` maps parameter names to regex fragments replacing the
    /// default `[^/]+` capture.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRoutePattern`] for malformed tokens and
    /// [`Error::DuplicateParameter`] when a name appears twice.
    pub fn compile(template: &str, overrides: &HashMap<String, String>) -> Result<Self> {
        let tokens = parse_tokens(template)?;

        let mut param_names = Vec::new();
        let mut regex_str = String::from("^");
        let mut literal_prefix = String::new();
        let mut prefix_done = false;

        for token in &tokens {
            match token {
                Token::Literal(text) => {
                    regex_str.push_str(&regex::escape(text));
                    if !prefix_done {
                        literal_prefix.push_str(text);
                    }
                }
                Token::Param(name) => {
                    if param_names.iter().any(|n| n == name) {
                        return Err(Error::DuplicateParameter {
                            pattern: template.to_string(),
                            name: name.clone(),
                        });
                    }
                    let fragment = overrides.get(name).map_or("[^/]+", String::as_str);
                    regex_str.push_str(&format!("(?P<{name}>{fragment})"));
                    param_names.push(name.clone());
                    prefix_done = true;
                }
            }
        }
        regex_str.push('$');

        let regex = if param_names.is_empty() {
            None
        } else {
            Some(
                RegexBuilder::new(&regex_str)
                    .size_limit(MAX_REGEX_SIZE)
                    .build()
                    .map_err(|e| Error::InvalidRoutePattern {
                        pattern: template.to_string(),
                        reason: e.to_string(),
                    })?,
            )
        };

        Ok(Self {
            template: template.to_string(),
            literal_prefix,
            regex,
            param_names,
        })
    }

    /// Match a request path, returning captured raw values in token order.
    ///
    /// Returns `None` on mismatch. Parameter-less patterns compare exactly
    /// without touching the regex engine.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Vec<String>> {
        let Some(regex) = &self.regex else {
            return (path == self.template).then(Vec::new);
        };

        // Prefix reject before the full pattern match
        if !path.starts_with(&self.literal_prefix) {
            return None;
        }

        let caps = regex.captures(path)?;
        Some(
            self.param_names
                .iter()
                .map(|name| caps[name.as_str()].to_string())
                .collect(),
        )
    }

    /// Substitute `:name` tokens with percent-encoded values, reproducing a
    /// literal path for URL generation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParameter`] when `values` lacks a token.
    pub fn expand(&self, values: &HashMap<String, String>) -> Result<String> {
        let tokens = parse_tokens(&self.template).expect("compiled template re-parses");
        let mut result = String::with_capacity(self.template.len());
        for token in tokens {
            match token {
                Token::Literal(text) => result.push_str(&text),
                Token::Param(name) => {
                    let value = values.get(&name).ok_or_else(|| Error::MissingParameter {
                        name: name.clone(),
                        template: self.template.clone(),
                    })?;
                    result.push_str(&urlencoding::encode(value));
                }
            }
        }
        Ok(result)
    }

    /// The original template string
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Whether this pattern matches by exact comparison (no parameters)
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.regex.is_none()
    }

    /// Parameter names in token order
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Capture index of a named parameter
    #[must_use]
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.param_names.iter().position(|n| n == name)
    }
}

enum Token {
    Literal(String),
    Param(String),
}

/// Split a template into literal runs and `:name` tokens.
///
/// A token starts at `:`, must begin with a letter or underscore, and runs
/// through trailing alphanumerics/underscores. A bare `:` is malformed.
fn parse_tokens(template: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ':' {
            literal.push(c);
            continue;
        }

        if !matches!(chars.peek(), Some(ch) if ch.is_ascii_alphabetic() || *ch == '_') {
            return Err(Error::InvalidRoutePattern {
                pattern: template.to_string(),
                reason: "':' must be followed by a parameter name".to_string(),
            });
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }

        let mut name = String::new();
        while let Some(ch) = chars.peek() {
            if ch.is_ascii_alphanumeric() || *ch == '_' {
                name.push(*ch);
                chars.next();
            } else {
                break;
            }
        }
        tokens.push(Token::Param(name));
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}
