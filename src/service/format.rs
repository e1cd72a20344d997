//! Format engine for document numbers.
//!
//! Parses pattern strings like `"{PREFIX}{VALUE:6}"` and renders allocated
//! values into their human-formatted representation. Pure and stateless; the
//! date is injected by the caller.

use chrono::{Datelike, NaiveDate};

/// Default pattern applied when a series has none configured.
pub const DEFAULT_PATTERN: &str = "{PREFIX}{VALUE:6}";

/// Parsed token in a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text, including unknown placeholders rendered verbatim.
    Literal(String),
    /// The series prefix.
    Prefix,
    /// The allocated value, zero-padded to the given width.
    /// Width 0 renders the value unpadded.
    Value(usize),
    /// 4-digit year.
    Year,
    /// 2-digit month.
    Month,
    /// 2-digit day.
    Day,
}

/// A parsed format pattern.
#[derive(Debug, Clone)]
pub struct ParsedPattern {
    tokens: Vec<Token>,
}

impl ParsedPattern {
    /// Parse a pattern string.
    ///
    /// Recognized placeholders are `{PREFIX}`, `{VALUE}`, `{VALUE:n}`,
    /// `{YEAR}`, `{MONTH}` and `{DAY}`. Unknown placeholders are kept as
    /// literals; pattern validation belongs to the configuration UI, and a
    /// stray placeholder must never block numbering.
    ///
    /// # Errors
    ///
    /// Returns an error for a structurally broken pattern (unclosed `{`).
    pub fn parse(pattern: &str) -> Result<Self, String> {
        let mut tokens = Vec::new();
        let mut chars = pattern.chars();
        let mut literal = String::new();

        while let Some(c) = chars.next() {
            if c == '{' {
                let mut placeholder = String::new();
                let mut found_close = false;

                for inner in chars.by_ref() {
                    if inner == '}' {
                        found_close = true;
                        break;
                    }
                    placeholder.push(inner);
                }

                if !found_close {
                    return Err(format!("unclosed placeholder in pattern: {pattern}"));
                }

                let token = parse_placeholder(&placeholder);
                if let Token::Literal(ref text) = token {
                    literal.push_str(text);
                    continue;
                }
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(token);
            } else {
                literal.push(c);
            }
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Ok(Self { tokens })
    }

    /// Render an allocated value through this pattern.
    ///
    /// `{VALUE:n}` zero-pads to width `n`; a value whose decimal length
    /// exceeds `n` is rendered at full width, never truncated.
    #[must_use]
    pub fn render(&self, prefix: &str, value: i64, date: NaiveDate) -> String {
        let mut result = String::new();

        for token in &self.tokens {
            match token {
                Token::Literal(text) => result.push_str(text),
                Token::Prefix => result.push_str(prefix),
                Token::Value(width) => {
                    let width = *width;
                    result.push_str(&format!("{value:0width$}"));
                }
                Token::Year => result.push_str(&format!("{:04}", date.year())),
                Token::Month => result.push_str(&format!("{:02}", date.month())),
                Token::Day => result.push_str(&format!("{:02}", date.day())),
            }
        }

        result
    }
}

/// Parse a single placeholder body.
///
/// Anything unrecognized comes back as a verbatim literal, braces included.
/// Pad widths are accepted in 1..=20; anything else is not a `{VALUE:n}`
/// token.
fn parse_placeholder(placeholder: &str) -> Token {
    match placeholder {
        "PREFIX" => Token::Prefix,
        "VALUE" => Token::Value(0),
        "YEAR" => Token::Year,
        "MONTH" => Token::Month,
        "DAY" => Token::Day,
        _ => placeholder
            .strip_prefix("VALUE:")
            .and_then(|width_str| width_str.parse::<usize>().ok())
            .filter(|width| (1..=20).contains(width))
            .map_or_else(|| Token::Literal(format!("{{{placeholder}}}")), Token::Value),
    }
}

/// Format a value through a pattern, applying the empty-pattern fallback.
///
/// # Errors
///
/// Returns an error carrying the offending pattern when it is structurally
/// broken. Callers that must not fail use [`fallback_format`] on error.
pub fn format_value(
    pattern: &str,
    prefix: &str,
    value: i64,
    date: NaiveDate,
) -> Result<String, String> {
    let effective = if pattern.is_empty() {
        DEFAULT_PATTERN
    } else {
        pattern
    };
    let parsed = ParsedPattern::parse(effective)?;
    Ok(parsed.render(prefix, value, date))
}

/// The plain zero-padded default rendering: prefix + 6-digit value.
#[must_use]
pub fn fallback_format(prefix: &str, value: i64) -> String {
    format!("{prefix}{value:06}")
}

/// Cheap structural check used by configuration validation.
#[must_use]
pub fn pattern_is_well_formed(pattern: &str) -> bool {
    pattern.is_empty() || ParsedPattern::parse(pattern).is_ok()
}
