//! Date/time layout strings such as `yyyyMMdd_HHmmss`
//!
//! One token table drives both directions: compiling a layout into a
//! filename-matching regex, and formatting a timestamp into a path segment.

use crate::error::Result;
use chrono::{Datelike, NaiveDateTime, Timelike};
use regex::Regex;

/// Date or time component a token stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl Field {
    /// Name of the regex capture group for this field
    pub fn group_name(self) -> &'static str {
        match self {
            Field::Year => "year",
            Field::Month => "month",
            Field::Day => "day",
            Field::Hour => "hour",
            Field::Minute => "minute",
            Field::Second => "second",
        }
    }

    fn value_of(self, dt: &NaiveDateTime) -> i64 {
        match self {
            Field::Year => dt.year() as i64,
            Field::Month => dt.month() as i64,
            Field::Day => dt.day() as i64,
            Field::Hour => dt.hour() as i64,
            Field::Minute => dt.minute() as i64,
            Field::Second => dt.second() as i64,
        }
    }
}

/// One entry of the token table
#[derive(Debug, PartialEq, Eq)]
pub struct Token {
    /// Text of the token inside a layout
    pub symbol: &'static str,
    /// Field the token captures or prints
    pub field: Field,
    /// Regex for the digits (without the capture group)
    pub pattern: &'static str,
    /// Zero-padded width when formatting (0 = no padding)
    pub width: usize,
}

/// The token table. Longer symbols come before their prefixes so the
/// tokenizer never splits `MM` into two `M`.
pub const TOKENS: &[Token] = &[
    Token { symbol: "yyyy", field: Field::Year, pattern: "[0-9]{4}", width: 4 },
    Token { symbol: "yy", field: Field::Year, pattern: "[0-9]{2}", width: 2 },
    Token { symbol: "MM", field: Field::Month, pattern: "[0-9]{2}", width: 2 },
    Token { symbol: "M", field: Field::Month, pattern: "[0-9]{1,2}", width: 0 },
    Token { symbol: "dd", field: Field::Day, pattern: "[0-9]{2}", width: 2 },
    Token { symbol: "d", field: Field::Day, pattern: "[0-9]{1,2}", width: 0 },
    Token { symbol: "HH", field: Field::Hour, pattern: "[0-9]{2}", width: 2 },
    Token { symbol: "H", field: Field::Hour, pattern: "[0-9]{1,2}", width: 0 },
    Token { symbol: "mm", field: Field::Minute, pattern: "[0-9]{2}", width: 2 },
    Token { symbol: "m", field: Field::Minute, pattern: "[0-9]{1,2}", width: 0 },
    Token { symbol: "ss", field: Field::Second, pattern: "[0-9]{2}", width: 2 },
    Token { symbol: "s", field: Field::Second, pattern: "[0-9]{1,2}", width: 0 },
];

/// Literal characters treated as interchangeable date separators when matching
pub const SEPARATORS: &[char] = &['-', '_', '.', '/', '\\', ':'];

/// Zero or more separators of any kind
const SEPARATOR_PATTERN: &str = r"[-_./\\:]*";

/// Space-separated list of the supported tokens, for help and error messages
pub fn token_summary() -> String {
    TOKENS
        .iter()
        .map(|t| t.symbol)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Field(&'static Token),
    Literal(char),
}

/// A tokenized layout string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateLayout {
    source: String,
    pieces: Vec<Piece>,
}

impl DateLayout {
    /// Tokenize a layout, longest token first at every position
    pub fn parse(layout: &str) -> Self {
        let mut pieces = Vec::new();
        let mut rest = layout;

        while let Some(c) = rest.chars().next() {
            match TOKENS.iter().find(|t| rest.starts_with(t.symbol)) {
                Some(token) => {
                    pieces.push(Piece::Field(token));
                    rest = &rest[token.symbol.len()..];
                }
                None => {
                    pieces.push(Piece::Literal(c));
                    rest = &rest[c.len_utf8()..];
                }
            }
        }

        Self {
            source: layout.to_string(),
            pieces,
        }
    }

    /// The layout string as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True when the layout contains no date or time field
    pub fn is_constant(&self) -> bool {
        !self.pieces.iter().any(|p| matches!(p, Piece::Field(_)))
    }

    /// Check whether the layout contains a token for `field`
    pub fn has_field(&self, field: Field) -> bool {
        self.pieces
            .iter()
            .any(|p| matches!(p, Piece::Field(t) if t.field == field))
    }

    /// Render `dt` using this layout
    pub fn format(&self, dt: &NaiveDateTime) -> String {
        let mut out = String::with_capacity(self.source.len() + 4);
        for piece in &self.pieces {
            match piece {
                Piece::Literal(c) => out.push(*c),
                Piece::Field(token) => {
                    let mut value = token.field.value_of(dt);
                    if token.field == Field::Year && token.width == 2 {
                        value = value.rem_euclid(100);
                    }
                    out.push_str(&format!("{:0width$}", value, width = token.width));
                }
            }
        }
        out
    }

    /// Build the regex source that finds this layout anywhere in a string
    ///
    /// Each token becomes a named capture group and every separator literal
    /// is relaxed to "zero or more separators of any kind".
    pub fn regex_source(&self) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Field(token) => {
                    out.push_str(&format!(
                        "(?P<{}>{})",
                        token.field.group_name(),
                        token.pattern
                    ));
                }
                Piece::Literal(c) if SEPARATORS.contains(c) => out.push_str(SEPARATOR_PATTERN),
                Piece::Literal(c) => out.push_str(&regex::escape(&c.to_string())),
            }
        }
        out
    }

    /// Compile the layout into a regex
    ///
    /// Fails when a field appears twice, since capture group names must be unique.
    pub fn to_regex(&self) -> Result<Regex> {
        Ok(Regex::new(&self.regex_source())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(9, 3, 7)
            .unwrap()
    }

    #[test]
    fn test_format_padded_tokens() {
        assert_eq!(DateLayout::parse("yyyyMMdd").format(&sample()), "20240105");
        assert_eq!(DateLayout::parse("HHmmss").format(&sample()), "090307");
        assert_eq!(DateLayout::parse("yyyy-MM").format(&sample()), "2024-01");
        assert_eq!(DateLayout::parse("HH-mm-ss").format(&sample()), "09-03-07");
    }

    #[test]
    fn test_format_short_tokens() {
        assert_eq!(DateLayout::parse("d.M.yy").format(&sample()), "5.1.24");
        assert_eq!(DateLayout::parse("H:m:s").format(&sample()), "9:3:7");
    }

    #[test]
    fn test_literals_are_kept() {
        assert_eq!(DateLayout::parse("IMG yyyy").format(&sample()), "IMG 2024");
        assert!(DateLayout::parse("Photos").is_constant());
        assert!(!DateLayout::parse("yyyy").is_constant());
    }

    #[test]
    fn test_longest_token_wins() {
        let layout = DateLayout::parse("yyyyMMdd");
        assert!(layout.has_field(Field::Year));
        assert!(layout.has_field(Field::Month));
        assert!(layout.has_field(Field::Day));
        assert!(!layout.has_field(Field::Hour));
        assert_eq!(
            layout.regex_source(),
            "(?P<year>[0-9]{4})(?P<month>[0-9]{2})(?P<day>[0-9]{2})"
        );
    }

    #[test]
    fn test_separators_are_relaxed() {
        let regex = DateLayout::parse("yyyy-MM-dd").to_regex().unwrap();
        assert!(regex.is_match("2024-01-15"));
        assert!(regex.is_match("2024_01.15"));
        assert!(regex.is_match("20240115"));
        assert!(regex.is_match("photo 2024--01::15 copy"));
    }

    #[test]
    fn test_space_is_literal() {
        let regex = DateLayout::parse("yyyyMMdd HHmm").to_regex().unwrap();
        assert!(regex.is_match("20240115 1430"));
        assert!(!regex.is_match("20240115_1430"));
    }

    #[test]
    fn test_repeated_field_fails_to_compile() {
        assert!(DateLayout::parse("yyyy/yyyyMMdd").to_regex().is_err());
    }

    #[test]
    fn test_token_summary() {
        assert_eq!(token_summary(), "yyyy yy MM M dd d HH H mm m ss s");
    }
}
