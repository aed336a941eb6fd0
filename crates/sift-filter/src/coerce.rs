//! Literal text to typed [`Value`] conversion.
//!
//! Scalar literals are tried against an ordered rule list; the first rule that
//! accepts the text wins:
//!
//! 1. `""` / `''` → empty string
//! 2. numeric (`^[+-]?\d+(\.\d+)?$`) → integer, or float when fractional or out of range
//! 3. `true` / `false`
//! 4. `null`
//! 5. `undefined` → [`Value::Absent`]
//! 6. ISO-8601 timestamp (no zone means UTC)
//! 7. quoted text, quotes stripped and escapes resolved
//! 8. anything else verbatim
//!
//! Keywords are case-insensitive. Array literals (`{a,b}`) apply the scalar
//! rules to each comma-separated element.

use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Quote, SyntaxError};
use crate::value::{Number, Timestamp, Value};

static NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?[0-9]+(\.[0-9]+)?$").expect("numeric pattern is valid")
});

static TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}(?:\.[0-9]+)?)(Z|z|[+-][0-9]{2}:?[0-9]{2})?$",
    )
        .expect("timestamp pattern is valid")
});

/// Coerces one literal token (scalar or array) into a value.
///
/// # Example
///
/// ```
/// use sift_filter::{coerce, Value};
///
/// assert_eq!(coerce("42").unwrap(), Value::from(42));
/// assert_eq!(coerce("'x'").unwrap(), Value::from("x"));
/// assert_eq!(coerce("{1,,3}").unwrap(), Value::Array(vec![
///     Value::from(1),
///     Value::Absent,
///     Value::from(3),
/// ]));
/// ```
pub fn coerce(text: &str) -> Result<Value, SyntaxError> {
    match text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        Some(inner) => coerce_array(inner),
        None => coerce_scalar(text),
    }
}

/// Coerces the inside of an array literal (without its braces).
pub fn coerce_array(inner: &str) -> Result<Value, SyntaxError> {
    if inner.trim().is_empty() {
        return Ok(Value::Array(Vec::new()));
    }

    split_elements(inner)
        .into_iter()
        .map(|element| {
            let element = element.trim();
            if element.is_empty() {
                Ok(Value::Absent)
            } else {
                coerce_scalar(element)
            }
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

/// Coerces a single scalar literal.
pub fn coerce_scalar(text: &str) -> Result<Value, SyntaxError> {
    if text == "\"\"" || text == "''" {
        return Ok(Value::String(String::new()));
    }

    if let Some(n) = parse_number(text) {
        return Ok(Value::Number(n));
    }

    if text.eq_ignore_ascii_case("true") {
        return Ok(Value::Bool(true));
    }
    if text.eq_ignore_ascii_case("false") {
        return Ok(Value::Bool(false));
    }
    if text.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }
    if text.eq_ignore_ascii_case("undefined") {
        return Ok(Value::Absent);
    }

    if let Some(t) = parse_timestamp(text) {
        return Ok(Value::Timestamp(t));
    }

    coerce_text(text)
}

/// Parses a full numeric literal.
///
/// Integral text that fits `i64` (or `u64`) stays integral; everything else
/// accepted by the pattern becomes `f64`. Digits are ASCII only, and text too
/// large for a finite `f64` is not a number.
pub fn parse_number(text: &str) -> Option<Number> {
    if !NUMERIC.is_match(text) {
        return None;
    }
    if !text.contains('.') {
        if let Ok(n) = text.parse::<i64>() {
            return Some(Number::I64(n));
        }
        if let Ok(n) = text.parse::<u64>() {
            return Some(Number::U64(n));
        }
    }
    text.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(Number::F64)
}

/// Parses a full ISO-8601 timestamp that is also a valid calendar instant.
///
/// Accepts `YYYY-MM-DDTHH:MM:SS[.fff][Z|±HH:MM|±HHMM]`; a missing zone means
/// UTC.
pub fn parse_timestamp(text: &str) -> Option<Timestamp> {
    let caps = TIMESTAMP.captures(text)?;
    let base = caps.get(1)?.as_str();
    let zone = match caps.get(2).map(|m| m.as_str()) {
        None | Some("Z") | Some("z") => "Z".to_string(),
        Some(offset) if offset.contains(':') => offset.to_string(),
        Some(offset) => {
            let (hours, minutes) = (offset.get(..3)?, offset.get(3..)?);
            format!("{hours}:{minutes}")
        }
    };
    DateTime::parse_from_rfc3339(&format!("{base}{zone}"))
        .ok()
        .map(Timestamp::new)
}

fn coerce_text(text: &str) -> Result<Value, SyntaxError> {
    let first = text.chars().next().and_then(Quote::from_char);
    let last = text.chars().next_back().and_then(Quote::from_char);

    match first {
        Some(quote) => match closing_quote(text, quote) {
            Some(end) if end + 1 == text.len() => {
                Ok(Value::String(unescape(&text[1..end], quote)))
            }
            Some(_) => Ok(Value::String(text.to_string())),
            None => Err(SyntaxError::UnclosedQuoteInValue {
                quote,
                text: text.to_string(),
            }),
        },
        None => match last {
            Some(quote) => Err(SyntaxError::UnopenedQuote {
                quote,
                text: text.to_string(),
            }),
            None => Ok(Value::String(text.to_string())),
        },
    }
}

/// Byte index of the first unescaped `quote` after the opening one.
fn closing_quote(text: &str, quote: Quote) -> Option<usize> {
    let mut chars = text.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == quote.as_char() {
            return Some(i);
        }
    }
    None
}

fn unescape(inner: &str, quote: Quote) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(&next) if next == quote.as_char() || next == '\\' => {
                    out.push(next);
                    chars.next();
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Splits array contents on commas that are outside quotes.
///
/// A quote only opens a quoted element when it is the element's first
/// non-blank character.
fn split_elements(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut fresh = true;

    for (i, c) in inner.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, ',') => {
                parts.push(&inner[start..i]);
                start = i + 1;
                fresh = true;
                continue;
            }
            (None, '"' | '\'') if fresh => quote = Some(c),
            (None, c) if c.is_whitespace() => continue,
            _ => {}
        }
        fresh = false;
    }
    parts.push(&inner[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_quoted_strings() {
        assert_eq!(coerce("\"\"").unwrap(), Value::from(""));
        assert_eq!(coerce("''").unwrap(), Value::from(""));
    }

    #[test]
    fn numbers() {
        assert_eq!(coerce("42").unwrap(), Value::from(42));
        assert_eq!(coerce("-7").unwrap(), Value::from(-7));
        assert_eq!(coerce("+3").unwrap(), Value::from(3));
        assert_eq!(coerce("2.5").unwrap(), Value::from(2.5));
        assert_eq!(
            coerce("18446744073709551615").unwrap(),
            Value::Number(Number::U64(u64::MAX))
        );
        assert!(matches!(
            coerce("99999999999999999999999").unwrap(),
            Value::Number(Number::F64(_))
        ));
        // Not full numeric literals
        assert_eq!(coerce("1e5").unwrap(), Value::from("1e5"));
        assert_eq!(coerce(".5").unwrap(), Value::from(".5"));
        assert_eq!(coerce("5.").unwrap(), Value::from("5."));
    }

    #[test]
    fn non_ascii_digits_are_text() {
        let arabic = "2024-01-15T10:30:00+1\u{660}\u{660}\u{660}";
        assert_eq!(parse_timestamp(arabic), None);
        assert_eq!(coerce(arabic).unwrap(), Value::from(arabic));
        assert_eq!(coerce("\u{661}\u{662}").unwrap(), Value::from("\u{661}\u{662}"));
        assert_eq!(parse_number("\u{967}"), None);
    }

    #[test]
    fn overflowing_floats_are_text() {
        let huge = "9".repeat(400);
        assert_eq!(parse_number(&huge), None);
        assert_eq!(coerce(&huge).unwrap(), Value::from(huge.as_str()));
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(coerce("TRUE").unwrap(), Value::Bool(true));
        assert_eq!(coerce("False").unwrap(), Value::Bool(false));
        assert_eq!(coerce("NULL").unwrap(), Value::Null);
        assert_eq!(coerce("Undefined").unwrap(), Value::Absent);
    }

    #[test]
    fn quoted_keywords_stay_text() {
        assert_eq!(coerce("\"true\"").unwrap(), Value::from("true"));
        assert_eq!(coerce("'42'").unwrap(), Value::from("42"));
    }

    #[test]
    fn timestamps() {
        let utc = coerce("2024-01-15T10:30:00Z").unwrap();
        let naive = coerce("2024-01-15T10:30:00").unwrap();
        let compact = coerce("2024-01-15T12:30:00+0200").unwrap();
        let colon = coerce("2024-01-15T12:30:00+02:00").unwrap();
        assert!(matches!(utc, Value::Timestamp(_)));
        assert_eq!(utc, naive);
        assert_eq!(compact, colon);
        assert!(utc.loose_eq(&colon));

        let fractional = coerce("2024-01-15T10:30:00.125Z").unwrap();
        assert_eq!(
            fractional.as_timestamp().map(|t| t.as_millis() % 1000),
            Some(125)
        );
    }

    #[test]
    fn invalid_calendar_dates_fall_through_to_text() {
        assert_eq!(
            coerce("2024-02-30T10:00:00Z").unwrap(),
            Value::from("2024-02-30T10:00:00Z")
        );
        assert_eq!(coerce("2024-01-15").unwrap(), Value::from("2024-01-15"));
    }

    #[test]
    fn quoted_escapes() {
        assert_eq!(coerce(r#""say \"hi\"""#).unwrap(), Value::from("say \"hi\""));
        assert_eq!(coerce(r"'it\'s'").unwrap(), Value::from("it's"));
        assert_eq!(coerce(r#""a\\b""#).unwrap(), Value::from(r"a\b"));
        // Escapes of other characters are kept literally
        assert_eq!(coerce(r#""a\nb""#).unwrap(), Value::from(r"a\nb"));
        // The other quote character needs no escape
        assert_eq!(coerce(r#""it's""#).unwrap(), Value::from("it's"));
    }

    #[test]
    fn one_sided_quotes_are_errors() {
        let err = coerce("\"abc").unwrap_err();
        assert!(matches!(
            err,
            SyntaxError::UnclosedQuoteInValue {
                quote: Quote::Double,
                ..
            }
        ));
        assert!(err.to_string().contains("unclosed double quote"));

        let err = coerce("abc'").unwrap_err();
        assert!(matches!(
            err,
            SyntaxError::UnopenedQuote {
                quote: Quote::Single,
                ..
            }
        ));
        assert!(err.to_string().contains("without an opening quote"));

        // An escaped closing quote does not close the literal
        assert!(coerce(r#""abc\""#).is_err());
    }

    #[test]
    fn bare_text() {
        assert_eq!(coerce("hello").unwrap(), Value::from("hello"));
        assert_eq!(coerce("it's").unwrap(), Value::from("it's"));
    }

    #[test]
    fn arrays() {
        assert_eq!(
            coerce("{a,b,c}").unwrap(),
            Value::from(vec!["a", "b", "c"])
        );
        assert_eq!(
            coerce("{1,,3}").unwrap(),
            Value::Array(vec![Value::from(1), Value::Absent, Value::from(3)])
        );
        assert_eq!(coerce("{}").unwrap(), Value::Array(vec![]));
        assert_eq!(coerce("{ }").unwrap(), Value::Array(vec![]));
        assert_eq!(
            coerce("{ 1 , true , null }").unwrap(),
            Value::Array(vec![Value::from(1), Value::Bool(true), Value::Null])
        );
    }

    #[test]
    fn array_elements_are_quote_aware() {
        assert_eq!(
            coerce(r#"{"a,b",'c'}"#).unwrap(),
            Value::from(vec!["a,b", "c"])
        );
        assert_eq!(
            coerce(r#"{"x\",y"}"#).unwrap(),
            Value::from(vec!["x\",y"])
        );
        assert_eq!(
            coerce("{it's, x}").unwrap(),
            Value::from(vec!["it's", "x"])
        );
    }

    #[test]
    fn array_element_errors_propagate() {
        assert!(coerce("{\"abc,1}").is_err());
    }
}
