use std::fmt::{self, Write as _};

/// A single configuration value.
///
/// The [`Display`][fmt::Display] form is the on-disk form: strings are double-quoted, with
/// backslash, double quote, line feed and carriage return written as `\\`, `\"`, `\n` and `\r`.
/// Floats always carry a decimal point or exponent so they read back as floats.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigValue {
    /// Free-form text.
    String(String),

    /// A signed integer.
    Integer(i64),

    /// A floating point number.
    Float(f64),

    /// `true` or `false`.
    Boolean(bool),
}

impl ConfigValue {
    /// Interprets the text to the right of `=` in a configuration line.
    ///
    /// `raw` must already be trimmed. A value wrapped in double quotes is always a string with
    /// the quotes removed and the escapes written by [`Display`][fmt::Display] resolved. A
    /// backslash that does not start one of those escapes is kept. Otherwise the first
    /// interpretation that fits wins: boolean (`true`, `TRUE`, `false`, `FALSE`), integer, float
    /// and finally string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if let Some(unquoted) = raw
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        {
            return Self::String(unescape(unquoted));
        }

        match raw {
            "true" | "TRUE" => return Self::Boolean(true),
            "false" | "FALSE" => return Self::Boolean(false),
            _ => {}
        }

        if let Ok(integer) = raw.parse::<i64>() {
            return Self::Integer(integer);
        }

        if let Ok(float) = raw.parse::<f64>() {
            return Self::Float(float);
        }

        Self::String(raw.to_string())
    }

    /// Name of the variant, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => {
                f.write_char('"')?;
                write_escaped(f, value)?;
                f.write_char('"')
            }
            Self::Integer(value) => write!(f, "{value}"),
            // Debug formatting keeps the ".0" on whole numbers.
            Self::Float(value) => write!(f, "{value:?}"),
            Self::Boolean(value) => write!(f, "{value}"),
        }
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    for c in value.chars() {
        match c {
            '\\' => f.write_str(r"\\")?,
            '"' => f.write_str(r#"\""#)?,
            '\n' => f.write_str(r"\n")?,
            '\r' => f.write_str(r"\r")?,
            other => f.write_char(other)?,
        }
    }

    Ok(())
}

fn unescape(escaped: &str) -> String {
    let mut result = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('"') => result.push('"'),
            Some('\\') => result.push('\\'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// A Rust type that can be read out of a [`ConfigValue`].
///
/// Reading is strict: a value is only converted if it is stored as the matching variant. An
/// integer is not a float, and a string that looks like a number is still a string.
pub trait ConfigType: Sized {
    /// Returns the value as `Self`, or `None` if it holds a different kind of value.
    fn from_value(value: &ConfigValue) -> Option<Self>;
}

impl ConfigType for String {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::String(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl ConfigType for i64 {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

impl ConfigType for i32 {
    /// Integers outside the `i32` range count as a mismatch.
    fn from_value(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Integer(value) => Self::try_from(*value).ok(),
            _ => None,
        }
    }
}

impl ConfigType for f64 {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl ConfigType for bool {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

impl ConfigType for ConfigValue {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        Some(value.clone())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn parse_recognizes_each_kind() {
        assert_eq!(ConfigValue::parse("true"), ConfigValue::Boolean(true));
        assert_eq!(ConfigValue::parse("FALSE"), ConfigValue::Boolean(false));
        assert_eq!(ConfigValue::parse("-42"), ConfigValue::Integer(-42));
        assert_eq!(ConfigValue::parse("2.75"), ConfigValue::Float(2.75));
        assert_eq!(ConfigValue::parse("1e-3"), ConfigValue::Float(0.001));
        assert_eq!(
            ConfigValue::parse("BTCUSD"),
            ConfigValue::String("BTCUSD".to_string())
        );
    }

    #[test]
    fn mixed_case_booleans_are_strings() {
        assert_eq!(
            ConfigValue::parse("True"),
            ConfigValue::String("True".to_string())
        );
    }

    #[test]
    fn quoted_values_are_always_strings() {
        assert_eq!(
            ConfigValue::parse("\"42\""),
            ConfigValue::String("42".to_string())
        );
        assert_eq!(
            ConfigValue::parse("\"true\""),
            ConfigValue::String("true".to_string())
        );
        assert_eq!(ConfigValue::parse("\"\""), ConfigValue::String(String::new()));
    }

    #[test]
    fn lone_quote_is_not_stripped() {
        assert_eq!(
            ConfigValue::parse("\""),
            ConfigValue::String("\"".to_string())
        );
    }

    #[test]
    fn display_is_the_file_form() {
        assert_eq!(ConfigValue::from("a b").to_string(), "\"a b\"");
        assert_eq!(ConfigValue::from(7_i32).to_string(), "7");
        assert_eq!(ConfigValue::from(3.0).to_string(), "3.0");
        assert_eq!(ConfigValue::from(false).to_string(), "false");
    }

    #[test]
    fn display_escapes_quotes_backslashes_and_line_breaks() {
        assert_eq!(
            ConfigValue::from("say \"hi\"\nC:\\dir\r").to_string(),
            r#""say \"hi\"\nC:\\dir\r""#
        );
    }

    #[test]
    fn quoted_values_resolve_escapes() {
        assert_eq!(
            ConfigValue::parse(r#""line one\nline \"two\"""#),
            ConfigValue::String("line one\nline \"two\"".to_string())
        );
        assert_eq!(
            ConfigValue::parse(r#""back\\slash""#),
            ConfigValue::String("back\\slash".to_string())
        );
    }

    #[test]
    fn unknown_escapes_keep_the_backslash() {
        assert_eq!(
            ConfigValue::parse(r#""C:\temp\x""#),
            ConfigValue::String(r"C:\temp\x".to_string())
        );
        assert_eq!(
            ConfigValue::parse(r#""trailing\""#),
            ConfigValue::String(r"trailing\".to_string())
        );
    }

    #[test]
    fn escaped_strings_survive_text() {
        let value = ConfigValue::from("a \"quoted\"\r\nvalue \\n is not a line break");
        assert_eq!(ConfigValue::parse(&value.to_string()), value);
    }

    #[test]
    fn whole_floats_stay_floats_through_text() {
        let value = ConfigValue::Float(100.0);
        assert_eq!(ConfigValue::parse(&value.to_string()), value);
    }

    #[test]
    fn typed_reads_are_strict() {
        let integer = ConfigValue::Integer(5);

        assert_eq!(i64::from_value(&integer), Some(5));
        assert_eq!(i32::from_value(&integer), Some(5));
        assert_eq!(f64::from_value(&integer), None);
        assert_eq!(String::from_value(&integer), None);
        assert_eq!(bool::from_value(&integer), None);
    }

    #[test]
    fn out_of_range_i32_is_a_mismatch() {
        let large = ConfigValue::Integer(i64::from(i32::MAX) + 1);
        assert_eq!(i32::from_value(&large), None);
    }
}
