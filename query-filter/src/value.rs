//! Typed query values and the inference rules that produce them
//!
//! Inference is total: every literal maps to exactly one [`Value`], falling
//! back to [`Value::Str`] when nothing more specific matches. Precedence for
//! bare literals is `Bool`, `Number`, the six date formats, `Wildcard`, `Str`.

use crate::lexer::{Comparator, Quoting};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

static NUMBER_REGEX: OnceLock<Regex> = OnceLock::new();

fn number_regex() -> &'static Regex {
    NUMBER_REGEX.get_or_init(|| Regex::new(r"^-?(?:\d+(?:\.\d*)?|\.\d+)$").unwrap())
}

/// Date-only formats, interpreted as midnight UTC
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y/%m/%d"];

/// Datetime formats without an offset, interpreted as UTC
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// The store's native 12-byte identifier, written as 24 hex characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef([u8; 12]);

impl ObjectRef {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for ObjectRef {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A match pattern as it will appear under `$regex`
#[derive(Debug, Clone, PartialEq)]
pub struct RegexPattern {
    pub pattern: String,
    pub case_insensitive: bool,
}

impl RegexPattern {
    /// A user-supplied pattern, anchored with `^`/`$` unless already anchored
    pub fn anchored(pattern: &str) -> Self {
        let mut anchored = String::with_capacity(pattern.len() + 2);
        if !pattern.starts_with('^') {
            anchored.push('^');
        }
        anchored.push_str(pattern);
        if !pattern.ends_with('$') {
            anchored.push('$');
        }
        Self {
            pattern: anchored,
            case_insensitive: false,
        }
    }

    /// Translates `*` to `.*`; a leading or trailing `*` leaves that end unanchored
    pub fn from_wildcard(wildcard: &str) -> Self {
        let body = wildcard.replace('*', ".*");
        let mut pattern = String::with_capacity(body.len() + 2);
        if !wildcard.starts_with('*') {
            pattern.push('^');
        }
        pattern.push_str(&body);
        if !wildcard.ends_with('*') {
            pattern.push('$');
        }
        Self {
            pattern,
            case_insensitive: false,
        }
    }

    /// Whole-value, case-insensitive match of a literal term
    pub fn exact_insensitive(term: &str) -> Self {
        Self {
            pattern: format!("^{}$", regex::escape(term)),
            case_insensitive: true,
        }
    }

    pub fn options(&self) -> Option<&'static str> {
        self.case_insensitive.then_some("i")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Number(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    ObjectRef(ObjectRef),
    /// Raw pattern with `*` wildcards, translated at compile time
    Wildcard(String),
    Regex(RegexPattern),
    Range {
        lo: Option<Box<Value>>,
        hi: Option<Box<Value>>,
    },
    Comparison {
        op: Comparator,
        value: Box<Value>,
    },
    /// Not-equal wrapper produced by negation
    Ne(Box<Value>),
    /// Logical-not wrapper produced by negation
    Not(Box<Value>),
}

impl Value {
    /// Kind tag shared by values that may bound a range
    fn range_kind(&self) -> Option<&'static str> {
        match self {
            Value::Number(_) => Some("number"),
            Value::Date(_) => Some("date"),
            Value::Str(_) => Some("string"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::ObjectRef(id) => write!(f, "ObjectRef({})", id),
            Value::Wildcard(p) => write!(f, "{}", p),
            Value::Regex(re) => {
                write!(f, "/{}/", re.pattern)?;
                if re.case_insensitive {
                    write!(f, "i")?;
                }
                Ok(())
            }
            Value::Range { lo, hi } => {
                write!(f, "[")?;
                match lo {
                    Some(v) => write!(f, "{}", v)?,
                    None => write!(f, "*")?,
                }
                write!(f, " TO ")?;
                match hi {
                    Some(v) => write!(f, "{}", v)?,
                    None => write!(f, "*")?,
                }
                write!(f, "]")
            }
            Value::Comparison { op, value } => write!(f, "{}{}", op, value),
            Value::Ne(inner) => write!(f, "$ne({})", inner),
            Value::Not(inner) => write!(f, "$not({})", inner),
        }
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    if !number_regex().is_match(raw) {
        return None;
    }
    // overlong digit strings overflow to infinity
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Tries the supported date formats in precedence order
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

/// Paths whose values may be object references: `id`, `_id` and `*_id`
pub fn is_identity_path(path: &str) -> bool {
    path == "id" || path.ends_with("_id")
}

fn infer_bare(raw: &str, allow_wildcard: bool, identity: bool) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    // an all-digit id must not be read as a number
    if identity && raw.parse::<ObjectRef>().is_ok() {
        return Value::Str(raw.to_string());
    }
    if let Some(n) = parse_number(raw) {
        Value::Number(n)
    } else if let Some(date) = parse_date(raw) {
        Value::Date(date)
    } else if allow_wildcard && raw.contains('*') {
        Value::Wildcard(raw.to_string())
    } else {
        Value::Str(raw.to_string())
    }
}

/// Infers the value of a `path:value` literal; quoting forces a string.
///
/// On identity paths a 24-hex literal stays a string so it can become a
/// reference later.
pub fn infer_literal(path: &str, raw: &str, quoting: Quoting) -> Value {
    match quoting {
        Quoting::Bare => infer_bare(raw, true, is_identity_path(path)),
        Quoting::Double | Quoting::Single => Value::Str(raw.to_string()),
    }
}

/// An explicit `/.../` literal
pub fn infer_regex(pattern: &str) -> Value {
    Value::Regex(RegexPattern::anchored(pattern))
}

/// `>v`, `<v`, `>=v`, `<=v`; the operand is a scalar, never a wildcard
pub fn infer_comparison(path: &str, op: Comparator, raw: &str, quoting: Quoting) -> Value {
    let value = match quoting {
        Quoting::Bare => infer_bare(raw, false, is_identity_path(path)),
        Quoting::Double | Quoting::Single => Value::Str(raw.to_string()),
    };
    Value::Comparison {
        op,
        value: Box::new(value),
    }
}

fn range_bound(path: &str, raw: &str, quoting: Quoting) -> Option<Value> {
    if quoting == Quoting::Bare && raw == "*" {
        None
    } else {
        Some(infer_literal(path, raw, quoting))
    }
}

/// `[lo TO hi]`, inclusive, `*` for an open end.
///
/// Degrades to the literal string `"[lo TO hi]"`, quotes included, when both
/// ends are open or the ends do not share one orderable kind (number, date or
/// string).
pub fn infer_range(
    path: &str,
    lo: &str,
    lo_quoting: Quoting,
    hi: &str,
    hi_quoting: Quoting,
) -> Value {
    let literal = || {
        Value::Str(format!(
            "[{} TO {}]",
            lo_quoting.quote(lo),
            hi_quoting.quote(hi)
        ))
    };
    let lo_value = range_bound(path, lo, lo_quoting);
    let hi_value = range_bound(path, hi, hi_quoting);
    if lo_value.is_none() && hi_value.is_none() {
        return literal();
    }

    let kinds: Option<Vec<&'static str>> = [lo_value.as_ref(), hi_value.as_ref()]
        .into_iter()
        .flatten()
        .map(Value::range_kind)
        .collect();
    match kinds {
        Some(kinds) if kinds.windows(2).all(|pair| pair[0] == pair[1]) => Value::Range {
            lo: lo_value.map(Box::new),
            hi: hi_value.map(Box::new),
        },
        _ => literal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bare(raw: &str) -> Value {
        infer_literal("n", raw, Quoting::Bare)
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> Value {
        Value::Date(Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap())
    }

    #[test]
    fn test_booleans_are_exact() {
        assert_eq!(bare("true"), Value::Bool(true));
        assert_eq!(bare("false"), Value::Bool(false));
        assert_eq!(bare("True"), Value::Str("True".to_string()));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(bare("42"), Value::Number(42.0));
        assert_eq!(bare("-3.5"), Value::Number(-3.5));
        assert_eq!(bare(".5"), Value::Number(0.5));
        assert_eq!(bare("not-a-number"), Value::Str("not-a-number".to_string()));
        assert_eq!(bare("1.2.3"), Value::Str("1.2.3".to_string()));
        assert_eq!(bare("1e10"), Value::Str("1e10".to_string()));
        assert_eq!(bare("NaN"), Value::Str("NaN".to_string()));
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(bare("2024-03-01"), utc(2024, 3, 1, 0, 0, 0));
        assert_eq!(bare("2024-03-01T12:30:45Z"), utc(2024, 3, 1, 12, 30, 45));
        assert_eq!(bare("2024-03-01T12:30:45"), utc(2024, 3, 1, 12, 30, 45));
        assert_eq!(bare("2024-03-01 12:30:45"), utc(2024, 3, 1, 12, 30, 45));
        assert_eq!(bare("03/01/2024"), utc(2024, 3, 1, 0, 0, 0));
        assert_eq!(bare("2024/03/01"), utc(2024, 3, 1, 0, 0, 0));
    }

    #[test]
    fn test_fractional_seconds() {
        let expected = Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 30, 45)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(250))
            .unwrap();
        assert_eq!(bare("2024-03-01T12:30:45.250Z"), Value::Date(expected));
    }

    #[test]
    fn test_invalid_date_falls_back_to_string() {
        assert_eq!(bare("2024-13-01"), Value::Str("2024-13-01".to_string()));
    }

    #[test]
    fn test_quoting_forces_string() {
        assert_eq!(
            infer_literal("n", "42", Quoting::Double),
            Value::Str("42".to_string())
        );
        assert_eq!(
            infer_literal("n", "a*", Quoting::Single),
            Value::Str("a*".to_string())
        );
    }

    #[test]
    fn test_wildcard() {
        assert_eq!(bare("jo*n"), Value::Wildcard("jo*n".to_string()));
    }

    #[test]
    fn test_wildcard_translation() {
        assert_eq!(RegexPattern::from_wildcard("*").pattern, ".*");
        assert_eq!(RegexPattern::from_wildcard("x*").pattern, "^x.*");
        assert_eq!(RegexPattern::from_wildcard("*x").pattern, ".*x$");
        assert_eq!(RegexPattern::from_wildcard("*x*").pattern, ".*x.*");
        assert_eq!(RegexPattern::from_wildcard("a*b").pattern, "^a.*b$");
    }

    #[test]
    fn test_regex_anchoring_is_idempotent() {
        assert_eq!(RegexPattern::anchored("x").pattern, "^x$");
        assert_eq!(RegexPattern::anchored("^x$").pattern, "^x$");
        assert_eq!(RegexPattern::anchored("^x").pattern, "^x$");
        assert_eq!(
            infer_regex("a.c"),
            Value::Regex(RegexPattern {
                pattern: "^a.c$".to_string(),
                case_insensitive: false
            })
        );
    }

    #[test]
    fn test_exact_insensitive_escapes_term() {
        let re = RegexPattern::exact_insensitive("c++");
        assert_eq!(re.pattern, r"^c\+\+$");
        assert_eq!(re.options(), Some("i"));
    }

    #[test]
    fn test_comparison_infers_operand() {
        assert_eq!(
            infer_comparison("n", Comparator::Gte, "10", Quoting::Bare),
            Value::Comparison {
                op: Comparator::Gte,
                value: Box::new(Value::Number(10.0))
            }
        );
        assert_eq!(
            infer_comparison("n", Comparator::Lt, "b*", Quoting::Bare),
            Value::Comparison {
                op: Comparator::Lt,
                value: Box::new(Value::Str("b*".to_string()))
            }
        );
    }

    #[test]
    fn test_numeric_range() {
        assert_eq!(
            infer_range("n", "18", Quoting::Bare, "65", Quoting::Bare),
            Value::Range {
                lo: Some(Box::new(Value::Number(18.0))),
                hi: Some(Box::new(Value::Number(65.0)))
            }
        );
    }

    #[test]
    fn test_open_ended_range() {
        assert_eq!(
            infer_range("n", "*", Quoting::Bare, "2024-01-01", Quoting::Bare),
            Value::Range {
                lo: None,
                hi: Some(Box::new(utc(2024, 1, 1, 0, 0, 0)))
            }
        );
    }

    #[test]
    fn test_fully_open_range_degrades_to_literal() {
        assert_eq!(
            infer_range("n", "*", Quoting::Bare, "*", Quoting::Bare),
            Value::Str("[* TO *]".to_string())
        );
    }

    #[test]
    fn test_mismatched_range_degrades_to_literal() {
        assert_eq!(
            infer_range("n", "10", Quoting::Bare, "abc", Quoting::Bare),
            Value::Str("[10 TO abc]".to_string())
        );
        assert_eq!(
            infer_range("n", "true", Quoting::Bare, "*", Quoting::Bare),
            Value::Str("[true TO *]".to_string())
        );
    }

    #[test]
    fn test_overlong_number_stays_a_string() {
        let digits = "9".repeat(400);
        assert_eq!(bare(&digits), Value::Str(digits.clone()));
    }

    #[test]
    fn test_identity_paths() {
        assert!(is_identity_path("id"));
        assert!(is_identity_path("_id"));
        assert!(is_identity_path("owner_id"));
        assert!(!is_identity_path("ident"));
        assert!(!is_identity_path("idx"));
    }

    #[test]
    fn test_all_digit_id_is_not_a_number() {
        let raw = "123456789012345678901234";
        assert_eq!(
            infer_literal("id", raw, Quoting::Bare),
            Value::Str(raw.to_string())
        );
        assert_eq!(
            infer_comparison("owner_id", Comparator::Gt, raw, Quoting::Bare),
            Value::Comparison {
                op: Comparator::Gt,
                value: Box::new(Value::Str(raw.to_string()))
            }
        );
        assert_eq!(infer_literal("count", "42", Quoting::Bare), Value::Number(42.0));
        assert_eq!(infer_literal("id", "42", Quoting::Bare), Value::Number(42.0));
    }

    #[test]
    fn test_degraded_range_keeps_quotes() {
        assert_eq!(
            infer_range("n", "x", Quoting::Double, "5", Quoting::Bare),
            Value::Str("[\"x\" TO 5]".to_string())
        );
        assert_eq!(
            infer_range("n", "a", Quoting::Single, "true", Quoting::Bare),
            Value::Str("['a' TO true]".to_string())
        );
    }

    #[test]
    fn test_object_ref_parsing() {
        let id: ObjectRef = "507F1F77BCF86CD799439011".parse().unwrap();
        assert_eq!(id.to_string(), "507f1f77bcf86cd799439011");
        assert!("507f1f77bcf86cd79943901".parse::<ObjectRef>().is_err());
        assert!("507f1f77bcf86cd79943901z".parse::<ObjectRef>().is_err());
        assert!("not-hex".parse::<ObjectRef>().is_err());
    }
}
