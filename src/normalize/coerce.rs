use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use super::columns::CoercionKind;
use super::date_parser;
use super::record::FieldValue;

static NON_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9.\-]+").expect("static money pattern"));

/// Why a present cell could not be coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoercionFailure {
    UnparsableDate(String),
    UnparsableMoney(String),
}

impl fmt::Display for CoercionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoercionFailure::UnparsableDate(raw) => write!(f, "unable to convert date {:?}", raw),
            CoercionFailure::UnparsableMoney(raw) => {
                write!(f, "unable to convert money value {:?}", raw)
            }
        }
    }
}

/// Outcome of coercing one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    Value(FieldValue),
    /// Nothing to coerce: absent input, or blank money.
    Empty,
    Failed(CoercionFailure),
}

impl Coerced {
    /// Collapse to the stored value; failures become `Null`.
    pub fn into_value(self) -> FieldValue {
        match self {
            Coerced::Value(v) => v,
            Coerced::Empty | Coerced::Failed(_) => FieldValue::Null,
        }
    }
}

pub fn coerce(kind: CoercionKind, raw: Option<&str>) -> Coerced {
    match kind {
        CoercionKind::Identity => coerce_identity(raw),
        CoercionKind::Date => coerce_date(raw),
        CoercionKind::Money => coerce_money(raw),
    }
}

pub fn coerce_identity(raw: Option<&str>) -> Coerced {
    match raw {
        Some(s) => Coerced::Value(FieldValue::Text(s.to_string())),
        None => Coerced::Empty,
    }
}

/// A present cell must hold a date; only an absent one is `Empty`.
pub fn coerce_date(raw: Option<&str>) -> Coerced {
    let s = match raw {
        Some(s) => s,
        None => return Coerced::Empty,
    };
    match date_parser::parse_datetime(s) {
        Some(dt) => Coerced::Value(FieldValue::Date(dt)),
        None => Coerced::Failed(CoercionFailure::UnparsableDate(s.to_string())),
    }
}

/// Keep digits, `.` and `-`, then read a signed decimal.
pub fn coerce_money(raw: Option<&str>) -> Coerced {
    let s = match raw {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Coerced::Empty,
    };
    let stripped = NON_NUMERIC.replace_all(s, "");
    if stripped.is_empty() {
        return Coerced::Failed(CoercionFailure::UnparsableMoney(s.to_string()));
    }
    match stripped.parse::<f64>() {
        Ok(n) if n.is_finite() => Coerced::Value(FieldValue::Number(n)),
        _ => Coerced::Failed(CoercionFailure::UnparsableMoney(s.to_string())),
    }
}
