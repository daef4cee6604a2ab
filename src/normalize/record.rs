use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// One input line: header → raw cell, in file column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, header: impl Into<String>, value: impl Into<String>) {
        self.cells.push((header.into(), value.into()));
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(h, _)| h.as_str())
    }

    /// Raw value under the literal `header` (first occurrence).
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<H, V> FromIterator<(H, V)> for RawRow
where
    H: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (H, V)>>(iter: T) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(h, v)| (h.into(), v.into()))
                .collect(),
        }
    }
}

/// A typed canonical field value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(DateTime<Utc>),
    Null,
}

impl FieldValue {
    /// `Null`, or text with nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Number(_) | FieldValue::Date(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// A normalized vehicle: the provider tag plus one value per registry
/// field, kept in registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRecord {
    pub provider: String,
    fields: Vec<(&'static str, FieldValue)>,
}

impl VehicleRecord {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            fields: Vec::new(),
        }
    }

    /// Set `field`, replacing any earlier value.
    pub fn set(&mut self, field: &'static str, value: FieldValue) {
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(f, _)| *f == field).map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.fields.iter().map(|(f, v)| (*f, v))
    }

    /// True when nothing beyond `provider` carries a value.
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, v)| v.is_blank())
    }
}

impl Serialize for VehicleRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("provider", &self.provider)?;
        for (field, value) in &self.fields {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}
