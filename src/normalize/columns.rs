// src/normalize/columns.rs

use once_cell::sync::Lazy;
use serde::Serialize;

/// How a raw cell is turned into a typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionKind {
    Identity,
    Date,
    Money,
}

/// One provider column mapped onto a canonical vehicle field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDefinition {
    /// Header name as providers write it; matched case-insensitively.
    pub display_name: &'static str,
    pub canonical_field: &'static str,
    pub coercion: CoercionKind,
}

const fn column(
    display_name: &'static str,
    canonical_field: &'static str,
    coercion: CoercionKind,
) -> ColumnDefinition {
    ColumnDefinition {
        display_name,
        canonical_field,
        coercion,
    }
}

/// The ordered column registry. Built once, shared read-only.
pub static COLUMNS: Lazy<Vec<ColumnDefinition>> = Lazy::new(|| {
    vec![
        column("UUID", "uuid", CoercionKind::Identity),
        column("VIN", "vin", CoercionKind::Identity),
        column("Make", "make", CoercionKind::Identity),
        column("Model", "model", CoercionKind::Identity),
        column("Mileage", "mileage", CoercionKind::Identity),
        column("Year", "year", CoercionKind::Identity),
        column("Price", "price", CoercionKind::Money),
        column("Zip Code", "zip_code", CoercionKind::Identity),
        column("Create Date", "create_date", CoercionKind::Date),
        column("Update Date", "update_date", CoercionKind::Date),
    ]
});

pub fn columns() -> &'static [ColumnDefinition] {
    &COLUMNS
}

/// Find the header matching `def`, comparing lowercase forms exactly.
/// With duplicate headers the first one wins.
pub fn find_header<'a, I>(headers: I, def: &ColumnDefinition) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let wanted = def.display_name.to_lowercase();
    headers.into_iter().find(|h| h.to_lowercase() == wanted)
}

/// Render the registry as YAML for display.
pub fn registry_yaml() -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(columns())
}
