//! Column reconciliation for externally authored tables.
//!
//! Import files arrive with whatever headers their author picked ("Bodega",
//! " Vintage ", "PUNTOS"...). Headers are normalized by trimming and
//! lower-casing, then each canonical field is resolved through its alias list
//! in priority order. The first alias whose cell holds a value wins; a column
//! that exists but is blank for this row does not stop the search.
//!
//! Coercion never fails. A missing or malformed cell becomes the caller's
//! default.

use std::collections::HashMap;

use crate::record::{DEFAULT_DRINK_BY, DEFAULT_RATING, DEFAULT_VINTAGE, UNSPECIFIED_GRAPE};

pub const DEFAULT_IMPORT_NAME: &str = "Sin Nombre";
pub const DEFAULT_IMPORT_WINERY: &str = "Desconocida";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Name,
    Winery,
    Winemaker,
    VintageYear,
    Grape,
    QualityTier,
    Origin,
    TechnicalDetail,
    DrinkByYear,
    Rating,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 10] = [
        CanonicalField::Name,
        CanonicalField::Winery,
        CanonicalField::Winemaker,
        CanonicalField::VintageYear,
        CanonicalField::Grape,
        CanonicalField::QualityTier,
        CanonicalField::Origin,
        CanonicalField::TechnicalDetail,
        CanonicalField::DrinkByYear,
        CanonicalField::Rating,
    ];

    /// Accepted header labels, already normalized, highest priority first.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::Name => &["name", "nombre"],
            CanonicalField::Winery => &["winery", "bodega"],
            CanonicalField::Winemaker => &["winemaker", "enologo"],
            CanonicalField::VintageYear => &["vintage", "year", "anada", "añada"],
            CanonicalField::Grape => &["grape", "variedad", "uva", "tipo"],
            CanonicalField::QualityTier => &["quality", "gama", "calidad"],
            CanonicalField::Origin => &["region", "procedencia"],
            CanonicalField::TechnicalDetail => &["description", "notes", "detalle", "notas"],
            CanonicalField::DrinkByYear => &["consumo", "anio_limite"],
            CanonicalField::Rating => &["puntos", "puntuacion"],
        }
    }
}

pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

pub fn coerce_str(raw: Option<&str>, default: &str) -> String {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => default.to_string(),
    }
}

/// Parses integers, including decimal spellings such as `2020.0` which are
/// truncated toward zero. Anything else yields `default`.
pub fn coerce_int(raw: Option<&str>, default: i64) -> i64 {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return default;
    };
    if let Ok(parsed) = value.parse::<i64>() {
        return parsed;
    }
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed.abs() < i64::MAX as f64 => parsed.trunc() as i64,
        _ => default,
    }
}

/// Canonical values extracted from one input row, before varietal
/// classification and id allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledRow {
    pub name: String,
    pub winery: String,
    pub winemaker: String,
    pub vintage_year: i64,
    pub grape: String,
    pub quality_tier: String,
    pub origin: String,
    pub technical_detail: String,
    pub drink_by_year: i64,
    pub rating: i64,
}

#[derive(Debug, Clone)]
pub struct ColumnReconciler {
    positions: HashMap<String, usize>,
}

impl ColumnReconciler {
    /// Duplicate labels after normalization resolve to the leftmost column.
    pub fn new(headers: &[String]) -> Self {
        let mut positions = HashMap::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            positions.entry(normalize_label(header)).or_insert(idx);
        }
        Self { positions }
    }

    pub fn has_column(&self, alias: &str) -> bool {
        self.positions.contains_key(alias)
    }

    /// Fields for which no alias matched any header of the input.
    pub fn unmatched_fields(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .filter(|field| !field.aliases().iter().any(|alias| self.has_column(alias)))
            .collect()
    }

    pub fn lookup<'r>(&self, cells: &'r [String], aliases: &[&str]) -> Option<&'r str> {
        aliases.iter().find_map(|alias| {
            let idx = *self.positions.get(*alias)?;
            cells
                .get(idx)
                .map(String::as_str)
                .filter(|value| !value.trim().is_empty())
        })
    }

    pub fn text(&self, cells: &[String], field: CanonicalField, default: &str) -> String {
        coerce_str(self.lookup(cells, field.aliases()), default)
    }

    pub fn int(&self, cells: &[String], field: CanonicalField, default: i64) -> i64 {
        coerce_int(self.lookup(cells, field.aliases()), default)
    }

    pub fn reconcile(&self, cells: &[String]) -> ReconciledRow {
        use CanonicalField::*;
        ReconciledRow {
            name: self.text(cells, Name, DEFAULT_IMPORT_NAME),
            winery: self.text(cells, Winery, DEFAULT_IMPORT_WINERY),
            winemaker: self.text(cells, Winemaker, ""),
            vintage_year: self.int(cells, VintageYear, i64::from(DEFAULT_VINTAGE)),
            grape: self.text(cells, Grape, UNSPECIFIED_GRAPE),
            quality_tier: self.text(cells, QualityTier, ""),
            origin: self.text(cells, Origin, ""),
            technical_detail: self.text(cells, TechnicalDetail, ""),
            drink_by_year: self.int(cells, DrinkByYear, i64::from(DEFAULT_DRINK_BY)),
            rating: self.int(cells, Rating, i64::from(DEFAULT_RATING)),
        }
    }
}
