//! The wine record, its storage locations, and the persisted row layout.
//!
//! [`Wine`] is the only entity in the catalog. [`CatalogRow`] is its canonical
//! serialization: one string cell per column, in the order the cellar sheet
//! has always used. Reading a row never fails; numeric cells are coerced and
//! an unreadable photo is dropped with a warning.

use std::{fmt, str::FromStr};

use log::warn;
use serde::{Deserialize, Serialize, Serializer};

use crate::reconcile::{coerce_int, coerce_str};

pub const BLEND_MARKER: &str = "Blend";
pub const UNSPECIFIED_GRAPE: &str = "Otro";
pub const DEFAULT_VINTAGE: i32 = 2023;
pub const DEFAULT_DRINK_BY: i32 = 2030;
pub const DEFAULT_RATING: u8 = 5;
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 10;

pub const STANDARD_GRAPES: &[&str] = &[
    "Malbec",
    "Cabernet Sauvignon",
    "Merlot",
    "Syrah",
    "Chardonnay",
    "Pinot Noir",
    "Torrontés",
    "Bonarda",
    "Petit Verdot",
    "Cabernet Franc",
    BLEND_MARKER,
    UNSPECIFIED_GRAPE,
];

/// Column headers of the persisted table, in write order.
pub const CATALOG_HEADERS: &[&str] = &[
    "id",
    "nombre",
    "bodega",
    "enologo",
    "anada",
    "uva_principal",
    "composicion_blend",
    "gama",
    "procedencia",
    "detalle",
    "nota_cata",
    "ubicacion",
    "anio_limite",
    "puntuacion",
    "imagen_data",
    "tipo_imagen",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Location {
    #[default]
    Unclassified,
    ElectricCellar,
    NorthRacks,
    NorthTrays,
    EastTrays,
    EastDrawers,
    EastLargeX,
    EastHalfX,
    SouthUpperGrid,
    SouthLeftX,
    SouthCenterX,
    SouthRightX,
    Other,
    /// Terminal pseudo-location for bottles that have been drunk.
    Consumed,
}

impl Location {
    pub const ALL: [Location; 14] = [
        Location::Unclassified,
        Location::ElectricCellar,
        Location::NorthRacks,
        Location::NorthTrays,
        Location::EastTrays,
        Location::EastDrawers,
        Location::EastLargeX,
        Location::EastHalfX,
        Location::SouthUpperGrid,
        Location::SouthLeftX,
        Location::SouthCenterX,
        Location::SouthRightX,
        Location::Other,
        Location::Consumed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Location::Unclassified => "Por Clasificar",
            Location::ElectricCellar => "Cava Eléctrica",
            Location::NorthRacks => "Mueble Norte - Botelleros",
            Location::NorthTrays => "Mueble Norte - Bandejas",
            Location::EastTrays => "Mueble Este - Bandejas",
            Location::EastDrawers => "Mueble Este - Cajonera",
            Location::EastLargeX => "Mueble Este - X Grande",
            Location::EastHalfX => "Mueble Este - Media X",
            Location::SouthUpperGrid => "Mueble Sur - Retícula Superior",
            Location::SouthLeftX => "Mueble Sur - X Izquierda",
            Location::SouthCenterX => "Mueble Sur - X Centro",
            Location::SouthRightX => "Mueble Sur - X Derecha",
            Location::Other => "Otro",
            Location::Consumed => "Consumido",
        }
    }

    /// Locations a bottle can be placed in directly. `Consumed` is only
    /// reachable through [`crate::catalog::Catalog::consume`].
    pub fn placeable() -> impl Iterator<Item = Location> {
        Location::ALL
            .into_iter()
            .filter(|location| *location != Location::Consumed)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_lowercase();
        Location::ALL
            .into_iter()
            .find(|location| location.label().to_lowercase() == wanted)
            .ok_or_else(|| format!("Unknown location '{}'", value.trim()))
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Bottle photo. Payload and media type are always stored together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Photo {
    #[serde(skip_serializing)]
    pub bytes: Vec<u8>,
    pub mime: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wine {
    pub id: u64,
    pub name: String,
    pub winery: String,
    pub winemaker: String,
    pub vintage_year: i32,
    pub primary_grape: String,
    pub blend_components: String,
    pub quality_tier: String,
    pub origin: String,
    pub technical_detail: String,
    pub personal_note: String,
    pub location: Location,
    pub drink_by_year: i32,
    pub rating: u8,
    pub photo: Option<Photo>,
}

impl Default for Wine {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            winery: String::new(),
            winemaker: String::new(),
            vintage_year: DEFAULT_VINTAGE,
            primary_grape: UNSPECIFIED_GRAPE.to_string(),
            blend_components: String::new(),
            quality_tier: String::new(),
            origin: String::new(),
            technical_detail: String::new(),
            personal_note: String::new(),
            location: Location::Unclassified,
            drink_by_year: DEFAULT_DRINK_BY,
            rating: DEFAULT_RATING,
            photo: None,
        }
    }
}

impl Wine {
    pub fn is_consumed(&self) -> bool {
        self.location == Location::Consumed
    }

    pub fn is_blend(&self) -> bool {
        self.primary_grape == BLEND_MARKER
    }

    /// Constituent varietals of a blend. Imported blends keep the slash form
    /// and manual blends use commas, so both are split here.
    pub fn blend_parts(&self) -> Vec<&str> {
        self.blend_components
            .split([',', '/'])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect()
    }
}

/// One persisted row. Every cell is text so that a hand-edited sheet with
/// stray values in numeric columns still loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogRow {
    pub id: String,
    #[serde(rename = "nombre", alias = "name")]
    pub name: String,
    #[serde(rename = "bodega", alias = "winery")]
    pub winery: String,
    #[serde(rename = "enologo", alias = "winemaker")]
    pub winemaker: String,
    #[serde(rename = "anada", alias = "vintage_year")]
    pub vintage_year: String,
    #[serde(rename = "uva_principal", alias = "grape")]
    pub grape: String,
    #[serde(rename = "composicion_blend", alias = "blend_components")]
    pub blend_components: String,
    #[serde(rename = "gama", alias = "quality_tier")]
    pub quality_tier: String,
    #[serde(rename = "procedencia", alias = "origin")]
    pub origin: String,
    #[serde(rename = "detalle", alias = "technical_detail")]
    pub technical_detail: String,
    #[serde(rename = "nota_cata", alias = "personal_note")]
    pub personal_note: String,
    #[serde(rename = "ubicacion", alias = "location")]
    pub location: String,
    #[serde(rename = "anio_limite", alias = "drink_by_year")]
    pub drink_by_year: String,
    #[serde(rename = "puntuacion", alias = "rating")]
    pub rating: String,
    #[serde(rename = "imagen_data", alias = "image_bytes")]
    pub image_bytes: String,
    #[serde(rename = "tipo_imagen", alias = "image_mime")]
    pub image_mime: String,
}

impl From<&Wine> for CatalogRow {
    fn from(wine: &Wine) -> Self {
        let (image_bytes, image_mime) = match &wine.photo {
            Some(photo) => (encode_hex(&photo.bytes), photo.mime.clone()),
            None => (String::new(), String::new()),
        };
        Self {
            id: wine.id.to_string(),
            name: wine.name.clone(),
            winery: wine.winery.clone(),
            winemaker: wine.winemaker.clone(),
            vintage_year: wine.vintage_year.to_string(),
            grape: wine.primary_grape.clone(),
            blend_components: wine.blend_components.clone(),
            quality_tier: wine.quality_tier.clone(),
            origin: wine.origin.clone(),
            technical_detail: wine.technical_detail.clone(),
            personal_note: wine.personal_note.clone(),
            location: wine.location.label().to_string(),
            drink_by_year: wine.drink_by_year.to_string(),
            rating: wine.rating.to_string(),
            image_bytes,
            image_mime,
        }
    }
}

impl From<CatalogRow> for Wine {
    fn from(row: CatalogRow) -> Self {
        let id = coerce_int(Some(&row.id), 0).max(0) as u64;
        let location = if row.location.trim().is_empty() {
            Location::Unclassified
        } else {
            row.location.parse().unwrap_or_else(|err| {
                warn!("Wine {id}: {err}; treating it as '{}'", Location::Unclassified);
                Location::Unclassified
            })
        };
        let photo = decode_photo(id, &row.image_bytes, &row.image_mime);
        Wine {
            id,
            name: coerce_str(Some(&row.name), ""),
            winery: coerce_str(Some(&row.winery), ""),
            winemaker: coerce_str(Some(&row.winemaker), ""),
            vintage_year: coerce_year(&row.vintage_year, DEFAULT_VINTAGE),
            primary_grape: coerce_str(Some(&row.grape), ""),
            blend_components: coerce_str(Some(&row.blend_components), ""),
            quality_tier: coerce_str(Some(&row.quality_tier), ""),
            origin: coerce_str(Some(&row.origin), ""),
            technical_detail: coerce_str(Some(&row.technical_detail), ""),
            personal_note: coerce_str(Some(&row.personal_note), ""),
            location,
            drink_by_year: coerce_year(&row.drink_by_year, DEFAULT_DRINK_BY),
            rating: clamp_rating(coerce_int(Some(&row.rating), i64::from(DEFAULT_RATING))),
            photo,
        }
    }
}

fn decode_photo(id: u64, digits: &str, mime: &str) -> Option<Photo> {
    let digits = digits.trim();
    if digits.is_empty() {
        return None;
    }
    match decode_hex(digits) {
        Some(bytes) if !bytes.is_empty() => Some(Photo {
            bytes,
            mime: mime.trim().to_string(),
        }),
        _ => {
            warn!("Wine {id}: photo data is not valid hex and was ignored");
            None
        }
    }
}

pub(crate) fn coerce_year(raw: &str, default: i32) -> i32 {
    year_or_default(coerce_int(Some(raw), i64::from(default)), default)
}

/// Years outside `MIN_YEAR..=MAX_YEAR` are replaced by `default`, so records
/// read or imported from a sheet always pass validation.
pub fn year_or_default(value: i64, default: i32) -> i32 {
    i32::try_from(value)
        .ok()
        .filter(|year| (MIN_YEAR..=MAX_YEAR).contains(year))
        .unwrap_or(default)
}

pub fn clamp_rating(value: i64) -> u8 {
    value.clamp(i64::from(MIN_RATING), i64::from(MAX_RATING)) as u8
}

/// Lowercase hex, two digits per byte.
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Accepts either case and ASCII whitespace between byte pairs.
pub fn decode_hex(text: &str) -> Option<Vec<u8>> {
    let digits = text
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>();
    hex::decode(digits).ok()
}
