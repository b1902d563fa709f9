//! Reading externally authored wine lists and turning their rows into
//! candidate catalog records.
//!
//! Delimited text goes through the CSV reader with the usual delimiter and
//! encoding resolution; spreadsheets are read from their first worksheet.
//! Every row is reconciled, classified and given a fresh id in input order.
//! Nothing here touches the store; [`crate::catalog::Catalog::import`] owns
//! the single commit at the end.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use calamine::{Data, Reader, open_workbook_auto};
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    error::CatalogError,
    identity::IdAllocator,
    io_utils,
    reconcile::{CanonicalField, ColumnReconciler, ReconciledRow},
    record::{DEFAULT_DRINK_BY, DEFAULT_VINTAGE, Location, Wine, clamp_rating, year_or_default},
    varietal::{self, Varietal},
};

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Overrides the extension-based delimiter for text inputs.
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    /// Build and report the candidates without writing the catalog.
    pub dry_run: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
            dry_run: false,
        }
    }
}

/// Header row plus data rows, every cell as text. Absent trailing cells are
/// simply not there; the reconciler treats them as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub source: PathBuf,
    pub rows_read: usize,
    pub added: Vec<Wine>,
    /// Canonical fields none of whose aliases appeared in the header row.
    pub unmatched_fields: Vec<CanonicalField>,
    pub catalog_size: usize,
    pub persisted: bool,
}

impl ImportReport {
    pub fn id_range(&self) -> Option<(u64, u64)> {
        Some((self.added.first()?.id, self.added.last()?.id))
    }
}

pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Parses `path` as a table. Any failure here aborts the import before the
/// catalog is read or written.
pub fn read_table(path: &Path, options: &ImportOptions) -> Result<RawTable, CatalogError> {
    let parsed = if is_spreadsheet(path) {
        read_spreadsheet(path)
    } else {
        read_delimited(path, options)
    };
    parsed.map_err(|err| CatalogError::ImportParse {
        path: path.to_path_buf(),
        detail: format!("{err:#}"),
    })
}

fn read_delimited(path: &Path, options: &ImportOptions) -> Result<RawTable> {
    let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
    debug!(
        "Reading {:?} as delimited text (delimiter '{}', encoding {})",
        path,
        crate::printable_delimiter(delimiter),
        options.encoding.name()
    );
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let headers = io_utils::reader_headers(&mut reader, options.encoding)
        .with_context(|| format!("Reading header row of {path:?}"))?;
    if headers.iter().all(|h| h.trim().is_empty()) {
        bail!("No header row found");
    }
    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = io_utils::decode_record(&record, options.encoding)
            .with_context(|| format!("Decoding row {}", row_idx + 2))?;
        rows.push(decoded);
    }
    Ok(RawTable { headers, rows })
}

fn read_spreadsheet(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).context("Opening spreadsheet")?;
    let sheet_names = workbook.sheet_names().to_vec();
    let Some(first_sheet) = sheet_names.first() else {
        bail!("Spreadsheet has no worksheets");
    };
    debug!(
        "Reading worksheet '{first_sheet}' (first of {}) from {path:?}",
        sheet_names.len()
    );
    let range = workbook
        .worksheet_range(first_sheet)
        .with_context(|| format!("Reading worksheet '{first_sheet}'"))?;
    let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let Some(headers) = rows.next() else {
        bail!("Worksheet '{first_sheet}' is empty");
    };
    Ok(RawTable {
        headers,
        rows: rows.collect(),
    })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(text) => text.clone(),
        // 2019.0 renders as "2019"
        Data::Float(value) => value.to_string(),
        Data::Int(value) => value.to_string(),
        other => other.to_string(),
    }
}

fn is_blank_row(cells: &[String]) -> bool {
    cells.iter().all(|cell| cell.trim().is_empty())
}

/// Builds one imported record. Imports always land in the default location
/// with no personal note and no photo.
pub fn candidate_from_row(id: u64, row: ReconciledRow, varietal: Varietal) -> Wine {
    Wine {
        id,
        name: row.name,
        winery: row.winery,
        winemaker: row.winemaker,
        vintage_year: year_or_default(row.vintage_year, DEFAULT_VINTAGE),
        primary_grape: varietal.primary_grape,
        blend_components: varietal.blend_components,
        quality_tier: row.quality_tier,
        origin: row.origin,
        technical_detail: row.technical_detail,
        personal_note: String::new(),
        location: Location::Unclassified,
        drink_by_year: year_or_default(row.drink_by_year, DEFAULT_DRINK_BY),
        rating: clamp_rating(row.rating),
        photo: None,
    }
}

/// Reconciles, classifies and numbers every row, strictly in input order.
/// `progress` receives `(processed, total)` after each row.
///
/// Rows whose cells are all empty or whitespace, such as a bare `,,,` line in
/// a CSV or a padding row in a spreadsheet, are skipped and take no id.
pub fn build_candidates<P>(table: &RawTable, ids: &mut IdAllocator, mut progress: P) -> Vec<Wine>
where
    P: FnMut(usize, usize),
{
    let reconciler = ColumnReconciler::new(&table.headers);
    let total = table.rows.len();
    let mut candidates = Vec::with_capacity(total);
    for (idx, cells) in table.rows.iter().enumerate() {
        if !is_blank_row(cells) {
            let reconciled = reconciler.reconcile(cells);
            let varietal = varietal::classify(&reconciled.grape);
            let wine = candidate_from_row(ids.allocate(), reconciled, varietal);
            debug!(
                "Row {}: #{} '{}' ({}, {})",
                idx + 2,
                wine.id,
                wine.name,
                wine.winery,
                wine.primary_grape
            );
            candidates.push(wine);
        }
        progress(idx + 1, total);
    }
    candidates
}

pub fn unmatched_fields(table: &RawTable) -> Vec<CanonicalField> {
    ColumnReconciler::new(&table.headers).unmatched_fields()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn candidates_are_numbered_in_row_order() {
        let input = table(
            &["Nombre", "Bodega", "Uva", "Añada"],
            &[
                &["Angélica Zapata", "Catena", "Malbec", "2019.0"],
                &["Cheval des Andes", "Terrazas", "Malbec/Cabernet Sauvignon", "2018"],
            ],
        );
        let mut ids = IdAllocator::starting_after(41);
        let wines = build_candidates(&input, &mut ids, |_, _| {});
        assert_eq!(wines.len(), 2);
        assert_eq!(wines[0].id, 42);
        assert_eq!(wines[0].vintage_year, 2019);
        assert_eq!(wines[0].primary_grape, "Malbec");
        assert_eq!(wines[1].id, 43);
        assert_eq!(wines[1].primary_grape, "Blend");
        assert_eq!(wines[1].blend_components, "Malbec/Cabernet Sauvignon");
        assert!(wines.iter().all(|w| w.location == Location::Unclassified));
        assert!(wines.iter().all(|w| w.personal_note.is_empty() && w.photo.is_none()));
    }

    #[test]
    fn blank_rows_are_skipped_without_consuming_ids() {
        let input = table(&["name"], &[&["Uno"], &["  "], &["Dos"]]);
        let mut ids = IdAllocator::starting_after(0);
        let wines = build_candidates(&input, &mut ids, |_, _| {});
        let got: Vec<u64> = wines.iter().map(|w| w.id).collect();
        assert_eq!(got, vec![1, 2]);
    }

    #[test]
    fn comma_only_rows_are_skipped_like_empty_sheet_rows() {
        let input = table(
            &["name", "winery", "grape"],
            &[&["Uno", "A", "Malbec"], &["", "", ""], &[" ", "", "\t"], &["Dos", "B", ""]],
        );
        let wines = build_candidates(&input, &mut IdAllocator::starting_after(4), |_, _| {});
        let got: Vec<(u64, &str)> = wines.iter().map(|w| (w.id, w.name.as_str())).collect();
        assert_eq!(got, vec![(5, "Uno"), (6, "Dos")]);
    }

    #[test]
    fn progress_reports_every_row() {
        let input = table(&["name"], &[&["a"], &["b"], &["c"]]);
        let mut seen = Vec::new();
        build_candidates(&input, &mut IdAllocator::starting_after(0), |done, total| {
            seen.push((done, total))
        });
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn out_of_range_ratings_are_clamped() {
        let input = table(&["puntos"], &[&["14"], &["0"], &["x"]]);
        let wines = build_candidates(&input, &mut IdAllocator::starting_after(0), |_, _| {});
        let ratings: Vec<u8> = wines.iter().map(|w| w.rating).collect();
        assert_eq!(ratings, vec![10, 1, 5]);
    }

    #[test]
    fn years_outside_the_valid_range_take_defaults() {
        let input = table(&["nombre", "anada", "consumo"], &[&["Oporto Viejo", "1850", "3000"]]);
        let wines = build_candidates(&input, &mut IdAllocator::starting_after(0), |_, _| {});
        assert_eq!(wines[0].vintage_year, DEFAULT_VINTAGE);
        assert_eq!(wines[0].drink_by_year, DEFAULT_DRINK_BY);
        assert!(crate::catalog::validate(&wines[0]).is_ok());
    }

    #[test]
    fn spreadsheet_detection_uses_extension() {
        assert!(is_spreadsheet(Path::new("cava.XLSX")));
        assert!(is_spreadsheet(Path::new("cava.ods")));
        assert!(!is_spreadsheet(Path::new("cava.csv")));
        assert!(!is_spreadsheet(Path::new("cava")));
    }

    #[test]
    fn float_cells_render_without_fraction() {
        assert_eq!(cell_text(&Data::Float(2019.0)), "2019");
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::Int(7)), "7");
    }

    #[test]
    fn delimited_reader_handles_semicolons_and_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lista.txt");
        std::fs::write(&path, "Nombre;Bodega;Puntos\nGran Medalla;Trapiche;9\nSolo nombre\n").unwrap();
        let options = ImportOptions {
            delimiter: Some(b';'),
            ..ImportOptions::default()
        };
        let parsed = read_table(&path, &options).unwrap();
        assert_eq!(parsed.headers, vec!["Nombre", "Bodega", "Puntos"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[1], vec!["Solo nombre"]);
    }

    #[test]
    fn unreadable_spreadsheet_is_an_import_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roto.xlsx");
        std::fs::write(&path, "this is not a zip archive").unwrap();
        let err = read_table(&path, &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, CatalogError::ImportParse { .. }));
    }
}
