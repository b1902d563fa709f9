mod common;

use std::{cell::RefCell, fs};

use common::{TestWorkspace, catalog_row};
use encoding_rs::WINDOWS_1252;
use vinoteca::catalog::Catalog;
use vinoteca::config::Config;
use vinoteca::error::CatalogError;
use vinoteca::import::ImportOptions;
use vinoteca::reconcile::CanonicalField;
use vinoteca::record::{BLEND_MARKER, Location};
use vinoteca::store::{CsvFileStore, open_default_store};

fn config_for(ws: &TestWorkspace) -> Config {
    Config {
        catalog: ws.catalog_path(),
        read_backoff_ms: Vec::new(),
        ..Config::default()
    }
}

#[test]
fn import_through_the_default_store_stack() {
    let ws = TestWorkspace::new();
    ws.seed_catalog(&[&catalog_row(7, "Felino", "Cobos", "Malbec", "Cava Eléctrica")]);
    let input = ws.write(
        "planilla.csv",
        "Nombre,Winery,Variedad,Year,Consumo,Puntuacion,Notas\n\
         Gran Enemigo,El Enemigo,Cabernet Franc,2017,2035,9,Gualtallary\n\
         Corte,Zuccardi,Malbec/Syrah,2020.0,,12,\n",
    );
    let catalog = Catalog::new(open_default_store(&config_for(&ws)));

    let progress = RefCell::new(Vec::new());
    let report = catalog
        .import(&input, &ImportOptions::default(), |done, total| {
            progress.borrow_mut().push((done, total))
        })
        .expect("import");

    assert!(report.persisted);
    assert_eq!(report.id_range(), Some((8, 9)));
    assert_eq!(report.catalog_size, 3);
    assert_eq!(progress.into_inner(), vec![(1, 2), (2, 2)]);
    assert!(report.unmatched_fields.contains(&CanonicalField::Winemaker));
    assert!(!report.unmatched_fields.contains(&CanonicalField::Rating));

    let wines = catalog.list_all().expect("read back");
    assert_eq!(wines.len(), 3);
    assert_eq!(wines[0].id, 7);
    assert_eq!(wines[0].location, Location::ElectricCellar);

    let enemigo = &wines[1];
    assert_eq!(enemigo.primary_grape, "Cabernet Franc");
    assert_eq!(enemigo.drink_by_year, 2035);
    assert_eq!(enemigo.rating, 9);
    assert_eq!(enemigo.technical_detail, "Gualtallary");
    assert_eq!(enemigo.location, Location::Unclassified);

    let corte = &wines[2];
    assert_eq!(corte.primary_grape, BLEND_MARKER);
    assert_eq!(corte.blend_components, "Malbec/Syrah");
    assert_eq!(corte.vintage_year, 2020);
    assert_eq!(corte.drink_by_year, 2030);
    assert_eq!(corte.rating, 10);
}

#[test]
fn legacy_encoded_lists_are_decoded() {
    let ws = TestWorkspace::new();
    let (bytes, _, _) = WINDOWS_1252.encode("nombre;bodega\nAñejo;Bodega Ñandú\n");
    let input = ws.path().join("latin1.csv");
    fs::write(&input, bytes).unwrap();
    let catalog = Catalog::new(CsvFileStore::new(ws.catalog_path()));
    let options = ImportOptions {
        delimiter: Some(b';'),
        encoding: WINDOWS_1252,
        dry_run: false,
    };
    let report = catalog.import(&input, &options, |_, _| {}).unwrap();
    assert_eq!(report.added[0].name, "Añejo");
    assert_eq!(report.added[0].winery, "Bodega Ñandú");
    assert!(ws.read_catalog().contains("Bodega Ñandú"));
}

#[test]
fn dry_run_reports_candidates_without_writing() {
    let ws = TestWorkspace::new();
    let input = ws.write("lista.csv", "name\nUno\nDos\n");
    let catalog = Catalog::new(CsvFileStore::new(ws.catalog_path()));
    let options = ImportOptions {
        dry_run: true,
        ..ImportOptions::default()
    };
    let report = catalog.import(&input, &options, |_, _| {}).unwrap();
    assert!(!report.persisted);
    assert_eq!(report.added.len(), 2);
    assert_eq!(report.added[1].winery, "Desconocida");
    assert!(!ws.catalog_path().exists());
}

#[test]
fn missing_input_is_a_parse_failure_and_nothing_is_written() {
    let ws = TestWorkspace::new();
    ws.seed_catalog(&[&catalog_row(1, "Felino", "Cobos", "Malbec", "Otro")]);
    let before = ws.read_catalog();
    let catalog = Catalog::new(CsvFileStore::new(ws.catalog_path()));
    let err = catalog
        .import(&ws.path().join("no-existe.csv"), &ImportOptions::default(), |_, _| {})
        .unwrap_err();
    assert!(matches!(err, CatalogError::ImportParse { .. }));
    assert_eq!(ws.read_catalog(), before);
}

#[test]
fn unreadable_catalog_aborts_the_import() {
    let ws = TestWorkspace::new();
    // A directory where the catalog file should be cannot be read as a table.
    fs::create_dir(ws.catalog_path()).unwrap();
    let input = ws.write("lista.csv", "name\nUno\n");
    let catalog = Catalog::new(open_default_store(&config_for(&ws)));
    let err = catalog
        .import(&input, &ImportOptions::default(), |_, _| {})
        .unwrap_err();
    assert!(matches!(err, CatalogError::Store(_)));
}
