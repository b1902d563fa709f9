//! Catalog actions: each one reads the whole table, changes it in memory and
//! writes the whole table back.
//!
//! Every write goes through [`Catalog::persist`], which applies the
//! empty-write guard before the store is touched. The store decides how reads
//! are cached and retried; a failed read always aborts the action, so nothing
//! is ever written on top of a table that could not be loaded.
//!
//! Concurrent writers are not coordinated: the last full replace wins.

use std::path::Path;

use log::{info, warn};

use crate::{
    error::CatalogError,
    identity::IdAllocator,
    import::{self, ImportOptions, ImportReport},
    merge::{guard_non_empty, merge, remove_unclassified},
    record::{
        BLEND_MARKER, DEFAULT_DRINK_BY, DEFAULT_RATING, DEFAULT_VINTAGE, Location, MAX_RATING,
        MAX_YEAR, MIN_RATING, MIN_YEAR, Photo, Wine,
    },
    store::CatalogStore,
    varietal::{self, compose_blend},
};

/// A record as entered by hand, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WineDraft {
    pub name: String,
    pub winery: String,
    pub winemaker: String,
    pub vintage_year: i32,
    pub primary_grape: String,
    /// Only meaningful when `primary_grape` is the blend marker.
    pub blend_components: Vec<String>,
    pub quality_tier: String,
    pub origin: String,
    pub technical_detail: String,
    pub personal_note: String,
    pub location: Location,
    pub drink_by_year: i32,
    pub rating: u8,
    pub photo: Option<Photo>,
}

impl Default for WineDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            winery: String::new(),
            winemaker: String::new(),
            vintage_year: DEFAULT_VINTAGE,
            primary_grape: "Malbec".to_string(),
            blend_components: Vec::new(),
            quality_tier: String::new(),
            origin: String::new(),
            technical_detail: String::new(),
            personal_note: String::new(),
            location: Location::ElectricCellar,
            drink_by_year: DEFAULT_DRINK_BY,
            rating: DEFAULT_RATING,
            photo: None,
        }
    }
}

impl WineDraft {
    fn into_wine(self, id: u64) -> Wine {
        let blend_components = if self.primary_grape.trim() == BLEND_MARKER {
            compose_blend(&self.blend_components)
        } else {
            String::new()
        };
        Wine {
            id,
            name: self.name.trim().to_string(),
            winery: self.winery.trim().to_string(),
            winemaker: self.winemaker.trim().to_string(),
            vintage_year: self.vintage_year,
            primary_grape: self.primary_grape.trim().to_string(),
            blend_components,
            quality_tier: self.quality_tier.trim().to_string(),
            origin: self.origin.trim().to_string(),
            technical_detail: self.technical_detail,
            personal_note: self.personal_note,
            location: self.location,
            drink_by_year: self.drink_by_year,
            rating: self.rating,
            photo: self.photo,
        }
    }
}

/// Field changes for an existing record; `None` leaves a field as it is.
/// `photo: Some(None)` removes the stored photo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WineChanges {
    pub name: Option<String>,
    pub winery: Option<String>,
    pub winemaker: Option<String>,
    pub vintage_year: Option<i32>,
    pub primary_grape: Option<String>,
    pub blend_components: Option<Vec<String>>,
    pub quality_tier: Option<String>,
    pub origin: Option<String>,
    pub technical_detail: Option<String>,
    pub personal_note: Option<String>,
    pub location: Option<Location>,
    pub drink_by_year: Option<i32>,
    pub rating: Option<u8>,
    pub photo: Option<Option<Photo>>,
}

impl WineChanges {
    pub fn is_empty(&self) -> bool {
        *self == WineChanges::default()
    }

    fn apply_to(self, wine: &mut Wine) -> Result<(), CatalogError> {
        if let Some(location) = self.location
            && location != wine.location
        {
            if location == Location::Consumed {
                return Err(CatalogError::Invalid(
                    "use consume to mark a wine as drunk".into(),
                ));
            }
            if wine.is_consumed() {
                return Err(CatalogError::Invalid(
                    "use restore to bring a consumed wine back to the cellar".into(),
                ));
            }
            wine.location = location;
        }
        set_text(&mut wine.name, self.name);
        set_text(&mut wine.winery, self.winery);
        set_text(&mut wine.winemaker, self.winemaker);
        set_text(&mut wine.quality_tier, self.quality_tier);
        set_text(&mut wine.origin, self.origin);
        if let Some(detail) = self.technical_detail {
            wine.technical_detail = detail;
        }
        if let Some(note) = self.personal_note {
            wine.personal_note = note;
        }
        if let Some(year) = self.vintage_year {
            wine.vintage_year = year;
        }
        if let Some(year) = self.drink_by_year {
            wine.drink_by_year = year;
        }
        if let Some(rating) = self.rating {
            wine.rating = rating;
        }
        if let Some(photo) = self.photo {
            wine.photo = photo;
        }
        if let Some(grape) = self.primary_grape {
            wine.primary_grape = grape.trim().to_string();
        }
        if let Some(parts) = self.blend_components {
            wine.blend_components = compose_blend(&parts);
        }
        if !wine.is_blend() {
            wine.blend_components.clear();
        }
        Ok(())
    }
}

fn set_text(field: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *field = value.trim().to_string();
    }
}

/// Rules for hand-entered or edited records. Imported records bypass this:
/// their defaults already satisfy the record invariants.
pub fn validate(wine: &Wine) -> Result<(), CatalogError> {
    let invalid = |msg: String| Err(CatalogError::Invalid(msg));
    if wine.name.is_empty() || wine.winery.is_empty() {
        return invalid("name and winery are required".into());
    }
    if !(MIN_RATING..=MAX_RATING).contains(&wine.rating) {
        return invalid(format!(
            "rating {} is outside {MIN_RATING}..={MAX_RATING}",
            wine.rating
        ));
    }
    for (label, year) in [("vintage", wine.vintage_year), ("drink-by", wine.drink_by_year)] {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return invalid(format!("{label} year {year} is outside {MIN_YEAR}..={MAX_YEAR}"));
        }
    }
    if wine.primary_grape.is_empty() {
        return invalid("grape is required".into());
    }
    if wine.is_blend() && wine.blend_parts().is_empty() {
        return invalid("a blend needs at least one component grape".into());
    }
    if !wine.is_blend() && !wine.blend_components.is_empty() {
        return invalid("blend components are only allowed on blends".into());
    }
    if let Some(photo) = &wine.photo
        && (photo.bytes.is_empty() || photo.mime.is_empty())
    {
        return invalid("a photo needs both data and a media type".into());
    }
    Ok(())
}

fn position(wines: &[Wine], id: u64) -> Result<usize, CatalogError> {
    wines
        .iter()
        .position(|wine| wine.id == id)
        .ok_or(CatalogError::RecordNotFound { id })
}

#[derive(Debug)]
pub struct Catalog<S> {
    store: S,
}

impl<S: CatalogStore> Catalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn list_all(&self) -> Result<Vec<Wine>, CatalogError> {
        Ok(self.store.read()?)
    }

    /// Wines still in the cellar.
    pub fn active(&self) -> Result<Vec<Wine>, CatalogError> {
        let mut wines = self.list_all()?;
        wines.retain(|wine| !wine.is_consumed());
        Ok(wines)
    }

    /// Wines that have been drunk.
    pub fn history(&self) -> Result<Vec<Wine>, CatalogError> {
        let mut wines = self.list_all()?;
        wines.retain(Wine::is_consumed);
        Ok(wines)
    }

    pub fn get(&self, id: u64) -> Result<Wine, CatalogError> {
        let mut wines = self.list_all()?;
        let idx = position(&wines, id)?;
        Ok(wines.swap_remove(idx))
    }

    pub fn grape_vocabulary(&self) -> Result<Vec<String>, CatalogError> {
        Ok(varietal::grape_vocabulary(&self.list_all()?))
    }

    pub fn add(&self, draft: WineDraft) -> Result<Wine, CatalogError> {
        if draft.location == Location::Consumed {
            return Err(CatalogError::Invalid(
                "new wines cannot start out consumed".into(),
            ));
        }
        let mut wines = self.list_all()?;
        let wine = draft.into_wine(IdAllocator::for_catalog(&wines).allocate());
        validate(&wine)?;
        info!("Adding wine #{} '{}' ({})", wine.id, wine.name, wine.winery);
        wines.push(wine.clone());
        self.persist(&wines)?;
        Ok(wine)
    }

    pub fn update(&self, id: u64, changes: WineChanges) -> Result<Wine, CatalogError> {
        let mut wines = self.list_all()?;
        let idx = position(&wines, id)?;
        let mut updated = wines[idx].clone();
        changes.apply_to(&mut updated)?;
        validate(&updated)?;
        if updated == wines[idx] {
            info!("Wine #{id} unchanged; nothing to save");
            return Ok(updated);
        }
        info!("Updating wine #{id} '{}'", updated.name);
        wines[idx] = updated.clone();
        self.persist(&wines)?;
        Ok(updated)
    }

    /// Marks a wine as drunk, from whatever location it was in.
    pub fn consume(&self, id: u64) -> Result<Wine, CatalogError> {
        let mut wines = self.list_all()?;
        let idx = position(&wines, id)?;
        if wines[idx].is_consumed() {
            info!("Wine #{id} was already consumed");
            return Ok(wines.swap_remove(idx));
        }
        wines[idx].location = Location::Consumed;
        info!("Recording wine #{id} '{}' as consumed", wines[idx].name);
        self.persist(&wines)?;
        Ok(wines.swap_remove(idx))
    }

    /// Brings a consumed wine back to the default location. Wines that were
    /// not consumed are rejected rather than moved.
    pub fn restore(&self, id: u64) -> Result<Wine, CatalogError> {
        let mut wines = self.list_all()?;
        let idx = position(&wines, id)?;
        if !wines[idx].is_consumed() {
            return Err(CatalogError::NotConsumed {
                id,
                location: wines[idx].location,
            });
        }
        wines[idx].location = Location::Unclassified;
        info!("Restoring wine #{id} '{}' to the cellar", wines[idx].name);
        self.persist(&wines)?;
        Ok(wines.swap_remove(idx))
    }

    pub fn delete(&self, id: u64) -> Result<Wine, CatalogError> {
        let mut wines = self.list_all()?;
        let idx = position(&wines, id)?;
        let removed = wines.remove(idx);
        info!("Deleting wine #{id} '{}'", removed.name);
        self.persist(&wines)?;
        Ok(removed)
    }

    /// Deletes every wine still waiting to be placed and returns the count.
    pub fn purge_unclassified(&self) -> Result<usize, CatalogError> {
        let mut wines = self.list_all()?;
        let removed = remove_unclassified(&mut wines);
        if removed == 0 {
            info!("No unclassified wines to delete");
            return Ok(0);
        }
        info!("Deleting {removed} unclassified wine(s)");
        self.persist(&wines)?;
        Ok(removed)
    }

    /// Reads `path`, appends its rows as new unclassified wines and commits
    /// once at the end. Nothing is written when the file has no usable rows,
    /// when it cannot be parsed, or on a dry run.
    pub fn import<P>(
        &self,
        path: &Path,
        options: &ImportOptions,
        progress: P,
    ) -> Result<ImportReport, CatalogError>
    where
        P: FnMut(usize, usize),
    {
        let table = import::read_table(path, options)?;
        let existing = self.list_all()?;
        let mut ids = IdAllocator::for_catalog(&existing);
        let added = import::build_candidates(&table, &mut ids, progress);
        let mut report = ImportReport {
            source: path.to_path_buf(),
            rows_read: table.rows.len(),
            added,
            unmatched_fields: import::unmatched_fields(&table),
            catalog_size: existing.len(),
            persisted: false,
        };
        if report.added.is_empty() {
            warn!("{path:?} has no rows to import");
            return Ok(report);
        }
        let merged = merge(existing, report.added.clone());
        report.catalog_size = merged.len();
        if options.dry_run {
            info!(
                "Dry run: {} wine(s) would be added from {path:?}",
                report.added.len()
            );
            return Ok(report);
        }
        self.persist(&merged)?;
        report.persisted = true;
        info!(
            "Imported {} wine(s) from {path:?}; catalog now holds {}",
            report.added.len(),
            report.catalog_size
        );
        Ok(report)
    }

    fn persist(&self, wines: &[Wine]) -> Result<(), CatalogError> {
        guard_non_empty(wines)?;
        self.store.replace_all(wines)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::error::StoreError;

    #[derive(Default)]
    struct MemoryStore {
        wines: RefCell<Vec<Wine>>,
        writes: Cell<usize>,
    }

    impl MemoryStore {
        fn with(wines: Vec<Wine>) -> Self {
            Self {
                wines: RefCell::new(wines),
                writes: Cell::new(0),
            }
        }
    }

    impl CatalogStore for MemoryStore {
        fn read(&self) -> Result<Vec<Wine>, StoreError> {
            Ok(self.wines.borrow().clone())
        }

        fn replace_all(&self, wines: &[Wine]) -> Result<(), StoreError> {
            self.writes.set(self.writes.get() + 1);
            *self.wines.borrow_mut() = wines.to_vec();
            Ok(())
        }
    }

    fn wine(id: u64, location: Location) -> Wine {
        Wine {
            id,
            name: format!("Vino {id}"),
            winery: "Bodega".into(),
            location,
            ..Wine::default()
        }
    }

    fn draft(name: &str) -> WineDraft {
        WineDraft {
            name: name.into(),
            winery: "Zuccardi".into(),
            ..WineDraft::default()
        }
    }

    #[test]
    fn add_allocates_above_current_maximum() {
        let catalog = Catalog::new(MemoryStore::with(vec![
            wine(4, Location::Other),
            wine(9, Location::Consumed),
        ]));
        let added = catalog.add(draft("Aluvional")).unwrap();
        assert_eq!(added.id, 10);
        assert_eq!(added.location, Location::ElectricCellar);
        assert_eq!(catalog.list_all().unwrap().len(), 3);
    }

    #[test]
    fn first_wine_gets_id_one() {
        let catalog = Catalog::new(MemoryStore::default());
        assert_eq!(catalog.add(draft("Q")).unwrap().id, 1);
    }

    #[test]
    fn add_requires_name_and_winery() {
        let catalog = Catalog::new(MemoryStore::default());
        let err = catalog.add(WineDraft::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(_)));
        assert_eq!(catalog.store().writes.get(), 0);
    }

    #[test]
    fn blend_drafts_need_components() {
        let catalog = Catalog::new(MemoryStore::default());
        let mut blend = draft("Corte");
        blend.primary_grape = BLEND_MARKER.into();
        assert!(catalog.add(blend.clone()).is_err());
        blend.blend_components = vec!["Malbec".into(), "Cabernet Franc".into()];
        let saved = catalog.add(blend).unwrap();
        assert_eq!(saved.blend_components, "Malbec, Cabernet Franc");
    }

    #[test]
    fn components_are_dropped_for_single_varietals() {
        let catalog = Catalog::new(MemoryStore::default());
        let mut single = draft("Varietal");
        single.blend_components = vec!["Merlot".into()];
        assert_eq!(catalog.add(single).unwrap().blend_components, "");
    }

    #[test]
    fn consume_then_restore_only_moves_location() {
        let original = Wine {
            personal_note: "Regalo de cumpleaños".into(),
            ..wine(3, Location::SouthCenterX)
        };
        let catalog = Catalog::new(MemoryStore::with(vec![original.clone()]));
        assert!(catalog.consume(3).unwrap().is_consumed());
        let restored = catalog.restore(3).unwrap();
        assert_eq!(restored.location, Location::Unclassified);
        assert_eq!(restored.location.label(), "Por Clasificar");
        assert_eq!(
            Wine {
                location: original.location,
                ..restored
            },
            original
        );
    }

    #[test]
    fn restore_requires_a_consumed_wine() {
        let catalog = Catalog::new(MemoryStore::with(vec![wine(1, Location::Other)]));
        assert!(matches!(
            catalog.restore(1),
            Err(CatalogError::NotConsumed { id: 1, .. })
        ));
        assert_eq!(catalog.store().writes.get(), 0);
    }

    #[test]
    fn unknown_ids_are_reported_without_writing() {
        let catalog = Catalog::new(MemoryStore::with(vec![wine(1, Location::Other)]));
        for result in [catalog.consume(7), catalog.delete(7), catalog.get(7)] {
            assert!(result.unwrap_err().is_not_found());
        }
        assert!(
            catalog
                .update(7, WineChanges::default())
                .unwrap_err()
                .is_not_found()
        );
        assert_eq!(catalog.store().writes.get(), 0);
    }

    #[test]
    fn deleting_the_last_wine_is_blocked_by_the_guard() {
        let catalog = Catalog::new(MemoryStore::with(vec![wine(1, Location::Other)]));
        assert!(matches!(
            catalog.delete(1),
            Err(CatalogError::EmptyWriteGuard)
        ));
        assert_eq!(catalog.list_all().unwrap().len(), 1);
    }

    #[test]
    fn purge_removes_only_unclassified() {
        let catalog = Catalog::new(MemoryStore::with(vec![
            wine(1, Location::Unclassified),
            wine(2, Location::Consumed),
            wine(3, Location::Unclassified),
            wine(4, Location::EastDrawers),
            wine(5, Location::Unclassified),
        ]));
        assert_eq!(catalog.purge_unclassified().unwrap(), 3);
        let ids: Vec<u64> = catalog.list_all().unwrap().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![2, 4]);
        assert_eq!(catalog.purge_unclassified().unwrap(), 0);
        assert_eq!(catalog.store().writes.get(), 1);
    }

    #[test]
    fn update_changes_fields_and_clears_stale_blend() {
        let mut blend = wine(2, Location::Other);
        blend.primary_grape = BLEND_MARKER.into();
        blend.blend_components = "Malbec/Syrah".into();
        let catalog = Catalog::new(MemoryStore::with(vec![blend]));
        let changes = WineChanges {
            primary_grape: Some("Syrah".into()),
            rating: Some(8),
            personal_note: Some("Mejor al segundo día".into()),
            ..WineChanges::default()
        };
        let updated = catalog.update(2, changes).unwrap();
        assert_eq!(updated.primary_grape, "Syrah");
        assert_eq!(updated.blend_components, "");
        assert_eq!(updated.rating, 8);
        assert_eq!(catalog.get(2).unwrap(), updated);
    }

    #[test]
    fn update_cannot_bypass_consume_or_restore() {
        let catalog = Catalog::new(MemoryStore::with(vec![
            wine(1, Location::Other),
            wine(2, Location::Consumed),
        ]));
        let to_consumed = WineChanges {
            location: Some(Location::Consumed),
            ..WineChanges::default()
        };
        assert!(catalog.update(1, to_consumed).is_err());
        let out_of_history = WineChanges {
            location: Some(Location::Other),
            ..WineChanges::default()
        };
        assert!(catalog.update(2, out_of_history).is_err());
        assert_eq!(catalog.store().writes.get(), 0);
    }

    #[test]
    fn update_rejects_out_of_range_rating() {
        let catalog = Catalog::new(MemoryStore::with(vec![wine(1, Location::Other)]));
        let changes = WineChanges {
            rating: Some(11),
            ..WineChanges::default()
        };
        assert!(matches!(
            catalog.update(1, changes),
            Err(CatalogError::Invalid(_))
        ));
    }

    #[test]
    fn active_and_history_partition_the_catalog() {
        let catalog = Catalog::new(MemoryStore::with(vec![
            wine(1, Location::Other),
            wine(2, Location::Consumed),
            wine(3, Location::Unclassified),
        ]));
        assert_eq!(catalog.active().unwrap().len(), 2);
        assert_eq!(catalog.history().unwrap()[0].id, 2);
    }
}
