//! Merging imported records into the catalog and the empty-write guard.

use log::error;

use crate::{
    error::CatalogError,
    record::{Location, Wine},
};

/// Existing records keep their order; additions follow in allocation order.
pub fn merge(existing: Vec<Wine>, additions: Vec<Wine>) -> Vec<Wine> {
    let mut merged = existing;
    merged.reserve(additions.len());
    merged.extend(additions);
    merged
}

/// Refuses any write of an empty record set. There is no override: an empty
/// table at this point means an upstream read or a transformation went wrong.
pub fn guard_non_empty(wines: &[Wine]) -> Result<(), CatalogError> {
    if wines.is_empty() {
        error!("Blocked an attempt to replace the whole catalog with an empty table");
        return Err(CatalogError::EmptyWriteGuard);
    }
    Ok(())
}

/// Drops every record still waiting at the default location and returns how
/// many were removed. Records anywhere else, consumed ones included, stay.
pub fn remove_unclassified(wines: &mut Vec<Wine>) -> usize {
    let before = wines.len();
    wines.retain(|wine| wine.location != Location::Unclassified);
    before - wines.len()
}
