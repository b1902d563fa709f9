//! Stable integer identities for new records.

use crate::record::Wine;

/// Hands out ids strictly above everything already in the catalog.
///
/// Ids that failed to parse were read as 0, so they never lower the floor.
/// Deleted ids are not reused because only the current maximum matters and
/// every allocation moves past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdAllocator {
    last: u64,
}

impl IdAllocator {
    pub fn starting_after(last: u64) -> Self {
        Self { last }
    }

    pub fn for_catalog(wines: &[Wine]) -> Self {
        Self::starting_after(max_id(wines))
    }

    pub fn allocate(&mut self) -> u64 {
        self.last += 1;
        self.last
    }
}

impl Iterator for IdAllocator {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        Some(self.allocate())
    }
}

pub fn max_id(wines: &[Wine]) -> u64 {
    wines.iter().map(|wine| wine.id).max().unwrap_or(0)
}
