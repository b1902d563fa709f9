//! Single varietal vs. blend classification and the grape vocabulary.

use itertools::Itertools;

use crate::record::{BLEND_MARKER, STANDARD_GRAPES, UNSPECIFIED_GRAPE, Wine};

/// Separator that marks an imported grape value as a composite.
pub const BLEND_SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Varietal {
    pub primary_grape: String,
    pub blend_components: String,
}

/// Classifies a reconciled grape value. A composite keeps its original text
/// verbatim as the blend composition; nothing is matched against the
/// standard vocabulary here.
pub fn classify(raw: &str) -> Varietal {
    let trimmed = raw.trim();
    if trimmed.contains(BLEND_SEPARATOR) {
        Varietal {
            primary_grape: BLEND_MARKER.to_string(),
            blend_components: trimmed.to_string(),
        }
    } else if trimmed.is_empty() {
        Varietal {
            primary_grape: UNSPECIFIED_GRAPE.to_string(),
            blend_components: String::new(),
        }
    } else {
        Varietal {
            primary_grape: trimmed.to_string(),
            blend_components: String::new(),
        }
    }
}

/// Joins hand-picked blend components the way manual entry stores them.
pub fn compose_blend<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|part| part.as_ref().trim())
        .filter(|part| !part.is_empty())
        .unique()
        .join(", ")
}

/// Standard grapes plus every distinct primary grape already in the catalog,
/// sorted and de-duplicated. Varietals first seen through an import show up
/// here without any registration step.
pub fn grape_vocabulary<'a, I>(wines: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Wine>,
{
    wines
        .into_iter()
        .map(|wine| wine.primary_grape.trim())
        .filter(|grape| !grape.is_empty())
        .chain(STANDARD_GRAPES.iter().copied())
        .map(str::to_string)
        .sorted()
        .dedup()
        .collect()
}
