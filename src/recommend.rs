//! Facet filters over the active cellar and the random "what should I open
//! tonight" pick.

use chrono::{Datelike, Local};
use itertools::Itertools;
use rand::{Rng, seq::SliceRandom};
use serde::Serialize;

use crate::record::Wine;

/// Facets combine with AND; values inside one facet combine with OR. An
/// empty facet does not constrain anything. Text facets compare without
/// regard to case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WineFilter {
    /// Keep only wines whose drink-by year has been reached.
    pub expiring_only: bool,
    pub grapes: Vec<String>,
    pub wineries: Vec<String>,
    pub vintages: Vec<i32>,
    pub origins: Vec<String>,
    pub quality_tiers: Vec<String>,
    pub winemakers: Vec<String>,
}

impl WineFilter {
    pub fn matches(&self, wine: &Wine, current_year: i32) -> bool {
        if wine.is_consumed() {
            return false;
        }
        if self.expiring_only && wine.drink_by_year > current_year {
            return false;
        }
        text_facet(&self.grapes, &wine.primary_grape)
            && text_facet(&self.wineries, &wine.winery)
            && (self.vintages.is_empty() || self.vintages.contains(&wine.vintage_year))
            && text_facet(&self.origins, &wine.origin)
            && text_facet(&self.quality_tiers, &wine.quality_tier)
            && text_facet(&self.winemakers, &wine.winemaker)
    }

    pub fn apply<'a>(&self, wines: &'a [Wine], current_year: i32) -> Vec<&'a Wine> {
        wines
            .iter()
            .filter(|wine| self.matches(wine, current_year))
            .collect()
    }
}

fn text_facet(wanted: &[String], value: &str) -> bool {
    wanted.is_empty()
        || wanted
            .iter()
            .any(|candidate| candidate.trim().to_lowercase() == value.trim().to_lowercase())
}

pub fn current_year() -> i32 {
    Local::now().year()
}

/// Uniformly picks one wine that passes `filter`, or `None` when nothing does.
pub fn recommend<'a, R>(
    wines: &'a [Wine],
    filter: &WineFilter,
    current_year: i32,
    rng: &mut R,
) -> Option<&'a Wine>
where
    R: Rng + ?Sized,
{
    filter.apply(wines, current_year).choose(rng).copied()
}

/// Distinct values offered for each facet, taken from active wines only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub grapes: Vec<String>,
    pub wineries: Vec<String>,
    pub vintages: Vec<i32>,
    pub origins: Vec<String>,
    pub quality_tiers: Vec<String>,
    pub winemakers: Vec<String>,
}

impl FilterOptions {
    pub fn from_wines(wines: &[Wine]) -> Self {
        let active = wines.iter().filter(|wine| !wine.is_consumed()).collect_vec();
        Self {
            grapes: distinct(&active, |w| w.primary_grape.as_str()),
            wineries: distinct(&active, |w| w.winery.as_str()),
            vintages: active
                .iter()
                .map(|wine| wine.vintage_year)
                .sorted()
                .dedup()
                .collect(),
            origins: distinct(&active, |w| w.origin.as_str()),
            quality_tiers: distinct(&active, |w| w.quality_tier.as_str()),
            winemakers: distinct(&active, |w| w.winemaker.as_str()),
        }
    }
}

fn distinct(wines: &[&Wine], field: fn(&Wine) -> &str) -> Vec<String> {
    wines
        .iter()
        .map(|wine| field(*wine).trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .sorted()
        .dedup()
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::record::Location;

    fn cellar() -> Vec<Wine> {
        vec![
            Wine {
                id: 1,
                name: "Gran Enemigo".into(),
                winery: "El Enemigo".into(),
                primary_grape: "Cabernet Franc".into(),
                vintage_year: 2017,
                drink_by_year: 2024,
                origin: "Gualtallary".into(),
                location: Location::ElectricCellar,
                ..Wine::default()
            },
            Wine {
                id: 2,
                name: "Nicasia".into(),
                winery: "Catena".into(),
                primary_grape: "Malbec".into(),
                vintage_year: 2020,
                drink_by_year: 2030,
                origin: "Altamira".into(),
                location: Location::NorthRacks,
                ..Wine::default()
            },
            Wine {
                id: 3,
                name: "Alta".into(),
                winery: "Catena".into(),
                primary_grape: "Malbec".into(),
                vintage_year: 2015,
                drink_by_year: 2020,
                location: Location::Consumed,
                ..Wine::default()
            },
        ]
    }

    #[test]
    fn consumed_wines_never_match() {
        let wines = cellar();
        let ids: Vec<u64> = WineFilter::default()
            .apply(&wines, 2025)
            .iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn expiring_only_uses_current_year() {
        let wines = cellar();
        let filter = WineFilter {
            expiring_only: true,
            ..WineFilter::default()
        };
        let ids: Vec<u64> = filter.apply(&wines, 2025).iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![1]);
        assert!(filter.apply(&wines, 2023).is_empty());
    }

    #[test]
    fn facets_combine_with_and() {
        let wines = cellar();
        let filter = WineFilter {
            wineries: vec!["catena".into(), "El Enemigo".into()],
            grapes: vec!["Malbec".into()],
            ..WineFilter::default()
        };
        let ids: Vec<u64> = filter.apply(&wines, 2025).iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn vintage_facet_matches_exact_years() {
        let wines = cellar();
        let filter = WineFilter {
            vintages: vec![2017, 2015],
            ..WineFilter::default()
        };
        assert_eq!(filter.apply(&wines, 2025).len(), 1);
    }

    #[test]
    fn recommend_picks_from_the_filtered_set() {
        let wines = cellar();
        let filter = WineFilter {
            grapes: vec!["Malbec".into()],
            ..WineFilter::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(recommend(&wines, &filter, 2025, &mut rng).unwrap().id, 2);
        }
        let none = WineFilter {
            grapes: vec!["Tannat".into()],
            ..WineFilter::default()
        };
        assert!(recommend(&wines, &none, 2025, &mut rng).is_none());
    }

    #[test]
    fn options_list_distinct_active_values() {
        let options = FilterOptions::from_wines(&cellar());
        assert_eq!(options.wineries, vec!["Catena", "El Enemigo"]);
        assert_eq!(options.vintages, vec![2017, 2020]);
        assert_eq!(options.grapes, vec!["Cabernet Franc", "Malbec"]);
        assert!(options.winemakers.is_empty());
    }
}
