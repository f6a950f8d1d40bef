use crate::models::Listing;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Filter state for the public inventory page. All predicates combine
/// conjunctively; an empty field matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryFilter {
    /// Case-insensitive match over brand, model and year
    pub search: String,
    pub brands: Vec<String>,
    pub body_types: Vec<String>,
    pub transmissions: Vec<String>,
    pub drivetrains: Vec<String>,
    /// Year bounds as typed by the user; unparsable input is ignored
    pub year_min: String,
    pub year_max: String,
}

impl InventoryFilter {
    /// Applies every active predicate, preserving input order
    pub fn apply(&self, listings: &[Listing]) -> Vec<Listing> {
        listings
            .iter()
            .filter(|l| self.matches(l))
            .cloned()
            .collect()
    }

    fn matches(&self, listing: &Listing) -> bool {
        let term = self.search.trim().to_lowercase();
        if !term.is_empty() {
            let hit = listing.brand.to_lowercase().contains(&term)
                || listing.model.to_lowercase().contains(&term)
                || listing.year.to_string().contains(&term);
            if !hit {
                return false;
            }
        }
        if !self.brands.is_empty() && !self.brands.contains(&listing.brand) {
            return false;
        }
        if !self.body_types.is_empty() && !self.body_types.contains(&listing.body_type) {
            return false;
        }
        if !self.transmissions.is_empty() && !self.transmissions.contains(&listing.transmission) {
            return false;
        }
        if !self.drivetrains.is_empty() && !self.drivetrains.contains(&listing.drivetrain) {
            return false;
        }
        if let Ok(min) = self.year_min.trim().parse::<i32>() {
            if listing.year < min {
                return false;
            }
        }
        if let Ok(max) = self.year_max.trim().parse::<i32>() {
            if listing.year > max {
                return false;
            }
        }
        true
    }
}

/// Distinct attribute values for populating the filter controls
#[derive(Debug, Clone, Default, Serialize)]
pub struct Facets {
    pub brands: Vec<String>,
    pub body_types: Vec<String>,
    pub transmissions: Vec<String>,
    pub drivetrains: Vec<String>,
}

impl Facets {
    /// Sorted unique values per attribute
    pub fn collect(listings: &[Listing]) -> Self {
        fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
            values
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        }
        Self {
            brands: distinct(listings.iter().map(|l| l.brand.as_str())),
            body_types: distinct(listings.iter().map(|l| l.body_type.as_str())),
            transmissions: distinct(listings.iter().map(|l| l.transmission.as_str())),
            drivetrains: distinct(listings.iter().map(|l| l.drivetrain.as_str())),
        }
    }
}
