use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Sale status of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ListingStatus {
    #[default]
    Available,
    Sold,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Available => "Available",
            ListingStatus::Sold => "Sold",
        }
    }

    /// Unknown values fall back to Available (legacy records)
    pub fn parse(value: &str) -> Self {
        match value {
            "Sold" => ListingStatus::Sold,
            _ => ListingStatus::Available,
        }
    }
}

/// One vehicle-for-sale record as stored in the document store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Listing {
    pub id: String,
    /// URL-safe identifier derived from brand+model; absent on legacy records
    pub slug: Option<String>,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price_range: String,
    pub mileage: String,
    pub transmission: String,
    pub drivetrain: String,
    pub power: String,
    pub body_type: String,
    pub engine: String,
    #[serde(rename = "engineCC")]
    pub engine_cc: String,
    pub fuel: String,
    pub mpg: String,
    pub seats: u32,
    pub doors: u32,
    pub ext_colors: Vec<String>,
    pub int_colors: Vec<String>,
    pub status: ListingStatus,
    pub geran: String,
    pub spare_key: String,
    /// Representative thumbnail, kept in sync with images[0]
    pub image: String,
    /// Ordered gallery; the first entry is the main image
    pub images: Vec<String>,
    pub logo: String,
    pub featured: bool,
    /// Set only while featured, cleared when unfeatured
    pub featured_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Listing {
    fn default() -> Self {
        Self {
            id: String::new(),
            slug: None,
            brand: String::new(),
            model: String::new(),
            year: 0,
            price_range: String::new(),
            mileage: String::new(),
            transmission: String::new(),
            drivetrain: String::new(),
            power: String::new(),
            body_type: String::new(),
            engine: String::new(),
            engine_cc: String::new(),
            fuel: String::new(),
            mpg: String::new(),
            seats: 0,
            doors: 0,
            ext_colors: Vec::new(),
            int_colors: Vec::new(),
            status: ListingStatus::Available,
            geran: String::new(),
            spare_key: String::new(),
            image: String::new(),
            images: Vec::new(),
            logo: String::new(),
            featured: false,
            featured_at: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Listing {
    /// Gallery for the detail view: the images list, or the legacy
    /// single-image field when the list is empty
    pub fn gallery(&self) -> Vec<String> {
        if self.images.is_empty() {
            vec![self.image.clone()]
        } else {
            self.images.clone()
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand, self.model)
    }
}

/// Admin form payload for creating or editing a listing. Ids, slugs and
/// image URLs are assigned by the service, not the form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingDraft {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price_range: String,
    pub mileage: String,
    pub transmission: String,
    pub drivetrain: String,
    pub power: String,
    pub body_type: String,
    pub engine: String,
    #[serde(rename = "engineCC")]
    pub engine_cc: String,
    pub fuel: String,
    pub mpg: String,
    pub seats: u32,
    pub doors: u32,
    pub ext_colors: Vec<String>,
    pub status: ListingStatus,
    pub featured: bool,
    pub geran: String,
    pub spare_key: String,
}

impl Default for ListingDraft {
    fn default() -> Self {
        Self {
            brand: String::new(),
            model: String::new(),
            year: Utc::now().year(),
            price_range: String::new(),
            mileage: String::new(),
            transmission: "Automatic".to_string(),
            drivetrain: "AWD".to_string(),
            power: String::new(),
            body_type: "Sedan".to_string(),
            engine: String::new(),
            engine_cc: String::new(),
            fuel: String::new(),
            mpg: String::new(),
            seats: 5,
            doors: 4,
            ext_colors: Vec::new(),
            status: ListingStatus::Available,
            featured: false,
            geran: "Yes".to_string(),
            spare_key: "Yes".to_string(),
        }
    }
}

impl ListingDraft {
    /// Checks the fields that must be present before any store call
    pub fn validate(&self) -> Result<(), String> {
        if self.brand.trim().is_empty() {
            return Err("brand is required".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("model is required".to_string());
        }
        Ok(())
    }

    /// Brand logo URL convention used across the site
    pub fn logo_url(&self) -> String {
        format!(
            "https://cdn.simpleicons.org/{}/000000",
            self.brand.to_lowercase().replace(' ', "")
        )
    }
}

/// Complete document payload for an insert
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDoc {
    pub slug: Option<String>,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price_range: String,
    pub mileage: String,
    pub transmission: String,
    pub drivetrain: String,
    pub power: String,
    pub body_type: String,
    pub engine: String,
    #[serde(rename = "engineCC")]
    pub engine_cc: String,
    pub fuel: String,
    pub mpg: String,
    pub seats: u32,
    pub doors: u32,
    pub ext_colors: Vec<String>,
    pub int_colors: Vec<String>,
    pub status: ListingStatus,
    pub geran: String,
    pub spare_key: String,
    pub image: String,
    pub images: Vec<String>,
    pub logo: String,
    pub featured: bool,
    pub featured_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ListingDoc {
    /// Builds the document written on listing creation. The first image URL
    /// doubles as the legacy main-image field.
    pub fn from_draft(
        draft: &ListingDraft,
        slug: String,
        images: Vec<String>,
        featured_at: Option<DateTime<Utc>>,
    ) -> Self {
        let image = images.first().cloned().unwrap_or_default();
        Self {
            slug: Some(slug),
            brand: draft.brand.clone(),
            model: draft.model.clone(),
            year: draft.year,
            price_range: draft.price_range.clone(),
            mileage: draft.mileage.clone(),
            transmission: draft.transmission.clone(),
            drivetrain: draft.drivetrain.clone(),
            power: draft.power.clone(),
            body_type: draft.body_type.clone(),
            engine: draft.engine.clone(),
            engine_cc: draft.engine_cc.clone(),
            fuel: draft.fuel.clone(),
            mpg: draft.mpg.clone(),
            seats: draft.seats,
            doors: draft.doors,
            ext_colors: draft.ext_colors.clone(),
            int_colors: vec!["#000000".to_string()],
            status: draft.status,
            geran: draft.geran.clone(),
            spare_key: draft.spare_key.clone(),
            image,
            images,
            logo: draft.logo_url(),
            featured: featured_at.is_some(),
            featured_at,
            created_at: Some(Utc::now()),
        }
    }

    pub fn into_listing(self, id: String) -> Listing {
        Listing {
            id,
            slug: self.slug,
            brand: self.brand,
            model: self.model,
            year: self.year,
            price_range: self.price_range,
            mileage: self.mileage,
            transmission: self.transmission,
            drivetrain: self.drivetrain,
            power: self.power,
            body_type: self.body_type,
            engine: self.engine,
            engine_cc: self.engine_cc,
            fuel: self.fuel,
            mpg: self.mpg,
            seats: self.seats,
            doors: self.doors,
            ext_colors: self.ext_colors,
            int_colors: self.int_colors,
            status: self.status,
            geran: self.geran,
            spare_key: self.spare_key,
            image: self.image,
            images: self.images,
            logo: self.logo,
            featured: self.featured,
            featured_at: self.featured_at,
            created_at: self.created_at,
            updated_at: None,
        }
    }
}

/// Partial update. `None` leaves a field untouched; for the featured
/// timestamp, `Some(None)` writes an explicit null.
#[derive(Debug, Clone, Default)]
pub struct ListingPatch {
    pub slug: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price_range: Option<String>,
    pub mileage: Option<String>,
    pub transmission: Option<String>,
    pub drivetrain: Option<String>,
    pub power: Option<String>,
    pub body_type: Option<String>,
    pub engine: Option<String>,
    pub engine_cc: Option<String>,
    pub fuel: Option<String>,
    pub mpg: Option<String>,
    pub seats: Option<u32>,
    pub doors: Option<u32>,
    pub ext_colors: Option<Vec<String>>,
    pub status: Option<ListingStatus>,
    pub geran: Option<String>,
    pub spare_key: Option<String>,
    pub image: Option<String>,
    pub images: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub featured_at: Option<Option<DateTime<Utc>>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ListingPatch {
    /// Marks a listing featured as of `at`
    pub fn feature(at: DateTime<Utc>) -> Self {
        Self {
            featured: Some(true),
            featured_at: Some(Some(at)),
            ..Self::default()
        }
    }

    /// Clears the featured flag and its timestamp
    pub fn unfeature() -> Self {
        Self {
            featured: Some(false),
            featured_at: Some(None),
            ..Self::default()
        }
    }

    pub fn set_slug(slug: String) -> Self {
        Self {
            slug: Some(slug),
            ..Self::default()
        }
    }

    /// Full edit payload: every form field plus the merged image list
    pub fn revise(
        draft: &ListingDraft,
        slug: String,
        images: Vec<String>,
        featured_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            slug: Some(slug),
            brand: Some(draft.brand.clone()),
            model: Some(draft.model.clone()),
            year: Some(draft.year),
            price_range: Some(draft.price_range.clone()),
            mileage: Some(draft.mileage.clone()),
            transmission: Some(draft.transmission.clone()),
            drivetrain: Some(draft.drivetrain.clone()),
            power: Some(draft.power.clone()),
            body_type: Some(draft.body_type.clone()),
            engine: Some(draft.engine.clone()),
            engine_cc: Some(draft.engine_cc.clone()),
            fuel: Some(draft.fuel.clone()),
            mpg: Some(draft.mpg.clone()),
            seats: Some(draft.seats),
            doors: Some(draft.doors),
            ext_colors: Some(draft.ext_colors.clone()),
            status: Some(draft.status),
            geran: Some(draft.geran.clone()),
            spare_key: Some(draft.spare_key.clone()),
            image: Some(images.first().cloned().unwrap_or_default()),
            images: Some(images),
            featured: Some(draft.featured),
            featured_at: Some(featured_at),
            updated_at: Some(Utc::now()),
        }
    }

    /// Applies the patch to an in-memory copy of a listing
    pub fn apply(&self, listing: &mut Listing) {
        if let Some(v) = &self.slug {
            listing.slug = Some(v.clone());
        }
        if let Some(v) = &self.brand {
            listing.brand = v.clone();
        }
        if let Some(v) = &self.model {
            listing.model = v.clone();
        }
        if let Some(v) = self.year {
            listing.year = v;
        }
        if let Some(v) = &self.price_range {
            listing.price_range = v.clone();
        }
        if let Some(v) = &self.mileage {
            listing.mileage = v.clone();
        }
        if let Some(v) = &self.transmission {
            listing.transmission = v.clone();
        }
        if let Some(v) = &self.drivetrain {
            listing.drivetrain = v.clone();
        }
        if let Some(v) = &self.power {
            listing.power = v.clone();
        }
        if let Some(v) = &self.body_type {
            listing.body_type = v.clone();
        }
        if let Some(v) = &self.engine {
            listing.engine = v.clone();
        }
        if let Some(v) = &self.engine_cc {
            listing.engine_cc = v.clone();
        }
        if let Some(v) = &self.fuel {
            listing.fuel = v.clone();
        }
        if let Some(v) = &self.mpg {
            listing.mpg = v.clone();
        }
        if let Some(v) = self.seats {
            listing.seats = v;
        }
        if let Some(v) = self.doors {
            listing.doors = v;
        }
        if let Some(v) = &self.ext_colors {
            listing.ext_colors = v.clone();
        }
        if let Some(v) = self.status {
            listing.status = v;
        }
        if let Some(v) = &self.geran {
            listing.geran = v.clone();
        }
        if let Some(v) = &self.spare_key {
            listing.spare_key = v.clone();
        }
        if let Some(v) = &self.image {
            listing.image = v.clone();
        }
        if let Some(v) = &self.images {
            listing.images = v.clone();
        }
        if let Some(v) = self.featured {
            listing.featured = v;
        }
        if let Some(v) = self.featured_at {
            listing.featured_at = v;
        }
        if let Some(v) = self.updated_at {
            listing.updated_at = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gallery_falls_back_to_legacy_image() {
        let listing = Listing {
            image: "https://img/main.jpg".to_string(),
            ..Listing::default()
        };
        assert_eq!(listing.gallery(), vec!["https://img/main.jpg"]);

        let listing = Listing {
            image: "https://img/main.jpg".to_string(),
            images: vec!["https://img/a.jpg".to_string(), "https://img/b.jpg".to_string()],
            ..Listing::default()
        };
        assert_eq!(listing.gallery().len(), 2);
        assert_eq!(listing.gallery()[0], "https://img/a.jpg");
    }

    #[test]
    fn draft_validation_requires_brand_and_model() {
        let draft = ListingDraft::default();
        assert!(draft.validate().is_err());

        let draft = ListingDraft {
            brand: "BMW".to_string(),
            model: "  ".to_string(),
            ..ListingDraft::default()
        };
        assert!(draft.validate().is_err());

        let draft = ListingDraft {
            brand: "BMW".to_string(),
            model: "M4".to_string(),
            ..ListingDraft::default()
        };
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn logo_url_lowercases_and_strips_spaces() {
        let draft = ListingDraft {
            brand: "Land Rover".to_string(),
            model: "Defender".to_string(),
            ..ListingDraft::default()
        };
        assert_eq!(draft.logo_url(), "https://cdn.simpleicons.org/landrover/000000");
    }

    #[test]
    fn unfeature_patch_clears_both_fields() {
        let mut listing = Listing {
            featured: true,
            featured_at: Some(Utc::now()),
            ..Listing::default()
        };
        ListingPatch::unfeature().apply(&mut listing);
        assert!(!listing.featured);
        assert!(listing.featured_at.is_none());
    }
}
