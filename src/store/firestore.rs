use crate::models::{Listing, ListingDoc, ListingPatch, ListingStatus};
use crate::store::traits::{DocumentStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

const FIRESTORE_HOST: &str = "https://firestore.googleapis.com/v1";

/// Connection settings for the live document store
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub api_key: String,
    pub collection: String,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            api_key: api_key.into(),
            collection: "cars".to_string(),
        }
    }
}

/// Firestore REST client for the listing collection
pub struct Firestore {
    client: Client,
    config: FirestoreConfig,
}

impl Firestore {
    pub fn new(config: FirestoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(StoreError::Init)?;
        Ok(Self { client, config })
    }

    fn documents_url(&self) -> String {
        format!(
            "{FIRESTORE_HOST}/projects/{}/databases/(default)/documents",
            self.config.project_id
        )
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.documents_url(), self.config.collection)
    }

    fn doc_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url(), id)
    }

    async fn run_query(&self, query: Value) -> Result<Vec<Listing>, StoreError> {
        let endpoint = format!("{}:runQuery", self.documents_url());
        let response = self
            .client
            .post(&endpoint)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&json!({ "structuredQuery": query }))
            .send()
            .await
            .map_err(|source| StoreError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;
        let response = expect_success(&endpoint, response).await?;
        let rows: Value = response.json().await.map_err(|source| StoreError::Http {
            endpoint: endpoint.clone(),
            source,
        })?;

        // runQuery streams one object per row; rows without a `document`
        // key carry read metadata only.
        let mut listings = Vec::new();
        if let Some(rows) = rows.as_array() {
            for row in rows {
                if let Some(document) = row.get("document") {
                    listings.push(decode_document(document));
                }
            }
        }
        debug!(endpoint = %endpoint, count = listings.len(), "query returned");
        Ok(listings)
    }

    fn equality_query(&self, field: &str, value: Value) -> Value {
        json!({
            "from": [{ "collectionId": self.config.collection }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": field },
                    "op": "EQUAL",
                    "value": value
                }
            }
        })
    }
}

#[async_trait]
impl DocumentStore for Firestore {
    async fn list(&self) -> Result<Vec<Listing>, StoreError> {
        self.run_query(json!({
            "from": [{ "collectionId": self.config.collection }],
            "orderBy": [{
                "field": { "fieldPath": "createdAt" },
                "direction": "DESCENDING"
            }]
        }))
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<Listing>, StoreError> {
        let endpoint = self.doc_url(id);
        let response = self
            .client
            .get(&endpoint)
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|source| StoreError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = expect_success(&endpoint, response).await?;
        let document: Value = response.json().await.map_err(|source| StoreError::Http {
            endpoint: endpoint.clone(),
            source,
        })?;
        Ok(Some(decode_document(&document)))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Vec<Listing>, StoreError> {
        self.run_query(self.equality_query("slug", json!({ "stringValue": slug })))
            .await
    }

    async fn find_by_body_type(&self, body_type: &str) -> Result<Vec<Listing>, StoreError> {
        self.run_query(self.equality_query("bodyType", json!({ "stringValue": body_type })))
            .await
    }

    async fn find_featured(&self) -> Result<Vec<Listing>, StoreError> {
        self.run_query(self.equality_query("featured", json!({ "booleanValue": true })))
            .await
    }

    async fn insert(&self, doc: &ListingDoc) -> Result<String, StoreError> {
        let endpoint = self.collection_url();
        let response = self
            .client
            .post(&endpoint)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&json!({ "fields": encode_doc(doc) }))
            .send()
            .await
            .map_err(|source| StoreError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;
        let response = expect_success(&endpoint, response).await?;
        let created: Value = response.json().await.map_err(|source| StoreError::Http {
            endpoint: endpoint.clone(),
            source,
        })?;
        let name = created.get("name").and_then(Value::as_str).unwrap_or_default();
        match name.rsplit('/').next() {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(StoreError::Malformed {
                id: name.to_string(),
                reason: "insert response carried no document name".to_string(),
            }),
        }
    }

    async fn update(&self, id: &str, patch: &ListingPatch) -> Result<(), StoreError> {
        let (fields, mask) = encode_patch(patch);
        if mask.is_empty() {
            return Ok(());
        }
        let endpoint = self.doc_url(id);
        let mut params: Vec<(&str, &str)> = vec![("key", self.config.api_key.as_str())];
        for path in &mask {
            params.push(("updateMask.fieldPaths", path.as_str()));
        }
        let response = self
            .client
            .patch(&endpoint)
            .query(&params)
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .map_err(|source| StoreError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        expect_success(&endpoint, response).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let endpoint = self.doc_url(id);
        let response = self
            .client
            .delete(&endpoint)
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|source| StoreError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        expect_success(&endpoint, response).await?;
        Ok(())
    }
}

async fn expect_success(endpoint: &str, response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
        return Err(StoreError::PermissionDenied {
            key: endpoint.to_string(),
        });
    }
    Err(StoreError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}

// ---- typed-value encoding -------------------------------------------------

fn sv(value: &str) -> Value {
    json!({ "stringValue": value })
}

fn iv(value: i64) -> Value {
    // Firestore serializes 64-bit integers as strings
    json!({ "integerValue": value.to_string() })
}

fn bv(value: bool) -> Value {
    json!({ "booleanValue": value })
}

fn tv(value: &DateTime<Utc>) -> Value {
    json!({ "timestampValue": value.to_rfc3339_opts(SecondsFormat::Millis, true) })
}

fn av(values: &[String]) -> Value {
    let values: Vec<Value> = values.iter().map(|v| sv(v)).collect();
    json!({ "arrayValue": { "values": values } })
}

fn nullv() -> Value {
    json!({ "nullValue": null })
}

fn encode_doc(doc: &ListingDoc) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(slug) = &doc.slug {
        fields.insert("slug".to_string(), sv(slug));
    }
    fields.insert("brand".to_string(), sv(&doc.brand));
    fields.insert("model".to_string(), sv(&doc.model));
    fields.insert("year".to_string(), iv(doc.year as i64));
    fields.insert("priceRange".to_string(), sv(&doc.price_range));
    fields.insert("mileage".to_string(), sv(&doc.mileage));
    fields.insert("transmission".to_string(), sv(&doc.transmission));
    fields.insert("drivetrain".to_string(), sv(&doc.drivetrain));
    fields.insert("power".to_string(), sv(&doc.power));
    fields.insert("bodyType".to_string(), sv(&doc.body_type));
    fields.insert("engine".to_string(), sv(&doc.engine));
    fields.insert("engineCC".to_string(), sv(&doc.engine_cc));
    fields.insert("fuel".to_string(), sv(&doc.fuel));
    fields.insert("mpg".to_string(), sv(&doc.mpg));
    fields.insert("seats".to_string(), iv(doc.seats as i64));
    fields.insert("doors".to_string(), iv(doc.doors as i64));
    fields.insert("extColors".to_string(), av(&doc.ext_colors));
    fields.insert("intColors".to_string(), av(&doc.int_colors));
    fields.insert("status".to_string(), sv(doc.status.as_str()));
    fields.insert("geran".to_string(), sv(&doc.geran));
    fields.insert("spareKey".to_string(), sv(&doc.spare_key));
    fields.insert("image".to_string(), sv(&doc.image));
    fields.insert("images".to_string(), av(&doc.images));
    fields.insert("logo".to_string(), sv(&doc.logo));
    fields.insert("featured".to_string(), bv(doc.featured));
    // an explicit null keeps the field present on unfeatured documents
    fields.insert(
        "featuredAt".to_string(),
        doc.featured_at.as_ref().map(tv).unwrap_or_else(nullv),
    );
    if let Some(created_at) = &doc.created_at {
        fields.insert("createdAt".to_string(), tv(created_at));
    }
    fields
}

fn encode_patch(patch: &ListingPatch) -> (Map<String, Value>, Vec<String>) {
    let mut fields = Map::new();
    let mut mask = Vec::new();
    fn put(name: &str, value: Value, mask: &mut Vec<String>, fields: &mut Map<String, Value>) {
        fields.insert(name.to_string(), value);
        mask.push(name.to_string());
    }

    if let Some(v) = &patch.slug {
        put("slug", sv(v), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.brand {
        put("brand", sv(v), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.model {
        put("model", sv(v), &mut mask, &mut fields);
    }
    if let Some(v) = patch.year {
        put("year", iv(v as i64), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.price_range {
        put("priceRange", sv(v), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.mileage {
        put("mileage", sv(v), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.transmission {
        put("transmission", sv(v), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.drivetrain {
        put("drivetrain", sv(v), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.power {
        put("power", sv(v), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.body_type {
        put("bodyType", sv(v), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.engine {
        put("engine", sv(v), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.engine_cc {
        put("engineCC", sv(v), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.fuel {
        put("fuel", sv(v), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.mpg {
        put("mpg", sv(v), &mut mask, &mut fields);
    }
    if let Some(v) = patch.seats {
        put("seats", iv(v as i64), &mut mask, &mut fields);
    }
    if let Some(v) = patch.doors {
        put("doors", iv(v as i64), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.ext_colors {
        put("extColors", av(v), &mut mask, &mut fields);
    }
    if let Some(v) = patch.status {
        put("status", sv(v.as_str()), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.geran {
        put("geran", sv(v), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.spare_key {
        put("spareKey", sv(v), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.image {
        put("image", sv(v), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.images {
        put("images", av(v), &mut mask, &mut fields);
    }
    if let Some(v) = patch.featured {
        put("featured", bv(v), &mut mask, &mut fields);
    }
    if let Some(v) = &patch.featured_at {
        put(
            "featuredAt",
            v.as_ref().map(tv).unwrap_or_else(nullv),
            &mut mask,
            &mut fields,
        );
    }
    if let Some(v) = &patch.updated_at {
        put("updatedAt", tv(v), &mut mask, &mut fields);
    }
    (fields, mask)
}

// ---- typed-value decoding -------------------------------------------------

fn str_field(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(|v| v.get("stringValue"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn opt_str_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    let value = str_field(fields, key);
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn int_field(fields: &Map<String, Value>, key: &str) -> i64 {
    let Some(value) = fields.get(key) else {
        return 0;
    };
    if let Some(raw) = value.get("integerValue") {
        return raw
            .as_str()
            .and_then(|s| s.parse().ok())
            .or_else(|| raw.as_i64())
            .unwrap_or(0);
    }
    value
        .get("doubleValue")
        .and_then(Value::as_f64)
        .map(|f| f as i64)
        .unwrap_or(0)
}

fn bool_field(fields: &Map<String, Value>, key: &str) -> bool {
    fields
        .get(key)
        .and_then(|v| v.get("booleanValue"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn ts_field(fields: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    fields
        .get(key)
        .and_then(|v| v.get("timestampValue"))
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn str_list_field(fields: &Map<String, Value>, key: &str) -> Vec<String> {
    fields
        .get(key)
        .and_then(|v| v.get("arrayValue"))
        .and_then(|v| v.get("values"))
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.get("stringValue").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Maps a Firestore document to a Listing. Missing fields decode to
/// defaults so legacy records stay readable.
fn decode_document(document: &Value) -> Listing {
    let name = document.get("name").and_then(Value::as_str).unwrap_or_default();
    let id = name.rsplit('/').next().unwrap_or_default().to_string();
    let empty = Map::new();
    let fields = document
        .get("fields")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    Listing {
        id,
        slug: opt_str_field(fields, "slug"),
        brand: str_field(fields, "brand"),
        model: str_field(fields, "model"),
        year: int_field(fields, "year") as i32,
        price_range: str_field(fields, "priceRange"),
        mileage: str_field(fields, "mileage"),
        transmission: str_field(fields, "transmission"),
        drivetrain: str_field(fields, "drivetrain"),
        power: str_field(fields, "power"),
        body_type: str_field(fields, "bodyType"),
        engine: str_field(fields, "engine"),
        engine_cc: str_field(fields, "engineCC"),
        fuel: str_field(fields, "fuel"),
        mpg: str_field(fields, "mpg"),
        seats: int_field(fields, "seats") as u32,
        doors: int_field(fields, "doors") as u32,
        ext_colors: str_list_field(fields, "extColors"),
        int_colors: str_list_field(fields, "intColors"),
        status: ListingStatus::parse(&str_field(fields, "status")),
        geran: str_field(fields, "geran"),
        spare_key: str_field(fields, "spareKey"),
        image: str_field(fields, "image"),
        images: str_list_field(fields, "images"),
        logo: str_field(fields, "logo"),
        featured: bool_field(fields, "featured"),
        featured_at: ts_field(fields, "featuredAt"),
        created_at: ts_field(fields, "createdAt"),
        updated_at: ts_field(fields, "updatedAt"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingDraft;
    use chrono::TimeZone;

    fn sample_doc() -> ListingDoc {
        let draft = ListingDraft {
            brand: "BMW".to_string(),
            model: "M4".to_string(),
            year: 2021,
            price_range: "400,000 - 450,000".to_string(),
            body_type: "Coupe".to_string(),
            ..ListingDraft::default()
        };
        ListingDoc::from_draft(
            &draft,
            "bmw-m4".to_string(),
            vec!["https://img/a.jpg".to_string(), "https://img/b.jpg".to_string()],
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()),
        )
    }

    #[test]
    fn document_roundtrip_preserves_fields() {
        let doc = sample_doc();
        let encoded = json!({
            "name": "projects/p/databases/(default)/documents/cars/abc123",
            "fields": encode_doc(&doc)
        });
        let listing = decode_document(&encoded);

        assert_eq!(listing.id, "abc123");
        assert_eq!(listing.slug.as_deref(), Some("bmw-m4"));
        assert_eq!(listing.brand, "BMW");
        assert_eq!(listing.year, 2021);
        assert_eq!(listing.images.len(), 2);
        assert_eq!(listing.image, "https://img/a.jpg");
        assert!(listing.featured);
        assert_eq!(
            listing.featured_at,
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(listing.status, ListingStatus::Available);
    }

    #[test]
    fn integer_values_decode_from_strings() {
        let document = json!({
            "name": ".../cars/x",
            "fields": {
                "year": { "integerValue": "2019" },
                "seats": { "integerValue": 4 }
            }
        });
        let listing = decode_document(&document);
        assert_eq!(listing.year, 2019);
        assert_eq!(listing.seats, 4);
    }

    #[test]
    fn legacy_document_decodes_to_defaults() {
        let document = json!({
            "name": ".../cars/legacy",
            "fields": {
                "brand": { "stringValue": "Toyota" },
                "model": { "stringValue": "Supra" }
            }
        });
        let listing = decode_document(&document);
        assert_eq!(listing.id, "legacy");
        assert!(listing.slug.is_none());
        assert!(listing.images.is_empty());
        assert!(!listing.featured);
        assert!(listing.featured_at.is_none());
    }

    #[test]
    fn feature_patch_masks_both_fields() {
        let patch = ListingPatch::feature(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let (fields, mask) = encode_patch(&patch);
        assert_eq!(mask, vec!["featured", "featuredAt"]);
        assert_eq!(fields["featured"], json!({ "booleanValue": true }));
        assert!(fields["featuredAt"].get("timestampValue").is_some());
    }

    #[test]
    fn unfeature_patch_writes_explicit_null() {
        let (fields, mask) = encode_patch(&ListingPatch::unfeature());
        assert_eq!(mask, vec!["featured", "featuredAt"]);
        assert_eq!(fields["featuredAt"], json!({ "nullValue": null }));
    }

    #[test]
    fn empty_patch_produces_empty_mask() {
        let (fields, mask) = encode_patch(&ListingPatch::default());
        assert!(fields.is_empty());
        assert!(mask.is_empty());
    }
}
