use crate::models::ListingPatch;
use crate::slug;
use crate::store::DocumentStore;
use anyhow::{Context, Result};
use tracing::{info, warn};

/// Outcome of a slug backfill run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub updated: usize,
    pub skipped: usize,
}

/// One-off backfill: gives every slug-less listing a unique slug. Safe
/// to re-run; records that already carry a slug are skipped. With
/// `dry_run` the store is only read.
pub async fn backfill_slugs<D>(store: &D, dry_run: bool) -> Result<MigrationReport>
where
    D: DocumentStore + ?Sized,
{
    let listings = store.list().await.context("failed to list listings")?;
    info!("found {} listings to process", listings.len());

    let mut report = MigrationReport::default();
    for listing in listings {
        if let Some(slug) = listing.slug.as_deref() {
            info!(id = %listing.id, slug = %slug, "skipping, already has a slug");
            report.skipped += 1;
            continue;
        }

        let slug = match slug::allocate(store, &listing.brand, &listing.model, Some(&listing.id)).await
        {
            Ok(slug) => slug,
            Err(err) => {
                // symbol-only brand/model; leave the record for manual cleanup
                warn!(id = %listing.id, error = %err, "could not build a slug");
                continue;
            }
        };

        if dry_run {
            info!(id = %listing.id, slug = %slug, "dry run, would set slug");
        } else {
            store
                .update(&listing.id, &ListingPatch::set_slug(slug.clone()))
                .await
                .with_context(|| format!("failed to update listing {}", listing.id))?;
            info!("updated {} with slug: {}", listing.display_name(), slug);
        }
        report.updated += 1;
    }

    info!(updated = report.updated, skipped = report.skipped, "migration complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListingDoc, ListingDraft};
    use crate::store::MemoryStore;

    async fn seed(store: &MemoryStore, brand: &str, model: &str, slug: Option<&str>) -> String {
        let draft = ListingDraft {
            brand: brand.to_string(),
            model: model.to_string(),
            ..Default::default()
        };
        let mut doc = ListingDoc::from_draft(&draft, String::new(), vec![], None);
        doc.slug = slug.map(str::to_string);
        store.insert(&doc).await.unwrap()
    }

    #[tokio::test]
    async fn backfills_only_slugless_records() {
        let store = MemoryStore::new();
        let legacy = seed(&store, "BMW", "M4", None).await;
        seed(&store, "Audi", "RS6", Some("audi-rs6")).await;

        let report = backfill_slugs(&store, false).await.unwrap();
        assert_eq!(report, MigrationReport { updated: 1, skipped: 1 });

        let listing = store.get(&legacy).await.unwrap().unwrap();
        assert_eq!(listing.slug.as_deref(), Some("bmw-m4"));
    }

    #[tokio::test]
    async fn colliding_legacy_records_get_suffixes() {
        let store = MemoryStore::new();
        let first = seed(&store, "BMW", "M4", None).await;
        let second = seed(&store, "BMW", "M4", None).await;

        backfill_slugs(&store, false).await.unwrap();

        let mut slugs: Vec<String> = Vec::new();
        for id in [&first, &second] {
            slugs.push(store.get(id).await.unwrap().unwrap().slug.unwrap());
        }
        slugs.sort();
        assert_eq!(slugs, vec!["bmw-m4", "bmw-m4-2"]);
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let store = MemoryStore::new();
        seed(&store, "BMW", "M4", None).await;

        backfill_slugs(&store, false).await.unwrap();
        let report = backfill_slugs(&store, false).await.unwrap();
        assert_eq!(report, MigrationReport { updated: 0, skipped: 1 });
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let store = MemoryStore::new();
        let legacy = seed(&store, "BMW", "M4", None).await;

        let report = backfill_slugs(&store, true).await.unwrap();
        assert_eq!(report.updated, 1);
        assert!(store.get(&legacy).await.unwrap().unwrap().slug.is_none());
    }
}
