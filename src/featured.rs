use crate::models::{Listing, ListingPatch};
use crate::store::{DocumentStore, StoreError};
use chrono::Utc;
use tracing::info;

/// At most this many listings may be featured at once, system-wide
pub const MAX_FEATURED: usize = 3;

/// Result of asking to feature a listing
#[derive(Debug, Clone)]
pub enum FeatureDecision {
    /// A slot was free and the listing is now featured
    Featured,
    /// All slots are taken; the operator must confirm evicting this
    /// listing (the one featured longest) before anything is written
    NeedsEviction(Listing),
}

/// Picks the eviction candidate: the featured listing with the oldest
/// `featuredAt`, where a missing timestamp counts as oldest of all.
pub fn eviction_candidate(featured: &[Listing]) -> Option<&Listing> {
    featured
        .iter()
        .min_by_key(|l| l.featured_at.map(|t| t.timestamp_millis()).unwrap_or(0))
}

/// Features `id` if a slot is free, otherwise surfaces the eviction
/// candidate without mutating anything.
pub async fn request_feature<D>(store: &D, id: &str) -> Result<FeatureDecision, StoreError>
where
    D: DocumentStore + ?Sized,
{
    let featured = store.find_featured().await?;
    if featured.len() < MAX_FEATURED {
        store.update(id, &ListingPatch::feature(Utc::now())).await?;
        info!(id = %id, "listing featured");
        return Ok(FeatureDecision::Featured);
    }
    match eviction_candidate(&featured) {
        Some(candidate) => Ok(FeatureDecision::NeedsEviction(candidate.clone())),
        // unreachable while MAX_FEATURED > 0
        None => {
            store.update(id, &ListingPatch::feature(Utc::now())).await?;
            Ok(FeatureDecision::Featured)
        }
    }
}

/// Confirmed eviction: unfeature the evicted listing, then feature the
/// target. Two separate writes with no transaction; a concurrent toggle
/// in between can transiently exceed the cap.
pub async fn confirm_feature<D>(store: &D, target_id: &str, evicted_id: &str) -> Result<(), StoreError>
where
    D: DocumentStore + ?Sized,
{
    store.update(evicted_id, &ListingPatch::unfeature()).await?;
    store.update(target_id, &ListingPatch::feature(Utc::now())).await?;
    info!(id = %target_id, evicted = %evicted_id, "listing featured after eviction");
    Ok(())
}

/// Unconditionally clears the featured flag and timestamp
pub async fn unfeature<D>(store: &D, id: &str) -> Result<(), StoreError>
where
    D: DocumentStore + ?Sized,
{
    store.update(id, &ListingPatch::unfeature()).await?;
    info!(id = %id, "listing unfeatured");
    Ok(())
}

/// Used on listing creation: makes room for a new featured listing before
/// the document exists. Returns false when the operator declines the
/// eviction, in which case nothing was written.
pub async fn reserve_slot<D, C>(store: &D, confirm: C) -> Result<bool, StoreError>
where
    D: DocumentStore + ?Sized,
    C: FnOnce(&Listing) -> bool,
{
    reserve_slot_excluding(store, None, confirm).await
}

/// Same as [`reserve_slot`] but ignores `exclude_id` when counting, so a
/// re-saved listing does not compete with itself for a slot.
pub async fn reserve_slot_excluding<D, C>(
    store: &D,
    exclude_id: Option<&str>,
    confirm: C,
) -> Result<bool, StoreError>
where
    D: DocumentStore + ?Sized,
    C: FnOnce(&Listing) -> bool,
{
    let featured: Vec<Listing> = store
        .find_featured()
        .await?
        .into_iter()
        .filter(|l| Some(l.id.as_str()) != exclude_id)
        .collect();
    if featured.len() < MAX_FEATURED {
        return Ok(true);
    }
    let Some(candidate) = eviction_candidate(&featured) else {
        return Ok(true);
    };
    if !confirm(candidate) {
        info!("operator declined eviction, aborting");
        return Ok(false);
    }
    store.update(&candidate.id, &ListingPatch::unfeature()).await?;
    info!(evicted = %candidate.id, "oldest featured listing evicted");
    Ok(true)
}
