pub mod upload;

use crate::auth::Session;
use crate::featured::{self, FeatureDecision};
use crate::models::{Listing, ListingDoc, ListingDraft, ListingPatch};
use crate::slug::{self, SlugError};
use crate::store::{DocumentStore, ObjectStore, StoreError};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

pub use upload::{ImageUpload, StoredImage};

/// The creation write races this timer; on timeout the operation is
/// reported as failed even though the write may still land.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Cap applied when editing a listing's gallery
pub const MAX_IMAGES: usize = 10;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("failed to upload {file}")]
    Upload {
        file: String,
        #[source]
        source: StoreError,
    },

    /// False negative the operator must tolerate: the write may still
    /// complete, and a retry can duplicate the listing
    #[error("database write timed out")]
    WriteTimeout,

    #[error("operator declined to evict the oldest featured listing")]
    EvictionDeclined,

    #[error("admin session is missing or expired")]
    Unauthorized,

    #[error(transparent)]
    Slug(#[from] SlugError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Change notifications for dashboard views
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingEvent {
    Created { id: String },
    Updated { id: String },
    Deleted { id: String },
    Featured { id: String },
    Unfeatured { id: String },
}

/// Result of a featured toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureOutcome {
    Featured,
    Unfeatured,
    /// All slots were taken and the operator kept the current set
    Declined,
}

#[derive(Debug, Clone)]
pub struct CreatedListing {
    pub id: String,
    pub slug: String,
    pub images: Vec<String>,
}

/// Back-office operations over the two store collaborators. Mutations
/// are serialized through one in-process lock; concurrent operators in
/// other processes can still race the read-check-write sequences.
pub struct AdminService<D, O> {
    docs: Arc<D>,
    objects: Arc<O>,
    write_lock: Mutex<()>,
    events: broadcast::Sender<ListingEvent>,
}

impl<D, O> AdminService<D, O>
where
    D: DocumentStore,
    O: ObjectStore,
{
    pub fn new(docs: Arc<D>, objects: Arc<O>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            docs,
            objects,
            write_lock: Mutex::new(()),
            events,
        }
    }

    /// Live feed of listing changes made through this service
    pub fn subscribe(&self) -> broadcast::Receiver<ListingEvent> {
        self.events.subscribe()
    }

    fn authorize(&self, session: &Session) -> Result<(), AdminError> {
        if session.is_expired() {
            return Err(AdminError::Unauthorized);
        }
        Ok(())
    }

    fn emit(&self, event: ListingEvent) {
        // nobody listening is fine
        let _ = self.events.send(event);
    }

    /// Creates a listing: validate, upload images, allocate a slug, make
    /// room in the featured set if requested, then write the document
    /// against the wall-clock timeout.
    pub async fn create_listing<C>(
        &self,
        session: &Session,
        draft: &ListingDraft,
        images: Vec<ImageUpload>,
        confirm_eviction: C,
    ) -> Result<CreatedListing, AdminError>
    where
        C: FnOnce(&Listing) -> bool + Send,
    {
        self.authorize(session)?;
        draft.validate().map_err(AdminError::Validation)?;
        if images.is_empty() {
            return Err(AdminError::Validation(
                "at least one image is required".to_string(),
            ));
        }

        let _guard = self.write_lock.lock().await;

        let stored = upload::upload_batch(self.objects.as_ref(), &images).await?;
        let slug = slug::allocate(self.docs.as_ref(), &draft.brand, &draft.model, None).await?;

        let featured_at = if draft.featured {
            let proceed = featured::reserve_slot(self.docs.as_ref(), confirm_eviction).await?;
            if !proceed {
                upload::remove_batch(self.objects.as_ref(), &stored).await;
                return Err(AdminError::EvictionDeclined);
            }
            Some(Utc::now())
        } else {
            None
        };

        let urls: Vec<String> = stored.iter().map(|s| s.url.clone()).collect();
        let doc = ListingDoc::from_draft(draft, slug.clone(), urls.clone(), featured_at);

        let id = match tokio::time::timeout(WRITE_TIMEOUT, self.docs.insert(&doc)).await {
            Ok(Ok(id)) => id,
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => {
                warn!(slug = %slug, "listing write timed out; the document may still appear");
                return Err(AdminError::WriteTimeout);
            }
        };

        info!(id = %id, slug = %slug, "listing created");
        self.emit(ListingEvent::Created { id: id.clone() });
        Ok(CreatedListing { id, slug, images: urls })
    }

    /// Edits a listing: re-validate, upload any new images, merge them
    /// after the kept ones, re-allocate the slug excluding the listing
    /// itself, and patch the document.
    pub async fn update_listing<C>(
        &self,
        session: &Session,
        id: &str,
        draft: &ListingDraft,
        keep_images: Vec<String>,
        new_images: Vec<ImageUpload>,
        confirm_eviction: C,
    ) -> Result<(), AdminError>
    where
        C: FnOnce(&Listing) -> bool + Send,
    {
        self.authorize(session)?;
        draft.validate().map_err(AdminError::Validation)?;
        let total = keep_images.len() + new_images.len();
        if total == 0 {
            return Err(AdminError::Validation(
                "at least one image is required".to_string(),
            ));
        }
        if total > MAX_IMAGES {
            return Err(AdminError::Validation(format!(
                "a listing can have at most {MAX_IMAGES} images"
            )));
        }

        let _guard = self.write_lock.lock().await;

        let stored = upload::upload_batch(self.objects.as_ref(), &new_images).await?;
        let slug = slug::allocate(self.docs.as_ref(), &draft.brand, &draft.model, Some(id)).await?;

        let featured_at = if draft.featured {
            let proceed =
                featured::reserve_slot_excluding(self.docs.as_ref(), Some(id), confirm_eviction)
                    .await?;
            if !proceed {
                upload::remove_batch(self.objects.as_ref(), &stored).await;
                return Err(AdminError::EvictionDeclined);
            }
            Some(Utc::now())
        } else {
            None
        };

        let mut merged = keep_images;
        merged.extend(stored.iter().map(|s| s.url.clone()));

        let patch = ListingPatch::revise(draft, slug, merged, featured_at);
        self.docs.update(id, &patch).await?;

        info!(id = %id, "listing updated");
        self.emit(ListingEvent::Updated { id: id.to_string() });
        Ok(())
    }

    /// Hard delete of the document only; stored images are not removed
    pub async fn delete_listing(&self, session: &Session, id: &str) -> Result<(), AdminError> {
        self.authorize(session)?;
        let _guard = self.write_lock.lock().await;
        self.docs.delete(id).await?;
        info!(id = %id, "listing deleted");
        self.emit(ListingEvent::Deleted { id: id.to_string() });
        Ok(())
    }

    /// Flips the featured flag. Turning a listing on with all slots
    /// taken asks `confirm_eviction` before displacing the oldest.
    pub async fn toggle_featured<C>(
        &self,
        session: &Session,
        id: &str,
        confirm_eviction: C,
    ) -> Result<FeatureOutcome, AdminError>
    where
        C: FnOnce(&Listing) -> bool + Send,
    {
        self.authorize(session)?;
        let _guard = self.write_lock.lock().await;

        let listing = self
            .docs
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        if listing.featured {
            featured::unfeature(self.docs.as_ref(), id).await?;
            self.emit(ListingEvent::Unfeatured { id: id.to_string() });
            return Ok(FeatureOutcome::Unfeatured);
        }

        match featured::request_feature(self.docs.as_ref(), id).await? {
            FeatureDecision::Featured => {
                self.emit(ListingEvent::Featured { id: id.to_string() });
                Ok(FeatureOutcome::Featured)
            }
            FeatureDecision::NeedsEviction(candidate) => {
                if !confirm_eviction(&candidate) {
                    return Ok(FeatureOutcome::Declined);
                }
                featured::confirm_feature(self.docs.as_ref(), id, &candidate.id).await?;
                self.emit(ListingEvent::Unfeatured {
                    id: candidate.id.clone(),
                });
                self.emit(ListingEvent::Featured { id: id.to_string() });
                Ok(FeatureOutcome::Featured)
            }
        }
    }
}
