use crate::models::{Listing, ListingDoc, ListingPatch};
use crate::store::traits::{DocumentStore, ObjectStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory document store used by tests and offline runs. Assigns
/// sequential ids and keeps the same query semantics as the live store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    next_id: u64,
    listings: Vec<Listing>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with pre-built documents, returning their ids
    pub fn seeded(docs: Vec<ListingDoc>) -> (Self, Vec<String>) {
        let store = Self::new();
        let mut ids = Vec::with_capacity(docs.len());
        {
            let mut inner = store.inner.lock().unwrap();
            for doc in docs {
                inner.next_id += 1;
                let id = format!("mem-{}", inner.next_id);
                ids.push(id.clone());
                inner.listings.push(doc.into_listing(id));
            }
        }
        (store, ids)
    }

    fn snapshot(&self) -> Vec<Listing> {
        self.inner.lock().unwrap().listings.clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Listing>, StoreError> {
        let mut listings = self.snapshot();
        listings.sort_by_key(|l| {
            std::cmp::Reverse(l.created_at.map(|t| t.timestamp_millis()).unwrap_or(0))
        });
        Ok(listings)
    }

    async fn get(&self, id: &str) -> Result<Option<Listing>, StoreError> {
        Ok(self.snapshot().into_iter().find(|l| l.id == id))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Vec<Listing>, StoreError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|l| l.slug.as_deref() == Some(slug))
            .collect())
    }

    async fn find_by_body_type(&self, body_type: &str) -> Result<Vec<Listing>, StoreError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|l| l.body_type == body_type)
            .collect())
    }

    async fn find_featured(&self) -> Result<Vec<Listing>, StoreError> {
        Ok(self.snapshot().into_iter().filter(|l| l.featured).collect())
    }

    async fn insert(&self, doc: &ListingDoc) -> Result<String, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = format!("mem-{}", inner.next_id);
        inner.listings.push(doc.clone().into_listing(id.clone()));
        Ok(id)
    }

    async fn update(&self, id: &str, patch: &ListingPatch) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.listings.iter_mut().find(|l| l.id == id) {
            Some(listing) => {
                patch.apply(listing);
                Ok(())
            }
            None => Err(StoreError::NotFound { id: id.to_string() }),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.listings.retain(|l| l.id != id);
        Ok(())
    }
}

/// In-memory object store; URLs use a `memory://` scheme
#[derive(Default)]
pub struct MemoryObjects {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryObjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String, StoreError> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        Ok(format!("memory://{key}"))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}
