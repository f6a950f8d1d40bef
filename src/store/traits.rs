use crate::models::{Listing, ListingDoc, ListingPatch};
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by the store collaborators. Nothing here is retried
/// automatically; callers report the failure and keep whatever partial
/// state the last successful step produced.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to build store client")]
    Init(#[source] reqwest::Error),

    #[error("request to {endpoint} failed")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("permission denied for {key}")]
    PermissionDenied { key: String },

    #[error("document {id} not found")]
    NotFound { id: String },

    #[error("malformed document {id}: {reason}")]
    Malformed { id: String, reason: String },
}

/// Document-store collaborator holding the listing collection.
/// Queries are equality predicates; list order is newest-created first.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All listings, newest `createdAt` first
    async fn list(&self) -> Result<Vec<Listing>, StoreError>;

    /// Point read; Ok(None) when the document does not exist
    async fn get(&self, id: &str) -> Result<Option<Listing>, StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Vec<Listing>, StoreError>;

    async fn find_by_body_type(&self, body_type: &str) -> Result<Vec<Listing>, StoreError>;

    async fn find_featured(&self) -> Result<Vec<Listing>, StoreError>;

    /// Writes a new document and returns its store-assigned id
    async fn insert(&self, doc: &ListingDoc) -> Result<String, StoreError>;

    async fn update(&self, id: &str, patch: &ListingPatch) -> Result<(), StoreError>;

    /// Hard delete, idempotent: deleting an absent document is not an error
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Object-store collaborator: write-once-by-key blobs with a retrievable
/// URL per stored object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores the bytes under `key` and returns the public URL
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
