use crate::store::traits::{ObjectStore, StoreError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

const STORAGE_HOST: &str = "https://firebasestorage.googleapis.com";

/// Firebase Storage REST client. Objects are written once under a
/// caller-chosen key and read back through a tokenized download URL.
pub struct FirebaseStorage {
    client: Client,
    bucket: String,
}

impl FirebaseStorage {
    pub fn new(bucket: impl Into<String>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(StoreError::Init)?;
        Ok(Self {
            client,
            bucket: bucket.into(),
        })
    }

    fn upload_url(&self) -> String {
        format!("{STORAGE_HOST}/v0/b/{}/o", self.bucket)
    }

    /// Object URL with the key as a single escaped path segment
    /// (slashes inside the key become %2F)
    fn object_url(&self, key: &str) -> Url {
        let mut url = Url::parse(STORAGE_HOST).expect("static host URL");
        url.path_segments_mut()
            .expect("https URL has path segments")
            .extend(["v0", "b", self.bucket.as_str(), "o"])
            .push(key);
        url
    }
}

#[async_trait]
impl ObjectStore for FirebaseStorage {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, StoreError> {
        let endpoint = self.upload_url();
        let response = self
            .client
            .post(&endpoint)
            .query(&[("name", key)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|source| StoreError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
            return Err(StoreError::PermissionDenied {
                key: key.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let metadata: Value = response.json().await.map_err(|source| StoreError::Http {
            endpoint: endpoint.clone(),
            source,
        })?;
        let token = metadata
            .get("downloadTokens")
            .and_then(Value::as_str)
            .and_then(|tokens| tokens.split(',').next())
            .unwrap_or_default();
        if token.is_empty() {
            return Err(StoreError::Malformed {
                id: key.to_string(),
                reason: "upload response carried no download token".to_string(),
            });
        }

        let mut url = self.object_url(key);
        url.query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("token", token);
        debug!(key = %key, "object stored");
        Ok(url.to_string())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let endpoint = self.object_url(key).to_string();
        let response = self
            .client
            .delete(&endpoint)
            .send()
            .await
            .map_err(|source| StoreError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;
        let status = response.status();
        // deleting an already-gone object is fine during cleanup
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
            return Err(StoreError::PermissionDenied {
                key: key.to_string(),
            });
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            endpoint,
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_escapes_the_key() {
        let storage = FirebaseStorage::new("carhunter-52d21.firebasestorage.app").unwrap();
        let url = storage.object_url("cars/1714_0_front view.jpg");
        assert_eq!(
            url.as_str(),
            "https://firebasestorage.googleapis.com/v0/b/carhunter-52d21.firebasestorage.app/o/cars%2F1714_0_front%20view.jpg"
        );
    }
}
