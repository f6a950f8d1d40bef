use crate::store::ObjectStore;
use chrono::Utc;
use tracing::{info, warn};

use super::AdminError;

/// Image bytes taken from the admin form, in display order
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A stored object together with the key needed to delete it again
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub key: String,
    pub url: String,
}

/// Uploads the batch sequentially under `cars/{millis}_{index}_{name}`
/// keys. The first failure aborts the rest and deletes everything this
/// batch already stored, so an aborted submission leaves no orphans.
pub async fn upload_batch<O>(objects: &O, files: &[ImageUpload]) -> Result<Vec<StoredImage>, AdminError>
where
    O: ObjectStore + ?Sized,
{
    let batch = Utc::now().timestamp_millis();
    let mut stored: Vec<StoredImage> = Vec::with_capacity(files.len());
    for (index, file) in files.iter().enumerate() {
        if file.bytes.is_empty() {
            warn!(file = %file.filename, "skipping empty image file");
            continue;
        }
        let key = format!("cars/{batch}_{index}_{}", sanitize_filename(&file.filename));
        let content_type = if file.content_type.is_empty() {
            "image/jpeg"
        } else {
            file.content_type.as_str()
        };
        match objects.put(&key, &file.bytes, content_type).await {
            Ok(url) => {
                info!(file = %file.filename, key = %key, "image uploaded");
                stored.push(StoredImage { key, url });
            }
            Err(source) => {
                remove_batch(objects, &stored).await;
                return Err(AdminError::Upload {
                    file: file.filename.clone(),
                    source,
                });
            }
        }
    }
    Ok(stored)
}

/// Deletes the staged objects of an aborted submission. Failures are
/// logged and skipped; cleanup must not mask the original error.
pub async fn remove_batch<O>(objects: &O, stored: &[StoredImage])
where
    O: ObjectStore + ?Sized,
{
    for image in stored {
        if let Err(err) = objects.delete(&image.key).await {
            warn!(key = %image.key, error = %err, "failed to delete staged image");
        }
    }
}

/// Object keys keep only characters that survive URL building unescaped
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::traits::StoreError;
    use crate::store::MemoryObjects;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn image(name: &str) -> ImageUpload {
        ImageUpload {
            filename: name.to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xFF, 0xD8],
        }
    }

    /// Object store that rejects the n-th put
    struct FailingObjects {
        inner: MemoryObjects,
        fail_on: usize,
        puts: AtomicUsize,
    }

    #[async_trait]
    impl crate::store::ObjectStore for FailingObjects {
        async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, StoreError> {
            let n = self.puts.fetch_add(1, Ordering::SeqCst);
            if n == self.fail_on {
                return Err(StoreError::PermissionDenied {
                    key: key.to_string(),
                });
            }
            self.inner.put(key, bytes, content_type).await
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn uploads_preserve_order_and_key_convention() {
        let objects = MemoryObjects::new();
        let stored = upload_batch(&objects, &[image("front.jpg"), image("rear.jpg")])
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored[0].key.contains("_0_front.jpg"));
        assert!(stored[1].key.contains("_1_rear.jpg"));
        assert!(stored.iter().all(|s| s.key.starts_with("cars/")));
    }

    #[tokio::test]
    async fn empty_files_are_skipped() {
        let objects = MemoryObjects::new();
        let mut empty = image("broken.jpg");
        empty.bytes.clear();
        let stored = upload_batch(&objects, &[empty, image("ok.jpg")]).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].key.contains("ok.jpg"));
    }

    #[tokio::test]
    async fn failure_mid_batch_cleans_up_staged_objects() {
        let objects = FailingObjects {
            inner: MemoryObjects::new(),
            fail_on: 2,
            puts: AtomicUsize::new(0),
        };
        let err = upload_batch(&objects, &[image("a.jpg"), image("b.jpg"), image("c.jpg")])
            .await
            .unwrap_err();
        match err {
            AdminError::Upload { file, .. } => assert_eq!(file, "c.jpg"),
            other => panic!("expected upload error, got {other:?}"),
        }
        // the two staged objects were deleted again
        assert!(objects.inner.is_empty());
    }

    #[test]
    fn sanitize_keeps_url_safe_characters() {
        assert_eq!(sanitize_filename("IMG 0012 (1).HEIC"), "IMG_0012__1_.HEIC");
        assert_eq!(sanitize_filename("front-view.jpg"), "front-view.jpg");
    }
}
