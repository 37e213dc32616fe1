//! File store gateway: content-addressed blob storage with the deferred
//! delete ("pending file") protocol.
//!
//! Every freshly saved blob starts a countdown; unless some request attaches
//! the blob to a durable record and calls [`FileStore::mark_used`] before the
//! countdown fires, the blob is purged. This keeps abandoned uploads from
//! accumulating without any cleanup work on the request path.

pub mod storage;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use gather_cache::Cache;
use gather_db::Database;
use gather_db::models::FileRow;

use crate::storage::BlobStorage;

const IMAGE_CONTENT_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];
const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

pub struct DownloadedFile {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub filename: String,
}

#[derive(Clone)]
pub struct FileStore {
    storage: Arc<BlobStorage>,
    db: Arc<Database>,
    cache: Arc<Cache>,
    /// How long a saved blob may stay unreferenced before it is purged.
    pending_ttl: Duration,
}

impl FileStore {
    pub async fn new(
        dir: PathBuf,
        db: Arc<Database>,
        cache: Arc<Cache>,
        pending_ttl: Duration,
    ) -> Result<Self> {
        Ok(Self {
            storage: Arc::new(BlobStorage::new(dir).await?),
            db,
            cache,
            pending_ttl,
        })
    }

    /// Stores the blob and schedules its pending-delete countdown. Returns
    /// the opaque file id.
    pub async fn save(&self, bytes: Vec<u8>, filename: &str, content_type: &str) -> Result<String> {
        if bytes.is_empty() {
            bail!("file is empty");
        }

        let id = Uuid::new_v4().to_string();
        let sha256 = hex::encode(Sha256::digest(&bytes));
        let size = bytes.len() as i64;

        self.storage.write(&id, &bytes).await?;

        let db = self.db.clone();
        let row = FileRow {
            id: id.clone(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size,
            sha256,
        };
        tokio::task::spawn_blocking(move || db.insert_file(&row))
            .await
            .context("file metadata insert task failed")??;

        self.schedule_pending_delete(id.clone());
        Ok(id)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<DownloadedFile>> {
        if Uuid::parse_str(id).is_err() {
            return Ok(None);
        }

        let db = self.db.clone();
        let key = id.to_string();
        let row = tokio::task::spawn_blocking(move || db.get_file(&key))
            .await
            .context("file metadata lookup task failed")??;
        let Some(row) = row else {
            return Ok(None);
        };

        let Some(bytes) = self.storage.read(id).await? else {
            warn!("file {} has metadata but no blob", id);
            return Ok(None);
        };

        Ok(Some(DownloadedFile {
            bytes,
            content_type: row.content_type,
            filename: row.filename,
        }))
    }

    pub async fn exists(&self, id: &str) -> Result<bool> {
        if Uuid::parse_str(id).is_err() {
            return Ok(false);
        }

        let db = self.db.clone();
        let key = id.to_string();
        let row = tokio::task::spawn_blocking(move || db.get_file(&key))
            .await
            .context("file metadata lookup task failed")??;

        Ok(row.is_some() && self.storage.exists(id).await)
    }

    /// True when the stored content type names an image, falling back to the
    /// JPEG/PNG magic numbers when the declared type says otherwise.
    pub async fn is_image(&self, id: &str) -> Result<bool> {
        if Uuid::parse_str(id).is_err() {
            return Ok(false);
        }

        let db = self.db.clone();
        let key = id.to_string();
        let row = tokio::task::spawn_blocking(move || db.get_file(&key))
            .await
            .context("file metadata lookup task failed")??;
        let Some(row) = row else {
            return Ok(false);
        };

        if IMAGE_CONTENT_TYPES.contains(&row.content_type.as_str()) {
            return Ok(true);
        }

        match self.storage.read_prefix(id, PNG_MAGIC.len()).await? {
            Some(header) => Ok(is_image_header(&header)),
            None => Ok(false),
        }
    }

    /// Cancels the pending-delete countdown for `id`: the blob is now
    /// referenced by a durable record and must be retained. Idempotent —
    /// calling it twice, or for an id with no active countdown, is a no-op.
    pub fn mark_used(&self, id: &str) {
        self.cache.remove(&pending_key(id));

        if let Some(token) = self.cache.get::<CancellationToken>(&cancel_key(id)) {
            token.cancel();
            self.cache.remove(&cancel_key(id));
            info!("file {} marked used, pending delete cancelled", id);
        }
    }

    /// Pending-delete protocol: a liveness marker and the cancellation handle
    /// go into the cache with twice the countdown's TTL (backstop in case the
    /// handle is lost), and a detached task waits out the countdown. At fire
    /// time the marker is re-checked, so a `mark_used` that raced the timer
    /// wins and the blob survives.
    fn schedule_pending_delete(&self, id: String) {
        let marker_ttl = 2 * self.pending_ttl;
        self.cache.set(&pending_key(&id), id.clone(), marker_ttl);

        let token = CancellationToken::new();
        self.cache.set(&cancel_key(&id), token.clone(), marker_ttl);

        let store = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    // Marked used; keep the blob.
                }
                _ = tokio::time::sleep(store.pending_ttl) => {
                    if store.cache.get::<String>(&pending_key(&id)).is_none() {
                        return;
                    }
                    store.cache.remove(&pending_key(&id));
                    store.cache.remove(&cancel_key(&id));

                    if let Err(e) = store.purge(&id).await {
                        warn!("failed to purge expired pending file {}: {:#}", id, e);
                    } else {
                        info!("purged expired pending file {}", id);
                    }
                }
            }
        });
    }

    async fn purge(&self, id: &str) -> Result<()> {
        self.storage.delete(id).await?;

        let db = self.db.clone();
        let key = id.to_string();
        tokio::task::spawn_blocking(move || db.delete_file(&key))
            .await
            .context("file metadata delete task failed")??;
        Ok(())
    }
}

fn pending_key(id: &str) -> String {
    format!("pending_file_{id}")
}

fn cancel_key(id: &str) -> String {
    format!("pending_file_cancel_{id}")
}

fn is_image_header(header: &[u8]) -> bool {
    header.starts_with(&JPEG_MAGIC) || header.starts_with(&PNG_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(600);

    async fn store() -> FileStore {
        let dir = std::env::temp_dir().join(format!("gather-files-test-{}", Uuid::new_v4()));
        let db = Arc::new(Database::open_in_memory().unwrap());
        FileStore::new(dir, db, Arc::new(Cache::new()), TTL)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn save_and_download_round_trip() {
        let store = store().await;
        let id = store
            .save(b"blob bytes".to_vec(), "notes.txt", "text/plain")
            .await
            .unwrap();

        assert!(store.exists(&id).await.unwrap());
        let file = store.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(file.bytes, b"blob bytes");
        assert_eq!(file.content_type, "text/plain");
        assert_eq!(file.filename, "notes.txt");
    }

    #[tokio::test]
    async fn malformed_ids_are_absent_not_errors() {
        let store = store().await;
        assert!(store.get_by_id("../../etc/passwd").await.unwrap().is_none());
        assert!(!store.exists("not-a-uuid").await.unwrap());
        assert!(!store.is_image("not-a-uuid").await.unwrap());
        store.mark_used("not-a-uuid"); // no-op
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let store = store().await;
        assert!(store.save(vec![], "empty", "text/plain").await.is_err());
    }

    #[tokio::test]
    async fn image_detection_by_content_type_and_magic_number() {
        let store = store().await;

        let declared = store
            .save(b"not really".to_vec(), "a.png", "image/png")
            .await
            .unwrap();
        assert!(store.is_image(&declared).await.unwrap());

        let mut png = PNG_MAGIC.to_vec();
        png.extend_from_slice(b"rest of file");
        let sniffed = store
            .save(png, "b.bin", "application/octet-stream")
            .await
            .unwrap();
        assert!(store.is_image(&sniffed).await.unwrap());

        let mut jpeg = JPEG_MAGIC.to_vec();
        jpeg.extend_from_slice(&[0xE0, 0x00]);
        let sniffed_jpeg = store
            .save(jpeg, "c.bin", "application/octet-stream")
            .await
            .unwrap();
        assert!(store.is_image(&sniffed_jpeg).await.unwrap());

        let text = store
            .save(b"plain text".to_vec(), "d.txt", "text/plain")
            .await
            .unwrap();
        assert!(!store.is_image(&text).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn unreferenced_file_is_purged_after_the_countdown() {
        let store = store().await;
        let id = store
            .save(b"orphan".to_vec(), "o.bin", "application/octet-stream")
            .await
            .unwrap();
        assert!(store.exists(&id).await.unwrap());

        tokio::time::sleep(TTL + Duration::from_secs(1)).await;
        // The deletion task still has real IO to finish; poll until it lands.
        let mut purged = false;
        for _ in 0..200 {
            if !store.exists(&id).await.unwrap() {
                purged = true;
                break;
            }
            tokio::task::yield_now().await;
        }

        assert!(purged);
        assert!(store.get_by_id(&id).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn marked_used_file_survives_the_countdown() {
        let store = store().await;
        let id = store
            .save(b"keeper".to_vec(), "k.bin", "application/octet-stream")
            .await
            .unwrap();

        store.mark_used(&id);
        // Second call is a no-op, not an error.
        store.mark_used(&id);

        tokio::time::sleep(3 * TTL).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(store.exists(&id).await.unwrap());
        assert_eq!(store.get_by_id(&id).await.unwrap().unwrap().bytes, b"keeper");
    }

    #[tokio::test(start_paused = true)]
    async fn lost_cancellation_marker_still_blocks_deletion() {
        // Simulates the fire-time re-check: if the liveness marker is gone
        // (mark_used raced the timer, or the marker expired), the timer must
        // not delete the blob.
        let store = store().await;
        let id = store
            .save(b"raced".to_vec(), "r.bin", "application/octet-stream")
            .await
            .unwrap();

        // Drop only the marker, leaving the timer running with a live token.
        store.cache.remove(&pending_key(&id));

        tokio::time::sleep(TTL + Duration::from_secs(1)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(store.exists(&id).await.unwrap());
    }
}
