use std::path::PathBuf;
use std::sync::Arc;

use blob_store::{BlobError, BlobStore, ByteStream};
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::result::Result;
use crate::service::recordings::{MetadataStore, Recording};

/// Keeps blobs and recording rows in step.
///
/// Create writes the blob first and only then the row; when the row cannot be
/// written the blob is removed again, so a failed upload leaves no orphan file.
/// Delete removes the blob best-effort and the row unconditionally: a disk leak
/// is tolerated, a row pointing at nothing is not. If the row delete itself
/// fails after the blob is gone, the row survives and later reads return 404.
pub struct RecordingCoordinator {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
}

impl RecordingCoordinator {
    pub fn new(blobs: Arc<dyn BlobStore>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self { blobs, metadata }
    }

    pub async fn create(&self, upload: Option<ByteStream<'_>>) -> Result<Recording> {
        let stream = upload.ok_or_else(|| AppError::bad_request("No file uploaded"))?;

        let blob = self.blobs.store(stream).await.map_err(|e| match e {
            BlobError::Source(err) => AppError::Upload(err),
            BlobError::NotFound(path) => AppError::Io(anyhow::anyhow!("blob vanished: {path}")),
            BlobError::Io(err) => AppError::Io(err),
        })?;

        let filesize = match i64::try_from(blob.size) {
            Ok(size) => size,
            Err(e) => {
                self.compensate(&blob.path).await;
                return Err(AppError::Io(e.into()));
            }
        };

        match self.metadata.insert(&blob.name, &blob.path, filesize).await {
            Ok(recording) => {
                info!(
                    "Recording {} uploaded: {} ({} bytes)",
                    recording.id, recording.filename, recording.filesize
                );
                Ok(recording)
            }
            Err(e) => {
                warn!("Insert recording for blob {} failed: {}", blob.path, e);
                self.compensate(&blob.path).await;
                Err(AppError::Storage(e))
            }
        }
    }

    pub async fn list(&self) -> Result<Vec<Recording>> {
        let recordings = self.metadata.list_all().await.map_err(AppError::Storage)?;
        debug!("Listed {} recordings", recordings.len());
        Ok(recordings)
    }

    /// The row and the file it points at. A row whose blob is missing is
    /// reported as not found and left in place.
    pub async fn open(&self, id: i64) -> Result<(Recording, PathBuf)> {
        let recording = self.find(id, "Not found").await?;
        match self.blobs.resolve(&recording.filepath).await {
            Ok(file) => Ok((recording, file)),
            Err(BlobError::NotFound(path)) => {
                warn!("Recording {} references missing blob {}", id, path);
                Err(AppError::not_found("Not found"))
            }
            Err(e) => Err(AppError::Io(e.into())),
        }
    }

    pub async fn delete(&self, id: i64) -> Result<i64> {
        let recording = self.find(id, "Recording not found").await?;

        if let Err(e) = self.blobs.delete(&recording.filepath).await {
            warn!("Error deleting file for recording {}: {}", id, e);
        }

        // A concurrent delete may have won between lookup and here
        match self.metadata.delete_by_id(id).await {
            Ok(true) => {
                info!("Recording {} deleted", id);
                Ok(id)
            }
            Ok(false) => Err(AppError::not_found("Recording not found")),
            Err(e) => {
                error!(
                    "Recording {} row kept after its blob {} was removed: {}",
                    id, recording.filepath, e
                );
                Err(AppError::Storage(e))
            }
        }
    }

    async fn find(&self, id: i64, missing: &str) -> Result<Recording> {
        self.metadata
            .get_by_id(id)
            .await
            .map_err(AppError::Storage)?
            .ok_or_else(|| AppError::not_found(missing))
    }

    async fn compensate(&self, path: &str) {
        match self.blobs.delete(path).await {
            Ok(_) => info!("Removed orphan blob {}", path),
            Err(e) => error!("Orphan blob {} could not be removed: {}", path, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use blob_store::{BlobConfig, FsBlobStore};
    use bytes::Bytes;
    use futures_util::StreamExt;
    use tempfile::TempDir;

    use crate::service::database::DatabaseService;
    use crate::service::recordings::RecordingsService;

    /// Delegates to a real store but can be told to fail inserts or deletes
    struct Flaky {
        inner: RecordingsService,
        fail_insert: bool,
        fail_delete: bool,
    }

    #[async_trait]
    impl MetadataStore for Flaky {
        async fn insert(
            &self,
            filename: &str,
            filepath: &str,
            filesize: i64,
        ) -> anyhow::Result<Recording> {
            if self.fail_insert {
                return Err(anyhow::anyhow!("disk I/O error"));
            }
            self.inner.insert(filename, filepath, filesize).await
        }

        async fn list_all(&self) -> anyhow::Result<Vec<Recording>> {
            self.inner.list_all().await
        }

        async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<Recording>> {
            self.inner.get_by_id(id).await
        }

        async fn delete_by_id(&self, id: i64) -> anyhow::Result<bool> {
            if self.fail_delete {
                return Err(anyhow::anyhow!("database is locked"));
            }
            self.inner.delete_by_id(id).await
        }
    }

    struct Fixture {
        _dir: TempDir,
        blobs: Arc<FsBlobStore>,
        rows: RecordingsService,
    }

    impl Fixture {
        async fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config = BlobConfig {
                root: dir.path().join("uploads").to_string_lossy().into_owned(),
                ..Default::default()
            };
            let blobs = Arc::new(FsBlobStore::new(&config).await.unwrap());
            let database = DatabaseService::in_memory().await.unwrap();
            Self {
                _dir: dir,
                blobs,
                rows: RecordingsService::new(database.connection),
            }
        }

        fn coordinator(&self) -> RecordingCoordinator {
            self.coordinator_with(false, false)
        }

        fn coordinator_with(&self, fail_insert: bool, fail_delete: bool) -> RecordingCoordinator {
            RecordingCoordinator::new(
                self.blobs.clone(),
                Arc::new(Flaky {
                    inner: self.rows.clone(),
                    fail_insert,
                    fail_delete,
                }),
            )
        }

        fn blob_count(&self) -> usize {
            std::fs::read_dir(self.blobs.root()).unwrap().count()
        }
    }

    fn upload(data: &'static [u8]) -> Option<ByteStream<'static>> {
        Some(futures_util::stream::iter(vec![Ok(Bytes::from_static(data))]).boxed())
    }

    #[tokio::test]
    async fn test_create_without_file() {
        let fx = Fixture::new().await;
        let err = fx.coordinator().create(None).await.unwrap_err();

        assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "No file uploaded"));
        assert_eq!(fx.blob_count(), 0);
        assert!(fx.rows.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let fx = Fixture::new().await;
        let coordinator = fx.coordinator();

        let recording = coordinator.create(upload(b"0123456789")).await.unwrap();
        assert_eq!(recording.filesize, 10);
        assert!(recording.filepath.ends_with(&recording.filename));

        let listed = coordinator.list().await.unwrap();
        assert_eq!(listed, vec![recording.clone()]);

        let (row, file) = coordinator.open(recording.id).await.unwrap();
        assert_eq!(row, recording);
        assert_eq!(std::fs::read(file).unwrap(), b"0123456789");
    }

    #[tokio::test]
    async fn test_failed_insert_removes_blob() {
        let fx = Fixture::new().await;

        let err = fx
            .coordinator_with(true, false)
            .create(upload(b"0123456789"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(err.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(fx.blob_count(), 0);
        assert!(fx.rows.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_blob_root() {
        let fx = Fixture::new().await;
        let root = fx.blobs.root().to_path_buf();
        std::fs::remove_dir_all(&root).unwrap();
        std::fs::write(&root, b"not a directory").unwrap();

        let err = fx
            .coordinator()
            .create(upload(b"0123456789"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Io(_)));
        assert_eq!(err.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(fx.rows.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_broken_upload_stream() {
        let fx = Fixture::new().await;
        let stream = futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"01234")),
            Err(anyhow::anyhow!("connection reset")),
        ])
        .boxed();

        let err = fx.coordinator().create(Some(stream)).await.unwrap_err();

        assert!(matches!(err, AppError::Upload(_)));
        assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
        assert_eq!(fx.blob_count(), 0);
        assert!(fx.rows.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let fx = Fixture::new().await;
        let coordinator = fx.coordinator();
        let recording = coordinator.create(upload(b"abc")).await.unwrap();

        assert_eq!(coordinator.delete(recording.id).await.unwrap(), recording.id);
        assert!(fx
            .blobs
            .resolve(&recording.filepath)
            .await
            .unwrap_err()
            .is_not_found());

        let err = coordinator.delete(recording.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(matches!(
            coordinator.open(recording.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_deletes() {
        let fx = Fixture::new().await;
        let coordinator = fx.coordinator();
        let recording = coordinator.create(upload(b"abc")).await.unwrap();

        let (a, b) = tokio::join!(
            coordinator.delete(recording.id),
            coordinator.delete(recording.id)
        );
        let results = [a, b];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(AppError::NotFound(_))))
                .count(),
            1
        );
        assert_eq!(fx.blob_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_with_missing_blob_still_removes_row() {
        let fx = Fixture::new().await;
        let coordinator = fx.coordinator();
        let recording = coordinator.create(upload(b"abc")).await.unwrap();
        fx.blobs.delete(&recording.filepath).await.unwrap();

        assert_eq!(coordinator.delete(recording.id).await.unwrap(), recording.id);
        assert_eq!(fx.rows.get_by_id(recording.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_open_with_missing_blob_keeps_row() {
        let fx = Fixture::new().await;
        let coordinator = fx.coordinator();
        let recording = coordinator.create(upload(b"abc")).await.unwrap();
        std::fs::remove_file(fx.blobs.resolve(&recording.filepath).await.unwrap()).unwrap();

        let err = coordinator.open(recording.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(
            fx.rows.get_by_id(recording.id).await.unwrap(),
            Some(recording)
        );
    }

    #[tokio::test]
    async fn test_failed_row_delete_leaves_row_without_blob() {
        let fx = Fixture::new().await;
        let recording = fx.coordinator().create(upload(b"abc")).await.unwrap();

        let err = fx
            .coordinator_with(false, true)
            .delete(recording.id)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(fx.blob_count(), 0);
        assert!(fx.rows.get_by_id(recording.id).await.unwrap().is_some());
        assert!(matches!(
            fx.coordinator().open(recording.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let fx = Fixture::new().await;
        let coordinator = fx.coordinator();

        assert!(matches!(
            coordinator.open(42).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            coordinator.delete(42).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
