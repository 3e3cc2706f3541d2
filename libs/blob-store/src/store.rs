use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use opendal::{services, ErrorKind, Operator};
use tracing::{debug, info, warn};

use crate::config::BlobConfig;
use crate::name::{generate_name_now, validate_key};

/// Chunks of an upload body as they arrive from the client
pub type ByteStream<'a> = BoxStream<'a, anyhow::Result<Bytes>>;

#[derive(Debug)]
pub enum BlobError {
    /// The blob does not exist, or the path does not point into the store
    NotFound(String),
    /// The byte source failed before the blob was complete
    Source(anyhow::Error),
    /// The store itself failed to write, read or remove
    Io(anyhow::Error),
}

impl BlobError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobError::NotFound(_))
    }

    fn from_opendal(path: &str, err: opendal::Error) -> Self {
        if err.kind() == ErrorKind::NotFound {
            BlobError::NotFound(path.to_string())
        } else {
            BlobError::Io(err.into())
        }
    }
}

impl fmt::Display for BlobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobError::NotFound(path) => write!(f, "blob not found: {path}"),
            BlobError::Source(err) => write!(f, "upload stream failed: {err}"),
            BlobError::Io(err) => write!(f, "blob io error: {err}"),
        }
    }
}

impl std::error::Error for BlobError {}

/// A blob that has been completely written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub name: String,
    pub path: String,
    pub size: u64,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write the whole stream under a freshly generated name.
    /// Nothing is left on disk when this returns an error.
    async fn store(&self, stream: ByteStream<'_>) -> Result<StoredBlob, BlobError>;
    async fn delete(&self, path: &str) -> Result<(), BlobError>;
    /// Absolute path of an existing blob, for streaming it back
    async fn resolve(&self, path: &str) -> Result<PathBuf, BlobError>;
}

/// Blob store over a local content directory
pub struct FsBlobStore {
    root: PathBuf,
    absolute_root: PathBuf,
    extension: String,
    operator: Operator,
}

impl FsBlobStore {
    pub async fn new(config: &BlobConfig) -> anyhow::Result<Self> {
        let root = PathBuf::from(&config.root);
        std::fs::create_dir_all(&root)?;
        let absolute_root = std::fs::canonicalize(&root)?;

        info!(
            "Configuring blob storage with root: {}",
            absolute_root.display()
        );
        let builder = services::Fs::default().root(&absolute_root.to_string_lossy());
        let operator = Operator::new(builder)?.finish();

        match operator.check().await {
            Ok(_) => debug!("Blob storage check successful"),
            Err(e) => warn!(
                "Blob storage initialized but check failed: {}, continuing anyway",
                e
            ),
        }

        Ok(Self {
            root,
            absolute_root,
            extension: config.extension.clone(),
            operator,
        })
    }

    pub fn root(&self) -> &Path {
        &self.absolute_root
    }

    /// Map a stored filepath back to the key inside the content directory
    fn key(&self, path: &str) -> Result<String, BlobError> {
        let path = Path::new(path);
        let key = path
            .strip_prefix(&self.root)
            .or_else(|_| path.strip_prefix(&self.absolute_root))
            .map_err(|_| BlobError::NotFound(path.display().to_string()))?
            .to_string_lossy()
            .into_owned();

        if validate_key(&key) {
            Ok(key)
        } else {
            Err(BlobError::NotFound(path.display().to_string()))
        }
    }

    async fn discard(&self, key: &str) {
        match self.operator.delete(key).await {
            Ok(_) => debug!("Discarded partial blob: {}", key),
            Err(e) => warn!("Failed to discard partial blob '{}': {}", key, e),
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, mut stream: ByteStream<'_>) -> Result<StoredBlob, BlobError> {
        let name = generate_name_now(&self.extension);
        let mut writer = self
            .operator
            .writer(&name)
            .await
            .map_err(|e| BlobError::Io(e.into()))?;

        let mut size: u64 = 0;
        let failure = loop {
            match stream.next().await {
                Some(Ok(chunk)) => {
                    size += chunk.len() as u64;
                    if let Err(e) = writer.write(chunk).await {
                        break Some(BlobError::Io(e.into()));
                    }
                }
                Some(Err(e)) => break Some(BlobError::Source(e)),
                None => break writer.close().await.err().map(|e| BlobError::Io(e.into())),
            }
        };

        if let Some(err) = failure {
            warn!("Blob write '{}' failed after {} bytes: {}", name, size, err);
            if let Err(e) = writer.abort().await {
                debug!("Abort blob writer '{}': {}", name, e);
            }
            self.discard(&name).await;
            return Err(err);
        }

        let path = self.root.join(&name).to_string_lossy().into_owned();
        info!("Stored blob {} ({} bytes)", path, size);
        Ok(StoredBlob { name, path, size })
    }

    async fn delete(&self, path: &str) -> Result<(), BlobError> {
        let key = self.key(path)?;
        // opendal treats deleting a missing file as success
        self.operator
            .stat(&key)
            .await
            .map_err(|e| BlobError::from_opendal(path, e))?;
        self.operator
            .delete(&key)
            .await
            .map_err(|e| BlobError::from_opendal(path, e))?;
        info!("Deleted blob {}", path);
        Ok(())
    }

    async fn resolve(&self, path: &str) -> Result<PathBuf, BlobError> {
        let key = self.key(path)?;
        self.operator
            .stat(&key)
            .await
            .map_err(|e| BlobError::from_opendal(path, e))?;
        Ok(self.absolute_root.join(key))
    }
}
