use std::path::PathBuf;

use anyhow::Result;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{info, warn};

/// On-disk blob storage. Each blob lives as a single flat file at
/// `{dir}/{file_id}`; ids are UUIDs minted by the gateway, so names are never
/// attacker-controlled.
pub struct BlobStorage {
    dir: PathBuf,
}

impl BlobStorage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Blob storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    fn path(&self, file_id: &str) -> PathBuf {
        self.dir.join(file_id)
    }

    pub async fn write(&self, file_id: &str, data: &[u8]) -> Result<()> {
        let path = self.path(file_id);
        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    pub async fn read(&self, file_id: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path(file_id)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// First `len` bytes of the blob (fewer if it is shorter), for content
    /// sniffing without pulling the whole file in.
    pub async fn read_prefix(&self, file_id: &str, len: usize) -> Result<Option<Vec<u8>>> {
        let mut file = match fs::File::open(self.path(file_id)).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(Some(buf))
    }

    pub async fn exists(&self, file_id: &str) -> bool {
        fs::metadata(self.path(file_id)).await.is_ok()
    }

    /// Tolerant delete: a blob that is already gone is not an error.
    pub async fn delete(&self, file_id: &str) -> Result<()> {
        match fs::remove_file(self.path(file_id)).await {
            Ok(()) => {
                info!("Deleted blob {}", file_id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Blob {} already gone", file_id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
