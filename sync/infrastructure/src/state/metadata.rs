use async_trait::async_trait;
use shaku::Component;
use std::io::ErrorKind;
use std::path::PathBuf;
use sync_application::{MetadataError, MetadataStore, SyncMetadata};

use crate::atomic;

pub const METADATA_FILE: &str = "metadata.json";

#[derive(Component)]
#[shaku(interface = MetadataStore)]
pub struct JsonMetadataStore {
    data_dir: PathBuf,
}

impl JsonMetadataStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn path(&self) -> PathBuf {
        self.data_dir.join(METADATA_FILE)
    }
}

#[async_trait]
impl MetadataStore for JsonMetadataStore {
    async fn load(&self) -> Result<SyncMetadata, MetadataError> {
        let raw = match tokio::fs::read(self.path()).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SyncMetadata::default()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&raw).map_err(|e| MetadataError::Corrupt(e.to_string()))
    }

    async fn save(&self, metadata: &SyncMetadata) -> Result<(), MetadataError> {
        let bytes = serde_json::to_vec_pretty(metadata)
            .map_err(|e| MetadataError::Corrupt(e.to_string()))?;
        atomic::write_bytes(&self.path(), &bytes)?;
        Ok(())
    }
}
