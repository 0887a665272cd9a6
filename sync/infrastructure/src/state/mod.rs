pub mod checkpoint;
pub mod lock;
pub mod metadata;

pub use checkpoint::{JsonProgressStore, JsonProgressStoreParameters};
pub use lock::{FileSyncLock, FileSyncLockParameters};
pub use metadata::{JsonMetadataStore, JsonMetadataStoreParameters};
