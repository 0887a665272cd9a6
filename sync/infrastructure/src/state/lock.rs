use chrono::Utc;
use fs4::fs_std::FileExt;
use shaku::Component;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use sync_application::{LockError, LockInfo, SyncLease, SyncLock};
use tracing::{debug, warn};

pub const LOCK_FILE: &str = ".sync.lock";

/// Advisory `flock` on `<data_dir>/.sync.lock`. While held, the file body
/// records the owner so a second process can say who is running.
#[derive(Component)]
#[shaku(interface = SyncLock)]
pub struct FileSyncLock {
    data_dir: PathBuf,
}

impl FileSyncLock {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn path(&self) -> PathBuf {
        self.data_dir.join(LOCK_FILE)
    }

    fn open(&self) -> std::io::Result<File> {
        fs::create_dir_all(&self.data_dir)?;
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.path())
    }

    fn read_info(file: &mut File) -> Option<LockInfo> {
        let mut raw = String::new();
        file.seek(SeekFrom::Start(0)).ok()?;
        file.read_to_string(&mut raw).ok()?;
        serde_json::from_str(&raw).ok()
    }
}

impl SyncLock for FileSyncLock {
    fn try_acquire(&self) -> Result<SyncLease, LockError> {
        let mut file = self.open()?;
        if !FileExt::try_lock_exclusive(&file)? {
            return Err(LockError::AlreadyHeld(Self::read_info(&mut file)));
        }

        let info = LockInfo {
            pid: std::process::id(),
            start_time: Utc::now(),
        };
        let body = serde_json::to_vec(&info)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&body)?;
        file.sync_all()?;

        debug!("Acquired sync lock {}", self.path().display());
        Ok(SyncLease::new(LockGuard {
            file,
            path: self.path(),
        }))
    }

    fn holder(&self) -> Result<Option<LockInfo>, LockError> {
        let mut file = match File::open(self.path()) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if FileExt::try_lock_shared(&file)? {
            // Left behind by a process that exited without cleanup.
            FileExt::unlock(&file)?;
            return Ok(None);
        }

        Ok(Self::read_info(&mut file))
    }
}

struct LockGuard {
    file: File,
    path: PathBuf,
}

/// The file stays in place so every process locks the same inode; only the
/// owner record is erased.
impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.file.set_len(0) {
            warn!("Failed to clear lock file {}: {}", self.path.display(), e);
        }
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release sync lock: {}", e);
        }
        debug!("Released sync lock {}", self.path.display());
    }
}
