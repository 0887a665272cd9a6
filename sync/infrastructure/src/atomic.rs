use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes into a sibling `.tmp` file and renames it over `path`. Readers see
/// either the previous file or the complete new one.
pub(crate) fn write_with<F, E>(path: &Path, write: F) -> Result<(), E>
where
    F: FnOnce(File) -> Result<(), E>,
    E: From<io::Error>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let file = File::create(&tmp)?;
    if let Err(e) = write(file) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn write_bytes(path: &Path, bytes: &[u8]) -> io::Result<()> {
    write_with(path, |mut file: File| {
        file.write_all(bytes)?;
        file.sync_all()
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_write_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        write_bytes(&path, b"first").unwrap();
        let result: io::Result<()> = write_with(&path, |_file| {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        });

        assert!(result.is_err());
        assert_eq!(fs::read(&path).unwrap(), b"first");
        assert!(!temp_path(&path).exists());
    }
}
