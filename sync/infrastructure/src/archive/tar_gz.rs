use chrono::NaiveDateTime;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use shaku::Component;
use std::fs::{self, File};
use std::path::{Component as PathComponent, Path, PathBuf};
use sync_application::{ArchiveError, Archiver, ExportReport, ImportReport};
use tar::{Archive, Builder, EntryType};
use tracing::info;

use crate::atomic;
use crate::repositories::parquet::{DAILY_DIR, INDICATORS_DIR, STOCKS_DIR, STOCK_BASIC_FILE};
use crate::state::metadata::METADATA_FILE;

const ARCHIVE_PREFIX: &str = "ts_share_data_";

/// Packs the partitions and JSON sidecars of a data directory into a
/// `.tar.gz` and restores them elsewhere. Checkpoint and lock files stay
/// behind since they only mean something on the machine that wrote them.
#[derive(Component)]
#[shaku(interface = Archiver)]
pub struct TarGzArchiver {
    data_dir: PathBuf,
}

impl TarGzArchiver {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn archive_name(stamp: NaiveDateTime) -> String {
        format!("{}{}.tar.gz", ARCHIVE_PREFIX, stamp.format("%Y%m%d_%H%M%S"))
    }

    /// Relative paths of every file that belongs in an export, sorted.
    fn collect_files(&self) -> Result<Vec<PathBuf>, ArchiveError> {
        let mut files = Vec::new();

        for dir in [STOCKS_DIR, DAILY_DIR, INDICATORS_DIR] {
            let abs = self.data_dir.join(dir);
            if !abs.is_dir() {
                continue;
            }
            let mut names = Vec::new();
            for entry in fs::read_dir(&abs)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    names.push(Path::new(dir).join(entry.file_name()));
                }
            }
            names.sort();
            files.extend(names);
        }

        for name in [METADATA_FILE, STOCK_BASIC_FILE] {
            if self.data_dir.join(name).is_file() {
                files.push(PathBuf::from(name));
            }
        }

        Ok(files)
    }

    fn check_entry(&self, path: &Path, kind: EntryType, overwrite: bool) -> Result<(), ArchiveError> {
        let unsafe_entry = || ArchiveError::UnsafeEntry(path.display().to_string());

        if !(kind.is_file() || kind.is_dir()) {
            return Err(unsafe_entry());
        }
        for component in path.components() {
            match component {
                PathComponent::Normal(_) | PathComponent::CurDir => {}
                PathComponent::ParentDir | PathComponent::RootDir | PathComponent::Prefix(_) => {
                    return Err(unsafe_entry());
                }
            }
        }

        let target = self.data_dir.join(path);
        if kind.is_file() && !overwrite && target.exists() {
            return Err(ArchiveError::WouldOverwrite(target));
        }
        Ok(())
    }
}

impl Archiver for TarGzArchiver {
    fn export(&self, dest_dir: &Path, stamp: NaiveDateTime) -> Result<ExportReport, ArchiveError> {
        let files = self.collect_files()?;
        if files.is_empty() {
            return Err(ArchiveError::NothingToExport(self.data_dir.clone()));
        }

        let path = dest_dir.join(Self::archive_name(stamp));
        atomic::write_with(&path, |file: File| -> Result<(), ArchiveError> {
            let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
            for relative in &files {
                builder.append_path_with_name(self.data_dir.join(relative), relative)?;
            }
            let encoder = builder.into_inner()?;
            encoder.finish()?.sync_all()?;
            Ok(())
        })?;

        let bytes = fs::metadata(&path)?.len();
        info!(
            "Exported {} files from {} to {} ({} bytes)",
            files.len(),
            self.data_dir.display(),
            path.display(),
            bytes
        );

        Ok(ExportReport {
            path,
            bytes,
            files: files.len(),
        })
    }

    fn import(&self, archive: &Path, overwrite: bool) -> Result<ImportReport, ArchiveError> {
        let open = || -> Result<Archive<GzDecoder<File>>, ArchiveError> {
            Ok(Archive::new(GzDecoder::new(File::open(archive)?)))
        };

        // Validate everything before writing anything.
        let mut validation = open()?;
        for entry in validation.entries()? {
            let entry = entry?;
            let path = entry.path()?.into_owned();
            self.check_entry(&path, entry.header().entry_type(), overwrite)?;
        }

        fs::create_dir_all(&self.data_dir)?;
        let mut report = ImportReport { files: 0, bytes: 0 };
        let mut extraction = open()?;
        for entry in extraction.entries()? {
            let mut entry = entry?;
            if entry.header().entry_type().is_file() {
                report.files += 1;
                report.bytes += entry.header().size()?;
            }
            entry.unpack_in(&self.data_dir)?;
        }

        info!(
            "Imported {} files ({} bytes) from {} into {}",
            report.files,
            report.bytes,
            archive.display(),
            self.data_dir.display()
        );
        Ok(report)
    }
}
