use chrono::NaiveDateTime;
use serde::Serialize;
use shaku::Interface;
use std::path::{Path, PathBuf};

/// Packs the data directory for transfer between machines.
pub trait Archiver: Interface {
    fn export(&self, dest_dir: &Path, stamp: NaiveDateTime) -> Result<ExportReport, ArchiveError>;

    fn import(&self, archive: &Path, overwrite: bool) -> Result<ImportReport, ArchiveError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub bytes: u64,
    pub files: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub files: usize,
    pub bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Nothing to export in {0}")]
    NothingToExport(PathBuf),
    #[error("Archive entry escapes the data directory: {0}")]
    UnsafeEntry(String),
    #[error("Refusing to overwrite existing file: {0}")]
    WouldOverwrite(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
