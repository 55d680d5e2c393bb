//! On-disk cache of downloaded chunks.
//!
//! A chunk is cached when its file exists and is non-empty. Downloads write
//! to `<name>.partial` and are renamed into place, so an interrupted run
//! never leaves a file that looks complete.

use std::path::{Path, PathBuf};

use era5_common::DateRange;

use crate::request::cache_file_name;

#[derive(Debug, Clone)]
pub struct CacheDir {
    dir: PathBuf,
    prefix: String,
}

impl CacheDir {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final path for a chunk.
    pub fn path_for(&self, range: &DateRange) -> PathBuf {
        self.dir.join(cache_file_name(&self.prefix, range))
    }

    /// Temporary path a chunk is streamed to.
    pub fn partial_path_for(&self, range: &DateRange) -> PathBuf {
        let mut name = cache_file_name(&self.prefix, range);
        name.push_str(".partial");
        self.dir.join(name)
    }

    /// The cached file for a chunk, if a complete one exists.
    pub async fn lookup(&self, range: &DateRange) -> Option<PathBuf> {
        let path = self.path_for(range);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Some(path),
            _ => None,
        }
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }
}
