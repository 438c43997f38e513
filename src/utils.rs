//! Utility functions for file handling and common operations

use crate::{TrioError, TrioResult};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Index suffixes htslib accepts for bgzipped text files
const INDEX_SUFFIXES: [&str; 2] = ["tbi", "csi"];

/// Validate file paths and check if they exist
pub fn validate_file_exists<P: AsRef<Path>>(path: P) -> TrioResult<()> {
    if !path.as_ref().is_file() {
        return Err(TrioError::FileNotFound(
            path.as_ref().to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

/// Validate that a file is readable
pub fn validate_file_readable<P: AsRef<Path>>(path: P) -> TrioResult<()> {
    validate_file_exists(&path)?;

    File::open(&path)
        .map_err(|_| TrioError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    Ok(())
}

/// Tabix/CSI index next to `path` (`data.vcf.gz.tbi`), if one exists
pub fn find_tabix_index<P: AsRef<Path>>(path: P) -> Option<PathBuf> {
    let path = path.as_ref();
    INDEX_SUFFIXES.iter().find_map(|suffix| {
        let mut index = path.as_os_str().to_os_string();
        index.push(".");
        index.push(suffix);
        let index = PathBuf::from(index);
        index.is_file().then_some(index)
    })
}

/// The invocation as typed, for report preambles
pub fn command_line() -> String {
    std::env::args().collect::<Vec<_>>().join(" ")
}

/// Timer utility for measuring execution time
pub struct Timer {
    start: std::time::Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::info!("Starting timer: {}", name);
        Timer {
            start: std::time::Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    pub fn log_elapsed(&self) {
        let duration = self.elapsed();
        log::info!("Timer '{}' elapsed: {:.2?}", self.name, duration);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.log_elapsed();
    }
}
