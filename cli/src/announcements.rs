//! File-backed announcement feed
//!
//! The file holds a JSON array of announcements in sequence order. `veil send
//! --publish` appends to it and `veil scan` reads it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use veil_core::monitor::{AnnouncementSource, MemoryAnnouncementSource};
use veil_core::{Announcement, VeilError};

/// All announcements in `path`; a missing file is an empty feed
pub fn read_announcements(path: &Path) -> Result<Vec<Announcement>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read announcements file {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse announcements file {}", path.display()))
}

/// Append `announcement`, assigning the next sequence number
pub fn publish(path: &Path, announcement: Announcement) -> Result<u64> {
    let feed = MemoryAnnouncementSource::from_announcements(read_announcements(path)?);
    let sequence = feed.publish(announcement);

    let json = serde_json::to_string_pretty(&feed.snapshot())?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write announcements file {}", path.display()))?;
    Ok(sequence)
}

/// Re-reads the file on every poll so a running `scan --watch` sees appends
pub struct FileAnnouncementSource {
    path: PathBuf,
}

impl FileAnnouncementSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl AnnouncementSource for FileAnnouncementSource {
    async fn announcements_since(&self, cursor: u64) -> veil_core::Result<Vec<Announcement>> {
        let announcements =
            read_announcements(&self.path).map_err(|e| VeilError::Source(format!("{e:#}")))?;
        Ok(announcements
            .into_iter()
            .filter(|a| a.sequence >= cursor)
            .collect())
    }
}
