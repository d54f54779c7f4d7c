//! Release marker (`versao.json`) at the root of the shard tree.

use std::fs;
use std::path::{Path, PathBuf};

use super::write_atomic;
use crate::config::RELEASE_FILE;
use crate::error::Result;
use crate::types::ReleaseMetadata;

/// Path of the release marker under `out_root`.
pub fn release_path(out_root: &Path) -> PathBuf {
    out_root.join(RELEASE_FILE)
}

/// Overwrite the release marker.
pub fn write_release(out_root: &Path, metadata: &ReleaseMetadata) -> Result<()> {
    let content = serde_json::to_string_pretty(metadata)?;
    write_atomic(&release_path(out_root), &content)
}

/// Version recorded in the release marker, if any.
///
/// A missing, unreadable or malformed marker reads as "no local release".
pub fn read_local_version(out_root: &Path) -> Option<String> {
    let content = fs::read_to_string(release_path(out_root)).ok()?;
    let value: serde_json::Value = serde_json::from_str(content.trim_start_matches('\u{feff}')).ok()?;
    value.get("VERSAO")?.as_str().map(String::from)
}
