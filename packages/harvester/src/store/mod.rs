//! On-disk shard tree.
//!
//! Layout under the output root:
//!
//! ```text
//! versao.json                             release marker
//! {version}/{UF}/{NCM|NBS|LC116}/{code}.json
//! _cache/{version}/*.csv                  downloaded tables
//! ```
//!
//! Every shard write is a read-modify-write of the whole file without any
//! lock. Only one process may write a given tree at a time.

mod release;
mod shard;

pub use release::{read_local_version, release_path, write_release};
pub use shard::{
    compare_valid_from, load_shard, merge_record, render_shard, save_shard, shard_path, upsert,
    MergeOutcome,
};

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::error::Result;

/// Write `content` next to `path`, sync it and rename it into place.
///
/// Readers never observe a half-written file; parent directories are created.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_file = dir.join(format!(".{file_name}.tmp"));

    {
        let mut file = File::create(&temp_file)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }

    // On Windows, rename fails if the destination already exists
    #[cfg(target_os = "windows")]
    if path.exists() {
        fs::remove_file(path)?;
    }

    fs::rename(&temp_file, path)?;
    Ok(())
}
