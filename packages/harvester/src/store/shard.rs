//! Per-code shard files and the "latest start date wins" merge rule.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::write_atomic;
use crate::error::Result;
use crate::types::{RateRecord, Taxonomy};

/// What [`merge_record`] did with the incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No record with the same fiscal exception existed; appended.
    Inserted,
    /// Incoming record started later and replaced the stored one.
    Replaced,
    /// Stored record started at the same time or later; kept as is.
    Kept,
}

/// Path of the shard holding `code`.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use ibptax_harvester::store::shard_path;
/// use ibptax_harvester::types::Taxonomy;
///
/// let path = shard_path(Path::new("out"), "25.2.E", "SP", Taxonomy::Ncm, "85171231");
/// assert_eq!(path, Path::new("out/25.2.E/SP/NCM/85171231.json"));
/// ```
pub fn shard_path(
    out_root: &Path,
    version: &str,
    jurisdiction: &str,
    taxonomy: Taxonomy,
    code: &str,
) -> PathBuf {
    out_root
        .join(version)
        .join(jurisdiction)
        .join(taxonomy.as_str())
        .join(format!("{code}.json"))
}

/// Load the records stored in a shard.
///
/// A missing file, or content that is neither a JSON object nor an array,
/// yields an empty list. Unreadable or malformed JSON is logged and also
/// yields an empty list, so the shard is rebuilt on the next write.
pub fn load_shard(path: &Path) -> Vec<RateRecord> {
    if !path.exists() {
        return Vec::new();
    }
    match read_shard(path) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read shard, rebuilding it"
            );
            Vec::new()
        }
    }
}

fn read_shard(path: &Path) -> Result<Vec<RateRecord>> {
    let content = fs::read_to_string(path)?;
    let content = content.trim_start_matches('\u{feff}').trim();

    if content.starts_with('[') {
        Ok(serde_json::from_str(content)?)
    } else if content.starts_with('{') {
        Ok(vec![serde_json::from_str(content)?])
    } else {
        Ok(Vec::new())
    }
}

/// Order two `DT_INICIO_VIG` values.
///
/// Two valid ISO dates compare chronologically. Otherwise a present value
/// beats an absent one, and everything else ties.
pub fn compare_valid_from(a: &str, b: &str) -> Ordering {
    let parse = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
    match (parse(a), parse(b)) {
        (Some(da), Some(db)) => da.cmp(&db),
        _ => match (a.is_empty(), b.is_empty()) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            _ => Ordering::Equal,
        },
    }
}

/// Merge `incoming` into the records of one shard.
///
/// At most one record is kept per normalized fiscal exception. A stored
/// record is only replaced by one with a strictly later start date; ties
/// keep the stored record.
pub fn merge_record(records: &mut Vec<RateRecord>, incoming: RateRecord) -> MergeOutcome {
    let key = incoming.exception_key();
    match records.iter().position(|r| r.exception_key() == key) {
        Some(i) => {
            if compare_valid_from(&incoming.valid_from, &records[i].valid_from)
                == Ordering::Greater
            {
                records[i] = incoming;
                MergeOutcome::Replaced
            } else {
                MergeOutcome::Kept
            }
        }
        None => {
            records.push(incoming);
            MergeOutcome::Inserted
        }
    }
}

/// Render shard content: a single object for one record, an array otherwise.
pub fn render_shard(records: &[RateRecord]) -> Result<String> {
    let json = match records {
        [single] => serde_json::to_string_pretty(single)?,
        _ => serde_json::to_string_pretty(records)?,
    };
    Ok(json)
}

/// Write a shard, replacing any previous content.
pub fn save_shard(path: &Path, records: &[RateRecord]) -> Result<()> {
    let content = render_shard(records)?;
    write_atomic(path, &content)
}

/// Merge one record into its shard on disk.
///
/// The shard is always rewritten, which also repairs a previously corrupt
/// file. Not safe against a concurrent writer on the same tree.
pub fn upsert(
    out_root: &Path,
    version: &str,
    jurisdiction: &str,
    taxonomy: Taxonomy,
    record: RateRecord,
) -> Result<MergeOutcome> {
    let path = shard_path(out_root, version, jurisdiction, taxonomy, &record.code);
    let mut records = load_shard(&path);
    let outcome = merge_record(&mut records, record);
    save_shard(&path, &records)?;
    Ok(outcome)
}
