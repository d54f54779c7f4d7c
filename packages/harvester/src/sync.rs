//! Remote release discovery and download.
//!
//! The remote side is a directory listing (GitHub contents API shape):
//! a JSON array of entries carrying at least `name` and `download_url`.
//! Table files are grouped by the release version encoded in their names,
//! and the newest group is downloaded when it is newer than the release
//! recorded locally.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::config::{is_table_file, match_table_name, CACHE_DIR};
use crate::error::{HarvesterError, Result};
use crate::http::download_bytes;
use crate::store::read_local_version;
use crate::version;

/// One entry of the remote listing.
#[derive(Debug, Deserialize)]
struct ListingEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

/// A downloadable table file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTable {
    pub name: String,
    pub download_url: String,
}

/// Result of a sync attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Newest release found remotely.
    pub remote_latest: Option<String>,
    /// Release recorded in the local marker before syncing.
    pub local_version: Option<String>,
    /// Table files written to the cache.
    pub downloaded: Vec<PathBuf>,
}

/// Parse a listing body into table entries.
///
/// Entries without both fields, and files without the table extension, are skipped.
pub fn parse_listing(body: &[u8]) -> Result<Vec<RemoteTable>> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    if !value.is_array() {
        return Err(HarvesterError::Listing(
            "expected a JSON array of entries".to_string(),
        ));
    }
    let entries: Vec<ListingEntry> = serde_json::from_value(value)?;

    Ok(entries
        .into_iter()
        .filter_map(|e| match (e.name, e.download_url) {
            (Some(name), Some(url)) if !name.is_empty() && !url.is_empty() => Some(RemoteTable {
                name,
                download_url: url,
            }),
            _ => None,
        })
        .filter(|t| is_table_file(&t.name))
        .collect())
}

/// Fetch and parse the remote listing.
pub fn fetch_listing(client: &Client, listing_url: &str) -> Result<Vec<RemoteTable>> {
    let body = download_bytes(client, listing_url)?;
    parse_listing(&body)
}

/// Group tables by the normalized release version in their names.
///
/// Names that carry no version are dropped.
pub fn group_by_version(tables: Vec<RemoteTable>) -> BTreeMap<String, Vec<RemoteTable>> {
    let mut groups: BTreeMap<String, Vec<RemoteTable>> = BTreeMap::new();
    for table in tables {
        let stem = Path::new(&table.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let Some(name) = match_table_name(stem) else {
            tracing::debug!(name = %table.name, "No version in remote file name");
            continue;
        };
        groups
            .entry(name.normalized_version())
            .or_default()
            .push(table);
    }
    groups
}

/// Pick the newest group.
pub fn latest_release(
    groups: BTreeMap<String, Vec<RemoteTable>>,
) -> Option<(String, Vec<RemoteTable>)> {
    groups
        .into_iter()
        .max_by(|(a, _), (b, _)| version::compare(a, b))
}

/// Whether `remote` should replace the local release.
///
/// No local release means anything remote is new.
pub fn is_newer(remote: &str, local: Option<&str>) -> bool {
    local.is_none_or(|local| version::compare(remote, local) == Ordering::Greater)
}

/// Download tables into `cache_dir`, skipping (and logging) failures.
pub fn download_tables(client: &Client, tables: &[RemoteTable], cache_dir: &Path) -> Vec<PathBuf> {
    let mut downloaded = Vec::new();
    if let Err(e) = fs::create_dir_all(cache_dir) {
        tracing::error!(dir = %cache_dir.display(), error = %e, "Cannot create cache directory");
        return downloaded;
    }

    for table in tables {
        let dest = cache_dir.join(&table.name);
        match download_table(client, table, &dest) {
            Ok(()) => {
                tracing::info!(file = %table.name, "Downloaded");
                downloaded.push(dest);
            }
            Err(e) => tracing::warn!(file = %table.name, error = %e, "Download failed"),
        }
    }
    downloaded
}

fn download_table(client: &Client, table: &RemoteTable, dest: &Path) -> Result<()> {
    let bytes = download_bytes(client, &table.download_url).map_err(|e| {
        if let HarvesterError::Http(source) = e {
            HarvesterError::Download {
                name: table.name.clone(),
                source,
            }
        } else {
            e
        }
    })?;
    fs::write(dest, bytes)?;
    Ok(())
}

/// Download the newest remote release when it is newer than the local one.
///
/// Never fails: listing problems are logged and produce an empty outcome.
pub fn sync(client: &Client, listing_url: &str, out_root: &Path) -> SyncOutcome {
    let mut outcome = SyncOutcome {
        local_version: read_local_version(out_root),
        ..SyncOutcome::default()
    };

    let tables = match fetch_listing(client, listing_url) {
        Ok(tables) => tables,
        Err(e) => {
            tracing::error!(url = listing_url, error = %e, "Remote sync failed");
            return outcome;
        }
    };
    if tables.is_empty() {
        tracing::warn!(url = listing_url, "No table files in remote listing");
        return outcome;
    }

    let Some((latest, group)) = latest_release(group_by_version(tables)) else {
        tracing::warn!("Could not identify any release version in remote file names");
        return outcome;
    };
    outcome.remote_latest = Some(latest.clone());

    if !is_newer(&latest, outcome.local_version.as_deref()) {
        tracing::info!(
            remote = %latest,
            local = outcome.local_version.as_deref().unwrap_or_default(),
            "Remote release is not newer than local release, nothing to sync"
        );
        return outcome;
    }

    tracing::info!(version = %latest, files = group.len(), "New release available, downloading");
    let cache_dir = out_root.join(CACHE_DIR).join(&latest);
    outcome.downloaded = download_tables(client, &group, &cache_dir);
    if outcome.downloaded.is_empty() {
        tracing::warn!(version = %latest, "No table of the new release could be downloaded");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(name: &str) -> RemoteTable {
        RemoteTable {
            name: name.to_string(),
            download_url: format!("https://example.com/{name}"),
        }
    }

    #[test]
    fn test_parse_listing_filters_entries() {
        let body = br#"[
            {"name": "IBPTaxSP25.2.F.csv", "download_url": "https://x/sp.csv", "type": "file"},
            {"name": "IBPTaxRJ25.2.F.CSV", "download_url": "https://x/rj.csv"},
            {"name": "leiame.txt", "download_url": "https://x/leiame.txt"},
            {"name": "antigos", "download_url": null, "type": "dir"},
            {"name": "", "download_url": "https://x/empty.csv"},
            {"download_url": "https://x/noname.csv"}
        ]"#;
        let tables = parse_listing(body).unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["IBPTaxSP25.2.F.csv", "IBPTaxRJ25.2.F.CSV"]);
    }

    #[test]
    fn test_parse_listing_rejects_non_array() {
        let err = parse_listing(br#"{"message": "API rate limit exceeded"}"#).unwrap_err();
        assert!(matches!(err, HarvesterError::Listing(_)));
        assert!(parse_listing(b"<html>").is_err());
    }

    #[test]
    fn test_group_by_version() {
        let groups = group_by_version(vec![
            table("IBPTaxSP25.2.F.csv"),
            table("IBPTaxRJ25.2F.csv"),
            table("IBPTaxSP25.1.A.csv"),
            table("tabela.csv"),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["25.2.F"].len(), 2);
        assert_eq!(groups["25.1.A"].len(), 1);
    }

    #[test]
    fn test_latest_release_uses_version_order() {
        let groups = group_by_version(vec![
            table("IBPTaxSP25.9.csv"),
            table("IBPTaxSP25.10.csv"),
            table("IBPTaxSP25.2.F.csv"),
        ]);
        let (latest, group) = latest_release(groups).unwrap();
        assert_eq!(latest, "25.10.E");
        assert_eq!(group[0].name, "IBPTaxSP25.10.csv");
    }

    #[test]
    fn test_latest_release_empty() {
        assert!(latest_release(BTreeMap::new()).is_none());
    }

    #[test]
    fn test_is_newer() {
        assert!(is_newer("25.2.F", None));
        assert!(is_newer("25.2.F", Some("25.2.E")));
        assert!(!is_newer("25.2.F", Some("25.2.F")));
        assert!(!is_newer("25.1.A", Some("25.2")));
    }
}
