//! Configuration constants, table file-name parsing, and run settings.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::version;

/// GitHub contents API listing of the published IBPTax tables.
pub const DEFAULT_LISTING_URL: &str =
    "https://api.github.com/repos/ProjetoACBr/ACBr/contents/Exemplos/ACBrTCP/ACBrIBPTax/tabela";

/// HTTP timeout in seconds.
///
/// A single table is a few megabytes; the listing is small.
pub const HTTP_TIMEOUT_SECS: u64 = 120;

/// Extension of the rate table files, compared case-insensitively.
pub const TABLE_EXTENSION: &str = "csv";

/// Column delimiter used by the rate tables.
pub const DELIMITER: char = ';';

/// Name of the release marker written at the output root.
pub const RELEASE_FILE: &str = "versao.json";

/// Directory under the output root where downloaded tables are cached.
pub const CACHE_DIR: &str = "_cache";

/// Default log file name, created under the output root.
pub const LOG_FILE: &str = "process.log";

/// Jurisdiction used when the file name carries none.
pub const FALLBACK_JURISDICTION: &str = "XX";

/// Version token used when the file name carries none.
pub const FALLBACK_VERSION: &str = "versao";

/// Emit a progress update every this many written records.
pub const PROGRESS_INTERVAL: usize = 200;

/// Table name pattern: `IBPTax` + UF + optional separator + numeric version + optional letter.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static TABLE_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)IBPTax([A-Z]{2})[ _\-]*([0-9]+(?:\.[0-9]+)*)(?:\.?([A-Z]))?")
        .expect("valid regex")
});

/// Jurisdiction and release version derived from a table file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    /// Two-letter jurisdiction (UF), uppercased.
    pub jurisdiction: String,

    /// Raw version token, e.g. `25.2.F`; not yet normalized.
    pub version: String,
}

impl TableName {
    /// Canonical version string used for output paths.
    #[must_use]
    pub fn normalized_version(&self) -> String {
        version::normalize_str(&self.version)
    }
}

/// Match the table name pattern against a file stem.
///
/// Returns `None` when the name does not follow the `IBPTax<UF><version>` shape.
///
/// # Examples
/// ```
/// use ibptax_harvester::config::match_table_name;
///
/// let name = match_table_name("IBPTaxSP25.2.F").unwrap();
/// assert_eq!(name.jurisdiction, "SP");
/// assert_eq!(name.version, "25.2.F");
/// assert!(match_table_name("tabela").is_none());
/// ```
pub fn match_table_name(stem: &str) -> Option<TableName> {
    let caps = TABLE_NAME_PATTERN.captures(stem)?;
    let jurisdiction = caps.get(1)?.as_str().to_uppercase();
    let core = caps.get(2)?.as_str();
    let version = match caps.get(3) {
        Some(suffix) => format!("{core}.{}", suffix.as_str().to_uppercase()),
        None => core.to_string(),
    };
    Some(TableName {
        jurisdiction,
        version,
    })
}

/// Derive jurisdiction and version from a table file path.
///
/// Falls back to jurisdiction `XX` and version token `versao` when the
/// file name does not match.
pub fn parse_table_name(path: &Path) -> TableName {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(match_table_name)
        .unwrap_or_else(|| TableName {
            jurisdiction: FALLBACK_JURISDICTION.to_string(),
            version: FALLBACK_VERSION.to_string(),
        })
}

/// Whether a file name carries the table extension.
pub fn is_table_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(TABLE_EXTENSION))
}

/// Runtime settings for one harvester run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root of the shard tree.
    pub out_root: PathBuf,

    /// Directory scanned for local tables when no remote release is new.
    pub input_dir: PathBuf,

    /// Remote listing endpoint.
    pub listing_url: String,

    /// Append-only log file.
    pub log_file: PathBuf,
}

impl Settings {
    /// Settings rooted at `out_root`, with the log file and input directory placed there.
    pub fn new(out_root: impl Into<PathBuf>) -> Self {
        let out_root = out_root.into();
        Self {
            input_dir: out_root.clone(),
            log_file: out_root.join(LOG_FILE),
            listing_url: DEFAULT_LISTING_URL.to_string(),
            out_root,
        }
    }
}
