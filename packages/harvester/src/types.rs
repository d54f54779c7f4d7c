//! Core data types for the harvester.
//!
//! Field names of [`RateRecord`] and [`ReleaseMetadata`] are the on-disk
//! contract read by the lookup front-end and must not change.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Classification of a fiscal code; decides the shard subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Taxonomy {
    /// Mercosur commodity code (8 digits).
    #[serde(rename = "NCM")]
    Ncm,

    /// Service nomenclature code (`S` + 8 digits).
    #[serde(rename = "NBS")]
    Nbs,

    /// Municipal service item (LC 116/2003 list).
    #[serde(rename = "LC116")]
    Lc116,

    /// Anything else; never persisted.
    #[serde(rename = "OUT")]
    Other,
}

impl Taxonomy {
    /// Get the literal tag used in tables and directory names.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ncm => "NCM",
            Self::Nbs => "NBS",
            Self::Lc116 => "LC116",
            Self::Other => "OUT",
        }
    }

    /// Parse a literal tag (case-insensitive, trimmed).
    ///
    /// Returns `None` for anything that is not one of the four tags.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_uppercase().as_str() {
            "NCM" => Some(Self::Ncm),
            "NBS" => Some(Self::Nbs),
            "LC116" => Some(Self::Lc116),
            "OUT" => Some(Self::Other),
            _ => None,
        }
    }

    /// Whether records of this kind are written to the shard tree.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// One fiscal-code rate entry valid for a time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRecord {
    #[serde(rename = "CODIGO")]
    pub code: String,

    #[serde(rename = "EXCECAO_FISCAL", default)]
    pub fiscal_exception: Option<String>,

    #[serde(rename = "DESCRICAO", default)]
    pub description: Option<String>,

    /// Federal rate for domestic goods, percent.
    #[serde(rename = "ALIQ_FED_NAC", with = "rust_decimal::serde::arbitrary_precision")]
    pub federal_domestic: Decimal,

    /// Federal rate for imported goods, percent.
    #[serde(rename = "ALIQ_FED_IMP", with = "rust_decimal::serde::arbitrary_precision")]
    pub federal_import: Decimal,

    #[serde(rename = "ALIQ_ESTADUAL", with = "rust_decimal::serde::arbitrary_precision")]
    pub state: Decimal,

    #[serde(rename = "ALIQ_MUNICIPAL", with = "rust_decimal::serde::arbitrary_precision")]
    pub municipal: Decimal,

    /// Start of validity, `yyyy-MM-dd`.
    #[serde(rename = "DT_INICIO_VIG")]
    pub valid_from: String,

    /// End of validity, `yyyy-MM-dd`.
    #[serde(rename = "DT_FIM_VIG", default)]
    pub valid_to: Option<String>,

    #[serde(rename = "FONTE", default)]
    pub source: Option<String>,
}

impl RateRecord {
    /// Aggregation key: the fiscal exception trimmed and uppercased, empty when absent.
    #[must_use]
    pub fn exception_key(&self) -> String {
        exception_key(self.fiscal_exception.as_deref())
    }
}

/// Normalize a fiscal exception into its aggregation key.
///
/// # Examples
/// ```
/// use ibptax_harvester::types::exception_key;
///
/// assert_eq!(exception_key(Some(" ex 01 ")), "EX 01");
/// assert_eq!(exception_key(Some("   ")), "");
/// assert_eq!(exception_key(None), "");
/// ```
#[must_use]
pub fn exception_key(exception: Option<&str>) -> String {
    exception
        .map(|e| e.trim().to_uppercase())
        .unwrap_or_default()
}

/// Release marker stored at the output root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMetadata {
    /// Canonical version of the last processed table.
    #[serde(rename = "VERSAO")]
    pub version: String,

    /// Processing date, `yyyy-MM-dd`.
    #[serde(rename = "DATA")]
    pub date: String,

    /// Processing time, `HH:mm:ss`.
    #[serde(rename = "HORA")]
    pub time: String,
}

impl ReleaseMetadata {
    /// Marker for `version` stamped with the current local time.
    #[must_use]
    pub fn now(version: impl Into<String>) -> Self {
        let now = chrono::Local::now();
        Self {
            version: version.into(),
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M:%S").to_string(),
        }
    }
}
