//! Table ingestion: one table file into the shard tree.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{parse_table_name, PROGRESS_INTERVAL};
use crate::error::Result;
use crate::parse::{parse_row, ColumnMap};
use crate::store;
use crate::types::ReleaseMetadata;

/// Progress of a running ingestion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Data rows consumed so far (blank and rejected rows included).
    pub rows_done: usize,
    /// Data rows in the file.
    pub rows_total: usize,
    /// Records written so far.
    pub written: usize,
    pub elapsed: Duration,
}

impl Progress {
    /// Share of rows consumed, 0 to 100.
    pub fn percent(&self) -> f64 {
        if self.rows_total == 0 {
            return 100.0;
        }
        self.rows_done as f64 * 100.0 / self.rows_total as f64
    }

    /// Estimated time left, extrapolated from the rate so far.
    pub fn eta(&self) -> Duration {
        if self.rows_done == 0 || self.rows_done >= self.rows_total {
            return Duration::ZERO;
        }
        let remaining = (self.rows_total - self.rows_done) as f64;
        self.elapsed.mul_f64(remaining / self.rows_done as f64)
    }
}

/// Receives progress notifications while a table is ingested.
pub trait ProgressSink {
    /// A file is about to be processed.
    fn on_start(&mut self, _file: &Path, _rows_total: usize) {}

    /// Periodic update, every [`PROGRESS_INTERVAL`] written records and on the last row.
    fn on_progress(&mut self, progress: &Progress);

    /// The file is done, successfully or not.
    fn on_finish(&mut self, _summary: &IngestSummary) {}
}

/// Sink that ignores all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, _progress: &Progress) {}
}

/// Outcome of ingesting one table.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSummary {
    pub file: PathBuf,
    /// Normalized release version the records were written under.
    pub version: String,
    pub jurisdiction: String,
    /// Data rows read, blank lines included.
    pub rows_read: usize,
    /// Records merged into the tree.
    pub records_written: usize,
    pub elapsed: Duration,
    /// Set when processing stopped early; counts stay as far as they got.
    pub error: Option<String>,
}

impl IngestSummary {
    fn new(file: &Path, version: &str, jurisdiction: &str) -> Self {
        Self {
            file: file.to_path_buf(),
            version: version.to_string(),
            jurisdiction: jurisdiction.to_string(),
            rows_read: 0,
            records_written: 0,
            elapsed: Duration::ZERO,
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Decode Latin-1 (ISO-8859-1) bytes. Every byte maps to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Ingest one table file into the tree under `out_root`.
///
/// The release marker is rewritten first with the version derived from the
/// file name. Rows that fail validation or classify outside the persisted
/// taxonomies are skipped silently. Never fails: I/O problems are logged
/// and reported through [`IngestSummary::error`].
pub fn process(
    table_path: &Path,
    out_root: &Path,
    progress: &mut dyn ProgressSink,
) -> IngestSummary {
    let started = Instant::now();
    let name = parse_table_name(table_path);
    let version = name.normalized_version();
    let mut summary = IngestSummary::new(table_path, &version, &name.jurisdiction);

    tracing::info!(
        file = %table_path.display(),
        version = %version,
        jurisdiction = %name.jurisdiction,
        "Processing table"
    );

    if let Err(e) = store::write_release(out_root, &ReleaseMetadata::now(version.as_str())) {
        tracing::warn!(error = %e, "Failed to write release marker");
    }

    let result = ingest_rows(table_path, out_root, &mut summary, progress, started);
    summary.elapsed = started.elapsed();

    match result {
        Ok(()) => tracing::info!(
            file = %table_path.display(),
            records = summary.records_written,
            rows = summary.rows_read,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Table processed"
        ),
        Err(e) => {
            tracing::error!(
                file = %table_path.display(),
                records = summary.records_written,
                error = %e,
                "Table processing aborted"
            );
            summary.error = Some(e.to_string());
        }
    }

    progress.on_finish(&summary);
    summary
}

fn ingest_rows(
    table_path: &Path,
    out_root: &Path,
    summary: &mut IngestSummary,
    progress: &mut dyn ProgressSink,
    started: Instant,
) -> Result<()> {
    let text = decode_latin1(&fs::read(table_path)?);
    let mut lines = text.lines();

    let Some(header) = lines.next() else {
        tracing::info!(file = %table_path.display(), "Empty table file");
        return Ok(());
    };
    let columns = ColumnMap::from_header(header);

    let rows: Vec<&str> = lines.collect();
    let total = rows.len();
    progress.on_start(table_path, total);

    for (i, line) in rows.iter().enumerate() {
        summary.rows_read = i + 1;
        let mut wrote = false;

        if !line.trim().is_empty() {
            if let Some(row) = parse_row(&columns, line) {
                if row.taxonomy.is_persisted() {
                    store::upsert(
                        out_root,
                        &summary.version,
                        &summary.jurisdiction,
                        row.taxonomy,
                        row.record,
                    )?;
                    summary.records_written += 1;
                    wrote = true;
                }
            }
        }

        let periodic = wrote && summary.records_written % PROGRESS_INTERVAL == 0;
        if periodic || i + 1 == total {
            let update = Progress {
                rows_done: i + 1,
                rows_total: total,
                written: summary.records_written,
                elapsed: started.elapsed(),
            };
            tracing::debug!(
                rows = update.rows_done,
                total,
                written = update.written,
                percent = format_args!("{:.1}", update.percent()),
                eta_secs = update.eta().as_secs(),
                "Progress"
            );
            progress.on_progress(&update);
        }
    }

    Ok(())
}
