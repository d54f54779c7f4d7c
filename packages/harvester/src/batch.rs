//! Local table discovery, operator selection and batch processing.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::is_table_file;
use crate::error::{HarvesterError, Result};
use crate::ingest::{self, IngestSummary, ProgressSink};

/// Table files directly inside `dir`, sorted by name.
pub fn local_tables(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(HarvesterError::MissingDirectory(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_table_file)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Operator choice among the listed tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    /// Position in the listing, as printed.
    Index(usize),
}

impl Selection {
    /// Parse operator input against a listing of `count` files.
    ///
    /// Accepts `A` or `all` (any case) and a 0-based index.
    ///
    /// # Examples
    /// ```
    /// use ibptax_harvester::batch::Selection;
    ///
    /// assert_eq!(Selection::parse("a", 3).unwrap(), Selection::All);
    /// assert_eq!(Selection::parse(" 0 ", 3).unwrap(), Selection::Index(0));
    /// assert!(Selection::parse("3", 3).is_err());
    /// ```
    pub fn parse(input: &str, count: usize) -> Result<Self> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("a") || input.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        match input.parse::<usize>() {
            Ok(i) if i < count => Ok(Self::Index(i)),
            _ => Err(HarvesterError::InvalidSelection(input.to_string())),
        }
    }

    /// Files covered by this selection.
    pub fn apply(&self, files: &[PathBuf]) -> Vec<PathBuf> {
        match self {
            Self::All => files.to_vec(),
            Self::Index(i) => files.get(*i).cloned().into_iter().collect(),
        }
    }
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub files: Vec<IngestSummary>,
}

impl BatchSummary {
    /// Records written over all files.
    pub fn records_written(&self) -> usize {
        self.files.iter().map(|f| f.records_written).sum()
    }

    /// Files that stopped on an error.
    pub fn failed(&self) -> usize {
        self.files.iter().filter(|f| !f.is_ok()).count()
    }
}

/// Process `files` in order. A failing file does not stop the batch.
pub fn process_all(
    files: &[PathBuf],
    out_root: &Path,
    progress: &mut dyn ProgressSink,
) -> BatchSummary {
    let summary = BatchSummary {
        files: files
            .iter()
            .map(|file| ingest::process(file, out_root, progress))
            .collect(),
    };
    tracing::info!(
        files = summary.files.len(),
        failed = summary.failed(),
        records = summary.records_written(),
        "Batch finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::NoProgress;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_local_tables_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("IBPTaxSP25.2.csv"), "").unwrap();
        fs::write(dir.path().join("IBPTaxAC25.2.CSV"), "").unwrap();
        fs::write(dir.path().join("process.log"), "").unwrap();
        fs::create_dir(dir.path().join("sub.csv")).unwrap();

        let files = local_tables(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["IBPTaxAC25.2.CSV", "IBPTaxSP25.2.csv"]);
    }

    #[test]
    fn test_local_tables_missing_dir() {
        let dir = tempdir().unwrap();
        let err = local_tables(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, HarvesterError::MissingDirectory(_)));
    }

    #[test]
    fn test_selection_parse() {
        assert_eq!(Selection::parse("A", 2).unwrap(), Selection::All);
        assert_eq!(Selection::parse("ALL", 2).unwrap(), Selection::All);
        assert_eq!(Selection::parse("0", 2).unwrap(), Selection::Index(0));
        assert_eq!(Selection::parse("1", 2).unwrap(), Selection::Index(1));
        assert!(Selection::parse("2", 2).is_err());
        assert!(Selection::parse("0", 0).is_err());
        assert!(Selection::parse("", 2).is_err());
        assert!(Selection::parse("x", 2).is_err());
        assert!(Selection::parse("-1", 2).is_err());
    }

    #[test]
    fn test_selection_apply() {
        let files = vec![PathBuf::from("a.csv"), PathBuf::from("b.csv")];
        assert_eq!(Selection::All.apply(&files), files);
        assert_eq!(Selection::Index(1).apply(&files), vec![PathBuf::from("b.csv")]);
        assert!(Selection::Index(5).apply(&files).is_empty());
    }

    #[test]
    fn test_process_all_continues_after_failure() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let good = dir.path().join("IBPTaxSP25.2.csv");
        fs::write(
            &good,
            "codigo;ex;tipo;descricao;nacionalfederal;importadosfederal;estadual;municipal;vigenciainicio;vigenciafim;fonte\n\
             85171231;;0;Telefones;15,45;17,32;18,00;0,00;01/03/2024;;IBPT\n",
        )
        .unwrap();
        let missing = dir.path().join("IBPTaxRJ25.2.csv");

        let summary = process_all(&[missing, good], &out, &mut NoProgress);
        assert_eq!(summary.files.len(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.records_written(), 1);
    }
}
