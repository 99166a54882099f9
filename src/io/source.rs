//! Cohorts stored as plain files on disk
//!
//! Layout, one directory per cohort:
//!
//! ```text
//! <root>/<cohort_id>/annotation.tsv        platform annotation (optional)
//! <root>/<cohort_id>/metadata.json         [{"sample_id": ..., "metadata": {key: [values]}}, ...]
//! <root>/<cohort_id>/samples/<sample>.tsv  one measurement table per sample
//! ```
//!
//! The order of `metadata.json` is the sample order of the cohort. A sample
//! without a table file is passed on with no table.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::SampleMetadata;
use crate::error::{CohortError, Result};
use crate::loader::{CohortSource, RawCohort, RawSample};

use super::tables::read_table;

pub const ANNOTATION_FILE: &str = "annotation.tsv";
pub const METADATA_FILE: &str = "metadata.json";
pub const SAMPLES_DIR: &str = "samples";

#[derive(Debug, Deserialize)]
struct SampleRecord {
    sample_id: String,
    #[serde(default)]
    metadata: SampleMetadata,
}

/// A [`CohortSource`] reading from a local directory tree
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Fails with `MissingDependency` when `root` is not a directory
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(CohortError::MissingDependency {
                what: format!("cohort data directory {}", root.display()),
            });
        }
        Ok(Self { root })
    }

    fn source_error(cohort_id: &str, reason: String) -> CohortError {
        CohortError::Source {
            cohort_id: cohort_id.to_string(),
            reason,
        }
    }

    fn read_records(&self, cohort_id: &str, dir: &Path) -> Result<Vec<SampleRecord>> {
        let path = dir.join(METADATA_FILE);
        let file = File::open(&path).map_err(|e| Self::source_error(cohort_id, format!("{}: {}", path.display(), e)))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Self::source_error(cohort_id, format!("{}: {}", path.display(), e)))
    }
}

impl CohortSource for DirectorySource {
    fn fetch(&self, cohort_id: &str) -> Result<RawCohort> {
        let dir = self.root.join(cohort_id);
        if !dir.is_dir() {
            return Err(Self::source_error(cohort_id, format!("no directory {}", dir.display())));
        }

        let annotation_path = dir.join(ANNOTATION_FILE);
        let annotation = if annotation_path.is_file() {
            Some(read_table(&annotation_path).map_err(|e| Self::source_error(cohort_id, e.to_string()))?)
        } else {
            log::debug!("{}: no platform annotation", cohort_id);
            None
        };

        let records = self.read_records(cohort_id, &dir)?;
        let samples_dir = dir.join(SAMPLES_DIR);

        let samples = records
            .into_iter()
            .map(|record| {
                let path = samples_dir.join(format!("{}.tsv", record.sample_id));
                let table = if path.is_file() {
                    match read_table(&path) {
                        Ok(table) => Some(table),
                        Err(e) => {
                            log::warn!("{}: unreadable table for {}: {}", cohort_id, record.sample_id, e);
                            None
                        }
                    }
                } else {
                    None
                };
                RawSample {
                    sample_id: record.sample_id,
                    table,
                    metadata: record.metadata,
                }
            })
            .collect();

        Ok(RawCohort { annotation, samples })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_cohort(root: &Path) {
        let dir = root.join("GSE1");
        fs::create_dir_all(dir.join(SAMPLES_DIR)).unwrap();
        fs::write(dir.join(ANNOTATION_FILE), "ID\tGene Symbol\np1\tAPP\n").unwrap();
        fs::write(
            dir.join(METADATA_FILE),
            r#"[
                {"sample_id": "GSM2", "metadata": {"title": ["AD brain"], "characteristics_ch1": ["age: 80", "sex: F"]}},
                {"sample_id": "GSM1", "metadata": {"title": "control brain"}},
                {"sample_id": "GSM3"}
            ]"#,
        )
        .unwrap();
        fs::write(dir.join(SAMPLES_DIR).join("GSM1.tsv"), "ID_REF\tVALUE\np1\t1.0\n").unwrap();
        fs::write(dir.join(SAMPLES_DIR).join("GSM2.tsv"), "ID_REF\tVALUE\np1\t2.0\n").unwrap();
    }

    #[test]
    fn test_fetch_reads_layout() {
        let root = TempDir::new().unwrap();
        write_cohort(root.path());

        let source = DirectorySource::new(root.path()).unwrap();
        let raw = source.fetch("GSE1").unwrap();

        assert!(raw.annotation.is_some());
        let ids: Vec<&str> = raw.samples.iter().map(|s| s.sample_id.as_str()).collect();
        assert_eq!(ids, vec!["GSM2", "GSM1", "GSM3"]);
        assert_eq!(raw.samples[0].metadata.get("characteristics_ch1").unwrap().len(), 2);
        assert_eq!(raw.samples[1].metadata.get("title").unwrap(), &["control brain".to_string()][..]);
        assert!(raw.samples[2].table.is_none());
        assert!(raw.samples[2].metadata.is_empty());
    }

    #[test]
    fn test_missing_root_and_cohort() {
        let root = TempDir::new().unwrap();
        assert!(matches!(
            DirectorySource::new(root.path().join("absent")),
            Err(CohortError::MissingDependency { .. })
        ));

        let source = DirectorySource::new(root.path()).unwrap();
        assert!(matches!(source.fetch("GSE404"), Err(CohortError::Source { .. })));
    }
}
