//! Single-cohort loading and parallel multi-cohort loading
//!
//! Raw data comes from a [`CohortSource`], the boundary to whatever
//! repository client fetches a dataset. Everything past `fetch` is pure
//! transformation.

mod annotation;
mod cohort;

use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;

pub use annotation::{extract_gene_from_assignment, resolve_probe_map, GENE_ASSIGNMENT_COLUMN};
pub use cohort::build_cohort;

use crate::data::{AnnotationTable, ExpressionMatrix, LabelVector, ProbeToGeneMap, SampleMetadata, SampleTable};
use crate::error::{CohortError, Result};
use crate::inference::{ColumnChoice, ColumnPriorities, LabelRules};

/// One sample as delivered by a repository client
#[derive(Debug, Clone)]
pub struct RawSample {
    /// Repository accession (e.g. a GSM id)
    pub sample_id: String,
    /// Measurement table; `None` when the record carries no table
    pub table: Option<SampleTable>,
    /// Free-text metadata
    pub metadata: SampleMetadata,
}

/// One dataset as delivered by a repository client
#[derive(Debug, Clone, Default)]
pub struct RawCohort {
    /// Platform annotation table, if the record has one
    pub annotation: Option<AnnotationTable>,
    /// Samples in repository order
    pub samples: Vec<RawSample>,
}

/// Repository client that fetches one dataset by id
///
/// Implementations own any timeouts and resource handling; the returned
/// `RawCohort` must not borrow from an open handle.
pub trait CohortSource: Sync {
    fn fetch(&self, cohort_id: &str) -> Result<RawCohort>;
}

/// A source backed by records already held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    cohorts: HashMap<String, RawCohort>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cohort(mut self, cohort_id: &str, cohort: RawCohort) -> Self {
        self.cohorts.insert(cohort_id.to_string(), cohort);
        self
    }
}

impl CohortSource for InMemorySource {
    fn fetch(&self, cohort_id: &str) -> Result<RawCohort> {
        self.cohorts.get(cohort_id).cloned().ok_or_else(|| CohortError::Source {
            cohort_id: cohort_id.to_string(),
            reason: "not present in source".to_string(),
        })
    }
}

/// Loader settings
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    /// Column-name priorities for schema inference
    pub priorities: ColumnPriorities,
    /// Label inference rules
    pub label_rules: LabelRules,
    /// Identifier column to use instead of inferring one
    pub identifier_column: Option<String>,
    /// Value column to use instead of inferring one
    pub value_column: Option<String>,
}

/// What happened while loading a cohort
#[derive(Debug, Clone, Default)]
pub struct LoadDiagnostics {
    /// Identifier column chosen from the first non-empty sample
    pub identifier_column: Option<ColumnChoice>,
    /// Value column chosen from the first non-empty sample
    pub value_column: Option<ColumnChoice>,
    /// Samples without a table or without numeric data
    pub skipped_empty: usize,
    /// Samples lacking the cohort's identifier or value column
    pub skipped_schema: usize,
    /// Samples whose probes are all absent from the platform annotation
    pub skipped_unmapped: usize,
    /// Samples whose label fell through to a default
    pub uncertain_labels: usize,
}

/// A loaded cohort: matrix, labels and the platform's probe map
#[derive(Debug, Clone)]
pub struct LoadedCohort {
    pub cohort_id: String,
    pub matrix: ExpressionMatrix,
    pub labels: LabelVector,
    pub probe_map: Option<ProbeToGeneMap>,
    /// Repository accession of each matrix row
    pub source_samples: Vec<String>,
    pub diagnostics: LoadDiagnostics,
}

/// Fetch and build one cohort
pub fn load_cohort<S: CohortSource + ?Sized>(
    source: &S,
    cohort_id: &str,
    disease_label: &str,
    config: &LoaderConfig,
) -> Result<LoadedCohort> {
    let raw = source.fetch(cohort_id)?;
    build_cohort(cohort_id, raw, disease_label, config)
}

/// A cohort that could not contribute to a merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortFailure {
    pub cohort_id: String,
    pub reason: String,
}

/// Result of loading several cohorts
#[derive(Debug, Clone, Default)]
pub struct CohortBatch {
    /// Non-empty cohorts, in caller order
    pub loaded: Vec<LoadedCohort>,
    /// Cohorts that failed or were empty, in caller order
    pub failures: Vec<CohortFailure>,
}

impl CohortBatch {
    /// Matrices, labels and ids ready for `merge_cohorts`
    pub fn merge_inputs(&self) -> (Vec<ExpressionMatrix>, Vec<LabelVector>, Vec<String>) {
        let matrices = self.loaded.iter().map(|c| c.matrix.clone()).collect();
        let labels = self.loaded.iter().map(|c| c.labels.clone()).collect();
        let ids = self.loaded.iter().map(|c| c.cohort_id.clone()).collect();
        (matrices, labels, ids)
    }
}

/// Load cohorts in parallel
///
/// Each cohort loads independently; a failure is recorded and does not stop
/// the others. Output order follows `cohort_ids`, never completion order,
/// so batch indices assigned downstream are reproducible. Cohorts with no
/// rows or no columns are reported as failures.
pub fn load_cohorts<S: CohortSource + ?Sized>(
    source: &S,
    cohort_ids: &[String],
    disease_label: &str,
    config: &LoaderConfig,
) -> CohortBatch {
    let outcomes: Vec<(String, Result<LoadedCohort>)> = cohort_ids
        .par_iter()
        .map(|id| (id.clone(), load_cohort(source, id, disease_label, config)))
        .collect();

    let mut batch = CohortBatch::default();
    for (cohort_id, outcome) in outcomes {
        match outcome {
            Ok(cohort) if !cohort.matrix.is_empty() => batch.loaded.push(cohort),
            Ok(_) => {
                let error = CohortError::EmptyInput {
                    reason: format!("cohort {} yielded no usable samples or genes", cohort_id),
                };
                log::warn!("Failed to load {}: {}", cohort_id, error);
                batch.failures.push(CohortFailure {
                    cohort_id,
                    reason: error.to_string(),
                });
            }
            Err(e) => {
                log::warn!("Failed to load {}: {}", cohort_id, e);
                batch.failures.push(CohortFailure {
                    cohort_id,
                    reason: e.to_string(),
                });
            }
        }
    }
    batch
}
