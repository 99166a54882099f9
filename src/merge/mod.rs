//! Merge per-cohort matrices into one study-wide matrix
//!
//! Cohorts are restricted to the genes they all share, stacked in caller
//! order, and batch-corrected with ComBat. Correction is best effort: when it
//! cannot run, the merged but uncorrected matrix is returned and the reason
//! is recorded in [`CorrectionOutcome`].

mod combat;

use std::collections::HashSet;
use std::fmt;

pub use combat::{combat, CombatParams};

use crate::data::{ExpressionMatrix, LabelVector};
use crate::error::{CohortError, Result};

/// Batch index per merged row; index `j` is the cohort's input position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchVector(Vec<usize>);

impl BatchVector {
    pub fn new(batches: Vec<usize>) -> Self {
        Self(batches)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Number of distinct batches
    pub fn n_batches(&self) -> usize {
        self.0.iter().collect::<HashSet<_>>().len()
    }
}

/// What happened to batch correction during a merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectionOutcome {
    /// Fewer than two cohorts contributed rows
    NotAttempted,
    /// ComBat ran over this many batches
    Applied { n_batches: usize },
    /// ComBat could not run; the matrix is merged but uncorrected
    Skipped { reason: String },
}

impl CorrectionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CorrectionOutcome::Applied { .. })
    }
}

impl fmt::Display for CorrectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrectionOutcome::NotAttempted => write!(f, "not attempted"),
            CorrectionOutcome::Applied { n_batches } => write!(f, "applied over {} batches", n_batches),
            CorrectionOutcome::Skipped { reason } => write!(f, "skipped ({})", reason),
        }
    }
}

/// A merged study-wide matrix
#[derive(Debug, Clone)]
pub struct MergedCohorts {
    pub matrix: ExpressionMatrix,
    pub labels: LabelVector,
    /// Batch of each merged row; `None` unless two or more cohorts contributed
    pub batches: Option<BatchVector>,
    pub correction: CorrectionOutcome,
    /// Cohorts whose rows are in the matrix, in merge order
    pub cohort_ids: Vec<String>,
}

/// Genes present in every matrix, sorted
fn shared_genes(matrices: &[ExpressionMatrix]) -> Vec<String> {
    let Some(first) = matrices.first() else {
        return Vec::new();
    };
    let mut common: HashSet<&str> = first.gene_ids().iter().map(String::as_str).collect();
    for m in &matrices[1..] {
        let genes: HashSet<&str> = m.gene_ids().iter().map(String::as_str).collect();
        common.retain(|g| genes.contains(g));
    }
    let mut common: Vec<String> = common.into_iter().map(String::from).collect();
    common.sort();
    common
}

/// Merge cohorts and remove batch effects
///
/// `matrices`, `labels` and `cohort_ids` are parallel. A single cohort is
/// returned unchanged. Otherwise the result has the sorted gene intersection
/// as columns and every input row, in input order. ComBat failures are
/// logged and reported through `correction`; they never fail the merge.
pub fn merge_cohorts(
    matrices: &[ExpressionMatrix],
    labels: &[LabelVector],
    cohort_ids: &[String],
    params: &CombatParams,
) -> Result<MergedCohorts> {
    if matrices.len() != labels.len() || matrices.len() != cohort_ids.len() {
        return Err(CohortError::DimensionMismatch {
            expected: format!("{} label vectors and cohort ids", matrices.len()),
            got: format!("{} label vectors, {} cohort ids", labels.len(), cohort_ids.len()),
        });
    }
    for ((m, l), id) in matrices.iter().zip(labels).zip(cohort_ids) {
        if m.n_samples() != l.len() {
            return Err(CohortError::DimensionMismatch {
                expected: format!("{} labels for cohort {}", m.n_samples(), id),
                got: format!("{} labels", l.len()),
            });
        }
    }

    match matrices.len() {
        0 => {
            return Ok(MergedCohorts {
                matrix: ExpressionMatrix::empty(),
                labels: LabelVector::empty(),
                batches: None,
                correction: CorrectionOutcome::NotAttempted,
                cohort_ids: Vec::new(),
            })
        }
        1 => {
            return Ok(MergedCohorts {
                matrix: matrices[0].clone(),
                labels: labels[0].clone(),
                batches: None,
                correction: CorrectionOutcome::NotAttempted,
                cohort_ids: cohort_ids.to_vec(),
            })
        }
        _ => {}
    }

    let common = shared_genes(matrices);
    log::info!("Merging {} cohorts over {} shared genes", matrices.len(), common.len());
    if common.is_empty() {
        log::warn!("Cohorts {:?} share no genes; nothing to merge", cohort_ids);
        return Ok(MergedCohorts {
            matrix: ExpressionMatrix::empty(),
            labels: LabelVector::empty(),
            batches: None,
            correction: CorrectionOutcome::NotAttempted,
            cohort_ids: Vec::new(),
        });
    }

    let mut parts = Vec::with_capacity(matrices.len());
    let mut part_labels = Vec::with_capacity(matrices.len());
    let mut batch = Vec::new();
    let mut contributing = Vec::new();
    for (j, ((m, l), id)) in matrices.iter().zip(labels).zip(cohort_ids).enumerate() {
        if m.n_samples() == 0 {
            continue;
        }
        parts.push(m.select_genes(&common)?);
        part_labels.push(l.clone());
        batch.extend(std::iter::repeat(j).take(m.n_samples()));
        contributing.push(id.clone());
    }

    let merged = ExpressionMatrix::vstack(&parts)?;
    let merged_labels = LabelVector::concat(&part_labels);

    if contributing.len() < 2 {
        return Ok(MergedCohorts {
            matrix: merged,
            labels: merged_labels,
            batches: None,
            correction: CorrectionOutcome::NotAttempted,
            cohort_ids: contributing,
        });
    }

    let batches = BatchVector::new(batch);
    let (matrix, correction) = correct(merged, &batches, params);
    if let CorrectionOutcome::Skipped { reason } = &correction {
        log::warn!("Batch correction skipped: {}", reason);
    }

    Ok(MergedCohorts {
        matrix,
        labels: merged_labels,
        batches: Some(batches),
        correction,
        cohort_ids: contributing,
    })
}

fn correct(merged: ExpressionMatrix, batches: &BatchVector, params: &CombatParams) -> (ExpressionMatrix, CorrectionOutcome) {
    if batches.len() != merged.n_samples() {
        let reason = format!(
            "batch vector length {} does not match {} rows",
            batches.len(),
            merged.n_samples()
        );
        return (merged, CorrectionOutcome::Skipped { reason });
    }

    // ComBat works on genes x samples
    let adjusted = combat(merged.values().t(), batches.as_slice(), params)
        .and_then(|genes_by_samples| merged.with_values(genes_by_samples.t().to_owned()));

    match adjusted {
        Ok(matrix) => {
            let n_batches = batches.n_batches();
            log::info!("ComBat applied over {} batches", n_batches);
            (matrix, CorrectionOutcome::Applied { n_batches })
        }
        Err(e) => (merged, CorrectionOutcome::Skipped { reason: e.to_string() }),
    }
}
