//! Control vs disease differential expression

use rayon::prelude::*;

use crate::data::{Condition, ExpressionMatrix, LabelVector};
use crate::error::{CohortError, Result};
use crate::stats::{finite_mean, finite_std};

use super::fdr::benjamini_hochberg;
use super::results::{DifferentialResult, Regulation};
use super::ttest::student_t_test;

/// Thresholds and constants for differential expression
#[derive(Debug, Clone)]
pub struct DeParams {
    /// Adjusted p-value must be strictly below this
    pub pvalue_threshold: f64,
    /// |log2 fold change| must be strictly above this
    pub logfc_threshold: f64,
    /// Added to both group means before taking the ratio
    pub pseudocount: f64,
}

impl Default for DeParams {
    fn default() -> Self {
        Self {
            pvalue_threshold: 0.05,
            logfc_threshold: 0.5,
            pseudocount: 0.001,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct GeneStats {
    mean_control: f64,
    mean_disease: f64,
    std_control: f64,
    std_disease: f64,
    log2_fold_change: f64,
    t_statistic: f64,
    pvalue: f64,
}

fn gene_stats(column: &[f64], control: &[usize], disease: &[usize], pseudocount: f64) -> GeneStats {
    let c: Vec<f64> = control.iter().map(|&i| column[i]).collect();
    let d: Vec<f64> = disease.iter().map(|&i| column[i]).collect();

    let mean_control = finite_mean(&c);
    let mean_disease = finite_mean(&d);
    let test = student_t_test(&d, &c);

    GeneStats {
        mean_control,
        mean_disease,
        std_control: finite_std(&c),
        std_disease: finite_std(&d),
        log2_fold_change: ((mean_disease + pseudocount) / (mean_control + pseudocount)).log2(),
        t_statistic: test.statistic,
        pvalue: test.pvalue,
    }
}

/// Test every gene of `matrix` for a Control vs disease difference
///
/// The disease group is the first non-Control label in sample order. Samples
/// carrying any other non-Control label are excluded from both groups and
/// their labels are reported in `excluded_labels`. Fails with
/// `NoComparisonGroup` when no sample has a non-Control label.
pub fn differential_expression(
    matrix: &ExpressionMatrix,
    labels: &LabelVector,
    params: &DeParams,
) -> Result<DifferentialResult> {
    if labels.len() != matrix.n_samples() {
        return Err(CohortError::DimensionMismatch {
            expected: format!("{} labels", matrix.n_samples()),
            got: format!("{} labels", labels.len()),
        });
    }

    let diseases = labels.disease_labels();
    let Some(disease_label) = diseases.first().map(|s| s.to_string()) else {
        return Err(CohortError::NoComparisonGroup {
            reason: "no sample carries a non-Control label".to_string(),
        });
    };
    let excluded_labels: Vec<String> = diseases[1..].iter().map(|s| s.to_string()).collect();
    if !excluded_labels.is_empty() {
        log::warn!(
            "Several disease labels present; comparing {} vs Control and excluding {:?}",
            disease_label,
            excluded_labels
        );
    }

    let control = labels.indices_of(&Condition::Control);
    let disease = labels.indices_of(&Condition::Disease(disease_label.clone()));
    if control.is_empty() {
        log::warn!("No Control samples; every gene will be Not Significant");
    }
    log::info!(
        "Testing {} genes: {} Control vs {} {}",
        matrix.n_genes(),
        control.len(),
        disease.len(),
        disease_label
    );

    let values = matrix.values();
    let stats: Vec<GeneStats> = (0..matrix.n_genes())
        .into_par_iter()
        .map(|g| {
            let column = values.column(g).to_vec();
            gene_stats(&column, &control, &disease, params.pseudocount)
        })
        .collect();

    let pvalues: Vec<f64> = stats.iter().map(|s| s.pvalue).collect();
    let padj = benjamini_hochberg(&pvalues);

    let regulation: Vec<Regulation> = stats
        .iter()
        .zip(&padj)
        .map(|(s, &q)| Regulation::classify(q, s.log2_fold_change, params.pvalue_threshold, params.logfc_threshold))
        .collect();

    let result = DifferentialResult {
        gene_ids: matrix.gene_ids().to_vec(),
        mean_control: stats.iter().map(|s| s.mean_control).collect(),
        mean_disease: stats.iter().map(|s| s.mean_disease).collect(),
        std_control: stats.iter().map(|s| s.std_control).collect(),
        std_disease: stats.iter().map(|s| s.std_disease).collect(),
        log2_fold_changes: stats.iter().map(|s| s.log2_fold_change).collect(),
        t_statistics: stats.iter().map(|s| s.t_statistic).collect(),
        pvalues,
        padj,
        regulation,
        disease_label,
        excluded_labels,
        n_control: control.len(),
        n_disease: disease.len(),
        pvalue_threshold: params.pvalue_threshold,
        logfc_threshold: params.logfc_threshold,
    };

    let summary = result.summary();
    log::info!(
        "{}: {} DEGs ({} up, {} down)",
        summary.disease_label,
        summary.total_degs(),
        summary.upregulated,
        summary.downregulated
    );
    Ok(result)
}
