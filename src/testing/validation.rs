//! Per-gene checks of candidate genes on a held-out cohort

use serde::Serialize;

use crate::data::{Condition, ExpressionMatrix, LabelVector};
use crate::error::{CohortError, Result};
use crate::stats::finite_values;

use super::ttest::student_t_test;

/// How well one gene separates Control from disease samples
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneValidation {
    pub gene: String,
    /// Student's t of disease vs Control
    pub t_statistic: f64,
    pub pvalue: f64,
    /// Area under the ROC curve with expression as the disease score
    pub auc: f64,
    pub n_control: usize,
    pub n_disease: usize,
}

/// Rank-based ROC AUC: the probability that a disease value exceeds a
/// Control value, ties counting one half
///
/// Non-finite values are ignored. NaN when either group is empty.
pub fn rank_auc(control: &[f64], disease: &[f64]) -> f64 {
    let control = finite_values(control);
    let disease = finite_values(disease);
    if control.is_empty() || disease.is_empty() {
        return f64::NAN;
    }

    let mut pooled: Vec<(f64, bool)> = control
        .iter()
        .map(|&v| (v, false))
        .chain(disease.iter().map(|&v| (v, true)))
        .collect();
    pooled.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Sum of mid-ranks of the disease values
    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < pooled.len() {
        let mut j = i;
        while j + 1 < pooled.len() && pooled[j + 1].0 == pooled[i].0 {
            j += 1;
        }
        let mid_rank = (i + j) as f64 / 2.0 + 1.0;
        let n_disease_tied = pooled[i..=j].iter().filter(|(_, d)| *d).count();
        rank_sum += n_disease_tied as f64 * mid_rank;
        i = j + 1;
    }

    let nd = disease.len() as f64;
    let nc = control.len() as f64;
    (rank_sum - nd * (nd + 1.0) / 2.0) / (nd * nc)
}

/// Test each named gene for a Control vs disease difference
///
/// Every non-Control sample counts as disease. Genes absent from the matrix
/// are skipped; the output follows the order of `genes`. Fails with
/// `NoComparisonGroup` unless both groups have samples.
pub fn validate_genes<G: AsRef<str>>(
    matrix: &ExpressionMatrix,
    labels: &LabelVector,
    genes: &[G],
) -> Result<Vec<GeneValidation>> {
    if labels.len() != matrix.n_samples() {
        return Err(CohortError::DimensionMismatch {
            expected: format!("{} labels", matrix.n_samples()),
            got: format!("{} labels", labels.len()),
        });
    }

    let control = labels.indices_of(&Condition::Control);
    let disease: Vec<usize> = (0..labels.len()).filter(|i| !control.contains(i)).collect();
    if control.is_empty() || disease.is_empty() {
        return Err(CohortError::NoComparisonGroup {
            reason: format!(
                "validation needs Control and disease samples, got {} and {}",
                control.len(),
                disease.len()
            ),
        });
    }

    let mut out = Vec::with_capacity(genes.len());
    for gene in genes {
        let gene = gene.as_ref();
        let Some(j) = matrix.gene_index(gene) else {
            log::debug!("Validation: gene {} not measured; skipped", gene);
            continue;
        };
        let column = matrix.gene_values(j);
        let c: Vec<f64> = control.iter().map(|&i| column[i]).collect();
        let d: Vec<f64> = disease.iter().map(|&i| column[i]).collect();
        let test = student_t_test(&d, &c);

        out.push(GeneValidation {
            gene: gene.to_string(),
            t_statistic: test.statistic,
            pvalue: test.pvalue,
            auc: rank_auc(&c, &d),
            n_control: finite_values(&c).len(),
            n_disease: finite_values(&d).len(),
        });
    }

    log::info!(
        "Validated {} of {} genes on {} Control and {} disease samples",
        out.len(),
        genes.len(),
        control.len(),
        disease.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn fixture() -> (ExpressionMatrix, LabelVector) {
        let samples = ids(&["s0", "s1", "s2", "s3", "s4", "s5"]);
        let matrix = ExpressionMatrix::new(
            array![
                [1.0, 6.0, 5.0],
                [2.0, 5.0, 5.0],
                [3.0, 4.0, 5.0],
                [4.0, 3.0, 5.0],
                [5.0, 2.0, 5.0],
                [6.0, 1.0, 5.0],
            ],
            samples.clone(),
            ids(&["UP", "DOWN", "FLAT"]),
        )
        .unwrap();
        let ad = Condition::Disease("AD".to_string());
        let labels = LabelVector::new(
            samples,
            vec![Condition::Control, Condition::Control, Condition::Control, ad.clone(), ad.clone(), ad],
        )
        .unwrap();
        (matrix, labels)
    }

    #[test]
    fn test_rank_auc() {
        assert_eq!(rank_auc(&[1.0, 2.0], &[3.0, 4.0]), 1.0);
        assert_eq!(rank_auc(&[3.0, 4.0], &[1.0, 2.0]), 0.0);
        // Pairs: (2>1) + (2=2)/2 + (3>1) + (3>2) = 3.5 of 4
        assert!((rank_auc(&[1.0, 2.0], &[2.0, 3.0]) - 0.875).abs() < 1e-12);
        assert_eq!(rank_auc(&[5.0, 5.0], &[5.0]), 0.5);
        assert!(rank_auc(&[], &[1.0]).is_nan());
        assert_eq!(rank_auc(&[1.0, f64::NAN], &[2.0]), 1.0);
    }

    #[test]
    fn test_validate_genes() {
        let (matrix, labels) = fixture();
        let out = validate_genes(&matrix, &labels, &["DOWN", "MISSING", "UP", "FLAT"]).unwrap();

        let genes: Vec<&str> = out.iter().map(|v| v.gene.as_str()).collect();
        assert_eq!(genes, vec!["DOWN", "UP", "FLAT"]);

        let down = &out[0];
        assert_eq!(down.auc, 0.0);
        assert!(down.t_statistic < 0.0);

        let up = &out[1];
        assert_eq!(up.auc, 1.0);
        assert!(up.t_statistic > 0.0);
        // t = 3 / sqrt(2/3), df = 4
        assert!((up.t_statistic - 3.674_234_614).abs() < 1e-6);
        assert!(up.pvalue < 0.05);
        assert_eq!((up.n_control, up.n_disease), (3, 3));

        let flat = &out[2];
        assert_eq!(flat.auc, 0.5);
        assert!(flat.pvalue.is_nan());
    }

    #[test]
    fn test_validate_without_disease_samples() {
        let (matrix, _) = fixture();
        let labels = LabelVector::new(matrix.sample_ids().to_vec(), vec![Condition::Control; 6]).unwrap();
        let result = validate_genes(&matrix, &labels, &["UP"]);
        assert!(matches!(result, Err(CohortError::NoComparisonGroup { .. })));
    }
}
