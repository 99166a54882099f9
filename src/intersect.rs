//! Genes regulated the same way in two independent comparisons

use std::collections::BTreeSet;

use serde::Serialize;

use crate::testing::{DifferentialResult, Regulation};

/// Genes called in the same direction by two differential expression runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoDegSet {
    /// Upregulated in both runs, sorted
    pub upregulated: Vec<String>,
    /// Downregulated in both runs, sorted
    pub downregulated: Vec<String>,
}

impl CoDegSet {
    /// Upregulated genes followed by downregulated genes
    pub fn all(&self) -> Vec<&str> {
        self.upregulated
            .iter()
            .chain(&self.downregulated)
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.upregulated.len() + self.downregulated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(gene, call)` pairs in the order of [`CoDegSet::all`]
    pub fn calls(&self) -> impl Iterator<Item = (&str, Regulation)> {
        self.upregulated
            .iter()
            .map(|g| (g.as_str(), Regulation::Up))
            .chain(self.downregulated.iter().map(|g| (g.as_str(), Regulation::Down)))
    }
}

fn common(first: &DifferentialResult, second: &DifferentialResult, call: Regulation) -> Vec<String> {
    let a: BTreeSet<&str> = first.genes_with(call).into_iter().collect();
    let b: BTreeSet<&str> = second.genes_with(call).into_iter().collect();
    a.intersection(&b).map(|g| g.to_string()).collect()
}

/// Intersect the regulation calls of two results
///
/// Only the stored calls are compared; nothing is recomputed. A gene called
/// up in one run and down in the other is in neither set.
pub fn intersect_degs(first: &DifferentialResult, second: &DifferentialResult) -> CoDegSet {
    let set = CoDegSet {
        upregulated: common(first, second, Regulation::Up),
        downregulated: common(first, second, Regulation::Down),
    };
    log::info!(
        "Co-DEGs of {} and {}: {} ({} up, {} down)",
        first.disease_label,
        second.disease_label,
        set.len(),
        set.upregulated.len(),
        set.downregulated.len()
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, calls: &[(&str, Regulation)]) -> DifferentialResult {
        let n = calls.len();
        DifferentialResult {
            gene_ids: calls.iter().map(|(g, _)| g.to_string()).collect(),
            mean_control: vec![0.0; n],
            mean_disease: vec![0.0; n],
            std_control: vec![0.0; n],
            std_disease: vec![0.0; n],
            log2_fold_changes: vec![0.0; n],
            t_statistics: vec![0.0; n],
            pvalues: vec![0.0; n],
            padj: vec![0.0; n],
            regulation: calls.iter().map(|(_, r)| *r).collect(),
            disease_label: label.to_string(),
            excluded_labels: Vec::new(),
            n_control: 0,
            n_disease: 0,
            pvalue_threshold: 0.05,
            logfc_threshold: 0.5,
        }
    }

    #[test]
    fn test_intersect_degs() {
        let deg1 = result(
            "AD",
            &[
                ("A", Regulation::Up),
                ("B", Regulation::Up),
                ("C", Regulation::Down),
                ("E", Regulation::NotSignificant),
            ],
        );
        let deg2 = result(
            "OA",
            &[
                ("D", Regulation::Up),
                ("C", Regulation::Down),
                ("B", Regulation::Up),
                ("E", Regulation::NotSignificant),
            ],
        );

        let set = intersect_degs(&deg1, &deg2);
        assert_eq!(set.upregulated, vec!["B".to_string()]);
        assert_eq!(set.downregulated, vec!["C".to_string()]);
        assert_eq!(set.all(), vec!["B", "C"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_discordant_calls_are_dropped() {
        let deg1 = result("AD", &[("A", Regulation::Up), ("Z", Regulation::Down), ("M", Regulation::Up)]);
        let deg2 = result("OA", &[("A", Regulation::Down), ("Z", Regulation::Down), ("M", Regulation::Up)]);
        let set = intersect_degs(&deg1, &deg2);
        assert_eq!(set.upregulated, vec!["M".to_string()]);
        assert_eq!(set.downregulated, vec!["Z".to_string()]);
        let calls: Vec<(&str, Regulation)> = set.calls().collect();
        assert_eq!(calls, vec![("M", Regulation::Up), ("Z", Regulation::Down)]);
    }

    #[test]
    fn test_no_overlap() {
        let deg1 = result("AD", &[("A", Regulation::Up)]);
        let deg2 = result("OA", &[("B", Regulation::Up)]);
        assert!(intersect_degs(&deg1, &deg2).is_empty());
    }
}
