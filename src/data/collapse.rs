//! Collapse probe columns onto gene symbols by averaging

use std::collections::HashMap;

use ndarray::Array2;

use super::{ExpressionMatrix, ProbeToGeneMap};
use crate::error::Result;

/// Collapse probe-level columns to gene-level columns
///
/// Each column label is looked up in `probe_to_gene`; unmapped probes and
/// probes with a blank symbol are dropped. Probes sharing a symbol are
/// averaged per sample over their non-missing values. Output columns are
/// sorted by symbol.
///
/// An empty map means the platform has no usable annotation, and the matrix
/// is returned unchanged.
pub fn collapse_probes(matrix: &ExpressionMatrix, probe_to_gene: &ProbeToGeneMap) -> Result<ExpressionMatrix> {
    if probe_to_gene.is_empty() {
        return Ok(matrix.clone());
    }

    // Group probe columns by symbol
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut dropped = 0usize;
    for (j, probe) in matrix.gene_ids().iter().enumerate() {
        match probe_to_gene.gene_for(probe) {
            Some(symbol) => groups.entry(symbol).or_default().push(j),
            None => dropped += 1,
        }
    }

    let mut symbols: Vec<&str> = groups.keys().copied().collect();
    symbols.sort_unstable();

    let values = matrix.values();
    let n_samples = matrix.n_samples();
    let mut collapsed = Array2::from_elem((n_samples, symbols.len()), f64::NAN);

    for (new_j, symbol) in symbols.iter().enumerate() {
        let probe_cols = &groups[symbol];
        for i in 0..n_samples {
            let (sum, n) = probe_cols
                .iter()
                .map(|&j| values[[i, j]])
                .filter(|v| v.is_finite())
                .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
            if n > 0 {
                collapsed[[i, new_j]] = sum / n as f64;
            }
        }
    }

    log::debug!(
        "Collapsed {} probes onto {} genes ({} unmapped probes dropped)",
        matrix.n_genes() - dropped,
        symbols.len(),
        dropped
    );

    ExpressionMatrix::new(
        collapsed,
        matrix.sample_ids().to_vec(),
        symbols.into_iter().map(String::from).collect(),
    )
}
