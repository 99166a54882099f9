//! Expression matrix representation
//!
//! Rows are samples, columns are features (probe identifiers before
//! aggregation, gene symbols after). A feature that a sample did not report
//! is stored as NaN.

use std::collections::{HashMap, HashSet};

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{CohortError, Result};

/// Samples x genes expression values with row and column identifiers
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionMatrix {
    /// Values (samples x genes)
    values: Array2<f64>,
    /// Sample identifiers (`<cohortId>_<index>`)
    sample_ids: Vec<String>,
    /// Feature identifiers, unique
    gene_ids: Vec<String>,
}

impl ExpressionMatrix {
    /// Create a new matrix, checking dimensions and column uniqueness
    pub fn new(values: Array2<f64>, sample_ids: Vec<String>, gene_ids: Vec<String>) -> Result<Self> {
        let (n_samples, n_genes) = values.dim();

        if sample_ids.len() != n_samples {
            return Err(CohortError::DimensionMismatch {
                expected: format!("{} sample IDs", n_samples),
                got: format!("{} sample IDs", sample_ids.len()),
            });
        }

        if gene_ids.len() != n_genes {
            return Err(CohortError::DimensionMismatch {
                expected: format!("{} gene IDs", n_genes),
                got: format!("{} gene IDs", gene_ids.len()),
            });
        }

        let mut seen = HashSet::with_capacity(n_genes);
        for id in &gene_ids {
            if !seen.insert(id.as_str()) {
                return Err(CohortError::DuplicateLabel {
                    name: id.clone(),
                    context: "expression matrix columns".to_string(),
                });
            }
        }

        Ok(Self {
            values,
            sample_ids,
            gene_ids,
        })
    }

    /// A matrix with no samples and no genes
    pub fn empty() -> Self {
        Self {
            values: Array2::zeros((0, 0)),
            sample_ids: Vec::new(),
            gene_ids: Vec::new(),
        }
    }

    /// Assemble a matrix from per-sample `(feature, value)` series
    ///
    /// Columns are the union of features in first-seen order. A feature
    /// missing from a sample becomes NaN; a feature repeated within one
    /// sample keeps its first value.
    pub fn from_series(sample_ids: Vec<String>, series: Vec<Vec<(String, f64)>>) -> Result<Self> {
        if sample_ids.len() != series.len() {
            return Err(CohortError::DimensionMismatch {
                expected: format!("{} series", sample_ids.len()),
                got: format!("{} series", series.len()),
            });
        }

        let mut gene_ids: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for row in &series {
            for (gene, _) in row {
                if !index.contains_key(gene) {
                    index.insert(gene.clone(), gene_ids.len());
                    gene_ids.push(gene.clone());
                }
            }
        }

        let mut values = Array2::from_elem((series.len(), gene_ids.len()), f64::NAN);
        for (i, row) in series.iter().enumerate() {
            let mut duplicates = 0usize;
            for (gene, value) in row {
                let j = index[gene];
                if values[[i, j]].is_nan() {
                    values[[i, j]] = *value;
                } else {
                    duplicates += 1;
                }
            }
            if duplicates > 0 {
                log::debug!(
                    "Sample '{}' repeats {} feature identifiers; first values kept",
                    sample_ids[i],
                    duplicates
                );
            }
        }

        Self::new(values, sample_ids, gene_ids)
    }

    /// Stack matrices with identical column order on top of each other
    pub fn vstack(parts: &[ExpressionMatrix]) -> Result<Self> {
        let Some(first) = parts.first() else {
            return Ok(Self::empty());
        };
        let gene_ids = first.gene_ids.clone();
        for part in &parts[1..] {
            if part.gene_ids != gene_ids {
                return Err(CohortError::DimensionMismatch {
                    expected: format!("columns {:?}", gene_ids),
                    got: format!("columns {:?}", part.gene_ids),
                });
            }
        }

        let n_rows: usize = parts.iter().map(|p| p.n_samples()).sum();
        let mut values = Array2::from_elem((n_rows, gene_ids.len()), f64::NAN);
        let mut sample_ids = Vec::with_capacity(n_rows);
        let mut offset = 0;
        for part in parts {
            for (i, row) in part.values.axis_iter(Axis(0)).enumerate() {
                values.row_mut(offset + i).assign(&row);
            }
            offset += part.n_samples();
            sample_ids.extend(part.sample_ids.iter().cloned());
        }

        Self::new(values, sample_ids, gene_ids)
    }

    /// Number of samples (rows)
    pub fn n_samples(&self) -> usize {
        self.values.nrows()
    }

    /// Number of genes (columns)
    pub fn n_genes(&self) -> usize {
        self.values.ncols()
    }

    /// True when there are no rows or no columns
    pub fn is_empty(&self) -> bool {
        self.n_samples() == 0 || self.n_genes() == 0
    }

    /// Values as a view
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Sample IDs
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Gene IDs
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Values of one gene across samples
    pub fn gene_values(&self, gene_idx: usize) -> ArrayView1<'_, f64> {
        self.values.column(gene_idx)
    }

    /// Values of one sample across genes
    pub fn sample_values(&self, sample_idx: usize) -> ArrayView1<'_, f64> {
        self.values.row(sample_idx)
    }

    /// Column index of a gene
    pub fn gene_index(&self, gene_id: &str) -> Option<usize> {
        self.gene_ids.iter().position(|id| id == gene_id)
    }

    /// Replace the values, keeping identifiers
    pub fn with_values(&self, values: Array2<f64>) -> Result<Self> {
        Self::new(values, self.sample_ids.clone(), self.gene_ids.clone())
    }

    /// Subset to specific gene columns, in the given order
    pub fn subset_genes(&self, gene_indices: &[usize]) -> Result<Self> {
        let values = self.values.select(Axis(1), gene_indices);
        let gene_ids = gene_indices.iter().map(|&j| self.gene_ids[j].clone()).collect();
        Self::new(values, self.sample_ids.clone(), gene_ids)
    }

    /// Subset to named genes, in the given order; every name must exist
    pub fn select_genes(&self, names: &[String]) -> Result<Self> {
        let lookup: HashMap<&str, usize> = self
            .gene_ids
            .iter()
            .enumerate()
            .map(|(j, g)| (g.as_str(), j))
            .collect();
        let indices = names
            .iter()
            .map(|name| {
                lookup
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| CohortError::ColumnNotFound { name: name.clone() })
            })
            .collect::<Result<Vec<usize>>>()?;
        self.subset_genes(&indices)
    }
}
