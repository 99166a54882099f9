//! Differential expression results

use std::fmt;

use serde::Serialize;

/// Regulation call for one gene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Regulation {
    #[serde(rename = "Upregulated")]
    Up,
    #[serde(rename = "Downregulated")]
    Down,
    #[serde(rename = "Not Significant")]
    NotSignificant,
}

impl Regulation {
    /// Classify from an adjusted p-value and a log2 fold change
    ///
    /// Both comparisons are strict; NaN inputs are never significant.
    pub fn classify(padj: f64, log2_fold_change: f64, pvalue_threshold: f64, logfc_threshold: f64) -> Self {
        if !(padj < pvalue_threshold) {
            Regulation::NotSignificant
        } else if log2_fold_change > logfc_threshold {
            Regulation::Up
        } else if log2_fold_change < -logfc_threshold {
            Regulation::Down
        } else {
            Regulation::NotSignificant
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Regulation::Up => "Upregulated",
            Regulation::Down => "Downregulated",
            Regulation::NotSignificant => "Not Significant",
        }
    }
}

impl fmt::Display for Regulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-gene results of one Control vs disease comparison
///
/// Every vector is indexed like `gene_ids`, which follows the column order
/// of the tested matrix.
#[derive(Debug, Clone)]
pub struct DifferentialResult {
    pub gene_ids: Vec<String>,
    pub mean_control: Vec<f64>,
    pub mean_disease: Vec<f64>,
    pub std_control: Vec<f64>,
    pub std_disease: Vec<f64>,
    /// log2((mean_disease + eps) / (mean_control + eps))
    pub log2_fold_changes: Vec<f64>,
    /// Student's t, positive when the disease group is higher
    pub t_statistics: Vec<f64>,
    pub pvalues: Vec<f64>,
    /// Benjamini-Hochberg adjusted p-values
    pub padj: Vec<f64>,
    pub regulation: Vec<Regulation>,
    /// Disease label compared against Control
    pub disease_label: String,
    /// Other disease labels whose samples were left out
    pub excluded_labels: Vec<String>,
    pub n_control: usize,
    pub n_disease: usize,
    pub pvalue_threshold: f64,
    pub logfc_threshold: f64,
}

impl DifferentialResult {
    pub fn n_genes(&self) -> usize {
        self.gene_ids.len()
    }

    /// Genes with the given call, in result order
    pub fn genes_with(&self, call: Regulation) -> Vec<&str> {
        self.gene_ids
            .iter()
            .zip(&self.regulation)
            .filter(|(_, r)| **r == call)
            .map(|(g, _)| g.as_str())
            .collect()
    }

    pub fn upregulated_genes(&self) -> Vec<&str> {
        self.genes_with(Regulation::Up)
    }

    pub fn downregulated_genes(&self) -> Vec<&str> {
        self.genes_with(Regulation::Down)
    }

    /// Regulation call of a gene
    pub fn regulation_of(&self, gene_id: &str) -> Option<Regulation> {
        self.gene_ids.iter().position(|g| g == gene_id).map(|i| self.regulation[i])
    }

    pub fn summary(&self) -> DeSummary {
        DeSummary {
            disease_label: self.disease_label.clone(),
            total_genes: self.n_genes(),
            genes_tested: self.pvalues.iter().filter(|p| !p.is_nan()).count(),
            upregulated: self.upregulated_genes().len(),
            downregulated: self.downregulated_genes().len(),
            n_control: self.n_control,
            n_disease: self.n_disease,
            pvalue_threshold: self.pvalue_threshold,
            logfc_threshold: self.logfc_threshold,
        }
    }
}

/// Counts from one differential expression run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeSummary {
    pub disease_label: String,
    pub total_genes: usize,
    pub genes_tested: usize,
    pub upregulated: usize,
    pub downregulated: usize,
    pub n_control: usize,
    pub n_disease: usize,
    pub pvalue_threshold: f64,
    pub logfc_threshold: f64,
}

impl DeSummary {
    pub fn total_degs(&self) -> usize {
        self.upregulated + self.downregulated
    }
}

impl fmt::Display for DeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} vs Control ({} vs {} samples)", self.disease_label, self.n_disease, self.n_control)?;
        writeln!(f, "Genes: {} ({} tested)", self.total_genes, self.genes_tested)?;
        writeln!(
            f,
            "DEGs (padj < {}, |log2FC| > {}): {}",
            self.pvalue_threshold,
            self.logfc_threshold,
            self.total_degs()
        )?;
        writeln!(f, "  Upregulated: {}", self.upregulated)?;
        writeln!(f, "  Downregulated: {}", self.downregulated)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(Regulation::classify(0.01, 1.0, 0.05, 0.5), Regulation::Up);
        assert_eq!(Regulation::classify(0.01, -1.0, 0.05, 0.5), Regulation::Down);
        assert_eq!(Regulation::classify(0.01, 0.5, 0.05, 0.5), Regulation::NotSignificant);
        assert_eq!(Regulation::classify(0.05, 2.0, 0.05, 0.5), Regulation::NotSignificant);
        assert_eq!(Regulation::classify(f64::NAN, 2.0, 0.05, 0.5), Regulation::NotSignificant);
    }

    #[test]
    fn test_regulation_labels() {
        assert_eq!(Regulation::Up.to_string(), "Upregulated");
        assert_eq!(Regulation::NotSignificant.to_string(), "Not Significant");
        assert_eq!(serde_json::to_string(&Regulation::Down).unwrap(), "\"Downregulated\"");
    }
}
