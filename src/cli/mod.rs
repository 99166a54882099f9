//! Command-line interface for rust_cohort_deg

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{COHORT_IDS_1_ENV, COHORT_IDS_2_ENV};

#[derive(Parser)]
#[command(name = "rust_cohort_deg")]
#[command(version)]
#[command(about = "Cross-cohort expression harmonisation and differential expression")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Options shared by every command that tests for differential expression
#[derive(Args, Debug, Clone)]
pub struct TestOptions {
    /// Adjusted p-value threshold [default: 0.05]
    #[arg(long, default_value = "0.05")]
    pub pvalue_threshold: f64,

    /// Absolute log2 fold-change threshold [default: 0.5]
    #[arg(long, default_value = "0.5")]
    pub logfc_threshold: f64,

    /// Number of threads (0 = all cores)
    #[arg(long, default_value = "0")]
    pub threads: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load, merge and test two conditions, then intersect their DEGs
    #[command(
        long_about = "Load, merge and test two conditions, then intersect their DEGs\n\n\
            Each condition's cohorts are read from the data directory, restricted to\n\
            their shared genes, merged and batch-corrected with ComBat, and tested\n\
            Control vs disease with Student's t-test and Benjamini-Hochberg FDR.\n\
            Genes regulated in the same direction in both conditions are reported\n\
            as co-DEGs. With --validation1/--validation2 the co-DEGs are tested\n\
            again (t-test and ROC AUC) on a held-out cohort of each disease.",
        after_long_help = "\
Examples:
  rust_cohort_deg run -d data --cohorts1 GSE5281,GSE48350 --cohorts2 GSE55235 -o results

  # Check the co-DEGs on held-out cohorts
  rust_cohort_deg run -d data --cohorts1 GSE5281 --cohorts2 GSE55235 \\
      --validation1 GSE122063 --validation2 GSE55457

  # Cohort lists from an ids file (lines such as `AD: GSE5281, GSE48350`)
  rust_cohort_deg run -d data --ids-file cohorts.txt --disease1 AD --disease2 OA

  # Cohort lists from the environment
  COHORT_IDS_1=GSE5281 COHORT_IDS_2=GSE55235 rust_cohort_deg run -d data"
    )]
    Run {
        /// Directory holding one sub-directory per cohort
        #[arg(short, long,
            long_help = "Directory holding one sub-directory per cohort.\n\
                Each cohort directory contains metadata.json, samples/<sample>.tsv\n\
                and optionally annotation.tsv.")]
        data_dir: PathBuf,

        /// First disease label [default: AD]
        #[arg(long, default_value = "AD")]
        disease1: String,

        /// Cohort ids for the first disease (comma separated)
        #[arg(long, env = COHORT_IDS_1_ENV, value_delimiter = ',')]
        cohorts1: Vec<String>,

        /// Second disease label [default: OA]
        #[arg(long, default_value = "OA")]
        disease2: String,

        /// Cohort ids for the second disease (comma separated)
        #[arg(long, env = COHORT_IDS_2_ENV, value_delimiter = ',')]
        cohorts2: Vec<String>,

        /// Held-out cohort for the first disease, loaded unmerged to check the co-DEGs
        #[arg(long)]
        validation1: Option<String>,

        /// Held-out cohort for the second disease
        #[arg(long)]
        validation2: Option<String>,

        /// File with `LABEL: ID1, ID2` lines, used when ids are not given directly
        #[arg(long)]
        ids_file: Option<PathBuf>,

        /// Output directory [default: results]
        #[arg(short, long, default_value = "results")]
        output_dir: PathBuf,

        /// Identifier column to use instead of inferring one
        #[arg(long)]
        id_column: Option<String>,

        /// Value column to use instead of inferring one
        #[arg(long)]
        value_column: Option<String>,

        /// Only remove batch location shifts, not scale
        #[arg(long)]
        mean_only: bool,

        #[command(flatten)]
        test: TestOptions,
    },

    /// Test an already merged matrix
    #[command(
        long_about = "Test an already merged matrix\n\n\
            Reads a samples x genes matrix (first column sample ids) and a\n\
            two-column labels file, and writes the per-gene results table.",
        after_long_help = "\
Examples:
  rust_cohort_deg de -m AD_merged_expression.tsv -l AD_labels.csv -o AD_DEGs.csv"
    )]
    De {
        /// Samples x genes matrix (CSV or TSV)
        #[arg(short, long)]
        matrix: PathBuf,

        /// Sample labels (sample id, label)
        #[arg(short, long)]
        labels: PathBuf,

        /// Output file path [default: DEGs.csv]
        #[arg(short, long, default_value = "DEGs.csv")]
        output: PathBuf,

        #[command(flatten)]
        test: TestOptions,
    },
}
