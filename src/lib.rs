//! rust_cohort_deg: cross-cohort gene expression harmonisation and
//! differential expression
//!
//! Public microarray cohorts arrive with heterogeneous schemas, probe-level
//! identifiers and free-text sample descriptions. This crate infers the
//! columns and Control/disease labels of each cohort, collapses probes to
//! gene symbols, merges cohorts over their shared genes with ComBat batch
//! correction, tests every gene with Student's t-test and BH FDR, and
//! intersects the DEGs of two conditions. Shared genes can then be checked
//! on held-out cohorts with a t-test and ROC AUC.
//!
//! # Example
//!
//! ```ignore
//! use rust_cohort_deg::io::DirectorySource;
//! use rust_cohort_deg::prelude::*;
//!
//! let source = DirectorySource::new("data")?;
//! let ad = ConditionRequest::new("AD", vec!["GSE5281".into(), "GSE48350".into()]);
//! let oa = ConditionRequest::new("OA", vec!["GSE55235".into()]);
//!
//! let context = run_pipeline(&source, &ad, &oa, &PipelineSettings::default())?;
//! let co_degs = context.co_degs();
//! ```

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod inference;
pub mod intersect;
pub mod io;
pub mod loader;
pub mod merge;
pub mod pipeline;
pub mod stats;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::data::{collapse_probes, Condition, ExpressionMatrix, LabelVector, ProbeToGeneMap, SampleMetadata};
    pub use crate::error::{CohortError, Result};
    pub use crate::inference::{infer_label, ColumnPriorities, LabelRules};
    pub use crate::intersect::{intersect_degs, CoDegSet};
    pub use crate::loader::{load_cohort, load_cohorts, CohortSource, LoaderConfig};
    pub use crate::merge::{merge_cohorts, CombatParams, CorrectionOutcome, MergedCohorts};
    pub use crate::pipeline::{
        run_condition, run_pipeline, validate_on_cohort, ConditionRequest, PipelineContext, PipelineSettings, ValidationRun,
    };
    pub use crate::testing::{differential_expression, validate_genes, DeParams, DifferentialResult, GeneValidation, Regulation};
}
