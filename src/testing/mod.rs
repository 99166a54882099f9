//! Statistical testing for differential expression

mod differential;
mod fdr;
mod results;
mod ttest;
mod validation;

pub use differential::{differential_expression, DeParams};
pub use fdr::benjamini_hochberg;
pub use results::{DeSummary, DifferentialResult, Regulation};
pub use ttest::{calculate_pvalue_t, student_t_test, TTest};
pub use validation::{rank_auc, validate_genes, GeneValidation};
