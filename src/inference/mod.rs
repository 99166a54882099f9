//! Heuristic inference of column roles and sample labels

mod labels;
mod schema;

pub use labels::{infer_label, LabelBasis, LabelCall, LabelRules};
pub use schema::{
    infer_gene_symbol_column, infer_identifier_column, infer_value_column, ColumnChoice, ColumnPriorities,
    InferenceSource,
};
