//! File input and output

mod source;
mod tables;

pub use source::{DirectorySource, ANNOTATION_FILE, METADATA_FILE, SAMPLES_DIR};
pub use tables::{
    detect_delimiter, parse_table, read_expression_matrix, read_labels, read_table, write_co_degs,
    write_differential_results, write_expression_matrix, write_labels, write_validation,
};
