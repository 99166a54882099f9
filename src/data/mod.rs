//! Data structures for cohort harmonisation

mod collapse;
mod expression;
mod labels;
mod metadata;
mod probe_map;
mod table;

pub use collapse::collapse_probes;
pub use expression::ExpressionMatrix;
pub use labels::{Condition, LabelVector, CONTROL_LABEL};
pub use metadata::{MetadataValue, SampleMetadata};
pub use probe_map::ProbeToGeneMap;
pub use table::{is_missing, parse_cell, AnnotationTable, Column, ColumnKind, DataTable, SampleTable};
