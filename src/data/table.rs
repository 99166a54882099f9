//! Rectangular tables with column names that are only known at runtime
//!
//! Per-sample measurement tables and platform annotation tables arrive with
//! whatever headers the submitting lab chose. `DataTable` keeps them as an
//! ordered sequence of named columns; every lookup by name is checked and
//! returns `None` or `ColumnNotFound` rather than panicking.

use std::collections::HashSet;

use crate::error::{CohortError, Result};

/// Per-sample measurement table (feature rows, unknown columns)
pub type SampleTable = DataTable;

/// Platform annotation table keyed by probe identifier
pub type AnnotationTable = DataTable;

/// Parse a raw cell as a number, treating the usual missing markers as absent
pub fn parse_cell(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if is_missing(s) {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// True for the cells read as missing: empty, `NA`, `NaN`, `null`
pub fn is_missing(raw: &str) -> bool {
    let s = raw.trim();
    s.is_empty()
        || s.eq_ignore_ascii_case("na")
        || s.eq_ignore_ascii_case("nan")
        || s.eq_ignore_ascii_case("null")
}

/// Inferred storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every non-missing cell parses as a number (and at least one is present)
    Numeric,
    /// Anything else
    Text,
}

/// A named column of raw cells
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    cells: Vec<String>,
    kind: ColumnKind,
}

impl Column {
    fn new(name: String, cells: Vec<String>) -> Self {
        let mut any_value = false;
        let numeric = cells.iter().all(|c| {
            let s = c.trim();
            if is_missing(s) {
                return true;
            }
            any_value = true;
            s.parse::<f64>().is_ok()
        });
        let kind = if numeric && any_value {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        };
        Self { name, cells, kind }
    }

    /// Column header
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inferred column type
    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    /// Whether the column is numeric-typed
    pub fn is_numeric(&self) -> bool {
        self.kind == ColumnKind::Numeric
    }

    /// Raw cell text, one per row
    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// Cells coerced to numbers; failed coercions become `None`
    pub fn numeric_values(&self) -> Vec<Option<f64>> {
        self.cells.iter().map(|c| parse_cell(c)).collect()
    }
}

/// An ordered set of equally long, uniquely named columns
#[derive(Debug, Clone, Default)]
pub struct DataTable {
    columns: Vec<Column>,
    n_rows: usize,
}

impl DataTable {
    /// Build a table from a header and row-major records
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let n_cols = header.len();
        let mut cells: Vec<Vec<String>> = vec![Vec::with_capacity(rows.len()); n_cols];
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                return Err(CohortError::DimensionMismatch {
                    expected: format!("{} fields", n_cols),
                    got: format!("{} fields in row {}", row.len(), i + 1),
                });
            }
            for (j, cell) in row.into_iter().enumerate() {
                cells[j].push(cell);
            }
        }
        Self::from_columns(header.into_iter().zip(cells).collect())
    }

    /// Build a table from `(name, cells)` pairs
    pub fn from_columns(columns: Vec<(String, Vec<String>)>) -> Result<Self> {
        let n_rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(columns.len());
        for (name, cells) in columns {
            if cells.len() != n_rows {
                return Err(CohortError::DimensionMismatch {
                    expected: format!("{} rows", n_rows),
                    got: format!("{} rows in column '{}'", cells.len(), name),
                });
            }
            if !seen.insert(name.clone()) {
                return Err(CohortError::DuplicateLabel {
                    name,
                    context: "table header".to_string(),
                });
            }
            out.push(Column::new(name, cells));
        }
        Ok(Self { columns: out, n_rows })
    }

    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// True when the table has no rows or no columns
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0 || self.columns.is_empty()
    }

    /// Column headers in table order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// All columns in table order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column at a position
    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Column by exact name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column by exact name, or `ColumnNotFound`
    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name).ok_or_else(|| CohortError::ColumnNotFound {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_column_kinds() {
        let table = DataTable::new(
            s(&["ID_REF", "VALUE", "DETECTION"]),
            vec![s(&["p1", "1.5", "P"]), s(&["p2", "NA", "A"]), s(&["p3", "2e3", "P"])],
        )
        .unwrap();

        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.column("ID_REF").unwrap().kind(), ColumnKind::Text);
        assert_eq!(table.column("VALUE").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(
            table.column("VALUE").unwrap().numeric_values(),
            vec![Some(1.5), None, Some(2000.0)]
        );
    }

    #[test]
    fn test_all_missing_column_is_text() {
        let table =
            DataTable::from_columns(vec![("x".to_string(), s(&["", "NA"]))]).unwrap();
        assert!(!table.column("x").unwrap().is_numeric());
    }

    #[test]
    fn test_ragged_row_rejected() {
        let result = DataTable::new(s(&["a", "b"]), vec![s(&["1"])]);
        assert!(matches!(result, Err(CohortError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_duplicate_header_rejected() {
        let result = DataTable::new(s(&["a", "a"]), vec![s(&["1", "2"])]);
        assert!(matches!(result, Err(CohortError::DuplicateLabel { .. })));
    }

    #[test]
    fn test_missing_column_is_explicit() {
        let table = DataTable::new(s(&["a"]), vec![s(&["1"])]).unwrap();
        assert!(table.column("b").is_none());
        assert!(matches!(
            table.require_column("b"),
            Err(CohortError::ColumnNotFound { .. })
        ));
    }
}
