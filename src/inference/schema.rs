//! Column-role inference for tables without a fixed schema
//!
//! Every function takes its priority lists as parameters so a data source
//! can swap in its own vocabulary. Matching against a priority list is exact
//! and ASCII case-insensitive; the first list entry present in the table wins.

use crate::data::DataTable;

/// Priority-ordered column names for each role
#[derive(Debug, Clone)]
pub struct ColumnPriorities {
    /// Feature identifier columns
    pub identifier: Vec<String>,
    /// Measurement value columns
    pub value: Vec<String>,
    /// Gene symbol columns in annotation tables
    pub gene_symbol: Vec<String>,
    /// Substrings tried when no gene symbol column matches exactly
    pub gene_symbol_substrings: Vec<String>,
    /// Annotation values that stand for "no gene", compared case-insensitively
    pub placeholder_symbols: Vec<String>,
}

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnPriorities {
    fn default() -> Self {
        Self {
            identifier: strings(&["ID_REF", "ID", "PROBEID", "REF"]),
            value: strings(&[
                "VALUE",
                "Signal",
                "CH1_INTENSITY",
                "RPKM",
                "TPM",
                "raw_value",
                "norm_value",
            ]),
            gene_symbol: strings(&[
                "Gene symbol",
                "GENE_SYMBOL",
                "Gene_Symbol",
                "GeneSymbol",
                "GENE_NAME",
                "Gene name",
                "Symbol",
                "Gene",
                "ILMN_Gene",
                "GeneName",
            ]),
            gene_symbol_substrings: strings(&["symbol", "gene"]),
            placeholder_symbols: strings(&["---"]),
        }
    }
}

/// How a column choice was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceSource {
    /// Named by the caller; nothing was inferred
    Override,
    /// Exact match against the priority list
    PriorityList,
    /// First numeric column that is not identifier-like
    NumericScan,
    /// Column name contains one of the fallback substrings
    SubstringMatch,
    /// Nothing matched; the first column was taken
    FirstColumn,
    /// Nothing matched; the second column was taken by position
    PositionalFallback,
}

/// A resolved column together with the rule that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChoice {
    pub name: String,
    pub source: InferenceSource,
}

impl ColumnChoice {
    pub(crate) fn new(name: &str, source: InferenceSource) -> Self {
        Self {
            name: name.to_string(),
            source,
        }
    }

    /// True when the choice came from a positional default rather than a name
    pub fn is_fallback(&self) -> bool {
        matches!(
            self.source,
            InferenceSource::FirstColumn | InferenceSource::PositionalFallback
        )
    }
}

fn match_priority<'a>(table: &'a DataTable, priorities: &[String]) -> Option<&'a str> {
    let names = table.column_names();
    priorities.iter().find_map(|wanted| {
        names
            .iter()
            .find(|name| name.eq_ignore_ascii_case(wanted))
            .copied()
    })
}

/// Which column holds the feature identifier
///
/// Falls back to the first column. Returns `None` only for a table without
/// columns.
pub fn infer_identifier_column(table: &DataTable, identifier_names: &[String]) -> Option<ColumnChoice> {
    if let Some(name) = match_priority(table, identifier_names) {
        return Some(ColumnChoice::new(name, InferenceSource::PriorityList));
    }
    table
        .column_at(0)
        .map(|c| ColumnChoice::new(c.name(), InferenceSource::FirstColumn))
}

/// Which column holds the measurement value
///
/// Tries the value priority list, then the first numeric column whose name
/// is not one of `identifier_names`, then the second column by position.
/// The positional fallback is logged at warn level because it can select a
/// non-measurement column. Returns `None` for tables with fewer than two
/// columns when nothing else matched.
pub fn infer_value_column(
    table: &DataTable,
    value_names: &[String],
    identifier_names: &[String],
) -> Option<ColumnChoice> {
    if let Some(name) = match_priority(table, value_names) {
        return Some(ColumnChoice::new(name, InferenceSource::PriorityList));
    }

    let numeric = table.columns().iter().find(|c| {
        let id_like = identifier_names
            .iter()
            .any(|id| id.eq_ignore_ascii_case(c.name()));
        !id_like && c.is_numeric()
    });
    if let Some(column) = numeric {
        return Some(ColumnChoice::new(column.name(), InferenceSource::NumericScan));
    }

    let fallback = table.column_at(1)?;
    log::warn!(
        "No value column recognised among {:?}; falling back to second column '{}'",
        table.column_names(),
        fallback.name()
    );
    Some(ColumnChoice::new(fallback.name(), InferenceSource::PositionalFallback))
}

/// Which annotation column holds gene symbols, if any
pub fn infer_gene_symbol_column(
    table: &DataTable,
    symbol_names: &[String],
    substrings: &[String],
) -> Option<ColumnChoice> {
    if let Some(name) = match_priority(table, symbol_names) {
        return Some(ColumnChoice::new(name, InferenceSource::PriorityList));
    }
    table
        .column_names()
        .into_iter()
        .find(|name| {
            let lower = name.to_lowercase();
            substrings.iter().any(|s| lower.contains(&s.to_lowercase()))
        })
        .map(|name| ColumnChoice::new(name, InferenceSource::SubstringMatch))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(header: &[&str], row: &[&str]) -> DataTable {
        DataTable::new(strings(header), vec![strings(row)]).unwrap()
    }

    #[test]
    fn test_identifier_priority_case_insensitive() {
        let p = ColumnPriorities::default();
        let t = table(&["VALUE", "id_ref"], &["1.0", "p1"]);
        let choice = infer_identifier_column(&t, &p.identifier).unwrap();
        assert_eq!(choice.name, "id_ref");
        assert_eq!(choice.source, InferenceSource::PriorityList);
    }

    #[test]
    fn test_identifier_priority_order() {
        let p = ColumnPriorities::default();
        // "ID_REF" outranks "ID" regardless of column order
        let t = table(&["ID", "ID_REF"], &["a", "b"]);
        assert_eq!(infer_identifier_column(&t, &p.identifier).unwrap().name, "ID_REF");
    }

    #[test]
    fn test_identifier_falls_back_to_first_column() {
        let p = ColumnPriorities::default();
        let t = table(&["probe_name", "intensity"], &["p1", "3.2"]);
        let choice = infer_identifier_column(&t, &p.identifier).unwrap();
        assert_eq!(choice.name, "probe_name");
        assert!(choice.is_fallback());
        assert!(infer_identifier_column(&DataTable::default(), &p.identifier).is_none());
    }

    #[test]
    fn test_value_column_priority() {
        let p = ColumnPriorities::default();
        let t = table(&["ID_REF", "Detection", "signal"], &["p1", "0.01", "8.1"]);
        let choice = infer_value_column(&t, &p.value, &p.identifier).unwrap();
        assert_eq!(choice.name, "signal");
        assert!(!choice.is_fallback());
    }

    #[test]
    fn test_value_column_numeric_scan_skips_identifier() {
        let p = ColumnPriorities::default();
        let t = table(&["ID", "call", "intensity"], &["1234", "P", "8.1"]);
        let choice = infer_value_column(&t, &p.value, &p.identifier).unwrap();
        assert_eq!(choice.name, "intensity");
        assert_eq!(choice.source, InferenceSource::NumericScan);
    }

    #[test]
    fn test_value_column_positional_fallback_is_flagged() {
        let p = ColumnPriorities::default();
        let t = table(&["probe", "call", "note"], &["p1", "P", "x"]);
        let choice = infer_value_column(&t, &p.value, &p.identifier).unwrap();
        assert_eq!(choice.name, "call");
        assert_eq!(choice.source, InferenceSource::PositionalFallback);
        assert!(choice.is_fallback());

        let single = table(&["probe"], &["p1"]);
        assert!(infer_value_column(&single, &p.value, &p.identifier).is_none());
    }

    #[test]
    fn test_gene_symbol_column() {
        let p = ColumnPriorities::default();
        let exact = table(&["ID", "SYMBOL", "Gene Title"], &["p1", "APP", "amyloid"]);
        assert_eq!(
            infer_gene_symbol_column(&exact, &p.gene_symbol, &p.gene_symbol_substrings)
                .unwrap()
                .name,
            "SYMBOL"
        );

        let substring = table(&["ID", "gene_assignment"], &["p1", "NM_1 // APP"]);
        let choice =
            infer_gene_symbol_column(&substring, &p.gene_symbol, &p.gene_symbol_substrings).unwrap();
        assert_eq!(choice.name, "gene_assignment");
        assert_eq!(choice.source, InferenceSource::SubstringMatch);

        let none = table(&["ID", "SEQUENCE"], &["p1", "ACGT"]);
        assert!(infer_gene_symbol_column(&none, &p.gene_symbol, &p.gene_symbol_substrings).is_none());
    }

    #[test]
    fn test_inference_is_deterministic() {
        let p = ColumnPriorities::default();
        let t = table(&["x", "y", "z"], &["a", "1", "2"]);
        let first = infer_value_column(&t, &p.value, &p.identifier);
        for _ in 0..5 {
            assert_eq!(infer_value_column(&t, &p.value, &p.identifier), first);
        }
    }
}
