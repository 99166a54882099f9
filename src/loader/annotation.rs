//! Probe-to-gene resolution from platform annotation tables

use crate::data::{AnnotationTable, ProbeToGeneMap};
use crate::inference::{infer_gene_symbol_column, infer_identifier_column, ColumnPriorities};

/// Name of the composite gene-assignment column used by Affymetrix gene/exon arrays
pub const GENE_ASSIGNMENT_COLUMN: &str = "gene_assignment";

/// Maximum length (exclusive) of a token accepted as a gene symbol
const MAX_SYMBOL_LEN: usize = 20;

/// Pull a gene symbol out of a composite gene-assignment string
///
/// The text is split on `///`, `//` and tabs; the first token that is not a
/// RefSeq transcript accession (`NM_`/`NR_`) and is shorter than 20
/// characters is returned.
///
/// Affymetrix writes `---` for probes without an assignment; that token is
/// returned as is. [`resolve_probe_map`] discards it through
/// `ColumnPriorities::placeholder_symbols` so unannotated probes are not
/// averaged into one pseudo-gene.
pub fn extract_gene_from_assignment(assignment: &str) -> Option<String> {
    assignment
        .trim()
        .split('\t')
        .flat_map(|field| field.split("//"))
        .map(|token| token.trim_matches(|c: char| c == '/' || c.is_whitespace()))
        .find(|token| {
            !token.is_empty()
                && !token.starts_with("NM_")
                && !token.starts_with("NR_")
                && token.chars().count() < MAX_SYMBOL_LEN
        })
        .map(String::from)
}

/// Build the probe -> gene map for a platform
///
/// Returns `None` when the table offers neither a gene symbol column nor a
/// gene-assignment column, or when no probe resolves to a usable symbol.
/// Placeholder symbols count as blank. A symbol column that turns out to be the
/// gene-assignment column is parsed token-wise rather than used verbatim.
pub fn resolve_probe_map(annotation: &AnnotationTable, priorities: &ColumnPriorities) -> Option<ProbeToGeneMap> {
    if annotation.is_empty() {
        return None;
    }
    let id_choice = infer_identifier_column(annotation, &priorities.identifier)?;
    let ids = annotation.column(&id_choice.name)?.cells();

    let symbol_choice = infer_gene_symbol_column(
        annotation,
        &priorities.gene_symbol,
        &priorities.gene_symbol_substrings,
    );

    let assignment = annotation
        .columns()
        .iter()
        .find(|c| c.name().eq_ignore_ascii_case(GENE_ASSIGNMENT_COLUMN));

    let (column, parse_assignment) = match symbol_choice {
        Some(choice) => {
            let column = annotation.column(&choice.name)?;
            let is_assignment = column.name().eq_ignore_ascii_case(GENE_ASSIGNMENT_COLUMN);
            (column, is_assignment)
        }
        None => (assignment?, true),
    };

    log::debug!(
        "Annotation: probes from '{}', genes from '{}'{}",
        id_choice.name,
        column.name(),
        if parse_assignment { " (parsed gene assignment)" } else { "" }
    );

    let is_placeholder = |symbol: &str| {
        priorities
            .placeholder_symbols
            .iter()
            .any(|p| p.eq_ignore_ascii_case(symbol))
    };

    let pairs = ids.iter().zip(column.cells()).map(|(probe, raw)| {
        let symbol = if parse_assignment {
            extract_gene_from_assignment(raw).unwrap_or_default()
        } else {
            raw.trim().to_string()
        };
        let symbol = if is_placeholder(&symbol) { String::new() } else { symbol };
        (probe.trim().to_string(), symbol)
    });

    let map = ProbeToGeneMap::from_pairs(pairs);
    if map.is_empty() {
        log::warn!("Annotation column '{}' maps no probe to a gene; probes are kept", column.name());
        return None;
    }
    Some(map)
}
