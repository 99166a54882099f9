//! Turn one raw repository record into an expression matrix and labels

use crate::data::{collapse_probes, Condition, ExpressionMatrix, LabelVector, SampleTable};
use crate::error::{CohortError, Result};
use crate::inference::{infer_identifier_column, infer_label, infer_value_column, ColumnChoice, InferenceSource};

use super::annotation::resolve_probe_map;
use super::{LoadDiagnostics, LoadedCohort, LoaderConfig, RawCohort};

/// Identifier and value columns shared by every sample of a cohort
#[derive(Debug, Clone)]
struct CohortColumns {
    identifier: String,
    value: String,
}

/// Resolve the cohort's columns from its first non-empty sample table
fn resolve_columns(table: &SampleTable, config: &LoaderConfig, diagnostics: &mut LoadDiagnostics) -> Option<CohortColumns> {
    let priorities = &config.priorities;
    let identifier = match &config.identifier_column {
        Some(name) => Some(ColumnChoice::new(name, InferenceSource::Override)),
        None => infer_identifier_column(table, &priorities.identifier),
    };
    let value = match &config.value_column {
        Some(name) => Some(ColumnChoice::new(name, InferenceSource::Override)),
        None => infer_value_column(table, &priorities.value, &priorities.identifier),
    };

    diagnostics.identifier_column = identifier.clone();
    diagnostics.value_column = value.clone();

    Some(CohortColumns {
        identifier: identifier?.name,
        value: value?.name,
    })
}

/// Extract the `(feature, value)` series of one sample
fn extract_series(table: &SampleTable, sample_id: &str, columns: &CohortColumns) -> Result<Vec<(String, f64)>> {
    let ids = table.column(&columns.identifier).ok_or_else(|| CohortError::SchemaMismatch {
        sample_id: sample_id.to_string(),
        column: columns.identifier.clone(),
    })?;
    let values = table.column(&columns.value).ok_or_else(|| CohortError::SchemaMismatch {
        sample_id: sample_id.to_string(),
        column: columns.value.clone(),
    })?;

    Ok(ids
        .cells()
        .iter()
        .zip(values.numeric_values())
        .filter_map(|(id, value)| {
            let id = id.trim();
            match value {
                Some(v) if !id.is_empty() => Some((id.to_string(), v)),
                _ => None,
            }
        })
        .collect())
}

/// Build a cohort from an already-fetched raw record
///
/// Columns are inferred once, from the first non-empty sample, and reused
/// for the rest of the cohort. Empty samples and samples missing either
/// column are skipped and counted in the diagnostics. When the platform
/// annotation maps probes to genes, samples reporting no mapped probe are
/// skipped too, so every row keeps at least one value after aggregation. A
/// cohort with no usable sample yields an empty matrix and empty labels.
pub fn build_cohort(cohort_id: &str, raw: RawCohort, disease_label: &str, config: &LoaderConfig) -> Result<LoadedCohort> {
    let mut diagnostics = LoadDiagnostics::default();

    let probe_map = raw
        .annotation
        .as_ref()
        .and_then(|table| resolve_probe_map(table, &config.priorities));

    let mut columns: Option<Option<CohortColumns>> = None;
    let mut row_ids = Vec::new();
    let mut series = Vec::new();
    let mut conditions = Vec::new();
    let mut accessions = Vec::new();

    for sample in &raw.samples {
        let Some(table) = sample.table.as_ref().filter(|t| !t.is_empty()) else {
            diagnostics.skipped_empty += 1;
            continue;
        };

        let resolved = columns.get_or_insert_with(|| {
            let resolved = resolve_columns(table, config, &mut diagnostics);
            if resolved.is_none() {
                log::warn!(
                    "{}: could not resolve identifier/value columns from sample '{}' ({:?})",
                    cohort_id,
                    sample.sample_id,
                    table.column_names()
                );
            }
            resolved
        });
        let Some(resolved) = resolved.as_ref() else {
            diagnostics.skipped_schema += 1;
            continue;
        };

        let sample_series = match extract_series(table, &sample.sample_id, resolved) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("{}: skipping sample: {}", cohort_id, e);
                diagnostics.skipped_schema += 1;
                continue;
            }
        };
        if sample_series.is_empty() {
            diagnostics.skipped_empty += 1;
            continue;
        }
        if let Some(map) = probe_map.as_ref() {
            if !sample_series.iter().any(|(probe, _)| map.gene_for(probe).is_some()) {
                log::warn!("{}: sample '{}' has no probe mapped to a gene", cohort_id, sample.sample_id);
                diagnostics.skipped_unmapped += 1;
                continue;
            }
        }

        let call = infer_label(&sample.metadata, disease_label, &config.label_rules);
        if !call.is_confident() {
            diagnostics.uncertain_labels += 1;
            log::debug!(
                "{}: sample '{}' labelled {} by {:?}",
                cohort_id,
                sample.sample_id,
                call.condition,
                call.basis
            );
        }

        row_ids.push(format!("{}_{}", cohort_id, series.len()));
        series.push(sample_series);
        conditions.push(call.condition);
        accessions.push(sample.sample_id.clone());
    }

    if series.is_empty() {
        log::warn!("{}: no samples yielded expression data", cohort_id);
        return Ok(LoadedCohort {
            cohort_id: cohort_id.to_string(),
            matrix: ExpressionMatrix::empty(),
            labels: LabelVector::empty(),
            probe_map,
            source_samples: Vec::new(),
            diagnostics,
        });
    }

    let mut matrix = ExpressionMatrix::from_series(row_ids.clone(), series)?;
    let labels = LabelVector::new(row_ids, conditions)?;

    if let Some(map) = probe_map.as_ref() {
        matrix = collapse_probes(&matrix, map)?;
    }

    let n_control = labels.labels().iter().filter(|c| c.is_control()).count();
    log::info!(
        "{}: {} samples ({} Control, {} {}), {} features",
        cohort_id,
        matrix.n_samples(),
        n_control,
        labels.len() - n_control,
        Condition::Disease(disease_label.to_string()),
        matrix.n_genes()
    );

    Ok(LoadedCohort {
        cohort_id: cohort_id.to_string(),
        matrix,
        labels,
        probe_map,
        source_samples: accessions,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataTable, SampleMetadata};
    use crate::loader::RawSample;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn sample_table(header: &[&str], rows: &[&[&str]]) -> DataTable {
        DataTable::new(strings(header), rows.iter().map(|r| strings(r)).collect()).unwrap()
    }

    fn sample(id: &str, table: Option<DataTable>, title: &str) -> RawSample {
        RawSample {
            sample_id: id.to_string(),
            table,
            metadata: SampleMetadata::new().with("title", &[title]),
        }
    }

    #[test]
    fn test_build_cohort_with_annotation() {
        let annotation = sample_table(
            &["ID", "Gene Symbol"],
            &[&["p1", "APP"], &["p2", "APP"], &["p3", "MAPT"], &["p4", ""]],
        );
        let rows: &[&[&str]] = &[&["p1", "2.0"], &["p2", "4.0"], &["p3", "5.0"], &["p4", "9.0"]];
        let raw = RawCohort {
            annotation: Some(annotation),
            samples: vec![
                sample("GSM1", Some(sample_table(&["ID_REF", "VALUE"], rows)), "control brain"),
                sample("GSM2", None, "empty"),
                sample("GSM3", Some(sample_table(&["ID_REF", "VALUE"], rows)), "AD brain"),
            ],
        };

        let cohort = build_cohort("GSE1", raw, "AD", &LoaderConfig::default()).unwrap();

        assert_eq!(cohort.matrix.sample_ids(), &strings(&["GSE1_0", "GSE1_1"])[..]);
        assert_eq!(cohort.matrix.gene_ids(), &strings(&["APP", "MAPT"])[..]);
        assert_eq!(cohort.matrix.values()[[0, 0]], 3.0);
        assert_eq!(cohort.labels.labels()[0], Condition::Control);
        assert_eq!(cohort.labels.labels()[1], Condition::Disease("AD".to_string()));
        assert_eq!(cohort.source_samples, strings(&["GSM1", "GSM3"]));
        assert_eq!(cohort.diagnostics.skipped_empty, 1);
        assert!(cohort.probe_map.is_some());
    }

    #[test]
    fn test_columns_inferred_once_and_drift_skipped() {
        let raw = RawCohort {
            annotation: None,
            samples: vec![
                sample("GSM1", Some(sample_table(&["ID_REF", "VALUE"], &[&["a", "1"], &["b", "x"]])), "control"),
                // Different schema: lacks VALUE, so it is skipped rather than re-inferred
                sample("GSM2", Some(sample_table(&["ID_REF", "TPM"], &[&["a", "3"]])), "AD"),
                sample("GSM3", Some(sample_table(&["VALUE", "ID_REF"], &[&["7", "a"], &["8", "b"]])), "AD"),
            ],
        };

        let cohort = build_cohort("GSE2", raw, "AD", &LoaderConfig::default()).unwrap();

        assert_eq!(cohort.matrix.n_samples(), 2);
        assert_eq!(cohort.diagnostics.skipped_schema, 1);
        // Non-numeric "x" was dropped for GSM1, so b is missing there
        assert!(cohort.matrix.values()[[0, 1]].is_nan());
        assert_eq!(cohort.matrix.values()[[1, 1]], 8.0);
        // No annotation: probe identifiers are kept
        assert_eq!(cohort.matrix.gene_ids(), &strings(&["a", "b"])[..]);
        assert!(cohort.probe_map.is_none());
    }

    #[test]
    fn test_empty_cohort_is_not_an_error() {
        let raw = RawCohort {
            annotation: None,
            samples: vec![sample("GSM1", None, "control")],
        };
        let cohort = build_cohort("GSE3", raw, "AD", &LoaderConfig::default()).unwrap();
        assert!(cohort.matrix.is_empty());
        assert!(cohort.labels.is_empty());
    }

    #[test]
    fn test_pinned_columns_override_inference() {
        let config = LoaderConfig {
            identifier_column: Some("probe".to_string()),
            value_column: Some("log_ratio".to_string()),
            ..LoaderConfig::default()
        };
        let raw = RawCohort {
            annotation: None,
            samples: vec![sample(
                "GSM1",
                Some(sample_table(&["ID", "VALUE", "probe", "log_ratio"], &[&["1", "2", "p", "0.5"]])),
                "control",
            )],
        };
        let cohort = build_cohort("GSE4", raw, "AD", &config).unwrap();
        assert_eq!(cohort.matrix.gene_ids(), &strings(&["p"])[..]);
        assert_eq!(cohort.matrix.values()[[0, 0]], 0.5);
        let identifier = cohort.diagnostics.identifier_column.unwrap();
        assert_eq!(identifier.source, InferenceSource::Override);
        assert!(!identifier.is_fallback());
        assert_eq!(cohort.diagnostics.value_column.unwrap().source, InferenceSource::Override);
    }

    #[test]
    fn test_blank_annotation_keeps_probe_columns() {
        let annotation = sample_table(&["ID", "Gene Symbol"], &[&["p1", ""], &["p2", " "]]);
        let rows: &[&[&str]] = &[&["p1", "2.0"], &["p2", "4.0"]];
        let raw = RawCohort {
            annotation: Some(annotation),
            samples: vec![
                sample("GSM1", Some(sample_table(&["ID_REF", "VALUE"], rows)), "control brain"),
                sample("GSM2", Some(sample_table(&["ID_REF", "VALUE"], rows)), "AD brain"),
            ],
        };

        let cohort = build_cohort("GSE6", raw, "AD", &LoaderConfig::default()).unwrap();

        assert!(cohort.probe_map.is_none());
        assert_eq!(cohort.matrix.n_samples(), 2);
        assert_eq!(cohort.matrix.gene_ids(), &strings(&["p1", "p2"])[..]);
    }

    #[test]
    fn test_sample_without_mapped_probes_is_dropped() {
        let annotation = sample_table(&["ID", "Gene Symbol"], &[&["p1", "APP"]]);
        let raw = RawCohort {
            annotation: Some(annotation),
            samples: vec![
                sample("GSM1", Some(sample_table(&["ID_REF", "VALUE"], &[&["p1", "2.0"]])), "control brain"),
                sample("GSM2", Some(sample_table(&["ID_REF", "VALUE"], &[&["zz", "5.0"]])), "AD brain"),
                sample("GSM3", Some(sample_table(&["ID_REF", "VALUE"], &[&["p1", "6.0"]])), "AD brain"),
            ],
        };

        let cohort = build_cohort("GSE7", raw, "AD", &LoaderConfig::default()).unwrap();

        assert_eq!(cohort.matrix.sample_ids(), &strings(&["GSE7_0", "GSE7_1"])[..]);
        assert_eq!(cohort.labels.len(), 2);
        assert_eq!(cohort.source_samples, strings(&["GSM1", "GSM3"]));
        assert_eq!(cohort.diagnostics.skipped_unmapped, 1);
        assert_eq!(cohort.matrix.gene_ids(), &strings(&["APP"])[..]);
        for i in 0..cohort.matrix.n_samples() {
            assert!(cohort.matrix.sample_values(i).iter().any(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_positional_fallback_is_recorded() {
        let raw = RawCohort {
            annotation: None,
            samples: vec![sample("GSM1", Some(sample_table(&["probe", "flag"], &[&["p", "P"]])), "control")],
        };
        let cohort = build_cohort("GSE5", raw, "AD", &LoaderConfig::default()).unwrap();
        let value = cohort.diagnostics.value_column.unwrap();
        assert_eq!(value.source, InferenceSource::PositionalFallback);
        // The fallback column is non-numeric, so nothing was extracted
        assert!(cohort.matrix.is_empty());
    }
}
