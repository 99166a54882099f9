//! End-to-end runs: load, merge and test each condition, intersect, then
//! check the shared genes on held-out cohorts
//!
//! Stages thread a [`PipelineContext`] value: each stage takes the context
//! by value and returns a new one, so a finished context is never mutated.

use serde::Serialize;

use crate::intersect::{intersect_degs, CoDegSet};
use crate::loader::{load_cohort, load_cohorts, CohortFailure, CohortSource, LoaderConfig};
use crate::merge::{merge_cohorts, CombatParams, MergedCohorts};
use crate::testing::{differential_expression, validate_genes, DeParams, DeSummary, DifferentialResult, GeneValidation};
use crate::error::{CohortError, Result};

/// One disease and the cohorts that study it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionRequest {
    pub disease_label: String,
    pub cohort_ids: Vec<String>,
    /// Held-out cohort loaded on its own to check the co-DEGs
    pub validation_cohort: Option<String>,
}

impl ConditionRequest {
    pub fn new(disease_label: &str, cohort_ids: Vec<String>) -> Self {
        Self {
            disease_label: disease_label.to_string(),
            cohort_ids,
            validation_cohort: None,
        }
    }

    pub fn with_validation_cohort(mut self, cohort_id: &str) -> Self {
        self.validation_cohort = Some(cohort_id.to_string());
        self
    }
}

/// Settings for every stage
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub loader: LoaderConfig,
    pub combat: CombatParams,
    pub de: DeParams,
}

/// A loaded cohort as seen from the run summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortReport {
    pub cohort_id: String,
    pub n_samples: usize,
    pub n_features: usize,
    pub uncertain_labels: usize,
}

/// Everything one condition produced
#[derive(Debug, Clone)]
pub struct ConditionRun {
    pub request: ConditionRequest,
    pub cohorts: Vec<CohortReport>,
    pub failures: Vec<CohortFailure>,
    pub merged: MergedCohorts,
    pub result: DifferentialResult,
}

/// Load, merge and test one condition
///
/// Fails with `EmptyInput` when no cohort loads or the merged matrix is
/// empty, and with `NoComparisonGroup` when no disease sample survived.
pub fn run_condition<S: CohortSource + ?Sized>(
    source: &S,
    request: &ConditionRequest,
    settings: &PipelineSettings,
) -> Result<ConditionRun> {
    log::info!("Loading {} cohorts for {}", request.cohort_ids.len(), request.disease_label);
    let batch = load_cohorts(source, &request.cohort_ids, &request.disease_label, &settings.loader);
    if batch.loaded.is_empty() {
        return Err(CohortError::EmptyInput {
            reason: format!("no cohort for {} could be loaded", request.disease_label),
        });
    }

    let cohorts = batch
        .loaded
        .iter()
        .map(|c| CohortReport {
            cohort_id: c.cohort_id.clone(),
            n_samples: c.matrix.n_samples(),
            n_features: c.matrix.n_genes(),
            uncertain_labels: c.diagnostics.uncertain_labels,
        })
        .collect();

    let (matrices, labels, ids) = batch.merge_inputs();
    let merged = merge_cohorts(&matrices, &labels, &ids, &settings.combat)?;
    if merged.matrix.is_empty() {
        return Err(CohortError::EmptyInput {
            reason: format!("merged matrix for {} is empty", request.disease_label),
        });
    }

    for (label, count) in merged.labels.value_counts() {
        log::info!("{}: {} samples labelled {}", request.disease_label, count, label);
    }

    let result = differential_expression(&merged.matrix, &merged.labels, &settings.de)?;

    Ok(ConditionRun {
        request: request.clone(),
        cohorts,
        failures: batch.failures,
        merged,
        result,
    })
}

/// Candidate genes checked on one held-out cohort
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRun {
    pub disease_label: String,
    pub cohort_id: String,
    pub n_samples: usize,
    pub genes: Vec<GeneValidation>,
}

/// Load a cohort unmerged and validate `genes` on it
pub fn validate_on_cohort<S: CohortSource + ?Sized, G: AsRef<str>>(
    source: &S,
    cohort_id: &str,
    disease_label: &str,
    genes: &[G],
    loader: &LoaderConfig,
) -> Result<ValidationRun> {
    let cohort = load_cohort(source, cohort_id, disease_label, loader)?;
    if cohort.matrix.is_empty() {
        return Err(CohortError::EmptyInput {
            reason: format!("validation cohort {} has no expression data", cohort_id),
        });
    }
    Ok(ValidationRun {
        disease_label: disease_label.to_string(),
        cohort_id: cohort_id.to_string(),
        n_samples: cohort.matrix.n_samples(),
        genes: validate_genes(&cohort.matrix, &cohort.labels, genes)?,
    })
}

/// Accumulated results of a run
#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    conditions: Vec<ConditionRun>,
    co_degs: Option<CoDegSet>,
    validations: Vec<ValidationRun>,
    validation_failures: Vec<CohortFailure>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new context with one more finished condition
    pub fn with_condition(self, run: ConditionRun) -> Self {
        let mut conditions = self.conditions;
        conditions.push(run);
        Self { conditions, ..self }
    }

    /// A new context carrying the cross-condition intersection
    pub fn with_co_degs(self, co_degs: CoDegSet) -> Self {
        Self {
            co_degs: Some(co_degs),
            ..self
        }
    }

    /// A new context with one more validation result
    pub fn with_validation(self, outcome: std::result::Result<ValidationRun, CohortFailure>) -> Self {
        let mut validations = self.validations;
        let mut validation_failures = self.validation_failures;
        match outcome {
            Ok(run) => validations.push(run),
            Err(failure) => validation_failures.push(failure),
        }
        Self {
            validations,
            validation_failures,
            ..self
        }
    }

    pub fn conditions(&self) -> &[ConditionRun] {
        &self.conditions
    }

    /// Run for a disease label
    pub fn condition(&self, disease_label: &str) -> Option<&ConditionRun> {
        self.conditions.iter().find(|c| c.request.disease_label == disease_label)
    }

    pub fn co_degs(&self) -> Option<&CoDegSet> {
        self.co_degs.as_ref()
    }

    pub fn validations(&self) -> &[ValidationRun] {
        &self.validations
    }

    pub fn validation_failures(&self) -> &[CohortFailure] {
        &self.validation_failures
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            conditions: self
                .conditions
                .iter()
                .map(|run| ConditionSummary {
                    disease_label: run.request.disease_label.clone(),
                    cohorts_requested: run.request.cohort_ids.clone(),
                    cohorts: run.cohorts.clone(),
                    failures: run.failures.clone(),
                    merged_samples: run.merged.matrix.n_samples(),
                    merged_genes: run.merged.matrix.n_genes(),
                    batch_correction: run.merged.correction.to_string(),
                    label_counts: run.merged.labels.value_counts(),
                    excluded_labels: run.result.excluded_labels.clone(),
                    differential_expression: run.result.summary(),
                })
                .collect(),
            co_degs: self.co_degs.clone(),
            validations: self.validations.clone(),
            validation_failures: self.validation_failures.clone(),
        }
    }
}

/// Per-condition section of [`RunSummary`]
#[derive(Debug, Clone, Serialize)]
pub struct ConditionSummary {
    pub disease_label: String,
    pub cohorts_requested: Vec<String>,
    pub cohorts: Vec<CohortReport>,
    pub failures: Vec<CohortFailure>,
    pub merged_samples: usize,
    pub merged_genes: usize,
    pub batch_correction: String,
    pub label_counts: Vec<(String, usize)>,
    pub excluded_labels: Vec<String>,
    pub differential_expression: DeSummary,
}

/// Serializable record of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub conditions: Vec<ConditionSummary>,
    pub co_degs: Option<CoDegSet>,
    pub validations: Vec<ValidationRun>,
    pub validation_failures: Vec<CohortFailure>,
}

/// Run two conditions and intersect their DEGs
///
/// Conditions with a validation cohort then have the co-DEGs checked on it.
/// A validation cohort that cannot be loaded or tested is recorded as a
/// failure and does not fail the run.
pub fn run_pipeline<S: CohortSource + ?Sized>(
    source: &S,
    first: &ConditionRequest,
    second: &ConditionRequest,
    settings: &PipelineSettings,
) -> Result<PipelineContext> {
    let context = PipelineContext::new()
        .with_condition(run_condition(source, first, settings)?)
        .with_condition(run_condition(source, second, settings)?);

    let co_degs = match context.conditions() {
        [a, b] => intersect_degs(&a.result, &b.result),
        _ => CoDegSet::default(),
    };
    let mut context = context.with_co_degs(co_degs.clone());

    let genes = co_degs.all();
    for request in [first, second] {
        let Some(cohort_id) = request.validation_cohort.as_deref() else {
            continue;
        };
        if genes.is_empty() {
            log::info!("No co-DEGs to validate on {}", cohort_id);
            break;
        }
        let outcome = validate_on_cohort(source, cohort_id, &request.disease_label, &genes[..], &settings.loader)
            .map_err(|e| {
                log::warn!("Validation on {} skipped: {}", cohort_id, e);
                CohortFailure {
                    cohort_id: cohort_id.to_string(),
                    reason: e.to_string(),
                }
            });
        context = context.with_validation(outcome);
    }
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataTable, SampleMetadata};
    use crate::loader::{InMemorySource, RawCohort, RawSample};
    use crate::merge::CorrectionOutcome;

    const DEVS: [f64; 5] = [-1.26, -0.63, 0.0, 0.63, 1.26];
    const GENES: [&str; 6] = ["G1", "G2", "G3", "G4", "G5", "G6"];

    /// Samples alternate control / disease; `effects` shift disease samples per gene
    fn raw_cohort(n: usize, offset: f64, effects: &[(usize, f64)]) -> RawCohort {
        let samples = (0..n)
            .map(|i| {
                let disease = i % 2 == 1;
                let rows = GENES
                    .iter()
                    .enumerate()
                    .map(|(g, gene)| {
                        let effect = effects.iter().find(|(eg, _)| *eg == g).map(|(_, e)| *e).unwrap_or(0.0);
                        let v = 6.0 + g as f64 + offset + 0.5 * DEVS[(i / 2 + g) % 5] + if disease { effect } else { 0.0 };
                        vec![gene.to_string(), format!("{:.4}", v)]
                    })
                    .collect();
                RawSample {
                    sample_id: format!("GSM{}", i),
                    table: Some(DataTable::new(vec!["ID_REF".to_string(), "VALUE".to_string()], rows).unwrap()),
                    metadata: SampleMetadata::new().with("title", &[if disease { "disease tissue" } else { "healthy control" }]),
                }
            })
            .collect();
        RawCohort {
            annotation: None,
            samples,
        }
    }

    fn source() -> InMemorySource {
        InMemorySource::new()
            .with_cohort("GSE_A", raw_cohort(6, 0.0, &[(0, 6.0), (1, -4.0)]))
            .with_cohort("GSE_B", raw_cohort(6, 2.0, &[(0, 6.0), (1, -4.0)]))
            .with_cohort("GSE_C", raw_cohort(8, 0.0, &[(0, 6.0), (1, -4.0), (2, 6.0)]))
            .with_cohort("GSE_V", raw_cohort(10, 1.0, &[(0, 6.0), (1, -4.0)]))
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_run_pipeline() {
        let ad = ConditionRequest::new("AD", ids(&["GSE_A", "GSE_MISSING", "GSE_B"]));
        let oa = ConditionRequest::new("OA", ids(&["GSE_C"]));

        let context = run_pipeline(&source(), &ad, &oa, &PipelineSettings::default()).unwrap();

        let ad_run = context.condition("AD").unwrap();
        assert_eq!(ad_run.merged.matrix.n_samples(), 12);
        assert_eq!(ad_run.merged.correction, CorrectionOutcome::Applied { n_batches: 2 });
        assert_eq!(ad_run.failures.len(), 1);
        assert_eq!(ad_run.failures[0].cohort_id, "GSE_MISSING");
        assert_eq!(ad_run.result.upregulated_genes(), vec!["G1"]);

        let oa_run = context.condition("OA").unwrap();
        assert_eq!(oa_run.merged.correction, CorrectionOutcome::NotAttempted);

        let co = context.co_degs().unwrap();
        assert_eq!(co.upregulated, ids(&["G1"]));
        assert_eq!(co.downregulated, ids(&["G2"]));

        let json = serde_json::to_value(context.summary()).unwrap();
        assert_eq!(json["conditions"].as_array().unwrap().len(), 2);
        assert_eq!(json["co_degs"]["upregulated"][0], "G1");
    }

    #[test]
    fn test_co_degs_validated_on_held_out_cohorts() {
        let ad = ConditionRequest::new("AD", ids(&["GSE_A", "GSE_B"])).with_validation_cohort("GSE_V");
        let oa = ConditionRequest::new("OA", ids(&["GSE_C"])).with_validation_cohort("GSE_GONE");

        let context = run_pipeline(&source(), &ad, &oa, &PipelineSettings::default()).unwrap();

        assert_eq!(context.validations().len(), 1);
        let validation = &context.validations()[0];
        assert_eq!(validation.cohort_id, "GSE_V");
        assert_eq!(validation.n_samples, 10);
        let genes: Vec<&str> = validation.genes.iter().map(|g| g.gene.as_str()).collect();
        assert_eq!(genes, vec!["G1", "G2"]);
        assert_eq!(validation.genes[0].auc, 1.0);
        assert_eq!(validation.genes[1].auc, 0.0);

        assert_eq!(context.validation_failures().len(), 1);
        assert_eq!(context.validation_failures()[0].cohort_id, "GSE_GONE");

        let json = serde_json::to_value(context.summary()).unwrap();
        assert_eq!(json["validations"][0]["genes"][0]["gene"], "G1");
    }

    #[test]
    fn test_condition_without_cohorts_fails() {
        let request = ConditionRequest::new("AD", ids(&["GSE_MISSING"]));
        let result = run_condition(&source(), &request, &PipelineSettings::default());
        assert!(matches!(result, Err(CohortError::EmptyInput { .. })));
    }

    #[test]
    fn test_context_stages_return_new_values() {
        let request = ConditionRequest::new("OA", ids(&["GSE_C"]));
        let run = run_condition(&source(), &request, &PipelineSettings::default()).unwrap();

        let empty = PipelineContext::new();
        let one = empty.clone().with_condition(run);
        assert!(empty.conditions().is_empty());
        assert_eq!(one.conditions().len(), 1);
        assert!(one.co_degs().is_none());
        assert!(one.with_co_degs(CoDegSet::default()).co_degs().is_some());
    }
}
