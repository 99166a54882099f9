//! rust_cohort_deg command-line interface

use std::fs;
use std::path::Path;

use clap::Parser;
use log::{info, LevelFilter};

use rust_cohort_deg::cli::{Cli, Commands, TestOptions};
use rust_cohort_deg::config::resolve_cohort_ids;
use rust_cohort_deg::io::{
    read_expression_matrix, read_labels, write_co_degs, write_differential_results, write_expression_matrix,
    write_labels, write_validation, DirectorySource,
};
use rust_cohort_deg::prelude::*;

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Run {
            data_dir,
            disease1,
            cohorts1,
            disease2,
            cohorts2,
            validation1,
            validation2,
            ids_file,
            output_dir,
            id_column,
            value_column,
            mean_only,
            test,
        } => {
            let settings = PipelineSettings {
                loader: LoaderConfig {
                    identifier_column: id_column,
                    value_column,
                    ..LoaderConfig::default()
                },
                combat: CombatParams {
                    mean_only,
                    ..CombatParams::default()
                },
                de: de_params(&test),
            };
            configure_threads(test.threads).and_then(|_| {
                let first = request(&disease1, resolve_cohort_ids(&cohorts1, ids_file.as_deref(), &disease1)?, validation1);
                let second = request(&disease2, resolve_cohort_ids(&cohorts2, ids_file.as_deref(), &disease2)?, validation2);
                run_analysis(&data_dir, &first, &second, &settings, &output_dir)
            })
        }
        Commands::De {
            matrix,
            labels,
            output,
            test,
        } => configure_threads(test.threads).and_then(|_| run_de(&matrix, &labels, &output, &de_params(&test))),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn request(disease_label: &str, cohort_ids: Vec<String>, validation: Option<String>) -> ConditionRequest {
    let request = ConditionRequest::new(disease_label, cohort_ids);
    match validation {
        Some(cohort_id) => request.with_validation_cohort(&cohort_id),
        None => request,
    }
}

fn de_params(test: &TestOptions) -> DeParams {
    DeParams {
        pvalue_threshold: test.pvalue_threshold,
        logfc_threshold: test.logfc_threshold,
        ..DeParams::default()
    }
}

fn configure_threads(threads: usize) -> Result<()> {
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| CohortError::InvalidInput {
                reason: format!("Failed to configure thread pool: {}", e),
            })?;
        info!("Using {} threads", threads);
    }
    Ok(())
}

fn run_analysis(
    data_dir: &Path,
    first: &ConditionRequest,
    second: &ConditionRequest,
    settings: &PipelineSettings,
    output_dir: &Path,
) -> Result<()> {
    let source = DirectorySource::new(data_dir)?;
    let context = run_pipeline(&source, first, second, settings)?;

    fs::create_dir_all(output_dir)?;
    for run in context.conditions() {
        let label = &run.request.disease_label;
        write_expression_matrix(output_dir.join(format!("{}_merged_expression.tsv", label)), &run.merged.matrix)?;
        write_labels(output_dir.join(format!("{}_labels.csv", label)), &run.merged.labels)?;
        write_differential_results(output_dir.join(format!("{}_DEGs.csv", label)), &run.result)?;
        println!("{}", run.result.summary());
    }

    if let Some(co_degs) = context.co_degs() {
        write_co_degs(output_dir.join("co_DEGs.csv"), co_degs)?;
        println!(
            "Co-DEGs: {} ({} up, {} down)",
            co_degs.len(),
            co_degs.upregulated.len(),
            co_degs.downregulated.len()
        );
    }

    for validation in context.validations() {
        write_validation(
            output_dir.join(format!("{}_validation.csv", validation.disease_label)),
            &validation.genes,
        )?;
        println!(
            "Validated {} co-DEGs on {} ({} samples)",
            validation.genes.len(),
            validation.cohort_id,
            validation.n_samples
        );
    }

    let summary_path = output_dir.join("run_summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(&context.summary())?)?;
    info!("Results written to {}", output_dir.display());
    Ok(())
}

fn run_de(matrix_path: &Path, labels_path: &Path, output_path: &Path, params: &DeParams) -> Result<()> {
    let matrix = read_expression_matrix(matrix_path)?;
    let labels = read_labels(labels_path)?.aligned_to(matrix.sample_ids())?;
    info!("Loaded {} samples x {} genes", matrix.n_samples(), matrix.n_genes());

    let result = differential_expression(&matrix, &labels, params)?;
    write_differential_results(output_path, &result)?;
    println!("{}", result.summary());
    info!("Results written to {}", output_path.display());
    Ok(())
}
