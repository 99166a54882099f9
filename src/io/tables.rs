//! Delimited table reading and writing

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use ndarray::Array2;

use crate::data::{is_missing, parse_cell, Condition, DataTable, ExpressionMatrix, LabelVector};
use crate::error::{CohortError, Result};
use crate::intersect::CoDegSet;
use crate::testing::{DifferentialResult, GeneValidation};

/// Tab if the header line contains one, else comma
pub fn detect_delimiter(contents: &[u8]) -> u8 {
    let header = contents.split(|&b| b == b'\n').next().unwrap_or_default();
    if header.contains(&b'\t') {
        b'\t'
    } else {
        b','
    }
}

/// Tab for `.tsv`/`.txt` paths, comma otherwise
fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("txt") => b'\t',
        _ => b',',
    }
}

fn writer_for(path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
    let file = File::create(path)?;
    Ok(csv::WriterBuilder::new()
        .delimiter(delimiter_for(path))
        .from_writer(BufWriter::new(file)))
}

/// Parse delimited text with a header row
///
/// Short rows are padded with empty cells; rows longer than the header are
/// an error.
pub fn parse_table(contents: &[u8]) -> Result<DataTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(contents))
        .has_headers(true)
        .flexible(true)
        .from_reader(contents);

    let header: Vec<String> = reader.headers()?.iter().map(|s| s.trim().to_string()).collect();
    if header.iter().all(|h| h.is_empty()) {
        return Err(CohortError::EmptyInput {
            reason: "table has no header".to_string(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
        while row.len() < header.len() {
            row.push(String::new());
        }
        rows.push(row);
    }

    DataTable::new(header, rows)
}

/// Read a delimited file with a header row
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<DataTable> {
    let contents = fs::read(path.as_ref())?;
    parse_table(&contents)
}

/// Read a samples x genes matrix: first column sample ids, header gene ids
pub fn read_expression_matrix<P: AsRef<Path>>(path: P) -> Result<ExpressionMatrix> {
    let table = read_table(path)?;
    let Some((id_column, gene_columns)) = table.columns().split_first() else {
        return Err(CohortError::EmptyInput {
            reason: "expression matrix has no columns".to_string(),
        });
    };

    let sample_ids: Vec<String> = id_column.cells().iter().map(|s| s.trim().to_string()).collect();
    let gene_ids: Vec<String> = gene_columns.iter().map(|c| c.name().to_string()).collect();

    let mut values = Array2::from_elem((sample_ids.len(), gene_ids.len()), f64::NAN);
    for (j, column) in gene_columns.iter().enumerate() {
        for (i, cell) in column.cells().iter().enumerate() {
            match parse_cell(cell) {
                Some(v) => values[[i, j]] = v,
                None if is_missing(cell) => {}
                None => {
                    return Err(CohortError::InvalidInput {
                        reason: format!("non-numeric value '{}' for {} in {}", cell, column.name(), sample_ids[i]),
                    })
                }
            }
        }
    }

    ExpressionMatrix::new(values, sample_ids, gene_ids)
}

/// Write a samples x genes matrix
pub fn write_expression_matrix<P: AsRef<Path>>(path: P, matrix: &ExpressionMatrix) -> Result<()> {
    let mut writer = writer_for(path.as_ref())?;

    let mut header = vec!["Sample".to_string()];
    header.extend(matrix.gene_ids().iter().cloned());
    writer.write_record(&header)?;

    for (i, sample) in matrix.sample_ids().iter().enumerate() {
        let mut record = vec![sample.clone()];
        record.extend(matrix.sample_values(i).iter().map(|v| format!("{}", v)));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a two-column (sample id, label) file with a header row
pub fn read_labels<P: AsRef<Path>>(path: P) -> Result<LabelVector> {
    let table = read_table(path)?;
    if table.n_cols() < 2 {
        return Err(CohortError::DimensionMismatch {
            expected: "2 columns (sample, label)".to_string(),
            got: format!("{} columns", table.n_cols()),
        });
    }
    let (Some(ids), Some(labels)) = (table.column_at(0), table.column_at(1)) else {
        return Err(CohortError::EmptyInput {
            reason: "labels file has no columns".to_string(),
        });
    };

    LabelVector::new(
        ids.cells().iter().map(|s| s.trim().to_string()).collect(),
        labels.cells().iter().map(|s| Condition::parse(s.trim())).collect(),
    )
}

/// Write labels as `Sample, Label`
pub fn write_labels<P: AsRef<Path>>(path: P, labels: &LabelVector) -> Result<()> {
    let mut writer = writer_for(path.as_ref())?;
    writer.write_record(["Sample", "Label"])?;
    for (sample, label) in labels.iter() {
        writer.write_record([sample, label.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a per-gene differential expression table
pub fn write_differential_results<P: AsRef<Path>>(path: P, result: &DifferentialResult) -> Result<()> {
    let mut writer = writer_for(path.as_ref())?;
    writer.write_record([
        "Gene",
        "Mean_Control",
        "Mean_Disease",
        "Std_Control",
        "Std_Disease",
        "Log2FC",
        "T_Statistic",
        "P_Value",
        "Adj_P_Value",
        "Regulation",
    ])?;

    for (i, gene) in result.gene_ids.iter().enumerate() {
        writer.write_record([
            gene.clone(),
            format!("{:.6}", result.mean_control[i]),
            format!("{:.6}", result.mean_disease[i]),
            format!("{:.6}", result.std_control[i]),
            format!("{:.6}", result.std_disease[i]),
            format!("{:.6}", result.log2_fold_changes[i]),
            format!("{:.6}", result.t_statistics[i]),
            format!("{:.6e}", result.pvalues[i]),
            format!("{:.6e}", result.padj[i]),
            result.regulation[i].to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write shared DEGs as `Gene, Regulation`, upregulated first
pub fn write_co_degs<P: AsRef<Path>>(path: P, co_degs: &CoDegSet) -> Result<()> {
    let mut writer = writer_for(path.as_ref())?;
    writer.write_record(["Gene", "Regulation"])?;
    for (gene, call) in co_degs.calls() {
        writer.write_record([gene, call.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write held-out validation statistics, one row per gene
pub fn write_validation<P: AsRef<Path>>(path: P, genes: &[GeneValidation]) -> Result<()> {
    let mut writer = writer_for(path.as_ref())?;
    writer.write_record(["Gene", "T_Statistic", "P_Value", "AUC", "N_Control", "N_Disease"])?;
    for g in genes {
        writer.write_record([
            g.gene.clone(),
            format!("{:.6}", g.t_statistic),
            format!("{:.6e}", g.pvalue),
            format!("{:.4}", g.auc),
            g.n_control.to_string(),
            g.n_disease.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
