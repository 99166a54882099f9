//! Cohort id lists from flags, environment variables or an ids file

use std::fs;
use std::path::Path;

use crate::error::{CohortError, Result};

/// Environment variable holding the first condition's cohort ids
pub const COHORT_IDS_1_ENV: &str = "COHORT_IDS_1";
/// Environment variable holding the second condition's cohort ids
pub const COHORT_IDS_2_ENV: &str = "COHORT_IDS_2";

/// Split a comma or whitespace separated id list, dropping blanks and repeats
pub fn parse_cohort_list(raw: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        let id = id.trim();
        if !id.is_empty() && !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

/// Cohort ids for `label` from an ids file
///
/// Lines have the form `LABEL: ID1, ID2`. The first line whose label matches
/// case-insensitively wins. Blank lines and lines starting with `#` are
/// ignored.
pub fn read_cohort_ids_file<P: AsRef<Path>>(path: P, label: &str) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .find(|(prefix, _)| prefix.trim().eq_ignore_ascii_case(label))
        .map(|(_, ids)| parse_cohort_list(ids))
        .ok_or_else(|| CohortError::InvalidInput {
            reason: format!("no '{}:' line in {}", label, path.display()),
        })
}

/// Cohort ids from explicit values, falling back to an ids file
///
/// Explicit values may themselves be comma separated lists.
pub fn resolve_cohort_ids(explicit: &[String], ids_file: Option<&Path>, label: &str) -> Result<Vec<String>> {
    let ids = if explicit.is_empty() {
        match ids_file {
            Some(path) => read_cohort_ids_file(path, label)?,
            None => Vec::new(),
        }
    } else {
        parse_cohort_list(&explicit.join(","))
    };

    if ids.is_empty() {
        return Err(CohortError::InvalidInput {
            reason: format!("no cohort ids given for {}", label),
        });
    }
    Ok(ids)
}
