//! Condition labels aligned to expression matrix rows

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CohortError, Result};

/// Label string used for the reference group
pub const CONTROL_LABEL: &str = "Control";

/// Sample condition: the control group or a named disease
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Condition {
    Control,
    Disease(String),
}

impl Condition {
    /// Parse a label; exactly "Control" is the control group
    pub fn parse(label: &str) -> Self {
        if label == CONTROL_LABEL {
            Condition::Control
        } else {
            Condition::Disease(label.to_string())
        }
    }

    pub fn is_control(&self) -> bool {
        matches!(self, Condition::Control)
    }

    /// Label text
    pub fn as_str(&self) -> &str {
        match self {
            Condition::Control => CONTROL_LABEL,
            Condition::Disease(name) => name,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Condition {
    fn from(s: String) -> Self {
        Condition::parse(&s)
    }
}

impl From<Condition> for String {
    fn from(c: Condition) -> Self {
        c.as_str().to_string()
    }
}

/// One condition per sample, index-aligned with an `ExpressionMatrix`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabelVector {
    sample_ids: Vec<String>,
    labels: Vec<Condition>,
}

impl LabelVector {
    /// Create a label vector; lengths must agree
    pub fn new(sample_ids: Vec<String>, labels: Vec<Condition>) -> Result<Self> {
        if sample_ids.len() != labels.len() {
            return Err(CohortError::DimensionMismatch {
                expected: format!("{} labels", sample_ids.len()),
                got: format!("{} labels", labels.len()),
            });
        }
        Ok(Self { sample_ids, labels })
    }

    /// An empty label vector
    pub fn empty() -> Self {
        Self::default()
    }

    /// Concatenate several label vectors in order
    pub fn concat(parts: &[LabelVector]) -> Self {
        let mut out = Self::empty();
        for part in parts {
            out.sample_ids.extend(part.sample_ids.iter().cloned());
            out.labels.extend(part.labels.iter().cloned());
        }
        out
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Sample IDs
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Labels in sample order
    pub fn labels(&self) -> &[Condition] {
        &self.labels
    }

    /// Label of the i-th sample
    pub fn get(&self, idx: usize) -> Option<&Condition> {
        self.labels.get(idx)
    }

    /// Iterate `(sample_id, condition)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.sample_ids.iter().map(|s| s.as_str()).zip(self.labels.iter())
    }

    /// Distinct disease labels in encounter order
    pub fn disease_labels(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for label in &self.labels {
            if let Condition::Disease(name) = label {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
        }
        out
    }

    /// Row indices carrying a given condition
    pub fn indices_of(&self, condition: &Condition) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, l)| *l == condition)
            .map(|(i, _)| i)
            .collect()
    }

    /// Reorder to follow `sample_ids`; every id must have a label
    pub fn aligned_to(&self, sample_ids: &[String]) -> Result<Self> {
        let labels = sample_ids
            .iter()
            .map(|id| {
                self.sample_ids
                    .iter()
                    .position(|s| s == id)
                    .map(|i| self.labels[i].clone())
                    .ok_or_else(|| CohortError::InvalidInput {
                        reason: format!("no label for sample '{}'", id),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(sample_ids.to_vec(), labels)
    }

    /// Sample count per label, in encounter order
    pub fn value_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for label in &self.labels {
            match counts.iter_mut().find(|(name, _)| name == label.as_str()) {
                Some((_, n)) => *n += 1,
                None => counts.push((label.as_str().to_string(), 1)),
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(labels: &[&str]) -> LabelVector {
        let ids = (0..labels.len()).map(|i| format!("c_{}", i)).collect();
        LabelVector::new(ids, labels.iter().map(|l| Condition::parse(l)).collect()).unwrap()
    }

    #[test]
    fn test_condition_parse() {
        assert!(Condition::parse("Control").is_control());
        assert_eq!(Condition::parse("AD"), Condition::Disease("AD".to_string()));
        assert_eq!(Condition::parse("AD").to_string(), "AD");
    }

    #[test]
    fn test_disease_labels_in_encounter_order() {
        let labels = vector(&["OA", "Control", "AD", "OA"]);
        assert_eq!(labels.disease_labels(), vec!["OA", "AD"]);
        assert_eq!(labels.indices_of(&Condition::Disease("OA".to_string())), vec![0, 3]);
    }

    #[test]
    fn test_value_counts() {
        let labels = vector(&["Control", "AD", "Control"]);
        assert_eq!(
            labels.value_counts(),
            vec![("Control".to_string(), 2), ("AD".to_string(), 1)]
        );
    }

    #[test]
    fn test_aligned_to() {
        let labels = vector(&["Control", "AD"]);
        let order = vec!["c_1".to_string(), "c_0".to_string()];
        let aligned = labels.aligned_to(&order).unwrap();
        assert_eq!(aligned.sample_ids(), &order[..]);
        assert_eq!(aligned.labels()[0], Condition::Disease("AD".to_string()));
        assert!(labels.aligned_to(&["c_9".to_string()]).is_err());
    }

    #[test]
    fn test_length_mismatch() {
        let result = LabelVector::new(vec!["a".to_string()], vec![]);
        assert!(result.is_err());
    }
}
