//! Control / disease classification from free-text sample metadata
//!
//! A substring heuristic. It is known to mislabel samples whose text happens
//! to contain one of the terms (" oa " inside an unrelated phrase, "normal"
//! in a tissue description), so every call carries the evidence it was
//! based on and callers can count the calls that fell through to a default.

use crate::data::{Condition, SampleMetadata};

/// Term lists and key order driving label inference
#[derive(Debug, Clone)]
pub struct LabelRules {
    /// Metadata keys inspected in order; the first key with a match decides
    pub metadata_keys: Vec<String>,
    /// Key whose text is re-checked for "control" when no key decided
    pub title_key: String,
    /// Terms that mark a control sample, checked first
    pub control_terms: Vec<String>,
    /// Terms that mark a disease sample
    pub disease_terms: Vec<String>,
    /// Control terms checked after the disease terms
    pub late_control_terms: Vec<String>,
}

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

impl Default for LabelRules {
    /// GEO SOFT keys for characteristics, title and source description
    fn default() -> Self {
        Self {
            metadata_keys: strings(&["characteristics_ch1", "title", "source_name_ch1"]),
            title_key: "title".to_string(),
            control_terms: strings(&["control", "normal", "non-demented", "healthy"]),
            disease_terms: strings(&[
                "alzheimer",
                "demented",
                "disease",
                "osteoarthritis",
                " oa ",
                "oa patient",
            ]),
            late_control_terms: strings(&["normal knee", "non-oa"]),
        }
    }
}

/// Evidence behind a label call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelBasis {
    /// A term matched in the text of a metadata key
    Matched { key: String, term: String },
    /// No key decided; the title contained "control"
    TitleFallback,
    /// Nothing matched; the disease label was assumed
    Default,
}

/// A label together with the evidence it rests on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCall {
    pub condition: Condition,
    pub basis: LabelBasis,
}

impl LabelCall {
    /// True when a term matched in one of the inspected keys
    pub fn is_confident(&self) -> bool {
        matches!(self.basis, LabelBasis::Matched { .. })
    }
}

fn find_term<'a>(text: &str, terms: &'a [String]) -> Option<&'a str> {
    terms.iter().find(|t| text.contains(t.as_str())).map(|t| t.as_str())
}

fn joined_lower(values: &[String]) -> String {
    values
        .iter()
        .map(|v| v.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Classify a sample as Control or `disease_label`
pub fn infer_label(metadata: &SampleMetadata, disease_label: &str, rules: &LabelRules) -> LabelCall {
    let disease = || Condition::Disease(disease_label.to_string());

    for key in &rules.metadata_keys {
        let Some(values) = metadata.get(key) else {
            continue;
        };
        let text = joined_lower(values);

        let decided = if let Some(term) = find_term(&text, &rules.control_terms) {
            Some((Condition::Control, term))
        } else if let Some(term) = find_term(&text, &rules.disease_terms) {
            Some((disease(), term))
        } else {
            find_term(&text, &rules.late_control_terms).map(|term| (Condition::Control, term))
        };

        if let Some((condition, term)) = decided {
            return LabelCall {
                condition,
                basis: LabelBasis::Matched {
                    key: key.clone(),
                    term: term.to_string(),
                },
            };
        }
    }

    let title = metadata
        .get(&rules.title_key)
        .map(|v| v.join(" ").to_lowercase())
        .unwrap_or_default();
    if title.contains("control") {
        return LabelCall {
            condition: Condition::Control,
            basis: LabelBasis::TitleFallback,
        };
    }

    LabelCall {
        condition: disease(),
        basis: LabelBasis::Default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(meta: SampleMetadata) -> LabelCall {
        infer_label(&meta, "AD", &LabelRules::default())
    }

    #[test]
    fn test_control_in_title() {
        let c = call(SampleMetadata::new().with("title", &["Brain CONTROL 12"]));
        assert_eq!(c.condition, Condition::Control);
        assert!(c.is_confident());
    }

    #[test]
    fn test_control_in_characteristics() {
        let c = call(SampleMetadata::new().with("characteristics_ch1", &["group: control", "age: 71"]));
        assert_eq!(c.condition, Condition::Control);
        assert_eq!(
            c.basis,
            LabelBasis::Matched {
                key: "characteristics_ch1".to_string(),
                term: "control".to_string()
            }
        );
    }

    #[test]
    fn test_non_demented_is_control() {
        let c = call(SampleMetadata::new().with("characteristics_ch1", &["status: non-demented"]));
        assert_eq!(c.condition, Condition::Control);
    }

    #[test]
    fn test_disease_terms() {
        let c = call(SampleMetadata::new().with("characteristics_ch1", &["diagnosis: Alzheimer's"]));
        assert_eq!(c.condition, Condition::Disease("AD".to_string()));

        let oa = infer_label(
            &SampleMetadata::new().with("source_name_ch1", &["synovium, OA patient"]),
            "OA",
            &LabelRules::default(),
        );
        assert_eq!(oa.condition, Condition::Disease("OA".to_string()));
    }

    #[test]
    fn test_late_control_term() {
        let c = infer_label(
            &SampleMetadata::new().with("characteristics_ch1", &["donor: non-oa"]),
            "OA",
            &LabelRules::default(),
        );
        assert_eq!(c.condition, Condition::Control);
    }

    #[test]
    fn test_first_deciding_key_wins() {
        // characteristics decide before the title is consulted
        let c = call(
            SampleMetadata::new()
                .with("characteristics_ch1", &["disease state: AD", "Alzheimer disease"])
                .with("title", &["control cohort sample"]),
        );
        assert_eq!(c.condition, Condition::Disease("AD".to_string()));
    }

    #[test]
    fn test_default_is_disease() {
        let c = call(SampleMetadata::new().with("title", &["GSM12345"]));
        assert_eq!(c.condition, Condition::Disease("AD".to_string()));
        assert_eq!(c.basis, LabelBasis::Default);
        assert!(!c.is_confident());
    }

    #[test]
    fn test_title_fallback_with_custom_keys() {
        let rules = LabelRules {
            metadata_keys: vec!["characteristics_ch1".to_string()],
            ..LabelRules::default()
        };
        let meta = SampleMetadata::new()
            .with("characteristics_ch1", &["age: 70"])
            .with("title", &["Control_3"]);
        let c = infer_label(&meta, "AD", &rules);
        assert_eq!(c.condition, Condition::Control);
        assert_eq!(c.basis, LabelBasis::TitleFallback);
    }
}
