//! Probe identifier to gene symbol mapping for one platform

use std::collections::HashMap;

/// Probe -> gene symbol lookup built from a platform annotation table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeToGeneMap {
    map: HashMap<String, String>,
}

impl ProbeToGeneMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(probe, symbol)` pairs
    ///
    /// Symbols are trimmed and blank symbols are not recorded, so a map built
    /// from an annotation without any gene information is empty. A repeated
    /// probe keeps its first non-blank symbol.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = HashMap::new();
        for (probe, symbol) in pairs {
            let symbol = symbol.trim();
            if !symbol.is_empty() {
                map.entry(probe).or_insert_with(|| symbol.to_string());
            }
        }
        Self { map }
    }

    /// Symbol for a probe, if mapped
    pub fn gene_for(&self, probe: &str) -> Option<&str> {
        self.map.get(probe).map(String::as_str)
    }

    /// Number of probes with a symbol
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
