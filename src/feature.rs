use crate::{
    dna_sequence::DNAsequence,
    interval::{Interval, Location, Strand},
    iupac_code::IupacCode,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Qualifiers = BTreeMap<String, Vec<String>>;

/// An annotated region: a location plus a kind tag and free-form qualifiers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub kind: String,
    pub location: Location,
    #[serde(default)]
    pub qualifiers: Qualifiers,
}

impl Feature {
    pub fn new(kind: &str, location: Location) -> Self {
        Self {
            kind: kind.to_string(),
            location,
            qualifiers: Qualifiers::new(),
        }
    }

    pub fn from_interval(kind: &str, start: usize, end: usize, strand: Strand) -> Self {
        Self::new(kind, Location::simple(Interval::new(start, end, strand)))
    }

    pub fn with_qualifier(mut self, key: &str, value: &str) -> Self {
        self.add_qualifier(key, value);
        self
    }

    pub fn add_qualifier(&mut self, key: &str, value: &str) {
        self.qualifiers
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    pub fn qualifier(&self, key: &str) -> Option<&[String]> {
        self.qualifiers.get(key).map(Vec::as_slice)
    }

    /// Human-readable name from the `label` qualifier, falling back to `note`.
    pub fn label(&self) -> Option<String> {
        ["label", "note"]
            .iter()
            .filter_map(|key| self.qualifier(key))
            .find(|values| !values.is_empty())
            .map(|values| values.join(" "))
    }

    pub fn len(&self) -> usize {
        self.location.len()
    }

    pub fn is_empty(&self) -> bool {
        self.location.is_empty()
    }

    pub fn strand(&self) -> Strand {
        self.location.strand()
    }

    /// Same feature, moved by `delta` on a linear coordinate line.
    pub fn shifted(&self, delta: isize) -> Option<Self> {
        Some(Self {
            kind: self.kind.clone(),
            location: self.location.shifted(delta)?,
            qualifiers: self.qualifiers.clone(),
        })
    }

    pub fn with_location(&self, location: Location) -> Self {
        Self {
            kind: self.kind.clone(),
            location,
            qualifiers: self.qualifiers.clone(),
        }
    }

    /// The bases the feature covers, 5'→3' on its own strand.
    pub fn extract_sequence(&self, seq: &DNAsequence) -> Vec<u8> {
        let top = seq.full_watson();
        let mut ret = Vec::with_capacity(self.len());
        for part in self.location.parts() {
            let end = part.end.min(top.len());
            let start = part.start.min(end);
            let bases = &top[start..end];
            match part.strand {
                Strand::Forward => ret.extend_from_slice(bases),
                Strand::Reverse => ret.extend(IupacCode::reverse_complement(bases)),
            }
        }
        ret
    }
}
