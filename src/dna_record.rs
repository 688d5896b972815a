//! An annotated double-stranded molecule.
//!
//! Every structural operation returns a fresh record and carries the features
//! along into the new coordinate frame. Features are plain values, so no two
//! records ever share one.

use crate::{
    dna_sequence::{DNAsequence, Topology},
    error::{DnaError, Result},
    feature::Feature,
    interval::{Interval, Location, Strand},
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Range};

/// Longest identifier derived for an extracted or linearized record.
pub const MAX_IDENTIFIER_LEN: usize = 16;

lazy_static! {
    static ref IDENTIFIER_FORBIDDEN: Regex =
        Regex::new(r"[^A-Za-z0-9_.\-]+").expect("constant identifier pattern");
}

/// What a record is built from.
#[derive(Clone, Debug)]
pub enum RecordSource {
    Text(String),
    Molecule(DNAsequence),
    Record(DNArecord),
}

impl From<&str> for RecordSource {
    fn from(s: &str) -> Self {
        RecordSource::Text(s.to_string())
    }
}

impl From<DNAsequence> for RecordSource {
    fn from(seq: DNAsequence) -> Self {
        RecordSource::Molecule(seq)
    }
}

impl From<DNArecord> for RecordSource {
    fn from(record: DNArecord) -> Self {
        RecordSource::Record(record)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DNArecord {
    seq: DNAsequence,
    #[serde(default)]
    features: Vec<Feature>,
    pub name: String,
    pub id: String,
    pub description: String,
}

impl DNArecord {
    /// Builds a record, optionally forcing a topology.
    ///
    /// A circular molecule requested as linear is opened at its origin; a
    /// linear molecule requested as circular has to be able to loop.
    pub fn new(source: RecordSource, topology: Option<Topology>) -> Result<Self> {
        let record = match source {
            RecordSource::Text(text) => Self::from_molecule(DNAsequence::from_sequence(&text)),
            RecordSource::Molecule(seq) => Self::from_molecule(seq),
            RecordSource::Record(record) => record,
        };
        match topology {
            Some(topology) => record.with_topology(topology),
            None => Ok(record),
        }
    }

    pub fn from_molecule(seq: DNAsequence) -> Self {
        Self {
            seq,
            features: vec![],
            name: "name".to_string(),
            id: "id".to_string(),
            description: "description".to_string(),
        }
    }

    pub fn from_sequence(sequence: &str) -> Self {
        Self::from_molecule(DNAsequence::from_sequence(sequence))
    }

    pub fn from_sequence_with_topology(sequence: &str, topology: Topology) -> Self {
        Self::from_molecule(DNAsequence::from_sequence_with_topology(sequence, topology))
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn seq(&self) -> &DNAsequence {
        &self.seq
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Mutable access for qualifier edits; locations must stay on the molecule.
    pub fn features_mut(&mut self) -> &mut Vec<Feature> {
        &mut self.features
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn topology(&self) -> Topology {
        self.seq.topology()
    }

    pub fn is_circular(&self) -> bool {
        self.seq.is_circular()
    }

    pub fn is_linear(&self) -> bool {
        self.seq.is_linear()
    }

    pub(crate) fn with_parts(&self, seq: DNAsequence, features: Vec<Feature>) -> Self {
        Self {
            seq,
            features,
            name: self.name.clone(),
            id: self.id.clone(),
            description: self.description.clone(),
        }
    }

    /// Appends a feature after checking that it lies on the molecule.
    ///
    /// On a circle, position `len` is position `0`; zero-length parts there
    /// are stored at `0`.
    pub fn push_feature(&mut self, mut feature: Feature) -> Result<()> {
        let len = self.len();
        if feature.location.end() > len {
            return Err(DnaError::InvalidLocation(format!(
                "{} extends past the end of a molecule of length {}",
                feature.location,
                len
            )));
        }
        let at_end = |p: &Interval| p.is_empty() && p.start == len;
        if self.is_circular() && len > 0 && feature.location.parts().iter().any(at_end) {
            let parts = feature
                .location
                .parts()
                .iter()
                .map(|p| if at_end(p) { Interval::new(0, 0, p.strand) } else { *p })
                .collect();
            feature.location = Location::new(parts)?;
        }
        self.features.push(feature);
        Ok(())
    }

    pub fn add_feature(&mut self, start: usize, end: usize, strand: Strand, kind: &str) -> Result<()> {
        self.push_feature(Feature::from_interval(kind, start, end, strand))
    }

    /// Sub-record covering `range`; only features entirely inside survive.
    ///
    /// On a circular record `start >= end` reads through the origin.
    pub fn extract(&self, range: Range<usize>) -> Result<Self> {
        let Range { start, end } = range;
        let len = self.len();
        let mut ret = if self.is_linear() || start < end {
            let (seq, offset) = self.seq.slice_with_start(start..end)?;
            let window = offset..offset + seq.len();
            let features = self
                .features
                .iter()
                .filter(|f| f.location.contained_in(&window))
                .filter_map(|f| f.shifted(-(offset as isize)))
                .collect();
            self.with_parts(seq, features)
        } else {
            if start > len || end > len {
                return Err(DnaError::InvalidRange { start, end, len });
            }
            let rotated = self.rotated(start as isize)?;
            let seq = self.seq.slice(start..end)?;
            let window = 0..seq.len();
            let features = rotated
                .features
                .into_iter()
                .filter(|f| !f.location.is_origin_split(len) && f.location.contained_in(&window))
                .collect();
            self.with_parts(seq, features)
        };
        ret.id = ret.derived_identifier(&self.id);
        ret.name = ret.id.clone();
        Ok(ret)
    }

    /// Sub-record spanning feature `index`.
    pub fn extract_feature(&self, index: usize) -> Result<Self> {
        let feature = self.features.get(index).ok_or(DnaError::NoSuchFeature {
            index,
            count: self.features.len(),
        })?;
        let location = &feature.location;
        match location.origin_split_index(self.len()) {
            Some(i) if self.is_circular() => {
                let parts = location.parts();
                let (lower, upper) = match parts[i].strand {
                    Strand::Forward => (parts[i], parts[i + 1]),
                    Strand::Reverse => (parts[i + 1], parts[i]),
                };
                self.extract(lower.start..upper.end)
            }
            _ => self.extract(location.start()..location.end()),
        }
    }

    fn derived_identifier(&self, parent_id: &str) -> String {
        let label = self
            .features
            .iter()
            .rev()
            .max_by_key(|f| f.len())
            .and_then(Feature::label)
            .unwrap_or_else(|| format!("part_{parent_id}"));
        IDENTIFIER_FORBIDDEN
            .replace_all(&label, "_")
            .chars()
            .take(MAX_IDENTIFIER_LEN)
            .collect()
    }

    /// Circularizes the record; features are re-expressed on the circle.
    pub fn looped(&self) -> Result<Self> {
        let seq = self.seq.looped()?;
        let modulus = seq.len();
        let delta = -(self.seq.watson_offset() as isize);
        let features = self
            .features
            .iter()
            .filter_map(|f| {
                let parts: Vec<Interval> = f
                    .location
                    .parts()
                    .iter()
                    .filter_map(|p| p.shift(delta, Some(modulus)))
                    .flat_map(|p| p.split_at_origin(modulus))
                    .collect();
                match Location::new(parts) {
                    Ok(location) => Some(f.with_location(location)),
                    Err(e) => {
                        log::debug!("dropping {} feature on looping: {e}", f.kind);
                        None
                    }
                }
            })
            .collect();
        Ok(self.with_parts(seq, features))
    }

    pub fn reverse_complement(&self) -> Self {
        let len = self.len();
        let mut features: Vec<Feature> = self
            .features
            .iter()
            .map(|f| f.with_location(f.location.flipped(len)))
            .collect();
        features.sort_by_key(|f| f.location.start());
        let name: String = self.name.chars().take(13).collect();
        Self {
            seq: self.seq.reverse_complement(),
            features,
            name: format!("{name}_rc"),
            id: format!("{}_rc", self.id),
            description: format!("{}_rc", self.description),
        }
    }

    /// Joins `other` to the right end of this record.
    pub fn ligated(&self, other: &Self) -> Result<Self> {
        let seq = self.seq.ligated(&other.seq)?;
        let offset = (self.len() - self.seq.three_prime_end().len()) as isize;
        let mut features = self.features.clone();
        features.extend(other.features.iter().filter_map(|f| f.shifted(offset)));
        Ok(self.with_parts(seq, features))
    }

    /// `times` copies joined head to tail; zero copies give an empty record.
    pub fn repeated(&self, times: usize) -> Result<Self> {
        if self.is_circular() {
            return Err(DnaError::Topology {
                operation: "repeated",
                required: Topology::Linear,
            });
        }
        if times == 0 {
            return Ok(self.with_parts(DNAsequence::from_sequence(""), vec![]));
        }
        let mut ret = self.clone();
        for _ in 1..times {
            ret = ret.ligated(self)?;
        }
        Ok(ret)
    }

    /// Same record with the given topology.
    pub fn with_topology(&self, topology: Topology) -> Result<Self> {
        match (self.topology(), topology) {
            (a, b) if a == b => Ok(self.clone()),
            (Topology::Circular, Topology::Linear) => {
                let seq = self.seq.slice(0..self.len())?;
                Ok(self.with_parts(seq, self.features.clone()))
            }
            _ => self.looped(),
        }
    }

    /// Position of `query` on the top strand, ignoring case. On a circular
    /// record the hit may run through the origin.
    pub fn find(&self, query: &str) -> Option<usize> {
        let query = query.as_bytes();
        if query.is_empty() {
            return Some(0);
        }
        let mut haystack = self.seq.full_watson();
        let len = haystack.len();
        if self.is_circular() && len > 0 {
            let extra = (query.len() - 1).min(len);
            haystack.extend_from_within(..extra);
        }
        haystack
            .windows(query.len())
            .position(|w| w.eq_ignore_ascii_case(query))
    }
}

impl fmt::Display for DNArecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mark = match self.topology() {
            Topology::Linear => '-',
            Topology::Circular => 'o',
        };
        write!(f, "DNArecord({mark}{})", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plasmid() -> DNArecord {
        let mut record =
            DNArecord::from_sequence_with_topology("aaaGGATCCgggTTTccc", Topology::Circular);
        record
            .push_feature(
                Feature::from_interval("misc_feature", 3, 9, Strand::Forward)
                    .with_qualifier("label", "BamHI site"),
            )
            .unwrap();
        let wrap =
            Location::new(vec![Interval::forward(15, 18), Interval::forward(0, 3)]).unwrap();
        record
            .push_feature(Feature::new("misc_feature", wrap).with_qualifier("note", "wrap"))
            .unwrap();
        record
    }

    #[test]
    fn test_new_from_sources() {
        let record = DNArecord::new("gattaca".into(), None).unwrap();
        assert!(record.is_linear());
        assert_eq!(record.len(), 7);
        let circular = DNArecord::new(record.clone().into(), Some(Topology::Circular)).unwrap();
        assert!(circular.is_circular());
        let opened = DNArecord::new(circular.seq().clone().into(), Some(Topology::Linear)).unwrap();
        assert_eq!(opened.seq(), record.seq());
    }

    #[test]
    fn test_new_sticky_cannot_loop() {
        let seq = DNAsequence::from_strands("GATCCTTT", "AAAG", -4);
        assert!(matches!(
            DNArecord::new(seq.into(), Some(Topology::Circular)),
            Err(DnaError::IncompatibleEnds { .. })
        ));
    }

    #[test]
    fn test_push_feature_checks_bounds() {
        let mut record = DNArecord::from_sequence("acgt");
        assert!(record.add_feature(0, 4, Strand::Forward, "gene").is_ok());
        assert!(record.add_feature(2, 5, Strand::Forward, "gene").is_err());
    }

    #[test]
    fn test_extract_keeps_contained_features() {
        let record = plasmid();
        let part = record.extract(2..10).unwrap();
        assert!(part.is_linear());
        assert_eq!(part.seq().watson(), b"aGGATCCg");
        assert_eq!(part.features().len(), 1);
        assert_eq!(part.features()[0].location.parts(), &[Interval::forward(1, 7)]);
        assert_eq!(part.name, "BamHI_site");
        assert_eq!(part.id, "BamHI_site");

        let nothing = record.extract(4..10).unwrap();
        assert!(nothing.features().is_empty());
        assert_eq!(nothing.name, "part_id");
    }

    #[test]
    fn test_derived_identifier_sanitised_and_capped() {
        let mut record = DNArecord::from_sequence("acgtacgtacgt");
        record
            .push_feature(
                Feature::from_interval("misc_feature", 1, 9, Strand::Forward)
                    .with_qualifier("label", "pUC19 / MCS (lacZ-alpha)"),
            )
            .unwrap();
        let part = record.extract(0..10).unwrap();
        assert_eq!(part.name, "pUC19_MCS_lacZ-a");
        assert_eq!(part.name.len(), MAX_IDENTIFIER_LEN);
    }

    #[test]
    fn test_extract_through_origin() {
        let record = plasmid();
        let part = record.extract(14..4).unwrap();
        assert_eq!(part.seq().watson(), b"TcccaaaG");
        assert_eq!(part.features().len(), 1);
        assert_eq!(part.features()[0].location.parts(), &[Interval::forward(1, 7)]);
        assert_eq!(part.name, "wrap");
    }

    #[test]
    fn test_extract_whole_circle_drops_split_features() {
        let record = plasmid();
        let opened = record.extract(9..9).unwrap();
        assert_eq!(opened.len(), 18);
        assert_eq!(opened.seq().watson(), b"gggTTTcccaaaGGATCC");
        assert_eq!(opened.features().len(), 2);
        let split = record.extract(5..5).unwrap();
        assert_eq!(split.features().len(), 1);
        assert_eq!(split.features()[0].qualifier("note").unwrap(), ["wrap"]);
    }

    #[test]
    fn test_extract_feature() {
        let record = plasmid();
        assert_eq!(record.extract_feature(0).unwrap().seq().watson(), b"GGATCC");
        assert_eq!(record.extract_feature(1).unwrap().seq().watson(), b"cccaaa");
        assert!(matches!(
            record.extract_feature(2),
            Err(DnaError::NoSuchFeature { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_reverse_complement_features() {
        let record = plasmid();
        let rc = record.reverse_complement();
        assert_eq!(rc.name, "name_rc");
        assert_eq!(rc.id, "id_rc");
        assert_eq!(rc.features()[0].location.parts(), &[
            Interval::reverse(0, 3),
            Interval::reverse(15, 18)
        ]);
        assert!(rc.features()[0].location.is_origin_split(18));
        assert_eq!(rc.features()[1].location.parts(), &[Interval::reverse(9, 15)]);
        assert_eq!(rc.features()[1].extract_sequence(rc.seq()), b"GGATCC".to_vec());
        assert_eq!(rc.reverse_complement().seq(), record.seq());
    }

    #[test]
    fn test_ligated_shifts_right_features() {
        let seq = DNAsequence::from_sequence("ggatcc");
        let (left, _) = seq.piece(0..1, 0..5);
        let (right, _) = seq.piece(1..6, 5..6);
        let left = DNArecord::from_molecule(left);
        let mut right = DNArecord::from_molecule(right);
        right.add_feature(1, 5, Strand::Forward, "misc_feature").unwrap();
        let joined = left.ligated(&right).unwrap();
        assert_eq!(joined.seq(), &seq);
        assert_eq!(joined.features()[0].location.parts(), &[Interval::forward(2, 6)]);
        assert_eq!(joined.features()[0].extract_sequence(joined.seq()), b"atcc".to_vec());
    }

    #[test]
    fn test_looped_sticky_record_features() {
        // GATC 5' protrusions on both ends
        let circle = DNArecord::from_sequence_with_topology("ATGGATCCGC", Topology::Circular);
        let (linear, _) = circle.seq().doubled().piece(3..13, 7..17);
        let mut record = DNArecord::from_molecule(linear);
        record.add_feature(5, 14, Strand::Forward, "misc_feature").unwrap();
        let looped = record.looped().unwrap();
        assert_eq!(looped.seq(), circle.rotated(3).unwrap().seq());
        assert_eq!(looped.features()[0].location.parts(), &[
            Interval::forward(5, 10),
            Interval::forward(0, 4)
        ]);
    }

    #[test]
    fn test_repeated() {
        let mut unit = DNArecord::from_sequence("acg");
        unit.add_feature(0, 2, Strand::Forward, "motif").unwrap();
        let triple = unit.repeated(3).unwrap();
        assert_eq!(triple.seq().watson(), b"acgacgacg");
        let starts: Vec<usize> = triple.features().iter().map(|f| f.location.start()).collect();
        assert_eq!(starts, vec![0, 3, 6]);
        assert_eq!(unit.repeated(1).unwrap(), unit);
        assert!(unit.repeated(0).unwrap().is_empty());
        assert!(matches!(
            plasmid().repeated(2),
            Err(DnaError::Topology { .. })
        ));

        let bamhi = crate::restriction_enzyme::RestrictionEnzyme::new("BamHI", "GGATCC", 1, 4);
        let fragments = DNArecord::from_sequence("aGGATCCtttGGATCCa").digest(&bamhi);
        let middle = &fragments[1].record;
        assert_eq!(middle.seq().watson(), b"GATCCtttG");
        assert_eq!(middle.len(), 13);
        let twice = middle.repeated(2).unwrap();
        assert_eq!(twice.seq().watson(), b"GATCCtttGGATCCtttG");
        assert_eq!(twice.len(), 22);
        assert!(matches!(
            fragments[2].record.repeated(2),
            Err(DnaError::IncompatibleEnds { .. })
        ));
    }

    #[test]
    fn test_find() {
        let record = plasmid();
        assert_eq!(record.find("ggatcc"), Some(3));
        assert_eq!(record.find("CCAAA"), Some(16));
        assert_eq!(DNArecord::from_sequence("cccaaa").find("aaac"), None);
        assert_eq!(record.find("tttt"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(plasmid().to_string(), "DNArecord(o18)");
        assert_eq!(DNArecord::from_sequence("aaa").to_string(), "DNArecord(-3)");
    }
}
