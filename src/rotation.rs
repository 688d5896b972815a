//! Moving the origin of a circular record, and finding the origin that lines
//! a record up with a reference sequence.

use crate::{
    dna_record::DNArecord,
    dna_sequence::Topology,
    error::{DnaError, Result},
    feature::Feature,
    interval::{Interval, Location},
    matcher::{CommonSubstring, Matcher, SeedExtendMatcher},
};

/// Moves a location on a circle of `modulus` by `delta`.
///
/// A piece pair that only exists because the location ran through the old
/// origin is fused first, so that it comes out whole when the new origin no
/// longer cuts it.
pub fn rotated_location(location: &Location, delta: isize, modulus: usize) -> Option<Location> {
    let mut parts = location.parts().to_vec();
    if let Some(i) = location.origin_split_index(modulus) {
        if let Some(merged) = Interval::merge_adjacent(&parts[i], &parts[i + 1], Some(modulus)) {
            parts[i] = merged;
            parts.remove(i + 1);
        }
    }
    let parts: Vec<Interval> = parts
        .iter()
        .filter_map(|p| p.shift(delta, Some(modulus)))
        .flat_map(|p| p.split_at_origin(modulus))
        .collect();
    if parts.is_empty() {
        return None;
    }
    Location::new(parts).ok()
}

impl DNArecord {
    /// Record with its origin moved to position `shift` (modulo the length).
    pub fn rotated(&self, shift: isize) -> Result<Self> {
        if self.is_linear() {
            return Err(DnaError::Topology {
                operation: "rotated",
                required: Topology::Circular,
            });
        }
        let len = self.len();
        if len == 0 || shift.rem_euclid(len as isize) == 0 {
            return Ok(self.clone());
        }
        let seq = self.seq().rotated(shift)?;
        let mut features: Vec<Feature> = self
            .features()
            .iter()
            .filter_map(|f| match rotated_location(&f.location, -shift, len) {
                Some(location) => Some(f.with_location(location)),
                None => {
                    log::debug!("{} feature at {} vanished on rotation", f.kind, f.location);
                    None
                }
            })
            .collect();
        features.sort_by_key(|f| f.location.start());
        Ok(self.with_parts(seq, features))
    }

    /// Rotates (and if that fits better, flips) a circular record so that its
    /// top strand starts where `reference` starts. Uses [`SeedExtendMatcher`].
    pub fn synced(&self, reference: &str, limit: usize) -> Result<Self> {
        self.synced_with(reference, limit, &SeedExtendMatcher)
    }

    /// Like [`DNArecord::synced`] with a caller-supplied matcher.
    ///
    /// Only matches anchored at the start of `reference` count. The longer one
    /// wins; on equal length the top strand is kept.
    pub fn synced_with<M: Matcher + ?Sized>(
        &self,
        reference: &str,
        limit: usize,
        matcher: &M,
    ) -> Result<Self> {
        if self.is_linear() {
            return Err(DnaError::Topology {
                operation: "synced",
                required: Topology::Circular,
            });
        }
        let limit = limit.max(1);
        let min_length = if self.len() < limit { 1 } else { limit };
        let reference = reference.to_ascii_lowercase();

        let best_anchored = |strand: &[u8]| -> Option<CommonSubstring> {
            let doubled = [strand, strand].concat().to_ascii_lowercase();
            matcher
                .common_substrings(&doubled, reference.as_bytes(), min_length)
                .into_iter()
                .filter(|m| m.start_b == 0)
                .max_by(|x, y| x.length.cmp(&y.length).then(y.start_a.cmp(&x.start_a)))
        };
        let forward = best_anchored(self.seq().watson());
        let reverse = best_anchored(self.seq().crick());

        let (record, start) = match (forward, reverse) {
            (None, None) => return Err(DnaError::NoOverlap),
            (Some(f), Some(r)) if r.length > f.length => (self.reverse_complement(), r.start_a),
            (None, Some(r)) => (self.reverse_complement(), r.start_a),
            (Some(f), _) => (self.clone(), f.start_a),
        };
        log::info!("synced {} to reference, new origin at {start}", self.name);
        if start == 0 {
            Ok(record)
        } else {
            record.rotated(start as isize)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::{Interval, Strand};

    fn circle(seq: &str) -> DNArecord {
        DNArecord::from_sequence_with_topology(seq, Topology::Circular)
    }

    #[test]
    fn test_rotated_sequence() {
        let record = circle("aaat");
        assert_eq!(record.rotated(1).unwrap().seq().watson(), b"aata");
        assert!(matches!(
            DNArecord::from_sequence("aaat").rotated(1),
            Err(DnaError::Topology { .. })
        ));
    }

    #[test]
    fn test_point_at_circle_end_round_trips() {
        let mut record = circle("acgtacgt");
        record.add_feature(8, 8, Strand::Forward, "insertion").unwrap();
        assert_eq!(record.features()[0].location.parts(), &[Interval::forward(0, 0)]);
        let back = record.rotated(3).unwrap().rotated(5).unwrap();
        assert_eq!(back, record);
        let moved = record.rotated(3).unwrap();
        assert_eq!(moved.features()[0].location.parts(), &[Interval::forward(5, 5)]);
    }

    #[test]
    fn test_rotation_identity() {
        let mut record = circle("aaaGGATCCggg");
        record.add_feature(2, 5, Strand::Reverse, "misc_feature").unwrap();
        assert_eq!(record.rotated(0).unwrap(), record);
        assert_eq!(record.rotated(12).unwrap(), record);
        assert_eq!(record.rotated(-24).unwrap(), record);
    }

    #[test]
    fn test_split_feature_merges_when_origin_moves() {
        let mut record = circle("aaaGGATCCggg");
        let location =
            Location::new(vec![Interval::forward(5, 12), Interval::forward(0, 3)]).unwrap();
        record.push_feature(Feature::new("misc_feature", location)).unwrap();
        let rotated = record.rotated(5).unwrap();
        assert_eq!(rotated.features()[0].location.parts(), &[Interval::forward(0, 10)]);
        let back = rotated.rotated(7).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_feature_split_by_new_origin() {
        let mut record = circle("aaaGGATCCggg");
        record.add_feature(3, 9, Strand::Reverse, "misc_feature").unwrap();
        let rotated = record.rotated(6).unwrap();
        assert_eq!(rotated.features()[0].location.parts(), &[
            Interval::reverse(0, 3),
            Interval::reverse(9, 12)
        ]);
        assert_eq!(
            rotated.features()[0].extract_sequence(rotated.seq()),
            b"GGATCC".to_vec()
        );
    }

    #[test]
    fn test_zero_length_feature_moves() {
        let mut record = circle("acgtacgt");
        record.add_feature(2, 2, Strand::Forward, "misc_feature").unwrap();
        let rotated = record.rotated(5).unwrap();
        assert_eq!(rotated.features()[0].location.parts(), &[Interval::forward(5, 5)]);
    }

    #[test]
    fn test_features_sorted_after_rotation() {
        let mut record = circle("acgtacgtac");
        record.add_feature(1, 3, Strand::Forward, "a").unwrap();
        record.add_feature(6, 8, Strand::Forward, "b").unwrap();
        let rotated = record.rotated(5).unwrap();
        assert_eq!(rotated.features()[0].kind, "b");
        assert_eq!(rotated.features()[0].location.parts(), &[Interval::forward(1, 3)]);
        assert_eq!(rotated.features()[1].location.parts(), &[Interval::forward(6, 8)]);
    }

    #[test]
    fn test_synced_recombinant() {
        let original = circle("gaat");
        let opened = original.extract(2..2).unwrap();
        assert_eq!(opened.seq().watson(), b"atga");
        let recombinant = opened
            .ligated(&DNArecord::from_sequence("CCC"))
            .unwrap()
            .looped()
            .unwrap();
        assert_eq!(recombinant.seq().watson(), b"atgaCCC");
        let synced = recombinant.synced("gaat", 25).unwrap();
        assert_eq!(synced.seq().watson(), b"gaCCCat");
    }

    #[test]
    fn test_synced_reverse_strand() {
        let record = circle("ttttGGGCCAaaa");
        let reference = "tttggccc";
        let synced = record.synced(reference, 3).unwrap();
        assert!(synced.seq().watson_string().to_lowercase().starts_with("tttggccc"));
        assert_eq!(synced.name, "name_rc");
    }

    #[test]
    fn test_synced_errors() {
        assert!(matches!(
            DNArecord::from_sequence("gaat").synced("gaat", 25),
            Err(DnaError::Topology { .. })
        ));
        assert!(matches!(
            circle("aaaa").synced("cc", 25),
            Err(DnaError::NoOverlap)
        ));
    }
}
