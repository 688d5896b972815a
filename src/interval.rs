//! Interval algebra over a bounded (linear) or modular (circular) coordinate line.
//!
//! An [`Interval`] is half-open and never stores `start > end`. On a modular
//! line an interval that runs past the origin is kept "unrolled": its `end`
//! exceeds the modulus, and [`Interval::split_at_origin`] turns it into the
//! two pieces that are actually stored on a feature.

use crate::error::{DnaError, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Range};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl Strand {
    pub fn flipped(self) -> Self {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
        }
    }

    pub fn is_reverse(self) -> bool {
        self == Strand::Reverse
    }

    pub fn sign(self) -> i8 {
        match self {
            Strand::Forward => 1,
            Strand::Reverse => -1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
    pub strand: Strand,
}

impl Interval {
    pub fn new(start: usize, end: usize, strand: Strand) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
            strand,
        }
    }

    pub fn forward(start: usize, end: usize) -> Self {
        Self::new(start, end, Strand::Forward)
    }

    pub fn reverse(start: usize, end: usize) -> Self {
        Self::new(start, end, Strand::Reverse)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Zero-length intervals mark point annotations such as insertion sites.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Adds `delta` to both bounds.
    ///
    /// Without a modulus the result must stay non-negative. With a modulus the
    /// start is reduced into `[0, modulus)` and the end follows it, so a
    /// shifted interval may come back unrolled past the origin.
    pub fn shift(&self, delta: isize, modulus: Option<usize>) -> Option<Self> {
        let len = self.len();
        match modulus {
            None => {
                let start = self.start.checked_add_signed(delta)?;
                Some(Self {
                    start,
                    end: start + len,
                    strand: self.strand,
                })
            }
            Some(0) => None,
            Some(m) => {
                let start = (self.start as isize + delta).rem_euclid(m as isize) as usize;
                Some(Self {
                    start,
                    end: start + len.min(m),
                    strand: self.strand,
                })
            }
        }
    }

    /// Splits an interval that runs past `modulus` into its two stored pieces.
    ///
    /// Pieces come back in 5'→3' reading order: for the forward strand the
    /// piece ending at `modulus` first, for the reverse strand the piece
    /// starting at `0` first.
    pub fn split_at_origin(&self, modulus: usize) -> Vec<Self> {
        if self.end <= modulus || modulus == 0 {
            return vec![*self];
        }
        let tail = Self {
            start: self.start,
            end: modulus,
            strand: self.strand,
        };
        let head = Self {
            start: 0,
            end: self.end - modulus,
            strand: self.strand,
        };
        match self.strand {
            Strand::Forward => vec![tail, head],
            Strand::Reverse => vec![head, tail],
        }
    }

    /// Fuses two consecutive pieces (given in reading order) into one interval.
    ///
    /// Forward pieces touch when `first.end == second.start`, reverse pieces when
    /// `second.end == first.start`; on a modular line the comparison is taken
    /// modulo `modulus` and the fused interval is returned unrolled. Zero-length
    /// pieces are never merged.
    pub fn merge_adjacent(first: &Self, second: &Self, modulus: Option<usize>) -> Option<Self> {
        if first.strand != second.strand || first.is_empty() || second.is_empty() {
            return None;
        }
        let touches = |left_end: usize, right_start: usize| match modulus {
            Some(0) => false,
            Some(m) => left_end % m == right_start % m,
            None => left_end == right_start,
        };
        let (lower, upper) = match first.strand {
            Strand::Forward => (first, second),
            Strand::Reverse => (second, first),
        };
        if !touches(lower.end, upper.start) {
            return None;
        }
        let len = lower.len() + upper.len();
        if modulus.is_some_and(|m| len > m) {
            return None;
        }
        Some(Self {
            start: lower.start,
            end: lower.start + len,
            strand: first.strand,
        })
    }

    /// Mirrors the interval onto the opposite strand of a molecule of `length`.
    pub fn flipped(&self, length: usize) -> Self {
        Self {
            start: length.saturating_sub(self.end),
            end: length.saturating_sub(self.start),
            strand: self.strand.flipped(),
        }
    }
}

/// True iff `interval` lies entirely within `outer`.
pub fn contains_fully(outer: &Range<usize>, interval: &Interval) -> bool {
    outer.start <= interval.start && interval.end <= outer.end
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sign = match self.strand {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        };
        write!(f, "[{}:{}]({})", self.start, self.end, sign)
    }
}

/// A feature location: one interval, or an ordered compound of several.
///
/// Parts are kept in 5'→3' reading order of the feature and never overlap.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Interval>", into = "Vec<Interval>")]
pub struct Location {
    parts: Vec<Interval>,
}

impl Location {
    pub fn new(parts: Vec<Interval>) -> Result<Self> {
        if parts.is_empty() {
            return Err(DnaError::InvalidLocation(
                "a location needs at least one part".to_string(),
            ));
        }
        let mut sorted: Vec<&Interval> = parts.iter().filter(|p| !p.is_empty()).collect();
        sorted.sort_by_key(|p| (p.start, p.end));
        if let Some(pair) = sorted.windows(2).find(|w| w[0].end > w[1].start) {
            return Err(DnaError::InvalidLocation(format!(
                "parts {} and {} overlap",
                pair[0], pair[1]
            )));
        }
        Ok(Self { parts })
    }

    pub fn simple(interval: Interval) -> Self {
        Self {
            parts: vec![interval],
        }
    }

    pub fn parts(&self) -> &[Interval] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<Interval> {
        self.parts
    }

    pub fn is_compound(&self) -> bool {
        self.parts.len() > 1
    }

    /// Lowest start over all parts.
    pub fn start(&self) -> usize {
        self.parts.iter().map(|p| p.start).min().unwrap_or_default()
    }

    /// Highest end over all parts.
    pub fn end(&self) -> usize {
        self.parts.iter().map(|p| p.end).max().unwrap_or_default()
    }

    /// Number of bases covered.
    pub fn len(&self) -> usize {
        self.parts.iter().map(Interval::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Majority strand of the parts, forward on a tie.
    pub fn strand(&self) -> Strand {
        let reverse = self.parts.iter().filter(|p| p.strand.is_reverse()).count();
        if reverse > self.parts.len() / 2 {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }

    pub fn contained_in(&self, outer: &Range<usize>) -> bool {
        self.parts.iter().all(|p| contains_fully(outer, p))
    }

    /// True when the location is stored split at the origin of a circle of
    /// `modulus`: a piece ending at `modulus` directly followed (in reading
    /// order) by a piece starting at `0`.
    pub fn is_origin_split(&self, modulus: usize) -> bool {
        self.origin_split_index(modulus).is_some()
    }

    /// Index of the first of the two reading-order-consecutive parts that
    /// meet at the origin.
    pub(crate) fn origin_split_index(&self, modulus: usize) -> Option<usize> {
        self.parts.windows(2).position(|w| {
            let (lower, upper) = match w[0].strand {
                Strand::Forward => (&w[0], &w[1]),
                Strand::Reverse => (&w[1], &w[0]),
            };
            w[0].strand == w[1].strand
                && !lower.is_empty()
                && !upper.is_empty()
                && lower.end == modulus
                && upper.start == 0
        })
    }

    /// Linear shift of every part; `None` if any part would leave the line.
    pub fn shifted(&self, delta: isize) -> Option<Self> {
        let parts = self
            .parts
            .iter()
            .map(|p| p.shift(delta, None))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { parts })
    }

    /// Mirrors the location onto the opposite strand; reading order is kept.
    pub fn flipped(&self, length: usize) -> Self {
        Self {
            parts: self.parts.iter().map(|p| p.flipped(length)).collect(),
        }
    }
}

impl TryFrom<Vec<Interval>> for Location {
    type Error = DnaError;

    fn try_from(parts: Vec<Interval>) -> Result<Self> {
        Self::new(parts)
    }
}

impl From<Location> for Vec<Interval> {
    fn from(location: Location) -> Self {
        location.parts
    }
}

impl From<Interval> for Location {
    fn from(interval: Interval) -> Self {
        Self::simple(interval)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.parts.len() == 1 {
            return write!(f, "{}", self.parts[0]);
        }
        let parts: Vec<String> = self.parts.iter().map(|p| p.to_string()).collect();
        write!(f, "join{{{}}}", parts.join(", "))
    }
}
