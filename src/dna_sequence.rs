//! The double-stranded molecule: two strands, a topology and a stagger.
//!
//! Coordinates are display columns: column 0 is the leftmost base of either
//! strand, watson is read left to right, crick is drawn underneath 3'→5'.
//!
//! ```text
//!   GATCCTTT          watson, overhang = -5
//!        AAAGCCTAG    crick, drawn reversed
//! ```

use crate::{
    error::{DnaError, Result},
    iupac_code::IupacCode,
};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, ops::Range};

type DNAstring = Vec<u8>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topology {
    #[default]
    Linear,
    Circular,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Topology::Linear => write!(f, "linear"),
            Topology::Circular => write!(f, "circular"),
        }
    }
}

/// One end of a linear molecule. The sequence is the single-stranded part,
/// written 5'→3' on the strand that carries it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StickyEnd {
    #[default]
    Blunt,
    FivePrime(DNAstring),
    ThreePrime(DNAstring),
}

impl StickyEnd {
    pub fn is_blunt(&self) -> bool {
        matches!(self, StickyEnd::Blunt)
    }

    pub fn is_sticky(&self) -> bool {
        !self.is_blunt()
    }

    pub fn sequence(&self) -> &[u8] {
        match self {
            StickyEnd::Blunt => &[],
            StickyEnd::FivePrime(s) | StickyEnd::ThreePrime(s) => s,
        }
    }

    pub fn len(&self) -> usize {
        self.sequence().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence().is_empty()
    }

    /// Two ends anneal when both are blunt, or both protrude the same kind of
    /// strand end and one single strand is the reverse complement of the other.
    pub fn is_compatible_with(&self, other: &StickyEnd) -> bool {
        match (self, other) {
            (StickyEnd::Blunt, StickyEnd::Blunt) => true,
            (StickyEnd::FivePrime(a), StickyEnd::FivePrime(b))
            | (StickyEnd::ThreePrime(a), StickyEnd::ThreePrime(b)) => {
                a.len() == b.len() && a.eq_ignore_ascii_case(&IupacCode::reverse_complement(b))
            }
            _ => false,
        }
    }
}

impl fmt::Display for StickyEnd {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StickyEnd::Blunt => write!(f, "blunt"),
            StickyEnd::FivePrime(s) => write!(f, "5'{}", String::from_utf8_lossy(s)),
            StickyEnd::ThreePrime(s) => write!(f, "3'{}", String::from_utf8_lossy(s)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DNAsequenceRepr", into = "DNAsequenceRepr")]
pub struct DNAsequence {
    watson: DNAstring,
    crick: DNAstring,
    overhang: isize,
    topology: Topology,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct DNAsequenceRepr {
    watson: String,
    crick: String,
    #[serde(default)]
    overhang: isize,
    #[serde(default)]
    topology: Topology,
}

impl TryFrom<DNAsequenceRepr> for DNAsequence {
    type Error = DnaError;

    fn try_from(repr: DNAsequenceRepr) -> Result<Self> {
        DNAsequence::new(
            repr.watson.as_bytes(),
            repr.crick.as_bytes(),
            repr.overhang,
            repr.topology,
        )
    }
}

impl From<DNAsequence> for DNAsequenceRepr {
    fn from(seq: DNAsequence) -> Self {
        Self {
            watson: seq.watson_string(),
            crick: seq.crick_string(),
            overhang: seq.overhang,
            topology: seq.topology,
        }
    }
}

impl DNAsequence {
    /// Builds a molecule from explicit strands, both given 5'→3'.
    pub fn new(watson: &[u8], crick: &[u8], overhang: isize, topology: Topology) -> Result<Self> {
        let watson = Self::validate_dna_sequence(watson);
        let crick = Self::validate_dna_sequence(crick);
        if topology == Topology::Circular {
            if overhang != 0 {
                return Err(DnaError::InvalidMolecule(format!(
                    "circular molecule with overhang {overhang}"
                )));
            }
            if watson.len() != crick.len() {
                return Err(DnaError::InvalidMolecule(format!(
                    "circular strands differ in length ({} / {})",
                    watson.len(),
                    crick.len()
                )));
            }
        }
        Ok(Self {
            watson,
            crick,
            overhang,
            topology,
        })
    }

    /// Blunt linear molecule; the crick strand is the reverse complement.
    pub fn from_sequence(sequence: &str) -> Self {
        Self::from_u8(sequence.as_bytes())
    }

    pub fn from_sequence_with_topology(sequence: &str, topology: Topology) -> Self {
        let mut ret = Self::from_sequence(sequence);
        ret.topology = topology;
        ret
    }

    /// Linear molecule from two strands, each 5'→3'.
    pub fn from_strands(watson: &str, crick: &str, overhang: isize) -> Self {
        Self {
            watson: Self::validate_dna_sequence(watson.as_bytes()),
            crick: Self::validate_dna_sequence(crick.as_bytes()),
            overhang,
            topology: Topology::Linear,
        }
    }

    fn from_u8(s: &[u8]) -> Self {
        let watson = Self::validate_dna_sequence(s);
        let crick = IupacCode::reverse_complement(&watson);
        Self {
            watson,
            crick,
            overhang: 0,
            topology: Topology::Linear,
        }
    }

    /// Drops whitespace and replaces non-nucleotide letters by `N`, keeping case.
    pub fn validate_dna_sequence(v: &[u8]) -> Vec<u8> {
        v.iter()
            .filter(|c| !c.is_ascii_whitespace())
            .map(|c| {
                if IupacCode::is_valid_letter(*c) {
                    *c
                } else if c.is_ascii_lowercase() {
                    b'n'
                } else {
                    b'N'
                }
            })
            .collect()
    }

    pub fn watson(&self) -> &[u8] {
        &self.watson
    }

    pub fn crick(&self) -> &[u8] {
        &self.crick
    }

    pub fn watson_string(&self) -> String {
        String::from_utf8_lossy(&self.watson).to_string()
    }

    pub fn crick_string(&self) -> String {
        String::from_utf8_lossy(&self.crick).to_string()
    }

    pub fn overhang(&self) -> isize {
        self.overhang
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn is_circular(&self) -> bool {
        self.topology == Topology::Circular
    }

    pub fn is_linear(&self) -> bool {
        self.topology == Topology::Linear
    }

    #[inline(always)]
    pub(crate) fn watson_offset(&self) -> usize {
        self.overhang.max(0) as usize
    }

    #[inline(always)]
    pub(crate) fn crick_offset(&self) -> usize {
        (-self.overhang).max(0) as usize
    }

    /// Footprint of the molecule, single-stranded protrusions included.
    #[inline(always)]
    pub fn len(&self) -> usize {
        (self.watson_offset() + self.watson.len()).max(self.crick_offset() + self.crick.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The top strand over the whole footprint; columns where watson is
    /// missing are filled with the complement of the crick base.
    pub fn full_watson(&self) -> Vec<u8> {
        let (wo, co) = (self.watson_offset(), self.crick_offset());
        let lc = self.crick.len();
        (0..self.len())
            .map(|x| {
                if x >= wo && x - wo < self.watson.len() {
                    self.watson[x - wo]
                } else if x >= co && x - co < lc {
                    IupacCode::letter_complement(self.crick[lc - 1 - (x - co)])
                } else {
                    b'N'
                }
            })
            .collect()
    }

    /// Left end, where the watson strand has its 5' end.
    pub fn five_prime_end(&self) -> StickyEnd {
        if self.is_circular() {
            return StickyEnd::Blunt;
        }
        match self.overhang.cmp(&0) {
            Ordering::Greater => {
                let k = (self.overhang as usize).min(self.crick.len());
                StickyEnd::ThreePrime(self.crick[self.crick.len() - k..].to_vec())
            }
            Ordering::Less => {
                let k = ((-self.overhang) as usize).min(self.watson.len());
                StickyEnd::FivePrime(self.watson[..k].to_vec())
            }
            Ordering::Equal => StickyEnd::Blunt,
        }
    }

    /// Right end, where the watson strand has its 3' end.
    pub fn three_prime_end(&self) -> StickyEnd {
        if self.is_circular() {
            return StickyEnd::Blunt;
        }
        let watson_end = self.watson_offset() + self.watson.len();
        let crick_end = self.crick_offset() + self.crick.len();
        match watson_end.cmp(&crick_end) {
            Ordering::Greater => {
                let k = (watson_end - crick_end).min(self.watson.len());
                StickyEnd::ThreePrime(self.watson[self.watson.len() - k..].to_vec())
            }
            Ordering::Less => {
                let k = (crick_end - watson_end).min(self.crick.len());
                StickyEnd::FivePrime(self.crick[..k].to_vec())
            }
            Ordering::Equal => StickyEnd::Blunt,
        }
    }

    /// Cuts the watson strand to the display columns `watson` and the crick
    /// strand to `crick`, treating the molecule as linear. Returns the piece
    /// and the display column where its footprint starts.
    pub(crate) fn piece(&self, watson: Range<usize>, crick: Range<usize>) -> (Self, usize) {
        let (wo, co) = (self.watson_offset(), self.crick_offset());
        let (lw, lc) = (self.watson.len(), self.crick.len());
        let w_lo = watson.start.clamp(wo, wo + lw);
        let w_hi = watson.end.clamp(w_lo, wo + lw);
        let c_lo = crick.start.clamp(co, co + lc);
        let c_hi = crick.end.clamp(c_lo, co + lc);

        let new_watson = self.watson[w_lo - wo..w_hi - wo].to_vec();
        let new_crick = self.crick[lc - (c_hi - co)..lc - (c_lo - co)].to_vec();
        let (overhang, start) = match (new_watson.is_empty(), new_crick.is_empty()) {
            (false, false) => (w_lo as isize - c_lo as isize, w_lo.min(c_lo)),
            (false, true) => (0, w_lo),
            (true, false) => (0, c_lo),
            (true, true) => (0, watson.start.min(crick.start).min(self.len())),
        };
        let piece = Self {
            watson: new_watson,
            crick: new_crick,
            overhang,
            topology: Topology::Linear,
        };
        (piece, start)
    }

    /// The circle opened at its origin and written twice, so that every
    /// rotation is a contiguous window.
    pub(crate) fn doubled(&self) -> Self {
        Self {
            watson: [self.watson.as_slice(), self.watson.as_slice()].concat(),
            crick: [self.crick.as_slice(), self.crick.as_slice()].concat(),
            overhang: 0,
            topology: Topology::Linear,
        }
    }

    /// Linear sub-molecule covering the display columns of `range`.
    ///
    /// On a circular molecule `start >= end` reads through the origin
    /// (`start == end` yields the whole circle opened at `start`).
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        Ok(self.slice_with_start(range)?.0)
    }

    pub(crate) fn slice_with_start(&self, range: Range<usize>) -> Result<(Self, usize)> {
        let Range { start, end } = range;
        let len = self.len();
        if start > len || end > len {
            return Err(DnaError::InvalidRange { start, end, len });
        }
        match self.topology {
            Topology::Linear => {
                if start > end {
                    return Err(DnaError::InvalidRange { start, end, len });
                }
                Ok(self.piece(start..end, start..end))
            }
            Topology::Circular => {
                let end = if start < end { end } else { end + len };
                let (piece, _) = self.doubled().piece(start..end, start..end);
                Ok((piece, start))
            }
        }
    }

    pub fn reverse_complement(&self) -> Self {
        let overhang = match self.topology {
            Topology::Circular => 0,
            Topology::Linear => {
                self.overhang + self.watson.len() as isize - self.crick.len() as isize
            }
        };
        Self {
            watson: self.crick.clone(),
            crick: self.watson.clone(),
            overhang,
            topology: self.topology,
        }
    }

    /// Closes a linear molecule whose two ends can ligate to each other.
    pub fn looped(&self) -> Result<Self> {
        if self.is_circular() {
            return Err(DnaError::Topology {
                operation: "looped",
                required: Topology::Linear,
            });
        }
        let left = self.five_prime_end();
        let right = self.three_prime_end();
        if !left.is_compatible_with(&right) || self.watson.len() != self.crick.len() {
            return Err(DnaError::IncompatibleEnds {
                left: left.to_string(),
                right: right.to_string(),
            });
        }
        let len = self.watson.len();
        let crick = if len == 0 {
            vec![]
        } else {
            let r = (-self.overhang).rem_euclid(len as isize) as usize;
            [&self.crick[r..], &self.crick[..r]].concat()
        };
        Ok(Self {
            watson: self.watson.clone(),
            crick,
            overhang: 0,
            topology: Topology::Circular,
        })
    }

    /// Moves the origin of a circular molecule to column `shift` (mod length).
    pub fn rotated(&self, shift: isize) -> Result<Self> {
        if self.is_linear() {
            return Err(DnaError::Topology {
                operation: "rotated",
                required: Topology::Circular,
            });
        }
        let len = self.len();
        if len == 0 {
            return Ok(self.clone());
        }
        let shift = shift.rem_euclid(len as isize) as usize;
        if shift == 0 {
            return Ok(self.clone());
        }
        self.slice(shift..shift)?.looped()
    }

    /// Joins `other` to the right end of this molecule.
    pub fn ligated(&self, other: &Self) -> Result<Self> {
        if self.is_circular() || other.is_circular() {
            return Err(DnaError::Topology {
                operation: "ligated",
                required: Topology::Linear,
            });
        }
        let right = self.three_prime_end();
        let left = other.five_prime_end();
        if !right.is_compatible_with(&left) {
            return Err(DnaError::IncompatibleEnds {
                left: right.to_string(),
                right: left.to_string(),
            });
        }
        Ok(Self {
            watson: [self.watson.as_slice(), other.watson.as_slice()].concat(),
            crick: [other.crick.as_slice(), self.crick.as_slice()].concat(),
            overhang: self.overhang,
            topology: Topology::Linear,
        })
    }

    /// Same molecule with the given topology, opening or looping as needed.
    pub fn with_topology(&self, topology: Topology) -> Result<Self> {
        match (self.topology, topology) {
            (a, b) if a == b => Ok(self.clone()),
            (Topology::Circular, Topology::Linear) => self.slice(0..self.len()),
            _ => self.looped(),
        }
    }
}

impl fmt::Display for DNAsequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let crick: String = self.crick.iter().rev().map(|c| *c as char).collect();
        writeln!(
            f,
            "{}{}",
            " ".repeat(self.watson_offset()),
            String::from_utf8_lossy(&self.watson)
        )?;
        write!(f, "{}{}", " ".repeat(self.crick_offset()), crick)
    }
}

impl From<String> for DNAsequence {
    fn from(s: String) -> Self {
        DNAsequence::from_u8(s.as_bytes())
    }
}
