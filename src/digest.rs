//! Cutting a record into fragments.
//!
//! Cut sites come from a [`DigestSiteProvider`]; this module owns what they
//! do to the molecule and to its features. A feature survives on the one
//! fragment that contains all of it, and is lost when a cut runs through it.

use crate::{
    dna_record::{DNArecord, MAX_IDENTIFIER_LEN},
    dna_sequence::{DNAsequence, Topology},
    error::{DnaError, Result},
    feature::Feature,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Where the two strands are severed, as display columns: the top strand
/// breaks just before column `watson`, the bottom strand just before `crick`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CutSite {
    pub watson: usize,
    pub crick: usize,
}

impl CutSite {
    pub fn new(watson: usize, crick: usize) -> Self {
        Self { watson, crick }
    }

    pub fn blunt(position: usize) -> Self {
        Self::new(position, position)
    }

    /// Negative for 5' protrusions, positive for 3' ones.
    pub fn overhang(&self) -> isize {
        self.watson as isize - self.crick as isize
    }

    fn first(&self) -> usize {
        self.watson.min(self.crick)
    }

    fn shifted(&self, delta: isize) -> Self {
        Self {
            watson: self.watson.saturating_add_signed(delta),
            crick: self.crick.saturating_add_signed(delta),
        }
    }
}

/// Anything that can tell where a molecule gets cut.
pub trait DigestSiteProvider {
    fn cut_sites(&self, seq: &DNAsequence) -> Vec<CutSite>;
}

impl DigestSiteProvider for [CutSite] {
    fn cut_sites(&self, _seq: &DNAsequence) -> Vec<CutSite> {
        self.to_vec()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub record: DNArecord,
    /// First column of the fragment in the frame of the digested record.
    pub start: usize,
    pub length: usize,
    /// Index (into the cut sites passed in) of the cut that made each end.
    pub left_cut: Option<usize>,
    pub right_cut: Option<usize>,
}

impl Fragment {
    fn uncut(record: &DNArecord) -> Self {
        Self {
            record: record.clone(),
            start: 0,
            length: record.len(),
            left_cut: None,
            right_cut: None,
        }
    }
}

impl DNArecord {
    /// Distinct cut sites that actually sever this molecule, paired with
    /// their index in `sites`. Circular sites are reduced into the first turn.
    fn usable_cuts(&self, sites: &[CutSite]) -> Vec<(usize, CutSite)> {
        let seq = self.seq();
        let ret = match self.topology() {
            Topology::Linear => {
                let (wo, co) = (seq.watson_offset(), seq.crick_offset());
                let (lw, lc) = (seq.watson().len(), seq.crick().len());
                sites
                    .iter()
                    .copied()
                    .enumerate()
                    .filter(|(_, site)| {
                        let inside = wo < site.watson
                            && site.watson < wo + lw
                            && co < site.crick
                            && site.crick < co + lc;
                        if !inside {
                            log::debug!("ignoring cut {site:?} outside the strands of {self}");
                        }
                        inside
                    })
                    .collect::<Vec<_>>()
            }
            Topology::Circular => {
                let len = self.len() as isize;
                if len == 0 {
                    return vec![];
                }
                sites
                    .iter()
                    .enumerate()
                    .filter_map(|(i, site)| {
                        let delta = site.crick as isize - site.watson as isize;
                        if delta.abs() >= len {
                            log::debug!("ignoring cut {site:?} longer than {self}");
                            return None;
                        }
                        let mut watson = site.watson as isize % len;
                        let mut crick = watson + delta;
                        if crick < 0 {
                            watson += len;
                            crick += len;
                        }
                        Some((i, CutSite::new(watson as usize, crick as usize)))
                    })
                    .collect()
            }
        };
        ret.into_iter()
            .unique_by(|(_, site)| *site)
            .sorted_by_key(|(_, site)| (site.first(), site.watson))
            .collect()
    }

    pub fn number_of_cuts<P: DigestSiteProvider + ?Sized>(&self, provider: &P) -> usize {
        self.usable_cuts(&provider.cut_sites(self.seq())).len()
    }

    pub fn digest<P: DigestSiteProvider + ?Sized>(&self, provider: &P) -> Vec<Fragment> {
        self.cut(&provider.cut_sites(self.seq()))
    }

    /// Cuts at `sites`. Without a usable cut the record comes back whole.
    pub fn cut(&self, sites: &[CutSite]) -> Vec<Fragment> {
        let cuts = self.usable_cuts(sites);
        if cuts.is_empty() {
            return vec![Fragment::uncut(self)];
        }
        match self.topology() {
            Topology::Linear => self.cut_linear(&cuts),
            Topology::Circular => self.cut_circular(&cuts),
        }
    }

    fn cut_linear(&self, cuts: &[(usize, CutSite)]) -> Vec<Fragment> {
        let len = self.len();
        let bounds = std::iter::once((None, CutSite::blunt(0)))
            .chain(cuts.iter().map(|(i, site)| (Some(*i), *site)))
            .chain(std::iter::once((None, CutSite::blunt(len))));
        bounds
            .tuple_windows()
            .map(|((left_cut, left), (right_cut, right))| {
                let (seq, start) = self
                    .seq()
                    .piece(left.watson..right.watson, left.crick..right.crick);
                let owned = left.first()..right.first();
                self.fragment(seq, start, owned, 0, self.features(), left_cut, right_cut)
            })
            .collect()
    }

    fn cut_circular(&self, cuts: &[(usize, CutSite)]) -> Vec<Fragment> {
        let len = self.len();
        let origin = cuts[0].1.first();
        let rotated = match self.rotated(origin as isize) {
            Ok(rotated) => rotated,
            Err(e) => {
                log::warn!("could not move the origin of {self} to {origin}: {e}");
                return vec![Fragment::uncut(self)];
            }
        };
        let doubled = rotated.seq().doubled();
        let delta = -(origin as isize);
        let first = (cuts[0].0, cuts[0].1.shifted(delta + len as isize));
        cuts.iter()
            .map(|(i, site)| (*i, site.shifted(delta)))
            .chain(std::iter::once(first))
            .tuple_windows()
            .map(|((left_cut, left), (right_cut, right))| {
                let (seq, start) = doubled.piece(left.watson..right.watson, left.crick..right.crick);
                let owned = left.first()..right.first();
                self.fragment(
                    seq,
                    start,
                    owned,
                    origin,
                    rotated.features(),
                    Some(left_cut),
                    Some(right_cut),
                )
            })
            .collect()
    }

    /// Wraps one piece: `start` is its first column in the frame `features`
    /// live in, which is the record's own frame moved by `origin`.
    ///
    /// A cut is placed at the lower of its two strand positions, so the
    /// single-stranded stretch it leaves belongs to the fragment on its
    /// right. `owned` runs from the left cut to the right cut in that sense;
    /// a feature is kept only if it lies inside it, and a zero-length one
    /// sitting on the right cut goes to the next fragment.
    #[allow(clippy::too_many_arguments)]
    fn fragment(
        &self,
        seq: DNAsequence,
        start: usize,
        owned: Range<usize>,
        origin: usize,
        features: &[Feature],
        left_cut: Option<usize>,
        right_cut: Option<usize>,
    ) -> Fragment {
        let record_end = self.len();
        let features = features
            .iter()
            .filter(|f| f.location.contained_in(&owned))
            .filter(|f| {
                !(f.location.is_empty() && f.location.start() == owned.end && owned.end < record_end)
            })
            .filter_map(|f| f.shifted(-(start as isize)))
            .collect();
        let length = seq.len();
        let record_len = self.len().max(1);
        Fragment {
            record: self.with_parts(seq, features),
            start: (start + origin) % record_len,
            length,
            left_cut,
            right_cut,
        }
    }

    /// Opens a circular record with cuts that yield exactly one fragment.
    pub fn linearize(&self, sites: &[CutSite]) -> Result<Self> {
        if self.is_linear() {
            return Err(DnaError::Topology {
                operation: "linearize",
                required: Topology::Circular,
            });
        }
        let mut fragments = self.cut(sites);
        if fragments.len() > 1 {
            return Err(DnaError::AmbiguousDigestion {
                count: fragments.len(),
            });
        }
        let mut ret = match fragments.pop() {
            Some(fragment) if fragment.record.is_linear() => fragment.record,
            _ => return Err(DnaError::NoCut),
        };
        ret.id = format!("{}_lin", self.name);
        ret.name = ret.id.chars().take(MAX_IDENTIFIER_LEN).collect();
        log::info!("linearized {} into {}", self.name, ret);
        Ok(ret)
    }

    pub fn linearize_with<P: DigestSiteProvider + ?Sized>(&self, provider: &P) -> Result<Self> {
        self.linearize(&provider.cut_sites(self.seq()))
    }
}
