use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    digest::{CutSite, DigestSiteProvider},
    dna_record::DNArecord,
    dna_sequence::DNAsequence,
    iupac_code::IupacCode,
};

/// A recognition sequence with its cut geometry.
///
/// `cut` is where the top strand is severed, counted from the first base of
/// the site; the bottom strand is severed `overlap` bases further right.
/// A positive overlap leaves 5' protrusions, a negative one 3' protrusions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RestrictionEnzyme {
    pub name: String,
    pub sequence: String,
    pub note: Option<String>,
    pub cut: isize,
    pub overlap: isize,
    #[serde(skip_serializing, default)]
    is_palindromic: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestrictionEnzymeSite {
    pub offset: usize,
    pub forward_strand: bool,
    pub cut: CutSite,
}

impl RestrictionEnzyme {
    pub fn new(name: &str, sequence: &str, cut: isize, overlap: isize) -> Self {
        let mut ret = Self {
            name: name.to_string(),
            sequence: sequence.to_ascii_uppercase(),
            note: None,
            cut,
            overlap,
            is_palindromic: false,
        };
        ret.check_palindromic();
        ret
    }

    pub fn check_palindromic(&mut self) {
        self.is_palindromic = self.sequence.as_bytes() == self.sequence_rc().as_slice();
    }

    pub fn is_palindromic(&self) -> bool {
        self.is_palindromic
    }

    fn sequence_rc(&self) -> Vec<u8> {
        IupacCode::reverse_complement(self.sequence.as_bytes())
    }

    fn site_matches(site: &[u8], window: &[u8]) -> bool {
        site.len() == window.len()
            && site
                .iter()
                .zip(window)
                .all(|(code, base)| IupacCode::from_letter(*code).matches(*base))
    }

    /// Recognition sites on both strands. On a circular molecule a site may
    /// run through the origin.
    pub fn get_sites(&self, seq: &DNAsequence) -> Vec<RestrictionEnzymeSite> {
        let site = self.sequence.as_bytes();
        let n = site.len();
        let mut haystack = seq.full_watson();
        let len = haystack.len();
        if n == 0 || len == 0 {
            return vec![];
        }
        if seq.is_circular() {
            haystack.extend_from_within(..(n - 1).min(len));
        }
        let site_rc = self.sequence_rc();
        let mut ret = vec![];
        for (offset, window) in haystack.windows(n).enumerate().take(len) {
            if Self::site_matches(site, window) {
                let watson = offset as isize + self.cut;
                let crick = watson + self.overlap;
                if let Some(cut) = Self::place_cut(seq, watson, crick) {
                    ret.push(RestrictionEnzymeSite {
                        offset,
                        forward_strand: true,
                        cut,
                    });
                }
            }
            if !self.is_palindromic && Self::site_matches(&site_rc, window) {
                let crick = (offset + n) as isize - self.cut;
                let watson = crick - self.overlap;
                if let Some(cut) = Self::place_cut(seq, watson, crick) {
                    ret.push(RestrictionEnzymeSite {
                        offset,
                        forward_strand: false,
                        cut,
                    });
                }
            }
        }
        ret
    }

    fn place_cut(seq: &DNAsequence, watson: isize, crick: isize) -> Option<CutSite> {
        let (mut watson, mut crick) = (watson, crick);
        if seq.is_circular() && watson.min(crick) < 0 {
            let len = seq.len() as isize;
            watson += len;
            crick += len;
        }
        Some(CutSite::new(
            usize::try_from(watson).ok()?,
            usize::try_from(crick).ok()?,
        ))
    }
}

impl DigestSiteProvider for RestrictionEnzyme {
    fn cut_sites(&self, seq: &DNAsequence) -> Vec<CutSite> {
        self.get_sites(seq).into_iter().map(|site| site.cut).collect()
    }
}

impl DigestSiteProvider for [RestrictionEnzyme] {
    fn cut_sites(&self, seq: &DNAsequence) -> Vec<CutSite> {
        self.par_iter()
            .map(|re| re.cut_sites(seq))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Picking enzymes from a caller's list by how often they cut a record.
impl DNArecord {
    fn cutters_where<'a, F>(&self, enzymes: &'a [RestrictionEnzyme], keep: F) -> Vec<&'a RestrictionEnzyme>
    where
        F: Fn(usize) -> bool + Sync,
    {
        enzymes
            .par_iter()
            .filter(|re| keep(self.number_of_cuts(*re)))
            .collect()
    }

    pub fn n_cutters<'a>(&self, enzymes: &'a [RestrictionEnzyme], n: usize) -> Vec<&'a RestrictionEnzyme> {
        self.cutters_where(enzymes, |count| count == n)
    }

    pub fn no_cutters<'a>(&self, enzymes: &'a [RestrictionEnzyme]) -> Vec<&'a RestrictionEnzyme> {
        self.n_cutters(enzymes, 0)
    }

    pub fn once_cutters<'a>(&self, enzymes: &'a [RestrictionEnzyme]) -> Vec<&'a RestrictionEnzyme> {
        self.n_cutters(enzymes, 1)
    }

    /// Same as [`DNArecord::once_cutters`].
    pub fn unique_cutters<'a>(&self, enzymes: &'a [RestrictionEnzyme]) -> Vec<&'a RestrictionEnzyme> {
        self.once_cutters(enzymes)
    }

    pub fn twice_cutters<'a>(&self, enzymes: &'a [RestrictionEnzyme]) -> Vec<&'a RestrictionEnzyme> {
        self.n_cutters(enzymes, 2)
    }

    /// Every enzyme that cuts at least once.
    pub fn cutters<'a>(&self, enzymes: &'a [RestrictionEnzyme]) -> Vec<&'a RestrictionEnzyme> {
        self.cutters_where(enzymes, |count| count > 0)
    }
}
