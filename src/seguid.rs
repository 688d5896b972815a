//! Sequence checksums (SEGUID) and their strand- and rotation-invariant
//! variants for double-stranded molecules.

use crate::{
    dna_record::DNArecord,
    dna_sequence::{DNAsequence, Topology},
    error::{DnaError, Result},
    iupac_code::IupacCode,
};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::{NoExpand, Regex};
use sha1::{Digest, Sha1};

lazy_static! {
    /// `SEGUID_<checksum>_<date>` or `cSEGUID_<checksum>_<date>`.
    static ref STAMP: Regex = Regex::new(r"\b(c?SEGUID)_([A-Za-z0-9_\-]{27})_(\S+)")
        .expect("constant stamp pattern");
}

/// SHA-1 of the upper-cased sequence, url-safe base64 without padding.
pub fn seguid(sequence: &[u8]) -> String {
    let mut hasher = Sha1::new();
    for chunk in sequence.chunks(800) {
        hasher.update(chunk.to_ascii_uppercase());
    }
    base64_url::encode(&hasher.finalize()[..])
}

/// Start index of the lexicographically least rotation (Booth).
pub fn least_rotation_index(s: &[u8]) -> usize {
    let n = s.len();
    if n == 0 {
        return 0;
    }
    let at = |idx: isize| s[idx as usize % n];
    let mut failure: Vec<isize> = vec![-1; 2 * n];
    let mut k = 0isize;
    for j in 1..2 * n as isize {
        let sj = at(j);
        let mut i = failure[(j - k - 1) as usize];
        while i != -1 && sj != at(k + i + 1) {
            if sj < at(k + i + 1) {
                k = j - i - 1;
            }
            i = failure[i as usize];
        }
        if sj != at(k + i + 1) {
            if sj < at(k) {
                k = j;
            }
            failure[(j - k) as usize] = -1;
        } else {
            failure[(j - k) as usize] = i + 1;
        }
    }
    k as usize % n
}

pub fn least_rotation(s: &[u8]) -> Vec<u8> {
    let k = least_rotation_index(s);
    [&s[k..], &s[..k]].concat()
}

/// Strand-independent string for a linear molecule. Blunt molecules use the
/// smaller of the two strands; staggered ones spell out both strands with
/// their offsets, in whichever orientation sorts first.
fn linear_form(seq: &DNAsequence) -> Vec<u8> {
    let spelled = |s: &DNAsequence| -> Vec<u8> {
        let watson = s.watson().to_ascii_uppercase();
        let crick = s.crick().to_ascii_uppercase();
        if s.overhang() == 0 && crick == IupacCode::reverse_complement(&watson) {
            return watson;
        }
        let mut ret = vec![b'-'; s.watson_offset()];
        ret.extend(watson);
        ret.push(b'/');
        ret.extend(std::iter::repeat_n(b'-', s.crick_offset()));
        ret.extend(crick);
        ret
    };
    let forward = spelled(seq);
    let reverse = spelled(&seq.reverse_complement());
    forward.min(reverse)
}

impl DNAsequence {
    pub fn seguid(&self) -> String {
        seguid(&self.full_watson())
    }

    /// Checksum that is the same for both strands of a linear molecule.
    pub fn lseguid(&self) -> Result<String> {
        if self.is_circular() {
            return Err(DnaError::Topology {
                operation: "lseguid",
                required: Topology::Linear,
            });
        }
        Ok(seguid(&linear_form(self)))
    }

    /// Checksum that is the same for every rotation and both strands of a
    /// circular molecule.
    pub fn cseguid(&self) -> Result<String> {
        if self.is_linear() {
            return Err(DnaError::Topology {
                operation: "cseguid",
                required: Topology::Circular,
            });
        }
        let watson = self.watson().to_ascii_uppercase();
        let crick = IupacCode::reverse_complement(&watson);
        Ok(seguid(&least_rotation(&watson).min(least_rotation(&crick))))
    }
}

impl DNArecord {
    pub fn seguid(&self) -> String {
        self.seq().seguid()
    }

    pub fn lseguid(&self) -> Result<String> {
        self.seq().lseguid()
    }

    pub fn cseguid(&self) -> Result<String> {
        self.seq().cseguid()
    }

    fn stamp_checksum(&self) -> Result<(&'static str, String)> {
        match self.topology() {
            Topology::Linear => Ok(("SEGUID", self.lseguid()?)),
            Topology::Circular => Ok(("cSEGUID", self.cseguid()?)),
        }
    }

    /// Puts a checksum stamp with the current time into `description`.
    pub fn stamp(&mut self) -> Result<String> {
        self.stamp_at(Utc::now())
    }

    /// Puts `SEGUID_<lseguid>_<date>` (linear) or `cSEGUID_<cseguid>_<date>`
    /// (circular) into `description`, replacing an earlier stamp. An unset
    /// description is replaced by the stamp, any other text is kept in front
    /// of it.
    pub fn stamp_at(&mut self, when: DateTime<Utc>) -> Result<String> {
        let (tag, checksum) = self.stamp_checksum()?;
        let stamp = format!("{tag}_{checksum}_{}", when.format("%Y-%m-%dT%H:%M:%S%.6f"));
        self.description = if STAMP.is_match(&self.description) {
            STAMP
                .replace_all(&self.description, NoExpand(&stamp))
                .to_string()
        } else if self.description.is_empty() || self.description == "description" {
            stamp.clone()
        } else {
            format!("{} {stamp}", self.description)
        };
        log::debug!("stamped {} with {stamp}", self.name);
        Ok(stamp)
    }

    /// True if the stamp in `description` matches the molecule as it is now.
    pub fn verify_stamp(&self) -> Result<bool> {
        let caps = STAMP.captures(&self.description).ok_or(DnaError::NoStamp)?;
        let (tag, checksum) = self.stamp_checksum()?;
        Ok(&caps[1] == tag && caps[2] == checksum)
    }
}
