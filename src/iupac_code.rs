const DNA_BITMASK_A: u8 = 1;
const DNA_BITMASK_C: u8 = 2;
const DNA_BITMASK_G: u8 = 4;
const DNA_BITMASK_T: u8 = 8;
const DNA_BITMASK_N: u8 = DNA_BITMASK_A | DNA_BITMASK_C | DNA_BITMASK_G | DNA_BITMASK_T;

/// A bitmasked IUPAC code for DNA bases, eg DNA_BITMASK_A|DNA_BITMASK_C
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct IupacCode(u8);

impl IupacCode {
    pub fn new(bitmask: u8) -> Self {
        Self(bitmask)
    }

    #[inline(always)]
    pub fn from_letter(letter: u8) -> Self {
        match letter.to_ascii_uppercase() {
            b'A' => Self(DNA_BITMASK_A),
            b'C' => Self(DNA_BITMASK_C),
            b'G' => Self(DNA_BITMASK_G),
            b'T' => Self(DNA_BITMASK_T),
            b'U' => Self(DNA_BITMASK_T),
            b'W' => Self(DNA_BITMASK_A | DNA_BITMASK_T),
            b'S' => Self(DNA_BITMASK_C | DNA_BITMASK_G),
            b'M' => Self(DNA_BITMASK_A | DNA_BITMASK_C),
            b'K' => Self(DNA_BITMASK_G | DNA_BITMASK_T),
            b'R' => Self(DNA_BITMASK_A | DNA_BITMASK_G),
            b'Y' => Self(DNA_BITMASK_C | DNA_BITMASK_T),
            b'B' => Self(DNA_BITMASK_C | DNA_BITMASK_G | DNA_BITMASK_T),
            b'D' => Self(DNA_BITMASK_A | DNA_BITMASK_G | DNA_BITMASK_T),
            b'H' => Self(DNA_BITMASK_A | DNA_BITMASK_C | DNA_BITMASK_T),
            b'V' => Self(DNA_BITMASK_A | DNA_BITMASK_C | DNA_BITMASK_G),
            b'N' => Self(DNA_BITMASK_N),
            _ => Self(0),
        }
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub fn subset(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// True if the concrete `base` is one of the bases this code stands for.
    #[inline(always)]
    pub fn matches(self, base: u8) -> bool {
        let base = Self::from_letter(base);
        !base.is_empty() && base.0 & !self.0 == 0
    }

    #[inline(always)]
    pub fn is_valid_letter(letter: u8) -> bool {
        !Self::from_letter(letter).is_empty()
    }

    /// Complements a single letter, IUPAC ambiguity codes included. Case is
    /// preserved; anything that is not a nucleotide letter is returned as is.
    #[inline(always)]
    pub fn letter_complement(letter: u8) -> u8 {
        let complement = match letter.to_ascii_uppercase() {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            b'U' => b'A',
            b'W' => b'W',
            b'S' => b'S',
            b'M' => b'K',
            b'K' => b'M',
            b'R' => b'Y',
            b'Y' => b'R',
            b'B' => b'V',
            b'D' => b'H',
            b'H' => b'D',
            b'V' => b'B',
            b'N' => b'N',
            _ => return letter,
        };
        if letter.is_ascii_lowercase() {
            complement.to_ascii_lowercase()
        } else {
            complement
        }
    }

    pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
        sequence
            .iter()
            .rev()
            .map(|c| Self::letter_complement(*c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base2iupac() {
        assert!(!IupacCode::from_letter(b'V')
            .subset(IupacCode::from_letter(b'G'))
            .is_empty());
        assert!(IupacCode::from_letter(b'H')
            .subset(IupacCode::from_letter(b'G'))
            .is_empty());
        assert_eq!(IupacCode::from_letter(b'A'), IupacCode::new(DNA_BITMASK_A));
        assert_eq!(IupacCode::from_letter(b'U'), IupacCode::new(DNA_BITMASK_T));
        assert_eq!(IupacCode::from_letter(b'X'), IupacCode::new(0));
    }

    #[test]
    fn test_matches() {
        assert!(IupacCode::from_letter(b'N').matches(b'g'));
        assert!(IupacCode::from_letter(b'R').matches(b'A'));
        assert!(!IupacCode::from_letter(b'R').matches(b'C'));
        assert!(IupacCode::from_letter(b'C').matches(b'c'));
        // An ambiguous base in the sequence does not satisfy a concrete site.
        assert!(!IupacCode::from_letter(b'A').matches(b'N'));
        assert!(!IupacCode::from_letter(b'A').matches(b'-'));
    }

    #[test]
    fn test_complement() {
        assert_eq!(IupacCode::letter_complement(b'A'), b'T');
        assert_eq!(IupacCode::letter_complement(b'C'), b'G');
        assert_eq!(IupacCode::letter_complement(b'U'), b'A');
        assert_eq!(IupacCode::letter_complement(b'a'), b't');
        assert_eq!(IupacCode::letter_complement(b'R'), b'Y');
        assert_eq!(IupacCode::letter_complement(b'-'), b'-');
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(IupacCode::reverse_complement(b"ggaatt"), b"aattcc".to_vec());
        assert_eq!(IupacCode::reverse_complement(b"GATC"), b"GATC".to_vec());
        assert_eq!(IupacCode::reverse_complement(b""), Vec::<u8>::new());
    }
}
