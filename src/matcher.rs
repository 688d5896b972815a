//! Exact common-substring search between two sequences.

use std::collections::HashMap;

/// One shared run of bytes: `a[start_a..start_a + length] == b[start_b..start_b + length]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CommonSubstring {
    pub start_a: usize,
    pub start_b: usize,
    pub length: usize,
}

pub trait Matcher {
    /// Maximal exact matches of at least `min_length` bytes, longest first.
    fn common_substrings(&self, a: &[u8], b: &[u8], min_length: usize) -> Vec<CommonSubstring>;
}

/// Indexes every `min_length`-mer of `b`, then extends each seed of `a` to
/// the right. Only left-maximal seeds are extended, so every match is
/// reported once.
#[derive(Clone, Copy, Debug, Default)]
pub struct SeedExtendMatcher;

impl Matcher for SeedExtendMatcher {
    fn common_substrings(&self, a: &[u8], b: &[u8], min_length: usize) -> Vec<CommonSubstring> {
        let k = min_length.max(1);
        if a.len() < k || b.len() < k {
            return vec![];
        }
        let mut index: HashMap<&[u8], Vec<usize>> = HashMap::new();
        for (pos, kmer) in b.windows(k).enumerate() {
            index.entry(kmer).or_default().push(pos);
        }

        let mut ret = vec![];
        for (start_a, kmer) in a.windows(k).enumerate() {
            let Some(hits) = index.get(kmer) else {
                continue;
            };
            for &start_b in hits {
                if start_a > 0 && start_b > 0 && a[start_a - 1] == b[start_b - 1] {
                    continue;
                }
                let length = k + a[start_a + k..]
                    .iter()
                    .zip(&b[start_b + k..])
                    .take_while(|(x, y)| x == y)
                    .count();
                ret.push(CommonSubstring {
                    start_a,
                    start_b,
                    length,
                });
            }
        }
        ret.sort_by(|x, y| {
            y.length
                .cmp(&x.length)
                .then(x.start_a.cmp(&y.start_a))
                .then(x.start_b.cmp(&y.start_b))
        });
        ret
    }
}
