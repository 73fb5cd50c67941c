//! Fixed-size sets of symbols.
//!
//! Every automaton works over one alphabet size (256 for byte patterns) and
//! all bitsets that meet in one operation must share it. Binary operations
//! mutate `self` in place, the way character classes are narrowed while a
//! transition class is being computed.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

type Word = u64;

const WORD_BITS: usize = Word::BITS as usize;

/// Number of symbols in the byte alphabet.
pub const CHAR_SET_SIZE: usize = 256;

#[derive(Clone, PartialEq, Eq)]
pub struct Bitset {
    size: usize,
    words: Box<[Word]>,
}

impl Bitset {
    /// An empty set over `size` symbols.
    pub fn new(size: usize) -> Self {
        debug_assert!(size > 0);
        Self {
            size,
            words: vec![0; size.div_ceil(WORD_BITS)].into_boxed_slice(),
        }
    }

    /// The set of every symbol of the alphabet.
    pub fn universe(size: usize) -> Self {
        let mut set = Self::new(size);
        set.fill();
        set
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut set = Self::new(CHAR_SET_SIZE);
        for &b in bytes {
            set.insert(b as usize);
        }
        set
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    pub fn fill(&mut self) {
        self.words.fill(!0);
        self.mask_tail();
    }

    pub fn insert(&mut self, symbol: usize) {
        self.words[symbol / WORD_BITS] |= 1 << (symbol % WORD_BITS);
    }

    pub fn remove(&mut self, symbol: usize) {
        self.words[symbol / WORD_BITS] &= !(1 << (symbol % WORD_BITS));
    }

    pub fn contains(&self, symbol: usize) -> bool {
        symbol < self.size && self.words[symbol / WORD_BITS] & (1 << (symbol % WORD_BITS)) != 0
    }

    pub fn insert_range(&mut self, from: usize, to: usize) {
        for symbol in from..=to {
            self.insert(symbol);
        }
    }

    pub fn union(&mut self, other: &Bitset) {
        self.zip_with(other, |a, b| a | b);
    }

    pub fn intersect(&mut self, other: &Bitset) {
        self.zip_with(other, |a, b| a & b);
    }

    /// Removes every member of `other` from `self`.
    pub fn difference(&mut self, other: &Bitset) {
        self.zip_with(other, |a, b| a & !b);
    }

    /// Replaces `self` with `other` minus `self`.
    pub fn reverse_difference(&mut self, other: &Bitset) {
        self.zip_with(other, |a, b| !a & b);
    }

    pub fn xor(&mut self, other: &Bitset) {
        self.zip_with(other, |a, b| a ^ b);
    }

    pub fn complement(&mut self) {
        for w in self.words.iter_mut() {
            *w = !*w;
        }
        self.mask_tail();
    }

    /// True when every member of `self` is also in `other`.
    pub fn is_subset(&self, other: &Bitset) -> bool {
        debug_assert_eq!(self.size, other.size);
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & !b == 0)
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Members in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.size).filter(move |&s| self.contains(s))
    }

    /// Structural hash, stable as long as the set is not mutated.
    pub fn hash_value(&self) -> u32 {
        let mut hasher = FxHasher::default();
        self.words.hash(&mut hasher);
        let h = hasher.finish();
        (h ^ (h >> 32)) as u32
    }

    fn zip_with(&mut self, other: &Bitset, f: impl Fn(Word, Word) -> Word) {
        debug_assert_eq!(self.size, other.size);
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a = f(*a, *b);
        }
    }

    fn mask_tail(&mut self) {
        let rem = self.size % WORD_BITS;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1 << rem) - 1;
            }
        }
    }
}

impl fmt::Debug for Bitset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let mut members = self.iter().peekable();
        while let Some(from) = members.next() {
            let mut to = from;
            while members.peek() == Some(&(to + 1)) {
                to = members.next().unwrap_or(to);
            }
            let show = |s: usize| {
                if (0x21..0x7f).contains(&s) {
                    format!("{}", s as u8 as char)
                } else {
                    format!("\\x{s:02x}")
                }
            };
            if from == to {
                write!(f, "{}", show(from))?;
            } else {
                write!(f, "{}-{}", show(from), show(to))?;
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(members: &[usize]) -> Bitset {
        let mut s = Bitset::new(CHAR_SET_SIZE);
        for &m in members {
            s.insert(m);
        }
        s
    }

    #[test]
    fn union_commutes_and_associates() {
        let (a, b, c) = (set(&[1, 2, 200]), set(&[2, 3]), set(&[64, 255]));
        let mut ab = a.clone();
        ab.union(&b);
        let mut ba = b.clone();
        ba.union(&a);
        assert_eq!(ab, ba);

        let mut ab_c = ab.clone();
        ab_c.union(&c);
        let mut bc = b.clone();
        bc.union(&c);
        let mut a_bc = a.clone();
        a_bc.union(&bc);
        assert_eq!(ab_c, a_bc);
    }

    #[test]
    fn intersect_with_complement_is_empty() {
        let a = set(&[0, 7, 63, 64, 128, 255]);
        let mut not_a = a.clone();
        not_a.complement();
        assert_eq!(not_a.len(), CHAR_SET_SIZE - 6);
        let mut both = a.clone();
        both.intersect(&not_a);
        assert!(both.is_empty());
    }

    #[test]
    fn subset_of_union() {
        let a = set(&[10, 20]);
        let b = set(&[30]);
        let mut u = a.clone();
        u.union(&b);
        assert!(a.is_subset(&u));
        assert!(b.is_subset(&u));
        assert!(!u.is_subset(&a));
        assert!(Bitset::new(CHAR_SET_SIZE).is_subset(&a));
    }

    #[test]
    fn difference_and_reverse_difference() {
        let mut a = set(&[1, 2, 3]);
        a.difference(&set(&[2]));
        assert_eq!(a, set(&[1, 3]));

        let mut r = set(&[1]);
        r.reverse_difference(&set(&[1, 5]));
        assert_eq!(r, set(&[5]));

        let mut x = set(&[1, 2]);
        x.xor(&set(&[2, 3]));
        assert_eq!(x, set(&[1, 3]));
    }

    #[test]
    fn universe_masks_odd_sizes() {
        let u = Bitset::universe(70);
        assert_eq!(u.len(), 70);
        assert!(u.contains(69));
        assert!(!u.contains(70));
        let mut c = Bitset::new(70);
        c.complement();
        assert_eq!(c, u);
    }

    #[test]
    fn hash_is_stable_and_spreads_small_sets() {
        let a = set(&[b'a' as usize]);
        assert_eq!(a.hash_value(), a.clone().hash_value());
        let hashes: Vec<u32> = (0..64).map(|i| set(&[i]).hash_value()).collect();
        for (i, h) in hashes.iter().enumerate() {
            assert!(!hashes[i + 1..].contains(h));
        }
    }

    #[test]
    fn debug_shows_ranges() {
        let mut s = Bitset::new(CHAR_SET_SIZE);
        s.insert_range(b'a' as usize, b'c' as usize);
        s.insert(b'x' as usize);
        assert_eq!(format!("{s:?}"), "[a-cx]");
    }
}
