//! Variable-width cell bitmask.
//!
//! One bit per board cell in row-major order (`index = row * cols + col`),
//! packed into `u64` words. The width is fixed when the mask is created and
//! all masks of one game share it; combining masks of different widths is a
//! programming error and panics.

use std::fmt;
use std::ops::BitOrAssign;

const WORD_BITS: usize = 64;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Bitmask {
    len: usize,
    words: Vec<u64>,
}

impl Bitmask {
    /// Creates a mask of `len` cleared bits.
    pub fn empty(len: usize) -> Self {
        Bitmask {
            len,
            words: vec![0; len.div_ceil(WORD_BITS)],
        }
    }

    /// Creates a mask with every one of its `len` bits set.
    pub fn full(len: usize) -> Self {
        let mut mask = Self::empty(len);
        for word in mask.words.iter_mut() {
            *word = u64::MAX;
        }
        mask.trim();
        mask
    }

    /// Creates a mask with only `index` set.
    pub fn single(len: usize, index: usize) -> Self {
        let mut mask = Self::empty(len);
        mask.insert(index);
        mask
    }

    /// Number of cells covered by the mask.
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        (self.words[index / WORD_BITS] >> (index % WORD_BITS)) & 1 == 1
    }

    #[inline]
    pub fn insert(&mut self, index: usize) {
        assert!(index < self.len, "bit {} out of range {}", index, self.len);
        self.words[index / WORD_BITS] |= 1 << (index % WORD_BITS);
    }

    #[inline]
    pub fn remove(&mut self, index: usize) {
        assert!(index < self.len, "bit {} out of range {}", index, self.len);
        self.words[index / WORD_BITS] &= !(1 << (index % WORD_BITS));
    }

    /// Population count.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// True when every one of the `len` bits is set.
    pub fn is_full(&self) -> bool {
        self.count_ones() == self.len
    }

    /// True when the two masks share no set bit.
    pub fn is_disjoint(&self, other: &Bitmask) -> bool {
        self.check_width(other);
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & b == 0)
    }

    /// Index of the lowest set bit.
    pub fn first_one(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .find(|(_, &w)| w != 0)
            .map(|(i, w)| i * WORD_BITS + w.trailing_zeros() as usize)
    }

    /// Iterator over the indices of set bits, lowest first.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.contains(i))
    }

    fn trim(&mut self) {
        let tail = self.len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
    }

    fn check_width(&self, other: &Bitmask) {
        assert_eq!(self.len, other.len, "bitmask width mismatch");
    }
}

impl BitOrAssign<&Bitmask> for Bitmask {
    fn bitor_assign(&mut self, rhs: &Bitmask) {
        self.check_width(rhs);
        for (a, b) in self.words.iter_mut().zip(rhs.words.iter()) {
            *a |= *b;
        }
    }
}

impl fmt::Debug for Bitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitmask<{}>", self.len)?;
        f.debug_set().entries(self.iter_ones()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_mask_spans_word_boundary() {
        let mask = Bitmask::full(70);
        assert_eq!(mask.count_ones(), 70);
        assert!(mask.is_full());
        assert!(mask.contains(69));
    }

    #[test]
    fn test_insert_remove_and_first_one() {
        let mut mask = Bitmask::empty(130);
        assert!(mask.is_empty());
        assert_eq!(mask.first_one(), None);

        mask.insert(128);
        mask.insert(3);
        assert_eq!(mask.first_one(), Some(3));
        assert_eq!(mask.iter_ones().collect::<Vec<_>>(), vec![3, 128]);

        mask.remove(3);
        assert_eq!(mask.first_one(), Some(128));
        assert_eq!(mask.count_ones(), 1);
    }

    #[test]
    fn test_union_and_overlap() {
        let a = Bitmask::single(10, 1);
        let b = Bitmask::single(10, 7);
        let mut union = a.clone();
        union |= &b;
        assert_eq!(union.count_ones(), 2);
        assert!(a.is_disjoint(&b));
        assert!(!union.is_disjoint(&a));
        assert!(!union.is_disjoint(&b));
    }

    #[test]
    #[should_panic]
    fn test_width_mismatch_panics() {
        let mut a = Bitmask::empty(4);
        a |= &Bitmask::empty(5);
    }
}
