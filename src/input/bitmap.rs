// ============================================================================
// src/input/bitmap.rs - Fixed-size code bitmap
// ============================================================================

/// ビット数を格納するのに必要な u64 ワード数
pub const fn bit_words(bits: usize) -> usize {
    bits.div_ceil(64)
}

/// 固定長ビットマップ
///
/// `WORDS` 個の u64 で構成される。範囲外のビットは常に 0 として扱い、
/// 範囲外への書き込みは無視する。
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BitMap<const WORDS: usize> {
    words: [u64; WORDS],
}

impl<const WORDS: usize> BitMap<WORDS> {
    pub const BITS: usize = WORDS * 64;

    pub const fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    #[inline]
    pub fn test(&self, bit: usize) -> bool {
        if bit >= Self::BITS {
            return false;
        }
        self.words[bit / 64] & (1u64 << (bit % 64)) != 0
    }

    #[inline]
    pub fn set(&mut self, bit: usize) {
        if bit < Self::BITS {
            self.words[bit / 64] |= 1u64 << (bit % 64);
        }
    }

    #[inline]
    pub fn clear(&mut self, bit: usize) {
        if bit < Self::BITS {
            self.words[bit / 64] &= !(1u64 << (bit % 64));
        }
    }

    #[inline]
    pub fn toggle(&mut self, bit: usize) {
        if bit < Self::BITS {
            self.words[bit / 64] ^= 1u64 << (bit % 64);
        }
    }

    /// 立っているビット数
    pub fn weight(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// 立っているビットを昇順に列挙
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..64)
                .filter(move |b| word & (1u64 << b) != 0)
                .map(move |b| i * 64 + b)
        })
    }
}

impl<const WORDS: usize> Default for BitMap<WORDS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const WORDS: usize> core::fmt::Debug for BitMap<WORDS> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter_ones()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_set_test_clear() {
        let mut bm: BitMap<{ bit_words(0x300) }> = BitMap::new();
        assert_eq!(BitMap::<{ bit_words(0x300) }>::BITS, 0x300);

        bm.set(30);
        bm.set(0x2ff);
        assert!(bm.test(30));
        assert!(bm.test(0x2ff));
        assert!(!bm.test(31));
        assert_eq!(bm.weight(), 2);

        bm.clear(30);
        assert!(!bm.test(30));
        bm.toggle(30);
        assert!(bm.test(30));
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let mut bm: BitMap<1> = BitMap::new();
        bm.set(64);
        bm.toggle(200);
        assert!(!bm.test(64));
        assert_eq!(bm.weight(), 0);
    }

    #[test]
    fn test_iter_ones_ascending() {
        let mut bm: BitMap<2> = BitMap::new();
        bm.set(70);
        bm.set(3);
        bm.set(64);
        let ones: Vec<usize> = bm.iter_ones().collect();
        assert_eq!(ones, [3, 64, 70]);
    }
}
