use crate::bits;

/// Immutable fixed-width bit array.
///
/// The length is a positive multiple of 32 so that every vector is a whole
/// number of words. Bit `i` lives in word `i / 32` at position `i % 32`.
/// Every operation returns a fresh vector.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct BitVector {
    words: Box<[u32]>,
}

#[inline]
fn check_size(size: usize) {
    assert!(
        size > 0 && size % bits::WORD_BITS == 0,
        "bit vector length {size} is not a positive multiple of {}",
        bits::WORD_BITS
    );
}

impl BitVector {
    /// All-zero vector of `size` bits.
    ///
    /// # Panics
    /// If `size` is not a positive multiple of 32.
    pub fn new(size: usize) -> Self {
        Self::filled(size, false)
    }

    /// Vector of `size` bits all equal to `value`.
    pub fn filled(size: usize, value: bool) -> Self {
        check_size(size);
        let word = if value { u32::MAX } else { 0 };
        Self {
            words: vec![word; size / bits::WORD_BITS].into_boxed_slice(),
        }
    }

    /// Vector backed by the given words, word 0 holding bits 0..32.
    ///
    /// # Panics
    /// If `words` is empty.
    pub fn from_words(words: Vec<u32>) -> Self {
        assert!(!words.is_empty(), "bit vector needs at least one word");
        Self {
            words: words.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.words.len() * bits::WORD_BITS
    }

    #[inline]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// # Panics
    /// If `index` is not below `size()`.
    pub fn test_bit(&self, index: usize) -> bool {
        assert!(index < self.size(), "bit {index} outside vector of {}", self.size());
        bits::test(
            self.words[index / bits::WORD_BITS],
            index % bits::WORD_BITS,
        )
    }

    pub fn not(&self) -> Self {
        self.map(|w| !w)
    }

    /// # Panics
    /// If the operands differ in length (same for `or` and `xor`).
    pub fn and(&self, other: &Self) -> Self {
        self.zip(other, |a, b| a & b)
    }

    pub fn or(&self, other: &Self) -> Self {
        self.zip(other, |a, b| a | b)
    }

    pub fn xor(&self, other: &Self) -> Self {
        self.zip(other, |a, b| a ^ b)
    }

    /// `size` bits starting at `start`, where everything outside this
    /// vector reads as zero. `start` may be negative or past the end.
    pub fn extract_zero_extended(&self, start: i64, size: usize) -> Self {
        self.extract(start, size, |index| {
            usize::try_from(index)
                .ok()
                .and_then(|i| self.words.get(i).copied())
                .unwrap_or(0)
        })
    }

    /// `size` bits starting at `start`, reading from an infinite repetition
    /// of this vector.
    pub fn extract_wrapped(&self, start: i64, size: usize) -> Self {
        let count = self.words.len() as i128;
        self.extract(start, size, |index| {
            self.words[index.rem_euclid(count) as usize]
        })
    }

    /// Shifts towards higher indices for a positive distance, towards
    /// lower ones otherwise, filling with zeros.
    pub fn shift(&self, distance: i64) -> Self {
        self.extract_zero_extended(distance.saturating_neg(), self.size())
    }

    /// Bytes of the vector, byte 0 holding bits 0..8.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    fn map(&self, f: impl Fn(u32) -> u32) -> Self {
        Self {
            words: self.words.iter().map(|&w| f(w)).collect(),
        }
    }

    fn zip(&self, other: &Self, f: impl Fn(u32, u32) -> u32) -> Self {
        assert_eq!(
            self.size(),
            other.size(),
            "bit vector operands differ in length"
        );
        Self {
            words: self
                .words
                .iter()
                .zip(other.words.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }

    /// Shared extraction loop; `word_at` maps a (possibly out of range) word
    /// index of the source to its content. Indices are widened so any `start`
    /// works, including the ends of the `i64` range.
    fn extract(&self, start: i64, size: usize, word_at: impl Fn(i128) -> u32) -> Self {
        check_size(size);
        let word_bits = bits::WORD_BITS as i128;
        let first = (start as i128).div_euclid(word_bits);
        let offset = (start as i128).rem_euclid(word_bits) as usize;
        let words = (0..(size / bits::WORD_BITS) as i128)
            .map(|k| {
                let low = word_at(first + k);
                if offset == 0 {
                    low
                } else {
                    let high = word_at(first + k + 1);
                    let pair = (high as u64) << bits::WORD_BITS | low as u64;
                    bits::extract_wide(pair, offset, bits::WORD_BITS) as u32
                }
            })
            .collect();
        Self { words }
    }
}

/// One-shot builder filling a vector byte by byte.
#[derive(Clone, Debug)]
pub struct Builder {
    words: Vec<u32>,
}

impl Builder {
    /// # Panics
    /// If `size` is not a positive multiple of 32.
    pub fn new(size: usize) -> Self {
        check_size(size);
        Self {
            words: vec![0; size / bits::WORD_BITS],
        }
    }

    /// Sets byte `index` (bits `8 * index .. 8 * index + 8`).
    ///
    /// # Panics
    /// If the byte lies outside the vector.
    pub fn set_byte(&mut self, index: usize, value: u8) -> &mut Self {
        let bytes_per_word = bits::WORD_BITS / 8;
        assert!(
            index < self.words.len() * bytes_per_word,
            "byte {index} outside vector"
        );
        let word = &mut self.words[index / bytes_per_word];
        let shift = (index % bytes_per_word) * 8;
        *word = (*word & !(0xFF << shift)) | (value as u32) << shift;
        self
    }

    pub fn build(self) -> BitVector {
        BitVector::from_words(self.words)
    }
}
