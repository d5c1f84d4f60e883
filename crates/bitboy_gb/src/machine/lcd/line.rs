use bitboy_common::bit_vector::{self, BitVector};

/// Palette that maps every color to itself.
const IDENTITY_PALETTE: u8 = 0b11_10_01_00;

/// One scanline as three bit planes.
///
/// Pixel `x` has color `(msb[x] << 1) | lsb[x]`; `opacity[x]` marks
/// pixels that cover whatever lies below them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LcdImageLine {
    msb: BitVector,
    lsb: BitVector,
    opacity: BitVector,
}

impl LcdImageLine {
    /// # Panics
    /// If the planes differ in length.
    pub fn new(msb: BitVector, lsb: BitVector, opacity: BitVector) -> Self {
        assert!(
            msb.size() == lsb.size() && lsb.size() == opacity.size(),
            "line planes differ in length"
        );
        Self { msb, lsb, opacity }
    }

    /// Transparent line of color 0.
    pub fn blank(size: usize) -> Self {
        let empty = BitVector::new(size);
        Self::new(empty.clone(), empty.clone(), empty)
    }

    pub fn size(&self) -> usize {
        self.msb.size()
    }

    pub fn msb(&self) -> &BitVector {
        &self.msb
    }

    pub fn lsb(&self) -> &BitVector {
        &self.lsb
    }

    pub fn opacity(&self) -> &BitVector {
        &self.opacity
    }

    /// Color index of pixel `x`.
    pub fn color(&self, x: usize) -> u8 {
        (self.msb.test_bit(x) as u8) << 1 | self.lsb.test_bit(x) as u8
    }

    pub fn shift(&self, distance: i64) -> Self {
        self.map_planes(|v| v.shift(distance))
    }

    pub fn extract_wrapped(&self, start: i64, size: usize) -> Self {
        self.map_planes(|v| v.extract_wrapped(start, size))
    }

    pub fn extract_zero_extended(&self, start: i64, size: usize) -> Self {
        self.map_planes(|v| v.extract_zero_extended(start, size))
    }

    /// Replaces every color `c` by entry `c` of `palette` (two bits per
    /// entry, entry 0 in the low bits). Opacity is unchanged.
    pub fn map_colors(&self, palette: u8) -> Self {
        if palette == IDENTITY_PALETTE {
            return self.clone();
        }
        let (msb, lsb) = (&self.msb, &self.lsb);
        let masks = [
            msb.not().and(&lsb.not()),
            msb.not().and(lsb),
            msb.and(&lsb.not()),
            msb.and(lsb),
        ];
        let mut new_msb = BitVector::new(self.size());
        let mut new_lsb = BitVector::new(self.size());
        for (color, mask) in masks.iter().enumerate() {
            let target = (palette >> (2 * color)) & 0b11;
            if target & 0b10 != 0 {
                new_msb = new_msb.or(mask);
            }
            if target & 0b01 != 0 {
                new_lsb = new_lsb.or(mask);
            }
        }
        Self::new(new_msb, new_lsb, self.opacity.clone())
    }

    /// `other` drawn over this line wherever it is opaque.
    pub fn below(&self, other: &Self) -> Self {
        self.below_with_mask(other, &other.opacity)
    }

    /// Takes `other`'s colors wherever `mask` is set. The result is opaque
    /// wherever either line is.
    ///
    /// # Panics
    /// If the lines or the mask differ in length.
    pub fn below_with_mask(&self, other: &Self, mask: &BitVector) -> Self {
        let keep = mask.not();
        Self::new(
            self.msb.and(&keep).or(&other.msb.and(mask)),
            self.lsb.and(&keep).or(&other.lsb.and(mask)),
            self.opacity.or(&other.opacity),
        )
    }

    /// This line left of pixel `position`, `other` from there on.
    ///
    /// # Panics
    /// If the lines differ in length.
    pub fn join(&self, other: &Self, position: usize) -> Self {
        let right = BitVector::filled(self.size(), true).shift(position as i64);
        let left = right.not();
        let splice = |a: &BitVector, b: &BitVector| a.and(&left).or(&b.and(&right));
        Self::new(
            splice(&self.msb, &other.msb),
            splice(&self.lsb, &other.lsb),
            splice(&self.opacity, &other.opacity),
        )
    }

    fn map_planes(&self, f: impl Fn(&BitVector) -> BitVector) -> Self {
        Self::new(f(&self.msb), f(&self.lsb), f(&self.opacity))
    }
}

/// Fills a line eight pixels at a time; pixels with a non-zero color are
/// opaque.
#[derive(Clone, Debug)]
pub struct LcdImageLineBuilder {
    msb: bit_vector::Builder,
    lsb: bit_vector::Builder,
}

impl LcdImageLineBuilder {
    pub fn new(size: usize) -> Self {
        Self {
            msb: bit_vector::Builder::new(size),
            lsb: bit_vector::Builder::new(size),
        }
    }

    /// Sets pixels `8 * index .. 8 * index + 8`, the first pixel in bit 0.
    pub fn set_bytes(&mut self, index: usize, msb: u8, lsb: u8) -> &mut Self {
        self.msb.set_byte(index, msb);
        self.lsb.set_byte(index, lsb);
        self
    }

    pub fn build(self) -> LcdImageLine {
        let msb = self.msb.build();
        let lsb = self.lsb.build();
        let opacity = msb.or(&lsb);
        LcdImageLine::new(msb, lsb, opacity)
    }
}
