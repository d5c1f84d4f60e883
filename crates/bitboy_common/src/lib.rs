//! Bit-level building blocks shared by the bitboy crates.
//!
//! `bits` holds stateless operations over 32-bit words (plus wide 64-bit
//! forms), and `BitVector` is the immutable fixed-width bit array used to
//! represent whole scanlines as bit planes.

pub mod bit_vector;
pub mod bits;

pub use bit_vector::BitVector;
