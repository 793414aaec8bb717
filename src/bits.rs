//! Owned, length-tracked vectors of bits, packed 8 to a byte (LSB first).

use std::ops::{BitAnd, BitXor, BitXorAssign};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A vector of bits packed into bytes, the bit at index `i` being bit `i % 8` of byte `i / 8`.
///
/// Unused bits of the last byte are always zero, so two vectors with equal bits compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackedBits {
    bytes: Vec<u8>,
    len: usize,
}

impl PackedBits {
    /// Creates a vector of `len` zero bits.
    pub fn new(len: usize) -> Self {
        Self {
            bytes: vec![0; len.div_ceil(8)],
            len,
        }
    }

    /// Creates a vector of `len` uniformly random bits.
    pub fn random(rng: &mut impl Rng, len: usize) -> Self {
        let mut bytes = vec![0; len.div_ceil(8)];
        rng.fill(bytes.as_mut_slice());
        let mut bits = Self { bytes, len };
        bits.clear_tail();
        bits
    }

    /// Packs a slice of bools.
    pub fn from_bools(bools: &[bool]) -> Self {
        let mut bits = Self::new(bools.len());
        for (i, &b) in bools.iter().enumerate() {
            bits.set(i, b);
        }
        bits
    }

    /// Unpacks the bits into bools.
    pub fn to_bools(&self) -> Vec<bool> {
        (0..self.len).map(|i| self.get(i)).collect()
    }

    /// Wraps raw bytes holding `len` bits, returning `None` if the byte count does not match.
    pub fn from_bytes(bytes: Vec<u8>, len: usize) -> Option<Self> {
        if bytes.len() != len.div_ceil(8) {
            return None;
        }
        let mut bits = Self { bytes, len };
        bits.clear_tail();
        Some(bits)
    }

    /// The packed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the vector holds no bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the bit at index `i`.
    ///
    /// Panics if `i` is out of bounds.
    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.len, "bit index {i} out of bounds for length {}", self.len);
        (self.bytes[i / 8] >> (i % 8)) & 1 == 1
    }

    /// Sets the bit at index `i`.
    ///
    /// Panics if `i` is out of bounds.
    pub fn set(&mut self, i: usize, bit: bool) {
        assert!(i < self.len, "bit index {i} out of bounds for length {}", self.len);
        let mask = 1 << (i % 8);
        if bit {
            self.bytes[i / 8] |= mask;
        } else {
            self.bytes[i / 8] &= !mask;
        }
    }

    /// Copies the bits `start..start + len` into a new vector.
    pub fn slice(&self, start: usize, len: usize) -> Self {
        assert!(start + len <= self.len, "slice {start}..{} out of bounds", start + len);
        let mut out = Self::new(len);
        if start % 8 == 0 {
            let first = start / 8;
            out.bytes
                .copy_from_slice(&self.bytes[first..first + len.div_ceil(8)]);
            out.clear_tail();
        } else {
            for i in 0..len {
                out.set(i, self.get(start + i));
            }
        }
        out
    }

    /// Appends the bits of `other`.
    pub fn extend(&mut self, other: &PackedBits) {
        if self.len % 8 == 0 {
            self.bytes.extend_from_slice(&other.bytes);
            self.len += other.len;
        } else {
            let start = self.len;
            self.len += other.len;
            self.bytes.resize(self.len.div_ceil(8), 0);
            for i in 0..other.len {
                self.set(start + i, other.get(i));
            }
        }
    }

    /// Concatenates several bit vectors.
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a PackedBits>) -> Self {
        let mut out = Self::default();
        for part in parts {
            out.extend(part);
        }
        out
    }

    /// Iterates over the bits.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(|i| self.get(i))
    }

    fn clear_tail(&mut self) {
        if self.len % 8 != 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last &= (1 << (self.len % 8)) - 1;
            }
        }
    }
}

impl FromIterator<bool> for PackedBits {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut bits = Self::default();
        for b in iter {
            if bits.len % 8 == 0 {
                bits.bytes.push(0);
            }
            bits.len += 1;
            bits.set(bits.len - 1, b);
        }
        bits
    }
}

impl BitXor for &PackedBits {
    type Output = PackedBits;

    fn bitxor(self, rhs: Self) -> PackedBits {
        assert_eq!(self.len, rhs.len, "xor of bit vectors of different length");
        PackedBits {
            bytes: self.bytes.iter().zip(&rhs.bytes).map(|(a, b)| a ^ b).collect(),
            len: self.len,
        }
    }
}

impl BitAnd for &PackedBits {
    type Output = PackedBits;

    fn bitand(self, rhs: Self) -> PackedBits {
        assert_eq!(self.len, rhs.len, "and of bit vectors of different length");
        PackedBits {
            bytes: self.bytes.iter().zip(&rhs.bytes).map(|(a, b)| a & b).collect(),
            len: self.len,
        }
    }
}

impl BitXorAssign<&PackedBits> for PackedBits {
    fn bitxor_assign(&mut self, rhs: &PackedBits) {
        assert_eq!(self.len, rhs.len, "xor of bit vectors of different length");
        for (a, b) in self.bytes.iter_mut().zip(&rhs.bytes) {
            *a ^= b;
        }
    }
}
