//! Arithmetic on additive shares, for both rings `Z_{2^L}` and prime fields `Z_p`.

use rand::Rng;

use crate::config::{AlgebraicStructure, ConfigError};

/// The arithmetic of an algebraic structure that additive shares live in.
///
/// Elements are represented as reduced `u64`s; intermediate results use `u128` so that no
/// operation can overflow for any supported bit-width or modulus.
pub trait ShareArithmetic {
    /// The number of bits needed to represent any reduced element.
    fn bitwidth(&self) -> u32;

    /// The modulus (`2^L` or `p`).
    fn modulus(&self) -> u128;

    /// Reduces an arbitrary integer into the structure.
    fn reduce(&self, x: u128) -> u64;

    /// `x + y`.
    fn add(&self, x: u64, y: u64) -> u64 {
        self.reduce(x as u128 + y as u128)
    }

    /// `x - y`.
    fn sub(&self, x: u64, y: u64) -> u64 {
        self.reduce(x as u128 + self.modulus() - y as u128)
    }

    /// `-x`.
    fn negate(&self, x: u64) -> u64 {
        self.sub(0, x)
    }

    /// The smallest element that is interpreted as negative.
    fn wrap_threshold(&self) -> u64;

    /// A uniformly random element.
    fn random(&self, rng: &mut impl Rng) -> u64 {
        self.reduce(rng.random_range(0..self.modulus()))
    }

    /// Splits `value` into two random shares that add up to it.
    fn split(&self, value: u64, rng: &mut impl Rng) -> (u64, u64) {
        let a = self.random(rng);
        (a, self.sub(value, a))
    }

    /// Adds two shares.
    fn reconstruct(&self, a: u64, b: u64) -> u64 {
        self.add(a, b)
    }

    /// Maps a signed integer into the structure (two's complement style).
    fn encode_signed(&self, x: i64) -> u64 {
        self.reduce((x as i128).rem_euclid(self.modulus() as i128) as u128)
    }

    /// Interprets an element as a signed integer, values at or above the threshold being negative.
    fn decode_signed(&self, x: u64) -> i64 {
        if x >= self.wrap_threshold() {
            (x as i128 - self.modulus() as i128) as i64
        } else {
            x as i64
        }
    }

    /// Checks that `x` is a reduced element.
    fn check_reduced(&self, x: u64) -> Result<(), ConfigError> {
        if (x as u128) < self.modulus() {
            Ok(())
        } else {
            Err(ConfigError::ShareNotReduced {
                value: x,
                modulus: self.modulus(),
            })
        }
    }
}

impl ShareArithmetic for AlgebraicStructure {
    fn bitwidth(&self) -> u32 {
        match *self {
            AlgebraicStructure::Ring { bitwidth } => bitwidth,
            AlgebraicStructure::Field { prime } => u64::BITS - (prime - 1).leading_zeros(),
        }
    }

    fn modulus(&self) -> u128 {
        match *self {
            AlgebraicStructure::Ring { bitwidth } => 1 << bitwidth,
            AlgebraicStructure::Field { prime } => prime as u128,
        }
    }

    fn reduce(&self, x: u128) -> u64 {
        match *self {
            AlgebraicStructure::Ring { bitwidth } => (x & ((1 << bitwidth) - 1)) as u64,
            AlgebraicStructure::Field { prime } => (x % prime as u128) as u64,
        }
    }

    fn wrap_threshold(&self) -> u64 {
        match *self {
            AlgebraicStructure::Ring { bitwidth } => 1 << (bitwidth - 1),
            AlgebraicStructure::Field { prime } => (prime - 1) / 2 + 1,
        }
    }
}

/// A mask of the `bits` lowest bits, for `bits` in `0..=64`.
pub(crate) fn low_mask(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1 << bits) - 1 }
}
