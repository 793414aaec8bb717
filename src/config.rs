//! Protocol parameters shared by both parties: roles, algebraic domain, radix and triple strategy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The radix (digit width in bits) used when none is configured explicitly.
pub const DEFAULT_RADIX: u32 = 4;

/// The largest supported radix; leaf tables have `2^radix` entries.
pub const MAX_RADIX: u32 = 8;

/// The largest supported bit-width of a share.
pub const MAX_BITWIDTH: u32 = 64;

/// A violated precondition, detected before any message is exchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The bit-width must be in `1..=64`.
    #[error("bit-width {0} is outside of 1..=64")]
    BitwidthOutOfRange(u32),
    /// The radix must be in `1..=8`.
    #[error("radix {0} is outside of 1..=8")]
    RadixOutOfRange(u32),
    /// The field modulus must be odd, at least 3 and below 2^63.
    #[error("{0} is not a supported field modulus (odd, >= 3, < 2^63)")]
    InvalidModulus(u64),
    /// The triple generation method derives two triples per OT.
    #[error("{method} generates triples in pairs, but {count} triples were requested")]
    OddTripleCount {
        /// The requested generation method.
        method: &'static str,
        /// The requested number of triples.
        count: usize,
    },
    /// Correlated triples are generated in groups of `2 * offset`.
    #[error("{count} correlated triples cannot be grouped with offset {offset}")]
    MisalignedCorrelation {
        /// The requested number of triples.
        count: usize,
        /// The requested correlation offset.
        offset: usize,
    },
    /// The method does not generate correlated triples.
    #[error("{method} does not support a correlation offset (got {offset})")]
    UnexpectedOffset {
        /// The requested generation method.
        method: &'static str,
        /// The requested correlation offset.
        offset: usize,
    },
    /// An input does not fit into the configured bit-width.
    #[error("input {value} does not fit into {bitwidth} bits")]
    InputTooWide {
        /// The offending input.
        value: u64,
        /// The configured bit-width.
        bitwidth: u32,
    },
    /// A share is not a reduced element of its domain.
    #[error("share {value} is not reduced modulo {modulus}")]
    ShareNotReduced {
        /// The offending share.
        value: u64,
        /// The modulus of the domain.
        modulus: u128,
    },
    /// There are more elements than distinct indices in the domain.
    #[error("{len} elements cannot be indexed in a domain of size {modulus}")]
    TooManyElements {
        /// The number of elements.
        len: usize,
        /// The modulus of the domain.
        modulus: u128,
    },
    /// The input does not have the shape `rows x cols`.
    #[error("expected {rows} x {cols} elements, got {len}")]
    ShapeMismatch {
        /// The number of rows.
        rows: usize,
        /// The number of columns.
        cols: usize,
        /// The number of elements that were provided.
        len: usize,
    },
}

/// The role a party plays in every asymmetric step of the protocols.
///
/// Alice builds OT tables and acts as OT sender in the leaf evaluation, Bob chooses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Party A, the table builder (index 0).
    Alice,
    /// Party B, the chooser (index 1).
    Bob,
}

impl Role {
    /// The index of this party on a [`crate::channel::Channel`].
    pub fn party_index(self) -> usize {
        match self {
            Role::Alice => 0,
            Role::Bob => 1,
        }
    }

    /// The index of the other party on a [`crate::channel::Channel`].
    pub fn peer(self) -> usize {
        match self {
            Role::Alice => 1,
            Role::Bob => 0,
        }
    }

    /// Whether this is party A.
    pub fn is_alice(self) -> bool {
        self == Role::Alice
    }
}

/// The algebraic structure shares live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgebraicStructure {
    /// Integers modulo `2^bitwidth`.
    Ring {
        /// The bit-width `L` of the ring, in `1..=64`.
        bitwidth: u32,
    },
    /// Integers modulo a public odd modulus `prime`.
    Field {
        /// The public modulus `p`.
        prime: u64,
    },
}

impl AlgebraicStructure {
    /// Checks that the structure is supported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            AlgebraicStructure::Ring { bitwidth } => check_bitwidth(bitwidth),
            AlgebraicStructure::Field { prime } => {
                if prime < 3 || prime % 2 == 0 || prime >= 1 << 63 {
                    Err(ConfigError::InvalidModulus(prime))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// How AND triples are spent in the comparison tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripleStrategy {
    /// Standard triples at every tree node: more triples, cheaper to generate in few rounds.
    /// Preferable over high-latency links.
    Standard,
    /// Correlated triples for all nodes except the lowest one of each level: fewer OTs and less
    /// traffic in the tree.
    #[default]
    Correlated,
}

/// The parameters both parties must agree on before running any protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// The domain of the shares.
    pub domain: AlgebraicStructure,
    /// The digit width used by the comparison tree.
    #[serde(default = "default_radix")]
    pub radix: u32,
    /// How AND triples are generated and consumed.
    #[serde(default)]
    pub triple_strategy: TripleStrategy,
}

fn default_radix() -> u32 {
    DEFAULT_RADIX
}

impl ProtocolConfig {
    /// A ring configuration of the given bit-width with the default radix and strategy.
    pub fn ring(bitwidth: u32) -> Self {
        Self {
            domain: AlgebraicStructure::Ring { bitwidth },
            radix: DEFAULT_RADIX,
            triple_strategy: TripleStrategy::default(),
        }
    }

    /// A field configuration for the given modulus with the default radix and strategy.
    pub fn field(prime: u64) -> Self {
        Self {
            domain: AlgebraicStructure::Field { prime },
            radix: DEFAULT_RADIX,
            triple_strategy: TripleStrategy::default(),
        }
    }

    /// Replaces the radix.
    pub fn with_radix(mut self, radix: u32) -> Self {
        self.radix = radix;
        self
    }

    /// Replaces the triple strategy.
    pub fn with_triple_strategy(mut self, triple_strategy: TripleStrategy) -> Self {
        self.triple_strategy = triple_strategy;
        self
    }

    /// Checks all parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.domain.validate()?;
        check_radix(self.radix)
    }
}

pub(crate) fn check_bitwidth(bitwidth: u32) -> Result<(), ConfigError> {
    if (1..=MAX_BITWIDTH).contains(&bitwidth) {
        Ok(())
    } else {
        Err(ConfigError::BitwidthOutOfRange(bitwidth))
    }
}

pub(crate) fn check_radix(radix: u32) -> Result<(), ConfigError> {
    if (1..=MAX_RADIX).contains(&radix) {
        Ok(())
    } else {
        Err(ConfigError::RadixOutOfRange(radix))
    }
}
