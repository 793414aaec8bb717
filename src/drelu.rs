//! Sign detection ("DReLU") of additively shared values.
//!
//! The output bit is `1` iff the reconstructed value is non-negative, i.e. below the wrap threshold
//! of its domain (`2^(L-1)` in a ring, `(p + 1) / 2` in a field).

use rand_chacha::ChaCha20Rng;
use tracing::{Level, debug, instrument};

use crate::{
    algebra::{ShareArithmetic, low_mask},
    channel::Channel,
    config::{AlgebraicStructure, ConfigError, ProtocolConfig, Role},
    context::Context,
    error::Error,
    millionaire::{MillionaireProtocol, pad_by_replication},
    ot::OtPack,
    triple::TripleStats,
};

/// Batches of DReLU evaluations are padded to a multiple of this size.
pub const DRELU_BATCH_MULTIPLE: usize = 4;

/// Computes shares of the DReLU bit of shared values.
///
/// In a ring of `L` bits, the sign is the MSB of `a + b`, i.e. `msb(a) ^ msb(b) ^ carry`, where the
/// carry out of the lower `L - 1` bits is computed as `(2^(L-1) - 1 - low(a)) < low(b)`.
///
/// In a field, with `h = (p - 1) / 2`, the value `a + b mod p` is negative iff
/// `[b > p - 1 - a] ^ [b > (h - a) mod p] ^ [a > h]`. Both comparisons run in one batch, and the
/// last term is known to Alice in the clear and folded into her share.
#[derive(Debug)]
pub struct DReluProtocol {
    config: ProtocolConfig,
    millionaire: MillionaireProtocol,
}

impl DReluProtocol {
    /// Creates the protocol for the given (validated) configuration.
    pub fn new(config: ProtocolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            millionaire: MillionaireProtocol::new(config.triple_strategy),
        })
    }

    /// The configuration.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// The triple counters of the underlying comparisons.
    pub fn triple_stats(&self) -> TripleStats {
        self.millionaire.triple_stats()
    }

    pub(crate) fn rng_mut(&mut self) -> &mut ChaCha20Rng {
        self.millionaire.rng_mut()
    }

    /// Returns this party's shares of `[x >= 0]` for each shared value `x`.
    #[instrument(level = Level::DEBUG, skip_all, fields(num_relu = shares.len()), err)]
    pub async fn compute_drelu<C: Channel, O: OtPack>(
        &mut self,
        ctx: &mut Context<'_, C, O>,
        shares: &[u64],
    ) -> Result<Vec<bool>, Error> {
        let domain = self.config.domain;
        for &x in shares {
            domain.check_reduced(x)?;
        }
        if shares.is_empty() {
            return Ok(vec![]);
        }
        let padded = pad_by_replication(shares, DRELU_BATCH_MULTIPLE);
        let is_alice = ctx.role() == Role::Alice;
        let radix = self.config.radix;
        debug!(num_relu = padded.len(), ?domain, "drelu");

        let mut drelu = match domain {
            AlgebraicStructure::Ring { bitwidth } => {
                let low_bits = bitwidth - 1;
                let msb = padded.iter().map(|&x| x >> low_bits & 1 == 1);
                if low_bits == 0 {
                    msb.map(|m| m ^ is_alice).collect::<Vec<bool>>()
                } else {
                    let max_low = low_mask(low_bits);
                    let inputs: Vec<u64> = padded
                        .iter()
                        .map(|&x| {
                            if is_alice {
                                max_low - (x & max_low)
                            } else {
                                x & max_low
                            }
                        })
                        .collect();
                    let carry = self
                        .millionaire
                        .compare(ctx, &inputs, low_bits, false, radix)
                        .await?;
                    msb.zip(carry).map(|(m, c)| m ^ c ^ is_alice).collect()
                }
            }
            AlgebraicStructure::Field { prime } => {
                let half = (prime - 1) / 2;
                let n = padded.len();
                let inputs: Vec<u64> = if is_alice {
                    padded
                        .iter()
                        .map(|&a| prime - 1 - a)
                        .chain(padded.iter().map(|&a| (half + prime - a) % prime))
                        .collect()
                } else {
                    padded.iter().chain(&padded).copied().collect()
                };
                let cmp = self
                    .millionaire
                    .compare(ctx, &inputs, domain.bitwidth(), false, radix)
                    .await?;
                padded
                    .iter()
                    .enumerate()
                    .map(|(i, &a)| {
                        cmp[i] ^ cmp[n + i] ^ (is_alice && a <= half)
                    })
                    .collect()
            }
        };
        drelu.truncate(shares.len());
        Ok(drelu)
    }
}
