//! ReLU on additively shared values, and the bit-times-share product it is built on.

use rand::Rng;
use rand_chacha::ChaCha20Rng;
use tracing::{Level, instrument};

use crate::{
    algebra::{ShareArithmetic, low_mask},
    channel::Channel,
    config::{AlgebraicStructure, ConfigError, ProtocolConfig, Role},
    context::Context,
    drelu::DReluProtocol,
    error::Error,
    ot::{self, MAX_MESSAGE_BITS, OtPack},
    triple::TripleStats,
};

/// Multiplies a shared bit with one or more shared values.
///
/// For every element `i`, `bits` holds this party's share of a bit `d_i` (XOR-shared) and each
/// lane holds this party's share of a value `v_i` (additively shared in `domain`). The result
/// holds shares of `d_i * v_i` per lane.
///
/// Each party `P` draws a mask `r_P` and offers the peer, through a 1-out-of-2 OT, the messages
/// `m_c = (d_P ^ c) ? v_P - r_P : -r_P`. The peer chooses with its own bit and so receives
/// `d * v_P - r_P` without learning `d`. This runs once with Alice as sender and once with Bob as
/// sender. Lanes are packed side by side into one OT message, so all lanes cost a single pair of
/// OTs.
pub async fn multiply_bit_shares<C: Channel, O: OtPack>(
    ctx: &mut Context<'_, C, O>,
    rng: &mut impl Rng,
    domain: AlgebraicStructure,
    bits: &[bool],
    lanes: &[&[u64]],
) -> Result<Vec<Vec<u64>>, Error> {
    let width = domain.bitwidth() as usize;
    let msg_bits = lanes.len() * width;
    if lanes.is_empty() || msg_bits > MAX_MESSAGE_BITS {
        return Err(ot::Error::InvalidMessageSize(msg_bits).into());
    }
    for lane in lanes {
        if lane.len() != bits.len() {
            return Err(Error::InvalidInputLength {
                expected: bits.len(),
                actual: lane.len(),
            });
        }
        for &x in lane.iter() {
            domain.check_reduced(x)?;
        }
    }
    if bits.is_empty() {
        return Ok(vec![vec![]; lanes.len()]);
    }

    let masks: Vec<Vec<u64>> = bits
        .iter()
        .map(|_| lanes.iter().map(|_| domain.random(rng)).collect())
        .collect();
    let mut messages = Vec::with_capacity(2 * bits.len());
    for (i, (&d, r)) in bits.iter().zip(&masks).enumerate() {
        for c in [false, true] {
            let mut msg = 0;
            for (k, (lane, &r)) in lanes.iter().zip(r).enumerate() {
                let v = if d ^ c {
                    domain.sub(lane[i], r)
                } else {
                    domain.negate(r)
                };
                msg |= (v as u128) << (k * width);
            }
            messages.push(msg);
        }
    }
    let choices: Vec<u8> = bits.iter().map(|&d| d as u8).collect();
    let received = match ctx.role() {
        Role::Alice => {
            ctx.ot_send("product_from_alice", &messages, 2, msg_bits).await?;
            ctx.ot_recv("product_from_bob", &choices, 2, msg_bits).await?
        }
        Role::Bob => {
            let received = ctx.ot_recv("product_from_alice", &choices, 2, msg_bits).await?;
            ctx.ot_send("product_from_bob", &messages, 2, msg_bits).await?;
            received
        }
    };

    let lane_mask = low_mask(width as u32) as u128;
    Ok((0..lanes.len())
        .map(|k| {
            received
                .iter()
                .zip(&masks)
                .map(|(&m, r)| domain.add(r[k], domain.reduce(m >> (k * width) & lane_mask)))
                .collect()
        })
        .collect())
}

/// The result of a ReLU evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReluOutput {
    /// Shares of `max(x, 0)`; empty if the final OT round was skipped.
    pub values: Vec<u64>,
    /// Shares of the DReLU bit `[x >= 0]`.
    pub drelu: Vec<bool>,
}

/// Computes `max(x, 0)` on shared values of a ring or field.
#[derive(Debug)]
pub struct ReluProtocol {
    drelu: DReluProtocol,
}

impl ReluProtocol {
    /// Creates the protocol for the given configuration.
    pub fn new(config: ProtocolConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            drelu: DReluProtocol::new(config)?,
        })
    }

    /// The domain of the shares.
    pub fn domain(&self) -> AlgebraicStructure {
        self.drelu.config().domain
    }

    /// The triple counters of the underlying comparisons.
    pub fn triple_stats(&self) -> TripleStats {
        self.drelu.triple_stats()
    }

    pub(crate) fn rng_mut(&mut self) -> &mut ChaCha20Rng {
        self.drelu.rng_mut()
    }

    /// Returns shares of `max(x, 0)` and of `[x >= 0]` for each shared value `x`.
    ///
    /// With `skip_ot`, only the DReLU bits are computed.
    #[instrument(level = Level::DEBUG, skip(self, ctx, shares), fields(num_relu = shares.len()), err)]
    pub async fn relu<C: Channel, O: OtPack>(
        &mut self,
        ctx: &mut Context<'_, C, O>,
        shares: &[u64],
        skip_ot: bool,
    ) -> Result<ReluOutput, Error> {
        let drelu = self.drelu.compute_drelu(ctx, shares).await?;
        if skip_ot {
            return Ok(ReluOutput {
                values: vec![],
                drelu,
            });
        }
        let domain = self.domain();
        let mut lanes =
            multiply_bit_shares(ctx, self.drelu.rng_mut(), domain, &drelu, &[shares]).await?;
        Ok(ReluOutput {
            values: lanes.swap_remove(0),
            drelu,
        })
    }
}
