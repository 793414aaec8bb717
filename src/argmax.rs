//! Secret-shared arg-max (and max) of a vector of shared values.

use tracing::{Level, debug, instrument, trace};

use crate::{
    algebra::ShareArithmetic,
    channel::Channel,
    config::{ConfigError, ProtocolConfig, Role},
    context::Context,
    error::Error,
    ot::OtPack,
    relu::{ReluProtocol, multiply_bit_shares},
    triple::TripleStats,
};

/// The result of an arg-max evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgMaxOutput {
    /// This party's share of the index of the maximum.
    pub index: u64,
    /// This party's share of the maximum, if requested.
    pub max: Option<u64>,
}

/// Finds the position of the largest element by a pairwise tournament.
///
/// Every level compares adjacent pairs `(l, r)` by the sign of `l - r` and keeps the winner with a
/// single bit-times-share product over two lanes, the value difference and the index difference:
/// `winner = r + d * (l - r)`. An odd element out is paired with a copy of itself. Ties resolve to
/// the lowest index. Values are compared as signed elements of the domain, so their pairwise
/// differences must not wrap around.
#[derive(Debug)]
pub struct ArgMaxProtocol {
    relu: ReluProtocol,
}

impl ArgMaxProtocol {
    /// Creates the protocol for the given configuration.
    pub fn new(config: ProtocolConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            relu: ReluProtocol::new(config)?,
        })
    }

    /// The triple counters of the underlying comparisons.
    pub fn triple_stats(&self) -> TripleStats {
        self.relu.triple_stats()
    }

    /// Returns shares of the index of the maximum of the shared `values` and, if
    /// `compute_max_too`, shares of the maximum itself.
    #[instrument(level = Level::DEBUG, skip(self, ctx, values), fields(len = values.len()), err)]
    pub async fn argmax<C: Channel, O: OtPack>(
        &mut self,
        ctx: &mut Context<'_, C, O>,
        values: &[u64],
        compute_max_too: bool,
    ) -> Result<ArgMaxOutput, Error> {
        let domain = self.relu.domain();
        if values.is_empty() {
            return Err(Error::EmptyInput);
        }
        if values.len() as u128 > domain.modulus() {
            return Err(ConfigError::TooManyElements {
                len: values.len(),
                modulus: domain.modulus(),
            }
            .into());
        }
        for &x in values {
            domain.check_reduced(x)?;
        }
        debug!(len = values.len(), "argmax");

        let mut vals = values.to_vec();
        let mut idx: Vec<u64> = match ctx.role() {
            Role::Alice => (0..values.len() as u64).collect(),
            Role::Bob => vec![0; values.len()],
        };
        let mut level = 0;
        while vals.len() > 1 {
            if vals.len() % 2 == 1 {
                vals.push(vals[vals.len() - 1]);
                idx.push(idx[idx.len() - 1]);
            }
            let half = vals.len() / 2;
            let dv: Vec<u64> = vals.chunks(2).map(|p| domain.sub(p[0], p[1])).collect();
            let di: Vec<u64> = idx.chunks(2).map(|p| domain.sub(p[0], p[1])).collect();
            trace!(level, pairs = half, "argmax level");
            let d = self.relu.relu(ctx, &dv, true).await?.drelu;
            let products = multiply_bit_shares(
                ctx,
                self.relu.rng_mut(),
                domain,
                &d,
                &[dv.as_slice(), di.as_slice()],
            )
            .await?;
            vals = (0..half)
                .map(|k| domain.add(vals[2 * k + 1], products[0][k]))
                .collect();
            idx = (0..half)
                .map(|k| domain.add(idx[2 * k + 1], products[1][k]))
                .collect();
            level += 1;
        }
        Ok(ArgMaxOutput {
            index: idx[0],
            max: compute_max_too.then_some(vals[0]),
        })
    }
}
