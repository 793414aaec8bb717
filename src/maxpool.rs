//! Row-wise max (and arg-max) of a shared `rows x cols` matrix, as used by pooling layers.

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

/// The result of a max-pool evaluation, one entry per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxPoolOutput {
    /// Shares of the maximum of each row.
    pub max: Vec<u64>,
    /// Shares of the column of each row maximum, if requested.
    pub argmax: Option<Vec<u64>>,
}

/// Folds every row from left to right with `m = m + relu(x - m)`, all rows in parallel.
///
/// This takes `cols - 1` ReLU rounds, each over a batch of `rows` elements. With arg-max, ties
/// resolve to the highest column.
#[derive(Debug)]
pub struct MaxPoolProtocol {
    relu: ReluProtocol,
}

impl MaxPoolProtocol {
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

    /// Returns shares of the maximum of every row of the row-major shared matrix `input`.
    #[instrument(level = Level::DEBUG, skip(self, ctx, input), err)]
    pub async fn max<C: Channel, O: OtPack>(
        &mut self,
        ctx: &mut Context<'_, C, O>,
        rows: usize,
        cols: usize,
        input: &[u64],
        compute_argmax: bool,
    ) -> Result<MaxPoolOutput, Error> {
        let domain = self.relu.domain();
        if rows.checked_mul(cols) != Some(input.len()) {
            return Err(ConfigError::ShapeMismatch {
                rows,
                cols,
                len: input.len(),
            }
            .into());
        }
        if input.is_empty() {
            return Err(Error::EmptyInput);
        }
        if compute_argmax && cols as u128 > domain.modulus() {
            return Err(ConfigError::TooManyElements {
                len: cols,
                modulus: domain.modulus(),
            }
            .into());
        }
        for &x in input {
            domain.check_reduced(x)?;
        }
        debug!(rows, cols, "maxpool");

        let is_alice = ctx.role() == Role::Alice;
        let mut max: Vec<u64> = input.chunks(cols).map(|row| row[0]).collect();
        let mut argmax = vec![0; rows];
        for c in 1..cols {
            trace!(column = c, "maxpool fold");
            let diff: Vec<u64> = input
                .chunks(cols)
                .zip(&max)
                .map(|(row, &m)| domain.sub(row[c], m))
                .collect();
            if compute_argmax {
                let d = self.relu.relu(ctx, &diff, true).await?.drelu;
                let column = domain.reduce(c as u128);
                let di: Vec<u64> = argmax
                    .iter()
                    .map(|&i| {
                        if is_alice {
                            domain.sub(column, i)
                        } else {
                            domain.negate(i)
                        }
                    })
                    .collect();
                let products = multiply_bit_shares(
                    ctx,
                    self.relu.rng_mut(),
                    domain,
                    &d,
                    &[diff.as_slice(), di.as_slice()],
                )
                .await?;
                for r in 0..rows {
                    max[r] = domain.add(max[r], products[0][r]);
                    argmax[r] = domain.add(argmax[r], products[1][r]);
                }
            } else {
                let relu = self.relu.relu(ctx, &diff, false).await?;
                for (m, v) in max.iter_mut().zip(relu.values) {
                    *m = domain.add(*m, v);
                }
            }
        }
        Ok(MaxPoolOutput {
            max,
            argmax: compute_argmax.then_some(argmax),
        })
    }
}
