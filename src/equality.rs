//! Secure equality of Alice's and Bob's private inputs.
//!
//! Uses the digit decomposition and AND tree of [`crate::millionaire`], carrying only the equality
//! bit: `eq = eq_hi & eq_lo`, one standard triple per merged pair of digits.

use tracing::{Level, debug, instrument, trace};

use crate::{
    bits::PackedBits,
    channel::Channel,
    config::ConfigError,
    context::Context,
    error::Error,
    millionaire::{AndGate, CMP_BATCH_MULTIPLE, DigitLayout, and_round, digit_ot, pad_by_replication},
    ot::OtPack,
    triple::{AndTripleGenerator, TripleMethod, TripleStats},
};

/// Secure equality test between Alice's and Bob's private inputs.
#[derive(Debug)]
pub struct EqualityProtocol {
    triple_gen: AndTripleGenerator,
    layout: DigitLayout,
}

impl Default for EqualityProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl EqualityProtocol {
    /// Creates the protocol.
    pub fn new() -> Self {
        Self {
            triple_gen: AndTripleGenerator::new(),
            layout: DigitLayout::default(),
        }
    }

    /// Resizes the digit decomposition for inputs of `bitlength` bits and digits of `radix` bits.
    pub fn configure(&mut self, bitlength: u32, radix: u32) -> Result<(), ConfigError> {
        self.layout = DigitLayout::new(bitlength, radix)?;
        Ok(())
    }

    /// The number of (standard) AND triples consumed per equality test: `num_digits - 1`.
    pub fn num_triples(&self) -> usize {
        self.layout.num_digits - 1
    }

    /// The triple counters, accumulated over all calls.
    pub fn triple_stats(&self) -> TripleStats {
        self.triple_gen.stats()
    }

    /// Computes shares of `x_A == x_B` per element, where `inputs` are this party's
    /// `bitlength`-bit values.
    #[instrument(level = Level::DEBUG, skip(self, ctx, inputs), fields(num_eqs = inputs.len()), err)]
    pub async fn check_equality<C: Channel, O: OtPack>(
        &mut self,
        ctx: &mut Context<'_, C, O>,
        inputs: &[u64],
        bitlength: u32,
        radix: u32,
    ) -> Result<Vec<bool>, Error> {
        self.configure(bitlength, radix)?;
        let layout = self.layout;
        layout.check_inputs(inputs)?;
        if inputs.is_empty() {
            return Ok(vec![]);
        }
        let padded = pad_by_replication(inputs, CMP_BATCH_MULTIPLE);
        let num_eqs = padded.len();
        debug!(num_eqs, num_digits = layout.num_digits, "check equality");

        let num_triples = self.num_triples() * num_eqs;
        let mut triples = self
            .triple_gen
            .generate(ctx, num_triples, TripleMethod::Kkot16To4Ot, 0)
            .await?;
        let leaves = digit_ot(
            ctx,
            self.triple_gen.rng_mut(),
            &layout,
            &padded,
            "equality",
            |_| 1,
            |_, own, j| (own == j) as u128,
        )
        .await?;
        let mut eq: Vec<PackedBits> = leaves
            .iter()
            .map(|shares| shares.iter().map(|&s| s == 1).collect())
            .collect();

        let nd = layout.num_digits;
        let mut stride = 1;
        let mut level = 0;
        while stride < nd {
            let los: Vec<usize> = (0..nd - stride).step_by(2 * stride).collect();
            let gates: Vec<AndGate> = los
                .iter()
                .map(|&lo| AndGate {
                    x: eq[lo + stride].clone(),
                    y: eq[lo].clone(),
                    triple: triples.take(num_eqs),
                    reuse_e: false,
                })
                .collect();
            trace!(level, stride, gates = gates.len(), "tree level");
            let outputs = and_round(ctx, &format!("equality_tree_{level}"), &gates).await?;
            for (lo, out) in los.into_iter().zip(outputs) {
                eq[lo] = out;
            }
            stride *= 2;
            level += 1;
        }
        self.triple_gen.finish(triples);

        Ok(eq[0].iter().take(inputs.len()).collect())
    }
}
