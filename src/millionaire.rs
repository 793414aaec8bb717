//! Secure comparison of Alice's and Bob's private inputs ("Millionaire's problem").
//!
//! Every input is split into radix digits. A 1-out-of-`2^radix` OT per digit gives both parties
//! shares of `(cmp_k, eq_k)`: whether Alice's digit `k` is greater than (or equal to) Bob's.
//! A binary tree then folds the digits from the least significant one upwards, combining a lower
//! node `lo` and a higher node `hi` into
//!
//! ```text
//! cmp = cmp_hi ^ (eq_hi & cmp_lo)
//! eq  = eq_hi & eq_lo
//! ```
//!
//! with every AND evaluated on shares using one Beaver triple and one round of communication per
//! tree level.

use rand::Rng;
use rand_chacha::ChaCha20Rng;
use tracing::{Level, debug, instrument, trace};

use crate::{
    algebra::low_mask,
    bits::PackedBits,
    channel::Channel,
    config::{ConfigError, DEFAULT_RADIX, MAX_BITWIDTH, Role, TripleStrategy, check_bitwidth, check_radix},
    context::Context,
    error::Error,
    ot::{OtPack, message_mask},
    triple::{AndTripleGenerator, TripleBlock, TripleMethod, TripleStats, Triples},
};

/// Batches of comparisons are padded to a multiple of this size.
pub const CMP_BATCH_MULTIPLE: usize = 8;

/// How inputs of a given bit length are split into radix digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DigitLayout {
    pub(crate) bitlength: u32,
    pub(crate) radix: u32,
    pub(crate) num_digits: usize,
    pub(crate) log_num_digits: usize,
}

impl DigitLayout {
    pub(crate) fn new(bitlength: u32, radix: u32) -> Result<Self, ConfigError> {
        check_bitwidth(bitlength)?;
        check_radix(radix)?;
        Ok(Self::from_valid(bitlength, radix))
    }

    pub(crate) fn from_valid(bitlength: u32, radix: u32) -> Self {
        let num_digits = bitlength.div_ceil(radix) as usize;
        let log_num_digits = if num_digits <= 1 {
            0
        } else {
            (usize::BITS - (num_digits - 1).leading_zeros()) as usize
        };
        Self {
            bitlength,
            radix,
            num_digits,
            log_num_digits,
        }
    }

    /// The width of digit `k`; only the most significant digit may be narrower than the radix.
    pub(crate) fn width(&self, k: usize) -> u32 {
        if k + 1 < self.num_digits {
            self.radix
        } else {
            self.bitlength - self.radix * (self.num_digits as u32 - 1)
        }
    }

    pub(crate) fn digit(&self, x: u64, k: usize) -> u64 {
        (x >> (k as u32 * self.radix)) & low_mask(self.width(k))
    }

    pub(crate) fn check_inputs(&self, inputs: &[u64]) -> Result<(), ConfigError> {
        let mask = low_mask(self.bitlength);
        match inputs.iter().find(|&&x| x & !mask != 0) {
            Some(&value) => Err(ConfigError::InputTooWide {
                value,
                bitwidth: self.bitlength,
            }),
            None => Ok(()),
        }
    }
}

impl Default for DigitLayout {
    fn default() -> Self {
        Self::from_valid(MAX_BITWIDTH, DEFAULT_RADIX)
    }
}

/// Pads `values` to a multiple of `multiple` by repeating the last element.
pub(crate) fn pad_by_replication<T: Clone>(values: &[T], multiple: usize) -> Vec<T> {
    let mut padded = values.to_vec();
    if let Some(last) = values.last() {
        padded.resize(values.len().next_multiple_of(multiple), last.clone());
    }
    padded
}

/// Obliviously evaluates a lookup table per digit.
///
/// For every input and digit `k`, Alice builds the table `j -> table(k, alice_digit, j)` over all
/// `2^width(k)` possible digits `j` of Bob, masks it with fresh random bits and sends it through
/// OT; Bob chooses with his own digit. Alice keeps the masks as her shares and Bob's shares are
/// the received entries, so the shares of digit `k` XOR to `table(k, alice_digit, bob_digit)`.
///
/// Digits with the same table size and entry size are batched into a single OT call.
pub(crate) async fn digit_ot<C: Channel, O: OtPack>(
    ctx: &mut Context<'_, C, O>,
    rng: &mut ChaCha20Rng,
    layout: &DigitLayout,
    inputs: &[u64],
    label: &str,
    bits_of: impl Fn(usize) -> usize,
    table: impl Fn(usize, u64, u64) -> u128,
) -> Result<Vec<Vec<u128>>, Error> {
    let nd = layout.num_digits;
    let mut shares = vec![vec![]; nd];
    let mut start = 0;
    while start < nd {
        let key = (layout.width(start), bits_of(start));
        let mut end = start + 1;
        while end < nd && (layout.width(end), bits_of(end)) == key {
            end += 1;
        }
        let (width, bits) = key;
        let n = 1usize << width;
        let phase = format!("{label}_leaves_{start}_{end}");
        trace!(phase, n, bits, instances = (end - start) * inputs.len(), "leaf ot");
        match ctx.role() {
            Role::Alice => {
                let mask = message_mask(bits);
                let mut messages = Vec::with_capacity((end - start) * inputs.len() * n);
                for (k, digit_shares) in shares.iter_mut().enumerate().take(end).skip(start) {
                    for &x in inputs {
                        let r = rng.random::<u128>() & mask;
                        let own = layout.digit(x, k);
                        messages.extend((0..n as u64).map(|j| table(k, own, j) ^ r));
                        digit_shares.push(r);
                    }
                }
                ctx.ot_send(&phase, &messages, n, bits).await?;
            }
            Role::Bob => {
                let choices: Vec<u8> = (start..end)
                    .flat_map(|k| inputs.iter().map(move |&x| layout.digit(x, k) as u8))
                    .collect();
                let received = ctx.ot_recv(&phase, &choices, n, bits).await?;
                for (k, chunk) in (start..end).zip(received.chunks(inputs.len())) {
                    shares[k] = chunk.to_vec();
                }
            }
        }
        start = end;
    }
    Ok(shares)
}

/// One AND gate on shared bit vectors, with the triple it consumes.
#[derive(Debug, Clone)]
pub(crate) struct AndGate {
    pub(crate) x: PackedBits,
    pub(crate) y: PackedBits,
    pub(crate) triple: TripleBlock,
    /// The gate has the same `x` and triple operand `a` as the previous gate, so its masked `x`
    /// is not sent again.
    pub(crate) reuse_e: bool,
}

/// Masks the operands of all gates: `e = x ^ a` (unless reused) followed by `f = y ^ b`.
pub(crate) fn and_step_1(gates: &[AndGate]) -> PackedBits {
    let mut parts = vec![];
    for gate in gates {
        if !gate.reuse_e {
            parts.push(&gate.x ^ &gate.triple.a);
        }
        parts.push(&gate.y ^ &gate.triple.b);
    }
    PackedBits::concat(&parts)
}

/// Combines both parties' masked operands into shares of `x & y` for every gate.
pub(crate) fn and_step_2(
    role: Role,
    gates: &[AndGate],
    own: &PackedBits,
    peer: &PackedBits,
) -> Vec<PackedBits> {
    let opened = own ^ peer;
    let mut pos = 0;
    let mut e = PackedBits::default();
    let mut outputs = Vec::with_capacity(gates.len());
    for gate in gates {
        let len = gate.y.len();
        if !gate.reuse_e {
            e = opened.slice(pos, len);
            pos += len;
        }
        assert_eq!(e.len(), len, "reused operand of a different length");
        let f = opened.slice(pos, len);
        pos += len;
        let mut z = gate.triple.c.clone();
        z ^= &(&e & &gate.triple.b);
        z ^= &(&f & &gate.triple.a);
        if role.is_alice() {
            z ^= &(&e & &f);
        }
        outputs.push(z);
    }
    outputs
}

/// Evaluates all gates in a single round trip.
///
/// Both directions of the round run concurrently and the call returns only once the peer's masked
/// operands have arrived, which makes it the barrier between two tree levels.
pub(crate) async fn and_round<C: Channel, O: OtPack>(
    ctx: &mut Context<'_, C, O>,
    phase: &str,
    gates: &[AndGate],
) -> Result<Vec<PackedBits>, Error> {
    let own = and_step_1(gates);
    let bytes = own.as_bytes();
    let peer: Vec<u8> = ctx.exchange(phase, bytes, bytes.len()).await?;
    let actual = peer.len();
    let peer = PackedBits::from_bytes(peer, own.len()).ok_or(Error::InvalidInputLength {
        expected: bytes.len(),
        actual,
    })?;
    Ok(and_step_2(ctx.role(), gates, &own, &peer))
}

/// Secure greater-than (or less-than) between Alice's and Bob's private inputs.
#[derive(Debug)]
pub struct MillionaireProtocol {
    strategy: TripleStrategy,
    triple_gen: AndTripleGenerator,
    layout: DigitLayout,
}

impl MillionaireProtocol {
    /// Creates the protocol, spending triples according to `strategy`.
    pub fn new(strategy: TripleStrategy) -> Self {
        Self {
            strategy,
            triple_gen: AndTripleGenerator::new(),
            layout: DigitLayout::default(),
        }
    }

    /// The triple strategy.
    pub fn strategy(&self) -> TripleStrategy {
        self.strategy
    }

    /// Resizes the digit decomposition for inputs of `bitlength` bits and digits of `radix` bits.
    pub fn configure(&mut self, bitlength: u32, radix: u32) -> Result<(), ConfigError> {
        self.layout = DigitLayout::new(bitlength, radix)?;
        Ok(())
    }

    /// The number of digits of the current configuration.
    pub fn num_digits(&self) -> usize {
        self.layout.num_digits
    }

    /// The number of AND triples consumed per comparison with the current configuration.
    ///
    /// `log` of them are standard triples (one per tree level); under
    /// [`TripleStrategy::Correlated`] the remaining `2 * num_digits - 2 - 2 * log` are correlated.
    pub fn num_triples(&self) -> usize {
        let DigitLayout {
            num_digits,
            log_num_digits,
            ..
        } = self.layout;
        if num_digits <= 1 {
            0
        } else {
            2 * num_digits - 2 - log_num_digits
        }
    }

    /// The triple counters, accumulated over all calls.
    pub fn triple_stats(&self) -> TripleStats {
        self.triple_gen.stats()
    }

    /// The generator's PRNG, for protocols building on top of this one.
    pub(crate) fn rng_mut(&mut self) -> &mut ChaCha20Rng {
        self.triple_gen.rng_mut()
    }

    /// Computes shares of `x_A > x_B` (or `x_A < x_B` if `greater_than` is false) per element,
    /// where `inputs` are this party's `bitlength`-bit values.
    ///
    /// Both parties must call with the same number of inputs and the same parameters.
    #[instrument(level = Level::DEBUG, skip(self, ctx, inputs), fields(num_cmps = inputs.len()), err)]
    pub async fn compare<C: Channel, O: OtPack>(
        &mut self,
        ctx: &mut Context<'_, C, O>,
        inputs: &[u64],
        bitlength: u32,
        greater_than: bool,
        radix: u32,
    ) -> Result<Vec<bool>, Error> {
        self.configure(bitlength, radix)?;
        let layout = self.layout;
        layout.check_inputs(inputs)?;
        if inputs.is_empty() {
            return Ok(vec![]);
        }
        let padded = pad_by_replication(inputs, CMP_BATCH_MULTIPLE);
        let num_cmps = padded.len();
        debug!(
            num_cmps,
            num_digits = layout.num_digits,
            num_triples = self.num_triples() * num_cmps,
            "compare"
        );
        let cmp_bit = move |own: u64, j: u64| {
            if greater_than { own > j } else { own < j }
        };

        if layout.num_digits == 1 {
            let leaves = digit_ot(
                ctx,
                self.triple_gen.rng_mut(),
                &layout,
                &padded,
                "millionaire",
                |_| 1,
                |_, own, j| cmp_bit(own, j) as u128,
            )
            .await?;
            return Ok(leaves[0][..inputs.len()].iter().map(|&s| s == 1).collect());
        }

        let (mut standard, mut correlated) = self.generate_triples(ctx, num_cmps).await?;
        let leaves = digit_ot(
            ctx,
            self.triple_gen.rng_mut(),
            &layout,
            &padded,
            "millionaire",
            |k| if k == 0 { 1 } else { 2 },
            |k, own, j| {
                if k == 0 {
                    cmp_bit(own, j) as u128
                } else {
                    (cmp_bit(own, j) as u128) << 1 | (own == j) as u128
                }
            },
        )
        .await?;
        let mut cmp: Vec<PackedBits> = leaves
            .iter()
            .enumerate()
            .map(|(k, shares)| {
                let shift = if k == 0 { 0 } else { 1 };
                shares.iter().map(|&s| s >> shift & 1 == 1).collect()
            })
            .collect();
        let mut eq: Vec<PackedBits> = leaves
            .iter()
            .map(|shares| shares.iter().map(|&s| s & 1 == 1).collect())
            .collect();

        let nd = layout.num_digits;
        let mut stride = 1;
        let mut level = 0;
        while stride < nd {
            let mut gates = vec![];
            let mut merged = vec![];
            for lo in (0..nd - stride).step_by(2 * stride) {
                let hi = lo + stride;
                if lo == 0 {
                    gates.push(AndGate {
                        x: eq[hi].clone(),
                        y: cmp[lo].clone(),
                        triple: standard.take(num_cmps),
                        reuse_e: false,
                    });
                } else {
                    let (t_cmp, t_eq, reuse_e) = match self.strategy {
                        TripleStrategy::Correlated => {
                            let (t_cmp, t_eq) = correlated.take(2 * num_cmps).split_at(num_cmps);
                            (t_cmp, t_eq, true)
                        }
                        TripleStrategy::Standard => {
                            (standard.take(num_cmps), standard.take(num_cmps), false)
                        }
                    };
                    gates.push(AndGate {
                        x: eq[hi].clone(),
                        y: cmp[lo].clone(),
                        triple: t_cmp,
                        reuse_e: false,
                    });
                    gates.push(AndGate {
                        x: eq[hi].clone(),
                        y: eq[lo].clone(),
                        triple: t_eq,
                        reuse_e,
                    });
                }
                merged.push(lo);
            }
            trace!(level, stride, gates = gates.len(), "tree level");
            let outputs = and_round(ctx, &format!("millionaire_tree_{level}"), &gates).await?;
            let mut pos = 0;
            for lo in merged {
                let hi = lo + stride;
                cmp[lo] = &outputs[pos] ^ &cmp[hi];
                if lo == 0 {
                    pos += 1;
                } else {
                    eq[lo] = outputs[pos + 1].clone();
                    pos += 2;
                }
            }
            stride *= 2;
            level += 1;
        }
        assert_eq!(level, layout.log_num_digits);
        self.triple_gen.finish(standard);
        self.triple_gen.finish(correlated);

        Ok(cmp[0].iter().take(inputs.len()).collect())
    }

    async fn generate_triples<C: Channel, O: OtPack>(
        &mut self,
        ctx: &mut Context<'_, C, O>,
        num_cmps: usize,
    ) -> Result<(Triples, Triples), Error> {
        let log = self.layout.log_num_digits;
        let total = self.num_triples();
        let (num_standard, num_correlated) = match self.strategy {
            TripleStrategy::Correlated => (log, total - log),
            TripleStrategy::Standard => (total, 0),
        };
        let standard = self
            .triple_gen
            .generate(ctx, num_standard * num_cmps, TripleMethod::Kkot16To4Ot, 0)
            .await?;
        let correlated = self
            .triple_gen
            .generate(
                ctx,
                num_correlated * num_cmps,
                TripleMethod::Kkot8Correlated,
                num_cmps,
            )
            .await?;
        Ok((standard, correlated))
    }
}
