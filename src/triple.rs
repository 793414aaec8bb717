//! Boolean AND triples (Beaver triples over `GF(2)`) generated from 1-out-of-N OT.
//!
//! After generation, Alice holds `(a_A, b_A, c_A)` and Bob holds `(a_B, b_B, c_B)` such that
//! `(a_A ^ a_B) & (b_A ^ b_B) == c_A ^ c_B` for every triple.

use rand::{SeedableRng, random};
use rand_chacha::ChaCha20Rng;
use tracing::{Level, debug, instrument};

use crate::{
    bits::PackedBits,
    channel::Channel,
    config::{ConfigError, Role},
    context::Context,
    error::Error,
    ot::OtPack,
};

/// How a batch of triples is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripleMethod {
    /// Alice draws all shares and sends Bob his in the clear. Insecure, only for testing.
    Ideal,
    /// Two independent triples per 1-out-of-16 OT.
    Kkot16To4Ot,
    /// Two triples sharing the operand `a` per 1-out-of-8 OT.
    ///
    /// With correlation offset `o`, the triples are grouped in blocks of `2 * o` in which triple
    /// `g + j` and triple `g + j + o` (for `j < o`) share `a`.
    Kkot8Correlated,
}

impl TripleMethod {
    fn name(self) -> &'static str {
        match self {
            TripleMethod::Ideal => "ideal",
            TripleMethod::Kkot16To4Ot => "16kkot_to_4ot",
            TripleMethod::Kkot8Correlated => "8kkot",
        }
    }
}

/// Cumulative triple counters of a generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TripleStats {
    /// The number of triples generated so far.
    pub generated: usize,
    /// The number of triples consumed by finished protocol runs.
    pub consumed: usize,
}

/// A contiguous run of triples, taken out of a [`Triples`] batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripleBlock {
    /// This party's shares of the first operand.
    pub a: PackedBits,
    /// This party's shares of the second operand.
    pub b: PackedBits,
    /// This party's shares of the product.
    pub c: PackedBits,
}

impl TripleBlock {
    /// The number of triples in the block.
    pub fn len(&self) -> usize {
        self.a.len()
    }

    /// Whether the block holds no triples.
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// Splits the block into the first `mid` triples and the rest.
    pub fn split_at(&self, mid: usize) -> (TripleBlock, TripleBlock) {
        let rest = self.len() - mid;
        (
            TripleBlock {
                a: self.a.slice(0, mid),
                b: self.b.slice(0, mid),
                c: self.c.slice(0, mid),
            },
            TripleBlock {
                a: self.a.slice(mid, rest),
                b: self.b.slice(mid, rest),
                c: self.c.slice(mid, rest),
            },
        )
    }
}

/// A generated batch of triples, consumed front to back.
#[derive(Debug, Clone)]
pub struct Triples {
    triples: TripleBlock,
    cursor: usize,
}

impl Triples {
    fn new(triples: TripleBlock) -> Self {
        Self { triples, cursor: 0 }
    }

    /// Takes the next `count` unused triples.
    ///
    /// Panics if fewer than `count` triples remain; every protocol generates exactly the number of
    /// triples it consumes.
    pub fn take(&mut self, count: usize) -> TripleBlock {
        assert!(
            count <= self.remaining(),
            "{count} triples requested, {} remaining",
            self.remaining()
        );
        let TripleBlock { a, b, c } = &self.triples;
        let block = TripleBlock {
            a: a.slice(self.cursor, count),
            b: b.slice(self.cursor, count),
            c: c.slice(self.cursor, count),
        };
        self.cursor += count;
        block
    }

    /// The number of triples that have not been taken yet.
    pub fn remaining(&self) -> usize {
        self.triples.len() - self.cursor
    }

    /// The number of triples that have been taken.
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    /// The whole batch, including triples already taken.
    pub fn as_block(&self) -> &TripleBlock {
        &self.triples
    }
}

/// Generates AND triples with the peer and keeps track of how many were used.
#[derive(Debug)]
pub struct AndTripleGenerator {
    rng: ChaCha20Rng,
    stats: TripleStats,
}

impl Default for AndTripleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl AndTripleGenerator {
    /// Creates a generator with a freshly seeded PRNG.
    pub fn new() -> Self {
        Self {
            rng: ChaCha20Rng::from_seed(random()),
            stats: TripleStats::default(),
        }
    }

    /// The local PRNG, also used by protocols for their own masks.
    pub fn rng_mut(&mut self) -> &mut ChaCha20Rng {
        &mut self.rng
    }

    /// The triple counters.
    pub fn stats(&self) -> TripleStats {
        self.stats
    }

    /// Checks the size preconditions of a generation call without generating anything.
    pub fn check(num_triples: usize, method: TripleMethod, offset: usize) -> Result<(), ConfigError> {
        match method {
            TripleMethod::Ideal => {
                if offset != 0 {
                    return Err(ConfigError::UnexpectedOffset {
                        method: method.name(),
                        offset,
                    });
                }
            }
            TripleMethod::Kkot16To4Ot => {
                if offset != 0 {
                    return Err(ConfigError::UnexpectedOffset {
                        method: method.name(),
                        offset,
                    });
                }
                if num_triples % 2 != 0 {
                    return Err(ConfigError::OddTripleCount {
                        method: method.name(),
                        count: num_triples,
                    });
                }
            }
            TripleMethod::Kkot8Correlated => {
                if num_triples % 2 != 0 {
                    return Err(ConfigError::OddTripleCount {
                        method: method.name(),
                        count: num_triples,
                    });
                }
                if offset == 0 || num_triples % (2 * offset) != 0 {
                    return Err(ConfigError::MisalignedCorrelation {
                        count: num_triples,
                        offset,
                    });
                }
            }
        }
        Ok(())
    }

    /// Generates `num_triples` triples with the peer, which must make the same call.
    ///
    /// `offset` must be 0 unless `method` is [`TripleMethod::Kkot8Correlated`]. All size
    /// preconditions are checked before the first message is sent.
    ///
    /// Triples are always bit-packed: the shares `a`, `b` and `c` of the returned batch are
    /// [`PackedBits`] holding one triple per bit, and there is no unpacked representation.
    #[instrument(level = Level::DEBUG, skip(self, ctx), err)]
    pub async fn generate<C: Channel, O: OtPack>(
        &mut self,
        ctx: &mut Context<'_, C, O>,
        num_triples: usize,
        method: TripleMethod,
        offset: usize,
    ) -> Result<Triples, Error> {
        Self::check(num_triples, method, offset)?;
        if num_triples == 0 {
            return Ok(Triples::new(TripleBlock {
                a: PackedBits::new(0),
                b: PackedBits::new(0),
                c: PackedBits::new(0),
            }));
        }
        let block = match method {
            TripleMethod::Ideal => self.generate_ideal(ctx, num_triples).await?,
            TripleMethod::Kkot16To4Ot => {
                let pairs: Vec<(usize, usize)> =
                    (0..num_triples / 2).map(|k| (2 * k, 2 * k + 1)).collect();
                self.generate_with_ot(ctx, num_triples, &pairs, false).await?
            }
            TripleMethod::Kkot8Correlated => {
                let pairs: Vec<(usize, usize)> = (0..num_triples)
                    .step_by(2 * offset)
                    .flat_map(|g| (g..g + offset).map(move |i| (i, i + offset)))
                    .collect();
                self.generate_with_ot(ctx, num_triples, &pairs, true).await?
            }
        };
        self.stats.generated += num_triples;
        debug!(generated = self.stats.generated, "triples ready");
        Ok(Triples::new(block))
    }

    /// Records a fully consumed batch.
    ///
    /// Panics if triples are left over, which would mean the protocol consumed fewer than it
    /// generated.
    pub fn finish(&mut self, triples: Triples) {
        assert_eq!(
            triples.remaining(),
            0,
            "{} generated triples were not consumed",
            triples.remaining()
        );
        self.stats.consumed += triples.consumed();
    }

    async fn generate_ideal<C: Channel, O: OtPack>(
        &mut self,
        ctx: &mut Context<'_, C, O>,
        num: usize,
    ) -> Result<TripleBlock, Error> {
        let phase = "triples_ideal";
        let bytes = num.div_ceil(8);
        match ctx.role() {
            Role::Alice => {
                let a = PackedBits::random(&mut self.rng, num);
                let b = PackedBits::random(&mut self.rng, num);
                let c = PackedBits::random(&mut self.rng, num);
                let a_bob = PackedBits::random(&mut self.rng, num);
                let b_bob = PackedBits::random(&mut self.rng, num);
                let c_bob = &(&(&a ^ &a_bob) & &(&b ^ &b_bob)) ^ &c;
                let msg = [a_bob.as_bytes(), b_bob.as_bytes(), c_bob.as_bytes()].concat();
                ctx.send(phase, &msg).await?;
                Ok(TripleBlock { a, b, c })
            }
            Role::Bob => {
                let msg: Vec<u8> = ctx.recv(phase, 3 * bytes).await?;
                let part = |i: usize| {
                    PackedBits::from_bytes(msg[i * bytes..(i + 1) * bytes].to_vec(), num)
                };
                match (part(0), part(1), part(2)) {
                    (Some(a), Some(b), Some(c)) => Ok(TripleBlock { a, b, c }),
                    _ => Err(Error::InvalidInputLength {
                        expected: 3 * bytes,
                        actual: msg.len(),
                    }),
                }
            }
        }
    }

    /// Derives two triples per OT. For the pair `(i, j)`, Bob's choice is his share of
    /// `(a_i, b_i, a_j, b_j)` (or `(a_i, b_i, b_j)` when `a_i == a_j`) and Alice's two-bit message
    /// is the product of the reconstructed operands, masked with her `c_i` and `c_j`.
    async fn generate_with_ot<C: Channel, O: OtPack>(
        &mut self,
        ctx: &mut Context<'_, C, O>,
        num: usize,
        pairs: &[(usize, usize)],
        correlated: bool,
    ) -> Result<TripleBlock, Error> {
        let (n, phase) = if correlated {
            (8, "triples_8kkot")
        } else {
            (16, "triples_16kkot")
        };
        let mut a = PackedBits::random(&mut self.rng, num);
        let b = PackedBits::random(&mut self.rng, num);
        if correlated {
            for &(i, j) in pairs {
                a.set(j, a.get(i));
            }
        }
        let peer_bits = |choice: usize| -> (bool, bool, bool, bool) {
            if correlated {
                let a = choice >> 2 & 1 == 1;
                (a, choice >> 1 & 1 == 1, a, choice & 1 == 1)
            } else {
                (
                    choice >> 3 & 1 == 1,
                    choice >> 2 & 1 == 1,
                    choice >> 1 & 1 == 1,
                    choice & 1 == 1,
                )
            }
        };
        match ctx.role() {
            Role::Alice => {
                let c = PackedBits::random(&mut self.rng, num);
                let mut table = Vec::with_capacity(pairs.len() * n);
                for &(i, j) in pairs {
                    for choice in 0..n {
                        let (a_i, b_i, a_j, b_j) = peer_bits(choice);
                        let t_i = ((a.get(i) ^ a_i) & (b.get(i) ^ b_i)) ^ c.get(i);
                        let t_j = ((a.get(j) ^ a_j) & (b.get(j) ^ b_j)) ^ c.get(j);
                        table.push((t_i as u128) << 1 | t_j as u128);
                    }
                }
                ctx.ot_send(phase, &table, n, 2).await?;
                Ok(TripleBlock { a, b, c })
            }
            Role::Bob => {
                let choices: Vec<u8> = pairs
                    .iter()
                    .map(|&(i, j)| {
                        if correlated {
                            (a.get(i) as u8) << 2 | (b.get(i) as u8) << 1 | b.get(j) as u8
                        } else {
                            (a.get(i) as u8) << 3
                                | (b.get(i) as u8) << 2
                                | (a.get(j) as u8) << 1
                                | b.get(j) as u8
                        }
                    })
                    .collect();
                let received = ctx.ot_recv(phase, &choices, n, 2).await?;
                let mut c = PackedBits::new(num);
                for (&(i, j), t) in pairs.iter().zip(received) {
                    c.set(i, t >> 1 & 1 == 1);
                    c.set(j, t & 1 == 1);
                }
                Ok(TripleBlock { a, b, c })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{channel::SimpleChannel, ot::DummyOt};

    fn assert_valid(alice: &TripleBlock, bob: &TripleBlock) {
        let a = &alice.a ^ &bob.a;
        let b = &alice.b ^ &bob.b;
        let c = &alice.c ^ &bob.c;
        assert_eq!(&a & &b, c);
    }

    async fn generate_both(
        num: usize,
        method: TripleMethod,
        offset: usize,
    ) -> Result<(TripleBlock, TripleBlock), Error> {
        let [ch_a, ch_b]: [SimpleChannel; 2] = SimpleChannel::channels(2)
            .try_into()
            .expect("parties is 2");
        let mut alice = Context::new(&ch_a, DummyOt::new(Role::Alice), Role::Alice);
        let mut bob = Context::new(&ch_b, DummyOt::new(Role::Bob), Role::Bob);
        let mut gen_a = AndTripleGenerator::new();
        let mut gen_b = AndTripleGenerator::new();
        let (ta, tb) = tokio::try_join!(
            gen_a.generate(&mut alice, num, method, offset),
            gen_b.generate(&mut bob, num, method, offset),
        )?;
        assert_eq!(gen_a.stats().generated, num);
        Ok((ta.as_block().clone(), tb.as_block().clone()))
    }

    #[tokio::test]
    async fn all_methods_produce_valid_triples() -> Result<(), Error> {
        for (method, offset) in [
            (TripleMethod::Ideal, 0),
            (TripleMethod::Kkot16To4Ot, 0),
            (TripleMethod::Kkot8Correlated, 1),
            (TripleMethod::Kkot8Correlated, 8),
        ] {
            let (alice, bob) = generate_both(48, method, offset).await?;
            assert_eq!(alice.len(), 48);
            for share in [&alice.a, &alice.b, &alice.c, &bob.a, &bob.b, &bob.c] {
                assert_eq!(share.as_bytes().len(), 6, "one triple per bit");
            }
            assert_valid(&alice, &bob);
        }
        Ok(())
    }

    #[tokio::test]
    async fn correlated_triples_share_a() -> Result<(), Error> {
        let offset = 4;
        let (alice, bob) = generate_both(16, TripleMethod::Kkot8Correlated, offset).await?;
        for g in (0..16).step_by(2 * offset) {
            for j in g..g + offset {
                assert_eq!(alice.a.get(j), alice.a.get(j + offset));
                assert_eq!(bob.a.get(j), bob.a.get(j + offset));
            }
        }
        Ok(())
    }

    #[test]
    fn size_preconditions_are_checked() {
        assert!(matches!(
            AndTripleGenerator::check(7, TripleMethod::Kkot16To4Ot, 0),
            Err(ConfigError::OddTripleCount { count: 7, .. })
        ));
        assert!(matches!(
            AndTripleGenerator::check(12, TripleMethod::Kkot8Correlated, 4),
            Err(ConfigError::MisalignedCorrelation { count: 12, offset: 4 })
        ));
        assert!(matches!(
            AndTripleGenerator::check(8, TripleMethod::Kkot16To4Ot, 2),
            Err(ConfigError::UnexpectedOffset { offset: 2, .. })
        ));
        assert!(AndTripleGenerator::check(16, TripleMethod::Kkot8Correlated, 4).is_ok());
    }

    #[tokio::test]
    async fn odd_count_fails_before_any_message() {
        let [ch_a, _ch_b]: [SimpleChannel; 2] = SimpleChannel::channels(2)
            .try_into()
            .expect("parties is 2");
        let mut alice = Context::new(&ch_a, DummyOt::new(Role::Alice), Role::Alice);
        let err = AndTripleGenerator::new()
            .generate(&mut alice, 3, TripleMethod::Kkot16To4Ot, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::OddTripleCount { .. })));
    }

    #[test]
    fn take_advances_and_split_halves() {
        let mut triples = Triples::new(TripleBlock {
            a: PackedBits::from_bools(&[true, false, true, true]),
            b: PackedBits::new(4),
            c: PackedBits::new(4),
        });
        let first = triples.take(3);
        assert_eq!(first.a.to_bools(), vec![true, false, true]);
        assert_eq!(triples.remaining(), 1);
        let (left, right) = first.split_at(1);
        assert_eq!(left.a.to_bools(), vec![true]);
        assert_eq!(right.a.to_bools(), vec![false, true]);
        let mut generator = AndTripleGenerator::new();
        triples.take(1);
        generator.finish(triples);
        assert_eq!(generator.stats().consumed, 4);
    }
}
