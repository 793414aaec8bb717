#![allow(dead_code)]

use cmpot::{
    algebra::ShareArithmetic,
    channel::SimpleChannel,
    config::{AlgebraicStructure, Role},
    context::Context,
    ot::DummyOt,
};
use rand::{SeedableRng, rngs::StdRng};
use tracing_subscriber::EnvFilter;

/// Installs a test subscriber once, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A connected channel pair, Alice's first.
pub fn channel_pair() -> (SimpleChannel, SimpleChannel) {
    let [alice, bob]: [SimpleChannel; 2] = SimpleChannel::channels(2)
        .try_into()
        .expect("parties is 2");
    (alice, bob)
}

/// Contexts over the dummy OT for both parties.
pub fn dummy_contexts<'ch>(
    alice: &'ch SimpleChannel,
    bob: &'ch SimpleChannel,
) -> (
    Context<'ch, SimpleChannel, DummyOt>,
    Context<'ch, SimpleChannel, DummyOt>,
) {
    (
        Context::new(alice, DummyOt::new(Role::Alice), Role::Alice),
        Context::new(bob, DummyOt::new(Role::Bob), Role::Bob),
    )
}

/// Splits signed values into shares of `domain`.
pub fn share_signed(domain: AlgebraicStructure, values: &[i64], seed: u64) -> (Vec<u64>, Vec<u64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    values
        .iter()
        .map(|&v| domain.split(domain.encode_signed(v), &mut rng))
        .unzip()
}

/// XORs two vectors of bit shares.
pub fn xor_bits(a: &[bool], b: &[bool]) -> Vec<bool> {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x ^ y).collect()
}

/// Adds two vectors of additive shares and decodes them as signed values.
pub fn open_signed(domain: AlgebraicStructure, a: &[u64], b: &[u64]) -> Vec<i64> {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(&x, &y)| domain.decode_signed(domain.reconstruct(x, y)))
        .collect()
}
