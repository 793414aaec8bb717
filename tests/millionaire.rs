mod common;

use cmpot::{
    Error,
    config::{ConfigError, TripleStrategy},
    millionaire::{CMP_BATCH_MULTIPLE, MillionaireProtocol},
};
use common::{channel_pair, dummy_contexts, init_tracing, xor_bits};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn random_inputs(rng: &mut StdRng, n: usize, bitlength: u32) -> Vec<u64> {
    let mask = if bitlength == 64 {
        u64::MAX
    } else {
        (1 << bitlength) - 1
    };
    let mut values: Vec<u64> = (0..n).map(|_| rng.random::<u64>() & mask).collect();
    // boundary values, and equal inputs are produced by pairing these with themselves
    values.extend([0, mask, mask >> 1]);
    values
}

async fn compare(
    strategy: TripleStrategy,
    x: &[u64],
    y: &[u64],
    bitlength: u32,
    greater_than: bool,
    radix: u32,
) -> Result<Vec<bool>, Error> {
    let (ch_a, ch_b) = channel_pair();
    let (mut alice, mut bob) = dummy_contexts(&ch_a, &ch_b);
    let mut p_a = MillionaireProtocol::new(strategy);
    let mut p_b = MillionaireProtocol::new(strategy);
    let (r_a, r_b) = tokio::try_join!(
        p_a.compare(&mut alice, x, bitlength, greater_than, radix),
        p_b.compare(&mut bob, y, bitlength, greater_than, radix),
    )?;
    Ok(xor_bits(&r_a, &r_b))
}

#[tokio::test]
async fn greater_than_for_all_bitlengths_and_radices() -> Result<(), Error> {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(11);
    for strategy in [TripleStrategy::Correlated, TripleStrategy::Standard] {
        for bitlength in [1, 4, 8, 16, 32, 64] {
            for radix in [1, 2, 4, 8] {
                let x = random_inputs(&mut rng, 13, bitlength);
                let mut y = random_inputs(&mut rng, 13, bitlength);
                y[0] = x[0];
                let result = compare(strategy, &x, &y, bitlength, true, radix).await?;
                let expected: Vec<bool> = x.iter().zip(&y).map(|(a, b)| a > b).collect();
                assert_eq!(
                    result, expected,
                    "strategy = {strategy:?}, L = {bitlength}, radix = {radix}"
                );
            }
        }
    }
    Ok(())
}

#[tokio::test]
async fn less_than() -> Result<(), Error> {
    let x = [0, 3, 200, 255, 17, 17];
    let y = [1, 3, 100, 0, 18, 16];
    let result = compare(TripleStrategy::Correlated, &x, &y, 8, false, 4).await?;
    assert_eq!(result, vec![true, false, false, false, true, false]);
    Ok(())
}

#[tokio::test]
async fn padding_does_not_change_results() -> Result<(), Error> {
    let mut rng = StdRng::seed_from_u64(12);
    let x = random_inputs(&mut rng, 2 * CMP_BATCH_MULTIPLE, 20);
    let y = random_inputs(&mut rng, 2 * CMP_BATCH_MULTIPLE, 20);
    let full = compare(TripleStrategy::Correlated, &x, &y, 20, true, 3).await?;
    for n in [1, 5, CMP_BATCH_MULTIPLE, CMP_BATCH_MULTIPLE + 1] {
        let part = compare(TripleStrategy::Correlated, &x[..n], &y[..n], 20, true, 3).await?;
        assert_eq!(part, full[..n]);
    }
    Ok(())
}

#[tokio::test]
async fn consumes_exactly_the_advertised_triples() -> Result<(), Error> {
    for strategy in [TripleStrategy::Correlated, TripleStrategy::Standard] {
        let (ch_a, ch_b) = channel_pair();
        let (mut alice, mut bob) = dummy_contexts(&ch_a, &ch_b);
        let mut p_a = MillionaireProtocol::new(strategy);
        let mut p_b = MillionaireProtocol::new(strategy);
        let x: Vec<u64> = (0..10).collect();
        let y: Vec<u64> = (0..10).rev().collect();
        tokio::try_join!(
            p_a.compare(&mut alice, &x, 32, true, 4),
            p_b.compare(&mut bob, &y, 32, true, 4),
        )?;
        let padded = 10usize.next_multiple_of(CMP_BATCH_MULTIPLE);
        let expected = p_a.num_triples() * padded;
        assert_eq!(p_a.num_triples(), 11);
        assert_eq!(p_a.triple_stats().generated, expected);
        assert_eq!(p_a.triple_stats().consumed, expected);
        assert_eq!(p_b.triple_stats(), p_a.triple_stats());
    }
    Ok(())
}

#[tokio::test]
async fn empty_batch_is_a_no_op() -> Result<(), Error> {
    let (ch_a, ch_b) = channel_pair();
    let (mut alice, _bob) = dummy_contexts(&ch_a, &ch_b);
    let mut protocol = MillionaireProtocol::new(TripleStrategy::Correlated);
    assert!(protocol.compare(&mut alice, &[], 16, true, 4).await?.is_empty());
    assert_eq!(protocol.triple_stats().generated, 0);
    Ok(())
}

#[tokio::test]
async fn invalid_parameters_are_rejected_before_any_message() {
    let (ch_a, ch_b) = channel_pair();
    let (mut alice, _bob) = dummy_contexts(&ch_a, &ch_b);
    let mut protocol = MillionaireProtocol::new(TripleStrategy::Correlated);
    assert!(matches!(
        protocol.compare(&mut alice, &[1], 0, true, 4).await,
        Err(Error::Config(ConfigError::BitwidthOutOfRange(0)))
    ));
    assert!(matches!(
        protocol.compare(&mut alice, &[1], 8, true, 9).await,
        Err(Error::Config(ConfigError::RadixOutOfRange(9)))
    ));
    assert!(matches!(
        protocol.compare(&mut alice, &[256], 8, true, 4).await,
        Err(Error::Config(ConfigError::InputTooWide {
            value: 256,
            bitwidth: 8
        }))
    ));
}
