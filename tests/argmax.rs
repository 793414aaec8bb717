mod common;

use cmpot::{
    Error,
    algebra::ShareArithmetic,
    argmax::ArgMaxProtocol,
    config::{AlgebraicStructure, ProtocolConfig},
};
use common::{channel_pair, dummy_contexts, init_tracing, share_signed};

async fn argmax(config: ProtocolConfig, values: &[i64]) -> Result<(u64, i64), Error> {
    let domain = config.domain;
    let (a, b) = share_signed(domain, values, 31);
    let (ch_a, ch_b) = channel_pair();
    let (mut alice, mut bob) = dummy_contexts(&ch_a, &ch_b);
    let mut p_a = ArgMaxProtocol::new(config)?;
    let mut p_b = ArgMaxProtocol::new(config)?;
    let (out_a, out_b) = tokio::try_join!(
        p_a.argmax(&mut alice, &a, true),
        p_b.argmax(&mut bob, &b, true),
    )?;
    let index = domain.reconstruct(out_a.index, out_b.index);
    let max = match (out_a.max, out_b.max) {
        (Some(x), Some(y)) => domain.decode_signed(domain.reconstruct(x, y)),
        _ => panic!("max was requested"),
    };
    Ok((index, max))
}

#[tokio::test]
async fn finds_the_maximum_and_its_position() -> Result<(), Error> {
    init_tracing();
    let values = [3, 7, 2, 9, 4];
    assert_eq!(argmax(ProtocolConfig::ring(32), &values).await?, (3, 9));
    Ok(())
}

#[tokio::test]
async fn any_length_in_ring_and_field() -> Result<(), Error> {
    let configs = [ProtocolConfig::ring(20), ProtocolConfig::field((1 << 31) - 1)];
    for config in configs {
        for n in 1..=11 {
            let values: Vec<i64> = (0..n).map(|i| (i * 37 % 11) - 5).collect();
            let (index, max) = argmax(config, &values).await?;
            let expected_max = *values.iter().max().expect("non-empty");
            let expected_index = values.iter().position(|&v| v == expected_max).expect("present");
            assert_eq!(max, expected_max, "n = {n}");
            assert_eq!(index, expected_index as u64, "n = {n}");
        }
    }
    Ok(())
}

#[tokio::test]
async fn ties_resolve_to_the_lowest_index() -> Result<(), Error> {
    assert_eq!(argmax(ProtocolConfig::ring(16), &[5, 9, 9]).await?, (1, 9));
    assert_eq!(argmax(ProtocolConfig::ring(16), &[-4, -4, -4, -4]).await?, (0, -4));
    Ok(())
}

#[tokio::test]
async fn index_only() -> Result<(), Error> {
    let config = ProtocolConfig::ring(16);
    let domain = AlgebraicStructure::Ring { bitwidth: 16 };
    let (a, b) = share_signed(domain, &[-1, -7, 0, -3], 32);
    let (ch_a, ch_b) = channel_pair();
    let (mut alice, mut bob) = dummy_contexts(&ch_a, &ch_b);
    let mut p_a = ArgMaxProtocol::new(config)?;
    let mut p_b = ArgMaxProtocol::new(config)?;
    let (out_a, out_b) = tokio::try_join!(
        p_a.argmax(&mut alice, &a, false),
        p_b.argmax(&mut bob, &b, false),
    )?;
    assert_eq!(out_a.max, None);
    assert_eq!(out_b.max, None);
    assert_eq!(domain.reconstruct(out_a.index, out_b.index), 2);
    Ok(())
}
