use std::time::Instant;

use criterion::{BenchmarkId, Criterion, Throughput};
use cmpot::{
    algebra::ShareArithmetic,
    argmax::ArgMaxProtocol,
    channel::SimpleChannel,
    config::{ProtocolConfig, Role, TripleStrategy},
    context::Context,
    millionaire::MillionaireProtocol,
    ot::{ChouOrlandiOt, DummyOt},
    relu::ReluProtocol,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tokio::runtime::Runtime;

fn channel_pair() -> (SimpleChannel, SimpleChannel) {
    let [ch1, ch2]: [SimpleChannel; 2] = SimpleChannel::channels(2)
        .try_into()
        .expect("parties is 2");
    (ch1, ch2)
}

pub fn base_ot_benchmark(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut g = c.benchmark_group("base_ot");
    g.bench_function("Chou-Orlandi setup", |b| {
        b.to_async(&rt).iter_custom(|iters| async move {
            let (ch1, ch2) = channel_pair();
            let now = Instant::now();
            for _ in 0..iters {
                tokio::try_join!(
                    ChouOrlandiOt::setup(&ch1, Role::Alice),
                    ChouOrlandiOt::setup(&ch2, Role::Bob),
                )
                .expect("setup failed");
            }
            now.elapsed()
        })
    });
}

pub fn comparison_benchmark(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut g = c.benchmark_group("millionaire");
    let count = 1 << 10;
    g.throughput(Throughput::Elements(count as u64));
    for strategy in [TripleStrategy::Correlated, TripleStrategy::Standard] {
        for bitlength in [32, 64] {
            let id = BenchmarkId::new(format!("{strategy:?}"), bitlength);
            g.bench_function(id, |b| {
                b.to_async(&rt).iter_custom(|iters| async move {
                    // iter_custom keeps the channel and OT setup out of the measured time
                    let (ch1, ch2) = channel_pair();
                    let mut rng = ChaCha20Rng::seed_from_u64(42);
                    let mask = u64::MAX >> (64 - bitlength);
                    let x: Vec<u64> = (0..count).map(|_| rng.random::<u64>() & mask).collect();
                    let y: Vec<u64> = (0..count).map(|_| rng.random::<u64>() & mask).collect();
                    let (ot1, ot2) = tokio::try_join!(
                        ChouOrlandiOt::setup(&ch1, Role::Alice),
                        ChouOrlandiOt::setup(&ch2, Role::Bob),
                    )
                    .expect("setup failed");
                    let mut alice = Context::new(&ch1, ot1, Role::Alice);
                    let mut bob = Context::new(&ch2, ot2, Role::Bob);
                    let mut p1 = MillionaireProtocol::new(strategy);
                    let mut p2 = MillionaireProtocol::new(strategy);
                    let now = Instant::now();
                    for _ in 0..iters {
                        tokio::try_join!(
                            p1.compare(&mut alice, &x, bitlength, true, 4),
                            p2.compare(&mut bob, &y, bitlength, true, 4),
                        )
                        .expect("comparison failed");
                    }
                    now.elapsed()
                })
            });
        }
    }
}

pub fn relu_benchmark(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut g = c.benchmark_group("relu");
    let configs = [
        ("ring_32", ProtocolConfig::ring(32)),
        ("field_31", ProtocolConfig::field((1 << 31) - 1)),
    ];
    for (name, config) in configs {
        for count in [1 << 8, 1 << 12] {
            g.throughput(Throughput::Elements(count as u64));
            g.bench_function(BenchmarkId::new(name, count), |b| {
                b.to_async(&rt).iter_custom(|iters| async move {
                    let (ch1, ch2) = channel_pair();
                    let domain = config.domain;
                    let mut rng = ChaCha20Rng::seed_from_u64(42);
                    let (a, b): (Vec<u64>, Vec<u64>) = (0..count)
                        .map(|_| domain.split(domain.random(&mut rng), &mut rng))
                        .unzip();
                    let mut alice = Context::new(&ch1, DummyOt::new(Role::Alice), Role::Alice);
                    let mut bob = Context::new(&ch2, DummyOt::new(Role::Bob), Role::Bob);
                    let mut p1 = ReluProtocol::new(config).expect("valid config");
                    let mut p2 = ReluProtocol::new(config).expect("valid config");
                    let now = Instant::now();
                    for _ in 0..iters {
                        tokio::try_join!(
                            p1.relu(&mut alice, &a, false),
                            p2.relu(&mut bob, &b, false),
                        )
                        .expect("relu failed");
                    }
                    now.elapsed()
                })
            });
        }
    }
    g.finish();

    let mut g = c.benchmark_group("argmax");
    for count in [16, 256] {
        g.bench_function(BenchmarkId::new("ring_32", count), |b| {
            b.to_async(&rt).iter_custom(|iters| async move {
                let (ch1, ch2) = channel_pair();
                let config = ProtocolConfig::ring(32);
                let domain = config.domain;
                let mut rng = ChaCha20Rng::seed_from_u64(42);
                let (a, b): (Vec<u64>, Vec<u64>) = (0..count)
                    .map(|_| {
                        let v = domain.encode_signed(rng.random_range(-1000..1000));
                        domain.split(v, &mut rng)
                    })
                    .unzip();
                let mut alice = Context::new(&ch1, DummyOt::new(Role::Alice), Role::Alice);
                let mut bob = Context::new(&ch2, DummyOt::new(Role::Bob), Role::Bob);
                let mut p1 = ArgMaxProtocol::new(config).expect("valid config");
                let mut p2 = ArgMaxProtocol::new(config).expect("valid config");
                let now = Instant::now();
                for _ in 0..iters {
                    tokio::try_join!(
                        p1.argmax(&mut alice, &a, true),
                        p2.argmax(&mut bob, &b, true),
                    )
                    .expect("argmax failed");
                }
                now.elapsed()
            })
        });
    }
}
