//! Implementation of the Chou-Orlandi oblivious transfer protocol (cf.
//! <https://eprint.iacr.org/2015/267>), generalized to 1-out-of-N.
//!
//! This implementation uses the Ristretto prime order elliptic curve group from the
//! `curve25519-dalek` library. The sender publishes `S = y·G` once; for every instance the
//! receiver with choice `c` sends `R = c·S + x·G` and derives its key from `x·S`, while the sender
//! derives the key of message `j` from `y·R - j·y·S`. Only the key of the chosen message matches.
//!
//! If the value produced by the receiver is not randomized, all the random OTs produced by the
//! protocol will be the same. Like the two-message variant of the paper we therefore hash a
//! running instance counter into every key.

use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_TABLE,
    ristretto::{CompressedRistretto, RistrettoBasepointTable, RistrettoPoint},
    scalar::Scalar,
};
use rand::{Rng, SeedableRng, random};
use rand_chacha::ChaCha20Rng;
use tracing::{Level, instrument};

use crate::{
    channel::{Channel, exchange, recv_vec_from, send_to},
    config::Role,
    ot::{
        Error, OtPack, check_recv, check_send, hash_pt, message_mask, pack_messages,
        unpack_message,
    },
};

/// The sending half: our secret `y` and the precomputed `T = y·S`.
struct Sender {
    y: Scalar,
    t: RistrettoPoint,
    counter: u128,
}

/// The receiving half: the peer's `S`, as a table for fast scalar multiplication.
///
/// The table is about 30 KB, so it lives on the heap to keep the pack (and every future holding
/// it) small.
struct Receiver {
    s: Box<RistrettoBasepointTable>,
    counter: u128,
}

/// Semi-honest 1-out-of-N oblivious transfer based on the Chou-Orlandi protocol.
///
/// A single pack serves both directions: [`ChouOrlandiOt::setup`] runs the base setup as sender
/// and as receiver concurrently.
pub struct ChouOrlandiOt {
    peer: usize,
    sender: Sender,
    receiver: Receiver,
    rng: ChaCha20Rng,
}

impl ChouOrlandiOt {
    /// Exchanges the public keys of both directions with the peer.
    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub async fn setup(channel: &impl Channel, role: Role) -> Result<Self, Error> {
        let mut rng = ChaCha20Rng::from_seed(random());
        let y = random_scalar(&mut rng);
        let s = &y * RISTRETTO_BASEPOINT_TABLE;
        let s_bytes = s.compress().to_bytes();
        let peer = role.peer();
        let peer_s: Vec<u8> = exchange(channel, peer, "co_ot_setup", &s_bytes[..], 32).await?;
        let peer_s = convert_vec_to_point(peer_s)?;
        Ok(Self {
            peer,
            sender: Sender {
                y,
                t: y * s,
                counter: 0,
            },
            receiver: Receiver {
                s: Box::new(RistrettoBasepointTable::create(&peer_s)),
                counter: 0,
            },
            rng,
        })
    }
}

impl OtPack for ChouOrlandiOt {
    async fn send<C: Channel>(
        &mut self,
        channel: &C,
        phase: &str,
        messages: &[u128],
        n: usize,
        bits: usize,
    ) -> Result<(), Error> {
        let count = check_send(messages, n, bits)?;
        let mask = message_mask(bits);
        let r_bytes_vec: Vec<[u8; 32]> = recv_vec_from(channel, self.peer, phase, count).await?;
        let Sender { y, t, counter } = &mut self.sender;
        let mut ciphertexts = Vec::with_capacity(messages.len());
        for (i, (r_bytes, instance)) in r_bytes_vec.iter().zip(messages.chunks(n)).enumerate() {
            let r = convert_vec_to_point(r_bytes.to_vec())?;
            let mut k = *y * r;
            for m in instance {
                ciphertexts.push(m ^ (hash_pt(*counter + i as u128, &k) & mask));
                k -= *t;
            }
        }
        *counter += count as u128;
        let bytes = pack_messages(ciphertexts.into_iter(), bits);
        send_to(channel, self.peer, phase, &bytes).await?;
        Ok(())
    }

    async fn recv<C: Channel>(
        &mut self,
        channel: &C,
        phase: &str,
        choices: &[u8],
        n: usize,
        bits: usize,
    ) -> Result<Vec<u128>, Error> {
        check_recv(choices, n, bits)?;
        let mask = message_mask(bits);
        let Receiver { s, counter } = &mut self.receiver;
        let mut ks = Vec::with_capacity(choices.len());
        let mut r_bytes_vec = Vec::with_capacity(choices.len());
        for (i, &c) in choices.iter().enumerate() {
            let x = random_scalar(&mut self.rng);
            let r = &Scalar::from(c) * &**s + &x * RISTRETTO_BASEPOINT_TABLE;
            r_bytes_vec.push(r.compress().to_bytes());
            ks.push(hash_pt(*counter + i as u128, &(&x * &**s)));
        }
        *counter += choices.len() as u128;
        send_to(channel, self.peer, phase, &r_bytes_vec).await?;

        let len = choices.len() * n * bits.div_ceil(8);
        let bytes: Vec<u8> = recv_vec_from(channel, self.peer, phase, len).await?;
        Ok(choices
            .iter()
            .zip(ks)
            .enumerate()
            .map(|(i, (&c, k))| unpack_message(&bytes, i * n + c as usize, bits) ^ (k & mask))
            .collect())
    }
}

fn random_scalar(rng: &mut impl Rng) -> Scalar {
    Scalar::from_bytes_mod_order_wide(&rng.random())
}

fn convert_vec_to_point(data: Vec<u8>) -> Result<RistrettoPoint, Error> {
    let compressed_pt = CompressedRistretto::from_slice(&data).map_err(|_| Error::InvalidPoint)?;
    compressed_pt.decompress().ok_or(Error::InvalidPoint)
}
