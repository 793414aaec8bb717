//! Batched 1-out-of-N oblivious transfer ("OT pack").
//!
//! Protocols consume OT through the [`OtPack`] trait, which transfers one of `n` messages of up to
//! 128 bits per instance. Both parties can act as sender and as receiver on the same pack, which
//! provides the straight and the reversed 1-out-of-2 OT needed by the final ReLU step.
//!
//! Two instantiations are provided:
//!
//! * [`ChouOrlandiOt`]: the Chou-Orlandi "simplest OT", generalized to 1-out-of-N.
//! * [`DummyOt`]: a completely insecure OT for testing purposes.

mod chou_orlandi;
mod dummy;

pub use chou_orlandi::ChouOrlandiOt;
pub use dummy::DummyOt;

use curve25519_dalek::RistrettoPoint;
use thiserror::Error;

use crate::channel::{self, Channel};

/// The largest number of messages per OT instance.
pub const MAX_MESSAGES: usize = 256;

/// The largest message size in bits.
pub const MAX_MESSAGE_BITS: usize = 128;

/// Errors occurring during oblivious transfer.
#[derive(Debug, Error)]
pub enum Error {
    /// A message could not be sent or received.
    #[error("channel error: {0}")]
    Channel(#[from] channel::Error),
    /// The peer sent bytes that are not a valid group element.
    #[error("received an invalid group element")]
    InvalidPoint,
    /// A choice is not smaller than the number of messages.
    #[error("choice {choice} is out of range for 1-out-of-{n} OT")]
    InvalidChoice {
        /// The offending choice.
        choice: u8,
        /// The number of messages per instance.
        n: usize,
    },
    /// The number of messages per instance is outside of `2..=256`.
    #[error("1-out-of-{0} OT is not supported")]
    InvalidMessageCount(usize),
    /// The message size is outside of `1..=128` bits, or a message does not fit into it.
    #[error("messages of {0} bits are not supported")]
    InvalidMessageSize(usize),
    /// The message table is not a whole number of instances.
    #[error("{len} messages do not form instances of {n} messages each")]
    InvalidTableLength {
        /// The number of messages that were provided.
        len: usize,
        /// The number of messages per instance.
        n: usize,
    },
}

/// Batched 1-out-of-`n` oblivious transfer with the peer.
///
/// The sender provides `count * n` messages (instance `i` occupying `messages[i * n..(i + 1) *
/// n]`) of `bits` bits each; the receiver provides `count` choices in `0..n` and learns exactly the
/// chosen message of every instance. Calls must be made in lock-step by both parties with the same
/// `n`, `bits` and count.
#[allow(async_fn_in_trait)]
pub trait OtPack {
    /// Sends `messages.len() / n` OT instances to the peer.
    async fn send<C: Channel>(
        &mut self,
        channel: &C,
        phase: &str,
        messages: &[u128],
        n: usize,
        bits: usize,
    ) -> Result<(), Error>;

    /// Receives one message per choice from the peer.
    async fn recv<C: Channel>(
        &mut self,
        channel: &C,
        phase: &str,
        choices: &[u8],
        n: usize,
        bits: usize,
    ) -> Result<Vec<u128>, Error>;
}

pub(crate) fn hash_pt(tweak: u128, pt: &RistrettoPoint) -> u128 {
    let h = blake3::keyed_hash(pt.compress().as_bytes(), &tweak.to_le_bytes());
    let mut key = [0; 16];
    key.copy_from_slice(&h.as_bytes()[..16]);
    u128::from_le_bytes(key)
}

pub(crate) fn message_mask(bits: usize) -> u128 {
    if bits >= MAX_MESSAGE_BITS {
        u128::MAX
    } else {
        (1 << bits) - 1
    }
}

/// Checks the parameters of a send call and returns the number of instances.
pub(crate) fn check_send(messages: &[u128], n: usize, bits: usize) -> Result<usize, Error> {
    check_params(n, bits)?;
    if messages.len() % n != 0 {
        return Err(Error::InvalidTableLength {
            len: messages.len(),
            n,
        });
    }
    let mask = message_mask(bits);
    if messages.iter().any(|m| m & !mask != 0) {
        return Err(Error::InvalidMessageSize(bits));
    }
    Ok(messages.len() / n)
}

/// Checks the parameters of a receive call.
pub(crate) fn check_recv(choices: &[u8], n: usize, bits: usize) -> Result<(), Error> {
    check_params(n, bits)?;
    match choices.iter().find(|&&c| c as usize >= n) {
        Some(&choice) => Err(Error::InvalidChoice { choice, n }),
        None => Ok(()),
    }
}

fn check_params(n: usize, bits: usize) -> Result<(), Error> {
    if !(2..=MAX_MESSAGES).contains(&n) {
        return Err(Error::InvalidMessageCount(n));
    }
    if !(1..=MAX_MESSAGE_BITS).contains(&bits) {
        return Err(Error::InvalidMessageSize(bits));
    }
    Ok(())
}

/// Serializes masked messages using only as many bytes as the message size needs.
pub(crate) fn pack_messages(messages: impl Iterator<Item = u128>, bits: usize) -> Vec<u8> {
    let width = bits.div_ceil(8);
    let mut bytes = vec![];
    for m in messages {
        bytes.extend_from_slice(&m.to_le_bytes()[..width]);
    }
    bytes
}

/// Reads the message at index `i` of a buffer written by [`pack_messages`].
pub(crate) fn unpack_message(bytes: &[u8], i: usize, bits: usize) -> u128 {
    let width = bits.div_ceil(8);
    let mut buf = [0; 16];
    buf[..width].copy_from_slice(&bytes[i * width..(i + 1) * width]);
    u128::from_le_bytes(buf)
}
