//! Implementation of an **entirely insecure** oblivious transfer protocol for testing purposes.
//!
//! The sender transmits every message in the clear and the receiver picks the ones it chose.

use crate::{
    channel::{Channel, recv_vec_from, send_to},
    config::Role,
    ot::{Error, OtPack, check_recv, check_send, pack_messages, unpack_message},
};

/// Oblivious transfer that reveals all messages to the receiver.
#[derive(Debug, Clone)]
pub struct DummyOt {
    peer: usize,
}

impl DummyOt {
    /// Creates the (stateless) OT for the party with the given role.
    pub fn new(role: Role) -> Self {
        Self { peer: role.peer() }
    }
}

impl OtPack for DummyOt {
    async fn send<C: Channel>(
        &mut self,
        channel: &C,
        phase: &str,
        messages: &[u128],
        n: usize,
        bits: usize,
    ) -> Result<(), Error> {
        check_send(messages, n, bits)?;
        let bytes = pack_messages(messages.iter().copied(), bits);
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
        let len = choices.len() * n * bits.div_ceil(8);
        let bytes: Vec<u8> = recv_vec_from(channel, self.peer, phase, len).await?;
        Ok(choices
            .iter()
            .enumerate()
            .map(|(i, &c)| unpack_message(&bytes, i * n + c as usize, bits))
            .collect())
    }
}
