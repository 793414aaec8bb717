//! The per-connection state every protocol call runs against.

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    channel::{self, Channel},
    config::Role,
    error::Error,
    ot::OtPack,
};

/// The connection to the peer: a borrowed channel, an owned OT pack and this party's role.
///
/// Protocol calls take the context by `&mut`, so two calls sharing the same OT pack can never run
/// at the same time. The OT state and the order of messages on the channel are therefore never
/// interleaved between calls.
pub struct Context<'ch, C: Channel, O: OtPack> {
    channel: &'ch C,
    ot: O,
    role: Role,
}

impl<'ch, C: Channel, O: OtPack> Context<'ch, C, O> {
    /// Creates a context for the party with the given role.
    pub fn new(channel: &'ch C, ot: O, role: Role) -> Self {
        Self { channel, ot, role }
    }

    /// The role of this party.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The channel to the peer.
    pub fn channel(&self) -> &'ch C {
        self.channel
    }

    /// Returns the OT pack, ending the connection.
    pub fn into_ot(self) -> O {
        self.ot
    }

    pub(crate) fn peer(&self) -> usize {
        self.role.peer()
    }

    pub(crate) async fn ot_send(
        &mut self,
        phase: &str,
        messages: &[u128],
        n: usize,
        bits: usize,
    ) -> Result<(), Error> {
        Ok(self.ot.send(self.channel, phase, messages, n, bits).await?)
    }

    pub(crate) async fn ot_recv(
        &mut self,
        phase: &str,
        choices: &[u8],
        n: usize,
        bits: usize,
    ) -> Result<Vec<u128>, Error> {
        Ok(self.ot.recv(self.channel, phase, choices, n, bits).await?)
    }

    pub(crate) async fn send<T: Serialize>(&self, phase: &str, msg: &[T]) -> Result<(), Error> {
        Ok(channel::send_to(self.channel, self.peer(), phase, msg).await?)
    }

    pub(crate) async fn recv<T: DeserializeOwned>(
        &self,
        phase: &str,
        len: usize,
    ) -> Result<Vec<T>, Error> {
        Ok(channel::recv_vec_from(self.channel, self.peer(), phase, len).await?)
    }

    /// Sends `msg` and receives the peer's message of `len` elements concurrently.
    pub(crate) async fn exchange<T: Serialize + DeserializeOwned>(
        &self,
        phase: &str,
        msg: &[T],
        len: usize,
    ) -> Result<Vec<T>, Error> {
        Ok(channel::exchange(self.channel, self.peer(), phase, msg, len).await?)
    }
}
