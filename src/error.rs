//! The error returned by every protocol entry point.

use thiserror::Error;

use crate::{channel, config::ConfigError, ot};

/// Errors occurring while running a comparison, ReLU or arg-max protocol.
///
/// A failed call leaves no partial result behind. Both parties have to re-issue the whole
/// operation, since the peer is assumed to have aborted at the same point.
#[derive(Debug, Error)]
pub enum Error {
    /// A message could not be sent or received.
    #[error("channel error: {0}")]
    Channel(#[from] channel::Error),
    /// The oblivious transfer failed.
    #[error("oblivious transfer failed: {0}")]
    Ot(#[from] ot::Error),
    /// A precondition was violated before any message was exchanged.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The operation needs at least one element.
    #[error("the input is empty")]
    EmptyInput,
    /// Two inputs that must have the same length do not.
    #[error("expected {expected} elements, got {actual}")]
    InvalidInputLength {
        /// The expected number of elements.
        expected: usize,
        /// The number of elements that were provided.
        actual: usize,
    },
}
