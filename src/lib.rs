//! Two-party secure comparison, sign detection, ReLU and arg-max on secret-shared values.
//!
//! Two parties, Alice and Bob, each hold an additive share of every value (modulo `2^L` or modulo
//! an odd prime `p`). The protocols of this crate compute shares of comparisons and of the
//! non-linear functions built on them without revealing either party's shares, assuming a
//! semi-honest adversary.
//!
//! ## Main Components
//!
//! All protocols share one skeleton: inputs are split into radix digits, digits are compared with
//! a 1-out-of-N oblivious transfer, and the per-digit results are folded by a tree of AND gates
//! evaluated with Beaver triples.
//!
//! * [`millionaire`]: greater-than / less-than between Alice's and Bob's inputs.
//! * [`equality`]: equality between Alice's and Bob's inputs.
//! * [`drelu`]: the sign bit of shared ring or field elements.
//! * [`relu`]: `max(x, 0)` on shared values.
//! * [`argmax`] and [`maxpool`]: maximum and arg-max of shared vectors and matrices.
//! * [`triple`]: generation of the AND triples consumed by the trees.
//! * [`ot`] and [`channel`]: the oblivious transfer and messaging abstractions the protocols run
//!   on, bundled per connection in a [`context::Context`].
//!
//! ## Example
//!
//! ```ignore
//! use cmpot::{
//!     channel::SimpleChannel,
//!     config::{ProtocolConfig, Role},
//!     context::Context,
//!     ot::ChouOrlandiOt,
//!     relu::ReluProtocol,
//! };
//!
//! # async fn example(channel: SimpleChannel, shares: Vec<u64>) -> Result<(), cmpot::Error> {
//! let role = Role::Alice;
//! let ot = ChouOrlandiOt::setup(&channel, role).await?;
//! let mut ctx = Context::new(&channel, ot, role);
//! let mut relu = ReluProtocol::new(ProtocolConfig::ring(32))?;
//! let output = relu.relu(&mut ctx, &shares, false).await?;
//! // `output.values` holds this party's shares of max(x, 0)
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod algebra;
pub mod argmax;
pub mod bits;
pub mod channel;
pub mod config;
pub mod context;
pub mod drelu;
pub mod equality;
mod error;
pub mod maxpool;
pub mod millionaire;
pub mod ot;
pub mod relu;
pub mod triple;

pub use error::Error;
