//! Multi-path payments over a channel network with uncertain liquidity.
//!
//! Given a gossip snapshot of the channel graph, this crate plans and
//! executes payments by:
//!
//! 1. maintaining a per-channel liquidity posterior (the
//!    [`UncertaintyNetwork`]),
//! 2. linearizing each channel's `-log p` reliability cost into integer
//!    pieces and solving a min-cost-flow problem that trades fees against
//!    uncertainty (weighted by `mu`),
//! 3. dissecting the optimal flow into candidate paths, probing each one
//!    against a ground-truth [`OracleNetwork`], and feeding every outcome
//!    back into the posterior,
//! 4. retrying the residual amount until it is fully inflight, then
//!    settling atomically.
//!
//! The core is single-threaded and deterministic: the same graph, oracle
//! seed and payment parameters always produce the same attempt sequence.
//!
//! ```no_run
//! use payflow::{ChannelGraph, NodeId, PaymentSession};
//!
//! # fn main() -> anyhow::Result<()> {
//! let json = std::fs::read_to_string("listchannels.json")?;
//! let graph = ChannelGraph::from_cln_json(&json)?;
//! let mut session = PaymentSession::from_graph(&graph, 815);
//!
//! let sender = NodeId::from("02aaaa...");
//! let receiver = NodeId::from("03bbbb...");
//! let summary = session.pay(&sender, &receiver, 10_000_000)?;
//! println!("residual: {} sat", summary.residual_sat);
//! # Ok(())
//! # }
//! ```

/// Channel identifiers and static metadata.
pub mod channel;
/// Tuning constants.
pub mod constants;
/// Error taxonomy.
pub mod error;
/// Min-cost-flow encoding, solving and dissection.
pub mod flow;
/// Gossip snapshot ingestion.
pub mod gossip;
/// The static channel graph.
pub mod graph;
/// Ground-truth liquidity for simulations.
pub mod oracle;
/// Payment types and the plan-probe-settle loop.
pub mod payments;
/// The liquidity belief model.
pub mod uncertainty;

#[cfg(test)]
pub(crate) mod test_utils;

pub use crate::channel::{Channel, ChannelRef, NodeId, ShortChannelId};
pub use crate::error::{FatalError, PayError};
pub use crate::flow::solver::{McfSolver, SolveStatus};
pub use crate::graph::ChannelGraph;
pub use crate::oracle::{OracleChannel, OracleNetwork};
pub use crate::payments::attempt::{Attempt, AttemptStatus};
pub use crate::payments::session::{PaymentSession, SessionConfig};
pub use crate::payments::{AbortReason, Payment, PaymentSummary};
pub use crate::uncertainty::{UncertaintyChannel, UncertaintyNetwork};
