//! Error taxonomy for the payment loop.
//!
//! Planning dead-ends (no feasible flow, probability collapse, round cap) are
//! *clean* outcomes reported through [`PaymentSummary::abort`]; only invalid
//! input and broken internal invariants surface as errors here.
//!
//! [`PaymentSummary::abort`]: crate::payments::PaymentSummary

use crate::channel::ChannelRef;

/// A violated internal invariant. These must never occur in a correct
/// implementation; when one does, the payment aborts without rollback so the
/// inconsistent state can be inspected.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum FatalError {
    /// At settlement a channel did not hold the liquidity its successful
    /// probe promised.
    #[error(
        "oracle inconsistency: channel {channel} holds {actual_sat} sat \
         but must settle {amount_sat} sat"
    )]
    OracleInconsistency {
        channel: ChannelRef,
        amount_sat: u64,
        actual_sat: u64,
    },

    /// A knowledge update produced an empty liquidity interval, i.e. the
    /// uniform prior was violated by the observed probe outcomes.
    #[error(
        "belief inconsistency: channel {channel} learnt \
         min {min_sat} sat > max {max_sat} sat"
    )]
    BeliefInconsistency {
        channel: ChannelRef,
        min_sat: u64,
        max_sat: u64,
    },
}

/// Errors returned by [`PaymentSession::pay`].
///
/// [`PaymentSession::pay`]: crate::payments::session::PaymentSession::pay
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum PayError {
    /// The request was rejected before any state mutation.
    #[error("invalid payment input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Fatal(#[from] FatalError),
}
