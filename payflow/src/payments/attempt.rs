//! One candidate path and its lifecycle.

use std::fmt::{self, Display};

#[cfg(test)]
use proptest_derive::Arbitrary;
use serde::{Deserialize, Serialize};

use crate::channel::ChannelRef;
use crate::uncertainty::UncertaintyNetwork;

/// Lifecycle of an [`Attempt`].
///
/// ```text
/// Planned -- probe ok --> Inflight -- settle --> Settled
/// Planned -- probe fails ------------------------> Failed
/// Inflight -- abort/rollback --------------------> Failed
/// ```
///
/// `Arrived` sits between `Inflight` and `Settled` for drivers that treat
/// reaching the receiver and releasing the HTLCs as separate steps; the
/// simulated oracle settles in one step. Whenever an attempt leaves
/// `Planned` without reaching `Inflight`, its path reservations on the
/// belief graph are released.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[cfg_attr(test, derive(Arbitrary, strum::VariantArray))]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Produced by flow dissection; reservations placed, not yet probed.
    Planned,
    /// The probe succeeded; the amount is reserved on the oracle too.
    Inflight,
    /// The onion reached the receiver but has not settled yet.
    Arrived,
    /// The probe failed, or the payment was rolled back.
    Failed,
    /// The liquidity moved; fees were paid.
    Settled,
}

impl AttemptStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Settled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Inflight => "inflight",
            Self::Arrived => "arrived",
            Self::Failed => "failed",
            Self::Settled => "settled",
        }
    }
}

impl Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One planned path with its amount, memoized fee and success probability,
/// and lifecycle state.
#[derive(Clone, Debug, PartialEq)]
pub struct Attempt {
    path: Vec<ChannelRef>,
    amount_sat: u64,
    fee_msat: u64,
    probability: f64,
    status: AttemptStatus,
}

impl Attempt {
    /// Plan an attempt: memoize the path's fee and success probability
    /// against the current belief, then reserve the amount on every channel
    /// of the path.
    ///
    /// Reserving at construction means later attempts planned in the same
    /// round see this one's reservation, i.e. their probabilities are
    /// conditional on it.
    pub(crate) fn plan(
        network: &mut UncertaintyNetwork,
        path: Vec<ChannelRef>,
        amount_sat: u64,
    ) -> Self {
        debug_assert!(amount_sat > 0, "attempts carry a positive amount");
        debug_assert!(
            path.windows(2).all(|hop| hop[0].dst == hop[1].src),
            "attempt paths are contiguous"
        );

        let mut fee_msat = 0u64;
        let mut probability = 1.0f64;
        for chan_ref in &path {
            let channel = network
                .get(chan_ref)
                .expect("planned path uses known channels");
            fee_msat += channel.routing_cost_msat(amount_sat);
            probability *= channel.success_probability(amount_sat);
        }
        network.allocate_path(&path, amount_sat);

        Self {
            path,
            amount_sat,
            fee_msat,
            probability,
            status: AttemptStatus::Planned,
        }
    }

    // --- Accessors --- //

    #[inline]
    pub fn path(&self) -> &[ChannelRef] {
        &self.path
    }

    #[inline]
    pub fn amount_sat(&self) -> u64 {
        self.amount_sat
    }

    /// The routing fee in msat this path charges for the attempt amount,
    /// estimated at planning time.
    #[inline]
    pub fn fee_msat(&self) -> u64 {
        self.fee_msat
    }

    /// The estimated success probability at planning time.
    #[inline]
    pub fn probability(&self) -> f64 {
        self.probability
    }

    #[inline]
    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    pub fn hops(&self) -> usize {
        self.path.len()
    }

    // --- Transitions --- //
    // In-flight bookkeeping accompanying these transitions lives with the
    // round driver and session, which own both graphs.

    pub(crate) fn mark_inflight(&mut self) {
        debug_assert_eq!(self.status, AttemptStatus::Planned);
        self.status = AttemptStatus::Inflight;
    }

    pub(crate) fn mark_failed(&mut self) {
        debug_assert!(!self.status.is_terminal());
        self.status = AttemptStatus::Failed;
    }

    pub(crate) fn mark_settled(&mut self) {
        debug_assert!(matches!(
            self.status,
            AttemptStatus::Inflight | AttemptStatus::Arrived
        ));
        self.status = AttemptStatus::Settled;
    }
}

impl Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempt of {} sat over {} hops ({}), p = {:.2}%, fee {} msat",
            self.amount_sat,
            self.hops(),
            self.status,
            self.probability * 100.0,
            self.fee_msat,
        )
    }
}
