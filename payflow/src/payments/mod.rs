//! Payment types and the plan-probe-settle loop.

use std::fmt::{self, Display};

use crate::channel::NodeId;
use crate::flow::solver::SolveStatus;
use crate::payments::attempt::{Attempt, AttemptStatus};

/// One candidate path + amount + lifecycle.
pub mod attempt;
/// One plan-probe-learn round.
pub(crate) mod round;
/// `PaymentSession`.
pub mod session;

/// Why a payment stopped short of full delivery. All of these are *clean*
/// terminations: nothing was settled, and every reservation was rolled back.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AbortReason {
    /// The solver found no feasible flow for the residual amount.
    NoPathFound(SolveStatus),
    /// The marginal attempt of the last round fell below the probability
    /// floor; further rounds would mostly learn, not deliver.
    ProbabilityCollapsed(f64),
    /// The round cap elapsed with some amount still undelivered.
    RoundCapExceeded,
}

impl AbortReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoPathFound(_) => "no feasible flow for the residual",
            Self::ProbabilityCollapsed(_) =>
                "attempt probability fell below the floor",
            Self::RoundCapExceeded => "round cap exceeded",
        }
    }
}

impl Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one [`PaymentSession::pay`] call.
///
/// Full delivery has `residual_sat == 0` and carries the settled fees; a
/// clean failure has the undelivered residual, zero fees and an
/// [`AbortReason`].
///
/// [`PaymentSession::pay`]: crate::payments::session::PaymentSession::pay
#[derive(Clone, Debug, PartialEq)]
pub struct PaymentSummary {
    /// Sats that could not be delivered.
    pub residual_sat: u64,
    /// Routing fees actually paid, i.e. summed over settled attempts only.
    pub settled_fee_msat: u64,
    /// Whether the full amount was delivered and settled.
    pub settled: bool,
    /// Number of plan-probe rounds driven.
    pub rounds: u32,
    /// How much the probes narrowed the network's belief, in bits.
    pub entropy_learnt_bits: f64,
    /// Present iff the payment terminated without full delivery.
    pub abort: Option<AbortReason>,
    /// Every attempt made, in planning order, each in a terminal state.
    pub attempts: Vec<Attempt>,
}

impl PaymentSummary {
    pub fn num_attempts(&self) -> usize {
        self.attempts.len()
    }

    pub fn num_failed_attempts(&self) -> usize {
        self.attempts
            .iter()
            .filter(|attempt| attempt.status() == AttemptStatus::Failed)
            .count()
    }
}

/// A payment: an amount to deliver from sender to receiver, together with
/// all attempts made across its rounds.
#[derive(Clone, Debug)]
pub struct Payment {
    sender: NodeId,
    receiver: NodeId,
    total_amount_sat: u64,
    residual_amount_sat: u64,
    attempts: Vec<Attempt>,
    round_count: u32,
    start_entropy_bits: f64,
}

impl Payment {
    pub(crate) fn new(
        sender: NodeId,
        receiver: NodeId,
        total_amount_sat: u64,
        start_entropy_bits: f64,
    ) -> Self {
        Self {
            sender,
            receiver,
            total_amount_sat,
            residual_amount_sat: total_amount_sat,
            attempts: Vec::new(),
            round_count: 0,
            start_entropy_bits,
        }
    }

    #[inline]
    pub fn sender(&self) -> &NodeId {
        &self.sender
    }

    #[inline]
    pub fn receiver(&self) -> &NodeId {
        &self.receiver
    }

    #[inline]
    pub fn total_amount_sat(&self) -> u64 {
        self.total_amount_sat
    }

    #[inline]
    pub fn residual_amount_sat(&self) -> u64 {
        self.residual_amount_sat
    }

    #[inline]
    pub fn round_count(&self) -> u32 {
        self.round_count
    }

    #[inline]
    pub fn start_entropy_bits(&self) -> f64 {
        self.start_entropy_bits
    }

    #[inline]
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub(crate) fn attempts_mut(&mut self) -> &mut [Attempt] {
        &mut self.attempts
    }

    /// Merge one round's attempts into the payment.
    pub(crate) fn absorb_round(
        &mut self,
        attempts: Vec<Attempt>,
        delivered_sat: u64,
    ) {
        self.attempts.extend(attempts);
        self.residual_amount_sat -= delivered_sat;
        self.round_count += 1;
    }

    /// All attempts currently in the given state.
    pub fn filter_attempts(
        &self,
        status: AttemptStatus,
    ) -> impl Iterator<Item = &Attempt> {
        self.attempts
            .iter()
            .filter(move |attempt| attempt.status() == status)
    }

    /// The fees accrued by this payment: the summed routing fees of all
    /// settled attempts, in msat.
    pub fn settled_fee_msat(&self) -> u64 {
        self.filter_attempts(AttemptStatus::Settled)
            .map(Attempt::fee_msat)
            .sum()
    }

    pub fn num_failed_attempts(&self) -> usize {
        self.filter_attempts(AttemptStatus::Failed).count()
    }
}

impl Display for Payment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "payment of {} sat from {} to {} with {} attempts",
            self.total_amount_sat,
            self.sender,
            self.receiver,
            self.attempts.len(),
        )
    }
}
