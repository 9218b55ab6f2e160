//! The payment session: the outer retry loop around plan-probe rounds.

use tracing::{info, warn};

use crate::channel::NodeId;
use crate::constants::{
    DEFAULT_BASE_FEE_THRESHOLD_MSAT, DEFAULT_MAX_ROUNDS,
    DEFAULT_MIN_PROBABILITY_FLOOR, DEFAULT_MU, DEFAULT_N_PIECES,
};
use crate::error::PayError;
use crate::graph::ChannelGraph;
use crate::oracle::OracleNetwork;
use crate::payments::attempt::AttemptStatus;
use crate::payments::round::{self, RoundError};
use crate::payments::{AbortReason, Payment, PaymentSummary};
use crate::uncertainty::UncertaintyNetwork;

/// Knobs for the planning loop. The defaults deliver reliably on
/// mainnet-scale graphs; simulations over small synthetic graphs usually
/// want `prune_network: false`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Weight of routing fees relative to uncertainty cost; zero plans
    /// purely for reliability.
    pub mu: u64,
    /// Channels charging a higher base fee are excluded from planning.
    pub base_fee_threshold_msat: u64,
    /// Drop channels unlikely to forward a sizeable amount before solving.
    pub prune_network: bool,
    /// Granularity of the piecewise cost linearization.
    pub n_pieces: u64,
    /// Cap on plan-probe rounds per payment.
    pub max_rounds: u32,
    /// Abort once the marginal attempt's probability falls below this.
    pub min_probability_floor: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mu: DEFAULT_MU,
            base_fee_threshold_msat: DEFAULT_BASE_FEE_THRESHOLD_MSAT,
            prune_network: true,
            n_pieces: DEFAULT_N_PIECES,
            max_rounds: DEFAULT_MAX_ROUNDS,
            min_probability_floor: DEFAULT_MIN_PROBABILITY_FLOOR,
        }
    }
}

/// Drives payments against a simulated oracle: repeatedly plan a multi-path
/// split over the belief graph, probe it, learn, and retry the residual;
/// settle atomically once everything is inflight.
///
/// The session owns both graphs. They share channel keys but no state; all
/// mutation happens here, in strict plan -> probe -> learn -> settle order,
/// so a run is fully determined by the graph, the oracle seed and the
/// payment parameters.
pub struct PaymentSession {
    oracle: OracleNetwork,
    beliefs: UncertaintyNetwork,
    config: SessionConfig,
}

impl PaymentSession {
    pub fn new(oracle: OracleNetwork, beliefs: UncertaintyNetwork) -> Self {
        Self::with_config(oracle, beliefs, SessionConfig::default())
    }

    pub fn with_config(
        oracle: OracleNetwork,
        beliefs: UncertaintyNetwork,
        config: SessionConfig,
    ) -> Self {
        Self {
            oracle,
            beliefs,
            config,
        }
    }

    /// Build a session directly from a channel graph, drawing oracle
    /// liquidity with the given seed.
    pub fn from_graph(graph: &ChannelGraph, oracle_seed: u64) -> Self {
        Self::new(
            OracleNetwork::from_graph(graph, oracle_seed),
            UncertaintyNetwork::from_graph(graph),
        )
    }

    #[inline]
    pub fn oracle(&self) -> &OracleNetwork {
        &self.oracle
    }

    #[inline]
    pub fn oracle_mut(&mut self) -> &mut OracleNetwork {
        &mut self.oracle
    }

    #[inline]
    pub fn beliefs(&self) -> &UncertaintyNetwork {
        &self.beliefs
    }

    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Forget everything learnt about channel liquidity. Payments never
    /// reset the belief implicitly; whether knowledge carries over between
    /// payments is the driver's call.
    pub fn forget_information(&mut self) {
        self.beliefs.reset();
    }

    /// Deliver `amount_sat` from `sender` to `receiver`.
    ///
    /// Returns `Ok` both on full delivery and on clean failure (see
    /// [`PaymentSummary`]); `Err` only for rejected input or a violated
    /// internal invariant.
    pub fn pay(
        &mut self,
        sender: &NodeId,
        receiver: &NodeId,
        amount_sat: u64,
    ) -> Result<PaymentSummary, PayError> {
        if amount_sat == 0 {
            // Nothing to deliver; avoid all side effects.
            return Ok(PaymentSummary {
                residual_sat: 0,
                settled_fee_msat: 0,
                settled: true,
                rounds: 0,
                entropy_learnt_bits: 0.0,
                abort: None,
                attempts: Vec::new(),
            });
        }
        if sender == receiver {
            return Err(PayError::InvalidInput(format!(
                "sender and receiver are both {sender}"
            )));
        }
        for node in [sender, receiver] {
            if !self.beliefs.contains_node(node) {
                return Err(PayError::InvalidInput(format!(
                    "unknown node {node}"
                )));
            }
        }

        let start_entropy_bits = self.beliefs.entropy_bits();
        let mut payment = Payment::new(
            sender.clone(),
            receiver.clone(),
            amount_sat,
            start_entropy_bits,
        );
        let mut last_probability = 1.0f64;
        let mut abort = None;

        while payment.residual_amount_sat() > 0 {
            if payment.round_count() >= self.config.max_rounds {
                abort = Some(AbortReason::RoundCapExceeded);
                break;
            }
            if last_probability < self.config.min_probability_floor {
                abort =
                    Some(AbortReason::ProbabilityCollapsed(last_probability));
                break;
            }

            info!(
                round = payment.round_count() + 1,
                residual_sat = payment.residual_amount_sat(),
                "planning round"
            );
            let outcome = round::execute(
                &mut self.beliefs,
                &mut self.oracle,
                sender,
                receiver,
                payment.residual_amount_sat(),
                &self.config,
            );
            match outcome {
                Ok(outcome) => {
                    last_probability = outcome.last_probability;
                    payment.absorb_round(
                        outcome.attempts,
                        outcome.delivered_sat,
                    );
                }
                Err(RoundError::NoPathFound(status)) => {
                    abort = Some(AbortReason::NoPathFound(status));
                    break;
                }
                Err(RoundError::Fatal(fatal)) => return Err(fatal.into()),
            }
        }

        let settled = payment.residual_amount_sat() == 0;
        if settled {
            self.settle(&mut payment)?;
        } else {
            let abort = abort.expect("failed payments carry a reason");
            warn!(
                residual_sat = payment.residual_amount_sat(),
                %abort,
                "payment failed cleanly, rolling back"
            );
            self.rollback(&mut payment);
        }

        let entropy_learnt_bits =
            start_entropy_bits - self.beliefs.entropy_bits();
        let summary = PaymentSummary {
            residual_sat: payment.residual_amount_sat(),
            settled_fee_msat: payment.settled_fee_msat(),
            settled,
            rounds: payment.round_count(),
            entropy_learnt_bits,
            abort,
            attempts: payment.attempts().to_vec(),
        };
        info!(
            settled,
            residual_sat = summary.residual_sat,
            fee_msat = summary.settled_fee_msat,
            rounds = summary.rounds,
            num_attempts = summary.num_attempts(),
            num_failed = summary.num_failed_attempts(),
            entropy_learnt_bits = summary.entropy_learnt_bits,
            "payment finished"
        );
        Ok(summary)
    }

    /// Atomically settle every inflight attempt: move the oracle liquidity,
    /// shift the belief intervals, release all reservations.
    fn settle(&mut self, payment: &mut Payment) -> Result<(), PayError> {
        for attempt in payment.attempts_mut() {
            if attempt.status() != AttemptStatus::Inflight {
                continue;
            }
            self.oracle
                .settle_path(attempt.path(), attempt.amount_sat())?;
            self.beliefs.settle_path(attempt.path(), attempt.amount_sat());
            attempt.mark_settled();
        }
        debug_assert_eq!(self.oracle.total_in_flight_sat(), 0);
        debug_assert_eq!(self.beliefs.total_in_flight_sat(), 0);
        Ok(())
    }

    /// Fail every inflight attempt and release its reservations on both
    /// graphs. Runs on every non-fatal failure path.
    fn rollback(&mut self, payment: &mut Payment) {
        for attempt in payment.attempts_mut() {
            if attempt.status() != AttemptStatus::Inflight {
                continue;
            }
            for chan_ref in attempt.path() {
                self.oracle
                    .get_mut(chan_ref)
                    .expect("probed channels exist")
                    .release_in_flight(attempt.amount_sat());
            }
            self.beliefs.release_path(attempt.path(), attempt.amount_sat());
            attempt.mark_failed();
        }
        debug_assert_eq!(self.oracle.total_in_flight_sat(), 0);
        debug_assert_eq!(self.beliefs.total_in_flight_sat(), 0);
    }
}
