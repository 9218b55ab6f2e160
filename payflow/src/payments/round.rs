//! One plan-probe-learn round.
//!
//! A round solves the min-cost-flow problem for the residual amount,
//! dissects the flow into planned attempts, then probes each attempt
//! against the oracle in order, feeding every outcome back into the belief
//! graph.

use tracing::{debug, info};

use crate::channel::NodeId;
use crate::error::FatalError;
use crate::flow;
use crate::flow::solver::SolveStatus;
use crate::oracle::OracleNetwork;
use crate::payments::attempt::{Attempt, AttemptStatus};
use crate::payments::session::SessionConfig;
use crate::uncertainty::UncertaintyNetwork;

/// Why a round could not run to completion.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub(crate) enum RoundError {
    #[error("min-cost-flow solver returned {0:?}")]
    NoPathFound(SolveStatus),
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

/// The attempts of one completed round.
pub(crate) struct RoundOutcome {
    pub attempts: Vec<Attempt>,
    /// Summed amount of the attempts that went inflight.
    pub delivered_sat: u64,
    /// The planning-time probability of the round's last-emitted attempt:
    /// the marginal path the dissection produced.
    pub last_probability: f64,
}

/// Plan and probe one round for `amount_sat`.
pub(crate) fn execute(
    beliefs: &mut UncertaintyNetwork,
    oracle: &mut OracleNetwork,
    sender: &NodeId,
    receiver: &NodeId,
    amount_sat: u64,
    config: &SessionConfig,
) -> Result<RoundOutcome, RoundError> {
    // Plan: solve and dissect, then turn candidates into planned attempts.
    // Planning an attempt reserves its amount, so candidate probabilities
    // are conditional on the candidates planned before them.
    let candidates =
        flow::plan_candidate_paths(beliefs, sender, receiver, amount_sat, config)
            .map_err(RoundError::NoPathFound)?;
    let mut attempts = candidates
        .into_iter()
        .map(|candidate| {
            Attempt::plan(beliefs, candidate.path, candidate.amount_sat)
        })
        .collect::<Vec<_>>();
    let last_probability =
        attempts.last().map(Attempt::probability).unwrap_or(1.0);

    // Probe each attempt in order.
    let mut delivered_sat = 0u64;
    for attempt in &mut attempts {
        let amount = attempt.amount_sat();

        // Walk the oracle path up to the first channel that cannot carry
        // the amount on top of its reservations.
        let erring = attempt.path().iter().position(|chan_ref| {
            let channel = oracle
                .get(chan_ref)
                .expect("oracle and belief graphs share channels");
            !channel.can_forward(amount)
        });

        match erring {
            None => {
                for chan_ref in attempt.path() {
                    oracle
                        .get_mut(chan_ref)
                        .expect("walked above")
                        .add_in_flight(amount);
                }
                attempt.mark_inflight();
                for chan_ref in attempt.path() {
                    beliefs.update_knowledge(chan_ref, amount, true)?;
                }
                delivered_sat += amount;
                debug!(%attempt, "probe succeeded");
            }
            Some(erring) => {
                // Failing leaves `Planned` without reaching `Inflight`, so
                // every reservation is released; the ordering matters. A
                // prefix channel did forward the amount, so it learns with
                // its reservation still in place (`in_flight` is what the
                // oracle was asked to hold) and is released right after.
                // The erring channel never held the amount: its
                // reservation is released before the failure update.
                attempt.mark_failed();
                for chan_ref in &attempt.path()[..erring] {
                    beliefs.update_knowledge(chan_ref, amount, true)?;
                    beliefs
                        .get_mut(chan_ref)
                        .expect("planned path uses known channels")
                        .release_in_flight(amount);
                }
                let erring_ref = &attempt.path()[erring];
                beliefs
                    .get_mut(erring_ref)
                    .expect("planned path uses known channels")
                    .release_in_flight(amount);
                beliefs.update_knowledge(erring_ref, amount, false)?;
                beliefs
                    .release_path(&attempt.path()[erring + 1..], amount);
                debug!(%attempt, %erring_ref, "probe failed");
            }
        }
    }

    log_round_stats(&attempts, amount_sat, delivered_sat);

    Ok(RoundOutcome {
        attempts,
        delivered_sat,
        last_probability,
    })
}

/// The per-round statistics: attempts tried, sats expected vs delivered.
fn log_round_stats(attempts: &[Attempt], tried_sat: u64, delivered_sat: u64) {
    let expected_sat = attempts
        .iter()
        .map(|attempt| attempt.probability() * attempt.amount_sat() as f64)
        .sum::<f64>();
    let failed_paths = attempts
        .iter()
        .filter(|attempt| attempt.status() == AttemptStatus::Failed)
        .count();
    for attempt in attempts {
        debug!("  {attempt}");
    }
    info!(
        num_attempts = attempts.len(),
        failed_paths,
        tried_sat,
        expected_sat = expected_sat as u64,
        delivered_sat,
        "round complete"
    );
}
