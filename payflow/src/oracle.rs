//! Ground-truth liquidity for simulations.
//!
//! The oracle network holds, for every channel direction, the liquidity that
//! actually sits on that side plus the amount reserved by outstanding
//! attempts. Probes and settlement consult the oracle; planning never does.

use std::collections::{BTreeMap, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::channel::{Channel, ChannelRef, NodeId};
use crate::error::FatalError;
use crate::graph::ChannelGraph;

/// One channel direction with its ground-truth liquidity.
///
/// For every pair of opposite directions sharing a short channel id the
/// liquidities sum to the channel capacity; settlement moves liquidity from
/// one side to the other.
#[derive(Clone, Debug)]
pub struct OracleChannel {
    channel: Channel,
    actual_liquidity_sat: u64,
    in_flight_sat: u64,
}

impl OracleChannel {
    fn new(channel: Channel, actual_liquidity_sat: u64) -> Self {
        debug_assert!(actual_liquidity_sat <= channel.capacity_sat);
        Self {
            channel,
            actual_liquidity_sat,
            in_flight_sat: 0,
        }
    }

    #[inline]
    pub fn capacity_sat(&self) -> u64 {
        self.channel.capacity_sat
    }

    #[inline]
    pub fn actual_liquidity_sat(&self) -> u64 {
        self.actual_liquidity_sat
    }

    #[inline]
    pub fn in_flight_sat(&self) -> u64 {
        self.in_flight_sat
    }

    /// Whether this direction can forward `amount_sat` on top of what is
    /// already reserved.
    pub fn can_forward(&self, amount_sat: u64) -> bool {
        self.in_flight_sat + amount_sat <= self.actual_liquidity_sat
    }

    pub(crate) fn add_in_flight(&mut self, amount_sat: u64) {
        self.in_flight_sat += amount_sat;
    }

    pub(crate) fn release_in_flight(&mut self, amount_sat: u64) {
        self.in_flight_sat = self
            .in_flight_sat
            .checked_sub(amount_sat)
            .expect("Oracle in-flight accounting went negative");
    }
}

/// The oracle side of the simulation: ground-truth liquidity per channel
/// direction, keyed identically to the belief graph.
#[derive(Clone, Debug)]
pub struct OracleNetwork {
    channels: BTreeMap<ChannelRef, OracleChannel>,
}

impl OracleNetwork {
    /// Build the oracle from the static graph.
    ///
    /// If the opposite direction was already assigned liquidity `L`, this
    /// direction receives `capacity - L` (the conservation constraint);
    /// otherwise liquidity is drawn uniformly from `[0, capacity]` using the
    /// given seed. The RNG is seeded once, so the same seed and graph always
    /// produce the same network.
    pub fn from_graph(graph: &ChannelGraph, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut channels = BTreeMap::<ChannelRef, OracleChannel>::new();
        for (chan_ref, channel) in graph.channels() {
            let liquidity = match channels.get(&chan_ref.reversed()) {
                Some(rev) => {
                    debug_assert_eq!(
                        rev.capacity_sat(),
                        channel.capacity_sat,
                        "opposite directions disagree on capacity"
                    );
                    channel
                        .capacity_sat
                        .saturating_sub(rev.actual_liquidity_sat())
                }
                None => rng.gen_range(0..=channel.capacity_sat),
            };
            channels.insert(
                chan_ref.clone(),
                OracleChannel::new(channel.clone(), liquidity),
            );
        }
        Self { channels }
    }

    pub fn get(&self, chan_ref: &ChannelRef) -> Option<&OracleChannel> {
        self.channels.get(chan_ref)
    }

    pub(crate) fn get_mut(
        &mut self,
        chan_ref: &ChannelRef,
    ) -> Option<&mut OracleChannel> {
        self.channels.get_mut(chan_ref)
    }

    /// Pin a channel's ground-truth liquidity, re-pinning the opposite
    /// direction to `capacity - amount` so conservation keeps holding.
    ///
    /// Returns false if the channel is unknown or `amount_sat` exceeds its
    /// capacity.
    pub fn set_actual_liquidity(
        &mut self,
        chan_ref: &ChannelRef,
        amount_sat: u64,
    ) -> bool {
        let Some(channel) = self.channels.get_mut(chan_ref) else {
            return false;
        };
        if amount_sat > channel.capacity_sat() {
            return false;
        }
        channel.actual_liquidity_sat = amount_sat;
        let remainder = channel.capacity_sat() - amount_sat;
        if let Some(rev) = self.channels.get_mut(&chan_ref.reversed()) {
            rev.actual_liquidity_sat = remainder;
        }
        true
    }

    /// Settle one successfully probed attempt: move `amount_sat` of
    /// liquidity across every channel of `path` and release the attempt's
    /// reservations.
    ///
    /// The whole path is validated before any mutation, so settlement is
    /// atomic per attempt. A channel that no longer holds the amount its
    /// probe promised is a fatal inconsistency.
    pub(crate) fn settle_path(
        &mut self,
        path: &[ChannelRef],
        amount_sat: u64,
    ) -> Result<(), FatalError> {
        for chan_ref in path {
            let channel = self
                .channels
                .get(chan_ref)
                .expect("Settling a channel the oracle never saw");
            if channel.actual_liquidity_sat < amount_sat {
                return Err(FatalError::OracleInconsistency {
                    channel: chan_ref.clone(),
                    amount_sat,
                    actual_sat: channel.actual_liquidity_sat,
                });
            }
        }

        for chan_ref in path {
            let channel = self.channels.get_mut(chan_ref).expect("validated");
            channel.actual_liquidity_sat -= amount_sat;
            channel.release_in_flight(amount_sat);
            match self.channels.get_mut(&chan_ref.reversed()) {
                Some(rev) => {
                    debug_assert!(
                        rev.actual_liquidity_sat + amount_sat
                            <= rev.capacity_sat()
                    );
                    rev.actual_liquidity_sat += amount_sat;
                }
                None => debug!(
                    "No return channel for {chan_ref}; liquidity not \
                     conserved on settlement"
                ),
            }
        }
        Ok(())
    }

    /// Total reserved liquidity across all channels. Zero whenever no
    /// payment is mid-flight.
    pub fn total_in_flight_sat(&self) -> u64 {
        self.channels
            .values()
            .map(OracleChannel::in_flight_sat)
            .sum()
    }

    /// The theoretical maximum amount deliverable from `source` to
    /// `destination` given the oracle's ground truth: the max-flow over
    /// per-direction liquidity, aggregated across parallel channels.
    ///
    /// Useful in experiments to know what is possible before starting the
    /// payment loop; real planning never sees this number.
    pub fn theoretical_max_payable_sat(
        &self,
        source: &NodeId,
        destination: &NodeId,
        base_fee_threshold_msat: u64,
    ) -> u64 {
        // Aggregate liquidity per ordered node pair.
        let mut capacity = BTreeMap::<(NodeId, NodeId), u64>::new();
        for (chan_ref, channel) in &self.channels {
            if channel.channel.base_fee_msat > base_fee_threshold_msat {
                continue;
            }
            if channel.actual_liquidity_sat == 0 {
                continue;
            }
            *capacity
                .entry((chan_ref.src.clone(), chan_ref.dst.clone()))
                .or_default() += channel.actual_liquidity_sat;
        }

        // Edmonds-Karp over the aggregated graph.
        let mut residual = capacity;
        let mut max_flow = 0u64;
        loop {
            // BFS for an augmenting path.
            let mut parent = BTreeMap::<NodeId, NodeId>::new();
            let mut queue = VecDeque::from([source.clone()]);
            while let Some(node) = queue.pop_front() {
                if &node == destination {
                    break;
                }
                for ((src, dst), cap) in &residual {
                    if src != &node || *cap == 0 {
                        continue;
                    }
                    if dst == source || parent.contains_key(dst) {
                        continue;
                    }
                    parent.insert(dst.clone(), node.clone());
                    queue.push_back(dst.clone());
                }
            }
            if !parent.contains_key(destination) {
                return max_flow;
            }

            // Find the bottleneck, then push flow along the path.
            let mut bottleneck = u64::MAX;
            let mut node = destination.clone();
            while &node != source {
                let prev = parent[&node].clone();
                bottleneck = bottleneck
                    .min(residual[&(prev.clone(), node.clone())]);
                node = prev;
            }
            let mut node = destination.clone();
            while &node != source {
                let prev = parent[&node].clone();
                *residual.get_mut(&(prev.clone(), node.clone())).unwrap() -=
                    bottleneck;
                *residual.entry((node.clone(), prev.clone())).or_default() +=
                    bottleneck;
                node = prev;
            }
            max_flow += bottleneck;
        }
    }
}
