//! The liquidity belief model.
//!
//! For every channel direction we maintain a posterior over its liquidity as
//! the interval `[min_liquidity, max_liquidity]`, together with the amount
//! currently reserved by outstanding attempts (`in_flight`). Probe outcomes
//! narrow the interval; the conservation constraint
//! `liquidity(A->B) + liquidity(B->A) = capacity` lets every observation also
//! teach us about the opposite direction.
//!
//! The belief drives planning twice over:
//!
//! + `success_probability` scores candidate paths under a uniform prior, and
//! + `piecewise_linearized_costs` turns the convex `-log p` cost of a channel
//!   into integer `(capacity, unit_cost)` pieces an integer min-cost-flow
//!   solver can optimize directly.

use std::cmp::{max, min};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};

use tracing::debug;

use crate::channel::{Channel, ChannelRef, NodeId};
use crate::constants::MAX_CHANNEL_SIZE_SAT;
use crate::error::FatalError;
use crate::graph::ChannelGraph;

/// One `(capacity, unit_cost)` piece of a linearized channel cost.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CostPiece {
    pub capacity_sat: u64,
    pub unit_cost: u64,
}

/// A channel direction together with our belief about its liquidity.
#[derive(Clone, Debug)]
pub struct UncertaintyChannel {
    channel: Channel,
    min_liquidity_sat: u64,
    max_liquidity_sat: u64,
    in_flight_sat: u64,
}

impl UncertaintyChannel {
    pub fn new(channel: Channel) -> Self {
        let max_liquidity_sat = channel.capacity_sat;
        Self {
            channel,
            min_liquidity_sat: 0,
            max_liquidity_sat,
            in_flight_sat: 0,
        }
    }

    // --- Accessors --- //

    #[inline]
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn reference(&self) -> ChannelRef {
        self.channel.reference()
    }

    #[inline]
    pub fn capacity_sat(&self) -> u64 {
        self.channel.capacity_sat
    }

    #[inline]
    pub fn base_fee_msat(&self) -> u64 {
        self.channel.base_fee_msat
    }

    #[inline]
    pub fn fee_ppm(&self) -> u64 {
        self.channel.fee_ppm
    }

    #[inline]
    pub fn min_liquidity_sat(&self) -> u64 {
        self.min_liquidity_sat
    }

    #[inline]
    pub fn max_liquidity_sat(&self) -> u64 {
        self.max_liquidity_sat
    }

    #[inline]
    pub fn in_flight_sat(&self) -> u64 {
        self.in_flight_sat
    }

    /// The width of the uncertainty interval once belief and reservations
    /// are accounted for: `max(max_liquidity - max(min_liquidity, in_flight), 0)`.
    pub fn conditional_capacity_sat(&self) -> u64 {
        self.max_liquidity_sat
            .saturating_sub(max(self.min_liquidity_sat, self.in_flight_sat))
    }

    // --- Belief-derived quantities --- //

    /// The uncertainty we still have about this channel, in bits.
    pub fn entropy_bits(&self) -> f64 {
        ((self.conditional_capacity_sat() + 1) as f64).log2()
    }

    /// The probability that this channel can forward `amount_sat` on top of
    /// its outstanding reservations, under a uniform liquidity prior
    /// conditioned on the current belief interval.
    ///
    /// Note that with a nonzero `in_flight` even `amount_sat == 0` may have
    /// probability below one: the reservations themselves are unconfirmed.
    pub fn success_probability(&self, amount_sat: u64) -> f64 {
        let tested = amount_sat + self.in_flight_sat;
        if tested <= self.min_liquidity_sat {
            return 1.0;
        }
        if tested >= self.max_liquidity_sat {
            return 0.0;
        }
        let conditional =
            self.max_liquidity_sat - self.min_liquidity_sat + 1;
        let conditional_amount = tested - self.min_liquidity_sat;
        (conditional - conditional_amount) as f64 / conditional as f64
    }

    /// The fee a routing node earns for forwarding `amount_sat`, in msat.
    pub fn routing_cost_msat(&self, amount_sat: u64) -> u64 {
        let proportional = (u128::from(self.channel.fee_ppm)
            * u128::from(amount_sat))
            / 1000;
        proportional as u64 + self.channel.base_fee_msat
    }

    /// The fee rate is natively an integer unit cost for the solver.
    #[inline]
    pub fn linearized_routing_unit_cost(&self) -> u64 {
        self.channel.fee_ppm
    }

    /// Integer unit cost of uncertainty: scales inversely with the remaining
    /// conditional capacity, so saturating near-certain channels is cheap and
    /// exploring doubtful ones is expensive. [`MAX_CHANNEL_SIZE_SAT`] bounds
    /// the largest plausible channel so unit costs stay in solver range.
    pub fn linearized_uncertainty_unit_cost(&self) -> u64 {
        MAX_CHANNEL_SIZE_SAT / max(self.conditional_capacity_sat(), 1)
    }

    /// The weighted sum of the two unit costs; `mu` tunes how heavily
    /// routing fees weigh against reliability.
    pub fn combined_unit_cost(&self, mu: u64) -> u64 {
        self.linearized_uncertainty_unit_cost()
            .saturating_add(mu.saturating_mul(self.channel.fee_ppm))
    }

    /// The monotone step approximation of this channel's `-log p` cost, as
    /// `(capacity, unit_cost)` pieces with non-decreasing unit costs:
    ///
    /// 1. Liquidity we know to be present (`min_liquidity - in_flight`)
    ///    costs nothing but fees.
    /// 2. The conditional capacity splits into `n_pieces` integer pieces of
    ///    linearly increasing uncertainty cost. The split is exact: the
    ///    first `conditional % n_pieces` pieces are one sat larger, so the
    ///    piece capacities sum to the conditional capacity.
    pub fn piecewise_linearized_costs(
        &self,
        n_pieces: u64,
        mu: u64,
    ) -> Vec<CostPiece> {
        let mut pieces = Vec::new();
        let fee_cost = mu.saturating_mul(self.channel.fee_ppm);

        // Using certainly available liquidity costs us nothing but fees.
        let known_good =
            self.min_liquidity_sat.saturating_sub(self.in_flight_sat);
        if known_good > 0 {
            pieces.push(CostPiece {
                capacity_sat: known_good,
                unit_cost: fee_cost,
            });
        }

        let conditional = self.conditional_capacity_sat();
        if conditional == 0 || n_pieces == 0 {
            return pieces;
        }
        let uncertainty_cost = self.linearized_uncertainty_unit_cost();
        let base_capacity = conditional / n_pieces;
        let remainder = conditional % n_pieces;
        for i in 1..=n_pieces {
            let capacity_sat =
                base_capacity + u64::from(i <= remainder);
            if capacity_sat == 0 {
                continue;
            }
            pieces.push(CostPiece {
                capacity_sat,
                unit_cost: i
                    .saturating_mul(uncertainty_cost)
                    .saturating_add(fee_cost),
            });
        }
        pieces
    }

    // --- Mutators --- //

    /// Reserve `amount_sat` for an outstanding attempt.
    pub fn allocate_in_flight(&mut self, amount_sat: u64) {
        self.in_flight_sat += amount_sat;
    }

    /// Release a reservation previously made with [`Self::allocate_in_flight`].
    pub fn release_in_flight(&mut self, amount_sat: u64) {
        self.in_flight_sat = self
            .in_flight_sat
            .checked_sub(amount_sat)
            .expect("Belief in-flight accounting went negative");
    }

    /// Reset the belief to the full `[0, capacity]` interval with nothing
    /// reserved.
    pub fn forget_information(&mut self) {
        self.min_liquidity_sat = 0;
        self.max_liquidity_sat = self.channel.capacity_sat;
        self.in_flight_sat = 0;
    }

    /// Incorporate one probe outcome.
    ///
    /// The probed amount is `in_flight + amount_sat`: reservations for the
    /// probe itself were placed (on success) or released (on failure) before
    /// this is called, so `in_flight` always reflects what the oracle was
    /// actually asked to hold.
    ///
    /// + Success: liquidity is at least everything reserved here, and the
    ///   return channel can hold at most `capacity - min`.
    /// + Failure: liquidity is below what was asked, and the missing sats
    ///   must sit on the other side: `return.min >= capacity - max`.
    ///
    /// An update that empties an interval means the prior was violated,
    /// which is fatal.
    pub fn update_knowledge(
        &mut self,
        amount_sat: u64,
        return_channel: Option<&mut UncertaintyChannel>,
        success: bool,
    ) -> Result<(), FatalError> {
        debug_assert!(amount_sat > 0, "probed a zero amount");
        if success {
            self.min_liquidity_sat =
                max(self.min_liquidity_sat, self.in_flight_sat);
            self.check_consistency()?;
            if let Some(rev) = return_channel {
                rev.max_liquidity_sat = min(
                    rev.max_liquidity_sat,
                    rev.capacity_sat()
                        .saturating_sub(self.min_liquidity_sat),
                );
                rev.check_consistency()?;
            }
        } else {
            self.max_liquidity_sat = min(
                self.max_liquidity_sat,
                self.in_flight_sat + amount_sat - 1,
            );
            self.check_consistency()?;
            if let Some(rev) = return_channel {
                rev.min_liquidity_sat = max(
                    rev.min_liquidity_sat,
                    rev.capacity_sat()
                        .saturating_sub(self.max_liquidity_sat),
                );
                rev.check_consistency()?;
            }
        }
        Ok(())
    }

    fn check_consistency(&self) -> Result<(), FatalError> {
        if self.min_liquidity_sat > self.max_liquidity_sat {
            return Err(FatalError::BeliefInconsistency {
                channel: self.reference(),
                min_sat: self.min_liquidity_sat,
                max_sat: self.max_liquidity_sat,
            });
        }
        Ok(())
    }
}

impl Display for UncertaintyChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size {} sat, {:4.2} bits of entropy, interval [{},{}], \
             in-flight {}",
            self.capacity_sat(),
            self.entropy_bits(),
            self.min_liquidity_sat,
            self.max_liquidity_sat,
            self.in_flight_sat,
        )
    }
}

/// Our belief about the liquidity of every channel in the graph.
///
/// Paths cannot be probed against this network; it lacks ground truth. The
/// oracle and this network share [`ChannelRef`] keys but hold fully disjoint
/// state.
#[derive(Clone, Debug)]
pub struct UncertaintyNetwork {
    channels: Vec<UncertaintyChannel>,
    by_ref: BTreeMap<ChannelRef, usize>,
}

impl UncertaintyNetwork {
    pub fn from_graph(graph: &ChannelGraph) -> Self {
        let mut channels = Vec::with_capacity(graph.num_channels());
        let mut by_ref = BTreeMap::new();
        for (chan_ref, channel) in graph.channels() {
            by_ref.insert(chan_ref.clone(), channels.len());
            channels.push(UncertaintyChannel::new(channel.clone()));
        }
        Self { channels, by_ref }
    }

    pub fn get(&self, chan_ref: &ChannelRef) -> Option<&UncertaintyChannel> {
        self.by_ref.get(chan_ref).map(|&i| &self.channels[i])
    }

    pub fn get_mut(
        &mut self,
        chan_ref: &ChannelRef,
    ) -> Option<&mut UncertaintyChannel> {
        let i = *self.by_ref.get(chan_ref)?;
        Some(&mut self.channels[i])
    }

    /// Iterate all channels in deterministic key order.
    pub fn channels(
        &self,
    ) -> impl Iterator<Item = (&ChannelRef, &UncertaintyChannel)> {
        self.by_ref
            .iter()
            .map(move |(chan_ref, &i)| (chan_ref, &self.channels[i]))
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// All node ids appearing as a channel endpoint, in sorted order.
    pub fn node_ids(&self) -> BTreeSet<NodeId> {
        self.by_ref
            .keys()
            .flat_map(|chan_ref| {
                [chan_ref.src.clone(), chan_ref.dst.clone()]
            })
            .collect()
    }

    pub fn contains_node(&self, node: &NodeId) -> bool {
        self.by_ref
            .keys()
            .any(|chan_ref| &chan_ref.src == node || &chan_ref.dst == node)
    }

    /// A channel and (if present) its reverse direction, both mutable.
    fn channel_and_reverse_mut(
        &mut self,
        chan_ref: &ChannelRef,
    ) -> Option<(&mut UncertaintyChannel, Option<&mut UncertaintyChannel>)>
    {
        let i = *self.by_ref.get(chan_ref)?;
        let j = self.by_ref.get(&chan_ref.reversed()).copied();
        match j {
            None => Some((&mut self.channels[i], None)),
            Some(j) => {
                debug_assert_ne!(i, j);
                let (lo, hi) = (min(i, j), max(i, j));
                let (left, right) = self.channels.split_at_mut(hi);
                let (a, b) = (&mut left[lo], &mut right[0]);
                if i < j {
                    Some((a, Some(b)))
                } else {
                    Some((b, Some(a)))
                }
            }
        }
    }

    /// Incorporate a probe outcome on `chan_ref`, teaching the reverse
    /// direction as well when it is announced.
    pub fn update_knowledge(
        &mut self,
        chan_ref: &ChannelRef,
        amount_sat: u64,
        success: bool,
    ) -> Result<(), FatalError> {
        let (channel, reverse) = self
            .channel_and_reverse_mut(chan_ref)
            .expect("Probed a channel the belief graph never saw");
        if reverse.is_none() {
            debug!("No return channel for {chan_ref}; learning one-sided");
        }
        channel.update_knowledge(amount_sat, reverse, success)
    }

    /// Reserve `amount_sat` on every channel of a path.
    pub fn allocate_path(&mut self, path: &[ChannelRef], amount_sat: u64) {
        for chan_ref in path {
            self.get_mut(chan_ref)
                .expect("Allocating on an unknown channel")
                .allocate_in_flight(amount_sat);
        }
    }

    /// Release a path reservation made with [`Self::allocate_path`].
    pub fn release_path(&mut self, path: &[ChannelRef], amount_sat: u64) {
        for chan_ref in path {
            self.get_mut(chan_ref)
                .expect("Releasing on an unknown channel")
                .release_in_flight(amount_sat);
        }
    }

    /// The total uncertainty in the network, in bits.
    pub fn entropy_bits(&self) -> f64 {
        self.channels
            .iter()
            .map(UncertaintyChannel::entropy_bits)
            .sum()
    }

    /// Forget everything we learnt about every channel.
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.forget_information();
        }
    }

    /// Shift the belief intervals for a settled attempt: the settled amount
    /// has left every forward channel (and arrived on its reverse side), and
    /// the attempt's reservations are gone.
    pub fn settle_path(&mut self, path: &[ChannelRef], amount_sat: u64) {
        for chan_ref in path {
            let (channel, reverse) = self
                .channel_and_reverse_mut(chan_ref)
                .expect("Settling a channel the belief graph never saw");
            channel.release_in_flight(amount_sat);
            channel.min_liquidity_sat =
                channel.min_liquidity_sat.saturating_sub(amount_sat);
            channel.max_liquidity_sat =
                channel.max_liquidity_sat.saturating_sub(amount_sat);
            if let Some(rev) = reverse {
                let cap = rev.capacity_sat();
                rev.min_liquidity_sat =
                    min(rev.min_liquidity_sat + amount_sat, cap);
                rev.max_liquidity_sat =
                    min(rev.max_liquidity_sat + amount_sat, cap);
            }
        }
    }

    /// Total reserved liquidity across all channels. Zero whenever no
    /// payment is mid-flight.
    pub fn total_in_flight_sat(&self) -> u64 {
        self.channels
            .iter()
            .map(UncertaintyChannel::in_flight_sat)
            .sum()
    }
}

#[cfg(test)]
mod test {
    use proptest::{prop_assert, prop_assert_eq, proptest};

    use super::*;
    use crate::test_utils::{chan_ref, channel, channel_with_fees, graph_of};

    fn test_channel(capacity_sat: u64) -> UncertaintyChannel {
        UncertaintyChannel::new(channel("a", "b", 1, capacity_sat))
    }

    #[test]
    fn success_probability_uniform_prior() {
        let mut chan = test_channel(9);

        // Can't deliver more than the capacity.
        assert_eq!(chan.success_probability(10), 0.0);
        // Basic computation under the full interval.
        assert_eq!(chan.success_probability(1), 9.0 / 10.0);

        // Conditioning on a learnt minimum.
        chan.min_liquidity_sat = 2;
        assert_eq!(chan.success_probability(1), 1.0);
        assert_eq!(chan.success_probability(2), 1.0);
        assert_eq!(chan.success_probability(3), 7.0 / 8.0);

        // Outstanding reservations count against the amount.
        let p = chan.success_probability(3);
        chan.in_flight_sat = 3;
        assert_eq!(chan.success_probability(0), p);
    }

    #[test]
    fn success_probability_is_monotone() {
        proptest!(|(
            capacity_sat in 1u64..100_000,
            min_frac in 0.0f64..1.0,
            max_frac in 0.0f64..1.0,
            in_flight_frac in 0.0f64..1.0,
            amount_sat in 0u64..100_000,
        )| {
            let mut chan = test_channel(capacity_sat);
            let lo = (capacity_sat as f64 * min_frac) as u64;
            let hi = (capacity_sat as f64 * max_frac) as u64;
            chan.min_liquidity_sat = min(lo, hi);
            chan.max_liquidity_sat = max(lo, hi);
            chan.in_flight_sat =
                (capacity_sat as f64 * in_flight_frac) as u64;

            // Monotone non-increasing in the amount...
            let p = chan.success_probability(amount_sat);
            prop_assert!(p >= chan.success_probability(amount_sat + 1));
            prop_assert!((0.0..=1.0).contains(&p));

            // ...and in the in-flight reservations.
            chan.in_flight_sat += 1;
            prop_assert!(p >= chan.success_probability(amount_sat));
        })
    }

    #[test]
    fn entropy_is_the_log_of_the_interval() {
        let chan = test_channel(1023);
        assert_eq!(chan.entropy_bits(), 10.0);

        let mut chan = test_channel(1000);
        chan.min_liquidity_sat = 500;
        chan.max_liquidity_sat = 500;
        assert_eq!(chan.entropy_bits(), 0.0);
    }

    #[test]
    fn routing_cost_includes_base_fee() {
        let chan = UncertaintyChannel::new(channel_with_fees(
            "a", "b", 1, 1_000_000, 250, 1_000,
        ));
        // floor(250 * 10_000 / 1000) + 1000
        assert_eq!(chan.routing_cost_msat(10_000), 3_500);
        assert_eq!(chan.linearized_routing_unit_cost(), 250);
    }

    #[test]
    fn uncertainty_unit_cost_scales_inversely() {
        let chan = test_channel(15_000);
        assert_eq!(
            chan.linearized_uncertainty_unit_cost(),
            MAX_CHANNEL_SIZE_SAT / 15_000
        );

        // A fully known channel maxes out the unit cost.
        let mut chan = test_channel(1000);
        chan.min_liquidity_sat = 1000;
        chan.max_liquidity_sat = 1000;
        assert_eq!(
            chan.linearized_uncertainty_unit_cost(),
            MAX_CHANNEL_SIZE_SAT
        );
    }

    #[test]
    fn piecewise_costs_cover_the_interval_exactly() {
        proptest!(|(
            capacity_sat in 1u64..1_000_000,
            in_flight_frac in 0.0f64..1.0,
            min_frac in 0.0f64..1.0,
            max_frac in 0.0f64..1.0,
            n_pieces in 1u64..8,
        )| {
            let mut chan = test_channel(capacity_sat);
            let lo = (capacity_sat as f64 * min_frac) as u64;
            let hi = (capacity_sat as f64 * max_frac) as u64;
            chan.min_liquidity_sat = min(lo, hi);
            chan.max_liquidity_sat = max(lo, hi);
            // Keep reservations within the known-good region so the piece
            // capacities partition `[in_flight, max]`.
            chan.in_flight_sat =
                (chan.min_liquidity_sat as f64 * in_flight_frac) as u64;

            let pieces = chan.piecewise_linearized_costs(n_pieces, 1);

            let total = pieces
                .iter()
                .map(|piece| piece.capacity_sat)
                .sum::<u64>();
            let known_good = chan.min_liquidity_sat - chan.in_flight_sat;
            prop_assert_eq!(
                total,
                known_good + chan.conditional_capacity_sat()
            );

            // Unit costs are non-decreasing and capacities positive.
            for pair in pieces.windows(2) {
                prop_assert!(pair[0].unit_cost <= pair[1].unit_cost);
            }
            for piece in &pieces {
                prop_assert!(piece.capacity_sat > 0);
            }
        })
    }

    #[test]
    fn piecewise_costs_free_piece_then_rising_uncertainty() {
        let mut chan = UncertaintyChannel::new(channel_with_fees(
            "a", "b", 1, 1000, 100, 0,
        ));
        chan.min_liquidity_sat = 100;

        let pieces = chan.piecewise_linearized_costs(5, 2);
        // Free piece: the known-good 100 sats cost only fees.
        assert_eq!(pieces[0], CostPiece {
            capacity_sat: 100,
            unit_cost: 200,
        });
        // Conditional capacity 900 splits into 5 pieces of 180.
        let unit = chan.linearized_uncertainty_unit_cost();
        assert_eq!(pieces.len(), 6);
        for (i, piece) in pieces[1..].iter().enumerate() {
            assert_eq!(piece.capacity_sat, 180);
            assert_eq!(piece.unit_cost, (i as u64 + 1) * unit + 200);
        }
    }

    #[test]
    fn allocate_then_release_restores_state() {
        let mut chan = test_channel(1000);
        chan.min_liquidity_sat = 100;
        let before = (
            chan.min_liquidity_sat(),
            chan.max_liquidity_sat(),
            chan.in_flight_sat(),
        );

        chan.allocate_in_flight(250);
        assert_eq!(chan.in_flight_sat(), 250);
        chan.release_in_flight(250);

        let after = (
            chan.min_liquidity_sat(),
            chan.max_liquidity_sat(),
            chan.in_flight_sat(),
        );
        assert_eq!(before, after);
    }

    #[test]
    #[should_panic(expected = "accounting went negative")]
    fn release_refuses_to_go_negative() {
        let mut chan = test_channel(1000);
        chan.allocate_in_flight(10);
        chan.release_in_flight(11);
    }

    #[test]
    fn update_knowledge_teaches_both_directions() {
        // A failed 800 sat probe on a 1000 sat channel: the probed side
        // holds at most 799, so the other side holds at least 201.
        let graph = ChannelGraph::from_channels([
            channel("a", "b", 1, 1000),
            channel("b", "a", 1, 1000),
        ]);
        let mut network = UncertaintyNetwork::from_graph(&graph);
        let fwd = chan_ref("a", "b", 1);
        let rev = chan_ref("b", "a", 1);

        network.update_knowledge(&fwd, 800, false).unwrap();
        assert_eq!(network.get(&fwd).unwrap().max_liquidity_sat(), 799);
        assert_eq!(network.get(&rev).unwrap().min_liquidity_sat(), 201);

        // A successful probe teaches the minimum (via the reservation) and
        // caps the reverse maximum.
        network.allocate_path(std::slice::from_ref(&fwd), 300);
        network.update_knowledge(&fwd, 300, true).unwrap();
        assert_eq!(network.get(&fwd).unwrap().min_liquidity_sat(), 300);
        assert_eq!(network.get(&rev).unwrap().max_liquidity_sat(), 700);
    }

    #[test]
    fn update_knowledge_without_return_channel_degrades() {
        let graph = graph_of(&[("a", "b", 1, 1000, 0)]);
        let mut network = UncertaintyNetwork::from_graph(&graph);
        let fwd = chan_ref("a", "b", 1);

        network.update_knowledge(&fwd, 500, false).unwrap();
        assert_eq!(network.get(&fwd).unwrap().max_liquidity_sat(), 499);
    }

    #[test]
    fn contradictory_probes_are_fatal() {
        let graph = graph_of(&[("a", "b", 1, 1000, 0)]);
        let mut network = UncertaintyNetwork::from_graph(&graph);
        let fwd = chan_ref("a", "b", 1);

        // Learn min = 500 via a success...
        network.allocate_path(std::slice::from_ref(&fwd), 500);
        network.update_knowledge(&fwd, 500, true).unwrap();
        network.release_path(std::slice::from_ref(&fwd), 500);

        // ...then a failure of 100 contradicts it.
        let err = network.update_knowledge(&fwd, 100, false).unwrap_err();
        assert!(matches!(err, FatalError::BeliefInconsistency { .. }));
    }

    #[test]
    fn reset_restores_full_entropy() {
        let graph = graph_of(&[
            ("a", "b", 1, 1023, 0),
            ("b", "c", 2, 255, 0),
        ]);
        let mut network = UncertaintyNetwork::from_graph(&graph);

        network.update_knowledge(&chan_ref("a", "b", 1), 512, false).unwrap();
        assert!(network.entropy_bits() < 18.0);

        network.reset();
        // log2(1024) + log2(256)
        assert_eq!(network.entropy_bits(), 18.0);
        assert_eq!(network.total_in_flight_sat(), 0);
    }

    #[test]
    fn settle_shifts_the_interval() {
        let graph = ChannelGraph::from_channels([
            channel("a", "b", 1, 1000),
            channel("b", "a", 1, 1000),
        ]);
        let mut network = UncertaintyNetwork::from_graph(&graph);
        let fwd = chan_ref("a", "b", 1);
        let rev = chan_ref("b", "a", 1);

        // A confirmed 400 sat reservation, then settlement.
        network.allocate_path(std::slice::from_ref(&fwd), 400);
        network.update_knowledge(&fwd, 400, true).unwrap();
        network.settle_path(std::slice::from_ref(&fwd), 400);

        let fwd_chan = network.get(&fwd).unwrap();
        assert_eq!(fwd_chan.min_liquidity_sat(), 0);
        assert_eq!(fwd_chan.max_liquidity_sat(), 600);
        assert_eq!(fwd_chan.in_flight_sat(), 0);

        let rev_chan = network.get(&rev).unwrap();
        assert_eq!(rev_chan.min_liquidity_sat(), 400);
        assert_eq!(rev_chan.max_liquidity_sat(), 1000);
    }
}
