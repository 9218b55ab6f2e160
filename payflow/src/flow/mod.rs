//! Turning the belief graph into a min-cost-flow problem and back.
//!
//! The builder encodes every surviving channel as up to `1 + n_pieces`
//! parallel arcs (its piecewise-linearized cost), solves for a cheapest
//! feasible flow, then dissects that flow into candidate payment paths by
//! repeatedly peeling off the weight-cheapest path with positive flow.

pub mod solver;

use std::collections::BTreeMap;

use tracing::debug;

use crate::channel::{ChannelRef, NodeId};
use crate::constants::{PRUNE_MIN_PROBABILITY, PRUNE_PROBE_AMOUNT_SAT};
use crate::flow::solver::{AugmentingPathSolver, McfSolver, SolveStatus};
use crate::payments::session::SessionConfig;
use crate::uncertainty::{UncertaintyChannel, UncertaintyNetwork};

/// One candidate payment path produced by flow dissection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CandidatePath {
    pub path: Vec<ChannelRef>,
    pub amount_sat: u64,
}

/// Whether a channel participates in planning at all.
fn is_plannable(channel: &UncertaintyChannel, config: &SessionConfig) -> bool {
    // Base fees are not linearizable; channels charging more than the
    // caller tolerates are planned around entirely.
    if channel.base_fee_msat() > config.base_fee_threshold_msat {
        return false;
    }
    // Aggressively prune channels unlikely to forward a sizeable payment.
    // This shrinks the arc set considerably on real-world graphs.
    if config.prune_network
        && channel.success_probability(PRUNE_PROBE_AMOUNT_SAT)
            < PRUNE_MIN_PROBABILITY
    {
        return false;
    }
    true
}

/// Compute the optimal split of `amount_sat` from `sender` to `receiver`
/// given the current belief, as a set of candidate paths whose amounts sum
/// to `amount_sat`.
///
/// Returns the solver's status when it is anything but optimal.
pub(crate) fn plan_candidate_paths(
    network: &UncertaintyNetwork,
    sender: &NodeId,
    receiver: &NodeId,
    amount_sat: u64,
    config: &SessionConfig,
) -> Result<Vec<CandidatePath>, SolveStatus> {
    // The solver wants dense integer node ids; sorted order keeps the
    // encoding (and thus the whole run) deterministic.
    let node_index = network
        .node_ids()
        .into_iter()
        .enumerate()
        .map(|(i, node)| (node, i))
        .collect::<BTreeMap<_, _>>();

    let mut solver = AugmentingPathSolver::new();
    let mut arc_channels: Vec<(usize, ChannelRef)> = Vec::new();
    for (chan_ref, channel) in network.channels() {
        if !is_plannable(channel, config) {
            continue;
        }
        let src = node_index[&chan_ref.src];
        let dst = node_index[&chan_ref.dst];
        for piece in
            channel.piecewise_linearized_costs(config.n_pieces, config.mu)
        {
            let arc =
                solver.add_arc(src, dst, piece.capacity_sat, piece.unit_cost);
            arc_channels.push((arc, chan_ref.clone()));
        }
    }
    debug!(
        num_nodes = node_index.len(),
        num_arcs = solver.num_arcs(),
        "built min-cost-flow instance"
    );

    solver.set_supply(node_index[sender], amount_sat as i64);
    solver.set_supply(node_index[receiver], -(amount_sat as i64));

    let status = solver.solve();
    if status != SolveStatus::Optimal {
        return Err(status);
    }

    // Aggregate piece flows back onto their channels and weigh each channel
    // by its combined unit cost for the dissection below.
    let mut flows = BTreeMap::<ChannelRef, u64>::new();
    for (arc, chan_ref) in &arc_channels {
        let flow = solver.flow(*arc);
        if flow > 0 {
            *flows.entry(chan_ref.clone()).or_default() += flow;
        }
    }
    let weights = flows
        .keys()
        .map(|chan_ref| {
            let channel =
                network.get(chan_ref).expect("flow only on known channels");
            (chan_ref.clone(), channel.combined_unit_cost(config.mu))
        })
        .collect::<BTreeMap<_, _>>();

    Ok(dissect_flow(&node_index, flows, &weights, sender, receiver))
}

/// Dissect a flow into paths: repeatedly find the weight-cheapest path from
/// `sender` to `receiver` across channels with positive flow, emit it with
/// its bottleneck flow, and subtract.
fn dissect_flow(
    node_index: &BTreeMap<NodeId, usize>,
    mut flows: BTreeMap<ChannelRef, u64>,
    weights: &BTreeMap<ChannelRef, u64>,
    sender: &NodeId,
    receiver: &NodeId,
) -> Vec<CandidatePath> {
    let mut paths = Vec::new();
    loop {
        let Some(path) =
            cheapest_path(node_index, &flows, weights, sender, receiver)
        else {
            break;
        };

        let bottleneck = path
            .iter()
            .map(|chan_ref| flows[chan_ref])
            .min()
            .expect("paths have at least one hop");
        for chan_ref in &path {
            let flow = flows.get_mut(chan_ref).expect("path follows flow");
            *flow -= bottleneck;
            if *flow == 0 {
                flows.remove(chan_ref);
            }
        }
        paths.push(CandidatePath {
            path,
            amount_sat: bottleneck,
        });
    }
    paths
}

/// Dijkstra over the positive-flow channels, minimizing summed unit cost.
/// Ties resolve toward the first-seen channel in key order, keeping the
/// dissection deterministic.
fn cheapest_path(
    node_index: &BTreeMap<NodeId, usize>,
    flows: &BTreeMap<ChannelRef, u64>,
    weights: &BTreeMap<ChannelRef, u64>,
    sender: &NodeId,
    receiver: &NodeId,
) -> Option<Vec<ChannelRef>> {
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    // Outgoing positive-flow channels per node, in key order.
    let mut outgoing = BTreeMap::<&NodeId, Vec<&ChannelRef>>::new();
    for chan_ref in flows.keys() {
        outgoing.entry(&chan_ref.src).or_default().push(chan_ref);
    }

    // `node_index` was assigned in sorted key order, so the keys in order
    // are exactly the nodes at indices 0..n.
    let nodes = node_index.keys().collect::<Vec<_>>();

    let num_nodes = node_index.len();
    let mut dist = vec![u64::MAX; num_nodes];
    let mut parent: Vec<Option<&ChannelRef>> = vec![None; num_nodes];
    let source = node_index[sender];
    let sink = node_index[receiver];
    dist[source] = 0;
    let mut heap = BinaryHeap::new();
    heap.push(Reverse((0u64, source)));
    while let Some(Reverse((d, node_idx))) = heap.pop() {
        if d > dist[node_idx] {
            continue;
        }
        if node_idx == sink {
            break;
        }
        let Some(channels) = outgoing.get(nodes[node_idx]) else {
            continue;
        };
        for &chan_ref in channels {
            let next = node_index[&chan_ref.dst];
            let next_dist = d + weights[chan_ref];
            if next_dist < dist[next] {
                dist[next] = next_dist;
                parent[next] = Some(chan_ref);
                heap.push(Reverse((next_dist, next)));
            }
        }
    }

    if dist[sink] == u64::MAX {
        return None;
    }
    let mut path = Vec::new();
    let mut node_idx = sink;
    while node_idx != source {
        let chan_ref = parent[node_idx].expect("reached nodes have parents");
        path.push(chan_ref.clone());
        node_idx = node_index[&chan_ref.src];
    }
    path.reverse();
    Some(path)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::ChannelGraph;
    use crate::test_utils::{chan_ref, channel_with_fees, graph_of};

    fn config() -> SessionConfig {
        SessionConfig {
            prune_network: false,
            ..SessionConfig::default()
        }
    }

    fn network_of(graph: &ChannelGraph) -> UncertaintyNetwork {
        UncertaintyNetwork::from_graph(graph)
    }

    #[test]
    fn single_channel_single_path() {
        let graph = graph_of(&[("a", "b", 1, 1000, 100)]);
        let network = network_of(&graph);
        let candidates = plan_candidate_paths(
            &network,
            &NodeId::from("a"),
            &NodeId::from("b"),
            500,
            &config(),
        )
        .unwrap();

        assert_eq!(candidates, vec![CandidatePath {
            path: vec![chan_ref("a", "b", 1)],
            amount_sat: 500,
        }]);
    }

    #[test]
    fn splits_across_parallel_channels() {
        let graph = graph_of(&[
            ("a", "b", 1, 400, 0),
            ("a", "b", 2, 400, 0),
        ]);
        let network = network_of(&graph);
        let candidates = plan_candidate_paths(
            &network,
            &NodeId::from("a"),
            &NodeId::from("b"),
            600,
            &config(),
        )
        .unwrap();

        // Both channels carry flow; the candidates cover the full amount.
        assert_eq!(candidates.len(), 2);
        let total: u64 = candidates.iter().map(|c| c.amount_sat).sum();
        assert_eq!(total, 600);
        for candidate in &candidates {
            assert!(candidate.amount_sat <= 400);
            assert_eq!(candidate.path.len(), 1);
        }
    }

    #[test]
    fn multi_hop_paths_are_contiguous() {
        let graph = graph_of(&[
            ("a", "b", 1, 10_000, 10),
            ("b", "c", 2, 10_000, 10),
            ("c", "d", 3, 10_000, 10),
        ]);
        let network = network_of(&graph);
        let candidates = plan_candidate_paths(
            &network,
            &NodeId::from("a"),
            &NodeId::from("d"),
            1_000,
            &config(),
        )
        .unwrap();

        assert_eq!(candidates.len(), 1);
        let path = &candidates[0].path;
        assert_eq!(path.len(), 3);
        for hop in path.windows(2) {
            assert_eq!(hop[0].dst, hop[1].src);
        }
    }

    #[test]
    fn infeasible_amount_reports_status() {
        let graph = graph_of(&[("a", "b", 1, 100, 0)]);
        let network = network_of(&graph);
        let err = plan_candidate_paths(
            &network,
            &NodeId::from("a"),
            &NodeId::from("b"),
            500,
            &config(),
        )
        .unwrap_err();
        assert_eq!(err, SolveStatus::Infeasible);
    }

    #[test]
    fn base_fee_threshold_prunes_channels() {
        // The direct channel charges a base fee; the only surviving route
        // is the two-hop one.
        let graph = ChannelGraph::from_channels([
            channel_with_fees("a", "b", 1, 10_000, 0, 1_000),
            channel_with_fees("a", "c", 2, 10_000, 0, 0),
            channel_with_fees("c", "b", 3, 10_000, 0, 0),
        ]);
        let network = network_of(&graph);
        let candidates = plan_candidate_paths(
            &network,
            &NodeId::from("a"),
            &NodeId::from("b"),
            100,
            &config(),
        )
        .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].path, vec![
            chan_ref("a", "c", 2),
            chan_ref("c", "b", 3),
        ]);
    }

    #[test]
    fn reliability_prune_drops_doubtful_channels() {
        // With pruning on, a small fully-uncertain channel cannot pass the
        // 250k sat probe and planning fails.
        let graph = graph_of(&[("a", "b", 1, 1000, 0)]);
        let network = network_of(&graph);
        let mut cfg = config();
        cfg.prune_network = true;
        let err = plan_candidate_paths(
            &network,
            &NodeId::from("a"),
            &NodeId::from("b"),
            500,
            &cfg,
        )
        .unwrap_err();
        assert_eq!(err, SolveStatus::Infeasible);
    }
}
