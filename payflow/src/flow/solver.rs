//! An integer min-cost-flow solver.
//!
//! The planning layer only depends on the small [`McfSolver`] contract, so
//! any solver with non-negative integer capacities and unit costs can be
//! dropped in. The bundled [`AugmentingPathSolver`] implements the classic
//! successive-shortest-paths algorithm: repeatedly augment flow from an
//! excess node to a deficit node along a cheapest residual path, using
//! Dijkstra over reduced costs with node potentials.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Unit costs above this bound risk overflowing path-cost accumulation and
/// are rejected as [`SolveStatus::BadCostRange`].
const MAX_UNIT_COST: u64 = 1 << 42;

/// Outcome of a [`McfSolver::solve`] call. Only [`SolveStatus::Optimal`]
/// carries a usable flow.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SolveStatus {
    /// A feasible flow of minimal cost was found.
    Optimal,
    /// The supplies cannot be routed within the arc capacities.
    Infeasible,
    /// Node supplies don't sum to zero.
    Unbalanced,
    /// The solver produced a flow that fails verification.
    BadResult,
    /// A unit cost is outside the supported range.
    BadCostRange,
    /// `solve` has not run yet.
    NotSolved,
}

/// The solver contract the planning layer consumes: build arcs and supplies,
/// solve once, read per-arc flows back.
pub trait McfSolver {
    /// Add a directed arc with the given capacity and per-unit cost,
    /// returning its id.
    fn add_arc(
        &mut self,
        src: usize,
        dst: usize,
        capacity: u64,
        unit_cost: u64,
    ) -> usize;

    /// Set a node's supply; a demand is a negative supply.
    fn set_supply(&mut self, node: usize, supply_sat: i64);

    fn solve(&mut self) -> SolveStatus;

    /// The flow assigned to an arc. Zero before a successful solve.
    fn flow(&self, arc: usize) -> u64;
}

#[derive(Clone, Debug)]
struct FlowArc {
    src: usize,
    dst: usize,
    capacity: u64,
    unit_cost: u64,
    flow: u64,
}

/// Successive-shortest-paths min-cost-flow.
#[derive(Clone, Debug, Default)]
pub struct AugmentingPathSolver {
    arcs: Vec<FlowArc>,
    supplies: Vec<i64>,
    status: SolveStatus,
}

impl Default for SolveStatus {
    fn default() -> Self {
        Self::NotSolved
    }
}

impl AugmentingPathSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    fn grow_nodes(&mut self, node: usize) {
        if node >= self.supplies.len() {
            self.supplies.resize(node + 1, 0);
        }
    }

    /// The total cost of the current flow. Only meaningful after an
    /// `Optimal` solve.
    pub fn total_cost(&self) -> u128 {
        self.arcs
            .iter()
            .map(|arc| u128::from(arc.flow) * u128::from(arc.unit_cost))
            .sum()
    }

    fn run(&mut self) -> SolveStatus {
        if self.arcs.iter().any(|arc| arc.unit_cost > MAX_UNIT_COST) {
            return SolveStatus::BadCostRange;
        }
        if self.supplies.iter().sum::<i64>() != 0 {
            return SolveStatus::Unbalanced;
        }

        let num_nodes = self.supplies.len();
        let mut excess = self.supplies.clone();
        // Residual adjacency: arc index and direction (true = forward).
        let mut adjacency: Vec<Vec<(usize, bool)>> = vec![vec![]; num_nodes];
        for (i, arc) in self.arcs.iter().enumerate() {
            adjacency[arc.src].push((i, true));
            adjacency[arc.dst].push((i, false));
        }

        let mut potentials = vec![0i64; num_nodes];
        loop {
            // Lowest-index node with excess keeps runs deterministic.
            let Some(source) =
                excess.iter().position(|&e| e > 0)
            else {
                break;
            };

            // Dijkstra over reduced costs from `source`.
            let mut dist = vec![i64::MAX; num_nodes];
            let mut parent: Vec<Option<(usize, bool)>> =
                vec![None; num_nodes];
            let mut heap = BinaryHeap::new();
            dist[source] = 0;
            heap.push(Reverse((0i64, source)));
            while let Some(Reverse((d, node))) = heap.pop() {
                if d > dist[node] {
                    continue;
                }
                for &(arc_idx, forward) in &adjacency[node] {
                    let arc = &self.arcs[arc_idx];
                    let (next, residual, cost) = if forward {
                        (arc.dst, arc.capacity - arc.flow, arc.unit_cost as i64)
                    } else {
                        (arc.src, arc.flow, -(arc.unit_cost as i64))
                    };
                    if residual == 0 {
                        continue;
                    }
                    let reduced =
                        cost + potentials[node] - potentials[next];
                    debug_assert!(reduced >= 0);
                    let next_dist = d + reduced;
                    if next_dist < dist[next] {
                        dist[next] = next_dist;
                        parent[next] = Some((arc_idx, forward));
                        heap.push(Reverse((next_dist, next)));
                    }
                }
            }

            // Cheapest reachable deficit node; none means infeasible.
            let Some(sink) = (0..num_nodes)
                .filter(|&n| excess[n] < 0 && dist[n] < i64::MAX)
                .min_by_key(|&n| (dist[n], n))
            else {
                return SolveStatus::Infeasible;
            };

            // Reusable potentials for the next iteration.
            let sink_dist = dist[sink];
            for node in 0..num_nodes {
                potentials[node] += dist[node].min(sink_dist);
            }

            // Bottleneck along the path, bounded by excess and deficit.
            let mut bottleneck =
                excess[source].min(-excess[sink]) as u64;
            let mut node = sink;
            while node != source {
                let (arc_idx, forward) =
                    parent[node].expect("path reaches the source");
                let arc = &self.arcs[arc_idx];
                let residual = if forward {
                    arc.capacity - arc.flow
                } else {
                    arc.flow
                };
                bottleneck = bottleneck.min(residual);
                node = if forward { arc.src } else { arc.dst };
            }

            // Push the bottleneck along the path.
            let mut node = sink;
            while node != source {
                let (arc_idx, forward) =
                    parent[node].expect("path reaches the source");
                let arc = &mut self.arcs[arc_idx];
                if forward {
                    arc.flow += bottleneck;
                    node = arc.src;
                } else {
                    arc.flow -= bottleneck;
                    node = arc.dst;
                }
            }
            excess[source] -= bottleneck as i64;
            excess[sink] += bottleneck as i64;
        }

        if let Err(status) = self.verify() {
            return status;
        }
        SolveStatus::Optimal
    }

    /// Post-solve verification: capacities respected, flow conserved.
    fn verify(&self) -> Result<(), SolveStatus> {
        let mut net = vec![0i64; self.supplies.len()];
        for arc in &self.arcs {
            if arc.flow > arc.capacity {
                return Err(SolveStatus::BadResult);
            }
            net[arc.src] += arc.flow as i64;
            net[arc.dst] -= arc.flow as i64;
        }
        if net != self.supplies {
            return Err(SolveStatus::BadResult);
        }
        Ok(())
    }
}

impl McfSolver for AugmentingPathSolver {
    fn add_arc(
        &mut self,
        src: usize,
        dst: usize,
        capacity: u64,
        unit_cost: u64,
    ) -> usize {
        self.grow_nodes(src.max(dst));
        self.arcs.push(FlowArc {
            src,
            dst,
            capacity,
            unit_cost,
            flow: 0,
        });
        self.arcs.len() - 1
    }

    fn set_supply(&mut self, node: usize, supply_sat: i64) {
        self.grow_nodes(node);
        self.supplies[node] = supply_sat;
    }

    fn solve(&mut self) -> SolveStatus {
        // Reset flows so `solve` is idempotent.
        for arc in &mut self.arcs {
            arc.flow = 0;
        }
        self.status = self.run();
        self.status
    }

    fn flow(&self, arc: usize) -> u64 {
        match self.status {
            SolveStatus::Optimal => self.arcs[arc].flow,
            _ => 0,
        }
    }
}
