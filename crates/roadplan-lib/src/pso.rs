//! Particle swarm search over complete start-to-goal paths.
//!
//! Paths have no meaningful velocity, so each particle moves by splicing
//! itself with its personal best or the global best at a shared node, and by
//! occasionally re-walking a random sub-segment. The search is stochastic and
//! gives no optimality guarantee; pass a seed for reproducible runs.

use std::collections::{BTreeSet, HashSet};

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::cost::{path_cost, CostProfile};
use crate::graph::{Graph, NodeId};
use crate::path::SearchOutcome;

/// Share of the population seeded by the greedy walk.
const GREEDY_SHARE: f64 = 0.3;
/// Probability that a random walk prefers an unvisited neighbour.
const UNVISITED_PREFERENCE: f64 = 0.9;
/// Per-iteration mutation probability.
const MUTATION_RATE: f64 = 0.05;
/// Iterations with an identical best fitness that end the search early.
const STALL_WINDOW: usize = 10;

/// Swarm parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsoConfig {
    pub population_size: usize,
    pub max_iterations: usize,
    pub inertia_weight: f64,
    pub cognitive_weight: f64,
    pub social_weight: f64,
    /// Fixed RNG seed; entropy-seeded when `None`.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            max_iterations: 100,
            inertia_weight: 0.7,
            cognitive_weight: 1.5,
            social_weight: 1.5,
            seed: None,
        }
    }
}

/// Search outcome plus convergence figures.
#[derive(Debug, Clone, PartialEq)]
pub struct PsoOutcome {
    pub search: SearchOutcome,
    /// Iterations actually run.
    pub iterations: usize,
    /// Best fitness of the last iteration run.
    pub final_fitness: f64,
    /// Iterations whose best fitness beat the previous iteration's.
    pub improved_iterations: usize,
}

#[derive(Debug, Clone)]
struct Particle {
    path: Vec<NodeId>,
    best_path: Vec<NodeId>,
    best_fitness: f64,
}

impl Particle {
    fn new(path: Vec<NodeId>) -> Self {
        Self {
            best_path: path.clone(),
            path,
            best_fitness: f64::INFINITY,
        }
    }
}

/// Run the swarm between `start` and `goal` under `profile`.
pub fn find_route_pso(
    graph: &Graph,
    start: NodeId,
    goal: NodeId,
    profile: &CostProfile,
    config: &PsoConfig,
) -> PsoOutcome {
    if !graph.contains_node(start) || !graph.contains_node(goal) {
        return PsoOutcome::settled(SearchOutcome::unreachable(0));
    }
    if start == goal {
        return PsoOutcome::settled(SearchOutcome::trivial(start));
    }

    let mut swarm = Swarm {
        graph,
        start,
        goal,
        profile,
        config,
        rng: match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        },
    };

    let mut particles = swarm.initialize();
    let mut global_best: Option<(Vec<NodeId>, f64)> = None;
    let mut history: Vec<f64> = Vec::with_capacity(config.max_iterations);
    let mut nodes_visited = 0;

    for iteration in 0..config.max_iterations {
        let mut iteration_best = f64::INFINITY;
        for particle in &mut particles {
            let fitness = swarm.fitness(&particle.path);
            if fitness < particle.best_fitness {
                particle.best_fitness = fitness;
                particle.best_path = particle.path.clone();
            }
            let improves_global = match &global_best {
                Some((_, best)) => fitness < *best,
                None => fitness.is_finite(),
            };
            if improves_global {
                global_best = Some((particle.path.clone(), fitness));
            }
            iteration_best = iteration_best.min(fitness);
        }
        history.push(iteration_best);

        let global_path = global_best.as_ref().map(|(path, _)| path.as_slice());
        swarm.update(&mut particles, global_path);
        nodes_visited += particles.len();

        if iteration > STALL_WINDOW && stalled(&history) {
            break;
        }
    }

    let improved_iterations = history.windows(2).filter(|w| w[1] < w[0]).count();
    let final_fitness = history.last().copied().unwrap_or(f64::INFINITY);
    let search = match global_best {
        Some((path, cost)) => SearchOutcome {
            path,
            cost,
            nodes_visited,
        },
        None => SearchOutcome::unreachable(nodes_visited),
    };

    tracing::debug!(
        iterations = history.len(),
        cost = search.cost,
        improved_iterations,
        "particle swarm finished"
    );

    PsoOutcome {
        search,
        iterations: history.len(),
        final_fitness,
        improved_iterations,
    }
}

impl PsoOutcome {
    fn settled(search: SearchOutcome) -> Self {
        Self {
            final_fitness: search.cost,
            search,
            iterations: 0,
            improved_iterations: 0,
        }
    }
}

/// True when the last `STALL_WINDOW` entries are exactly equal.
fn stalled(history: &[f64]) -> bool {
    if history.len() < STALL_WINDOW {
        return false;
    }
    let window = &history[history.len() - STALL_WINDOW..];
    window.iter().all(|value| value.to_bits() == window[0].to_bits())
}

struct Swarm<'a> {
    graph: &'a Graph,
    start: NodeId,
    goal: NodeId,
    profile: &'a CostProfile,
    config: &'a PsoConfig,
    rng: SmallRng,
}

impl Swarm<'_> {
    fn initialize(&mut self) -> Vec<Particle> {
        let population = self.config.population_size;
        let greedy_count = (population as f64 * GREEDY_SHARE).ceil() as usize;
        (0..population)
            .map(|index| {
                let walk = if index < greedy_count {
                    self.greedy_walk(self.start, self.goal)
                } else {
                    self.random_walk(self.start, self.goal)
                };
                Particle::new(walk.unwrap_or_else(|| vec![self.start, self.goal]))
            })
            .collect()
    }

    /// Total path cost, or infinity when the sequence is not a valid path.
    fn fitness(&self, path: &[NodeId]) -> f64 {
        if path.len() < 2 {
            return f64::INFINITY;
        }
        path_cost(path, self.graph, self.profile).unwrap_or(f64::INFINITY)
    }

    fn update(&mut self, particles: &mut [Particle], global_best: Option<&[NodeId]>) {
        let config = self.config;
        for particle in particles.iter_mut() {
            if self.rng.gen::<f64>() < config.inertia_weight * 0.8 {
                continue;
            }
            if self.rng.gen::<f64>() < config.cognitive_weight * 0.1 {
                if let Some(path) = self.crossover(&particle.path, &particle.best_path) {
                    particle.path = path;
                }
            }
            if self.rng.gen::<f64>() < config.social_weight * 0.1 {
                if let Some(best) = global_best {
                    if let Some(path) = self.crossover(&particle.path, best) {
                        particle.path = path;
                    }
                }
            }
            if self.rng.gen::<f64>() < MUTATION_RATE {
                if let Some(path) = self.mutate(&particle.path) {
                    particle.path = path;
                }
            }
        }
    }

    /// Walk to the nearest unvisited neighbour until `to` is reached.
    fn greedy_walk(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        let mut path = vec![from];
        let mut visited = HashSet::from([from]);
        let mut current = from;
        let max_steps = self.graph.node_count() * 2;

        for _ in 0..max_steps {
            if current == to {
                break;
            }
            let next = self
                .graph
                .neighbours(current)
                .filter(|(node, _)| !visited.contains(node))
                .min_by(|(_, a), (_, b)| a.distance.total_cmp(&b.distance))
                .map(|(node, _)| node)?;
            path.push(next);
            visited.insert(next);
            current = next;
        }

        (current == to).then_some(path)
    }

    /// Biased random walk from `from` towards `to`.
    fn random_walk(&mut self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        let mut path = vec![from];
        let mut visited = HashSet::from([from]);
        let mut current = from;
        let max_steps = self.graph.node_count() * 3;

        for _ in 0..max_steps {
            if current == to {
                break;
            }
            let neighbours: Vec<NodeId> = self.graph.neighbours(current).map(|(n, _)| n).collect();
            if neighbours.is_empty() {
                break;
            }
            let unvisited: Vec<NodeId> = neighbours
                .iter()
                .copied()
                .filter(|node| !visited.contains(node))
                .collect();
            let pool = if !unvisited.is_empty() && self.rng.gen_bool(UNVISITED_PREFERENCE) {
                &unvisited
            } else {
                &neighbours
            };
            let Some(&next) = pool.choose(&mut self.rng) else {
                break;
            };
            path.push(next);
            visited.insert(next);
            current = next;
        }

        if current != to && self.graph.edge(current, to).is_some() {
            path.push(to);
            current = to;
        }
        (current == to).then_some(path)
    }

    /// Splice `left` up to a shared interior node with `right` from it.
    fn crossover(&mut self, left: &[NodeId], right: &[NodeId]) -> Option<Vec<NodeId>> {
        if left.len() < 2 || right.len() < 2 {
            return None;
        }
        if left.first() != right.first() || left.last() != right.last() {
            return None;
        }
        let endpoints = [left[0], left[left.len() - 1]];
        let right_nodes: BTreeSet<NodeId> = right.iter().copied().collect();
        let common: Vec<NodeId> = left
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .intersection(&right_nodes)
            .copied()
            .filter(|node| !endpoints.contains(node))
            .collect();
        let pivot = *common.choose(&mut self.rng)?;

        let left_index = left.iter().position(|node| *node == pivot)?;
        let right_index = right.iter().position(|node| *node == pivot)?;
        let mut spliced = left[..left_index].to_vec();
        spliced.extend_from_slice(&right[right_index..]);
        self.is_valid(&spliced).then_some(spliced)
    }

    /// Replace a random sub-segment with a fresh random walk.
    fn mutate(&mut self, path: &[NodeId]) -> Option<Vec<NodeId>> {
        if path.len() < 3 {
            return None;
        }
        let from_index = self.rng.gen_range(0..path.len() - 1);
        let to_index = self.rng.gen_range(from_index + 1..path.len());
        let segment = self.random_walk(path[from_index], path[to_index])?;

        let mut mutated = path[..from_index].to_vec();
        mutated.extend(segment);
        mutated.extend_from_slice(&path[to_index + 1..]);
        self.is_valid(&mutated).then_some(mutated)
    }

    fn is_valid(&self, path: &[NodeId]) -> bool {
        path.len() >= 2
            && path.first() == Some(&self.start)
            && path.last() == Some(&self.goal)
            && path
                .windows(2)
                .all(|pair| self.graph.edge(pair[0], pair[1]).is_some())
    }
}
