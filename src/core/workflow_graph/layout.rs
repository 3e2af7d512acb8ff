//! Deterministic left-to-right layered layout of the workflow canvas.

use crate::core::workflow_graph::schema::Workflow;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{depth_first_search, DfsEvent};
use petgraph::Direction;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Width of every node footprint.
pub const NODE_WIDTH: f64 = 100.0;
/// Height of every node footprint.
pub const NODE_HEIGHT: f64 = 100.0;
/// Horizontal gap between adjacent ranks.
pub const RANK_SPACING: f64 = 200.0;
/// Vertical gap between nodes sharing a rank.
pub const NODE_SPACING: f64 = 80.0;
/// Offset of the whole drawing from the canvas origin.
pub const CANVAS_MARGIN: f64 = 50.0;

const ORDERING_SWEEPS: usize = 4;

/// Recompute node positions and drop null-valued parameter keys.
/// Nodes come back sorted left-to-right, then top-to-bottom.
pub fn format_workflow(workflow: &Workflow) -> Workflow {
    let mut formatted = workflow.clone();
    if formatted.nodes.is_empty() {
        return formatted;
    }

    let positions = compute_positions(&formatted);
    for (node, [x, y]) in formatted.nodes.iter_mut().zip(positions) {
        node.position = [x - NODE_WIDTH / 2.0, y - NODE_HEIGHT / 2.0];
        strip_nulls(&mut node.parameters);
    }
    formatted.nodes.sort_by(|a, b| {
        a.position[0]
            .total_cmp(&b.position[0])
            .then(a.position[1].total_cmp(&b.position[1]))
    });
    formatted
}

/// Remove null-valued keys from objects, recursively through nested
/// objects. Arrays are left exactly as they are.
pub fn strip_nulls(value: &mut Value) {
    if let Value::Object(map) = value {
        map.retain(|_, item| !item.is_null());
        for item in map.values_mut() {
            strip_nulls(item);
        }
    }
}

/// Center coordinates per node, in `workflow.nodes` order.
fn compute_positions(workflow: &Workflow) -> Vec<[f64; 2]> {
    let mut graph = DiGraph::<(), ()>::new();
    let mut index_by_name: HashMap<&str, NodeIndex> = HashMap::new();
    for node in &workflow.nodes {
        index_by_name.insert(node.name.as_str(), graph.add_node(()));
    }
    for (source, _, _, target) in workflow.edges() {
        let (Some(&from), Some(&to)) = (index_by_name.get(source), index_by_name.get(target.node.as_str())) else {
            continue;
        };
        if from != to {
            graph.add_edge(from, to, ());
        }
    }

    let dag = remove_cycles(&graph);
    let ranks = assign_ranks(&dag);
    let layers = order_layers(&dag, &ranks);

    let widest = layers.iter().map(Vec::len).max().unwrap_or(1);
    let mut centers = vec![[0.0, 0.0]; workflow.nodes.len()];
    for (rank, layer) in layers.iter().enumerate() {
        let offset = (widest - layer.len()) as f64 * (NODE_HEIGHT + NODE_SPACING) / 2.0;
        for (order, idx) in layer.iter().enumerate() {
            let x = CANVAS_MARGIN + rank as f64 * (NODE_WIDTH + RANK_SPACING) + NODE_WIDTH / 2.0;
            let y = CANVAS_MARGIN + offset + order as f64 * (NODE_HEIGHT + NODE_SPACING) + NODE_HEIGHT / 2.0;
            centers[idx.index()] = [x, y];
        }
    }
    centers
}

/// Reverse DFS back edges so the graph becomes acyclic.
fn remove_cycles(graph: &DiGraph<(), ()>) -> DiGraph<(), ()> {
    let mut back_edges: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
    depth_first_search(graph, graph.node_indices(), |event| {
        if let DfsEvent::BackEdge(from, to) = event {
            back_edges.insert((from, to));
        }
    });

    let mut dag = DiGraph::<(), ()>::with_capacity(graph.node_count(), graph.edge_count());
    for _ in graph.node_indices() {
        dag.add_node(());
    }
    for edge in graph.raw_edges() {
        let (from, to) = (edge.source(), edge.target());
        if back_edges.contains(&(from, to)) {
            dag.add_edge(to, from, ());
        } else {
            dag.add_edge(from, to, ());
        }
    }
    dag
}

/// Longest-path ranking: sources (triggers) sit at rank 0.
fn assign_ranks(dag: &DiGraph<(), ()>) -> Vec<usize> {
    let mut ranks = vec![0usize; dag.node_count()];
    let Ok(order) = toposort(dag, None) else {
        tracing::warn!("layout graph still cyclic after back-edge reversal; using a single rank");
        return ranks;
    };
    for idx in order {
        let rank = dag
            .neighbors_directed(idx, Direction::Incoming)
            .map(|pred| ranks[pred.index()] + 1)
            .max()
            .unwrap_or(0);
        ranks[idx.index()] = rank;
    }
    ranks
}

/// Group nodes by rank and reduce crossings with barycenter sweeps, keeping
/// the best ordering seen.
fn order_layers(dag: &DiGraph<(), ()>, ranks: &[usize]) -> Vec<Vec<NodeIndex>> {
    let depth = ranks.iter().copied().max().unwrap_or(0) + 1;
    let mut layers: Vec<Vec<NodeIndex>> = vec![Vec::new(); depth];
    for idx in dag.node_indices() {
        layers[ranks[idx.index()]].push(idx);
    }

    let mut best = layers.clone();
    let mut best_crossings = total_crossings(dag, &layers);
    for sweep in 0..ORDERING_SWEEPS {
        if best_crossings == 0 {
            break;
        }
        if sweep % 2 == 0 {
            for rank in 1..depth {
                reorder(dag, &mut layers, rank, rank - 1, Direction::Incoming);
            }
        } else {
            for rank in (0..depth.saturating_sub(1)).rev() {
                reorder(dag, &mut layers, rank, rank + 1, Direction::Outgoing);
            }
        }
        let crossings = total_crossings(dag, &layers);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = layers.clone();
        }
    }
    best
}

fn reorder(
    dag: &DiGraph<(), ()>,
    layers: &mut [Vec<NodeIndex>],
    rank: usize,
    fixed_rank: usize,
    direction: Direction,
) {
    let fixed_positions: HashMap<NodeIndex, usize> = layers[fixed_rank]
        .iter()
        .enumerate()
        .map(|(position, idx)| (*idx, position))
        .collect();

    let mut keyed: Vec<(f64, NodeIndex)> = layers[rank]
        .iter()
        .enumerate()
        .map(|(position, idx)| {
            let neighbours: Vec<usize> = dag
                .neighbors_directed(*idx, direction)
                .filter_map(|n| fixed_positions.get(&n).copied())
                .collect();
            let key = if neighbours.is_empty() {
                position as f64
            } else {
                neighbours.iter().sum::<usize>() as f64 / neighbours.len() as f64
            };
            (key, *idx)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    layers[rank] = keyed.into_iter().map(|(_, idx)| idx).collect();
}

fn total_crossings(dag: &DiGraph<(), ()>, layers: &[Vec<NodeIndex>]) -> usize {
    let mut position: HashMap<NodeIndex, (usize, usize)> = HashMap::new();
    for (rank, layer) in layers.iter().enumerate() {
        for (order, idx) in layer.iter().enumerate() {
            position.insert(*idx, (rank, order));
        }
    }

    let mut total = 0;
    for rank in 0..layers.len().saturating_sub(1) {
        let segments: Vec<(usize, usize)> = dag
            .raw_edges()
            .iter()
            .filter_map(|edge| {
                let (from_rank, from_order) = position[&edge.source()];
                let (to_rank, to_order) = position[&edge.target()];
                (from_rank == rank && to_rank == rank + 1).then_some((from_order, to_order))
            })
            .collect();
        for (i, a) in segments.iter().enumerate() {
            for b in &segments[i + 1..] {
                if (a.0 < b.0 && a.1 > b.1) || (a.0 > b.0 && a.1 < b.1) {
                    total += 1;
                }
            }
        }
    }
    total
}
