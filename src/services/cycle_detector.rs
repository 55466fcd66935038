//! Cycle Detector: strongly-connected-component detection over the
//! non-stale downstream adjacency, with rotation-invariant cycle
//! canonicalization for stable alert deduplication.

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::services::graph_store::GraphStore;
use crate::utils::ApiResult;

/// A newly discovered cycle, expressed with resolved `service_id` strings
/// rather than internal ids, alongside the canonical path used for
/// deduplication.
#[derive(Debug, Clone)]
pub struct DiscoveredCycle {
    pub service_ids: Vec<String>,
    pub canonical_path_key: String,
}

/// Run cycle detection against the graph store's current non-stale
/// adjacency, persisting any newly discovered cycle as an open alert.
/// Duplicate canonical paths are silently skipped — not an error, per §7.
pub async fn run_cycle_detection(graph_store: &GraphStore) -> ApiResult<Vec<DiscoveredCycle>> {
    let adjacency = graph_store.adjacency_list().await?;
    let cycles = detect_cycles(&adjacency);

    let all_ids: Vec<Uuid> = cycles.iter().flatten().copied().collect();
    let id_to_service_id = graph_store.service_ids_for(&all_ids).await?;

    let mut newly_discovered = Vec::new();
    for cycle in cycles {
        let service_ids: Vec<String> = cycle
            .iter()
            .filter_map(|id| id_to_service_id.get(id).cloned())
            .collect();
        if service_ids.len() != cycle.len() {
            continue; // a node vanished between adjacency read and resolution; skip this round
        }
        let canonical_path_key = service_ids.join(">");
        if graph_store.upsert_cycle_alert(&canonical_path_key, &service_ids).await? {
            newly_discovered.push(DiscoveredCycle { service_ids, canonical_path_key });
        }
    }

    Ok(newly_discovered)
}

/// Tarjan's algorithm over a `node -> successors` adjacency map. Returns one
/// `Vec<Uuid>` per strongly connected component, in no particular order.
pub fn strongly_connected_components(adjacency: &HashMap<Uuid, Vec<Uuid>>) -> Vec<Vec<Uuid>> {
    struct State {
        index_counter: usize,
        indices: HashMap<Uuid, usize>,
        lowlink: HashMap<Uuid, usize>,
        on_stack: HashSet<Uuid>,
        stack: Vec<Uuid>,
        components: Vec<Vec<Uuid>>,
    }

    fn strongconnect(node: Uuid, adjacency: &HashMap<Uuid, Vec<Uuid>>, state: &mut State) {
        state.indices.insert(node, state.index_counter);
        state.lowlink.insert(node, state.index_counter);
        state.index_counter += 1;
        state.stack.push(node);
        state.on_stack.insert(node);

        if let Some(successors) = adjacency.get(&node) {
            for &successor in successors {
                if !state.indices.contains_key(&successor) {
                    strongconnect(successor, adjacency, state);
                    let successor_low = state.lowlink[&successor];
                    let node_low = state.lowlink[&node];
                    state.lowlink.insert(node, node_low.min(successor_low));
                } else if state.on_stack.contains(&successor) {
                    let successor_index = state.indices[&successor];
                    let node_low = state.lowlink[&node];
                    state.lowlink.insert(node, node_low.min(successor_index));
                }
            }
        }

        if state.lowlink[&node] == state.indices[&node] {
            let mut component = Vec::new();
            loop {
                let w = state.stack.pop().expect("stack not empty while unwinding SCC");
                state.on_stack.remove(&w);
                component.push(w);
                if w == node {
                    break;
                }
            }
            state.components.push(component);
        }
    }

    let mut state = State {
        index_counter: 0,
        indices: HashMap::new(),
        lowlink: HashMap::new(),
        on_stack: HashSet::new(),
        stack: Vec::new(),
        components: Vec::new(),
    };

    for &node in adjacency.keys() {
        if !state.indices.contains_key(&node) {
            strongconnect(node, adjacency, &mut state);
        }
    }

    state.components
}

/// A single-node component is a cycle only if it has a self-loop; anything
/// of size >= 2 is always a cycle by construction of Tarjan's SCC.
fn is_cycle(component: &[Uuid], adjacency: &HashMap<Uuid, Vec<Uuid>>) -> bool {
    if component.len() > 1 {
        return true;
    }
    let node = component[0];
    adjacency.get(&node).is_some_and(|succ| succ.contains(&node))
}

/// Recover one concrete cycle path through the SCC's members by walking
/// successors until the walk returns to the start, restricted to edges that
/// stay inside the SCC.
fn path_through_component(component: &[Uuid], adjacency: &HashMap<Uuid, Vec<Uuid>>) -> Vec<Uuid> {
    if component.len() == 1 {
        return component.to_vec();
    }
    let members: HashSet<Uuid> = component.iter().copied().collect();
    let start = component[0];
    let mut path = vec![start];
    let mut current = start;
    let mut visited = HashSet::new();
    visited.insert(start);

    loop {
        let next = adjacency
            .get(&current)
            .into_iter()
            .flatten()
            .find(|n| members.contains(n) && (**n == start || !visited.contains(*n)));

        match next {
            Some(&n) if n == start => break,
            Some(&n) => {
                path.push(n);
                visited.insert(n);
                current = n;
            }
            None => break,
        }
    }

    path
}

/// Rotate a cycle path to its lexicographically-smallest rotation, so that
/// `[b,c,a]` and `[c,a,b]` canonicalize to the same value as `[a,b,c]`.
pub fn canonicalize_cycle(path: &[Uuid]) -> Vec<Uuid> {
    if path.is_empty() {
        return Vec::new();
    }
    let n = path.len();
    let mut best = path.to_vec();
    for start in 1..n {
        let rotated: Vec<Uuid> = path[start..].iter().chain(path[..start].iter()).copied().collect();
        if rotated < best {
            best = rotated;
        }
    }
    best
}

/// Find all cycles in the graph, each expressed as a canonicalized node
/// path. SCCs of size 1 without a self-loop are excluded.
pub fn detect_cycles(adjacency: &HashMap<Uuid, Vec<Uuid>>) -> Vec<Vec<Uuid>> {
    strongly_connected_components(adjacency)
        .into_iter()
        .filter(|component| is_cycle(component, adjacency))
        .map(|component| canonicalize_cycle(&path_through_component(&component, adjacency)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid_list(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn no_cycle_in_a_dag() {
        let nodes = uuid_list(3);
        let mut adjacency = HashMap::new();
        adjacency.insert(nodes[0], vec![nodes[1]]);
        adjacency.insert(nodes[1], vec![nodes[2]]);
        assert!(detect_cycles(&adjacency).is_empty());
    }

    #[test]
    fn three_node_cycle_is_detected() {
        let nodes = uuid_list(3);
        let mut adjacency = HashMap::new();
        adjacency.insert(nodes[0], vec![nodes[1]]);
        adjacency.insert(nodes[1], vec![nodes[2]]);
        adjacency.insert(nodes[2], vec![nodes[0]]);
        let cycles = detect_cycles(&adjacency);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 3);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let nodes = uuid_list(1);
        let mut adjacency = HashMap::new();
        adjacency.insert(nodes[0], vec![nodes[0]]);
        let cycles = detect_cycles(&adjacency);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0], vec![nodes[0]]);
    }

    #[test]
    fn single_node_without_self_loop_is_not_a_cycle() {
        let nodes = uuid_list(2);
        let mut adjacency = HashMap::new();
        adjacency.insert(nodes[0], vec![nodes[1]]);
        assert!(detect_cycles(&adjacency).is_empty());
    }

    #[test]
    fn rotations_canonicalize_equal() {
        let nodes = uuid_list(3);
        let a = vec![nodes[0], nodes[1], nodes[2]];
        let b = vec![nodes[1], nodes[2], nodes[0]];
        let c = vec![nodes[2], nodes[0], nodes[1]];
        assert_eq!(canonicalize_cycle(&a), canonicalize_cycle(&b));
        assert_eq!(canonicalize_cycle(&b), canonicalize_cycle(&c));
    }
}
