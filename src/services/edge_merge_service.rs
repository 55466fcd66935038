//! Edge Merger: reconciles edges discovered through more than one source for
//! the same (source, target) pair. Pure and synchronous — no I/O.

use crate::models::{DependencyEdge, DiscoverySource};

/// A genuine conflict between two different discovery sources observing the
/// same (source, target) pair. Same-source re-observations are not
/// conflicts — they are updates, handled directly by the graph store.
#[derive(Debug, Clone)]
pub struct EdgeConflict {
    pub existing_source: DiscoverySource,
    pub new_source: DiscoverySource,
    pub resolution: String,
}

pub struct MergeOutcome {
    pub retained: DependencyEdge,
    pub conflict: Option<EdgeConflict>,
}

/// Reconcile `incoming` against `existing` for the same (source, target)
/// pair. Higher-priority discovery source wins; on a tie (same source) the
/// new observation simply refreshes the existing record.
pub fn merge_edge(existing: DependencyEdge, incoming: DependencyEdge) -> MergeOutcome {
    if existing.discovery_source == incoming.discovery_source {
        let mut retained = incoming;
        retained.id = existing.id;
        retained.created_at = existing.created_at;
        retained.confidence_score = confidence_score(
            retained.discovery_source,
            retained.observation_count.max(existing.observation_count + 1),
        );
        return MergeOutcome { retained, conflict: None };
    }

    let existing_wins = existing.discovery_source.priority() >= incoming.discovery_source.priority();
    let (mut retained, loser) = if existing_wins {
        (existing.clone(), incoming.discovery_source)
    } else {
        (incoming.clone(), existing.discovery_source)
    };

    retained.confidence_score = confidence_score(retained.discovery_source, retained.observation_count);

    let resolution = if existing_wins {
        format!(
            "kept {} (priority {}) over {} (priority {})",
            existing.discovery_source.as_str(),
            existing.discovery_source.priority(),
            incoming.discovery_source.as_str(),
            incoming.discovery_source.priority(),
        )
    } else {
        format!(
            "replaced {} (priority {}) with {} (priority {})",
            existing.discovery_source.as_str(),
            existing.discovery_source.priority(),
            incoming.discovery_source.as_str(),
            incoming.discovery_source.priority(),
        )
    };

    MergeOutcome {
        retained,
        conflict: Some(EdgeConflict {
            existing_source: existing.discovery_source,
            new_source: incoming.discovery_source,
            resolution: format!("{} [loser: {}]", resolution, loser.as_str()),
        }),
    }
}

/// Per-source base confidence plus a logarithmic boost from repeated
/// observation, clamped to `[0, 1]`.
pub fn confidence_score(source: DiscoverySource, observation_count: i64) -> f64 {
    let base = source.base_confidence();
    let boost = (0.02 * ((observation_count as f64) + 1.0).ln()).min(0.10);
    (base + boost).clamp(0.0, 1.0)
}

/// Given all edges observed for a single (source, target) pair across
/// discovery sources, fold them down to the one retained edge plus the list
/// of genuine conflicts encountered along the way.
pub fn merge_all(mut edges: Vec<DependencyEdge>) -> Option<(DependencyEdge, Vec<EdgeConflict>)> {
    if edges.is_empty() {
        return None;
    }
    edges.sort_by(|a, b| b.discovery_source.priority().cmp(&a.discovery_source.priority()));

    let mut conflicts = Vec::new();
    let mut iter = edges.into_iter();
    let mut retained = iter.next().unwrap();

    for next in iter {
        let outcome = merge_edge(retained, next);
        retained = outcome.retained;
        if let Some(conflict) = outcome.conflict {
            conflicts.push(conflict);
        }
    }

    Some((retained, conflicts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn edge(source: DiscoverySource, observation_count: i64) -> DependencyEdge {
        let now = Utc::now();
        DependencyEdge {
            id: Uuid::new_v4(),
            source_service_id: Uuid::new_v4(),
            target_service_id: Uuid::new_v4(),
            communication_mode: crate::models::CommunicationMode::Sync,
            criticality: crate::models::DependencyCriticality::Hard,
            protocol: None,
            timeout_ms: None,
            retry_config: None,
            discovery_source: source,
            confidence_score: source.base_confidence(),
            observation_count,
            redundant_group: None,
            last_observed_at: now,
            is_stale: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn manual_beats_service_mesh() {
        let existing = edge(DiscoverySource::ServiceMesh, 1);
        let incoming = edge(DiscoverySource::Manual, 1);
        let outcome = merge_edge(existing, incoming);
        assert_eq!(outcome.retained.discovery_source, DiscoverySource::Manual);
        assert!(outcome.conflict.is_some());
    }

    #[test]
    fn same_source_is_not_a_conflict() {
        let existing = edge(DiscoverySource::Kubernetes, 2);
        let incoming = edge(DiscoverySource::Kubernetes, 1);
        let outcome = merge_edge(existing.clone(), incoming);
        assert!(outcome.conflict.is_none());
        assert_eq!(outcome.retained.id, existing.id);
    }

    #[test]
    fn confidence_boost_is_bounded() {
        let low = confidence_score(DiscoverySource::Kubernetes, 1);
        let high = confidence_score(DiscoverySource::Kubernetes, 100_000);
        assert!(high > low);
        assert!(high <= 0.75 + 0.10 + 1e-9);
    }

    #[test]
    fn merge_all_picks_highest_priority_and_reports_rest_as_conflicts() {
        let edges = vec![
            edge(DiscoverySource::Kubernetes, 5),
            edge(DiscoverySource::OtelServiceGraph, 3),
            edge(DiscoverySource::Manual, 1),
        ];
        let (retained, conflicts) = merge_all(edges).unwrap();
        assert_eq!(retained.discovery_source, DiscoverySource::Manual);
        assert_eq!(conflicts.len(), 2);
    }
}
