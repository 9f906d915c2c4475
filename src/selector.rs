use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

use crate::registry::BackendNode;

/// Policy for choosing one node out of a registry snapshot.
///
/// Implementations must be safe under concurrent invocation from many
/// workers. Returns `None` when the snapshot is empty.
pub trait Selector: Send + Sync {
    fn select_node(&self, nodes: &[BackendNode]) -> Option<BackendNode>;
}

/// Round-robin selection over the snapshot, in registration order.
///
/// Against a stable node set, N consecutive calls return each of N nodes
/// exactly once. If membership changes between calls each invocation sees a
/// differently shaped snapshot and fairness is only approximate — that is a
/// property of snapshot-based selection, not something this type papers over.
#[derive(Debug, Default)]
pub struct RoundRobin {
    next: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Selector for RoundRobin {
    fn select_node(&self, nodes: &[BackendNode]) -> Option<BackendNode> {
        if nodes.is_empty() {
            return None;
        }
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        Some(nodes[n % nodes.len()].clone())
    }
}

/// Uniformly random selection from the snapshot.
#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl Selector for Random {
    fn select_node(&self, nodes: &[BackendNode]) -> Option<BackendNode> {
        if nodes.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..nodes.len());
        Some(nodes[idx].clone())
    }
}

/// Closed set of selector policies selectable at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SelectorPolicy {
    RoundRobin,
    Random,
}

impl SelectorPolicy {
    pub fn build(self) -> std::sync::Arc<dyn Selector> {
        match self {
            SelectorPolicy::RoundRobin => std::sync::Arc::new(RoundRobin::new()),
            SelectorPolicy::Random => std::sync::Arc::new(Random::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn nodes(count: usize) -> Vec<BackendNode> {
        let registry = Registry::new();
        for i in 0..count {
            registry.add(format!("node{i}"), 9000 + i as u16);
        }
        registry.all()
    }

    #[test]
    fn round_robin_cycles_in_registration_order() {
        let nodes = nodes(3);
        let rr = RoundRobin::new();

        let picked: Vec<u64> = (0..6)
            .map(|_| rr.select_node(&nodes).unwrap().id)
            .collect();
        assert_eq!(
            picked,
            vec![
                nodes[0].id, nodes[1].id, nodes[2].id,
                nodes[0].id, nodes[1].id, nodes[2].id,
            ]
        );
    }

    #[test]
    fn round_robin_visits_each_node_exactly_once_per_cycle() {
        let nodes = nodes(5);
        let rr = RoundRobin::new();

        let mut picked: Vec<u64> = (0..5)
            .map(|_| rr.select_node(&nodes).unwrap().id)
            .collect();
        picked.sort_unstable();
        let mut expected: Vec<u64> = nodes.iter().map(|n| n.id).collect();
        expected.sort_unstable();
        assert_eq!(picked, expected);
    }

    #[test]
    fn empty_snapshot_selects_nothing() {
        assert!(RoundRobin::new().select_node(&[]).is_none());
        assert!(Random::new().select_node(&[]).is_none());
    }

    #[test]
    fn random_always_picks_a_registered_node() {
        let nodes = nodes(4);
        let ids: Vec<u64> = nodes.iter().map(|n| n.id).collect();
        let random = Random::new();
        for _ in 0..50 {
            let picked = random.select_node(&nodes).unwrap();
            assert!(ids.contains(&picked.id));
        }
    }
}
