//! Load-balancing strategies: how a popped batch is split into dispatch
//! groups and how many node selections each batch costs.

use crate::error::{LoadManagerError, Result};
use crate::job::{Job, Operation, Resource};
use crate::registry::BackendNode;
use crate::selector::Selector;

/// How jobs in a batch are assigned to backend nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Strategy {
    /// One node serves the whole batch; cheapest in selections.
    Mixed,
    /// One node per CRUD operation present in the batch.
    PerOperation,
    /// One node per resource type present in the batch.
    PerResource,
    /// One node per (resource, operation) pair; finest spread.
    PerResourceAndOperation,
}

/// One homogeneous (resource, operation) run of jobs bound for one node.
#[derive(Debug)]
pub struct DispatchGroup {
    pub node: BackendNode,
    pub resource: Resource,
    pub operation: Operation,
    pub jobs: Vec<Job>,
}

/// Split a batch into dispatch groups per the strategy.
///
/// Failure semantics differ by strategy: `Mixed` and
/// `PerResourceAndOperation` fail the whole batch when a selection comes up
/// empty, while `PerOperation` and `PerResource` skip just the affected
/// group and keep going.
pub fn plan(
    strategy: Strategy,
    jobs: Vec<Job>,
    selector: &dyn Selector,
    nodes: &[BackendNode],
) -> Result<Vec<DispatchGroup>> {
    if jobs.is_empty() {
        return Ok(Vec::new());
    }

    let mut groups = Vec::new();
    match strategy {
        Strategy::Mixed => {
            let node = selector
                .select_node(nodes)
                .ok_or(LoadManagerError::NoAvailableNodes)?;
            for (resource, by_resource) in split_by_resource(jobs) {
                for (operation, run) in split_by_operation(by_resource) {
                    groups.push(DispatchGroup {
                        node: node.clone(),
                        resource,
                        operation,
                        jobs: run,
                    });
                }
            }
        }
        Strategy::PerOperation => {
            for (operation, by_operation) in split_by_operation(jobs) {
                let Some(node) = selector.select_node(nodes) else {
                    tracing::warn!(%operation, "No node available, skipping operation group");
                    continue;
                };
                for (resource, run) in split_by_resource(by_operation) {
                    groups.push(DispatchGroup {
                        node: node.clone(),
                        resource,
                        operation,
                        jobs: run,
                    });
                }
            }
        }
        Strategy::PerResource => {
            for (resource, by_resource) in split_by_resource(jobs) {
                let Some(node) = selector.select_node(nodes) else {
                    tracing::warn!(%resource, "No node available, skipping resource group");
                    continue;
                };
                for (operation, run) in split_by_operation(by_resource) {
                    groups.push(DispatchGroup {
                        node: node.clone(),
                        resource,
                        operation,
                        jobs: run,
                    });
                }
            }
        }
        Strategy::PerResourceAndOperation => {
            for (operation, by_operation) in split_by_operation(jobs) {
                for (resource, run) in split_by_resource(by_operation) {
                    let node = selector
                        .select_node(nodes)
                        .ok_or(LoadManagerError::NoAvailableNodes)?;
                    groups.push(DispatchGroup {
                        node,
                        resource,
                        operation,
                        jobs: run,
                    });
                }
            }
        }
    }
    Ok(groups)
}

/// Bucket by resource in declaration order, yielding only non-empty buckets.
fn split_by_resource(jobs: Vec<Job>) -> impl Iterator<Item = (Resource, Vec<Job>)> {
    let mut buckets: [Vec<Job>; 3] = Default::default();
    for job in jobs {
        buckets[job.resource.index()].push(job);
    }
    Resource::ALL
        .into_iter()
        .zip(buckets)
        .filter(|(_, bucket)| !bucket.is_empty())
}

fn split_by_operation(jobs: Vec<Job>) -> impl Iterator<Item = (Operation, Vec<Job>)> {
    let mut buckets: [Vec<Job>; 4] = Default::default();
    for job in jobs {
        buckets[job.operation.index()].push(job);
    }
    Operation::ALL
        .into_iter()
        .zip(buckets)
        .filter(|(_, bucket)| !bucket.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::registry::Registry;
    use crate::selector::RoundRobin;

    /// Counts how many selections a plan costs.
    struct CountingSelector {
        inner: RoundRobin,
        calls: AtomicUsize,
    }

    impl CountingSelector {
        fn new() -> Self {
            Self {
                inner: RoundRobin::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::Relaxed)
        }
    }

    impl Selector for CountingSelector {
        fn select_node(&self, nodes: &[BackendNode]) -> Option<BackendNode> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.inner.select_node(nodes)
        }
    }

    fn nodes(count: usize) -> Vec<BackendNode> {
        let registry = Registry::new();
        for i in 0..count {
            registry.add(format!("node{i}"), 9100 + i as u16);
        }
        registry.all()
    }

    fn mixed_batch() -> Vec<Job> {
        vec![
            Job::new(Resource::User, Operation::Create, b"{}".to_vec()),
            Job::new(Resource::User, Operation::Create, b"{}".to_vec()),
            Job::new(Resource::User, Operation::Delete, b"{}".to_vec()),
            Job::new(Resource::Product, Operation::Create, b"{}".to_vec()),
            Job::new(Resource::Order, Operation::Update, b"{}".to_vec()),
        ]
    }

    #[test]
    fn mixed_selects_once_and_pins_the_whole_batch() {
        let nodes = nodes(3);
        let selector = CountingSelector::new();

        let groups = plan(Strategy::Mixed, mixed_batch(), &selector, &nodes).unwrap();

        assert_eq!(selector.calls(), 1);
        assert_eq!(groups.len(), 4); // user/create, user/delete, product/create, order/update
        assert!(groups.iter().all(|g| g.node.id == groups[0].node.id));
        assert_eq!(groups[0].jobs.len(), 2);
    }

    #[test]
    fn per_operation_selects_once_per_operation_present() {
        let nodes = nodes(3);
        let selector = CountingSelector::new();

        let groups = plan(Strategy::PerOperation, mixed_batch(), &selector, &nodes).unwrap();

        // Operations present: create, update, delete.
        assert_eq!(selector.calls(), 3);
        // Create splits into user + product runs sharing one node.
        let create_nodes: Vec<u64> = groups
            .iter()
            .filter(|g| g.operation == Operation::Create)
            .map(|g| g.node.id)
            .collect();
        assert_eq!(create_nodes.len(), 2);
        assert_eq!(create_nodes[0], create_nodes[1]);
    }

    #[test]
    fn per_resource_selects_once_per_resource_present() {
        let nodes = nodes(3);
        let selector = CountingSelector::new();

        let jobs = vec![
            Job::new(Resource::User, Operation::Create, b"{}".to_vec()),
            Job::new(Resource::User, Operation::Read, b"{}".to_vec()),
            Job::new(Resource::User, Operation::Create, b"{}".to_vec()),
            Job::new(Resource::User, Operation::Update, b"{}".to_vec()),
            Job::new(Resource::Product, Operation::Create, b"{}".to_vec()),
            Job::new(Resource::Product, Operation::Delete, b"{}".to_vec()),
        ];
        let groups = plan(Strategy::PerResource, jobs, &selector, &nodes).unwrap();

        assert_eq!(selector.calls(), 2);
        let user_nodes: Vec<u64> = groups
            .iter()
            .filter(|g| g.resource == Resource::User)
            .map(|g| g.node.id)
            .collect();
        assert_eq!(user_nodes.len(), 3);
        assert!(user_nodes.iter().all(|&id| id == user_nodes[0]));
    }

    #[test]
    fn per_resource_and_operation_selects_per_pair() {
        let nodes = nodes(3);
        let selector = CountingSelector::new();

        let groups = plan(
            Strategy::PerResourceAndOperation,
            mixed_batch(),
            &selector,
            &nodes,
        )
        .unwrap();

        assert_eq!(selector.calls(), 4);
        assert_eq!(groups.len(), 4);
        // Round-robin over three nodes across four picks: first pick repeats.
        assert_eq!(groups[0].node.id, groups[3].node.id);
    }

    #[test]
    fn mixed_fails_the_batch_when_no_nodes_exist() {
        let selector = CountingSelector::new();
        let err = plan(Strategy::Mixed, mixed_batch(), &selector, &[]).unwrap_err();
        assert!(matches!(err, LoadManagerError::NoAvailableNodes));
    }

    #[test]
    fn per_resource_and_operation_fails_the_batch_when_no_nodes_exist() {
        let selector = CountingSelector::new();
        let err = plan(
            Strategy::PerResourceAndOperation,
            mixed_batch(),
            &selector,
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, LoadManagerError::NoAvailableNodes));
    }

    #[test]
    fn per_operation_and_per_resource_skip_groups_when_no_nodes_exist() {
        let selector = CountingSelector::new();
        let groups = plan(Strategy::PerOperation, mixed_batch(), &selector, &[]).unwrap();
        assert!(groups.is_empty());

        let groups = plan(Strategy::PerResource, mixed_batch(), &selector, &[]).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn empty_batch_plans_no_groups_and_costs_no_selections() {
        let nodes = nodes(2);
        let selector = CountingSelector::new();
        let groups = plan(Strategy::Mixed, Vec::new(), &selector, &nodes).unwrap();
        assert!(groups.is_empty());
        assert_eq!(selector.calls(), 0);
    }
}
