//! Hierarchical k-medoids clustering over Hamming distance.

use crate::cluster::{ClusterIndexBuilder, ClusterNode, ClusterTree};
use crate::detect::FeaturePoint;
use crate::util::math::{hamming, Lcg};
use crate::util::{TargetIdxError, TargetIdxResult};
use std::collections::VecDeque;

/// Configuration for [`MedoidClusterBuilder`].
#[derive(Clone, Debug)]
pub struct MedoidClusterConfig {
    /// Number of clusters per interior node.
    pub branching: usize,
    /// Nodes with at most this many points become leaves.
    pub min_points_per_node: usize,
    /// Random medoid sets tried per node; the cheapest assignment wins.
    pub hypotheses: usize,
    /// Seed for medoid sampling.
    pub seed: u64,
}

impl Default for MedoidClusterConfig {
    fn default() -> Self {
        Self {
            branching: 8,
            min_points_per_node: 16,
            hypotheses: 32,
            seed: 0x00c1_5eed,
        }
    }
}

/// Deterministic hierarchical k-medoids builder.
#[derive(Clone, Debug, Default)]
pub struct MedoidClusterBuilder {
    cfg: MedoidClusterConfig,
}

impl MedoidClusterBuilder {
    /// Creates a builder, validating the configuration.
    pub fn new(cfg: MedoidClusterConfig) -> TargetIdxResult<Self> {
        if cfg.branching < 2 {
            return Err(TargetIdxError::InvalidInput("branching must be at least 2"));
        }
        if cfg.hypotheses == 0 {
            return Err(TargetIdxError::InvalidInput("hypotheses must be positive"));
        }
        Ok(Self { cfg })
    }

    /// Splits `indexes` around sampled medoids, or returns `None` for a leaf.
    fn split(
        &self,
        points: &[FeaturePoint],
        indexes: &[usize],
        rng: &mut Lcg,
    ) -> Option<Vec<(usize, Vec<usize>)>> {
        let leaf_limit = self.cfg.min_points_per_node.max(self.cfg.branching);
        if indexes.len() <= leaf_limit {
            return None;
        }

        let mut best: Option<(u64, Vec<usize>, Vec<usize>)> = None;
        for _ in 0..self.cfg.hypotheses {
            let medoids = sample_distinct(indexes, self.cfg.branching, rng);
            let mut cost = 0u64;
            let assignment: Vec<usize> = indexes
                .iter()
                .map(|&idx| {
                    let (slot, dist) = nearest(points, &medoids, idx);
                    cost += u64::from(dist);
                    slot
                })
                .collect();
            if best.as_ref().map_or(true, |(c, _, _)| cost < *c) {
                best = Some((cost, medoids, assignment));
            }
        }
        let (_, medoids, assignment) = best?;

        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); medoids.len()];
        for (&idx, &slot) in indexes.iter().zip(assignment.iter()) {
            groups[slot].push(idx);
        }
        if groups.iter().filter(|g| !g.is_empty()).count() < 2 {
            // Identical descriptors cannot be split further.
            return None;
        }
        Some(
            medoids
                .into_iter()
                .zip(groups)
                .filter(|(_, group)| !group.is_empty())
                .collect(),
        )
    }
}

impl ClusterIndexBuilder for MedoidClusterBuilder {
    fn build(&self, points: &[FeaturePoint]) -> TargetIdxResult<ClusterTree> {
        let mut rng = Lcg::new(self.cfg.seed);
        let mut nodes = vec![ClusterNode::leaf(None, Vec::new())];
        let mut pending = VecDeque::from([(0usize, (0..points.len()).collect::<Vec<_>>())]);

        // Breadth-first, so each branch's children are appended contiguously.
        while let Some((node, indexes)) = pending.pop_front() {
            match self.split(points, &indexes, &mut rng) {
                None => nodes[node].point_indexes = indexes,
                Some(children) => {
                    nodes[node].first_child = nodes.len();
                    nodes[node].child_count = children.len();
                    for (medoid, group) in children {
                        pending.push_back((nodes.len(), group));
                        nodes.push(ClusterNode::leaf(Some(medoid), Vec::new()));
                    }
                }
            }
        }
        ClusterTree::from_nodes(nodes)
    }
}

fn sample_distinct(indexes: &[usize], k: usize, rng: &mut Lcg) -> Vec<usize> {
    let mut pool = indexes.to_vec();
    let k = k.min(pool.len());
    for i in 0..k {
        let j = i + rng.next_below(pool.len() - i);
        pool.swap(i, j);
    }
    pool.truncate(k);
    pool
}

/// Returns the slot of the closest medoid and its distance; ties go to the lower slot.
fn nearest(points: &[FeaturePoint], medoids: &[usize], idx: usize) -> (usize, u32) {
    let descriptor = &points[idx].descriptor;
    medoids
        .iter()
        .enumerate()
        .map(|(slot, &m)| (slot, hamming(descriptor, &points[m].descriptor)))
        .min_by_key(|&(slot, dist)| (dist, slot))
        .unwrap_or((0, 0))
}
