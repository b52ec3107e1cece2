//! Hierarchical clustering trees over feature descriptors.
//!
//! A [`ClusterTree`] indexes the points of one extremum sign on one pyramid
//! level. Nodes live in a flat arena with the root at index 0; the children
//! of a branch occupy a contiguous index range after their parent. Branch
//! children carry the index of their medoid point so a query descriptor can
//! descend towards the closest leaves; leaves list the point indexes they
//! own. Every point index appears in exactly one leaf.

mod medoid;

pub use medoid::{MedoidClusterBuilder, MedoidClusterConfig};

use crate::detect::FeaturePoint;
use crate::util::{TargetIdxError, TargetIdxResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Node of a clustering tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterNode {
    /// Index of the medoid point this node was grouped around, if any.
    pub centre_point_index: Option<usize>,
    /// Arena index of the first child.
    pub first_child: usize,
    /// Number of children; zero for leaves.
    pub child_count: usize,
    /// Point indexes owned by a leaf; empty for branches.
    pub point_indexes: Vec<usize>,
}

impl ClusterNode {
    /// A leaf owning `point_indexes`.
    pub fn leaf(centre_point_index: Option<usize>, point_indexes: Vec<usize>) -> Self {
        Self {
            centre_point_index,
            first_child: 0,
            child_count: 0,
            point_indexes,
        }
    }

    /// Returns `true` for nodes without children.
    pub fn is_leaf(&self) -> bool {
        self.child_count == 0
    }

    /// Arena index range of the children.
    pub fn children(&self) -> Range<usize> {
        self.first_child..self.first_child + self.child_count
    }
}

/// Hierarchical index over a set of feature points.
///
/// Decoding validates the arena shape, so a deserialized tree is always a
/// proper tree rooted at node 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawClusterTree")]
pub struct ClusterTree {
    nodes: Vec<ClusterNode>,
}

#[derive(Deserialize)]
struct RawClusterTree {
    nodes: Vec<ClusterNode>,
}

impl TryFrom<RawClusterTree> for ClusterTree {
    type Error = TargetIdxError;

    fn try_from(raw: RawClusterTree) -> TargetIdxResult<Self> {
        Self::from_nodes(raw.nodes)
    }
}

impl ClusterTree {
    /// A tree over an empty point set.
    pub fn empty() -> Self {
        Self {
            nodes: vec![ClusterNode::leaf(None, Vec::new())],
        }
    }

    /// Builds a tree from an arena, checking that it forms a tree rooted at 0.
    ///
    /// Children must come after their parent and every non-root node must be
    /// claimed by exactly one parent. Branches own no points directly.
    pub fn from_nodes(nodes: Vec<ClusterNode>) -> TargetIdxResult<Self> {
        if nodes.is_empty() {
            return Err(TargetIdxError::InvalidInput("cluster tree has no root"));
        }
        let mut claimed = vec![false; nodes.len()];
        for (idx, node) in nodes.iter().enumerate() {
            if node.is_leaf() {
                continue;
            }
            if !node.point_indexes.is_empty() {
                return Err(TargetIdxError::InvalidInput("cluster branch owns points"));
            }
            let end = node
                .first_child
                .checked_add(node.child_count)
                .filter(|&end| node.first_child > idx && end <= nodes.len())
                .ok_or(TargetIdxError::InvalidInput("cluster child range out of order"))?;
            for child in node.first_child..end {
                if std::mem::replace(&mut claimed[child], true) {
                    return Err(TargetIdxError::InvalidInput("cluster node has two parents"));
                }
            }
        }
        if claimed.iter().skip(1).any(|&c| !c) {
            return Err(TargetIdxError::InvalidInput("cluster node is unreachable"));
        }
        Ok(Self { nodes })
    }

    /// The node arena; index 0 is the root.
    pub fn nodes(&self) -> &[ClusterNode] {
        &self.nodes
    }

    /// The root node.
    pub fn root(&self) -> &ClusterNode {
        &self.nodes[0]
    }

    /// All point indexes, leaf by leaf in arena order.
    pub fn point_indexes(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .filter(|node| node.is_leaf())
            .flat_map(|node| node.point_indexes.iter().copied())
            .collect()
    }

    /// Number of levels from the root to the deepest leaf.
    pub fn depth(&self) -> usize {
        let mut depths = vec![1usize; self.nodes.len()];
        for (idx, node) in self.nodes.iter().enumerate() {
            for child in node.children() {
                depths[child] = depths[idx] + 1;
            }
        }
        depths.into_iter().max().unwrap_or(0)
    }

    /// Checks that the leaves partition `0..point_count`.
    pub fn check_points(&self, point_count: usize) -> TargetIdxResult<()> {
        let mut seen = vec![false; point_count];
        let mut total = 0usize;
        for idx in self.point_indexes() {
            match seen.get_mut(idx) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(TargetIdxError::InvalidInput(
                        "cluster point index out of range or repeated",
                    ))
                }
            }
            total += 1;
        }
        if total != point_count {
            return Err(TargetIdxError::InvalidInput("cluster tree misses points"));
        }
        Ok(())
    }
}

/// Builds a clustering tree for a set of feature points.
pub trait ClusterIndexBuilder: Send + Sync {
    /// Builds a tree whose leaves reference indexes into `points`.
    fn build(&self, points: &[FeaturePoint]) -> TargetIdxResult<ClusterTree>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(first_child: usize, child_count: usize) -> ClusterNode {
        ClusterNode {
            centre_point_index: None,
            first_child,
            child_count,
            point_indexes: Vec::new(),
        }
    }

    #[test]
    fn arena_tree_reports_points_and_depth() {
        let tree = ClusterTree::from_nodes(vec![
            branch(1, 2),
            ClusterNode::leaf(Some(0), vec![0, 2]),
            branch(3, 1),
            ClusterNode::leaf(Some(1), vec![1]),
        ])
        .unwrap();
        assert_eq!(tree.point_indexes(), vec![0, 2, 1]);
        assert_eq!(tree.depth(), 3);
        assert!(tree.check_points(3).is_ok());
        assert!(tree.check_points(4).is_err());
    }

    #[test]
    fn malformed_arenas_are_rejected() {
        assert!(ClusterTree::from_nodes(Vec::new()).is_err());
        // Self-reference.
        assert!(ClusterTree::from_nodes(vec![branch(0, 1)]).is_err());
        // Range past the end.
        let short = vec![branch(1, 2), ClusterNode::leaf(None, vec![])];
        assert!(ClusterTree::from_nodes(short).is_err());
        // Node 2 claimed twice, node 3 never.
        let shared = vec![
            branch(1, 2),
            branch(2, 1),
            ClusterNode::leaf(None, vec![0]),
            ClusterNode::leaf(None, vec![1]),
        ];
        assert!(ClusterTree::from_nodes(shared).is_err());
    }

    #[test]
    fn repeated_point_index_fails_the_point_check() {
        let tree = ClusterTree::from_nodes(vec![
            branch(1, 2),
            ClusterNode::leaf(None, vec![0]),
            ClusterNode::leaf(None, vec![0]),
        ])
        .unwrap();
        assert!(tree.check_points(2).is_err());
    }
}
