//! BVH node implementation.

use std::fmt;

use crate::Aabb;

/// Position of a node in the pre-order numbering of its tree.
///
/// The root is `NodeId(0)`; an internal node's left child directly follows
/// it and its right child follows the whole left subtree. Ids are only
/// meaningful for the tree that assigned them and are used for upward
/// diagnostic walks, never for ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The id of the root node.
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in the BVH.
///
/// Leaves hold the store positions of their primitives; internal nodes own
/// exactly two children. A node's bounds are the union of its children's
/// bounds, or of its primitives' bounds for a leaf. The root is at depth 0
/// and each level adds one.
#[derive(Debug, Clone, PartialEq)]
pub enum BvhNode {
    Leaf {
        id: NodeId,
        parent: Option<NodeId>,
        bounds: Aabb,
        depth: usize,
        primitives: Vec<usize>,
    },
    Internal {
        id: NodeId,
        parent: Option<NodeId>,
        bounds: Aabb,
        depth: usize,
        /// Axis the split was made along (0 = x, 1 = y, 2 = z).
        axis: usize,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    #[inline]
    pub fn id(&self) -> NodeId {
        match self {
            BvhNode::Leaf { id, .. } | BvhNode::Internal { id, .. } => *id,
        }
    }

    /// Id of the parent node, `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        match self {
            BvhNode::Leaf { parent, .. } | BvhNode::Internal { parent, .. } => *parent,
        }
    }

    #[inline]
    pub fn bounds(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { bounds, .. } | BvhNode::Internal { bounds, .. } => bounds,
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        match self {
            BvhNode::Leaf { depth, .. } | BvhNode::Internal { depth, .. } => *depth,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }

    /// Store positions held by a leaf; empty for internal nodes.
    #[inline]
    pub fn primitives(&self) -> &[usize] {
        match self {
            BvhNode::Leaf { primitives, .. } => primitives.as_slice(),
            BvhNode::Internal { .. } => &[],
        }
    }

    #[inline]
    pub fn left(&self) -> Option<&BvhNode> {
        match self {
            BvhNode::Internal { left, .. } => Some(left.as_ref()),
            BvhNode::Leaf { .. } => None,
        }
    }

    #[inline]
    pub fn right(&self) -> Option<&BvhNode> {
        match self {
            BvhNode::Internal { right, .. } => Some(right.as_ref()),
            BvhNode::Leaf { .. } => None,
        }
    }

    /// Split axis of an internal node.
    #[inline]
    pub fn axis(&self) -> Option<usize> {
        match self {
            BvhNode::Internal { axis, .. } => Some(*axis),
            BvhNode::Leaf { .. } => None,
        }
    }

    /// Returns the total number of primitives in this subtree.
    pub fn primitive_count(&self) -> usize {
        match self {
            BvhNode::Leaf { primitives, .. } => primitives.len(),
            BvhNode::Internal { left, right, .. } => {
                left.primitive_count() + right.primitive_count()
            }
        }
    }

    /// Returns the number of nodes in this subtree, itself included.
    pub fn node_count(&self) -> usize {
        match self {
            BvhNode::Leaf { .. } => 1,
            BvhNode::Internal { left, right, .. } => 1 + left.node_count() + right.node_count(),
        }
    }

    /// Returns the number of levels of this subtree (1 for a leaf).
    pub fn height(&self) -> usize {
        match self {
            BvhNode::Leaf { .. } => 1,
            BvhNode::Internal { left, right, .. } => 1 + left.height().max(right.height()),
        }
    }

    /// Finds the node with the given id in this subtree.
    ///
    /// Follows the pre-order numbering, so only one root-to-node path is
    /// walked.
    pub fn find(&self, target: NodeId) -> Option<&BvhNode> {
        let mut current = self;
        loop {
            if current.id() == target {
                return Some(current);
            }
            match current {
                BvhNode::Leaf { .. } => return None,
                BvhNode::Internal { left, right, .. } => {
                    current = if target >= right.id() {
                        right.as_ref()
                    } else {
                        left.as_ref()
                    };
                }
            }
        }
    }

    /// Iterates over this subtree in pre-order.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }
}

/// Pre-order iterator over a subtree, see [`BvhNode::iter`].
pub struct PreOrder<'a> {
    stack: Vec<&'a BvhNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a BvhNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let BvhNode::Internal { left, right, .. } = node {
            self.stack.push(right);
            self.stack.push(left);
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn leaf(id: usize, parent: usize, depth: usize, primitives: Vec<usize>) -> BvhNode {
        BvhNode::Leaf {
            id: NodeId(id),
            parent: Some(NodeId(parent)),
            bounds: Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)),
            depth,
            primitives,
        }
    }

    // root(0) -> [internal(1) -> [leaf(2), leaf(3)], leaf(4)]
    fn sample_tree() -> BvhNode {
        let bounds = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let inner = BvhNode::Internal {
            id: NodeId(1),
            parent: Some(NodeId(0)),
            bounds,
            depth: 1,
            axis: 1,
            left: Box::new(leaf(2, 1, 2, vec![0, 1])),
            right: Box::new(leaf(3, 1, 2, vec![2])),
        };
        BvhNode::Internal {
            id: NodeId(0),
            parent: None,
            bounds,
            depth: 0,
            axis: 0,
            left: Box::new(inner),
            right: Box::new(leaf(4, 0, 1, vec![3, 4, 5])),
        }
    }

    #[test]
    fn leaf_accessors() {
        let node = leaf(0, 0, 0, vec![3, 7]);
        assert!(node.is_leaf());
        assert_eq!(node.primitives(), &[3, 7]);
        assert!(node.left().is_none());
        assert!(node.axis().is_none());
        assert_eq!(node.height(), 1);
    }

    #[test]
    fn counts_are_recursive() {
        let root = sample_tree();
        assert_eq!(root.primitive_count(), 6);
        assert_eq!(root.node_count(), 5);
        assert_eq!(root.height(), 3);
        assert!(root.primitives().is_empty());
    }

    #[test]
    fn find_follows_preorder_ids() {
        let root = sample_tree();
        for id in 0..5 {
            assert_eq!(root.find(NodeId(id)).map(BvhNode::id), Some(NodeId(id)));
        }
        assert!(root.find(NodeId(5)).is_none());
        assert_eq!(root.find(NodeId(3)).unwrap().parent(), Some(NodeId(1)));
    }

    #[test]
    fn preorder_iteration() {
        let ids: Vec<usize> = sample_tree().iter().map(|n| n.id().index()).collect();
        assert_eq!(ids, [0, 1, 2, 3, 4]);
    }
}
