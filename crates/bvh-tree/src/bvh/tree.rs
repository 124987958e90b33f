//! BVH container and construction.

use std::time::Instant;

use log::debug;

use crate::{Aabb, BuildConfig, PrimitiveStore};

use super::node::{BvhNode, NodeId};
use super::selector::{BuildEntry, LongestAxisMedian, SplitSelector, SurfaceAreaHeuristic};

/// A Bounding Volume Hierarchy over the primitives of a [`PrimitiveStore`].
///
/// The tree is immutable once built: any change to the primitive set is
/// handled by building a new tree. Leaves refer to primitives by their
/// position in the store, so a tree must be queried with the store state it
/// was built from.
///
/// # Construction
///
/// ```ignore
/// use bvh_tree::{Bvh, BuildConfig, PrimitiveStore};
///
/// let store: PrimitiveStore = /* ... */;
/// let bvh = Bvh::build(&store, &BuildConfig::default());
/// ```
///
/// Each node either becomes a leaf (few enough primitives, or maximum depth
/// reached) or is split in two by the surface area heuristic. When the
/// heuristic is disabled or finds no split with both sides non-empty, a
/// median split along the longest axis is used instead.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    root: Option<BvhNode>,
    primitive_count: usize,
    node_count: usize,
    config: BuildConfig,
}

impl Bvh {
    /// Creates an empty BVH.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a BVH over every primitive of `store`.
    ///
    /// Returns an empty tree if the store is empty. The result only depends
    /// on the store contents, their order and `config`.
    pub fn build<T>(store: &PrimitiveStore<T>, config: &BuildConfig) -> Self {
        let start = Instant::now();

        let entries: Vec<BuildEntry> = store
            .iter()
            .enumerate()
            .map(|(index, primitive)| BuildEntry::new(index, *primitive.bounds()))
            .collect();

        let primitive_count = entries.len();
        let root = if entries.is_empty() {
            None
        } else {
            let mut builder = Builder {
                config,
                next_id: 0,
            };
            Some(builder.build_node(entries, 0, None))
        };
        let node_count = root.as_ref().map_or(0, BvhNode::node_count);

        let bvh = Self {
            root,
            primitive_count,
            node_count,
            config: *config,
        };

        debug!(
            "built BVH: {} primitives, {} nodes, height {} in {:?}",
            bvh.primitive_count,
            bvh.node_count,
            bvh.height(),
            start.elapsed()
        );

        bvh
    }

    /// Returns `true` if the tree contains no primitives.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns a reference to the root node, if any.
    #[inline]
    pub fn root(&self) -> Option<&BvhNode> {
        self.root.as_ref()
    }

    /// Bounds of the whole tree.
    pub fn bounds(&self) -> Option<&Aabb> {
        self.root.as_ref().map(BvhNode::bounds)
    }

    /// The configuration the tree was built with.
    #[inline]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Returns the number of primitives the tree was built over.
    #[inline]
    pub fn primitive_count(&self) -> usize {
        self.primitive_count
    }

    /// Returns the number of nodes, leaves included.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Returns the number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.nodes().filter(|n| n.is_leaf()).count()
    }

    /// Returns the number of levels of the tree (0 for an empty tree).
    pub fn height(&self) -> usize {
        self.root.as_ref().map_or(0, BvhNode::height)
    }

    /// Iterates over all nodes in pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = &BvhNode> {
        self.root.iter().flat_map(BvhNode::iter)
    }

    /// Iterates over the leaves, left to right.
    pub fn leaves(&self) -> impl Iterator<Item = &BvhNode> {
        self.nodes().filter(|n| n.is_leaf())
    }

    /// Looks up a node by id.
    pub fn node(&self, id: NodeId) -> Option<&BvhNode> {
        self.root.as_ref()?.find(id)
    }

    /// Ids of the ancestors of `id`, from its parent up to the root.
    ///
    /// Empty for the root or for an id that is not in the tree.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = self.node(id).and_then(BvhNode::parent);
        while let Some(parent) = current {
            path.push(parent);
            current = self.node(parent).and_then(BvhNode::parent);
        }
        path
    }

    /// Panics if the tree breaks one of its structural invariants with
    /// respect to `store`:
    ///
    /// - a node's bounds differ from the union of its children's (or its
    ///   primitives') bounds,
    /// - a leaf holds more than `max_primitives_per_leaf` primitives
    ///   without being at `max_depth`,
    /// - a child's depth is not its parent's plus one, or its parent id
    ///   does not point back at its parent,
    /// - store positions are missing, repeated or out of range.
    pub fn assert_well_formed<T>(&self, store: &PrimitiveStore<T>) {
        let Some(root) = &self.root else {
            assert_eq!(self.primitive_count, 0, "empty tree with primitives");
            return;
        };

        assert_eq!(root.depth(), 0, "root must be at depth 0");
        assert_eq!(root.parent(), None, "root must not have a parent");
        assert_eq!(root.id(), NodeId::ROOT, "root must have id 0");
        assert_eq!(self.primitive_count, store.len(), "tree and store sizes differ");

        let mut seen = vec![false; store.len()];
        let mut expected_id = 0;
        for node in root.iter() {
            assert_eq!(node.id(), NodeId(expected_id), "ids must follow pre-order");
            expected_id += 1;

            match node {
                BvhNode::Leaf {
                    bounds,
                    depth,
                    primitives,
                    ..
                } => {
                    assert!(!primitives.is_empty(), "empty leaf {}", node.id());
                    assert!(
                        primitives.len() <= self.config.max_primitives_per_leaf
                            || *depth >= self.config.max_depth,
                        "leaf {} holds {} primitives at depth {}",
                        node.id(),
                        primitives.len(),
                        depth
                    );

                    let mut union = Aabb::invalid();
                    for &index in primitives {
                        let primitive = store
                            .get_index(index)
                            .unwrap_or_else(|| panic!("leaf {} refers to missing {}", node.id(), index));
                        assert!(!seen[index], "primitive {} stored twice", index);
                        seen[index] = true;
                        union.merge(primitive.bounds());
                    }
                    assert_eq!(*bounds, union, "leaf {} bounds mismatch", node.id());
                }
                BvhNode::Internal {
                    id,
                    bounds,
                    depth,
                    left,
                    right,
                    ..
                } => {
                    for child in [left, right] {
                        assert_eq!(child.depth(), depth + 1, "child depth under {}", id);
                        assert_eq!(child.parent(), Some(*id), "parent link under {}", id);
                    }
                    assert_eq!(
                        *bounds,
                        left.bounds().merged(right.bounds()),
                        "internal {} bounds mismatch",
                        id
                    );
                }
            }
        }

        assert_eq!(expected_id, self.node_count, "node count mismatch");
        assert!(seen.iter().all(|s| *s), "some primitives are not in any leaf");
    }
}

/// Recursive top-down builder state.
struct Builder<'a> {
    config: &'a BuildConfig,
    next_id: usize,
}

impl Builder<'_> {
    fn build_node(
        &mut self,
        mut entries: Vec<BuildEntry>,
        depth: usize,
        parent: Option<NodeId>,
    ) -> BvhNode {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        let bounds = entries
            .iter()
            .fold(Aabb::invalid(), |acc, e| acc.merged(&e.bounds));

        if entries.len() <= self.config.max_primitives_per_leaf || depth >= self.config.max_depth {
            return leaf(id, parent, bounds, depth, &entries);
        }

        let split = if self.config.use_cost_heuristic {
            SurfaceAreaHeuristic
                .select(&mut entries, &bounds, self.config)
                .or_else(|| LongestAxisMedian.select(&mut entries, &bounds, self.config))
        } else {
            LongestAxisMedian.select(&mut entries, &bounds, self.config)
        };

        let Some(split) = split.filter(|s| s.mid > 0 && s.mid < entries.len()) else {
            return leaf(id, parent, bounds, depth, &entries);
        };

        let right_entries = entries.split_off(split.mid);
        let left = self.build_node(entries, depth + 1, Some(id));
        let right = self.build_node(right_entries, depth + 1, Some(id));

        BvhNode::Internal {
            id,
            parent,
            bounds: left.bounds().merged(right.bounds()),
            depth,
            axis: split.axis,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

fn leaf(
    id: NodeId,
    parent: Option<NodeId>,
    bounds: Aabb,
    depth: usize,
    entries: &[BuildEntry],
) -> BvhNode {
    BvhNode::Leaf {
        id,
        parent,
        bounds,
        depth,
        primitives: entries.iter().map(|e| e.index).collect(),
    }
}
