//! BVH navigation utilities for interactive visualization.

use bvh_tree::{Bvh, BvhNode, PrimitiveStore};
use macroquad::prelude::*;

use crate::{depth_color, draw_aabb, draw_primitive};

/// Child taken at each node in the navigation path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Interactive navigator for exploring the tree one subtree at a time.
pub struct TreeNavigator {
    path: Vec<Direction>,
    /// Draw the bounds of every node below the current one, not only its own.
    pub show_all_bounds: bool,
}

impl Default for TreeNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeNavigator {
    /// Creates a new navigator starting at the root.
    pub fn new() -> Self {
        Self {
            path: Vec::new(),
            show_all_bounds: true,
        }
    }

    pub fn path(&self) -> &[Direction] {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Attempts to navigate to the left child. Returns true if successful.
    pub fn go_left(&mut self, bvh: &Bvh) -> bool {
        self.go(bvh, Direction::Left)
    }

    /// Attempts to navigate to the right child. Returns true if successful.
    pub fn go_right(&mut self, bvh: &Bvh) -> bool {
        self.go(bvh, Direction::Right)
    }

    fn go(&mut self, bvh: &Bvh, direction: Direction) -> bool {
        let Some(node) = self.current_node(bvh) else {
            return false;
        };
        let child = match direction {
            Direction::Left => node.left(),
            Direction::Right => node.right(),
        };
        if child.is_some() {
            self.path.push(direction);
        }
        child.is_some()
    }

    /// Navigates to the parent node. Returns true if not already at root.
    pub fn go_parent(&mut self) -> bool {
        self.path.pop().is_some()
    }

    pub fn go_root(&mut self) {
        self.path.clear();
    }

    /// Handles keyboard input for navigation.
    /// Returns true if navigation state changed.
    pub fn update(&mut self, bvh: &Bvh) -> bool {
        let mut changed = false;

        if is_key_pressed(KeyCode::L) {
            changed = self.go_left(bvh);
        }
        if is_key_pressed(KeyCode::R) {
            changed = self.go_right(bvh);
        }
        if is_key_pressed(KeyCode::P) {
            changed = self.go_parent();
        }
        if is_key_pressed(KeyCode::T) && !self.path.is_empty() {
            self.go_root();
            changed = true;
        }
        if is_key_pressed(KeyCode::A) {
            self.show_all_bounds = !self.show_all_bounds;
        }

        changed
    }

    /// The node at the end of the path; `None` for an empty tree, or after
    /// the tree was rebuilt with a shape the path no longer fits.
    pub fn current_node<'a>(&self, bvh: &'a Bvh) -> Option<&'a BvhNode> {
        let mut current = bvh.root()?;
        for direction in &self.path {
            current = match direction {
                Direction::Left => current.left()?,
                Direction::Right => current.right()?,
            };
        }
        Some(current)
    }

    /// Draws the primitives and node bounds of the current subtree.
    pub fn render<T>(&self, bvh: &Bvh, store: &PrimitiveStore<T>) {
        let Some(node) = self.current_node(bvh) else {
            return;
        };

        for subtree_node in node.iter() {
            if self.show_all_bounds || subtree_node.id() == node.id() {
                draw_aabb(subtree_node.bounds(), depth_color(subtree_node.depth()));
            }
            for &index in subtree_node.primitives() {
                if let Some(primitive) = store.get_index(index) {
                    draw_primitive(primitive);
                }
            }
        }
    }

    /// Draws the navigation UI overlay.
    pub fn draw_ui(&self, bvh: &Bvh, y_offset: f32) {
        let (id, primitives, height, is_leaf) = match self.current_node(bvh) {
            Some(node) => (
                node.id().to_string(),
                node.primitive_count(),
                node.height(),
                node.is_leaf(),
            ),
            None => ("-".to_string(), 0, 0, true),
        };

        let path_str = if self.path.is_empty() {
            "root".to_string()
        } else {
            self.path
                .iter()
                .map(|d| match d {
                    Direction::Left => "L",
                    Direction::Right => "R",
                })
                .collect::<Vec<_>>()
                .join(" -> ")
        };

        draw_text(
            &format!("Node {id}: {primitives} primitives, height {height}"),
            10.0,
            y_offset,
            18.0,
            WHITE,
        );
        draw_text(
            &format!("Path: {} (depth {})", path_str, self.path.len()),
            10.0,
            y_offset + 20.0,
            18.0,
            YELLOW,
        );
        draw_text(
            if is_leaf { "(leaf)" } else { "Children: [L]eft [R]ight" },
            10.0,
            y_offset + 40.0,
            18.0,
            if is_leaf { ORANGE } else { GREEN },
        );
        draw_text(
            "[P]arent | [T]op | [A]ll bounds",
            10.0,
            y_offset + 60.0,
            16.0,
            DARKGRAY,
        );
    }
}
