//! Shared visualization utilities for BVH demos.

use std::hash::{Hash, Hasher};

use bvh_tree::{Aabb, Geometry, Primitive, PrimitiveId, Ray, RayHit, Triangle};
use macroquad::models::{draw_mesh, Mesh, Vertex};
use macroquad::prelude::*;
use nalgebra::Point3;

pub mod navigator;
pub use navigator::TreeNavigator;

/// Deterministic color for a primitive, derived from its id.
pub fn primitive_color(id: &PrimitiveId) -> Color {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let r = ((hash >> 16) & 0xFF) as u8;
    let g = ((hash >> 8) & 0xFF) as u8;
    let b = (hash & 0xFF) as u8;

    // Keep colors away from the background
    Color::from_rgba(r.max(40), g.max(40), b.max(40), 255)
}

/// Color of the bounds drawn for a node at `depth`.
pub fn depth_color(depth: usize) -> Color {
    const PALETTE: [Color; 6] = [WHITE, YELLOW, ORANGE, PINK, SKYBLUE, LIME];
    PALETTE[depth % PALETTE.len()]
}

pub fn vec3_from(point: &Point3<f32>) -> Vec3 {
    vec3(point.x, point.y, point.z)
}

/// Draws a filled triangle as a single-face mesh.
pub fn draw_triangle(triangle: &Triangle, color: Color) {
    let vertices = triangle
        .vertices()
        .iter()
        .map(|p| Vertex::new2(vec3_from(p), vec2(0.0, 0.0), color))
        .collect();

    let mesh = Mesh {
        vertices,
        indices: vec![0, 1, 2],
        texture: None,
    };

    draw_mesh(&mesh);
}

/// Draws the edges of an AABB.
pub fn draw_aabb(bounds: &Aabb, color: Color) {
    let size = bounds.size();
    draw_cube_wires(
        vec3_from(&bounds.center()),
        vec3(size.x, size.y, size.z),
        color,
    );
}

/// Draws a primitive: triangles filled, generic primitives as a solid box.
pub fn draw_primitive<T>(primitive: &Primitive<T>) {
    let color = primitive_color(primitive.id());
    match primitive.geometry() {
        Geometry::Triangle(triangle) => draw_triangle(triangle, color),
        Geometry::Bounds => {
            let bounds = primitive.bounds();
            let size = bounds.size();
            draw_cube(
                vec3_from(&bounds.center()),
                vec3(size.x, size.y, size.z),
                None,
                color,
            );
        }
    }
}

/// Draws a ray segment up to `length` and a marker at every hit.
pub fn draw_ray_hits<T>(ray: &Ray, hits: &[RayHit<'_, T>], length: f32) {
    draw_line_3d(
        vec3_from(&ray.origin),
        vec3_from(&ray.point_at(length)),
        RED,
    );
    for (i, hit) in hits.iter().enumerate() {
        let color = if i == 0 { GOLD } else { MAGENTA };
        draw_sphere(vec3_from(&ray.point_at(hit.distance)), 0.04, None, color);
    }
}

/// Simple orbit camera for 3D scene navigation.
pub struct OrbitCamera {
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub target: Vec3,
    /// Multiplier for scroll wheel zoom
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl OrbitCamera {
    pub fn new(distance: f32, yaw: f32, pitch: f32) -> Self {
        Self {
            distance,
            yaw,
            pitch,
            target: vec3(0.0, 0.0, 0.0),
            zoom_speed: 5.0,
            min_distance: 10.0,
            max_distance: 200.0,
        }
    }

    /// Sets the zoom speed and distance limits.
    pub fn with_zoom(mut self, speed: f32, min: f32, max: f32) -> Self {
        self.zoom_speed = speed;
        self.min_distance = min;
        self.max_distance = max;
        self
    }

    pub fn with_target(mut self, target: Vec3) -> Self {
        self.target = target;
        self
    }

    /// Updates camera state from mouse drag, scroll and arrow keys.
    pub fn update(&mut self) {
        if is_mouse_button_down(MouseButton::Left) {
            let delta = mouse_delta_position();
            self.yaw -= delta.x * 2.0;
            self.pitch -= delta.y * 2.0;
        }

        // Clamp pitch to avoid gimbal lock
        self.pitch = self.pitch.clamp(-1.5, 1.5);

        let scroll = mouse_wheel().1;
        self.distance -= scroll * self.zoom_speed;
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);

        if is_key_down(KeyCode::Left) {
            self.yaw += 0.02;
        }
        if is_key_down(KeyCode::Right) {
            self.yaw -= 0.02;
        }
        if is_key_down(KeyCode::Up) {
            self.pitch += 0.02;
        }
        if is_key_down(KeyCode::Down) {
            self.pitch -= 0.02;
        }
    }

    /// Returns the camera's world position.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + vec3(x, y, z)
    }

    pub fn to_camera3d(&self) -> Camera3D {
        Camera3D {
            position: self.position(),
            up: vec3(0.0, 1.0, 0.0),
            target: self.target,
            ..Default::default()
        }
    }

    /// The ray from the eye through the camera target.
    pub fn view_ray(&self) -> Ray {
        let eye = self.position();
        let dir = self.target - eye;
        Ray::new(
            Point3::new(eye.x, eye.y, eye.z),
            nalgebra::Vector3::new(dir.x, dir.y, dir.z),
        )
    }
}
