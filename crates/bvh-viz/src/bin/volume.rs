use bvh_tree::{Aabb, AabbQueryOptions, BuildConfig, BvhIndex, Primitive};
use bvh_viz::{draw_aabb, vec3_from, OrbitCamera};
use log::info;
use macroquad::prelude::*;
use nalgebra::{Point3, Vector3};

/// A grid of small boxes of varying height.
fn generate_grid(n: usize) -> Vec<Primitive<usize>> {
    (0..n * n)
        .map(|i| {
            let x = (i % n) as f32 - n as f32 / 2.0;
            let z = (i / n) as f32 - n as f32 / 2.0;
            let height = 0.2 + ((i * 7) % 5) as f32 * 0.15;
            Primitive::new(
                i,
                Aabb::new(
                    Point3::new(x + 0.1, 0.0, z + 0.1),
                    Point3::new(x + 0.9, height, z + 0.9),
                ),
            )
            .with_data(i)
        })
        .collect()
}

#[macroquad::main("BVH Volume Query")]
async fn main() {
    env_logger::init();

    let config = BuildConfig::default().with_max_primitives_per_leaf(2);
    let mut index = match BvhIndex::with_config(config) {
        Ok(index) => index,
        Err(err) => {
            log::error!("cannot create index: {err}");
            return;
        }
    };
    let report = index.insert_batch(generate_grid(12));
    info!(
        "stored {} boxes, tree height {}",
        report.stored(),
        index.bvh().height()
    );

    let mut camera = OrbitCamera::new(14.0, 0.5, 0.7).with_zoom(0.5, 4.0, 40.0);
    let mut center = Point3::new(0.0, 0.5, 0.0);
    let mut half = 1.5;
    let mut only_even = false;

    loop {
        camera.update();

        let step = 4.0 * get_frame_time();
        if is_key_down(KeyCode::W) {
            center.z -= step;
        }
        if is_key_down(KeyCode::S) {
            center.z += step;
        }
        if is_key_down(KeyCode::A) {
            center.x -= step;
        }
        if is_key_down(KeyCode::D) {
            center.x += step;
        }
        if is_key_pressed(KeyCode::Equal) {
            half += 0.25;
        }
        if is_key_pressed(KeyCode::Minus) {
            half = f32::max(half - 0.25, 0.25);
        }
        if is_key_pressed(KeyCode::E) {
            only_even = !only_even;
        }

        let query = Aabb::from_half_extents(center, Vector3::new(half, 1.0, half));
        let mut options = AabbQueryOptions::default();
        if only_even {
            options = options.with_filter(|p: &Primitive<usize>| p.data().is_some_and(|d| d % 2 == 0));
        }
        let found = index.aabb_intersection(&query, &options);

        clear_background(Color::from_rgba(20, 20, 30, 255));
        set_camera(&camera.to_camera3d());

        for primitive in index.primitives() {
            draw_aabb(primitive.bounds(), DARKGRAY);
        }
        for primitive in &found.primitives {
            let bounds = primitive.bounds();
            let size = bounds.size();
            draw_cube(
                vec3_from(&bounds.center()),
                vec3(size.x, size.y, size.z),
                None,
                GREEN,
            );
        }
        draw_aabb(&query, YELLOW);

        set_default_camera();

        draw_text(
            &format!("Found {} of {} boxes", found.count(), index.len()),
            10.0,
            25.0,
            20.0,
            WHITE,
        );
        draw_text(
            &format!(
                "Visited {} nodes, tested {} primitives",
                found.stats.nodes_visited, found.stats.primitives_tested
            ),
            10.0,
            45.0,
            18.0,
            GRAY,
        );
        draw_text(
            &format!(
                "[WASD] move | [+/-] resize | [E]ven only: {}",
                if only_even { "on" } else { "off" }
            ),
            10.0,
            70.0,
            16.0,
            DARKGRAY,
        );

        next_frame().await
    }
}
