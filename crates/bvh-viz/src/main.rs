use bvh_tree::{
    Aabb, BuildConfig, BvhIndex, FnObserver, IndexEvent, Primitive, RayQueryOptions,
};
use bvh_viz::{draw_ray_hits, OrbitCamera, TreeNavigator};
use log::{debug, error, info};
use macroquad::prelude::*;
use nalgebra::Point3;

/// A floor of triangles with a few crates standing on it.
fn generate_scene() -> Vec<Primitive> {
    let mut primitives = Vec::new();

    for i in 0..8 {
        for j in 0..8 {
            let x = i as f32 - 4.0;
            let z = j as f32 - 4.0;
            let a = Point3::new(x, -1.0, z);
            let b = Point3::new(x + 1.0, -1.0, z);
            let c = Point3::new(x + 1.0, -1.0, z + 1.0);
            let d = Point3::new(x, -1.0, z + 1.0);
            primitives.push(Primitive::triangle(format!("floor-{i}-{j}-a"), a, b, c));
            primitives.push(Primitive::triangle(format!("floor-{i}-{j}-b"), a, c, d));
        }
    }

    for (i, (x, z)) in [(-2.5, -1.5), (1.0, 2.0), (2.5, -2.5), (-1.0, 1.5)]
        .into_iter()
        .enumerate()
    {
        let height = 0.4 + i as f32 * 0.3;
        primitives.push(Primitive::new(
            format!("crate-{i}"),
            Aabb::new(
                Point3::new(x - 0.4, -1.0, z - 0.4),
                Point3::new(x + 0.4, -1.0 + height, z + 0.4),
            ),
        ));
    }

    primitives
}

#[macroquad::main("BVH Visualization")]
async fn main() {
    env_logger::init();

    let observer = FnObserver::new(|event: &IndexEvent| match event {
        IndexEvent::Rebuilt {
            primitive_count,
            node_count,
            height,
        } => info!("rebuilt: {primitive_count} primitives, {node_count} nodes, height {height}"),
        other => debug!("{other:?}"),
    });

    let config = BuildConfig::default();
    let mut index = match BvhIndex::with_observer(config, observer) {
        Ok(index) => index,
        Err(err) => {
            error!("cannot create index: {err}");
            return;
        }
    };
    let report = index.insert_batch(generate_scene());
    info!("stored {} primitives", report.stored());

    let mut camera = OrbitCamera::new(9.0, 0.6, 0.5).with_zoom(0.5, 2.0, 30.0);
    let mut navigator = TreeNavigator::new();
    let mut ray = None;

    loop {
        camera.update();
        navigator.update(index.bvh());

        if is_key_pressed(KeyCode::Space) {
            ray = Some(camera.view_ray());
        }
        if is_key_pressed(KeyCode::C) {
            ray = None;
        }

        clear_background(Color::from_rgba(20, 20, 30, 255));
        set_camera(&camera.to_camera3d());

        navigator.render(index.bvh(), index.store());

        let mut hit_count = 0;
        if let Some(ray) = &ray {
            let result = index.ray_intersection(ray, &RayQueryOptions::default());
            hit_count = result.count();
            draw_ray_hits(ray, &result.hits, 40.0);
        }

        draw_line_3d(vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), RED);
        draw_line_3d(vec3(0.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0), GREEN);
        draw_line_3d(vec3(0.0, 0.0, 0.0), vec3(0.0, 0.0, 1.0), BLUE);

        set_default_camera();

        let bvh = index.bvh();
        draw_text(
            &format!("BVH - {} primitives", bvh.primitive_count()),
            10.0,
            25.0,
            20.0,
            WHITE,
        );
        draw_text(
            &format!(
                "Nodes: {} | Leaves: {} | Height: {}",
                bvh.node_count(),
                bvh.leaf_count(),
                bvh.height()
            ),
            10.0,
            45.0,
            18.0,
            GRAY,
        );

        navigator.draw_ui(bvh, 70.0);

        draw_text(
            &format!("[Space] cast ray ({hit_count} hits) | [C]lear ray"),
            10.0,
            155.0,
            16.0,
            DARKGRAY,
        );
        draw_text("Drag mouse to rotate, scroll to zoom", 10.0, 175.0, 16.0, DARKGRAY);
        draw_text(&format!("FPS: {}", get_fps()), 10.0, 195.0, 16.0, DARKGRAY);

        next_frame().await
    }
}
