use std::sync::Arc;

use glam::{Quat, Vec3};
use sunshade::prelude::*;

/// A tilted panel on a flat roof, with a parapet wall to the south and a
/// chimney to the east.
fn build_scene() -> (Scene, NodeId) {
    let mut scene = Scene::new();

    let roof = scene.add_mesh(
        Arc::new(MeshData::cuboid(Vec3::new(12.0, 0.2, 12.0))),
        Transform::from_position(Vec3::new(0.0, -0.1, 0.0)),
    );
    // The roof is below the panel and would only ever shade it from underneath.
    scene.set_casts_shadow(roof, false);

    let array = scene.add_group(Transform::from_position(Vec3::new(0.0, 0.4, 0.0)));
    let panel = scene.add_mesh(
        Arc::new(MeshData::panel(1.7, 1.0, 0.04)),
        Transform::identity().with_rotation(Quat::from_rotation_x(25f32.to_radians())),
    );
    scene.set_parent(panel, Some(array));

    scene.add_mesh(
        Arc::new(MeshData::cuboid(Vec3::new(8.0, 1.2, 0.2))),
        Transform::from_position(Vec3::new(0.0, 0.6, 2.5)),
    );
    scene.add_mesh(
        Arc::new(MeshData::cuboid(Vec3::new(0.6, 2.5, 0.6))),
        Transform::from_position(Vec3::new(2.2, 1.25, 0.3)),
    );

    (scene, panel)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (scene, panel) = build_scene();
    let ctx = WgpuContext::new_blocking()?;
    let config = CoverageConfig::new().resolution(1024);
    let mut calculator = CoverageCalculator::gpu(ctx, config)?;

    for azimuth in (60..=300).step_by(30) {
        let sun = SunLight::from_azimuth_elevation(azimuth as f32, 30.0, 1.0);
        // Every sweep step is a new sun position, so nothing cached applies.
        calculator.invalidate(Some(panel));
        let result = calculator.compute_coverage_blocking(&scene, &sun, panel)?;
        log::info!(
            "azimuth {azimuth:>3}°: {:>6.2}% shaded ({} of {} px){}",
            result.percent,
            result.shadowed_pixels,
            result.total_pixels,
            if result.is_advisory() { " [advisory]" } else { "" }
        );
    }

    let night = SunLight::from_azimuth_elevation(0.0, -12.0, 1.0);
    calculator.invalidate(Some(panel));
    let result = calculator.compute_coverage_blocking(&scene, &night, panel)?;
    log::info!("night: {:.2}% shaded", result.percent);

    calculator.dispose();
    Ok(())
}
