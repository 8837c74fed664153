//! Top-down camera rendering.
use super::config::SandboxConfig;
use crate::types::{Location, RawImage, Transform};

pub(super) const GRASS: [u8; 4] = [40, 120, 40, 255];
pub(super) const ROAD: [u8; 4] = [90, 90, 90, 255];
pub(super) const LINE: [u8; 4] = [220, 220, 220, 255];
pub(super) const OBSTACLE: [u8; 4] = [40, 40, 200, 255];
pub(super) const VEHICLE: [u8; 4] = [200, 80, 40, 255];

/// Share of the view behind the camera.
const BEHIND: f32 = 0.2;

/// Renders the ground seen from above, aligned with the camera heading.
///
/// The top of the image is ahead of the camera, the right side of the image
/// is to the right of it. `vehicles` are the other vehicles in the world.
/// Pixels are in BGRA order.
pub(super) fn render(
    config: &SandboxConfig,
    vehicles: &[Location],
    camera: &Transform,
    width: u32,
    height: u32,
    frame: u64,
) -> RawImage {
    let mpp = config.view_width_m / width as f32;
    let line_half_width = 0.15f32.max(0.75 * mpp);
    let center_radius = config.center_radius();
    let vehicle_radius = config.physics.radius;

    let (sin, cos) = camera.rotation.yaw.to_radians().sin_cos();
    let (cx, cy) = (camera.location.x, camera.location.y);
    let behind = BEHIND * height as f32 * mpp;

    let mut raw_data = Vec::with_capacity((width * height * 4) as usize);
    for v in 0..height {
        let forward = (height as f32 - v as f32 - 0.5) * mpp - behind;
        for u in 0..width {
            let lateral = (u as f32 + 0.5 - 0.5 * width as f32) * mpp;
            let x = cx + forward * cos - lateral * sin;
            let y = cy + forward * sin + lateral * cos;

            let hit = |lx: f32, ly: f32, r: f32| (x - lx).powi(2) + (y - ly).powi(2) < r * r;
            let r = (x * x + y * y).sqrt();

            let px = if config.obstacles.iter().any(|o| hit(o.x, o.y, o.radius)) {
                OBSTACLE
            } else if vehicles.iter().any(|l| hit(l.x, l.y, vehicle_radius)) {
                VEHICLE
            } else if r < config.road_inner_radius || r > config.road_outer_radius {
                GRASS
            } else if (r - center_radius).abs() < line_half_width {
                LINE
            } else {
                ROAD
            };
            raw_data.extend_from_slice(&px);
        }
    }

    RawImage {
        frame,
        width,
        height,
        raw_data,
    }
}
