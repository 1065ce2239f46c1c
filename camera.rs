use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec2, Vec3};

pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(position: Vec3, aspect: f32) -> Self {
        Self {
            position,
            target: Vec3::ZERO,
            fov_y: 75f32.to_radians(),
            aspect,
            near: 0.1,
            far: 100_000.0,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view_matrix()
    }

    /// World-space ray from the eye through a point in normalised device coordinates.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let forward = (self.target - self.position).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        let half_height = (self.fov_y * 0.5).tan();
        let direction = forward
            + right * (ndc.x * half_height * self.aspect)
            + up * (ndc.y * half_height);
        Ray::new(self.position, direction)
    }
}

/// Maps a pixel position to normalised device coordinates, y up.
pub fn ndc_from_pixel(x: f32, y: f32, width: f32, height: f32) -> Vec2 {
    Vec2::new(x / width * 2.0 - 1.0, -(y / height) * 2.0 + 1.0)
}

#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Distance to the nearest intersection in front of the origin.
    pub fn intersect_sphere(&self, sphere: &Sphere) -> Option<f32> {
        let to_origin = self.origin - sphere.center;
        let b = to_origin.dot(self.direction);
        let c = to_origin.length_squared() - sphere.radius * sphere.radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let near = -b - root;
        let far = -b + root;
        if near >= 0.0 {
            Some(near)
        } else if far >= 0.0 {
            Some(far)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PointerMotion {
    /// Drag distance in pixels while the primary button is held.
    pub drag: Vec2,
    /// Wheel steps, positive towards the scene.
    pub scroll: f32,
}

/// User input is ignored while `enabled` is false.
pub struct OrbitControls {
    pub enabled: bool,
    pub target: Vec3,
    pub auto_rotate: bool,
    pub auto_rotate_speed: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            enabled: false,
            target: Vec3::ZERO,
            auto_rotate: true,
            auto_rotate_speed: 0.2,
            rotate_speed: 0.3,
            zoom_speed: 0.3,
            min_distance: 15.0,
            max_distance: 300.0,
        }
    }
}

impl OrbitControls {
    pub fn update(&self, camera: &mut Camera, dt: f32, motion: PointerMotion, viewport_height: f32) {
        let offset = camera.position - self.target;
        let mut radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        if self.auto_rotate {
            theta -= TAU / 60.0 * self.auto_rotate_speed * dt;
        }
        if self.enabled {
            let height = viewport_height.max(1.0);
            theta -= TAU * motion.drag.x / height * self.rotate_speed;
            phi -= TAU * motion.drag.y / height * self.rotate_speed;
            if motion.scroll != 0.0 {
                radius *= 0.95f32.powf(self.zoom_speed * motion.scroll);
            }
        }

        const EDGE: f32 = 1e-4;
        phi = phi.clamp(EDGE, PI - EDGE);
        radius = radius.clamp(self.min_distance, self.max_distance);
        camera.position = self.target
            + Vec3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
        camera.target = self.target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn central() -> Sphere {
        Sphere {
            center: Vec3::ZERO,
            radius: 10.0,
        }
    }

    #[test]
    fn centre_of_screen_hits_the_central_sphere() {
        let camera = Camera::new(Vec3::new(0.0, 20.0, 30.0), 16.0 / 9.0);
        let ray = camera.ray_from_ndc(Vec2::ZERO);
        let distance = ray.intersect_sphere(&central()).expect("hit");
        assert!((distance - (Vec3::new(0.0, 20.0, 30.0).length() - 10.0)).abs() < 1e-2);
    }

    #[test]
    fn screen_corner_misses_the_central_sphere() {
        let camera = Camera::new(Vec3::new(0.0, 20.0, 30.0), 16.0 / 9.0);
        let ray = camera.ray_from_ndc(Vec2::new(0.95, 0.95));
        assert!(ray.intersect_sphere(&central()).is_none());
    }

    #[test]
    fn sphere_behind_the_ray_is_not_hit() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 30.0), Vec3::Z);
        assert!(ray.intersect_sphere(&central()).is_none());
    }

    #[test]
    fn pixel_mapping_is_y_up() {
        let ndc = ndc_from_pixel(0.0, 0.0, 800.0, 600.0);
        assert_eq!(ndc, Vec2::new(-1.0, 1.0));
        assert_eq!(ndc_from_pixel(400.0, 300.0, 800.0, 600.0), Vec2::ZERO);
    }

    #[test]
    fn auto_rotation_keeps_distance() {
        let controls = OrbitControls::default();
        let mut camera = Camera::new(Vec3::new(0.0, 20.0, 30.0), 1.0);
        let before = camera.position;
        controls.update(&mut camera, 1.0, PointerMotion::default(), 600.0);
        assert!((camera.position.length() - before.length()).abs() < 1e-3);
        assert!(camera.position.distance(before) > 0.0);
    }

    #[test]
    fn disabled_controls_ignore_zoom() {
        let mut controls = OrbitControls {
            auto_rotate: false,
            ..OrbitControls::default()
        };
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 100.0), 1.0);
        let zoom = PointerMotion {
            drag: Vec2::ZERO,
            scroll: 400.0,
        };
        controls.update(&mut camera, 0.016, zoom, 600.0);
        assert!((camera.position.length() - 100.0).abs() < 1e-3);

        controls.enabled = true;
        controls.update(&mut camera, 0.016, zoom, 600.0);
        assert!((camera.position.length() - 15.0).abs() < 1e-3);
    }
}
