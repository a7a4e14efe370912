use nalgebra::{Point3, Vector3};

use crate::scene::geometry::Ray;

/// Perspective camera orbiting the origin at a fixed radius.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub radius: f64,
    /// Vertical field of view, radians.
    pub fov: f64,
    pub aspect: f64,
    pub near: f64,
    pub eye: Point3<f64>,
    pub target: Point3<f64>,
}

impl OrbitCamera {
    pub fn new(radius: f64, fov_degrees: f64, aspect: f64) -> Self {
        let mut camera = Self {
            radius,
            fov: fov_degrees.to_radians(),
            aspect,
            near: 0.1,
            eye: Point3::new(0.0, radius, 0.0),
            target: Point3::origin(),
        };
        camera.orbit(0.0, 0.0);
        camera
    }

    /// Place the eye on the sphere from (elevation, azimuth), looking at the target.
    pub fn orbit(&mut self, elevation: f64, azimuth: f64) {
        let phi = std::f64::consts::FRAC_PI_2 - elevation;
        self.eye = Point3::new(
            self.radius * phi.sin() * azimuth.cos(),
            self.radius * phi.cos(),
            self.radius * phi.sin() * azimuth.sin(),
        );
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = f64::from(width) / f64::from(height);
        }
    }

    fn basis(&self) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        let forward = (self.target - self.eye).normalize();
        let right = forward.cross(&Vector3::y()).normalize();
        let up = right.cross(&forward);
        (forward, right, up)
    }

    fn half_extents(&self) -> (f64, f64) {
        let half_height = (self.fov / 2.0).tan();
        (half_height * self.aspect, half_height)
    }

    /// Ray through normalized device coordinates (-1..1 on both axes, y up).
    pub fn ray_from_ndc(&self, ndc: (f64, f64)) -> Ray {
        let (forward, right, up) = self.basis();
        let (half_width, half_height) = self.half_extents();
        let direction = forward + right * (ndc.0 * half_width) + up * (ndc.1 * half_height);
        Ray::new(self.eye, direction)
    }

    /// Normalized device coordinates of a world point, `None` if it is behind
    /// the near plane.
    pub fn project(&self, point: &Point3<f64>) -> Option<(f64, f64)> {
        let (forward, right, up) = self.basis();
        let (half_width, half_height) = self.half_extents();
        let v = *point - self.eye;
        let depth = v.dot(&forward);
        if depth <= self.near {
            return None;
        }
        Some((
            v.dot(&right) / (depth * half_width),
            v.dot(&up) / (depth * half_height),
        ))
    }
}
