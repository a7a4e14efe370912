use nalgebra::Point3;

/// Fraction of the base scale the ring swings either way.
pub const PULSE_AMPLITUDE: f64 = 0.1;
pub const PULSE_SPEED: f64 = 0.003;

/// Ground ring whose x/z scale oscillates around its base scale.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseRing {
    pub center: Point3<f64>,
    pub radius: f64,
    base_scale: f64,
    scale: f64,
    direction: f64,
    speed: f64,
}

impl PulseRing {
    pub fn new(center: Point3<f64>, radius: f64) -> Self {
        Self {
            center,
            radius,
            base_scale: 1.0,
            scale: 1.0,
            direction: 1.0,
            speed: PULSE_SPEED,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_growing(&self) -> bool {
        self.direction > 0.0
    }

    pub fn scaled_radius(&self) -> f64 {
        self.radius * self.scale
    }

    /// Advance one frame, reversing direction at either bound.
    pub fn step(&mut self) {
        let upper = self.base_scale * (1.0 + PULSE_AMPLITUDE);
        let lower = self.base_scale * (1.0 - PULSE_AMPLITUDE);

        if self.is_growing() {
            self.scale += self.speed;
            if self.scale >= upper {
                self.scale = upper;
                self.direction = -1.0;
            }
        } else {
            self.scale -= self.speed;
            if self.scale <= lower {
                self.scale = lower;
                self.direction = 1.0;
            }
        }
    }
}
