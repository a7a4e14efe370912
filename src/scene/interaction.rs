use std::f64::consts::{FRAC_PI_3, TAU};

/// Vertical orbit limit, keeps the camera from flipping over the pole.
pub const MAX_ELEVATION: f64 = FRAC_PI_3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging { last_x: f64, last_y: f64 },
}

/// Pointer-drag orbit control.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControl {
    state: DragState,
    elevation: f64,
    azimuth: f64,
    sensitivity: f64,
}

impl OrbitControl {
    pub fn new(sensitivity: f64, elevation: f64) -> Self {
        Self {
            state: DragState::Idle,
            elevation: elevation.clamp(-MAX_ELEVATION, MAX_ELEVATION),
            azimuth: 0.0,
            sensitivity,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn elevation(&self) -> f64 {
        self.elevation
    }

    /// Always in `[0, 2π)`.
    pub fn azimuth(&self) -> f64 {
        self.azimuth
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.state = DragState::Dragging { last_x: x, last_y: y };
    }

    /// Returns whether the orbit angles changed.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        let DragState::Dragging { last_x, last_y } = self.state else {
            return false;
        };

        self.azimuth = (self.azimuth + (x - last_x) * self.sensitivity).rem_euclid(TAU);
        self.elevation = (self.elevation + (y - last_y) * self.sensitivity)
            .clamp(-MAX_ELEVATION, MAX_ELEVATION);
        self.state = DragState::Dragging { last_x: x, last_y: y };
        true
    }

    pub fn pointer_up(&mut self) {
        self.state = DragState::Idle;
    }

    pub fn pointer_leave(&mut self) {
        self.state = DragState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_state_machine() {
        let mut control = OrbitControl::new(0.01, 0.0);
        assert_eq!(control.state(), DragState::Idle);
        assert!(!control.pointer_move(10.0, 10.0));

        control.pointer_down(5.0, 5.0);
        assert!(control.is_dragging());
        assert!(control.pointer_move(15.0, 5.0));
        assert!((control.azimuth() - 0.1).abs() < 1e-12);

        control.pointer_up();
        assert_eq!(control.state(), DragState::Idle);

        control.pointer_down(0.0, 0.0);
        control.pointer_leave();
        assert!(!control.is_dragging());
        assert!(!control.pointer_move(500.0, 500.0));
        assert!((control.azimuth() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_elevation_is_clamped() {
        let mut control = OrbitControl::new(0.01, 0.0);
        control.pointer_down(0.0, 0.0);
        let mut y = 0.0;
        for _ in 0..500 {
            y += 37.0;
            control.pointer_move(0.0, y);
            assert!(control.elevation().abs() <= MAX_ELEVATION);
        }
        assert_eq!(control.elevation(), MAX_ELEVATION);

        control.pointer_move(0.0, -1.0e9);
        assert_eq!(control.elevation(), -MAX_ELEVATION);
    }

    #[test]
    fn test_clamped_elevation_responds_to_reverse_drag() {
        let mut control = OrbitControl::new(0.01, 0.0);
        control.pointer_down(0.0, 0.0);
        control.pointer_move(0.0, 10_000.0);
        control.pointer_move(0.0, 9_990.0);
        assert!((control.elevation() - (MAX_ELEVATION - 0.1)).abs() < 1e-12);
    }

    #[test]
    fn test_azimuth_wraps() {
        let mut control = OrbitControl::new(0.01, 0.0);
        control.pointer_down(0.0, 0.0);
        control.pointer_move(1000.0, 0.0);
        assert!((control.azimuth() - (10.0 - TAU)).abs() < 1e-9);

        control.pointer_move(0.0, 0.0);
        assert!((control.azimuth() - 0.0).abs() < 1e-9 || (control.azimuth() - TAU).abs() < 1e-9);

        control.pointer_move(-50.0, 0.0);
        assert!(control.azimuth() >= 0.0 && control.azimuth() < TAU);
        assert!((control.azimuth() - (TAU - 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_initial_elevation_is_clamped() {
        assert_eq!(OrbitControl::new(0.01, 3.0).elevation(), MAX_ELEVATION);
    }
}
