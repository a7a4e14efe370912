use log::{debug, info};
use nalgebra::Point3;
use std::str::FromStr;
use tokio::sync::watch;

use crate::config::SceneConfig;
use crate::models::{InfoPanel, WarehouseTable};

pub mod camera;
pub mod geometry;
pub mod interaction;
pub mod layout;
pub mod pulse;

use camera::OrbitCamera;
use interaction::OrbitControl;
use layout::{Scene, SceneObject};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Pixel position inside the viewport to normalized device coordinates.
    pub fn to_ndc(&self, x: f64, y: f64) -> (f64, f64) {
        let width = f64::from(self.width.max(1));
        let height = f64::from(self.height.max(1));
        ((x / width) * 2.0 - 1.0, -(y / height) * 2.0 + 1.0)
    }

    pub fn to_pixels(&self, ndc: (f64, f64)) -> (f64, f64) {
        (
            (ndc.0 + 1.0) / 2.0 * f64::from(self.width),
            (1.0 - ndc.1) / 2.0 * f64::from(self.height),
        )
    }
}

/// What a tick produced, for the redraw that follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub index: u64,
    pub eye: Point3<f64>,
    pub hovering: bool,
}

/// Pointer and viewport input, in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneEvent {
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp,
    PointerLeave,
    Click { x: f64, y: f64 },
    Resize { width: u32, height: u32 },
}

fn parse_arg<T: FromStr>(arg: Option<&str>, line: &str) -> Result<T, String> {
    arg.and_then(|a| a.parse().ok())
        .ok_or_else(|| format!("malformed scene event: {}", line))
}

/// One event per line: `down X Y`, `move X Y`, `up`, `leave`, `click X Y`,
/// `resize W H`.
impl FromStr for SceneEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let event = match words.next().map(str::to_lowercase).as_deref() {
            Some("down") => SceneEvent::PointerDown {
                x: parse_arg(words.next(), s)?,
                y: parse_arg(words.next(), s)?,
            },
            Some("move") => SceneEvent::PointerMove {
                x: parse_arg(words.next(), s)?,
                y: parse_arg(words.next(), s)?,
            },
            Some("up") => SceneEvent::PointerUp,
            Some("leave") => SceneEvent::PointerLeave,
            Some("click") => SceneEvent::Click {
                x: parse_arg(words.next(), s)?,
                y: parse_arg(words.next(), s)?,
            },
            Some("resize") => SceneEvent::Resize {
                width: parse_arg(words.next(), s)?,
                height: parse_arg(words.next(), s)?,
            },
            _ => return Err(format!("unknown scene event: {}", s.trim())),
        };

        match words.next() {
            Some(_) => Err(format!("malformed scene event: {}", s.trim())),
            None => Ok(event),
        }
    }
}

/// Everything the interaction loop mutates, owned in one place.
pub struct SceneContext {
    scene: Scene,
    camera: OrbitCamera,
    control: OrbitControl,
    viewport: Viewport,
    pointer: Option<(f64, f64)>,
    hovered: Option<usize>,
    selected: Option<usize>,
    panel: InfoPanel,
    table: watch::Receiver<WarehouseTable>,
    frames: u64,
}

impl SceneContext {
    pub fn new(config: &SceneConfig, table: watch::Receiver<WarehouseTable>) -> Self {
        let viewport = Viewport {
            width: config.width,
            height: config.height,
        };
        let mut camera = OrbitCamera::new(config.radius, config.fov, 1.0);
        camera.set_aspect(viewport.width, viewport.height);
        let control = OrbitControl::new(config.drag_sensitivity, config.initial_elevation.to_radians());
        camera.orbit(control.elevation(), control.azimuth());

        Self {
            scene: Scene::warehouse_site(),
            camera,
            control,
            viewport,
            pointer: None,
            hovered: None,
            selected: None,
            panel: InfoPanel::default(),
            table,
            frames: 0,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn control(&self) -> &OrbitControl {
        &self.control
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn panel(&self) -> &InfoPanel {
        &self.panel
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Hover affordance: the pointer is over an interactive object.
    pub fn is_hovering(&self) -> bool {
        self.hovered.is_some()
    }

    pub fn hovered(&self) -> Option<&SceneObject> {
        self.hovered.map(|i| &self.scene.objects[i])
    }

    pub fn selected(&self) -> Option<&SceneObject> {
        self.selected.map(|i| &self.scene.objects[i])
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.control.pointer_down(x, y);
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        self.pointer = Some(self.viewport.to_ndc(x, y));
        self.control.pointer_move(x, y);
    }

    pub fn pointer_up(&mut self) {
        self.control.pointer_up();
    }

    pub fn pointer_leave(&mut self) {
        self.control.pointer_leave();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport { width, height };
        self.camera.set_aspect(width, height);
        debug!("Viewport resized to {}x{}", width, height);
    }

    /// Pixel position of a world point, `None` behind the camera.
    pub fn screen_position(&self, point: &Point3<f64>) -> Option<(f64, f64)> {
        self.camera
            .project(point)
            .map(|ndc| self.viewport.to_pixels(ndc))
    }

    /// Nearest interactive object under the given device coordinates.
    fn pick(&self, ndc: (f64, f64)) -> Option<usize> {
        let ray = self.camera.ray_from_ndc(ndc);
        self.scene
            .interactive()
            .filter_map(|(i, object)| ray.intersect_aabb(&object.bounds).map(|t| (i, t)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// One frame: pulse, camera, hover test.
    pub fn tick(&mut self) -> Frame {
        for ring in &mut self.scene.rings {
            ring.step();
        }
        self.camera.orbit(self.control.elevation(), self.control.azimuth());
        self.hovered = self.pointer.and_then(|ndc| self.pick(ndc));
        self.frames += 1;

        Frame {
            index: self.frames,
            eye: self.camera.eye,
            hovering: self.hovered.is_some(),
        }
    }

    /// Select the object under the pointer and fill the info panel from the
    /// latest warehouse table. A miss changes nothing.
    pub fn click(&mut self, x: f64, y: f64) -> Option<String> {
        let ndc = self.viewport.to_ndc(x, y);
        self.pointer = Some(ndc);
        let index = self.pick(ndc)?;

        let name = self.scene.objects[index].name.clone();
        let table = self.table.borrow();
        let record = table.get(&name);
        if record.is_none() {
            debug!("No warehouse data for {} (table version {})", name, table.version);
        }
        self.panel = InfoPanel::for_warehouse(&name, record);
        drop(table);

        self.selected = Some(index);
        info!("Selected {}", name);
        Some(name)
    }

    /// Dispatch one input event. Returns the selected warehouse for a click
    /// that hit one.
    pub fn apply(&mut self, event: SceneEvent) -> Option<String> {
        match event {
            SceneEvent::PointerDown { x, y } => self.pointer_down(x, y),
            SceneEvent::PointerMove { x, y } => self.pointer_move(x, y),
            SceneEvent::PointerUp => self.pointer_up(),
            SceneEvent::PointerLeave => self.pointer_leave(),
            SceneEvent::Click { x, y } => return self.click(x, y),
            SceneEvent::Resize { width, height } => self.resize(width, height),
        }
        None
    }

    /// Stop hook for the frame scheduler.
    pub fn teardown(&mut self) {
        self.control.pointer_leave();
        self.pointer = None;
        self.hovered = None;
        info!("Scene stopped after {} frames", self.frames);
    }
}
