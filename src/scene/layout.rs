use nalgebra::{Point3, Vector3};

use crate::scene::geometry::Aabb;
use crate::scene::pulse::PulseRing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Warehouse,
    Office,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    pub bounds: Aabb,
}

impl SceneObject {
    pub fn is_interactive(&self) -> bool {
        self.kind == ObjectKind::Warehouse
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
    pub rings: Vec<PulseRing>,
    /// Half the side of the square ground plane.
    pub ground_extent: f64,
}

const WAREHOUSE_SIZE: [f64; 3] = [40.0, 10.0, 25.0];
const OFFICE_SIZE: [f64; 3] = [60.0, 25.0, 30.0];
const RING_RADIUS: f64 = 40.0;

/// Ground-plane (x, z) of each warehouse, two rows of four.
const WAREHOUSES: [(&str, f64, f64); 8] = [
    ("1号仓", -100.0, -50.0),
    ("2号仓", -30.0, -50.0),
    ("3号仓", 40.0, -50.0),
    ("4号仓", 110.0, -50.0),
    ("5号仓", -100.0, 30.0),
    ("6号仓", -30.0, 30.0),
    ("7号仓", 40.0, 30.0),
    ("8号仓", 110.0, 30.0),
];

fn on_ground(x: f64, z: f64, size: [f64; 3]) -> Aabb {
    Aabb::from_center(
        Point3::new(x, size[1] / 2.0, z),
        Vector3::new(size[0], size[1], size[2]),
    )
}

impl Scene {
    pub fn warehouse_site() -> Self {
        let mut objects: Vec<SceneObject> = WAREHOUSES
            .iter()
            .map(|(name, x, z)| SceneObject {
                name: name.to_string(),
                kind: ObjectKind::Warehouse,
                bounds: on_ground(*x, *z, WAREHOUSE_SIZE),
            })
            .collect();

        objects.push(SceneObject {
            name: "办公楼".to_string(),
            kind: ObjectKind::Office,
            bounds: on_ground(-150.0, 0.0, OFFICE_SIZE),
        });

        let rings = WAREHOUSES
            .iter()
            .map(|(_, x, z)| PulseRing::new(Point3::new(*x, 0.1, *z), RING_RADIUS))
            .collect();

        Self {
            objects,
            rings,
            ground_extent: 400.0,
        }
    }

    pub fn interactive(&self) -> impl Iterator<Item = (usize, &SceneObject)> {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, object)| object.is_interactive())
    }

    pub fn find(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.name == name)
    }
}
