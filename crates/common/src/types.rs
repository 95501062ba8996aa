use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Instance number of a reference site.
///
/// Unique within the plugin that declared it; two plugins may reuse the same number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct RefNum(pub u32);

/// Exterior grid coordinate of a cell. Interiors carry (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for GridCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Placement of a reference: world position plus Euler rotation in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
        }
    }
}

impl Placement {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

/// Case-fold an identifier. Record identifiers compare case-insensitively (ASCII only).
pub fn lowercase_id(id: &str) -> String {
    id.to_ascii_lowercase()
}
