//! Named origami silhouettes for the mesh overlay.
//!
//! Every shape is a table of fractional coordinates; [`generate`] scales the
//! table by the mesh dimensions, so identical inputs always produce identical
//! geometry.

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeName {
    Crane,
    Diamond,
    Plane,
    Iceland,
}

impl ShapeName {
    pub const ALL: [ShapeName; 4] = [
        ShapeName::Crane,
        ShapeName::Diamond,
        ShapeName::Plane,
        ShapeName::Iceland,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShapeName::Crane => "crane",
            ShapeName::Diamond => "diamond",
            ShapeName::Plane => "plane",
            ShapeName::Iceland => "iceland",
        }
    }

    /// Unknown names fall back to the crane.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "diamond" => ShapeName::Diamond,
            "plane" => ShapeName::Plane,
            "iceland" => ShapeName::Iceland,
            _ => ShapeName::Crane,
        }
    }
}

impl std::fmt::Display for ShapeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Crease = [Vec2; 2];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDefinition {
    pub name: ShapeName,
    pub outline: Vec<Vec2>,
    pub creases: Vec<Crease>,
}

/// Normalized island outline in [0, 1]², shared with the morph target raster.
pub const ICELAND_OUTLINE: [[f32; 2]; 18] = [
    [0.10, 0.42],
    [0.16, 0.32],
    [0.26, 0.22],
    [0.40, 0.20],
    [0.52, 0.16],
    [0.64, 0.18],
    [0.76, 0.22],
    [0.88, 0.30],
    [0.86, 0.44],
    [0.78, 0.56],
    [0.82, 0.70],
    [0.72, 0.78],
    [0.60, 0.82],
    [0.46, 0.84],
    [0.34, 0.80],
    [0.24, 0.74],
    [0.18, 0.64],
    [0.12, 0.56],
];

const ICELAND_STRETCH: [f32; 2] = [1.12, 1.22];

const CRANE_OUTLINE: [[f32; 2]; 12] = [
    [0.98, 0.0],
    [0.80, -0.05],
    [0.62, -0.14],
    [0.36, -0.44],
    [0.10, -0.10],
    [-0.72, -0.26],
    [-0.86, 0.0],
    [-0.72, 0.26],
    [0.10, 0.10],
    [0.36, 0.44],
    [0.62, 0.14],
    [0.80, 0.05],
];

const CRANE_CREASES: [[[f32; 2]; 2]; 7] = [
    [[-0.86, 0.0], [0.98, 0.0]],
    [[0.10, 0.0], [0.36, -0.44]],
    [[0.10, 0.0], [0.36, 0.44]],
    [[0.62, -0.14], [0.80, -0.05]],
    [[0.62, 0.14], [0.80, 0.05]],
    [[-0.72, -0.26], [-0.72, 0.26]],
    [[0.10, -0.10], [0.10, 0.10]],
];

const DIAMOND_OUTLINE: [[f32; 2]; 4] = [[0.0, -0.46], [0.64, 0.0], [0.0, 0.46], [-0.64, 0.0]];

const DIAMOND_CREASES: [[[f32; 2]; 2]; 4] = [
    [[0.0, -0.46], [0.0, 0.46]],
    [[-0.64, 0.0], [0.64, 0.0]],
    [[-0.32, -0.23], [0.32, 0.23]],
    [[-0.32, 0.23], [0.32, -0.23]],
];

const PLANE_OUTLINE: [[f32; 2]; 5] = [
    [-0.56, -0.05],
    [0.68, -0.26],
    [0.12, 0.0],
    [0.68, 0.26],
    [-0.56, 0.05],
];

const PLANE_CREASES: [[[f32; 2]; 2]; 4] = [
    [[-0.56, -0.05], [0.12, 0.0]],
    [[0.12, 0.0], [0.68, -0.26]],
    [[0.12, 0.0], [0.68, 0.26]],
    [[-0.56, 0.05], [0.12, 0.0]],
];

const ICELAND_CREASES: [[[f32; 2]; 2]; 3] = [
    [[-0.45, -0.10], [0.50, 0.12]],
    [[-0.38, 0.18], [0.44, -0.18]],
    [[-0.10, -0.46], [0.10, 0.46]],
];

/// How a template's outline coordinates map into mesh-local space.
enum OutlineSpace {
    /// Already centred; multiply by mesh size.
    Centered(&'static [[f32; 2]]),
    /// Normalized to [0, 1]²; recentre, then stretch.
    Normalized {
        points: &'static [[f32; 2]],
        stretch: [f32; 2],
    },
}

struct ShapeTemplate {
    outline: OutlineSpace,
    creases: &'static [[[f32; 2]; 2]],
}

fn template(name: ShapeName) -> ShapeTemplate {
    match name {
        ShapeName::Crane => ShapeTemplate {
            outline: OutlineSpace::Centered(&CRANE_OUTLINE),
            creases: &CRANE_CREASES,
        },
        ShapeName::Diamond => ShapeTemplate {
            outline: OutlineSpace::Centered(&DIAMOND_OUTLINE),
            creases: &DIAMOND_CREASES,
        },
        ShapeName::Plane => ShapeTemplate {
            outline: OutlineSpace::Centered(&PLANE_OUTLINE),
            creases: &PLANE_CREASES,
        },
        ShapeName::Iceland => ShapeTemplate {
            outline: OutlineSpace::Normalized {
                points: &ICELAND_OUTLINE,
                stretch: ICELAND_STRETCH,
            },
            creases: &ICELAND_CREASES,
        },
    }
}

#[inline]
fn scaled(p: [f32; 2], mesh_w: f32, mesh_h: f32) -> Vec2 {
    Vec2::new(p[0] * mesh_w, p[1] * mesh_h)
}

/// Outline and creases for `name`, in mesh-local units.
pub fn generate(name: ShapeName, mesh_w: f32, mesh_h: f32) -> ShapeDefinition {
    let template = template(name);
    let outline = match template.outline {
        OutlineSpace::Centered(points) => points
            .iter()
            .map(|p| scaled(*p, mesh_w, mesh_h))
            .collect(),
        OutlineSpace::Normalized { points, stretch } => points
            .iter()
            .map(|p| {
                Vec2::new(
                    (p[0] - 0.5) * mesh_w * stretch[0],
                    (p[1] - 0.5) * mesh_h * stretch[1],
                )
            })
            .collect(),
    };
    let creases = template
        .creases
        .iter()
        .map(|[a, b]| [scaled(*a, mesh_w, mesh_h), scaled(*b, mesh_w, mesh_h)])
        .collect();
    ShapeDefinition {
        name,
        outline,
        creases,
    }
}

/// The entry after `current` in `rotation`; shapes outside the rotation restart it.
pub fn next_in_rotation(rotation: &[ShapeName], current: ShapeName) -> ShapeName {
    match rotation.iter().position(|s| *s == current) {
        Some(i) => rotation[(i + 1) % rotation.len()],
        None => rotation.first().copied().unwrap_or(ShapeName::Crane),
    }
}
