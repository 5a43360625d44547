use glam::{vec3, Vec3};
use serde::Deserialize;

use crate::geometry::{Geometry, Indices, PrimitiveMode};

/// Built-in placeholder solids.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    #[default]
    Cone,
    Cube,
}

impl Shape {
    pub fn name(self) -> &'static str {
        match self {
            Shape::Cone => "cone",
            Shape::Cube => "cube",
        }
    }

    /// Placeholder geometry whose characteristic half size is `scale`.
    pub fn geometry(self, scale: f32) -> Geometry {
        match self {
            Shape::Cone => cone(scale),
            Shape::Cube => cube(scale),
        }
    }
}

const CUBE_VERTICES: [Vec3; 8] = [
    vec3(-0.5, -1.0, -2.0),
    vec3(0.5, -1.0, -2.0),
    vec3(0.5, 1.0, -2.0),
    vec3(-0.5, 1.0, -2.0),
    vec3(-0.5, -1.0, 2.0),
    vec3(0.5, -1.0, 2.0),
    vec3(0.5, 1.0, 2.0),
    vec3(-0.5, 1.0, 2.0),
];

#[rustfmt::skip]
const CUBE_INDICES: [u8; 36] = [
    0, 3, 1,  1, 3, 2,
    0, 4, 7,  0, 7, 3,
    4, 5, 6,  4, 6, 7,
    5, 1, 2,  5, 2, 6,
    2, 3, 6,  3, 7, 6,
    0, 1, 5,  0, 5, 4,
];

// The cone's base sits at -ASPECT_RATIO along z before scaling.
const CONE_ASPECT_RATIO: f32 = 2.0;

const CONE_VERTICES: [Vec3; 11] = [
    vec3(0.0, 0.0, 0.0),
    vec3(1.3, 0.0, -CONE_ASPECT_RATIO),
    vec3(0.809017, 0.587785, -CONE_ASPECT_RATIO),
    vec3(0.309017, 0.951057, -CONE_ASPECT_RATIO),
    vec3(-0.309017, 0.951057, -CONE_ASPECT_RATIO),
    vec3(-0.809017, 0.587785, -CONE_ASPECT_RATIO),
    vec3(-1.3, 0.0, -CONE_ASPECT_RATIO),
    vec3(-0.809017, -0.587785, -CONE_ASPECT_RATIO),
    vec3(-0.309017, -0.951057, -CONE_ASPECT_RATIO),
    vec3(0.309017, -0.951057, -CONE_ASPECT_RATIO),
    vec3(0.809017, -0.587785, -CONE_ASPECT_RATIO),
];

#[rustfmt::skip]
const CONE_INDICES: [u8; 30] = [
    0, 1, 2,  0, 2, 3,  0, 3, 4,  0, 4, 5,  0, 5, 6,
    0, 6, 7,  0, 7, 8,  0, 8, 9,  0, 9, 10, 0, 10, 1,
];

pub fn cube(scale: f32) -> Geometry {
    Geometry {
        name: "cube".to_string(),
        mode: PrimitiveMode::Triangles,
        indices: Indices::U8(CUBE_INDICES.to_vec()),
        vertices: CUBE_VERTICES.iter().map(|&v| v * scale).collect(),
    }
}

/// Cone with its apex at the origin, opening towards -z.
pub fn cone(scale: f32) -> Geometry {
    Geometry {
        name: "cone".to_string(),
        mode: PrimitiveMode::Triangles,
        indices: Indices::U8(CONE_INDICES.to_vec()),
        vertices: CONE_VERTICES
            .iter()
            .map(|&v| v * scale / CONE_ASPECT_RATIO)
            .collect(),
    }
}

/// Unit length line from the origin along `direction`.
pub fn beam(direction: Vec3) -> Geometry {
    Geometry {
        name: "beam".to_string(),
        mode: PrimitiveMode::Lines,
        indices: Indices::U8(vec![0, 1]),
        vertices: vec![Vec3::ZERO, direction],
    }
}
