//! Rendering value objects
//!
//! Plain data exchanged between the `engine` script module and the
//! rendering collaborator. Validation happens here so every renderer
//! receives already-checked values.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of floats per vertex in `drawGeometry` input: position (3) + color (3).
pub const VERTEX_STRIDE: usize = 6;

/// Highest light slot index accepted by `setLight`.
pub const MAX_LIGHT_INDEX: usize = 7;

/// Errors raised when script-supplied render data is malformed.
#[derive(Debug, Error, PartialEq)]
pub enum RenderDataError {
    #[error("light index {0} out of range (expected 0..={MAX_LIGHT_INDEX})")]
    LightIndexOutOfRange(i64),

    #[error("light property '{name}' expects {min}..={max} components, got {actual}")]
    ComponentCount {
        name: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("vertex data must be a non-empty multiple of {VERTEX_STRIDE} numbers, got {0}")]
    VertexCount(usize),
}

/// RGBA color with components clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
            a: a.clamp(0.0, 1.0),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Interleaved triangle vertex data (`x, y, z, r, g, b` per vertex).
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    vertices: Vec<f32>,
}

impl Geometry {
    pub fn new(vertices: Vec<f32>) -> Result<Self, RenderDataError> {
        if vertices.is_empty() || vertices.len() % VERTEX_STRIDE != 0 {
            return Err(RenderDataError::VertexCount(vertices.len()));
        }
        Ok(Self { vertices })
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }
}

/// Fixed-function light parameters for one light slot.
///
/// Vector properties are optional; scalars left as `None` keep the
/// renderer's current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightProperties {
    pub position: Option<Vec<f32>>,
    pub ambient: Option<Vec<f32>>,
    pub diffuse: Option<Vec<f32>>,
    pub specular: Option<Vec<f32>>,
    pub spot_direction: Option<Vec<f32>>,
    pub spot_exponent: Option<f32>,
    pub spot_cutoff: Option<f32>,
    pub constant_attenuation: Option<f32>,
    pub linear_attenuation: Option<f32>,
    pub quadratic_attenuation: Option<f32>,
}

impl LightProperties {
    /// Check component counts of every vector property that is set.
    pub fn validate(&self) -> Result<(), RenderDataError> {
        let vectors: [(&'static str, &Option<Vec<f32>>, usize, usize); 5] = [
            ("position", &self.position, 3, 4),
            ("ambient", &self.ambient, 3, 4),
            ("diffuse", &self.diffuse, 3, 4),
            ("specular", &self.specular, 3, 4),
            ("spotDirection", &self.spot_direction, 3, 3),
        ];
        for (name, value, min, max) in vectors {
            if let Some(components) = value
                && !(min..=max).contains(&components.len())
            {
                return Err(RenderDataError::ComponentCount {
                    name,
                    min,
                    max,
                    actual: components.len(),
                });
            }
        }
        Ok(())
    }
}

/// A validated light slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightIndex(usize);

impl LightIndex {
    pub fn new(index: i64) -> Result<Self, RenderDataError> {
        if (0..=MAX_LIGHT_INDEX as i64).contains(&index) {
            Ok(Self(index as usize))
        } else {
            Err(RenderDataError::LightIndexOutOfRange(index))
        }
    }

    pub fn get(&self) -> usize {
        self.0
    }
}
