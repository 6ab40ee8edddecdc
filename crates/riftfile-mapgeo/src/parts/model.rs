//! Model, submesh and channel records.

use glam::{Mat4, Vec2, Vec3};

use super::vertex::Vertex;

#[cfg(feature = "json-export")]
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "json-export", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Smallest box containing all the given points; zero if there are none.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };
        let mut bb = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bb.min = bb.min.min(p);
            bb.max = bb.max.max(p);
        }
        bb
    }
}

/// A baked texture channel: lightmap, stationary light or paint override.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json-export", derive(Serialize, Deserialize))]
pub struct Channel {
    pub texture: String,
    pub scale: Vec2,
    pub bias: Vec2,
}

/// A contiguous index range of a model sharing one material.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json-export", derive(Serialize, Deserialize))]
pub struct Submesh {
    pub hash: u32,
    pub material: String,
    pub index_start: u32,
    pub index_count: u32,
    pub min_vertex: u32,
    pub max_vertex: u32,
}

/// One placed mesh instance of the map.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json-export", derive(Serialize, Deserialize))]
pub struct Model {
    /// Stored per model before version 12, synthesized `Instance_{i}` after.
    pub name: String,
    /// Vertex description id the model referenced in the source file.
    pub vertex_description_id: i32,
    /// Vertex buffer ids the model referenced in the source file.
    pub vertex_buffer_ids: Vec<i32>,
    /// Index buffer id the model referenced in the source file.
    pub index_buffer_id: i32,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    pub submeshes: Vec<Submesh>,
    pub flip_normals: bool,
    pub bounding_box: BoundingBox,
    pub transform: Mat4,
    pub quality: u8,
    /// Layer visibility bitmask (0xFF = visible on all layers).
    pub layer: u8,
    pub render_flags: u8,
    /// Hash linking the model to a bucket grid, version 15+.
    pub bucket_grid_hash: u32,
    /// Separate point light, legacy versions below 7 only.
    pub point_light: Option<Vec3>,
    /// Nine third-order light-probe coefficients, versions below 9 only.
    pub light_probes: Option<[f32; 27]>,
    pub baked_light: Channel,
    pub stationary_light: Option<Channel>,
    /// Baked paint overrides: at most one entry before version 17.
    pub texture_overrides: Vec<Channel>,
}

/// A planar reflection surface, version 13+.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json-export", derive(Serialize, Deserialize))]
pub struct PlanarReflector {
    pub transform: Mat4,
    pub bounds: BoundingBox,
    pub normal: Vec3,
}
