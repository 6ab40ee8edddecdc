//! Spatial bucket grids for coarse visibility culling.

use glam::Vec3;

#[cfg(feature = "json-export")]
use serde::{Deserialize, Serialize};

/// Grid header bit indicating a trailing face-visibility array.
pub const GRID_FLAG_FACE_VISIBILITY: u8 = 1;

/// One cell of a bucket grid: an index/vertex range into the grid's shared
/// flattened pools.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json-export", derive(Serialize, Deserialize))]
pub struct Bucket {
    pub max_stick_out_x: f32,
    pub max_stick_out_z: f32,
    pub start_index: u32,
    pub base_vertex: u32,
    pub inside_face_count: u16,
    pub sticking_out_face_count: u16,
}

/// A uniform spatial partition over one map's geometry.
///
/// `buckets` is always square: N rows of N cells, with N read from the
/// grid header.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json-export", derive(Serialize, Deserialize))]
pub struct BucketGrid {
    /// Hash linking models to this grid, version 15+ (zero before).
    pub hash: u32,
    pub min_x: f32,
    pub min_z: f32,
    pub max_x: f32,
    pub max_z: f32,
    pub max_out_stick_x: f32,
    pub max_out_stick_z: f32,
    pub bucket_size_x: f32,
    pub bucket_size_z: f32,
    pub is_disabled: bool,
    /// Raw header flags except the face-visibility bit, which is derived
    /// from `face_visibility` on encode.
    pub flags: u8,
    /// Shared vertex pool all buckets index into.
    pub vertices: Vec<Vec3>,
    /// Shared index pool all buckets index into.
    pub indices: Vec<u16>,
    /// N x N bucket cells.
    pub buckets: Vec<Vec<Bucket>>,
    /// One visibility mask byte per triangle, empty when absent.
    #[cfg_attr(
        feature = "json-export",
        serde(with = "riftfile_common::hex")
    )]
    pub face_visibility: Vec<u8>,
}

impl BucketGrid {
    /// Number of buckets along one side of the square grid.
    pub fn buckets_per_side(&self) -> usize {
        self.buckets.len()
    }
}
