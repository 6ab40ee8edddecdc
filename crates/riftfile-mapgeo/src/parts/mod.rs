//! Map geometry building blocks.

mod bucket;
mod model;
mod vertex;

pub use bucket::{Bucket, BucketGrid, GRID_FLAG_FACE_VISIBILITY};
pub use model::{BoundingBox, Channel, Model, PlanarReflector, Submesh};
pub use vertex::{
    ElementFormat, ElementName, FormatInfo, Vertex, VertexDescription, VertexElement,
    VertexValue, DESCRIPTION_SLOTS, FORMAT_INFO,
};
