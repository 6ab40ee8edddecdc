//! MAPGEO map geometry file codec.
//!
//! MAPGEO files store the static environment geometry of one map: placed
//! mesh instances with shared vertex and index buffers, baked lighting
//! channels, spatial bucket grids for visibility culling, and planar
//! reflection surfaces. The format went through many revisions; the decoder
//! accepts every observed version (5 through 17) and normalizes them into
//! one in-memory model, while the encoder always emits the latest version.
//!
//! Vertex data is self-describing: each model references a vertex
//! description listing per-vertex attributes and their packing, and models
//! may spread a vertex's attributes across several buffers.
//!
//! # Example
//!
//! ```no_run
//! let geo = riftfile_mapgeo::read("base.mapgeo")?;
//! for model in &geo.models {
//!     println!("{}: {} vertices", model.name, model.vertices.len());
//! }
//! riftfile_mapgeo::write("copy.mapgeo", &geo)?;
//! # Ok::<(), riftfile_mapgeo::Error>(())
//! ```

mod error;
mod file;
pub mod parts;

use std::path::Path;

pub use error::{Error, Result};
pub use file::{MapGeometry, SUPPORTED_VERSIONS, WRITE_VERSION};

/// Read a map geometry file from disk.
pub fn read<P: AsRef<Path>>(path: P) -> Result<MapGeometry> {
    MapGeometry::from_file(path)
}

/// Write a map geometry file to disk at the latest supported version.
pub fn write<P: AsRef<Path>>(path: P, geo: &MapGeometry) -> Result<()> {
    geo.write_to_file(path)
}
