//! Error types for MAPGEO parsing.

use thiserror::Error;

/// Errors that can occur when working with MAPGEO files.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error (truncation, bad magic).
    #[error("{0}")]
    Common(#[from] riftfile_common::Error),

    /// Recognized file but unsupported version.
    #[error("unsupported MAPGEO version: {0}")]
    UnsupportedVersion(u32),

    /// A vertex element semantic code outside the known table.
    #[error("unknown vertex element semantic: {0}")]
    UnknownElementName(u32),

    /// A vertex element format code outside the known table.
    #[error("unknown vertex element format: {0}")]
    UnknownElementFormat(u32),

    /// A vertex description declares more elements than the record has slots.
    #[error("vertex description declares {0} elements, more than the 15 slots")]
    DescriptionTooLarge(usize),

    /// A model references a vertex description that was never declared.
    #[error("model {model} references missing vertex description {id}")]
    MissingVertexDescription { model: usize, id: i32 },

    /// A model references a vertex buffer that was never declared.
    #[error("model {model} references missing vertex buffer {id}")]
    MissingVertexBuffer { model: usize, id: i32 },

    /// A model references an index buffer that was never declared.
    #[error("model {model} references missing index buffer {id}")]
    MissingIndexBuffer { model: usize, id: i32 },

    /// An index buffer's byte size is not a multiple of the u16 index width.
    #[error("index buffer {buffer} declares {size} bytes, not a multiple of 2")]
    IndexBufferSizeOdd { buffer: usize, size: usize },

    /// A vertex buffer's declared size disagrees with its description.
    #[error(
        "vertex buffer {buffer} holds {actual} bytes but {vertex_count} \
         vertices of stride {stride} need {expected}"
    )]
    VertexBufferSizeMismatch {
        buffer: usize,
        vertex_count: usize,
        stride: usize,
        expected: usize,
        actual: usize,
    },

    /// A submesh index range escapes its model's index buffer.
    #[error(
        "submesh {submesh} of model {model} spans indices \
         {start}..{end} but the model has {index_count}"
    )]
    SubmeshOutOfRange {
        model: usize,
        submesh: usize,
        start: u32,
        end: u64,
        index_count: usize,
    },

    /// A model declares more indices than its index buffer holds.
    #[error(
        "model {model} declares {index_count} indices but buffer {id} \
         holds only {available}"
    )]
    IndexBufferTooSmall {
        model: usize,
        id: i32,
        index_count: usize,
        available: usize,
    },

    /// A model has no vertices to derive an encode-time description from.
    #[error("model {0} has no vertices")]
    EmptyModel(usize),

    /// A vertex does not match the layout derived from its model's first
    /// vertex, so no single description can encode the model.
    #[error("vertex {vertex} of model {model} does not match the model's vertex layout")]
    InconsistentVertex { model: usize, vertex: usize },

    /// A bucket grid's rows are not all the declared side length.
    #[error("bucket grid {0} is not square")]
    BucketGridNotSquare(usize),

    /// A face-visibility array disagrees with the grid's triangle count.
    #[error(
        "bucket grid {grid} has {actual} face visibility entries \
         but {expected} triangles"
    )]
    FaceVisibilityLengthMismatch {
        grid: usize,
        expected: usize,
        actual: usize,
    },

    /// JSON serialization error.
    #[cfg(feature = "json-export")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for MAPGEO operations.
pub type Result<T> = std::result::Result<T, Error>;
