//! Error types for SKL parsing.

use thiserror::Error;

/// Errors that can occur when working with SKL files.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error (truncation, bad magic, inconsistent offset).
    #[error("{0}")]
    Common(#[from] riftfile_common::Error),

    /// Recognized file but unsupported version.
    #[error("unsupported SKL version: {0}")]
    UnsupportedVersion(u32),

    /// A joint's parent index does not refer to a joint in the skeleton.
    #[error("joint {joint} has out-of-range parent index {parent}")]
    ParentOutOfRange { joint: usize, parent: i16 },

    /// Following parent links from a joint never reaches a root.
    #[error("joint {joint} is part of a parent cycle")]
    ParentCycle { joint: usize },

    /// An influence entry refers to a joint that does not exist.
    #[error("influence entry {index} out of range for {joint_count} joints")]
    InfluenceOutOfRange { index: u32, joint_count: usize },

    /// Too many joints to encode in the modern layout's u16 count field.
    #[error("skeleton has {0} joints, more than the format can store")]
    TooManyJoints(usize),

    /// JSON serialization error.
    #[cfg(feature = "json-export")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for SKL operations.
pub type Result<T> = std::result::Result<T, Error>;
