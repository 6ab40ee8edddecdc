//! Common utilities for riftfile.
//!
//! This crate provides foundational types used across all riftfile crates:
//!
//! - [`BinaryReader`] - Zero-copy binary reading from byte slices
//! - [`BinaryWriter`] - Cursor-based binary writing with seek-and-patch
//! - [`Trs`] - Translation/rotation/scale transform with matrix decomposition
//! - Shared error types for decode failures

mod error;
mod math;
mod reader;
mod writer;

#[cfg(feature = "serde")]
pub mod hex;

pub use error::{Error, Result};
pub use math::{decompose_mtx4, Trs};
pub use reader::BinaryReader;
pub use writer::BinaryWriter;
