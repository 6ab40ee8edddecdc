//! Skeleton building blocks.

mod joint;

pub use joint::{elf_hash, Joint};

#[cfg(feature = "json-export")]
use serde::{Deserialize, Serialize};

/// Which on-disk layout a skeleton was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json-export", derive(Serialize, Deserialize))]
pub enum SklFormat {
    /// Offset-table layout introduced with format token `0x22FD4FC3`.
    Modern,
    /// Inline `"r3d2sklt"` layout, versions 1 and 2.
    Legacy { version: u32 },
}
