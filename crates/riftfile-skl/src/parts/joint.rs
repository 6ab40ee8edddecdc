//! Joint records and name hashing.

use riftfile_common::Trs;

#[cfg(feature = "json-export")]
use serde::{Deserialize, Serialize};

/// A single joint in a skeletal rig.
///
/// Joints are stored in on-disk order; `parent` is an index into the same
/// skeleton's joint list, or -1 for a root. The parent graph is a tree -
/// the decoder rejects files where it is not.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json-export", derive(Serialize, Deserialize))]
pub struct Joint {
    pub id: i16,
    pub name: String,
    pub flags: u16,
    /// Index of the parent joint, -1 for a root.
    pub parent: i16,
    /// ELF hash of the lowercased name, for lookups without string compares.
    pub hash: u32,
    pub radius: f32,
    /// Transform relative to the parent joint.
    pub local: Trs,
    /// Inverse of the joint's world transform at rest pose.
    pub inverse_bind: Trs,
}

impl Joint {
    /// True if this joint has no parent.
    pub fn is_root(&self) -> bool {
        self.parent < 0
    }
}

/// ELF hash of the lowercased input.
///
/// This is the hash the format stores next to each joint name and in the
/// joint-indices lookup table; it is recomputed from the name on encode.
pub fn elf_hash(name: &str) -> u32 {
    let mut hash: u32 = 0;
    for byte in name.bytes() {
        let c = byte.to_ascii_lowercase() as u32;
        hash = (hash << 4).wrapping_add(c);
        let high = hash & 0xF000_0000;
        if high != 0 {
            hash ^= high >> 24;
        }
        hash &= !high;
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elf_hash_known_value() {
        assert_eq!(elf_hash("root"), 0x0007_9664);
    }

    #[test]
    fn test_elf_hash_case_insensitive() {
        assert_eq!(elf_hash("L_Hand"), elf_hash("l_hand"));
    }

    #[test]
    fn test_elf_hash_empty() {
        assert_eq!(elf_hash(""), 0);
    }
}
