//! SKL skeleton file codec.
//!
//! SKL files store a skeletal rig: an ordered tree of joints with local and
//! inverse-bind transforms, plus the sparse set of joint indices that
//! actually influence skinned vertices. Two on-disk layouts exist and are
//! distinguished by a magic-number probe at byte offset 4:
//!
//! - **Modern** (`0x22FD4FC3` format token): fixed 100-byte joint records
//!   reached through offset fields stored relative to their own position,
//!   with all names in a trailing null-terminated string pool.
//! - **Legacy** (`"r3d2sklt"` signature, versions 1 and 2): fully inline
//!   records carrying a single flattened world matrix per joint, from which
//!   local and inverse-bind transforms are synthesized by decomposition.
//!
//! Encoding always produces the modern layout.
//!
//! # Example
//!
//! ```no_run
//! let skeleton = riftfile_skl::read("champion.skl")?;
//! for joint in &skeleton.joints {
//!     println!("{} (parent {})", joint.name, joint.parent);
//! }
//! riftfile_skl::write("copy.skl", &skeleton)?;
//! # Ok::<(), riftfile_skl::Error>(())
//! ```

mod error;
mod file;
pub mod parts;

use std::path::Path;

pub use error::{Error, Result};
pub use file::Skeleton;
pub use parts::{elf_hash, Joint, SklFormat};

/// Read a skeleton from a file on disk.
pub fn read<P: AsRef<Path>>(path: P) -> Result<Skeleton> {
    Skeleton::from_file(path)
}

/// Write a skeleton to a file on disk in the modern layout.
pub fn write<P: AsRef<Path>>(path: P, skeleton: &Skeleton) -> Result<()> {
    skeleton.write_to_file(path)
}
