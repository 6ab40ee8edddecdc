//! SKL file decoding and encoding.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glam::{Mat4, Quat, Vec3, Vec4};
use riftfile_common::{BinaryReader, BinaryWriter, Trs};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::parts::{elf_hash, Joint, SklFormat};
use crate::{Error, Result};

/// Format token of the modern layout, stored at byte offset 4.
pub const FORMAT_TOKEN: u32 = 0x22FD_4FC3;

/// Signature of the legacy inline layout.
const LEGACY_MAGIC: &[u8; 8] = b"r3d2sklt";

/// Modern header: 6 u32/u16 count fields, 6 offset fields, 20 reserved bytes.
const MODERN_HEADER_SIZE: usize = 64;

/// Byte offset of the name-offset field inside a modern joint record.
const JOINT_NAME_FIELD: usize = 96;

/// On-disk modern joint record, 100 bytes.
///
/// Rotations are stored x, y, z, w; the name offset is relative to the
/// position of the offset field itself.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
struct RawJoint {
    flags: u16,
    id: i16,
    parent: i16,
    pad: u16,
    hash: u32,
    radius: f32,
    local_translate: [f32; 3],
    local_scale: [f32; 3],
    local_rotate: [f32; 4],
    ibind_translate: [f32; 3],
    ibind_scale: [f32; 3],
    ibind_rotate: [f32; 4],
    name_offset: i32,
}

const _: () = assert!(std::mem::size_of::<RawJoint>() == 100);

/// A decoded skeletal rig.
///
/// Pure data: all fields are populated in one `parse` pass and hold no
/// reference to the source buffer. Encoding always emits the modern layout
/// regardless of which layout was decoded.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "json-export",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Skeleton {
    /// Layout the skeleton was decoded from.
    pub format: SklFormat,
    /// Header flags (modern layout only; zero for legacy files).
    pub flags: u16,
    /// Skeleton name string.
    pub name: String,
    /// Source asset string.
    pub asset: String,
    /// Joints in on-disk order.
    pub joints: Vec<Joint>,
    /// Indices of the joints bound to skin vertices.
    pub influences: Vec<u16>,
}

impl Skeleton {
    /// Read a skeleton from a file on disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Decode a skeleton from raw bytes.
    ///
    /// The u32 at byte offset 4 selects the layout: the modern format token
    /// lives there, while in a legacy file those bytes are the tail of the
    /// `"r3d2sklt"` signature.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let probe = if data.len() >= 8 {
            BinaryReader::new_at(data, 4).peek_u32()?
        } else {
            0
        };

        let mut reader = BinaryReader::new(data);
        if probe == FORMAT_TOKEN {
            Self::parse_modern(&mut reader)
        } else {
            Self::parse_legacy(&mut reader)
        }
    }

    /// Encode to the modern layout and write to a file.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Serialize the skeleton to pretty-printed JSON.
    #[cfg(feature = "json-export")]
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON representation to a file.
    #[cfg(feature = "json-export")]
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    fn parse_modern(r: &mut BinaryReader<'_>) -> Result<Self> {
        let _file_size = r.read_u32()?;
        r.advance(4); // format token, already probed
        let version = r.read_u32()?;
        if version != 0 {
            return Err(Error::UnsupportedVersion(version));
        }

        let flags = r.read_u16()?;
        let joint_count = r.read_u16()? as usize;
        let influence_count = r.read_u32()? as usize;

        let joints_offset = r.read_relative_offset()?;
        let _joint_indices_offset = r.read_relative_offset()?;
        let influences_offset = r.read_relative_offset()?;
        let name_offset = read_optional_offset(r)?;
        let asset_offset = read_optional_offset(r)?;
        let _joint_names_offset = r.read_relative_offset()?;
        r.advance(20); // reserved

        // Joint records. Each record resolves its own name out of the
        // trailing string pool.
        let mut joints = Vec::with_capacity(joint_count);
        r.seek(joints_offset);
        for _ in 0..joint_count {
            let record_pos = r.position();
            let raw: RawJoint = r.read_struct()?;
            let name = read_joint_name(r.raw(), record_pos + JOINT_NAME_FIELD, raw.name_offset)?;

            joints.push(Joint {
                id: raw.id,
                name,
                flags: raw.flags,
                parent: raw.parent,
                hash: raw.hash,
                radius: raw.radius,
                local: Trs {
                    translation: Vec3::from_array(raw.local_translate),
                    rotation: Quat::from_array(raw.local_rotate),
                    scale: Vec3::from_array(raw.local_scale),
                },
                inverse_bind: Trs {
                    translation: Vec3::from_array(raw.ibind_translate),
                    rotation: Quat::from_array(raw.ibind_rotate),
                    scale: Vec3::from_array(raw.ibind_scale),
                },
            });
        }

        // The joint-indices section is a hash -> id lookup table fully
        // derivable from the joint records; it is validated by offset only.

        r.seek(influences_offset);
        let influences = r.read_u16_array(influence_count)?;

        let name = match name_offset {
            Some(offset) => read_cstring_at(r.raw(), offset)?,
            None => String::new(),
        };
        let asset = match asset_offset {
            Some(offset) => read_cstring_at(r.raw(), offset)?,
            None => String::new(),
        };

        validate_tree(&joints)?;
        validate_influences(&influences, joints.len())?;

        Ok(Self {
            format: SklFormat::Modern,
            flags,
            name,
            asset,
            joints,
            influences,
        })
    }

    fn parse_legacy(r: &mut BinaryReader<'_>) -> Result<Self> {
        r.expect_magic(LEGACY_MAGIC)?;
        let version = r.read_u32()?;
        if !(1..=2).contains(&version) {
            return Err(Error::UnsupportedVersion(version));
        }
        r.advance(4); // designer id, unused
        let joint_count = r.read_u32()? as usize;

        // Legacy records carry one flattened world matrix per joint; read
        // them all first, then synthesize local and inverse-bind TRS. The
        // declared count is untrusted, so reservations are capped by the
        // 88-byte record size against the remaining bytes.
        let cap = joint_count.min(r.remaining() / 88);
        let mut names = Vec::with_capacity(cap);
        let mut parents = Vec::with_capacity(cap);
        let mut radii = Vec::with_capacity(cap);
        let mut worlds: Vec<Mat4> = Vec::with_capacity(cap);
        for i in 0..joint_count {
            names.push(r.read_padded_string(32)?);
            let parent = r.read_i32()?;
            if parent != -1 && !(0..joint_count as i32).contains(&parent) {
                return Err(Error::ParentOutOfRange {
                    joint: i,
                    parent: parent as i16,
                });
            }
            parents.push(parent);
            radii.push(r.read_f32()?);
            worlds.push(mtx4_from_rows_3x4(&r.read_f32_array(12)?));
        }

        let mut joints = Vec::with_capacity(joint_count);
        for i in 0..joint_count {
            let local_matrix = if parents[i] < 0 {
                worlds[i]
            } else {
                worlds[i] * worlds[parents[i] as usize].inverse()
            };

            joints.push(Joint {
                id: i as i16,
                name: names[i].clone(),
                flags: 0,
                parent: parents[i] as i16,
                hash: elf_hash(&names[i]),
                radius: radii[i],
                local: Trs::from_mtx4(&local_matrix),
                inverse_bind: Trs::from_mtx4(&worlds[i].inverse()),
            });
        }

        // Version 1 has no influence list: every joint influences skin.
        let influences = if version == 1 {
            (0..joint_count as u16).collect()
        } else {
            let count = r.read_u32()? as usize;
            let mut influences = Vec::with_capacity(count.min(r.remaining() / 4));
            for _ in 0..count {
                let index = r.read_u32()?;
                if index as usize >= joint_count {
                    return Err(Error::InfluenceOutOfRange {
                        index,
                        joint_count,
                    });
                }
                influences.push(index as u16);
            }
            influences
        };

        validate_tree(&joints)?;

        Ok(Self {
            format: SklFormat::Legacy { version },
            flags: 0,
            name: String::new(),
            asset: String::new(),
            joints,
            influences,
        })
    }

    /// Encode to the modern layout.
    ///
    /// Two-pass: fixed records are written with placeholder offsets, the
    /// variable-length strings land in a trailing pool, and every offset
    /// field (plus the total file size at offset 0) is patched once the
    /// final layout is known. Name hashes are recomputed from the names.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let joint_count = self.joints.len();
        if joint_count > u16::MAX as usize {
            return Err(Error::TooManyJoints(joint_count));
        }
        validate_influences(&self.influences, joint_count)?;

        let mut w = BinaryWriter::new();
        w.write_u32(0)?; // total file size, patched last
        w.write_u32(FORMAT_TOKEN)?;
        w.write_u32(0)?; // version
        w.write_u16(self.flags)?;
        w.write_u16(joint_count as u16)?;
        w.write_u32(self.influences.len() as u32)?;

        let joints_field = reserve_offset(&mut w)?;
        let indices_field = reserve_offset(&mut w)?;
        let influences_field = reserve_offset(&mut w)?;
        let name_field = reserve_offset(&mut w)?;
        let asset_field = reserve_offset(&mut w)?;
        let pool_field = reserve_offset(&mut w)?;
        w.pad(20)?; // reserved
        debug_assert_eq!(w.position(), MODERN_HEADER_SIZE);

        patch_offset(&mut w, joints_field)?;
        let mut name_fields = Vec::with_capacity(joint_count);
        for joint in &self.joints {
            let record_pos = w.position();
            let raw = RawJoint {
                flags: joint.flags,
                id: joint.id,
                parent: joint.parent,
                pad: 0,
                hash: elf_hash(&joint.name),
                radius: joint.radius,
                local_translate: joint.local.translation.to_array(),
                local_scale: joint.local.scale.to_array(),
                local_rotate: joint.local.rotation.to_array(),
                ibind_translate: joint.inverse_bind.translation.to_array(),
                ibind_scale: joint.inverse_bind.scale.to_array(),
                ibind_rotate: joint.inverse_bind.rotation.to_array(),
                name_offset: 0, // patched from the string pool below
            };
            w.write_bytes(raw.as_bytes())?;
            name_fields.push(record_pos + JOINT_NAME_FIELD);
        }

        patch_offset(&mut w, indices_field)?;
        for joint in &self.joints {
            w.write_i16(joint.id)?;
            w.write_u16(0)?;
            w.write_u32(elf_hash(&joint.name))?;
        }

        patch_offset(&mut w, influences_field)?;
        for &index in &self.influences {
            w.write_u16(index)?;
        }

        patch_offset(&mut w, name_field)?;
        w.write_cstring(&self.name)?;
        patch_offset(&mut w, asset_field)?;
        w.write_cstring(&self.asset)?;

        // Joint name pool, deduplicated in first-use order.
        patch_offset(&mut w, pool_field)?;
        let mut pooled: HashMap<&str, usize> = HashMap::new();
        for (joint, &field) in self.joints.iter().zip(&name_fields) {
            let string_pos = match pooled.get(joint.name.as_str()) {
                Some(&pos) => pos,
                None => {
                    let pos = w.position();
                    w.write_cstring(&joint.name)?;
                    pooled.insert(joint.name.as_str(), pos);
                    pos
                }
            };
            w.patch_i32_at(field, (string_pos as i64 - field as i64) as i32)?;
        }

        let total = w.position() as u32;
        w.patch_u32_at(0, total)?;
        Ok(w.into_bytes())
    }
}

/// Read an i32 offset field treating 0 and -1 as "absent".
fn read_optional_offset(r: &mut BinaryReader<'_>) -> Result<Option<usize>> {
    let stored = {
        let mut probe = r.clone();
        probe.read_i32()?
    };
    if stored == 0 || stored == -1 {
        r.advance(4);
        Ok(None)
    } else {
        Ok(Some(r.read_relative_offset()?))
    }
}

/// Reserve a 4-byte offset field, returning its position for later patching.
fn reserve_offset(w: &mut BinaryWriter) -> Result<usize> {
    let field = w.position();
    w.write_i32(0)?;
    Ok(field)
}

/// Patch a reserved offset field to point at the current write position.
fn patch_offset(w: &mut BinaryWriter, field: usize) -> Result<()> {
    let target = w.position();
    w.patch_i32_at(field, (target as i64 - field as i64) as i32)?;
    Ok(())
}

/// Resolve a joint's relative name offset and read the null-terminated name.
fn read_joint_name(data: &[u8], field_position: usize, stored: i32) -> Result<String> {
    let resolved = field_position as i64 + stored as i64;
    if resolved < 0 || resolved as usize >= data.len() {
        return Err(riftfile_common::Error::InconsistentOffset {
            field_position,
            stored,
            resolved,
            len: data.len(),
        }
        .into());
    }
    read_cstring_at(data, resolved as usize)
}

fn read_cstring_at(data: &[u8], offset: usize) -> Result<String> {
    let mut r = BinaryReader::new_at(data, offset);
    Ok(r.read_cstring()?.to_owned())
}

/// Build a 4x4 matrix from the 12 floats of a legacy record: three rows of
/// four values, translation in the fourth column, bottom row implied.
fn mtx4_from_rows_3x4(rows: &[f32]) -> Mat4 {
    debug_assert_eq!(rows.len(), 12);
    Mat4::from_cols(
        Vec4::new(rows[0], rows[4], rows[8], 0.0),
        Vec4::new(rows[1], rows[5], rows[9], 0.0),
        Vec4::new(rows[2], rows[6], rows[10], 0.0),
        Vec4::new(rows[3], rows[7], rows[11], 1.0),
    )
}

/// Check that every parent index is valid and the parent graph is a tree.
fn validate_tree(joints: &[Joint]) -> Result<()> {
    for (i, joint) in joints.iter().enumerate() {
        if joint.parent != -1 && !(0..joints.len() as i16).contains(&joint.parent) {
            return Err(Error::ParentOutOfRange {
                joint: i,
                parent: joint.parent,
            });
        }
    }

    // Following parent links from any joint must reach a root within
    // joint_count steps, otherwise there is a cycle.
    for start in 0..joints.len() {
        let mut current = joints[start].parent;
        let mut steps = 0;
        while current != -1 {
            steps += 1;
            if steps > joints.len() {
                return Err(Error::ParentCycle { joint: start });
            }
            current = joints[current as usize].parent;
        }
    }
    Ok(())
}

fn validate_influences(influences: &[u16], joint_count: usize) -> Result<()> {
    for &index in influences {
        if index as usize >= joint_count {
            return Err(Error::InfluenceOutOfRange {
                index: index as u32,
                joint_count,
            });
        }
    }
    Ok(())
}
