//! Vertex descriptions, element formats and the decode registry.

use glam::{Vec2, Vec3, Vec4};
use riftfile_common::BinaryReader;

use crate::{Error, Result};

#[cfg(feature = "json-export")]
use serde::{Deserialize, Serialize};

/// Number of element slots in an on-disk vertex description record.
pub const DESCRIPTION_SLOTS: usize = 15;

/// Vertex element semantic, on-disk u32 0..=14.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "json-export", derive(Serialize, Deserialize))]
pub enum ElementName {
    Position,
    BlendWeight,
    Normal,
    PrimaryColor,
    SecondaryColor,
    FogCoordinate,
    BlendIndex,
    Texcoord0,
    Texcoord1,
    Texcoord2,
    Texcoord3,
    Texcoord4,
    Texcoord5,
    Texcoord6,
    Texcoord7,
}

impl ElementName {
    /// All semantics in on-disk code order.
    pub const ALL: [Self; DESCRIPTION_SLOTS] = [
        Self::Position,
        Self::BlendWeight,
        Self::Normal,
        Self::PrimaryColor,
        Self::SecondaryColor,
        Self::FogCoordinate,
        Self::BlendIndex,
        Self::Texcoord0,
        Self::Texcoord1,
        Self::Texcoord2,
        Self::Texcoord3,
        Self::Texcoord4,
        Self::Texcoord5,
        Self::Texcoord6,
        Self::Texcoord7,
    ];

    /// Decode an on-disk semantic code.
    pub fn from_u32(code: u32) -> Result<Self> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(Error::UnknownElementName(code))
    }

    /// The on-disk semantic code.
    pub fn to_u32(self) -> u32 {
        self as u32
    }
}

/// Packed vertex element format, on-disk u32 0..=6.
///
/// The three `*Packed8888` variants are distinct on disk but all decode to
/// the same four raw lanes; no channel swizzling is applied, so bytes pass
/// through bit-for-bit whichever variant tagged them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json-export", derive(Serialize, Deserialize))]
pub enum ElementFormat {
    XFloat32,
    XyFloat32,
    XyzFloat32,
    XyzwFloat32,
    BgraPacked8888,
    ZyxwPacked8888,
    RgbaPacked8888,
}

impl ElementFormat {
    const ALL: [Self; 7] = [
        Self::XFloat32,
        Self::XyFloat32,
        Self::XyzFloat32,
        Self::XyzwFloat32,
        Self::BgraPacked8888,
        Self::ZyxwPacked8888,
        Self::RgbaPacked8888,
    ];

    /// Decode an on-disk format code.
    pub fn from_u32(code: u32) -> Result<Self> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(Error::UnknownElementFormat(code))
    }

    /// The on-disk format code.
    pub fn to_u32(self) -> u32 {
        self as u32
    }

    /// Registry entry for this format.
    pub fn info(self) -> &'static FormatInfo {
        &FORMAT_INFO[self as usize]
    }
}

/// One decoded vertex attribute value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json-export", derive(Serialize, Deserialize))]
pub enum VertexValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    /// Four raw lanes of a packed 8888 format, in on-disk byte order.
    Packed([u8; 4]),
}

/// Registry entry: how one element format occupies and decodes bytes.
pub struct FormatInfo {
    /// Bytes one value of this format occupies in a vertex.
    pub byte_size: usize,
    /// Decode one value from the stream.
    pub read: fn(&mut BinaryReader<'_>) -> riftfile_common::Result<VertexValue>,
}

/// Static format registry, indexed by on-disk format code.
///
/// Adding a packed format means adding one row here.
pub static FORMAT_INFO: [FormatInfo; 7] = [
    FormatInfo {
        byte_size: 4,
        read: |r| Ok(VertexValue::Float(r.read_f32()?)),
    },
    FormatInfo {
        byte_size: 8,
        read: |r| Ok(VertexValue::Vec2(r.read_vec2()?)),
    },
    FormatInfo {
        byte_size: 12,
        read: |r| Ok(VertexValue::Vec3(r.read_vec3()?)),
    },
    FormatInfo {
        byte_size: 16,
        read: |r| Ok(VertexValue::Vec4(r.read_vec4()?)),
    },
    FormatInfo {
        byte_size: 4,
        read: read_packed_8888,
    },
    FormatInfo {
        byte_size: 4,
        read: read_packed_8888,
    },
    FormatInfo {
        byte_size: 4,
        read: read_packed_8888,
    },
];

fn read_packed_8888(r: &mut BinaryReader<'_>) -> riftfile_common::Result<VertexValue> {
    let bytes = r.read_bytes(4)?;
    Ok(VertexValue::Packed([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// One (semantic, format) pair of a vertex description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json-export", derive(Serialize, Deserialize))]
pub struct VertexElement {
    pub name: ElementName,
    pub format: ElementFormat,
}

/// An ordered schema describing one vertex's byte layout.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json-export", derive(Serialize, Deserialize))]
pub struct VertexDescription {
    /// On-disk usage code (0 = static geometry).
    pub usage: u32,
    pub elements: Vec<VertexElement>,
}

impl VertexDescription {
    /// Total bytes one vertex occupies under this description.
    pub fn stride(&self) -> usize {
        self.elements
            .iter()
            .map(|e| e.format.info().byte_size)
            .sum()
    }
}

/// One decoded vertex: values in description order, keyed by semantic.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json-export", derive(Serialize, Deserialize))]
pub struct Vertex {
    pub elements: Vec<(ElementName, VertexValue)>,
}

impl Vertex {
    /// Look up a value by semantic. The element list is at most 15 entries,
    /// so a linear scan beats hashing.
    pub fn get(&self, name: ElementName) -> Option<&VertexValue> {
        self.elements
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// The vertex position, if this vertex carries one.
    pub fn position(&self) -> Option<Vec3> {
        match self.get(ElementName::Position) {
            Some(VertexValue::Vec3(v)) => Some(*v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_codes_round_trip() {
        for code in 0..7 {
            assert_eq!(ElementFormat::from_u32(code).unwrap().to_u32(), code);
        }
        assert!(matches!(
            ElementFormat::from_u32(7),
            Err(Error::UnknownElementFormat(7))
        ));
    }

    #[test]
    fn test_name_codes_round_trip() {
        for code in 0..15 {
            assert_eq!(ElementName::from_u32(code).unwrap().to_u32(), code);
        }
        assert!(matches!(
            ElementName::from_u32(15),
            Err(Error::UnknownElementName(15))
        ));
    }

    #[test]
    fn test_description_stride() {
        let description = VertexDescription {
            usage: 0,
            elements: vec![
                VertexElement {
                    name: ElementName::Position,
                    format: ElementFormat::XyzFloat32,
                },
                VertexElement {
                    name: ElementName::PrimaryColor,
                    format: ElementFormat::BgraPacked8888,
                },
                VertexElement {
                    name: ElementName::Texcoord0,
                    format: ElementFormat::XyFloat32,
                },
            ],
        };
        assert_eq!(description.stride(), 12 + 4 + 8);
    }

    #[test]
    fn test_packed_formats_pass_through() {
        let data = [0x11u8, 0x22, 0x33, 0x44];
        for format in [
            ElementFormat::BgraPacked8888,
            ElementFormat::ZyxwPacked8888,
            ElementFormat::RgbaPacked8888,
        ] {
            let mut r = BinaryReader::new(&data);
            let value = (format.info().read)(&mut r).unwrap();
            assert_eq!(value, VertexValue::Packed([0x11, 0x22, 0x33, 0x44]));
        }
    }
}
