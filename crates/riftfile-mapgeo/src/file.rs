//! MAPGEO file decoding and encoding.
//!
//! Decoding supports every observed historical version; encoding always
//! emits the latest supported version. Version gates are annotated inline
//! where each field is read - the gate set is the format, so it is kept in
//! one place per record type rather than scattered across helpers.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use riftfile_common::{BinaryReader, BinaryWriter};

use crate::parts::{
    BoundingBox, Bucket, BucketGrid, Channel, ElementFormat, ElementName, Model,
    PlanarReflector, Submesh, Vertex, VertexDescription, VertexElement, VertexValue,
    DESCRIPTION_SLOTS, GRID_FLAG_FACE_VISIBILITY,
};
use crate::{Error, Result};

/// File signature.
pub const MAGIC: &[u8; 4] = b"OEGM";

/// Every version the decoder understands.
pub const SUPPORTED_VERSIONS: &[u32] = &[5, 6, 7, 9, 11, 12, 13, 14, 15, 17];

/// Version the encoder emits.
pub const WRITE_VERSION: u32 = 17;

/// A decoded map geometry file.
///
/// Pure data, fully populated by one `parse` pass. `version` records what
/// was decoded; encoding always emits [`WRITE_VERSION`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "json-export",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct MapGeometry {
    pub version: u32,
    /// Legacy point-light toggle, versions below 7 only.
    pub use_separate_point_lights: bool,
    /// Baked terrain sampler names (one at version 9, two from 11 on).
    pub baked_terrain_samplers: Vec<String>,
    /// Vertex descriptions shared by the models, as declared in the file.
    pub vertex_descriptions: Vec<VertexDescription>,
    pub models: Vec<Model>,
    pub bucket_grids: Vec<BucketGrid>,
    pub planar_reflectors: Vec<PlanarReflector>,
}

impl MapGeometry {
    /// Read a map geometry file from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Encode to [`WRITE_VERSION`] and write to a file.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Serialize to pretty-printed JSON.
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

    /// Decode a map geometry file from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = BinaryReader::new(data);
        r.expect_magic(MAGIC)?;
        let version = r.read_u32()?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(Error::UnsupportedVersion(version));
        }

        let use_separate_point_lights = if version < 7 { r.read_bool()? } else { false };

        let mut baked_terrain_samplers = Vec::new();
        if version >= 9 {
            baked_terrain_samplers.push(r.read_sized_string()?);
            if version >= 11 {
                baked_terrain_samplers.push(r.read_sized_string()?);
            }
        }

        let vertex_descriptions = read_descriptions(&mut r)?;

        // First pass over the vertex buffer section records byte ranges
        // only; a buffer is decoded when a model references it. Declared
        // counts are untrusted, so reservations are capped by what the
        // remaining bytes could actually hold.
        let buffer_count = r.read_u32()? as usize;
        let mut vertex_buffers = Vec::with_capacity(buffer_count.min(r.remaining() / 4));
        for _ in 0..buffer_count {
            if version >= 13 {
                let _layer = r.read_u8()?;
            }
            let size = r.read_u32()? as usize;
            let offset = r.position();
            r.read_bytes(size)?; // skip, bounds-checked
            vertex_buffers.push((offset, size));
        }

        let buffer_count = r.read_u32()? as usize;
        let mut index_buffers = Vec::with_capacity(buffer_count.min(r.remaining() / 4));
        for b in 0..buffer_count {
            if version >= 13 {
                let _layer = r.read_u8()?;
            }
            let size = r.read_u32()? as usize;
            if size % 2 != 0 {
                return Err(Error::IndexBufferSizeOdd { buffer: b, size });
            }
            index_buffers.push(r.read_u16_array(size / 2)?);
        }

        let model_count = r.read_u32()? as usize;
        let mut models = Vec::with_capacity(model_count.min(r.remaining() / 48));
        // Shared buffers are decoded once per (buffer, description) pair.
        let mut cache: HashMap<(i32, i32), Vec<Vertex>> = HashMap::new();
        for m in 0..model_count {
            models.push(read_model(
                &mut r,
                version,
                m,
                use_separate_point_lights,
                &vertex_descriptions,
                &vertex_buffers,
                &index_buffers,
                &mut cache,
            )?);
        }

        // A file without bucket grids ends exactly here; distinguish that
        // from truncation by the cursor position, not by a failed read.
        let mut bucket_grids = Vec::new();
        if !r.is_empty() {
            if version >= 15 {
                let grid_count = r.read_u32()? as usize;
                for _ in 0..grid_count {
                    bucket_grids.push(read_bucket_grid(&mut r, version)?);
                }
            } else {
                bucket_grids.push(read_bucket_grid(&mut r, version)?);
            }
        }

        let mut planar_reflectors = Vec::new();
        if version >= 13 && !r.is_empty() {
            let count = r.read_u32()? as usize;
            for _ in 0..count {
                planar_reflectors.push(PlanarReflector {
                    transform: r.read_mtx4()?,
                    bounds: BoundingBox {
                        min: r.read_vec3()?,
                        max: r.read_vec3()?,
                    },
                    normal: r.read_vec3()?,
                });
            }
        }

        Ok(Self {
            version,
            use_separate_point_lights,
            baked_terrain_samplers,
            vertex_descriptions,
            models,
            bucket_grids,
            planar_reflectors,
        })
    }

    /// Encode to [`WRITE_VERSION`].
    ///
    /// The output is normalized: one vertex buffer and one index buffer per
    /// model, vertex descriptions re-derived from the vertices themselves
    /// and deduplicated, bounding boxes recomputed from position data.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut w = BinaryWriter::new();
        w.write_bytes(MAGIC)?;
        w.write_u32(WRITE_VERSION)?;

        // Both terrain samplers are mandatory at this version.
        for i in 0..2 {
            let sampler = self
                .baked_terrain_samplers
                .get(i)
                .map(String::as_str)
                .unwrap_or("");
            w.write_sized_string(sampler)?;
        }

        let mut descriptions: Vec<VertexDescription> = Vec::new();
        let mut model_description_ids = Vec::with_capacity(self.models.len());
        for (m, model) in self.models.iter().enumerate() {
            let description = derive_description(m, model)?;
            let id = match descriptions.iter().position(|d| *d == description) {
                Some(id) => id,
                None => {
                    descriptions.push(description);
                    descriptions.len() - 1
                }
            };
            model_description_ids.push(id);
        }

        w.write_u32(descriptions.len() as u32)?;
        for description in &descriptions {
            w.write_u32(description.usage)?;
            w.write_u32(description.elements.len() as u32)?;
            for element in &description.elements {
                w.write_u32(element.name.to_u32())?;
                w.write_u32(element.format.to_u32())?;
            }
            w.pad(8 * (DESCRIPTION_SLOTS - description.elements.len()))?;
        }

        // One vertex buffer per model.
        w.write_u32(self.models.len() as u32)?;
        for (m, model) in self.models.iter().enumerate() {
            let description = &descriptions[model_description_ids[m]];
            w.write_u8(model.layer)?;
            w.write_u32((model.vertices.len() * description.stride()) as u32)?;
            for (vi, vertex) in model.vertices.iter().enumerate() {
                write_vertex(&mut w, m, vi, vertex, description)?;
            }
        }

        // One index buffer per model.
        w.write_u32(self.models.len() as u32)?;
        for model in &self.models {
            w.write_u8(model.layer)?;
            w.write_u32((model.indices.len() * 2) as u32)?;
            for &index in &model.indices {
                w.write_u16(index)?;
            }
        }

        w.write_u32(self.models.len() as u32)?;
        for (m, model) in self.models.iter().enumerate() {
            w.write_u32(model.vertices.len() as u32)?;
            w.write_u32(1)?; // vertex buffers per model
            w.write_i32(model_description_ids[m] as i32)?;
            w.write_i32(m as i32)?; // vertex buffer id
            w.write_u32(model.indices.len() as u32)?;
            w.write_i32(m as i32)?; // index buffer id
            w.write_u8(model.layer)?;
            w.write_u32(model.bucket_grid_hash)?;

            w.write_u32(model.submeshes.len() as u32)?;
            for submesh in &model.submeshes {
                w.write_u32(submesh.hash)?;
                w.write_sized_string(&submesh.material)?;
                w.write_u32(submesh.index_start)?;
                w.write_u32(submesh.index_count)?;
                w.write_u32(submesh.min_vertex)?;
                w.write_u32(submesh.max_vertex)?;
            }

            w.write_bool(model.flip_normals)?;

            // The stored box may be stale after edits; always recompute.
            let bb =
                BoundingBox::from_points(model.vertices.iter().filter_map(Vertex::position));
            w.write_vec3(bb.min)?;
            w.write_vec3(bb.max)?;
            w.write_mtx4(&model.transform)?;
            w.write_u8(model.quality)?;
            w.write_u8(model.render_flags)?;

            write_channel(&mut w, &model.baked_light)?;
            write_channel(
                &mut w,
                model.stationary_light.as_ref().unwrap_or(&Channel::default()),
            )?;
            w.write_u32(model.texture_overrides.len() as u32)?;
            for channel in &model.texture_overrides {
                write_channel(&mut w, channel)?;
            }
        }

        if !self.bucket_grids.is_empty() || !self.planar_reflectors.is_empty() {
            w.write_u32(self.bucket_grids.len() as u32)?;
            for (g, grid) in self.bucket_grids.iter().enumerate() {
                write_bucket_grid(&mut w, g, grid)?;
            }
            w.write_u32(self.planar_reflectors.len() as u32)?;
            for reflector in &self.planar_reflectors {
                w.write_mtx4(&reflector.transform)?;
                w.write_vec3(reflector.bounds.min)?;
                w.write_vec3(reflector.bounds.max)?;
                w.write_vec3(reflector.normal)?;
            }
        }

        Ok(w.into_bytes())
    }
}

fn read_descriptions(r: &mut BinaryReader<'_>) -> Result<Vec<VertexDescription>> {
    let count = r.read_u32()? as usize;
    // Each description record occupies 128 bytes on disk.
    let mut descriptions = Vec::with_capacity(count.min(r.remaining() / 128));
    for _ in 0..count {
        let usage = r.read_u32()?;
        let element_count = r.read_u32()? as usize;
        if element_count > DESCRIPTION_SLOTS {
            return Err(Error::DescriptionTooLarge(element_count));
        }
        let mut elements = Vec::with_capacity(element_count);
        for _ in 0..element_count {
            let name = ElementName::from_u32(r.read_u32()?)?;
            let format = ElementFormat::from_u32(r.read_u32()?)?;
            elements.push(VertexElement { name, format });
        }
        // The record always occupies all 15 slots on disk.
        r.advance(8 * (DESCRIPTION_SLOTS - element_count));
        descriptions.push(VertexDescription { usage, elements });
    }
    Ok(descriptions)
}

#[allow(clippy::too_many_arguments)]
fn read_model(
    r: &mut BinaryReader<'_>,
    version: u32,
    m: usize,
    use_separate_point_lights: bool,
    descriptions: &[VertexDescription],
    vertex_buffers: &[(usize, usize)],
    index_buffers: &[Vec<u16>],
    cache: &mut HashMap<(i32, i32), Vec<Vertex>>,
) -> Result<Model> {
    // Names stopped being stored at version 12.
    let name = if version < 12 {
        r.read_sized_string()?
    } else {
        format!("Instance_{m}")
    };

    let vertex_count = r.read_u32()? as usize;
    let buffer_count = r.read_u32()? as usize;
    let vertex_description_id = r.read_i32()?;
    let mut vertex_buffer_ids = Vec::with_capacity(buffer_count);
    for _ in 0..buffer_count {
        vertex_buffer_ids.push(r.read_i32()?);
    }
    let index_count = r.read_u32()? as usize;
    let index_buffer_id = r.read_i32()?;

    let vertices = decode_vertices(
        r.raw(),
        m,
        vertex_count,
        vertex_description_id,
        &vertex_buffer_ids,
        descriptions,
        vertex_buffers,
        cache,
    )?;

    let index_pool = usize::try_from(index_buffer_id)
        .ok()
        .and_then(|id| index_buffers.get(id))
        .ok_or(Error::MissingIndexBuffer {
            model: m,
            id: index_buffer_id,
        })?;
    if index_count > index_pool.len() {
        return Err(Error::IndexBufferTooSmall {
            model: m,
            id: index_buffer_id,
            index_count,
            available: index_pool.len(),
        });
    }
    let indices = index_pool[..index_count].to_vec();

    // The layer byte has two historical homes: right after the buffer
    // references from version 13 on, after the quality byte in 7..=12.
    let mut layer = 0xFF;
    if version >= 13 {
        layer = r.read_u8()?;
    }
    let bucket_grid_hash = if version >= 15 { r.read_u32()? } else { 0 };

    let submesh_count = r.read_u32()? as usize;
    let mut submeshes = Vec::with_capacity(submesh_count.min(r.remaining() / 24));
    for s in 0..submesh_count {
        let submesh = Submesh {
            hash: r.read_u32()?,
            material: r.read_sized_string()?,
            index_start: r.read_u32()?,
            index_count: r.read_u32()?,
            min_vertex: r.read_u32()?,
            max_vertex: r.read_u32()?,
        };
        let end = submesh.index_start as u64 + submesh.index_count as u64;
        if end > index_count as u64 {
            return Err(Error::SubmeshOutOfRange {
                model: m,
                submesh: s,
                start: submesh.index_start,
                end,
                index_count,
            });
        }
        submeshes.push(submesh);
    }

    let flip_normals = if version != 5 { r.read_bool()? } else { false };
    let bounding_box = BoundingBox {
        min: r.read_vec3()?,
        max: r.read_vec3()?,
    };
    let transform = r.read_mtx4()?;
    let quality = r.read_u8()?;
    if (7..13).contains(&version) {
        layer = r.read_u8()?;
    }
    let render_flags = if version >= 11 { r.read_u8()? } else { 0 };

    let point_light = if version < 9 && use_separate_point_lights {
        Some(r.read_vec3()?)
    } else {
        None
    };
    let light_probes = if version < 9 {
        let floats = r.read_f32_array(27)?;
        let mut probes = [0.0f32; 27];
        probes.copy_from_slice(&floats);
        Some(probes)
    } else {
        None
    };

    let baked_light = read_channel(r)?;
    let stationary_light = if version >= 9 {
        Some(read_channel(r)?)
    } else {
        None
    };

    // Baked paint grew from a single record to an array at version 17.
    let mut texture_overrides = Vec::new();
    if version >= 17 {
        let count = r.read_u32()? as usize;
        for _ in 0..count {
            texture_overrides.push(read_channel(r)?);
        }
    } else if version >= 12 {
        texture_overrides.push(read_channel(r)?);
    }

    Ok(Model {
        name,
        vertex_description_id,
        vertex_buffer_ids,
        index_buffer_id,
        vertices,
        indices,
        submeshes,
        flip_normals,
        bounding_box,
        transform,
        quality,
        layer,
        render_flags,
        bucket_grid_hash,
        point_light,
        light_probes,
        baked_light,
        stationary_light,
        texture_overrides,
    })
}

/// Decode a model's vertices from the raw buffers it references.
///
/// A model with several vertex buffers splits each vertex's attributes
/// across them, with consecutive description ids starting at the model's;
/// element lists are merged per vertex in buffer order. Decoded buffers are
/// memoized so a buffer shared between models is parsed once.
#[allow(clippy::too_many_arguments)]
fn decode_vertices(
    data: &[u8],
    m: usize,
    vertex_count: usize,
    description_id: i32,
    buffer_ids: &[i32],
    descriptions: &[VertexDescription],
    buffers: &[(usize, usize)],
    cache: &mut HashMap<(i32, i32), Vec<Vertex>>,
) -> Result<Vec<Vertex>> {
    let mut vertices = vec![Vertex::default(); vertex_count];
    for (k, &buffer_id) in buffer_ids.iter().enumerate() {
        let desc_id = description_id.wrapping_add(k as i32);
        let description = usize::try_from(desc_id)
            .ok()
            .and_then(|id| descriptions.get(id))
            .ok_or(Error::MissingVertexDescription {
                model: m,
                id: desc_id,
            })?;

        let &(offset, size) = usize::try_from(buffer_id)
            .ok()
            .and_then(|id| buffers.get(id))
            .ok_or(Error::MissingVertexBuffer {
                model: m,
                id: buffer_id,
            })?;

        // Checked for every referencing model, not only the one that
        // triggers the decode: a cached buffer may be re-referenced with a
        // different declared vertex count.
        let stride = description.stride();
        let expected = vertex_count * stride;
        if expected != size {
            return Err(Error::VertexBufferSizeMismatch {
                buffer: buffer_id as usize,
                vertex_count,
                stride,
                expected,
                actual: size,
            });
        }

        let decoded = match cache.get(&(buffer_id, desc_id)) {
            Some(decoded) => decoded.clone(),
            None => {
                let mut br = BinaryReader::new_at(data, offset);
                let mut decoded = Vec::with_capacity(vertex_count);
                for _ in 0..vertex_count {
                    let mut vertex = Vertex::default();
                    for element in &description.elements {
                        let value = (element.format.info().read)(&mut br)?;
                        vertex.elements.push((element.name, value));
                    }
                    decoded.push(vertex);
                }
                cache.insert((buffer_id, desc_id), decoded.clone());
                decoded
            }
        };

        for (vertex, part) in vertices.iter_mut().zip(decoded) {
            vertex.elements.extend(part.elements);
        }
    }
    Ok(vertices)
}

fn read_channel(r: &mut BinaryReader<'_>) -> Result<Channel> {
    Ok(Channel {
        texture: r.read_sized_string()?,
        scale: r.read_vec2()?,
        bias: r.read_vec2()?,
    })
}

fn write_channel(w: &mut BinaryWriter, channel: &Channel) -> Result<()> {
    w.write_sized_string(&channel.texture)?;
    w.write_vec2(channel.scale)?;
    w.write_vec2(channel.bias)?;
    Ok(())
}

fn read_bucket_grid(r: &mut BinaryReader<'_>, version: u32) -> Result<BucketGrid> {
    let hash = if version >= 15 { r.read_u32()? } else { 0 };
    let min_x = r.read_f32()?;
    let min_z = r.read_f32()?;
    let max_x = r.read_f32()?;
    let max_z = r.read_f32()?;
    let max_out_stick_x = r.read_f32()?;
    let max_out_stick_z = r.read_f32()?;
    let bucket_size_x = r.read_f32()?;
    let bucket_size_z = r.read_f32()?;
    let buckets_per_side = r.read_u16()? as usize;
    let is_disabled = r.read_bool()?;
    let flags = r.read_u8()?;
    let vertex_count = r.read_u32()? as usize;
    let index_count = r.read_u32()? as usize;

    let vertices = r.read_vec3_array(vertex_count)?;
    let indices = r.read_u16_array(index_count)?;

    let mut buckets = Vec::with_capacity(buckets_per_side);
    for _ in 0..buckets_per_side {
        let mut row = Vec::with_capacity(buckets_per_side);
        for _ in 0..buckets_per_side {
            row.push(Bucket {
                max_stick_out_x: r.read_f32()?,
                max_stick_out_z: r.read_f32()?,
                start_index: r.read_u32()?,
                base_vertex: r.read_u32()?,
                inside_face_count: r.read_u16()?,
                sticking_out_face_count: r.read_u16()?,
            });
        }
        buckets.push(row);
    }

    // One mask byte per triangle, present only when the header bit says so.
    let face_visibility = if flags & GRID_FLAG_FACE_VISIBILITY != 0 {
        r.read_bytes(index_count / 3)?.to_vec()
    } else {
        Vec::new()
    };

    Ok(BucketGrid {
        hash,
        min_x,
        min_z,
        max_x,
        max_z,
        max_out_stick_x,
        max_out_stick_z,
        bucket_size_x,
        bucket_size_z,
        is_disabled,
        flags: flags & !GRID_FLAG_FACE_VISIBILITY,
        vertices,
        indices,
        buckets,
        face_visibility,
    })
}

fn write_bucket_grid(w: &mut BinaryWriter, g: usize, grid: &BucketGrid) -> Result<()> {
    let side = grid.buckets.len();
    if grid.buckets.iter().any(|row| row.len() != side) {
        return Err(Error::BucketGridNotSquare(g));
    }
    if !grid.face_visibility.is_empty() && grid.face_visibility.len() != grid.indices.len() / 3 {
        return Err(Error::FaceVisibilityLengthMismatch {
            grid: g,
            expected: grid.indices.len() / 3,
            actual: grid.face_visibility.len(),
        });
    }

    w.write_u32(grid.hash)?;
    w.write_f32(grid.min_x)?;
    w.write_f32(grid.min_z)?;
    w.write_f32(grid.max_x)?;
    w.write_f32(grid.max_z)?;
    w.write_f32(grid.max_out_stick_x)?;
    w.write_f32(grid.max_out_stick_z)?;
    w.write_f32(grid.bucket_size_x)?;
    w.write_f32(grid.bucket_size_z)?;
    w.write_u16(side as u16)?;
    w.write_bool(grid.is_disabled)?;
    let mut flags = grid.flags & !GRID_FLAG_FACE_VISIBILITY;
    if !grid.face_visibility.is_empty() {
        flags |= GRID_FLAG_FACE_VISIBILITY;
    }
    w.write_u8(flags)?;
    w.write_u32(grid.vertices.len() as u32)?;
    w.write_u32(grid.indices.len() as u32)?;
    for &v in &grid.vertices {
        w.write_vec3(v)?;
    }
    for &i in &grid.indices {
        w.write_u16(i)?;
    }
    for row in &grid.buckets {
        for bucket in row {
            w.write_f32(bucket.max_stick_out_x)?;
            w.write_f32(bucket.max_stick_out_z)?;
            w.write_u32(bucket.start_index)?;
            w.write_u32(bucket.base_vertex)?;
            w.write_u16(bucket.inside_face_count)?;
            w.write_u16(bucket.sticking_out_face_count)?;
        }
    }
    w.write_bytes(&grid.face_visibility)?;
    Ok(())
}

/// Derive the encode-time vertex description from a model's first vertex.
fn derive_description(m: usize, model: &Model) -> Result<VertexDescription> {
    let first = model.vertices.first().ok_or(Error::EmptyModel(m))?;
    let elements = first
        .elements
        .iter()
        .map(|(name, value)| VertexElement {
            name: *name,
            format: format_for(value),
        })
        .collect();
    Ok(VertexDescription { usage: 0, elements })
}

/// The format a value re-encodes as. Packed lanes always re-tag as RGBA;
/// the bytes pass through unswizzled either way.
fn format_for(value: &VertexValue) -> ElementFormat {
    match value {
        VertexValue::Float(_) => ElementFormat::XFloat32,
        VertexValue::Vec2(_) => ElementFormat::XyFloat32,
        VertexValue::Vec3(_) => ElementFormat::XyzFloat32,
        VertexValue::Vec4(_) => ElementFormat::XyzwFloat32,
        VertexValue::Packed(_) => ElementFormat::RgbaPacked8888,
    }
}

fn write_vertex(
    w: &mut BinaryWriter,
    m: usize,
    vi: usize,
    vertex: &Vertex,
    description: &VertexDescription,
) -> Result<()> {
    if vertex.elements.len() != description.elements.len() {
        return Err(Error::InconsistentVertex { model: m, vertex: vi });
    }
    for element in &description.elements {
        let value = vertex.get(element.name).ok_or(Error::InconsistentVertex {
            model: m,
            vertex: vi,
        })?;
        if format_for(value) != element.format {
            return Err(Error::InconsistentVertex { model: m, vertex: vi });
        }
        match value {
            VertexValue::Float(v) => w.write_f32(*v)?,
            VertexValue::Vec2(v) => w.write_vec2(*v)?,
            VertexValue::Vec3(v) => w.write_vec3(*v)?,
            VertexValue::Vec4(v) => w.write_vec4(*v)?,
            VertexValue::Packed(bytes) => w.write_bytes(bytes)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec2, Vec3};

    use super::*;

    const POSITIONS: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [4.0, 1.0, 0.0], [2.0, 0.0, 3.0]];

    struct Opts {
        models: usize,
        /// Vertex count each model declares (the buffer holds 3).
        vertex_count: u32,
        /// Overriding vertex count declared by the second model only.
        second_vertex_count: Option<u32>,
        /// Index count the submesh declares (the model declares 3).
        submesh_index_count: u32,
        with_grid: bool,
        visibility: bool,
        point_lights: bool,
        overrides: u32,
    }

    impl Default for Opts {
        fn default() -> Self {
            Self {
                models: 1,
                vertex_count: 3,
                second_vertex_count: None,
                submesh_index_count: 3,
                with_grid: false,
                visibility: false,
                point_lights: false,
                overrides: 2,
            }
        }
    }

    fn put_channel(w: &mut BinaryWriter, texture: &str) {
        w.write_sized_string(texture).unwrap();
        w.write_vec2(Vec2::new(1.0, 1.0)).unwrap();
        w.write_vec2(Vec2::ZERO).unwrap();
    }

    /// Hand-build a file of the requested version: one vertex buffer of 3
    /// position+texcoord vertices, one index buffer, `opts.models` models
    /// all referencing buffer 0.
    fn fixture(version: u32, opts: Opts) -> Vec<u8> {
        let mut w = BinaryWriter::new();
        w.write_bytes(MAGIC).unwrap();
        w.write_u32(version).unwrap();
        if version < 7 {
            w.write_bool(opts.point_lights).unwrap();
        }
        if version >= 9 {
            w.write_sized_string("maps/base").unwrap();
            if version >= 11 {
                w.write_sized_string("").unwrap();
            }
        }

        // One description: Position (XyzFloat32) + Texcoord0 (XyFloat32).
        w.write_u32(1).unwrap();
        w.write_u32(0).unwrap();
        w.write_u32(2).unwrap();
        w.write_u32(ElementName::Position.to_u32()).unwrap();
        w.write_u32(ElementFormat::XyzFloat32.to_u32()).unwrap();
        w.write_u32(ElementName::Texcoord0.to_u32()).unwrap();
        w.write_u32(ElementFormat::XyFloat32.to_u32()).unwrap();
        w.pad(8 * (DESCRIPTION_SLOTS - 2)).unwrap();

        // One vertex buffer, 3 vertices of stride 20.
        w.write_u32(1).unwrap();
        if version >= 13 {
            w.write_u8(0xFF).unwrap();
        }
        w.write_u32(60).unwrap();
        for p in POSITIONS {
            w.write_vec3(Vec3::from_array(p)).unwrap();
            w.write_vec2(Vec2::new(0.5, 0.5)).unwrap();
        }

        // One index buffer.
        w.write_u32(1).unwrap();
        if version >= 13 {
            w.write_u8(0xFF).unwrap();
        }
        w.write_u32(6).unwrap();
        for i in [0u16, 1, 2] {
            w.write_u16(i).unwrap();
        }

        w.write_u32(opts.models as u32).unwrap();
        for m in 0..opts.models {
            if version < 12 {
                w.write_sized_string(&format!("mesh_{m}")).unwrap();
            }
            let declared = match (m, opts.second_vertex_count) {
                (1, Some(count)) => count,
                _ => opts.vertex_count,
            };
            w.write_u32(declared).unwrap();
            w.write_u32(1).unwrap();
            w.write_i32(0).unwrap();
            w.write_i32(0).unwrap();
            w.write_u32(3).unwrap();
            w.write_i32(0).unwrap();
            if version >= 13 {
                w.write_u8(0x0F).unwrap();
            }
            if version >= 15 {
                w.write_u32(0xABC).unwrap();
            }

            w.write_u32(1).unwrap(); // submesh count
            w.write_u32(7).unwrap();
            w.write_sized_string("lambert1").unwrap();
            w.write_u32(0).unwrap();
            w.write_u32(opts.submesh_index_count).unwrap();
            w.write_u32(0).unwrap();
            w.write_u32(2).unwrap();

            if version != 5 {
                w.write_bool(false).unwrap();
            }
            w.write_vec3(Vec3::ZERO).unwrap();
            w.write_vec3(Vec3::ONE).unwrap();
            w.write_mtx4(&Mat4::IDENTITY).unwrap();
            w.write_u8(7).unwrap();
            if (7..13).contains(&version) {
                w.write_u8(0x0F).unwrap();
            }
            if version >= 11 {
                w.write_u8(1).unwrap();
            }
            if version < 9 && opts.point_lights {
                w.write_vec3(Vec3::new(1.0, 2.0, 3.0)).unwrap();
            }
            if version < 9 {
                for _ in 0..27 {
                    w.write_f32(0.25).unwrap();
                }
            }

            put_channel(&mut w, "light.dds");
            if version >= 9 {
                put_channel(&mut w, "");
            }
            if version >= 17 {
                w.write_u32(opts.overrides).unwrap();
                for _ in 0..opts.overrides {
                    put_channel(&mut w, "paint.dds");
                }
            } else if version >= 12 {
                put_channel(&mut w, "paint.dds");
            }
        }

        if opts.with_grid {
            if version >= 15 {
                w.write_u32(1).unwrap(); // grid count
                w.write_u32(0xABC).unwrap(); // hash
            }
            for v in [0.0f32, 0.0, 100.0, 100.0, 0.0, 0.0, 50.0, 50.0] {
                w.write_f32(v).unwrap();
            }
            w.write_u16(2).unwrap(); // buckets per side
            w.write_bool(false).unwrap();
            w.write_u8(if opts.visibility { 1 } else { 0 }).unwrap();
            w.write_u32(3).unwrap();
            w.write_u32(6).unwrap();
            for i in 0..3 {
                w.write_vec3(Vec3::splat(i as f32)).unwrap();
            }
            for i in [0u16, 1, 2, 0, 2, 1] {
                w.write_u16(i).unwrap();
            }
            for _ in 0..4 {
                w.write_f32(0.0).unwrap();
                w.write_f32(0.0).unwrap();
                w.write_u32(0).unwrap();
                w.write_u32(0).unwrap();
                w.write_u16(1).unwrap();
                w.write_u16(0).unwrap();
            }
            if opts.visibility {
                w.write_bytes(&[0b11, 0b01]).unwrap();
            }
        }

        w.into_bytes()
    }

    #[test]
    fn test_decode_v17_basic() {
        let geo = MapGeometry::parse(&fixture(17, Opts::default())).unwrap();

        assert_eq!(geo.version, 17);
        assert_eq!(geo.baked_terrain_samplers, vec!["maps/base", ""]);
        assert_eq!(geo.vertex_descriptions.len(), 1);
        assert!(geo.bucket_grids.is_empty());
        assert!(geo.planar_reflectors.is_empty());

        let model = &geo.models[0];
        assert_eq!(model.name, "Instance_0");
        assert_eq!(model.layer, 0x0F);
        assert_eq!(model.bucket_grid_hash, 0xABC);
        assert_eq!(model.render_flags, 1);
        assert_eq!(model.quality, 7);
        assert_eq!(model.indices, vec![0, 1, 2]);
        assert_eq!(model.submeshes[0].material, "lambert1");
        assert!(model.stationary_light.is_some());
        assert_eq!(model.texture_overrides.len(), 2);
        assert!(model.point_light.is_none());
        assert!(model.light_probes.is_none());

        assert_eq!(model.vertices.len(), 3);
        assert_eq!(model.vertices[1].position(), Some(Vec3::new(4.0, 1.0, 0.0)));
        assert_eq!(
            model.vertices[0].get(ElementName::Texcoord0),
            Some(&VertexValue::Vec2(Vec2::new(0.5, 0.5)))
        );
    }

    #[test]
    fn test_decode_v11_named_model_late_layer() {
        let geo = MapGeometry::parse(&fixture(11, Opts::default())).unwrap();

        let model = &geo.models[0];
        assert_eq!(model.name, "mesh_0");
        // 7 <= version < 13 stores the layer byte after the quality byte,
        // and it must land in the same field as the version 13+ gate.
        assert_eq!(model.layer, 0x0F);
        assert!(model.texture_overrides.is_empty());
        assert!(model.stationary_light.is_some());
        assert_eq!(model.bucket_grid_hash, 0);
    }

    #[test]
    fn test_decode_v5_point_lights_and_probes() {
        let geo = MapGeometry::parse(&fixture(
            5,
            Opts {
                point_lights: true,
                ..Opts::default()
            },
        ))
        .unwrap();

        assert!(geo.use_separate_point_lights);
        assert!(geo.baked_terrain_samplers.is_empty());

        let model = &geo.models[0];
        assert_eq!(model.point_light, Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(model.light_probes.map(|p| p[0]), Some(0.25));
        assert!(!model.flip_normals);
        assert_eq!(model.render_flags, 0);
        assert!(model.stationary_light.is_none());
    }

    #[test]
    fn test_texture_override_shape_differs_v13_v17() {
        let v13 = MapGeometry::parse(&fixture(13, Opts::default())).unwrap();
        let v17 = MapGeometry::parse(&fixture(17, Opts::default())).unwrap();

        // Single record before version 17, count-prefixed array after.
        assert_eq!(v13.models[0].texture_overrides.len(), 1);
        assert_eq!(v17.models[0].texture_overrides.len(), 2);
    }

    #[test]
    fn test_shared_vertex_buffer_between_models() {
        let geo = MapGeometry::parse(&fixture(
            17,
            Opts {
                models: 2,
                ..Opts::default()
            },
        ))
        .unwrap();

        assert_eq!(geo.models.len(), 2);
        assert_eq!(geo.models[0].vertices.len(), 3);
        assert_eq!(geo.models[0].vertices, geo.models[1].vertices);
    }

    #[test]
    fn test_vertex_buffer_size_mismatch() {
        let result = MapGeometry::parse(&fixture(
            17,
            Opts {
                vertex_count: 4,
                ..Opts::default()
            },
        ));

        assert!(matches!(
            result,
            Err(Error::VertexBufferSizeMismatch {
                expected: 80,
                actual: 60,
                ..
            })
        ));
    }

    #[test]
    fn test_shared_buffer_vertex_count_mismatch_rejected() {
        // The second model re-references the buffer the first model already
        // decoded, but declares a different vertex count; the size check
        // must fire regardless of the decode cache.
        let result = MapGeometry::parse(&fixture(
            17,
            Opts {
                models: 2,
                second_vertex_count: Some(5),
                ..Opts::default()
            },
        ));

        assert!(matches!(
            result,
            Err(Error::VertexBufferSizeMismatch {
                vertex_count: 5,
                expected: 100,
                actual: 60,
                ..
            })
        ));
    }

    #[test]
    fn test_huge_declared_counts_are_truncation_errors() {
        // A tiny file declaring u32::MAX records must fail on the first
        // missing record, not reserve memory for the declared count.
        let mut w = BinaryWriter::new();
        w.write_bytes(MAGIC).unwrap();
        w.write_u32(17).unwrap();
        w.write_sized_string("").unwrap();
        w.write_sized_string("").unwrap();
        w.write_u32(u32::MAX).unwrap(); // vertex description count
        assert!(matches!(
            MapGeometry::parse(&w.into_bytes()),
            Err(Error::Common(riftfile_common::Error::UnexpectedEof { .. }))
        ));

        let mut w = BinaryWriter::new();
        w.write_bytes(MAGIC).unwrap();
        w.write_u32(17).unwrap();
        w.write_sized_string("").unwrap();
        w.write_sized_string("").unwrap();
        w.write_u32(0).unwrap(); // descriptions
        w.write_u32(0).unwrap(); // vertex buffers
        w.write_u32(0).unwrap(); // index buffers
        w.write_u32(u32::MAX).unwrap(); // model count
        assert!(matches!(
            MapGeometry::parse(&w.into_bytes()),
            Err(Error::Common(riftfile_common::Error::UnexpectedEof { .. }))
        ));
    }

    #[test]
    fn test_odd_index_buffer_size_rejected() {
        let mut w = BinaryWriter::new();
        w.write_bytes(MAGIC).unwrap();
        w.write_u32(17).unwrap();
        w.write_sized_string("").unwrap();
        w.write_sized_string("").unwrap();
        w.write_u32(0).unwrap(); // descriptions
        w.write_u32(0).unwrap(); // vertex buffers
        w.write_u32(1).unwrap(); // index buffers
        w.write_u8(0xFF).unwrap();
        w.write_u32(7).unwrap();
        w.write_bytes(&[0u8; 7]).unwrap();

        assert!(matches!(
            MapGeometry::parse(&w.into_bytes()),
            Err(Error::IndexBufferSizeOdd { buffer: 0, size: 7 })
        ));
    }

    #[test]
    fn test_submesh_out_of_range() {
        let result = MapGeometry::parse(&fixture(
            17,
            Opts {
                submesh_index_count: 5,
                ..Opts::default()
            },
        ));

        assert!(matches!(
            result,
            Err(Error::SubmeshOutOfRange {
                model: 0,
                submesh: 0,
                end: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_bucket_grid_with_visibility_flags() {
        let geo = MapGeometry::parse(&fixture(
            17,
            Opts {
                with_grid: true,
                visibility: true,
                ..Opts::default()
            },
        ))
        .unwrap();

        let grid = &geo.bucket_grids[0];
        assert_eq!(grid.hash, 0xABC);
        assert_eq!(grid.buckets_per_side(), 2);
        assert_eq!(grid.buckets[1].len(), 2);
        assert_eq!(grid.indices.len(), 6);
        // One mask byte per triangle, flag bit stripped from `flags`.
        assert_eq!(grid.face_visibility, vec![0b11, 0b01]);
        assert_eq!(grid.flags, 0);
    }

    #[test]
    fn test_grid_absence_is_not_truncation() {
        // Ends exactly at the expected point: empty grids, no error.
        let geo = MapGeometry::parse(&fixture(17, Opts::default())).unwrap();
        assert!(geo.bucket_grids.is_empty());

        // One byte short of a complete grid: a hard decode error.
        let mut bytes = fixture(
            17,
            Opts {
                with_grid: true,
                ..Opts::default()
            },
        );
        bytes.pop();
        assert!(matches!(
            MapGeometry::parse(&bytes),
            Err(Error::Common(riftfile_common::Error::UnexpectedEof { .. }))
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut w = BinaryWriter::new();
        w.write_bytes(MAGIC).unwrap();
        w.write_u32(8).unwrap();

        assert!(matches!(
            MapGeometry::parse(&w.into_bytes()),
            Err(Error::UnsupportedVersion(8))
        ));
    }

    #[test]
    fn test_bad_magic() {
        assert!(matches!(
            MapGeometry::parse(b"MGEO\x11\x00\x00\x00"),
            Err(Error::Common(riftfile_common::Error::InvalidMagic { .. }))
        ));
    }

    #[test]
    fn test_write_round_trip_is_stable() {
        let first = MapGeometry::parse(&fixture(
            17,
            Opts {
                with_grid: true,
                visibility: true,
                ..Opts::default()
            },
        ))
        .unwrap();
        let second = MapGeometry::parse(&first.to_bytes().unwrap()).unwrap();
        let third = MapGeometry::parse(&second.to_bytes().unwrap()).unwrap();

        assert_eq!(second, third);
        assert_eq!(second.models[0].vertices, first.models[0].vertices);
        assert_eq!(second.bucket_grids, first.bucket_grids);
    }

    #[test]
    fn test_write_recomputes_bounding_box() {
        let mut geo = MapGeometry::parse(&fixture(17, Opts::default())).unwrap();
        geo.models[0].bounding_box = BoundingBox {
            min: Vec3::splat(-999.0),
            max: Vec3::splat(999.0),
        };

        let decoded = MapGeometry::parse(&geo.to_bytes().unwrap()).unwrap();
        assert_eq!(
            decoded.models[0].bounding_box,
            BoundingBox {
                min: Vec3::ZERO,
                max: Vec3::new(4.0, 1.0, 3.0),
            }
        );
    }

    #[test]
    fn test_legacy_version_upgraded_on_write() {
        let legacy = MapGeometry::parse(&fixture(9, Opts::default())).unwrap();
        assert_eq!(legacy.version, 9);

        let rewritten = MapGeometry::parse(&legacy.to_bytes().unwrap()).unwrap();
        assert_eq!(rewritten.version, WRITE_VERSION);
        assert_eq!(rewritten.models[0].vertices, legacy.models[0].vertices);
        assert_eq!(rewritten.models[0].name, "Instance_0");
    }
}
