//! Geometry column assembly (§4.5): converting the three nested length
//! streams into cumulative offsets, then walking the type-tag array to build
//! a `Geometry` tree (or handing back a flat GPU vector when the column is
//! tessellated).

use crate::buffer::{BufferStream, ByteWriter};
use crate::codec::int::{decode_int_stream_32, decode_physical_u32, encode_int_values_32};
use crate::error::{Error, Result};
use crate::geometry::{FlatGpuVector, Geometry, GeometryColumn};
use crate::stream::{DictionaryType, LengthType, LogicalStreamType, OffsetType, PhysicalStreamType, StreamMetadata, StreamSubtype};
use crate::tileset::GeometryType;
use crate::varint::{decode_varint_u32, encode_varint_u32, zigzag_decode_32, zigzag_encode_32};

type Vertex = (i32, i32);

/// The cumulative offset arrays produced by converting a column's nested
/// length streams. `root` always exists (one entry per feature, plus the
/// trailing total); `level1`/`level2` exist only as deep as the column's
/// stream set requires. Whichever is deepest indexes directly into the
/// vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryOffsets {
    pub root: Vec<u32>,
    pub level1: Option<Vec<u32>>,
    pub level2: Option<Vec<u32>>,
}

impl GeometryOffsets {
    fn leaf_depth(&self) -> usize {
        if self.level2.is_some() {
            2
        } else if self.level1.is_some() {
            1
        } else {
            0
        }
    }

    fn window(&self, depth: usize, index: usize) -> Result<(u32, u32)> {
        let array = match depth {
            0 => &self.root,
            1 => self.level1.as_ref().ok_or_else(|| Error::geometry("level-1 offsets requested but absent"))?,
            2 => self.level2.as_ref().ok_or_else(|| Error::geometry("level-2 offsets requested but absent"))?,
            _ => return Err(Error::geometry("geometry nesting deeper than 2 levels is not supported")),
        };

        let (start, end) = (
            *array.get(index).ok_or_else(|| Error::geometry(format!("offset index {} out of range", index)))?,
            *array.get(index + 1).ok_or_else(|| Error::geometry(format!("offset index {} out of range", index + 1)))?,
        );

        Ok((start, end))
    }
}

fn ordinal(geometry_type: GeometryType) -> u8 {
    geometry_type.code()
}

/// Build cumulative offsets from a per-entry type list and a length stream:
/// append `1` for entries at or below `buffer_id`, else consume the next
/// length-stream value. One entry per input type, plus a leading `0`.
pub fn decode_root_length_stream(
    types: &[GeometryType],
    length_stream: &[u32],
    buffer_id: GeometryType,
) -> Result<Vec<u32>> {
    let mut offsets = Vec::with_capacity(types.len() + 1);
    offsets.push(0_u32);
    let mut cursor = 0;

    for &geometry_type in types {
        let count = if ordinal(geometry_type) > ordinal(buffer_id) {
            let value = *length_stream
                .get(cursor)
                .ok_or_else(|| Error::count_mismatch("root length stream exhausted before all types were consumed"))?;
            cursor += 1;
            value
        } else {
            1
        };

        offsets.push(offsets.last().unwrap() + count);
    }

    if cursor != length_stream.len() {
        return Err(Error::trailing_bytes(format!(
            "root length stream had {} unused values", length_stream.len() - cursor
        )));
    }

    Ok(offsets)
}

/// Level-1 conversion when a ring buffer exists downstream: Polygon and
/// MultiPolygon entries always consume a PARTS value (their ring count);
/// MultiLineString/LineString consume only when `is_linestring_present`
/// (i.e. the column also holds line types sharing this same PARTS stream).
pub fn decode_level1_length_stream(
    entry_types: &[GeometryType],
    length_stream: &[u32],
    is_linestring_present: bool,
) -> Result<Vec<u32>> {
    decode_conditional_length_stream(entry_types, length_stream, |t| {
        matches!(t, GeometryType::Polygon | GeometryType::MultiPolygon)
            || (is_linestring_present && matches!(t, GeometryType::LineString | GeometryType::MultiLineString))
    })
}

/// Level-1 conversion when there is no ring buffer at all: only
/// MultiLineString/LineString entries consume a PARTS value (their vertex
/// count); MultiPoint/Point never do.
pub fn decode_level1_length_stream_without_ring_buffer(
    entry_types: &[GeometryType],
    length_stream: &[u32],
) -> Result<Vec<u32>> {
    decode_conditional_length_stream(entry_types, length_stream, |t| {
        matches!(t, GeometryType::LineString | GeometryType::MultiLineString)
    })
}

/// Level-2 conversion: every non-Point, non-MultiPoint entry consumes a
/// RINGS value (a ring's vertex count).
pub fn decode_level2_length_stream(entry_types: &[GeometryType], length_stream: &[u32]) -> Result<Vec<u32>> {
    decode_conditional_length_stream(entry_types, length_stream, |t| {
        !matches!(t, GeometryType::Point | GeometryType::MultiPoint)
    })
}

fn decode_conditional_length_stream(
    entry_types: &[GeometryType],
    length_stream: &[u32],
    consumes: impl Fn(GeometryType) -> bool,
) -> Result<Vec<u32>> {
    let mut offsets = Vec::with_capacity(entry_types.len() + 1);
    offsets.push(0_u32);
    let mut cursor = 0;

    for &entry_type in entry_types {
        let count = if consumes(entry_type) {
            let value = *length_stream
                .get(cursor)
                .ok_or_else(|| Error::count_mismatch("length stream exhausted before all entries were consumed"))?;
            cursor += 1;
            value
        } else {
            1
        };

        offsets.push(offsets.last().unwrap() + count);
    }

    if cursor != length_stream.len() {
        return Err(Error::trailing_bytes(format!(
            "length stream had {} unused values", length_stream.len() - cursor
        )));
    }

    Ok(offsets)
}

/// Repeat each feature's type once per sub-entry its offsets window spans --
/// turns a per-feature type list into a per-root-entry (or per-level1-entry)
/// type list, so the next nesting level's conditional consume can be
/// evaluated against the right parent type.
pub fn expand_types_by_offsets(types: &[GeometryType], offsets: &[u32]) -> Vec<GeometryType> {
    let mut out = Vec::with_capacity(*offsets.last().unwrap_or(&0) as usize);

    for (i, &geometry_type) in types.iter().enumerate() {
        let count = offsets[i + 1] - offsets[i];
        out.extend(std::iter::repeat(geometry_type).take(count as usize));
    }

    out
}

/// Run the full length-stream dispatch (§4.5 "Length -> offset conversion")
/// for one geometry column, given which of the three optional length
/// streams the column actually carries.
pub fn compute_geometry_offsets(
    types: &[GeometryType],
    geometry_lengths: Option<&[u32]>,
    part_lengths: Option<&[u32]>,
    ring_lengths: Option<&[u32]>,
) -> Result<GeometryOffsets> {
    match (geometry_lengths, part_lengths, ring_lengths) {
        (Some(geometry_lengths), Some(part_lengths), ring_lengths) => {
            let root = decode_root_length_stream(types, geometry_lengths, GeometryType::Polygon)?;
            let root_types = expand_types_by_offsets(types, &root);

            if let Some(ring_lengths) = ring_lengths {
                let level1 = decode_level1_length_stream(&root_types, part_lengths, false)?;
                let level1_types = expand_types_by_offsets(&root_types, &level1);
                let level2 = decode_level2_length_stream(&level1_types, ring_lengths)?;
                Ok(GeometryOffsets { root, level1: Some(level1), level2: Some(level2) })
            } else {
                let level1 = decode_level1_length_stream_without_ring_buffer(&root_types, part_lengths)?;
                Ok(GeometryOffsets { root, level1: Some(level1), level2: None })
            }
        }

        (None, Some(part_lengths), ring_lengths) => {
            if let Some(ring_lengths) = ring_lengths {
                let root = decode_root_length_stream(types, part_lengths, GeometryType::LineString)?;
                let root_types = expand_types_by_offsets(types, &root);
                let level1 = decode_level1_length_stream(&root_types, ring_lengths, true)?;
                Ok(GeometryOffsets { root, level1: Some(level1), level2: None })
            } else {
                let root = decode_root_length_stream(types, part_lengths, GeometryType::Point)?;
                Ok(GeometryOffsets { root, level1: None, level2: None })
            }
        }

        (None, None, _) => {
            let root = (0..=types.len() as u32).collect();
            Ok(GeometryOffsets { root, level1: None, level2: None })
        }

        (Some(_), None, _) => Err(Error::metadata_mismatch(
            "geometry column carries a GEOMETRIES length stream without a PARTS length stream",
        )),
    }
}

fn close_ring(ring: &mut Vec<Vertex>) {
    if let (Some(&first), Some(&last)) = (ring.first(), ring.last()) {
        if first != last {
            ring.push(first);
        }
    }
}

fn ring_at(offsets: &GeometryOffsets, vertices: &[Vertex], index: u32) -> Result<Vec<Vertex>> {
    let (start, end) = offsets.window(2, index as usize)?;
    let mut ring = vertices
        .get(start as usize..end as usize)
        .ok_or_else(|| Error::geometry("ring vertex window out of range"))?
        .to_vec();
    close_ring(&mut ring);
    Ok(ring)
}

/// Walk the type-tag array and the offsets it produced, slicing `vertices`
/// to build one `Geometry` value per feature.
pub fn assemble_geometries(
    types: &[GeometryType],
    offsets: &GeometryOffsets,
    vertices: &[Vertex],
) -> Result<Vec<Geometry>> {
    let leaf_depth = offsets.leaf_depth();
    let mut out = Vec::with_capacity(types.len());

    for (i, &geometry_type) in types.iter().enumerate() {
        let (root_start, root_end) = offsets.window(0, i)?;

        let geometry = match geometry_type {
            GeometryType::Point => {
                let (vertex_start, _) = if leaf_depth == 0 {
                    (root_start, root_end)
                } else {
                    offsets.window(leaf_depth, root_start as usize)?
                };
                let vertex = *vertices
                    .get(vertex_start as usize)
                    .ok_or_else(|| Error::geometry("point vertex index out of range"))?;
                Geometry::Point(vertex)
            }

            GeometryType::MultiPoint => {
                let (vertex_start, vertex_end) = if leaf_depth == 0 {
                    (root_start, root_end)
                } else if root_end > root_start {
                    let (first_start, _) = offsets.window(leaf_depth, root_start as usize)?;
                    let (_, last_end) = offsets.window(leaf_depth, (root_end - 1) as usize)?;
                    (first_start, last_end)
                } else {
                    (root_start, root_start)
                };
                let points = vertices
                    .get(vertex_start as usize..vertex_end as usize)
                    .ok_or_else(|| Error::geometry("multipoint vertex window out of range"))?
                    .to_vec();
                Geometry::MultiPoint(points)
            }

            GeometryType::LineString => {
                let (vertex_start, vertex_end) = offsets.window(leaf_depth.max(1), root_start as usize)?;
                let line = vertices
                    .get(vertex_start as usize..vertex_end as usize)
                    .ok_or_else(|| Error::geometry("linestring vertex window out of range"))?
                    .to_vec();
                Geometry::LineString(line)
            }

            GeometryType::MultiLineString => {
                let mut lines = Vec::with_capacity((root_end - root_start) as usize);
                for entry in root_start..root_end {
                    let (vertex_start, vertex_end) = offsets.window(leaf_depth.max(1), entry as usize)?;
                    lines.push(
                        vertices
                            .get(vertex_start as usize..vertex_end as usize)
                            .ok_or_else(|| Error::geometry("multilinestring vertex window out of range"))?
                            .to_vec(),
                    );
                }
                Geometry::MultiLineString(lines)
            }

            GeometryType::Polygon => {
                let rings = if leaf_depth == 2 {
                    if root_end - root_start != 1 {
                        return Err(Error::geometry("polygon feature must have exactly one part entry"));
                    }
                    let (ring_start, ring_end) = offsets.window(1, root_start as usize)?;
                    (ring_start..ring_end).map(|r| ring_at(offsets, vertices, r)).collect::<Result<Vec<_>>>()?
                } else {
                    (root_start..root_end).map(|r| ring_at(offsets, vertices, r)).collect::<Result<Vec<_>>>()?
                };
                Geometry::Polygon(rings)
            }

            GeometryType::MultiPolygon => {
                if leaf_depth != 2 {
                    return Err(Error::geometry("multipolygon requires both PARTS and RINGS length streams"));
                }
                let mut polygons = Vec::with_capacity((root_end - root_start) as usize);
                for polygon_index in root_start..root_end {
                    let (ring_start, ring_end) = offsets.window(1, polygon_index as usize)?;
                    let rings = (ring_start..ring_end).map(|r| ring_at(offsets, vertices, r)).collect::<Result<Vec<_>>>()?;
                    polygons.push(rings);
                }
                Geometry::MultiPolygon(polygons)
            }
        };

        out.push(geometry);
    }

    if out.len() != types.len() {
        return Err(Error::count_mismatch("emitted geometry count did not match the type-tag count"));
    }

    Ok(out)
}

/// Resolve a vertex dictionary: either a plain index into `dictionary`, or,
/// when the dictionary is Morton-coded, a Morton decode of the index itself.
pub fn resolve_vertex_dictionary(
    indices: &[u32],
    dictionary: Option<&[Vertex]>,
    morton: Option<(u32, i32)>,
) -> Result<Vec<Vertex>> {
    if let Some((num_bits, coordinate_shift)) = morton {
        Ok(indices
            .iter()
            .map(|&index| crate::curve::morton_decode(index as u64, num_bits, coordinate_shift))
            .collect())
    } else {
        let dictionary = dictionary.ok_or_else(|| Error::geometry("vertex offsets present without a vertex dictionary"))?;
        indices
            .iter()
            .map(|&index| {
                dictionary.get(index as usize).copied().ok_or_else(|| {
                    Error::geometry(format!("vertex dictionary index {} out of range ({} entries)", index, dictionary.len()))
                })
            })
            .collect()
    }
}

/// A column whose index buffer is non-empty and carries no PARTS stream is a
/// tessellated "flat GPU" vector: its triangles are handed back unchanged
/// rather than walked into a `Geometry` tree (§4.5 "Tessellated geometries").
pub fn decode_geometry_column(
    types: &[GeometryType],
    offsets: &GeometryOffsets,
    vertices: &[Vertex],
    index_buffer: Option<&[u32]>,
) -> Result<GeometryColumn> {
    if let Some(indices) = index_buffer {
        if !indices.is_empty() && offsets.level1.is_none() {
            return Ok(GeometryColumn::FlatGpu(FlatGpuVector {
                vertices: vertices.to_vec(),
                indices: indices.to_vec(),
            }));
        }
    }

    Ok(GeometryColumn::Tree(assemble_geometries(types, offsets, vertices)?))
}

fn decode_morton_codes(stream: &mut BufferStream<'_>, metadata: &StreamMetadata) -> Result<Vec<u32>> {
    let physical = decode_physical_u32(stream, metadata)?;
    let mut acc: i32 = 0;
    Ok(physical
        .into_iter()
        .map(|v| {
            acc = acc.wrapping_add(zigzag_decode_32(v));
            acc as u32
        })
        .collect())
}

/// Read one geometry column's raw streams -- the type tag stream, the
/// nested length streams §4.5 dispatches among, and the vertex buffer (plain,
/// dictionary-indexed, or Morton-coded) -- and assemble it into a
/// `GeometryColumn`.
pub fn decode_geometry_column_streams(stream: &mut BufferStream<'_>) -> Result<GeometryColumn> {
    let num_streams = decode_varint_u32(stream)? as usize;
    if num_streams == 0 {
        return Err(Error::count_mismatch(
            "geometry column declares zero streams, expected at least the type tag stream",
        ));
    }

    let type_header = StreamMetadata::decode(stream)?;
    let type_codes = decode_int_stream_32(stream, &type_header, false)?;
    let types = type_codes
        .into_iter()
        .map(|v| GeometryType::from_code(v as u8))
        .collect::<Result<Vec<_>>>()?;

    let mut geometry_lengths: Option<Vec<u32>> = None;
    let mut part_lengths: Option<Vec<u32>> = None;
    let mut ring_lengths: Option<Vec<u32>> = None;
    let mut vertex_indices: Option<Vec<u32>> = None;
    let mut index_buffer: Option<Vec<u32>> = None;
    let mut vertex_data: Option<Vec<Vertex>> = None;
    let mut vertex_morton: Option<(u32, i32)> = None;

    for _ in 1..num_streams {
        let header = StreamMetadata::decode(stream)?;

        match header.physical_stream_type {
            PhysicalStreamType::Length => match header.logical_stream_type.and_then(LogicalStreamType::length_type) {
                Some(LengthType::Geometries) => {
                    geometry_lengths = Some(decode_int_stream_32(stream, &header, false)?.into_iter().map(|v| v as u32).collect());
                }
                Some(LengthType::Parts) => {
                    part_lengths = Some(decode_int_stream_32(stream, &header, false)?.into_iter().map(|v| v as u32).collect());
                }
                Some(LengthType::Rings) => {
                    ring_lengths = Some(decode_int_stream_32(stream, &header, false)?.into_iter().map(|v| v as u32).collect());
                }
                Some(LengthType::Triangles) => {
                    decode_int_stream_32(stream, &header, false)?;
                }
                other => {
                    return Err(Error::metadata_mismatch(format!(
                        "unexpected LENGTH stream subtype {:?} in a geometry column", other
                    )))
                }
            },

            PhysicalStreamType::Offset => match header.logical_stream_type.and_then(LogicalStreamType::offset_type) {
                Some(OffsetType::Vertex) => {
                    vertex_indices = Some(decode_int_stream_32(stream, &header, false)?.into_iter().map(|v| v as u32).collect());
                }
                Some(OffsetType::Index) => {
                    index_buffer = Some(decode_int_stream_32(stream, &header, false)?.into_iter().map(|v| v as u32).collect());
                }
                other => {
                    return Err(Error::metadata_mismatch(format!(
                        "unexpected OFFSET stream subtype {:?} in a geometry column", other
                    )))
                }
            },

            PhysicalStreamType::Data => {
                let dictionary_type = header.logical_stream_type.and_then(LogicalStreamType::dictionary_type);

                if dictionary_type == Some(DictionaryType::Morton) {
                    let extra = header
                        .morton_extra()
                        .ok_or_else(|| Error::metadata_mismatch("Morton-coded vertex stream missing its Morton header extension"))?;

                    if header.num_values == 0 {
                        vertex_morton = Some((extra.num_bits, extra.coordinate_shift));
                    } else {
                        let codes = decode_morton_codes(stream, &header)?;
                        vertex_data = Some(
                            codes
                                .into_iter()
                                .map(|code| crate::curve::morton_decode(code as u64, extra.num_bits, extra.coordinate_shift))
                                .collect(),
                        );
                    }
                } else {
                    let flat = decode_int_stream_32(stream, &header, true)?;
                    if flat.len() % 2 != 0 {
                        return Err(Error::geometry("vertex data stream must carry an even number of values"));
                    }
                    vertex_data = Some(flat.chunks_exact(2).map(|c| (c[0], c[1])).collect());
                }
            }

            PhysicalStreamType::Present => {
                return Err(Error::metadata_mismatch("geometry column carries a PRESENT stream, which §4.5 does not define"))
            }
        }
    }

    let offsets = compute_geometry_offsets(&types, geometry_lengths.as_deref(), part_lengths.as_deref(), ring_lengths.as_deref())?;

    let vertices = if let Some(indices) = &vertex_indices {
        resolve_vertex_dictionary(indices, vertex_data.as_deref(), vertex_morton)?
    } else {
        vertex_data.unwrap_or_default()
    };

    decode_geometry_column(&types, &offsets, &vertices, index_buffer.as_deref())
}

fn open_ring(ring: &[Vertex]) -> Vec<Vertex> {
    match (ring.first(), ring.last()) {
        (Some(&first), Some(&last)) if ring.len() > 1 && first == last => ring[..ring.len() - 1].to_vec(),
        _ => ring.to_vec(),
    }
}

/// The per-feature counts and interleaved vertex buffer an encoder needs to
/// emit a geometry column (§4.5 "Encoding"): which of the three nested
/// length streams are carried depends on the mix of geometry types present,
/// mirroring `compute_geometry_offsets`'s dispatch in reverse.
struct FlattenedColumn {
    types: Vec<GeometryType>,
    geometry_lengths: Option<Vec<u32>>,
    part_lengths: Option<Vec<u32>>,
    ring_lengths: Option<Vec<u32>>,
    vertices: Vec<Vertex>,
}

fn flatten_geometries(geometries: &[Geometry]) -> FlattenedColumn {
    let types: Vec<GeometryType> = geometries.iter().map(Geometry::geometry_type).collect();

    let has_polygon = types.iter().any(|&t| matches!(t, GeometryType::Polygon | GeometryType::MultiPolygon));
    let has_any_multi = types
        .iter()
        .any(|&t| matches!(t, GeometryType::MultiPoint | GeometryType::MultiLineString | GeometryType::MultiPolygon));
    let has_lineish = types.iter().any(|&t| matches!(t, GeometryType::LineString | GeometryType::MultiLineString));
    let has_multipoint = types.iter().any(|&t| t == GeometryType::MultiPoint);

    let mut geometry_lengths = Vec::new();
    let mut part_lengths = Vec::new();
    let mut ring_lengths = Vec::new();
    let mut vertices = Vec::new();

    if has_polygon && has_any_multi {
        for geometry in geometries {
            match geometry {
                Geometry::MultiPoint(points) => geometry_lengths.push(points.len() as u32),
                Geometry::MultiLineString(lines) => geometry_lengths.push(lines.len() as u32),
                Geometry::MultiPolygon(polygons) => geometry_lengths.push(polygons.len() as u32),
                _ => {}
            }

            match geometry {
                Geometry::Point(v) => vertices.push(*v),
                Geometry::MultiPoint(points) => vertices.extend(points.iter().copied()),
                Geometry::LineString(line) => {
                    ring_lengths.push(line.len() as u32);
                    vertices.extend(line.iter().copied());
                }
                Geometry::MultiLineString(lines) => {
                    for line in lines {
                        ring_lengths.push(line.len() as u32);
                        vertices.extend(line.iter().copied());
                    }
                }
                Geometry::Polygon(rings) => {
                    part_lengths.push(rings.len() as u32);
                    for ring in rings {
                        let open = open_ring(ring);
                        ring_lengths.push(open.len() as u32);
                        vertices.extend(open);
                    }
                }
                Geometry::MultiPolygon(polygons) => {
                    for rings in polygons {
                        part_lengths.push(rings.len() as u32);
                        for ring in rings {
                            let open = open_ring(ring);
                            ring_lengths.push(open.len() as u32);
                            vertices.extend(open);
                        }
                    }
                }
            }
        }

        FlattenedColumn {
            types,
            geometry_lengths: Some(geometry_lengths),
            part_lengths: Some(part_lengths),
            ring_lengths: Some(ring_lengths),
            vertices,
        }
    } else if has_polygon || has_lineish {
        for geometry in geometries {
            match geometry {
                Geometry::Point(v) => vertices.push(*v),
                Geometry::LineString(line) => {
                    ring_lengths.push(line.len() as u32);
                    vertices.extend(line.iter().copied());
                }
                Geometry::MultiLineString(lines) => {
                    part_lengths.push(lines.len() as u32);
                    for line in lines {
                        ring_lengths.push(line.len() as u32);
                        vertices.extend(line.iter().copied());
                    }
                }
                Geometry::Polygon(rings) => {
                    part_lengths.push(rings.len() as u32);
                    for ring in rings {
                        let open = open_ring(ring);
                        ring_lengths.push(open.len() as u32);
                        vertices.extend(open);
                    }
                }
                Geometry::MultiPoint(points) => {
                    part_lengths.push(points.len() as u32);
                    vertices.extend(points.iter().copied());
                }
                Geometry::MultiPolygon(_) => {
                    unreachable!("excluded by the has_polygon guard above: has_polygon is false here")
                }
            }
        }

        FlattenedColumn { types, geometry_lengths: None, part_lengths: Some(part_lengths), ring_lengths: Some(ring_lengths), vertices }
    } else if has_multipoint {
        for geometry in geometries {
            match geometry {
                Geometry::Point(v) => vertices.push(*v),
                Geometry::MultiPoint(points) => {
                    part_lengths.push(points.len() as u32);
                    vertices.extend(points.iter().copied());
                }
                _ => unreachable!("excluded by the has_polygon/has_lineish guards above"),
            }
        }

        FlattenedColumn { types, geometry_lengths: None, part_lengths: Some(part_lengths), ring_lengths: None, vertices }
    } else {
        for geometry in geometries {
            if let Geometry::Point(v) = geometry {
                vertices.push(*v);
            }
        }

        FlattenedColumn { types, geometry_lengths: None, part_lengths: None, ring_lengths: None, vertices }
    }
}

fn encode_vertex_payload(vertices: &[Vertex]) -> Vec<u8> {
    let mut out = ByteWriter::with_capacity(vertices.len() * 2);
    let mut prev = (0_i32, 0_i32);

    for &(x, y) in vertices {
        encode_varint_u32(zigzag_encode_32(x.wrapping_sub(prev.0)), &mut out);
        encode_varint_u32(zigzag_encode_32(y.wrapping_sub(prev.1)), &mut out);
        prev = (x, y);
    }

    out.into_vec()
}

fn write_unsigned_length_stream(out: &mut ByteWriter, logical_code: LengthType, values: &[u32]) {
    let values_i32: Vec<i32> = values.iter().map(|&v| v as i32).collect();
    let encoding = encode_int_values_32(&values_i32, false);

    let metadata = StreamMetadata {
        physical_stream_type: PhysicalStreamType::Length,
        logical_stream_type: Some(LogicalStreamType::Length(logical_code)),
        logical_level_technique_1: encoding.logical_level_technique_1,
        logical_level_technique_2: encoding.logical_level_technique_2,
        physical_level_technique: encoding.physical_level_technique,
        num_values: encoding.num_values,
        byte_length: encoding.payload.len() as u32,
        subtype: encoding.subtype,
    };

    metadata.encode(out);
    out.write_bytes(&encoding.payload);
}

/// Write one geometry column's streams (§4.5 "Encoding"): a type tag stream,
/// the nested length streams the type mix requires, and an interleaved
/// componentwise-delta vertex buffer. Tessellated (flat GPU) columns are not
/// produced by this encoder -- construct a `Tree` column instead.
pub fn encode_geometry_column_streams(column: &GeometryColumn, out: &mut ByteWriter) -> Result<()> {
    let geometries = match column {
        GeometryColumn::Tree(geometries) => geometries,
        GeometryColumn::FlatGpu(_) => {
            return Err(Error::unsupported(
                "tessellated (flat GPU) geometry columns are not re-encoded; construct a Tree geometry column instead",
            ))
        }
    };

    let flattened = flatten_geometries(geometries);
    let num_streams = 2
        + flattened.geometry_lengths.is_some() as u32
        + flattened.part_lengths.is_some() as u32
        + flattened.ring_lengths.is_some() as u32;
    encode_varint_u32(num_streams, out);

    let type_codes: Vec<i32> = flattened.types.iter().map(|t| t.code() as i32).collect();
    let type_encoding = encode_int_values_32(&type_codes, false);
    let type_metadata = StreamMetadata {
        physical_stream_type: PhysicalStreamType::Data,
        logical_stream_type: Some(LogicalStreamType::Dictionary(DictionaryType::None)),
        logical_level_technique_1: type_encoding.logical_level_technique_1,
        logical_level_technique_2: type_encoding.logical_level_technique_2,
        physical_level_technique: type_encoding.physical_level_technique,
        num_values: type_encoding.num_values,
        byte_length: type_encoding.payload.len() as u32,
        subtype: type_encoding.subtype,
    };
    type_metadata.encode(out);
    out.write_bytes(&type_encoding.payload);

    if let Some(values) = &flattened.geometry_lengths {
        write_unsigned_length_stream(out, LengthType::Geometries, values);
    }
    if let Some(values) = &flattened.part_lengths {
        write_unsigned_length_stream(out, LengthType::Parts, values);
    }
    if let Some(values) = &flattened.ring_lengths {
        write_unsigned_length_stream(out, LengthType::Rings, values);
    }

    let payload = encode_vertex_payload(&flattened.vertices);
    let vertex_metadata = StreamMetadata {
        physical_stream_type: PhysicalStreamType::Data,
        logical_stream_type: Some(LogicalStreamType::Dictionary(DictionaryType::None)),
        logical_level_technique_1: crate::stream::LogicalLevelTechnique::ComponentwiseDelta,
        logical_level_technique_2: crate::stream::LogicalLevelTechnique::None,
        physical_level_technique: crate::stream::PhysicalLevelTechnique::Varint,
        num_values: (flattened.vertices.len() * 2) as u32,
        byte_length: payload.len() as u32,
        subtype: StreamSubtype::Plain,
    };
    vertex_metadata.encode(out);
    out.write_bytes(&payload);

    Ok(())
}
