//! Tile/layer driver (§4.8): walks the length-prefixed layer records in a
//! tile body, dispatching each column by name against the tileset metadata
//! and assembling the decoded `Tile`. Encoding mirrors the same layout.

use crate::buffer::{BufferStream, ByteWriter};
use crate::codec::geometry::{decode_geometry_column_streams, encode_geometry_column_streams};
use crate::codec::int::{decode_int_stream_32, decode_int_stream_64, encode_int_values_32, encode_int_values_64};
use crate::codec::property::{decode_property_column, encode_property_column};
use crate::error::{Error, Result};
use crate::geometry::GeometryColumn;
use crate::model::{Layer, PropertyColumn, Tile};
use crate::stream::{DictionaryType, LogicalStreamType, PhysicalStreamType, StreamMetadata};
use crate::tileset::{Column, ScalarType, TilesetMetadata};
use crate::varint::{decode_varint_u32, decode_varint_u64, encode_varint_u32, encode_varint_u64};

const LAYER_VERSION: u8 = 1;

/// Decode/encode knobs (§10.3). `use_fast_pfor` is accepted for wire-format
/// compatibility with encoders that toggle it, but this implementation never
/// ships a FastPFOR backend; the encoder always falls back to VARINT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub use_fast_pfor: bool,
    pub include_ids: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config { use_fast_pfor: false, include_ids: true }
    }
}

impl Config {
    pub fn with_fast_pfor(mut self, use_fast_pfor: bool) -> Self {
        self.use_fast_pfor = use_fast_pfor;
        self
    }

    pub fn with_include_ids(mut self, include_ids: bool) -> Self {
        self.include_ids = include_ids;
        self
    }
}

fn decode_id_column(stream: &mut BufferStream<'_>, scalar_type: ScalarType, num_features: usize) -> Result<Vec<u64>> {
    let num_streams = decode_varint_u32(stream)? as usize;
    let mut remaining = num_streams;

    // the id column's own PRESENT stream, if any, is discarded: a feature
    // either has an id or it doesn't carry the column at all, there is no
    // per-feature null slot to fill in from it
    let mut probe = *stream;
    if StreamMetadata::decode(&mut probe)?.physical_stream_type == PhysicalStreamType::Present {
        let header = StreamMetadata::decode(stream)?;
        crate::bitset::decode_boolean_rle(stream, header.num_values as usize)?;
        remaining -= 1;
    }

    if remaining != 1 {
        return Err(Error::metadata_mismatch(format!(
            "id column declared {} data streams, expected exactly 1", remaining
        )));
    }

    let header = StreamMetadata::decode(stream)?;
    let values = match scalar_type {
        ScalarType::UInt32 => decode_int_stream_32(stream, &header, false)?.into_iter().map(|v| v as u32 as u64).collect(),
        ScalarType::UInt64 => decode_int_stream_64(stream, &header, false)?.into_iter().map(|v| v as u64).collect(),
        other => return Err(Error::metadata_mismatch(format!("id column declared as unsupported scalar type {:?}", other))),
    };

    if values.len() != num_features {
        return Err(Error::count_mismatch(format!(
            "id column decoded {} values, expected {} features", values.len(), num_features
        )));
    }

    Ok(values)
}

fn encode_id_column(out: &mut ByteWriter, scalar_type: ScalarType, ids: &[u64]) -> Result<()> {
    encode_varint_u32(1, out);

    match scalar_type {
        ScalarType::UInt32 => {
            let values: Vec<i32> = ids.iter().map(|&id| id as u32 as i32).collect();
            let encoding = encode_int_values_32(&values, false);
            let header = StreamMetadata {
                physical_stream_type: PhysicalStreamType::Data,
                logical_stream_type: Some(LogicalStreamType::Dictionary(DictionaryType::None)),
                logical_level_technique_1: encoding.logical_level_technique_1,
                logical_level_technique_2: encoding.logical_level_technique_2,
                physical_level_technique: encoding.physical_level_technique,
                num_values: encoding.num_values,
                byte_length: encoding.payload.len() as u32,
                subtype: encoding.subtype,
            };
            header.encode(out);
            out.write_bytes(&encoding.payload);
        }
        ScalarType::UInt64 => {
            let values: Vec<i64> = ids.iter().map(|&id| id as i64).collect();
            let encoding = encode_int_values_64(&values, false);
            let header = StreamMetadata {
                physical_stream_type: PhysicalStreamType::Data,
                logical_stream_type: Some(LogicalStreamType::Dictionary(DictionaryType::None)),
                logical_level_technique_1: encoding.logical_level_technique_1,
                logical_level_technique_2: encoding.logical_level_technique_2,
                physical_level_technique: encoding.physical_level_technique,
                num_values: encoding.num_values,
                byte_length: encoding.payload.len() as u32,
                subtype: encoding.subtype,
            };
            header.encode(out);
            out.write_bytes(&encoding.payload);
        }
        other => return Err(Error::metadata_mismatch(format!("id column declared as unsupported scalar type {:?}", other))),
    }

    Ok(())
}

fn decode_layer(body: &[u8], tileset_metadata: &TilesetMetadata) -> Result<Layer> {
    let mut stream = BufferStream::new(body);

    let version = stream.read_u8()?;
    if version != LAYER_VERSION {
        return Err(Error::metadata_mismatch(format!("unsupported layer version {}", version)));
    }

    let feature_table_id = decode_varint_u32(&mut stream)? as usize;
    let tile_extent = decode_varint_u32(&mut stream)?;
    let max_tile_extent = decode_varint_u32(&mut stream)?;
    let num_features = decode_varint_u32(&mut stream)? as usize;

    if tile_extent == 0 {
        return Err(Error::metadata_mismatch("layer declares a tile_extent of zero"));
    }

    let feature_table = tileset_metadata.feature_tables.get(feature_table_id).ok_or_else(|| {
        Error::metadata_mismatch(format!("feature_table_id {} has no matching tileset metadata entry", feature_table_id))
    })?;

    let mut ids = None;
    let mut geometries = None;
    let mut properties = Vec::new();

    for column in &feature_table.columns {
        let name = column.name();
        log::trace!("layer `{}`: decoding column `{}`", feature_table.name, name);

        match name {
            "id" => {
                let scalar_type = match column {
                    Column::Scalar(scalar) => scalar.scalar_type,
                    Column::Complex(_) => {
                        return Err(Error::metadata_mismatch("`id` column must be scalar").with_column(name));
                    }
                };
                ids = Some(decode_id_column(&mut stream, scalar_type, num_features).map_err(|e| e.with_column(name))?);
            }

            "geometry" => {
                geometries = Some(decode_geometry_column_streams(&mut stream).map_err(|e| e.with_column(name))?);
            }

            _ => {
                let scalar_type = match column {
                    Column::Scalar(scalar) => scalar.scalar_type,
                    Column::Complex(_) => {
                        return Err(Error::metadata_mismatch("struct columns are not supported by the property codec").with_column(name));
                    }
                };
                let values = decode_property_column(&mut stream, scalar_type, num_features).map_err(|e| e.with_column(name))?;
                properties.push(PropertyColumn { name: name.to_string(), values });
            }
        }
    }

    if stream.has_remaining() {
        return Err(Error::trailing_bytes(format!(
            "layer `{}` left {} undecoded bytes", feature_table.name, stream.remaining()
        )));
    }

    let geometries = geometries.ok_or_else(|| {
        Error::metadata_mismatch(format!("feature table `{}` declares no `geometry` column", feature_table.name))
    })?;

    let geometry_count = match &geometries {
        GeometryColumn::Tree(features) => features.len(),
        GeometryColumn::FlatGpu(_) => num_features,
    };

    if geometry_count != num_features {
        return Err(Error::count_mismatch(format!(
            "layer `{}` declares {} features but decoded {} geometries", feature_table.name, num_features, geometry_count
        )));
    }

    if let Some(ids) = &ids {
        if ids.len() != num_features {
            return Err(Error::count_mismatch(format!(
                "layer `{}` declares {} features but decoded {} ids", feature_table.name, num_features, ids.len()
            )));
        }
    }

    Ok(Layer {
        name: feature_table.name.clone(),
        extent: tile_extent,
        max_tile_extent: Some(max_tile_extent),
        ids,
        geometries,
        properties,
    })
}

/// Decode a full tile: a concatenation of length-prefixed layer records
/// (§6.1), each resolved against `tileset_metadata` by its `feature_table_id`.
pub fn decode(tile_bytes: &[u8], tileset_metadata: &TilesetMetadata) -> Result<Tile> {
    let mut stream = BufferStream::new(tile_bytes);
    let mut layers = Vec::new();

    while stream.has_remaining() {
        let layer_byte_length = decode_varint_u32(&mut stream)? as usize;
        let body = stream.consume(layer_byte_length)?;
        layers.push(decode_layer(body, tileset_metadata)?);
    }

    Ok(Tile { layers })
}

fn encode_layer(layer: &Layer, feature_table_id: u32, config: &Config, out: &mut ByteWriter) -> Result<()> {
    let num_features = layer.feature_count() as u32;

    out.write_u8(LAYER_VERSION);
    encode_varint_u32(feature_table_id, out);
    encode_varint_u32(layer.extent, out);
    encode_varint_u32(layer.max_tile_extent.unwrap_or(0), out);
    encode_varint_u32(num_features, out);

    if config.include_ids {
        if let Some(ids) = &layer.ids {
            let scalar_type = if ids.iter().all(|&id| id <= u64::from(u32::MAX)) {
                ScalarType::UInt32
            } else {
                ScalarType::UInt64
            };
            encode_id_column(out, scalar_type, ids)?;
        }
    }

    encode_geometry_column_streams(&layer.geometries, out)?;

    for property in &layer.properties {
        let scalar_type = infer_scalar_type(property)?;
        encode_property_column(property, scalar_type, out)?;
    }

    Ok(())
}

fn infer_scalar_type(column: &PropertyColumn) -> Result<ScalarType> {
    use crate::model::PropertyValue;

    column
        .values
        .iter()
        .find_map(Option::as_ref)
        .map(|value| match value {
            PropertyValue::Bool(_) => ScalarType::Boolean,
            PropertyValue::I8(_) => ScalarType::Int8,
            PropertyValue::U8(_) => ScalarType::UInt8,
            PropertyValue::I32(_) => ScalarType::Int32,
            PropertyValue::U32(_) => ScalarType::UInt32,
            PropertyValue::I64(_) => ScalarType::Int64,
            PropertyValue::U64(_) => ScalarType::UInt64,
            PropertyValue::F32(_) => ScalarType::Float,
            PropertyValue::F64(_) => ScalarType::Double,
            PropertyValue::Str(_) => ScalarType::String,
        })
        .ok_or_else(|| Error::metadata_mismatch(format!(
            "property column `{}` has no values to infer a scalar type from", column.name
        )))
}

/// Encode a set of layers into a tile body (§6.1). Each layer's position in
/// `layers` becomes its `feature_table_id` on the wire; callers that decoded
/// a tile and want to round-trip it should pass layers back in the same
/// order they were read in.
pub fn encode(layers: &[Layer], config: &Config) -> Result<Vec<u8>> {
    let mut out = ByteWriter::new();

    for (index, layer) in layers.iter().enumerate() {
        let mut body = ByteWriter::new();
        encode_layer(layer, index as u32, config, &mut body)?;
        let body = body.into_vec();

        encode_varint_u32(body.len() as u32, &mut out);
        out.write_bytes(&body);
    }

    Ok(out.into_vec())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::Geometry;
    use crate::model::PropertyValue;
    use crate::tileset::{ColumnScope, FeatureTable, ScalarColumn};

    fn roads_metadata() -> TilesetMetadata {
        TilesetMetadata {
            feature_tables: vec![FeatureTable {
                name: "roads".to_string(),
                scope: ColumnScope::Feature,
                columns: vec![
                    Column::Scalar(ScalarColumn { name: "id".to_string(), scalar_type: ScalarType::UInt32, nullable: false }),
                    Column::Complex(crate::tileset::ComplexColumn { name: "geometry".to_string(), children: vec![] }),
                    Column::Scalar(ScalarColumn { name: "class".to_string(), scalar_type: ScalarType::String, nullable: true }),
                ],
            }],
        }
    }

    fn sample_layer() -> Layer {
        Layer {
            name: "roads".to_string(),
            extent: 4096,
            max_tile_extent: Some(8192),
            ids: Some(vec![10, 11, 12]),
            geometries: GeometryColumn::Tree(vec![
                Geometry::LineString(vec![(0, 0), (10, 10)]),
                Geometry::LineString(vec![(1, 1), (2, 2), (3, 3)]),
                Geometry::Point((5, 5)),
            ]),
            properties: vec![PropertyColumn {
                name: "class".to_string(),
                values: vec![
                    Some(PropertyValue::Str("primary".to_string())),
                    None,
                    Some(PropertyValue::Str("service".to_string())),
                ],
            }],
        }
    }

    #[test]
    fn encodes_and_decodes_a_single_layer_tile() {
        let metadata = roads_metadata();
        let layer = sample_layer();
        let config = Config::default();

        let bytes = encode(std::slice::from_ref(&layer), &config).unwrap();
        let tile = decode(&bytes, &metadata).unwrap();

        assert_eq!(tile.layers.len(), 1);
        let decoded = tile.layer("roads").unwrap();
        assert_eq!(decoded.extent, 4096);
        assert_eq!(decoded.max_tile_extent, Some(8192));
        assert_eq!(decoded.ids, Some(vec![10, 11, 12]));
        assert_eq!(decoded.properties[0].values, layer.properties[0].values);

        match &decoded.geometries {
            GeometryColumn::Tree(geometries) => assert_eq!(geometries, match &layer.geometries {
                GeometryColumn::Tree(g) => g,
                GeometryColumn::FlatGpu(_) => unreachable!(),
            }),
            GeometryColumn::FlatGpu(_) => panic!("expected a tree geometry column"),
        }
    }

    #[test]
    fn omits_ids_when_config_excludes_them() {
        // dropping ids on encode only makes sense against metadata that
        // doesn't declare an `id` column either, since decode is driven
        // entirely by the feature table schema, not by `Config`
        let metadata = TilesetMetadata {
            feature_tables: vec![FeatureTable {
                name: "roads".to_string(),
                scope: ColumnScope::Feature,
                columns: vec![Column::Complex(crate::tileset::ComplexColumn {
                    name: "geometry".to_string(),
                    children: vec![],
                })],
            }],
        };

        let mut layer = sample_layer();
        layer.properties.clear();
        let config = Config::default().with_include_ids(false);

        let bytes = encode(std::slice::from_ref(&layer), &config).unwrap();
        let tile = decode(&bytes, &metadata).unwrap();

        assert_eq!(tile.layer("roads").unwrap().ids, None);
    }

    #[test]
    fn rejects_a_tile_extent_of_zero() {
        let metadata = roads_metadata();
        let mut layer = sample_layer();
        layer.extent = 0;

        let bytes = encode(std::slice::from_ref(&layer), &Config::default()).unwrap();
        assert!(decode(&bytes, &metadata).is_err());
    }

    #[test]
    fn rejects_an_unknown_feature_table_id() {
        let metadata = TilesetMetadata::default();
        let layer = sample_layer();

        let bytes = encode(std::slice::from_ref(&layer), &Config::default()).unwrap();
        assert!(decode(&bytes, &metadata).is_err());
    }

    #[test]
    fn config_builder_chains() {
        let config = Config::default().with_fast_pfor(true).with_include_ids(false);
        assert!(config.use_fast_pfor);
        assert!(!config.include_ids);
    }
}
