//! Property column codec (§4.7): present bitmap plus one or more data
//! streams, decoded per the column's declared `ScalarType`.

use crate::bitset::{self, PackedBitset};
use crate::buffer::{BufferStream, ByteWriter};
use crate::codec::fsst::SymbolTable;
use crate::codec::int::{decode_int_stream_32, decode_int_stream_64, encode_int_values_32, encode_int_values_64};
use crate::codec::string;
use crate::error::{Error, Result};
use crate::model::{PropertyColumn, PropertyValue};
use crate::stream::{
    DictionaryType, LengthType, LogicalLevelTechnique, LogicalStreamType, OffsetType, PhysicalLevelTechnique,
    PhysicalStreamType, StreamMetadata, StreamSubtype,
};
use crate::tileset::ScalarType;
use crate::varint::{decode_varint_u32, encode_varint_u32};

fn decode_present(stream: &mut BufferStream<'_>, num_features: usize) -> Result<(PackedBitset, usize)> {
    let mut probe = *stream;
    let probe_header = StreamMetadata::decode(&mut probe)?;

    if probe_header.physical_stream_type == PhysicalStreamType::Present {
        let header = StreamMetadata::decode(stream)?;
        let present = bitset::decode_boolean_rle(stream, header.num_values as usize)?;
        Ok((present, 1))
    } else {
        Ok((PackedBitset::all_ones(num_features), 0))
    }
}

fn decode_raw_floats(stream: &mut BufferStream<'_>, header: &StreamMetadata) -> Result<Vec<f32>> {
    if header.physical_level_technique != PhysicalLevelTechnique::None {
        return Err(Error::unsupported("float columns only support plain fixed-width physical encoding"));
    }
    (0..header.num_values).map(|_| stream.read::<f32>()).collect()
}

fn decode_raw_doubles(stream: &mut BufferStream<'_>, header: &StreamMetadata) -> Result<Vec<f64>> {
    if header.physical_level_technique != PhysicalLevelTechnique::None {
        return Err(Error::unsupported("double columns only support plain fixed-width physical encoding"));
    }
    (0..header.num_values).map(|_| stream.read::<f64>()).collect()
}

fn decode_booleans(stream: &mut BufferStream<'_>, header: &StreamMetadata) -> Result<Vec<bool>> {
    let bits = bitset::decode_boolean_rle(stream, header.num_values as usize)?;
    Ok((0..bits.len()).map(|i| bits.test(i)).collect())
}

/// The pieces a string column's remaining streams get classified into while
/// scanning them; exactly the streams a given layout needs end up populated.
#[derive(Default)]
struct StringPieces {
    utf8: Option<Vec<u8>>,
    fsst_symbols: Option<Vec<u8>>,
    symbol_lengths: Option<Vec<u32>>,
    var_binary_lengths: Option<Vec<u32>>,
    dictionary_lengths: Option<Vec<u32>>,
    string_offsets: Option<Vec<u32>>,
}

fn decode_string_column(
    stream: &mut BufferStream<'_>,
    remaining_streams: usize,
    num_present: usize,
) -> Result<Vec<String>> {
    let mut pieces = StringPieces::default();

    for _ in 0..remaining_streams {
        let header = StreamMetadata::decode(stream)?;

        match header.physical_stream_type {
            PhysicalStreamType::Data => match header.logical_stream_type {
                Some(LogicalStreamType::Dictionary(DictionaryType::None))
                | Some(LogicalStreamType::Dictionary(DictionaryType::Single)) => {
                    pieces.utf8 = Some(stream.consume(header.byte_length as usize)?.to_vec());
                }
                Some(LogicalStreamType::Dictionary(DictionaryType::Fsst)) => {
                    pieces.fsst_symbols = Some(stream.consume(header.byte_length as usize)?.to_vec());
                }
                other => {
                    return Err(Error::metadata_mismatch(format!(
                        "unexpected DATA stream subtype {:?} in a string column", other
                    )));
                }
            },

            PhysicalStreamType::Length => match header.logical_stream_type {
                Some(LogicalStreamType::Length(LengthType::VarBinary)) => {
                    pieces.var_binary_lengths = Some(decode_int_stream_32(stream, &header, false)?.into_iter().map(|v| v as u32).collect());
                }
                Some(LogicalStreamType::Length(LengthType::Dictionary)) => {
                    pieces.dictionary_lengths = Some(decode_int_stream_32(stream, &header, false)?.into_iter().map(|v| v as u32).collect());
                }
                Some(LogicalStreamType::Length(LengthType::Symbol)) => {
                    pieces.symbol_lengths = Some(decode_int_stream_32(stream, &header, false)?.into_iter().map(|v| v as u32).collect());
                }
                other => {
                    return Err(Error::metadata_mismatch(format!(
                        "unexpected LENGTH stream subtype {:?} in a string column", other
                    )));
                }
            },

            PhysicalStreamType::Offset => match header.logical_stream_type {
                Some(LogicalStreamType::Offset(OffsetType::String)) => {
                    pieces.string_offsets = Some(decode_int_stream_32(stream, &header, false)?.into_iter().map(|v| v as u32).collect());
                }
                other => {
                    return Err(Error::metadata_mismatch(format!(
                        "unexpected OFFSET stream subtype {:?} in a string column", other
                    )));
                }
            },

            PhysicalStreamType::Present => {
                return Err(Error::metadata_mismatch("string column carries more than one PRESENT stream"));
            }
        }
    }

    let utf8 = pieces.utf8.unwrap_or_default();

    if let Some(symbol_bytes) = pieces.fsst_symbols {
        let symbol_lengths = pieces.symbol_lengths.ok_or_else(|| {
            Error::metadata_mismatch("FSST dictionary column missing its LENGTH/SYMBOL stream")
        })?;

        let table = SymbolTable::decode(&symbol_lengths, &symbol_bytes)?;
        let dictionary_lengths = pieces.dictionary_lengths.ok_or_else(|| {
            Error::metadata_mismatch("FSST dictionary column missing its LENGTH/DICTIONARY stream")
        })?;
        let indices = pieces.string_offsets.ok_or_else(|| {
            Error::metadata_mismatch("FSST dictionary column missing its OFFSET/STRING stream")
        })?;

        string::decode_fsst_dictionary(&utf8, &table, &dictionary_lengths, &indices)
    } else if let Some(dictionary_lengths) = pieces.dictionary_lengths {
        let indices = pieces.string_offsets.ok_or_else(|| {
            Error::metadata_mismatch("dictionary-encoded string column missing its OFFSET/STRING stream")
        })?;
        string::decode_single_dictionary(&utf8, &dictionary_lengths, &indices)
    } else {
        let lengths = pieces.var_binary_lengths.ok_or_else(|| {
            Error::metadata_mismatch("plain string column missing its LENGTH/VAR_BINARY stream")
        })?;

        if lengths.len() != num_present {
            return Err(Error::count_mismatch(format!(
                "plain string column has {} lengths but {} present features", lengths.len(), num_present
            )));
        }

        string::decode_plain(&utf8, &lengths, pieces.string_offsets.as_deref())
    }
}

/// Decode one property column: `num_streams` as a leading varint, an
/// optional PRESENT stream, then the scalar-type-specific data streams.
/// Returns one entry per feature, `None` where the present bitmap is unset.
pub fn decode_property_column(
    stream: &mut BufferStream<'_>,
    scalar_type: ScalarType,
    num_features: usize,
) -> Result<Vec<Option<PropertyValue>>> {
    let num_streams = decode_varint_u32(stream)? as usize;
    let (present, consumed) = decode_present(stream, num_features)?;
    let remaining_streams = num_streams.checked_sub(consumed).ok_or_else(|| {
        Error::count_mismatch("property column declared fewer streams than its PRESENT stream alone needs")
    })?;
    let num_present = present.popcount();

    let values: Vec<PropertyValue> = match scalar_type {
        ScalarType::Boolean => {
            let header = StreamMetadata::decode(stream)?;
            decode_booleans(stream, &header)?.into_iter().map(PropertyValue::Bool).collect()
        }
        ScalarType::Int8 => {
            let header = StreamMetadata::decode(stream)?;
            decode_int_stream_32(stream, &header, true)?
                .into_iter()
                .map(|v| i8::try_from(v).map(PropertyValue::I8))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| Error::metadata_mismatch("Int8 column value out of range"))?
        }
        ScalarType::UInt8 => {
            let header = StreamMetadata::decode(stream)?;
            decode_int_stream_32(stream, &header, false)?
                .into_iter()
                .map(|v| u8::try_from(v).map(PropertyValue::U8))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| Error::metadata_mismatch("UInt8 column value out of range"))?
        }
        ScalarType::Int32 => {
            let header = StreamMetadata::decode(stream)?;
            decode_int_stream_32(stream, &header, true)?.into_iter().map(PropertyValue::I32).collect()
        }
        ScalarType::UInt32 => {
            let header = StreamMetadata::decode(stream)?;
            decode_int_stream_32(stream, &header, false)?.into_iter().map(|v| PropertyValue::U32(v as u32)).collect()
        }
        ScalarType::Int64 => {
            let header = StreamMetadata::decode(stream)?;
            decode_int_stream_64(stream, &header, true)?.into_iter().map(PropertyValue::I64).collect()
        }
        ScalarType::UInt64 => {
            let header = StreamMetadata::decode(stream)?;
            decode_int_stream_64(stream, &header, false)?.into_iter().map(|v| PropertyValue::U64(v as u64)).collect()
        }
        ScalarType::Float => {
            let header = StreamMetadata::decode(stream)?;
            decode_raw_floats(stream, &header)?.into_iter().map(PropertyValue::F32).collect()
        }
        ScalarType::Double => {
            let header = StreamMetadata::decode(stream)?;
            decode_raw_doubles(stream, &header)?.into_iter().map(PropertyValue::F64).collect()
        }
        ScalarType::String => {
            decode_string_column(stream, remaining_streams, num_present)?.into_iter().map(PropertyValue::Str).collect()
        }
    };

    if values.len() != num_present {
        return Err(Error::count_mismatch(format!(
            "property column decoded {} values but the present bitmap has {} set bits", values.len(), num_present
        )));
    }

    let mut values = values.into_iter();
    let mut result = Vec::with_capacity(num_features);

    for feature in 0..num_features {
        if present.test(feature) {
            result.push(Some(values.next().expect("present count matched value count")));
        } else {
            result.push(None);
        }
    }

    Ok(result)
}

fn present_bitset(present_bits: &[bool]) -> PackedBitset {
    let byte_len = (present_bits.len() + 7) / 8;
    let mut bytes = vec![0_u8; byte_len];

    for (i, &bit) in present_bits.iter().enumerate() {
        if bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }

    PackedBitset::from_bytes(bytes, present_bits.len())
}

fn write_present_stream(out: &mut ByteWriter, present: &PackedBitset) {
    let header = StreamMetadata {
        physical_stream_type: PhysicalStreamType::Present,
        logical_stream_type: None,
        logical_level_technique_1: LogicalLevelTechnique::None,
        logical_level_technique_2: LogicalLevelTechnique::None,
        physical_level_technique: PhysicalLevelTechnique::None,
        num_values: present.len() as u32,
        byte_length: 0,
        subtype: StreamSubtype::Plain,
    };
    header.encode(out);
    bitset::encode_boolean_rle(present, out);
}

fn write_bool_data_stream(out: &mut ByteWriter, bits: &PackedBitset) {
    let header = StreamMetadata {
        physical_stream_type: PhysicalStreamType::Data,
        logical_stream_type: Some(LogicalStreamType::Dictionary(DictionaryType::None)),
        logical_level_technique_1: LogicalLevelTechnique::None,
        logical_level_technique_2: LogicalLevelTechnique::None,
        physical_level_technique: PhysicalLevelTechnique::None,
        num_values: bits.len() as u32,
        byte_length: 0,
        subtype: StreamSubtype::Plain,
    };
    header.encode(out);
    bitset::encode_boolean_rle(bits, out);
}

fn write_int_stream_32(out: &mut ByteWriter, values: &[i32], is_signed: bool) {
    let encoding = encode_int_values_32(values, is_signed);
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

fn write_int_stream_64(out: &mut ByteWriter, values: &[i64], is_signed: bool) {
    let encoding = encode_int_values_64(values, is_signed);
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

fn write_length_stream(out: &mut ByteWriter, logical_code: LengthType, values: &[i32]) {
    let encoding = encode_int_values_32(values, false);
    let header = StreamMetadata {
        physical_stream_type: PhysicalStreamType::Length,
        logical_stream_type: Some(LogicalStreamType::Length(logical_code)),
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

fn write_raw_bytes_stream(out: &mut ByteWriter, bytes: &[u8]) {
    let header = StreamMetadata {
        physical_stream_type: PhysicalStreamType::Data,
        logical_stream_type: Some(LogicalStreamType::Dictionary(DictionaryType::None)),
        logical_level_technique_1: LogicalLevelTechnique::None,
        logical_level_technique_2: LogicalLevelTechnique::None,
        physical_level_technique: PhysicalLevelTechnique::None,
        num_values: bytes.len() as u32,
        byte_length: bytes.len() as u32,
        subtype: StreamSubtype::Plain,
    };
    header.encode(out);
    out.write_bytes(bytes);
}

/// Encode one property column in the plain (non-dictionary, non-FSST) layout:
/// a leading `numStreams` varint, an optional PRESENT stream, then the
/// scalar-type-specific data streams, mirroring [`decode_property_column`].
/// String columns always carry their PRESENT stream even when every value is
/// set, so a reader never has to special-case the all-present case.
pub fn encode_property_column(
    column: &PropertyColumn,
    scalar_type: ScalarType,
    out: &mut ByteWriter,
) -> Result<()> {
    let present_bits: Vec<bool> = column.values.iter().map(Option::is_some).collect();
    let all_present = present_bits.iter().all(|&set| set);
    let needs_present = !all_present || scalar_type == ScalarType::String;
    let present = present_bitset(&present_bits);

    macro_rules! present_values {
        ($variant:path) => {
            column
                .values
                .iter()
                .filter_map(Option::as_ref)
                .map(|value| match value {
                    $variant(inner) => Ok(inner),
                    other => Err(Error::metadata_mismatch(format!(
                        "property column declared as {:?} holds a {:?} value", scalar_type, other
                    ))),
                })
                .collect::<Result<Vec<_>>>()?
        };
    }

    match scalar_type {
        ScalarType::Boolean => {
            let values = present_values!(PropertyValue::Bool);
            let bits: Vec<bool> = values.into_iter().copied().collect();
            encode_varint_u32(1 + needs_present as u32, out);
            if needs_present {
                write_present_stream(out, &present);
            }
            write_bool_data_stream(out, &present_bitset(&bits));
        }
        ScalarType::Int8 => {
            let values: Vec<i32> = present_values!(PropertyValue::I8).into_iter().map(|v| *v as i32).collect();
            encode_varint_u32(1 + needs_present as u32, out);
            if needs_present {
                write_present_stream(out, &present);
            }
            write_int_stream_32(out, &values, true);
        }
        ScalarType::UInt8 => {
            let values: Vec<i32> = present_values!(PropertyValue::U8).into_iter().map(|v| *v as i32).collect();
            encode_varint_u32(1 + needs_present as u32, out);
            if needs_present {
                write_present_stream(out, &present);
            }
            write_int_stream_32(out, &values, false);
        }
        ScalarType::Int32 => {
            let values: Vec<i32> = present_values!(PropertyValue::I32).into_iter().copied().collect();
            encode_varint_u32(1 + needs_present as u32, out);
            if needs_present {
                write_present_stream(out, &present);
            }
            write_int_stream_32(out, &values, true);
        }
        ScalarType::UInt32 => {
            let values: Vec<i32> = present_values!(PropertyValue::U32).into_iter().map(|v| *v as i32).collect();
            encode_varint_u32(1 + needs_present as u32, out);
            if needs_present {
                write_present_stream(out, &present);
            }
            write_int_stream_32(out, &values, false);
        }
        ScalarType::Int64 => {
            let values: Vec<i64> = present_values!(PropertyValue::I64).into_iter().copied().collect();
            encode_varint_u32(1 + needs_present as u32, out);
            if needs_present {
                write_present_stream(out, &present);
            }
            write_int_stream_64(out, &values, true);
        }
        ScalarType::UInt64 => {
            let values: Vec<i64> = present_values!(PropertyValue::U64).into_iter().map(|v| *v as i64).collect();
            encode_varint_u32(1 + needs_present as u32, out);
            if needs_present {
                write_present_stream(out, &present);
            }
            write_int_stream_64(out, &values, false);
        }
        ScalarType::Float => {
            let values: Vec<f32> = present_values!(PropertyValue::F32).into_iter().copied().collect();
            encode_varint_u32(1 + needs_present as u32, out);
            if needs_present {
                write_present_stream(out, &present);
            }
            let header = StreamMetadata {
                physical_stream_type: PhysicalStreamType::Data,
                logical_stream_type: Some(LogicalStreamType::Dictionary(DictionaryType::None)),
                logical_level_technique_1: LogicalLevelTechnique::None,
                logical_level_technique_2: LogicalLevelTechnique::None,
                physical_level_technique: PhysicalLevelTechnique::None,
                num_values: values.len() as u32,
                byte_length: (values.len() * 4) as u32,
                subtype: StreamSubtype::Plain,
            };
            header.encode(out);
            for value in values {
                out.write(value);
            }
        }
        ScalarType::Double => {
            let values: Vec<f64> = present_values!(PropertyValue::F64).into_iter().copied().collect();
            encode_varint_u32(1 + needs_present as u32, out);
            if needs_present {
                write_present_stream(out, &present);
            }
            let header = StreamMetadata {
                physical_stream_type: PhysicalStreamType::Data,
                logical_stream_type: Some(LogicalStreamType::Dictionary(DictionaryType::None)),
                logical_level_technique_1: LogicalLevelTechnique::None,
                logical_level_technique_2: LogicalLevelTechnique::None,
                physical_level_technique: PhysicalLevelTechnique::None,
                num_values: values.len() as u32,
                byte_length: (values.len() * 8) as u32,
                subtype: StreamSubtype::Plain,
            };
            header.encode(out);
            for value in values {
                out.write(value);
            }
        }
        ScalarType::String => {
            let values = present_values!(PropertyValue::Str);
            let lengths: Vec<i32> = values.iter().map(|s| s.len() as i32).collect();
            let mut blob = Vec::new();
            for s in &values {
                blob.extend_from_slice(s.as_bytes());
            }

            encode_varint_u32(3, out);
            write_present_stream(out, &present);
            write_length_stream(out, LengthType::VarBinary, &lengths);
            write_raw_bytes_stream(out, &blob);
        }
    }

    Ok(())
}
