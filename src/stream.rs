//! Stream metadata codec (§4.3): the 2-byte header plus varint payload that
//! precedes every stream's physical bytes.

use bit_field::BitField;

use crate::buffer::{BufferStream, ByteWriter};
use crate::error::{Error, Result};
use crate::varint::{decode_varint_u32, encode_varint_u32};

macro_rules! wire_enum {
    ($name:ident { $($variant:ident = $code:expr),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant = $code),+
        }

        impl $name {
            pub fn from_code(code: u8) -> Result<Self> {
                match code {
                    $($code => Ok($name::$variant),)+
                    other => Err(Error::invalid_enum(format!(
                        concat!(stringify!($name), " code {} out of range"), other
                    ))),
                }
            }

            pub fn code(self) -> u8 {
                self as u8
            }
        }
    };
}

wire_enum!(PhysicalStreamType { Present = 0, Data = 1, Offset = 2, Length = 3 });
wire_enum!(PhysicalLevelTechnique { None = 0, FastPfor = 1, Varint = 2, Alp = 3 });
wire_enum!(LogicalLevelTechnique {
    None = 0, Delta = 1, ComponentwiseDelta = 2, Rle = 3, Morton = 4, Pseudodecimal = 5,
});
wire_enum!(DictionaryType { None = 0, Single = 1, Shared = 2, Vertex = 3, Morton = 4, Fsst = 5 });
wire_enum!(LengthType {
    VarBinary = 0, Geometries = 1, Parts = 2, Rings = 3, Triangles = 4, Symbol = 5, Dictionary = 6,
});
wire_enum!(OffsetType { Vertex = 0, Index = 1, String = 2, Key = 3 });

/// The logical subtype of a stream, interpreted against its
/// `PhysicalStreamType`: DATA carries a `DictionaryType`, OFFSET an
/// `OffsetType`, LENGTH a `LengthType`. PRESENT streams carry no subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalStreamType {
    Dictionary(DictionaryType),
    Offset(OffsetType),
    Length(LengthType),
}

impl LogicalStreamType {
    fn decode(physical: PhysicalStreamType, code: u8) -> Result<Option<Self>> {
        match physical {
            PhysicalStreamType::Present => Ok(None),
            PhysicalStreamType::Data => Ok(Some(LogicalStreamType::Dictionary(DictionaryType::from_code(code)?))),
            PhysicalStreamType::Offset => Ok(Some(LogicalStreamType::Offset(OffsetType::from_code(code)?))),
            PhysicalStreamType::Length => Ok(Some(LogicalStreamType::Length(LengthType::from_code(code)?))),
        }
    }

    fn code(self) -> u8 {
        match self {
            LogicalStreamType::Dictionary(t) => t.code(),
            LogicalStreamType::Offset(t) => t.code(),
            LogicalStreamType::Length(t) => t.code(),
        }
    }

    pub fn dictionary_type(self) -> Option<DictionaryType> {
        match self {
            LogicalStreamType::Dictionary(t) => Some(t),
            _ => None,
        }
    }

    pub fn offset_type(self) -> Option<OffsetType> {
        match self {
            LogicalStreamType::Offset(t) => Some(t),
            _ => None,
        }
    }

    pub fn length_type(self) -> Option<LengthType> {
        match self {
            LogicalStreamType::Length(t) => Some(t),
            _ => None,
        }
    }
}

/// The RLE subtype's extra header fields, present when either logical
/// technique is RLE and the physical technique is not NONE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RleExtra {
    pub runs: u32,
    pub num_rle_values: u32,
}

/// The Morton subtype's extra header fields, present when
/// `logical_level_technique_1 == MORTON`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MortonExtra {
    pub num_bits: u32,
    pub coordinate_shift: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSubtype {
    Plain,
    Rle(RleExtra),
    Morton(MortonExtra),
}

/// The full decoded header of one stream, describing how its following
/// `byte_length` bytes of physical payload are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamMetadata {
    pub physical_stream_type: PhysicalStreamType,
    pub logical_stream_type: Option<LogicalStreamType>,
    pub logical_level_technique_1: LogicalLevelTechnique,
    pub logical_level_technique_2: LogicalLevelTechnique,
    pub physical_level_technique: PhysicalLevelTechnique,
    pub num_values: u32,
    pub byte_length: u32,
    pub subtype: StreamSubtype,
}

impl StreamMetadata {
    pub fn decode(stream: &mut BufferStream<'_>) -> Result<Self> {
        let byte0 = stream.read_u8()?;
        let physical_stream_type = PhysicalStreamType::from_code(byte0.get_bits(4..8) as u8)?;
        let logical_code = byte0.get_bits(0..4) as u8;
        let logical_stream_type = LogicalStreamType::decode(physical_stream_type, logical_code)?;

        let byte1 = stream.read_u8()?;
        let logical_level_technique_1 = LogicalLevelTechnique::from_code(byte1.get_bits(5..8) as u8)?;
        let logical_level_technique_2 = LogicalLevelTechnique::from_code(byte1.get_bits(2..5) as u8)?;
        let physical_level_technique = PhysicalLevelTechnique::from_code(byte1.get_bits(0..2) as u8)?;

        let num_values = decode_varint_u32(stream)?;
        let byte_length = decode_varint_u32(stream)?;

        let subtype = if logical_level_technique_1 == LogicalLevelTechnique::Morton {
            let num_bits = decode_varint_u32(stream)?;
            let coordinate_shift = decode_varint_u32(stream)? as i32;
            StreamSubtype::Morton(MortonExtra { num_bits, coordinate_shift })
        } else if (logical_level_technique_1 == LogicalLevelTechnique::Rle
            || logical_level_technique_2 == LogicalLevelTechnique::Rle)
            && physical_level_technique != PhysicalLevelTechnique::None
        {
            let runs = decode_varint_u32(stream)?;
            let num_rle_values = decode_varint_u32(stream)?;
            StreamSubtype::Rle(RleExtra { runs, num_rle_values })
        } else {
            StreamSubtype::Plain
        };

        Ok(StreamMetadata {
            physical_stream_type,
            logical_stream_type,
            logical_level_technique_1,
            logical_level_technique_2,
            physical_level_technique,
            num_values,
            byte_length,
            subtype,
        })
    }

    pub fn encode(&self, out: &mut ByteWriter) {
        let mut byte0 = 0_u8;
        byte0.set_bits(4..8, self.physical_stream_type.code());
        byte0.set_bits(0..4, self.logical_stream_type.map_or(0, LogicalStreamType::code));
        out.write_u8(byte0);

        let mut byte1 = 0_u8;
        byte1.set_bits(5..8, self.logical_level_technique_1.code());
        byte1.set_bits(2..5, self.logical_level_technique_2.code());
        byte1.set_bits(0..2, self.physical_level_technique.code());
        out.write_u8(byte1);

        encode_varint_u32(self.num_values, out);
        encode_varint_u32(self.byte_length, out);

        match self.subtype {
            StreamSubtype::Plain => {}
            StreamSubtype::Morton(extra) => {
                encode_varint_u32(extra.num_bits, out);
                encode_varint_u32(extra.coordinate_shift as u32, out);
            }
            StreamSubtype::Rle(extra) => {
                encode_varint_u32(extra.runs, out);
                encode_varint_u32(extra.num_rle_values, out);
            }
        }
    }

    pub fn rle_extra(&self) -> Option<RleExtra> {
        match self.subtype {
            StreamSubtype::Rle(extra) => Some(extra),
            _ => None,
        }
    }

    pub fn morton_extra(&self) -> Option<MortonExtra> {
        match self.subtype {
            StreamSubtype::Morton(extra) => Some(extra),
            _ => None,
        }
    }
}
