use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;
pub type PassiveResult = Result<()>;

pub use std::io::Error as IoError;
pub use std::io::Result as IoResult;


/// All the ways decoding or encoding a tile can fail.
///
/// Every variant carries a message naming the offending column, stream, or
/// value, the way the driver attaches column names when it re-wraps a
/// lower-level error.
#[derive(Debug)]
pub enum Error {
    /// A read would have crossed the end of the buffer.
    EndOfBuffer(String),

    /// A varint exceeded the width of its target integer type.
    VarintOverflow(String),

    /// An enum code on the wire is out of range for its field.
    InvalidEnum(String),

    /// The stream declares an encoding this crate does not implement (ALP,
    /// PSEUDODECIMAL, FastPFOR, or FSST without a symbol table).
    UnsupportedEncoding(String),

    /// A geometry column failed a topology invariant (underflow, a ring
    /// shorter than two vertices, a polygon with no shell).
    GeometryError(String),

    /// A column name maps to the wrong type variant (e.g. `"id"` declared
    /// as a complex column).
    MetadataMismatch(String),

    /// `numFeatures` disagrees with the decoded ids or geometries.
    CountMismatch(String),

    /// The declared `layer_byte_length` did not match the bytes actually
    /// consumed while decoding the layer.
    TrailingBytes(String),

    /// Propagated from a caller-supplied `Read`/`Write` adapter.
    Io(IoError),
}

impl Error {
    pub fn end_of_buffer(message: impl Into<String>) -> Self {
        Error::EndOfBuffer(message.into())
    }

    pub fn varint_overflow(message: impl Into<String>) -> Self {
        Error::VarintOverflow(message.into())
    }

    pub fn invalid_enum(message: impl Into<String>) -> Self {
        Error::InvalidEnum(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Error::UnsupportedEncoding(message.into())
    }

    pub fn geometry(message: impl Into<String>) -> Self {
        Error::GeometryError(message.into())
    }

    pub fn metadata_mismatch(message: impl Into<String>) -> Self {
        Error::MetadataMismatch(message.into())
    }

    pub fn count_mismatch(message: impl Into<String>) -> Self {
        Error::CountMismatch(message.into())
    }

    pub fn trailing_bytes(message: impl Into<String>) -> Self {
        Error::TrailingBytes(message.into())
    }

    /// Re-wraps `self` with a column name prefix, the way the driver
    /// annotates lower-level failures for user-visible diagnostics.
    pub fn with_column(self, column: &str) -> Self {
        let prefix = |message: String| format!("column `{}`: {}", column, message);

        match self {
            Error::EndOfBuffer(m) => Error::EndOfBuffer(prefix(m)),
            Error::VarintOverflow(m) => Error::VarintOverflow(prefix(m)),
            Error::InvalidEnum(m) => Error::InvalidEnum(prefix(m)),
            Error::UnsupportedEncoding(m) => Error::UnsupportedEncoding(prefix(m)),
            Error::GeometryError(m) => Error::GeometryError(prefix(m)),
            Error::MetadataMismatch(m) => Error::MetadataMismatch(prefix(m)),
            Error::CountMismatch(m) => Error::CountMismatch(prefix(m)),
            Error::TrailingBytes(m) => Error::TrailingBytes(prefix(m)),
            Error::Io(io) => Error::Io(io),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EndOfBuffer(m) => write!(formatter, "unexpected end of buffer: {}", m),
            Error::VarintOverflow(m) => write!(formatter, "varint overflow: {}", m),
            Error::InvalidEnum(m) => write!(formatter, "invalid enum code: {}", m),
            Error::UnsupportedEncoding(m) => write!(formatter, "unsupported encoding: {}", m),
            Error::GeometryError(m) => write!(formatter, "invalid geometry: {}", m),
            Error::MetadataMismatch(m) => write!(formatter, "metadata mismatch: {}", m),
            Error::CountMismatch(m) => write!(formatter, "count mismatch: {}", m),
            Error::TrailingBytes(m) => write!(formatter, "trailing bytes: {}", m),
            Error::Io(io) => write!(formatter, "io error: {}", io),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(io) => Some(io),
            _ => None,
        }
    }
}

/// Enable using the `?` operator on io::Result.
impl From<IoError> for Error {
    fn from(error: IoError) -> Self {
        Error::Io(error)
    }
}
