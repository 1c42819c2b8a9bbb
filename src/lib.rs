

#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused_extern_crates,
    unused,

    missing_copy_implementations,
    missing_debug_implementations,

    clippy::all,
    clippy::pedantic,
)]

#![deny(
    unused_variables,
    unused_assignments,
    dead_code,
    unused_must_use,
    trivial_numeric_casts,
    redundant_semicolon
)]

#![forbid(unsafe_code)]

// TODO #![warn(missing_docs)]


pub mod error;
pub mod buffer;
pub mod varint;
pub mod bitset;
pub mod curve;
pub mod stream;
pub mod tileset;
pub mod geometry;
pub mod codec;
pub mod model;
pub mod driver;

/// Re-exports of the types commonly required to decode and encode a tile.
pub mod prelude {
    // main exports
    pub use crate::driver::{decode, encode, Config};

    // secondary data types
    pub use crate::model::{Tile, Layer, Feature, PropertyColumn, PropertyValue};
    pub use crate::geometry::{Geometry, GeometryType};
    pub use crate::tileset;
    pub use crate::error;

    pub use error::{ Result, Error };
}

