//! Tileset metadata schema (§3/§4.1): the out-of-band column schema that
//! accompanies a tile body and tells the decoder how to interpret its
//! streams. This is usually fetched once per tileset, not per tile.

use crate::error::{Error, Result};

/// Where a column's values live: once per feature (`Feature`) or once for the
/// whole layer (`Layer`, e.g. a shared vertex dictionary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnScope {
    Feature,
    Layer,
}

/// The scalar primitive types a property column's values can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Boolean,
    Int8,
    UInt8,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    String,
}

impl ScalarType {
    pub fn from_code(code: u8) -> Result<Self> {
        Ok(match code {
            0 => ScalarType::Boolean,
            1 => ScalarType::Int8,
            2 => ScalarType::UInt8,
            3 => ScalarType::Int32,
            4 => ScalarType::UInt32,
            5 => ScalarType::Int64,
            6 => ScalarType::UInt64,
            7 => ScalarType::Float,
            8 => ScalarType::Double,
            9 => ScalarType::String,
            other => return Err(Error::invalid_enum(format!("ScalarType code {} out of range", other))),
        })
    }

    pub fn code(self) -> u8 {
        match self {
            ScalarType::Boolean => 0,
            ScalarType::Int8 => 1,
            ScalarType::UInt8 => 2,
            ScalarType::Int32 => 3,
            ScalarType::UInt32 => 4,
            ScalarType::Int64 => 5,
            ScalarType::UInt64 => 6,
            ScalarType::Float => 7,
            ScalarType::Double => 8,
            ScalarType::String => 9,
        }
    }
}

/// Geometry kinds a geometry column can hold, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
}

impl GeometryType {
    pub fn from_code(code: u8) -> Result<Self> {
        Ok(match code {
            0 => GeometryType::Point,
            1 => GeometryType::LineString,
            2 => GeometryType::Polygon,
            3 => GeometryType::MultiPoint,
            4 => GeometryType::MultiLineString,
            5 => GeometryType::MultiPolygon,
            other => return Err(Error::invalid_enum(format!("GeometryType code {} out of range", other))),
        })
    }

    pub fn code(self) -> u8 {
        match self {
            GeometryType::Point => 0,
            GeometryType::LineString => 1,
            GeometryType::Polygon => 2,
            GeometryType::MultiPoint => 3,
            GeometryType::MultiLineString => 4,
            GeometryType::MultiPolygon => 5,
        }
    }

    /// Whether a geometry of this type nests rings (Polygon/MultiPolygon).
    pub fn has_rings(self) -> bool {
        matches!(self, GeometryType::Polygon | GeometryType::MultiPolygon)
    }

    /// Whether a geometry of this type is one of the "multi" variants.
    pub fn is_multi(self) -> bool {
        matches!(
            self,
            GeometryType::MultiPoint | GeometryType::MultiLineString | GeometryType::MultiPolygon
        )
    }
}

/// A struct/nested-field column made of scalar children (e.g. a property
/// struct with several sub-properties sharing a present bitmap).
#[derive(Debug, Clone)]
pub struct ComplexColumn {
    pub name: String,
    pub children: Vec<ScalarColumn>,
}

/// A leaf column holding one scalar type's worth of values.
#[derive(Debug, Clone)]
pub struct ScalarColumn {
    pub name: String,
    pub scalar_type: ScalarType,
    pub nullable: bool,
}

/// One column in a feature table, either a scalar leaf or a struct of them.
#[derive(Debug, Clone)]
pub enum Column {
    Scalar(ScalarColumn),
    Complex(ComplexColumn),
}

impl Column {
    pub fn name(&self) -> &str {
        match self {
            Column::Scalar(c) => &c.name,
            Column::Complex(c) => &c.name,
        }
    }
}

/// The schema for one layer: its name, geometry type(s), and property
/// columns. Fetched out-of-band, not carried in the tile body.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub name: String,
    pub scope: ColumnScope,
    pub columns: Vec<Column>,
}

impl FeatureTable {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name() == name)
    }
}

/// The full tileset schema: one `FeatureTable` per layer, indexed by name at
/// lookup time since a tile carries only a handful of layers.
#[derive(Debug, Clone, Default)]
pub struct TilesetMetadata {
    pub feature_tables: Vec<FeatureTable>,
}

impl TilesetMetadata {
    pub fn layer(&self, name: &str) -> Option<&FeatureTable> {
        self.feature_tables.iter().find(|table| table.name == name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scalar_type_round_trips_all_codes() {
        for code in 0..=9 {
            let scalar = ScalarType::from_code(code).unwrap();
            assert_eq!(scalar.code(), code);
        }
        assert!(ScalarType::from_code(10).is_err());
    }

    #[test]
    fn geometry_type_round_trips_all_codes() {
        for code in 0..=5 {
            let geometry = GeometryType::from_code(code).unwrap();
            assert_eq!(geometry.code(), code);
        }
        assert!(GeometryType::from_code(6).is_err());
    }

    #[test]
    fn geometry_type_classification() {
        assert!(GeometryType::Polygon.has_rings());
        assert!(GeometryType::MultiPolygon.has_rings());
        assert!(!GeometryType::LineString.has_rings());

        assert!(GeometryType::MultiLineString.is_multi());
        assert!(!GeometryType::LineString.is_multi());
    }

    #[test]
    fn feature_table_looks_up_columns_by_name() {
        let table = FeatureTable {
            name: "roads".into(),
            scope: ColumnScope::Feature,
            columns: vec![Column::Scalar(ScalarColumn {
                name: "class".into(),
                scalar_type: ScalarType::String,
                nullable: true,
            })],
        };

        assert!(table.column("class").is_some());
        assert!(table.column("missing").is_none());
    }
}
