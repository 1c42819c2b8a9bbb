//! The public geometry value types (§3, §4.5) produced by decoding a
//! geometry column, and their matching type tag.

pub use crate::tileset::GeometryType;

/// A single `(x, y)` tile-local vertex, already delta/zigzag/Morton decoded
/// back into plain integer coordinates.
pub type Vertex = (i32, i32);

/// A decoded geometry value. Polygon rings are flattened one level less than
/// the wire format: a `Polygon`'s first ring is its exterior, the rest holes,
/// matching how every geometry library in the ecosystem represents them.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Vertex),
    MultiPoint(Vec<Vertex>),
    LineString(Vec<Vertex>),
    MultiLineString(Vec<Vec<Vertex>>),
    Polygon(Vec<Vec<Vertex>>),
    MultiPolygon(Vec<Vec<Vec<Vertex>>>),
}

impl Geometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::MultiPoint(_) => GeometryType::MultiPoint,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::MultiLineString(_) => GeometryType::MultiLineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
            Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
        }
    }
}

/// A geometry column too large or GPU-oriented to expand into nested
/// `Geometry` trees: a flat vertex buffer plus a triangle index buffer, as
/// produced by an encoder that chose indexed-triangle output (§4.5,
/// "Tessellated geometries").
#[derive(Debug, Clone, PartialEq)]
pub struct FlatGpuVector {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// The result of decoding one layer's geometry column: either a tree of
/// per-feature `Geometry` values, or a single flat GPU-ready buffer shared
/// across the layer.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryColumn {
    Tree(Vec<Geometry>),
    FlatGpu(FlatGpuVector),
}
