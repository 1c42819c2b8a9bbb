//! The public, decoded data model (§3): a `Tile` holding one `Layer` per
//! feature table, each a column-oriented store of geometries, ids, and
//! properties that `Feature` provides a borrowed per-row view over.

use crate::error::{Error, Result};
use crate::geometry::{Geometry, GeometryColumn};

/// One property value, tagged by the column's declared `ScalarType`.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    I8(i8),
    U8(u8),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
}

/// One decoded property column: a name and one optional value per feature
/// (`None` where the present bitmap was unset).
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyColumn {
    pub name: String,
    pub values: Vec<Option<PropertyValue>>,
}

/// A borrowed, per-feature view assembled on demand from a `Layer`'s
/// column-oriented storage.
#[derive(Debug, Clone)]
pub struct Feature<'layer> {
    pub id: Option<u64>,
    pub geometry: &'layer Geometry,
    pub properties: Vec<(&'layer str, Option<&'layer PropertyValue>)>,
}

/// One layer's decoded contents: its geometries (a per-feature tree, or a
/// single flat GPU vector when the column was tessellated), an optional id
/// column, and its property columns.
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub extent: u32,
    /// §9 Open Question, resolved: retained verbatim as a plain field rather
    /// than folded into `extent`, since it describes the tile's total
    /// coordinate space rather than its rendered extent.
    pub max_tile_extent: Option<u32>,
    pub ids: Option<Vec<u64>>,
    pub geometries: GeometryColumn,
    pub properties: Vec<PropertyColumn>,
}

impl Layer {
    pub fn feature_count(&self) -> usize {
        match &self.geometries {
            GeometryColumn::Tree(geometries) => geometries.len(),
            GeometryColumn::FlatGpu(_) => 0,
        }
    }

    /// Build a borrowed per-feature view. Fails if the layer's geometry
    /// column is a flat GPU vector, which has no notion of individual
    /// features to index into.
    pub fn feature(&self, index: usize) -> Result<Feature<'_>> {
        let geometries = match &self.geometries {
            GeometryColumn::Tree(geometries) => geometries,
            GeometryColumn::FlatGpu(_) => {
                return Err(Error::geometry("cannot index individual features in a flat GPU geometry vector"))
            }
        };

        let geometry = geometries
            .get(index)
            .ok_or_else(|| Error::geometry(format!("feature index {} out of range ({} features)", index, geometries.len())))?;

        let properties = self
            .properties
            .iter()
            .map(|column| {
                let value = column.values.get(index).and_then(Option::as_ref);
                (column.name.as_str(), value)
            })
            .collect();

        Ok(Feature { id: self.ids.as_ref().and_then(|ids| ids.get(index).copied()), geometry, properties })
    }

    pub fn property(&self, name: &str) -> Option<&PropertyColumn> {
        self.properties.iter().find(|column| column.name == name)
    }
}

/// A decoded tile: one `Layer` per feature table present in the tile body.
#[derive(Debug, Clone, Default)]
pub struct Tile {
    pub layers: Vec<Layer>,
}

impl Tile {
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.name == name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_layer() -> Layer {
        Layer {
            name: "roads".into(),
            extent: 4096,
            max_tile_extent: None,
            ids: Some(vec![1, 2]),
            geometries: GeometryColumn::Tree(vec![
                Geometry::Point((0, 0)),
                Geometry::Point((1, 1)),
            ]),
            properties: vec![PropertyColumn {
                name: "class".into(),
                values: vec![Some(PropertyValue::Str("primary".into())), None],
            }],
        }
    }

    #[test]
    fn feature_view_joins_geometry_id_and_properties() {
        let layer = sample_layer();

        let feature = layer.feature(0).unwrap();
        assert_eq!(feature.id, Some(1));
        assert_eq!(feature.geometry, &Geometry::Point((0, 0)));
        assert_eq!(feature.properties, vec![("class", Some(&PropertyValue::Str("primary".into())))]);

        let absent = layer.feature(1).unwrap();
        assert_eq!(absent.properties, vec![("class", None)]);
    }

    #[test]
    fn feature_out_of_range_is_an_error() {
        let layer = sample_layer();
        assert!(layer.feature(5).is_err());
    }

    #[test]
    fn tile_looks_up_layers_by_name() {
        let tile = Tile { layers: vec![sample_layer()] };
        assert!(tile.layer("roads").is_some());
        assert!(tile.layer("buildings").is_none());
    }
}
