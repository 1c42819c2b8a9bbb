//! End-to-end scenarios from the specification's testable-properties section
//! (S1-S5; S6's FSST vector is covered in `codec::fsst`'s own unit tests),
//! driven entirely through the public `mlt` API rather than any single
//! module's internals.

use mlt::driver::{decode, encode, Config};
use mlt::geometry::{Geometry, GeometryColumn};
use mlt::model::{Layer, PropertyColumn, PropertyValue};
use mlt::tileset::{Column, ColumnScope, ComplexColumn, FeatureTable, ScalarColumn, ScalarType, TilesetMetadata};

fn geometry_column(name: &str) -> Column {
    Column::Complex(ComplexColumn { name: name.to_string(), children: vec![] })
}

fn id_column(scalar_type: ScalarType) -> Column {
    Column::Scalar(ScalarColumn { name: "id".to_string(), scalar_type, nullable: false })
}

fn property_column(name: &str, scalar_type: ScalarType) -> Column {
    Column::Scalar(ScalarColumn { name: name.to_string(), scalar_type, nullable: true })
}

/// S1 - single point: one layer "layer" extent 4096, one feature id=1,
/// geometry POINT(100,200), property flag=true.
#[test]
fn s1_single_point_round_trips() {
    let metadata = TilesetMetadata {
        feature_tables: vec![FeatureTable {
            name: "layer".to_string(),
            scope: ColumnScope::Feature,
            columns: vec![id_column(ScalarType::UInt32), geometry_column("geometry"), property_column("flag", ScalarType::Boolean)],
        }],
    };

    let layer = Layer {
        name: "layer".to_string(),
        extent: 4096,
        max_tile_extent: None,
        ids: Some(vec![1]),
        geometries: GeometryColumn::Tree(vec![Geometry::Point((100, 200))]),
        properties: vec![PropertyColumn { name: "flag".to_string(), values: vec![Some(PropertyValue::Bool(true))] }],
    };

    let bytes = encode(std::slice::from_ref(&layer), &Config::default()).unwrap();
    let tile = decode(&bytes, &metadata).unwrap();

    let decoded = tile.layer("layer").unwrap();
    assert_eq!(decoded.extent, 4096);
    assert_eq!(decoded.ids, Some(vec![1]));

    let feature = decoded.feature(0).unwrap();
    assert_eq!(feature.id, Some(1));
    assert_eq!(feature.geometry.geometry_type(), mlt::geometry::GeometryType::Point);
    assert_eq!(feature.geometry, &Geometry::Point((100, 200)));
    assert_eq!(feature.properties, vec![("flag", Some(&PropertyValue::Bool(true)))]);
}

/// S2 - line: "roads" extent 4096, id=42, LINESTRING[(0,0),(100,100),(200,50)],
/// properties name="Main Street", lanes=4.
#[test]
fn s2_line_round_trips_exactly() {
    let metadata = TilesetMetadata {
        feature_tables: vec![FeatureTable {
            name: "roads".to_string(),
            scope: ColumnScope::Feature,
            columns: vec![
                id_column(ScalarType::UInt32),
                geometry_column("geometry"),
                property_column("name", ScalarType::String),
                property_column("lanes", ScalarType::Int32),
            ],
        }],
    };

    let layer = Layer {
        name: "roads".to_string(),
        extent: 4096,
        max_tile_extent: None,
        ids: Some(vec![42]),
        geometries: GeometryColumn::Tree(vec![Geometry::LineString(vec![(0, 0), (100, 100), (200, 50)])]),
        properties: vec![
            PropertyColumn { name: "name".to_string(), values: vec![Some(PropertyValue::Str("Main Street".to_string()))] },
            PropertyColumn { name: "lanes".to_string(), values: vec![Some(PropertyValue::I32(4))] },
        ],
    };

    let bytes = encode(std::slice::from_ref(&layer), &Config::default()).unwrap();
    let tile = decode(&bytes, &metadata).unwrap();
    let decoded = tile.layer("roads").unwrap();

    assert_eq!(decoded.ids, Some(vec![42]));
    match &decoded.geometries {
        GeometryColumn::Tree(geometries) => {
            assert_eq!(geometries, &vec![Geometry::LineString(vec![(0, 0), (100, 100), (200, 50)])]);
        }
        GeometryColumn::FlatGpu(_) => panic!("expected a tree geometry column"),
    }
    assert_eq!(decoded.property("name").unwrap().values, vec![Some(PropertyValue::Str("Main Street".to_string()))]);
    assert_eq!(decoded.property("lanes").unwrap().values, vec![Some(PropertyValue::I32(4))]);
}

/// S3 - polygon with hole: "buildings" extent 4096, id=7, POLYGON with shell
/// [(0,0),(100,0),(100,100),(0,100)] (ring_sizes=[4]); the decoder closes the
/// ring to 5 vertices even though the input geometry never explicitly closed it.
#[test]
fn s3_polygon_shell_is_closed_on_decode() {
    let metadata = TilesetMetadata {
        feature_tables: vec![FeatureTable {
            name: "buildings".to_string(),
            scope: ColumnScope::Feature,
            columns: vec![id_column(ScalarType::UInt32), geometry_column("geometry")],
        }],
    };

    let open_shell = vec![(0, 0), (100, 0), (100, 100), (0, 100)];
    assert_eq!(open_shell.len(), 4, "S3 input is an open 4-vertex ring per ring_sizes=[4]");

    let layer = Layer {
        name: "buildings".to_string(),
        extent: 4096,
        max_tile_extent: None,
        ids: Some(vec![7]),
        geometries: GeometryColumn::Tree(vec![Geometry::Polygon(vec![open_shell.clone()])]),
        properties: vec![],
    };

    let bytes = encode(std::slice::from_ref(&layer), &Config::default()).unwrap();
    let tile = decode(&bytes, &metadata).unwrap();
    let decoded = tile.layer("buildings").unwrap();

    match &decoded.geometries {
        GeometryColumn::Tree(geometries) => match &geometries[0] {
            Geometry::Polygon(rings) => {
                assert_eq!(rings.len(), 1);
                assert_eq!(rings[0].len(), 5, "the decoder must close the shell to 5 vertices");
                assert_eq!(rings[0].first(), rings[0].last());
                assert_eq!(rings[0], vec![(0, 0), (100, 0), (100, 100), (0, 100), (0, 0)]);
            }
            other => panic!("expected Polygon, got {:?}", other),
        },
        GeometryColumn::FlatGpu(_) => panic!("expected a tree geometry column"),
    }
}

/// S4 - 100 points: ids 0..99, point (10i, 20i), property rank=i, name="POI #i".
#[test]
fn s4_one_hundred_points_all_ids_match() {
    let metadata = TilesetMetadata {
        feature_tables: vec![FeatureTable {
            name: "pois".to_string(),
            scope: ColumnScope::Feature,
            columns: vec![
                id_column(ScalarType::UInt32),
                geometry_column("geometry"),
                property_column("rank", ScalarType::Int32),
                property_column("name", ScalarType::String),
            ],
        }],
    };

    let ids: Vec<u64> = (0..100).collect();
    let geometries = (0..100_i32).map(|i| Geometry::Point((10 * i, 20 * i))).collect();
    let ranks = (0..100_i32).map(|i| Some(PropertyValue::I32(i))).collect();
    let names = (0..100).map(|i| Some(PropertyValue::Str(format!("POI #{}", i)))).collect();

    let layer = Layer {
        name: "pois".to_string(),
        extent: 4096,
        max_tile_extent: None,
        ids: Some(ids.clone()),
        geometries: GeometryColumn::Tree(geometries),
        properties: vec![
            PropertyColumn { name: "rank".to_string(), values: ranks },
            PropertyColumn { name: "name".to_string(), values: names },
        ],
    };

    let bytes = encode(std::slice::from_ref(&layer), &Config::default()).unwrap();
    let tile = decode(&bytes, &metadata).unwrap();
    let decoded = tile.layer("pois").unwrap();

    assert_eq!(decoded.feature_count(), 100);
    assert_eq!(decoded.ids, Some(ids));

    for i in 0..100_usize {
        let feature = decoded.feature(i).unwrap();
        assert_eq!(feature.id, Some(i as u64));
        assert_eq!(feature.geometry, &Geometry::Point((10 * i as i32, 20 * i as i32)));
    }
}

/// S5 - multi-layer tile: two layers, {points: one POINT(50,50), lines: one
/// LINESTRING[(0,0)->(100,100)]}; both layers present, feature counts 1 and 1.
#[test]
fn s5_multi_layer_tile_preserves_both_layers() {
    let metadata = TilesetMetadata {
        feature_tables: vec![
            FeatureTable {
                name: "points".to_string(),
                scope: ColumnScope::Feature,
                columns: vec![geometry_column("geometry")],
            },
            FeatureTable {
                name: "lines".to_string(),
                scope: ColumnScope::Feature,
                columns: vec![geometry_column("geometry")],
            },
        ],
    };

    let points_layer = Layer {
        name: "points".to_string(),
        extent: 4096,
        max_tile_extent: None,
        ids: None,
        geometries: GeometryColumn::Tree(vec![Geometry::Point((50, 50))]),
        properties: vec![],
    };

    let lines_layer = Layer {
        name: "lines".to_string(),
        extent: 4096,
        max_tile_extent: None,
        ids: None,
        geometries: GeometryColumn::Tree(vec![Geometry::LineString(vec![(0, 0), (100, 100)])]),
        properties: vec![],
    };

    let bytes = encode(&[points_layer, lines_layer], &Config::default().with_include_ids(false)).unwrap();
    let tile = decode(&bytes, &metadata).unwrap();

    assert_eq!(tile.layers.len(), 2);
    assert_eq!(tile.layer("points").unwrap().feature_count(), 1);
    assert_eq!(tile.layer("lines").unwrap().feature_count(), 1);
    assert_eq!(tile.layer("points").unwrap().feature(0).unwrap().geometry, &Geometry::Point((50, 50)));
    assert_eq!(
        tile.layer("lines").unwrap().feature(0).unwrap().geometry,
        &Geometry::LineString(vec![(0, 0), (100, 100)])
    );
}
