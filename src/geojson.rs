//! Line-geometry GeoJSON model
//!
//! Hand-rolled `Feature`/`FeatureCollection` types covering exactly the line
//! geometries this crate emits, plus the reversal helpers used when a member
//! is traversed against its own coordinate order.

use serde::Serialize;
use serde_json::{Map, Value};

/// `[lon, lat]` coordinate
pub type Position = [f64; 2];

/// GeoJSON feature properties
pub type Properties = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Geometry {
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub properties: Properties,
    pub geometry: Geometry,
}

impl Feature {
    pub fn new(properties: Properties, geometry: Geometry) -> Self {
        Feature {
            kind: "Feature",
            properties,
            geometry,
        }
    }

    /// Coordinate sequence of a LineString feature; `None` for multi-lines
    pub fn line_coordinates(&self) -> Option<&[Position]> {
        match &self.geometry {
            Geometry::LineString { coordinates } => Some(coordinates),
            Geometry::MultiLineString { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        FeatureCollection {
            kind: "FeatureCollection",
            features,
        }
    }

    /// Collapse a collection of line features into one MultiLineString feature
    /// carrying the given properties.
    pub fn into_multi_line_string(self, properties: Properties) -> Feature {
        let coordinates = self
            .features
            .into_iter()
            .flat_map(|feature| match feature.geometry {
                Geometry::LineString { coordinates } => vec![coordinates],
                Geometry::MultiLineString { coordinates } => coordinates,
            })
            .collect();

        Feature::new(properties, Geometry::MultiLineString { coordinates })
    }
}

/// Reverse a line feature: coordinates flip, and the `@id` property gains or
/// loses its `-` traversal prefix.
pub fn reverse_line_feature(feature: &Feature) -> Feature {
    let mut properties = feature.properties.clone();
    if let Some(Value::String(id)) = properties.get("@id") {
        let flipped = match id.strip_prefix('-') {
            Some(absolute) => absolute.to_string(),
            None => format!("-{id}"),
        };
        properties.insert("@id".to_string(), flipped.into());
    }

    let geometry = match &feature.geometry {
        Geometry::LineString { coordinates } => {
            let mut coordinates = coordinates.clone();
            coordinates.reverse();
            Geometry::LineString { coordinates }
        }
        Geometry::MultiLineString { coordinates } => Geometry::MultiLineString {
            coordinates: coordinates
                .iter()
                .map(|line| {
                    let mut line = line.clone();
                    line.reverse();
                    line
                })
                .collect(),
        },
    };

    Feature::new(properties, geometry)
}

/// Reverse a whole collection: line order flips, then every line is reversed
/// individually (including its traversal flag).
pub fn reverse_feature_collection(collection: &FeatureCollection) -> FeatureCollection {
    FeatureCollection::new(
        collection
            .features
            .iter()
            .rev()
            .map(reverse_line_feature)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line_feature(id: &str, coordinates: Vec<Position>) -> Feature {
        let mut properties = Properties::new();
        properties.insert("@id".to_string(), id.into());
        Feature::new(properties, Geometry::LineString { coordinates })
    }

    #[test]
    fn test_serializes_as_geojson() {
        let feature = line_feature("w12", vec![[102.0, 102.0], [103.0, 103.0]]);
        assert_eq!(
            serde_json::to_value(&feature).unwrap(),
            json!({
                "type": "Feature",
                "properties": {"@id": "w12"},
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[102.0, 102.0], [103.0, 103.0]],
                },
            })
        );
    }

    #[test]
    fn test_reverse_flips_coords_and_id() {
        let reversed = reverse_line_feature(&line_feature("w12", vec![[1.0, 1.0], [2.0, 2.0]]));
        assert_eq!(reversed.properties["@id"], "-w12");
        assert_eq!(reversed.line_coordinates(), Some(&[[2.0, 2.0], [1.0, 1.0]][..]));
    }

    #[test]
    fn test_reverse_round_trip_restores_original() {
        let original = line_feature("w12", vec![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]]);
        assert_eq!(reverse_line_feature(&reverse_line_feature(&original)), original);
    }

    #[test]
    fn test_reverse_collection_flips_line_order() {
        let collection = FeatureCollection::new(vec![
            line_feature("w1", vec![[0.0, 0.0], [1.0, 1.0]]),
            line_feature("-w2", vec![[2.0, 2.0], [1.0, 1.0]]),
        ]);

        let reversed = reverse_feature_collection(&collection);
        assert_eq!(reversed.features[0].properties["@id"], "w2");
        assert_eq!(reversed.features[1].properties["@id"], "-w1");
        assert_eq!(
            reversed.features[0].line_coordinates(),
            Some(&[[1.0, 1.0], [2.0, 2.0]][..])
        );
    }

    #[test]
    fn test_into_multi_line_string() {
        let collection = FeatureCollection::new(vec![
            line_feature("w1", vec![[0.0, 0.0], [1.0, 1.0]]),
            line_feature("w2", vec![[1.0, 1.0], [2.0, 2.0]]),
        ]);

        let multi = collection.into_multi_line_string(Properties::new());
        assert_eq!(
            multi.geometry,
            Geometry::MultiLineString {
                coordinates: vec![
                    vec![[0.0, 0.0], [1.0, 1.0]],
                    vec![[1.0, 1.0], [2.0, 2.0]],
                ],
            }
        );
    }
}
