//! Static geographic inputs: GeoJSON features and site points.

use geojson::{GeoJson, JsonObject};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{GridvizError, Result};

/// A (lon, lat) position.
pub type Position = (f64, f64);

/// Feature geometry in (lon, lat) positions. Altitude components are dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
    Collection(Vec<Geometry>),
}

fn position(raw: &[f64]) -> Option<Position> {
    match raw {
        [lon, lat, ..] => Some((*lon, *lat)),
        _ => None,
    }
}

fn path(raw: &[Vec<f64>]) -> Vec<Position> {
    raw.iter().filter_map(|p| position(p)).collect()
}

fn rings(raw: &[Vec<Vec<f64>>]) -> Vec<Vec<Position>> {
    raw.iter().map(|r| path(r)).collect()
}

impl From<&geojson::Value> for Geometry {
    fn from(value: &geojson::Value) -> Self {
        use geojson::Value as V;
        match value {
            // A point with fewer than two coordinates has nowhere to go.
            V::Point(p) => position(p).map_or_else(|| Self::MultiPoint(Vec::new()), Self::Point),
            V::MultiPoint(ps) => Self::MultiPoint(path(ps)),
            V::LineString(ps) => Self::LineString(path(ps)),
            V::MultiLineString(ls) => Self::MultiLineString(rings(ls)),
            V::Polygon(rs) => Self::Polygon(rings(rs)),
            V::MultiPolygon(polys) => Self::MultiPolygon(polys.iter().map(|p| rings(p)).collect()),
            V::GeometryCollection(gs) => {
                Self::Collection(gs.iter().map(|g| Self::from(&g.value)).collect())
            }
        }
    }
}

impl Geometry {
    /// Representative point: the point itself, or the first vertex otherwise.
    pub fn anchor(&self) -> Option<Position> {
        match self {
            Self::Point(p) => Some(*p),
            Self::MultiPoint(ps) | Self::LineString(ps) => ps.first().copied(),
            Self::MultiLineString(ls) | Self::Polygon(ls) => ls.first()?.first().copied(),
            Self::MultiPolygon(polys) => polys.first()?.first()?.first().copied(),
            Self::Collection(gs) => gs.iter().find_map(Self::anchor),
        }
    }

    /// Every point of a point geometry.
    pub fn points(&self) -> Vec<Position> {
        match self {
            Self::Point(p) => vec![*p],
            Self::MultiPoint(ps) => ps.clone(),
            Self::Collection(gs) => gs.iter().flat_map(Self::points).collect(),
            _ => Vec::new(),
        }
    }

    /// Every polyline of a line geometry, or every ring of a polygon geometry.
    pub fn paths(&self) -> Vec<Vec<Position>> {
        match self {
            Self::LineString(ps) => vec![ps.clone()],
            Self::MultiLineString(ls) | Self::Polygon(ls) => ls.clone(),
            Self::MultiPolygon(polys) => polys.iter().flatten().cloned().collect(),
            Self::Collection(gs) => gs.iter().flat_map(Self::paths).collect(),
            Self::Point(_) | Self::MultiPoint(_) => Vec::new(),
        }
    }

    /// Visits every vertex.
    fn for_each_position(&self, mut f: impl FnMut(Position)) {
        for p in self.points() {
            f(p);
        }
        for line in self.paths() {
            for p in line {
                f(p);
            }
        }
    }
}

/// A feature with free-form properties. Null properties read as empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Option<Geometry>,
    pub properties: JsonObject,
}

impl From<geojson::Feature> for Feature {
    fn from(f: geojson::Feature) -> Self {
        Self {
            geometry: f.geometry.map(|g| Geometry::from(&g.value)),
            properties: f.properties.unwrap_or_default(),
        }
    }
}

impl Feature {
    /// String property, also accepting numbers (bus names may be numeric).
    pub fn text_property(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Numeric property, also accepting numeric strings.
    pub fn number_property(&self, key: &str) -> Option<f64> {
        match self.properties.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Reads one member of a feature list. Plain records with `geometry` and
/// `properties` but no `type` are accepted as features, and bare geometries
/// become features without properties.
fn feature_from_json(item: Value) -> std::result::Result<Feature, geojson::Error> {
    let Value::Object(mut object) = item else {
        return geojson::Feature::try_from(item).map(Feature::from);
    };
    match object.get("type").and_then(Value::as_str) {
        None | Some("Feature") => {
            object
                .entry("type")
                .or_insert_with(|| Value::from("Feature"));
            object.entry("geometry").or_insert(Value::Null);
            object.entry("properties").or_insert(Value::Null);
            geojson::Feature::try_from(object).map(Feature::from)
        }
        Some(_) => geojson::Geometry::try_from(object).map(|g| Feature {
            geometry: Some(Geometry::from(&g.value)),
            properties: JsonObject::new(),
        }),
    }
}

/// Parses a FeatureCollection, a single Feature or Geometry, or a bare JSON
/// array of features.
///
/// Members of a collection or array that are not valid features are skipped
/// with a warning, so one bad record does not empty the layer.
///
/// # Errors
///
/// Returns [`GridvizError::Json`] if the text is not JSON and
/// [`GridvizError::GeoJson`] if a top-level object is not GeoJSON.
pub fn parse_features(text: &str, source_name: &str) -> Result<Vec<Feature>> {
    let doc: Value = serde_json::from_str(text).map_err(|source| GridvizError::Json {
        source_name: source_name.to_string(),
        source,
    })?;
    let items = match doc {
        Value::Array(items) => items,
        Value::Object(mut object)
            if object.get("type").and_then(Value::as_str) == Some("FeatureCollection") =>
        {
            match object.remove("features") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            }
        }
        other => {
            let geojson = GeoJson::from_json_value(other).map_err(|source| {
                GridvizError::GeoJson {
                    source_name: source_name.to_string(),
                    source,
                }
            })?;
            return Ok(match geojson {
                GeoJson::FeatureCollection(fc) => {
                    fc.features.into_iter().map(Feature::from).collect()
                }
                GeoJson::Feature(f) => vec![Feature::from(f)],
                GeoJson::Geometry(g) => vec![Feature {
                    geometry: Some(Geometry::from(&g.value)),
                    properties: JsonObject::new(),
                }],
            });
        }
    };

    let mut features = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match feature_from_json(item) {
            Ok(f) => features.push(f),
            Err(e) => warn!(source = source_name, index, error = %e, "skipping malformed feature"),
        }
    }
    Ok(features)
}

/// A site record with a top-level id and point geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct SitePoint {
    pub id: i64,
    pub geometry: Geometry,
}

#[derive(Deserialize)]
struct SiteRecord {
    #[serde(rename = "ID")]
    id: i64,
    geometry: geojson::Geometry,
}

impl SitePoint {
    pub fn position(&self) -> Option<Position> {
        self.geometry.anchor()
    }
}

/// Parses a JSON array of site records.
///
/// # Errors
///
/// Returns [`GridvizError::Json`] on malformed input.
pub fn parse_sites(text: &str, source_name: &str) -> Result<Vec<SitePoint>> {
    let records: Vec<SiteRecord> =
        serde_json::from_str(text).map_err(|source| GridvizError::Json {
            source_name: source_name.to_string(),
            source,
        })?;
    Ok(records
        .into_iter()
        .map(|r| SitePoint {
            id: r.id,
            geometry: Geometry::from(&r.geometry.value),
        })
        .collect())
}

/// Bounding box of a set of features: `(min_lon, min_lat, max_lon, max_lat)`.
pub fn bounds<'a>(features: impl IntoIterator<Item = &'a Feature>) -> Option<(f64, f64, f64, f64)> {
    let mut bbox: Option<(f64, f64, f64, f64)> = None;
    for geometry in features.into_iter().filter_map(|f| f.geometry.as_ref()) {
        geometry.for_each_position(|(x, y)| {
            bbox = Some(match bbox {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        });
    }
    bbox
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUSES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-122.24, 37.81, 0.0]},
             "properties": {"bus": "b1"}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-122.23, 37.82]},
             "properties": {"bus": 702}}
        ]
    }"#;

    #[test]
    fn parses_feature_collection() {
        let features = parse_features(BUSES, "buses").expect("parse");
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].text_property("bus").as_deref(), Some("b1"));
        assert_eq!(features[1].text_property("bus").as_deref(), Some("702"));
        assert_eq!(
            features[0].geometry.as_ref().and_then(Geometry::anchor),
            Some((-122.24, 37.81))
        );
    }

    #[test]
    fn parses_bare_feature_array() {
        let text = r#"[{"geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
                         "properties": {"voltage": 1.01}}]"#;
        let features = parse_features(text, "contours").expect("parse");
        assert_eq!(features[0].number_property("voltage"), Some(1.01));
    }

    #[test]
    fn polygon_rings_become_paths() {
        let text = r#"[{"geometry": {"type": "Polygon",
            "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}, "properties": {}}]"#;
        let features = parse_features(text, "voronoi").expect("parse");
        let geometry = features[0].geometry.as_ref().expect("geometry");
        assert_eq!(geometry.paths(), vec![vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]]);
        assert!(geometry.points().is_empty());
    }

    #[test]
    fn null_geometry_is_allowed() {
        let text = r#"[{"geometry": null, "properties": {"bus": "x"}}]"#;
        let features = parse_features(text, "buses").expect("parse");
        assert!(features[0].geometry.is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            parse_features("{\"type\": 3", "buses"),
            Err(GridvizError::Json { .. })
        ));
    }

    #[test]
    fn sites_parse_with_top_level_id() {
        let text = r#"[{"ID": 7, "geometry": {"type": "Point", "coordinates": [-76.9, 37.2]}}]"#;
        let sites = parse_sites(text, "sites").expect("parse");
        assert_eq!(sites[0].id, 7);
        assert_eq!(sites[0].position(), Some((-76.9, 37.2)));
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let features = parse_features(BUSES, "buses").expect("parse");
        assert_eq!(
            bounds(&features),
            Some((-122.24, 37.81, -122.23, 37.82))
        );
        assert_eq!(bounds(&[]), None);
    }

    #[test]
    fn null_properties_read_as_empty() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
             "properties": null},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [3.0, 4.0]},
             "properties": {"bus": "b2"}}
        ]}"#;
        let features = parse_features(text, "buses").expect("parse");
        assert_eq!(features.len(), 2);
        assert!(features[0].properties.is_empty());
        assert_eq!(features[0].text_property("bus"), None);
        assert_eq!(features[1].text_property("bus").as_deref(), Some("b2"));
    }

    #[test]
    fn geometry_collections_flatten() {
        let text = r#"[
            {"type": "Feature", "properties": {"name": "site"}, "geometry": {
                "type": "GeometryCollection", "geometries": [
                    {"type": "Point", "coordinates": [1.0, 2.0]},
                    {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}
                ]}},
            {"type": "GeometryCollection", "geometries": []}
        ]"#;
        let features = parse_features(text, "tx").expect("parse");
        assert_eq!(features.len(), 2);
        let geometry = features[0].geometry.as_ref().expect("geometry");
        assert_eq!(geometry.anchor(), Some((1.0, 2.0)));
        assert_eq!(geometry.points(), vec![(1.0, 2.0)]);
        assert_eq!(geometry.paths(), vec![vec![(0.0, 0.0), (1.0, 1.0)]]);

        let empty = features[1].geometry.as_ref().expect("geometry");
        assert_eq!(empty.anchor(), None);
        assert!(features[1].properties.is_empty());
    }

    #[test]
    fn invalid_member_is_skipped_not_fatal() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
             "properties": {"bus": "ok"}},
            {"type": "Feature", "geometry": {"type": "Blob"}, "properties": {}},
            42
        ]}"#;
        let features = parse_features(text, "buses").expect("parse");
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].text_property("bus").as_deref(), Some("ok"));
    }

    #[test]
    fn single_feature_document() {
        let text = r#"{"type": "Feature", "geometry": {"type": "Point", "coordinates": [5.0, 6.0]},
                       "properties": {"name": "pv"}}"#;
        let features = parse_features(text, "pv").expect("parse");
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].text_property("name").as_deref(), Some("pv"));
    }

    #[test]
    fn non_geojson_object_names_its_source() {
        match parse_features(r#"{"type": "Topology"}"#, "lines") {
            Err(GridvizError::GeoJson { source_name, .. }) => assert_eq!(source_name, "lines"),
            other => panic!("expected GeoJSON error, got {other:?}"),
        }
    }
}
