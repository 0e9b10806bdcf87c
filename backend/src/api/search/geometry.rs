//! Parsing of the `bbox` and `geometry` spatial parameters.

use serde_json::{Value, json};

use crate::error::{Result, SearchError};

/// A `[longitude, latitude]` pair.
pub type Position = [f64; 2];

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Axis aligned box from its `[west, south]` and `[east, north]` corners.
    Envelope { min: Position, max: Position },
    Polygon { outer: Vec<Position>, hole: Option<Vec<Position>> },
}

impl Shape {
    /// The geo_shape `shape` object understood by the search engine.
    pub fn to_json(&self) -> Value {
        match self {
            Shape::Envelope { min, max } => json!({
                "type": "envelope",
                "coordinates": [min, max],
            }),
            Shape::Polygon { outer, hole } => {
                let mut rings = vec![outer.clone()];
                if let Some(hole) = hole {
                    rings.push(hole.clone());
                }
                json!({
                    "type": "polygon",
                    "coordinates": rings,
                })
            }
        }
    }
}

/// Parse `west,south,east,north`. A value that does not have exactly four
/// numeric fields yields no shape rather than an error.
pub fn parse_bbox(bbox: &str) -> Option<Shape> {
    let fields = bbox.split(',').map(|f| f.trim().parse::<f64>()).collect::<Vec<_>>();
    match fields.as_slice() {
        [Ok(west), Ok(south), Ok(east), Ok(north)] => Some(Shape::Envelope {
            min: [*west, *south],
            max: [*east, *north],
        }),
        _ => {
            tracing::debug!("bbox values not west, south, east, north: {}", bbox);
            None
        }
    }
}

/// Parse a WKT polygon with an outer ring and at most one hole.
pub fn parse_polygon(geometry: &str) -> Result<Shape> {
    let geometry = geometry.trim().to_uppercase();
    let Some(body) = geometry.strip_prefix("POLYGON") else {
        return Err(SearchError::client("Invalid geometry, it must be a POLYGON"));
    };
    let invalid = || SearchError::client(format!("Invalid polygon WKT format, {}", geometry));

    // "((ring)(ring))" splits on '(' into ["", "", "ring)", "ring))"].
    let parts = body.trim().split('(').collect::<Vec<_>>();
    if parts.len() < 3 || !parts[0].trim().is_empty() || !parts[1].trim().is_empty() {
        return Err(invalid());
    }
    let rings = parts[2..]
        .iter()
        .map(|part| part.split(')').next().unwrap_or("").trim())
        .collect::<Vec<_>>();

    let outer = parse_ring(rings[0])?;
    let hole = match &rings[1..] {
        [] => None,
        [inner] => Some(parse_ring(inner)?),
        _ => {
            return Err(SearchError::client(
                "Invalid polygon WKT format, only one interior ring is supported",
            ));
        }
    };
    Ok(Shape::Polygon { outer, hole })
}

fn parse_ring(ring: &str) -> Result<Vec<Position>> {
    let points = ring.split(',').collect::<Vec<_>>();
    if points.len() < 4 {
        return Err(SearchError::client(
            "Invalid polygon WKT format, number of points in a ring must be >= 4",
        ));
    }
    points
        .into_iter()
        .map(|point| {
            let coords = point.trim().split(' ').collect::<Vec<_>>();
            match coords.as_slice() {
                [lon, lat] => match (lon.parse::<f64>(), lat.parse::<f64>()) {
                    (Ok(lon), Ok(lat)) => Ok([lon, lat]),
                    _ => Err(SearchError::client("Invalid polygon WKT format")),
                },
                _ => Err(SearchError::client("Invalid polygon WKT format")),
            }
        })
        .collect()
}
