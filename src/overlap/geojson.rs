//! GeoJSON polygon parsing and geometry validation
//!
//! Accepts a bare `Polygon` geometry or a `Feature` wrapping one. Positions
//! are `[lon, lat]` (extra altitude values are ignored).
//!
//! A ring is rejected when it has fewer than three distinct vertices,
//! non-finite coordinates, or edges that cross or fold back. A hole must lie
//! inside the exterior ring and may only touch other holes. The polygon as a
//! whole must have positive area.

use crate::error::{Result, ValidationError};
use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, Contains, Coord, Line, LineString, Polygon, Relate};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonInput {
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    Feature {
        geometry: Box<GeoJsonInput>,
    },
}

fn invalid(msg: impl Into<String>) -> ValidationError {
    ValidationError::InvalidGeometry(msg.into())
}

fn parse_ring(ring_idx: usize, positions: &[Vec<f64>]) -> Result<LineString<f64>> {
    let mut coords = Vec::with_capacity(positions.len() + 1);
    for (i, position) in positions.iter().enumerate() {
        let (x, y) = match position.as_slice() {
            [x, y, ..] => (*x, *y),
            _ => {
                return Err(invalid(format!(
                    "ring {} position {} needs at least two numbers",
                    ring_idx, i
                )))
            }
        };
        coords.push(Coord { x, y });
    }
    normalize_ring(ring_idx, coords)
}

/// Finite, deduplicated, closed ring with at least three distinct vertices
fn normalize_ring(ring_idx: usize, mut coords: Vec<Coord<f64>>) -> Result<LineString<f64>> {
    if let Some(i) = coords.iter().position(|c| !(c.x.is_finite() && c.y.is_finite())) {
        return Err(invalid(format!("ring {} position {} is not finite", ring_idx, i)));
    }

    // Drop consecutive duplicates, then close
    coords.dedup();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return Err(invalid(format!(
            "ring {} has fewer than 3 distinct vertices",
            ring_idx
        )));
    }
    if let Some(first) = coords.first().copied() {
        coords.push(first);
    }
    Ok(LineString::new(coords))
}

/// Edges of a closed ring that cross, touch away from a shared vertex, or
/// fold back onto their neighbour
fn check_simple(ring_idx: usize, ring: &LineString<f64>) -> Result<()> {
    let edges: Vec<Line<f64>> = ring.lines().collect();
    let n = edges.len();

    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            let Some(hit) = line_intersection(edges[i], edges[j]) else {
                continue;
            };
            let bad = match hit {
                // Neighbours always share one endpoint
                LineIntersection::SinglePoint { .. } => !adjacent,
                LineIntersection::Collinear { intersection } => {
                    !adjacent || intersection.start != intersection.end
                }
            };
            if bad {
                return Err(invalid(format!(
                    "ring {} self-intersects between edges {} and {}",
                    ring_idx, i, j
                )));
            }
        }
    }
    Ok(())
}

/// Holes must lie inside the exterior and may only touch each other
fn check_rings_nest(exterior: &LineString<f64>, holes: &[LineString<f64>]) -> Result<()> {
    let shell = Polygon::new(exterior.clone(), vec![]);
    let hole_polygons: Vec<Polygon<f64>> = holes
        .iter()
        .map(|h| Polygon::new(h.clone(), vec![]))
        .collect();

    for (i, hole) in hole_polygons.iter().enumerate() {
        if !shell.contains(hole) {
            return Err(invalid(format!("ring {} is not inside the exterior ring", i + 1)));
        }
    }

    for i in 0..hole_polygons.len() {
        for j in (i + 1)..hole_polygons.len() {
            let matrix = hole_polygons[i].relate(&hole_polygons[j]);
            if matrix.is_intersects() && !matrix.is_touches() {
                return Err(invalid(format!("rings {} and {} overlap", i + 1, j + 1)));
            }
        }
    }
    Ok(())
}

/// Validate an already-built polygon and return it in normalized form
///
/// Every ring is deduplicated, closed and checked for self-intersection;
/// holes must nest inside the exterior without overlapping each other; the
/// result must have positive area.
pub fn validate_polygon(polygon: Polygon<f64>) -> Result<Polygon<f64>> {
    let (exterior, interiors) = polygon.into_inner();

    let exterior = normalize_ring(0, exterior.0)?;
    check_simple(0, &exterior)?;

    let mut holes = Vec::with_capacity(interiors.len());
    for (i, hole) in interiors.into_iter().enumerate() {
        let ring = normalize_ring(i + 1, hole.0)?;
        check_simple(i + 1, &ring)?;
        holes.push(ring);
    }
    check_rings_nest(&exterior, &holes)?;

    let polygon = Polygon::new(exterior, holes);
    if !polygon.unsigned_area().is_normal() {
        return Err(invalid("polygon has zero area"));
    }
    Ok(polygon)
}

/// Build a validated polygon from GeoJSON ring coordinates
pub fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>> {
    let Some((exterior, holes)) = rings.split_first() else {
        return Err(invalid("polygon has no rings"));
    };

    let exterior = parse_ring(0, exterior)?;
    let interiors = holes
        .iter()
        .enumerate()
        .map(|(i, hole)| parse_ring(i + 1, hole))
        .collect::<Result<Vec<_>>>()?;

    validate_polygon(Polygon::new(exterior, interiors))
}

/// Parse a GeoJSON `Polygon` (or `Feature` wrapping one)
pub fn parse_polygon(value: &Value) -> Result<Polygon<f64>> {
    let input = GeoJsonInput::deserialize(value)
        .map_err(|e| invalid(format!("expected a GeoJSON Polygon: {}", e)))?;

    let mut current = input;
    loop {
        match current {
            GeoJsonInput::Polygon { coordinates } => return polygon_from_rings(&coordinates),
            GeoJsonInput::Feature { geometry } => current = *geometry,
        }
    }
}
