use geosieve_core::{schema::is_geographic, stmt::SpatialRelation, Error, Result};

use geo::{
    BoundingRect, Buffer, Coord, Geometry, HasDimensions, Intersects, MapCoords, Rect, Relate,
};
use std::{f64::consts::PI, str::FromStr};

/// Equatorial radius of the WGS 84 ellipsoid, in metres.
const EARTH_RADIUS: f64 = 6_378_137.0;

const WGS84: u32 = 4326;
const WEB_MERCATOR: u32 = 3857;

/// A geometry together with its bounding box, computed once.
#[derive(Debug, Clone)]
pub(crate) struct Shape {
    pub(crate) geometry: Geometry,
    pub(crate) bbox: Option<Rect>,
}

impl Shape {
    pub(crate) fn new(geometry: Geometry) -> Shape {
        let bbox = geometry.bounding_rect();
        Shape { geometry, bbox }
    }
}

pub(crate) fn parse_wkt(text: &str) -> Result<Geometry> {
    let parsed = wkt::Wkt::<f64>::from_str(text)
        .map_err(|err| Error::invalid_geometry(format!("{err:?}: {text}")))?;
    parsed
        .try_into()
        .map_err(|err: wkt::conversion::Error| Error::invalid_geometry(format!("{err:?}: {text}")))
}

/// Reprojects between WGS 84 and spherical Web Mercator. Any other pair of
/// distinct SRIDs is rejected.
pub(crate) fn transform(geometry: Geometry, from: u32, to: u32) -> Result<Geometry> {
    match (from, to) {
        (from, to) if from == to => Ok(geometry),
        (WGS84, WEB_MERCATOR) => Ok(geometry.map_coords(to_mercator)),
        (WEB_MERCATOR, WGS84) => Ok(geometry.map_coords(from_mercator)),
        (from, to) => Err(Error::expression_translation(format!(
            "in-memory backend cannot transform EPSG:{from} to EPSG:{to}"
        ))),
    }
}

fn to_mercator(Coord { x, y }: Coord) -> Coord {
    Coord {
        x: x.to_radians() * EARTH_RADIUS,
        y: (PI / 4.0 + y.to_radians() / 2.0).tan().ln() * EARTH_RADIUS,
    }
}

fn from_mercator(Coord { x, y }: Coord) -> Coord {
    Coord {
        x: (x / EARTH_RADIUS).to_degrees(),
        y: (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees(),
    }
}

/// Buffers `geometry` (stored in `srid`) by `distance` linear units.
/// Geographic geometries are buffered in metres through Web Mercator.
///
/// Returns `None` when a negative distance erodes the geometry away.
pub(crate) fn buffer(geometry: Geometry, srid: u32, distance: f64) -> Result<Option<Geometry>> {
    if distance == 0.0 {
        return Ok(Some(geometry));
    }

    let buffered = if is_geographic(srid) {
        let projected = transform(geometry, srid, WEB_MERCATOR)?;
        let buffered = Geometry::MultiPolygon(projected.buffer(distance));
        transform(buffered, WEB_MERCATOR, srid)?
    } else {
        Geometry::MultiPolygon(geometry.buffer(distance))
    };

    Ok((!buffered.is_empty()).then_some(buffered))
}

/// Tests `relation(feature, reference)`.
pub(crate) fn relate(relation: SpatialRelation, feature: &Shape, reference: &Shape) -> bool {
    use SpatialRelation::*;

    let boxes_meet = match (feature.bbox, reference.bbox) {
        (Some(a), Some(b)) => a.intersects(&b),
        _ => false,
    };

    // Every relation but disjointness requires the envelopes to meet
    if !boxes_meet {
        return relation == Disjoint;
    }

    match relation {
        BboxIntersects => true,
        Intersects => feature.geometry.intersects(&reference.geometry),
        Disjoint => !feature.geometry.intersects(&reference.geometry),
        Contains => feature.geometry.relate(&reference.geometry).is_contains(),
        Within => feature.geometry.relate(&reference.geometry).is_within(),
        Touches => feature.geometry.relate(&reference.geometry).is_touches(),
        Crosses => feature.geometry.relate(&reference.geometry).is_crosses(),
        Overlaps => feature.geometry.relate(&reference.geometry).is_overlaps(),
        Equals => feature.geometry.relate(&reference.geometry).is_equal_topo(),
    }
}
