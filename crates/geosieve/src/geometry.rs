use crate::cache::Tier;

use geosieve_core::{
    stmt::{Expr, ExprSpatial, GeometryRef, VisitMut},
    Error, Fingerprint, Result,
};

use geo::Geometry;
use std::{str::FromStr, sync::Arc};
use wkt::ToWkt;

/// Parses a WKT reference and re-emits it in canonical form.
///
/// Spelling differences (whitespace, case, number formatting) disappear, so
/// equal geometries yield equal fingerprints downstream.
pub(crate) fn normalize_wkt(text: &str) -> Result<String> {
    let parsed = wkt::Wkt::<f64>::from_str(text)
        .map_err(|err| Error::invalid_geometry(format!("{err:?}: {text}")))?;
    let geometry: Geometry = parsed
        .try_into()
        .map_err(|err: wkt::conversion::Error| Error::invalid_geometry(format!("{err:?}: {text}")))?;

    if is_empty(&geometry) {
        return Err(Error::invalid_geometry(format!("empty geometry: {text}")));
    }

    Ok(geometry.wkt_string())
}

/// Rewrites every literal reference of `expr` to its normalized WKT, going
/// through the geometry cache tier.
pub(crate) fn normalize_references(expr: &mut Expr, tier: &Tier<Arc<str>>) -> Result<()> {
    let mut result = Ok(());

    let mut rewrite = |node: &mut ExprSpatial| {
        if result.is_err() {
            return;
        }
        if let GeometryRef::Wkt { wkt, srid } = &mut node.reference {
            let key = Fingerprint::of(&(wkt.as_str(), *srid));
            match tier.get_or_try_insert(key, Vec::new, || normalize_wkt(wkt).map(Arc::from)) {
                Ok(normalized) => *wkt = normalized.to_string(),
                Err(err) => result = Err(err),
            }
        }
    };
    rewrite.visit_expr_mut(expr);

    result
}

fn is_empty(geometry: &Geometry) -> bool {
    match geometry {
        Geometry::GeometryCollection(collection) => collection.0.is_empty(),
        Geometry::MultiPoint(points) => points.0.is_empty(),
        Geometry::MultiLineString(lines) => lines.0.is_empty(),
        Geometry::MultiPolygon(polygons) => polygons.0.is_empty(),
        Geometry::LineString(line) => line.0.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TierConfig;
    use geosieve_core::stmt::SpatialRelation;
    use std::time::Duration;

    #[test]
    fn spelling_differences_normalize_away() {
        let a = normalize_wkt("POINT(1 2)").unwrap();
        let b = normalize_wkt("POINT (1.0   2.0)").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_malformed_text() {
        let err = normalize_wkt("POLYGON((0 0, 1").unwrap_err();
        assert!(err.is_invalid_geometry());
    }

    #[test]
    fn rejects_empty_geometry() {
        let err = normalize_wkt("GEOMETRYCOLLECTION EMPTY").unwrap_err();
        assert!(err.is_invalid_geometry());
    }

    #[test]
    fn rewrites_literal_references_only() {
        let tier = Tier::new("geometry", TierConfig::new(8, Duration::from_secs(60)));

        let mut expr = Expr::and(
            ExprSpatial::new(SpatialRelation::Within, GeometryRef::wkt("POINT (1.0 2.0)", 4326)),
            ExprSpatial::new(SpatialRelation::Intersects, GeometryRef::dataset("roads")),
        );
        normalize_references(&mut expr, &tier).unwrap();

        let nodes = expr.spatial_nodes();
        assert_eq!(nodes[0].reference, GeometryRef::wkt("POINT(1 2)", 4326));
        assert_eq!(nodes[1].reference, GeometryRef::dataset("roads"));
        assert_eq!(tier.len(), 1);
    }
}
