//! A small city: ten parcels on a line and two roads at its ends.
//!
//! Parcel `i` is a point at `(40 * i, 0)` with `pop = 300 * i`. The primary
//! road runs along `x = 0`, the service road along `x = 400`. All geometries
//! are in EPSG:3857.

use geosieve::{
    stmt::Expr, BackendKind, Dataset, FilterRequest, GeometryRef, SpatialPredicate,
    SpatialRelation,
};
use geosieve_driver_memory::{geo, Feature, Memory};

pub const SRID: u32 = 3857;

pub fn datasets(backend: BackendKind) -> [Dataset; 2] {
    [
        Dataset::new("parcels", backend, SRID),
        Dataset::new("roads", backend, SRID),
    ]
}

pub fn load(memory: &Memory) {
    memory.insert(
        "parcels",
        (1..=10).map(|i| {
            Feature::new(i)
                .geometry(geo::Point::new(40.0 * i as f64, 0.0))
                .attr("pop", 300 * i)
        }),
    );
    memory.insert("roads", roads());
}

fn roads() -> [Feature; 2] {
    [
        Feature::new(1)
            .wkt("LINESTRING(0 -50, 0 50)")
            .unwrap()
            .attr("kind", "primary"),
        Feature::new(2)
            .wkt("LINESTRING(400 -50, 400 50)")
            .unwrap()
            .attr("kind", "service"),
    ]
}

/// Parcels intersecting the roads buffered by `buffer`.
pub fn near_roads(buffer: f64) -> FilterRequest {
    FilterRequest::new("parcels").spatial(
        SpatialPredicate::new(SpatialRelation::Intersects, GeometryRef::dataset("roads"))
            .buffer(buffer),
    )
}

/// Parcels intersecting the primary road buffered by `buffer`.
pub fn near_primary_road(buffer: f64) -> FilterRequest {
    FilterRequest::new("parcels").spatial(
        SpatialPredicate::new(
            SpatialRelation::Intersects,
            GeometryRef::dataset_where("roads", Expr::eq(Expr::column("kind"), "primary")),
        )
        .buffer(buffer),
    )
}

pub fn pop_over(pop: i64) -> Expr {
    Expr::gt(Expr::column("pop"), pop)
}
