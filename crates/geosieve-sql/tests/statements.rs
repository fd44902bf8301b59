use geosieve_core::{
    driver::{BackendKind, Capability},
    schema::{Dataset, Schema},
    stmt::{Bindings, Expr, ExprSpatial, GeometryRef, RecordId, SpatialRelation},
};
use geosieve_sql::{Serializer, Statement};

use pretty_assertions::assert_eq;

fn schema() -> Schema {
    Schema::new([
        Dataset::new("parcels", BackendKind::Postgresql, 2154),
        Dataset::new("roads", BackendKind::Postgresql, 2154),
        Dataset::new("cadastre", BackendKind::Postgresql, 2154).table("public.cadastre"),
    ])
}

fn pop_filter() -> Expr {
    Expr::gt(Expr::column("pop"), 1000_i64)
}

#[test]
fn select_ids() {
    let schema = schema();
    let sql = Serializer::postgresql(&schema)
        .serialize(&Statement::select_ids("parcels", pop_filter()), &Bindings::new())
        .unwrap();

    assert_eq!(
        sql,
        "SELECT CAST(\"parcels\".\"id\" AS bigint) FROM \"parcels\" \
         WHERE \"parcels\".\"pop\" > 1000 ORDER BY \"parcels\".\"id\";"
    );
}

#[test]
fn select_candidates() {
    let schema = schema();
    let stmt = Statement::select_candidates(
        "parcels",
        pop_filter(),
        vec![RecordId(1), RecordId(2), RecordId(3)],
    );
    let sql = Serializer::postgresql(&schema)
        .serialize(&stmt, &Bindings::new())
        .unwrap();

    assert_eq!(
        sql,
        "SELECT CAST(\"parcels\".\"id\" AS bigint) FROM \"parcels\" \
         WHERE \"parcels\".\"pop\" > 1000 AND \"parcels\".\"id\" IN (1, 2, 3) \
         ORDER BY \"parcels\".\"id\";"
    );
}

#[test]
fn scan_chunk() {
    let schema = schema();
    let stmt = Statement::scan_chunk("parcels", pop_filter(), Some(RecordId(10)), 500);
    let sql = Serializer::spatialite(&schema)
        .serialize(&stmt, &Bindings::new())
        .unwrap();

    assert_eq!(
        sql,
        "SELECT CAST(\"parcels\".\"id\" AS INTEGER), \
         CASE WHEN \"parcels\".\"pop\" > 1000 THEN 1 ELSE 0 END FROM \"parcels\" \
         WHERE \"parcels\".\"id\" > 10 ORDER BY \"parcels\".\"id\" LIMIT 500;"
    );
}

#[test]
fn count_rows_with_schema_qualified_table() {
    let schema = schema();
    let sql = Serializer::postgresql(&schema)
        .serialize(&Statement::count_rows("cadastre"), &Bindings::new())
        .unwrap();

    assert_eq!(sql, "SELECT COUNT(*) FROM \"public\".\"cadastre\";");
}

#[test]
fn materialize_postgis() {
    let schema = schema();
    let spatial = ExprSpatial {
        relation: SpatialRelation::Intersects,
        reference: GeometryRef::dataset("roads"),
        buffer: 100.0,
    };
    let stmts = Statement::materialize(&Capability::POSTGRESQL, "parcels", "gs_a", spatial);
    let sql = Serializer::postgresql(&schema)
        .serialize_all(&stmts, &Bindings::new())
        .unwrap();

    assert_eq!(
        sql,
        [
            "DROP MATERIALIZED VIEW IF EXISTS \"gs_a\";",
            "CREATE MATERIALIZED VIEW \"gs_a\" AS SELECT ST_Buffer(\"__ref\".\"geom\", 100) \
             AS \"geom\" FROM \"roads\" AS \"__ref\";",
            "CREATE INDEX \"gs_a_gix\" ON \"gs_a\" USING GIST (\"geom\");",
            "ANALYZE \"gs_a\";",
        ]
    );
}

#[test]
fn materialize_spatialite_from_wkt() {
    let schema = schema();
    let spatial = ExprSpatial {
        relation: SpatialRelation::Within,
        reference: GeometryRef::wkt("POINT(1 2)", 2154),
        buffer: 5.0,
    };
    let stmts = Statement::materialize(&Capability::SPATIALITE, "parcels", "gs_b", spatial);
    let sql = Serializer::spatialite(&schema)
        .serialize_all(&stmts, &Bindings::new())
        .unwrap();

    assert_eq!(
        sql,
        [
            "SELECT DisableSpatialIndex('gs_b', 'geom');",
            "SELECT DiscardGeometryColumn('gs_b', 'geom');",
            "DROP TABLE IF EXISTS \"idx_gs_b_geom\";",
            "DROP TABLE IF EXISTS \"gs_b\";",
            "CREATE TABLE \"gs_b\" AS SELECT ST_Buffer(GeomFromText('POINT(1 2)', 2154), 5) AS \"geom\";",
            "SELECT RecoverGeometryColumn('gs_b', 'geom', 2154, 'GEOMETRY', 'XY');",
            "SELECT CreateSpatialIndex('gs_b', 'geom');",
        ]
    );
}

#[test]
fn memory_artifacts_need_no_ddl() {
    assert!(Statement::release(&Capability::IN_MEMORY, "parcels", "gs_c").is_empty());
}

#[test]
fn expression_dialect_has_no_statements() {
    let schema = schema();
    let err = Serializer::generic_vector(&schema)
        .serialize(&Statement::count_rows("parcels"), &Bindings::new())
        .unwrap_err();
    assert!(err.is_expression_translation());
}
