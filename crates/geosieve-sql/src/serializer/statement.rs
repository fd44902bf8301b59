use super::{
    spatial::{geom_from_text, reference_geometry},
    value::Quoted,
    Comma, Formatter, Ident, TableName, ToSql, ARTIFACT_GEOMETRY, REF_ALIAS,
};

use crate::stmt::{ArtifactAction, ArtifactDdl, CountRows, ScanChunk, SelectIds, Statement};

use geosieve_core::{
    driver::Dialect,
    stmt::{ExprSpatial, GeometryRef},
    Error, Result,
};

impl ToSql for &Statement {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        match self {
            Statement::SelectIds(stmt) => stmt.to_sql(f),
            Statement::ScanChunk(stmt) => stmt.to_sql(f),
            Statement::CountRows(stmt) => stmt.to_sql(f),
            Statement::Artifact(stmt) => stmt.to_sql(f),
        }
    }
}

/// `CAST(<table>.<pk> AS <integer>)`, so every driver reads ids as 64-bit
/// integers whatever the column's declared width.
struct PrimaryKey;

impl ToSql for PrimaryKey {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        let target = f.target;
        let integer = f.capability().types.integer;
        fmt!(f, "CAST(" TableName(&target.table) "." Ident(&target.primary_key) " AS " integer ")");
        Ok(())
    }
}

struct OrderByKey;

impl ToSql for OrderByKey {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        let target = f.target;
        fmt!(f, " ORDER BY " TableName(&target.table) "." Ident(&target.primary_key));
        Ok(())
    }
}

impl ToSql for &SelectIds {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        let target = f.target;
        let filter = &self.filter;

        fmt!(f, "SELECT " PrimaryKey " FROM " TableName(&target.table) " WHERE " filter);

        if let Some(candidates) = &self.candidates {
            let ids = Comma(candidates.iter().map(|id| id.0.to_string()));
            fmt!(f, " AND " TableName(&target.table) "." Ident(&target.primary_key) " IN (" ids ")");
        }

        fmt!(f, OrderByKey);
        Ok(())
    }
}

impl ToSql for String {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        f.dst.push_str(&self);
        Ok(())
    }
}

impl ToSql for &ScanChunk {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        let target = f.target;
        let filter = &self.filter;

        fmt!(
            f,
            "SELECT " PrimaryKey ", CASE WHEN " filter " THEN 1 ELSE 0 END FROM "
            TableName(&target.table)
        );

        if let Some(after) = self.after {
            fmt!(
                f,
                " WHERE " TableName(&target.table) "." Ident(&target.primary_key) " > "
                after.0.to_string()
            );
        }

        fmt!(f, OrderByKey " LIMIT " self.limit);
        Ok(())
    }
}

impl ToSql for &CountRows {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        let target = f.target;
        fmt!(f, "SELECT COUNT(*) FROM " TableName(&target.table));
        Ok(())
    }
}

impl ToSql for &ArtifactDdl {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        use ArtifactAction::*;

        let dialect = f.serializer.dialect();
        let name = &self.name;

        match (&self.action, dialect) {
            (Create(spatial), Dialect::Postgis) => {
                fmt!(f, "CREATE MATERIALIZED VIEW " Ident(name) " AS ");
                artifact_source(f, spatial)?;
            }
            (Create(spatial), Dialect::Spatialite) => {
                fmt!(f, "CREATE TABLE " Ident(name) " AS ");
                artifact_source(f, spatial)?;
            }
            (RegisterGeometry, Dialect::Spatialite) => {
                let srid = f.target.srid;
                fmt!(
                    f,
                    "SELECT RecoverGeometryColumn(" Quoted(name) ", " Quoted(ARTIFACT_GEOMETRY) ", "
                    srid ", 'GEOMETRY', 'XY')"
                );
            }
            (CreateIndex, Dialect::Postgis) => {
                let index = format!("{name}_gix");
                fmt!(
                    f,
                    "CREATE INDEX " Ident(&index) " ON " Ident(name) " USING GIST ("
                    Ident(ARTIFACT_GEOMETRY) ")"
                );
            }
            (CreateIndex, Dialect::Spatialite) => {
                fmt!(f, "SELECT CreateSpatialIndex(" Quoted(name) ", " Quoted(ARTIFACT_GEOMETRY) ")");
            }
            (Analyze, Dialect::Postgis) => {
                fmt!(f, "ANALYZE " Ident(name));
            }
            (DisableIndex, Dialect::Spatialite) => {
                fmt!(f, "SELECT DisableSpatialIndex(" Quoted(name) ", " Quoted(ARTIFACT_GEOMETRY) ")");
            }
            (DiscardGeometry, Dialect::Spatialite) => {
                fmt!(f, "SELECT DiscardGeometryColumn(" Quoted(name) ", " Quoted(ARTIFACT_GEOMETRY) ")");
            }
            (DropIndexTable, Dialect::Spatialite) => {
                let index = format!("idx_{name}_{ARTIFACT_GEOMETRY}");
                fmt!(f, "DROP TABLE IF EXISTS " Ident(&index));
            }
            (Drop, Dialect::Postgis) => {
                fmt!(f, "DROP MATERIALIZED VIEW IF EXISTS " Ident(name));
            }
            (Drop, Dialect::Spatialite) => {
                fmt!(f, "DROP TABLE IF EXISTS " Ident(name));
            }
            (action, dialect) => {
                return Err(Error::expression_translation(format!(
                    "artifact step {action:?} is not supported by the {dialect:?} dialect"
                )));
            }
        }

        Ok(())
    }
}

/// `SELECT <buffered reference> AS "geom" [FROM <reference dataset>]`
fn artifact_source(f: &mut Formatter<'_>, spatial: &ExprSpatial) -> Result<()> {
    let target = f.target;
    let serializer = f.serializer;

    match &spatial.reference {
        GeometryRef::Wkt { wkt, srid } => {
            let geom = geom_from_text(f, wkt, *srid)?;
            let geom = reference_geometry(f, geom, *srid, target.srid, spatial.buffer)?;
            fmt!(f, "SELECT " geom " AS " Ident(ARTIFACT_GEOMETRY));
        }
        GeometryRef::Dataset { dataset, filter } => {
            let source = serializer.schema.dataset(dataset)?;
            let column = f.nested(|f| {
                fmt!(f, Ident(REF_ALIAS) "." Ident(&source.geometry_column));
                Ok(())
            })?;
            let geom = reference_geometry(f, column, source.srid, target.srid, spatial.buffer)?;

            fmt!(
                f,
                "SELECT " geom " AS " Ident(ARTIFACT_GEOMETRY) " FROM " TableName(&source.table)
                " AS " Ident(REF_ALIAS)
            );

            if let Some(filter) = filter {
                let filter = f.nested_in(source, |f| (&**filter).to_sql(f))?;
                fmt!(f, " WHERE " filter);
            }
        }
        GeometryRef::Artifact { name, .. } => {
            return Err(Error::expression_translation(format!(
                "cannot materialize from artifact `{name}`"
            )));
        }
    }

    Ok(())
}
