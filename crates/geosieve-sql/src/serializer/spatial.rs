use super::{
    expr::unmapped, value::Number, value::Quoted, Formatter, Ident, TableName, ToSql, ARTIFACT_GEOMETRY,
    ART_ALIAS, REF_ALIAS,
};

use geosieve_core::{
    driver::{CanonicalFn, Dialect, NativeFn, SpatialIndex},
    schema::{is_geographic, Dataset},
    stmt::{Expr, ExprSpatial, GeometryRef, SpatialRelation},
    Error, Result,
};

impl ToSql for &ExprSpatial {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        if f.reference.is_some() {
            return Err(Error::expression_translation(
                "spatial predicates cannot appear inside a reference dataset filter",
            ));
        }

        let target = f.target;
        let reference = match f.bindings.get(self) {
            Some(binding) => GeometryRef::Artifact {
                name: binding.name.clone(),
                srid: binding.srid,
            },
            None => self.reference.clone(),
        };

        match &reference {
            GeometryRef::Wkt { wkt, srid } => {
                let geom = geom_from_text(f, wkt, *srid)?;
                let geom = reference_geometry(f, geom, *srid, target.srid, self.buffer)?;

                if self.relation == SpatialRelation::BboxIntersects && uses_rtree(f) {
                    spatialite_index_lookup(f, &target.table, &target.geometry_column, &geom)
                } else {
                    relate(f, self.relation, &geom)
                }
            }
            GeometryRef::Dataset { dataset, filter } => {
                let serializer = f.serializer;
                let source = serializer.schema.dataset(dataset)?;

                if f.serializer.is_sql() {
                    exists_in_dataset(f, self, source, filter.as_deref())
                } else {
                    let collected = aggregate(f, &source.table, Some(source), filter.as_deref())?;
                    let geom = reference_geometry(f, collected, source.srid, target.srid, self.buffer)?;
                    relate(f, self.relation, &geom)
                }
            }
            GeometryRef::Artifact { name, .. } => {
                if f.serializer.is_sql() {
                    exists_in_artifact(f, self.relation, name)
                } else {
                    let collected = aggregate(f, name, None, None)?;
                    relate(f, self.relation, &collected)
                }
            }
        }
    }
}

/// `EXISTS (SELECT 1 FROM ref WHERE filter AND relation(feature, ref))`.
///
/// Disjointness from a set of features means intersecting none of them, so
/// it renders as `NOT EXISTS` over `Intersects`.
fn exists_in_dataset(
    f: &mut Formatter<'_>,
    node: &ExprSpatial,
    source: &Dataset,
    filter: Option<&Expr>,
) -> Result<()> {
    let target = f.target;
    let (negate, relation) = split_disjoint(node.relation);

    let column = f.nested(|f| {
        fmt!(f, Ident(REF_ALIAS) "." Ident(&source.geometry_column));
        Ok(())
    })?;
    let geom = reference_geometry(f, column, source.srid, target.srid, node.buffer)?;
    let predicate = f.nested(|f| relate(f, relation, &geom))?;

    let filter = match filter {
        Some(filter) => Some(f.nested_in(source, |f| filter.to_sql(f))?),
        None => None,
    };

    if negate {
        fmt!(f, "NOT ");
    }
    fmt!(f, "EXISTS (SELECT 1 FROM " TableName(&source.table) " AS " Ident(REF_ALIAS) " WHERE ");
    if let Some(filter) = &filter {
        fmt!(f, filter " AND ");
    }
    fmt!(f, &predicate ")");
    Ok(())
}

fn exists_in_artifact(f: &mut Formatter<'_>, relation: SpatialRelation, name: &str) -> Result<()> {
    let (negate, relation) = split_disjoint(relation);

    let column = f.nested(|f| {
        fmt!(f, Ident(ART_ALIAS) "." Ident(ARTIFACT_GEOMETRY));
        Ok(())
    })?;
    let predicate = &f.nested(|f| relate(f, relation, &column))?;

    if negate {
        fmt!(f, "NOT ");
    }
    fmt!(f, "EXISTS (SELECT 1 FROM " Ident(name) " AS " Ident(ART_ALIAS) " WHERE " predicate);

    if uses_rtree(f) {
        // Spatialite only consults the R-tree through its SpatialIndex table
        let feature = &feature_geometry(f)?;
        fmt!(
            f,
            " AND " Ident(ART_ALIAS) ".ROWID IN (SELECT ROWID FROM SpatialIndex WHERE f_table_name = "
            Quoted(name) " AND f_geometry_column = " Quoted(ARTIFACT_GEOMETRY)
            " AND search_frame = " feature ")"
        );
    }

    fmt!(f, ")");
    Ok(())
}

/// `<table>.ROWID IN (SELECT ROWID FROM SpatialIndex WHERE ...)`, the
/// bounding-box test Spatialite answers from its R-tree.
fn spatialite_index_lookup(f: &mut Formatter<'_>, table: &str, column: &str, frame: &str) -> Result<()> {
    fmt!(
        f,
        TableName(table) ".ROWID IN (SELECT ROWID FROM SpatialIndex WHERE f_table_name = "
        Quoted(table) " AND f_geometry_column = " Quoted(column)
        " AND search_frame = " frame ")"
    );
    Ok(())
}

fn split_disjoint(relation: SpatialRelation) -> (bool, SpatialRelation) {
    match relation {
        SpatialRelation::Disjoint => (true, SpatialRelation::Intersects),
        relation => (false, relation),
    }
}

fn uses_rtree(f: &Formatter<'_>) -> bool {
    f.serializer.dialect() == Dialect::Spatialite && f.capability().spatial_index == SpatialIndex::RTree
}

/// Writes `relation(feature, reference)`.
fn relate(f: &mut Formatter<'_>, relation: SpatialRelation, reference: &str) -> Result<()> {
    let feature = &feature_geometry(f)?;

    match f.capability().native_fn(relation.canonical()) {
        Some(NativeFn::Function(name)) => fmt!(f, name "(" feature ", " reference ")"),
        Some(NativeFn::Operator(op)) => fmt!(f, feature " " op " " reference),
        None => return Err(unmapped(f, relation.canonical())),
    }
    Ok(())
}

/// The filtered feature's own geometry.
fn feature_geometry(f: &mut Formatter<'_>) -> Result<String> {
    let target = f.target;
    match f.capability().feature_geometry {
        Some(token) => Ok(token.to_string()),
        None => f.nested(|f| {
            fmt!(f, TableName(&target.table) "." Ident(&target.geometry_column));
            Ok(())
        }),
    }
}

/// Brings a reference geometry into the target CRS and applies the buffer.
///
/// Geographic targets are buffered in the backend's metric CRS and projected
/// back. A negative buffer that erodes a geometry away yields `NULL`, so the
/// predicate excludes the row instead of matching against an empty shape.
pub(super) fn reference_geometry(
    f: &mut Formatter<'_>,
    geom: String,
    source_srid: u32,
    target_srid: u32,
    buffer: f64,
) -> Result<String> {
    let geom = if source_srid == target_srid {
        geom
    } else {
        transform(f, geom, source_srid, target_srid)?
    };

    if buffer == 0.0 {
        return Ok(geom);
    }

    let distance = f.nested(|f| Number(buffer).to_sql(f))?;

    let buffered = if is_geographic(target_srid) {
        let metric = f.capability().metric_srid;
        let projected = transform(f, geom, target_srid, metric)?;
        let buffered = call(f, CanonicalFn::Buffer, &[&projected, &distance])?;
        transform(f, buffered, metric, target_srid)?
    } else {
        call(f, CanonicalFn::Buffer, &[&geom, &distance])?
    };

    if buffer > 0.0 {
        return Ok(buffered);
    }

    let is_empty = call(f, CanonicalFn::IsEmpty, &[&buffered])?;
    Ok(format!(
        "CASE WHEN {is_empty} THEN NULL ELSE {buffered} END"
    ))
}

pub(super) fn geom_from_text(f: &mut Formatter<'_>, wkt: &str, srid: u32) -> Result<String> {
    let text = f.nested(|f| Quoted(wkt).to_sql(f))?;

    if f.serializer.is_sql() {
        call(f, CanonicalFn::GeomFromText, &[&text, &srid.to_string()])
    } else {
        call(f, CanonicalFn::GeomFromText, &[&text])
    }
}

fn transform(f: &mut Formatter<'_>, geom: String, from: u32, to: u32) -> Result<String> {
    if f.serializer.is_sql() {
        call(f, CanonicalFn::Transform, &[&geom, &to.to_string()])
    } else {
        let from = format!("'EPSG:{from}'");
        let to = format!("'EPSG:{to}'");
        call(f, CanonicalFn::Transform, &[&geom, &from, &to])
    }
}

/// `aggregate('layer', 'collect', <feature geometry>[, filter])`: every
/// feature of another layer collected into one geometry.
fn aggregate(
    f: &mut Formatter<'_>,
    layer: &str,
    source: Option<&Dataset>,
    filter: Option<&Expr>,
) -> Result<String> {
    let layer = f.nested(|f| Quoted(layer).to_sql(f))?;
    let feature = feature_geometry(f)?;

    match (source, filter) {
        (Some(source), Some(filter)) => {
            let filter = f.nested_in(source, |f| filter.to_sql(f))?;
            call(f, CanonicalFn::Aggregate, &[&layer, "'collect'", &feature, &filter])
        }
        _ => call(f, CanonicalFn::Aggregate, &[&layer, "'collect'", &feature]),
    }
}

fn call(f: &mut Formatter<'_>, func: CanonicalFn, args: &[&str]) -> Result<String> {
    match f.capability().native_fn(func) {
        Some(NativeFn::Function(name)) => Ok(format!("{name}({})", args.join(", "))),
        Some(NativeFn::Operator(op)) => Err(Error::expression_translation(format!(
            "{func:?} maps to operator `{op}`, expected a function"
        ))),
        None => Err(unmapped(f, func)),
    }
}
