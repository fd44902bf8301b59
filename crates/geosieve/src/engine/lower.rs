//! Lowers engine steps into backend operations.
//!
//! SQL backends receive text rendered by the serializer. Every other
//! backend receives the structured filter with artifact bindings applied.

use geosieve_core::{
    driver::{
        operation::{ExecSql, Materialize, QueryFilter, QuerySql, Release, Ret, Scan, Stats},
        Capability, Operation,
    },
    schema::DatasetId,
    stmt::{Bindings, Expr, ExprSpatial, RecordId},
    Result, Schema,
};
use geosieve_sql::{Serializer, Statement};

/// Ids of every row of `dataset` matching `filter`.
pub(crate) fn select_ids(
    schema: &Schema,
    capability: &'static Capability,
    dataset: &DatasetId,
    filter: &Expr,
    bindings: &Bindings,
) -> Result<Operation> {
    if capability.sql {
        let stmt = Statement::select_ids(dataset.clone(), filter.clone());
        return query(schema, capability, &stmt, bindings, Ret::Ids);
    }

    Ok(QueryFilter {
        dataset: dataset.clone(),
        filter: bindings.apply(filter),
        scan: Scan::All,
    }
    .into())
}

/// Ids among `candidates` matching `filter`.
pub(crate) fn select_candidates(
    schema: &Schema,
    capability: &'static Capability,
    dataset: &DatasetId,
    filter: &Expr,
    bindings: &Bindings,
    candidates: Vec<RecordId>,
) -> Result<Operation> {
    if capability.sql {
        let stmt = Statement::select_candidates(dataset.clone(), filter.clone(), candidates);
        return query(schema, capability, &stmt, bindings, Ret::Ids);
    }

    Ok(QueryFilter {
        dataset: dataset.clone(),
        filter: bindings.apply(filter),
        scan: Scan::Candidates(candidates),
    }
    .into())
}

/// One keyset page: up to `limit` rows after `after`, each flagged.
pub(crate) fn scan_chunk(
    schema: &Schema,
    capability: &'static Capability,
    dataset: &DatasetId,
    filter: &Expr,
    bindings: &Bindings,
    after: Option<RecordId>,
    limit: usize,
) -> Result<Operation> {
    if capability.sql {
        let stmt = Statement::scan_chunk(dataset.clone(), filter.clone(), after, limit);
        return query(schema, capability, &stmt, bindings, Ret::Flags);
    }

    Ok(QueryFilter {
        dataset: dataset.clone(),
        filter: bindings.apply(filter),
        scan: Scan::Chunk { after, limit },
    }
    .into())
}

pub(crate) fn stats(
    schema: &Schema,
    capability: &'static Capability,
    dataset: &DatasetId,
) -> Result<Operation> {
    if capability.sql {
        let stmt = Statement::count_rows(dataset.clone());
        return query(schema, capability, &stmt, &Bindings::new(), Ret::Count);
    }

    Ok(Stats {
        dataset: dataset.clone(),
    }
    .into())
}

/// Builds the artifact `name` holding the buffered reference of `spatial`.
pub(crate) fn materialize(
    schema: &Schema,
    capability: &'static Capability,
    target: &DatasetId,
    name: &str,
    spatial: &ExprSpatial,
) -> Result<Operation> {
    if capability.sql {
        let stmts = Statement::materialize(capability, target.clone(), name, spatial.clone());
        let statements = Serializer::new(schema, capability).serialize_all(&stmts, &Bindings::new())?;
        return Ok(ExecSql { statements }.into());
    }

    Ok(Materialize {
        name: name.to_string(),
        target: target.clone(),
        spatial: spatial.clone(),
    }
    .into())
}

/// Drops the artifact `name`. `None` when the backend keeps nothing to
/// drop.
pub(crate) fn release(
    schema: &Schema,
    capability: &'static Capability,
    target: &DatasetId,
    name: &str,
) -> Result<Option<Operation>> {
    if capability.sql {
        let stmts = Statement::release(capability, target.clone(), name);
        if stmts.is_empty() {
            return Ok(None);
        }
        let statements = Serializer::new(schema, capability).serialize_all(&stmts, &Bindings::new())?;
        return Ok(Some(ExecSql { statements }.into()));
    }

    if !capability.materialized_artifacts {
        return Ok(None);
    }

    Ok(Some(
        Release {
            name: name.to_string(),
        }
        .into(),
    ))
}

fn query(
    schema: &Schema,
    capability: &'static Capability,
    stmt: &Statement,
    bindings: &Bindings,
    ret: Ret,
) -> Result<Operation> {
    let sql = Serializer::new(schema, capability).serialize(stmt, bindings)?;
    Ok(QuerySql { sql, ret }.into())
}
