use crate::{
    geom::{self, Shape},
    store::{Artifact, Table},
    Feature,
};

use geosieve_core::{
    driver::CanonicalFn,
    schema::{Dataset, DatasetId, Schema},
    stmt::{Expr, ExprSpatial, GeometryRef, Type, Value},
    Error, Fingerprint, Result,
};

use geo::{Geometry, GeometryCollection};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Evaluates filter expressions against the features of one dataset with SQL
/// three-valued logic: a row matches only when the filter is `TRUE`.
pub(crate) struct Evaluator<'a> {
    schema: &'a Schema,
    tables: &'a IndexMap<DatasetId, Table>,
    artifacts: &'a IndexMap<String, Artifact>,
    target: &'a Dataset,

    /// Reference geometries of the filter's spatial predicates, resolved once
    /// per query. `None` when the reference buffered away to nothing.
    references: HashMap<Fingerprint, Option<Shape>>,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(
        schema: &'a Schema,
        tables: &'a IndexMap<DatasetId, Table>,
        artifacts: &'a IndexMap<String, Artifact>,
        target: &'a Dataset,
    ) -> Evaluator<'a> {
        Evaluator {
            schema,
            tables,
            artifacts,
            target,
            references: HashMap::new(),
        }
    }

    /// Resolves every reference geometry `filter` uses.
    pub(crate) fn prepare(&mut self, filter: &Expr) -> Result<()> {
        for node in filter.spatial_nodes() {
            let key = node.bake_key();
            if !self.references.contains_key(&key) {
                let shape = self.reference(node)?;
                self.references.insert(key, shape);
            }
        }
        Ok(())
    }

    pub(crate) fn matches(&self, filter: &Expr, feature: &Feature) -> Result<bool> {
        Ok(matches!(self.eval(filter, feature)?, Value::Bool(true)))
    }

    /// Builds the buffered reference geometry of `node` in the target's CRS.
    pub(crate) fn reference(&self, node: &ExprSpatial) -> Result<Option<Shape>> {
        let target_srid = self.target.srid;

        let geometry = match &node.reference {
            GeometryRef::Wkt { wkt, srid } => {
                let geometry = geom::parse_wkt(wkt)?;
                geom::transform(geometry, *srid, target_srid)?
            }
            GeometryRef::Dataset { dataset, filter } => {
                let source = self.schema.dataset(dataset)?;
                let collected = self.collect(source, filter.as_deref())?;
                geom::transform(collected, source.srid, target_srid)?
            }
            GeometryRef::Artifact { name, .. } => {
                let artifact = self.artifacts.get(name).ok_or_else(|| {
                    Error::artifact_stale(name, "not present in the in-memory backend")
                })?;
                return match &artifact.shape {
                    Some(shape) if artifact.srid != target_srid => {
                        let geometry =
                            geom::transform(shape.geometry.clone(), artifact.srid, target_srid)?;
                        Ok(Some(Shape::new(geometry)))
                    }
                    shape => Ok(shape.clone()),
                };
            }
        };

        Ok(geom::buffer(geometry, target_srid, node.buffer)?.map(Shape::new))
    }

    /// Every geometry of `source` whose row passes `filter`, as one
    /// collection.
    fn collect(&self, source: &'a Dataset, filter: Option<&Expr>) -> Result<Geometry> {
        let nested = Evaluator::new(self.schema, self.tables, self.artifacts, source);
        let mut parts = vec![];

        if let Some(table) = self.tables.get(&source.id) {
            for feature in table.features.values() {
                let Some(shape) = &feature.shape else {
                    continue;
                };
                if let Some(filter) = filter {
                    if !nested.matches(filter, feature)? {
                        continue;
                    }
                }
                parts.push(shape.geometry.clone());
            }
        }

        Ok(Geometry::GeometryCollection(GeometryCollection::from(parts)))
    }

    fn eval(&self, expr: &Expr, feature: &Feature) -> Result<Value> {
        Ok(match expr {
            Expr::And(expr) => {
                let mut unknown = false;
                for operand in &expr.operands {
                    match self.eval(operand, feature)? {
                        Value::Bool(false) => return Ok(Value::Bool(false)),
                        Value::Bool(true) => {}
                        _ => unknown = true,
                    }
                }
                if unknown {
                    Value::Null
                } else {
                    Value::Bool(true)
                }
            }
            Expr::Or(expr) => {
                let mut unknown = false;
                for operand in &expr.operands {
                    match self.eval(operand, feature)? {
                        Value::Bool(true) => return Ok(Value::Bool(true)),
                        Value::Bool(false) => {}
                        _ => unknown = true,
                    }
                }
                if unknown {
                    Value::Null
                } else {
                    Value::Bool(false)
                }
            }
            Expr::Not(expr) => match self.eval(&expr.expr, feature)? {
                Value::Bool(value) => Value::Bool(!value),
                _ => Value::Null,
            },
            Expr::BinaryOp(expr) => {
                let lhs = self.eval(&expr.lhs, feature)?;
                let rhs = self.eval(&expr.rhs, feature)?;
                match lhs.compare(&rhs) {
                    Some(ordering) => Value::Bool(expr.op.apply(ordering)),
                    None => Value::Null,
                }
            }
            Expr::Cast(expr) => cast(self.eval(&expr.expr, feature)?, expr.ty),
            Expr::Column(column) => feature.get(&column.name),
            Expr::Func(expr) => {
                let args = expr
                    .args
                    .iter()
                    .map(|arg| self.eval(arg, feature))
                    .collect::<Result<Vec<_>>>()?;
                call(expr.func, args)?
            }
            Expr::InList(expr) => {
                let value = self.eval(&expr.expr, feature)?;
                if value.is_null() {
                    return Ok(Value::Null);
                }

                let mut unknown = false;
                let mut found = false;
                for item in &expr.list {
                    match value.compare(&self.eval(item, feature)?) {
                        Some(std::cmp::Ordering::Equal) => {
                            found = true;
                            break;
                        }
                        Some(_) => {}
                        None => unknown = true,
                    }
                }

                match (found, unknown) {
                    (true, _) => Value::Bool(!expr.negate),
                    (false, true) => Value::Null,
                    (false, false) => Value::Bool(expr.negate),
                }
            }
            Expr::IsNull(expr) => {
                let is_null = self.eval(&expr.expr, feature)?.is_null();
                Value::Bool(is_null != expr.negate)
            }
            Expr::Like(expr) => {
                let value = self.eval(&expr.expr, feature)?;
                let pattern = self.eval(&expr.pattern, feature)?;
                match (value.as_str(), pattern.as_str()) {
                    (Some(value), Some(pattern)) if expr.case_insensitive => {
                        Value::Bool(like(&value.to_lowercase(), &pattern.to_lowercase()))
                    }
                    (Some(value), Some(pattern)) => Value::Bool(like(value, pattern)),
                    _ => Value::Null,
                }
            }
            Expr::Spatial(node) => {
                let reference = self.references.get(&node.bake_key()).ok_or_else(|| {
                    Error::expression_translation(
                        "spatial predicates cannot appear inside a reference dataset filter",
                    )
                })?;
                match (&feature.shape, reference) {
                    (Some(shape), Some(reference)) => {
                        Value::Bool(geom::relate(node.relation, shape, reference))
                    }
                    _ => Value::Null,
                }
            }
            Expr::Raw(_) => {
                return Err(Error::expression_translation(
                    "raw SQL cannot run on the in-memory backend",
                ))
            }
            Expr::Value(value) => value.clone(),
        })
    }
}

fn cast(value: Value, ty: Type) -> Value {
    match (value, ty) {
        (Value::Null, _) => Value::Null,
        (Value::I64(v), Type::Integer) => Value::I64(v),
        (Value::F64(v), Type::Integer) => Value::I64(v.trunc() as i64),
        (Value::Bool(v), Type::Integer) => Value::I64(v.into()),
        (Value::String(v), Type::Integer) => v.trim().parse().map(Value::I64).unwrap_or_default(),
        (Value::String(v), Type::Real) => v.trim().parse().map(Value::F64).unwrap_or_default(),
        (Value::Bool(v), Type::Real) => Value::F64(if v { 1.0 } else { 0.0 }),
        (value, Type::Real) => value.as_f64().map(Value::F64).unwrap_or_default(),
        (Value::String(v), Type::Text) => Value::String(v),
        (Value::I64(v), Type::Text) => Value::String(v.to_string()),
        (Value::F64(v), Type::Text) => Value::String(v.to_string()),
        (Value::Bool(v), Type::Text) => Value::String(v.to_string()),
        (Value::Bool(v), Type::Boolean) => Value::Bool(v),
        (Value::String(v), Type::Boolean) => match v.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Value::Bool(true),
            "false" | "f" | "0" => Value::Bool(false),
            _ => Value::Null,
        },
        (value, Type::Boolean) => value
            .as_f64()
            .map(|v| Value::Bool(v != 0.0))
            .unwrap_or_default(),
    }
}

fn call(func: CanonicalFn, args: Vec<Value>) -> Result<Value> {
    let [arg] = <[Value; 1]>::try_from(args).map_err(|args| {
        Error::expression_translation(format!(
            "{func:?} takes one argument, got {}",
            args.len()
        ))
    })?;

    Ok(match (func, arg) {
        (_, Value::Null) => Value::Null,
        (CanonicalFn::Lower, Value::String(v)) => Value::String(v.to_lowercase()),
        (CanonicalFn::Upper, Value::String(v)) => Value::String(v.to_uppercase()),
        (CanonicalFn::Length, Value::String(v)) => Value::I64(v.chars().count() as i64),
        (CanonicalFn::Abs, Value::I64(v)) => Value::I64(v.abs()),
        (CanonicalFn::Abs, Value::F64(v)) => Value::F64(v.abs()),
        (CanonicalFn::Lower | CanonicalFn::Upper | CanonicalFn::Length | CanonicalFn::Abs, _) => {
            Value::Null
        }
        (func, _) => {
            return Err(Error::expression_translation(format!(
                "{func:?} is not available in in-memory attribute expressions"
            )))
        }
    })
}

/// SQL `LIKE`: `%` matches any run of characters, `_` exactly one.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '_' || c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star, mark)) => {
                    p = star + 1;
                    t = mark + 1;
                    backtrack = Some((star, mark + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '%')
}
