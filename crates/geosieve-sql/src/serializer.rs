#[macro_use]
mod fmt;
use fmt::ToSql;

mod delim;
use delim::{Comma, Delimited};

mod flavor;

mod ident;
use ident::{Ident, TableName};

// Fragment serializers
mod expr;
mod spatial;
mod statement;
mod ty;
mod value;

use crate::stmt::Statement;

use geosieve_core::{
    driver::{Capability, Dialect},
    schema::{Dataset, DatasetId, Schema},
    stmt::{Bindings, Expr},
    Error, Result,
};

/// Alias of the reference dataset inside an `EXISTS` subquery.
const REF_ALIAS: &str = "__ref";

/// Alias of a materialized artifact inside an `EXISTS` subquery.
const ART_ALIAS: &str = "__art";

/// Geometry column of every materialized artifact.
const ARTIFACT_GEOMETRY: &str = "geom";

/// Renders filter expressions and statements as native text for one
/// backend.
///
/// Everything dialect-specific comes from the backend's [`Capability`]:
/// function names, cast syntax, literal spelling, and artifact DDL.
#[derive(Debug)]
pub struct Serializer<'a> {
    /// Schema against which expressions are resolved
    schema: &'a Schema,

    capability: &'static Capability,
}

struct Formatter<'a> {
    /// Handle to the serializer
    serializer: &'a Serializer<'a>,

    /// Where to write the serialized text
    dst: &'a mut String,

    /// Artifacts that spatial predicates may render against
    bindings: &'a Bindings,

    /// The dataset being filtered
    target: &'a Dataset,

    /// Owner of unqualified columns. `Some` inside a reference dataset's
    /// subquery.
    reference: Option<&'a Dataset>,
}

impl<'a> Serializer<'a> {
    /// Renders `expr` as a predicate over `dataset`. The result is suitable
    /// as a host-applied subset string.
    pub fn translate(&self, dataset: &DatasetId, expr: &Expr, bindings: &Bindings) -> Result<String> {
        let target = self.schema.dataset(dataset)?;
        let mut ret = String::new();

        let mut f = Formatter {
            serializer: self,
            dst: &mut ret,
            bindings,
            target,
            reference: None,
        };

        expr.to_sql(&mut f)?;
        Ok(ret)
    }

    /// Renders a full statement, terminated with `;`.
    pub fn serialize(&self, stmt: &Statement, bindings: &Bindings) -> Result<String> {
        if !self.capability.sql {
            return Err(Error::expression_translation(format!(
                "{} does not execute SQL statements",
                self.capability.kind
            )));
        }

        let target = self.schema.dataset(stmt.dataset())?;
        let mut ret = String::new();

        let mut f = Formatter {
            serializer: self,
            dst: &mut ret,
            bindings,
            target,
            reference: None,
        };

        stmt.to_sql(&mut f)?;

        ret.push(';');
        Ok(ret)
    }

    pub fn serialize_all(&self, stmts: &[Statement], bindings: &Bindings) -> Result<Vec<String>> {
        stmts
            .iter()
            .map(|stmt| self.serialize(stmt, bindings))
            .collect()
    }

    fn dialect(&self) -> Dialect {
        self.capability.dialect
    }

    fn is_sql(&self) -> bool {
        self.capability.sql
    }
}

impl<'a> Formatter<'a> {
    /// Renders a fragment into a separate buffer, for text that must be
    /// repeated or wrapped after the fact.
    fn nested(&mut self, render: impl FnOnce(&mut Formatter<'_>) -> Result<()>) -> Result<String> {
        let mut out = String::new();
        let mut f = Formatter {
            serializer: self.serializer,
            dst: &mut out,
            bindings: self.bindings,
            target: self.target,
            reference: self.reference,
        };
        render(&mut f)?;
        Ok(out)
    }

    /// Like [`nested`](Self::nested), with unqualified columns resolving to
    /// `reference`.
    fn nested_in(
        &mut self,
        reference: &Dataset,
        render: impl FnOnce(&mut Formatter<'_>) -> Result<()>,
    ) -> Result<String> {
        let mut out = String::new();
        let mut f = Formatter {
            serializer: self.serializer,
            dst: &mut out,
            bindings: self.bindings,
            target: self.target,
            reference: Some(reference),
        };
        render(&mut f)?;
        Ok(out)
    }

    fn capability(&self) -> &'static Capability {
        self.serializer.capability
    }

    /// The dataset unqualified columns belong to.
    fn scope(&self) -> &'a Dataset {
        self.reference.unwrap_or(self.target)
    }
}
