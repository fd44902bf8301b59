use super::{Formatter, ToSql};

use geosieve_core::{
    driver::CastSyntax,
    stmt::{ExprCast, Type},
    Error, Result,
};

impl ToSql for &ExprCast {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        let types = &f.capability().types;
        let name = match self.ty {
            Type::Integer => types.integer,
            Type::Real => types.real,
            Type::Text => types.text,
            Type::Boolean => types.boolean.ok_or_else(|| {
                Error::expression_translation(format!(
                    "{} cannot cast to boolean",
                    f.capability().kind
                ))
            })?,
        };

        let expr = &*self.expr;
        match types.cast {
            CastSyntax::Sql => fmt!(f, "CAST(" expr " AS " name ")"),
            CastSyntax::Function => fmt!(f, name "(" expr ")"),
        }
        Ok(())
    }
}
