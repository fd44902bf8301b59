use super::{Formatter, ToSql};

use geosieve_core::{driver::Dialect, stmt::Value, Error, Result};

impl ToSql for &Value {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        match self {
            Value::Null => fmt!(f, "NULL"),
            Value::Bool(value) => {
                let text = match (f.serializer.dialect(), value) {
                    (Dialect::Spatialite, true) => "1",
                    (Dialect::Spatialite, false) => "0",
                    (_, true) => "TRUE",
                    (_, false) => "FALSE",
                };
                fmt!(f, text);
            }
            Value::I64(value) => fmt!(f, &value.to_string()),
            Value::F64(value) => fmt!(f, Number(*value)),
            Value::String(value) => fmt!(f, Quoted(value)),
        }
        Ok(())
    }
}

/// A string literal in single quotes.
pub(super) struct Quoted<S>(pub(super) S);

impl<S: AsRef<str>> ToSql for Quoted<S> {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        f.dst.push('\'');
        for c in self.0.as_ref().chars() {
            if c == '\'' {
                f.dst.push('\'');
            }
            f.dst.push(c);
        }
        f.dst.push('\'');
        Ok(())
    }
}

/// A finite floating point literal.
pub(super) struct Number(pub(super) f64);

impl ToSql for Number {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        if !self.0.is_finite() {
            return Err(Error::expression_translation(format!(
                "non-finite number `{}` has no literal form",
                self.0
            )));
        }
        f.dst.push_str(&self.0.to_string());
        Ok(())
    }
}
