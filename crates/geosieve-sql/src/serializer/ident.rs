use super::{Formatter, ToSql};

use geosieve_core::Result;

/// A double-quoted identifier.
pub(super) struct Ident<S>(pub(super) S);

/// A possibly schema-qualified table name, `schema.table`.
pub(super) struct TableName<S>(pub(super) S);

impl<S: AsRef<str>> ToSql for Ident<S> {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        f.dst.push('"');
        for c in self.0.as_ref().chars() {
            if c == '"' {
                f.dst.push('"');
            }
            f.dst.push(c);
        }
        f.dst.push('"');
        Ok(())
    }
}

impl<S: AsRef<str>> ToSql for TableName<S> {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        let mut s = "";
        for part in self.0.as_ref().split('.') {
            fmt!(f, s Ident(part));
            s = ".";
        }
        Ok(())
    }
}
