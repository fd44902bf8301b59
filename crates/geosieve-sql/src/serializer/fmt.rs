use super::Formatter;

use geosieve_core::Result;

macro_rules! fmt {
    ($f:expr, $( $fragments:expr )*) => {{
        $(
            $fragments.to_sql($f)?;
        )*
    }};
}

pub(super) trait ToSql {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()>;
}

impl ToSql for &str {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        f.dst.push_str(self);
        Ok(())
    }
}

impl ToSql for &String {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        f.dst.push_str(self);
        Ok(())
    }
}

impl ToSql for usize {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        use std::fmt::Write;
        write!(f.dst, "{self}").map_err(|err| geosieve_core::err!("{err}"))
    }
}

impl ToSql for u32 {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        (self as usize).to_sql(f)
    }
}
