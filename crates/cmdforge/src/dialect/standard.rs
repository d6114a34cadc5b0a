//! ANSI SQL dialect.

use super::Dialect;

/// Plain ANSI SQL: `"` quoting, native `NULLS FIRST/LAST`, `||` concatenation
/// for LIKE and `OFFSET … FETCH NEXT` pagination.
///
/// It has no insert-conflict syntax, so `Ignore` and `Update` strategies
/// render as plain inserts.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDialect;

impl Dialect for StandardDialect {
    fn name(&self) -> &'static str {
        "standard"
    }
}
