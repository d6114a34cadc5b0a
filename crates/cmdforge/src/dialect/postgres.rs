//! PostgreSQL dialect.

use super::mysql::concat_like;
use super::{Dialect, page_arg};
use crate::command::BoundStatement;
use crate::condition::LikeStyle;
use crate::error::CmdResult;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn like(&self, style: LikeStyle, term: &str) -> String {
        concat_like(style, term)
    }

    fn supports_group_alias(&self) -> bool {
        true
    }

    fn supports_insert_ignore(&self, _primary_key: &[String], _columns: &[String]) -> bool {
        true
    }

    /// `ON CONFLICT … DO UPDATE` needs a conflict target.
    fn supports_upsert(&self, primary_key: &[String], _columns: &[String]) -> bool {
        !primary_key.is_empty()
    }

    fn insert_ignore(
        &self,
        quote: bool,
        table: &str,
        _primary_key: &[String],
        columns: &[String],
        terms: &[String],
    ) -> String {
        let mut sql = self.insert_into(quote, table, columns, terms);
        sql.push_str(" ON CONFLICT DO NOTHING");
        sql
    }

    fn insert_replace(
        &self,
        quote: bool,
        table: &str,
        primary_key: &[String],
        columns: &[String],
        terms: &[String],
    ) -> String {
        let mut sql = self.insert_into(quote, table, columns, terms);
        let rest: Vec<String> = columns
            .iter()
            .filter(|c| !primary_key.contains(c))
            .map(|c| self.fmt_name(quote, c))
            .collect();
        sql.push_str(&format!(
            " ON CONFLICT ({})",
            self.column_list(quote, primary_key)
        ));
        if rest.is_empty() {
            sql.push_str(" DO NOTHING");
        } else if let [only] = rest.as_slice() {
            sql.push_str(&format!(" DO UPDATE SET {only} = EXCLUDED.{only}"));
        } else {
            let excluded: Vec<String> = rest.iter().map(|c| format!("EXCLUDED.{c}")).collect();
            sql.push_str(&format!(
                " DO UPDATE SET ({}) = ({})",
                rest.join(", "),
                excluded.join(", ")
            ));
        }
        sql
    }

    fn page(&self, stmt: BoundStatement, start: u64, limit: u64) -> CmdResult<BoundStatement> {
        let BoundStatement { mut sql, mut args } = stmt;
        if limit > 0 {
            sql.push_str(" LIMIT ?");
            args.push(page_arg(limit)?);
        }
        if start > 0 {
            sql.push_str(" OFFSET ?");
            args.push(page_arg(start)?);
        }
        Ok(BoundStatement { sql, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn upsert_requires_primary_key() {
        assert!(!PostgresDialect.supports_upsert(&[], &cols(&["a"])));
        assert!(PostgresDialect.supports_upsert(&cols(&["id"]), &cols(&["id", "a"])));
        assert!(PostgresDialect.supports_insert_ignore(&[], &cols(&["a"])));
    }

    #[test]
    fn upsert_sets_excluded_columns() {
        let terms = vec!["?".to_string(); 3];
        let sql = PostgresDialect.insert_replace(
            false,
            "t",
            &cols(&["id"]),
            &cols(&["id", "b", "c"]),
            &terms,
        );
        assert_eq!(
            sql,
            "INSERT INTO t (id, b, c) VALUES (?, ?, ?) ON CONFLICT (id) DO UPDATE SET (b, c) = (EXCLUDED.b, EXCLUDED.c)"
        );
    }

    #[test]
    fn limit_then_offset() {
        let stmt = BoundStatement::new("SELECT * FROM t", Vec::new());
        let paged = PostgresDialect.page(stmt, 40, 20).unwrap();
        assert_eq!(paged.sql, "SELECT * FROM t LIMIT ? OFFSET ?");
        assert_eq!(paged.args, vec![Value::Int(20), Value::Int(40)]);
    }
}
