//! MySQL / MariaDB dialect.

use super::{Dialect, SQL_KEYWORDS, page_arg};
use crate::command::BoundStatement;
use crate::condition::LikeStyle;
use crate::error::CmdResult;

const MYSQL_KEYWORDS: &[&str] = &[
    "CHANGE", "DATABASE", "DIV", "DUAL", "FULLTEXT", "IGNORE", "INTERVAL", "KEYS", "LOCK",
    "MOD", "RANGE", "READ", "REGEXP", "RENAME", "REPLACE", "RLIKE", "SHOW", "STATUS", "XOR",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

pub(crate) fn concat_like(style: LikeStyle, term: &str) -> String {
    match style {
        LikeStyle::Left => format!("CONCAT('%', {term})"),
        LikeStyle::Right => format!("CONCAT({term}, '%')"),
        LikeStyle::Default => format!("CONCAT('%', {term}, '%')"),
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn left_quote(&self) -> char {
        '`'
    }

    fn right_quote(&self) -> char {
        '`'
    }

    fn is_keyword(&self, name: &str) -> bool {
        SQL_KEYWORDS
            .iter()
            .chain(MYSQL_KEYWORDS)
            .any(|k| k.eq_ignore_ascii_case(name))
    }

    fn like(&self, style: LikeStyle, term: &str) -> String {
        concat_like(style, term)
    }

    fn supports_group_alias(&self) -> bool {
        true
    }

    fn supports_nulls_ordering(&self) -> bool {
        false
    }

    fn supports_insert_ignore(&self, _primary_key: &[String], _columns: &[String]) -> bool {
        true
    }

    fn supports_upsert(&self, _primary_key: &[String], _columns: &[String]) -> bool {
        true
    }

    fn insert_ignore(
        &self,
        quote: bool,
        table: &str,
        _primary_key: &[String],
        columns: &[String],
        terms: &[String],
    ) -> String {
        format!(
            "INSERT IGNORE INTO {table} ({}) VALUES ({})",
            self.column_list(quote, columns),
            terms.join(", ")
        )
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
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| !primary_key.contains(c))
            .map(|c| {
                let c = self.fmt_name(quote, c);
                format!("{c} = VALUES({c})")
            })
            .collect();
        if !updates.is_empty() {
            sql.push_str(" ON DUPLICATE KEY UPDATE ");
            sql.push_str(&updates.join(", "));
        }
        sql
    }

    fn page(&self, stmt: BoundStatement, start: u64, limit: u64) -> CmdResult<BoundStatement> {
        let BoundStatement { mut sql, mut args } = stmt;
        match (start, limit) {
            (0, 0) => {}
            (0, _) => {
                sql.push_str(" LIMIT ?");
                args.push(page_arg(limit)?);
            }
            // An offset alone still needs a row count; MySQL spells "all rows" this way.
            (_, 0) => {
                sql.push_str(" LIMIT ?, 18446744073709551615");
                args.push(page_arg(start)?);
            }
            _ => {
                sql.push_str(" LIMIT ?, ?");
                args.push(page_arg(start)?);
                args.push(page_arg(limit)?);
            }
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
    fn backtick_quoting() {
        assert_eq!(MySqlDialect.fmt_name(true, "name"), "`name`");
        assert_eq!(MySqlDialect.fmt_name(false, "replace"), "`replace`");
    }

    #[test]
    fn upsert_skips_primary_key_columns() {
        let terms = vec!["?".to_string(); 3];
        let sql = MySqlDialect.insert_replace(
            false,
            "t",
            &cols(&["id"]),
            &cols(&["id", "a", "b"]),
            &terms,
        );
        assert_eq!(
            sql,
            "INSERT INTO t (id, a, b) VALUES (?, ?, ?) ON DUPLICATE KEY UPDATE a = VALUES(a), b = VALUES(b)"
        );
    }

    #[test]
    fn page_with_offset() {
        let stmt = BoundStatement::new("SELECT * FROM t", Vec::new());
        let paged = MySqlDialect.page(stmt, 5, 10).unwrap();
        assert_eq!(paged.sql, "SELECT * FROM t LIMIT ?, ?");
        assert_eq!(paged.args, vec![Value::Int(5), Value::Int(10)]);

        let stmt = BoundStatement::new("SELECT * FROM t", Vec::new());
        let paged = MySqlDialect.page(stmt, 0, 10).unwrap();
        assert_eq!(paged.sql, "SELECT * FROM t LIMIT ?");
        assert_eq!(paged.args, vec![Value::Int(10)]);
    }

    #[test]
    fn zero_limit_leaves_rows_open() {
        let stmt = BoundStatement::new("SELECT * FROM t", vec![Value::Int(1)]);
        let paged = MySqlDialect.page(stmt, 0, 0).unwrap();
        assert_eq!(paged.sql, "SELECT * FROM t");
        assert_eq!(paged.args, vec![Value::Int(1)]);

        let stmt = BoundStatement::new("SELECT * FROM t", Vec::new());
        let paged = MySqlDialect.page(stmt, 5, 0).unwrap();
        assert_eq!(paged.sql, "SELECT * FROM t LIMIT ?, 18446744073709551615");
        assert_eq!(paged.args, vec![Value::Int(5)]);
    }
}
