//! Oracle dialect.
//!
//! Conflict strategies are expressed with `MERGE INTO … USING (SELECT … FROM dual)`
//! and therefore need a primary key to join on. Pagination wraps the statement
//! in a `ROWNUM` window.

use super::{Dialect, SQL_KEYWORDS, page_arg};
use crate::command::{BoundStatement, Target};
use crate::condition::LikeStyle;
use crate::error::CmdResult;

const ORACLE_KEYWORDS: &[&str] = &[
    "ACCESS", "COMMENT", "DATE", "FILE", "LEVEL", "MODE", "NUMBER", "RAW", "ROW", "ROWID",
    "ROWNUM", "ROWS", "SESSION", "SIZE", "START", "SYSDATE", "UID", "VARCHAR2",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl OracleDialect {
    fn merge_head(
        &self,
        quote: bool,
        table: &str,
        primary_key: &[String],
        columns: &[String],
        terms: &[String],
    ) -> String {
        let select: Vec<String> = columns
            .iter()
            .zip(terms)
            .map(|(c, t)| format!("{t} {}", self.fmt_name(quote, c)))
            .collect();
        let on: Vec<String> = primary_key
            .iter()
            .map(|k| {
                let k = self.fmt_name(quote, k);
                format!("TMP.{k} = SRC.{k}")
            })
            .collect();
        format!(
            "MERGE INTO {table} TMP USING (SELECT {} FROM dual) SRC ON ({})",
            select.join(", "),
            on.join(" AND ")
        )
    }

    fn merge_insert(&self, quote: bool, columns: &[String]) -> String {
        let src: Vec<String> = columns
            .iter()
            .map(|c| format!("SRC.{}", self.fmt_name(quote, c)))
            .collect();
        format!(
            " WHEN NOT MATCHED THEN INSERT ({}) VALUES ({})",
            self.column_list(quote, columns),
            src.join(", ")
        )
    }
}

impl Dialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn is_keyword(&self, name: &str) -> bool {
        SQL_KEYWORDS
            .iter()
            .chain(ORACLE_KEYWORDS)
            .any(|k| k.eq_ignore_ascii_case(name))
    }

    /// Oracle has no catalogs; only the innermost qualifier is kept.
    fn table_name(&self, quote: bool, target: &Target) -> String {
        let table = self.fmt_name(quote, target.table());
        let owner = [target.schema(), target.catalog()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty());
        match owner {
            Some(owner) => format!("{}.{table}", self.fmt_name(quote, owner)),
            None => table,
        }
    }

    fn like(&self, style: LikeStyle, term: &str) -> String {
        match style {
            LikeStyle::Left => format!("CONCAT('%', {term})"),
            LikeStyle::Right => format!("CONCAT({term}, '%')"),
            LikeStyle::Default => format!("CONCAT(CONCAT('%', {term}), '%')"),
        }
    }

    fn supports_group_alias(&self) -> bool {
        true
    }

    fn supports_insert_ignore(&self, primary_key: &[String], _columns: &[String]) -> bool {
        !primary_key.is_empty()
    }

    fn supports_upsert(&self, primary_key: &[String], _columns: &[String]) -> bool {
        !primary_key.is_empty()
    }

    fn insert_ignore(
        &self,
        quote: bool,
        table: &str,
        primary_key: &[String],
        columns: &[String],
        terms: &[String],
    ) -> String {
        let mut sql = self.merge_head(quote, table, primary_key, columns, terms);
        sql.push_str(&self.merge_insert(quote, columns));
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
        let mut sql = self.merge_head(quote, table, primary_key, columns, terms);
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| !primary_key.contains(c))
            .map(|c| {
                let c = self.fmt_name(quote, c);
                format!("{c} = SRC.{c}")
            })
            .collect();
        if !updates.is_empty() {
            sql.push_str(" WHEN MATCHED THEN UPDATE SET ");
            sql.push_str(&updates.join(", "));
        }
        sql.push_str(&self.merge_insert(quote, columns));
        sql
    }

    fn page(&self, stmt: BoundStatement, start: u64, limit: u64) -> CmdResult<BoundStatement> {
        let BoundStatement { sql, mut args } = stmt;
        let sql = match (start, limit) {
            (0, 0) => sql,
            (_, 0) => {
                args.push(page_arg(start)?);
                format!("SELECT * FROM ( SELECT TMP.*, ROWNUM ROW_ID FROM ( {sql} ) TMP ) WHERE ROW_ID > ?")
            }
            _ => {
                args.push(page_arg(start.saturating_add(limit))?);
                args.push(page_arg(start)?);
                format!(
                    "SELECT * FROM ( SELECT TMP.*, ROWNUM ROW_ID FROM ( {sql} ) TMP WHERE ROWNUM <= ? ) WHERE ROW_ID > ?"
                )
            }
        };
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
    fn owner_prefers_schema() {
        let t = Target::new("emp").with_catalog("cat").with_schema("hr");
        assert_eq!(OracleDialect.table_name(false, &t), "hr.emp");
        let t = Target::new("emp").with_catalog("cat");
        assert_eq!(OracleDialect.table_name(false, &t), "cat.emp");
    }

    #[test]
    fn merge_upsert() {
        let terms = vec!["?".to_string(); 3];
        let sql = OracleDialect.insert_replace(
            false,
            "t",
            &cols(&["id"]),
            &cols(&["id", "b", "c"]),
            &terms,
        );
        assert_eq!(
            sql,
            "MERGE INTO t TMP USING (SELECT ? id, ? b, ? c FROM dual) SRC ON (TMP.id = SRC.id) \
             WHEN MATCHED THEN UPDATE SET b = SRC.b, c = SRC.c \
             WHEN NOT MATCHED THEN INSERT (id, b, c) VALUES (SRC.id, SRC.b, SRC.c)"
        );
    }

    #[test]
    fn merge_ignore_has_no_update_branch() {
        let terms = vec!["?".to_string(); 2];
        let sql = OracleDialect.insert_ignore(false, "t", &cols(&["id"]), &cols(&["id", "b"]), &terms);
        assert!(!sql.contains("WHEN MATCHED"));
        assert!(sql.ends_with("WHEN NOT MATCHED THEN INSERT (id, b) VALUES (SRC.id, SRC.b)"));
    }

    #[test]
    fn rownum_window() {
        let stmt = BoundStatement::new("SELECT * FROM t", Vec::new());
        let paged = OracleDialect.page(stmt, 10, 5).unwrap();
        assert_eq!(
            paged.sql,
            "SELECT * FROM ( SELECT TMP.*, ROWNUM ROW_ID FROM ( SELECT * FROM t ) TMP WHERE ROWNUM <= ? ) WHERE ROW_ID > ?"
        );
        assert_eq!(paged.args, vec![Value::Int(15), Value::Int(10)]);
    }

    #[test]
    fn rownum_window_without_limit() {
        let stmt = BoundStatement::new("SELECT * FROM t", Vec::new());
        assert_eq!(OracleDialect.page(stmt, 0, 0).unwrap().sql, "SELECT * FROM t");

        let stmt = BoundStatement::new("SELECT * FROM t", Vec::new());
        let paged = OracleDialect.page(stmt, 10, 0).unwrap();
        assert_eq!(
            paged.sql,
            "SELECT * FROM ( SELECT TMP.*, ROWNUM ROW_ID FROM ( SELECT * FROM t ) TMP ) WHERE ROW_ID > ?"
        );
        assert_eq!(paged.args, vec![Value::Int(10)]);
    }
}
