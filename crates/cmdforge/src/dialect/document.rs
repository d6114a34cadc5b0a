//! Non-relational dialects: a document store (MongoDB shell syntax) and a
//! search endpoint (Elasticsearch REST).
//!
//! Neither quotes identifiers nor has insert-conflict support. LIKE is mapped
//! onto the backend's own pattern language by rewriting the bound value.

use super::Dialect;
use crate::command::{BoundStatement, NullsOrder, Target};
use crate::condition::LikeStyle;
use crate::error::CmdResult;
use crate::value::Value;

const DEFAULT_DATABASE: &str = "db";

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Pagination travels as a leading hint comment for the executor.
fn hint_page(stmt: BoundStatement, start: u64, limit: u64) -> BoundStatement {
    let hint = if start > 0 {
        format!("/*+overwrite_find_skip={start},overwrite_find_limit={limit}*/")
    } else {
        format!("/*+overwrite_find_limit={limit}*/")
    };
    BoundStatement {
        sql: format!("{hint}{}", stmt.sql),
        args: stmt.args,
    }
}

fn hint_count(stmt: BoundStatement) -> BoundStatement {
    BoundStatement {
        sql: format!("/*+overwrite_find_as_count*/{}", stmt.sql),
        args: stmt.args,
    }
}

/// MongoDB shell syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoDialect;

impl Dialect for MongoDialect {
    fn name(&self) -> &'static str {
        "mongo"
    }

    fn keywords(&self) -> &[&'static str] {
        &[]
    }

    fn fmt_name(&self, _quote: bool, name: &str) -> String {
        name.to_string()
    }

    /// `<database>.<collection>`; the database is the catalog, else the schema, else `db`.
    fn table_name(&self, _quote: bool, target: &Target) -> String {
        let db = non_blank(target.catalog())
            .or_else(|| non_blank(target.schema()))
            .unwrap_or(DEFAULT_DATABASE);
        format!("{db}.{}", target.table())
    }

    fn alias_separator(&self) -> &'static str {
        ":"
    }

    fn like(&self, _style: LikeStyle, term: &str) -> String {
        term.to_string()
    }

    /// Regex anchoring. Metacharacters in the value are passed through as-is.
    fn like_value(&self, style: LikeStyle, value: Value) -> Value {
        match value {
            Value::Text(s) => Value::Text(match style {
                LikeStyle::Left => format!("{s}$"),
                LikeStyle::Right => format!("^{s}"),
                LikeStyle::Default => s,
            }),
            other => other,
        }
    }

    fn supports_group_alias(&self) -> bool {
        false
    }

    fn supports_order_alias(&self) -> bool {
        false
    }

    fn supports_nulls_ordering(&self) -> bool {
        false
    }

    fn nulls_prefix(&self, _expr: &str, _nulls: NullsOrder) -> String {
        String::new()
    }

    fn page(&self, stmt: BoundStatement, start: u64, limit: u64) -> CmdResult<BoundStatement> {
        Ok(hint_page(stmt, start, limit))
    }

    fn count(&self, stmt: BoundStatement) -> CmdResult<BoundStatement> {
        Ok(hint_count(stmt))
    }
}

/// Elasticsearch query DSL over REST.
///
/// The index is the target table, or the catalog when the table is blank.
/// Path layout per server version lives in [`EndpointPaths`](crate::command::EndpointPaths).
#[derive(Debug, Clone, Copy, Default)]
pub struct ElasticDialect;

impl Dialect for ElasticDialect {
    fn name(&self) -> &'static str {
        "elastic"
    }

    fn keywords(&self) -> &[&'static str] {
        &[]
    }

    fn fmt_name(&self, _quote: bool, name: &str) -> String {
        name.to_string()
    }

    fn table_name(&self, _quote: bool, target: &Target) -> String {
        non_blank(Some(target.table()))
            .or_else(|| non_blank(target.catalog()))
            .unwrap_or_default()
            .to_string()
    }

    fn like(&self, _style: LikeStyle, term: &str) -> String {
        term.to_string()
    }

    /// Wildcard query pattern.
    fn like_value(&self, style: LikeStyle, value: Value) -> Value {
        match value {
            Value::Text(s) => Value::Text(match style {
                LikeStyle::Left => format!("*{s}"),
                LikeStyle::Right => format!("{s}*"),
                LikeStyle::Default => format!("*{s}*"),
            }),
            other => other,
        }
    }

    fn supports_group_alias(&self) -> bool {
        false
    }

    fn supports_order_alias(&self) -> bool {
        false
    }

    /// Expressed with `missing: _first | _last` on the sort key.
    fn supports_nulls_ordering(&self) -> bool {
        true
    }

    /// Same hint comments as the document store; the executor rewrites the
    /// call into `from`/`size` or `_count`.
    fn page(&self, stmt: BoundStatement, start: u64, limit: u64) -> CmdResult<BoundStatement> {
        Ok(hint_page(stmt, start, limit))
    }

    fn count(&self, stmt: BoundStatement) -> CmdResult<BoundStatement> {
        Ok(hint_count(stmt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mongo_collection_defaults_database() {
        assert_eq!(MongoDialect.table_name(true, &Target::new("users")), "db.users");
        let t = Target::new("users").with_schema("app");
        assert_eq!(MongoDialect.table_name(false, &t), "app.users");
        let t = Target::new("users").with_catalog("crm").with_schema("app");
        assert_eq!(MongoDialect.table_name(false, &t), "crm.users");
    }

    #[test]
    fn mongo_like_anchors() {
        let v = |s: &str| Value::Text(s.to_string());
        assert_eq!(MongoDialect.like_value(LikeStyle::Right, v("ab")), v("^ab"));
        assert_eq!(MongoDialect.like_value(LikeStyle::Left, v("ab")), v("ab$"));
        assert_eq!(MongoDialect.like_value(LikeStyle::Default, v("a.b")), v("a.b"));
    }

    #[test]
    fn mongo_page_hint() {
        let stmt = BoundStatement::new("db.t.find({})", Vec::new());
        let paged = MongoDialect.page(stmt, 0, 10).unwrap();
        assert_eq!(paged.sql, "/*+overwrite_find_limit=10*/db.t.find({})");
        let stmt = BoundStatement::new("db.t.find({})", Vec::new());
        let paged = MongoDialect.page(stmt, 20, 10).unwrap();
        assert_eq!(
            paged.sql,
            "/*+overwrite_find_skip=20,overwrite_find_limit=10*/db.t.find({})"
        );
    }

    #[test]
    fn elastic_index_falls_back_to_catalog() {
        let t = Target::new("").with_catalog("logs");
        assert_eq!(ElasticDialect.table_name(false, &t), "logs");
        assert_eq!(ElasticDialect.table_name(false, &Target::new("idx")), "idx");
    }

    #[test]
    fn elastic_page_and_count_hints() {
        let body = r#"POST /idx/_search {"query":{"match_all":{}}}"#;
        let paged = ElasticDialect
            .page(BoundStatement::new(body, vec![Value::Int(1)]), 10, 5)
            .unwrap();
        assert_eq!(
            paged.sql,
            format!("/*+overwrite_find_skip=10,overwrite_find_limit=5*/{body}")
        );
        assert_eq!(paged.args, vec![Value::Int(1)]);

        let paged = ElasticDialect
            .page(BoundStatement::new(body, Vec::new()), 0, 5)
            .unwrap();
        assert_eq!(paged.sql, format!("/*+overwrite_find_limit=5*/{body}"));

        let counted = ElasticDialect
            .count(BoundStatement::new(body, Vec::new()))
            .unwrap();
        assert_eq!(counted.sql, format!("/*+overwrite_find_as_count*/{body}"));
    }
}
