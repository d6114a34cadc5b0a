//! Dialect capability objects.
//!
//! A [`Dialect`] answers every backend-specific question a renderer has:
//! identifier quoting, table name composition, LIKE formatting, alias reuse in
//! GROUP BY / ORDER BY, null ordering, insert-conflict support and pagination.
//! Builders never hold a dialect; one accumulated command can be rendered
//! against any of them.

mod document;
mod mysql;
mod oracle;
mod postgres;
mod standard;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::command::{
    BoundStatement, CommandBuilder, DocumentCommandBuilder, NullsOrder, SearchCommandBuilder,
    SqlCommandBuilder, Target, TypedPaths, TypelessPaths,
};
use crate::condition::LikeStyle;
use crate::error::{CmdError, CmdResult};
use crate::value::Value;

pub use document::{ElasticDialect, MongoDialect};
pub use mysql::MySqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use standard::StandardDialect;

/// Words that force quoting in every SQL dialect.
pub(crate) const SQL_KEYWORDS: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN", "CONSTRAINT",
    "CREATE", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXISTS", "FALSE",
    "FOR", "FOREIGN", "FROM", "GRANT", "GROUP", "HAVING", "IN", "INDEX", "INSERT", "INTO", "IS",
    "JOIN", "KEY", "LIKE", "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "PRIMARY",
    "REFERENCES", "SELECT", "SET", "TABLE", "THEN", "TO", "TRUE", "UNION", "UNIQUE", "UPDATE",
    "USER", "USING", "VALUES", "WHEN", "WHERE", "WITH",
];

/// Backend capabilities consumed by the renderers.
///
/// Every method has a default matching plain ANSI SQL with `"` quoting, so a
/// dialect only overrides what differs.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    fn left_quote(&self) -> char {
        '"'
    }

    fn right_quote(&self) -> char {
        '"'
    }

    /// Reserved words that are always quoted.
    fn keywords(&self) -> &[&'static str] {
        SQL_KEYWORDS
    }

    fn is_keyword(&self, name: &str) -> bool {
        self.keywords().iter().any(|k| k.eq_ignore_ascii_case(name))
    }

    /// Format one identifier, quoting when asked to or when it is reserved.
    fn fmt_name(&self, quote: bool, name: &str) -> String {
        if quote || self.is_keyword(name) {
            quote_ident(self.left_quote(), self.right_quote(), name)
        } else {
            name.to_string()
        }
    }

    /// Compose `catalog.schema.table`, skipping blank parts.
    fn table_name(&self, quote: bool, target: &Target) -> String {
        [target.catalog(), target.schema(), Some(target.table())]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .map(|part| self.fmt_name(quote, part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Separator between a projection expression and its alias.
    fn alias_separator(&self) -> &'static str {
        " "
    }

    /// Text for the value side of a LIKE predicate; `term` is `?` or an override.
    fn like(&self, style: LikeStyle, term: &str) -> String {
        match style {
            LikeStyle::Left => format!("'%' || {term}"),
            LikeStyle::Right => format!("{term} || '%'"),
            LikeStyle::Default => format!("'%' || {term} || '%'"),
        }
    }

    /// Transform the bound LIKE value. SQL dialects bind it unchanged.
    fn like_value(&self, _style: LikeStyle, value: Value) -> Value {
        value
    }

    /// Whether GROUP BY may refer to a projection by its alias.
    fn supports_group_alias(&self) -> bool {
        false
    }

    /// Whether ORDER BY may refer to a projection by its alias.
    fn supports_order_alias(&self) -> bool {
        true
    }

    /// Whether `NULLS FIRST` / `NULLS LAST` is understood.
    fn supports_nulls_ordering(&self) -> bool {
        true
    }

    /// Sort key emitted ahead of `expr` to steer nulls when there is no native syntax.
    fn nulls_prefix(&self, expr: &str, nulls: NullsOrder) -> String {
        match nulls {
            NullsOrder::First => format!("{expr} IS NULL DESC, "),
            NullsOrder::Last => format!("{expr} IS NULL ASC, "),
            NullsOrder::Default => String::new(),
        }
    }

    fn supports_insert_ignore(&self, _primary_key: &[String], _columns: &[String]) -> bool {
        false
    }

    fn supports_upsert(&self, _primary_key: &[String], _columns: &[String]) -> bool {
        false
    }

    /// Plain `INSERT INTO t (a, b) VALUES (?, ?)`; `terms` holds one value text per column.
    fn insert_into(
        &self,
        quote: bool,
        table: &str,
        columns: &[String],
        terms: &[String],
    ) -> String {
        format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            self.column_list(quote, columns),
            terms.join(", ")
        )
    }

    /// Insert that skips rows conflicting on `primary_key`.
    fn insert_ignore(
        &self,
        quote: bool,
        table: &str,
        _primary_key: &[String],
        columns: &[String],
        terms: &[String],
    ) -> String {
        self.insert_into(quote, table, columns, terms)
    }

    /// Insert that overwrites rows conflicting on `primary_key`.
    fn insert_replace(
        &self,
        quote: bool,
        table: &str,
        _primary_key: &[String],
        columns: &[String],
        terms: &[String],
    ) -> String {
        self.insert_into(quote, table, columns, terms)
    }

    fn column_list(&self, quote: bool, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.fmt_name(quote, c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Restrict a rendered SELECT to `limit` rows starting at row `start`.
    /// A zero `limit` leaves the row count open.
    ///
    /// Pagination arguments are appended after the statement's own.
    fn page(&self, stmt: BoundStatement, start: u64, limit: u64) -> CmdResult<BoundStatement> {
        let BoundStatement { mut sql, mut args } = stmt;
        if start > 0 {
            sql.push_str(" OFFSET ? ROWS");
            args.push(page_arg(start)?);
        }
        if limit > 0 {
            sql.push_str(" FETCH NEXT ? ROWS ONLY");
            args.push(page_arg(limit)?);
        }
        Ok(BoundStatement { sql, args })
    }

    /// Wrap a rendered SELECT into a row count.
    fn count(&self, stmt: BoundStatement) -> CmdResult<BoundStatement> {
        Ok(BoundStatement {
            sql: format!("SELECT COUNT(*) FROM ({}) TEMP_T", stmt.sql),
            args: stmt.args,
        })
    }
}

/// Quote `name` with the given delimiters, doubling embedded closing quotes.
pub fn quote_ident(left: char, right: char, name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push(left);
    for c in name.chars() {
        if c == right {
            out.push(right);
        }
        out.push(c);
    }
    out.push(right);
    out
}

pub(crate) fn page_arg(n: u64) -> CmdResult<Value> {
    i64::try_from(n)
        .map(Value::Int)
        .map_err(|_| CmdError::validation(format!("page bound {n} out of range")))
}

/// Renderer family a dialect belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Sql,
    Document,
    Search,
}

/// Built-in dialects, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    Standard,
    #[serde(alias = "mariadb")]
    Mysql,
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
    Oracle,
    #[serde(alias = "mongodb")]
    Mongo,
    Elastic6,
    #[serde(alias = "elastic")]
    Elastic7,
}

impl DialectKind {
    pub const ALL: [DialectKind; 7] = [
        DialectKind::Standard,
        DialectKind::Mysql,
        DialectKind::Postgres,
        DialectKind::Oracle,
        DialectKind::Mongo,
        DialectKind::Elastic6,
        DialectKind::Elastic7,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DialectKind::Standard => "standard",
            DialectKind::Mysql => "mysql",
            DialectKind::Postgres => "postgres",
            DialectKind::Oracle => "oracle",
            DialectKind::Mongo => "mongo",
            DialectKind::Elastic6 => "elastic6",
            DialectKind::Elastic7 => "elastic7",
        }
    }

    /// The shared capability object for this dialect.
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            DialectKind::Standard => &StandardDialect,
            DialectKind::Mysql => &MySqlDialect,
            DialectKind::Postgres => &PostgresDialect,
            DialectKind::Oracle => &OracleDialect,
            DialectKind::Mongo => &MongoDialect,
            DialectKind::Elastic6 | DialectKind::Elastic7 => &ElasticDialect,
        }
    }

    pub fn family(self) -> Family {
        match self {
            DialectKind::Mongo => Family::Document,
            DialectKind::Elastic6 | DialectKind::Elastic7 => Family::Search,
            _ => Family::Sql,
        }
    }

    /// A fresh builder of the family that can render for this dialect.
    pub fn builder(self) -> Box<dyn CommandBuilder + Send> {
        match self {
            DialectKind::Mongo => Box::new(DocumentCommandBuilder::new()),
            DialectKind::Elastic6 => Box::new(SearchCommandBuilder::new(TypedPaths)),
            DialectKind::Elastic7 => Box::new(SearchCommandBuilder::new(TypelessPaths)),
            _ => Box::new(SqlCommandBuilder::new()),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectKind {
    type Err = CmdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "ansi" => Ok(DialectKind::Standard),
            "mysql" | "mariadb" => Ok(DialectKind::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(DialectKind::Postgres),
            "oracle" => Ok(DialectKind::Oracle),
            "mongo" | "mongodb" => Ok(DialectKind::Mongo),
            "elastic6" => Ok(DialectKind::Elastic6),
            "elastic7" | "elastic" => Ok(DialectKind::Elastic7),
            other => Err(CmdError::validation(format!("unknown dialect: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_doubles_closing_delimiter() {
        assert_eq!(quote_ident('"', '"', r#"a"b"#), r#""a""b""#);
        assert_eq!(quote_ident('`', '`', "a`b"), "`a``b`");
        assert_eq!(quote_ident('[', ']', "a]b"), "[a]]b]");
    }

    #[test]
    fn keywords_are_quoted_without_flag() {
        let d = StandardDialect;
        assert_eq!(d.fmt_name(false, "user"), r#""user""#);
        assert_eq!(d.fmt_name(false, "name"), "name");
        assert_eq!(d.fmt_name(true, "name"), r#""name""#);
    }

    #[test]
    fn table_name_skips_blank_parts() {
        let d = StandardDialect;
        let t = Target::new("users").with_catalog("").with_schema("app");
        assert_eq!(d.table_name(false, &t), "app.users");
        assert_eq!(d.table_name(true, &t), r#""app"."users""#);
    }

    #[test]
    fn kind_parses_aliases() {
        assert_eq!("PostgreSQL".parse::<DialectKind>().unwrap(), DialectKind::Postgres);
        assert_eq!("mariadb".parse::<DialectKind>().unwrap(), DialectKind::Mysql);
        assert!("sqlite".parse::<DialectKind>().unwrap_err().is_validation());
        for kind in DialectKind::ALL {
            assert_eq!(kind.as_str().parse::<DialectKind>().unwrap(), kind);
        }
    }

    #[test]
    fn default_page_appends_offset_then_fetch() {
        let stmt = BoundStatement::new("SELECT * FROM t WHERE a = ?", vec![Value::Int(1)]);
        let paged = StandardDialect.page(stmt, 20, 10).unwrap();
        assert_eq!(
            paged.sql,
            "SELECT * FROM t WHERE a = ? OFFSET ? ROWS FETCH NEXT ? ROWS ONLY"
        );
        assert_eq!(paged.args, vec![Value::Int(1), Value::Int(20), Value::Int(10)]);
    }
}
