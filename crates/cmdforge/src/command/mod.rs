//! Command builders.
//!
//! [`CommandBuilder`] is the backend-agnostic surface: set a target, add
//! conditions, projections, grouping, ordering, assignments and insert pairs,
//! then render one [`BoundStatement`] for a dialect. Three families implement it:
//!
//! - [`SqlCommandBuilder`] renders relational SQL,
//! - [`DocumentCommandBuilder`] renders MongoDB shell commands,
//! - [`SearchCommandBuilder`] renders Elasticsearch REST calls.
//!
//! Construction order is enforced at runtime: once GROUP BY has been added no
//! condition may follow, and once ORDER BY has been added neither conditions
//! nor GROUP BY may follow.
//!
//! Rendering appends to the builder's argument list. Render a builder once,
//! or call [`CommandBuilder::clear_args`] between renders.

mod document;
mod search;
mod sql;


use std::fmt;

use serde::{Deserialize, Serialize};

use crate::condition::{BetweenPredicate, ConditionLogic, InPredicate, Predicate};
use crate::dialect::Dialect;
use crate::error::{CmdError, CmdResult};
use crate::value::{ArgList, Value};

pub use document::{Doc, DocumentCommandBuilder};
pub use search::{Endpoint, EndpointPaths, SearchCommandBuilder, TypedPaths, TypelessPaths};
pub use sql::SqlCommandBuilder;

/// Rendered command text with its arguments in placeholder order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundStatement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl BoundStatement {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

impl fmt::Display for BoundStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Location of the table or collection a command addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    catalog: Option<String>,
    schema: Option<String>,
    table: String,
}

impl Target {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schema: None,
            table: table.into(),
        }
    }

    /// Split `table`, `schema.table` or `catalog.schema.table`.
    pub fn parse(dotted: &str) -> CmdResult<Self> {
        let parts: Vec<&str> = dotted.split('.').map(str::trim).collect();
        match parts.as_slice() {
            [table] if !table.is_empty() => Ok(Self::new(*table)),
            [schema, table] if !table.is_empty() => Ok(Self::new(*table).with_schema(*schema)),
            [catalog, schema, table] if !table.is_empty() => Ok(Self::new(*table)
                .with_schema(*schema)
                .with_catalog(*catalog)),
            _ => Err(CmdError::validation(format!("invalid target: '{dotted}'"))),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl From<&str> for Target {
    fn from(table: &str) -> Self {
        Target::new(table)
    }
}

/// The four operations a builder can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    #[default]
    Select,
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Select => "SELECT",
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

/// Sort direction. `Default` leaves the direction to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    Default,
    Asc,
    Desc,
}

impl OrderType {
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            OrderType::Default => None,
            OrderType::Asc => Some("ASC"),
            OrderType::Desc => Some("DESC"),
        }
    }
}

/// Where nulls sort relative to other values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullsOrder {
    First,
    Last,
    #[default]
    Default,
}

impl NullsOrder {
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            NullsOrder::First => Some("NULLS FIRST"),
            NullsOrder::Last => Some("NULLS LAST"),
            NullsOrder::Default => None,
        }
    }
}

/// How an insert treats rows that collide on the primary key.
///
/// `Ignore` and `Update` are probed against the dialect; when it cannot
/// express them for the given key and columns the insert silently becomes a
/// plain `Into` (a `WARN` event is emitted with the `tracing` feature).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    #[default]
    Into,
    Ignore,
    Update,
}

/// Which clause a builder is currently accepting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ClauseState {
    #[default]
    Filtering,
    Grouping,
    Ordering,
}

impl ClauseState {
    pub fn check_condition(self) -> CmdResult<()> {
        match self {
            ClauseState::Filtering => Ok(()),
            ClauseState::Grouping => Err(CmdError::state("condition", "GROUP BY")),
            ClauseState::Ordering => Err(CmdError::state("condition", "ORDER BY")),
        }
    }

    pub fn check_group_by(self) -> CmdResult<()> {
        match self {
            ClauseState::Ordering => Err(CmdError::state("GROUP BY", "ORDER BY")),
            _ => Ok(()),
        }
    }
}

/// Callback filling a nested condition group.
pub type GroupFn<'a> = dyn FnMut(&mut dyn CommandBuilder) -> CmdResult<()> + 'a;

/// Backend-agnostic construction surface.
pub trait CommandBuilder {
    /// Backend family name used in errors and logs.
    fn backend(&self) -> &'static str;

    fn set_target(&mut self, target: Target);

    fn target(&self) -> &Target;

    fn add_condition(&mut self, logic: ConditionLogic, predicate: Predicate) -> CmdResult<()>;

    fn add_between(&mut self, logic: ConditionLogic, predicate: BetweenPredicate)
    -> CmdResult<()>;

    /// Fails on an empty value list.
    fn add_in(&mut self, logic: ConditionLogic, predicate: InPredicate) -> CmdResult<()>;

    /// Add a parenthesized group filled by `group`.
    fn add_group(&mut self, logic: ConditionLogic, group: &mut GroupFn<'_>) -> CmdResult<()>;

    /// Splice `text` verbatim, binding `args` in order.
    fn add_raw(&mut self, logic: ConditionLogic, text: &str, args: Vec<Value>) -> CmdResult<()>;

    /// Add a projection; `term` is an expression selected under the column's name.
    fn add_select(&mut self, column: &str, term: Option<&str>) -> CmdResult<()>;

    /// Add a free-form projection expression with its own arguments.
    fn add_select_custom(&mut self, expr: &str, args: Vec<Value>) -> CmdResult<()>;

    fn has_select(&self, column: &str) -> bool;

    fn has_any_select(&self) -> bool;

    /// Drop projections and select every field.
    fn select_all(&mut self);

    fn is_select_all(&self) -> bool;

    fn clear_select(&mut self);

    fn add_group_by(&mut self, column: &str, term: Option<&str>) -> CmdResult<()>;

    fn add_order_by(
        &mut self,
        column: &str,
        term: Option<&str>,
        order: OrderType,
        nulls: NullsOrder,
    ) -> CmdResult<()>;

    /// A `Null` value without a template assigns `NULL` and binds nothing.
    fn add_update_set(&mut self, column: &str, value: Value, term: Option<&str>)
    -> CmdResult<()>;

    fn clear_update_set(&mut self);

    fn add_insert(&mut self, column: &str, value: Value, term: Option<&str>) -> CmdResult<()>;

    fn args(&self) -> &ArgList;

    fn clear_args(&mut self);

    /// Reset everything for reuse.
    fn clear(&mut self);

    fn build_select(&mut self, dialect: &dyn Dialect, quote: bool) -> CmdResult<BoundStatement>;

    fn build_update(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        allow_empty_filter: bool,
    ) -> CmdResult<BoundStatement>;

    fn build_delete(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        allow_empty_filter: bool,
    ) -> CmdResult<BoundStatement>;

    fn build_insert(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        primary_key: &[String],
        strategy: ConflictStrategy,
    ) -> CmdResult<BoundStatement>;

    /// Render `operation` with its defaults: no empty-filter opt-in, plain insert.
    fn build(
        &mut self,
        operation: Operation,
        dialect: &dyn Dialect,
        quote: bool,
    ) -> CmdResult<BoundStatement> {
        match operation {
            Operation::Select => self.build_select(dialect, quote),
            Operation::Insert => self.build_insert(dialect, quote, &[], ConflictStrategy::Into),
            Operation::Update => self.build_update(dialect, quote, false),
            Operation::Delete => self.build_delete(dialect, quote, false),
        }
    }
}

impl<T: CommandBuilder + ?Sized> CommandBuilder for &mut T {
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    fn set_target(&mut self, target: Target) {
        (**self).set_target(target)
    }

    fn target(&self) -> &Target {
        (**self).target()
    }

    fn add_condition(&mut self, logic: ConditionLogic, predicate: Predicate) -> CmdResult<()> {
        (**self).add_condition(logic, predicate)
    }

    fn add_between(
        &mut self,
        logic: ConditionLogic,
        predicate: BetweenPredicate,
    ) -> CmdResult<()> {
        (**self).add_between(logic, predicate)
    }

    fn add_in(&mut self, logic: ConditionLogic, predicate: InPredicate) -> CmdResult<()> {
        (**self).add_in(logic, predicate)
    }

    fn add_group(&mut self, logic: ConditionLogic, group: &mut GroupFn<'_>) -> CmdResult<()> {
        (**self).add_group(logic, group)
    }

    fn add_raw(&mut self, logic: ConditionLogic, text: &str, args: Vec<Value>) -> CmdResult<()> {
        (**self).add_raw(logic, text, args)
    }

    fn add_select(&mut self, column: &str, term: Option<&str>) -> CmdResult<()> {
        (**self).add_select(column, term)
    }

    fn add_select_custom(&mut self, expr: &str, args: Vec<Value>) -> CmdResult<()> {
        (**self).add_select_custom(expr, args)
    }

    fn has_select(&self, column: &str) -> bool {
        (**self).has_select(column)
    }

    fn has_any_select(&self) -> bool {
        (**self).has_any_select()
    }

    fn select_all(&mut self) {
        (**self).select_all()
    }

    fn is_select_all(&self) -> bool {
        (**self).is_select_all()
    }

    fn clear_select(&mut self) {
        (**self).clear_select()
    }

    fn add_group_by(&mut self, column: &str, term: Option<&str>) -> CmdResult<()> {
        (**self).add_group_by(column, term)
    }

    fn add_order_by(
        &mut self,
        column: &str,
        term: Option<&str>,
        order: OrderType,
        nulls: NullsOrder,
    ) -> CmdResult<()> {
        (**self).add_order_by(column, term, order, nulls)
    }

    fn add_update_set(
        &mut self,
        column: &str,
        value: Value,
        term: Option<&str>,
    ) -> CmdResult<()> {
        (**self).add_update_set(column, value, term)
    }

    fn clear_update_set(&mut self) {
        (**self).clear_update_set()
    }

    fn add_insert(&mut self, column: &str, value: Value, term: Option<&str>) -> CmdResult<()> {
        (**self).add_insert(column, value, term)
    }

    fn args(&self) -> &ArgList {
        (**self).args()
    }

    fn clear_args(&mut self) {
        (**self).clear_args()
    }

    fn clear(&mut self) {
        (**self).clear()
    }

    fn build_select(&mut self, dialect: &dyn Dialect, quote: bool) -> CmdResult<BoundStatement> {
        (**self).build_select(dialect, quote)
    }

    fn build_update(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        allow_empty_filter: bool,
    ) -> CmdResult<BoundStatement> {
        (**self).build_update(dialect, quote, allow_empty_filter)
    }

    fn build_delete(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        allow_empty_filter: bool,
    ) -> CmdResult<BoundStatement> {
        (**self).build_delete(dialect, quote, allow_empty_filter)
    }

    fn build_insert(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        primary_key: &[String],
        strategy: ConflictStrategy,
    ) -> CmdResult<BoundStatement> {
        (**self).build_insert(dialect, quote, primary_key, strategy)
    }
}

impl<T: CommandBuilder + ?Sized> CommandBuilder for Box<T> {
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    fn set_target(&mut self, target: Target) {
        (**self).set_target(target)
    }

    fn target(&self) -> &Target {
        (**self).target()
    }

    fn add_condition(&mut self, logic: ConditionLogic, predicate: Predicate) -> CmdResult<()> {
        (**self).add_condition(logic, predicate)
    }

    fn add_between(
        &mut self,
        logic: ConditionLogic,
        predicate: BetweenPredicate,
    ) -> CmdResult<()> {
        (**self).add_between(logic, predicate)
    }

    fn add_in(&mut self, logic: ConditionLogic, predicate: InPredicate) -> CmdResult<()> {
        (**self).add_in(logic, predicate)
    }

    fn add_group(&mut self, logic: ConditionLogic, group: &mut GroupFn<'_>) -> CmdResult<()> {
        (**self).add_group(logic, group)
    }

    fn add_raw(&mut self, logic: ConditionLogic, text: &str, args: Vec<Value>) -> CmdResult<()> {
        (**self).add_raw(logic, text, args)
    }

    fn add_select(&mut self, column: &str, term: Option<&str>) -> CmdResult<()> {
        (**self).add_select(column, term)
    }

    fn add_select_custom(&mut self, expr: &str, args: Vec<Value>) -> CmdResult<()> {
        (**self).add_select_custom(expr, args)
    }

    fn has_select(&self, column: &str) -> bool {
        (**self).has_select(column)
    }

    fn has_any_select(&self) -> bool {
        (**self).has_any_select()
    }

    fn select_all(&mut self) {
        (**self).select_all()
    }

    fn is_select_all(&self) -> bool {
        (**self).is_select_all()
    }

    fn clear_select(&mut self) {
        (**self).clear_select()
    }

    fn add_group_by(&mut self, column: &str, term: Option<&str>) -> CmdResult<()> {
        (**self).add_group_by(column, term)
    }

    fn add_order_by(
        &mut self,
        column: &str,
        term: Option<&str>,
        order: OrderType,
        nulls: NullsOrder,
    ) -> CmdResult<()> {
        (**self).add_order_by(column, term, order, nulls)
    }

    fn add_update_set(
        &mut self,
        column: &str,
        value: Value,
        term: Option<&str>,
    ) -> CmdResult<()> {
        (**self).add_update_set(column, value, term)
    }

    fn clear_update_set(&mut self) {
        (**self).clear_update_set()
    }

    fn add_insert(&mut self, column: &str, value: Value, term: Option<&str>) -> CmdResult<()> {
        (**self).add_insert(column, value, term)
    }

    fn args(&self) -> &ArgList {
        (**self).args()
    }

    fn clear_args(&mut self) {
        (**self).clear_args()
    }

    fn clear(&mut self) {
        (**self).clear()
    }

    fn build_select(&mut self, dialect: &dyn Dialect, quote: bool) -> CmdResult<BoundStatement> {
        (**self).build_select(dialect, quote)
    }

    fn build_update(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        allow_empty_filter: bool,
    ) -> CmdResult<BoundStatement> {
        (**self).build_update(dialect, quote, allow_empty_filter)
    }

    fn build_delete(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        allow_empty_filter: bool,
    ) -> CmdResult<BoundStatement> {
        (**self).build_delete(dialect, quote, allow_empty_filter)
    }

    fn build_insert(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        primary_key: &[String],
        strategy: ConflictStrategy,
    ) -> CmdResult<BoundStatement> {
        (**self).build_insert(dialect, quote, primary_key, strategy)
    }
}

/// Downgrade `strategy` to `Into` when the dialect cannot express it.
pub(crate) fn resolve_conflict(
    dialect: &dyn Dialect,
    primary_key: &[String],
    columns: &[String],
    strategy: ConflictStrategy,
) -> ConflictStrategy {
    let supported = match strategy {
        ConflictStrategy::Into => true,
        ConflictStrategy::Ignore => dialect.supports_insert_ignore(primary_key, columns),
        ConflictStrategy::Update => dialect.supports_upsert(primary_key, columns),
    };
    if supported {
        return strategy;
    }

    #[cfg(feature = "tracing")]
    tracing::warn!(
        target: "cmdforge.insert",
        dialect = dialect.name(),
        strategy = ?strategy,
        primary_key = ?primary_key,
        "conflict strategy not supported, rendering plain insert"
    );

    ConflictStrategy::Into
}

#[cfg(feature = "tracing")]
const MAX_LOGGED_SQL: usize = 200;

#[cfg(feature = "tracing")]
fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Emit the `cmdforge.render` debug event for a finished render.
#[cfg(feature = "tracing")]
pub(crate) fn log_render(operation: Operation, dialect: &dyn Dialect, stmt: &BoundStatement) {
    let sql = truncate_sql_bytes(&stmt.sql, MAX_LOGGED_SQL);
    tracing::debug!(
        target: "cmdforge.render",
        operation = operation.as_str(),
        dialect = dialect.name(),
        arg_count = stmt.args.len(),
        sql = %sql,
        "rendered command"
    );
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn log_render(_operation: Operation, _dialect: &dyn Dialect, _stmt: &BoundStatement) {}
