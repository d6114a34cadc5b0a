//! Document-store builder (MongoDB shell syntax).
//!
//! Conditions are kept as structured predicates and translated into a [`Doc`]
//! expression tree at render time. Consecutive AND predicates form one
//! conjunction, an OR starts the next one, and several conjunctions are joined
//! under `$or`. Negated predicates are wrapped in `$nor`.
//!
//! A column override becomes the field key. A value override is spliced in
//! verbatim in place of `?` while the value itself stays bound, e.g.
//! `{age: NumberInt(?)}`.
//!
//! Nested groups, raw fragments, custom projections and grouping have no
//! faithful translation and are rejected.

use super::{
    BoundStatement, ClauseState, CommandBuilder, ConflictStrategy, GroupFn, NullsOrder,
    Operation, OrderType, Target, log_render, resolve_conflict,
};
use crate::condition::{
    BetweenPredicate, ConditionLogic, ConditionType, InPredicate, LikeStyle, Predicate,
};
use crate::dialect::Dialect;
use crate::error::{CmdError, CmdResult};
use crate::value::{ArgList, Value};

const DOCUMENT_BACKEND: &str = "document store";

/// A node of a rendered document expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Doc {
    /// A bound argument.
    Placeholder,
    /// Literal text standing in for a bound argument.
    Term(String),
    Null,
    Int(i64),
    Str(String),
    Object(Vec<(String, Doc)>),
    Array(Vec<Doc>),
}

impl Doc {
    /// A single-entry object.
    pub fn entry(key: impl Into<String>, value: Doc) -> Self {
        Doc::Object(vec![(key.into(), value)])
    }

    /// Mongo shell notation: `{a: ?, b: {$gt: ?}}`.
    pub fn to_shell(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, false);
        out
    }

    /// Compact JSON: `{"a":?,"b":{"$gt":?}}`.
    pub fn to_json(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, true);
        out
    }

    fn write(&self, out: &mut String, json: bool) {
        match self {
            Doc::Placeholder => out.push('?'),
            Doc::Term(t) => out.push_str(t),
            Doc::Null => out.push_str("null"),
            Doc::Int(i) => out.push_str(&i.to_string()),
            Doc::Str(s) => out.push_str(&json_string(s)),
            Doc::Object(entries) => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(if json { "," } else { ", " });
                    }
                    if json || !is_bare_key(key) {
                        out.push_str(&json_string(key));
                    } else {
                        out.push_str(key);
                    }
                    out.push_str(if json { ":" } else { ": " });
                    value.write(out, json);
                }
                out.push('}');
            }
            Doc::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(if json { "," } else { ", " });
                    }
                    item.write(out, json);
                }
                out.push(']');
            }
        }
    }
}

fn json_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Keys the shell accepts unquoted: `$`-operators and plain identifiers.
fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c == '$' || c == '_' || c.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c == '$' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

/// Push `value` and stand in for it with a placeholder, or with `term` when
/// one is given.
pub(crate) fn bind(args: &mut ArgList, value: &Value, term: Option<&str>) -> Doc {
    args.push(value.clone());
    match term {
        Some(t) => Doc::Term(t.to_string()),
        None => Doc::Placeholder,
    }
}

/// The override when it has content, the plain name otherwise.
fn field_name(column: String, term: Option<String>) -> String {
    term.filter(|t| !t.trim().is_empty()).unwrap_or(column)
}

fn owned_term(term: Option<&str>) -> Option<String> {
    term.filter(|t| !t.trim().is_empty()).map(str::to_string)
}

/// A structured predicate as accumulated by the document builders.
///
/// `column` already has any column override applied.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DocPredicate {
    Simple {
        column: String,
        kind: ConditionType,
        value: Option<Value>,
        value_term: Option<String>,
        like_style: LikeStyle,
    },
    Between {
        column: String,
        negated: bool,
        low: Value,
        high: Value,
        low_term: Option<String>,
        high_term: Option<String>,
    },
    In {
        column: String,
        negated: bool,
        values: Vec<Value>,
        value_term: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DocCondition {
    pub(crate) logic: ConditionLogic,
    pub(crate) predicate: DocPredicate,
}

/// Split conditions into OR-separated runs of AND-connected conditions.
pub(crate) fn or_runs(conditions: &[DocCondition]) -> Vec<&[DocCondition]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for (i, cond) in conditions.iter().enumerate() {
        if i > start && cond.logic.is_or() {
            runs.push(&conditions[start..i]);
            start = i;
        }
    }
    if start < conditions.len() {
        runs.push(&conditions[start..]);
    }
    runs
}

fn operator_doc(op: &str, value: Doc) -> Doc {
    Doc::entry(op, value)
}

fn mongo_entry(
    predicate: &DocPredicate,
    dialect: &dyn Dialect,
    args: &mut ArgList,
) -> (String, Doc) {
    match predicate {
        DocPredicate::Simple {
            column,
            kind,
            value,
            value_term,
            like_style,
        } => {
            let value = value.as_ref().unwrap_or(&Value::Null);
            let term = value_term.as_deref();
            let doc = match kind {
                ConditionType::Eq => bind(args, value, term),
                ConditionType::Ne => operator_doc("$ne", bind(args, value, term)),
                ConditionType::Gt => operator_doc("$gt", bind(args, value, term)),
                ConditionType::Ge => operator_doc("$gte", bind(args, value, term)),
                ConditionType::Lt => operator_doc("$lt", bind(args, value, term)),
                ConditionType::Le => operator_doc("$lte", bind(args, value, term)),
                ConditionType::Like => {
                    let pattern = dialect.like_value(*like_style, value.clone());
                    operator_doc("$regex", bind(args, &pattern, term))
                }
                ConditionType::NotLike => {
                    let pattern = dialect.like_value(*like_style, value.clone());
                    operator_doc("$not", operator_doc("$regex", bind(args, &pattern, term)))
                }
                ConditionType::IsNull => Doc::Null,
                // `check` keeps list and range kinds out of simple predicates.
                ConditionType::IsNotNull
                | ConditionType::In
                | ConditionType::NotIn
                | ConditionType::Between
                | ConditionType::NotBetween => operator_doc("$ne", Doc::Null),
            };
            (column.clone(), doc)
        }
        DocPredicate::Between {
            column,
            negated,
            low,
            high,
            low_term,
            high_term,
        } => {
            let low = bind(args, low, low_term.as_deref());
            let high = bind(args, high, high_term.as_deref());
            if *negated {
                let below = Doc::entry(column.clone(), operator_doc("$lt", low));
                let above = Doc::entry(column.clone(), operator_doc("$gt", high));
                ("$or".to_string(), Doc::Array(vec![below, above]))
            } else {
                let range =
                    Doc::Object(vec![("$gte".to_string(), low), ("$lte".to_string(), high)]);
                (column.clone(), range)
            }
        }
        DocPredicate::In {
            column,
            negated,
            values,
            value_term,
        } => {
            let op = if *negated { "$nin" } else { "$in" };
            let items = values
                .iter()
                .map(|v| bind(args, v, value_term.as_deref()))
                .collect();
            (column.clone(), operator_doc(op, Doc::Array(items)))
        }
    }
}

/// Juxtapose distinct keys; fall back to `$and` when a key repeats.
fn conjunction(entries: Vec<(String, Doc)>) -> Doc {
    let distinct = entries
        .iter()
        .enumerate()
        .all(|(i, (k, _))| entries[..i].iter().all(|(other, _)| other != k));
    if distinct {
        Doc::Object(entries)
    } else {
        let parts = entries
            .into_iter()
            .map(|(k, v)| Doc::entry(k, v))
            .collect();
        Doc::entry("$and", Doc::Array(parts))
    }
}

/// A selected column and the field name it is rendered under.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Projection {
    pub(crate) column: String,
    pub(crate) field: String,
}

/// A field written by an update or insert.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Assignment {
    pub(crate) column: String,
    pub(crate) value: Value,
    pub(crate) term: Option<String>,
}

impl Assignment {
    /// `null` for an untemplated null, a bound argument otherwise.
    pub(crate) fn render(&self, args: &mut ArgList) -> Doc {
        if self.value.is_null() && self.term.is_none() {
            Doc::Null
        } else {
            bind(args, &self.value, self.term.as_deref())
        }
    }
}

/// Accumulates a command for a document store.
///
/// # Example
/// ```ignore
/// use cmdforge::{CommandBuilder, ConditionLogic, DocumentCommandBuilder, MongoDialect, Predicate};
///
/// let mut b = DocumentCommandBuilder::for_target("users");
/// b.add_condition(ConditionLogic::And, Predicate::gt("age", 18))?;
/// let stmt = b.build_select(&MongoDialect, false)?;
/// assert_eq!(stmt.sql, "db.users.find({age: {$gt: ?}})");
/// ```
#[derive(Debug, Clone)]
pub struct DocumentCommandBuilder {
    backend: &'static str,
    target: Target,
    projections: Vec<Projection>,
    select_all: bool,
    conditions: Vec<DocCondition>,
    state: ClauseState,
    sorts: Vec<(String, OrderType, NullsOrder)>,
    updates: Vec<Assignment>,
    inserts: Vec<Assignment>,
    args: ArgList,
}

impl Default for DocumentCommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentCommandBuilder {
    pub fn new() -> Self {
        Self::with_backend(DOCUMENT_BACKEND)
    }

    pub fn for_target(target: impl Into<Target>) -> Self {
        let mut b = Self::new();
        b.target = target.into();
        b
    }

    pub(crate) fn with_backend(backend: &'static str) -> Self {
        Self {
            backend,
            target: Target::default(),
            projections: Vec::new(),
            select_all: false,
            conditions: Vec::new(),
            state: ClauseState::Filtering,
            sorts: Vec::new(),
            updates: Vec::new(),
            inserts: Vec::new(),
            args: ArgList::new(),
        }
    }

    pub(crate) fn conditions(&self) -> &[DocCondition] {
        &self.conditions
    }

    pub(crate) fn projections(&self) -> &[Projection] {
        &self.projections
    }

    pub(crate) fn sorts(&self) -> &[(String, OrderType, NullsOrder)] {
        &self.sorts
    }

    pub(crate) fn updates(&self) -> &[Assignment] {
        &self.updates
    }

    pub(crate) fn inserts(&self) -> &[Assignment] {
        &self.inserts
    }

    pub(crate) fn args_mut(&mut self) -> &mut ArgList {
        &mut self.args
    }

    pub(crate) fn has_conditions(&self) -> bool {
        !self.conditions.is_empty()
    }

    fn unsupported(&self, operation: &'static str) -> CmdError {
        CmdError::unsupported(self.backend, operation)
    }

    fn push_condition(&mut self, logic: ConditionLogic, predicate: DocPredicate) -> CmdResult<()> {
        self.state.check_condition()?;
        self.conditions.push(DocCondition { logic, predicate });
        Ok(())
    }

    /// Check the empty-filter guard for a mutation.
    pub(crate) fn guard(&self, operation: Operation, allow_empty_filter: bool) -> CmdResult<()> {
        if !allow_empty_filter && !self.has_conditions() {
            return Err(CmdError::EmptyFilter {
                operation: operation.as_str(),
            });
        }
        Ok(())
    }

    fn filter_doc(&mut self, dialect: &dyn Dialect) -> Doc {
        let mut runs = Vec::new();
        for run in or_runs(&self.conditions) {
            let entries = run
                .iter()
                .map(|cond| {
                    let (key, value) = mongo_entry(&cond.predicate, dialect, &mut self.args);
                    if cond.logic.is_not() {
                        let negated = Doc::Array(vec![Doc::entry(key, value)]);
                        ("$nor".to_string(), negated)
                    } else {
                        (key, value)
                    }
                })
                .collect();
            runs.push(conjunction(entries));
        }
        match runs.len() {
            0 => Doc::Object(Vec::new()),
            1 => runs.remove(0),
            _ => Doc::entry("$or", Doc::Array(runs)),
        }
    }

    fn finish(&self, operation: Operation, dialect: &dyn Dialect, sql: String) -> BoundStatement {
        let stmt = BoundStatement::new(sql, self.args.as_slice().to_vec());
        log_render(operation, dialect, &stmt);
        stmt
    }
}

impl CommandBuilder for DocumentCommandBuilder {
    fn backend(&self) -> &'static str {
        self.backend
    }

    fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    fn target(&self) -> &Target {
        &self.target
    }

    fn add_condition(&mut self, logic: ConditionLogic, predicate: Predicate) -> CmdResult<()> {
        predicate.check()?;
        self.push_condition(
            logic,
            DocPredicate::Simple {
                column: field_name(predicate.column, predicate.column_term),
                kind: predicate.kind,
                value: predicate.value,
                value_term: owned_term(predicate.value_term.as_deref()),
                like_style: predicate.like_style,
            },
        )
    }

    fn add_between(
        &mut self,
        logic: ConditionLogic,
        predicate: BetweenPredicate,
    ) -> CmdResult<()> {
        self.push_condition(
            logic,
            DocPredicate::Between {
                column: field_name(predicate.column, predicate.column_term),
                negated: predicate.negated,
                low: predicate.low,
                high: predicate.high,
                low_term: owned_term(predicate.low_term.as_deref()),
                high_term: owned_term(predicate.high_term.as_deref()),
            },
        )
    }

    fn add_in(&mut self, logic: ConditionLogic, predicate: InPredicate) -> CmdResult<()> {
        predicate.check()?;
        self.push_condition(
            logic,
            DocPredicate::In {
                column: field_name(predicate.column, predicate.column_term),
                negated: predicate.negated,
                values: predicate.values,
                value_term: owned_term(predicate.value_term.as_deref()),
            },
        )
    }

    fn add_group(&mut self, _logic: ConditionLogic, _group: &mut GroupFn<'_>) -> CmdResult<()> {
        Err(self.unsupported("nested condition groups"))
    }

    fn add_raw(
        &mut self,
        _logic: ConditionLogic,
        _text: &str,
        _args: Vec<Value>,
    ) -> CmdResult<()> {
        Err(self.unsupported("raw condition fragments"))
    }

    fn add_select(&mut self, column: &str, term: Option<&str>) -> CmdResult<()> {
        self.select_all = false;
        if !self.has_select(column) {
            self.projections.push(Projection {
                column: column.to_string(),
                field: field_name(column.to_string(), owned_term(term)),
            });
        }
        Ok(())
    }

    fn add_select_custom(&mut self, _expr: &str, _args: Vec<Value>) -> CmdResult<()> {
        Err(self.unsupported("custom projections"))
    }

    fn has_select(&self, column: &str) -> bool {
        self.projections.iter().any(|p| p.column == column)
    }

    fn has_any_select(&self) -> bool {
        !self.projections.is_empty()
    }

    fn select_all(&mut self) {
        self.projections.clear();
        self.select_all = true;
    }

    fn is_select_all(&self) -> bool {
        self.select_all || self.projections.is_empty()
    }

    fn clear_select(&mut self) {
        self.projections.clear();
        self.select_all = false;
    }

    fn add_group_by(&mut self, _column: &str, _term: Option<&str>) -> CmdResult<()> {
        Err(self.unsupported("grouping"))
    }

    fn add_order_by(
        &mut self,
        column: &str,
        term: Option<&str>,
        order: OrderType,
        nulls: NullsOrder,
    ) -> CmdResult<()> {
        self.state = ClauseState::Ordering;
        let field = field_name(column.to_string(), owned_term(term));
        self.sorts.push((field, order, nulls));
        Ok(())
    }

    fn add_update_set(
        &mut self,
        column: &str,
        value: Value,
        term: Option<&str>,
    ) -> CmdResult<()> {
        self.updates.push(Assignment {
            column: column.to_string(),
            value,
            term: owned_term(term),
        });
        Ok(())
    }

    fn clear_update_set(&mut self) {
        self.updates.clear();
    }

    fn add_insert(&mut self, column: &str, value: Value, term: Option<&str>) -> CmdResult<()> {
        if self.inserts.iter().any(|a| a.column == column) {
            return Err(CmdError::validation(format!(
                "column '{column}' inserted twice"
            )));
        }
        self.inserts.push(Assignment {
            column: column.to_string(),
            value,
            term: owned_term(term),
        });
        Ok(())
    }

    fn args(&self) -> &ArgList {
        &self.args
    }

    fn clear_args(&mut self) {
        self.args.clear();
    }

    fn clear(&mut self) {
        *self = Self::with_backend(self.backend);
    }

    fn build_select(&mut self, dialect: &dyn Dialect, quote: bool) -> CmdResult<BoundStatement> {
        let collection = dialect.table_name(quote, &self.target);
        let filter = self.filter_doc(dialect);
        let mut sql = format!("{collection}.find({}", filter.to_shell());
        if !self.select_all && !self.projections.is_empty() {
            let projection = self
                .projections
                .iter()
                .map(|p| (p.field.clone(), Doc::Int(1)))
                .collect();
            sql.push_str(", ");
            sql.push_str(&Doc::Object(projection).to_shell());
        }
        sql.push(')');
        if !self.sorts.is_empty() {
            let sort = self
                .sorts
                .iter()
                .map(|(c, order, _)| {
                    let dir = if *order == OrderType::Desc { -1 } else { 1 };
                    (c.clone(), Doc::Int(dir))
                })
                .collect();
            sql.push_str(".sort(");
            sql.push_str(&Doc::Object(sort).to_shell());
            sql.push(')');
        }

        Ok(self.finish(Operation::Select, dialect, sql))
    }

    fn build_update(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        allow_empty_filter: bool,
    ) -> CmdResult<BoundStatement> {
        self.guard(Operation::Update, allow_empty_filter)?;
        if self.updates.is_empty() {
            return Err(CmdError::validation("UPDATE requires at least one assignment"));
        }

        let collection = dialect.table_name(quote, &self.target);
        let filter = self.filter_doc(dialect);
        let mut set = Vec::with_capacity(self.updates.len());
        for assignment in &self.updates {
            set.push((assignment.column.clone(), assignment.render(&mut self.args)));
        }
        let update = Doc::entry("$set", Doc::Object(set));
        let sql = format!(
            "{collection}.updateMany({}, {})",
            filter.to_shell(),
            update.to_shell()
        );

        Ok(self.finish(Operation::Update, dialect, sql))
    }

    fn build_delete(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        allow_empty_filter: bool,
    ) -> CmdResult<BoundStatement> {
        self.guard(Operation::Delete, allow_empty_filter)?;

        let collection = dialect.table_name(quote, &self.target);
        let filter = self.filter_doc(dialect);
        let sql = format!("{collection}.deleteMany({})", filter.to_shell());

        Ok(self.finish(Operation::Delete, dialect, sql))
    }

    fn build_insert(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        primary_key: &[String],
        strategy: ConflictStrategy,
    ) -> CmdResult<BoundStatement> {
        if self.inserts.is_empty() {
            return Err(CmdError::validation("INSERT requires at least one column"));
        }
        let columns: Vec<String> = self.inserts.iter().map(|a| a.column.clone()).collect();
        // Document stores report no conflict support, so this always lands on `Into`.
        resolve_conflict(dialect, primary_key, &columns, strategy);

        let collection = dialect.table_name(quote, &self.target);
        let mut fields = Vec::with_capacity(self.inserts.len());
        for assignment in &self.inserts {
            fields.push((assignment.column.clone(), assignment.render(&mut self.args)));
        }
        let sql = format!(
            "{collection}.insertMany([{}])",
            Doc::Object(fields).to_shell()
        );

        Ok(self.finish(Operation::Insert, dialect, sql))
    }
}
