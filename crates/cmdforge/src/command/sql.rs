//! Relational SQL builder.

use super::{
    BoundStatement, ClauseState, CommandBuilder, ConflictStrategy, GroupFn, NullsOrder,
    Operation, OrderType, Target, log_render, resolve_conflict,
};
use crate::condition::{BetweenPredicate, ConditionLogic, InPredicate, Predicate};
use crate::dialect::Dialect;
use crate::error::{CmdError, CmdResult};
use crate::segment::{MergeSegment, Projections, RenderCtx, Segment};
use crate::value::{ArgList, Value};

fn owned_term(term: Option<&str>) -> Option<String> {
    term.filter(|t| !t.trim().is_empty()).map(str::to_string)
}

/// Builds SELECT / INSERT / UPDATE / DELETE statements for any SQL [`Dialect`].
///
/// WHERE, GROUP BY and ORDER BY share one flat segment sequence. Nested
/// condition groups are plain parenthesis markers in that sequence, and the
/// GROUP BY / ORDER BY lists are appended to it the first time they are used.
///
/// # Example
/// ```ignore
/// use cmdforge::{CommandBuilder, ConditionLogic, MySqlDialect, OrderType, NullsOrder, Predicate, SqlCommandBuilder};
///
/// let mut b = SqlCommandBuilder::for_target("user_table");
/// b.add_select("id", None)?;
/// b.add_condition(ConditionLogic::And, Predicate::gt("age", 18))?;
/// b.add_order_by("create_time", None, OrderType::Desc, NullsOrder::Default)?;
/// let stmt = b.build_select(&MySqlDialect, false)?;
/// assert_eq!(stmt.sql, "SELECT id FROM user_table WHERE age > ? ORDER BY create_time DESC");
/// ```
#[derive(Debug, Clone)]
pub struct SqlCommandBuilder {
    target: Target,
    select: MergeSegment,
    select_terms: Projections,
    select_all: bool,
    filter: MergeSegment,
    has_conditions: bool,
    state: ClauseState,
    group_index: Option<usize>,
    order_index: Option<usize>,
    update_set: MergeSegment,
    insert_columns: Vec<String>,
    insert_values: Vec<(Value, Option<String>)>,
    args: ArgList,
}

impl Default for SqlCommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlCommandBuilder {
    pub fn new() -> Self {
        Self {
            target: Target::default(),
            select: MergeSegment::listed(),
            select_terms: Projections::new(),
            select_all: false,
            filter: MergeSegment::spaced(),
            has_conditions: false,
            state: ClauseState::Filtering,
            group_index: None,
            order_index: None,
            update_set: MergeSegment::listed(),
            insert_columns: Vec::new(),
            insert_values: Vec::new(),
            args: ArgList::new(),
        }
    }

    pub fn for_target(target: impl Into<Target>) -> Self {
        let mut b = Self::new();
        b.target = target.into();
        b
    }

    /// Whether at least one real predicate (not just grouping or ordering) was added.
    pub fn has_conditions(&self) -> bool {
        self.has_conditions
    }

    pub fn state(&self) -> ClauseState {
        self.state
    }

    fn push_logic(&mut self, logic: ConditionLogic) {
        if matches!(self.filter.last(), Some(last) if *last != Segment::OpenParen) {
            self.filter.push(Segment::Keyword(logic.connector()));
        }
        if logic.is_not() {
            self.filter.push(Segment::Keyword("NOT"));
        }
    }

    fn push_predicate(&mut self, logic: ConditionLogic, expr: MergeSegment) {
        self.push_logic(logic);
        self.filter.push(Segment::Merge(expr));
        self.has_conditions = true;
    }

    /// Position of the list following `keyword`, created on first use.
    fn clause_list(&mut self, keyword: &'static str, index: Option<usize>) -> usize {
        match index {
            Some(i) => i,
            None => {
                self.filter.push(Segment::Keyword(keyword));
                self.filter.push(Segment::Merge(MergeSegment::listed()));
                self.filter.len() - 1
            }
        }
    }

    fn clause_list_mut(&mut self, index: usize) -> CmdResult<&mut MergeSegment> {
        self.filter
            .merge_at_mut(index)
            .ok_or_else(|| CmdError::validation("clause list displaced from the filter sequence"))
    }

    fn render_filter(
        filter: &MergeSegment,
        has_conditions: bool,
        sql: &mut String,
        ctx: &mut RenderCtx<'_>,
    ) {
        if filter.is_empty() {
            return;
        }
        sql.push(' ');
        if has_conditions {
            sql.push_str("WHERE ");
        }
        sql.push_str(&filter.render(ctx));
    }

    fn finish(&self, operation: Operation, dialect: &dyn Dialect, sql: String) -> BoundStatement {
        let stmt = BoundStatement::new(sql, self.args.as_slice().to_vec());
        log_render(operation, dialect, &stmt);
        stmt
    }
}

impl CommandBuilder for SqlCommandBuilder {
    fn backend(&self) -> &'static str {
        "sql"
    }

    fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    fn target(&self) -> &Target {
        &self.target
    }

    fn add_condition(&mut self, logic: ConditionLogic, predicate: Predicate) -> CmdResult<()> {
        self.state.check_condition()?;
        predicate.check()?;

        let Predicate {
            column,
            column_term,
            kind,
            value,
            value_term,
            like_style,
        } = predicate;
        let value_term = owned_term(value_term.as_deref());
        let mut expr = MergeSegment::spaced()
            .with(Segment::column(column, owned_term(column_term.as_deref())))
            .with(Segment::Keyword(kind.operator()));
        if !kind.is_null_check() {
            let value = value.unwrap_or(Value::Null);
            expr.push(if kind.is_like() {
                Segment::Like {
                    value,
                    style: like_style,
                    term: value_term,
                }
            } else {
                Segment::value(value, value_term)
            });
        }
        self.push_predicate(logic, expr);
        Ok(())
    }

    fn add_between(
        &mut self,
        logic: ConditionLogic,
        predicate: BetweenPredicate,
    ) -> CmdResult<()> {
        self.state.check_condition()?;
        let kind = predicate.kind();
        let column_term = owned_term(predicate.column_term.as_deref());
        let expr = MergeSegment::spaced()
            .with(Segment::column(predicate.column, column_term))
            .with(Segment::Keyword(kind.operator()))
            .with(Segment::value(predicate.low, owned_term(predicate.low_term.as_deref())))
            .with(Segment::Keyword("AND"))
            .with(Segment::value(predicate.high, owned_term(predicate.high_term.as_deref())));
        self.push_predicate(logic, expr);
        Ok(())
    }

    fn add_in(&mut self, logic: ConditionLogic, predicate: InPredicate) -> CmdResult<()> {
        self.state.check_condition()?;
        predicate.check()?;
        let kind = predicate.kind();
        let value_term = owned_term(predicate.value_term.as_deref());
        let mut values = MergeSegment::new(" , ");
        for value in predicate.values {
            values.push(Segment::value(value, value_term.clone()));
        }
        let expr = MergeSegment::spaced()
            .with(Segment::column(predicate.column, owned_term(predicate.column_term.as_deref())))
            .with(Segment::Keyword(kind.operator()))
            .with(Segment::OpenParen)
            .with(Segment::Merge(values))
            .with(Segment::CloseParen);
        self.push_predicate(logic, expr);
        Ok(())
    }

    fn add_group(&mut self, logic: ConditionLogic, group: &mut GroupFn<'_>) -> CmdResult<()> {
        self.state.check_condition()?;
        let mark = self.filter.len();
        let had_conditions = self.has_conditions;

        self.push_logic(logic);
        self.filter.push(Segment::OpenParen);
        let result = group(self).and_then(|()| self.state.check_condition());

        // A failed or empty group leaves no trace in the filter.
        if result.is_err() || matches!(self.filter.last(), Some(Segment::OpenParen)) {
            self.filter.truncate(mark);
            self.has_conditions = had_conditions;
        } else {
            self.filter.push(Segment::CloseParen);
        }
        result
    }

    fn add_raw(&mut self, logic: ConditionLogic, text: &str, args: Vec<Value>) -> CmdResult<()> {
        self.state.check_condition()?;
        if text.trim().is_empty() {
            return Err(CmdError::validation("raw condition text is empty"));
        }
        self.push_logic(logic);
        self.filter.push(Segment::Raw {
            text: text.to_string(),
            args,
        });
        self.has_conditions = true;
        Ok(())
    }

    fn add_select(&mut self, column: &str, term: Option<&str>) -> CmdResult<()> {
        let term = owned_term(term);
        self.select_all = false;
        self.select.push(Segment::Projection {
            column: column.to_string(),
            term: term.clone(),
        });
        self.select_terms.insert(column.to_string(), term);
        Ok(())
    }

    fn add_select_custom(&mut self, expr: &str, args: Vec<Value>) -> CmdResult<()> {
        self.select_all = false;
        self.select.push(Segment::Raw {
            text: expr.to_string(),
            args,
        });
        Ok(())
    }

    fn has_select(&self, column: &str) -> bool {
        self.select_terms.contains_key(column)
    }

    fn has_any_select(&self) -> bool {
        !self.select.is_empty()
    }

    fn select_all(&mut self) {
        self.select.clear();
        self.select_terms.clear();
        self.select_all = true;
    }

    fn is_select_all(&self) -> bool {
        self.select_all || self.select.is_empty()
    }

    fn clear_select(&mut self) {
        self.select.clear();
        self.select_terms.clear();
        self.select_all = false;
    }

    fn add_group_by(&mut self, column: &str, term: Option<&str>) -> CmdResult<()> {
        self.state.check_group_by()?;
        let index = self.clause_list("GROUP BY", self.group_index);
        self.group_index = Some(index);
        self.state = ClauseState::Grouping;

        let item = Segment::GroupItem {
            column: column.to_string(),
            group_term: owned_term(term),
        };
        self.clause_list_mut(index)?.push(item);
        Ok(())
    }

    fn add_order_by(
        &mut self,
        column: &str,
        term: Option<&str>,
        order: OrderType,
        nulls: NullsOrder,
    ) -> CmdResult<()> {
        let index = self.clause_list("ORDER BY", self.order_index);
        self.order_index = Some(index);
        self.state = ClauseState::Ordering;

        let item = Segment::OrderItem {
            column: column.to_string(),
            order_term: owned_term(term),
            order,
            nulls,
        };
        self.clause_list_mut(index)?.push(item);
        Ok(())
    }

    fn add_update_set(
        &mut self,
        column: &str,
        value: Value,
        term: Option<&str>,
    ) -> CmdResult<()> {
        self.update_set.push(Segment::Assignment {
            column: column.to_string(),
            value,
            term: owned_term(term),
        });
        Ok(())
    }

    fn clear_update_set(&mut self) {
        self.update_set.clear();
    }

    fn add_insert(&mut self, column: &str, value: Value, term: Option<&str>) -> CmdResult<()> {
        if self.insert_columns.iter().any(|c| c == column) {
            return Err(CmdError::validation(format!(
                "column '{column}' inserted twice"
            )));
        }
        self.insert_columns.push(column.to_string());
        self.insert_values.push((value, owned_term(term)));
        Ok(())
    }

    fn args(&self) -> &ArgList {
        &self.args
    }

    fn clear_args(&mut self) {
        self.args.clear();
    }

    fn clear(&mut self) {
        *self = Self::new();
    }

    fn build_select(&mut self, dialect: &dyn Dialect, quote: bool) -> CmdResult<BoundStatement> {
        let mut sql = String::from("SELECT ");
        let mut ctx =
            RenderCtx::new(quote, dialect, &mut self.args).with_projections(&self.select_terms);
        if self.select_all || self.select.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select.render(&mut ctx));
        }
        sql.push_str(" FROM ");
        sql.push_str(&Segment::Table(self.target.clone()).render(&mut ctx));
        Self::render_filter(&self.filter, self.has_conditions, &mut sql, &mut ctx);

        Ok(self.finish(Operation::Select, dialect, sql))
    }

    fn build_update(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        allow_empty_filter: bool,
    ) -> CmdResult<BoundStatement> {
        if !allow_empty_filter && !self.has_conditions {
            return Err(CmdError::EmptyFilter {
                operation: Operation::Update.as_str(),
            });
        }
        if self.update_set.is_empty() {
            return Err(CmdError::validation("UPDATE requires at least one assignment"));
        }

        let mut ctx = RenderCtx::new(quote, dialect, &mut self.args);
        let mut sql = String::from("UPDATE ");
        sql.push_str(&Segment::Table(self.target.clone()).render(&mut ctx));
        sql.push_str(" SET ");
        sql.push_str(&self.update_set.render(&mut ctx));
        Self::render_filter(&self.filter, self.has_conditions, &mut sql, &mut ctx);

        Ok(self.finish(Operation::Update, dialect, sql))
    }

    fn build_delete(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        allow_empty_filter: bool,
    ) -> CmdResult<BoundStatement> {
        if !allow_empty_filter && !self.has_conditions {
            return Err(CmdError::EmptyFilter {
                operation: Operation::Delete.as_str(),
            });
        }

        let mut ctx = RenderCtx::new(quote, dialect, &mut self.args);
        let mut sql = String::from("DELETE FROM ");
        sql.push_str(&Segment::Table(self.target.clone()).render(&mut ctx));
        Self::render_filter(&self.filter, self.has_conditions, &mut sql, &mut ctx);

        Ok(self.finish(Operation::Delete, dialect, sql))
    }

    fn build_insert(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        primary_key: &[String],
        strategy: ConflictStrategy,
    ) -> CmdResult<BoundStatement> {
        if self.insert_columns.is_empty() {
            return Err(CmdError::validation("INSERT requires at least one column"));
        }

        let strategy = resolve_conflict(dialect, primary_key, &self.insert_columns, strategy);
        let table = dialect.table_name(quote, &self.target);
        let mut terms = Vec::with_capacity(self.insert_values.len());
        for (value, term) in &self.insert_values {
            self.args.push(value.clone());
            terms.push(term.clone().unwrap_or_else(|| "?".to_string()));
        }

        let columns = &self.insert_columns;
        let sql = match strategy {
            ConflictStrategy::Into => dialect.insert_into(quote, &table, columns, &terms),
            ConflictStrategy::Ignore => {
                dialect.insert_ignore(quote, &table, primary_key, columns, &terms)
            }
            ConflictStrategy::Update => {
                dialect.insert_replace(quote, &table, primary_key, columns, &terms)
            }
        };

        Ok(self.finish(Operation::Insert, dialect, sql))
    }
}
