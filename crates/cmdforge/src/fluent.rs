//! Chaining facade over any [`CommandBuilder`].
//!
//! `Qb` keeps a pending connector so conditions read left to right
//! (`eq(a, 1).or().eq(b, 2)`), and records the first construction error
//! instead of failing each call. The error surfaces when the command is built.
//!
//! # Example
//! ```ignore
//! use cmdforge::{Qb, MySqlDialect};
//!
//! let mut q = Qb::sql("user_info");
//! q.eq("a", 1).or().eq("b", 2).and().not().eq("c", 3);
//! let stmt = q.build_delete(&MySqlDialect, false, false)?;
//! assert_eq!(stmt.sql, "DELETE FROM user_info WHERE a = ? OR b = ? AND NOT c = ?");
//! ```

use crate::command::{
    BoundStatement, CommandBuilder, ConflictStrategy, DocumentCommandBuilder, EndpointPaths,
    NullsOrder, OrderType, SearchCommandBuilder, SqlCommandBuilder, Target,
};
use crate::condition::{BetweenPredicate, ConditionLogic, InPredicate, LikeStyle, Predicate};
use crate::dialect::Dialect;
use crate::error::{CmdError, CmdResult};
use crate::value::Value;

/// Fluent wrapper holding a builder, a pending connector and the first error.
#[derive(Debug, Clone)]
pub struct Qb<B> {
    builder: B,
    pending_or: bool,
    pending_not: bool,
    error: Option<CmdError>,
}

impl Qb<SqlCommandBuilder> {
    pub fn sql(target: impl Into<Target>) -> Self {
        Self::new(SqlCommandBuilder::for_target(target))
    }
}

impl Qb<DocumentCommandBuilder> {
    pub fn document(target: impl Into<Target>) -> Self {
        Self::new(DocumentCommandBuilder::for_target(target))
    }
}

impl<P: EndpointPaths> Qb<SearchCommandBuilder<P>> {
    pub fn search(paths: P, target: impl Into<Target>) -> Self {
        let mut builder = SearchCommandBuilder::new(paths);
        builder.set_target(target.into());
        Self::new(builder)
    }
}

impl<B: CommandBuilder> Qb<B> {
    pub fn new(builder: B) -> Self {
        Self {
            builder,
            pending_or: false,
            pending_not: false,
            error: None,
        }
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut B {
        &mut self.builder
    }

    pub fn into_inner(self) -> B {
        self.builder
    }

    /// The first error recorded while chaining, if any.
    pub fn error(&self) -> Option<&CmdError> {
        self.error.as_ref()
    }

    pub fn check(&self) -> CmdResult<()> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn record(&mut self, result: CmdResult<()>) -> &mut Self {
        if let Err(e) = result {
            self.error.get_or_insert(e);
        }
        self
    }

    fn take_logic(&mut self) -> ConditionLogic {
        let logic = ConditionLogic::new(self.pending_or, self.pending_not);
        self.pending_or = false;
        self.pending_not = false;
        logic
    }

    pub fn target(&mut self, target: impl Into<Target>) -> &mut Self {
        self.builder.set_target(target.into());
        self
    }

    /// Join the next condition with OR.
    pub fn or(&mut self) -> &mut Self {
        self.pending_or = true;
        self
    }

    pub fn and(&mut self) -> &mut Self {
        self.pending_or = false;
        self
    }

    /// Negate the next condition.
    pub fn not(&mut self) -> &mut Self {
        self.pending_not = true;
        self
    }

    pub fn predicate(&mut self, predicate: Predicate) -> &mut Self {
        let logic = self.take_logic();
        let result = self.builder.add_condition(logic, predicate);
        self.record(result)
    }

    pub fn eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.predicate(Predicate::eq(column, value))
    }

    pub fn ne(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.predicate(Predicate::ne(column, value))
    }

    pub fn gt(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.predicate(Predicate::gt(column, value))
    }

    pub fn ge(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.predicate(Predicate::ge(column, value))
    }

    pub fn lt(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.predicate(Predicate::lt(column, value))
    }

    pub fn le(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.predicate(Predicate::le(column, value))
    }

    /// Contains.
    pub fn like(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.predicate(Predicate::like(column, value))
    }

    /// Ends with.
    pub fn like_left(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.predicate(Predicate::like(column, value).like_style(LikeStyle::Left))
    }

    /// Starts with.
    pub fn like_right(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.predicate(Predicate::like(column, value).like_style(LikeStyle::Right))
    }

    pub fn not_like(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.predicate(Predicate::not_like(column, value))
    }

    pub fn is_null(&mut self, column: &str) -> &mut Self {
        self.predicate(Predicate::is_null(column))
    }

    pub fn is_not_null(&mut self, column: &str) -> &mut Self {
        self.predicate(Predicate::is_not_null(column))
    }

    pub fn between_predicate(&mut self, predicate: BetweenPredicate) -> &mut Self {
        let logic = self.take_logic();
        let result = self.builder.add_between(logic, predicate);
        self.record(result)
    }

    pub fn between(
        &mut self,
        column: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> &mut Self {
        self.between_predicate(BetweenPredicate::new(column, low, high))
    }

    pub fn not_between(
        &mut self,
        column: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> &mut Self {
        self.between_predicate(BetweenPredicate::new(column, low, high).not())
    }

    pub fn in_predicate(&mut self, predicate: InPredicate) -> &mut Self {
        let logic = self.take_logic();
        let result = self.builder.add_in(logic, predicate);
        self.record(result)
    }

    pub fn in_list<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.in_predicate(InPredicate::new(column, values))
    }

    pub fn not_in<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.in_predicate(InPredicate::new(column, values).not())
    }

    /// Parenthesized group of conditions built by `f`.
    pub fn group<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut Qb<&mut dyn CommandBuilder>),
    {
        let logic = self.take_logic();
        let mut f = Some(f);
        let result = self.builder.add_group(logic, &mut |b: &mut dyn CommandBuilder| {
            let mut inner = Qb::new(b);
            if let Some(f) = f.take() {
                f(&mut inner);
            }
            inner.check()
        });
        self.record(result)
    }

    pub fn raw(&mut self, text: &str, args: Vec<Value>) -> &mut Self {
        let logic = self.take_logic();
        let result = self.builder.add_raw(logic, text, args);
        self.record(result)
    }

    pub fn select(&mut self, columns: &[&str]) -> &mut Self {
        for column in columns {
            let result = self.builder.add_select(column, None);
            self.record(result);
        }
        self
    }

    /// Select `term` under the name `column`.
    pub fn select_as(&mut self, column: &str, term: &str) -> &mut Self {
        let result = self.builder.add_select(column, Some(term));
        self.record(result)
    }

    pub fn select_custom(&mut self, expr: &str, args: Vec<Value>) -> &mut Self {
        let result = self.builder.add_select_custom(expr, args);
        self.record(result)
    }

    pub fn select_all(&mut self) -> &mut Self {
        self.builder.select_all();
        self
    }

    pub fn group_by(&mut self, column: &str) -> &mut Self {
        let result = self.builder.add_group_by(column, None);
        self.record(result)
    }

    pub fn order_by(&mut self, column: &str, order: OrderType, nulls: NullsOrder) -> &mut Self {
        let result = self.builder.add_order_by(column, None, order, nulls);
        self.record(result)
    }

    pub fn order_by_asc(&mut self, column: &str) -> &mut Self {
        self.order_by(column, OrderType::Asc, NullsOrder::Default)
    }

    pub fn order_by_desc(&mut self, column: &str) -> &mut Self {
        self.order_by(column, OrderType::Desc, NullsOrder::Default)
    }

    /// Order by an expression, e.g. `year(create_time)`.
    pub fn order_by_term(&mut self, column: &str, term: &str, order: OrderType) -> &mut Self {
        let result = self
            .builder
            .add_order_by(column, Some(term), order, NullsOrder::Default);
        self.record(result)
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        let result = self.builder.add_update_set(column, value.into(), None);
        self.record(result)
    }

    /// Assign `term` (e.g. `upper(?)`) with `value` bound inside it.
    pub fn set_term(&mut self, column: &str, value: impl Into<Value>, term: &str) -> &mut Self {
        let result = self.builder.add_update_set(column, value.into(), Some(term));
        self.record(result)
    }

    pub fn value(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        let result = self.builder.add_insert(column, value.into(), None);
        self.record(result)
    }

    pub fn value_term(&mut self, column: &str, value: impl Into<Value>, term: &str) -> &mut Self {
        let result = self.builder.add_insert(column, value.into(), Some(term));
        self.record(result)
    }

    pub fn build_select(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
    ) -> CmdResult<BoundStatement> {
        self.check()?;
        self.builder.build_select(dialect, quote)
    }

    pub fn build_update(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        allow_empty_filter: bool,
    ) -> CmdResult<BoundStatement> {
        self.check()?;
        self.builder.build_update(dialect, quote, allow_empty_filter)
    }

    pub fn build_delete(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        allow_empty_filter: bool,
    ) -> CmdResult<BoundStatement> {
        self.check()?;
        self.builder.build_delete(dialect, quote, allow_empty_filter)
    }

    pub fn build_insert(
        &mut self,
        dialect: &dyn Dialect,
        quote: bool,
        primary_key: &[String],
        strategy: ConflictStrategy,
    ) -> CmdResult<BoundStatement> {
        self.check()?;
        self.builder.build_insert(dialect, quote, primary_key, strategy)
    }

    /// Forget pending connectors, the recorded error and all builder state.
    pub fn clear(&mut self) -> &mut Self {
        self.builder.clear();
        self.pending_or = false;
        self.pending_not = false;
        self.error = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MongoDialect, MySqlDialect};

    #[test]
    fn pending_connector_is_consumed() {
        let mut q = Qb::sql("t");
        q.eq("a", 1).or().eq("b", 2).eq("c", 3);
        let stmt = q.build_select(&MySqlDialect, false).unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM t WHERE a = ? OR b = ? AND c = ?");
    }

    #[test]
    fn first_error_is_kept() {
        let mut q = Qb::sql("t");
        q.group_by("a").eq("b", 1).in_list("c", Vec::<i32>::new());
        let err = q.build_select(&MySqlDialect, false).unwrap_err();
        assert!(err.is_state());
    }

    #[test]
    fn nested_group_through_trait_object() {
        let mut q = Qb::sql("user_info");
        q.group(|g| {
            g.eq("seq", 1);
        });
        let stmt = q.build_delete(&MySqlDialect, false, false).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM user_info WHERE ( seq = ? )");
    }

    #[test]
    fn document_group_error_surfaces_at_build() {
        let mut q = Qb::document("users");
        q.eq("a", 1).or().group(|g| {
            g.eq("b", 2);
        });
        assert!(q.error().is_some_and(CmdError::is_unsupported));
        assert!(q.build_select(&MongoDialect, false).is_err());
        q.clear();
        assert!(q.check().is_ok());
    }
}
