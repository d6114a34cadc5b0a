//! Condition vocabulary shared by every builder.
//!
//! A predicate names a column, an operator and its operands. Either side may
//! carry an expression template that replaces the plain column name or the
//! `?` placeholder at render time, e.g. `abs(age) > abs(?)`.
//!
//! # Example
//! ```ignore
//! use cmdforge::{ConditionLogic, Predicate};
//!
//! builder.add_condition(ConditionLogic::And, Predicate::gt("age", 18))?;
//! builder.add_condition(
//!     ConditionLogic::Or,
//!     Predicate::eq("location", "POINT(1 2)").value_term("ST_GeomFromText(?)"),
//! )?;
//! ```

use crate::error::{CmdError, CmdResult};
use crate::value::Value;

/// Connector placed before a predicate, with optional negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionLogic {
    #[default]
    And,
    Or,
    AndNot,
    OrNot,
}

impl ConditionLogic {
    pub fn new(or: bool, not: bool) -> Self {
        match (or, not) {
            (false, false) => Self::And,
            (true, false) => Self::Or,
            (false, true) => Self::AndNot,
            (true, true) => Self::OrNot,
        }
    }

    /// `OR` for {Or, OrNot}; `AND` otherwise.
    pub fn connector(self) -> &'static str {
        if self.is_or() { "OR" } else { "AND" }
    }

    pub fn is_or(self) -> bool {
        matches!(self, Self::Or | Self::OrNot)
    }

    pub fn is_not(self) -> bool {
        matches!(self, Self::AndNot | Self::OrNot)
    }
}

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionType {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    NotLike,
    IsNull,
    IsNotNull,
    In,
    NotIn,
    Between,
    NotBetween,
}

impl ConditionType {
    /// Fixed SQL operator text.
    pub fn operator(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Between => "BETWEEN",
            Self::NotBetween => "NOT BETWEEN",
        }
    }

    /// Null checks carry no value operand.
    pub fn is_null_check(self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }

    pub fn is_like(self) -> bool {
        matches!(self, Self::Like | Self::NotLike)
    }

    pub fn is_in(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    pub fn is_between(self) -> bool {
        matches!(self, Self::Between | Self::NotBetween)
    }
}

/// Where a LIKE pattern places its wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LikeStyle {
    /// Wildcards on both sides: contains.
    #[default]
    Default,
    /// Wildcard on the left only: ends with.
    Left,
    /// Wildcard on the right only: starts with.
    Right,
}

fn term(t: impl Into<String>) -> Option<String> {
    let t = t.into();
    if t.trim().is_empty() { None } else { Some(t) }
}

/// A single-operand (or operand-less) predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub column_term: Option<String>,
    pub kind: ConditionType,
    pub value: Option<Value>,
    pub value_term: Option<String>,
    pub like_style: LikeStyle,
}

impl Predicate {
    pub fn new(column: impl Into<String>, kind: ConditionType, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            column_term: None,
            kind,
            value: Some(value.into()),
            value_term: None,
            like_style: LikeStyle::Default,
        }
    }

    fn operand_less(column: impl Into<String>, kind: ConditionType) -> Self {
        Self {
            column: column.into(),
            column_term: None,
            kind,
            value: None,
            value_term: None,
            like_style: LikeStyle::Default,
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, ConditionType::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, ConditionType::Ne, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, ConditionType::Gt, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, ConditionType::Ge, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, ConditionType::Lt, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, ConditionType::Le, value)
    }

    pub fn like(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, ConditionType::Like, value)
    }

    pub fn not_like(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, ConditionType::NotLike, value)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::operand_less(column, ConditionType::IsNull)
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::operand_less(column, ConditionType::IsNotNull)
    }

    /// Replace the column name with an expression, e.g. `abs(age)`.
    pub fn column_term(mut self, t: impl Into<String>) -> Self {
        self.column_term = term(t);
        self
    }

    /// Replace the `?` placeholder with a template; the value stays bound.
    pub fn value_term(mut self, t: impl Into<String>) -> Self {
        self.value_term = term(t);
        self
    }

    pub fn like_style(mut self, style: LikeStyle) -> Self {
        self.like_style = style;
        self
    }

    pub(crate) fn check(&self) -> CmdResult<()> {
        if self.kind.is_in() || self.kind.is_between() {
            return Err(CmdError::validation(format!(
                "{} on '{}' needs a dedicated predicate",
                self.kind.operator(),
                self.column
            )));
        }
        if !self.kind.is_null_check() && self.value.is_none() {
            return Err(CmdError::validation(format!(
                "{} on '{}' is missing its value",
                self.kind.operator(),
                self.column
            )));
        }
        Ok(())
    }
}

/// `column [NOT] BETWEEN low AND high`.
#[derive(Debug, Clone, PartialEq)]
pub struct BetweenPredicate {
    pub column: String,
    pub column_term: Option<String>,
    pub negated: bool,
    pub low: Value,
    pub high: Value,
    pub low_term: Option<String>,
    pub high_term: Option<String>,
}

impl BetweenPredicate {
    pub fn new(column: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            column_term: None,
            negated: false,
            low: low.into(),
            high: high.into(),
            low_term: None,
            high_term: None,
        }
    }

    pub fn not(mut self) -> Self {
        self.negated = true;
        self
    }

    pub fn kind(&self) -> ConditionType {
        if self.negated {
            ConditionType::NotBetween
        } else {
            ConditionType::Between
        }
    }

    pub fn column_term(mut self, t: impl Into<String>) -> Self {
        self.column_term = term(t);
        self
    }

    /// Template applied to both bounds.
    pub fn value_term(mut self, t: impl Into<String>) -> Self {
        let t = term(t);
        self.low_term = t.clone();
        self.high_term = t;
        self
    }
}

/// `column [NOT] IN ( v1 , v2 , … )`.
#[derive(Debug, Clone, PartialEq)]
pub struct InPredicate {
    pub column: String,
    pub column_term: Option<String>,
    pub negated: bool,
    pub values: Vec<Value>,
    pub value_term: Option<String>,
}

impl InPredicate {
    pub fn new<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            column: column.into(),
            column_term: None,
            negated: false,
            values: values.into_iter().map(Into::into).collect(),
            value_term: None,
        }
    }

    pub fn not(mut self) -> Self {
        self.negated = true;
        self
    }

    pub fn kind(&self) -> ConditionType {
        if self.negated {
            ConditionType::NotIn
        } else {
            ConditionType::In
        }
    }

    pub fn column_term(mut self, t: impl Into<String>) -> Self {
        self.column_term = term(t);
        self
    }

    /// Template applied to every element.
    pub fn value_term(mut self, t: impl Into<String>) -> Self {
        self.value_term = term(t);
        self
    }

    pub(crate) fn check(&self) -> CmdResult<()> {
        if self.values.is_empty() {
            return Err(CmdError::validation(format!(
                "{} on '{}' needs at least one value",
                self.kind().operator(),
                self.column
            )));
        }
        Ok(())
    }
}
