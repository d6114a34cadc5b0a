//! Deferred render segments.
//!
//! Builders record what a clause will say as [`Segment`]s without knowing the
//! target dialect. Rendering walks the segments with a [`RenderCtx`] carrying
//! the quote flag, the dialect and the argument list, so one accumulated
//! command renders against any dialect and bound values land in the argument
//! list in exactly the order their placeholders appear.

use std::collections::HashMap;

use crate::command::{NullsOrder, OrderType, Target};
use crate::condition::LikeStyle;
use crate::dialect::Dialect;
use crate::value::{ArgList, Value};

/// Projected columns and their expression templates, keyed by column name.
pub type Projections = HashMap<String, Option<String>>;

/// Everything a segment needs at render time.
pub struct RenderCtx<'a> {
    pub quote: bool,
    pub dialect: &'a dyn Dialect,
    args: &'a mut ArgList,
    projections: Option<&'a Projections>,
}

impl<'a> RenderCtx<'a> {
    pub fn new(quote: bool, dialect: &'a dyn Dialect, args: &'a mut ArgList) -> Self {
        Self {
            quote,
            dialect,
            args,
            projections: None,
        }
    }

    /// Let grouping and ordering keys reuse the projection as it stands now.
    pub fn with_projections(mut self, projections: &'a Projections) -> Self {
        self.projections = Some(projections);
        self
    }

    /// Expression template the column is projected under, if any.
    pub fn select_term(&self, column: &str) -> Option<&'a str> {
        self.projections
            .and_then(|p| p.get(column))
            .and_then(|t| t.as_deref())
    }

    pub fn push_arg(&mut self, value: Value) {
        self.args.push(value);
    }

    pub fn fmt_name(&self, name: &str) -> String {
        self.dialect.fmt_name(self.quote, name)
    }
}

/// One deferred fragment of command text.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Keyword(&'static str),
    OpenParen,
    CloseParen,
    /// A column name, or its expression template.
    Column { name: String, term: Option<String> },
    Table(Target),
    /// A bound value rendered as `?` or its template.
    Value { value: Value, term: Option<String> },
    /// A LIKE operand; the dialect formats both text and value.
    Like {
        value: Value,
        style: LikeStyle,
        term: Option<String>,
    },
    /// Caller text spliced verbatim with its own arguments.
    Raw { text: String, args: Vec<Value> },
    /// `expr alias` or the plain column.
    Projection { column: String, term: Option<String> },
    /// A grouping key. An explicit term wins; otherwise the projection
    /// alias or expression is reused per dialect.
    GroupItem {
        column: String,
        group_term: Option<String>,
    },
    /// Resolves its key like [`Segment::GroupItem`].
    OrderItem {
        column: String,
        order_term: Option<String>,
        order: OrderType,
        nulls: NullsOrder,
    },
    /// `col = ?`, `col = term`, or `col = NULL` without an argument.
    Assignment {
        column: String,
        value: Value,
        term: Option<String>,
    },
    Merge(MergeSegment),
}

impl Segment {
    pub fn column(name: impl Into<String>, term: Option<String>) -> Self {
        Segment::Column {
            name: name.into(),
            term,
        }
    }

    pub fn value(value: Value, term: Option<String>) -> Self {
        Segment::Value { value, term }
    }

    pub fn render(&self, ctx: &mut RenderCtx<'_>) -> String {
        match self {
            Segment::Keyword(k) => (*k).to_string(),
            Segment::OpenParen => "(".to_string(),
            Segment::CloseParen => ")".to_string(),
            Segment::Column { name, term } => match term {
                Some(t) => t.clone(),
                None => ctx.fmt_name(name),
            },
            Segment::Table(target) => ctx.dialect.table_name(ctx.quote, target),
            Segment::Value { value, term } => {
                ctx.push_arg(value.clone());
                term.clone().unwrap_or_else(|| "?".to_string())
            }
            Segment::Like { value, style, term } => {
                let pattern = ctx.dialect.like_value(*style, value.clone());
                ctx.push_arg(pattern);
                ctx.dialect.like(*style, term.as_deref().unwrap_or("?"))
            }
            Segment::Raw { text, args } => {
                for arg in args {
                    ctx.push_arg(arg.clone());
                }
                text.clone()
            }
            Segment::Projection { column, term } => match term {
                Some(t) => format!(
                    "{t}{}{}",
                    ctx.dialect.alias_separator(),
                    ctx.fmt_name(column)
                ),
                None => ctx.fmt_name(column),
            },
            Segment::GroupItem { column, group_term } => {
                match (group_term, ctx.select_term(column)) {
                    (Some(t), _) => t.clone(),
                    (None, Some(t)) if !ctx.dialect.supports_group_alias() => t.to_string(),
                    _ => ctx.fmt_name(column),
                }
            }
            Segment::OrderItem {
                column,
                order_term,
                order,
                nulls,
            } => {
                let expr = match (order_term, ctx.select_term(column)) {
                    (Some(t), _) => t.clone(),
                    (None, Some(t)) if !ctx.dialect.supports_order_alias() => t.to_string(),
                    _ => ctx.fmt_name(column),
                };
                let mut out = String::new();
                let native_nulls = ctx.dialect.supports_nulls_ordering();
                if !native_nulls {
                    out.push_str(&ctx.dialect.nulls_prefix(&expr, *nulls));
                }
                out.push_str(&expr);
                if let Some(dir) = order.keyword() {
                    out.push(' ');
                    out.push_str(dir);
                }
                if native_nulls {
                    if let Some(n) = nulls.keyword() {
                        out.push(' ');
                        out.push_str(n);
                    }
                }
                out
            }
            Segment::Assignment {
                column,
                value,
                term,
            } => {
                let column = ctx.fmt_name(column);
                if value.is_null() && term.is_none() {
                    return format!("{column} = NULL");
                }
                ctx.push_arg(value.clone());
                format!("{column} = {}", term.as_deref().unwrap_or("?"))
            }
            Segment::Merge(merge) => merge.render(ctx),
        }
    }
}

/// Ordered segments joined by a separator at render time.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeSegment {
    separator: &'static str,
    segments: Vec<Segment>,
}

impl MergeSegment {
    pub fn new(separator: &'static str) -> Self {
        Self {
            separator,
            segments: Vec::new(),
        }
    }

    /// Space-separated, the layout of a filter expression.
    pub fn spaced() -> Self {
        Self::new(" ")
    }

    /// Comma-separated, the layout of a column list.
    pub fn listed() -> Self {
        Self::new(", ")
    }

    pub fn with(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.segments.truncate(len);
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// The nested merge stored at `index`, if that slot holds one.
    pub fn merge_at_mut(&mut self, index: usize) -> Option<&mut MergeSegment> {
        match self.segments.get_mut(index) {
            Some(Segment::Merge(m)) => Some(m),
            _ => None,
        }
    }

    pub fn render(&self, ctx: &mut RenderCtx<'_>) -> String {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push_str(self.separator);
            }
            out.push_str(&segment.render(ctx));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, PostgresDialect, StandardDialect};

    fn render(seg: &Segment, dialect: &dyn Dialect) -> (String, ArgList) {
        let mut args = ArgList::new();
        let mut ctx = RenderCtx::new(false, dialect, &mut args);
        let text = seg.render(&mut ctx);
        (text, args)
    }

    #[test]
    fn merge_joins_without_skipping() {
        let values = MergeSegment::new(" , ")
            .with(Segment::value(Value::Int(1), None))
            .with(Segment::value(Value::Int(2), None));
        let m = MergeSegment::spaced()
            .with(Segment::column("a", None))
            .with(Segment::Keyword("IN"))
            .with(Segment::OpenParen)
            .with(Segment::Merge(values))
            .with(Segment::CloseParen);
        let (text, args) = render(&Segment::Merge(m), &StandardDialect);
        assert_eq!(text, "a IN ( ? , ? )");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn value_term_still_binds() {
        let seg = Segment::value(Value::Int(5), Some("abs(?)".into()));
        let (text, args) = render(&seg, &StandardDialect);
        assert_eq!(text, "abs(?)");
        assert_eq!(args.as_slice(), &[Value::Int(5)]);
    }

    #[test]
    fn null_assignment_binds_nothing() {
        let seg = Segment::Assignment {
            column: "name".into(),
            value: Value::Null,
            term: None,
        };
        let (text, args) = render(&seg, &StandardDialect);
        assert_eq!(text, "name = NULL");
        assert!(args.is_empty());
    }

    #[test]
    fn order_item_nulls_strategies() {
        let seg = Segment::OrderItem {
            column: "name".into(),
            order_term: None,
            order: OrderType::Asc,
            nulls: NullsOrder::First,
        };
        assert_eq!(render(&seg, &MySqlDialect).0, "name IS NULL DESC, name ASC");
        assert_eq!(render(&seg, &PostgresDialect).0, "name ASC NULLS FIRST");
    }

    #[test]
    fn group_item_reuses_expression_without_alias_support() {
        let seg = Segment::GroupItem {
            column: "y".into(),
            group_term: None,
        };
        let projections =
            Projections::from([("y".to_string(), Some("year(created)".to_string()))]);
        let resolve = |dialect: &dyn Dialect| {
            let mut args = ArgList::new();
            let mut ctx =
                RenderCtx::new(false, dialect, &mut args).with_projections(&projections);
            seg.render(&mut ctx)
        };
        assert_eq!(resolve(&StandardDialect), "year(created)");
        assert_eq!(resolve(&MySqlDialect), "y");
        assert_eq!(render(&seg, &StandardDialect).0, "y");
    }
}
