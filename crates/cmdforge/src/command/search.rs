//! Search-endpoint builder (Elasticsearch REST).
//!
//! Accumulation is delegated to an inner [`DocumentCommandBuilder`], so the
//! same constructs are rejected and the same overrides are spliced. Rendering produces `POST <path> <json>` where
//! the path comes from an [`EndpointPaths`] strategy per server generation and
//! the body is the query DSL.

use std::fmt;

use super::document::{DocCondition, DocPredicate, bind, or_runs};
use super::{
    BoundStatement, CommandBuilder, ConflictStrategy, Doc, DocumentCommandBuilder, GroupFn,
    NullsOrder, Operation, OrderType, Target, log_render, resolve_conflict,
};
use crate::condition::{BetweenPredicate, ConditionLogic, ConditionType, InPredicate, Predicate};
use crate::dialect::Dialect;
use crate::error::{CmdError, CmdResult};
use crate::value::{ArgList, Value};

const SEARCH_BACKEND: &str = "search endpoint";
const DEFAULT_DOC_TYPE: &str = "_doc";
const UPDATE_SCRIPT: &str = "ctx._source.putAll(params.data)";

/// REST path layout for one server generation.
pub trait EndpointPaths: fmt::Debug + Send + Sync {
    fn search_path(&self, index: &str, doc_type: Option<&str>) -> String;

    /// Bulk/bare document insert.
    fn insert_path(&self, index: &str, doc_type: Option<&str>) -> String;

    fn update_path(&self, index: &str, doc_type: Option<&str>) -> String;

    fn delete_path(&self, index: &str, doc_type: Option<&str>) -> String;
}

/// 6.x layout: every path carries a mapping type, `_doc` when unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypedPaths;

impl TypedPaths {
    fn base(index: &str, doc_type: Option<&str>) -> String {
        format!("/{index}/{}", doc_type.unwrap_or(DEFAULT_DOC_TYPE))
    }
}

impl EndpointPaths for TypedPaths {
    fn search_path(&self, index: &str, doc_type: Option<&str>) -> String {
        format!("{}/_search", Self::base(index, doc_type))
    }

    fn insert_path(&self, index: &str, doc_type: Option<&str>) -> String {
        Self::base(index, doc_type)
    }

    fn update_path(&self, index: &str, doc_type: Option<&str>) -> String {
        format!("{}/_update_by_query", Self::base(index, doc_type))
    }

    fn delete_path(&self, index: &str, doc_type: Option<&str>) -> String {
        format!("{}/_delete_by_query", Self::base(index, doc_type))
    }
}

/// 7.x+ layout: mapping types are gone and documents live under `_doc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypelessPaths;

impl EndpointPaths for TypelessPaths {
    fn search_path(&self, index: &str, _doc_type: Option<&str>) -> String {
        format!("/{index}/_search")
    }

    fn insert_path(&self, index: &str, _doc_type: Option<&str>) -> String {
        format!("/{index}/_doc")
    }

    fn update_path(&self, index: &str, _doc_type: Option<&str>) -> String {
        format!("/{index}/_update_by_query")
    }

    fn delete_path(&self, index: &str, _doc_type: Option<&str>) -> String {
        format!("/{index}/_delete_by_query")
    }
}

/// HTTP method and path of a rendered call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: &'static str,
    pub path: String,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

fn validate_index(index: &str) -> CmdResult<()> {
    const FORBIDDEN: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ' ', ',', '#'];
    let reason = if index.is_empty() {
        Some("is empty")
    } else if index == "." || index == ".." {
        Some("is reserved")
    } else if index.starts_with(['-', '_', '+']) {
        Some("starts with '-', '_' or '+'")
    } else if index.chars().any(|c| c.is_uppercase()) {
        Some("contains uppercase characters")
    } else if index.contains(FORBIDDEN) {
        Some("contains a forbidden character")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(CmdError::validation(format!(
            "index name '{index}' {reason}"
        ))),
        None => Ok(()),
    }
}

fn must_not(clause: Doc) -> Doc {
    Doc::entry("bool", Doc::entry("must_not", Doc::Array(vec![clause])))
}

fn field_op(query: &str, column: &str, value: Doc) -> Doc {
    Doc::entry(query, Doc::entry(column, value))
}

fn range(column: &str, bounds: Vec<(&str, Doc)>) -> Doc {
    let bounds = bounds
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    field_op("range", column, Doc::Object(bounds))
}

fn exists(column: &str) -> Doc {
    Doc::entry("exists", Doc::entry("field", Doc::Str(column.to_string())))
}

fn query_clause(predicate: &DocPredicate, dialect: &dyn Dialect, args: &mut ArgList) -> Doc {
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
            match kind {
                ConditionType::Eq => field_op("match", column, bind(args, value, term)),
                ConditionType::Ne => must_not(field_op("term", column, bind(args, value, term))),
                ConditionType::Gt => range(column, vec![("gt", bind(args, value, term))]),
                ConditionType::Ge => range(column, vec![("gte", bind(args, value, term))]),
                ConditionType::Lt => range(column, vec![("lt", bind(args, value, term))]),
                ConditionType::Le => range(column, vec![("lte", bind(args, value, term))]),
                ConditionType::Like | ConditionType::NotLike => {
                    let pattern = dialect.like_value(*like_style, value.clone());
                    let clause = field_op("wildcard", column, bind(args, &pattern, term));
                    if *kind == ConditionType::NotLike {
                        must_not(clause)
                    } else {
                        clause
                    }
                }
                ConditionType::IsNull => must_not(exists(column)),
                // List and range kinds never reach a simple predicate.
                ConditionType::IsNotNull
                | ConditionType::In
                | ConditionType::NotIn
                | ConditionType::Between
                | ConditionType::NotBetween => exists(column),
            }
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
            let clause = range(column, vec![("gte", low), ("lte", high)]);
            if *negated { must_not(clause) } else { clause }
        }
        DocPredicate::In {
            column,
            negated,
            values,
            value_term,
        } => {
            let items = values
                .iter()
                .map(|v| bind(args, v, value_term.as_deref()))
                .collect();
            let clause = field_op("terms", column, Doc::Array(items));
            if *negated { must_not(clause) } else { clause }
        }
    }
}

fn query_doc(conditions: &[DocCondition], dialect: &dyn Dialect, args: &mut ArgList) -> Doc {
    let mut runs: Vec<Doc> = or_runs(conditions)
        .into_iter()
        .map(|run| {
            let clauses = run
                .iter()
                .map(|cond| {
                    let clause = query_clause(&cond.predicate, dialect, args);
                    if cond.logic.is_not() {
                        must_not(clause)
                    } else {
                        clause
                    }
                })
                .collect();
            Doc::entry("bool", Doc::entry("must", Doc::Array(clauses)))
        })
        .collect();
    match runs.len() {
        0 => Doc::entry("match_all", Doc::Object(Vec::new())),
        1 => runs.remove(0),
        _ => Doc::entry(
            "bool",
            Doc::Object(vec![
                ("should".to_string(), Doc::Array(runs)),
                ("minimum_should_match".to_string(), Doc::Int(1)),
            ]),
        ),
    }
}

fn sort_doc(column: &str, order: OrderType, nulls: NullsOrder) -> Doc {
    let mut options = Vec::new();
    match order {
        OrderType::Asc => options.push(("order".to_string(), Doc::Str("asc".into()))),
        OrderType::Desc => options.push(("order".to_string(), Doc::Str("desc".into()))),
        OrderType::Default => {}
    }
    match nulls {
        NullsOrder::First => options.push(("missing".to_string(), Doc::Str("_first".into()))),
        NullsOrder::Last => options.push(("missing".to_string(), Doc::Str("_last".into()))),
        NullsOrder::Default => {}
    }
    if options.is_empty() {
        Doc::Str(column.to_string())
    } else {
        Doc::entry(column, Doc::Object(options))
    }
}

/// Accumulates a command for a search endpoint.
///
/// # Example
/// ```ignore
/// use cmdforge::{CommandBuilder, ConditionLogic, ElasticDialect, Predicate, SearchCommandBuilder, TypelessPaths};
///
/// let mut b = SearchCommandBuilder::new(TypelessPaths);
/// b.set_target("idx".into());
/// b.add_condition(ConditionLogic::And, Predicate::eq("name", "a"))?;
/// let stmt = b.build_select(&ElasticDialect, false)?;
/// assert_eq!(stmt.sql, r#"POST /idx/_search {"query":{"bool":{"must":[{"match":{"name":?}}]}}}"#);
/// ```
#[derive(Debug, Clone)]
pub struct SearchCommandBuilder<P> {
    inner: DocumentCommandBuilder,
    paths: P,
}

impl<P: EndpointPaths> SearchCommandBuilder<P> {
    pub fn new(paths: P) -> Self {
        Self {
            inner: DocumentCommandBuilder::with_backend(SEARCH_BACKEND),
            paths,
        }
    }

    pub fn paths(&self) -> &P {
        &self.paths
    }

    /// Index name: the target table, or the catalog when the table is blank.
    pub fn index(&self) -> CmdResult<&str> {
        let target = self.inner.target();
        let index = non_blank(Some(target.table()))
            .or_else(|| non_blank(target.catalog()))
            .unwrap_or_default();
        validate_index(index)?;
        Ok(index)
    }

    /// Mapping type: the target schema, if set.
    pub fn doc_type(&self) -> Option<&str> {
        non_blank(self.inner.target().schema())
    }

    pub fn search_path(&self) -> CmdResult<String> {
        Ok(self.paths.search_path(self.index()?, self.doc_type()))
    }

    pub fn insert_path(&self) -> CmdResult<String> {
        Ok(self.paths.insert_path(self.index()?, self.doc_type()))
    }

    pub fn update_path(&self) -> CmdResult<String> {
        Ok(self.paths.update_path(self.index()?, self.doc_type()))
    }

    pub fn delete_path(&self) -> CmdResult<String> {
        Ok(self.paths.delete_path(self.index()?, self.doc_type()))
    }

    /// Method and path used for `operation`.
    pub fn endpoint(&self, operation: Operation) -> CmdResult<Endpoint> {
        let path = match operation {
            Operation::Select => self.search_path()?,
            Operation::Insert => self.insert_path()?,
            Operation::Update => self.update_path()?,
            Operation::Delete => self.delete_path()?,
        };
        Ok(Endpoint {
            method: "POST",
            path,
        })
    }

    fn finish(
        &self,
        operation: Operation,
        dialect: &dyn Dialect,
        endpoint: Endpoint,
        body: Doc,
    ) -> BoundStatement {
        let sql = format!("{endpoint} {}", body.to_json());
        let stmt = BoundStatement::new(sql, self.inner.args().as_slice().to_vec());
        log_render(operation, dialect, &stmt);
        stmt
    }

    fn query(&mut self, dialect: &dyn Dialect) -> Doc {
        let conditions = self.inner.conditions().to_vec();
        query_doc(&conditions, dialect, self.inner.args_mut())
    }
}

impl<P: EndpointPaths> CommandBuilder for SearchCommandBuilder<P> {
    fn backend(&self) -> &'static str {
        SEARCH_BACKEND
    }

    fn set_target(&mut self, target: Target) {
        self.inner.set_target(target);
    }

    fn target(&self) -> &Target {
        self.inner.target()
    }

    fn add_condition(&mut self, logic: ConditionLogic, predicate: Predicate) -> CmdResult<()> {
        self.inner.add_condition(logic, predicate)
    }

    fn add_between(
        &mut self,
        logic: ConditionLogic,
        predicate: BetweenPredicate,
    ) -> CmdResult<()> {
        self.inner.add_between(logic, predicate)
    }

    fn add_in(&mut self, logic: ConditionLogic, predicate: InPredicate) -> CmdResult<()> {
        self.inner.add_in(logic, predicate)
    }

    fn add_group(&mut self, logic: ConditionLogic, group: &mut GroupFn<'_>) -> CmdResult<()> {
        self.inner.add_group(logic, group)
    }

    fn add_raw(&mut self, logic: ConditionLogic, text: &str, args: Vec<Value>) -> CmdResult<()> {
        self.inner.add_raw(logic, text, args)
    }

    fn add_select(&mut self, column: &str, term: Option<&str>) -> CmdResult<()> {
        self.inner.add_select(column, term)
    }

    fn add_select_custom(&mut self, expr: &str, args: Vec<Value>) -> CmdResult<()> {
        self.inner.add_select_custom(expr, args)
    }

    fn has_select(&self, column: &str) -> bool {
        self.inner.has_select(column)
    }

    fn has_any_select(&self) -> bool {
        self.inner.has_any_select()
    }

    fn select_all(&mut self) {
        self.inner.select_all()
    }

    fn is_select_all(&self) -> bool {
        self.inner.is_select_all()
    }

    fn clear_select(&mut self) {
        self.inner.clear_select()
    }

    fn add_group_by(&mut self, column: &str, term: Option<&str>) -> CmdResult<()> {
        self.inner.add_group_by(column, term)
    }

    fn add_order_by(
        &mut self,
        column: &str,
        term: Option<&str>,
        order: OrderType,
        nulls: NullsOrder,
    ) -> CmdResult<()> {
        self.inner.add_order_by(column, term, order, nulls)
    }

    fn add_update_set(
        &mut self,
        column: &str,
        value: Value,
        term: Option<&str>,
    ) -> CmdResult<()> {
        self.inner.add_update_set(column, value, term)
    }

    fn clear_update_set(&mut self) {
        self.inner.clear_update_set()
    }

    fn add_insert(&mut self, column: &str, value: Value, term: Option<&str>) -> CmdResult<()> {
        self.inner.add_insert(column, value, term)
    }

    fn args(&self) -> &ArgList {
        self.inner.args()
    }

    fn clear_args(&mut self) {
        self.inner.clear_args()
    }

    fn clear(&mut self) {
        self.inner.clear()
    }

    fn build_select(&mut self, dialect: &dyn Dialect, _quote: bool) -> CmdResult<BoundStatement> {
        let endpoint = self.endpoint(Operation::Select)?;
        let mut body = vec![("query".to_string(), self.query(dialect))];
        if !self.inner.is_select_all() {
            let source = self
                .inner
                .projections()
                .iter()
                .map(|p| Doc::Str(p.field.clone()))
                .collect();
            body.push(("_source".to_string(), Doc::Array(source)));
        }
        if !self.inner.sorts().is_empty() {
            let sort = self
                .inner
                .sorts()
                .iter()
                .map(|(c, order, nulls)| sort_doc(c, *order, *nulls))
                .collect();
            body.push(("sort".to_string(), Doc::Array(sort)));
        }

        Ok(self.finish(Operation::Select, dialect, endpoint, Doc::Object(body)))
    }

    fn build_update(
        &mut self,
        dialect: &dyn Dialect,
        _quote: bool,
        allow_empty_filter: bool,
    ) -> CmdResult<BoundStatement> {
        self.inner.guard(Operation::Update, allow_empty_filter)?;
        if self.inner.updates().is_empty() {
            return Err(CmdError::validation("UPDATE requires at least one assignment"));
        }
        let endpoint = self.endpoint(Operation::Update)?;

        let query = self.query(dialect);
        let updates = self.inner.updates().to_vec();
        let args = self.inner.args_mut();
        let data = updates
            .iter()
            .map(|assignment| (assignment.column.clone(), assignment.render(args)))
            .collect();
        let script = Doc::Object(vec![
            ("source".to_string(), Doc::Str(UPDATE_SCRIPT.to_string())),
            ("lang".to_string(), Doc::Str("painless".to_string())),
            ("params".to_string(), Doc::entry("data", Doc::Object(data))),
        ]);
        let body = Doc::Object(vec![
            ("query".to_string(), query),
            ("script".to_string(), script),
        ]);

        Ok(self.finish(Operation::Update, dialect, endpoint, body))
    }

    fn build_delete(
        &mut self,
        dialect: &dyn Dialect,
        _quote: bool,
        allow_empty_filter: bool,
    ) -> CmdResult<BoundStatement> {
        self.inner.guard(Operation::Delete, allow_empty_filter)?;
        let endpoint = self.endpoint(Operation::Delete)?;
        let body = Doc::entry("query", self.query(dialect));

        Ok(self.finish(Operation::Delete, dialect, endpoint, body))
    }

    fn build_insert(
        &mut self,
        dialect: &dyn Dialect,
        _quote: bool,
        primary_key: &[String],
        strategy: ConflictStrategy,
    ) -> CmdResult<BoundStatement> {
        if self.inner.inserts().is_empty() {
            return Err(CmdError::validation("INSERT requires at least one column"));
        }
        let endpoint = self.endpoint(Operation::Insert)?;
        let inserts = self.inner.inserts().to_vec();
        let columns: Vec<String> = inserts.iter().map(|a| a.column.clone()).collect();
        resolve_conflict(dialect, primary_key, &columns, strategy);

        let args = self.inner.args_mut();
        let fields = inserts
            .iter()
            .map(|assignment| (assignment.column.clone(), assignment.render(args)))
            .collect();

        Ok(self.finish(Operation::Insert, dialect, endpoint, Doc::Object(fields)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_paths_default_type() {
        assert_eq!(TypedPaths.search_path("idx", None), "/idx/_doc/_search");
        assert_eq!(TypedPaths.insert_path("idx", Some("mytype")), "/idx/mytype");
        assert_eq!(
            TypedPaths.delete_path("idx", Some("t")),
            "/idx/t/_delete_by_query"
        );
    }

    #[test]
    fn typeless_paths_ignore_type() {
        assert_eq!(TypelessPaths.search_path("idx", Some("t")), "/idx/_search");
        assert_eq!(TypelessPaths.insert_path("idx", None), "/idx/_doc");
        assert_eq!(
            TypelessPaths.update_path("idx", None),
            "/idx/_update_by_query"
        );
    }

    #[test]
    fn index_name_rules() {
        assert!(validate_index("logs-2024.01").is_ok());
        assert!(validate_index("Logs").is_err());
        assert!(validate_index("_hidden").is_err());
        assert!(validate_index("a b").is_err());
        assert!(validate_index("").is_err());
    }

    #[test]
    fn index_falls_back_to_catalog() {
        let mut b = SearchCommandBuilder::new(TypedPaths);
        b.set_target(Target::new("").with_catalog("test_insert_generic").with_schema("mytype"));
        assert_eq!(b.insert_path().unwrap(), "/test_insert_generic/mytype");
        assert_eq!(
            b.endpoint(Operation::Select).unwrap().to_string(),
            "POST /test_insert_generic/mytype/_search"
        );
    }

    #[test]
    fn sort_forms() {
        assert_eq!(
            sort_doc("a", OrderType::Default, NullsOrder::Default).to_json(),
            r#""a""#
        );
        assert_eq!(
            sort_doc("a", OrderType::Desc, NullsOrder::Last).to_json(),
            r#"{"a":{"order":"desc","missing":"_last"}}"#
        );
    }
}
