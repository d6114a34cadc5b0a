use std::collections::HashSet;
use std::path::PathBuf;

use cmdforge::{
    BetweenPredicate, CmdResult, CommandBuilder, ConditionLogic, ConflictStrategy, DialectKind,
    InPredicate, LikeStyle, NullsOrder, Operation, OrderType, Predicate, Target, Value,
};
use serde::Deserialize;

/// A command file loaded from disk.
#[derive(Debug, Clone)]
pub struct LoadedCommand {
    pub path: PathBuf,
    pub file: CommandFile,
}

impl LoadedCommand {
    pub fn load(path: PathBuf) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read command file {}: {e}", path.display()))?;
        let file = CommandFile::parse(&raw)
            .map_err(|e| anyhow::anyhow!("invalid command file {}: {e:#}", path.display()))?;
        Ok(Self { path, file })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandFile {
    #[serde(default)]
    pub dialect: Option<DialectKind>,
    #[serde(default)]
    pub quote: bool,
    #[serde(default)]
    pub operation: Operation,
    #[serde(default)]
    pub allow_empty_filter: bool,
    #[serde(default)]
    pub conflict: ConflictStrategy,
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Wrap the rendered SELECT into a row count.
    #[serde(default)]
    pub count: bool,
    #[serde(default)]
    pub page: Option<PageConfig>,

    pub target: TargetConfig,

    #[serde(default)]
    pub select: Vec<SelectItem>,
    #[serde(default, rename = "where")]
    pub conditions: Vec<ConditionItem>,
    #[serde(default)]
    pub group_by: Vec<GroupItem>,
    #[serde(default)]
    pub order_by: Vec<OrderItem>,
    #[serde(default)]
    pub set: Vec<AssignItem>,
    #[serde(default)]
    pub values: Vec<AssignItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub catalog: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageConfig {
    #[serde(default)]
    pub start: u64,
    pub limit: u64,
}

/// A projection: a column (optionally computed by `term`) or a free-form `expr`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectItem {
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default)]
    pub expr: Option<String>,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Logic {
    #[default]
    And,
    Or,
    AndNot,
    OrNot,
}

impl From<Logic> for ConditionLogic {
    fn from(logic: Logic) -> Self {
        match logic {
            Logic::And => ConditionLogic::And,
            Logic::Or => ConditionLogic::Or,
            Logic::AndNot => ConditionLogic::AndNot,
            Logic::OrNot => ConditionLogic::OrNot,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
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
    Raw,
    Group,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeConfig {
    #[default]
    Default,
    Left,
    Right,
}

impl From<LikeConfig> for LikeStyle {
    fn from(style: LikeConfig) -> Self {
        match style {
            LikeConfig::Default => LikeStyle::Default,
            LikeConfig::Left => LikeStyle::Left,
            LikeConfig::Right => LikeStyle::Right,
        }
    }
}

/// One `[[where]]` entry. Which fields apply depends on `op`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionItem {
    #[serde(default)]
    pub logic: Logic,
    pub op: Op,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub column_term: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub value_term: Option<String>,
    #[serde(default)]
    pub like: LikeConfig,
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
    #[serde(default)]
    pub low: Option<serde_json::Value>,
    #[serde(default)]
    pub high: Option<serde_json::Value>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
    #[serde(default)]
    pub conditions: Vec<ConditionItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupItem {
    pub column: String,
    #[serde(default)]
    pub term: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderItem {
    pub column: String,
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default)]
    pub order: OrderType,
    #[serde(default)]
    pub nulls: NullsOrder,
}

/// A `[[set]]` or `[[values]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssignItem {
    pub column: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub term: Option<String>,
}

fn value(v: &serde_json::Value) -> Value {
    Value::from_json(v.clone())
}

fn values(vs: &[serde_json::Value]) -> Vec<Value> {
    vs.iter().map(value).collect()
}

impl CommandFile {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let mut file: CommandFile = toml::from_str(raw)?;
        file.expand_env()?;
        file.validate()?;
        Ok(file)
    }

    fn expand_env(&mut self) -> anyhow::Result<()> {
        self.target.table = expand_env_vars(&self.target.table)?;
        if let Some(schema) = self.target.schema.as_mut() {
            *schema = expand_env_vars(schema)?;
        }
        if let Some(catalog) = self.target.catalog.as_mut() {
            *catalog = expand_env_vars(catalog)?;
        }
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        let has_table = !self.target.table.trim().is_empty();
        let has_catalog = self
            .target
            .catalog
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty());
        if !has_table && !has_catalog {
            anyhow::bail!("target.table must not be empty");
        }

        for item in &self.select {
            match (&item.column, &item.expr) {
                (Some(_), None) | (None, Some(_)) => {}
                _ => anyhow::bail!("each [[select]] needs exactly one of `column` or `expr`"),
            }
        }

        validate_conditions(&self.conditions)?;

        match self.operation {
            Operation::Insert => {
                if self.values.is_empty() {
                    anyhow::bail!("operation = \"insert\" requires at least one [[values]] entry");
                }
                let mut seen = HashSet::new();
                for v in &self.values {
                    if !seen.insert(v.column.as_str()) {
                        anyhow::bail!("duplicate [[values]] column: {}", v.column);
                    }
                }
            }
            Operation::Update => {
                if self.set.is_empty() {
                    anyhow::bail!("operation = \"update\" requires at least one [[set]] entry");
                }
            }
            Operation::Select | Operation::Delete => {}
        }

        if self.operation != Operation::Select && (self.count || self.page.is_some()) {
            anyhow::bail!("`count` and [page] only apply to operation = \"select\"");
        }
        if let Some(page) = self.page {
            if page.limit == 0 {
                anyhow::bail!("page.limit must be greater than zero");
            }
        }

        Ok(())
    }

    pub fn target(&self) -> Target {
        let mut target = Target::new(self.target.table.as_str());
        if let Some(schema) = &self.target.schema {
            target = target.with_schema(schema.as_str());
        }
        if let Some(catalog) = &self.target.catalog {
            target = target.with_catalog(catalog.as_str());
        }
        target
    }

    /// Replay the file's clauses onto `b` in construction order.
    pub fn apply(&self, b: &mut dyn CommandBuilder) -> CmdResult<()> {
        b.set_target(self.target());

        for item in &self.select {
            match (&item.column, &item.expr) {
                (Some(column), _) => b.add_select(column, item.term.as_deref())?,
                (None, Some(expr)) => b.add_select_custom(expr, values(&item.args))?,
                (None, None) => {}
            }
        }

        apply_conditions(b, &self.conditions)?;

        for g in &self.group_by {
            b.add_group_by(&g.column, g.term.as_deref())?;
        }
        for o in &self.order_by {
            b.add_order_by(&o.column, o.term.as_deref(), o.order, o.nulls)?;
        }
        for s in &self.set {
            b.add_update_set(&s.column, value(&s.value), s.term.as_deref())?;
        }
        for v in &self.values {
            b.add_insert(&v.column, value(&v.value), v.term.as_deref())?;
        }
        Ok(())
    }
}

fn validate_conditions(items: &[ConditionItem]) -> anyhow::Result<()> {
    for item in items {
        let needs_column = !matches!(item.op, Op::Raw | Op::Group);
        if needs_column && item.column.as_deref().is_none_or(|c| c.trim().is_empty()) {
            anyhow::bail!("[[where]] op {:?} requires `column`", item.op);
        }
        match item.op {
            Op::Raw if item.text.is_none() => {
                anyhow::bail!("[[where]] op raw requires `text`")
            }
            Op::Between | Op::NotBetween if item.low.is_none() || item.high.is_none() => {
                anyhow::bail!("[[where]] op {:?} requires `low` and `high`", item.op)
            }
            Op::In | Op::NotIn if item.values.is_empty() => {
                anyhow::bail!("[[where]] op {:?} requires a non-empty `values`", item.op)
            }
            Op::Group => validate_conditions(&item.conditions)?,
            _ => {}
        }
    }
    Ok(())
}

fn apply_conditions(b: &mut dyn CommandBuilder, items: &[ConditionItem]) -> CmdResult<()> {
    for item in items {
        let logic = ConditionLogic::from(item.logic);
        let column = item.column.clone().unwrap_or_default();
        let simple = |predicate: Predicate| {
            let mut p = predicate;
            if let Some(t) = &item.column_term {
                p = p.column_term(t.as_str());
            }
            if let Some(t) = &item.value_term {
                p = p.value_term(t.as_str());
            }
            p
        };
        let operand = || item.value.as_ref().map(value).unwrap_or(Value::Null);

        match item.op {
            Op::Eq => b.add_condition(logic, simple(Predicate::eq(column, operand())))?,
            Op::Ne => b.add_condition(logic, simple(Predicate::ne(column, operand())))?,
            Op::Gt => b.add_condition(logic, simple(Predicate::gt(column, operand())))?,
            Op::Ge => b.add_condition(logic, simple(Predicate::ge(column, operand())))?,
            Op::Lt => b.add_condition(logic, simple(Predicate::lt(column, operand())))?,
            Op::Le => b.add_condition(logic, simple(Predicate::le(column, operand())))?,
            Op::Like => b.add_condition(
                logic,
                simple(Predicate::like(column, operand())).like_style(item.like.into()),
            )?,
            Op::NotLike => b.add_condition(
                logic,
                simple(Predicate::not_like(column, operand())).like_style(item.like.into()),
            )?,
            Op::IsNull => b.add_condition(logic, simple(Predicate::is_null(column)))?,
            Op::IsNotNull => b.add_condition(logic, simple(Predicate::is_not_null(column)))?,
            Op::In | Op::NotIn => {
                let mut p = InPredicate::new(column, values(&item.values));
                if item.op == Op::NotIn {
                    p = p.not();
                }
                if let Some(t) = &item.column_term {
                    p = p.column_term(t.as_str());
                }
                if let Some(t) = &item.value_term {
                    p = p.value_term(t.as_str());
                }
                b.add_in(logic, p)?;
            }
            Op::Between | Op::NotBetween => {
                let low = item.low.as_ref().map(value).unwrap_or(Value::Null);
                let high = item.high.as_ref().map(value).unwrap_or(Value::Null);
                let mut p = BetweenPredicate::new(column, low, high);
                if item.op == Op::NotBetween {
                    p = p.not();
                }
                if let Some(t) = &item.column_term {
                    p = p.column_term(t.as_str());
                }
                if let Some(t) = &item.value_term {
                    p = p.value_term(t.as_str());
                }
                b.add_between(logic, p)?;
            }
            Op::Raw => {
                let text = item.text.as_deref().unwrap_or_default();
                b.add_raw(logic, text, values(&item.args))?;
            }
            Op::Group => {
                b.add_group(logic, &mut |g: &mut dyn CommandBuilder| {
                    apply_conditions(g, &item.conditions)
                })?;
            }
        }
    }
    Ok(())
}

/// Replace every `${NAME}` in `input` with the value of that environment variable.
fn expand_env_vars(input: &str) -> anyhow::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            anyhow::bail!("unterminated env var reference in '{input}'");
        };
        let name = &after[..close];
        if name.is_empty() {
            anyhow::bail!("empty env var reference in '{input}'");
        }
        let value = std::env::var(name)
            .map_err(|_| anyhow::anyhow!("missing env var for target expansion: {name}"))?;
        out.push_str(&value);
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdforge::{DialectKind, SqlCommandBuilder};

    fn render_select(raw: &str, kind: DialectKind) -> cmdforge::BoundStatement {
        let file = CommandFile::parse(raw).unwrap();
        let mut b = kind.builder();
        file.apply(&mut *b).unwrap();
        b.build_select(kind.dialect(), file.quote).unwrap()
    }

    #[test]
    fn minimal_file_uses_defaults() {
        let file = CommandFile::parse("[target]\ntable = \"users\"\n").unwrap();
        assert_eq!(file.operation, Operation::Select);
        assert_eq!(file.conflict, ConflictStrategy::Into);
        assert!(file.dialect.is_none());
        assert!(!file.quote);
    }

    #[test]
    fn conditions_and_nested_groups() {
        let raw = r#"
dialect = "postgres"

[target]
table = "users"

[[select]]
column = "id"

[[where]]
op = "eq"
column = "state"
value = "active"

[[where]]
logic = "or"
op = "group"

[[where.conditions]]
op = "gt"
column = "age"
value = 18

[[where.conditions]]
op = "in"
column = "role"
values = ["admin", "owner"]

[[order_by]]
column = "id"
order = "desc"
"#;
        let stmt = render_select(raw, DialectKind::Postgres);
        assert_eq!(
            stmt.sql,
            "SELECT id FROM users WHERE state = ? OR ( age > ? AND role IN ( ? , ? ) ) ORDER BY id DESC"
        );
        assert_eq!(
            stmt.args,
            vec![
                Value::Text("active".into()),
                Value::Int(18),
                Value::Text("admin".into()),
                Value::Text("owner".into()),
            ]
        );
    }

    #[test]
    fn templates_and_between() {
        let raw = r#"
[target]
table = "t"

[[where]]
op = "not_between"
column = "age"
low = 1
high = 9

[[where]]
op = "like"
column = "name"
value = "ab"
like = "right"
"#;
        let stmt = render_select(raw, DialectKind::Mysql);
        assert_eq!(
            stmt.sql,
            "SELECT * FROM t WHERE age NOT BETWEEN ? AND ? AND name LIKE CONCAT(?, '%')"
        );
    }

    #[test]
    fn insert_values_apply_in_order() {
        let raw = r#"
operation = "insert"
conflict = "ignore"
primary_key = ["id"]

[target]
table = "user_table"

[[values]]
column = "id"
value = 1

[[values]]
column = "name"
value = "a"
term = "upper(?)"
"#;
        let file = CommandFile::parse(raw).unwrap();
        let mut b = SqlCommandBuilder::new();
        file.apply(&mut b).unwrap();
        let stmt = b
            .build_insert(
                DialectKind::Mysql.dialect(),
                false,
                &file.primary_key,
                file.conflict,
            )
            .unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT IGNORE INTO user_table (id, name) VALUES (?, upper(?))"
        );
    }

    #[test]
    fn validation_rejects_incomplete_files() {
        let cases = [
            "[target]\ntable = \"\"\n",
            "operation = \"update\"\n[target]\ntable = \"t\"\n",
            "operation = \"insert\"\n[target]\ntable = \"t\"\n",
            "[target]\ntable = \"t\"\n[[where]]\nop = \"eq\"\n",
            "[target]\ntable = \"t\"\n[[where]]\nop = \"in\"\ncolumn = \"a\"\n",
            "[target]\ntable = \"t\"\n[[select]]\ncolumn = \"a\"\nexpr = \"b\"\n",
            "operation = \"delete\"\ncount = true\n[target]\ntable = \"t\"\n",
            "[target]\ntable = \"t\"\nbogus = 1\n",
        ];
        for raw in cases {
            assert!(CommandFile::parse(raw).is_err(), "accepted: {raw}");
        }
    }

    #[test]
    fn expand_env_in_target() {
        // SAFETY: test-only env mutation, no other thread reads this variable.
        unsafe { std::env::set_var("CMDFORGE_TEST_SCHEMA", "tenant_7") };
        let file = CommandFile::parse(
            "[target]\ntable = \"users\"\nschema = \"${CMDFORGE_TEST_SCHEMA}\"\n",
        )
        .unwrap();
        assert_eq!(file.target.schema.as_deref(), Some("tenant_7"));

        assert!(expand_env_vars("${CMDFORGE_TEST_MISSING_VAR}").is_err());
        assert!(expand_env_vars("${OPEN").is_err());
        assert_eq!(expand_env_vars("plain").unwrap(), "plain");
    }

    #[test]
    fn load_names_the_file_on_error() {
        let path = std::env::temp_dir().join(format!(
            "cmdforge-config-test-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[target]\n").unwrap();
        let err = LoadedCommand::load(path.clone()).unwrap_err();
        assert!(format!("{err:#}").contains(&path.display().to_string()));
        std::fs::remove_file(&path).unwrap();
    }
}
