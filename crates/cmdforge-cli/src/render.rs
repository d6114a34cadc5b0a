use cmdforge::{BoundStatement, DialectKind, Operation};

use crate::cli::RenderArgs;
use crate::config::{CommandFile, LoadedCommand};

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let loaded = LoadedCommand::load(args.file)?;
    let kind = args
        .dialect
        .or(loaded.file.dialect)
        .unwrap_or(DialectKind::Standard);

    tracing::debug!(
        target: "cmdforge.cli",
        file = %loaded.path.display(),
        dialect = kind.as_str(),
        operation = loaded.file.operation.as_str(),
        "rendering command file"
    );

    let stmt = render_file(&loaded.file, kind, args.quote)
        .map_err(|e| anyhow::anyhow!("{}: {e}", loaded.path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stmt)?);
    } else {
        print!("{}", format_text(&stmt));
    }
    Ok(())
}

/// Build and render `file` for `kind`, applying pagination and counting.
pub fn render_file(
    file: &CommandFile,
    kind: DialectKind,
    force_quote: bool,
) -> anyhow::Result<BoundStatement> {
    let dialect = kind.dialect();
    let quote = force_quote || file.quote;
    let mut builder = kind.builder();
    file.apply(&mut *builder)?;

    let stmt = match file.operation {
        Operation::Select => builder.build_select(dialect, quote)?,
        Operation::Update => builder.build_update(dialect, quote, file.allow_empty_filter)?,
        Operation::Delete => builder.build_delete(dialect, quote, file.allow_empty_filter)?,
        Operation::Insert => {
            builder.build_insert(dialect, quote, &file.primary_key, file.conflict)?
        }
    };

    let stmt = match file.page {
        Some(page) => dialect.page(stmt, page.start, page.limit)?,
        None => stmt,
    };
    let stmt = if file.count {
        dialect.count(stmt)?
    } else {
        stmt
    };
    Ok(stmt)
}

/// Statement text followed by one numbered line per argument.
pub fn format_text(stmt: &BoundStatement) -> String {
    let mut out = format!("{}\n", stmt.sql);
    for (i, arg) in stmt.args.iter().enumerate() {
        out.push_str(&format!("  [{}] {arg}\n", i + 1));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdforge::Value;

    fn parse(raw: &str) -> CommandFile {
        CommandFile::parse(raw).unwrap()
    }

    #[test]
    fn paged_select_appends_page_args() {
        let file = parse(
            r#"
[target]
table = "users"

[[where]]
op = "eq"
column = "id"
value = 3

[page]
start = 10
limit = 5
"#,
        );
        let stmt = render_file(&file, DialectKind::Postgres, false).unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM users WHERE id = ? LIMIT ? OFFSET ?");
        assert_eq!(stmt.args, vec![Value::Int(3), Value::Int(5), Value::Int(10)]);
    }

    #[test]
    fn count_wraps_select() {
        let file = parse("count = true\n[target]\ntable = \"users\"\n");
        let stmt = render_file(&file, DialectKind::Standard, false).unwrap();
        assert_eq!(stmt.sql, "SELECT COUNT(*) FROM (SELECT * FROM users) TEMP_T");
    }

    #[test]
    fn delete_without_filter_needs_opt_in() {
        let file = parse("operation = \"delete\"\n[target]\ntable = \"users\"\n");
        let err = render_file(&file, DialectKind::Mysql, false).unwrap_err();
        assert!(err.to_string().contains("DELETE"));

        let file = parse(
            "operation = \"delete\"\nallow_empty_filter = true\n[target]\ntable = \"users\"\n",
        );
        let stmt = render_file(&file, DialectKind::Mysql, false).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM users");
    }

    #[test]
    fn force_quote_overrides_file() {
        let file = parse("[target]\ntable = \"users\"\n[[select]]\ncolumn = \"id\"\n");
        let stmt = render_file(&file, DialectKind::Mysql, true).unwrap();
        assert_eq!(stmt.sql, "SELECT `id` FROM `users`");
    }

    #[test]
    fn document_backend_reports_unsupported_raw() {
        let file = parse(
            "[target]\ntable = \"users\"\n[[where]]\nop = \"raw\"\ntext = \"1 = 1\"\n",
        );
        let err = render_file(&file, DialectKind::Mongo, false).unwrap_err();
        assert!(err.to_string().contains("does not support"));
    }

    #[test]
    fn text_output_numbers_args() {
        let stmt = BoundStatement::new(
            "SELECT * FROM t WHERE a = ? AND b = ?",
            vec![Value::Int(1), Value::Text("x".into())],
        );
        assert_eq!(
            format_text(&stmt),
            "SELECT * FROM t WHERE a = ? AND b = ?\n  [1] 1\n  [2] 'x'\n"
        );
    }
}
