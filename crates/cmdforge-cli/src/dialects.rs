use cmdforge::{DialectKind, Family};
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};

pub fn run() -> anyhow::Result<()> {
    println!("{}", capability_table());
    Ok(())
}

fn family_name(family: Family) -> &'static str {
    match family {
        Family::Sql => "sql",
        Family::Document => "document",
        Family::Search => "search",
    }
}

fn page_style(kind: DialectKind) -> &'static str {
    match kind {
        DialectKind::Standard => "OFFSET/FETCH",
        DialectKind::Mysql => "LIMIT ?, ?",
        DialectKind::Postgres => "LIMIT/OFFSET",
        DialectKind::Oracle => "ROWNUM",
        DialectKind::Mongo | DialectKind::Elastic6 | DialectKind::Elastic7 => "hint comment",
    }
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

/// Conflict strategies the dialect renders natively for a single-key table.
fn conflict_support(kind: DialectKind) -> String {
    let dialect = kind.dialect();
    let pk = vec!["id".to_string()];
    let columns = vec!["id".to_string(), "name".to_string()];

    let mut out = Vec::new();
    if dialect.supports_insert_ignore(&pk, &columns) {
        out.push("ignore");
    }
    if dialect.supports_upsert(&pk, &columns) {
        out.push("upsert");
    }
    if out.is_empty() {
        "-".to_string()
    } else {
        out.join(", ")
    }
}

pub fn capability_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            [
                "Dialect", "Family", "Quotes", "GROUP BY alias", "ORDER BY alias", "NULLS",
                "Conflict", "Paging",
            ]
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold).fg(Color::Cyan)),
        );

    for kind in DialectKind::ALL {
        let dialect = kind.dialect();
        let family = kind.family();
        let quotes = match family {
            Family::Sql => format!("{}{}", dialect.left_quote(), dialect.right_quote()),
            _ => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(kind.as_str()),
            Cell::new(family_name(family)),
            Cell::new(quotes),
            Cell::new(yes_no(dialect.supports_group_alias())),
            Cell::new(yes_no(dialect.supports_order_alias())),
            Cell::new(yes_no(dialect.supports_nulls_ordering())),
            Cell::new(conflict_support(kind)),
            Cell::new(page_style(kind)),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_row_per_dialect() {
        let table = capability_table();
        assert_eq!(table.row_iter().count(), DialectKind::ALL.len());
        let text = table.to_string();
        for kind in DialectKind::ALL {
            assert!(text.contains(kind.as_str()), "missing {kind}");
        }
    }

    #[test]
    fn conflict_support_per_dialect() {
        assert_eq!(conflict_support(DialectKind::Standard), "-");
        assert_eq!(conflict_support(DialectKind::Mysql), "ignore, upsert");
        assert_eq!(conflict_support(DialectKind::Postgres), "ignore, upsert");
        assert_eq!(conflict_support(DialectKind::Mongo), "-");
    }
}
