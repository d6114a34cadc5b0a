use cmdforge::{
    CommandBuilder, ConditionLogic, ConflictStrategy, DialectKind, Family, NullsOrder, Operation,
    OrderType, Predicate, Qb, Target, TypedPaths, Value,
};

/// One command model: active users older than 18, newest first.
fn fill(b: &mut dyn CommandBuilder) {
    b.set_target(Target::new("users"));
    b.add_select("id", None).unwrap();
    b.add_select("name", None).unwrap();
    b.add_condition(ConditionLogic::And, Predicate::eq("state", "active"))
        .unwrap();
    b.add_condition(ConditionLogic::And, Predicate::gt("age", 18))
        .unwrap();
    b.add_order_by("created_at", None, OrderType::Desc, NullsOrder::Default)
        .unwrap();
}

fn render(kind: DialectKind) -> cmdforge::BoundStatement {
    let mut b = kind.builder();
    fill(&mut *b);
    b.build(Operation::Select, kind.dialect(), false).unwrap()
}

#[test]
fn same_model_renders_for_every_dialect() {
    let expected = [
        (
            DialectKind::Standard,
            "SELECT id, name FROM users WHERE state = ? AND age > ? ORDER BY created_at DESC",
        ),
        (
            DialectKind::Mysql,
            "SELECT id, name FROM users WHERE state = ? AND age > ? ORDER BY created_at DESC",
        ),
        (
            DialectKind::Mongo,
            "db.users.find({state: ?, age: {$gt: ?}}, {id: 1, name: 1}).sort({created_at: -1})",
        ),
        (
            DialectKind::Elastic7,
            r#"POST /users/_search {"query":{"bool":{"must":[{"match":{"state":?}},{"range":{"age":{"gt":?}}}]}},"_source":["id","name"],"sort":[{"created_at":{"order":"desc"}}]}"#,
        ),
    ];

    for (kind, sql) in expected {
        let stmt = render(kind);
        assert_eq!(stmt.sql, sql, "dialect {kind}");
        assert_eq!(
            stmt.args,
            vec![Value::Text("active".into()), Value::Int(18)],
            "dialect {kind}"
        );
    }
}

#[test]
fn every_dialect_produces_a_builder_of_its_family() {
    for kind in DialectKind::ALL {
        let b = kind.builder();
        let backend = b.backend();
        match kind.family() {
            Family::Sql => assert_eq!(backend, "sql"),
            Family::Document => assert_eq!(backend, "document store"),
            Family::Search => assert_eq!(backend, "search endpoint"),
        }
    }
}

#[test]
fn arg_count_matches_placeholders() {
    for kind in DialectKind::ALL {
        let stmt = render(kind);
        assert_eq!(
            stmt.sql.matches('?').count(),
            stmt.args.len(),
            "dialect {kind}: {}",
            stmt.sql
        );
    }
}

#[test]
fn pagination_and_count_hooks() {
    let stmt = render(DialectKind::Mysql);
    let paged = DialectKind::Mysql.dialect().page(stmt, 20, 10).unwrap();
    assert!(paged.sql.ends_with(" LIMIT ?, ?"));
    assert_eq!(&paged.args[2..], &[Value::Int(20), Value::Int(10)]);

    let stmt = render(DialectKind::Standard);
    let counted = DialectKind::Standard.dialect().count(stmt).unwrap();
    assert!(counted.sql.starts_with("SELECT COUNT(*) FROM (SELECT id, name FROM users"));
    assert!(counted.sql.ends_with(") TEMP_T"));

    let stmt = render(DialectKind::Elastic7);
    let paged = DialectKind::Elastic7.dialect().page(stmt, 0, 5).unwrap();
    assert!(paged.sql.starts_with("/*+overwrite_find_limit=5*/POST /users/_search {"));

    let stmt = render(DialectKind::Elastic7);
    let counted = DialectKind::Elastic7.dialect().count(stmt).unwrap();
    assert!(counted.sql.starts_with("/*+overwrite_find_as_count*/POST /users/_search {"));

    let stmt = render(DialectKind::Mongo);
    let paged = DialectKind::Mongo.dialect().page(stmt, 0, 5).unwrap();
    assert!(paged.sql.starts_with("/*+overwrite_find_limit=5*/db.users.find("));
}

#[test]
fn fluent_sql_round_trip_through_every_operation() {
    let mysql = DialectKind::Mysql.dialect();

    let mut q = Qb::sql("user_table");
    q.value("name", "a").value("age", 3);
    let stmt = q
        .build_insert(mysql, false, &[], ConflictStrategy::Into)
        .unwrap();
    assert_eq!(stmt.sql, "INSERT INTO user_table (name, age) VALUES (?, ?)");

    let mut q = Qb::sql("user_table");
    q.set("name", "b").eq("id", 7);
    let stmt = q.build_update(mysql, false, false).unwrap();
    assert_eq!(stmt.sql, "UPDATE user_table SET name = ? WHERE id = ?");
    assert_eq!(stmt.args, vec![Value::Text("b".into()), Value::Int(7)]);

    let mut q = Qb::sql("user_table");
    q.eq("id", 7);
    let stmt = q.build_delete(mysql, false, false).unwrap();
    assert_eq!(stmt.sql, "DELETE FROM user_table WHERE id = ?");
}

#[test]
fn fluent_nested_groups_and_negation() {
    let mut q = Qb::sql("t");
    q.eq("a", 1)
        .or()
        .not()
        .group(|g| {
            g.eq("b", 2).or().in_list("c", [3, 4]);
        })
        .is_not_null("d");
    let stmt = q
        .build_select(DialectKind::Postgres.dialect(), false)
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM t WHERE a = ? OR NOT ( b = ? OR c IN ( ? , ? ) ) AND d IS NOT NULL"
    );
    assert_eq!(stmt.args.len(), 4);
}

#[test]
fn fluent_reports_first_error_at_build() {
    let mut q = Qb::sql("t");
    q.order_by_asc("a").eq("b", 1).group_by("c");
    let err = q
        .build_select(DialectKind::Standard.dialect(), false)
        .unwrap_err();
    assert!(err.is_state());
    assert_eq!(err.to_string(), "condition must be added before ORDER BY");
}

#[test]
fn fluent_document_rejects_groups() {
    let mut q = Qb::document("users");
    q.eq("a", 1).group(|g| {
        g.eq("b", 2);
    });
    let err = q
        .build_select(DialectKind::Mongo.dialect(), false)
        .unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn typed_search_paths_use_schema_as_type() {
    let mut q = Qb::search(TypedPaths, Target::new("logs").with_schema("event"));
    q.like_right("msg", "err");
    let stmt = q
        .build_select(DialectKind::Elastic6.dialect(), false)
        .unwrap();
    assert_eq!(
        stmt.sql,
        r#"POST /logs/event/_search {"query":{"bool":{"must":[{"wildcard":{"msg":?}}]}}}"#
    );
    assert_eq!(stmt.args, vec![Value::Text("err*".into())]);
}

#[test]
fn bound_statement_serializes_args_as_plain_json() {
    let mut q = Qb::sql("t");
    q.eq("a", 1).eq("b", "x").is_null("c").eq("d", Value::Null);
    let stmt = q
        .build_select(DialectKind::Standard.dialect(), false)
        .unwrap();
    let json = serde_json::to_value(&stmt).unwrap();
    assert_eq!(json["args"], serde_json::json!([1, "x", null]));
}

#[test]
fn dialect_names_parse() {
    assert_eq!("PostgreSQL".parse::<DialectKind>().unwrap(), DialectKind::Postgres);
    assert_eq!("mariadb".parse::<DialectKind>().unwrap(), DialectKind::Mysql);
    assert!("sqlite".parse::<DialectKind>().unwrap_err().is_validation());
}
