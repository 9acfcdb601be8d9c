use std::sync::Arc;

use dynsql::{
    Bean, Bindings, BoundSql, Configuration, DynSqlError, DynamicSqlSource, ExpressionEvaluator,
    FnEvaluator, ForEachNode, IfNode, InjectionFilter, PathEvaluator, SqlNode, SqlSource, Value,
    ValueType,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn bind_with(
    evaluator: Arc<dyn ExpressionEvaluator>,
    contents: Vec<SqlNode>,
    parameter: Value,
) -> dynsql::Result<BoundSql> {
    init_tracing();
    let config = Configuration::default();
    DynamicSqlSource::new(SqlNode::mixed(contents), evaluator).bound_sql(&config, parameter)
}

fn bind(contents: Vec<SqlNode>, parameter: Value) -> BoundSql {
    bind_with(Arc::new(PathEvaluator), contents, parameter).unwrap()
}

fn text(sql: &str) -> SqlNode {
    SqlNode::text(sql)
}

fn when(test: &str, sql: &str) -> IfNode {
    IfNode::new(test, text(sql))
}

fn properties(bound: &BoundSql) -> Vec<String> {
    bound
        .parameter_mappings()
        .iter()
        .map(|m| m.property().to_owned())
        .collect()
}

#[test]
fn test_simple_text() {
    let bound = bind(vec![text("SELECT * FROM BLOG")], Value::Null);
    assert_eq!(bound.sql(), "SELECT * FROM BLOG");
}

#[test]
fn test_multipart_text() {
    let bound = bind(
        vec![text("SELECT * FROM BLOG"), text("WHERE ID = ?")],
        Value::Null,
    );
    assert_eq!(bound.sql(), "SELECT * FROM BLOG WHERE ID = ?");
}

#[test]
fn test_conditionally_include_where() {
    let bound = bind(
        vec![
            text("SELECT * FROM BLOG"),
            SqlNode::if_node("true", text("WHERE ID = ?")),
        ],
        Value::Null,
    );
    assert_eq!(bound.sql(), "SELECT * FROM BLOG WHERE ID = ?");
}

#[test]
fn test_conditionally_exclude_where() {
    let bound = bind(
        vec![
            text("SELECT * FROM BLOG"),
            SqlNode::if_node("false", text("WHERE ID = ?")),
        ],
        Value::Null,
    );
    assert_eq!(bound.sql(), "SELECT * FROM BLOG");
}

#[test]
fn test_if_with_bind_parameter() {
    let bound = bind(
        vec![
            text("SELECT * FROM BLOG"),
            SqlNode::if_node("true", text("WHERE ID = #{id}")),
        ],
        Value::map([("id", 1)]),
    );
    assert_eq!(bound.sql(), "SELECT * FROM BLOG WHERE ID = ?");
    assert_eq!(properties(&bound), vec!["id"]);
}

#[test]
fn test_choose_default() {
    let bound = bind(
        vec![
            text("SELECT * FROM BLOG"),
            SqlNode::choose(
                vec![
                    when("false", "WHERE CATEGORY = ?"),
                    when("false", "WHERE CATEGORY = 'NONE'"),
                ],
                Some(text("WHERE CATEGORY = 'DEFAULT'")),
            ),
        ],
        Value::Null,
    );
    assert_eq!(bound.sql(), "SELECT * FROM BLOG WHERE CATEGORY = 'DEFAULT'");
}

#[test]
fn test_choose_first() {
    let bound = bind(
        vec![
            text("SELECT * FROM BLOG"),
            SqlNode::choose(
                vec![
                    when("true", "WHERE CATEGORY = ?"),
                    when("false", "WHERE CATEGORY = 'NONE'"),
                ],
                Some(text("WHERE CATEGORY = 'DEFAULT'")),
            ),
        ],
        Value::Null,
    );
    assert_eq!(bound.sql(), "SELECT * FROM BLOG WHERE CATEGORY = ?");
}

#[test]
fn test_choose_second() {
    let bound = bind(
        vec![
            text("SELECT * FROM BLOG"),
            SqlNode::choose(
                vec![
                    when("false", "WHERE CATEGORY = ?"),
                    when("true", "WHERE CATEGORY = 'NONE'"),
                ],
                Some(text("WHERE CATEGORY = 'DEFAULT'")),
            ),
        ],
        Value::Null,
    );
    assert_eq!(bound.sql(), "SELECT * FROM BLOG WHERE CATEGORY = 'NONE'");
}

fn where_of(first: (&str, &str), second: (&str, &str)) -> Vec<SqlNode> {
    vec![
        text("SELECT * FROM BLOG"),
        SqlNode::where_clause(SqlNode::mixed(vec![
            SqlNode::if_node(first.0, text(first.1)),
            SqlNode::if_node(second.0, text(second.1)),
        ])),
    ]
}

#[test]
fn test_where_strips_and_for_first_condition() {
    let bound = bind(
        where_of(("true", "   and ID = ?  "), ("false", "   or NAME = ?  ")),
        Value::Null,
    );
    assert_eq!(bound.sql(), "SELECT * FROM BLOG WHERE  ID = ?");
}

#[test]
fn test_where_keeps_whitespace_after_keyword() {
    let cases = [
        ("   and\n ID = ?  ", "SELECT * FROM BLOG WHERE \n ID = ?"),
        ("   and\r\n ID = ?  ", "SELECT * FROM BLOG WHERE \r\n ID = ?"),
        ("   and\t ID = ?  ", "SELECT * FROM BLOG WHERE \t ID = ?"),
        ("   or\n ID = ?  ", "SELECT * FROM BLOG WHERE \n ID = ?"),
        ("   or\r\n ID = ?  ", "SELECT * FROM BLOG WHERE \r\n ID = ?"),
        ("   or\t ID = ?  ", "SELECT * FROM BLOG WHERE \t ID = ?"),
    ];
    for (body, expected) in cases {
        let bound = bind(
            vec![
                text("SELECT * FROM BLOG"),
                SqlNode::where_clause(SqlNode::mixed(vec![SqlNode::if_node("true", text(body))])),
            ],
            Value::Null,
        );
        assert_eq!(bound.sql(), expected, "body {body:?}");
    }
}

#[test]
fn test_where_strips_or_for_second_condition() {
    let bound = bind(
        where_of(("false", "   and ID = ?  "), ("true", "   or NAME = ?  ")),
        Value::Null,
    );
    assert_eq!(bound.sql(), "SELECT * FROM BLOG WHERE  NAME = ?");
}

#[test]
fn test_where_strips_only_leading_keyword_for_both_conditions() {
    let bound = bind(
        where_of(("true", "   and ID = ?   "), ("true", "OR NAME = ?  ")),
        Value::Null,
    );
    assert_eq!(bound.sql(), "SELECT * FROM BLOG WHERE  ID = ?   OR NAME = ?");
}

#[test]
fn test_where_without_conditions() {
    let bound = bind(
        where_of(("false", "   and ID = ?   "), ("false", "OR NAME = ?  ")),
        Value::Null,
    );
    assert_eq!(bound.sql(), "SELECT * FROM BLOG");
}

fn set_of(first: (&str, &str), second: (&str, &str)) -> Vec<SqlNode> {
    vec![
        text("UPDATE BLOG"),
        SqlNode::set_clause(SqlNode::mixed(vec![
            SqlNode::if_node(first.0, text(first.1)),
            SqlNode::if_node(second.0, text(second.1)),
        ])),
    ]
}

#[test]
fn test_set_strips_trailing_comma() {
    let bound = bind(
        set_of(("true", " ID = ?, "), ("true", " NAME = ?, ")),
        Value::Null,
    );
    assert_eq!(bound.sql(), "UPDATE BLOG SET ID = ?,  NAME = ?");
}

#[test]
fn test_set_strips_leading_comma() {
    let bound = bind(
        set_of(("false", " ID = ?"), ("true", ", NAME = ?")),
        Value::Null,
    );
    assert_eq!(bound.sql(), "UPDATE BLOG SET  NAME = ?");
}

#[test]
fn test_set_without_assignments() {
    let bound = bind(
        set_of(("false", " ID = ?"), ("false", ", NAME = ?")),
        Value::Null,
    );
    assert_eq!(bound.sql(), "UPDATE BLOG");
}

fn foreach_in_clause() -> Vec<SqlNode> {
    vec![
        text("SELECT * FROM BLOG WHERE ID in"),
        ForEachNode::new(SqlNode::dynamic_text("${item} = #{item}", None), "array")
            .index("index")
            .item("item")
            .open("(")
            .close(")")
            .separator("AND")
            .into(),
    ]
}

#[test]
fn test_foreach_iterates_once_per_item() {
    let bound = bind(
        foreach_in_clause(),
        Value::map([("array", ["one", "two", "three"].into_iter().collect::<Value>())]),
    );
    assert_eq!(
        bound.sql(),
        "SELECT * FROM BLOG WHERE ID in (  one = ? AND two = ? AND three = ? )"
    );
    assert_eq!(
        properties(&bound),
        vec!["__frch_item_0", "__frch_item_1", "__frch_item_2"]
    );
    assert!(
        bound
            .parameter_mappings()
            .iter()
            .all(|m| m.java_type() == &ValueType::Text)
    );
    let config = Configuration::default();
    assert_eq!(
        bound.parameter_values(&config),
        vec![Value::from("one"), Value::from("two"), Value::from("three")]
    );
    assert!(!bound.additional_parameters().contains_key("item"));
    assert!(!bound.additional_parameters().contains_key("index"));
    assert_eq!(
        bound.additional_parameter("__frch_index_2"),
        Some(&Value::Int(2))
    );
}

#[test]
fn test_foreach_skips_empty_collection() {
    let bound = bind(
        foreach_in_clause(),
        Value::map([("array", Value::List(Vec::new()))]),
    );
    assert_eq!(bound.sql(), "SELECT * FROM BLOG WHERE ID in");
    assert!(bound.parameter_mappings().is_empty());

    let bound = bind(
        vec![
            text("SELECT * FROM BLOG"),
            ForEachNode::in_list("array", "item").into(),
        ],
        Value::map([("array", Value::List(Vec::new()))]),
    );
    assert_eq!(bound.sql(), "SELECT * FROM BLOG");
    assert!(bound.parameter_mappings().is_empty());
}

#[test]
fn test_foreach_null_collection() {
    let err = bind_with(
        Arc::new(PathEvaluator),
        foreach_in_clause(),
        Value::map([("other", 1)]),
    )
    .unwrap_err();
    assert!(
        err.to_string()
            .contains("The expression 'array' evaluated to a null value."),
        "{err}"
    );
    assert!(err.is_invocation_error());

    let bound = bind(
        vec![
            text("SELECT * FROM BLOG"),
            ForEachNode::in_list("array", "item").nullable(true).into(),
        ],
        Value::map([("other", 1)]),
    );
    assert_eq!(bound.sql(), "SELECT * FROM BLOG");
}

#[test]
fn test_foreach_strict_variable_match() {
    let parameter = Value::map([
        ("uuu", Value::map([("u", "xyz")])),
        (
            "uuuu",
            Value::List(vec![Bean::new("Bean").with("id", "xyz").into()]),
        ),
    ]);
    let body = text("#{uuu.u}, #{u.id}, #{ u,typeHandler=string}, #{u:VARCHAR,typeHandler=string}");
    let bound = bind(
        vec![ForEachNode::new(body, "uuuu").item("u").index("uu").into()],
        parameter,
    );
    assert_eq!(bound.sql(), "?, ?, ?, ?");
    assert_eq!(
        properties(&bound),
        vec!["uuu.u", "__frch_u_0.id", "__frch_u_0", "__frch_u_0"]
    );
    let config = Configuration::default();
    let values = bound.parameter_values(&config);
    assert_eq!(values[0], Value::from("xyz"));
    assert_eq!(values[1], Value::from("xyz"));
    assert!(matches!(&values[2], Value::Bean(bean) if bean.type_name() == "Bean"));
}

#[test]
fn test_foreach_itemized_names_are_unique() {
    let bound = bind(
        vec![
            text("SELECT * FROM T WHERE"),
            ForEachNode::new(text("X = #{x}"), "xs")
                .item("x")
                .separator("OR")
                .into(),
        ],
        Value::map([("xs", [7, 8, 9].into_iter().collect::<Value>())]),
    );
    assert_eq!(bound.sql(), "SELECT * FROM T WHERE  X = ? OR X = ? OR X = ?");
    assert_eq!(properties(&bound), vec!["__frch_x_0", "__frch_x_1", "__frch_x_2"]);
    for (i, expected) in [7, 8, 9].into_iter().enumerate() {
        assert_eq!(
            bound.additional_parameter(&format!("__frch_x_{i}")),
            Some(&Value::Int(expected))
        );
    }
}

#[test]
fn test_foreach_over_map_binds_key_as_index() {
    let bound = bind(
        vec![
            text("UPDATE t SET"),
            ForEachNode::new(SqlNode::dynamic_text("${index} = #{item}", None), "fields")
                .item("item")
                .index("index")
                .separator(",")
                .into(),
        ],
        Value::map([("fields", Value::map([("a", 1), ("b", 2)]))]),
    );
    assert_eq!(bound.sql(), "UPDATE t SET  a = ? , b = ?");
    assert_eq!(properties(&bound), vec!["__frch_item_0", "__frch_item_1"]);
    assert_eq!(
        bound.parameter_values(&Configuration::default()),
        vec![Value::Int(1), Value::Int(2)]
    );
    assert_eq!(bound.additional_parameter("__frch_index_1"), Some(&Value::from("b")));
}

#[test]
fn test_type_resolution_fails_only_for_the_call_that_reaches_it() {
    let contents = || {
        vec![
            text("SELECT * FROM BLOG"),
            SqlNode::where_clause(SqlNode::if_node(
                "id",
                text("ID = #{id,typeHandler=unregistered}"),
            )),
        ]
    };
    let bound = bind(contents(), Value::map([("other", 1)]));
    assert_eq!(bound.sql(), "SELECT * FROM BLOG");

    let err = bind_with(Arc::new(PathEvaluator), contents(), Value::map([("id", 1)])).unwrap_err();
    assert!(err.is_type_resolution_error(), "{err}");
    assert!(matches!(err, DynSqlError::TypeResolution { .. }));
}

#[test]
fn test_dollar_expression_through_custom_evaluator() {
    let evaluator = FnEvaluator::new(|expr: &str, bindings: &Bindings| {
        match expr
            .strip_suffix("('v')")
            .and_then(|e| e.strip_suffix(".indexOf"))
        {
            Some(path) => {
                let s = bindings
                    .get_path(path)
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                Ok(s.find('v').map_or(Value::Int(-1), Value::from))
            }
            None => PathEvaluator.get_value(expr, bindings),
        }
    });
    let bound = bind_with(
        Arc::new(evaluator),
        vec![SqlNode::dynamic_text("${name.indexOf('v')}", None)],
        Value::map([("name", "Steve")]),
    )
    .unwrap();
    assert_eq!(bound.sql(), "3");
}

#[test]
fn test_null_substitution_is_empty_string() {
    let bound = bind(
        vec![SqlNode::dynamic_text("id=${id}", None)],
        Value::Bean(Bean::new("Bean").with("id", Value::Null)),
    );
    assert_eq!(bound.sql(), "id=");
}

#[test]
fn test_injection_filter_rejects_substitution() {
    let filter = InjectionFilter::new("^[a-zA-Z]+$").unwrap();
    let contents = vec![
        text("SELECT * FROM BLOG ORDER BY"),
        SqlNode::dynamic_text("${v}", Some(filter)),
    ];
    let ok = bind_with(
        Arc::new(PathEvaluator),
        contents.clone(),
        Value::map([("v", "title")]),
    )
    .unwrap();
    assert_eq!(ok.sql(), "SELECT * FROM BLOG ORDER BY title");

    let err = bind_with(
        Arc::new(PathEvaluator),
        contents,
        Value::map([("v", "1;drop")]),
    )
    .unwrap_err();
    assert_eq!(
        err,
        DynSqlError::InjectionRejected {
            value: "1;drop".to_owned(),
            pattern: "^[a-zA-Z]+$".to_owned(),
        }
    );
}

#[test]
fn test_bind_node_feeds_parameter_mapping() {
    let bound = bind(
        vec![
            SqlNode::bind("pattern", "'%x%'"),
            text("SELECT * FROM BLOG WHERE title LIKE #{pattern}"),
        ],
        Value::map([("id", 1)]),
    );
    assert_eq!(bound.sql(), "SELECT * FROM BLOG WHERE title LIKE ?");
    assert_eq!(bound.parameter_mappings()[0].java_type(), &ValueType::Text);
    let config = Configuration::default();
    assert_eq!(bound.parameter_values(&config), vec![Value::from("%x%")]);
}

#[test]
fn test_database_id_is_visible_to_templates() {
    let config = Configuration::from_toml_str(r#"database_id = "postgres""#).unwrap();
    let source = DynamicSqlSource::new(
        SqlNode::mixed(vec![SqlNode::choose(
            vec![when("_databaseId", "SELECT now()")],
            Some(text("SELECT 1")),
        )]),
        Arc::new(PathEvaluator),
    );
    let bound = source.bound_sql(&config, Value::Null).unwrap();
    assert_eq!(bound.sql(), "SELECT now()");
    assert_eq!(
        bound.additional_parameter("_databaseId"),
        Some(&Value::from("postgres"))
    );
}
