use cohort::sql::{
    compile_filter, CompileError, FilterExpr, FilterOp, FilterValue, RelativeTime, ScalarValue,
    TimeDirection, TimeUnit,
};

fn filter(column: &str, op: FilterOp, value: FilterValue) -> FilterExpr {
    FilterExpr {
        column: column.into(),
        op,
        value,
    }
}

fn string(s: &str) -> FilterValue {
    FilterValue::Scalar(ScalarValue::String(s.into()))
}

#[test]
fn string_values_never_leave_quotes_unescaped() {
    let tricky = [
        "it's",
        "'; DROP TABLE users; --",
        "''",
        "a'b'c",
        "完成'订单",
    ];
    for value in tricky {
        let sql = compile_filter(&filter("status", FilterOp::Eq, string(value))).unwrap();
        // Strip the outer quotes of the literal; every interior quote
        // must be doubled.
        let literal = sql.split_once(" = ").unwrap().1;
        let inner = &literal[1..literal.len() - 1];
        assert!(
            !inner.replace("''", "").contains('\''),
            "unescaped quote in {sql}"
        );
    }
}

#[test]
fn invalid_columns_are_rejected_for_every_operator() {
    let bad_columns = ["col; DROP TABLE x;--", "a b", "a'b", "x.y", "col--", ""];
    let ops = [
        (FilterOp::Eq, string("v")),
        (FilterOp::Gt, FilterValue::Scalar(ScalarValue::Int(1))),
        (
            FilterOp::In,
            FilterValue::List(vec![ScalarValue::Int(1), ScalarValue::Int(2)]),
        ),
        (FilterOp::Contains, string("v")),
    ];

    for column in bad_columns {
        for (op, value) in &ops {
            let result = compile_filter(&filter(column, *op, value.clone()));
            assert!(
                matches!(result, Err(CompileError::InvalidColumn(_))),
                "column {column:?} with {op:?} must fail"
            );
        }
    }
}

#[test]
fn cjk_columns_are_valid_identifiers() {
    let sql = compile_filter(&filter("订单状态", FilterOp::Eq, string("完成"))).unwrap();
    assert_eq!(sql, "订单状态 = '完成'");
}

#[test]
fn literal_rendering() {
    assert_eq!(
        compile_filter(&filter(
            "qty",
            FilterOp::Gte,
            FilterValue::Scalar(ScalarValue::Int(5))
        ))
        .unwrap(),
        "qty >= 5"
    );
    assert_eq!(
        compile_filter(&filter(
            "price",
            FilterOp::Lt,
            FilterValue::Scalar(ScalarValue::Float(19.99))
        ))
        .unwrap(),
        "price < 19.99"
    );
    assert_eq!(
        compile_filter(&filter(
            "active",
            FilterOp::Eq,
            FilterValue::Scalar(ScalarValue::Bool(true))
        ))
        .unwrap(),
        "active = TRUE"
    );
}

#[test]
fn in_list_renders_parenthesized_comma_joined() {
    let sql = compile_filter(&filter(
        "status",
        FilterOp::In,
        FilterValue::List(vec![
            ScalarValue::String("completed".into()),
            ScalarValue::String("shipped".into()),
            ScalarValue::Int(3),
        ]),
    ))
    .unwrap();
    assert_eq!(sql, "status IN ('completed', 'shipped', 3)");
}

#[test]
fn not_in_renders_not() {
    let sql = compile_filter(&filter(
        "status",
        FilterOp::NotIn,
        FilterValue::List(vec![ScalarValue::String("cancelled".into())]),
    ))
    .unwrap();
    assert_eq!(sql, "status NOT IN ('cancelled')");
}

#[test]
fn in_with_scalar_is_a_type_mismatch() {
    for op in [FilterOp::In, FilterOp::NotIn] {
        let result = compile_filter(&filter("status", op, string("completed")));
        assert!(matches!(result, Err(CompileError::TypeMismatch { .. })));
    }
}

#[test]
fn empty_in_list_is_a_type_mismatch() {
    let result = compile_filter(&filter("status", FilterOp::In, FilterValue::List(vec![])));
    assert!(matches!(result, Err(CompileError::TypeMismatch { .. })));
}

#[test]
fn contains_requires_string() {
    let result = compile_filter(&filter(
        "remark",
        FilterOp::Contains,
        FilterValue::Scalar(ScalarValue::Int(7)),
    ));
    assert!(matches!(result, Err(CompileError::TypeMismatch { .. })));
}

#[test]
fn contains_escapes_needle() {
    let sql = compile_filter(&filter("remark", FilterOp::Contains, string("it's"))).unwrap();
    assert_eq!(sql, "remark LIKE '%it''s%'");
}

#[test]
fn comparison_with_array_is_unsupported() {
    let result = compile_filter(&filter(
        "qty",
        FilterOp::Gt,
        FilterValue::List(vec![ScalarValue::Int(1)]),
    ));
    assert!(matches!(
        result,
        Err(CompileError::UnsupportedOperator { .. })
    ));
}

#[test]
fn relative_time_direction_decides_comparator() {
    // Past: >= now minus interval, regardless of the supplied operator.
    for op in [
        FilterOp::Eq,
        FilterOp::Ne,
        FilterOp::Gt,
        FilterOp::Gte,
        FilterOp::Lt,
        FilterOp::Lte,
    ] {
        let sql = compile_filter(&filter(
            "created_at",
            op,
            FilterValue::Relative(RelativeTime {
                unit: TimeUnit::Month,
                amount: 3,
                direction: TimeDirection::Past,
            }),
        ))
        .unwrap();
        assert_eq!(
            sql,
            "CAST(created_at AS TIMESTAMP) >= CURRENT_TIMESTAMP - INTERVAL '3 month'"
        );
    }

    let sql = compile_filter(&filter(
        "due_at",
        FilterOp::Lt,
        FilterValue::Relative(RelativeTime {
            unit: TimeUnit::Hour,
            amount: 48,
            direction: TimeDirection::Future,
        }),
    ))
    .unwrap();
    assert_eq!(
        sql,
        "CAST(due_at AS TIMESTAMP) <= CURRENT_TIMESTAMP + INTERVAL '48 hour'"
    );
}

#[test]
fn relative_time_rejects_non_comparison_operators() {
    let relative = FilterValue::Relative(RelativeTime {
        unit: TimeUnit::Day,
        amount: 7,
        direction: TimeDirection::Past,
    });
    for op in [FilterOp::In, FilterOp::NotIn, FilterOp::Contains] {
        let result = compile_filter(&filter("created_at", op, relative.clone()));
        assert!(result.is_err(), "{op:?} with relative time must fail");
    }
}

#[test]
fn filter_round_trips_through_json() {
    let original = filter(
        "order_date",
        FilterOp::Gte,
        FilterValue::Relative(RelativeTime {
            unit: TimeUnit::Day,
            amount: 30,
            direction: TimeDirection::Past,
        }),
    );
    let json = serde_json::to_string(&original).unwrap();
    assert!(json.contains("\"relative_time\""));
    let parsed: FilterExpr = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, original);
}
