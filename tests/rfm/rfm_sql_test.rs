use chrono::NaiveDate;
use cohort::rfm::{
    detect_rfm_columns, generate_customer_count_sql, generate_rfm_sql, limits,
    validate_customer_count, RfmError, TableSchema,
};
use cohort::sql::CompileError;

fn raw_schema() -> TableSchema {
    TableSchema::new("orders", &["customer_id", "order_id", "order_date", "amount"])
}

fn precomputed_schema() -> TableSchema {
    TableSchema::new(
        "customer_features",
        &["customer_id", "recency", "frequency", "monetary"],
    )
}

#[test]
fn computed_query_end_to_end_shape() {
    // A table with customer_id / order_date / amount and 12 distinct
    // customers: the generated query must exclude negative amounts, and
    // the count gate accepts 12.
    let columns = detect_rfm_columns(&raw_schema());
    let query = generate_rfm_sql("orders", &columns, None, None).unwrap();

    assert!(!query.is_precomputed);
    assert!(query.sql.starts_with("WITH customer_orders AS ("));
    assert!(query.sql.contains("CAST(amount AS DOUBLE) >= 0"));
    assert!(query.sql.contains("SUM(CAST(amount AS DOUBLE)) AS monetary"));
    assert!(query.sql.contains("COUNT(DISTINCT order_id) AS frequency"));
    assert!(query.sql.contains("MAX(CAST(order_date AS TIMESTAMP)) AS last_order_date"));
    assert!(query.sql.contains("DATE_DIFF('day', c.last_order_date, b.baseline_date)"));
    assert!(query.sql.trim_end().ends_with("ORDER BY r.customer_id"));

    // The population guard keeps all 12 customers - no sampling effect
    // below the threshold.
    assert!(query
        .sql
        .contains(&format!("(SELECT COUNT(*) FROM rfm_clean) <= {}", limits::LARGE_DATASET_THRESHOLD)));

    assert!(validate_customer_count(12).is_ok());
}

#[test]
fn computed_query_without_order_id_counts_rows() {
    let columns = detect_rfm_columns(&TableSchema::new(
        "orders",
        &["customer_id", "order_date", "amount"],
    ));
    let query = generate_rfm_sql("orders", &columns, None, None).unwrap();
    assert!(query.sql.contains("COUNT(*) AS frequency"));
    assert!(!query.sql.contains("COUNT(DISTINCT"));
}

#[test]
fn precomputed_query_passes_features_through() {
    let columns = detect_rfm_columns(&precomputed_schema());
    let query = generate_rfm_sql("customer_features", &columns, None, None).unwrap();

    assert!(query.is_precomputed);
    assert!(!query.is_sampled);
    assert!(query.sql.contains("CAST(customer_id AS VARCHAR) AS customer_id"));
    assert!(query.sql.contains("CAST(recency AS DOUBLE) AS recency"));

    // Null or negative recency/monetary rows are dropped; frequency is
    // not filtered.
    assert!(query.sql.contains("recency IS NOT NULL"));
    assert!(query.sql.contains("CAST(recency AS DOUBLE) >= 0"));
    assert!(query.sql.contains("monetary IS NOT NULL"));
    assert!(query.sql.contains("CAST(monetary AS DOUBLE) >= 0"));
    assert!(!query.sql.contains("frequency IS NOT NULL"));

    // Sampling never touches the precomputed path.
    assert!(!query.sql.contains("RANDOM()"));
    assert!(generate_rfm_sql("customer_features", &columns, Some(100), None)
        .unwrap()
        .sql
        .eq(&query.sql));
}

#[test]
fn sampling_predicate_is_one_clause() {
    let columns = detect_rfm_columns(&raw_schema());
    let query = generate_rfm_sql("orders", &columns, None, None).unwrap();

    assert!(query.is_sampled);
    assert_eq!(query.sample_size, limits::MAX_SAMPLE_SIZE);

    // Union of "population small enough" OR "id in the random sample",
    // expressed as a single predicate.
    let where_clause = query.sql.split("FROM rfm_clean r").nth(1).unwrap();
    assert!(where_clause.contains("<= 50000"));
    assert!(where_clause.contains("OR r.customer_id IN (SELECT customer_id FROM sampled)"));
    assert!(query.sql.contains("ORDER BY RANDOM() LIMIT 10000"));
}

#[test]
fn explicit_sample_size_overrides_cap() {
    let columns = detect_rfm_columns(&raw_schema());
    let query = generate_rfm_sql("orders", &columns, Some(2500), None).unwrap();
    assert_eq!(query.sample_size, 2500);
    assert!(query.sql.contains("ORDER BY RANDOM() LIMIT 2500"));
}

#[test]
fn baseline_date_parameter() {
    let columns = detect_rfm_columns(&raw_schema());
    let baseline = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
    let query = generate_rfm_sql("orders", &columns, None, Some(baseline)).unwrap();
    assert!(query.sql.contains("CAST('2023-12-31' AS TIMESTAMP) AS baseline_date"));

    let implicit = generate_rfm_sql("orders", &columns, None, None).unwrap();
    assert!(implicit
        .sql
        .contains("SELECT MAX(CAST(order_date AS TIMESTAMP)) AS baseline_date FROM orders"));
}

#[test]
fn count_queries() {
    let computed = generate_customer_count_sql("orders", &detect_rfm_columns(&raw_schema())).unwrap();
    assert_eq!(
        computed,
        "SELECT COUNT(DISTINCT customer_id) AS customer_count FROM orders WHERE customer_id IS NOT NULL"
    );

    let precomputed =
        generate_customer_count_sql("customer_features", &detect_rfm_columns(&precomputed_schema()))
            .unwrap();
    assert_eq!(
        precomputed,
        "SELECT COUNT(*) AS customer_count FROM customer_features WHERE recency IS NOT NULL"
    );
}

#[test]
fn customer_count_gate() {
    for n in [0, 1, 9] {
        let err = validate_customer_count(n).unwrap_err();
        assert_eq!(
            err,
            RfmError::InsufficientData {
                actual: n,
                required: 10
            }
        );
        // The message carries both the actual and the required count.
        let message = err.to_string();
        assert!(message.contains(&format!("found {}", n)));
        assert!(message.contains("at least 10"));
    }
    assert!(validate_customer_count(10).is_ok());
    assert!(validate_customer_count(1_000_000).is_ok());
}

#[test]
fn hostile_table_and_column_names_are_rejected() {
    let columns = detect_rfm_columns(&raw_schema());
    assert!(matches!(
        generate_rfm_sql("orders; DROP TABLE orders;--", &columns, None, None),
        Err(CompileError::InvalidColumn(_))
    ));

    let mut hostile = detect_rfm_columns(&raw_schema());
    hostile.order_amount = Some("amount'); --".into());
    assert!(matches!(
        generate_rfm_sql("orders", &hostile, None, None),
        Err(CompileError::InvalidColumn(_))
    ));
}

#[test]
fn qualified_table_names_are_allowed() {
    let columns = detect_rfm_columns(&raw_schema());
    let query = generate_rfm_sql("analytics.orders", &columns, None, None).unwrap();
    assert!(query.sql.contains("FROM analytics.orders"));
}
