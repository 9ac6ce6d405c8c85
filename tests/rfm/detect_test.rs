use cohort::rfm::{detect_rfm_columns, validate_rfm_columns, RfmError, TableSchema};

#[test]
fn precomputed_rfm_always_wins_over_raw_detection() {
    // Raw order columns are present too; precomputed must still win.
    let schema = TableSchema::new(
        "customer_features",
        &[
            "customer_id",
            "recency",
            "frequency",
            "monetary",
            "order_id",
            "order_date",
            "amount",
        ],
    );
    let detected = detect_rfm_columns(&schema);

    let pre = detected.precomputed.as_ref().expect("precomputed populated");
    assert_eq!(pre.recency, "recency");
    assert_eq!(pre.frequency, "frequency");
    assert_eq!(pre.monetary, "monetary");

    assert!(detected.order_id.is_none());
    assert!(detected.order_date.is_none());
    assert!(detected.order_amount.is_none());

    // Precomputed always validates.
    assert!(validate_rfm_columns(&detected).is_ok());
}

#[test]
fn precomputed_matching_is_case_insensitive_and_by_containment() {
    let schema = TableSchema::new(
        "t",
        &["uid", "Recency_Days", "PURCHASE_FREQUENCY", "monetary_total"],
    );
    let detected = detect_rfm_columns(&schema);
    let pre = detected.precomputed.expect("precomputed populated");
    assert_eq!(pre.recency, "Recency_Days");
    assert_eq!(pre.frequency, "PURCHASE_FREQUENCY");
    assert_eq!(pre.monetary, "monetary_total");
}

#[test]
fn two_of_three_precomputed_is_not_precomputed() {
    let schema = TableSchema::new("t", &["customer_id", "recency", "frequency", "order_date", "amount"]);
    let detected = detect_rfm_columns(&schema);
    assert!(detected.precomputed.is_none());
    // Falls through to raw-order detection instead.
    assert_eq!(detected.order_date.as_deref(), Some("order_date"));
    assert_eq!(detected.order_amount.as_deref(), Some("amount"));
}

#[test]
fn customer_id_tier_priority() {
    // Explicit customer term beats user/member terms even when both are
    // present and the member column comes first in the schema.
    let schema = TableSchema::new("t", &["member_id", "customer_id", "order_date", "amount"]);
    let detected = detect_rfm_columns(&schema);
    assert_eq!(detected.customer_id.as_deref(), Some("customer_id"));
    assert_eq!(detected.confidence.customer_id, 1.0);
}

#[test]
fn bilingual_detection() {
    let schema = TableSchema::new("订单表", &["客户id", "订单编号", "下单时间", "订单金额"]);
    let detected = detect_rfm_columns(&schema);
    assert_eq!(detected.customer_id.as_deref(), Some("客户id"));
    assert_eq!(detected.order_id.as_deref(), Some("订单编号"));
    assert_eq!(detected.order_date.as_deref(), Some("下单时间"));
    assert_eq!(detected.order_amount.as_deref(), Some("订单金额"));
    assert!(validate_rfm_columns(&detected).is_ok());
}

#[test]
fn generic_time_pattern_is_second_tier() {
    let schema = TableSchema::new("t", &["customer_id", "updated_date", "amount"]);
    let detected = detect_rfm_columns(&schema);
    assert_eq!(detected.order_date.as_deref(), Some("updated_date"));
    assert_eq!(detected.confidence.order_date, 0.8);
}

#[test]
fn amount_exact_tier_short_circuits() {
    // Both an exact term and a fuzzy candidate exist; exact wins with
    // confidence 1.0 even though the fuzzy column comes first.
    let schema = TableSchema::new("t", &["customer_id", "order_date", "shipping_fee", "amount"]);
    let detected = detect_rfm_columns(&schema);
    assert_eq!(detected.order_amount.as_deref(), Some("amount"));
    assert_eq!(detected.confidence.order_amount, 1.0);
}

#[test]
fn amount_exclusion_rules() {
    // Every candidate matches a fuzzy fragment but is excluded: id-like,
    // method-like, status-like, date-like.
    let schema = TableSchema::new(
        "t",
        &[
            "customer_id",
            "order_date",
            "payment_id",
            "pay_method",
            "payment_status",
            "pay_time",
        ],
    );
    let detected = detect_rfm_columns(&schema);
    assert!(detected.order_amount.is_none());

    let err = validate_rfm_columns(&detected).unwrap_err();
    assert_eq!(err, RfmError::MissingRequiredColumns(vec!["order_amount"]));
}

#[test]
fn validation_names_exactly_the_missing_fields() {
    let schema = TableSchema::new("t", &["sku", "category"]);
    let detected = detect_rfm_columns(&schema);
    let err = validate_rfm_columns(&detected).unwrap_err();
    assert_eq!(
        err,
        RfmError::MissingRequiredColumns(vec!["customer_id", "order_date", "order_amount"])
    );
    let message = err.to_string();
    assert!(message.contains("customer_id"));
    assert!(message.contains("order_date"));
    assert!(message.contains("order_amount"));
}

#[test]
fn detection_is_pure_and_repeatable() {
    let schema = TableSchema::new("orders", &["customer_id", "order_date", "amount"]);
    let first = detect_rfm_columns(&schema);
    let second = detect_rfm_columns(&schema);
    assert_eq!(first.customer_id, second.customer_id);
    assert_eq!(first.order_date, second.order_date);
    assert_eq!(first.order_amount, second.order_amount);
    assert_eq!(first.confidence, second.confidence);
}
