use cohort::digest::{check_digest_budget, render_digest, DigestLimits, FieldMapEntry, SkillConfig};
use cohort::sql::{
    Aggregation, FilterExpr, FilterOp, FilterValue, MetricDefinition, RelativeTime, ScalarValue,
    TimeDirection, TimeUnit,
};

fn sample_config(filters: usize, metrics: usize) -> SkillConfig {
    SkillConfig {
        field_mapping: vec![
            FieldMapEntry {
                column: "order_date".into(),
                meaning: "订单日期".into(),
            },
            FieldMapEntry {
                column: "amount".into(),
                meaning: "订单金额".into(),
            },
        ],
        filters: (0..filters)
            .map(|i| FilterExpr {
                column: format!("col{}", i),
                op: FilterOp::Gt,
                value: FilterValue::Scalar(ScalarValue::Int(i as i64)),
            })
            .collect(),
        metrics: (0..metrics)
            .map(|i| {
                (
                    format!("metric{}", i),
                    MetricDefinition {
                        label: format!("Metric {}", i),
                        aggregation: Aggregation::Sum,
                        column: Some("amount".into()),
                        filters: vec![],
                    },
                )
            })
            .collect(),
    }
}

#[test]
fn field_mapping_always_included_in_full() {
    let limits = DigestLimits {
        max_filters: 1,
        max_metrics: 1,
        ..DigestLimits::default()
    };
    let digest = render_digest(&sample_config(5, 5), &limits);
    assert!(digest.contains("order_date: 订单日期"));
    assert!(digest.contains("amount: 订单金额"));
}

#[test]
fn cutoffs_preserve_insertion_order_and_summarize_the_rest() {
    let limits = DigestLimits {
        max_filters: 2,
        max_metrics: 3,
        ..DigestLimits::default()
    };
    let digest = render_digest(&sample_config(5, 7), &limits);

    assert!(digest.contains("col0 > 0"));
    assert!(digest.contains("col1 > 1"));
    assert!(!digest.contains("col2 > 2"));
    assert!(digest.contains("+3 more..."));

    assert!(digest.contains("metric2: sum(amount)"));
    assert!(!digest.contains("metric3:"));
    assert!(digest.contains("+4 more..."));
}

#[test]
fn whole_string_truncation_can_starve_later_sections() {
    // Budget small enough that the field mapping alone exceeds it: the
    // filters and metrics sections disappear entirely.
    let limits = DigestLimits {
        max_chars: 30,
        ..DigestLimits::default()
    };
    let digest = render_digest(&sample_config(3, 3), &limits);
    assert!(digest.starts_with("[Field Mapping]"));
    assert!(!digest.contains("[Metrics]"));
    assert!(digest.ends_with("... (truncated)"));
    assert_eq!(digest.chars().count(), 30 + "... (truncated)".chars().count());
}

#[test]
fn no_marker_when_digest_fits() {
    let digest = render_digest(&sample_config(1, 1), &DigestLimits::default());
    assert!(!digest.contains("(truncated)"));
    assert!(check_digest_budget(&digest, DigestLimits::default().max_chars));
}

#[test]
fn relative_time_filters_render_readably() {
    let config = SkillConfig {
        field_mapping: vec![],
        filters: vec![FilterExpr {
            column: "order_date".into(),
            op: FilterOp::Gte,
            value: FilterValue::Relative(RelativeTime {
                unit: TimeUnit::Day,
                amount: 30,
                direction: TimeDirection::Past,
            }),
        }],
        metrics: vec![],
    };
    let digest = render_digest(&config, &DigestLimits::default());
    assert!(digest.contains("order_date >= last 30 day"));
}

#[test]
fn budget_predicate_counts_characters_not_bytes() {
    assert!(check_digest_budget("金额字段", 4));
    assert!(!check_digest_budget("金额字段", 3));
}

#[test]
fn empty_config_renders_empty() {
    let digest = render_digest(&SkillConfig::default(), &DigestLimits::default());
    assert!(digest.is_empty());
}
