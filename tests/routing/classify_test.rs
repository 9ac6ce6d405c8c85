use std::sync::Arc;

use async_trait::async_trait;
use cohort::routing::{
    classify_by_keywords, extract_top_n, ChatMessage, ClassificationMethod, ModelClient,
    ModelError, QueryType, QueryTypeRouter,
};

#[test]
fn grouped_stats_query_classifies_as_kpi_grouped() {
    let result = classify_by_keywords("按照地区统计销售额", None);
    assert_eq!(result.query_type, QueryType::KpiGrouped);
    assert!(result.confidence >= 0.75);
    assert_eq!(result.method, ClassificationMethod::Keyword);
    assert!(result.matched_keywords.iter().any(|k| k == "按照"));
}

#[test]
fn intent_coverage_across_types() {
    let cases = [
        ("一共有多少订单", QueryType::KpiSingle),
        ("各品类的销售额汇总", QueryType::KpiGrouped),
        ("销售额的月度趋势", QueryType::TrendTime),
        ("各渠道的订单占比分布", QueryType::Distribution),
        ("top 10 products by revenue", QueryType::TopN),
        ("本月与上月环比对比", QueryType::Comparison),
    ];
    for (input, expected) in cases {
        let result = classify_by_keywords(input, None);
        assert_eq!(result.query_type, expected, "input {input:?}");
        assert!(result.confidence > 0.0);
    }
}

#[test]
fn unmatched_input_is_unknown_at_zero_confidence() {
    let result = classify_by_keywords("tell me a story", None);
    assert_eq!(result.query_type, QueryType::Unknown);
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn confidence_tiers() {
    // Single weak secondary hit (score 1): 0.6.
    let weak = classify_by_keywords("gap analysis", None);
    assert_eq!(weak.query_type, QueryType::Comparison);
    assert_eq!(weak.confidence, 0.6);

    // One primary hit, no domain term (score 2): 0.75.
    let moderate = classify_by_keywords("show the breakdown please", None);
    assert_eq!(moderate.query_type, QueryType::KpiGrouped);
    assert_eq!(moderate.confidence, 0.75);

    // Primary hit plus a domain term: 1.0.
    let domain = classify_by_keywords("show the breakdown of revenue", None);
    assert_eq!(domain.confidence, 1.0);
}

#[test]
fn top_n_extraction_priority() {
    // Digit forms beat numeral words.
    assert_eq!(extract_top_n("top 10"), Some(10));
    assert_eq!(extract_top_n("前3名"), Some(3));
    assert_eq!(extract_top_n("top 7 前十"), Some(7));

    // Numeral table in declaration order, first match wins.
    assert_eq!(extract_top_n("前十名"), Some(10));
    assert_eq!(extract_top_n("销量最高的五家店"), Some(5));
    assert_eq!(extract_top_n("前二十"), Some(10)); // 十 is declared first
    assert_eq!(extract_top_n("nothing numeric"), None);
}

struct CannedModel {
    reply: Result<String, ()>,
}

#[async_trait]
impl ModelClient for CannedModel {
    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, ModelError> {
        self.reply
            .clone()
            .map_err(|_| ModelError::Transport("unreachable endpoint".into()))
    }
}

#[tokio::test]
async fn confident_keyword_result_skips_the_model() {
    // The model would answer comparison, but the keyword result is
    // already >= 0.7 and must win without consulting it.
    let model = Arc::new(CannedModel {
        reply: Ok(r#"{"queryType": "comparison", "confidence": 0.99}"#.into()),
    });
    let router = QueryTypeRouter::with_model(model);
    let result = router.classify("按照地区统计销售额", None, None).await;
    assert_eq!(result.query_type, QueryType::KpiGrouped);
    assert_eq!(result.method, ClassificationMethod::Keyword);
}

#[tokio::test]
async fn weak_keyword_result_upgraded_by_strictly_better_model() {
    let model = Arc::new(CannedModel {
        reply: Ok(r#"{"queryType": "trend_time", "confidence": 0.8, "reasoning": "time"}"#.into()),
    });
    let router = QueryTypeRouter::with_model(model);
    // "gap" alone scores 1 -> confidence 0.6, below the 0.7 floor.
    let result = router.classify("gap analysis", None, None).await;
    assert_eq!(result.query_type, QueryType::TrendTime);
    assert_eq!(result.method, ClassificationMethod::Model);
    assert_eq!(result.confidence, 0.8);
}

#[tokio::test]
async fn model_tie_keeps_keyword_result() {
    // Model answer at exactly the keyword confidence must not replace it.
    let model = Arc::new(CannedModel {
        reply: Ok(r#"{"queryType": "trend_time", "confidence": 0.6}"#.into()),
    });
    let router = QueryTypeRouter::with_model(model);
    let result = router.classify("gap analysis", None, None).await;
    assert_eq!(result.query_type, QueryType::Comparison);
    assert_eq!(result.method, ClassificationMethod::Keyword);
}

#[tokio::test]
async fn model_failure_degrades_to_keyword_result() {
    let model = Arc::new(CannedModel { reply: Err(()) });
    let router = QueryTypeRouter::with_model(model);
    let result = router.classify("gap analysis", None, None).await;
    // Transport failure yields unknown@0.3, which loses to keyword@0.6.
    assert_eq!(result.query_type, QueryType::Comparison);
    assert_eq!(result.method, ClassificationMethod::Keyword);
}

#[tokio::test]
async fn model_failure_on_unknown_keyword_result() {
    let model = Arc::new(CannedModel { reply: Err(()) });
    let router = QueryTypeRouter::with_model(model);
    // Keyword unknown@0.0 loses to the model's unknown@0.3 - still
    // unknown, but attributed to the model path.
    let result = router.classify("tell me a story", None, None).await;
    assert_eq!(result.query_type, QueryType::Unknown);
    assert_eq!(result.confidence, 0.3);
}
