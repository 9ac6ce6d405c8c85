//! Static keyword, domain-term and numeral tables for query-type
//! classification.
//!
//! These are versioned, data-only tables kept separate from the matching
//! engine so they can be tested and extended without touching control
//! flow. All entries are stored lowercase; the matcher lowercases the
//! input once and does case-insensitive substring search.

use once_cell::sync::Lazy;
use regex::Regex;

use super::router::QueryType;

/// Keyword lists for one query type. Primary hits score 2, secondary
/// hits score 1.
#[derive(Debug, Clone, Copy)]
pub struct TypeKeywords {
    pub query_type: QueryType,
    pub primary: &'static [&'static str],
    pub secondary: &'static [&'static str],
}

/// Per-type keyword table. Declaration order breaks score ties: the
/// first type listed here wins.
pub static KEYWORD_TABLE: &[TypeKeywords] = &[
    TypeKeywords {
        query_type: QueryType::KpiSingle,
        primary: &[
            "总共", "一共", "合计", "总计", "多少", "how many", "how much", "total",
        ],
        secondary: &["统计", "数量", "金额", "count", "sum", "overall"],
    },
    TypeKeywords {
        query_type: QueryType::KpiGrouped,
        primary: &[
            "按照", "分组", "各", "每个", "group by", "grouped by", "breakdown", "by each",
        ],
        secondary: &["统计", "汇总", "分类", "aggregate", "summarize"],
    },
    TypeKeywords {
        query_type: QueryType::TrendTime,
        primary: &[
            "趋势", "走势", "变化", "按月", "按周", "按日", "trend", "over time", "monthly",
            "weekly", "daily",
        ],
        secondary: &["时间", "最近", "每月", "每天", "month", "recent"],
    },
    TypeKeywords {
        query_type: QueryType::Distribution,
        primary: &[
            "分布", "占比", "比例", "构成", "distribution", "proportion", "percentage", "share",
        ],
        secondary: &["份额", "组成", "比重", "ratio"],
    },
    TypeKeywords {
        query_type: QueryType::TopN,
        primary: &["排名", "排行", "top", "最高", "最多", "最大", "ranking"],
        secondary: &["前", "最", "highest", "largest", "best", "rank"],
    },
    TypeKeywords {
        query_type: QueryType::Comparison,
        primary: &[
            "对比", "相比", "比较", "环比", "同比", "compare", "comparison", "versus", " vs ",
        ],
        secondary: &["差异", "差别", "difference", "gap"],
    },
];

/// Domain terms shared by every industry.
pub static GENERAL_DOMAIN_TERMS: &[&str] = &[
    "金额", "数量", "订单", "客户", "用户", "收入", "amount", "order", "customer", "revenue",
    "sales",
];

/// Industry-specific domain terms, keyed by industry name. When no
/// industry is given, every list is searched.
pub static INDUSTRY_DOMAIN_TERMS: &[(&str, &[&str])] = &[
    (
        "ecommerce",
        &[
            "销售额", "客单价", "成交额", "复购", "下单", "转化率", "gmv", "sku", "cart",
            "checkout",
        ],
    ),
    (
        "retail",
        &["门店", "销量", "库存", "货品", "动销", "store", "inventory", "shelf"],
    ),
    (
        "finance",
        &[
            "交易", "余额", "流水", "账户", "利息", "balance", "transaction", "interest",
        ],
    ),
];

/// Chinese numeral words recognized in top-N queries. Scanned in
/// declaration order; the first word found anywhere in the input wins,
/// with no aggregation of multiple numerals.
pub static CHINESE_NUMERALS: &[(&str, u32)] = &[
    ("十", 10),
    ("五", 5),
    ("三", 3),
    ("二十", 20),
    ("五十", 50),
    ("百", 100),
];

/// Digit-form top-N patterns. Checked before the numeral table.
pub static TOP_N_DIGIT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)top\s*(\d+)").expect("top-n pattern"),
        Regex::new(r"前\s*(\d+)").expect("top-n pattern"),
    ]
});
