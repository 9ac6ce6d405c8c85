//! Static pattern tables for column-role detection.
//!
//! Data only - the matching engine lives in [`super::detect`]. Tables are
//! ordered: earlier tiers and earlier patterns within a tier win first.
//! All patterns are stored lowercase; matching lowercases the column
//! name once.

/// One detection tier: an ordered pattern list and the confidence a
/// match at this tier earns.
#[derive(Debug, Clone, Copy)]
pub struct PatternTier {
    pub patterns: &'static [&'static str],
    pub confidence: f64,
}

/// Pre-computed RFM feature names. A column whose lowercased name equals
/// or contains one of these is treated as that feature.
pub static PRECOMPUTED_RFM: &[&str] = &["recency", "frequency", "monetary"];

/// Customer-id tiers: explicit customer terms first, then user/member
/// terms. The generic customer-word + id-suffix combination is a third
/// tier expressed by [`CUSTOMER_WORDS`] and [`ID_SUFFIXES`].
pub static CUSTOMER_ID_TIERS: &[PatternTier] = &[
    PatternTier {
        patterns: &[
            "customer_id", "customerid", "cust_id", "custid", "客户id", "客户编号", "顾客id",
        ],
        confidence: 1.0,
    },
    PatternTier {
        patterns: &[
            "user_id", "userid", "member_id", "memberid", "用户id", "会员id", "买家id",
        ],
        confidence: 0.8,
    },
];

/// Customer-like words for the generic tier.
pub static CUSTOMER_WORDS: &[&str] = &[
    "customer", "cust", "user", "member", "buyer", "client", "客户", "用户", "会员", "买家",
    "顾客",
];

/// Id-like suffixes for the generic tier.
pub static ID_SUFFIXES: &[&str] = &["id", "编号", "code", "no"];

/// Order-id tiers: explicit order terms, then transaction/invoice terms.
pub static ORDER_ID_TIERS: &[PatternTier] = &[
    PatternTier {
        patterns: &[
            "order_id", "orderid", "order_no", "orderno", "订单id", "订单编号", "订单号",
        ],
        confidence: 1.0,
    },
    PatternTier {
        patterns: &[
            "transaction_id", "trans_id", "invoice_id", "invoice_no", "交易id", "流水号", "单号",
        ],
        confidence: 0.8,
    },
];

/// Time-like name fragments. Shared between order-date detection and the
/// date/time exclusion applied to amount candidates.
pub static TIME_PATTERNS: &[&str] = &[
    "date", "time", "datetime", "timestamp", "日期", "时间", "年月", "月份",
];

/// Order-date tiers: explicit order/purchase timestamps first, then any
/// time-like column via the shared [`TIME_PATTERNS`] list.
pub static ORDER_DATE_TIERS: &[PatternTier] = &[
    PatternTier {
        patterns: &[
            "order_date", "order_time", "orderdate", "ordertime", "create_time", "created_at",
            "下单时间", "订单日期", "购买时间", "交易时间", "创建时间",
        ],
        confidence: 1.0,
    },
    PatternTier {
        patterns: TIME_PATTERNS,
        confidence: 0.8,
    },
];

/// Precise monetary terms, matched by equality. A hit here
/// short-circuits with confidence 1.0.
pub static AMOUNT_EXACT_PATTERNS: &[&str] = &[
    "amount",
    "total_amount",
    "order_amount",
    "pay_amount",
    "payment_amount",
    "total_price",
    "金额",
    "订单金额",
    "支付金额",
    "消费金额",
    "交易金额",
    "成交额",
];

/// Fuzzy monetary fragments, matched by containment and filtered by the
/// exclusion lists below. A surviving hit earns confidence 0.8.
pub static AMOUNT_FUZZY_PATTERNS: &[&str] = &[
    "amount", "price", "total", "fee", "cost", "pay", "金额", "价格", "费用", "总额",
];

/// Suffixes that disqualify a fuzzy amount candidate (id/serial-like).
pub static AMOUNT_EXCLUDE_SUFFIXES: &[&str] = &["id", "_no", "_num", "code"];

/// Fragments that disqualify a fuzzy amount candidate (method/type-like,
/// status-like, serial-like). Date/time-like names are excluded via the
/// shared [`TIME_PATTERNS`].
pub static AMOUNT_EXCLUDE_FRAGMENTS: &[&str] = &[
    "method", "type", "status", "state", "方式", "类型", "状态", "编号", "序号",
];
