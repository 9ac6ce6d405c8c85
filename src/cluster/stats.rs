//! Per-cluster aggregation of RFM features.
//!
//! Aggregation covers every cluster id in `[0, k)` including clusters
//! that end up empty, and the final list is sorted by total monetary
//! value descending - independent of the label order the numeric worker
//! happened to produce.

use serde::Serialize;

/// One customer with their RFM features and assigned cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub cluster_id: usize,
    pub recency: f64,
    pub frequency: f64,
    pub monetary: f64,
}

/// Aggregated metadata for one cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterMetadata {
    pub cluster_id: usize,
    pub customer_count: usize,
    pub avg_recency: f64,
    pub avg_frequency: f64,
    pub avg_monetary: f64,
    /// Sum of monetary value across the cluster's customers.
    pub total_value: f64,
    /// This cluster's share of all clusters' total value (0 when the
    /// grand total is 0).
    pub value_share: f64,
    /// Average order value: total monetary / total frequency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_aov: Option<f64>,
    /// Cluster-average recency divided by the maximum recency observed
    /// across *all* customers (0 when that maximum is 0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_churn_risk: Option<f64>,
    /// Radar axes, each in `[0, 1]`: recency health (inverted),
    /// frequency, monetary, average order value, value share.
    pub radar_values: [f64; 5],
}

/// Aggregate customer records into per-cluster metadata.
///
/// Assignments outside `[0, k)` are ignored; they indicate a worker bug
/// and must not panic the aggregation.
pub fn aggregate_clusters(records: &[CustomerRecord], k: usize) -> Vec<ClusterMetadata> {
    #[derive(Default, Clone, Copy)]
    struct Accumulator {
        count: usize,
        recency: f64,
        frequency: f64,
        monetary: f64,
    }

    let mut acc = vec![Accumulator::default(); k];
    let mut max_recency = 0.0f64;

    for record in records {
        if record.cluster_id >= k {
            continue;
        }
        let slot = &mut acc[record.cluster_id];
        slot.count += 1;
        slot.recency += record.recency;
        slot.frequency += record.frequency;
        slot.monetary += record.monetary;
        max_recency = max_recency.max(record.recency);
    }

    let grand_total: f64 = acc.iter().map(|a| a.monetary).sum();

    let mut clusters: Vec<ClusterMetadata> = acc
        .iter()
        .enumerate()
        .map(|(cluster_id, slot)| {
            if slot.count == 0 {
                return ClusterMetadata {
                    cluster_id,
                    customer_count: 0,
                    avg_recency: 0.0,
                    avg_frequency: 0.0,
                    avg_monetary: 0.0,
                    total_value: 0.0,
                    value_share: 0.0,
                    avg_aov: None,
                    avg_churn_risk: None,
                    radar_values: [0.0; 5],
                };
            }

            let n = slot.count as f64;
            let avg_recency = slot.recency / n;
            let avg_aov = if slot.frequency > 0.0 {
                Some(slot.monetary / slot.frequency)
            } else {
                None
            };
            let avg_churn_risk = Some(if max_recency > 0.0 {
                avg_recency / max_recency
            } else {
                0.0
            });

            ClusterMetadata {
                cluster_id,
                customer_count: slot.count,
                avg_recency,
                avg_frequency: slot.frequency / n,
                avg_monetary: slot.monetary / n,
                total_value: slot.monetary,
                value_share: if grand_total > 0.0 {
                    slot.monetary / grand_total
                } else {
                    0.0
                },
                avg_aov,
                avg_churn_risk,
                radar_values: [0.0; 5],
            }
        })
        .collect();

    fill_radar_values(&mut clusters);

    // Sort by value descending, independent of worker label order.
    clusters.sort_by(|a, b| b.total_value.total_cmp(&a.total_value));
    clusters
}

/// Normalize each axis against the maximum across clusters. Recency is
/// inverted so that a recently-active cluster scores high.
fn fill_radar_values(clusters: &mut [ClusterMetadata]) {
    let max_of = |f: fn(&ClusterMetadata) -> f64| {
        clusters
            .iter()
            .filter(|c| c.customer_count > 0)
            .map(f)
            .fold(0.0f64, f64::max)
    };

    let max_recency = max_of(|c| c.avg_recency);
    let max_frequency = max_of(|c| c.avg_frequency);
    let max_monetary = max_of(|c| c.avg_monetary);
    let max_aov = max_of(|c| c.avg_aov.unwrap_or(0.0));

    let norm = |value: f64, max: f64| if max > 0.0 { value / max } else { 0.0 };

    for cluster in clusters.iter_mut() {
        if cluster.customer_count == 0 {
            continue;
        }
        cluster.radar_values = [
            1.0 - norm(cluster.avg_recency, max_recency),
            norm(cluster.avg_frequency, max_frequency),
            norm(cluster.avg_monetary, max_monetary),
            norm(cluster.avg_aov.unwrap_or(0.0), max_aov),
            cluster.value_share,
        ];
    }
}
