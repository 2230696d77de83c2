use crate::types::{Cluster, ClusterStats};

/// Price statistics for one cluster.
///
/// Member prices win when any exist. Otherwise a positive group average is
/// used for average, min and max alike. Otherwise everything is zero.
/// `source_count` is the member count in every case.
pub fn compute_stats(cluster: &Cluster) -> ClusterStats {
    let prices: Vec<f64> = cluster.members.iter().filter_map(|m| m.price()).collect();
    let source_count = cluster.members.len();

    if !prices.is_empty() {
        let min_price = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max_price = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        return ClusterStats {
            average_price: mean(&prices),
            price_variance: sample_std_dev(&prices),
            min_price,
            max_price,
            source_count,
        };
    }

    if cluster.group_average_price > 0.0 {
        let avg = cluster.group_average_price;
        return ClusterStats {
            average_price: avg,
            price_variance: 0.0,
            min_price: avg,
            max_price: avg,
            source_count,
        };
    }

    ClusterStats { source_count, ..ClusterStats::default() }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n - 1) standard deviation; 0 for fewer than two values.
fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}
