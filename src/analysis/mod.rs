pub mod aggregation;
pub mod categorizer;
pub mod normalizer;
pub mod recovery;

use crate::types::{AnalyzedCluster, Cluster};

/// Attach category and price statistics to a normalized cluster.
pub fn analyze(cluster: Cluster) -> AnalyzedCluster {
    let category = categorizer::classify(&cluster.unified_name);
    let stats = aggregation::compute_stats(&cluster);
    AnalyzedCluster { cluster, stats, category }
}
