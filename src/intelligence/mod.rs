pub mod analytics;
pub mod cascade;
pub mod cluster;
pub mod profile;
pub mod scorer;
pub mod signals;
pub mod stats;

pub use analytics::{activity_stats, rank_markets, ActivityStats, MarketSummary, SignalStats};
pub use cascade::{baseline_volume, detect_cascades, spark_links};
pub use cluster::{detect_clusters, pair_sync};
pub use profile::build_wallet_profile;
pub use scorer::{build_alert, gate_severity, raw_tier, score_trade};
pub use signals::{evaluate_all, SignalInput, EVALUATORS};
