use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A group of wallets whose trading was synchronised within one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletCluster {
    pub id: Uuid,
    pub member_wallets: BTreeSet<String>,
    pub markets: BTreeSet<String>,
    /// Mean pairwise synchronisation across all member pairs, 0–1.
    pub correlation_score: Decimal,
    pub total_volume_usd: Decimal,
    pub trade_count: usize,
    pub first_detected: DateTime<Utc>,
}

impl WalletCluster {
    /// Deterministic id from the member set.
    pub fn id_for(members: &BTreeSet<String>) -> Uuid {
        let joined = members.iter().cloned().collect::<Vec<_>>().join(",");
        Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("cluster:{joined}").as_bytes())
    }

    /// Shared members over the smaller member set.
    pub fn overlap_ratio(&self, other: &WalletCluster) -> Decimal {
        let smaller = self.member_wallets.len().min(other.member_wallets.len());
        if smaller == 0 {
            return Decimal::ZERO;
        }
        let shared = self.member_wallets.intersection(&other.member_wallets).count();
        Decimal::from(shared as i64) / Decimal::from(smaller as i64)
    }

    /// Fold a later detection of the same group into this one.
    pub fn merged_with(&self, later: &WalletCluster) -> WalletCluster {
        let member_wallets: BTreeSet<String> =
            self.member_wallets.union(&later.member_wallets).cloned().collect();
        let markets = self.markets.union(&later.markets).cloned().collect();

        WalletCluster {
            id: WalletCluster::id_for(&member_wallets),
            member_wallets,
            markets,
            correlation_score: self.correlation_score.max(later.correlation_score),
            total_volume_usd: self.total_volume_usd + later.total_volume_usd,
            trade_count: self.trade_count + later.trade_count,
            first_detected: self.first_detected.min(later.first_detected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_cluster(wallets: &[&str], volume: i64, hours_ago: i64) -> WalletCluster {
        let members: BTreeSet<String> = wallets.iter().map(|w| w.to_string()).collect();
        WalletCluster {
            id: WalletCluster::id_for(&members),
            member_wallets: members,
            markets: BTreeSet::from(["market_a".to_string()]),
            correlation_score: Decimal::new(8, 1),
            total_volume_usd: Decimal::from(volume),
            trade_count: wallets.len(),
            first_detected: Utc::now() - Duration::hours(hours_ago),
        }
    }

    #[test]
    fn test_id_is_order_independent() {
        let a = make_cluster(&["w1", "w2", "w3"], 100, 0);
        let b = make_cluster(&["w3", "w1", "w2"], 100, 0);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_overlap_ratio() {
        let a = make_cluster(&["w1", "w2", "w3"], 100, 0);
        let b = make_cluster(&["w2", "w3"], 100, 0);
        let c = make_cluster(&["w7", "w8"], 100, 0);
        assert_eq!(a.overlap_ratio(&b), Decimal::ONE);
        assert_eq!(a.overlap_ratio(&c), Decimal::ZERO);
    }

    #[test]
    fn test_merge_keeps_earliest_and_sums_volume() {
        let earlier = make_cluster(&["w1", "w2"], 1_000, 5);
        let later = make_cluster(&["w2", "w3"], 500, 1);
        let merged = earlier.merged_with(&later);
        assert_eq!(merged.member_wallets.len(), 3);
        assert_eq!(merged.total_volume_usd, Decimal::from(1_500));
        assert_eq!(merged.first_detected, earlier.first_detected);
    }
}
