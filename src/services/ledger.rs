use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::models::{Alert, TradeKey, WalletCluster};

// ---------------------------------------------------------------------------
// Alert ledger
// ---------------------------------------------------------------------------

/// Keys of alerts already emitted, kept for the retention window so that
/// overlapping scan windows never alert twice on the same trade.
#[derive(Debug)]
pub struct AlertLedger {
    retention: Duration,
    emitted: HashMap<TradeKey, DateTime<Utc>>,
}

impl AlertLedger {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            emitted: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }

    pub fn contains(&self, key: &TradeKey) -> bool {
        self.emitted.contains_key(key)
    }

    /// Forget keys emitted before `now - retention`.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.retention;
        let before = self.emitted.len();
        self.emitted.retain(|_, emitted_at| *emitted_at > cutoff);
        before - self.emitted.len()
    }

    /// Record new alerts, returning those not seen within the window and
    /// the number suppressed as duplicates. Order is preserved.
    pub fn admit(&mut self, alerts: &[Alert], now: DateTime<Utc>) -> (Vec<Alert>, usize) {
        let expired = self.prune(now);
        if expired > 0 {
            tracing::debug!(expired, "Alert ledger entries expired");
        }

        let mut fresh = Vec::with_capacity(alerts.len());
        let mut suppressed = 0;

        for alert in alerts {
            if self.emitted.contains_key(&alert.key) {
                tracing::debug!(
                    wallet = %alert.trade.wallet_address,
                    market = %alert.trade.market_id,
                    "Alert already emitted, suppressing"
                );
                suppressed += 1;
                continue;
            }
            self.emitted.insert(alert.key.clone(), now);
            fresh.push(alert.clone());
        }

        (fresh, suppressed)
    }
}

// ---------------------------------------------------------------------------
// Cluster registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TrackedCluster {
    cluster: WalletCluster,
    last_seen: DateTime<Utc>,
}

/// Clusters carried across cycles. A newly detected cluster that shares
/// enough wallets with a tracked one is folded into it.
#[derive(Debug)]
pub struct ClusterRegistry {
    merge_overlap: Decimal,
    retention: Duration,
    tracked: Vec<TrackedCluster>,
}

impl ClusterRegistry {
    pub fn new(merge_overlap: Decimal, retention: Duration) -> Self {
        Self {
            merge_overlap,
            retention,
            tracked: Vec::new(),
        }
    }

    /// Merge this cycle's clusters in and return every cluster they touched.
    pub fn track(&mut self, detected: &[WalletCluster], now: DateTime<Utc>) -> Vec<WalletCluster> {
        let cutoff = now - self.retention;
        self.tracked.retain(|t| t.last_seen > cutoff);

        let mut touched: Vec<usize> = Vec::new();

        for cluster in detected {
            let existing = self
                .tracked
                .iter()
                .position(|t| t.cluster.overlap_ratio(cluster) >= self.merge_overlap);

            let index = match existing {
                Some(i) => {
                    let merged = self.tracked[i].cluster.merged_with(cluster);
                    tracing::info!(
                        cluster_id = %merged.id,
                        wallets = merged.member_wallets.len(),
                        "Cluster merged into tracked group"
                    );
                    self.tracked[i] = TrackedCluster { cluster: merged, last_seen: now };
                    i
                }
                None => {
                    self.tracked.push(TrackedCluster { cluster: cluster.clone(), last_seen: now });
                    self.tracked.len() - 1
                }
            };
            if !touched.contains(&index) {
                touched.push(index);
            }
        }

        touched.into_iter().map(|i| self.tracked[i].cluster.clone()).collect()
    }

    pub fn clusters(&self) -> Vec<WalletCluster> {
        self.tracked.iter().map(|t| t.cluster.clone()).collect()
    }
}
