use chrono::Duration;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{NodeIndex, UnGraph};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

use super::stats::{checked_sum, unit};
use crate::config::DetectionConfig;
use crate::models::{Trade, WalletCluster};

/// Best synchronisation seen between two wallets, plus the trades behind
/// every qualifying pair.
#[derive(Debug, Default)]
struct PairEdge {
    weight: Decimal,
    trades: BTreeSet<usize>,
}

/// Synchronisation of two trades in the same market, 0–1.
///
/// `time_weight × (1 − dt/window) + side_weight × [same side]
///  + size_weight × min/max(notional)`. Zero outside the window.
pub fn pair_sync(a: &Trade, b: &Trade, config: &DetectionConfig) -> Decimal {
    let window_secs = config.cluster_window_minutes * 60;
    if window_secs <= 0 {
        return Decimal::ZERO;
    }
    let dt = (a.timestamp - b.timestamp).num_seconds().abs();
    if dt > window_secs {
        return Decimal::ZERO;
    }

    let time = Decimal::ONE - Decimal::from(dt) / Decimal::from(window_secs);
    let side = if a.side == b.side { Decimal::ONE } else { Decimal::ZERO };
    let larger = a.notional_usd.max(b.notional_usd);
    let size = if larger > Decimal::ZERO {
        a.notional_usd.min(b.notional_usd) / larger
    } else {
        Decimal::ZERO
    };

    unit(
        config.cluster_time_weight * time
            + config.cluster_side_weight * side
            + config.cluster_size_weight * size,
    )
}

/// Group wallets whose trades line up in market, time, side and size.
///
/// Only pairs of distinct wallets inside `cluster_window_minutes` of each
/// other in the same market are compared, so the work per market is bounded
/// by its fan-out within the window.
pub fn detect_clusters(trades: &[Trade], config: &DetectionConfig) -> Vec<WalletCluster> {
    let window = Duration::minutes(config.cluster_window_minutes);
    let edges = collect_edges(trades, window, config);
    if edges.is_empty() {
        return Vec::new();
    }

    // -- Build the wallet graph from qualifying edges --
    let mut graph: UnGraph<&str, Decimal> = UnGraph::default();
    let mut nodes: BTreeMap<&str, NodeIndex> = BTreeMap::new();

    for ((a, b), edge) in &edges {
        let na = *nodes.entry(a.as_str()).or_insert_with(|| graph.add_node(a.as_str()));
        let nb = *nodes.entry(b.as_str()).or_insert_with(|| graph.add_node(b.as_str()));
        graph.add_edge(na, nb, edge.weight);
    }

    let mut clusters = Vec::new();

    for component in kosaraju_scc(&graph) {
        if component.len() < config.cluster_min_wallets.max(2) {
            continue;
        }
        let members: BTreeSet<String> = component.iter().map(|n| graph[*n].to_string()).collect();

        let correlation = mean_pair_weight(&members, &edges);
        if correlation <= config.cluster_min_correlation {
            tracing::debug!(
                wallets = members.len(),
                correlation = %correlation,
                "Wallet group below correlation threshold"
            );
            continue;
        }

        let correlated: BTreeSet<usize> = edges
            .iter()
            .filter(|((a, b), _)| members.contains(a) && members.contains(b))
            .flat_map(|(_, edge)| edge.trades.iter().copied())
            .collect();

        let Some(first_detected) = correlated.iter().map(|i| trades[*i].timestamp).min() else {
            continue;
        };

        let cluster = WalletCluster {
            id: WalletCluster::id_for(&members),
            markets: correlated.iter().map(|i| trades[*i].market_id.clone()).collect(),
            correlation_score: correlation.round_dp(4),
            total_volume_usd: checked_sum(correlated.iter().map(|i| trades[*i].notional_usd))
                .unwrap_or(Decimal::MAX),
            trade_count: correlated.len(),
            first_detected,
            member_wallets: members,
        };

        tracing::info!(
            cluster_id = %cluster.id,
            wallets = cluster.member_wallets.len(),
            markets = cluster.markets.len(),
            correlation = %cluster.correlation_score,
            volume = %cluster.total_volume_usd,
            "Wallet cluster detected"
        );

        clusters.push(cluster);
    }

    clusters.sort_by(|a, b| {
        b.correlation_score
            .cmp(&a.correlation_score)
            .then_with(|| a.id.cmp(&b.id))
    });
    clusters
}

/// Wallet-pair edges at or above `cluster_min_edge_weight`, keyed by the
/// ordered wallet pair.
fn collect_edges(
    trades: &[Trade],
    window: Duration,
    config: &DetectionConfig,
) -> BTreeMap<(String, String), PairEdge> {
    let mut by_market: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, trade) in trades.iter().enumerate() {
        by_market.entry(trade.market_id.as_str()).or_default().push(i);
    }

    let mut edges: BTreeMap<(String, String), PairEdge> = BTreeMap::new();

    for (market, mut idx) in by_market {
        idx.sort_by(|a, b| {
            trades[*a]
                .timestamp
                .cmp(&trades[*b].timestamp)
                .then_with(|| trades[*a].key().cmp(&trades[*b].key()))
        });

        let cap = config.cluster_max_market_trades;
        if cap > 0 && idx.len() > cap {
            tracing::warn!(
                market = %market,
                trades = idx.len(),
                kept = cap,
                "Market fan-out above cluster cap, keeping most recent trades"
            );
            idx.drain(..idx.len() - cap);
        }

        for (pos, &i) in idx.iter().enumerate() {
            let a = &trades[i];
            for &j in &idx[pos + 1..] {
                let b = &trades[j];
                if b.timestamp - a.timestamp > window {
                    break;
                }
                if a.wallet_address == b.wallet_address {
                    continue;
                }

                let sync = pair_sync(a, b, config);
                if sync < config.cluster_min_edge_weight {
                    continue;
                }

                let pair = if a.wallet_address < b.wallet_address {
                    (a.wallet_address.clone(), b.wallet_address.clone())
                } else {
                    (b.wallet_address.clone(), a.wallet_address.clone())
                };
                let edge = edges.entry(pair).or_default();
                edge.weight = edge.weight.max(sync);
                edge.trades.insert(i);
                edge.trades.insert(j);
            }
        }
    }

    edges
}

/// Mean edge weight over every member pair; pairs without an edge count 0.
fn mean_pair_weight(members: &BTreeSet<String>, edges: &BTreeMap<(String, String), PairEdge>) -> Decimal {
    let list: Vec<&String> = members.iter().collect();
    let mut sum = Decimal::ZERO;
    let mut pairs = 0i64;

    for (pos, a) in list.iter().enumerate() {
        for b in &list[pos + 1..] {
            pairs += 1;
            if let Some(edge) = edges.get(&((*a).clone(), (*b).clone())) {
                sum += edge.weight;
            }
        }
    }

    if pairs == 0 {
        Decimal::ZERO
    } else {
        unit(sum / Decimal::from(pairs))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
