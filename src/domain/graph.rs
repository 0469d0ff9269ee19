//! Conversion graph: cheapest multiplicative path between currencies, with a
//! TTL-cached lookup generalizing a flat rate table into a shortest-path
//! query.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::RwLock;

use super::currency::ConversionRate;

const DEFAULT_TTL_SECS: i64 = 24 * 60 * 60;

/// Directed weighted graph over currency ids, rebuilt fresh from the
/// `ConversionRate` table whenever that table changes.
#[derive(Debug, Clone, Default)]
pub struct ConversionGraph {
    forward: HashMap<i64, Vec<(i64, Decimal)>>,
    reversed: HashMap<i64, Vec<(i64, Decimal)>>,
}

impl ConversionGraph {
    pub fn build(rates: &[ConversionRate]) -> Self {
        let mut forward: HashMap<i64, Vec<(i64, Decimal)>> = HashMap::new();
        let mut reversed: HashMap<i64, Vec<(i64, Decimal)>> = HashMap::new();

        let mut add_edge = |adj: &mut HashMap<i64, Vec<(i64, Decimal)>>, from: i64, to: i64, w: Decimal| {
            adj.entry(from).or_default().push((to, w));
        };

        for r in rates {
            add_edge(&mut forward, r.from_currency, r.to_currency, r.rate);
            add_edge(&mut reversed, r.to_currency, r.from_currency, r.rate);
            if r.allow_reversed {
                let inv = Decimal::ONE / r.rate;
                add_edge(&mut forward, r.to_currency, r.from_currency, inv);
                add_edge(&mut reversed, r.from_currency, r.to_currency, inv);
            }
        }

        Self { forward, reversed }
    }

    /// Cheapest product of edge weights from `start` to every reachable node,
    /// via the given adjacency (forward for `rate`, reversed for `rates_from`).
    fn dijkstra(adjacency: &HashMap<i64, Vec<(i64, Decimal)>>, start: i64) -> HashMap<i64, Decimal> {
        let mut best: HashMap<i64, Decimal> = HashMap::new();
        let mut heap: BinaryHeap<Reverse<(Decimal, i64)>> = BinaryHeap::new();

        best.insert(start, Decimal::ONE);
        heap.push(Reverse((Decimal::ONE, start)));

        while let Some(Reverse((cost, node))) = heap.pop() {
            if let Some(&b) = best.get(&node) {
                if cost > b {
                    continue;
                }
            }
            if let Some(edges) = adjacency.get(&node) {
                for &(next, weight) in edges {
                    let candidate = cost * weight;
                    let better = match best.get(&next) {
                        Some(&b) => candidate < b,
                        None => true,
                    };
                    if better {
                        best.insert(next, candidate);
                        heap.push(Reverse((candidate, next)));
                    }
                }
            }
        }

        best
    }

    fn known(&self, currency: i64) -> bool {
        self.forward.contains_key(&currency) || self.reversed.contains_key(&currency)
    }

    /// Cheapest conversion rate `from -> to`, or `None` if either currency is
    /// unknown to the graph or no path connects them.
    pub fn rate(&self, from: i64, to: i64) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::ONE);
        }
        if !self.known(from) || !self.known(to) {
            return None;
        }
        Self::dijkstra(&self.forward, from).get(&to).copied()
    }

    /// For every currency reachable into `from`, the cheapest rate converting
    /// it into `from`, computed by running Dijkstra on the reversed graph.
    pub fn rates_from(&self, from: i64) -> HashMap<i64, Decimal> {
        if !self.known(from) {
            return HashMap::new();
        }
        Self::dijkstra(&self.reversed, from)
    }
}

/// Wall-clock TTL cache in front of a [`ConversionGraph`], keyed by currency
/// pair for single rates and by source currency for whole `rates_from` rows.
pub struct RateCache {
    ttl_secs: i64,
    rate_entries: RwLock<HashMap<(i64, i64), (Decimal, DateTime<Utc>)>>,
    rates_from_entries: RwLock<HashMap<i64, (HashMap<i64, Decimal>, DateTime<Utc>)>>,
}

impl RateCache {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl_secs,
            rate_entries: RwLock::new(HashMap::new()),
            rates_from_entries: RwLock::new(HashMap::new()),
        }
    }

    fn fresh(&self, stamped_at: DateTime<Utc>) -> bool {
        (Utc::now() - stamped_at).num_seconds() < self.ttl_secs
    }

    /// Look up `rate(from, to)`, consulting the graph only on a cache miss or
    /// when `fresh` bypasses the cache for an administrative refresh.
    pub fn rate(&self, graph: &ConversionGraph, from: i64, to: i64, fresh: bool) -> Option<Decimal> {
        if !fresh {
            if let Some(&(rate, stamped_at)) = self.rate_entries.read().unwrap().get(&(from, to)) {
                if self.fresh(stamped_at) {
                    return Some(rate);
                }
            }
        }
        let computed = graph.rate(from, to)?;
        self.rate_entries
            .write()
            .unwrap()
            .insert((from, to), (computed, Utc::now()));
        Some(computed)
    }

    pub fn rates_from(&self, graph: &ConversionGraph, from: i64, fresh: bool) -> HashMap<i64, Decimal> {
        if !fresh {
            if let Some((rates, stamped_at)) = self.rates_from_entries.read().unwrap().get(&from) {
                if self.fresh(*stamped_at) {
                    return rates.clone();
                }
            }
        }
        let computed = graph.rates_from(from);
        self.rates_from_entries
            .write()
            .unwrap()
            .insert(from, (computed.clone(), Utc::now()));
        computed
    }

    /// Drop every cached entry; called whenever the `ConversionRate` table is
    /// mutated, since any single edge change can alter many shortest paths.
    pub fn invalidate_all(&self) {
        self.rate_entries.write().unwrap().clear();
        self.rates_from_entries.write().unwrap().clear();
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}
