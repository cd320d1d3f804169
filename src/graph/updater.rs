//! Updater - bounded-concurrency refresh of stale origin nodes
//!
//! Walks the given roots, groups non-fresh origin leaves by
//! `(origin name, pair)`, and issues one fetch task per origin under a
//! fixed-size semaphore. A panicking fetch is contained at the task
//! boundary and converted into per-pair error ticks, so one origin's outage
//! never takes down a round. Results are applied only after every task has
//! finished; callers never observe a half-applied round.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::graph::error::{FeedError, UpdateError};
use crate::graph::feed::Origin;
use crate::graph::node::Node;
use crate::graph::tick::Tick;
use crate::graph::walk::walk;
use crate::types::Pair;

/// Upper bound on fetch tasks in flight at once.
pub const MAX_CONCURRENT_UPDATES: usize = 10;

/// Refreshes origin nodes from registered origins.
pub struct Updater {
    origins: HashMap<String, Arc<dyn Origin>>,
    gate: Arc<Semaphore>,
}

impl Updater {
    pub fn new(origins: HashMap<String, Arc<dyn Origin>>) -> Self {
        Self {
            origins,
            gate: Arc::new(Semaphore::new(MAX_CONCURRENT_UPDATES)),
        }
    }

    /// Refresh every non-fresh origin node reachable from `roots`.
    ///
    /// Best-effort by design: per-origin failures (missing ticks, rejected
    /// ticks, panics) are demoted to warnings on the affected nodes. Only
    /// task-join plumbing errors fail the call. Dropping the returned
    /// future cancels in-flight fetches without corrupting node state.
    pub async fn update(&self, roots: &[Arc<Node>]) -> Result<(), UpdateError> {
        // Group non-fresh origin leaves by (origin, pair), deduplicated, and
        // the distinct pairs each origin must be asked for.
        let mut pending: HashMap<(String, Pair), Vec<Arc<Node>>> = HashMap::new();
        let mut pairs_by_origin: HashMap<String, Vec<Pair>> = HashMap::new();
        walk(
            &mut |node: &Arc<Node>| {
                if let Some(origin) = node.as_origin() {
                    if origin.is_fresh() {
                        return;
                    }
                    let key = (origin.origin().to_string(), origin.pair());
                    let group = pending.entry(key.clone()).or_default();
                    if group.is_empty() {
                        pairs_by_origin.entry(key.0).or_default().push(key.1);
                    }
                    group.push(node.clone());
                }
            },
            roots,
        );

        if pending.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            origins = pairs_by_origin.len(),
            groups = pending.len(),
            "starting fetch round"
        );

        let mut tasks: JoinSet<(String, Vec<Tick>)> = JoinSet::new();
        for (name, pairs) in pairs_by_origin {
            let origin = match self.origins.get(&name) {
                Some(origin) => origin.clone(),
                None => {
                    tracing::warn!(origin = %name, "no such origin registered");
                    continue;
                }
            };
            let gate = self.gate.clone();
            tasks.spawn(async move {
                let permit = match gate.acquire_owned().await {
                    Ok(permit) => permit,
                    // Only possible if the semaphore were closed; report
                    // nothing and let the apply stage raise missing-tick
                    // warnings.
                    Err(_) => return (name, Vec::new()),
                };
                let ticks = fetch_contained(origin, &name, &pairs).await;
                drop(permit);
                (name, ticks)
            });
        }

        // Join every task before touching any node.
        let mut fetched: HashMap<(String, Pair), Tick> = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (name, ticks) = joined?;
            for tick in ticks {
                fetched.insert((name.clone(), tick.pair.clone()), tick);
            }
        }

        for ((name, pair), nodes) in pending {
            let origins = nodes.iter().filter_map(|node| node.as_origin());
            match fetched.get(&(name.clone(), pair.clone())) {
                Some(tick) => {
                    for origin in origins {
                        if let Err(err) = origin.set_tick(tick.clone()) {
                            tracing::warn!(origin = %name, pair = %pair, error = %err, "tick rejected");
                            origin.set_warning(err);
                        }
                    }
                }
                None => {
                    let warning = if self.origins.contains_key(&name) {
                        tracing::warn!(origin = %name, pair = %pair, "no tick returned");
                        FeedError::MissingTick {
                            origin: name.clone(),
                            pair: pair.clone(),
                        }
                    } else {
                        FeedError::UnknownOrigin(name.clone())
                    };
                    for origin in origins {
                        origin.set_warning(warning.clone());
                    }
                }
            }
        }
        Ok(())
    }
}

/// Run one origin fetch in its own task so a panic is contained and turned
/// into per-pair error ticks instead of unwinding through the round.
async fn fetch_contained(origin: Arc<dyn Origin>, name: &str, pairs: &[Pair]) -> Vec<Tick> {
    let task_pairs = pairs.to_vec();
    let handle = tokio::spawn(async move { origin.fetch_ticks(&task_pairs).await });
    match handle.await {
        Ok(ticks) => ticks,
        Err(err) => {
            let message = if err.is_panic() {
                panic_message(err.into_panic())
            } else {
                err.to_string()
            };
            tracing::warn!(origin = %name, message = %message, "fetch task panicked");
            pairs
                .iter()
                .map(|pair| {
                    Tick::from_error(
                        pair.clone(),
                        FeedError::FetchPanic {
                            origin: name.to_string(),
                            message: message.clone(),
                        },
                    )
                })
                .collect()
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "unknown panic".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::nodes::{MedianNode, OriginNode};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StaticOrigin {
        price: Decimal,
    }

    #[async_trait]
    impl Origin for StaticOrigin {
        async fn fetch_ticks(&self, pairs: &[Pair]) -> Vec<Tick> {
            pairs
                .iter()
                .map(|pair| Tick::new(pair.clone(), self.price, Utc::now()))
                .collect()
        }
    }

    struct SilentOrigin;

    #[async_trait]
    impl Origin for SilentOrigin {
        async fn fetch_ticks(&self, _pairs: &[Pair]) -> Vec<Tick> {
            Vec::new()
        }
    }

    struct PanickingOrigin;

    #[async_trait]
    impl Origin for PanickingOrigin {
        async fn fetch_ticks(&self, _pairs: &[Pair]) -> Vec<Tick> {
            panic!("exchange adapter blew up");
        }
    }

    /// Tracks the maximum number of concurrent fetch calls.
    struct CountingOrigin {
        current: AtomicUsize,
        max_seen: AtomicUsize,
        price: Decimal,
    }

    impl CountingOrigin {
        fn new(price: Decimal) -> Self {
            Self {
                current: AtomicUsize::new(0),
                max_seen: AtomicUsize::new(0),
                price,
            }
        }
    }

    #[async_trait]
    impl Origin for CountingOrigin {
        async fn fetch_ticks(&self, pairs: &[Pair]) -> Vec<Tick> {
            let now_running = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now_running, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            pairs
                .iter()
                .map(|pair| Tick::new(pair.clone(), self.price, Utc::now()))
                .collect()
        }
    }

    fn origin_node(name: &str, pair: Pair) -> Arc<Node> {
        Arc::new(Node::Origin(OriginNode::new(
            name,
            pair,
            Duration::seconds(60),
            Duration::seconds(300),
        )))
    }

    fn updater_with(origins: Vec<(&str, Arc<dyn Origin>)>) -> Updater {
        Updater::new(
            origins
                .into_iter()
                .map(|(name, origin)| (name.to_string(), origin))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_update_refreshes_stale_nodes() {
        let pair = Pair::new("BTC", "USD");
        let node = origin_node("binance", pair.clone());
        let updater = updater_with(vec![(
            "binance",
            Arc::new(StaticOrigin { price: dec!(20000) }) as Arc<dyn Origin>,
        )]);

        updater.update(&[node.clone()]).await.unwrap();
        let tick = node.tick();
        assert!(tick.validate().is_ok());
        assert_eq!(tick.price, Some(dec!(20000)));
    }

    #[tokio::test]
    async fn test_fresh_nodes_are_skipped() {
        let pair = Pair::new("BTC", "USD");
        let node = origin_node("binance", pair.clone());
        if let Some(origin) = node.as_origin() {
            origin
                .set_tick(Tick::new(pair, dec!(19000), Utc::now()))
                .unwrap();
        }

        // Would overwrite with 20000 if the fresh node were fetched.
        let updater = updater_with(vec![(
            "binance",
            Arc::new(StaticOrigin { price: dec!(20000) }) as Arc<dyn Origin>,
        )]);
        updater.update(&[node.clone()]).await.unwrap();
        assert_eq!(node.tick().price, Some(dec!(19000)));
    }

    #[tokio::test]
    async fn test_missing_tick_becomes_warning() {
        let pair = Pair::new("BTC", "USD");
        let node = origin_node("binance", pair);
        let updater =
            updater_with(vec![("binance", Arc::new(SilentOrigin) as Arc<dyn Origin>)]);

        updater.update(&[node.clone()]).await.unwrap();
        let tick = node.tick();
        assert!(matches!(tick.warning, Some(FeedError::MissingTick { .. })));
    }

    #[tokio::test]
    async fn test_unknown_origin_becomes_warning() {
        let pair = Pair::new("BTC", "USD");
        let node = origin_node("nowhere", pair);
        let updater = updater_with(Vec::new());

        updater.update(&[node.clone()]).await.unwrap();
        assert!(matches!(
            node.tick().warning,
            Some(FeedError::UnknownOrigin(_))
        ));
    }

    #[tokio::test]
    async fn test_panic_is_contained_and_demoted_to_warning() {
        let pair = Pair::new("BTC", "USD");
        let panicking = origin_node("broken", pair.clone());
        let healthy = origin_node("binance", pair.clone());
        let updater = updater_with(vec![
            ("broken", Arc::new(PanickingOrigin) as Arc<dyn Origin>),
            (
                "binance",
                Arc::new(StaticOrigin { price: dec!(20000) }) as Arc<dyn Origin>,
            ),
        ]);

        updater
            .update(&[panicking.clone(), healthy.clone()])
            .await
            .unwrap();

        // The panicking origin's error tick fails set_tick validation and is
        // demoted to a warning; the healthy sibling is unaffected.
        assert!(matches!(
            panicking.tick().warning,
            Some(FeedError::InvalidTick(_))
        ));
        assert_eq!(healthy.tick().price, Some(dec!(20000)));
    }

    #[tokio::test]
    async fn test_stale_fetch_result_demoted_to_warning() {
        let pair = Pair::new("BTC", "USD");
        let node = origin_node("binance", pair.clone());
        if let Some(origin) = node.as_origin() {
            // Held tick is newer than what the origin will return, but old
            // enough to not be fresh.
            origin
                .set_tick(Tick::new(pair.clone(), dec!(21000), Utc::now() - Duration::seconds(90)))
                .unwrap();
        }

        struct OldTickOrigin;
        #[async_trait]
        impl Origin for OldTickOrigin {
            async fn fetch_ticks(&self, pairs: &[Pair]) -> Vec<Tick> {
                pairs
                    .iter()
                    .map(|pair| {
                        Tick::new(pair.clone(), dec!(20000), Utc::now() - Duration::seconds(600))
                    })
                    .collect()
            }
        }

        let updater =
            updater_with(vec![("binance", Arc::new(OldTickOrigin) as Arc<dyn Origin>)]);
        updater.update(&[node.clone()]).await.unwrap();

        let tick = node.tick();
        assert_eq!(tick.price, Some(dec!(21000)));
        assert!(matches!(tick.warning, Some(FeedError::TickTooOld(_))));
    }

    #[tokio::test]
    async fn test_concurrency_stays_under_gate() {
        let counting = Arc::new(CountingOrigin::new(dec!(1)));
        let mut origins: HashMap<String, Arc<dyn Origin>> = HashMap::new();
        let mut nodes = Vec::new();
        for i in 0..25 {
            let name = format!("origin-{i}");
            origins.insert(name.clone(), counting.clone());
            nodes.push(origin_node(&name, Pair::new("BTC", "USD")));
        }

        let updater = Updater::new(origins);
        updater.update(&nodes).await.unwrap();

        let max_seen = counting.max_seen.load(Ordering::SeqCst);
        assert!(max_seen >= 1);
        assert!(
            max_seen <= MAX_CONCURRENT_UPDATES,
            "saw {max_seen} concurrent fetches"
        );
    }

    #[tokio::test]
    async fn test_duplicate_origin_pairs_fetched_once() {
        let pair = Pair::new("BTC", "USD");
        let calls = Arc::new(Mutex::new(0usize));

        struct CallCounting {
            calls: Arc<Mutex<usize>>,
        }
        #[async_trait]
        impl Origin for CallCounting {
            async fn fetch_ticks(&self, pairs: &[Pair]) -> Vec<Tick> {
                if let Ok(mut calls) = self.calls.lock() {
                    *calls += 1;
                }
                pairs
                    .iter()
                    .map(|pair| Tick::new(pair.clone(), dec!(20000), Utc::now()))
                    .collect()
            }
        }

        // Two distinct nodes for the same (origin, pair) under one median.
        let first = origin_node("binance", pair.clone());
        let second = origin_node("binance", pair.clone());
        let median = Arc::new(Node::Median(MedianNode::new(pair, 1)));
        median.add_branch(&[first.clone(), second.clone()]).unwrap();

        let updater = updater_with(vec![(
            "binance",
            Arc::new(CallCounting {
                calls: calls.clone(),
            }) as Arc<dyn Origin>,
        )]);
        updater.update(&[median]).await.unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(first.tick().validate().is_ok());
        assert!(second.tick().validate().is_ok());
    }
}
