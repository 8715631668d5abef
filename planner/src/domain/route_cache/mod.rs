//! Session-lifetime cache of route outcomes keyed by [`RouteCacheKey`].
//!
//! The cache owns call de-duplication: for any key at most one fetch is in
//! flight, and every concurrent caller awaits that same fetch. The outcome
//! (success or failure) is stored exactly once, by whichever waiter observes
//! completion first. Failures stay cached until [`RouteDataCache::refetch`],
//! [`RouteDataCache::invalidate`] or [`RouteDataCache::clear`].
//!
//! Clearing never drops an in-flight registration. A fetch started before
//! the clear still serves every caller of its key, including callers that
//! arrive after the clear, but its outcome is not stored.

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared, join_all};
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::ports::{RouteCacheKey, RouteFetchClient, RouteFetchError};
use crate::domain::{RouteQuery, RouteResult};

/// Outcome stored for one key and handed to every caller.
pub type RouteOutcome = Result<Arc<RouteResult>, RouteFetchError>;

type SharedFetch = Shared<BoxFuture<'static, RouteOutcome>>;

/// One stored outcome.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    key: RouteCacheKey,
    value: RouteOutcome,
    fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Key the entry is stored under.
    pub fn key(&self) -> &RouteCacheKey {
        &self.key
    }

    /// Stored outcome.
    pub fn value(&self) -> &RouteOutcome {
        &self.value
    }

    /// When the fetch that produced this entry completed.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Whether the entry records a failed fetch.
    pub fn is_failure(&self) -> bool {
        self.value.is_err()
    }
}

/// Summary of a [`RouteDataCache::warm`] run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarmReport {
    /// Keys whose outcome is a cached route.
    pub warmed: Vec<RouteCacheKey>,
    /// Keys whose fetch failed, with the cached failure.
    pub failed: Vec<(RouteCacheKey, RouteFetchError)>,
}

struct InFlight {
    id: u64,
    epoch: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<RouteCacheKey, CacheEntry>,
    recency: VecDeque<RouteCacheKey>,
    in_flight: HashMap<RouteCacheKey, InFlight>,
    next_fetch_id: u64,
    /// Bumped by every clear; flights from an older epoch are not stored.
    epoch: u64,
}

impl CacheState {
    fn touch(&mut self, key: &RouteCacheKey) {
        if let Some(position) = self.recency.iter().position(|candidate| candidate == key) {
            self.recency.remove(position);
        }
        self.recency.push_back(key.clone());
    }

    fn store(&mut self, entry: CacheEntry, capacity: Option<NonZeroUsize>) {
        let key = entry.key.clone();
        self.entries.insert(key.clone(), entry);
        self.touch(&key);
        let Some(capacity) = capacity else {
            return;
        };
        while self.entries.len() > capacity.get() {
            let Some(evicted) = self.recency.pop_front() else {
                break;
            };
            self.entries.remove(&evicted);
            debug!(key = %evicted, "evicted least recently used route");
        }
    }

    fn discard(&mut self, key: &RouteCacheKey) -> bool {
        self.recency.retain(|candidate| candidate != key);
        self.entries.remove(key).is_some()
    }
}

enum Lookup {
    Hit(RouteOutcome),
    Await { id: u64, fetch: SharedFetch },
}

/// Injectable route cache with single-flight fetches.
pub struct RouteDataCache {
    client: Arc<dyn RouteFetchClient>,
    clock: Arc<dyn Clock>,
    capacity: Option<NonZeroUsize>,
    state: Mutex<CacheState>,
}

impl RouteDataCache {
    /// Build an unbounded cache.
    ///
    /// ```rust,ignore
    /// let cache = RouteDataCache::new(Arc::new(client), Arc::new(DefaultClock));
    /// ```
    pub fn new(client: Arc<dyn RouteFetchClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            clock,
            capacity: None,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Build a cache that evicts the least recently used entry beyond `capacity`.
    pub fn with_capacity(
        client: Arc<dyn RouteFetchClient>,
        clock: Arc<dyn Clock>,
        capacity: NonZeroUsize,
    ) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new(client, clock)
        }
    }

    /// Return the cached outcome for `query`, fetching it at most once.
    ///
    /// Concurrent callers for the same key await a single fetch. Both
    /// successes and failures are cached.
    ///
    /// # Errors
    ///
    /// Returns the [`RouteFetchError`] of the fetch that produced the entry.
    pub async fn get_or_fetch(&self, query: &RouteQuery) -> RouteOutcome {
        let key = query.cache_key();
        let (id, fetch) = match self.lookup(&key, query) {
            Lookup::Hit(outcome) => return outcome,
            Lookup::Await { id, fetch } => (id, fetch),
        };
        let outcome = fetch.await;
        self.settle(&key, id, &outcome);
        outcome
    }

    /// Discard any stored outcome for `query` and fetch it again.
    ///
    /// Joins the in-flight fetch instead when one is outstanding.
    ///
    /// # Errors
    ///
    /// Returns the [`RouteFetchError`] of the new fetch.
    pub async fn refetch(&self, query: &RouteQuery) -> RouteOutcome {
        self.invalidate(query);
        self.get_or_fetch(query).await
    }

    /// Discard the stored outcome for `query`; returns whether one existed.
    pub fn invalidate(&self, query: &RouteQuery) -> bool {
        let key = query.cache_key();
        let removed = self.lock().discard(&key);
        if removed {
            info!(key = %key, "route cache entry invalidated");
        }
        removed
    }

    /// Return the stored entry for `query` without fetching.
    pub fn peek(&self, query: &RouteQuery) -> Option<CacheEntry> {
        self.lock().entries.get(&query.cache_key()).cloned()
    }

    /// Remove every stored outcome.
    ///
    /// Fetches still in flight stay registered, so later callers for the same
    /// key join them rather than fetching again, but their outcomes are not
    /// stored.
    pub fn clear(&self) {
        let mut state = self.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        state.recency.clear();
        state.epoch = state.epoch.wrapping_add(1);
        info!(
            dropped,
            in_flight = state.in_flight.len(),
            "route cache cleared"
        );
    }

    /// Number of stored outcomes.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether no outcome is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch every query concurrently, isolating failures.
    ///
    /// A failed warm-up is logged and reported, never propagated, and does
    /// not stop the others.
    pub async fn warm(&self, queries: &[RouteQuery]) -> WarmReport {
        let outcomes = join_all(queries.iter().map(|query| async move {
            (query.cache_key(), self.get_or_fetch(query).await)
        }))
        .await;

        let mut report = WarmReport::default();
        for (key, outcome) in outcomes {
            match outcome {
                Ok(_) => report.warmed.push(key),
                Err(error) => {
                    warn!(
                        key = %key,
                        kind = error.kind(),
                        error = %error,
                        "route warm-up failed"
                    );
                    report.failed.push((key, error));
                }
            }
        }
        info!(
            warmed = report.warmed.len(),
            failed = report.failed.len(),
            "route warm-up finished"
        );
        report
    }

    fn lookup(&self, key: &RouteCacheKey, query: &RouteQuery) -> Lookup {
        let mut state = self.lock();
        if let Some(outcome) = state.entries.get(key).map(|entry| entry.value.clone()) {
            state.touch(key);
            debug!(key = %key, "route cache hit");
            return Lookup::Hit(outcome);
        }
        if let Some(in_flight) = state.in_flight.get(key) {
            debug!(key = %key, "joining in-flight route fetch");
            return Lookup::Await {
                id: in_flight.id,
                fetch: in_flight.fetch.clone(),
            };
        }

        let id = state.next_fetch_id;
        state.next_fetch_id = state.next_fetch_id.wrapping_add(1);
        let client = Arc::clone(&self.client);
        let owned_query = query.clone();
        let fetch = async move { client.fetch(&owned_query).await.map(Arc::new) }
            .boxed()
            .shared();
        let epoch = state.epoch;
        state.in_flight.insert(
            key.clone(),
            InFlight {
                id,
                epoch,
                fetch: fetch.clone(),
            },
        );
        info!(key = %key, mode = %query.mode(), "fetching route");
        Lookup::Await { id, fetch }
    }

    fn settle(&self, key: &RouteCacheKey, id: u64, outcome: &RouteOutcome) {
        let mut state = self.lock();
        let owns_flight = state
            .in_flight
            .get(key)
            .is_some_and(|in_flight| in_flight.id == id);
        if !owns_flight {
            return;
        }
        let Some(in_flight) = state.in_flight.remove(key) else {
            return;
        };
        if in_flight.epoch != state.epoch {
            debug!(key = %key, "cache cleared during fetch; outcome not stored");
            return;
        }
        if let Err(error) = outcome {
            warn!(
                key = %key,
                kind = error.kind(),
                error = %error,
                "route fetch failed; caching failure"
            );
        }
        let entry = CacheEntry {
            key: key.clone(),
            value: outcome.clone(),
            fetched_at: self.clock.utc(),
        };
        state.store(entry, self.capacity);
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
