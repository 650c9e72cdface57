//! # Resource Cache
//!
//! Declarative cache over REST queries with tag-based invalidation.
//!
//! ```text
//!  query(endpoint, args) ──► CacheKey ──► entries ──► watch::Sender<QuerySnapshot>
//!                                │                          │
//!                                ├──► pending (one shared   ├──► Subscription (receiver)
//!                                │    future per key)       └──► Subscription (receiver)
//!                                └──► TagIndex (tag → keys)
//!
//!  mutate(endpoint, args) ──► Transport ──► invalidates ──► TagIndex ──► stale / refetch
//! ```
//!
//! Rules:
//!
//! - At most one request is in flight per key. Later subscribers attach to
//!   the pending response instead of issuing their own.
//! - A mutation invalidates only after its response arrived. Subscribed
//!   entries refetch in the background and keep showing the old data until
//!   the new data lands, and keep it if the refetch fails. Unsubscribed
//!   entries stay stale until someone subscribes again.
//! - Tags invalidated while a request is in flight are held on the pending
//!   request. If the response provides any of them, the entry is fetched
//!   again once it settles. This also covers a first fetch, whose tags are
//!   not yet known.
//! - Unsubscribing never cancels a request. Entries with no subscribers are
//!   evicted once they have been unused for `keep_unused_for`.
//! - Errors are never retried automatically. An errored entry is refetched
//!   on an explicit `refetch`, or when it is subscribed to again after every
//!   previous subscriber left.
//!
//! All state lives behind one mutex that is never held across an await.
//! Fetches are driven by spawned tokio tasks, so `query` must be called from
//! within a tokio runtime.

pub mod endpoint;
pub mod entry;
pub mod key;
pub mod tags;

pub use endpoint::{MutationEndpoint, QueryEndpoint};
pub use entry::{QuerySnapshot, QueryStatus};
pub use key::CacheKey;
pub use tags::{Tag, TagIndex};

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

use crate::api::client::{HttpError, Transport};

/// How long an entry without subscribers is kept before eviction.
pub const DEFAULT_KEEP_UNUSED_FOR: Duration = Duration::from_secs(60);

type SharedResponse = Shared<BoxFuture<'static, Result<Value, HttpError>>>;

struct PendingRequest {
    request_id: Uuid,
    response: SharedResponse,
    /// Tags invalidated while this request was in flight. Checked against
    /// what the response provides once it lands.
    invalidated: Vec<Tag>,
}

struct Entry {
    endpoint: &'static QueryEndpoint,
    args: Value,
    snapshot: watch::Sender<QuerySnapshot>,
    subscribers: HashSet<u64>,
    /// Needs a fetch before it can be served as fresh. New entries start stale.
    stale: bool,
    /// Invalidated while a request was in flight; that response may predate
    /// the mutation.
    refetch_when_settled: bool,
    unused_since: Option<Instant>,
}

impl Entry {
    fn new(endpoint: &'static QueryEndpoint, args: Value) -> Self {
        let (snapshot, _) = watch::channel(QuerySnapshot::loading());
        Self {
            endpoint,
            args,
            snapshot,
            subscribers: HashSet::new(),
            stale: true,
            refetch_when_settled: false,
            unused_since: None,
        }
    }

    fn status(&self) -> QueryStatus {
        self.snapshot.borrow().status
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, Entry>,
    tags: TagIndex,
    pending: HashMap<CacheKey, PendingRequest>,
}

impl CacheState {
    fn evict_unused(&mut self, keep_unused_for: Duration) -> usize {
        let now = Instant::now();
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(key, entry)| {
                entry.subscribers.is_empty()
                    && !self.pending.contains_key(*key)
                    && entry
                        .unused_since
                        .is_some_and(|since| now.duration_since(since) >= keep_unused_for)
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
            self.tags.remove_key(key);
            debug!("Evicted unused cache entry {key}");
        }
        expired.len()
    }
}

struct CacheInner {
    transport: Arc<dyn Transport>,
    state: Mutex<CacheState>,
    keep_unused_for: Duration,
    next_subscriber: AtomicU64,
}

impl CacheInner {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to the cache. Clones share the same state.
#[derive(Clone)]
pub struct ResourceCache {
    inner: Arc<CacheInner>,
}

impl ResourceCache {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_keep_unused_for(transport, DEFAULT_KEEP_UNUSED_FOR)
    }

    pub fn with_keep_unused_for(transport: Arc<dyn Transport>, keep_unused_for: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                transport,
                state: Mutex::new(CacheState::default()),
                keep_unused_for,
                next_subscriber: AtomicU64::new(1),
            }),
        }
    }

    /// Subscribes to `endpoint(args)`, issuing a request only when the entry
    /// is missing or stale and nothing is in flight for it already.
    ///
    /// # Panics
    ///
    /// Panics if a fetch is needed and no tokio runtime is running.
    pub fn query(&self, endpoint: &'static QueryEndpoint, args: Value) -> Subscription {
        let key = CacheKey::new(endpoint.name, &args);
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);

        let receiver = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;
            state.evict_unused(self.inner.keep_unused_for);

            let entry = state.entries.entry(key.clone()).or_insert_with(|| {
                debug!("Cache miss for {key}");
                Entry::new(endpoint, args)
            });
            entry.subscribers.insert(id);
            entry.unused_since = None;
            let receiver = entry.snapshot.subscribe();
            let needs_fetch = entry.stale;
            debug!(
                "Subscriber {id} attached to {key} ({} total)",
                entry.subscribers.len()
            );

            if needs_fetch && !state.pending.contains_key(&key) {
                self.start_fetch(state, &key);
            }
            receiver
        };

        Subscription {
            id,
            key,
            receiver,
            cache: self.clone(),
            active: true,
        }
    }

    /// Subscribes, waits for the result, and lets go again.
    pub async fn fetch(
        &self,
        endpoint: &'static QueryEndpoint,
        args: Value,
    ) -> Result<Value, HttpError> {
        let mut subscription = self.query(endpoint, args);
        let pending = self
            .inner
            .lock()
            .pending
            .get(subscription.key())
            .map(|p| p.response.clone());

        let result = match pending {
            Some(response) => response.await,
            None => {
                let snapshot = subscription.settled().await;
                match (snapshot.status, snapshot.data, snapshot.error) {
                    (QueryStatus::Error, _, Some(error)) => Err(error),
                    (_, Some(data), _) => Ok(data),
                    _ => Err(HttpError::Network {
                        message: format!("{} was discarded before it completed", subscription.key()),
                    }),
                }
            }
        };
        subscription.unsubscribe();
        result
    }

    /// Sends a mutation and, once it succeeded, invalidates the tags the
    /// endpoint declares. Mutations are never deduplicated.
    pub async fn mutate(
        &self,
        endpoint: &MutationEndpoint,
        args: &Value,
    ) -> Result<Value, HttpError> {
        let request = (endpoint.request)(args);
        info!(
            "Mutation {} ({} {})",
            endpoint.name, request.method, request.path
        );

        let data = match self.inner.transport.execute(request).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Mutation {} failed: {e}", endpoint.name);
                return Err(e);
            }
        };

        let tags = (endpoint.invalidates)(args, &data);
        if !tags.is_empty() {
            self.invalidate_tags(&tags);
        }
        Ok(data)
    }

    /// Marks every entry providing one of `tags` stale and refetches the
    /// subscribed ones. Returns how many entries matched.
    pub fn invalidate_tags(&self, tags: &[Tag]) -> usize {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        for pending in state.pending.values_mut() {
            pending.invalidated.extend(tags.iter().cloned());
        }
        let keys = state.tags.keys_for(tags);
        let labels = tags
            .iter()
            .map(Tag::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        if keys.is_empty() {
            debug!("Invalidating [{labels}] matched no cached queries");
            return 0;
        }
        info!("Invalidating [{labels}]: {} cached queries", keys.len());

        let mut refetch = Vec::new();
        for key in &keys {
            let Some(entry) = state.entries.get_mut(key) else {
                continue;
            };
            if state.pending.contains_key(key) {
                entry.refetch_when_settled = true;
                continue;
            }
            entry.stale = true;
            if !entry.subscribers.is_empty() {
                refetch.push(key.clone());
            }
        }

        for key in &refetch {
            self.start_fetch(state, key);
        }
        keys.len()
    }

    /// Explicitly refetches `key`. Returns false if the key is unknown or a
    /// request for it is already in flight.
    pub fn refetch(&self, key: &CacheKey) -> bool {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        if !state.entries.contains_key(key) || state.pending.contains_key(key) {
            return false;
        }
        self.start_fetch(state, key)
    }

    /// Evicts unused entries whose keep-alive has run out.
    pub fn purge_unused(&self) -> usize {
        self.inner.lock().evict_unused(self.inner.keep_unused_for)
    }

    /// Drops every entry, tag and pending request. Live subscriptions stop
    /// receiving updates; responses still in flight are discarded.
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        state.pending.clear();
        state.tags.clear();
        info!("Cache reset, dropped {dropped} entries");
    }

    pub fn snapshot(&self, key: &CacheKey) -> Option<QuerySnapshot> {
        self.inner
            .lock()
            .entries
            .get(key)
            .map(|entry| entry.snapshot.borrow().clone())
    }

    pub fn subscriber_count(&self, key: &CacheKey) -> usize {
        self.inner
            .lock()
            .entries
            .get(key)
            .map_or(0, |entry| entry.subscribers.len())
    }

    pub fn is_stale(&self, key: &CacheKey) -> bool {
        self.inner
            .lock()
            .entries
            .get(key)
            .is_some_and(|entry| entry.stale)
    }

    pub fn is_pending(&self, key: &CacheKey) -> bool {
        self.inner.lock().pending.contains_key(key)
    }

    pub fn provided_tags(&self, key: &CacheKey) -> Vec<Tag> {
        self.inner.lock().tags.provided_by(key).to_vec()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn start_fetch(&self, state: &mut CacheState, key: &CacheKey) -> bool {
        let Some(entry) = state.entries.get_mut(key) else {
            return false;
        };

        let request = (entry.endpoint.request)(&entry.args);
        let request_id = Uuid::new_v4();
        entry.stale = false;
        entry.refetch_when_settled = false;
        entry.snapshot.send_modify(|s| {
            s.is_fetching = true;
            s.request_id = Some(request_id);
        });
        debug!(
            "Fetching {key} ({} {}, request {request_id})",
            request.method, request.path
        );

        let transport = Arc::clone(&self.inner.transport);
        let response: SharedResponse = async move { transport.execute(request).await }
            .boxed()
            .shared();
        state.pending.insert(
            key.clone(),
            PendingRequest {
                request_id,
                response: response.clone(),
                invalidated: Vec::new(),
            },
        );

        // The driver holds a weak handle so an abandoned cache can be dropped
        // while requests are still in flight.
        let cache = Arc::downgrade(&self.inner);
        let key = key.clone();
        tokio::spawn(async move {
            let result = response.await;
            if let Some(inner) = cache.upgrade() {
                ResourceCache { inner }.settle(&key, request_id, result);
            }
        });
        true
    }

    fn settle(&self, key: &CacheKey, request_id: Uuid, result: Result<Value, HttpError>) {
        let mut guard = self.inner.lock();
        let state = &mut *guard;

        let invalidated = match state.pending.get(key) {
            Some(pending) if pending.request_id == request_id => state
                .pending
                .remove(key)
                .map(|p| p.invalidated)
                .unwrap_or_default(),
            _ => {
                debug!("Discarding superseded response for {key} (request {request_id})");
                return;
            }
        };

        let Some(entry) = state.entries.get_mut(key) else {
            return;
        };

        match result {
            Ok(data) => {
                let provided = (entry.endpoint.provides)(&entry.args, &data);
                debug!(
                    "{key} fulfilled, provides [{}]",
                    provided
                        .iter()
                        .map(Tag::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                if invalidated
                    .iter()
                    .any(|tag| provided.iter().any(|p| tag.matches(p)))
                {
                    entry.refetch_when_settled = true;
                }
                entry.snapshot.send_modify(|s| s.fulfil(data));
                state.tags.replace(key, provided);
            }
            Err(error) => {
                warn!("{key} failed: {error}");
                entry.snapshot.send_modify(|s| s.reject(error));
            }
        }

        let unobserved = entry.subscribers.is_empty();
        let refetch = entry.refetch_when_settled;
        entry.refetch_when_settled = false;
        if unobserved && (refetch || entry.status() == QueryStatus::Error) {
            entry.stale = true;
        }

        if refetch && !unobserved {
            debug!("{key} was invalidated while in flight, refetching");
            self.start_fetch(state, key);
        }
    }

    fn release(&self, key: &CacheKey, id: u64) {
        let mut state = self.inner.lock();
        let Some(entry) = state.entries.get_mut(key) else {
            return;
        };
        if !entry.subscribers.remove(&id) {
            return;
        }
        if entry.subscribers.is_empty() {
            entry.unused_since = Some(Instant::now());
            if entry.status() == QueryStatus::Error {
                entry.stale = true;
            }
            debug!("{key} has no subscribers left");
        }
    }
}

/// A live interest in one cache entry. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    key: CacheKey,
    receiver: watch::Receiver<QuerySnapshot>,
    cache: ResourceCache,
    active: bool,
}

impl Subscription {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The entry as last observed.
    pub fn snapshot(&self) -> QuerySnapshot {
        self.receiver.borrow().clone()
    }

    /// Waits for the next change. `None` once the entry has been dropped by
    /// a cache reset.
    pub async fn changed(&mut self) -> Option<QuerySnapshot> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Waits until no request is in flight for the entry and returns it.
    pub async fn settled(&mut self) -> QuerySnapshot {
        loop {
            let snapshot = self.receiver.borrow_and_update().clone();
            if !snapshot.is_fetching && !snapshot.is_loading() {
                return snapshot;
            }
            if self.receiver.changed().await.is_err() {
                return self.receiver.borrow().clone();
            }
        }
    }

    pub fn refetch(&self) -> bool {
        self.cache.refetch(&self.key)
    }

    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.cache.release(&self.key, self.id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
