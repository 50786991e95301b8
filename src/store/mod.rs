//! Read-through cache of API resources keyed by request path.
//!
//! Each key owns one `watch` channel: the channel value is the current
//! `ResourceState` and its receivers are the subscribers. A per-key generation
//! counter makes sure a slow response for a superseded request never
//! overwrites the result of a newer one.

mod resources;
#[cfg(test)]
pub(crate) mod fake;

pub use resources::{
    SUMMARY_KEY, Snapshot, TASKS_PREFIX, logs_key, task_key, task_scoped,
};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use reqwest::Method;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::client::{ApiError, Backend};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceState {
    /// Last successful result, kept while a refresh is outstanding or failed.
    pub data: Option<Value>,
    pub error: Option<ApiError>,
    pub is_loading: bool,
}

impl ResourceState {
    fn settled(&self) -> bool {
        !self.is_loading && (self.data.is_some() || self.error.is_some())
    }
}

struct Entry {
    tx: watch::Sender<ResourceState>,
    generation: u64,
    stale: bool,
}

impl Entry {
    fn new() -> Self {
        let (tx, _) = watch::channel(ResourceState::default());
        Entry {
            tx,
            generation: 0,
            stale: false,
        }
    }
}

/// Refreshes started by an invalidation. Dropping it leaves them running.
#[derive(Debug, Default)]
pub struct Invalidation {
    pub keys: Vec<String>,
    handles: Vec<JoinHandle<()>>,
}

impl Invalidation {
    /// Wait for every spawned refresh to finish.
    pub async fn settled(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

pub struct ResourceStore<B: Backend> {
    backend: Arc<B>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl<B: Backend> ResourceStore<B> {
    pub fn new(backend: Arc<B>) -> Arc<Self> {
        Arc::new(ResourceStore {
            backend,
            entries: Mutex::new(HashMap::new()),
        })
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Follow a key; the receiver sees every state change for it.
    pub fn subscribe(&self, key: &str) -> watch::Receiver<ResourceState> {
        self.entries()
            .entry(key.to_string())
            .or_insert_with(Entry::new)
            .tx
            .subscribe()
    }

    pub fn snapshot(&self, key: &str) -> ResourceState {
        self.entries()
            .get(key)
            .map(|e| e.tx.borrow().clone())
            .unwrap_or_default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries().keys().cloned().collect()
    }

    /// Cached state when fresh, otherwise the outcome of a fetch. Concurrent
    /// loads of one key share a single request.
    pub async fn load(&self, key: &str) -> ResourceState {
        let next = {
            let mut entries = self.entries();
            let entry = entries.entry(key.to_string()).or_insert_with(Entry::new);
            let state = entry.tx.borrow().clone();
            if state.is_loading {
                Next::Wait(entry.tx.subscribe())
            } else if state.settled() && !entry.stale {
                Next::Cached(state)
            } else {
                Next::Fetch
            }
        };
        match next {
            Next::Cached(state) => state,
            Next::Wait(mut rx) => wait_idle(&mut rx).await,
            Next::Fetch => self.refresh(key).await,
        }
    }

    /// Fetch `key` now, regardless of what is cached, and publish the result
    /// to every subscriber of that key.
    pub async fn refresh(&self, key: &str) -> ResourceState {
        let generation = {
            let mut entries = self.entries();
            let entry = entries.entry(key.to_string()).or_insert_with(Entry::new);
            entry.generation += 1;
            entry.stale = false;
            entry.tx.send_modify(|s| s.is_loading = true);
            entry.generation
        };

        debug!(key, generation, "fetching resource");
        let result = self.backend.request(Method::GET, key, None).await;

        let mut rx = {
            let mut entries = self.entries();
            let entry = entries.entry(key.to_string()).or_insert_with(Entry::new);
            if entry.generation == generation {
                entry.tx.send_modify(|s| {
                    match result {
                        Ok(value) => {
                            s.data = Some(value);
                            s.error = None;
                        }
                        Err(err) => s.error = Some(err),
                    }
                    s.is_loading = false;
                });
                return entry.tx.borrow().clone();
            }
            debug!(key, generation, "discarding superseded response");
            entry.tx.subscribe()
        };
        wait_idle(&mut rx).await
    }

    /// Mark every key accepted by `matcher` stale. Keys somebody is watching
    /// are re-fetched in the background; the rest re-fetch on next load.
    pub fn invalidate<M>(self: &Arc<Self>, matcher: M) -> Invalidation
    where
        M: Fn(&str) -> bool,
    {
        let mut invalidation = Invalidation::default();
        let mut watched = Vec::new();
        {
            let mut entries = self.entries();
            for (key, entry) in entries.iter_mut().filter(|(k, _)| matcher(k)) {
                entry.stale = true;
                invalidation.keys.push(key.clone());
                if entry.tx.receiver_count() > 0 {
                    watched.push(key.clone());
                }
            }
        }
        debug!(keys = ?invalidation.keys, "invalidated resources");
        for key in watched {
            let store = Arc::clone(self);
            invalidation.handles.push(tokio::spawn(async move {
                store.refresh(&key).await;
            }));
        }
        invalidation
    }

    /// Run a mutation and, once it has succeeded, invalidate the keys accepted
    /// by `affected` without waiting for their refreshes.
    pub async fn mutate<M>(
        self: &Arc<Self>,
        method: Method,
        path: &str,
        body: Option<Value>,
        affected: M,
    ) -> Result<Value, ApiError>
    where
        M: Fn(&str) -> bool + Send,
    {
        let value = self.backend.request(method, path, body).await?;
        self.invalidate(affected);
        Ok(value)
    }
}

enum Next {
    Cached(ResourceState),
    Wait(watch::Receiver<ResourceState>),
    Fetch,
}

async fn wait_idle(rx: &mut watch::Receiver<ResourceState>) -> ResourceState {
    if let Ok(state) = rx.wait_for(|s| !s.is_loading).await {
        return state.clone();
    }
    rx.borrow().clone()
}
