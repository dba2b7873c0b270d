//! Periodic refresh of dashboard data.
//!
//! A [`Poller`] runs a fetch on a fixed interval (and on demand) and
//! publishes each result as a [`Snapshot`] on a `watch` channel. Fetches may
//! overlap, so every fetch takes a sequence number when it starts and a
//! result is only published if it is newer than the one already shown.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::models::Bucket;
use crate::remote::{realtime, RemoteError, RemoteStore};
use crate::store::{RecordStore, StoreError};

/// One published fetch result.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    /// Order in which the fetch was started
    pub seq: u64,
    pub fetched_at: DateTime<Utc>,
    pub value: T,
}

/// Publishes `snapshot` unless an equal or newer one is already there.
/// Returns whether it was published.
fn publish<T>(
    sender: &watch::Sender<Option<Snapshot<T>>>,
    live: &AtomicBool,
    snapshot: Snapshot<T>,
) -> bool {
    let mut pending = Some(snapshot);
    sender.send_if_modified(|current| {
        if !live.load(Ordering::SeqCst) {
            return false;
        }
        let newer = current
            .as_ref()
            .map_or(true, |shown| pending.as_ref().is_some_and(|p| p.seq > shown.seq));
        if newer {
            *current = pending.take();
        }
        newer
    })
}

/// Wakes a poller for an immediate refresh.
#[derive(Debug, Clone)]
pub struct RefreshTrigger(Arc<Notify>);

impl RefreshTrigger {
    pub fn fire(&self) {
        self.0.notify_one();
    }
}

/// Handle to a running poller. Dropping it stops the poller.
#[derive(Debug)]
pub struct PollHandle<T> {
    receiver: watch::Receiver<Option<Snapshot<T>>>,
    live: Arc<AtomicBool>,
    trigger: RefreshTrigger,
    task: JoinHandle<()>,
}

impl<T: Clone> PollHandle<T> {
    pub fn subscribe(&self) -> watch::Receiver<Option<Snapshot<T>>> {
        self.receiver.clone()
    }

    pub fn latest(&self) -> Option<Snapshot<T>> {
        self.receiver.borrow().clone()
    }

    pub fn trigger(&self) -> RefreshTrigger {
        self.trigger.clone()
    }

    /// Starts a fetch now instead of waiting for the next tick.
    pub fn refresh_now(&self) {
        self.trigger.fire();
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Stops polling. Fetches still in flight are discarded.
    pub fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
        self.task.abort();
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.live.store(false, Ordering::SeqCst);
        self.task.abort();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Poller {
    interval: Duration,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(10)),
        }
    }

    /// Spawns the polling task. The first fetch starts immediately.
    pub fn spawn<T, E, F, Fut>(self, fetch: F) -> PollHandle<T>
    where
        T: Clone + Send + Sync + 'static,
        E: fmt::Display + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (sender, receiver) = watch::channel(None);
        let sender = Arc::new(sender);
        let live = Arc::new(AtomicBool::new(true));
        let notify = Arc::new(Notify::new());

        let task = {
            let live = live.clone();
            let notify = notify.clone();
            let period = self.interval;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                let mut seq = 0u64;

                while live.load(Ordering::SeqCst) {
                    tokio::select! {
                        _ = ticker.tick() => {}
                        _ = notify.notified() => {}
                    }

                    seq += 1;
                    let started = seq;
                    let pending = fetch();
                    let sender = sender.clone();
                    let live = live.clone();
                    tokio::spawn(async move {
                        match pending.await {
                            Ok(value) => {
                                let snapshot = Snapshot {
                                    seq: started,
                                    fetched_at: Utc::now(),
                                    value,
                                };
                                if !publish(&sender, &live, snapshot) {
                                    tracing::debug!("Discarded stale dashboard fetch #{}", started);
                                }
                            }
                            Err(e) => tracing::warn!("Dashboard refresh failed: {}", e),
                        }
                    });
                }
            })
        };

        PollHandle {
            receiver,
            live,
            trigger: RefreshTrigger(notify),
            task,
        }
    }
}

/// Record count per bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub counts: BTreeMap<Bucket, u64>,
}

impl DashboardCounts {
    pub async fn fetch(store: &dyn RecordStore) -> Result<Self, StoreError> {
        let mut counts = BTreeMap::new();
        for bucket in Bucket::ALL {
            counts.insert(bucket, store.count(bucket).await?);
        }
        Ok(Self { counts })
    }

    pub fn get(&self, bucket: Bucket) -> u64 {
        self.counts.get(&bucket).copied().unwrap_or(0)
    }
}

impl fmt::Display for DashboardCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = [
            (Bucket::Students, "Estudiantes"),
            (Bucket::Teachers, "Profesores"),
            (Bucket::Courses, "Cursos"),
            (Bucket::Announcements, "Comunicados"),
            (Bucket::Checkins, "Check-ins"),
            (Bucket::Incidents, "Incidentes"),
        ];
        for (bucket, label) in labels {
            writeln!(f, "{:<14} {:>6}", label, self.get(bucket))?;
        }
        Ok(())
    }
}

/// Fires `trigger` whenever one of `buckets` changes on the remote.
///
/// Subscriptions are open when this returns. The task ends when every feed
/// closes, leaving the poller's interval as the only refresh source.
pub async fn refresh_on_changes(
    remote: &RemoteStore,
    buckets: &[Bucket],
    trigger: RefreshTrigger,
) -> Result<JoinHandle<()>, RemoteError> {
    let mut feeds = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        feeds.push(realtime::subscribe(remote, *bucket).await?);
    }

    Ok(tokio::spawn(async move {
        let mut events = stream::select_all(feeds);
        while let Some(event) = events.next().await {
            tracing::debug!("{} {} in {}, refreshing", event.kind, event.id, event.table);
            trigger.fire();
        }
        tracing::info!("Change feeds closed, falling back to polling");
    }))
}
