//! Durable collection that announces its mutations over pub/sub.
//!
//! Every successful add or take publishes a [`ChangeSignal`] on the channel
//! named after the collection key. Each instance lazily opens one subscriber
//! connection, shared by all local consumers, and re-raises every received
//! signal as a `Changed` notification followed by a `CountChanged`
//! notification. Delivery is fan-out and at-most-once; consumers must
//! re-query the collection rather than trust the signal.
//!
//! When the subscriber connection drops, the pump resubscribes with backoff
//! and raises `Resubscribed` once it is back, since anything published in
//! between was lost.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::DurableCollection;
use crate::config::RetryConfig;
use crate::core::{
    BackingCollection, ChangeAction, CollectionError, CollectionNotification, Discipline, Fanout,
    ItemCodec, StoreError,
};
use crate::infra::store::{ListKey, ListStore, Subscription};
use crate::util::RetryPolicy;

/// Message published on the collection's channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSignal {
    /// What happened.
    pub action: ChangeAction,
    /// Codec payload of the affected item.
    pub payload: Vec<u8>,
}

struct Pump {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    connected: Arc<AtomicBool>,
}

impl Pump {
    fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn stop(&mut self) {
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

enum Wake {
    Message(Vec<u8>),
    Lost,
    Shutdown,
}

/// [`DurableCollection`] with cross-process change notifications.
pub struct ObservableCollection<T, C> {
    inner: Arc<DurableCollection<T, C>>,
    notifications: Arc<Fanout<CollectionNotification<T>>>,
    pump: Mutex<Option<Pump>>,
    reconnect: RetryPolicy,
}

impl<T, C> ObservableCollection<T, C>
where
    T: Clone + Send + 'static,
    C: ItemCodec<T> + 'static,
{
    /// Open an observable collection on `store` at `list`.
    pub fn new(store: Arc<dyn ListStore>, list: ListKey, discipline: Discipline, codec: C) -> Self {
        Self::from_durable(DurableCollection::new(store, list, discipline, codec))
    }

    /// Make an existing durable collection observable.
    pub fn from_durable(inner: DurableCollection<T, C>) -> Self {
        Self {
            inner: Arc::new(inner),
            notifications: Arc::new(Fanout::new()),
            pump: Mutex::new(None),
            reconnect: RetryPolicy::from(&RetryConfig::reconnect_default()),
        }
    }

    /// Backoff used to re-establish a dropped subscriber connection.
    #[must_use]
    pub fn with_reconnect_policy(mut self, policy: RetryPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Popped payloads that could not be decoded and were lost.
    pub fn discarded(&self) -> u64 {
        self.inner.discarded()
    }

    /// Channel carrying this collection's change signals.
    pub fn channel(&self) -> &str {
        self.inner.list().channel()
    }

    /// Register a local notification subscriber, establishing the shared
    /// subscriber connection on first use.
    ///
    /// # Errors
    ///
    /// Returns an error when the subscriber connection cannot be established.
    pub fn subscribe(&self) -> Result<Receiver<CollectionNotification<T>>, CollectionError> {
        self.ensure_pump()?;
        Ok(self.notifications.subscribe())
    }

    /// Whether the subscriber connection is currently up.
    pub fn is_listening(&self) -> bool {
        self.pump
            .lock()
            .as_ref()
            .is_some_and(|p| p.is_alive() && p.connected.load(Ordering::Acquire))
    }

    fn ensure_pump(&self) -> Result<(), CollectionError> {
        let mut pump = self.pump.lock();
        if let Some(current) = pump.as_mut() {
            if current.is_alive() {
                return Ok(());
            }
            // gave up reconnecting; start over
            current.stop();
        }
        *pump = None;

        let subscription = self.inner.store().subscribe(self.channel())?;
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let connected = Arc::new(AtomicBool::new(true));
        let link = PumpLink {
            inner: Arc::clone(&self.inner),
            notifications: Arc::clone(&self.notifications),
            connected: Arc::clone(&connected),
            reconnect: self.reconnect,
            shutdown: shutdown_rx,
        };
        let channel = self.channel().to_owned();

        let handle = thread::Builder::new()
            .name(format!("signals-{channel}"))
            .spawn(move || link.run(subscription))
            .map_err(|e| CollectionError::Store(StoreError::Backend(e.to_string())))?;

        info!(channel = %self.channel(), "listening for change signals");
        *pump = Some(Pump {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
            connected,
        });
        Ok(())
    }

    fn announce(&self, action: ChangeAction, payload: Vec<u8>) {
        let signal = ChangeSignal { action, payload };
        let message = match serde_json::to_vec(&signal) {
            Ok(message) => message,
            Err(e) => {
                warn!(channel = %self.channel(), error = %e, "failed to encode change signal");
                return;
            }
        };
        if let Err(e) = self.inner.store().publish(self.channel(), &message) {
            warn!(channel = %self.channel(), ?action, error = %e, "failed to publish change signal");
        }
    }
}

/// State owned by the pump thread.
struct PumpLink<T, C> {
    inner: Arc<DurableCollection<T, C>>,
    notifications: Arc<Fanout<CollectionNotification<T>>>,
    connected: Arc<AtomicBool>,
    reconnect: RetryPolicy,
    shutdown: Receiver<()>,
}

impl<T, C> PumpLink<T, C>
where
    T: Clone,
    C: ItemCodec<T>,
{
    fn run(self, mut subscription: Subscription) {
        let channel = self.inner.list().channel().to_owned();
        loop {
            match self.next(&subscription) {
                Wake::Message(bytes) => relay(&self.inner, &self.notifications, &bytes),
                Wake::Shutdown => break,
                Wake::Lost => {
                    self.connected.store(false, Ordering::Release);
                    warn!(channel = %channel, "subscriber connection lost; resubscribing");
                    let Some(fresh) = self.resubscribe(&channel) else {
                        break;
                    };
                    subscription = fresh;
                    self.connected.store(true, Ordering::Release);
                    info!(channel = %channel, "subscriber connection re-established");
                    self.notifications.emit(&CollectionNotification::Resubscribed);
                }
            }
        }
        self.connected.store(false, Ordering::Release);
        drop(subscription);
        debug!(channel = %channel, "change signal pump stopped");
    }

    fn next(&self, subscription: &Subscription) -> Wake {
        select! {
            recv(subscription.receiver()) -> msg => msg.map_or(Wake::Lost, Wake::Message),
            recv(self.shutdown) -> _ => Wake::Shutdown,
        }
    }

    /// Retry `subscribe` per the reconnect policy. `None` on shutdown or when
    /// the policy gives up.
    fn resubscribe(&self, channel: &str) -> Option<Subscription> {
        let mut attempts = 0_u32;
        loop {
            let delay = self.reconnect.delay(attempts).unwrap_or(Duration::ZERO);
            if !matches!(self.shutdown.recv_timeout(delay), Err(RecvTimeoutError::Timeout)) {
                return None;
            }
            attempts = attempts.saturating_add(1);
            match self.inner.store().subscribe(channel) {
                Ok(subscription) => return Some(subscription),
                Err(e) if self.reconnect.allows(attempts) => {
                    warn!(channel = %channel, attempts, error = %e, "resubscribe failed");
                }
                Err(e) => {
                    error!(channel = %channel, attempts, error = %e, "giving up on resubscribe");
                    return None;
                }
            }
        }
    }
}

fn relay<T, C>(
    inner: &DurableCollection<T, C>,
    notifications: &Fanout<CollectionNotification<T>>,
    bytes: &[u8],
) where
    T: Clone,
    C: ItemCodec<T>,
{
    let signal: ChangeSignal = match serde_json::from_slice(bytes) {
        Ok(signal) => signal,
        Err(e) => {
            warn!(key = %inner.list().key, error = %e, "ignoring malformed change signal");
            return;
        }
    };
    match inner.codec().decode(&signal.payload) {
        Ok(Some(item)) => {
            notifications.emit(&CollectionNotification::Changed {
                item,
                action: signal.action,
            });
        }
        Ok(None) => {}
        Err(e) => warn!(key = %inner.list().key, error = %e, "undecodable item in change signal"),
    }
    notifications.emit(&CollectionNotification::CountChanged);
}

impl<T, C> BackingCollection<T> for ObservableCollection<T, C>
where
    T: Clone + Send + 'static,
    C: ItemCodec<T> + 'static,
{
    fn discipline(&self) -> Discipline {
        self.inner.discipline()
    }

    fn try_add(&self, item: T) -> Result<(), T> {
        let payload = self.inner.push_encoded(item)?;
        self.announce(ChangeAction::Added, payload);
        Ok(())
    }

    fn try_take(&self) -> Option<T> {
        let (item, payload) = self.inner.take_encoded()?;
        self.announce(ChangeAction::Removed, payload);
        Some(item)
    }

    fn try_peek(&self) -> Option<T> {
        self.inner.try_peek()
    }

    fn count(&self) -> Result<usize, CollectionError> {
        self.inner.count()
    }

    fn clear(&self) -> Result<(), CollectionError> {
        self.inner.clear()
    }

    fn snapshot(&self) -> Result<Vec<T>, CollectionError> {
        self.inner.snapshot()
    }

    fn watch(&self) -> Result<Option<Receiver<CollectionNotification<T>>>, CollectionError> {
        self.subscribe().map(Some)
    }
}

impl<T, C> Drop for ObservableCollection<T, C> {
    fn drop(&mut self) {
        if let Some(mut pump) = self.pump.lock().take() {
            pump.stop();
        }
        self.notifications.close();
    }
}
