//! Redis-backed list store (requires the `redis` feature).
//!
//! List commands open a fresh connection per operation and `SELECT` the
//! list's database first. There is no shared connection to repair after a
//! network failure; a failed command is reported to the collection, which
//! turns it into a boolean failure the caller may retry.
//!
//! Each subscription holds one long-lived pub/sub connection on a dedicated
//! thread. The thread polls with a read timeout so it notices when the
//! [`Subscription`] is dropped, and exits on any connection error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded};
use redis::{Client, Connection};
use tracing::{debug, warn};

use super::{ListKey, ListStore, Subscription};
use crate::core::StoreError;

const SUBSCRIBER_POLL: Duration = Duration::from_millis(250);

/// List store talking to a Redis server.
#[derive(Clone)]
pub struct RedisListStore {
    client: Client,
}

impl RedisListStore {
    /// Create a store for `url` (e.g. `redis://127.0.0.1:6379`). No connection
    /// is opened until the first operation.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL cannot be parsed.
    pub fn open(url: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::open(url)?,
        })
    }

    fn connection(&self, database: u32) -> Result<Connection, StoreError> {
        let mut conn = self.client.get_connection()?;
        redis::cmd("SELECT").arg(database).query::<()>(&mut conn)?;
        Ok(conn)
    }
}

impl ListStore for RedisListStore {
    fn push_back(&self, list: &ListKey, payload: &[u8]) -> Result<usize, StoreError> {
        let mut conn = self.connection(list.database)?;
        Ok(redis::cmd("RPUSH")
            .arg(&list.key)
            .arg(payload)
            .query(&mut conn)?)
    }

    fn pop_front(&self, list: &ListKey) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.connection(list.database)?;
        Ok(redis::cmd("LPOP").arg(&list.key).query(&mut conn)?)
    }

    fn pop_back(&self, list: &ListKey) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.connection(list.database)?;
        Ok(redis::cmd("RPOP").arg(&list.key).query(&mut conn)?)
    }

    fn index(&self, list: &ListKey, index: isize) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.connection(list.database)?;
        Ok(redis::cmd("LINDEX")
            .arg(&list.key)
            .arg(index)
            .query(&mut conn)?)
    }

    fn len(&self, list: &ListKey) -> Result<usize, StoreError> {
        let mut conn = self.connection(list.database)?;
        Ok(redis::cmd("LLEN").arg(&list.key).query(&mut conn)?)
    }

    fn range(&self, list: &ListKey) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut conn = self.connection(list.database)?;
        Ok(redis::cmd("LRANGE")
            .arg(&list.key)
            .arg(0)
            .arg(-1)
            .query(&mut conn)?)
    }

    fn delete(&self, list: &ListKey) -> Result<(), StoreError> {
        let mut conn = self.connection(list.database)?;
        redis::cmd("DEL").arg(&list.key).query::<()>(&mut conn)?;
        Ok(())
    }

    fn publish(&self, channel: &str, message: &[u8]) -> Result<usize, StoreError> {
        let mut conn = self.client.get_connection()?;
        Ok(redis::cmd("PUBLISH")
            .arg(channel)
            .arg(message)
            .query(&mut conn)?)
    }

    fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        let mut conn = self.client.get_connection()?;
        let (tx, rx) = unbounded();
        let (ready_tx, ready_rx) = bounded::<Result<(), StoreError>>(1);
        let closed = Arc::new(AtomicBool::new(false));
        let listener_closed = Arc::clone(&closed);
        let channel = channel.to_owned();

        thread::Builder::new()
            .name(format!("redis-sub-{channel}"))
            .spawn(move || {
                // dropping the PubSub unsubscribes, so it must live on this thread
                let mut pubsub = conn.as_pubsub();
                let setup = pubsub
                    .subscribe(&channel)
                    .and_then(|()| pubsub.set_read_timeout(Some(SUBSCRIBER_POLL)));
                if let Err(e) = setup {
                    let _ = ready_tx.send(Err(e.into()));
                    return;
                }
                let _ = ready_tx.send(Ok(()));
                debug!(channel = %channel, "redis subscriber started");

                while !listener_closed.load(Ordering::Acquire) {
                    match pubsub.get_message() {
                        Ok(msg) => {
                            if tx.send(msg.get_payload_bytes().to_vec()).is_err() {
                                break;
                            }
                        }
                        Err(e) if e.is_timeout() => {}
                        Err(e) => {
                            warn!(channel = %channel, error = %e, "redis subscriber connection lost");
                            break;
                        }
                    }
                }
                debug!(channel = %channel, "redis subscriber stopped");
            })
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        ready_rx.recv().map_err(|_| StoreError::Closed)??;
        Ok(Subscription::new(rx, closed))
    }
}
