//! Connection pool implementation

use std::collections::{HashMap, VecDeque};
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlbridge_core::{Connection, DbError, Result};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

use super::config::PoolConfig;
use super::stats::{PoolState, PoolStats};

/// Factory trait for opening new physical connections
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Open a new connection
    async fn connect(&self) -> Result<Arc<dyn Connection>>;
}

#[async_trait]
impl<T: ConnectionFactory> ConnectionFactory for Arc<T> {
    async fn connect(&self) -> Result<Arc<dyn Connection>> {
        (**self).connect().await
    }
}

type ConnectionId = u64;

/// A physical connection plus the metadata the pool tracks for it
struct PoolEntry {
    id: ConnectionId,
    pool_id: Uuid,
    connection: Arc<dyn Connection>,
    created_at: Instant,
    last_used_at: Instant,
}

impl PoolEntry {
    fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    fn is_expired(&self, recycle_interval: Duration) -> bool {
        self.age() >= recycle_interval
    }

    fn touch(mut self) -> Self {
        self.last_used_at = Instant::now();
        self
    }
}

/// Counters that outlive any single physical pool
#[derive(Default)]
struct PoolCounters {
    waiting: AtomicUsize,
    created: AtomicU64,
    recycled: AtomicU64,
}

/// Decrements the waiting counter even if the acquire future is dropped
struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Slots {
    idle: VecDeque<PoolEntry>,
    in_use: HashMap<ConnectionId, Arc<dyn Connection>>,
    closed: bool,
}

/// What `checkin` decided while holding the slot lock
enum Checkin {
    Parked,
    Discard(PoolEntry),
    Unknown(ConnectionId),
    Expired(PoolEntry),
    Dead(ConnectionId),
}

/// The physical pool: slot semaphore plus idle and checked-out connections.
///
/// Exactly one of these is ever built per [`ConnectionPool`].
struct PoolCore {
    id: Uuid,
    config: PoolConfig,
    factory: Arc<dyn ConnectionFactory>,
    /// Caps the number of connections that exist at once
    semaphore: Arc<Semaphore>,
    slots: Mutex<Slots>,
    next_id: AtomicU64,
    counters: Arc<PoolCounters>,
}

impl PoolCore {
    /// Build the slot set and open `min_size` connections
    async fn build(
        config: PoolConfig,
        factory: Arc<dyn ConnectionFactory>,
        counters: Arc<PoolCounters>,
    ) -> Result<Arc<Self>> {
        let core = Arc::new(Self {
            id: Uuid::new_v4(),
            semaphore: Arc::new(Semaphore::new(config.max_size())),
            config,
            factory,
            slots: Mutex::new(Slots::default()),
            next_id: AtomicU64::new(1),
            counters,
        });

        for _ in 0..core.config.min_size() {
            match core.open_entry().await {
                Ok(entry) => core.slots.lock().idle.push_back(entry),
                Err(e) => {
                    core.shutdown().await;
                    return Err(e);
                }
            }
        }

        Ok(core)
    }

    async fn open_entry(&self) -> Result<PoolEntry> {
        let timeout = self.config.connect_timeout();
        let connection = match tokio::time::timeout(timeout, self.factory.connect()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(DbError::Connection(format!(
                    "connect attempt timed out after {:?}",
                    timeout
                )));
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(connection_id = id, "opened database connection");

        let now = Instant::now();
        Ok(PoolEntry {
            id,
            pool_id: self.id,
            connection,
            created_at: now,
            last_used_at: now,
        })
    }

    async fn checkout(self: &Arc<Self>) -> Result<PooledConnection> {
        let _waiting = WaitingGuard::enter(&self.counters.waiting);

        match tokio::time::timeout(self.config.acquire_timeout(), self.checkout_slot()).await {
            Ok(result) => result,
            Err(_) => Err(DbError::Connection(format!(
                "Timed out waiting for connection (timeout: {:?})",
                self.config.acquire_timeout()
            ))),
        }
    }

    async fn checkout_slot(self: &Arc<Self>) -> Result<PooledConnection> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DbError::pool_closed())?;

        let entry = match self.take_idle().await {
            Some(entry) => entry,
            None => self.open_entry().await?,
        };

        let registered = {
            let mut slots = self.slots.lock();
            if slots.closed {
                false
            } else {
                slots.in_use.insert(entry.id, entry.connection.clone());
                true
            }
        };
        if !registered {
            // close() ran while this connection was being opened
            if let Err(e) = entry.connection.close().await {
                tracing::warn!(connection_id = entry.id, error = %e, "failed to close connection");
            }
            return Err(DbError::pool_closed());
        }

        Ok(PooledConnection {
            connection: entry.connection.clone(),
            entry: Some(entry),
            core: self.clone(),
            _permit: permit,
        })
    }

    /// Pop the next usable idle connection, recycling expired ones
    async fn take_idle(&self) -> Option<PoolEntry> {
        loop {
            let entry = { self.slots.lock().idle.pop_front() }?;

            if entry.is_expired(self.config.recycle_interval()) {
                self.retire(entry).await;
                continue;
            }

            if entry.connection.is_closed() {
                tracing::debug!(connection_id = entry.id, "dropping closed idle connection");
                continue;
            }

            tracing::trace!(
                connection_id = entry.id,
                idle_ms = entry.last_used_at.elapsed().as_millis() as u64,
                "reusing idle connection"
            );
            return Some(entry.touch());
        }
    }

    /// Close a connection that reached the recycle interval
    async fn retire(&self, entry: PoolEntry) {
        self.counters.recycled.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            connection_id = entry.id,
            age_ms = entry.age().as_millis() as u64,
            "recycling database connection"
        );
        if let Err(e) = entry.connection.close().await {
            tracing::warn!(connection_id = entry.id, error = %e, "failed to close recycled connection");
        }
    }

    /// Return a connection through the async path, closing it if expired.
    ///
    /// The in-use removal and the idle push share one lock, so a concurrent
    /// `shutdown` either sees the entry as checked out or as idle.
    async fn checkin(&self, entry: PoolEntry) {
        let entry = {
            let mut slots = self.slots.lock();
            if slots.closed {
                Checkin::Discard(entry)
            } else if slots.in_use.remove(&entry.id).is_none() {
                Checkin::Unknown(entry.id)
            } else if entry.is_expired(self.config.recycle_interval()) {
                Checkin::Expired(entry)
            } else if entry.connection.is_closed() {
                Checkin::Dead(entry.id)
            } else {
                slots.idle.push_back(entry.touch());
                Checkin::Parked
            }
        };

        match entry {
            Checkin::Parked => {}
            Checkin::Discard(entry) => {
                tracing::debug!(connection_id = entry.id, "pool closed, discarding returned connection");
                if !entry.connection.is_closed()
                    && let Err(e) = entry.connection.close().await
                {
                    tracing::error!(connection_id = entry.id, error = %e, "failed to release database connection");
                }
            }
            Checkin::Unknown(id) => {
                tracing::warn!(connection_id = id, "released connection is not checked out, ignoring");
            }
            Checkin::Expired(entry) => self.retire(entry).await,
            Checkin::Dead(id) => {
                tracing::debug!(connection_id = id, "returned connection is closed, dropping it");
            }
        }
    }

    /// Return a connection without awaiting; used from `Drop`.
    ///
    /// Expired connections are parked anyway and recycled by the next
    /// checkout.
    fn checkin_sync(&self, entry: PoolEntry) {
        let mut slots = self.slots.lock();
        if slots.closed {
            return;
        }
        slots.in_use.remove(&entry.id);
        if !entry.connection.is_closed() {
            slots.idle.push_back(entry.touch());
        }
    }

    /// Close every idle and checked-out connection and refuse new checkouts
    async fn shutdown(&self) {
        self.semaphore.close();

        let (idle, in_use) = {
            let mut slots = self.slots.lock();
            slots.closed = true;
            let idle: Vec<PoolEntry> = slots.idle.drain(..).collect();
            let in_use: Vec<(ConnectionId, Arc<dyn Connection>)> = slots.in_use.drain().collect();
            (idle, in_use)
        };

        tracing::debug!(
            idle = idle.len(),
            in_use = in_use.len(),
            "closing pooled connections"
        );

        let connections = idle
            .into_iter()
            .map(|entry| (entry.id, entry.connection))
            .chain(in_use);
        for (id, connection) in connections {
            if let Err(e) = connection.close().await {
                tracing::warn!(connection_id = id, error = %e, "failed to close connection during shutdown");
            }
        }
    }

    fn slot_counts(&self) -> (usize, usize) {
        let slots = self.slots.lock();
        (slots.idle.len(), slots.in_use.len())
    }
}

enum Phase {
    Uninitialized,
    Initializing,
    Ready(Arc<PoolCore>),
    Closed,
}

struct Lifecycle {
    phase: Phase,
    /// Completed initialization attempts, successful or not
    init_attempts: u64,
    last_failure: Option<DbError>,
    initializations: u64,
}

/// A lazily created, size-bounded pool of database connections
///
/// The pool opens nothing until the first [`acquire`](Self::acquire). At most
/// `max_size` connections exist at once, a connection is handed to one caller
/// at a time, and connections older than the recycle interval are replaced
/// transparently. Once [`close`](Self::close)d, the pool never reopens.
pub struct ConnectionPool {
    /// Pool configuration
    config: PoolConfig,
    /// Connection factory
    factory: Arc<dyn ConnectionFactory>,
    lifecycle: Mutex<Lifecycle>,
    /// Held only while the physical pool is being created
    init_guard: tokio::sync::Mutex<()>,
    counters: Arc<PoolCounters>,
}

impl ConnectionPool {
    /// Create a new, uninitialized pool with the given configuration and factory
    pub fn new<F: ConnectionFactory>(config: PoolConfig, factory: F) -> Self {
        Self {
            config,
            factory: Arc::new(factory),
            lifecycle: Mutex::new(Lifecycle {
                phase: Phase::Uninitialized,
                init_attempts: 0,
                last_failure: None,
                initializations: 0,
            }),
            init_guard: tokio::sync::Mutex::new(()),
            counters: Arc::new(PoolCounters::default()),
        }
    }

    /// Check out a connection, creating the pool on first use.
    ///
    /// Waits for a free slot when `max_size` connections are in use. Fails
    /// with a connection error if the pool is closed, if a connect attempt
    /// fails or times out, or if no slot frees up within the acquire timeout.
    #[tracing::instrument(skip(self))]
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let core = self.ready_core().await?;
        core.checkout().await.inspect_err(|e| {
            tracing::error!(error = %e, "failed to acquire database connection");
        })
    }

    /// Return a connection to the pool.
    ///
    /// Never fails: releasing into a closed pool, or releasing a connection
    /// that belongs to another pool, is logged and ignored.
    pub async fn release(&self, mut conn: PooledConnection) {
        let current = match &self.lifecycle.lock().phase {
            Phase::Ready(core) => Some(core.clone()),
            _ => None,
        };

        let Some(core) = current else {
            tracing::debug!(connection_id = conn.id(), "pool is not open, release ignored");
            return;
        };

        if conn.pool_id() != core.id {
            // Dropping the guard hands the connection back to its own pool
            tracing::warn!(connection_id = conn.id(), "connection belongs to another pool, release ignored");
            return;
        }

        if let Some(entry) = conn.entry.take() {
            core.checkin(entry).await;
        }
    }

    /// Shut the pool down, closing idle and checked-out connections.
    ///
    /// Idempotent: later calls are no-ops. Any later `acquire` fails.
    pub async fn close(&self) {
        let previous = {
            let mut lifecycle = self.lifecycle.lock();
            std::mem::replace(&mut lifecycle.phase, Phase::Closed)
        };

        match previous {
            Phase::Closed => {
                tracing::debug!("connection pool already closed");
            }
            Phase::Ready(core) => {
                core.shutdown().await;
                tracing::info!("database connection pool closed");
            }
            Phase::Uninitialized | Phase::Initializing => {
                tracing::info!("database connection pool closed before initialization");
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> PoolState {
        match self.lifecycle.lock().phase {
            Phase::Uninitialized => PoolState::Uninitialized,
            Phase::Initializing => PoolState::Initializing,
            Phase::Ready(_) => PoolState::Ready,
            Phase::Closed => PoolState::Closed,
        }
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        let (state, core, initializations) = {
            let lifecycle = self.lifecycle.lock();
            let (state, core) = match &lifecycle.phase {
                Phase::Uninitialized => (PoolState::Uninitialized, None),
                Phase::Initializing => (PoolState::Initializing, None),
                Phase::Ready(core) => (PoolState::Ready, Some(core.clone())),
                Phase::Closed => (PoolState::Closed, None),
            };
            (state, core, lifecycle.initializations)
        };

        let (idle, active) = core.map(|c| c.slot_counts()).unwrap_or((0, 0));
        PoolStats {
            state,
            total: idle + active,
            idle,
            active,
            waiting: self.counters.waiting.load(Ordering::SeqCst),
            created: self.counters.created.load(Ordering::SeqCst),
            recycled: self.counters.recycled.load(Ordering::SeqCst),
            initializations,
        }
    }

    /// Resolve the physical pool, creating it exactly once.
    async fn ready_core(&self) -> Result<Arc<PoolCore>> {
        let observed_attempts = {
            let lifecycle = self.lifecycle.lock();
            match &lifecycle.phase {
                Phase::Ready(core) => return Ok(core.clone()),
                Phase::Closed => return Err(DbError::pool_closed()),
                Phase::Uninitialized | Phase::Initializing => lifecycle.init_attempts,
            }
        };

        let _guard = self.init_guard.lock().await;

        {
            let mut lifecycle = self.lifecycle.lock();
            match &lifecycle.phase {
                Phase::Ready(core) => return Ok(core.clone()),
                Phase::Closed => return Err(DbError::pool_closed()),
                Phase::Uninitialized | Phase::Initializing => {}
            }
            // We queued behind an attempt that failed: share its outcome
            if lifecycle.init_attempts > observed_attempts
                && let Some(err) = lifecycle.last_failure.clone()
            {
                return Err(err);
            }
            lifecycle.phase = Phase::Initializing;
        }

        tracing::info!(
            min_size = self.config.min_size(),
            max_size = self.config.max_size(),
            "creating database connection pool"
        );
        let result =
            PoolCore::build(self.config.clone(), self.factory.clone(), self.counters.clone()).await;

        let closed_meanwhile = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.init_attempts += 1;
            let closed = matches!(lifecycle.phase, Phase::Closed);
            match &result {
                Ok(core) if !closed => {
                    lifecycle.phase = Phase::Ready(core.clone());
                    lifecycle.initializations += 1;
                    lifecycle.last_failure = None;
                }
                Ok(_) => {}
                Err(err) => {
                    if !closed {
                        lifecycle.phase = Phase::Uninitialized;
                    }
                    lifecycle.last_failure = Some(err.clone());
                }
            }
            closed
        };

        match result {
            Ok(core) if closed_meanwhile => {
                core.shutdown().await;
                Err(DbError::pool_closed())
            }
            Ok(core) => {
                tracing::info!(pool_id = %core.id, "database connection pool created");
                Ok(core)
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to create database connection pool");
                Err(err)
            }
        }
    }
}

/// A connection checked out from the pool
///
/// Hand it back with [`ConnectionPool::release`]. If it is dropped instead
/// (a panic or a cancelled task), it returns itself to the pool it came from.
pub struct PooledConnection {
    connection: Arc<dyn Connection>,
    entry: Option<PoolEntry>,
    core: Arc<PoolCore>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    /// Pool-local connection identifier
    pub fn id(&self) -> u64 {
        self.entry.as_ref().map(|e| e.id).unwrap_or_default()
    }

    /// Identifier of the pool this connection belongs to
    pub fn pool_id(&self) -> Uuid {
        self.entry.as_ref().map(|e| e.pool_id).unwrap_or(self.core.id)
    }

    /// Time since the physical connection was opened
    pub fn age(&self) -> Duration {
        self.entry.as_ref().map(|e| e.age()).unwrap_or_default()
    }

    /// Get the underlying connection as an Arc
    pub fn inner(&self) -> &Arc<dyn Connection> {
        &self.connection
    }
}

impl Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            tracing::debug!(connection_id = entry.id, "connection dropped without release, returning it");
            self.core.checkin_sync(entry);
        }
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.id())
            .field("pool_id", &self.pool_id())
            .field("driver", &self.connection.driver_name())
            .finish()
    }
}
