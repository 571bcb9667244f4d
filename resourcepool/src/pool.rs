use std::{
    marker::PhantomData,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crossbeam_queue::ArrayQueue;
use tokio::sync::{Semaphore, SemaphorePermit, TryAcquireError};
use tracing::{debug, info, trace, warn};

use crate::{
    config::{GetTimeout, PoolConfig, Target},
    error::{CloseErrors, ConfigError, PoolError, ReleaseError},
    guard::Reservation,
    lease::Lease,
    manager::{FnManager, Manager},
    state::{IdleResource, PoolState, ResourceId},
};

/// A bounded pool of resources for a single [`Target`].
///
/// Resources are created lazily: while fewer than `max_size` are alive a
/// `get` creates a new one, otherwise it waits for a resource to be
/// released, bounded by the configured [`GetTimeout`]. Cloning the pool
/// yields another handle to the same resources.
pub struct Pool<M: Manager> {
    inner: Arc<PoolInner<M>>,
}

impl<M: Manager> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Snapshot of the pool's accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub max_size: usize,
    pub idle: usize,
    pub busy: usize,
}

impl Status {
    pub fn size(&self) -> usize {
        self.idle + self.busy
    }
}

impl<M: Manager> Pool<M> {
    /// Creates an empty pool. No resource is created until the first `get`.
    pub fn new(target: Target, manager: M, pool_config: PoolConfig) -> Result<Self, ConfigError> {
        if pool_config.max_size == 0 {
            return Err(ConfigError::ZeroMaxSize);
        }
        debug!(
            backend = %target,
            max_size = pool_config.max_size,
            get_timeout = ?pool_config.get_timeout,
            "creating resource pool"
        );
        Ok(Self {
            inner: Arc::new(PoolInner::new(target, manager, pool_config)),
        })
    }

    pub fn builder() -> PoolBuilder<M> {
        PoolBuilder::new()
    }

    /// Checks out a resource, creating one if the pool is below capacity.
    pub async fn get(&self) -> Result<Lease<M>, PoolError<M::Error>> {
        self.inner.acquire().await
    }

    /// Returns a leased resource so the next `get` can reuse it.
    ///
    /// A lease issued by another pool is handed back in
    /// [`ReleaseError::NotManaged`] and neither pool is touched. Resources
    /// released after [`destroy`](Self::destroy), or created for a target
    /// since swapped out by [`replace`](Self::replace), are closed instead of
    /// being kept.
    pub async fn release(&self, lease: Lease<M>) -> Result<(), ReleaseError<M>> {
        self.inner.release(lease).await
    }

    /// Closes every idle resource and refuses further `get`s.
    ///
    /// Resources still leased out are not waited for; they are closed when
    /// they are released. Close failures are collected rather than dropped.
    pub async fn destroy(&self) -> Result<(), CloseErrors<M::Error>> {
        self.inner.destroy().await
    }

    /// Points the pool at `new` if it currently targets `old`.
    ///
    /// Idle resources are closed right away. Leased ones keep working and
    /// are closed when released, so every later `get` ends up on `new`.
    pub async fn replace(&self, old: Target, new: Target) -> Result<(), PoolError<M::Error>> {
        self.inner.replace(old, new).await
    }

    /// Number of live resources, idle and busy.
    pub fn count(&self) -> usize {
        self.status().size()
    }

    pub fn idle_count(&self) -> usize {
        self.status().idle
    }

    pub fn busy_count(&self) -> usize {
        self.status().busy
    }

    pub fn status(&self) -> Status {
        self.inner.status()
    }

    pub fn target(&self) -> Target {
        self.inner.state().target.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state().closed
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub fn manager(&self) -> &M {
        &self.inner.manager
    }
}

impl<C, D, R, E> Pool<FnManager<C, D, R, E>>
where
    C: Fn(&str, u16) -> Result<R, E> + Send + Sync + 'static,
    D: Fn(R) -> Result<(), E> + Send + Sync + 'static,
    R: Send + 'static,
    E: Send + std::error::Error + 'static,
{
    /// Builds a pool from a creation and a close function.
    ///
    /// `get_timeout_secs` of `0` makes `get` wait forever.
    pub fn from_fns<T>(
        host: T,
        port: u16,
        create: C,
        close: D,
        max_size: usize,
        get_timeout_secs: u64,
    ) -> Result<Self, ConfigError>
    where
        T: Into<String>,
    {
        Pool::new(
            Target::new(host, port),
            FnManager::new(create, close),
            PoolConfig::new(max_size).with_get_timeout(get_timeout_secs),
        )
    }
}

pub struct PoolBuilder<M: Manager> {
    pool_config: PoolConfig,
    _manager: PhantomData<M>,
}

impl<M: Manager> Default for PoolBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Manager> PoolBuilder<M> {
    pub fn new() -> Self {
        Self {
            pool_config: PoolConfig::default(),
            _manager: PhantomData,
        }
    }

    pub fn pool_config(mut self, pool_config: PoolConfig) -> Self {
        self.pool_config = pool_config;
        self
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.pool_config.max_size = max_size;
        self
    }

    pub fn get_timeout<T>(mut self, get_timeout: T) -> Self
    where
        T: Into<GetTimeout>,
    {
        self.pool_config.get_timeout = get_timeout.into();
        self
    }

    pub fn build<T>(self, target: T, manager: M) -> Result<Pool<M>, ConfigError>
    where
        T: Into<Target>,
    {
        Pool::new(target.into(), manager, self.pool_config)
    }
}

enum Admission<M: Manager> {
    Create(Reservation<M>),
    Reuse(Lease<M>),
}

pub(crate) struct PoolInner<M: Manager> {
    manager: M,
    config: PoolConfig,
    state: Mutex<PoolState>,
    /// One permit per slot; held by every busy resource and in-flight creation.
    pub(crate) semaphore: Semaphore,
    /// Only mutated while `state` is locked.
    idle: ArrayQueue<IdleResource<M::Resource>>,
}

impl<M: Manager> PoolInner<M> {
    fn new(target: Target, manager: M, pool_config: PoolConfig) -> Self {
        Self {
            manager,
            config: pool_config,
            state: Mutex::new(PoolState::new(target)),
            semaphore: Semaphore::new(pool_config.max_size),
            idle: ArrayQueue::new(pool_config.max_size),
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn status(&self) -> Status {
        let state = self.state();
        Status {
            max_size: self.config.max_size,
            idle: self.idle.len(),
            busy: state.busy.len(),
        }
    }

    async fn acquire(self: &Arc<Self>) -> Result<Lease<M>, PoolError<M::Error>> {
        let permit = self.acquire_permit().await?;
        let reservation = match self.admit(permit)? {
            Admission::Reuse(lease) => return Ok(lease),
            Admission::Create(reservation) => reservation,
        };

        match self.manager.create(&reservation.target).await {
            Ok(resource) => Ok(reservation.commit(resource)),
            Err(e) => {
                warn!(backend = %reservation.target, error = %e, "failed to create resource");
                Err(PoolError::CreationFailed(e))
            }
        }
    }

    async fn acquire_permit(&self) -> Result<SemaphorePermit<'_>, PoolError<M::Error>> {
        match self.config.get_timeout {
            GetTimeout::Infinite => Ok(self.semaphore.acquire().await?),
            GetTimeout::Bounded(timeout) if timeout.is_zero() => {
                self.semaphore.try_acquire().map_err(|e| match e {
                    TryAcquireError::Closed => PoolError::Closed,
                    TryAcquireError::NoPermits => PoolError::TimedOut,
                })
            }
            GetTimeout::Bounded(timeout) => {
                match tokio::time::timeout(timeout, self.semaphore.acquire()).await {
                    Ok(permit) => Ok(permit?),
                    Err(_) => {
                        debug!(?timeout, "timed out waiting for an idle resource");
                        Err(PoolError::TimedOut)
                    }
                }
            }
        }
    }

    /// Decides, under the lock, between creating a resource and reusing an
    /// idle one. The permit guarantees an idle resource exists whenever the
    /// pool is full.
    fn admit(
        self: &Arc<Self>,
        permit: SemaphorePermit<'_>,
    ) -> Result<Admission<M>, PoolError<M::Error>> {
        let mut state = self.state();
        if state.closed {
            return Err(PoolError::Closed);
        }

        if state.admitted(self.idle.len()) < self.config.max_size {
            state.reserved += 1;
            let target = state.target.clone();
            let generation = state.generation;
            drop(state);
            return Ok(Admission::Create(Reservation::new(
                self.clone(),
                permit,
                target,
                generation,
            )));
        }

        let IdleResource {
            id,
            resource,
            generation,
        } = match self.idle.pop() {
            Some(idle) => idle,
            None => panic!("resource pool is full but has no idle resource"),
        };
        state.busy.insert(id, generation);
        let target = state.target.clone();
        drop(state);

        permit.forget();
        trace!(resource = %id, "reusing idle resource");
        Ok(Admission::Reuse(Lease::new(resource, id, target, self)))
    }

    async fn release(self: &Arc<Self>, mut lease: Lease<M>) -> Result<(), ReleaseError<M>> {
        if !lease.is_from(self) {
            warn!(resource = %lease.id(), "refusing to release a resource from another pool");
            return Err(ReleaseError::NotManaged(lease));
        }
        let id = lease.id();
        let resource = match lease.detach() {
            Some(resource) => resource,
            None => return Ok(()),
        };

        if let Some(retired) = self.check_in(id, resource) {
            self.manager.close(retired).await.map_err(|e| {
                warn!(resource = %id, error = %e, "failed to close retired resource");
                CloseErrors::single(e)
            })?;
        }
        Ok(())
    }

    /// Returns a resource whose lease was dropped without release. Anything
    /// that has to be closed is closed on a spawned task.
    pub(crate) fn reclaim(self: &Arc<Self>, id: ResourceId, resource: M::Resource) {
        let retired = match self.check_in(id, resource) {
            Some(retired) => retired,
            None => return,
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let pool = self.clone();
                handle.spawn(async move {
                    if let Err(e) = pool.manager.close(retired).await {
                        warn!(resource = %id, error = %e, "failed to close dropped resource");
                    }
                });
            }
            Err(_) => {
                warn!(resource = %id, "no runtime to close dropped resource on, dropping it");
            }
        }
    }

    /// Moves a busy resource back to idle. Returns the resource when it has
    /// to be closed instead.
    fn check_in(&self, id: ResourceId, resource: M::Resource) -> Option<M::Resource> {
        let mut state = self.state();
        let generation = match state.busy.remove(&id) {
            Some(generation) => generation,
            None => {
                drop(state);
                warn!(resource = %id, "checked in a resource that isn't busy, closing it");
                return Some(resource);
            }
        };

        let retired = if state.is_current(generation) {
            let idle = IdleResource {
                id,
                resource,
                generation,
            };
            if self.idle.push(idle).is_err() {
                panic!("resource pool overflow when releasing a resource");
            }
            trace!(resource = %id, "resource returned to the pool");
            None
        } else {
            debug!(resource = %id, "closing retired resource on release");
            Some(resource)
        };
        drop(state);

        self.semaphore.add_permits(1);
        retired
    }

    async fn destroy(&self) -> Result<(), CloseErrors<M::Error>> {
        let drained = {
            let mut state = self.state();
            state.closed = true;
            self.semaphore.close();
            self.drain_idle()
        };
        info!(
            idle = drained.len(),
            busy = self.state().busy.len(),
            "destroying resource pool"
        );
        self.close_all(drained).await
    }

    async fn replace(&self, old: Target, new: Target) -> Result<(), PoolError<M::Error>> {
        let drained = {
            let mut state = self.state();
            if state.closed {
                return Err(PoolError::Closed);
            }
            if state.target != old {
                return Err(PoolError::TargetMismatch {
                    current: state.target.clone(),
                    requested: old,
                });
            }
            info!(old = %old, new = %new, "replacing pool target");
            state.target = new;
            state.generation += 1;
            self.drain_idle()
        };
        Ok(self.close_all(drained).await?)
    }

    fn drain_idle(&self) -> Vec<M::Resource> {
        let mut drained = Vec::with_capacity(self.idle.len());
        while let Some(idle) = self.idle.pop() {
            drained.push(idle.resource);
        }
        drained
    }

    async fn close_all(&self, resources: Vec<M::Resource>) -> Result<(), CloseErrors<M::Error>> {
        let mut results = Vec::with_capacity(resources.len());
        for resource in resources {
            let result = self.manager.close(resource).await;
            if let Err(e) = &result {
                warn!(error = %e, "failed to close resource");
            }
            results.push(result);
        }
        CloseErrors::collect(results)
    }
}
