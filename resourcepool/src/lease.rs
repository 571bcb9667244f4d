use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::{Arc, Weak},
};

use crate::{config::Target, manager::Manager, pool::PoolInner, state::ResourceId};

/// A resource checked out of a [`Pool`](crate::Pool).
///
/// Hand it back with [`Pool::release`](crate::Pool::release). Dropping it has
/// the same effect, except that a resource which has to be closed is closed
/// on a spawned task and any close error is only logged.
pub struct Lease<M: Manager> {
    resource: Option<M::Resource>,
    id: ResourceId,
    target: Target,
    pool: Weak<PoolInner<M>>,
}

impl<M: Manager> Lease<M> {
    pub(crate) fn new(
        resource: M::Resource,
        id: ResourceId,
        target: Target,
        pool: &Arc<PoolInner<M>>,
    ) -> Self {
        Self {
            resource: Some(resource),
            id,
            target,
            pool: Arc::downgrade(pool),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Backend the resource was created for.
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub(crate) fn is_from(&self, pool: &Arc<PoolInner<M>>) -> bool {
        std::ptr::eq(self.pool.as_ptr(), Arc::as_ptr(pool))
    }

    /// Takes the resource out; the lease no longer affects the pool when dropped.
    pub(crate) fn detach(&mut self) -> Option<M::Resource> {
        self.resource.take()
    }
}

impl<M: Manager> Deref for Lease<M> {
    type Target = M::Resource;

    fn deref(&self) -> &Self::Target {
        self.resource.as_ref().expect("resource missing from lease")
    }
}

impl<M: Manager> DerefMut for Lease<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.resource.as_mut().expect("resource missing from lease")
    }
}

impl<M: Manager> fmt::Debug for Lease<M>
where
    M::Resource: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("resource", &self.resource)
            .finish()
    }
}

impl<M: Manager> Drop for Lease<M> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            if let Some(pool) = self.pool.upgrade() {
                pool.reclaim(self.id, resource);
            }
        }
    }
}
