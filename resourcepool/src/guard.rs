use std::sync::Arc;

use tokio::sync::SemaphorePermit;

use crate::{
    config::Target,
    lease::Lease,
    manager::Manager,
    pool::PoolInner,
};

/// A capacity slot taken for a resource that is still being created.
///
/// Dropping it uncommitted, because creation failed or the `get` future was
/// cancelled, gives the slot and its permit back.
pub(crate) struct Reservation<M: Manager> {
    pool: Arc<PoolInner<M>>,
    pub target: Target,
    generation: u64,
    committed: bool,
}

impl<M: Manager> Reservation<M> {
    /// The caller must already have counted this reservation in the pool state.
    pub fn new(
        pool: Arc<PoolInner<M>>,
        permit: SemaphorePermit<'_>,
        target: Target,
        generation: u64,
    ) -> Self {
        permit.forget();
        Self {
            pool,
            target,
            generation,
            committed: false,
        }
    }

    pub fn commit(mut self, resource: M::Resource) -> Lease<M> {
        let id = {
            let mut state = self.pool.state();
            state.reserved -= 1;
            let id = state.next_id();
            state.busy.insert(id, self.generation);
            id
        };
        self.committed = true;
        tracing::debug!(resource = %id, backend = %self.target, "created resource");
        Lease::new(resource, id, self.target.clone(), &self.pool)
    }
}

impl<M: Manager> Drop for Reservation<M> {
    fn drop(&mut self) {
        if !self.committed {
            self.pool.state().reserved -= 1;
            self.pool.semaphore.add_permits(1);
        }
    }
}
