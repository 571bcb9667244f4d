use std::{collections::HashMap, fmt};

use crate::config::Target;

/// Pool-unique identity of a resource, stable across checkouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) struct IdleResource<R> {
    pub id: ResourceId,
    pub resource: R,
    pub generation: u64,
}

/// Everything guarded by the pool lock, apart from the idle queue itself,
/// which is only mutated while this is locked.
pub(crate) struct PoolState {
    /// Busy resources and the generation each was created in.
    pub busy: HashMap<ResourceId, u64>,
    /// Creations admitted but not yet finished.
    pub reserved: usize,
    pub target: Target,
    pub generation: u64,
    pub closed: bool,
    next_id: u64,
}

impl PoolState {
    pub fn new(target: Target) -> Self {
        Self {
            busy: HashMap::new(),
            reserved: 0,
            target,
            generation: 0,
            closed: false,
            next_id: 0,
        }
    }

    pub fn next_id(&mut self) -> ResourceId {
        self.next_id += 1;
        ResourceId(self.next_id)
    }

    /// Slots taken by live resources and in-flight creations.
    pub fn admitted(&self, idle: usize) -> usize {
        idle + self.busy.len() + self.reserved
    }

    /// Whether a resource of `generation` may go back to the idle queue.
    pub fn is_current(&self, generation: u64) -> bool {
        !self.closed && generation == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let mut state = PoolState::new(Target::new("localhost", 1));
        let a = state.next_id();
        let b = state.next_id();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn admitted_counts_reservations() {
        let mut state = PoolState::new(Target::new("localhost", 1));
        let id = state.next_id();
        state.busy.insert(id, 0);
        state.reserved = 2;
        assert_eq!(state.admitted(1), 4);
    }

    #[test]
    fn stale_generation_is_not_current() {
        let mut state = PoolState::new(Target::new("localhost", 1));
        let generation = state.generation;
        assert!(state.is_current(generation));
        state.generation += 1;
        assert!(!state.is_current(generation));
    }

    #[test]
    fn closed_pool_keeps_nothing() {
        let mut state = PoolState::new(Target::new("localhost", 1));
        state.closed = true;
        assert!(!state.is_current(state.generation));
    }
}
