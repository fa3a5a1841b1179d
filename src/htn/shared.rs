use std::sync::{Arc, PoisonError, RwLock};

use super::{
    domain::{Domain, MethodDef},
    learner,
    state::Literal,
};

struct Versioned {
    domain: Arc<Domain>,
    version: u64,
}

/// A task library shared between concurrent planners. Readers plan against an
/// immutable snapshot; writers go through a single lock and publish a new
/// version atomically.
#[derive(Clone)]
pub struct SharedDomain {
    inner: Arc<RwLock<Versioned>>,
}

impl SharedDomain {
    pub fn new(domain: Domain) -> Self {
        Self { inner: Arc::new(RwLock::new(Versioned { domain: Arc::new(domain), version: 0 })) }
    }

    pub fn snapshot(&self) -> Arc<Domain> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard.domain)
    }

    pub fn version(&self) -> u64 {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).version
    }

    /// Runs `f` on a private copy of the current domain and publishes the copy.
    pub fn update<R, F: FnOnce(&mut Domain) -> R>(&self, f: F) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Domain::clone(&guard.domain);
        let result = f(&mut next);
        guard.domain = Arc::new(next);
        guard.version += 1;
        result
    }

    /// Learns under the writer lock and returns the method it published.
    /// Nothing is published when learning fails.
    pub fn learn(&self, task_name: &str, missing: &[Literal]) -> Option<MethodDef> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Domain::clone(&guard.domain);
        if !learner::learn_method(task_name, missing, &mut next) {
            return None;
        }
        let learned = next.methods.first().cloned();
        guard.domain = Arc::new(next);
        guard.version += 1;
        learned
    }
}
