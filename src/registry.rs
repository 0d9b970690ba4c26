//! Global manager registry (spec §5, §9): list membership only, guarded by
//! a mutex; the registered managers are `for_each`-iterated for resume and
//! notify fan-out.

use alloc::sync::Arc;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use heapless::Vec as HVec;

use crate::monitor::Monitor;

const MAX_MANAGERS: usize = 4;

pub struct Registry {
    managers: Mutex<CriticalSectionRawMutex, HVec<Arc<Monitor>, MAX_MANAGERS>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            managers: Mutex::new(HVec::new()),
        }
    }

    pub async fn register(&self, manager: Arc<Monitor>) -> Result<(), Arc<Monitor>> {
        let mut guard = self.managers.lock().await;
        guard.push(manager).map_err(|m| m)
    }

    pub async fn unregister(&self, manager: &Arc<Monitor>) {
        let mut guard = self.managers.lock().await;
        if let Some(pos) = guard.iter().position(|m| Arc::ptr_eq(m, manager)) {
            guard.swap_remove(pos);
        }
    }

    /// Runs `f` against every registered manager in turn, serialized behind
    /// the registry lock (spec §9: "exposing `for_each` for resume/notify
    /// fan-out").
    pub async fn for_each<F: FnMut(&Arc<Monitor>)>(&self, mut f: F) {
        let guard = self.managers.lock().await;
        for manager in guard.iter() {
            f(manager);
        }
    }

    pub async fn len(&self) -> usize {
        self.managers.lock().await.len()
    }
}
