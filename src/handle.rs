//! Scoped handle acquisition (spec §9: "model 'get by name / put' as scoped
//! acquisition with guaranteed release; do not hold handles across
//! suspension points"). `PowerSupplyBus` handles in this crate are plain
//! name lookups rather than an OS-level acquire/release pair, so the guard
//! here exists to make the *scoping discipline* explicit and enforce it at
//! the type level: a `HandleGuard` cannot outlive the synchronous function
//! that created it, because it borrows the bus for its whole lifetime.

use crate::{description::HandleName, error::CmResult, psb::PowerSupplyBus};

pub struct HandleGuard<'a> {
    bus: &'a mut dyn PowerSupplyBus,
    name: HandleName,
}

impl<'a> HandleGuard<'a> {
    pub fn acquire(bus: &'a mut dyn PowerSupplyBus, name: HandleName) -> Self {
        Self { bus, name }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn bus(&mut self) -> &mut dyn PowerSupplyBus {
        self.bus
    }
}

/// Runs `f` with a freshly acquired handle and guarantees the handle does
/// not outlive `f`, on every exit path including early returns via `?`.
pub fn with_handle<T>(
    bus: &mut dyn PowerSupplyBus,
    name: HandleName,
    f: impl FnOnce(&mut HandleGuard<'_>) -> CmResult<T>,
) -> CmResult<T> {
    let mut guard = HandleGuard::acquire(bus, name);
    f(&mut guard)
}
