//! Mock collaborators for unit tests and the demo binaries (SPEC_FULL §0).
//! Grounded on the teacher's pattern of feature-gated driver swaps
//! (`battery_adc` vs `battery_max17055`): here the swap is compile-time via
//! `#[cfg(test)]`/the `demos` crate instead of a Cargo feature, since every
//! consumer of these mocks is host-side.

use alloc::{string::String, vec::Vec};

use crate::{
    capacity_tracker::PersistentStore,
    clock::{ClockService, WakeAlarm},
    error::{CmError, CmResult},
    psb::{PowerSupplyBus, Property, Value},
};

/// An in-memory property store keyed by `(handle, property)`, standing in
/// for the real Power-Supply Bus.
#[derive(Default)]
pub struct MockBus {
    values: Vec<(String, Property, Value)>,
    fail_next: Option<(String, Property)>,
    pub change_log: Vec<(String, Property, Value)>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_value(&mut self, handle: &str, prop: Property, value: Value) {
        match self.values.iter_mut().find(|(h, p, _)| h == handle && *p == prop) {
            Some(slot) => slot.2 = value,
            None => self.values.push((handle.into(), prop, value)),
        }
    }

    pub fn get_value(&self, handle: &str, prop: Property) -> Option<Value> {
        self.values
            .iter()
            .find(|(h, p, _)| h == handle && *p == prop)
            .map(|(_, _, v)| *v)
    }

    /// Makes the next `get`/`set` touching `(handle, prop)` fail once, to
    /// exercise rollback and skip-the-guard-only error paths.
    pub fn fail_next(&mut self, handle: &str, prop: Property) {
        self.fail_next = Some((handle.into(), prop));
    }

    fn maybe_fail(&mut self, handle: &str, prop: Property) -> CmResult<()> {
        if let Some((h, p)) = self.fail_next.clone() {
            if h == handle && p == prop {
                self.fail_next = None;
                return Err(CmError::Io);
            }
        }
        Ok(())
    }
}

impl PowerSupplyBus for MockBus {
    fn get(&mut self, handle: &str, prop: Property) -> CmResult<Value> {
        self.maybe_fail(handle, prop)?;
        self.get_value(handle, prop).ok_or(CmError::NotFound)
    }

    fn set(&mut self, handle: &str, prop: Property, value: Value) -> CmResult<()> {
        self.maybe_fail(handle, prop)?;
        self.change_log.push((handle.into(), prop, value));
        self.set_value(handle, prop, value);
        Ok(())
    }

    fn changed(&mut self, _handle: &str) -> CmResult<()> {
        Ok(())
    }
}

/// A clock advanced manually by tests instead of reading real time.
#[derive(Default)]
pub struct MockClock {
    now_ms: core::cell::Cell<u64>,
}

impl MockClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: core::cell::Cell::new(start_ms),
        }
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.set(self.now_ms.get().saturating_add(delta_ms));
    }
}

impl ClockService for MockClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}

#[derive(Default)]
pub struct MockWakeAlarm {
    pub armed_at_ms: Option<u64>,
}

impl WakeAlarm for MockWakeAlarm {
    fn arm(&mut self, at_ms: u64) {
        self.armed_at_ms = Some(at_ms);
    }

    fn cancel(&mut self) {
        self.armed_at_ms = None;
    }
}

/// An in-memory stand-in for the persistent capacity file.
#[derive(Default)]
pub struct MockPersistentStore {
    pub words: Option<[u32; 2]>,
    pub fail_reads: u8,
}

impl PersistentStore for MockPersistentStore {
    fn read(&mut self) -> CmResult<[u32; 2]> {
        if self.fail_reads > 0 {
            self.fail_reads -= 1;
            return Err(CmError::Io);
        }
        self.words.ok_or(CmError::NotFound)
    }

    fn write(&mut self, words: [u32; 2]) -> CmResult<()> {
        self.words = Some(words);
        Ok(())
    }
}
