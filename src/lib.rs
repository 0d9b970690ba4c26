//! Charger Manager: a platform-agnostic battery charging decision engine.
//!
//! The core (`monitor::tick` and everything it calls) is synchronous and
//! touches no executor; only `monitor::Monitor::run` is `async`, driving the
//! tick loop on an `embassy_time` interval and fanning events out through
//! `events::Notify`. Concrete hardware access is mediated entirely through
//! the `psb::PowerSupplyBus`, `clock::ClockService`/`WakeAlarm`, and
//! `capacity_tracker::PersistentStore` traits; nothing in this crate talks
//! to a register or a filesystem directly.

#![no_std]

extern crate alloc;

pub mod capacity_filter;
pub mod capacity_tracker;
pub mod clock;
pub mod control;
pub mod description;
pub mod error;
pub mod events;
pub mod fast_charge;
pub mod full_battery;
pub mod guards;
pub mod handle;
pub mod jeita;
pub mod monitor;
pub mod psb;
pub mod registry;
pub mod sensors;
pub mod state;
pub mod task_control;
pub mod uvlo;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
