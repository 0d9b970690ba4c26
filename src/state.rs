//! `RuntimeState`: owned exclusively by the monitor loop (spec §3, §5).

use enumset::{EnumSet, EnumSetType};

use crate::{description::ChargerType, events::EventKind};

/// Bits of `charging_status` (spec §3). `EnumSet` mirrors the teacher's use
/// of `enumset::EnumSet<WifiEvent>` in `board/wifi/ap.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumSetType)]
#[cfg_attr(feature = "defmt", enumset(no_super_impls))]
pub enum ChargingStatusFlag {
    TempOverheat,
    TempCold,
    DurationAbnormal,
    VoltageAbnormal,
    HealthAbnormal,
}

/// Tagged JEITA zone (spec §9 design note): a sum type plus a sink
/// predicate centralizes the "stop charging" rule instead of scattering
/// `zone == 0 || zone == len` checks through the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JeitaZone {
    BelowT0,
    T0T1,
    T1T2,
    T2T3,
    AboveT3,
}

impl JeitaZone {
    pub fn from_index(index: usize, table_len: usize) -> Self {
        debug_assert!(index <= table_len);
        match (index, table_len) {
            (0, _) => JeitaZone::BelowT0,
            (i, len) if i == len => JeitaZone::AboveT3,
            (1, _) => JeitaZone::T0T1,
            (2, _) => JeitaZone::T1T2,
            _ => JeitaZone::T2T3,
        }
    }

    pub fn is_sink(self) -> bool {
        matches!(self, JeitaZone::BelowT0 | JeitaZone::AboveT3)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FastChargeState {
    pub is_supported: bool,
    pub is_enabled: bool,
    pub enable_count: u8,
    pub disable_count: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JeitaState {
    pub last_zone: Option<JeitaZone>,
    pub up_trigger: u8,
    pub down_trigger: u8,
    pub disabled: bool,
}

impl JeitaState {
    pub fn new(disabled: bool) -> Self {
        Self {
            last_zone: None,
            up_trigger: 0,
            down_trigger: 0,
            disabled,
        }
    }
}

/// Two-consecutive-tick confirmation counters for the full-battery
/// voltage+current criterion (spec §4.4; ground truth: `cm->desc`'s
/// `first_trigger_cnt`/`trigger_cnt` in `is_full_charged`). `first_trigger_cnt`
/// tracks the soft-full current band, `trigger_cnt` the hard-full band; the
/// two bands are mutually exclusive so only one advances per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FullBatteryState {
    pub first_trigger_cnt: u8,
    pub trigger_cnt: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapFilterState {
    pub reported_per_mille: u16,
    pub last_tick_ms: u64,
    pub last_update_ms: u64,
    /// Set when the reported value first reaches the 98.6% trickle band;
    /// cleared on leaving it. `now - trickle_start_ms` is the trickle time.
    pub trickle_start_ms: Option<u64>,
    pub lowtemp_trigger_cnt: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrackerPhase {
    Init,
    Idle,
    Updating,
    Done,
    Err,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrackerState {
    pub phase: TrackerPhase,
    pub design_capacity_mah: u32,
    pub start_cap_per_mille: u16,
    pub start_energy_uwh: u64,
    pub start_time_s: u64,
    pub end_voltage_uv: i32,
    pub end_current_ua: i32,
    pub init_retries: u8,
}

impl TrackerState {
    pub fn new(design_capacity_mah: u32) -> Self {
        Self {
            phase: TrackerPhase::Init,
            design_capacity_mah,
            start_cap_per_mille: 0,
            start_energy_uwh: 0,
            start_time_s: 0,
            end_voltage_uv: 0,
            end_current_ua: 0,
            init_retries: 0,
        }
    }
}

pub struct RuntimeState {
    pub charger_enabled: bool,
    pub charging_start_ms: u64,
    pub charging_end_ms: u64,

    pub emergency_stop: Option<EventKind>,
    pub charging_status: EnumSet<ChargingStatusFlag>,
    pub charger_type: ChargerType,

    pub fast_charge: FastChargeState,
    pub jeita: JeitaState,
    pub cap_filter: CapFilterState,

    pub uvlo_trigger_cnt: u16,
    pub uvlo_shutdown_requested: bool,
    pub force_set_full: bool,
    pub temperature_dc: i32,

    pub tracker: TrackerState,
    pub full_battery: FullBatteryState,
    pub fullbatt_vchk_deadline_ms: Option<u64>,
    pub thermal_adjust_current_ua: Option<i32>,
}

impl RuntimeState {
    pub fn new(charger_type: ChargerType, jeita_disabled: bool, design_capacity_mah: u32) -> Self {
        Self {
            charger_enabled: false,
            charging_start_ms: 0,
            charging_end_ms: 0,
            emergency_stop: None,
            charging_status: EnumSet::empty(),
            charger_type,
            fast_charge: FastChargeState::default(),
            jeita: JeitaState::new(jeita_disabled),
            cap_filter: CapFilterState::default(),
            uvlo_trigger_cnt: 0,
            uvlo_shutdown_requested: false,
            force_set_full: false,
            temperature_dc: 0,
            tracker: TrackerState::new(design_capacity_mah),
            full_battery: FullBatteryState::default(),
            fullbatt_vchk_deadline_ms: None,
            thermal_adjust_current_ua: None,
        }
    }

    /// Spec §3 invariant: `charger_enabled ⇒ emergency_stop is None`.
    pub fn check_invariants(&self) {
        debug_assert!(!self.charger_enabled || self.emergency_stop.is_none());
        debug_assert!(self.cap_filter.reported_per_mille <= 1000);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_from_index_marks_sinks() {
        assert!(JeitaZone::from_index(0, 4).is_sink());
        assert!(JeitaZone::from_index(4, 4).is_sink());
        assert!(!JeitaZone::from_index(2, 4).is_sink());
    }

    #[test]
    fn new_state_has_no_invariant_violations() {
        let state = RuntimeState::new(ChargerType::Unknown, false, 3000);
        state.check_invariants();
        assert!(!state.charger_enabled);
        assert_eq!(state.charging_status, EnumSet::empty());
    }
}
