//! `ChargerDescription`: immutable configuration, assembled once at
//! construction (spec §3). Analogous to the teacher's per-hardware-revision
//! `board::config` modules, but platform-agnostic: every hardware-specific
//! choice a real integration would bake into `hw_vN` feature flags here
//! becomes a builder call instead.

use alloc::vec::Vec;

use crate::error::{CmError, CmResult};

pub type HandleName = heapless::String<32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryPresence {
    AssumePresent,
    AssumeAbsent,
    AskFuelGauge,
    AskAnyCharger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollingMode {
    Disabled,
    Always,
    OnlyWhenAc,
    OnlyWhenCharging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollingPolicy {
    pub mode: PollingMode,
    pub interval_ms: u64,
}

/// `androidboot.mode=...` (spec §6); influences battery-presence policy and
/// the capacity tracker's starting condition (SPEC_FULL §10.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootMode {
    Normal,
    Calibration,
    Charger,
}

/// One JEITA table row: `(temp_enter, temp_recover, I_target_uA, V_term_uV)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JeitaRow {
    pub temp_enter_dc: i32,
    pub temp_recover_dc: i32,
    pub current_ua: u32,
    pub term_voltage_uv: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargerType {
    Dcp,
    Sdp,
    Cdp,
    Unknown,
    FastCharge,
}

#[derive(Debug, Clone, Default)]
pub struct JeitaTables {
    pub dcp: Vec<JeitaRow>,
    pub sdp: Vec<JeitaRow>,
    pub cdp: Vec<JeitaRow>,
    pub unknown: Vec<JeitaRow>,
    pub fast_charge: Vec<JeitaRow>,
}

impl JeitaTables {
    pub fn for_type(&self, ty: ChargerType) -> &[JeitaRow] {
        match ty {
            ChargerType::Dcp => &self.dcp,
            ChargerType::Sdp => &self.sdp,
            ChargerType::Cdp => &self.cdp,
            ChargerType::Unknown => &self.unknown,
            ChargerType::FastCharge => &self.fast_charge,
        }
    }

    fn validate(&self) -> CmResult<()> {
        for table in [&self.dcp, &self.sdp, &self.cdp, &self.unknown, &self.fast_charge] {
            for pair in table.windows(2) {
                if pair[0].temp_enter_dc >= pair[1].temp_enter_dc {
                    return Err(CmError::Invalid);
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FullBatteryThresholds {
    pub v_full_uv: i32,
    pub i_full_ua: i32,
    pub i_first_full_ua: i32,
    pub soc_full_permille: u16,
    pub charge_full_design_uah: u32,
    pub recheck_drop_uv: i32,
    pub recheck_delay_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VoltageGuard {
    pub v_chg_max_uv: i32,
    pub v_chg_drop_uv: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Durations {
    pub charging_max_ms: u64,
    pub discharging_max_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ShutdownConfig {
    pub v_shutdown_uv: i32,
    pub v_calibrate_uv: i32,
    pub trickle_timeout_ms: u64,
    pub min_time_per_percent_ms: u64,
    pub watchdog_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FastChargeThresholds {
    pub v_enable_uv: i32,
    pub i_enable_ua: i32,
    pub v_disable_uv: i32,
    pub enable_ticks: u8,
    pub disable_ticks: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrackerKeys {
    pub k0: u32,
    pub k1: u32,
}

#[derive(Debug, Clone)]
pub struct ChargerDescription {
    pub chargers: Vec<HandleName>,
    pub fast_charger: Option<HandleName>,
    pub fuel_gauge: HandleName,

    pub battery_presence: BatteryPresence,
    pub polling: PollingPolicy,
    pub boot_mode: BootMode,
    /// Read TEMP from a charger instead of the fuel gauge (SPEC_FULL §10.1).
    pub measure_battery_temp: bool,

    pub full_battery: FullBatteryThresholds,
    pub jeita: JeitaTables,
    /// Initial value of `RuntimeState::jeita.disabled`; toggled afterwards
    /// through the per-charger `jeita_control` sysfs-like control (spec §6).
    pub jeita_disabled_default: bool,

    pub temp_min_dc: i32,
    pub temp_max_dc: i32,
    pub temp_hysteresis_dc: i32,

    pub voltage_guard: VoltageGuard,
    pub voltage_guard_fast: VoltageGuard,
    pub durations: Durations,
    pub shutdown: ShutdownConfig,
    pub fast_charge: FastChargeThresholds,

    pub tracker_keys: TrackerKeys,
    pub tracker_design_capacity_mah: u32,

    /// Total input-current budget split in half across primary/secondary
    /// when `CHARGE_CONTROL_LIMIT` is written while fast charge is active
    /// (spec §6).
    pub double_ic_total_limit_ua: u32,
}

impl ChargerDescription {
    pub fn primary(&self) -> &HandleName {
        // Builder guarantees at least one charger handle.
        &self.chargers[0]
    }

    pub fn secondary(&self) -> Option<&HandleName> {
        self.chargers.get(1)
    }
}

pub struct ChargerDescriptionBuilder {
    chargers: Vec<HandleName>,
    fast_charger: Option<HandleName>,
    fuel_gauge: HandleName,
    battery_presence: BatteryPresence,
    polling: PollingPolicy,
    boot_mode: BootMode,
    measure_battery_temp: bool,
    full_battery: FullBatteryThresholds,
    jeita: JeitaTables,
    jeita_disabled_default: bool,
    temp_min_dc: i32,
    temp_max_dc: i32,
    temp_hysteresis_dc: i32,
    voltage_guard: VoltageGuard,
    voltage_guard_fast: VoltageGuard,
    durations: Durations,
    shutdown: ShutdownConfig,
    fast_charge: FastChargeThresholds,
    tracker_keys: TrackerKeys,
    tracker_design_capacity_mah: u32,
    double_ic_total_limit_ua: u32,
}

impl ChargerDescriptionBuilder {
    pub fn new(fuel_gauge: HandleName, primary_charger: HandleName) -> Self {
        let mut chargers = Vec::new();
        chargers.push(primary_charger);
        Self {
            chargers,
            fast_charger: None,
            fuel_gauge,
            battery_presence: BatteryPresence::AskFuelGauge,
            polling: PollingPolicy {
                mode: PollingMode::OnlyWhenCharging,
                interval_ms: 30_000,
            },
            boot_mode: BootMode::Normal,
            measure_battery_temp: false,
            full_battery: FullBatteryThresholds {
                v_full_uv: 4_350_000,
                i_full_ua: 150_000,
                i_first_full_ua: 200_000,
                soc_full_permille: 1000,
                charge_full_design_uah: 0,
                recheck_drop_uv: 50_000,
                recheck_delay_ms: 30_000,
            },
            jeita: JeitaTables::default(),
            jeita_disabled_default: false,
            temp_min_dc: 0,
            temp_max_dc: 500,
            temp_hysteresis_dc: 50,
            voltage_guard: VoltageGuard {
                v_chg_max_uv: 4_400_000,
                v_chg_drop_uv: 100_000,
            },
            voltage_guard_fast: VoltageGuard {
                v_chg_max_uv: 4_450_000,
                v_chg_drop_uv: 100_000,
            },
            durations: Durations {
                charging_max_ms: 6 * 3_600_000,
                discharging_max_ms: 3 * 3_600_000,
            },
            shutdown: ShutdownConfig {
                v_shutdown_uv: 3_200_000,
                v_calibrate_uv: 3_250_000,
                trickle_timeout_ms: 3 * 60_000,
                min_time_per_percent_ms: 30_000,
                watchdog_interval_ms: 20_000,
            },
            fast_charge: FastChargeThresholds {
                v_enable_uv: 3_400_000,
                i_enable_ua: 500_000,
                v_disable_uv: 3_300_000,
                enable_ticks: 2,
                disable_ticks: 2,
            },
            tracker_keys: TrackerKeys { k0: 0, k1: 0 },
            tracker_design_capacity_mah: 3000,
            double_ic_total_limit_ua: 3_000_000,
        }
    }

    pub fn fast_charger(mut self, handle: HandleName) -> Self {
        self.fast_charger = Some(handle);
        self
    }

    pub fn secondary_charger(mut self, handle: HandleName) -> Self {
        self.chargers.push(handle);
        self
    }

    pub fn battery_presence(mut self, v: BatteryPresence) -> Self {
        self.battery_presence = v;
        self
    }

    pub fn polling(mut self, v: PollingPolicy) -> Self {
        self.polling = v;
        self
    }

    pub fn boot_mode(mut self, v: BootMode) -> Self {
        self.boot_mode = v;
        self
    }

    pub fn measure_battery_temp(mut self, v: bool) -> Self {
        self.measure_battery_temp = v;
        self
    }

    pub fn full_battery(mut self, v: FullBatteryThresholds) -> Self {
        self.full_battery = v;
        self
    }

    pub fn jeita(mut self, v: JeitaTables) -> Self {
        self.jeita = v;
        self
    }

    pub fn jeita_disabled_default(mut self, v: bool) -> Self {
        self.jeita_disabled_default = v;
        self
    }

    pub fn thermal(mut self, min_dc: i32, max_dc: i32, hysteresis_dc: i32) -> Self {
        self.temp_min_dc = min_dc;
        self.temp_max_dc = max_dc;
        self.temp_hysteresis_dc = hysteresis_dc;
        self
    }

    pub fn voltage_guard(mut self, normal: VoltageGuard, fast: VoltageGuard) -> Self {
        self.voltage_guard = normal;
        self.voltage_guard_fast = fast;
        self
    }

    pub fn durations(mut self, v: Durations) -> Self {
        self.durations = v;
        self
    }

    pub fn shutdown(mut self, v: ShutdownConfig) -> Self {
        self.shutdown = v;
        self
    }

    pub fn fast_charge_thresholds(mut self, v: FastChargeThresholds) -> Self {
        self.fast_charge = v;
        self
    }

    pub fn tracker(mut self, keys: TrackerKeys, design_capacity_mah: u32) -> Self {
        self.tracker_keys = keys;
        self.tracker_design_capacity_mah = design_capacity_mah;
        self
    }

    pub fn double_ic_total_limit_ua(mut self, v: u32) -> Self {
        self.double_ic_total_limit_ua = v;
        self
    }

    pub fn build(self) -> CmResult<ChargerDescription> {
        if self.chargers.is_empty() {
            return Err(CmError::Invalid);
        }
        if self.temp_min_dc >= self.temp_max_dc {
            return Err(CmError::Invalid);
        }
        self.jeita.validate()?;

        Ok(ChargerDescription {
            chargers: self.chargers,
            fast_charger: self.fast_charger,
            fuel_gauge: self.fuel_gauge,
            battery_presence: self.battery_presence,
            polling: self.polling,
            boot_mode: self.boot_mode,
            measure_battery_temp: self.measure_battery_temp,
            full_battery: self.full_battery,
            jeita: self.jeita,
            jeita_disabled_default: self.jeita_disabled_default,
            temp_min_dc: self.temp_min_dc,
            temp_max_dc: self.temp_max_dc,
            temp_hysteresis_dc: self.temp_hysteresis_dc,
            voltage_guard: self.voltage_guard,
            voltage_guard_fast: self.voltage_guard_fast,
            durations: self.durations,
            shutdown: self.shutdown,
            fast_charge: self.fast_charge,
            tracker_keys: self.tracker_keys,
            tracker_design_capacity_mah: self.tracker_design_capacity_mah,
            double_ic_total_limit_ua: self.double_ic_total_limit_ua,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> HandleName {
        HandleName::try_from(s).unwrap()
    }

    #[test]
    fn rejects_unordered_jeita_table() {
        let mut jeita = JeitaTables::default();
        jeita.dcp.push(JeitaRow {
            temp_enter_dc: 100,
            temp_recover_dc: 90,
            current_ua: 1_000_000,
            term_voltage_uv: 4_200_000,
        });
        jeita.dcp.push(JeitaRow {
            temp_enter_dc: 50,
            temp_recover_dc: 40,
            current_ua: 1_000_000,
            term_voltage_uv: 4_200_000,
        });

        let result = ChargerDescriptionBuilder::new(name("fg"), name("chg0"))
            .jeita(jeita)
            .build();

        assert_eq!(result.unwrap_err(), CmError::Invalid);
    }

    #[test]
    fn rejects_empty_charger_list_is_unreachable_but_thermal_range_is_checked() {
        let result = ChargerDescriptionBuilder::new(name("fg"), name("chg0"))
            .thermal(500, 0, 50)
            .build();

        assert_eq!(result.unwrap_err(), CmError::Invalid);
    }

    #[test]
    fn builds_with_defaults() {
        let desc = ChargerDescriptionBuilder::new(name("fg"), name("chg0")).build().unwrap();
        assert_eq!(desc.primary(), &name("chg0"));
        assert_eq!(desc.secondary(), None);
    }
}
