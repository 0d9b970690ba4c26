//! Duration / Voltage / Health guards (spec §4.5): each watches one signal,
//! latches an abnormal flag, and clears it once the signal recovers.

use crate::{
    description::{Durations, VoltageGuard},
    psb::Health,
    state::ChargingStatusFlag,
};

/// Charging/discharging duration guard. `charging_start_ms`/`charging_end_ms`
/// bracket the current half-cycle: the charging branch measures from when
/// charging last *started*, the discharging (recovery) branch from when it
/// last *stopped* (ground truth: `check_charging_duration`'s
/// `curr - cm->charging_end_time`, charger-manager.c:1640). `near_full_ocv`
/// gates the charging branch only — a battery close to full by OCV should
/// not be kicked by the duration watchdog (charger-manager.c:1595-1605's
/// `diff < desc->fullbatt_vchkdrop_uV` check).
pub fn duration_guard(
    durations: &Durations,
    charger_enabled: bool,
    charging_start_ms: u64,
    charging_end_ms: u64,
    now_ms: u64,
    near_full_ocv: bool,
) -> bool {
    if charger_enabled {
        !near_full_ocv && now_ms.saturating_sub(charging_start_ms) >= durations.charging_max_ms
    } else {
        now_ms.saturating_sub(charging_end_ms) >= durations.discharging_max_ms
    }
}

/// Voltage guard: latch once voltage exceeds `v_chg_max_uv`, release only
/// once it drops `v_chg_drop_uv` back below that ceiling (spec §4.5
/// hysteresis, mirrors the JEITA zone's enter/recover pair).
pub fn voltage_guard(guard: &VoltageGuard, currently_abnormal: bool, voltage_now_uv: i32) -> bool {
    if currently_abnormal {
        voltage_now_uv > guard.v_chg_max_uv.saturating_sub(guard.v_chg_drop_uv)
    } else {
        voltage_now_uv > guard.v_chg_max_uv
    }
}

/// Health guard: any health value other than `Good` is abnormal and blocks
/// charging outright; no hysteresis (spec §4.5 — health is already a
/// debounced classification upstream in the fuel gauge/charger IC).
pub fn health_guard(health: Health) -> bool {
    !matches!(health, Health::Good)
}

/// Recomputes `charging_status` from the three independent guard results.
/// Each flag is owned by exactly one guard; callers OR their own temp
/// overheat/cold bits in separately (spec §4.1 `temp_alert`).
pub fn apply(
    status: &mut enumset::EnumSet<ChargingStatusFlag>,
    duration_abnormal: bool,
    voltage_abnormal: bool,
    health_abnormal: bool,
) {
    status.remove(ChargingStatusFlag::DurationAbnormal);
    status.remove(ChargingStatusFlag::VoltageAbnormal);
    status.remove(ChargingStatusFlag::HealthAbnormal);
    if duration_abnormal {
        status.insert(ChargingStatusFlag::DurationAbnormal);
    }
    if voltage_abnormal {
        status.insert(ChargingStatusFlag::VoltageAbnormal);
    }
    if health_abnormal {
        status.insert(ChargingStatusFlag::HealthAbnormal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_guard_trips_past_max() {
        let d = Durations {
            charging_max_ms: 1000,
            discharging_max_ms: 2000,
        };
        assert!(!duration_guard(&d, true, 0, 0, 999, false));
        assert!(duration_guard(&d, true, 0, 0, 1000, false));
        assert!(!duration_guard(&d, false, 0, 0, 1999, false));
        assert!(duration_guard(&d, false, 0, 0, 2000, false));
    }

    #[test]
    fn duration_guard_uses_charging_end_for_discharge_branch() {
        let d = Durations {
            charging_max_ms: 1000,
            discharging_max_ms: 2000,
        };
        // Charging started long ago (ms 0) but stopped only recently (ms
        // 5000); the discharge timer must reset from charging_end_ms, not
        // keep counting from the stale charging_start_ms.
        assert!(!duration_guard(&d, false, 0, 5000, 6500, false));
        assert!(duration_guard(&d, false, 0, 5000, 7000, false));
    }

    #[test]
    fn duration_guard_near_full_ocv_suppresses_charging_branch() {
        let d = Durations {
            charging_max_ms: 1000,
            discharging_max_ms: 2000,
        };
        assert!(duration_guard(&d, true, 0, 0, 1000, false));
        assert!(!duration_guard(&d, true, 0, 0, 1000, true));
    }

    #[test]
    fn voltage_guard_has_hysteresis() {
        let g = VoltageGuard {
            v_chg_max_uv: 4_400_000,
            v_chg_drop_uv: 100_000,
        };
        assert!(!voltage_guard(&g, false, 4_400_000));
        assert!(voltage_guard(&g, false, 4_400_001));
        // Once abnormal, must drop below max - drop to clear.
        assert!(voltage_guard(&g, true, 4_350_000));
        assert!(!voltage_guard(&g, true, 4_300_000));
    }

    #[test]
    fn health_guard_flags_anything_but_good() {
        assert!(!health_guard(Health::Good));
        assert!(health_guard(Health::OverVoltage));
        assert!(health_guard(Health::Cold));
    }
}
