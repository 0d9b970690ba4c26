//! Full-Battery Detector (spec §4.4): multi-criteria full detection with a
//! recheck-after-full recharge trigger.

use crate::{description::FullBatteryThresholds, state::FullBatteryState};

/// `cm->desc->cap`'s full-percent gate in the original driver is a fixed
/// 100%; expressed in ‰ against this crate's SOC resolution.
const CAP_FULL_PERMILLE: u16 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FullBatteryDecision {
    /// Not full yet; keep charging as-is.
    NotFull,
    /// Two consecutive ticks in the soft-full current band: report
    /// `force_set_full=true` without disabling or declaring full.
    SoftFull,
    /// Criteria met on two consecutive ticks with SOC already ≥ 100%: stop
    /// charging, latch `charging_end_ms`, calibrate the fuel gauge, arm the
    /// recheck-drop watch.
    BecameFull,
    /// Hard-full current band held for two ticks but SOC hasn't caught up
    /// to 100% yet: calibrate the fuel gauge to full without declaring full,
    /// and disable only the primary charger to force re-entry.
    CalibrateOnlyDisablePrimary,
    /// Already full and holding.
    StillFull,
    /// Voltage has sagged past the recheck-drop threshold for the full
    /// recheck delay: recharge.
    Recharge,
}

pub struct FullBatteryInputs {
    pub voltage_now_uv: i32,
    pub current_now_ua: i32,
    pub soc_per_mille: u16,
    pub charge_full_uah: u32,
}

/// Evaluates one tick. `is_full` / `recheck_deadline_ms` are the caller's
/// persisted state (spec §3 `force_set_full`, `fullbatt_vchk_deadline_ms`);
/// `counters` is the two-tick confirmation state for the voltage+current
/// criterion (ground truth: `is_full_charged`, charger-manager.c:883-972).
pub fn evaluate(
    thr: &FullBatteryThresholds,
    inputs: &FullBatteryInputs,
    is_full: bool,
    counters: &mut FullBatteryState,
    recheck_deadline_ms: &mut Option<u64>,
    now_ms: u64,
) -> FullBatteryDecision {
    if is_full {
        if let Some(deadline) = *recheck_deadline_ms {
            if inputs.voltage_now_uv <= thr.v_full_uv.saturating_sub(thr.recheck_drop_uv) {
                if now_ms >= deadline {
                    *recheck_deadline_ms = None;
                    return FullBatteryDecision::Recharge;
                }
            } else {
                // Voltage recovered above the drop band before the delay
                // elapsed: cancel the pending recheck.
                *recheck_deadline_ms = None;
            }
        } else if inputs.voltage_now_uv <= thr.v_full_uv.saturating_sub(thr.recheck_drop_uv) {
            *recheck_deadline_ms = Some(now_ms.saturating_add(thr.recheck_delay_ms));
        }
        return FullBatteryDecision::StillFull;
    }

    if by_charge_full_design(thr, inputs) {
        return FullBatteryDecision::BecameFull;
    }

    // Criterion 2 (voltage+current) is tried next; anything it actually
    // resolves (soft-full, hard-full, calibrate-only) wins outright. When it
    // has nothing to report this tick, criterion 3 (SOC) still gets a look —
    // the two are independent thresholds, not mutually exclusive configs.
    match evaluate_voltage_and_current(thr, inputs, counters) {
        FullBatteryDecision::NotFull => {}
        decision => return decision,
    }

    if by_soc(thr, inputs) {
        return FullBatteryDecision::BecameFull;
    }

    FullBatteryDecision::NotFull
}

/// Criterion 2: two-consecutive-tick debounce over the hard-full and
/// soft-full current bands (ground truth: `is_full_charged`'s unconditional
/// `goto out` inside its `fullbatt_uV > 0 && fullbatt_uA > 0` branch,
/// charger-manager.c:910-951).
fn evaluate_voltage_and_current(
    thr: &FullBatteryThresholds,
    inputs: &FullBatteryInputs,
    counters: &mut FullBatteryState,
) -> FullBatteryDecision {
    if thr.v_full_uv <= 0 || thr.i_full_ua <= 0 {
        return FullBatteryDecision::NotFull;
    }

    if hard_full_ready(thr, inputs) {
        counters.first_trigger_cnt = 0;
        counters.trigger_cnt = counters.trigger_cnt.saturating_add(1);
        return if counters.trigger_cnt > 1 {
            if inputs.soc_per_mille >= CAP_FULL_PERMILLE {
                FullBatteryDecision::BecameFull
            } else {
                FullBatteryDecision::CalibrateOnlyDisablePrimary
            }
        } else {
            FullBatteryDecision::NotFull
        };
    }

    counters.trigger_cnt = 0;
    if soft_full_ready(thr, inputs) {
        counters.first_trigger_cnt = counters.first_trigger_cnt.saturating_add(1);
        if counters.first_trigger_cnt > 1 {
            return FullBatteryDecision::SoftFull;
        }
    } else {
        counters.first_trigger_cnt = 0;
    }
    FullBatteryDecision::NotFull
}

fn by_charge_full_design(thr: &FullBatteryThresholds, inputs: &FullBatteryInputs) -> bool {
    thr.charge_full_design_uah != 0 && inputs.charge_full_uah >= thr.charge_full_design_uah
}

fn by_soc(thr: &FullBatteryThresholds, inputs: &FullBatteryInputs) -> bool {
    thr.soc_full_permille != 0 && inputs.soc_per_mille >= thr.soc_full_permille
}

/// Hard-full current band: voltage at/above target, current tapered at or
/// below the steady-state threshold and non-negative (charging-direction).
fn hard_full_ready(thr: &FullBatteryThresholds, inputs: &FullBatteryInputs) -> bool {
    inputs.voltage_now_uv >= thr.v_full_uv
        && inputs.current_now_ua >= 0
        && inputs.current_now_ua <= thr.i_full_ua
}

/// Soft-full current band: strictly above the hard-full ceiling but at or
/// below the looser pre-first-full threshold — mutually exclusive with
/// `hard_full_ready` by construction.
fn soft_full_ready(thr: &FullBatteryThresholds, inputs: &FullBatteryInputs) -> bool {
    thr.i_first_full_ua > 0
        && inputs.voltage_now_uv >= thr.v_full_uv
        && inputs.current_now_ua > thr.i_full_ua
        && inputs.current_now_ua <= thr.i_first_full_ua
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> FullBatteryThresholds {
        FullBatteryThresholds {
            v_full_uv: 4_350_000,
            i_full_ua: 150_000,
            i_first_full_ua: 200_000,
            soc_full_permille: 1000,
            charge_full_design_uah: 0,
            recheck_drop_uv: 50_000,
            recheck_delay_ms: 30_000,
        }
    }

    #[test]
    fn becomes_full_on_second_consecutive_tapered_tick_when_soc_full() {
        let thr = thresholds();
        let inputs = FullBatteryInputs {
            voltage_now_uv: 4_360_000,
            current_now_ua: 100_000,
            soc_per_mille: 1000,
            charge_full_uah: 0,
        };
        let mut deadline = None;
        let mut counters = FullBatteryState::default();
        // First qualifying tick only arms the counter.
        assert_eq!(
            evaluate(&thr, &inputs, false, &mut counters, &mut deadline, 0),
            FullBatteryDecision::NotFull
        );
        // Second consecutive qualifying tick commits.
        assert_eq!(
            evaluate(&thr, &inputs, false, &mut counters, &mut deadline, 1000),
            FullBatteryDecision::BecameFull
        );
    }

    #[test]
    fn calibrates_without_declaring_full_when_soc_not_yet_caught_up() {
        let thr = thresholds();
        let inputs = FullBatteryInputs {
            voltage_now_uv: 4_360_000,
            current_now_ua: 100_000,
            soc_per_mille: 950,
            charge_full_uah: 0,
        };
        let mut deadline = None;
        let mut counters = FullBatteryState::default();
        evaluate(&thr, &inputs, false, &mut counters, &mut deadline, 0);
        assert_eq!(
            evaluate(&thr, &inputs, false, &mut counters, &mut deadline, 1000),
            FullBatteryDecision::CalibrateOnlyDisablePrimary
        );
    }

    #[test]
    fn soft_full_band_reports_without_disabling() {
        let thr = thresholds();
        // Between i_full_ua (150_000) and i_first_full_ua (200_000).
        let inputs = FullBatteryInputs {
            voltage_now_uv: 4_360_000,
            current_now_ua: 180_000,
            soc_per_mille: 950,
            charge_full_uah: 0,
        };
        let mut deadline = None;
        let mut counters = FullBatteryState::default();
        assert_eq!(
            evaluate(&thr, &inputs, false, &mut counters, &mut deadline, 0),
            FullBatteryDecision::NotFull
        );
        assert_eq!(
            evaluate(&thr, &inputs, false, &mut counters, &mut deadline, 1000),
            FullBatteryDecision::SoftFull
        );
    }

    #[test]
    fn reversal_between_ticks_resets_the_trigger_counter() {
        let thr = thresholds();
        let qualifying = FullBatteryInputs {
            voltage_now_uv: 4_360_000,
            current_now_ua: 100_000,
            soc_per_mille: 1000,
            charge_full_uah: 0,
        };
        let not_qualifying = FullBatteryInputs {
            current_now_ua: 500_000,
            ..qualifying
        };
        let mut deadline = None;
        let mut counters = FullBatteryState::default();
        evaluate(&thr, &qualifying, false, &mut counters, &mut deadline, 0);
        assert_eq!(counters.trigger_cnt, 1);
        evaluate(&thr, &not_qualifying, false, &mut counters, &mut deadline, 1000);
        assert_eq!(counters.trigger_cnt, 0);
        assert_eq!(
            evaluate(&thr, &qualifying, false, &mut counters, &mut deadline, 2000),
            FullBatteryDecision::NotFull
        );
    }

    #[test]
    fn not_full_while_current_still_high() {
        let thr = thresholds();
        let inputs = FullBatteryInputs {
            voltage_now_uv: 4_360_000,
            current_now_ua: 500_000,
            soc_per_mille: 950,
            charge_full_uah: 0,
        };
        let mut deadline = None;
        let mut counters = FullBatteryState::default();
        let d = evaluate(&thr, &inputs, false, &mut counters, &mut deadline, 0);
        assert_eq!(d, FullBatteryDecision::NotFull);
    }

    #[test]
    fn recharges_after_drop_and_delay() {
        let thr = thresholds();
        let inputs = FullBatteryInputs {
            voltage_now_uv: 4_250_000, // dropped 100 mV, past the 50 mV band
            current_now_ua: 0,
            soc_per_mille: 980,
            charge_full_uah: 0,
        };
        let mut deadline = None;
        let mut counters = FullBatteryState::default();
        assert_eq!(
            evaluate(&thr, &inputs, true, &mut counters, &mut deadline, 0),
            FullBatteryDecision::StillFull
        );
        assert_eq!(deadline, Some(30_000));
        assert_eq!(
            evaluate(&thr, &inputs, true, &mut counters, &mut deadline, 29_999),
            FullBatteryDecision::StillFull
        );
        assert_eq!(
            evaluate(&thr, &inputs, true, &mut counters, &mut deadline, 30_000),
            FullBatteryDecision::Recharge
        );
    }

    #[test]
    fn recovering_voltage_cancels_pending_recheck() {
        let thr = thresholds();
        let dropped = FullBatteryInputs {
            voltage_now_uv: 4_250_000,
            current_now_ua: 0,
            soc_per_mille: 980,
            charge_full_uah: 0,
        };
        let mut deadline = None;
        let mut counters = FullBatteryState::default();
        evaluate(&thr, &dropped, true, &mut counters, &mut deadline, 0);
        assert!(deadline.is_some());

        let recovered = FullBatteryInputs {
            voltage_now_uv: 4_350_000,
            ..dropped
        };
        evaluate(&thr, &recovered, true, &mut counters, &mut deadline, 10_000);
        assert_eq!(deadline, None);
    }

    #[test]
    fn soc_threshold_triggers_full() {
        let thr = thresholds();
        let inputs = FullBatteryInputs {
            voltage_now_uv: 0,
            current_now_ua: 0,
            soc_per_mille: 1000,
            charge_full_uah: 0,
        };
        let mut deadline = None;
        let mut counters = FullBatteryState::default();
        assert_eq!(
            evaluate(&thr, &inputs, false, &mut counters, &mut deadline, 0),
            FullBatteryDecision::BecameFull
        );
    }
}
