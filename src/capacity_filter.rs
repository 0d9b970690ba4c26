//! Capacity Filter (spec §4.6): slew-rate-limited SOC reporting. Smooths
//! the fuel gauge's raw ‰ reading so consumers see monotonic-ish, 1%-grained
//! capacity instead of every ‰ jitter.

use crate::state::CapFilterState;

const MIN_SLEW_PER_MILLE: i32 = 5;
const TRICKLE_ENTER_PER_MILLE: u16 = 986;
const TRICKLE_FORCE_PER_MILLE: u16 = 994;
const DISCHARGE_HIGH_WATERMARK_PER_MILLE: u16 = 955;
const DISCHARGE_STEP_PER_MILLE: i32 = 8;

pub struct CapFilterConfig {
    pub t_per_percent_ms: u64,
    pub trickle_timeout_ms: u64,
    pub v_lt_shutdown_uv: i32,
}

pub struct CapFilterInputs {
    pub fg_soc_per_mille: i32,
    pub is_charging: bool,
    pub is_full: bool,
    pub external_power: bool,
    pub temp_dc: i32,
    pub voltage_now_uv: i32,
}

pub struct CapFilterOutcome {
    pub reported_per_mille: u16,
    pub force_set_full: bool,
    /// True when the 1%-rounded value differs from before this tick.
    pub changed: bool,
}

/// Spec §4.6: all the clamps below operate on `fg_soc` already clamped into
/// `[0, 1000]`, and slew limits are always computed against the *previous*
/// reported value, never the raw reading.
pub fn tick(
    state: &mut CapFilterState,
    cfg: &CapFilterConfig,
    inputs: &CapFilterInputs,
    now_ms: u64,
) -> CapFilterOutcome {
    let soc = inputs.fg_soc_per_mille.clamp(0, 1000) as u16;
    let c_prev = state.reported_per_mille;
    let delta_t_ms = now_ms.saturating_sub(state.last_tick_ms);
    let delta_f_ms = now_ms.saturating_sub(state.last_update_ms);

    if low_temp_latch(state, cfg, inputs) {
        state.reported_per_mille = 0;
        state.last_tick_ms = now_ms;
        return finish(state, c_prev, now_ms, false);
    }

    if c_prev < TRICKLE_ENTER_PER_MILLE {
        state.trickle_start_ms = None;
    }

    let mut force_full = false;
    let mut c_new = if inputs.is_full {
        full_value(cfg, inputs, c_prev, delta_f_ms)
    } else if inputs.is_charging {
        charging_value(cfg, soc, c_prev, delta_t_ms, delta_f_ms, &mut force_full, state, now_ms)
    } else {
        discharging_value(soc, c_prev, delta_f_ms)
    };

    c_new = c_new.clamp(0, 1000);
    state.reported_per_mille = c_new;
    state.last_tick_ms = now_ms;
    if c_new != c_prev {
        state.last_update_ms = now_ms;
    }

    let mut outcome = finish(state, c_prev, now_ms, false);
    outcome.force_set_full = force_full;
    outcome
}

fn finish(state: &CapFilterState, c_prev: u16, _now_ms: u64, force_set_full: bool) -> CapFilterOutcome {
    let changed = round_to_percent(state.reported_per_mille) != round_to_percent(c_prev);
    CapFilterOutcome {
        reported_per_mille: state.reported_per_mille,
        force_set_full,
        changed,
    }
}

fn round_to_percent(per_mille: u16) -> u16 {
    (per_mille + 5) / 10
}

fn low_temp_latch(state: &mut CapFilterState, cfg: &CapFilterConfig, inputs: &CapFilterInputs) -> bool {
    if inputs.temp_dc <= 100 && inputs.voltage_now_uv <= cfg.v_lt_shutdown_uv {
        state.lowtemp_trigger_cnt = state.lowtemp_trigger_cnt.saturating_add(1);
    } else {
        state.lowtemp_trigger_cnt = 0;
    }
    state.lowtemp_trigger_cnt >= 2
}

#[allow(clippy::too_many_arguments)]
fn charging_value(
    cfg: &CapFilterConfig,
    soc: u16,
    c_prev: u16,
    delta_t_ms: u64,
    delta_f_ms: u64,
    force_full: &mut bool,
    state: &mut CapFilterState,
    now_ms: u64,
) -> u16 {
    if c_prev >= TRICKLE_ENTER_PER_MILLE {
        let trickle_start = *state.trickle_start_ms.get_or_insert(now_ms);
        let trickle_elapsed = now_ms.saturating_sub(trickle_start);
        return if trickle_elapsed >= cfg.trickle_timeout_ms {
            *force_full = true;
            1000
        } else {
            TRICKLE_FORCE_PER_MILLE.min(c_prev.max(soc))
        };
    }

    if soc < c_prev {
        let floor = (c_prev as i32
            - MIN_SLEW_PER_MILLE.max(slew_budget(cfg, delta_f_ms)))
        .max(0) as u16;
        soc.max(floor)
    } else if soc > c_prev {
        let ceiling = if delta_t_ms < cfg.t_per_percent_ms {
            c_prev as i32 + 5
        } else {
            c_prev as i32 + slew_budget(cfg, delta_f_ms)
        };
        soc.min(ceiling.max(0) as u16)
    } else {
        c_prev
    }
}

fn discharging_value(soc: u16, c_prev: u16, delta_f_ms: u64) -> u16 {
    if soc > c_prev {
        return c_prev;
    }
    if c_prev > DISCHARGE_HIGH_WATERMARK_PER_MILLE && delta_f_ms > 0 {
        let steps = (delta_f_ms / 60_000).max(1) as i32;
        let floor = (c_prev as i32 - DISCHARGE_STEP_PER_MILLE * steps).max(0) as u16;
        return soc.max(floor);
    }
    soc.max(c_prev.saturating_sub(MIN_SLEW_PER_MILLE as u16))
}

fn full_value(cfg: &CapFilterConfig, inputs: &CapFilterInputs, c_prev: u16, delta_f_ms: u64) -> u16 {
    let _ = delta_f_ms;
    if inputs.external_power {
        if inputs.fg_soc_per_mille != 1000 {
            // Caller is expected to write 1000 back to the fuel gauge
            // (spec §4.6); the filter's own reported value still tracks it.
            1000
        } else {
            (c_prev as i32 + 1).min(1000) as u16
        }
    } else {
        let _ = cfg;
        1000
    }
}

/// `10 * Δf / T_per_percent`, the slew budget in ‰ for the elapsed interval.
fn slew_budget(cfg: &CapFilterConfig, delta_f_ms: u64) -> i32 {
    if cfg.t_per_percent_ms == 0 {
        return 0;
    }
    ((10 * delta_f_ms) / cfg.t_per_percent_ms) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CapFilterConfig {
        CapFilterConfig {
            t_per_percent_ms: 30_000,
            trickle_timeout_ms: 180_000,
            v_lt_shutdown_uv: 3_300_000,
        }
    }

    fn inputs(soc: i32, charging: bool) -> CapFilterInputs {
        CapFilterInputs {
            fg_soc_per_mille: soc,
            is_charging: charging,
            is_full: false,
            external_power: charging,
            temp_dc: 250,
            voltage_now_uv: 3_800_000,
        }
    }

    #[test]
    fn charging_increase_is_slew_limited_below_t_per_percent() {
        let mut state = CapFilterState {
            reported_per_mille: 500,
            ..Default::default()
        };
        let out = tick(&mut state, &cfg(), &inputs(600, true), 1_000);
        assert_eq!(out.reported_per_mille, 505);
    }

    #[test]
    fn charging_trickle_clamps_to_994_then_forces_1000() {
        let mut state = CapFilterState {
            reported_per_mille: 990,
            trickle_start_ms: Some(0),
            ..Default::default()
        };
        let out = tick(&mut state, &cfg(), &inputs(1000, true), 100_000);
        assert_eq!(out.reported_per_mille, 994);
        assert!(!out.force_set_full);

        let out2 = tick(&mut state, &cfg(), &inputs(1000, true), 180_001);
        assert_eq!(out2.reported_per_mille, 1000);
        assert!(out2.force_set_full);
    }

    #[test]
    fn discharging_never_increases() {
        let mut state = CapFilterState {
            reported_per_mille: 500,
            ..Default::default()
        };
        let out = tick(&mut state, &cfg(), &inputs(600, false), 1_000);
        assert_eq!(out.reported_per_mille, 500);
    }

    #[test]
    fn low_temp_and_low_voltage_forces_zero_after_two_ticks() {
        let mut state = CapFilterState {
            reported_per_mille: 400,
            ..Default::default()
        };
        let low = CapFilterInputs {
            fg_soc_per_mille: 400,
            is_charging: false,
            is_full: false,
            external_power: false,
            temp_dc: 50,
            voltage_now_uv: 3_200_000,
        };
        let out1 = tick(&mut state, &cfg(), &low, 1_000);
        assert_ne!(out1.reported_per_mille, 0);
        let out2 = tick(&mut state, &cfg(), &low, 2_000);
        assert_eq!(out2.reported_per_mille, 0);
    }

    #[test]
    fn change_reported_only_at_one_percent_resolution() {
        let mut state = CapFilterState {
            reported_per_mille: 500,
            ..Default::default()
        };
        let out = tick(&mut state, &cfg(), &inputs(503, true), 1_000);
        assert!(!out.changed);
    }
}
