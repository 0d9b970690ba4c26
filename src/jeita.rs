//! JEITA Controller (spec §4.2): temperature → zone → (I_target, V_term),
//! with three-consecutive-tick hysteresis before a zone change is acted on.

use crate::{
    control::ChargerControl,
    description::JeitaRow,
    state::{JeitaState, JeitaZone},
};

const REQUIRED_CONSECUTIVE_TICKS: u8 = 3;

/// `zone(t)`: scan descending from the top; entry `i` is chosen when
/// `t >= table[i].temp_enter`, strict at `i == 0` (spec §4.2).
fn raw_zone_index(temp_dc: i32, table: &[JeitaRow]) -> usize {
    for (i, row) in table.iter().enumerate().rev() {
        if temp_dc >= row.temp_enter_dc {
            return i + 1;
        }
    }
    0
}

pub struct ZoneDecision {
    pub zone: JeitaZone,
    pub changed: bool,
}

/// Applies hysteresis and the three-consecutive-tick debounce to decide
/// whether the controller should move to a new zone this tick.
pub fn decide_zone(state: &mut JeitaState, temp_dc: i32, table: &[JeitaRow]) -> ZoneDecision {
    // An empty table carries no temperature breakpoints to classify against;
    // treat it the same as a disabled JEITA controller rather than letting
    // `raw_zone_index`'s fallback-to-0 read as a perpetual `BelowT0` sink.
    if state.disabled || table.is_empty() {
        let zone = JeitaZone::T1T2;
        let changed = state.last_zone != Some(zone);
        state.last_zone = Some(zone);
        state.up_trigger = 0;
        state.down_trigger = 0;
        return ZoneDecision { zone, changed };
    }

    let raw = raw_zone_index(temp_dc, table);

    // First reading establishes the baseline zone directly; there is no
    // prior zone to debounce against yet.
    let current = match state.last_zone {
        Some(zone) => zone,
        None => {
            let zone = JeitaZone::from_index(raw, table.len());
            state.last_zone = Some(zone);
            return ZoneDecision { zone, changed: true };
        }
    };

    let candidate_index = table_index(current, table.len());
    let target = if raw > candidate_index {
        // Moving up out of BelowT0 or T0T1 requires crossing back above the
        // recovery point of the boundary being escaped, not just the enter
        // threshold (ground truth: cm_manager_get_jeita_status's case 0 /
        // case 1 gates). Higher boundaries commit as soon as `raw` crosses.
        if crossed_up(current, temp_dc, table) {
            Some(raw)
        } else {
            None
        }
    } else if raw < candidate_index {
        // Moving down requires the temperature to have dropped to or below
        // the *current* zone's recovery point, not just out of its enter
        // band — recompute using recovery thresholds to confirm hysteresis.
        if crossed_down(current, temp_dc, table) {
            Some(raw)
        } else {
            None
        }
    } else {
        None
    };

    match target {
        None => {
            state.up_trigger = 0;
            state.down_trigger = 0;
            ZoneDecision {
                zone: current,
                changed: false,
            }
        }
        Some(target_index) if target_index > candidate_index => {
            state.down_trigger = 0;
            state.up_trigger = state.up_trigger.saturating_add(1);
            if state.up_trigger >= REQUIRED_CONSECUTIVE_TICKS {
                let zone = JeitaZone::from_index(target_index, table.len());
                state.up_trigger = 0;
                state.last_zone = Some(zone);
                ZoneDecision { zone, changed: true }
            } else {
                ZoneDecision {
                    zone: current,
                    changed: false,
                }
            }
        }
        Some(target_index) => {
            state.up_trigger = 0;
            state.down_trigger = state.down_trigger.saturating_add(1);
            if state.down_trigger >= REQUIRED_CONSECUTIVE_TICKS {
                let zone = JeitaZone::from_index(target_index, table.len());
                state.down_trigger = 0;
                state.last_zone = Some(zone);
                ZoneDecision { zone, changed: true }
            } else {
                ZoneDecision {
                    zone: current,
                    changed: false,
                }
            }
        }
    }
}

fn table_index(zone: JeitaZone, table_len: usize) -> usize {
    match zone {
        JeitaZone::BelowT0 => 0,
        JeitaZone::T0T1 => 1,
        JeitaZone::T1T2 => 2,
        JeitaZone::T2T3 => 3,
        JeitaZone::AboveT3 => table_len,
    }
}

fn crossed_down(current: JeitaZone, temp_dc: i32, table: &[JeitaRow]) -> bool {
    match current {
        JeitaZone::BelowT0 => false,
        JeitaZone::AboveT3 => table
            .last()
            .map(|row| temp_dc <= row.temp_recover_dc)
            .unwrap_or(true),
        _ => {
            let idx = table_index(current, table.len());
            table
                .get(idx.saturating_sub(1))
                .map(|row| temp_dc <= row.temp_recover_dc)
                .unwrap_or(true)
        }
    }
}

/// Ascending out of `BelowT0` or `T0T1` requires crossing back above the
/// recovery point of the boundary row being escaped, not just the enter
/// threshold (ground truth: `cm_manager_get_jeita_status`'s `case 0`/`case 1`
/// gates). The higher boundaries commit as soon as `raw` crosses them.
fn crossed_up(current: JeitaZone, temp_dc: i32, table: &[JeitaRow]) -> bool {
    match current {
        JeitaZone::BelowT0 | JeitaZone::T0T1 => {
            let idx = table_index(current, table.len());
            table
                .get(idx)
                .map(|row| temp_dc >= row.temp_recover_dc)
                .unwrap_or(true)
        }
        _ => true,
    }
}

pub enum JeitaAction {
    /// Zone is a sink: caller must latch the emergency and disable charging.
    Stop { overheat: bool },
    /// Zone has targets: caller should push these to every charger and
    /// (re)enable charging.
    Apply { current_ua: u32, term_voltage_uv: u32 },
}

pub fn action_for_zone(
    zone: JeitaZone,
    table: &[JeitaRow],
    thermal_adjust_ua: Option<i32>,
) -> JeitaAction {
    match zone {
        JeitaZone::BelowT0 => JeitaAction::Stop { overheat: false },
        JeitaZone::AboveT3 => JeitaAction::Stop { overheat: true },
        _ => {
            let idx = table_index(zone, table.len()).saturating_sub(1);
            let row = table.get(idx).or_else(|| table.last());
            let (current_ua, term_voltage_uv) = match row {
                Some(row) => (row.current_ua, row.term_voltage_uv),
                None => (0, 0),
            };
            let current_ua = match thermal_adjust_ua {
                Some(adjust) if adjust >= 0 => current_ua.min(adjust as u32),
                _ => current_ua,
            };
            JeitaAction::Apply {
                current_ua,
                term_voltage_uv,
            }
        }
    }
}

/// Pushes a non-sink zone's CC/CV targets to every charger handle (spec
/// §4.2: "push CC and CV to every charger handle").
pub fn apply_to_all_chargers(
    control: &mut ChargerControl<'_>,
    num_chargers: usize,
    current_ua: u32,
    term_voltage_uv: u32,
) {
    for i in 0..num_chargers {
        if let Err(e) = control.set_cc_ua(i, current_ua as i32) {
            logger::warn!("jeita: set_cc_ua({}) failed: {:?}", i, e);
        }
        if let Err(e) = control.set_cv_uv(i, term_voltage_uv as i32) {
            logger::warn!("jeita: set_cv_uv({}) failed: {:?}", i, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> alloc::vec::Vec<JeitaRow> {
        alloc::vec![
            JeitaRow { temp_enter_dc: 0, temp_recover_dc: 20, current_ua: 500_000, term_voltage_uv: 4_100_000 },
            JeitaRow { temp_enter_dc: 100, temp_recover_dc: 150, current_ua: 1_000_000, term_voltage_uv: 4_200_000 },
            JeitaRow { temp_enter_dc: 200, temp_recover_dc: 250, current_ua: 1_500_000, term_voltage_uv: 4_350_000 },
            JeitaRow { temp_enter_dc: 450, temp_recover_dc: 400, current_ua: 1_000_000, term_voltage_uv: 4_200_000 },
        ]
    }

    #[test]
    fn sink_zone_requires_three_ticks_then_stops() {
        let t = table();
        let mut state = JeitaState::new(false);
        decide_zone(&mut state, 50, &t); // seed T0T1
        assert!(!decide_zone(&mut state, 460, &t).changed);
        assert!(!decide_zone(&mut state, 460, &t).changed);
        let d = decide_zone(&mut state, 460, &t);
        assert!(d.changed);
        assert_eq!(d.zone, JeitaZone::AboveT3);
        assert!(matches!(
            action_for_zone(d.zone, &t, None),
            JeitaAction::Stop { overheat: true }
        ));
    }

    #[test]
    fn reversal_resets_trigger_counter() {
        let t = table();
        let mut state = JeitaState::new(false);
        // Two ticks moving up, not enough to commit...
        decide_zone(&mut state, 50, &t);
        let d1 = decide_zone(&mut state, 150, &t);
        assert!(!d1.changed);
        // ...then a reversal must reset, not carry over partial progress.
        let d2 = decide_zone(&mut state, 50, &t);
        assert!(!d2.changed);
        assert_eq!(state.up_trigger, 0);
    }

    #[test]
    fn three_consecutive_ticks_commits_zone_change() {
        let t = table();
        let mut state = JeitaState::new(false);
        decide_zone(&mut state, 50, &t); // seeds T0T1 as baseline
        assert!(!decide_zone(&mut state, 150, &t).changed);
        assert!(!decide_zone(&mut state, 150, &t).changed);
        let d = decide_zone(&mut state, 150, &t);
        assert!(d.changed);
        assert_eq!(d.zone, JeitaZone::T1T2);
    }

    #[test]
    fn ascending_out_of_below_t0_requires_recovery_not_just_enter() {
        let t = table();
        let mut state = JeitaState::new(false);
        decide_zone(&mut state, -10, &t); // seeds BelowT0
        // 10 crosses table[0].temp_enter_dc (0) but stays below its
        // temp_recover_dc (20); the zone must not move no matter how many
        // consecutive ticks see it.
        for _ in 0..5 {
            let d = decide_zone(&mut state, 10, &t);
            assert!(!d.changed);
            assert_eq!(d.zone, JeitaZone::BelowT0);
        }
        assert_eq!(state.up_trigger, 0);
    }

    #[test]
    fn disabled_jeita_forces_t1_t2() {
        let t = table();
        let mut state = JeitaState::new(true);
        let d = decide_zone(&mut state, -999, &t);
        assert_eq!(d.zone, JeitaZone::T1T2);
    }

    #[test]
    fn empty_table_is_neutral_not_a_sink() {
        let mut state = JeitaState::new(false);
        let d = decide_zone(&mut state, -999, &[]);
        assert_eq!(d.zone, JeitaZone::T1T2);
        assert!(!d.zone.is_sink());
    }
}
