//! Fast-Charge FSM (spec §4.3): debounced 9 V ↔ 5 V handshake with
//! transactional rollback (spec §9 design note) on any step failure.

use crate::{
    control::ChargerControl,
    description::{ChargerDescription, ChargerType, FastChargeThresholds, VoltageGuard},
    error::CmResult,
    psb::ChargerCommand,
    state::FastChargeState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FastChargePhase {
    Unsupported,
    Idle,
    Enabled,
}

/// The effective voltage guard and JEITA table selection to use, swapped in
/// lock-step with the FSM's enabled/disabled transitions (spec §4.3, §8
/// round-trip property: "E→D→E leaves V-guard thresholds back at fast
/// values; D→E→D leaves them at normal").
pub struct FastChargeOutcome {
    pub phase: FastChargePhase,
    pub active_voltage_guard: VoltageGuard,
    pub jeita_table_key: ChargerType,
}

/// Runs one tick of the fast-charge handshake. `has_secondary` controls
/// whether step 2/4 of the enable sequence apply.
///
/// On any failed step, every already-applied mutation in this call is
/// unwound before returning, mirroring a software transaction: each forward
/// command is paired with its inverse, and the inverses run in reverse
/// order, so a single point of failure never leaves the charger half
/// switched.
#[allow(clippy::too_many_arguments)]
pub fn tick(
    state: &mut FastChargeState,
    control: &mut ChargerControl<'_>,
    desc: &ChargerDescription,
    thresholds: &FastChargeThresholds,
    battery_voltage_uv: i32,
    has_secondary: bool,
    charger_type: ChargerType,
) -> CmResult<FastChargeOutcome> {
    if !state.is_supported {
        return Ok(FastChargeOutcome {
            phase: FastChargePhase::Unsupported,
            active_voltage_guard: desc.voltage_guard,
            jeita_table_key: charger_type,
        });
    }

    if !state.is_enabled {
        // Open question (spec §9): the source gates fast-charge enable on
        // voltage alone, having disabled a current-based gate as a bug fix.
        // We preserve that implemented behavior and never add the current
        // check back in.
        if battery_voltage_uv > thresholds.v_enable_uv {
            state.enable_count = state.enable_count.saturating_add(1);
        } else {
            state.enable_count = 0;
        }

        if state.enable_count >= thresholds.enable_ticks {
            state.enable_count = 0;
            match enable_fast_charge(control, has_secondary) {
                Ok(()) => {
                    state.is_enabled = true;
                    state.disable_count = 0;
                    return Ok(FastChargeOutcome {
                        phase: FastChargePhase::Enabled,
                        active_voltage_guard: desc.voltage_guard_fast,
                        jeita_table_key: ChargerType::FastCharge,
                    });
                }
                Err(e) => {
                    logger::warn!("fast-charge enable failed, rolled back: {:?}", e);
                    return Ok(FastChargeOutcome {
                        phase: FastChargePhase::Idle,
                        active_voltage_guard: desc.voltage_guard,
                        jeita_table_key: charger_type,
                    });
                }
            }
        }

        return Ok(FastChargeOutcome {
            phase: FastChargePhase::Idle,
            active_voltage_guard: desc.voltage_guard,
            jeita_table_key: charger_type,
        });
    }

    // Enabled: watch for the disable threshold for two ticks before
    // reverting (spec §4.3).
    if battery_voltage_uv < thresholds.v_disable_uv {
        state.disable_count = state.disable_count.saturating_add(1);
    } else {
        state.disable_count = 0;
    }

    if state.disable_count >= thresholds.disable_ticks {
        state.disable_count = 0;
        disable_fast_charge(control, has_secondary);
        state.is_enabled = false;
        return Ok(FastChargeOutcome {
            phase: FastChargePhase::Idle,
            active_voltage_guard: desc.voltage_guard,
            jeita_table_key: charger_type,
        });
    }

    Ok(FastChargeOutcome {
        phase: FastChargePhase::Enabled,
        active_voltage_guard: desc.voltage_guard_fast,
        jeita_table_key: ChargerType::FastCharge,
    })
}

/// Explicit reset path used by the event facade when a cable reinsert
/// happens while fast-charge limits were still installed from a prior
/// session (SPEC_FULL §10.5).
pub fn reset_to_normal(
    state: &mut FastChargeState,
    control: &mut ChargerControl<'_>,
    has_secondary: bool,
) {
    if state.is_enabled {
        disable_fast_charge(control, has_secondary);
    }
    *state = FastChargeState {
        is_supported: state.is_supported,
        ..FastChargeState::default()
    };
}

enum Undo {
    PrimaryCommand(ChargerCommand),
    SecondaryCommand(ChargerCommand),
    FastVoltage(bool),
    SecondaryEnabled(bool),
}

fn enable_fast_charge(control: &mut ChargerControl<'_>, has_secondary: bool) -> CmResult<()> {
    let mut undo: heapless::Vec<Undo, 4> = heapless::Vec::new();

    let result = (|| -> CmResult<()> {
        control.send_command(0, ChargerCommand::FastEnable)?;
        let _ = undo.push(Undo::PrimaryCommand(ChargerCommand::FastDisable));

        if has_secondary {
            control.send_command(1, ChargerCommand::FastEnable)?;
            let _ = undo.push(Undo::SecondaryCommand(ChargerCommand::FastDisable));
        }

        control.set_fast_voltage(true)?;
        let _ = undo.push(Undo::FastVoltage(false));

        if has_secondary {
            control.set_enabled(1, true)?;
            let _ = undo.push(Undo::SecondaryEnabled(false));
        }

        Ok(())
    })();

    if let Err(e) = result {
        unwind(control, undo);
        return Err(e);
    }

    Ok(())
}

fn disable_fast_charge(control: &mut ChargerControl<'_>, has_secondary: bool) {
    if has_secondary {
        let _ = control.set_enabled(1, false);
    }
    let _ = control.set_fast_voltage(false);
    if has_secondary {
        let _ = control.send_command(1, ChargerCommand::FastDisable);
    }
    let _ = control.send_command(0, ChargerCommand::FastDisable);
}

fn unwind(control: &mut ChargerControl<'_>, mut undo: heapless::Vec<Undo, 4>) {
    while let Some(step) = undo.pop() {
        let _ = match step {
            Undo::PrimaryCommand(cmd) => control.send_command(0, cmd),
            Undo::SecondaryCommand(cmd) => control.send_command(1, cmd),
            Undo::FastVoltage(v) => control.set_fast_voltage(v),
            Undo::SecondaryEnabled(v) => control.set_enabled(1, v),
        };
    }
}
