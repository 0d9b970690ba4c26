//! Monitor/Scheduler (spec §4.1): the ten-step tick procedure, and the
//! async scheduling shell around it.
//!
//! The tick itself is a plain synchronous function — spec §5: "no
//! operation inside a tick suspends" — mirroring the teacher's split
//! between a pure decision core (`signal-processing/src/battery.rs`) and
//! the async task that drives it (`board/drivers/battery_monitor`). Only
//! the scheduling loop at the bottom of this file is `async`.

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use heapless::Vec as HVec;

use crate::{
    capacity_filter::{self, CapFilterConfig, CapFilterInputs},
    capacity_tracker::{self, PersistentStore, TrackerInputs},
    clock::{ClockService, WakeAlarm},
    control::ChargerControl,
    description::ChargerDescription,
    events::{EventKind, Notify},
    fast_charge,
    full_battery::{self, FullBatteryDecision, FullBatteryInputs},
    guards, jeita,
    psb::{Health, PowerSupplyBus},
    sensors::{usb_type_to_charger_type, Sensors},
    state::{JeitaZone, RuntimeState},
    task_control::TaskControlToken,
    uvlo,
};

const MAX_EVENTS_PER_TICK: usize = 4;

pub type TickEvents = HVec<EventKind, MAX_EVENTS_PER_TICK>;

pub struct TickOutcome {
    pub events: TickEvents,
    pub shutdown_requested: bool,
    pub schedule_uvlo_followup_ms: Option<u64>,
}

impl TickOutcome {
    fn empty() -> Self {
        Self {
            events: HVec::new(),
            shutdown_requested: false,
            schedule_uvlo_followup_ms: None,
        }
    }

    fn push(&mut self, kind: EventKind) {
        let _ = self.events.push(kind);
    }
}

/// Runs one full tick (spec §4.1 steps 1–10). `any_externally_controlled`
/// stands in for the sysfs-like `externally_control` surface (spec §6):
/// when every charger has been handed off to user-space control, the
/// monitor does not touch hardware this tick.
pub fn tick(
    desc: &ChargerDescription,
    state: &mut RuntimeState,
    bus: &mut dyn PowerSupplyBus,
    store: &mut dyn PersistentStore,
    ocv_table: &[(i32, u16)],
    now_ms: u64,
    any_externally_controlled: bool,
) -> TickOutcome {
    let mut out = TickOutcome::empty();

    ChargerControl::new(bus, desc).feed_watchdogs(); // step 1

    if any_externally_controlled {
        return out; // step 2
    }

    let (
        temperature_dc,
        external_power,
        usb_type,
        voltage_now_uv,
        voltage_ocv_uv,
        voltage_boot_uv,
        current_now_ua,
        soc_per_mille,
        charge_full_uah,
        energy_now_uwh,
        health,
    ) = {
        let mut sensors = Sensors::new(bus, desc);
        let temperature_dc = sensors.temperature_dc().unwrap_or(state.temperature_dc);
        let external_power = sensors.any_charger_online().unwrap_or(false);
        let usb_type = sensors.usb_type().unwrap_or(crate::psb::UsbType::Unknown);
        let voltage_now_uv = sensors.voltage_now_uv().unwrap_or(0);
        let voltage_ocv_uv = sensors.voltage_ocv_uv().unwrap_or(voltage_now_uv);
        let voltage_boot_uv = sensors.voltage_boot_uv().unwrap_or(voltage_now_uv);
        let current_now_ua = sensors.current_now_ua().unwrap_or(0);
        let soc_per_mille = sensors
            .soc_per_mille()
            .unwrap_or(state.cap_filter.reported_per_mille);
        let charge_full_uah = sensors.charge_full_uah().unwrap_or(0);
        let energy_now_uwh = sensors.energy_now_uwh().unwrap_or(0) as u64;
        let health = sensors.charger_health(0).unwrap_or(Health::Good);
        (
            temperature_dc,
            external_power,
            usb_type,
            voltage_now_uv,
            voltage_ocv_uv,
            voltage_boot_uv,
            current_now_ua,
            soc_per_mille,
            charge_full_uah,
            energy_now_uwh,
            health,
        )
    };

    state.temperature_dc = temperature_dc;

    // Step 3: temp_alert with latched-emergency hysteresis. This is the
    // direct temp_min/temp_max emergency latch and is independent of the
    // JEITA zone sink mechanism in step 4 below: either one can disable
    // charging and latch `emergency_stop` for the tick.
    let alert = temp_alert(desc, state, temperature_dc);
    apply_temp_alert(state, alert);
    let mut emergency_latched = false;
    match alert {
        TempAlert::Overheat => {
            latch_emergency(bus, desc, state, &mut out, now_ms, EventKind::BattOverheat);
            emergency_latched = true;
        }
        TempAlert::Cold => {
            latch_emergency(bus, desc, state, &mut out, now_ms, EventKind::BattCold);
            emergency_latched = true;
        }
        TempAlert::None => {}
    }

    state.charger_type = usb_type_to_charger_type(usb_type);

    // Step 4: JEITA.
    if !emergency_latched {
        let table = desc.jeita.for_type(state.charger_type);
        let zone_decision = jeita::decide_zone(&mut state.jeita, temperature_dc, table);
        if zone_decision.zone.is_sink() {
            let overheat = matches!(zone_decision.zone, JeitaZone::AboveT3);
            latch_emergency(
                bus,
                desc,
                state,
                &mut out,
                now_ms,
                if overheat { EventKind::BattOverheat } else { EventKind::BattCold },
            );
            emergency_latched = true;
        } else if zone_decision.changed || state.charger_enabled {
            if let jeita::JeitaAction::Apply { current_ua, term_voltage_uv } =
                jeita::action_for_zone(zone_decision.zone, table, state.thermal_adjust_current_ua)
            {
                jeita::apply_to_all_chargers(
                    &mut ChargerControl::new(bus, desc),
                    desc.chargers.len(),
                    current_ua,
                    term_voltage_uv,
                );
            }
        }
    }

    // The temp_alert/JEITA latch is the only thing that sets `emergency_stop`;
    // once neither condition holds this tick, lift it so steps 6-8 below (all
    // gated on `emergency_stop.is_none()`) can re-enable charging.
    if !emergency_latched {
        state.emergency_stop = None;
    }

    // Step 5: guards, voltage -> health -> duration, only if temp_alert/JEITA
    // didn't already stop charging this tick.
    let mut guard_disabled = false;
    if !emergency_latched {
        let voltage_guard_cfg = if state.fast_charge.is_enabled {
            desc.voltage_guard_fast
        } else {
            desc.voltage_guard
        };
        let was_voltage_abnormal = state.charging_status.contains(crate::state::ChargingStatusFlag::VoltageAbnormal);
        let voltage_abnormal = guards::voltage_guard(&voltage_guard_cfg, was_voltage_abnormal, voltage_now_uv);
        let health_abnormal = guards::health_guard(health);
        // A battery already close to full by OCV shouldn't be kicked by the
        // charging-duration watchdog (spec §4.5's "not near-full by OCV").
        let near_full_ocv = voltage_ocv_uv
            >= desc
                .full_battery
                .v_full_uv
                .saturating_sub(desc.full_battery.recheck_drop_uv);
        let duration_abnormal = guards::duration_guard(
            &desc.durations,
            state.charger_enabled,
            state.charging_start_ms,
            state.charging_end_ms,
            now_ms,
            near_full_ocv,
        );
        guards::apply(&mut state.charging_status, duration_abnormal, voltage_abnormal, health_abnormal);

        if voltage_abnormal || health_abnormal || duration_abnormal {
            guard_disabled = true;
            if state.charger_enabled {
                let _ = ChargerControl::new(bus, desc).set_enabled_all(false);
                state.charger_enabled = false;
                state.charging_end_ms = now_ms;
            }
        }
    }

    // Steps 6–8.
    if emergency_latched || guard_disabled {
        if state.charger_enabled {
            let _ = ChargerControl::new(bus, desc).set_enabled_all(false);
            state.charger_enabled = false;
            state.charging_end_ms = now_ms;
        }
    } else if state.force_set_full && external_power && !state.charger_enabled {
        // Step 6: full-battery recheck (OCV drop based recharge). Only
        // meaningful once the battery has actually been reported full —
        // otherwise there is nothing to "recheck" and step 7/8 below decide.
        let fb_inputs = FullBatteryInputs {
            voltage_now_uv: voltage_ocv_uv,
            current_now_ua,
            soc_per_mille,
            charge_full_uah,
        };
        match full_battery::evaluate(
            &desc.full_battery,
            &fb_inputs,
            true,
            &mut state.full_battery,
            &mut state.fullbatt_vchk_deadline_ms,
            now_ms,
        ) {
            FullBatteryDecision::Recharge => {
                // try_charger_enable double-check (SPEC_FULL §10.4): re-test
                // full status right before flipping the charger on.
                let still_full = matches!(
                    full_battery::evaluate(
                        &desc.full_battery,
                        &fb_inputs,
                        true,
                        &mut state.full_battery,
                        &mut state.fullbatt_vchk_deadline_ms,
                        now_ms,
                    ),
                    FullBatteryDecision::StillFull
                );
                if !still_full {
                    state.force_set_full = false;
                    enable_charging(&mut ChargerControl::new(bus, desc), state, now_ms, &mut out);
                }
            }
            _ => {}
        }
    } else if external_power && state.emergency_stop.is_none() {
        // Step 7: full-battery detector; step 8: enable when nothing is
        // abnormal and the battery isn't (yet) full.
        let fb_inputs = FullBatteryInputs {
            voltage_now_uv,
            current_now_ua,
            soc_per_mille,
            charge_full_uah,
        };
        let decision = full_battery::evaluate(
            &desc.full_battery,
            &fb_inputs,
            false,
            &mut state.full_battery,
            &mut state.fullbatt_vchk_deadline_ms,
            now_ms,
        );
        match decision {
            FullBatteryDecision::BecameFull => {
                let mut control = ChargerControl::new(bus, desc);
                let _ = control.set_enabled_all(false);
                state.charger_enabled = false;
                state.charging_end_ms = now_ms;
                state.force_set_full = true;
                let _ = control.calibrate_fuel_gauge(1000);
                out.push(EventKind::BattFull);
            }
            FullBatteryDecision::CalibrateOnlyDisablePrimary => {
                // SOC hasn't caught up to 100% yet: calibrate and force
                // re-entry by disabling only the primary charger, without
                // declaring full (spec §4.4's third voltage+current branch).
                let mut control = ChargerControl::new(bus, desc);
                let _ = control.calibrate_fuel_gauge(1000);
                let _ = control.set_enabled(0, false);
                state.charger_enabled = false;
                state.charging_end_ms = now_ms;
                state.force_set_full = true;
            }
            FullBatteryDecision::SoftFull => {
                state.force_set_full = true;
            }
            FullBatteryDecision::NotFull if !state.charger_enabled => {
                enable_charging(&mut ChargerControl::new(bus, desc), state, now_ms, &mut out);
            }
            _ => {}
        }
    }

    // Fast-charge handshake runs alongside guard/JEITA policy whenever the
    // charger is actually enabled and external power is present.
    if state.charger_enabled && external_power {
        if let Ok(outcome) = fast_charge::tick(
            &mut state.fast_charge,
            &mut ChargerControl::new(bus, desc),
            desc,
            &desc.fast_charge,
            voltage_now_uv,
            desc.secondary().is_some(),
            state.charger_type,
        ) {
            if matches!(outcome.phase, fast_charge::FastChargePhase::Enabled) {
                out.push(EventKind::FastCharge);
            }
        }
    }

    // Step 9: capacity filter.
    let cf_cfg = CapFilterConfig {
        t_per_percent_ms: desc.shutdown.min_time_per_percent_ms,
        trickle_timeout_ms: desc.shutdown.trickle_timeout_ms,
        v_lt_shutdown_uv: desc.shutdown.v_shutdown_uv,
    };
    let cf_inputs = CapFilterInputs {
        fg_soc_per_mille: soc_per_mille as i32,
        is_charging: state.charger_enabled,
        is_full: state.force_set_full,
        external_power,
        temp_dc: temperature_dc,
        voltage_now_uv,
    };
    let cf_outcome = capacity_filter::tick(&mut state.cap_filter, &cf_cfg, &cf_inputs, now_ms);
    if cf_outcome.force_set_full {
        state.force_set_full = true;
    }

    // Capacity tracker piggybacks on the same tick.
    let tracker_inputs = TrackerInputs {
        boot_mode: desc.boot_mode,
        voltage_boot_uv,
        voltage_ocv_uv,
        current_now_ua,
        energy_now_uwh,
        now_ms,
    };
    capacity_tracker::tick(&mut state.tracker, store, desc.tracker_keys, &tracker_inputs, ocv_table);

    // Step 10: UVLO.
    let uvlo_outcome = uvlo::tick(
        &mut state.uvlo_trigger_cnt,
        &mut state.uvlo_shutdown_requested,
        voltage_now_uv,
        desc.shutdown.v_shutdown_uv,
        desc.shutdown.v_calibrate_uv,
    );
    if uvlo_outcome.request_shutdown {
        let _ = ChargerControl::new(bus, desc).report_capacity_zero();
        out.shutdown_requested = true;
    }
    out.schedule_uvlo_followup_ms = uvlo_outcome.schedule_followup_ms;

    state.check_invariants();
    out
}

fn enable_charging(
    control: &mut ChargerControl<'_>,
    state: &mut RuntimeState,
    now_ms: u64,
    out: &mut TickOutcome,
) {
    state.emergency_stop = None;
    state.charging_status = enumset::EnumSet::empty();
    if let Ok(()) = control.set_enabled_all(true) {
        if !state.charger_enabled {
            state.charging_start_ms = now_ms;
        }
        state.charger_enabled = true;
        out.push(EventKind::ChgStartStop);
    }
}

fn latch_emergency(
    bus: &mut dyn PowerSupplyBus,
    desc: &ChargerDescription,
    state: &mut RuntimeState,
    out: &mut TickOutcome,
    now_ms: u64,
    kind: EventKind,
) {
    if state.emergency_stop != Some(kind) {
        out.push(kind);
    }
    if state.charger_enabled {
        let _ = ChargerControl::new(bus, desc).set_enabled_all(false);
        state.charging_end_ms = now_ms;
    }
    state.emergency_stop = Some(kind);
    state.charger_enabled = false;
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum TempAlert {
    None,
    Overheat,
    Cold,
}

/// Spec §4.1 step 3: use the hysteresis band (`temp_min + Δ` / `temp_max −
/// Δ`) once an emergency is already latched, otherwise the raw
/// `temp_min`/`temp_max` thresholds — so a cold/overheat latch requires
/// crossing back *inside* the safe range by a margin before it clears.
pub fn temp_alert(desc: &ChargerDescription, state: &RuntimeState, temp_dc: i32) -> TempAlert {
    let latched_hot = state.emergency_stop == Some(EventKind::BattOverheat);
    let latched_cold = state.emergency_stop == Some(EventKind::BattCold);

    // Once latched, recovery must cross back past the hysteresis margin
    // (strict), so sitting exactly at the recovery point already clears the
    // alert instead of re-arming it every tick.
    let overheat = if latched_hot {
        temp_dc > desc.temp_max_dc - desc.temp_hysteresis_dc
    } else {
        temp_dc >= desc.temp_max_dc
    };
    let cold = if latched_cold {
        temp_dc < desc.temp_min_dc + desc.temp_hysteresis_dc
    } else {
        temp_dc <= desc.temp_min_dc
    };

    if overheat {
        TempAlert::Overheat
    } else if cold {
        TempAlert::Cold
    } else {
        TempAlert::None
    }
}

fn apply_temp_alert(state: &mut RuntimeState, alert: TempAlert) {
    use crate::state::ChargingStatusFlag;
    state.charging_status.remove(ChargingStatusFlag::TempOverheat);
    state.charging_status.remove(ChargingStatusFlag::TempCold);
    match alert {
        TempAlert::Overheat => {
            state.charging_status.insert(ChargingStatusFlag::TempOverheat);
        }
        TempAlert::Cold => {
            state.charging_status.insert(ChargingStatusFlag::TempCold);
        }
        TempAlert::None => {}
    }
}

/// SPEC_FULL §10.2: `cm_setup_timer` — the next poll delay is the minimum
/// of the configured polling interval and any armed delayed work, clamped
/// to a 2 s floor both awake and suspended.
pub fn next_wake_ms(polling_interval_ms: u64, pending_deadlines_ms: &[u64], now_ms: u64) -> u64 {
    const FLOOR_MS: u64 = 2_000;
    let mut wait = polling_interval_ms;
    for &deadline in pending_deadlines_ms {
        let remaining = deadline.saturating_sub(now_ms);
        if remaining < wait {
            wait = remaining;
        }
    }
    wait.max(FLOOR_MS)
}

/// Owns the per-battery runtime state and the event-notify facade behind
/// their own mutexes (spec §5, §9), so a `registry::Registry` can hold many
/// of these behind `Arc` and fan `for_each` out to them without the caller
/// needing `&mut` access. Generalized from the teacher's `BatteryMonitor`
/// (`board/drivers/battery_monitor.rs`): a shared-state struct plus a
/// `TaskController` guarding the one task allowed to drive it.
pub struct Monitor {
    desc: ChargerDescription,
    state: Mutex<CriticalSectionRawMutex, RuntimeState>,
    notify: Mutex<CriticalSectionRawMutex, Notify>,
}

impl Monitor {
    pub fn new(desc: ChargerDescription, state: RuntimeState) -> Self {
        Self {
            desc,
            state: Mutex::new(state),
            notify: Mutex::new(Notify::new()),
        }
    }

    pub fn description(&self) -> &ChargerDescription {
        &self.desc
    }

    /// Runs `kind` through the notify facade (spec §4.9) and returns the
    /// event to actually deliver this call, if any.
    pub async fn on_event(&self, kind: EventKind) -> Option<EventKind> {
        self.notify.lock().await.emit(kind)
    }

    pub async fn suspend_prepare(&self) {
        self.notify.lock().await.suspend_prepare();
    }

    /// Spec §5: "the resume path always runs one full tick before emitting
    /// buffered messages" — callers run a `tick_once` first, then call this.
    pub async fn resume(&self) -> Option<EventKind> {
        self.notify.lock().await.resume()
    }

    /// Runs one tick against live collaborators, holding the state lock for
    /// its (non-suspending) duration only.
    pub async fn tick_once(
        &self,
        bus: &mut dyn PowerSupplyBus,
        store: &mut dyn PersistentStore,
        ocv_table: &[(i32, u16)],
        now_ms: u64,
        any_externally_controlled: bool,
    ) -> TickOutcome {
        let mut state = self.state.lock().await;
        tick(&self.desc, &mut state, bus, store, ocv_table, now_ms, any_externally_controlled)
    }

    /// The scheduling loop (spec §4.1, §5): ticks on the configured polling
    /// interval, re-arms `alarm` with `next_wake_ms` between ticks, and
    /// routes every emitted event through the notify facade. Runs until the
    /// token is cancelled from `TaskController::stop`.
    pub async fn run<B, S, C, W>(
        &self,
        token: &mut TaskControlToken<(), ()>,
        mut bus: B,
        mut store: S,
        clock: C,
        mut alarm: W,
        ocv_table: &[(i32, u16)],
    ) where
        B: PowerSupplyBus,
        S: PersistentStore,
        C: ClockService,
        W: WakeAlarm,
    {
        token
            .run_cancellable(|_| async {
                loop {
                    let now_ms = clock.now_ms();
                    let outcome = self.tick_once(&mut bus, &mut store, ocv_table, now_ms, false).await;

                    for &event in outcome.events.iter() {
                        if let Some(delivered) = self.on_event(event).await {
                            logger::info!("charger-manager event: {:?}", delivered);
                        }
                    }
                    if outcome.shutdown_requested {
                        logger::warn!("charger-manager: UVLO requested an orderly shutdown");
                    }

                    let mut deadlines: HVec<u64, 1> = HVec::new();
                    if let Some(followup_ms) = outcome.schedule_uvlo_followup_ms {
                        let _ = deadlines.push(now_ms.saturating_add(followup_ms));
                    }
                    let wait_ms = next_wake_ms(self.desc.polling.interval_ms, &deadlines, now_ms);

                    alarm.arm(now_ms.saturating_add(wait_ms));
                    embassy_time::Timer::after(embassy_time::Duration::from_millis(wait_ms)).await;
                    alarm.cancel();
                }
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        description::{BootMode, ChargerDescriptionBuilder, HandleName},
        psb::{ChargeStatus, Property, UsbType, Value},
        testing::{MockBus, MockPersistentStore},
    };

    fn name(s: &str) -> HandleName {
        HandleName::try_from(s).unwrap()
    }

    fn desc() -> ChargerDescription {
        ChargerDescriptionBuilder::new(name("fg"), name("chg0"))
            .boot_mode(BootMode::Normal)
            .build()
            .unwrap()
    }

    fn wire_online(bus: &mut MockBus, desc: &ChargerDescription, voltage_uv: i32) {
        bus.set_value(desc.primary(), Property::Online, Value::Bool(true));
        bus.set_value(desc.primary(), Property::Status, Value::Status(ChargeStatus::Charging));
        bus.set_value(desc.primary(), Property::Health, Value::Health(Health::Good));
        bus.set_value(desc.primary(), Property::UsbType, Value::UsbType(UsbType::Dcp));
        bus.set_value(desc.fuel_gauge.as_str(), Property::VoltageNow, Value::I32(voltage_uv));
        bus.set_value(desc.fuel_gauge.as_str(), Property::VoltageOcv, Value::I32(voltage_uv));
        bus.set_value(desc.fuel_gauge.as_str(), Property::VoltageBoot, Value::I32(voltage_uv));
        bus.set_value(desc.fuel_gauge.as_str(), Property::CurrentNow, Value::I32(100_000));
        bus.set_value(desc.fuel_gauge.as_str(), Property::Capacity, Value::I32(500));
        bus.set_value(desc.fuel_gauge.as_str(), Property::ChargeFull, Value::I32(0));
        bus.set_value(desc.fuel_gauge.as_str(), Property::Temp, Value::I32(250));
    }

    #[test]
    fn enables_charging_when_power_present_and_nothing_abnormal() {
        let d = desc();
        let mut state = RuntimeState::new(crate::description::ChargerType::Unknown, false, 3000);
        let mut bus = MockBus::new();
        wire_online(&mut bus, &d, 3_800_000);
        let mut store = MockPersistentStore::default();

        let out = tick(&d, &mut state, &mut bus, &mut store, &[], 0, false);
        assert!(state.charger_enabled);
        assert!(out.events.iter().any(|e| *e == EventKind::ChgStartStop));
    }

    /// spec §8 scenario 1: cold latch & recover. `temp_min=0, temp_max=500,
    /// Δ=50`; the overheat latch fires immediately once `t >= temp_max` and
    /// holds (hysteresis keeps it latched down to `temp_max - Δ`), clearing
    /// and re-enabling only once `t` drops to exactly 450 on the 7th sample.
    #[test]
    fn cold_latch_scenario_disables_then_recovers() {
        let d = desc();
        let mut state = RuntimeState::new(crate::description::ChargerType::Unknown, false, 3000);
        let mut bus = MockBus::new();
        wire_online(&mut bus, &d, 3_800_000);
        let mut store = MockPersistentStore::default();

        let temps_dc = [520, 520, 520, 480, 470, 460, 450];
        let mut overheat_event_at = None;
        let mut reenabled_at = None;
        for (i, &t) in temps_dc.iter().enumerate() {
            bus.set_value(d.fuel_gauge.as_str(), Property::Temp, Value::I32(t));
            let out = tick(&d, &mut state, &mut bus, &mut store, &[], i as u64 * 1000, false);
            assert!(!state.charger_enabled || i == temps_dc.len() - 1);
            if out.events.iter().any(|e| *e == EventKind::BattOverheat) {
                overheat_event_at.get_or_insert(i);
            }
            if state.charger_enabled {
                reenabled_at = Some(i);
            }
        }
        assert_eq!(overheat_event_at, Some(0));
        assert_eq!(reenabled_at, Some(temps_dc.len() - 1));
    }

    /// spec §8 scenario 3: hard-full detection requires two consecutive
    /// qualifying samples (`[(4360,140),(4360,130)]`) before it writes
    /// `CALIBRATE=1000`, disables the charger, and emits `BattFull`.
    #[test]
    fn hard_full_scenario_calibrates_and_disables() {
        let d = desc();
        let mut state = RuntimeState::new(crate::description::ChargerType::Unknown, false, 3000);
        let mut bus = MockBus::new();
        wire_online(&mut bus, &d, 3_800_000);
        let mut store = MockPersistentStore::default();

        // First tick just brings the charger on.
        tick(&d, &mut state, &mut bus, &mut store, &[], 0, false);
        assert!(state.charger_enabled);

        bus.set_value(d.fuel_gauge.as_str(), Property::VoltageNow, Value::I32(4_360_000));
        bus.set_value(d.fuel_gauge.as_str(), Property::CurrentNow, Value::I32(140_000));
        bus.set_value(d.fuel_gauge.as_str(), Property::Capacity, Value::I32(1000));

        // First qualifying sample only arms the two-tick counter.
        let first = tick(&d, &mut state, &mut bus, &mut store, &[], 1000, false);
        assert!(state.charger_enabled);
        assert!(!first.events.iter().any(|e| *e == EventKind::BattFull));

        // Second qualifying sample commits.
        bus.set_value(d.fuel_gauge.as_str(), Property::CurrentNow, Value::I32(130_000));
        let out = tick(&d, &mut state, &mut bus, &mut store, &[], 2000, false);

        assert!(!state.charger_enabled);
        assert!(state.force_set_full);
        assert!(out.events.iter().any(|e| *e == EventKind::BattFull));
        assert_eq!(
            bus.get_value(d.fuel_gauge.as_str(), Property::Calibrate),
            Some(Value::I32(1000))
        );
    }

    /// spec §8 scenario 5: UVLO writes `Capacity=0` to the fuel gauge and
    /// requests shutdown exactly once after 5 consecutive low-voltage ticks.
    #[test]
    fn uvlo_scenario_writes_zero_capacity_and_requests_shutdown_once() {
        let d = desc();
        let mut state = RuntimeState::new(crate::description::ChargerType::Unknown, false, 3000);
        let mut bus = MockBus::new();
        wire_online(&mut bus, &d, 3_100_000);
        bus.set_value(d.fuel_gauge.as_str(), Property::VoltageOcv, Value::I32(3_100_000));
        let mut store = MockPersistentStore::default();

        let mut shutdowns = 0;
        for i in 0..6 {
            let out = tick(&d, &mut state, &mut bus, &mut store, &[], i * 1000, false);
            if out.shutdown_requested {
                shutdowns += 1;
            }
        }
        assert_eq!(shutdowns, 1);
        assert_eq!(
            bus.get_value(d.fuel_gauge.as_str(), Property::Capacity),
            Some(Value::I32(0))
        );
    }
}
