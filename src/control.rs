//! Charger Control (CC): enable/disable, voltage-mode select, CC/CV
//! targets, watchdog feed (spec §2, §4.1 step 1).

use crate::{
    description::ChargerDescription,
    error::CmResult,
    psb::{ChargerCommand, Property, PowerSupplyBus, Value},
};

pub struct ChargerControl<'a> {
    bus: &'a mut dyn PowerSupplyBus,
    desc: &'a ChargerDescription,
}

impl<'a> ChargerControl<'a> {
    pub fn new(bus: &'a mut dyn PowerSupplyBus, desc: &'a ChargerDescription) -> Self {
        Self { bus, desc }
    }

    fn handle(&self, index: usize) -> CmResult<heapless::String<32>> {
        self.desc
            .chargers
            .get(index)
            .map(|h| h.clone())
            .ok_or(crate::error::CmError::NotFound)
    }

    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> CmResult<()> {
        let handle = self.handle(index)?;
        self.bus
            .set(&handle, Property::ChargeEnabled, Value::Bool(enabled))
    }

    pub fn set_enabled_all(&mut self, enabled: bool) -> CmResult<()> {
        for i in 0..self.desc.chargers.len() {
            self.set_enabled(i, enabled)?;
        }
        Ok(())
    }

    pub fn set_cc_ua(&mut self, index: usize, current_ua: i32) -> CmResult<()> {
        let handle = self.handle(index)?;
        self.bus.set(
            &handle,
            Property::ConstantChargeCurrent,
            Value::I32(current_ua),
        )
    }

    pub fn set_cv_uv(&mut self, index: usize, voltage_uv: i32) -> CmResult<()> {
        let handle = self.handle(index)?;
        self.bus
            .set(&handle, Property::ConstantChargeVoltage, Value::I32(voltage_uv))
    }

    pub fn set_input_current_limit_ua(&mut self, index: usize, limit_ua: i32) -> CmResult<()> {
        let handle = self.handle(index)?;
        self.bus
            .set(&handle, Property::InputCurrentLimit, Value::I32(limit_ua))
    }

    pub fn send_command(&mut self, index: usize, command: ChargerCommand) -> CmResult<()> {
        let handle = self.handle(index)?;
        self.bus.set(&handle, Property::Status, Value::Command(command))
    }

    /// Request the fast charger switch the input link to 9 V (`true`) or
    /// back to 5 V (`false`).
    pub fn set_fast_voltage(&mut self, nine_volts: bool) -> CmResult<()> {
        let handle = self
            .desc
            .fast_charger
            .clone()
            .ok_or(crate::error::CmError::NotFound)?;
        self.bus.set(
            &handle,
            Property::VoltageMax,
            Value::I32(if nine_volts { 9_000_000 } else { 5_000_000 }),
        )
    }

    pub fn calibrate_fuel_gauge(&mut self, per_mille: u16) -> CmResult<()> {
        let fg = self.desc.fuel_gauge.clone();
        self.bus
            .set(&fg, Property::Calibrate, Value::I32(per_mille as i32))
    }

    /// Spec §4.8: UVLO writes a reported-capacity-zero hint to the fuel
    /// gauge right before the orderly platform shutdown request.
    pub fn report_capacity_zero(&mut self) -> CmResult<()> {
        let fg = self.desc.fuel_gauge.clone();
        self.bus.set(&fg, Property::Capacity, Value::I32(0))
    }

    /// Spec §4.1 step 1 / SPEC_FULL §10.7: only feed a charger's watchdog
    /// when it is configured with a nonzero interval for that charger. In
    /// this model watchdog support is implied by `watchdog_interval_ms`
    /// being nonzero across the whole description; chargers that don't
    /// implement `FEED_WATCHDOG` fail with `Unsupported` and are skipped
    /// rather than treated as a tick-aborting error.
    pub fn feed_watchdogs(&mut self) {
        if self.desc.shutdown.watchdog_interval_ms == 0 {
            return;
        }
        for i in 0..self.desc.chargers.len() {
            if let Ok(handle) = self.handle(i) {
                match self.bus.set(&handle, Property::FeedWatchdog, Value::Bool(true)) {
                    Ok(()) | Err(crate::error::CmError::Unsupported) => {}
                    Err(e) => logger::warn!("feed_watchdog({}) failed: {:?}", i, e),
                }
            }
        }
    }
}
