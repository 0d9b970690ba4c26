//! Thin accessors over the PSB (spec §2: Sensors, 8% share). Each method is
//! a single named-property read; callers own the decision of what to do on
//! failure (spec §7: "log and skip the dependent guard only").

use crate::{
    description::{ChargerDescription, ChargerType},
    error::CmResult,
    psb::{ChargeStatus, Health, Property, PowerSupplyBus, UsbType},
};

pub struct Sensors<'a> {
    bus: &'a mut dyn PowerSupplyBus,
    desc: &'a ChargerDescription,
}

impl<'a> Sensors<'a> {
    pub fn new(bus: &'a mut dyn PowerSupplyBus, desc: &'a ChargerDescription) -> Self {
        Self { bus, desc }
    }

    fn charger(&self, index: usize) -> CmResult<&str> {
        self.desc
            .chargers
            .get(index)
            .map(|h| h.as_str())
            .ok_or(crate::error::CmError::NotFound)
    }

    pub fn voltage_now_uv(&mut self) -> CmResult<i32> {
        let fg = self.desc.fuel_gauge.as_str();
        self.bus.get(fg, Property::VoltageNow)?.as_i32()
    }

    pub fn voltage_ocv_uv(&mut self) -> CmResult<i32> {
        let fg = self.desc.fuel_gauge.as_str();
        self.bus.get(fg, Property::VoltageOcv)?.as_i32()
    }

    pub fn voltage_boot_uv(&mut self) -> CmResult<i32> {
        let fg = self.desc.fuel_gauge.as_str();
        self.bus.get(fg, Property::VoltageBoot)?.as_i32()
    }

    pub fn current_now_ua(&mut self) -> CmResult<i32> {
        let fg = self.desc.fuel_gauge.as_str();
        self.bus.get(fg, Property::CurrentNow)?.as_i32()
    }

    pub fn soc_per_mille(&mut self) -> CmResult<u16> {
        let fg = self.desc.fuel_gauge.as_str();
        let raw = self.bus.get(fg, Property::Capacity)?.as_i32()?;
        Ok(raw.clamp(0, 1000) as u16)
    }

    pub fn charge_full_uah(&mut self) -> CmResult<u32> {
        let fg = self.desc.fuel_gauge.as_str();
        let raw = self.bus.get(fg, Property::ChargeFull)?.as_i32()?;
        Ok(raw.max(0) as u32)
    }

    pub fn energy_now_uwh(&mut self) -> CmResult<i64> {
        let fg = self.desc.fuel_gauge.as_str();
        let raw = self.bus.get(fg, Property::EnergyNow)?.as_i32()?;
        Ok(raw as i64)
    }

    /// SPEC_FULL §10.1: read from a charger's `TEMP` when
    /// `measure_battery_temp` is set, else from the fuel gauge.
    pub fn temperature_dc(&mut self) -> CmResult<i32> {
        if self.desc.measure_battery_temp {
            let primary = self.desc.primary().as_str();
            self.bus.get(primary, Property::Temp)?.as_i32()
        } else {
            let fg = self.desc.fuel_gauge.as_str();
            self.bus.get(fg, Property::Temp)?.as_i32()
        }
    }

    pub fn charger_online(&mut self, index: usize) -> CmResult<bool> {
        let handle = self.charger(index)?.to_owned_heapless();
        self.bus.get(&handle, Property::Online)?.as_bool()
    }

    pub fn any_charger_online(&mut self) -> CmResult<bool> {
        for i in 0..self.desc.chargers.len() {
            if self.charger_online(i).unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn charger_status(&mut self, index: usize) -> CmResult<ChargeStatus> {
        let handle = self.charger(index)?.to_owned_heapless();
        self.bus.get(&handle, Property::Status)?.as_status()
    }

    pub fn charger_health(&mut self, index: usize) -> CmResult<Health> {
        let handle = self.charger(index)?.to_owned_heapless();
        self.bus.get(&handle, Property::Health)?.as_health()
    }

    pub fn usb_type(&mut self) -> CmResult<UsbType> {
        let primary = self.desc.primary().as_str().to_owned_heapless();
        self.bus.get(&primary, Property::UsbType)?.as_usb_type()
    }

    pub fn charge_voltage_uv(&mut self, index: usize) -> CmResult<i32> {
        let handle = self.charger(index)?.to_owned_heapless();
        self.bus
            .get(&handle, Property::ConstantChargeVoltage)?
            .as_i32()
    }

    pub fn battery_present(&mut self) -> CmResult<bool> {
        use crate::description::BatteryPresence;
        match self.desc.battery_presence {
            BatteryPresence::AssumePresent => Ok(true),
            BatteryPresence::AssumeAbsent => Ok(false),
            BatteryPresence::AskFuelGauge => {
                let fg = self.desc.fuel_gauge.as_str();
                self.bus.get(fg, Property::Present)?.as_bool()
            }
            BatteryPresence::AskAnyCharger => self.any_charger_online(),
        }
    }
}

/// Maps the bus's coarse `UsbType` to the config-table key used by JEITA
/// and fast-charge (spec §3: charger type is one of DCP/SDP/CDP/Unknown/PD,
/// but the JEITA table key space additionally has `FastCharge`, selected
/// once the fast-charge FSM actually switches the link to 9 V).
pub fn usb_type_to_charger_type(usb: UsbType) -> ChargerType {
    match usb {
        UsbType::Dcp => ChargerType::Dcp,
        UsbType::Sdp => ChargerType::Sdp,
        UsbType::Cdp => ChargerType::Cdp,
        UsbType::Pd | UsbType::Unknown => ChargerType::Unknown,
    }
}

trait ToOwnedHeapless {
    fn to_owned_heapless(&self) -> heapless::String<32>;
}

impl ToOwnedHeapless for str {
    fn to_owned_heapless(&self) -> heapless::String<32> {
        heapless::String::try_from(self).unwrap_or_default()
    }
}
