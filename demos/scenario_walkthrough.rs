//! Host-side walkthrough of a few of the end-to-end scenarios the crate is
//! built against, driven entirely through the `testing` mocks. Run with:
//!
//!     cargo run --example scenario_walkthrough --features testing
//!
//! This links the `no_std` library from a `std` binary the same way the
//! crate's own `#[cfg(test)]` modules do; the only difference is the mocks
//! are reached through the `testing` Cargo feature instead of `cfg(test)`.

use charger_manager::description::{BootMode, ChargerDescriptionBuilder, ChargerType, HandleName};
use charger_manager::monitor::tick;
use charger_manager::psb::{ChargeStatus, Health, Property, UsbType, Value};
use charger_manager::state::RuntimeState;
use charger_manager::testing::{MockBus, MockPersistentStore};

fn name(s: &str) -> HandleName {
    HandleName::try_from(s).unwrap()
}

fn wire_online(bus: &mut MockBus, fuel_gauge: &str, primary: &str, voltage_uv: i32) {
    bus.set_value(primary, Property::Online, Value::Bool(true));
    bus.set_value(primary, Property::Status, Value::Status(ChargeStatus::Charging));
    bus.set_value(primary, Property::Health, Value::Health(Health::Good));
    bus.set_value(primary, Property::UsbType, Value::UsbType(UsbType::Dcp));
    bus.set_value(fuel_gauge, Property::VoltageNow, Value::I32(voltage_uv));
    bus.set_value(fuel_gauge, Property::VoltageOcv, Value::I32(voltage_uv));
    bus.set_value(fuel_gauge, Property::VoltageBoot, Value::I32(voltage_uv));
    bus.set_value(fuel_gauge, Property::CurrentNow, Value::I32(100_000));
    bus.set_value(fuel_gauge, Property::Capacity, Value::I32(500));
    bus.set_value(fuel_gauge, Property::ChargeFull, Value::I32(0));
    bus.set_value(fuel_gauge, Property::Temp, Value::I32(250));
}

fn cold_latch_and_recover() {
    println!("\n== scenario 1: cold latch & recover ==");
    let desc = ChargerDescriptionBuilder::new(name("fg"), name("chg0"))
        .boot_mode(BootMode::Normal)
        .build()
        .unwrap();
    let mut state = RuntimeState::new(ChargerType::Unknown, false, 3000);
    let mut bus = MockBus::new();
    wire_online(&mut bus, desc.fuel_gauge.as_str(), desc.primary(), 3_800_000);
    let mut store = MockPersistentStore::default();

    for (i, temp_dc) in [520, 520, 520, 480, 470, 460, 450].into_iter().enumerate() {
        bus.set_value(desc.fuel_gauge.as_str(), Property::Temp, Value::I32(temp_dc));
        let out = tick(&desc, &mut state, &mut bus, &mut store, &[], i as u64 * 1000, false);
        println!(
            "tick {i}: temp={temp_dc} charger_enabled={} events={:?}",
            state.charger_enabled,
            out.events.as_slice()
        );
    }
}

fn uvlo_shutdown() {
    println!("\n== scenario 5: UVLO ==");
    let desc = ChargerDescriptionBuilder::new(name("fg"), name("chg0"))
        .boot_mode(BootMode::Normal)
        .build()
        .unwrap();
    let mut state = RuntimeState::new(ChargerType::Unknown, false, 3000);
    let mut bus = MockBus::new();
    wire_online(&mut bus, desc.fuel_gauge.as_str(), desc.primary(), 3_100_000);
    bus.set_value(desc.fuel_gauge.as_str(), Property::VoltageOcv, Value::I32(3_100_000));
    let mut store = MockPersistentStore::default();

    for i in 0..6u64 {
        let out = tick(&desc, &mut state, &mut bus, &mut store, &[], i * 1000, false);
        println!("tick {i}: shutdown_requested={}", out.shutdown_requested);
    }
    println!(
        "final reported capacity: {:?}",
        bus.get_value(desc.fuel_gauge.as_str(), Property::Capacity)
    );
}

fn hard_full_detection() {
    println!("\n== scenario 3: hard-full detection ==");
    let desc = ChargerDescriptionBuilder::new(name("fg"), name("chg0"))
        .boot_mode(BootMode::Normal)
        .build()
        .unwrap();
    let mut state = RuntimeState::new(ChargerType::Unknown, false, 3000);
    let mut bus = MockBus::new();
    wire_online(&mut bus, desc.fuel_gauge.as_str(), desc.primary(), 3_800_000);
    let mut store = MockPersistentStore::default();

    tick(&desc, &mut state, &mut bus, &mut store, &[], 0, false);
    println!("tick 0: charger_enabled={}", state.charger_enabled);

    bus.set_value(desc.fuel_gauge.as_str(), Property::VoltageNow, Value::I32(4_360_000));
    bus.set_value(desc.fuel_gauge.as_str(), Property::CurrentNow, Value::I32(140_000));
    bus.set_value(desc.fuel_gauge.as_str(), Property::Capacity, Value::I32(1000));
    tick(&desc, &mut state, &mut bus, &mut store, &[], 1000, false);

    bus.set_value(desc.fuel_gauge.as_str(), Property::CurrentNow, Value::I32(130_000));
    let out = tick(&desc, &mut state, &mut bus, &mut store, &[], 2000, false);
    println!(
        "tick 2: charger_enabled={} events={:?} calibrate={:?}",
        state.charger_enabled,
        out.events.as_slice(),
        bus.get_value(desc.fuel_gauge.as_str(), Property::Calibrate)
    );
}

fn main() {
    cold_latch_and_recover();
    hard_full_detection();
    uvlo_shutdown();
}
