//! Capacity Tracker (spec §4.7): a coulomb-counting design-capacity
//! learner, `Init → Idle → Updating → Done`, plus `Err`, backed by an
//! XOR-"encrypted" persistent file.

use crate::{
    description::{BootMode, TrackerKeys},
    error::{CmError, CmResult},
    state::{TrackerPhase, TrackerState},
};

const INIT_MAX_RETRIES: u8 = 5;
const UPDATE_TIMEOUT_MS: u64 = 30 * 3_600_000;
const START_CAP_ABORT_PER_MILLE: u16 = 200;

/// External collaborator for the persistent capacity file (spec §6: "path
/// fixed by configuration; two 32-bit little-endian words, each the
/// capacity (mAh) XOR'd with K0/K1 respectively").
pub trait PersistentStore {
    fn read(&mut self) -> CmResult<[u32; 2]>;
    fn write(&mut self, words: [u32; 2]) -> CmResult<()>;
}

/// Encodes `capacity_mah` as the two-word XOR format (spec §4.7).
pub fn encode(capacity_mah: u32, keys: TrackerKeys) -> [u32; 2] {
    [capacity_mah ^ keys.k0, capacity_mah ^ keys.k1]
}

/// Decodes the two-word format, validating that both words decode to the
/// same capacity (spec §8: "a corrupt second word is detected and
/// ignored").
pub fn decode(words: [u32; 2], keys: TrackerKeys) -> CmResult<u32> {
    let a = words[0] ^ keys.k0;
    let b = words[1] ^ keys.k1;
    if a == b {
        Ok(a)
    } else {
        Err(CmError::Invalid)
    }
}

pub struct TrackerInputs {
    pub boot_mode: BootMode,
    pub voltage_boot_uv: i32,
    pub voltage_ocv_uv: i32,
    pub current_now_ua: i32,
    pub energy_now_uwh: u64,
    pub now_ms: u64,
}

/// Maps a starting OCV to a starting capacity per-mille via linear
/// interpolation over a caller-supplied table (spec §4.7: "mapped through a
/// lookup table to `start_cap_per_mille`"). The table must be sorted
/// ascending by voltage.
pub fn ocv_to_start_cap(ocv_uv: i32, table: &[(i32, u16)]) -> u16 {
    if table.is_empty() {
        return 0;
    }
    if ocv_uv <= table[0].0 {
        return table[0].1;
    }
    if let Some(&(_, last)) = table.last() {
        if ocv_uv >= table[table.len() - 1].0 {
            return last;
        }
    }
    for pair in table.windows(2) {
        let (v0, c0) = pair[0];
        let (v1, c1) = pair[1];
        if ocv_uv >= v0 && ocv_uv <= v1 {
            if v1 == v0 {
                return c0;
            }
            let span = (v1 - v0) as i64;
            let frac = (ocv_uv - v0) as i64;
            let c = c0 as i64 + ((c1 as i64 - c0 as i64) * frac) / span;
            return c.clamp(0, 1000) as u16;
        }
    }
    table[0].1
}

pub fn tick(
    state: &mut TrackerState,
    store: &mut dyn PersistentStore,
    keys: TrackerKeys,
    inputs: &TrackerInputs,
    ocv_table: &[(i32, u16)],
) {
    match state.phase {
        TrackerPhase::Init => init_step(state, store, keys),
        TrackerPhase::Idle => idle_step(state, inputs, ocv_table),
        TrackerPhase::Updating => updating_step(state, inputs),
        TrackerPhase::Done => done_step(state, store, keys),
        TrackerPhase::Err => {}
    }
}

fn init_step(state: &mut TrackerState, store: &mut dyn PersistentStore, keys: TrackerKeys) {
    match store.read().and_then(|words| decode(words, keys)) {
        Ok(stored) => {
            let design = state.design_capacity_mah;
            if design > 0 && stored.abs_diff(design) < design / 2 {
                state.design_capacity_mah = stored;
            }
            state.phase = TrackerPhase::Idle;
            state.init_retries = 0;
        }
        Err(_) => {
            state.init_retries = state.init_retries.saturating_add(1);
            if state.init_retries >= INIT_MAX_RETRIES {
                logger::warn!("capacity tracker: init failed after {} retries", state.init_retries);
                state.phase = TrackerPhase::Err;
            }
        }
    }
}

fn idle_step(state: &mut TrackerState, inputs: &TrackerInputs, ocv_table: &[(i32, u16)]) {
    let quiescent = match inputs.boot_mode {
        BootMode::Charger => {
            inputs.voltage_boot_uv <= 3_500_000 && inputs.voltage_ocv_uv <= 3_650_000
        }
        _ => inputs.current_now_ua.abs() <= 30_000 && inputs.voltage_ocv_uv <= 3_650_000,
    };
    if !quiescent {
        return;
    }

    let start_cap = ocv_to_start_cap(inputs.voltage_ocv_uv, ocv_table);
    if start_cap > START_CAP_ABORT_PER_MILLE {
        // Battery isn't actually near-empty; not a valid learning start.
        return;
    }

    state.start_cap_per_mille = start_cap;
    state.start_energy_uwh = inputs.energy_now_uwh;
    state.start_time_s = inputs.now_ms / 1000;
    state.phase = TrackerPhase::Updating;
}

fn updating_step(state: &mut TrackerState, inputs: &TrackerInputs) {
    let elapsed_ms = inputs
        .now_ms
        .saturating_sub(state.start_time_s.saturating_mul(1000));
    if elapsed_ms > UPDATE_TIMEOUT_MS {
        state.phase = TrackerPhase::Idle;
        return;
    }

    if inputs.voltage_ocv_uv >= state.end_voltage_uv.saturating_sub(5_000)
        && inputs.current_now_ua < state.end_current_ua.saturating_add(5_000)
    {
        let design = state.design_capacity_mah as i64;
        let energy_delta_uwh = inputs.energy_now_uwh as i64 - state.start_energy_uwh as i64;
        let learned =
            design * state.start_cap_per_mille as i64 / 1000 + energy_delta_uwh / 1000;
        let learned = learned.max(0) as u32;

        if design > 0 && learned.abs_diff(state.design_capacity_mah) < state.design_capacity_mah / 2
        {
            state.design_capacity_mah = learned;
            state.phase = TrackerPhase::Done;
        } else {
            state.phase = TrackerPhase::Idle;
        }
    }
}

fn done_step(state: &mut TrackerState, store: &mut dyn PersistentStore, keys: TrackerKeys) {
    let words = encode(state.design_capacity_mah, keys);
    match store.write(words) {
        Ok(()) => state.phase = TrackerPhase::Idle,
        Err(e) => {
            logger::warn!("capacity tracker: persist failed: {:?}", e);
            state.phase = TrackerPhase::Err;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MemStore {
        words: Option<[u32; 2]>,
    }

    impl PersistentStore for MemStore {
        fn read(&mut self) -> CmResult<[u32; 2]> {
            self.words.ok_or(CmError::NotFound)
        }
        fn write(&mut self, words: [u32; 2]) -> CmResult<()> {
            self.words = Some(words);
            Ok(())
        }
    }

    fn keys() -> TrackerKeys {
        TrackerKeys { k0: 0xdead_beef, k1: 0xcafe_f00d }
    }

    #[test]
    fn encode_decode_roundtrips() {
        let words = encode(3200, keys());
        assert_eq!(decode(words, keys()).unwrap(), 3200);
    }

    #[test]
    fn corrupt_second_word_is_rejected() {
        let mut words = encode(3200, keys());
        words[1] ^= 1;
        assert_eq!(decode(words, keys()), Err(CmError::Invalid));
    }

    #[test]
    fn init_adopts_stored_capacity_within_half_design() {
        let mut store = MemStore {
            words: Some(encode(3100, keys())),
        };
        let mut state = TrackerState::new(3000);
        init_step(&mut state, &mut store, keys());
        assert_eq!(state.phase, TrackerPhase::Idle);
        assert_eq!(state.design_capacity_mah, 3100);
    }

    #[test]
    fn init_degrades_to_err_after_max_retries() {
        let mut store = MemStore { words: None };
        let mut state = TrackerState::new(3000);
        for _ in 0..INIT_MAX_RETRIES {
            init_step(&mut state, &mut store, keys());
        }
        assert_eq!(state.phase, TrackerPhase::Err);
    }

    #[test]
    fn ocv_lookup_interpolates() {
        let table = [(3_000_000, 0u16), (4_000_000, 1000u16)];
        assert_eq!(ocv_to_start_cap(3_500_000, &table), 500);
        assert_eq!(ocv_to_start_cap(2_000_000, &table), 0);
        assert_eq!(ocv_to_start_cap(5_000_000, &table), 1000);
    }

    #[test]
    fn idle_aborts_when_start_cap_too_high() {
        let table = [(3_000_000, 500u16), (4_000_000, 1000u16)];
        let mut state = TrackerState::new(3000);
        state.phase = TrackerPhase::Idle;
        let inputs = TrackerInputs {
            boot_mode: BootMode::Normal,
            voltage_boot_uv: 0,
            voltage_ocv_uv: 3_600_000,
            current_now_ua: 0,
            energy_now_uwh: 0,
            now_ms: 0,
        };
        idle_step(&mut state, &inputs, &table);
        assert_eq!(state.phase, TrackerPhase::Idle);
    }
}
