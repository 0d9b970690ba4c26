//! UVLO Watcher (spec §4.8): latches an orderly-shutdown request after five
//! consecutive under-voltage samples, plus a fast follow-up read trigger
//! near the calibration threshold.

const TRIGGER_THRESHOLD: u16 = 5;
const FOLLOWUP_MIN_MS: u64 = 100;
const FOLLOWUP_MAX_MS: u64 = 800;

pub struct UvloOutcome {
    /// Fire exactly once, the tick the threshold is first crossed.
    pub request_shutdown: bool,
    /// Schedule a follow-up read this many ms out, if any.
    pub schedule_followup_ms: Option<u64>,
}

/// Operates directly on `RuntimeState::{uvlo_trigger_cnt, uvlo_shutdown_requested}`
/// rather than a parallel state type, since both already live on the shared
/// runtime state (spec §3).
pub fn tick(
    trigger_cnt: &mut u16,
    shutdown_requested: &mut bool,
    voltage_now_uv: i32,
    v_shutdown_uv: i32,
    v_calibrate_uv: i32,
) -> UvloOutcome {
    if voltage_now_uv < v_shutdown_uv {
        *trigger_cnt = trigger_cnt.saturating_add(1);
    } else {
        *trigger_cnt = 0;
    }

    let request_shutdown = !*shutdown_requested && *trigger_cnt >= TRIGGER_THRESHOLD;
    if request_shutdown {
        *shutdown_requested = true;
    }

    let schedule_followup_ms = if voltage_now_uv < v_calibrate_uv {
        Some((FOLLOWUP_MIN_MS + FOLLOWUP_MAX_MS) / 2)
    } else {
        None
    };

    UvloOutcome {
        request_shutdown,
        schedule_followup_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_shutdown_once_after_five_consecutive_samples() {
        let mut cnt = 0u16;
        let mut requested = false;
        for _ in 0..4 {
            let out = tick(&mut cnt, &mut requested, 3_100_000, 3_200_000, 3_250_000);
            assert!(!out.request_shutdown);
        }
        let out = tick(&mut cnt, &mut requested, 3_100_000, 3_200_000, 3_250_000);
        assert!(out.request_shutdown);

        // Must not fire again even if voltage stays low.
        let out2 = tick(&mut cnt, &mut requested, 3_100_000, 3_200_000, 3_250_000);
        assert!(!out2.request_shutdown);
    }

    #[test]
    fn recovery_resets_the_counter() {
        let mut cnt = 0u16;
        let mut requested = false;
        tick(&mut cnt, &mut requested, 3_100_000, 3_200_000, 3_250_000);
        tick(&mut cnt, &mut requested, 3_100_000, 3_200_000, 3_250_000);
        tick(&mut cnt, &mut requested, 3_300_000, 3_200_000, 3_250_000);
        assert_eq!(cnt, 0);
    }

    #[test]
    fn schedules_followup_below_calibrate_threshold() {
        let mut cnt = 0u16;
        let mut requested = false;
        let out = tick(&mut cnt, &mut requested, 3_240_000, 3_200_000, 3_250_000);
        assert!(out.schedule_followup_ms.is_some());
        let at = out.schedule_followup_ms.unwrap();
        assert!((FOLLOWUP_MIN_MS..=FOLLOWUP_MAX_MS).contains(&at));
    }
}
