//! Event Notify Facade (spec §4.9): named event kinds, consecutive-duplicate
//! suppression, and suspend-time "only the latest survives" buffering.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    Unknown,
    BattFull,
    BattIn,
    BattOut,
    BattOverheat,
    BattCold,
    ExtPwrInOut,
    ChgStartStop,
    FastCharge,
    Others,
}

/// SPEC_FULL §10.3: a short debounce window applied to `ExtPwrInOut` before
/// it is trusted, mirroring the original driver's EXTCON-bounce guard.
pub const CABLE_DEBOUNCE_MS: u64 = 150;

pub struct Notify {
    last_delivered: Option<EventKind>,
    suspended: bool,
    pending: Option<EventKind>,
    cable_debounce_until_ms: Option<u64>,
}

impl Default for Notify {
    fn default() -> Self {
        Self {
            last_delivered: None,
            suspended: false,
            pending: None,
            cable_debounce_until_ms: None,
        }
    }
}

impl Notify {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `kind` through the consecutive-duplicate filter and, while
    /// suspended, the latest-only buffer. Returns `Some(kind)` exactly when
    /// a delivery should actually happen now.
    pub fn emit(&mut self, kind: EventKind) -> Option<EventKind> {
        if self.suspended {
            self.pending = Some(kind);
            return None;
        }
        self.deliver_if_new(kind)
    }

    fn deliver_if_new(&mut self, kind: EventKind) -> Option<EventKind> {
        if self.last_delivered == Some(kind) {
            return None;
        }
        self.last_delivered = Some(kind);
        Some(kind)
    }

    pub fn suspend_prepare(&mut self) {
        self.suspended = true;
    }

    /// Spec §5: "the resume path always runs one full tick before emitting
    /// buffered messages" — callers run their tick first, then call this.
    pub fn resume(&mut self) -> Option<EventKind> {
        self.suspended = false;
        match self.pending.take() {
            Some(kind) => self.deliver_if_new(kind),
            None => None,
        }
    }

    /// SPEC_FULL §10.3: only trust a cable-presence transition once it has
    /// held steady for `CABLE_DEBOUNCE_MS`. Call once per tick with the
    /// raw `is_ext_pwr_online` reading; returns `true` once the debounce
    /// window has elapsed since the last state flip.
    pub fn debounce_ext_power(&mut self, now_ms: u64, changed_this_tick: bool) -> bool {
        if changed_this_tick {
            self.cable_debounce_until_ms = Some(now_ms.saturating_add(CABLE_DEBOUNCE_MS));
            return false;
        }
        match self.cable_debounce_until_ms {
            Some(deadline) if now_ms < deadline => false,
            Some(_) => {
                self.cable_debounce_until_ms = None;
                true
            }
            None => true,
        }
    }
}
