//! Error taxonomy shared by every component (spec §7).
//!
//! Components that discover an error decide locally what to do with it
//! (skip a guard for this tick, roll back a partial mutation, degrade a
//! worker to `Err`); this type only carries *what kind* of failure
//! occurred so that policy.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CmError {
    /// A handle or property name has no backing entry in the bus/registry.
    NotFound,
    /// A read or write to hardware failed; retry next tick.
    Io,
    /// The property exists but this handle does not implement it.
    Unsupported,
    /// Configuration is out of range or self-inconsistent.
    Invalid,
    /// Expected to clear on its own; caller should retry later.
    Transient,
    /// Unrecoverable; the only path the core itself may act on by
    /// requesting an orderly platform shutdown (UVLO).
    Fatal,
}

impl fmt::Display for CmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmError::NotFound => "handle or property not found",
            CmError::Io => "transient I/O failure",
            CmError::Unsupported => "property not implemented",
            CmError::Invalid => "invalid configuration",
            CmError::Transient => "transient condition, retry later",
            CmError::Fatal => "fatal condition",
        };
        f.write_str(s)
    }
}

pub type CmResult<T> = Result<T, CmError>;
