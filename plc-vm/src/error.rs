//! The core's error taxonomy (§7), layered above [`plc_asm::Fault`]
//! via `#[from]` rather than duplicating its variants.

use plc_asm::Fault;

use crate::hal::HalFailure;
use crate::loader::LoaderError;

/// Everything above the VM itself can go wrong with (§7's non-VM rows).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A VM fault, already carrying its own stable code.
    #[error(transparent)]
    Vm(#[from] Fault),
    /// A cycle exceeded its task's watchdog budget.
    #[error("watchdog expired")]
    WatchdogExpired,
    /// The loader rejected a program before any execution began.
    #[error(transparent)]
    Loader(#[from] LoaderError),
    /// Task registration attempted with no free slot.
    #[error("scheduler is full")]
    SchedulerFull,
    /// The HAL backend refused a call for a reason other than
    /// `NotImplemented` (which is never an [`Error`] — see
    /// [`HalFailure::NotImplemented`]'s doc comment).
    #[error("HAL error: {0}")]
    Hal(String),
}

impl From<HalFailure> for Error {
    fn from(f: HalFailure) -> Self {
        match f {
            HalFailure::NotImplemented => {
                // A caller that propagates `NotImplemented` through `?` into
                // an `Error` has mishandled it — `NotImplemented` must be
                // matched and treated as a benign absence of capability
                // before it ever reaches this conversion. We still need a
                // total `From` impl, so fold it into `Hal` rather than
                // panicking.
                Error::Hal("capability not implemented".into())
            }
            HalFailure::Other(msg) => Error::Hal(msg),
        }
    }
}

impl Error {
    /// Stable numeric code for the debug channel's `error.code` field.
    /// VM faults keep their own [`Fault::code`] numbering; everything
    /// raised above the VM continues the sequence from `100`, well clear
    /// of `Fault`'s `1..=8` so the two spaces never collide if a caller
    /// stores both in one table.
    pub fn code(&self) -> u16 {
        match self {
            Error::Vm(fault) => fault.code(),
            Error::WatchdogExpired => 100,
            Error::Loader(e) => 200 + e.code(),
            Error::SchedulerFull => 300,
            Error::Hal(_) => 400,
        }
    }

    /// Exit status for a CLI host (§6): 1 for a VM fault, 2 for a loader
    /// error, 3 for a watchdog trip, and 4 is reserved for an explicit
    /// operator `stop` (which is not an [`Error`] at all — it is
    /// modeled as a normal, non-faulting scan outcome). `0` (clean halt)
    /// likewise never flows through here.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Error::Vm(_) => 1,
            Error::Loader(_) => 2,
            Error::WatchdogExpired => 3,
            Error::SchedulerFull | Error::Hal(_) => 1,
        }
    }
}

/// `Result` alias used throughout `plc-vm`.
pub type Result<T> = core::result::Result<T, Error>;
