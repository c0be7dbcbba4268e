//! HAL Boundary (§4.5): the abstract interface the core consumes.
//! Concrete implementations (a real board, a browser sandbox, a
//! simulator) live outside the core; [`SimHal`] is this crate's own
//! in-process reference implementation, used by its tests and by
//! `demos/`.

mod sim;

pub use sim::SimHal;

/// Every HAL call either succeeds, fails, or reports the capability as
/// absent. `NotImplemented` is never propagated as an [`crate::Error`] —
/// call sites match it explicitly and fall back to the benign default
/// defined for each capability (e.g. no persisted RETAIN image, a
/// no-op `sleep`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HalFailure {
    /// The backend does not provide this capability at all.
    #[error("not implemented")]
    NotImplemented,
    /// The backend tried and failed.
    #[error("{0}")]
    Other(String),
}

/// Result type for every [`Hal`] method.
pub type HalResult<T> = core::result::Result<T, HalFailure>;

/// Channel identifier for [`Hal::gpio_read`]/[`Hal::gpio_write`].
pub type GpioChannel = u16;

/// Abstract I/O, clock, persistence and logging boundary (§4.5's table).
///
/// Every method name and contract below is load-bearing: the scheduler
/// calls `read_inputs`/`write_outputs`/`sleep` only at cycle boundaries
/// (§5), never mid-opcode, and the VM's `GET_TICKS` opcode is the only
/// other caller of `tick`.
pub trait Hal {
    /// Monotonic milliseconds since HAL init; rolls over at 2^32.
    fn tick(&mut self) -> HalResult<u32>;

    /// Cooperative delay. A host with no blocking primitive may treat
    /// this as a no-op rather than returning `NotImplemented`, since a
    /// no-op sleep is still a correct (if busy) implementation.
    fn sleep(&mut self, ms: u32) -> HalResult<()>;

    /// Copy physical inputs into `buf` (sized to IPI).
    fn read_inputs(&mut self, buf: &mut [u8]) -> HalResult<()>;

    /// Flush `buf` (sized to OPI) to physical outputs.
    fn write_outputs(&mut self, buf: &[u8]) -> HalResult<()>;

    /// Read one bit-scoped channel.
    fn gpio_read(&mut self, channel: GpioChannel) -> HalResult<bool>;

    /// Write one bit-scoped channel.
    fn gpio_write(&mut self, channel: GpioChannel, value: bool) -> HalResult<()>;

    /// Persist `bytes` under `key` in non-volatile storage.
    fn persist_save(&mut self, key: &str, bytes: &[u8]) -> HalResult<()>;

    /// Load a previously persisted value into `out`, returning the
    /// number of bytes written. `NotImplemented` and "no such key" are
    /// both benign absences from the RETAIN-restore caller's point of
    /// view; a backend that distinguishes them may still return
    /// `NotImplemented` for "no such key" if that is simpler.
    fn persist_load(&mut self, key: &str, out: &mut [u8]) -> HalResult<usize>;

    /// Delete a persisted key.
    fn persist_delete(&mut self, key: &str) -> HalResult<()>;

    /// Line-buffered diagnostic output, flushed immediately.
    fn log(&mut self, line: &str) -> HalResult<()>;
}
