use std::collections::HashMap;
use std::time::Instant;

use super::{GpioChannel, Hal, HalFailure, HalResult};

/// An in-process reference HAL: wall-clock ticks, an in-memory GPIO bank,
/// an in-memory non-volatile store, and `tracing` for logging.
///
/// This is the crate's own test fixture and the worked example under
/// `demos/` — it is explicitly not a board bring-up (out of scope per
/// §1), it exists because a core with no runnable HAL at all cannot be
/// exercised end-to-end.
#[derive(Debug)]
pub struct SimHal {
    started_at: Instant,
    gpio: HashMap<GpioChannel, bool>,
    store: HashMap<String, Vec<u8>>,
}

impl Default for SimHal {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHal {
    /// Construct a fresh simulator with its tick counter starting at `0`.
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            gpio: HashMap::new(),
            store: HashMap::new(),
        }
    }

    /// Directly set a GPIO channel, as if the simulated physical world
    /// changed — tests use this to drive `TON(IN := ...)` scenarios
    /// without going through `gpio_write` (which models the VM's own
    /// output side).
    pub fn set_input_channel(&mut self, channel: GpioChannel, value: bool) {
        self.gpio.insert(channel, value);
    }
}

impl Hal for SimHal {
    fn tick(&mut self) -> HalResult<u32> {
        Ok(self.started_at.elapsed().as_millis() as u32)
    }

    fn sleep(&mut self, ms: u32) -> HalResult<()> {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
        Ok(())
    }

    fn read_inputs(&mut self, buf: &mut [u8]) -> HalResult<()> {
        // The simulator has no physical side channel wired to IPI bytes
        // directly; a test harness populates IPI through the VM's memory
        // map instead. Reporting the capability as absent lets the
        // scheduler's cycle contract proceed without overwriting
        // test-seeded IPI contents.
        let _ = buf;
        Err(HalFailure::NotImplemented)
    }

    fn write_outputs(&mut self, buf: &[u8]) -> HalResult<()> {
        let _ = buf;
        Err(HalFailure::NotImplemented)
    }

    fn gpio_read(&mut self, channel: GpioChannel) -> HalResult<bool> {
        Ok(*self.gpio.get(&channel).unwrap_or(&false))
    }

    fn gpio_write(&mut self, channel: GpioChannel, value: bool) -> HalResult<()> {
        self.gpio.insert(channel, value);
        Ok(())
    }

    fn persist_save(&mut self, key: &str, bytes: &[u8]) -> HalResult<()> {
        self.store.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn persist_load(&mut self, key: &str, out: &mut [u8]) -> HalResult<usize> {
        match self.store.get(key) {
            Some(bytes) => {
                let len = bytes.len().min(out.len());
                out[..len].copy_from_slice(&bytes[..len]);
                Ok(len)
            }
            None => Err(HalFailure::NotImplemented),
        }
    }

    fn persist_delete(&mut self, key: &str) -> HalResult<()> {
        self.store.remove(key);
        Ok(())
    }

    fn log(&mut self, line: &str) -> HalResult<()> {
        tracing::info!(target: "plc_vm::hal::sim", "{line}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_round_trips() {
        let mut hal = SimHal::new();
        hal.persist_save("retain", &[1, 2, 3]).unwrap();
        let mut out = [0u8; 3];
        let n = hal.persist_load("retain", &mut out).unwrap();
        assert_eq!(n, 3);
        assert_eq!(out, [1, 2, 3]);
    }

    #[test]
    fn missing_key_is_not_implemented() {
        let mut hal = SimHal::new();
        let mut out = [0u8; 1];
        assert_eq!(hal.persist_load("missing", &mut out), Err(HalFailure::NotImplemented));
    }

    #[test]
    fn gpio_defaults_to_false() {
        let mut hal = SimHal::new();
        assert_eq!(hal.gpio_read(3).unwrap(), false);
        hal.gpio_write(3, true).unwrap();
        assert_eq!(hal.gpio_read(3).unwrap(), true);
    }
}
