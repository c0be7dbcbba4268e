//! Function-block library (§4.2): timers, counters, edge detectors and
//! latches, implemented as native helpers reached via `CALL` to reserved
//! entry points rather than as ordinary bytecode.
//!
//! Per the design notes (`SPEC_FULL.md` §9), a "block" is identified by
//! its native-implementation index plus its memory offset, not by object
//! identity — [`FbKind`] is that index, and the `instance` address passed
//! to [`invoke`] is the offset. The registry of entry points is an
//! immutable table ([`FbKind::from_entry`]/[`FbKind::entry`]); instances
//! themselves are plain typed memory the compiler allocates in WORK.

use plc_asm::Fault;
use plc_types::Address;

use crate::memory::MemoryMap;

/// Base of the reserved native-call address window. §3's region table
/// places CODE at `0x5000` with a minimum size of 32 KiB, leaving
/// `0xD000..=0xFFFF` unclaimed by any region — this window is reserved
/// for `CALL` targets that name a native function-block invocation
/// instead of an ordinary jump into CODE.
pub const FB_ENTRY_BASE: u16 = 0xFF00;

/// The closed set of native function-block implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[repr(u16)]
pub enum FbKind {
    /// On-delay timer.
    Ton = 0,
    /// Off-delay timer.
    Tof = 1,
    /// Pulse timer.
    Tp = 2,
    /// Up counter.
    Ctu = 3,
    /// Down counter.
    Ctd = 4,
    /// Up/down counter.
    Ctud = 5,
    /// Rising-edge detector.
    RTrig = 6,
    /// Falling-edge detector.
    FTrig = 7,
    /// Set-dominant latch.
    Sr = 8,
    /// Reset-dominant latch.
    Rs = 9,
}

impl FbKind {
    /// Every kind, in entry-point order.
    pub const ALL: [FbKind; 10] = [
        FbKind::Ton,
        FbKind::Tof,
        FbKind::Tp,
        FbKind::Ctu,
        FbKind::Ctd,
        FbKind::Ctud,
        FbKind::RTrig,
        FbKind::FTrig,
        FbKind::Sr,
        FbKind::Rs,
    ];

    /// The reserved `CALL` target that invokes this block.
    pub const fn entry(self) -> Address {
        Address::new(FB_ENTRY_BASE + self as u16)
    }

    /// Recover a kind from a `CALL` target, or `None` if `addr` is an
    /// ordinary CODE address.
    pub fn from_entry(addr: Address) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.entry() == addr)
    }

    /// Size in bytes of one instance's compiler-allocated memory.
    pub const fn instance_len(self) -> u16 {
        match self {
            FbKind::Ton | FbKind::Tof | FbKind::Tp => 16,
            FbKind::Ctu | FbKind::Ctd | FbKind::Ctud => 16,
            FbKind::RTrig | FbKind::FTrig => 4,
            FbKind::Sr | FbKind::Rs => 4,
        }
    }
}

/// One function-block update's debug-channel payload (§4.6's `fb` frame:
/// `name`, `id`, `q`, `et?`, `cv?`).
#[derive(Debug, Clone, PartialEq)]
pub struct FbFrame {
    /// The block's kind, e.g. `"TON"`.
    pub name: &'static str,
    /// The instance's memory address — its stable identity.
    pub id: u16,
    /// The block's boolean output.
    pub q: bool,
    /// Elapsed time in microseconds, for timers only.
    pub et: Option<u32>,
    /// Current count, for counters only.
    pub cv: Option<i32>,
}

/// Timer instance layout: `[IN:u8][Q:u8][PT:u32][ET:u32][start_tick:u32][running:u8]`.
mod timer {
    use super::*;

    pub fn read(memory: &MemoryMap, at: Address) -> Result<(bool, u32, u32, u32, bool), Fault> {
        let in_ = memory.read_u8(at)? != 0;
        let pt = memory.read_u32(at + 2)?;
        let et = memory.read_u32(at + 6)?;
        let start = memory.read_u32(at + 10)?;
        let running = memory.read_u8(at + 14)? != 0;
        Ok((in_, pt, et, start, running))
    }

    pub fn write(
        memory: &mut MemoryMap,
        at: Address,
        q: bool,
        et: u32,
        start: u32,
        running: bool,
    ) -> Result<(), Fault> {
        memory.write_u8(at + 1, q as u8)?;
        memory.write_u32(at + 6, et)?;
        memory.write_u32(at + 10, start)?;
        memory.write_u8(at + 14, running as u8)?;
        Ok(())
    }

    /// Milliseconds-resolution elapsed time since `start`, in microseconds.
    /// `tick_ms` is the HAL's monotonic millisecond counter (§4.5); ZPLC
    /// timers are specified in microseconds (`TIME`, §3) but the clock the
    /// core actually has is millisecond-resolution, so sub-millisecond
    /// precision is not available — §8's ±15% boundary tolerance on the
    /// `TON` scenario already allows for this.
    pub fn elapsed_us(tick_ms: u32, start: u32) -> u32 {
        tick_ms.wrapping_sub(start).saturating_mul(1_000)
    }
}

fn invoke_ton(memory: &mut MemoryMap, at: Address, tick_ms: u32) -> Result<FbFrame, Fault> {
    let (in_, pt, _et, mut start, mut running) = timer::read(memory, at)?;
    let et = if in_ {
        if !running {
            start = tick_ms;
            running = true;
        }
        timer::elapsed_us(tick_ms, start)
    } else {
        start = 0;
        running = false;
        0
    };
    let q = in_ && et >= pt;
    timer::write(memory, at, q, et, start, running)?;
    Ok(FbFrame { name: "TON", id: at.raw(), q, et: Some(et), cv: None })
}

fn invoke_tof(memory: &mut MemoryMap, at: Address, tick_ms: u32) -> Result<FbFrame, Fault> {
    let (in_, pt, _et, mut start, mut running) = timer::read(memory, at)?;
    let (q, et) = if in_ {
        start = 0;
        running = false;
        (true, 0)
    } else {
        if !running {
            start = tick_ms;
            running = true;
        }
        let et = timer::elapsed_us(tick_ms, start);
        (et < pt, et)
    };
    timer::write(memory, at, q, et, start, running)?;
    Ok(FbFrame { name: "TOF", id: at.raw(), q, et: Some(et), cv: None })
}

fn invoke_tp(memory: &mut MemoryMap, at: Address, tick_ms: u32) -> Result<FbFrame, Fault> {
    let (in_, pt, _et, mut start, mut running) = timer::read(memory, at)?;
    if in_ && !running {
        start = tick_ms;
        running = true;
    }
    let (q, et) = if running {
        let et = timer::elapsed_us(tick_ms, start);
        if et >= pt {
            running = false;
            (false, pt)
        } else {
            (true, et)
        }
    } else {
        (false, 0)
    };
    timer::write(memory, at, q, et, start, running)?;
    Ok(FbFrame { name: "TP", id: at.raw(), q, et: Some(et), cv: None })
}

/// Counter instance layout:
/// `[CU:u8][CD:u8][R:u8][LD:u8][QU:u8][QD:u8][PV:i32][CV:i32][prev_cu:u8][prev_cd:u8]`.
mod counter {
    use super::*;

    pub struct Raw {
        pub cu: bool,
        pub cd: bool,
        pub r: bool,
        pub ld: bool,
        pub pv: i32,
        pub cv: i32,
        pub prev_cu: bool,
        pub prev_cd: bool,
    }

    pub fn read(memory: &MemoryMap, at: Address) -> Result<Raw, Fault> {
        Ok(Raw {
            cu: memory.read_u8(at)? != 0,
            cd: memory.read_u8(at + 1)? != 0,
            r: memory.read_u8(at + 2)? != 0,
            ld: memory.read_u8(at + 3)? != 0,
            pv: memory.read_i32(at + 6)?,
            cv: memory.read_i32(at + 10)?,
            prev_cu: memory.read_u8(at + 14)? != 0,
            prev_cd: memory.read_u8(at + 15)? != 0,
        })
    }

    pub fn write(
        memory: &mut MemoryMap,
        at: Address,
        qu: bool,
        qd: bool,
        cv: i32,
        prev_cu: bool,
        prev_cd: bool,
    ) -> Result<(), Fault> {
        memory.write_u8(at + 4, qu as u8)?;
        memory.write_u8(at + 5, qd as u8)?;
        memory.write_i32(at + 10, cv)?;
        memory.write_u8(at + 14, prev_cu as u8)?;
        memory.write_u8(at + 15, prev_cd as u8)?;
        Ok(())
    }
}

fn invoke_ctu(memory: &mut MemoryMap, at: Address) -> Result<FbFrame, Fault> {
    let s = counter::read(memory, at)?;
    let rising = s.cu && !s.prev_cu;
    let cv = if s.r { 0 } else if rising { s.cv.saturating_add(1) } else { s.cv };
    let qu = cv >= s.pv;
    counter::write(memory, at, qu, false, cv, s.cu, s.prev_cd)?;
    Ok(FbFrame { name: "CTU", id: at.raw(), q: qu, et: None, cv: Some(cv) })
}

fn invoke_ctd(memory: &mut MemoryMap, at: Address) -> Result<FbFrame, Fault> {
    let s = counter::read(memory, at)?;
    let falling = !s.cu && s.prev_cu; // CD input is read through the CU slot for CTD
    let cv = if s.ld { s.pv } else if falling { s.cv.saturating_sub(1) } else { s.cv };
    let qd = cv <= 0;
    counter::write(memory, at, false, qd, cv, s.cu, s.prev_cd)?;
    Ok(FbFrame { name: "CTD", id: at.raw(), q: qd, et: None, cv: Some(cv) })
}

fn invoke_ctud(memory: &mut MemoryMap, at: Address) -> Result<FbFrame, Fault> {
    let s = counter::read(memory, at)?;
    let rising_cu = s.cu && !s.prev_cu;
    let rising_cd = s.cd && !s.prev_cd;
    let mut cv = s.cv;
    if s.ld {
        cv = s.pv;
    } else if s.r {
        cv = 0;
    } else if rising_cu {
        cv = cv.saturating_add(1);
    } else if rising_cd {
        cv = cv.saturating_sub(1);
    }
    let qu = cv >= s.pv;
    let qd = cv <= 0;
    counter::write(memory, at, qu, qd, cv, s.cu, s.cd)?;
    Ok(FbFrame { name: "CTUD", id: at.raw(), q: qu, et: None, cv: Some(cv) })
}

/// Edge-detector instance layout: `[CLK:u8][Q:u8][prev:u8][pad]`.
fn invoke_r_trig(memory: &mut MemoryMap, at: Address) -> Result<FbFrame, Fault> {
    let clk = memory.read_u8(at)? != 0;
    let prev = memory.read_u8(at + 2)? != 0;
    let q = clk && !prev;
    memory.write_u8(at + 1, q as u8)?;
    memory.write_u8(at + 2, clk as u8)?;
    Ok(FbFrame { name: "R_TRIG", id: at.raw(), q, et: None, cv: None })
}

fn invoke_f_trig(memory: &mut MemoryMap, at: Address) -> Result<FbFrame, Fault> {
    let clk = memory.read_u8(at)? != 0;
    let prev = memory.read_u8(at + 2)? != 0;
    let q = !clk && prev;
    memory.write_u8(at + 1, q as u8)?;
    memory.write_u8(at + 2, clk as u8)?;
    Ok(FbFrame { name: "F_TRIG", id: at.raw(), q, et: None, cv: None })
}

/// Latch instance layout: `[S:u8][R:u8][Q:u8][pad]`.
fn invoke_sr(memory: &mut MemoryMap, at: Address) -> Result<FbFrame, Fault> {
    let s = memory.read_u8(at)? != 0;
    let r = memory.read_u8(at + 1)? != 0;
    let prev_q = memory.read_u8(at + 2)? != 0;
    let q = if s { true } else if r { false } else { prev_q };
    memory.write_u8(at + 2, q as u8)?;
    Ok(FbFrame { name: "SR", id: at.raw(), q, et: None, cv: None })
}

fn invoke_rs(memory: &mut MemoryMap, at: Address) -> Result<FbFrame, Fault> {
    let s = memory.read_u8(at)? != 0;
    let r = memory.read_u8(at + 1)? != 0;
    let prev_q = memory.read_u8(at + 2)? != 0;
    let q = if r { false } else if s { true } else { prev_q };
    memory.write_u8(at + 2, q as u8)?;
    Ok(FbFrame { name: "RS", id: at.raw(), q, et: None, cv: None })
}

/// Run the native helper for `kind` against the instance at `at`,
/// producing the `fb` debug frame the call just performed.
pub(super) fn invoke(
    kind: FbKind,
    memory: &mut MemoryMap,
    at: Address,
    tick_ms: u32,
) -> Result<FbFrame, Fault> {
    match kind {
        FbKind::Ton => invoke_ton(memory, at, tick_ms),
        FbKind::Tof => invoke_tof(memory, at, tick_ms),
        FbKind::Tp => invoke_tp(memory, at, tick_ms),
        FbKind::Ctu => invoke_ctu(memory, at),
        FbKind::Ctd => invoke_ctd(memory, at),
        FbKind::Ctud => invoke_ctud(memory, at),
        FbKind::RTrig => invoke_r_trig(memory, at),
        FbKind::FTrig => invoke_f_trig(memory, at),
        FbKind::Sr => invoke_sr(memory, at),
        FbKind::Rs => invoke_rs(memory, at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;

    fn memory() -> MemoryMap {
        MemoryMap::new(MemoryConfig::default())
    }

    fn instance_at(cfg: &MemoryConfig) -> Address {
        Address::from(cfg.work.base + 512)
    }

    #[test]
    fn every_entry_point_round_trips_through_from_entry() {
        for kind in FbKind::ALL {
            assert_eq!(FbKind::from_entry(kind.entry()), Some(kind));
        }
    }

    #[test]
    fn ton_holds_q_false_until_preset_elapsed_then_latches_true() {
        let cfg = MemoryConfig::default();
        let mut mem = memory();
        let at = instance_at(&cfg);
        mem.write_u8(at, 1).unwrap(); // IN = true
        mem.write_u32(at + 2, 100_000).unwrap(); // PT = 100ms in us

        let frame = invoke_ton(&mut mem, at, 0).unwrap();
        assert!(!frame.q);

        let frame = invoke_ton(&mut mem, at, 50).unwrap();
        assert!(!frame.q);

        let frame = invoke_ton(&mut mem, at, 120).unwrap();
        assert!(frame.q);
    }

    #[test]
    fn ton_resets_when_in_goes_false() {
        let cfg = MemoryConfig::default();
        let mut mem = memory();
        let at = instance_at(&cfg);
        mem.write_u8(at, 1).unwrap();
        mem.write_u32(at + 2, 100_000).unwrap();
        invoke_ton(&mut mem, at, 0).unwrap();
        invoke_ton(&mut mem, at, 200).unwrap();

        mem.write_u8(at, 0).unwrap(); // IN = false
        let frame = invoke_ton(&mut mem, at, 201).unwrap();
        assert!(!frame.q);
        assert_eq!(frame.et, Some(0));
    }

    #[test]
    fn ctu_counts_rising_edges_and_resets() {
        let cfg = MemoryConfig::default();
        let mut mem = memory();
        let at = instance_at(&cfg);
        mem.write_i32(at + 6, 3).unwrap(); // PV = 3

        for _ in 0..3 {
            mem.write_u8(at, 1).unwrap(); // CU rising edge
            invoke_ctu(&mut mem, at).unwrap();
            mem.write_u8(at, 0).unwrap();
            invoke_ctu(&mut mem, at).unwrap();
        }
        let frame = invoke_ctu(&mut mem, at).unwrap();
        assert_eq!(frame.cv, Some(3));
        assert!(frame.q);

        mem.write_u8(at + 2, 1).unwrap(); // R = true
        let frame = invoke_ctu(&mut mem, at).unwrap();
        assert_eq!(frame.cv, Some(0));
        assert!(!frame.q);
    }

    #[test]
    fn r_trig_fires_once_per_rising_edge() {
        let cfg = MemoryConfig::default();
        let mut mem = memory();
        let at = instance_at(&cfg);

        mem.write_u8(at, 1).unwrap();
        assert!(invoke_r_trig(&mut mem, at).unwrap().q);
        assert!(!invoke_r_trig(&mut mem, at).unwrap().q);

        mem.write_u8(at, 0).unwrap();
        invoke_r_trig(&mut mem, at).unwrap();
        mem.write_u8(at, 1).unwrap();
        assert!(invoke_r_trig(&mut mem, at).unwrap().q);
    }

    #[test]
    fn sr_latch_is_set_dominant() {
        let cfg = MemoryConfig::default();
        let mut mem = memory();
        let at = instance_at(&cfg);

        mem.write_u8(at, 1).unwrap(); // S
        mem.write_u8(at + 1, 1).unwrap(); // R
        assert!(invoke_sr(&mut mem, at).unwrap().q, "set dominates reset");

        mem.write_u8(at, 0).unwrap();
        assert!(invoke_sr(&mut mem, at).unwrap().q, "Q holds once latched");

        mem.write_u8(at + 1, 1).unwrap();
        assert!(!invoke_sr(&mut mem, at).unwrap().q);
    }

    #[test]
    fn rs_latch_is_reset_dominant() {
        let cfg = MemoryConfig::default();
        let mut mem = memory();
        let at = instance_at(&cfg);

        mem.write_u8(at, 1).unwrap(); // S
        mem.write_u8(at + 1, 1).unwrap(); // R
        assert!(!invoke_rs(&mut mem, at).unwrap().q, "reset dominates set");
    }
}
