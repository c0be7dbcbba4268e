//! Bytecode VM (§4.2): decode-and-execute loop over the operand stack,
//! with strict memory-region isolation and deterministic fault
//! semantics.
//!
//! Structured as a central `Vm` struct, with arithmetic, stack
//! manipulation, control flow and the native function-block library
//! each in their own module and implemented as `impl` blocks on that
//! one struct, dispatched from a single decode-and-match loop
//! (`dispatch.rs`).

mod alu;
mod dispatch;
pub mod fb;
mod flow;
mod stack;

pub use fb::FbFrame;

use plc_asm::{Fault, FaultedAt};
use plc_types::{Address, Cell};

use crate::config::VmLimits;
use crate::hal::Hal;
use crate::memory::MemoryMap;

/// Lifecycle state of one [`Vm`] instance (not to be confused with one
/// task's per-cycle run — a `Vm` is reused across cycles and across
/// tasks; only `Faulted` survives between invocations, because recovery
/// is only through an explicit `reset`, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    /// Ready to execute.
    Ready,
    /// Currently inside a `run_until` (only observable mid-callback).
    Running,
    /// Stopped by `HALT`; the task's cycle has ended normally.
    Halted,
    /// Stopped by a breakpoint or `BREAK`; resumable.
    Suspended,
    /// Stopped by an unrecoverable fault; only a `reset` clears this.
    Faulted(FaultedAt),
}

/// Why [`Vm::run_until`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// `HALT` was executed.
    Halted,
    /// The opcode budget was exhausted before `HALT`/fault/breakpoint.
    BudgetExhausted,
    /// A breakpoint (or `BREAK`) was hit; `pc` is where execution stopped.
    Breakpoint(Address),
    /// A fault occurred; `pc` is the faulting instruction's address
    /// (§8 invariant 3 — never the next one).
    Faulted(FaultedAt),
}

/// One decoded-and-executed instruction's observable effect, structurally
/// produced — never serialized until the debug channel's wire boundary
/// (§9's design note). `Vm::run_until`'s callback receives one of these
/// per opcode so a caller at any verbosity can build whatever `Frame` it
/// needs without the VM knowing about frames at all.
#[derive(Debug, Clone, PartialEq)]
pub struct StepEvent {
    /// The opcode executed.
    pub opcode: plc_asm::Opcode,
    /// Program counter it was fetched from.
    pub pc: Address,
    /// Operand stack depth, in cells, after executing.
    pub sp_cells: u16,
    /// Top-of-stack cell after executing, if the stack is non-empty.
    pub tos: Option<Cell>,
    /// A function-block instance updated by this instruction, if any.
    pub fb: Option<FbFrame>,
}

/// The bytecode interpreter. Generic over the HAL implementation so a
/// host picks its concrete HAL once and the VM never has to care.
pub struct Vm<H> {
    memory: MemoryMap,
    pc: Address,
    /// Operand stack pointer: offset in bytes from `work_base`, grows up.
    sp: u16,
    /// Call (return-address) stack pointer: offset in bytes from
    /// `work_base`, grows down from `work_size`.
    rsp: u16,
    work_base: u16,
    work_size: u16,
    call_depth: u16,
    limits: VmLimits,
    state: VmState,
    /// Count of `F2I` saturations since the last reset — surfaced as a
    /// `warn`-kind `error` frame by callers that care (see
    /// `SPEC_FULL.md` §4.2's `F2I` supplement).
    f2i_saturations: u32,
    hal: H,
}

impl<H: Hal> Vm<H> {
    /// Build a VM over `memory`, parked at `pc` with an empty stack
    /// spanning `[work_base, work_base + work_size)` of WORK.
    pub fn new(memory: MemoryMap, limits: VmLimits, hal: H) -> Self {
        Self {
            memory,
            pc: Address::new(0),
            sp: 0,
            rsp: 0,
            work_base: 0,
            work_size: 0,
            call_depth: 0,
            limits,
            state: VmState::Ready,
            f2i_saturations: 0,
            hal,
        }
    }

    /// Borrow the memory map (debug channel `peek`/`mem`/`watch`).
    pub fn memory(&self) -> &MemoryMap {
        &self.memory
    }

    /// Mutably borrow the memory map (debug channel `poke`, HAL cycle
    /// boundary exchange).
    pub fn memory_mut(&mut self) -> &mut MemoryMap {
        &mut self.memory
    }

    /// Borrow the HAL.
    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    /// Current program counter.
    pub fn pc(&self) -> Address {
        self.pc
    }

    /// Current lifecycle state.
    pub fn state(&self) -> VmState {
        self.state
    }

    /// Operand stack depth in cells.
    pub fn stack_depth(&self) -> u16 {
        self.sp / plc_types::CELL_SIZE as u16
    }

    /// Saturating `F2I` count since the last reset.
    pub fn f2i_saturations(&self) -> u32 {
        self.f2i_saturations
    }

    /// Prepare the VM to run one task invocation: park at `entry_point`
    /// with a fresh, empty stack over `[work_base, work_base +
    /// stack_size)`. Per §4.3's per-cycle contract, a task's transient
    /// stack does not survive between cycles, even though the rest of
    /// WORK (where function-block instances live) does.
    pub fn prepare_task(&mut self, entry_point: Address, work_base: u16, stack_size: u16) {
        self.pc = entry_point;
        self.work_base = work_base;
        self.work_size = stack_size;
        self.sp = 0;
        self.rsp = stack_size;
        self.call_depth = 0;
        self.state = VmState::Ready;
    }

    /// Clear a fault/halt/suspend and return to `Ready` without touching
    /// memory — the broader `reset` (§5) that also zeroes IPI/OPI/WORK is
    /// `crate::scheduler::Scheduler::reset`, which calls this plus
    /// `MemoryMap::clear_volatile`.
    pub fn clear_state(&mut self) {
        self.state = VmState::Ready;
        self.f2i_saturations = 0;
    }

    /// Decode and execute exactly one instruction, advancing `pc`.
    /// Returns the instruction's effect, or the fault it raised (with
    /// `pc` left at the faulting instruction, per §8 invariant 3).
    pub fn step(&mut self) -> Result<StepEvent, FaultedAt> {
        dispatch::step(self)
    }

    /// Execute instructions until `HALT`, a fault, a breakpoint, or
    /// `budget` opcodes have run — whichever comes first. `breakpoints`
    /// is checked before each opcode dispatch (§4.6); `on_event` is
    /// called once per successfully executed instruction so a caller can
    /// build `opcode`/`fb` frames without the VM knowing about frames.
    pub fn run_until(
        &mut self,
        budget: u32,
        breakpoints: &std::collections::HashSet<u16>,
        mut on_event: impl FnMut(&StepEvent),
    ) -> RunOutcome {
        self.state = VmState::Running;
        for _ in 0..budget {
            if breakpoints.contains(&self.pc.raw()) {
                self.state = VmState::Suspended;
                return RunOutcome::Breakpoint(self.pc);
            }
            match self.step() {
                Ok(event) => {
                    let halted = event.opcode == plc_asm::Opcode::Halt;
                    let broke = event.opcode == plc_asm::Opcode::Break;
                    on_event(&event);
                    if halted {
                        self.state = VmState::Halted;
                        return RunOutcome::Halted;
                    }
                    if broke {
                        self.state = VmState::Suspended;
                        return RunOutcome::Breakpoint(self.pc);
                    }
                }
                Err(faulted) => {
                    self.state = VmState::Faulted(faulted);
                    return RunOutcome::Faulted(faulted);
                }
            }
        }
        self.state = VmState::Suspended;
        RunOutcome::BudgetExhausted
    }

    fn fault(&self, fault: Fault) -> FaultedAt {
        FaultedAt { fault, pc: self.pc }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;
    use crate::hal::SimHal;
    use plc_asm::consts::*;

    fn vm_with(code: &[u8]) -> Vm<SimHal> {
        let mem_cfg = MemoryConfig::default();
        let mut memory = MemoryMap::new(mem_cfg);
        memory.install_code(code);
        let mut vm = Vm::new(memory, VmLimits::default(), SimHal::new());
        let work_base = mem_cfg.work.base;
        vm.prepare_task(Address::from(mem_cfg.code.base), work_base, 256);
        vm
    }

    #[test]
    fn arithmetic_scenario_pushes_sum_and_halts() {
        // PUSH16 10; PUSH16 20; ADD; HALT
        let code = [
            OP_PUSH16, 10, 0, OP_PUSH16, 20, 0, OP_ADD, OP_HALT,
        ];
        let mut vm = vm_with(&code);
        let mut last_tos = None;
        let outcome = vm.run_until(100, &Default::default(), |ev| last_tos = ev.tos);
        assert_eq!(outcome, RunOutcome::Halted);
        assert_eq!(last_tos, Some(30));
    }

    #[test]
    fn division_by_zero_faults_without_reaching_halt() {
        let code = [OP_PUSH16, 10, 0, OP_PUSH16, 0, 0, OP_DIV, OP_HALT];
        let mut vm = vm_with(&code);
        let mut events = 0;
        let outcome = vm.run_until(100, &Default::default(), |_| events += 1);
        match outcome {
            RunOutcome::Faulted(f) => assert_eq!(f.fault, Fault::DivisionByZero),
            other => panic!("expected fault, got {other:?}"),
        }
        // DIV itself never completed, so no event for it and certainly none for HALT.
        assert_eq!(events, 2);
    }

    #[test]
    fn budget_exhaustion_stops_before_halt() {
        let code = [OP_NOP, OP_NOP, OP_NOP, OP_HALT];
        let mut vm = vm_with(&code);
        let outcome = vm.run_until(2, &Default::default(), |_| {});
        assert_eq!(outcome, RunOutcome::BudgetExhausted);
    }

    #[test]
    fn breakpoint_suspends_before_the_marked_opcode_runs() {
        let code = [OP_NOP, OP_HALT];
        let mut vm = vm_with(&code);
        let mut bps = std::collections::HashSet::new();
        let code_base = vm.memory().config().code.base;
        bps.insert(code_base + 1); // the HALT
        let outcome = vm.run_until(10, &bps, |_| {});
        assert_eq!(outcome, RunOutcome::Breakpoint(Address::from(code_base + 1)));
    }
}
