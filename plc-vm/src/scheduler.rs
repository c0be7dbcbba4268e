//! Cyclic multi-task scheduler (§4.3): a single-threaded cooperative scan
//! that picks one ready task per system tick, runs it to completion of one
//! cycle body, and applies the watchdog. Separates "the thing that
//! decides what runs next" from "the thing that runs it" —
//! `Scheduler` only ever drives one `Vm` it is handed, never owns
//! interpretation itself.

use std::collections::HashSet;

use plc_types::Address;

use crate::config::{MemoryConfig, SchedulerConfig, TASK_INTERVAL_MIN_US, TASK_STACK_MAX, TASK_STACK_MIN};
use crate::hal::Hal;
use crate::interpreter::{StepEvent, Vm};
use crate::memory::Region;

/// Whether a task is driven by the cyclic scan or (inertly, see
/// `TaskRuntime`'s doc) by an event this runtime does not yet define a
/// trigger for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Cyclic,
    /// Accepted by the loader and reported by `sched status`, but never
    /// selected to run — no event-trigger mechanism is defined yet.
    Event,
}

/// One task's static definition, after loader clamping (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDef {
    pub id: u16,
    pub kind: TaskKind,
    /// Lower value runs first when more than one task is ready.
    pub priority: u8,
    pub interval_us: u32,
    pub entry_point: Address,
    pub stack_size: u16,
}

impl TaskDef {
    /// Clamp `stack_size`/`interval_us` into the bounds §3 fixes, the way
    /// the loader must before registering any task it parses.
    pub fn clamped(mut self) -> Self {
        self.stack_size = self.stack_size.clamp(TASK_STACK_MIN, TASK_STACK_MAX);
        self.interval_us = self.interval_us.max(TASK_INTERVAL_MIN_US);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Ready,
    /// Faulted or watchdog-expired: not rescheduled until `reset`.
    Faulted,
}

struct TaskRuntime {
    def: TaskDef,
    work_base: u16,
    next_run_us: i64,
    state: RunState,
}

/// A snapshot of one task's status for `sched status` / `sched tasks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskReport {
    pub id: u16,
    pub priority: u8,
    pub interval_us: u32,
    pub kind: TaskKind,
    pub faulted: bool,
}

/// What happened when [`Scheduler::run_cycle`] drove one task through one
/// cycle body (§4.3's six-step contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// `HALT` ended the cycle normally. Carries elapsed time and whether
    /// the next-run deadline had already passed (an overrun).
    Completed { elapsed_us: i64, overrun: bool },
    /// The watchdog budget was exceeded; the task is now faulted and will
    /// not be considered again until `reset`.
    WatchdogExpired,
    /// The VM faulted (not a watchdog trip).
    Faulted,
    /// A breakpoint suspended execution mid-cycle (debug channel only).
    Breakpoint(Address),
}

/// Registers tasks, decides which one runs next, and drives it through
/// one cycle body at a time.
pub struct Scheduler {
    config: SchedulerConfig,
    memory_config: MemoryConfig,
    tasks: Vec<TaskRuntime>,
    next_work_offset: u16,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, memory_config: MemoryConfig) -> Self {
        Self { config, memory_config, tasks: Vec::new(), next_work_offset: 0 }
    }

    /// Register a task, carving its stack sub-region out of WORK
    /// (§5, "WORK is partitioned: each task has its own stack sub-region,
    /// assigned at load time"). Fails with `None` if no task slot is free
    /// or WORK has no room left for the requested stack.
    pub fn register(&mut self, def: TaskDef, now_us: i64) -> Option<()> {
        if self.tasks.len() >= self.config.max_tasks {
            return None;
        }
        let def = def.clamped();
        let work_base = self.memory_config.work.base.checked_add(self.next_work_offset)?;
        let end_offset = self.next_work_offset.checked_add(def.stack_size)?;
        if end_offset > self.memory_config.work.size {
            return None;
        }
        self.next_work_offset = end_offset;
        self.tasks.push(TaskRuntime {
            def,
            work_base,
            next_run_us: now_us,
            state: RunState::Ready,
        });
        Some(())
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Status snapshot for every registered task, in registration order.
    pub fn reports(&self) -> Vec<TaskReport> {
        self.tasks
            .iter()
            .map(|t| TaskReport {
                id: t.def.id,
                priority: t.def.priority,
                interval_us: t.def.interval_us,
                kind: t.def.kind,
                faulted: t.state == RunState::Faulted,
            })
            .collect()
    }

    /// The highest-priority (lowest `priority` value, ties broken by
    /// lowest `id`) `Cyclic` task whose `next_run_us` has passed. `Event`
    /// tasks and faulted tasks are never selected (§4.3 supplement).
    fn select(&self, now_us: i64) -> Option<usize> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| {
                t.def.kind == TaskKind::Cyclic
                    && t.state == RunState::Ready
                    && t.next_run_us <= now_us
            })
            .min_by_key(|(_, t)| (t.def.priority, t.def.id))
            .map(|(i, _)| i)
    }

    /// Pick the next ready task (if any) and drive it through exactly one
    /// cycle body, per §4.3's six-step contract. `now_us` is called
    /// repeatedly — once to pick a task and once per step to check the
    /// watchdog — so a test harness can feed deterministic synthetic time
    /// instead of a wall clock (this is also why the watchdog is a wall-time
    /// budget and not an opcode-count budget, unlike `Vm::run_until`'s
    /// debug-channel budget).
    pub fn run_cycle<H: Hal>(
        &mut self,
        mut now_us: impl FnMut() -> i64,
        vm: &mut Vm<H>,
        breakpoints: &HashSet<u16>,
        mut on_event: impl FnMut(&StepEvent),
    ) -> Option<(u16, CycleOutcome)> {
        let start_us = now_us();
        let idx = self.select(start_us)?;
        tracing::debug!(task_id = self.tasks[idx].def.id, start_us, "selected task for cycle");
        let (id, outcome, elapsed_us) = {
            let rt = &self.tasks[idx];
            let def = rt.def;
            let work_base = rt.work_base;

            vm.prepare_task(def.entry_point, work_base, def.stack_size);

            let ipi_len = vm.memory().region_bytes(Region::Ipi).len();
            let mut ipi_buf = vec![0u8; ipi_len];
            if vm.hal_mut().read_inputs(&mut ipi_buf).is_ok() {
                vm.memory_mut().bulk_copy_in(Region::Ipi, &ipi_buf);
            }

            let watchdog_us =
                (def.interval_us as u64 * self.config.watchdog_margin_pct as u64 / 100) as i64;

            let outcome = loop {
                if breakpoints.contains(&vm.pc().raw()) {
                    break CycleOutcome::Breakpoint(vm.pc());
                }
                match vm.step() {
                    Ok(event) => {
                        let halted = event.opcode == plc_asm::Opcode::Halt;
                        let broke = event.opcode == plc_asm::Opcode::Break;
                        on_event(&event);
                        if halted {
                            break CycleOutcome::Completed { elapsed_us: 0, overrun: false };
                        }
                        if broke {
                            break CycleOutcome::Breakpoint(vm.pc());
                        }
                    }
                    Err(_faulted) => break CycleOutcome::Faulted,
                }
                if now_us() - start_us > watchdog_us {
                    break CycleOutcome::WatchdogExpired;
                }
            };

            if !matches!(outcome, CycleOutcome::WatchdogExpired) {
                let opi_bytes = vm.memory().region_bytes(Region::Opi).to_vec();
                let _ = vm.hal_mut().write_outputs(&opi_bytes);
            }

            (def.id, outcome, now_us() - start_us)
        };

        let rt = &mut self.tasks[idx];
        match outcome {
            CycleOutcome::Completed { .. } => {
                let end_us = start_us + elapsed_us;
                let overrun = elapsed_us > rt.def.interval_us as i64;
                rt.next_run_us =
                    if overrun { end_us } else { start_us + rt.def.interval_us as i64 };
                Some((id, CycleOutcome::Completed { elapsed_us, overrun }))
            }
            CycleOutcome::WatchdogExpired => {
                tracing::warn!(
                    task_id = id,
                    interval_us = rt.def.interval_us,
                    margin_pct = self.config.watchdog_margin_pct,
                    "task watchdog expired"
                );
                rt.state = RunState::Faulted;
                Some((id, CycleOutcome::WatchdogExpired))
            }
            CycleOutcome::Faulted => {
                rt.state = RunState::Faulted;
                Some((id, CycleOutcome::Faulted))
            }
            CycleOutcome::Breakpoint(addr) => Some((id, CycleOutcome::Breakpoint(addr))),
        }
    }

    /// Clear every task's faulted state and deadline bookkeeping, for an
    /// operator `reset` (§7's "VM faults are recoverable only through
    /// reset"). Memory itself is reset separately by the caller via
    /// `MemoryMap::clear_volatile`/`clear_retain`.
    pub fn reset(&mut self, now_us: i64) {
        for t in &mut self.tasks {
            t.state = RunState::Ready;
            t.next_run_us = now_us;
        }
    }
}
