//! §8 scenario 6: a task whose body never halts trips the watchdog at
//! `interval_us * watchdog_margin_pct / 100`, faults exactly once, and is
//! never rescheduled afterward.

use plc_asm::consts::*;
use plc_vm::config::{MemoryConfig, SchedulerConfig, VmLimits};
use plc_vm::hal::SimHal;
use plc_vm::scheduler::CycleOutcome;
use plc_vm::Runtime;

fn build_file(code: &[u8], interval_us: u32) -> Vec<u8> {
    const HEADER_LEN: usize = 32;

    let mut task = Vec::new();
    task.extend_from_slice(&1u16.to_le_bytes()); // id
    task.push(0); // kind: cyclic
    task.push(1); // priority
    task.extend_from_slice(&interval_us.to_le_bytes());
    task.extend_from_slice(&0x5000u16.to_le_bytes()); // entry_point == CODE base
    task.extend_from_slice(&256u16.to_le_bytes()); // stack_size
    task.extend_from_slice(&0u32.to_le_bytes()); // reserved

    let mut header = vec![0u8; HEADER_LEN];
    header[0..4].copy_from_slice(b"ZPLC");
    header[4] = 1;
    header[12..16].copy_from_slice(&(code.len() as u32).to_le_bytes());
    header[16..20].copy_from_slice(&(task.len() as u32).to_le_bytes());
    header[20..22].copy_from_slice(&0x5000u16.to_le_bytes()); // entry_point
    header[22..24].copy_from_slice(&2u16.to_le_bytes()); // segment_count

    let mut table = Vec::new();
    table.extend_from_slice(&0u16.to_le_bytes()); // SEG_TYPE_CODE
    table.extend_from_slice(&0u16.to_le_bytes());
    table.extend_from_slice(&(code.len() as u32).to_le_bytes());
    table.extend_from_slice(&1u16.to_le_bytes()); // SEG_TYPE_TASK
    table.extend_from_slice(&0u16.to_le_bytes());
    table.extend_from_slice(&(task.len() as u32).to_le_bytes());

    let mut file = header;
    file.extend_from_slice(&table);
    file.extend_from_slice(code);
    file.extend_from_slice(&task);

    let mut zeroed = file.clone();
    zeroed[8..12].copy_from_slice(&[0, 0, 0, 0]);
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&zeroed);
    file[8..12].copy_from_slice(&hasher.finalize().to_le_bytes());
    file
}

#[test]
fn watchdog_trips_once_and_task_is_never_rescheduled() {
    // JMP 0x5000: a self-loop that never reaches HALT.
    let code = [OP_JMP, 0x00, 0x50];
    let file = build_file(&code, 10_000);

    let mut rt: Runtime<SimHal> = Runtime::new(
        MemoryConfig::default(),
        VmLimits::default(),
        SchedulerConfig::default(),
        SimHal::new(),
    );
    rt.load(&file, 0).expect("well-formed program loads");

    let mut t = 0i64;
    let mut polls = 0;
    let outcome = rt.run_cycle(
        || {
            polls += 1;
            // Exceed the 20_000us budget (200% of a 10_000us interval) on
            // the second poll onward.
            t = if polls > 1 { 25_000 } else { 0 };
            t
        },
        |_| {},
    );

    assert_eq!(outcome, Some((1, CycleOutcome::WatchdogExpired)));
    let report = &rt.task_reports()[0];
    assert!(report.faulted);

    // A faulted task is not picked up by any later cycle.
    let second = rt.run_cycle(|| 1_000_000, |_| {});
    assert_eq!(second, None);
}
