//! §8 scenario 4: `TON(IN := TRUE, PT := 100ms)` emits `q = false` for the
//! first ~100ms of wall-clock time, then `q = true` (±15% boundary
//! tolerance, per `SimHal`'s millisecond-resolution tick).

use std::thread::sleep;
use std::time::Duration;

use plc_asm::consts::*;
use plc_types::Address;

use plc_vm::config::{MemoryConfig, VmLimits};
use plc_vm::hal::SimHal;
use plc_vm::interpreter::{fb::FbKind, Vm};
use plc_vm::memory::MemoryMap;

fn invoke_ton_once(vm: &mut Vm<SimHal>, code_base: u16, work_base: u16) -> bool {
    vm.prepare_task(Address::from(code_base), work_base, 256);
    let mut q = None;
    vm.run_until(10, &Default::default(), |ev| {
        if let Some(frame) = &ev.fb {
            q = Some(frame.q);
        }
    });
    q.expect("CALL to the TON entry point must produce an fb frame")
}

#[test]
fn ton_transitions_from_false_to_true_around_its_preset() {
    let cfg = MemoryConfig::default();
    let mut memory = MemoryMap::new(cfg);

    let instance = cfg.work.base + 512;
    let entry = FbKind::Ton.entry().raw();
    let code = [
        OP_PUSH16,
        (instance & 0xFF) as u8,
        (instance >> 8) as u8,
        OP_CALL,
        (entry & 0xFF) as u8,
        (entry >> 8) as u8,
        OP_HALT,
    ];
    memory.install_code(&code);

    let mut vm: Vm<SimHal> = Vm::new(memory, VmLimits::default(), SimHal::new());
    vm.memory_mut().write_u8(Address::new(instance), 1).unwrap(); // IN = true
    vm.memory_mut().write_u32(Address::new(instance) + 2, 100_000).unwrap(); // PT = 100ms

    let q_immediate = invoke_ton_once(&mut vm, cfg.code.base, cfg.work.base);
    assert!(!q_immediate, "Q must still be false immediately after IN goes true");

    sleep(Duration::from_millis(40));
    let q_mid = invoke_ton_once(&mut vm, cfg.code.base, cfg.work.base);
    assert!(!q_mid, "Q must still be false well before the preset elapses");

    // Clear the 15%-tolerance boundary from the low side: sleep past 115ms
    // total before checking again.
    sleep(Duration::from_millis(90));
    let q_late = invoke_ton_once(&mut vm, cfg.code.base, cfg.work.base);
    assert!(q_late, "Q must be true once elapsed time has passed the preset");
}
