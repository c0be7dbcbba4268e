//! §8 scenario 2: `PUSH16 10; PUSH16 0; DIV; HALT` halts with
//! `error.code = DivisionByZero` and no `HALT` frame follows.

use plc_asm::consts::*;
use plc_asm::{Fault, Opcode};
use plc_types::Address;

use plc_vm::config::{MemoryConfig, VmLimits};
use plc_vm::hal::SimHal;
use plc_vm::interpreter::{RunOutcome, Vm};
use plc_vm::memory::MemoryMap;

#[test]
fn division_by_zero_faults_before_halt_runs() {
    let cfg = MemoryConfig::default();
    let mut memory = MemoryMap::new(cfg);
    memory.install_code(&[OP_PUSH16, 10, 0, OP_PUSH16, 0, 0, OP_DIV, OP_HALT]);
    let mut vm: Vm<SimHal> = Vm::new(memory, VmLimits::default(), SimHal::new());
    vm.prepare_task(Address::from(cfg.code.base), cfg.work.base, 256);

    let mut opcodes = Vec::new();
    let outcome = vm.run_until(100, &Default::default(), |ev| opcodes.push(ev.opcode));

    match outcome {
        RunOutcome::Faulted(f) => {
            assert_eq!(f.fault, Fault::DivisionByZero);
            assert_eq!(f.fault.code(), 3);
        }
        other => panic!("expected a fault, got {other:?}"),
    }
    assert!(!opcodes.contains(&Opcode::Halt), "HALT must never run after the fault");
}
