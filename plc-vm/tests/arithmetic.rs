//! §8 scenario 1: `PUSH16 10; PUSH16 20; ADD; HALT` leaves 30 on the stack.

use plc_asm::consts::*;
use plc_types::Address;

use plc_vm::config::{MemoryConfig, VmLimits};
use plc_vm::hal::SimHal;
use plc_vm::interpreter::{RunOutcome, Vm};
use plc_vm::memory::MemoryMap;

#[test]
fn arithmetic_scenario_leaves_thirty_on_the_stack() {
    let cfg = MemoryConfig::default();
    let mut memory = MemoryMap::new(cfg);
    memory.install_code(&[OP_PUSH16, 10, 0, OP_PUSH16, 20, 0, OP_ADD, OP_HALT]);
    let mut vm: Vm<SimHal> = Vm::new(memory, VmLimits::default(), SimHal::new());
    vm.prepare_task(Address::from(cfg.code.base), cfg.work.base, 256);

    let mut opcodes = Vec::new();
    let mut last_tos = None;
    let outcome = vm.run_until(100, &Default::default(), |ev| {
        opcodes.push(ev.opcode);
        last_tos = ev.tos;
    });

    assert_eq!(outcome, RunOutcome::Halted);
    assert_eq!(last_tos, Some(30));
    assert_eq!(
        opcodes,
        vec![
            plc_asm::Opcode::Push16,
            plc_asm::Opcode::Push16,
            plc_asm::Opcode::Add,
            plc_asm::Opcode::Halt,
        ]
    );
}
