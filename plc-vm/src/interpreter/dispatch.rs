//! The central decode-and-execute loop (§4.2, §9's "express the ISA as a
//! tagged variant... a central interpreter matches on the variant").
//! One big match over the decoded instruction; each opcode's actual
//! work lives in [`super::alu`]/[`super::stack`]/[`super::fb`] and this
//! module is purely the wiring: fetch, decode, branch-target
//! bookkeeping, dispatch.

use plc_asm::{FaultedAt, Opcode};
use plc_types::Address;

use crate::hal::Hal;
use crate::memory::Region;

use super::{fb, flow, StepEvent, Vm};

impl<H: Hal> Vm<H> {
    fn hal_tick(&mut self) -> u32 {
        self.hal.tick().unwrap_or(0)
    }
}

/// Fetch, decode and execute the instruction at `fetch_pc`, leaving `pc`
/// at `fetch_pc` on any fault (§8 invariant 3) and advancing it otherwise
/// (to the jump/call/ret target, or past the instruction by default).
fn run_one<H: Hal>(
    vm: &mut Vm<H>,
    fetch_pc: Address,
) -> Result<(Opcode, Option<fb::FbFrame>), plc_asm::Fault> {
    use Opcode::*;

    let code_base = vm.memory().config().code.base;
    let offset = fetch_pc
        .raw()
        .checked_sub(code_base)
        .ok_or(plc_asm::Fault::IllegalBranch)?;
    let ins = plc_asm::decode(vm.memory().region_bytes(Region::Code), offset)?;
    let next_pc = Address::from(code_base.wrapping_add(offset).wrapping_add(ins.len));
    let mut new_pc = next_pc;
    let mut fb_frame = None;

    match ins.opcode {
        Nop | Halt | Break => {}
        GetTicks => {
            let t = vm.hal_tick();
            vm.push_cell(t)?;
        }
        Dup => vm.dup()?,
        Drop => vm.drop1()?,
        Swap => vm.swap()?,
        Over => vm.over()?,
        Rot => vm.rot()?,
        Add => vm.add()?,
        Sub => vm.sub()?,
        Mul => vm.mul()?,
        Div => vm.div()?,
        Mod => vm.mod_()?,
        Neg => vm.neg()?,
        Abs => vm.abs()?,
        Addf => vm.addf()?,
        Subf => vm.subf()?,
        Mulf => vm.mulf()?,
        Divf => vm.divf()?,
        Negf => vm.negf()?,
        Absf => vm.absf()?,
        And => vm.and()?,
        Or => vm.or()?,
        Xor => vm.xor()?,
        Not => vm.not()?,
        Shl => vm.shl()?,
        Shr => vm.shr()?,
        Sar => vm.sar()?,
        Eq => vm.cmp_eq()?,
        Ne => vm.cmp_ne()?,
        Lt => vm.cmp_lt()?,
        Le => vm.cmp_le()?,
        Gt => vm.cmp_gt()?,
        Ge => vm.cmp_ge()?,
        Ltu => vm.cmp_ltu()?,
        Gtu => vm.cmp_gtu()?,
        I2f => vm.i2f()?,
        F2i => vm.f2i()?,
        I2b => vm.i2b()?,
        Ext8 => vm.ext8()?,
        Ext16 => vm.ext16()?,
        Zext8 => vm.zext8()?,
        Zext16 => vm.zext16()?,
        Ret => {
            let target = vm.pop_return_address()?;
            flow::check_branch(vm, target)?;
            new_pc = target;
        }
        Push8 | Push16 | Push32 => {
            let cell = ins
                .immediate
                .as_push_cell()
                .expect("push opcodes always carry an immediate");
            vm.push_cell(cell)?;
        }
        Jr => {
            let offset = ins
                .immediate
                .as_relative_offset()
                .expect("JR always carries a relative offset");
            let target = flow::relative_target(next_pc, offset);
            flow::check_branch(vm, target)?;
            new_pc = target;
        }
        Jrz => {
            let offset = ins.immediate.as_relative_offset().expect("JRZ operand");
            let taken = vm.pop_cell()? == 0;
            if taken {
                let target = flow::relative_target(next_pc, offset);
                flow::check_branch(vm, target)?;
                new_pc = target;
            }
        }
        Jrnz => {
            let offset = ins.immediate.as_relative_offset().expect("JRNZ operand");
            let taken = vm.pop_cell()? != 0;
            if taken {
                let target = flow::relative_target(next_pc, offset);
                flow::check_branch(vm, target)?;
                new_pc = target;
            }
        }
        Load8 => {
            let addr = Address::from(ins.immediate.as_address().expect("LOAD8 operand"));
            let v = vm.memory().read_u8(addr)?;
            vm.push_cell(v as u32)?;
        }
        Load16 => {
            let addr = Address::from(ins.immediate.as_address().expect("LOAD16 operand"));
            let v = vm.memory().read_u16(addr)?;
            vm.push_cell(v as u32)?;
        }
        Load32 => {
            let addr = Address::from(ins.immediate.as_address().expect("LOAD32 operand"));
            let v = vm.memory().read_u32(addr)?;
            vm.push_cell(v)?;
        }
        Load64 => {
            let addr = Address::from(ins.immediate.as_address().expect("LOAD64 operand"));
            let v = vm.memory().read_u64(addr)?;
            vm.push_u64(v)?;
        }
        Store8 => {
            let addr = Address::from(ins.immediate.as_address().expect("STORE8 operand"));
            let v = vm.pop_cell()?;
            vm.memory_mut().write_u8(addr, v as u8)?;
        }
        Store16 => {
            let addr = Address::from(ins.immediate.as_address().expect("STORE16 operand"));
            let v = vm.pop_cell()?;
            vm.memory_mut().write_u16(addr, v as u16)?;
        }
        Store32 => {
            let addr = Address::from(ins.immediate.as_address().expect("STORE32 operand"));
            let v = vm.pop_cell()?;
            vm.memory_mut().write_u32(addr, v)?;
        }
        Store64 => {
            let addr = Address::from(ins.immediate.as_address().expect("STORE64 operand"));
            let v = vm.pop_u64()?;
            vm.memory_mut().write_u64(addr, v)?;
        }
        Jmp => {
            let target = Address::from(ins.immediate.as_address().expect("JMP operand"));
            flow::check_branch(vm, target)?;
            new_pc = target;
        }
        Jz => {
            let target = Address::from(ins.immediate.as_address().expect("JZ operand"));
            let taken = vm.pop_cell()? == 0;
            if taken {
                flow::check_branch(vm, target)?;
                new_pc = target;
            }
        }
        Jnz => {
            let target = Address::from(ins.immediate.as_address().expect("JNZ operand"));
            let taken = vm.pop_cell()? != 0;
            if taken {
                flow::check_branch(vm, target)?;
                new_pc = target;
            }
        }
        Call => {
            let target = Address::from(ins.immediate.as_address().expect("CALL operand"));
            if let Some(kind) = fb::FbKind::from_entry(target) {
                let instance = Address::from(vm.pop_cell()? as u16);
                let tick = vm.hal_tick();
                fb_frame = Some(fb::invoke(kind, vm.memory_mut(), instance, tick)?);
            } else {
                flow::check_branch(vm, target)?;
                vm.push_return_address(next_pc)?;
                new_pc = target;
            }
        }
    }

    vm.pc = new_pc;
    Ok((ins.opcode, fb_frame))
}

#[tracing::instrument(level = "trace", skip(vm), fields(pc = vm.pc().raw()))]
pub(super) fn step<H: Hal>(vm: &mut Vm<H>) -> Result<StepEvent, FaultedAt> {
    let fetch_pc = vm.pc();
    match run_one(vm, fetch_pc) {
        Ok((opcode, fb)) => {
            tracing::trace!(?opcode, pc = fetch_pc.raw(), "stepped");
            Ok(StepEvent {
                opcode,
                pc: fetch_pc,
                sp_cells: vm.stack_depth(),
                tos: vm.peek_cell(0).ok(),
                fb,
            })
        }
        Err(fault) => {
            tracing::trace!(?fault, pc = fetch_pc.raw(), "faulted");
            Err(FaultedAt { fault, pc: fetch_pc })
        }
    }
}
