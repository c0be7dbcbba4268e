use plc_asm::Fault;
use plc_types::{Address, Cell, CELL_SIZE};

use crate::hal::Hal;

use super::Vm;

impl<H: Hal> Vm<H> {
    fn cell_address(&self, offset: u16) -> Address {
        Address::from(self.work_base + offset)
    }

    /// Push one cell onto the operand stack. Faults if doing so would
    /// make the operand stack meet the call stack (§4.2's WORK-layout
    /// supplement: operand stack grows up from 0, call stack grows down
    /// from `work_size`).
    pub(super) fn push_cell(&mut self, value: Cell) -> Result<(), Fault> {
        let next_sp = self
            .sp
            .checked_add(CELL_SIZE as u16)
            .ok_or(Fault::StackOverflow)?;
        if next_sp > self.rsp {
            return Err(Fault::StackOverflow);
        }
        let addr = self.cell_address(self.sp);
        self.memory.write_u32(addr, value)?;
        self.sp = next_sp;
        Ok(())
    }

    /// Pop one cell off the operand stack.
    pub(super) fn pop_cell(&mut self) -> Result<Cell, Fault> {
        if self.sp < CELL_SIZE as u16 {
            return Err(Fault::StackUnderflow);
        }
        self.sp -= CELL_SIZE as u16;
        let addr = self.cell_address(self.sp);
        self.memory.read_u32(addr)
    }

    /// Peek the cell `depth` cells from the top without popping (`depth
    /// == 0` is the top itself). Used by `DUP`/`OVER`.
    pub(super) fn peek_cell(&self, depth: u16) -> Result<Cell, Fault> {
        let back = (depth + 1)
            .checked_mul(CELL_SIZE as u16)
            .ok_or(Fault::StackUnderflow)?;
        if back > self.sp {
            return Err(Fault::StackUnderflow);
        }
        let addr = self.cell_address(self.sp - back);
        self.memory.read_u32(addr)
    }

    fn poke_cell(&mut self, depth: u16, value: Cell) -> Result<(), Fault> {
        let back = (depth + 1) * CELL_SIZE as u16;
        if back > self.sp {
            return Err(Fault::StackUnderflow);
        }
        let addr = self.cell_address(self.sp - back);
        self.memory.write_u32(addr, value)
    }

    pub(super) fn dup(&mut self) -> Result<(), Fault> {
        let top = self.peek_cell(0)?;
        self.push_cell(top)
    }

    pub(super) fn drop1(&mut self) -> Result<(), Fault> {
        self.pop_cell().map(|_| ())
    }

    pub(super) fn swap(&mut self) -> Result<(), Fault> {
        let a = self.peek_cell(1)?;
        let b = self.peek_cell(0)?;
        self.poke_cell(1, b)?;
        self.poke_cell(0, a)
    }

    pub(super) fn over(&mut self) -> Result<(), Fault> {
        let second = self.peek_cell(1)?;
        self.push_cell(second)
    }

    /// Rotate the top three cells: `(a b c) -> (b c a)`, the usual Forth
    /// `ROT`.
    pub(super) fn rot(&mut self) -> Result<(), Fault> {
        let a = self.peek_cell(2)?;
        let b = self.peek_cell(1)?;
        let c = self.peek_cell(0)?;
        self.poke_cell(2, b)?;
        self.poke_cell(1, c)?;
        self.poke_cell(0, a)
    }

    /// Push a 64-bit value as two cells: low word first (deeper), high
    /// word second (on top) — §4.2's "64-bit operations consume two
    /// adjacent cells".
    pub(super) fn push_u64(&mut self, value: u64) -> Result<(), Fault> {
        self.push_cell(value as u32)?;
        self.push_cell((value >> 32) as u32)
    }

    /// Pop a 64-bit value pushed by [`Self::push_u64`].
    pub(super) fn pop_u64(&mut self) -> Result<u64, Fault> {
        let hi = self.pop_cell()? as u64;
        let lo = self.pop_cell()? as u64;
        Ok((hi << 32) | lo)
    }

    /// Push a return address onto the call (return-address) stack, which
    /// grows down from `work_size`. Faults with `CallStackOverflow` if
    /// the configured call-depth limit or the stack/call-stack boundary
    /// would be exceeded.
    pub(super) fn push_return_address(&mut self, addr: Address) -> Result<(), Fault> {
        if self.call_depth >= self.limits.max_call_depth {
            return Err(Fault::CallStackOverflow);
        }
        let next_rsp = self.rsp.checked_sub(2).ok_or(Fault::CallStackOverflow)?;
        if next_rsp < self.sp {
            return Err(Fault::CallStackOverflow);
        }
        let slot = Address::from(self.work_base + next_rsp);
        self.memory.write_u16(slot, addr.raw())?;
        self.rsp = next_rsp;
        self.call_depth += 1;
        Ok(())
    }

    /// Pop a return address pushed by [`Self::push_return_address`].
    /// `RET` with nothing to return to is modeled as the same
    /// `StackUnderflow` the operand stack uses — the closed fault
    /// taxonomy has no separate "call stack underflow" row.
    pub(super) fn pop_return_address(&mut self) -> Result<Address, Fault> {
        if self.rsp + 2 > self.work_size {
            return Err(Fault::StackUnderflow);
        }
        let slot = Address::from(self.work_base + self.rsp);
        let raw = self.memory.read_u16(slot)?;
        self.rsp += 2;
        self.call_depth = self.call_depth.saturating_sub(1);
        Ok(Address::from(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MemoryConfig, VmLimits};
    use crate::hal::SimHal;
    use crate::memory::MemoryMap;

    fn vm() -> Vm<SimHal> {
        let cfg = MemoryConfig::default();
        let memory = MemoryMap::new(cfg);
        let mut vm = Vm::new(memory, VmLimits::default(), SimHal::new());
        vm.prepare_task(Address::new(0), cfg.work.base, 64);
        vm
    }

    #[test]
    fn push_pop_is_lifo() {
        let mut vm = vm();
        vm.push_cell(1).unwrap();
        vm.push_cell(2).unwrap();
        vm.push_cell(3).unwrap();
        assert_eq!(vm.pop_cell().unwrap(), 3);
        assert_eq!(vm.pop_cell().unwrap(), 2);
        assert_eq!(vm.pop_cell().unwrap(), 1);
    }

    #[test]
    fn pop_on_empty_underflows() {
        let mut vm = vm();
        assert_eq!(vm.pop_cell(), Err(Fault::StackUnderflow));
    }

    #[test]
    fn stack_overflow_at_exact_boundary() {
        let mut vm = vm();
        // work_size = 64 bytes = 16 cells; filling all 16 must succeed,
        // the 17th must fail deterministically (§8 boundary law).
        for _ in 0..16 {
            vm.push_cell(0).unwrap();
        }
        assert_eq!(vm.push_cell(0), Err(Fault::StackOverflow));
    }

    #[test]
    fn swap_exchanges_top_two() {
        let mut vm = vm();
        vm.push_cell(1).unwrap();
        vm.push_cell(2).unwrap();
        vm.swap().unwrap();
        assert_eq!(vm.pop_cell().unwrap(), 1);
        assert_eq!(vm.pop_cell().unwrap(), 2);
    }

    #[test]
    fn rot_moves_third_cell_to_top() {
        let mut vm = vm();
        vm.push_cell(1).unwrap();
        vm.push_cell(2).unwrap();
        vm.push_cell(3).unwrap();
        vm.rot().unwrap();
        assert_eq!(vm.pop_cell().unwrap(), 1);
        assert_eq!(vm.pop_cell().unwrap(), 3);
        assert_eq!(vm.pop_cell().unwrap(), 2);
    }

    #[test]
    fn call_stack_and_operand_stack_share_work_and_can_collide() {
        let mut vm = vm();
        // `work_size` is 64 bytes and each return address is 2 bytes, so
        // the call stack (growing down from `rsp = 64`) has room for 32
        // slots before it meets the (empty) operand stack from the top
        // down.
        for _ in 0..32 {
            vm.push_return_address(Address::new(0)).unwrap();
        }
        assert_eq!(
            vm.push_return_address(Address::new(0)),
            Err(Fault::CallStackOverflow)
        );
    }

    #[test]
    fn u64_round_trips_across_two_cells() {
        let mut vm = vm();
        vm.push_u64(0x1122_3344_5566_7788).unwrap();
        assert_eq!(vm.pop_u64().unwrap(), 0x1122_3344_5566_7788);
    }
}
