//! Integer/float arithmetic, bitwise logic, comparison and conversion
//! opcode bodies (§4.2). Each method pops its operands, computes, and
//! pushes exactly one result cell — the LIFO discipline itself lives in
//! [`super::stack`].

use plc_asm::Fault;
use plc_types::{sign_extend8, sign_extend16, zero_extend8, zero_extend16};

use crate::hal::Hal;

use super::Vm;

impl<H: Hal> Vm<H> {
    pub(super) fn add(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()?;
        let a = self.pop_cell()?;
        self.push_cell(a.wrapping_add(b))
    }

    pub(super) fn sub(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()?;
        let a = self.pop_cell()?;
        self.push_cell(a.wrapping_sub(b))
    }

    pub(super) fn mul(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()?;
        let a = self.pop_cell()?;
        self.push_cell(a.wrapping_mul(b))
    }

    /// `INT_MIN / -1` wraps back to `INT_MIN` (two's-complement has no
    /// positive counterpart to `INT_MIN`); only a zero divisor faults.
    pub(super) fn div(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()? as i32;
        let a = self.pop_cell()? as i32;
        if b == 0 {
            return Err(Fault::DivisionByZero);
        }
        self.push_cell(a.wrapping_div(b) as u32)
    }

    pub(super) fn mod_(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()? as i32;
        let a = self.pop_cell()? as i32;
        if b == 0 {
            return Err(Fault::DivisionByZero);
        }
        self.push_cell(a.wrapping_rem(b) as u32)
    }

    pub(super) fn neg(&mut self) -> Result<(), Fault> {
        let a = self.pop_cell()? as i32;
        self.push_cell(a.wrapping_neg() as u32)
    }

    /// `abs(INT_MIN)` wraps back to `INT_MIN`, same reasoning as `DIV`.
    pub(super) fn abs(&mut self) -> Result<(), Fault> {
        let a = self.pop_cell()? as i32;
        self.push_cell(a.wrapping_abs() as u32)
    }

    pub(super) fn addf(&mut self) -> Result<(), Fault> {
        let b = f32::from_bits(self.pop_cell()?);
        let a = f32::from_bits(self.pop_cell()?);
        self.push_cell((a + b).to_bits())
    }

    pub(super) fn subf(&mut self) -> Result<(), Fault> {
        let b = f32::from_bits(self.pop_cell()?);
        let a = f32::from_bits(self.pop_cell()?);
        self.push_cell((a - b).to_bits())
    }

    pub(super) fn mulf(&mut self) -> Result<(), Fault> {
        let b = f32::from_bits(self.pop_cell()?);
        let a = f32::from_bits(self.pop_cell()?);
        self.push_cell((a * b).to_bits())
    }

    /// Division by zero yields ±∞ or NaN per IEEE-754; never a fault.
    pub(super) fn divf(&mut self) -> Result<(), Fault> {
        let b = f32::from_bits(self.pop_cell()?);
        let a = f32::from_bits(self.pop_cell()?);
        self.push_cell((a / b).to_bits())
    }

    pub(super) fn negf(&mut self) -> Result<(), Fault> {
        let a = f32::from_bits(self.pop_cell()?);
        self.push_cell((-a).to_bits())
    }

    pub(super) fn absf(&mut self) -> Result<(), Fault> {
        let a = f32::from_bits(self.pop_cell()?);
        self.push_cell(a.abs().to_bits())
    }

    pub(super) fn and(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()?;
        let a = self.pop_cell()?;
        self.push_cell(a & b)
    }

    pub(super) fn or(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()?;
        let a = self.pop_cell()?;
        self.push_cell(a | b)
    }

    pub(super) fn xor(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()?;
        let a = self.pop_cell()?;
        self.push_cell(a ^ b)
    }

    pub(super) fn not(&mut self) -> Result<(), Fault> {
        let a = self.pop_cell()?;
        self.push_cell(!a)
    }

    /// Shift counts are taken modulo the 32-bit operand width;
    /// `wrapping_shl`/`wrapping_shr` already do this.
    pub(super) fn shl(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()?;
        let a = self.pop_cell()?;
        self.push_cell(a.wrapping_shl(b))
    }

    pub(super) fn shr(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()?;
        let a = self.pop_cell()?;
        self.push_cell(a.wrapping_shr(b))
    }

    pub(super) fn sar(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()?;
        let a = self.pop_cell()? as i32;
        self.push_cell(a.wrapping_shr(b) as u32)
    }

    pub(super) fn cmp_eq(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()?;
        let a = self.pop_cell()?;
        self.push_cell((a == b) as u32)
    }

    pub(super) fn cmp_ne(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()?;
        let a = self.pop_cell()?;
        self.push_cell((a != b) as u32)
    }

    pub(super) fn cmp_lt(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()? as i32;
        let a = self.pop_cell()? as i32;
        self.push_cell((a < b) as u32)
    }

    pub(super) fn cmp_le(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()? as i32;
        let a = self.pop_cell()? as i32;
        self.push_cell((a <= b) as u32)
    }

    pub(super) fn cmp_gt(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()? as i32;
        let a = self.pop_cell()? as i32;
        self.push_cell((a > b) as u32)
    }

    pub(super) fn cmp_ge(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()? as i32;
        let a = self.pop_cell()? as i32;
        self.push_cell((a >= b) as u32)
    }

    pub(super) fn cmp_ltu(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()?;
        let a = self.pop_cell()?;
        self.push_cell((a < b) as u32)
    }

    pub(super) fn cmp_gtu(&mut self) -> Result<(), Fault> {
        let b = self.pop_cell()?;
        let a = self.pop_cell()?;
        self.push_cell((a > b) as u32)
    }

    pub(super) fn i2f(&mut self) -> Result<(), Fault> {
        let a = self.pop_cell()? as i32;
        self.push_cell((a as f32).to_bits())
    }

    /// Truncates toward zero. NaN/±∞ yield exactly `0`; any other
    /// in-range-for-`f32`-but-out-of-range-for-`i32` value saturates to
    /// `i32::MIN`/`i32::MAX` and is counted so a caller can surface a
    /// non-fatal `warn` (`SPEC_FULL.md` §4.2's `F2I` supplement) — neither
    /// case corrupts memory, matching the hard contract.
    pub(super) fn f2i(&mut self) -> Result<(), Fault> {
        let a = f32::from_bits(self.pop_cell()?);
        let v = if a.is_nan() || a.is_infinite() {
            0
        } else if a >= i32::MAX as f32 {
            self.f2i_saturations += 1;
            i32::MAX
        } else if a <= i32::MIN as f32 {
            self.f2i_saturations += 1;
            i32::MIN
        } else {
            a as i32
        };
        self.push_cell(v as u32)
    }

    pub(super) fn i2b(&mut self) -> Result<(), Fault> {
        let a = self.pop_cell()?;
        self.push_cell((a != 0) as u32)
    }

    pub(super) fn ext8(&mut self) -> Result<(), Fault> {
        let a = self.pop_cell()?;
        self.push_cell(sign_extend8(a))
    }

    pub(super) fn ext16(&mut self) -> Result<(), Fault> {
        let a = self.pop_cell()?;
        self.push_cell(sign_extend16(a))
    }

    pub(super) fn zext8(&mut self) -> Result<(), Fault> {
        let a = self.pop_cell()?;
        self.push_cell(zero_extend8(a))
    }

    pub(super) fn zext16(&mut self) -> Result<(), Fault> {
        let a = self.pop_cell()?;
        self.push_cell(zero_extend16(a))
    }
}
