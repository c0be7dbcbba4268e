use crate::consts::*;

/// Number of immediate-operand bytes that follow an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandWidth {
    /// `NOP`, `ADD`, `EQ`, ... — the whole family in `0x00..=0x3F`.
    None,
    /// `PUSH8`, `JR`, ... — the whole family in `0x40..=0x7F`.
    One,
    /// `LOAD16`, `JMP`, `CALL`, ... — the whole family in `0x80..=0xBF`.
    Two,
    /// `PUSH32` — the whole family in `0xC0..=0xFF`.
    Four,
}

impl OperandWidth {
    /// Number of bytes this width occupies.
    pub const fn bytes(self) -> usize {
        match self {
            OperandWidth::None => 0,
            OperandWidth::One => 1,
            OperandWidth::Two => 2,
            OperandWidth::Four => 4,
        }
    }

    /// The operand width is a pure function of the opcode byte's
    /// high-order bits (§4.2's instruction encoding table) — it does not
    /// depend on whether the byte names a *known* opcode, which is what
    /// lets the decoder compute how many bytes to consume (and so detect
    /// [`crate::Fault::TruncatedInstruction`]) even for a byte that will
    /// turn out to be a hole.
    pub const fn of_raw_opcode(raw: u8) -> Self {
        match raw {
            0x00..=RANGE_0_BYTES_END => OperandWidth::None,
            RANGE_1_BYTE_START..=RANGE_1_BYTE_END => OperandWidth::One,
            RANGE_2_BYTES_START..=RANGE_2_BYTES_END => OperandWidth::Two,
            _ => OperandWidth::Four,
        }
    }
}

/// The closed set of VM opcodes (§4.2).
///
/// Opcode bytes not listed here fall in a "hole" of their encoding range
/// and are rejected by [`crate::decode`] with
/// [`crate::Fault::IllegalInstruction`]; see [`OperandWidth::of_raw_opcode`]
/// for why a hole's operand width is still well-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Opcode {
    /// Does nothing, advances past itself.
    Nop = OP_NOP,
    /// Terminal: ends the cycle. Not a fault.
    Halt = OP_HALT,
    /// Hands control to the debug channel unconditionally, as if a
    /// breakpoint had just fired at this address.
    Break = OP_BREAK,
    /// Pushes the HAL's monotonic millisecond tick counter.
    GetTicks = OP_GET_TICKS,

    /// Duplicates the top cell.
    Dup = OP_DUP,
    /// Discards the top cell.
    Drop = OP_DROP,
    /// Swaps the top two cells.
    Swap = OP_SWAP,
    /// Copies the second cell to the top.
    Over = OP_OVER,
    /// Rotates the top three cells.
    Rot = OP_ROT,

    /// Signed/unsigned 32-bit add; wraps on overflow, never faults.
    Add = OP_ADD,
    /// Signed/unsigned 32-bit subtract; wraps on overflow, never faults.
    Sub = OP_SUB,
    /// Signed/unsigned 32-bit multiply; wraps on overflow, never faults.
    Mul = OP_MUL,
    /// Signed 32-bit division. Divisor `0` is [`crate::Fault::DivisionByZero`];
    /// `INT_MIN / -1` wraps to `INT_MIN` rather than faulting.
    Div = OP_DIV,
    /// Signed 32-bit remainder. Divisor `0` is [`crate::Fault::DivisionByZero`].
    Mod = OP_MOD,
    /// Two's-complement negation.
    Neg = OP_NEG,
    /// Absolute value; `abs(INT_MIN)` wraps to `INT_MIN`.
    Abs = OP_ABS,

    /// IEEE-754 32-bit add.
    Addf = OP_ADDF,
    /// IEEE-754 32-bit subtract.
    Subf = OP_SUBF,
    /// IEEE-754 32-bit multiply.
    Mulf = OP_MULF,
    /// IEEE-754 32-bit divide. Division by zero yields ±∞/NaN, never a fault.
    Divf = OP_DIVF,
    /// IEEE-754 negation.
    Negf = OP_NEGF,
    /// IEEE-754 absolute value.
    Absf = OP_ABSF,

    /// Bitwise AND.
    And = OP_AND,
    /// Bitwise OR.
    Or = OP_OR,
    /// Bitwise XOR.
    Xor = OP_XOR,
    /// Bitwise complement of the top cell.
    Not = OP_NOT,
    /// Logical left shift; shift count taken modulo 32.
    Shl = OP_SHL,
    /// Logical (unsigned) right shift; shift count taken modulo 32.
    Shr = OP_SHR,
    /// Arithmetic (signed) right shift; shift count taken modulo 32.
    Sar = OP_SAR,

    /// Signed equality.
    Eq = OP_EQ,
    /// Signed inequality.
    Ne = OP_NE,
    /// Signed less-than.
    Lt = OP_LT,
    /// Signed less-or-equal.
    Le = OP_LE,
    /// Signed greater-than.
    Gt = OP_GT,
    /// Signed greater-or-equal.
    Ge = OP_GE,
    /// Unsigned less-than.
    Ltu = OP_LTU,
    /// Unsigned greater-than.
    Gtu = OP_GTU,

    /// Integer-to-float conversion.
    I2f = OP_I2F,
    /// Float-to-integer conversion, truncating toward zero. NaN/±∞ yield
    /// `0`; other out-of-range values saturate (see `SPEC_FULL.md` §4.2).
    F2i = OP_F2I,
    /// Nonzero-to-`1` boolean normalization.
    I2b = OP_I2B,
    /// Sign-extend the low 8 bits.
    Ext8 = OP_EXT8,
    /// Sign-extend the low 16 bits.
    Ext16 = OP_EXT16,
    /// Zero-extend the low 8 bits.
    Zext8 = OP_ZEXT8,
    /// Zero-extend the low 16 bits.
    Zext16 = OP_ZEXT16,

    /// Pops a return address and jumps to it.
    Ret = OP_RET,

    /// Pushes an 8-bit immediate, zero-extended to a cell.
    Push8 = OP_PUSH8,
    /// Unconditional relative jump; the signed 8-bit offset is applied to
    /// the post-decode program counter.
    Jr = OP_JR,
    /// Relative jump if the top cell (popped) is zero.
    Jrz = OP_JRZ,
    /// Relative jump if the top cell (popped) is nonzero.
    Jrnz = OP_JRNZ,

    /// Reads a cell-width-or-narrower value from an absolute 16-bit
    /// address and zero-extends it onto the stack as one cell.
    Load8 = OP_LOAD8,
    /// As [`Opcode::Load8`] but 16 bits wide.
    Load16 = OP_LOAD16,
    /// As [`Opcode::Load8`] but the full 32-bit cell.
    Load32 = OP_LOAD32,
    /// Reads 64 bits (two cells) from an absolute address.
    Load64 = OP_LOAD64,
    /// Stores the low 8 bits of the top cell to an absolute address.
    Store8 = OP_STORE8,
    /// As [`Opcode::Store8`] but 16 bits wide.
    Store16 = OP_STORE16,
    /// As [`Opcode::Store8`] but the full 32-bit cell.
    Store32 = OP_STORE32,
    /// Stores 64 bits (two cells) to an absolute address.
    Store64 = OP_STORE64,
    /// Unconditional absolute jump.
    Jmp = OP_JMP,
    /// Absolute jump if the top cell (popped) is zero.
    Jz = OP_JZ,
    /// Absolute jump if the top cell (popped) is nonzero.
    Jnz = OP_JNZ,
    /// Pushes the return PC onto WORK's call stack, then jumps.
    Call = OP_CALL,
    /// Pushes a 16-bit immediate, zero-extended to a cell.
    Push16 = OP_PUSH16,

    /// Pushes a full 32-bit immediate cell.
    Push32 = OP_PUSH32,
}

impl Opcode {
    /// Decode a raw opcode byte, or `None` if it falls in a hole of its
    /// encoding range.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        use Opcode::*;
        Some(match raw {
            OP_NOP => Nop,
            OP_HALT => Halt,
            OP_BREAK => Break,
            OP_GET_TICKS => GetTicks,
            OP_DUP => Dup,
            OP_DROP => Drop,
            OP_SWAP => Swap,
            OP_OVER => Over,
            OP_ROT => Rot,
            OP_ADD => Add,
            OP_SUB => Sub,
            OP_MUL => Mul,
            OP_DIV => Div,
            OP_MOD => Mod,
            OP_NEG => Neg,
            OP_ABS => Abs,
            OP_ADDF => Addf,
            OP_SUBF => Subf,
            OP_MULF => Mulf,
            OP_DIVF => Divf,
            OP_NEGF => Negf,
            OP_ABSF => Absf,
            OP_AND => And,
            OP_OR => Or,
            OP_XOR => Xor,
            OP_NOT => Not,
            OP_SHL => Shl,
            OP_SHR => Shr,
            OP_SAR => Sar,
            OP_EQ => Eq,
            OP_NE => Ne,
            OP_LT => Lt,
            OP_LE => Le,
            OP_GT => Gt,
            OP_GE => Ge,
            OP_LTU => Ltu,
            OP_GTU => Gtu,
            OP_I2F => I2f,
            OP_F2I => F2i,
            OP_I2B => I2b,
            OP_EXT8 => Ext8,
            OP_EXT16 => Ext16,
            OP_ZEXT8 => Zext8,
            OP_ZEXT16 => Zext16,
            OP_RET => Ret,
            OP_PUSH8 => Push8,
            OP_JR => Jr,
            OP_JRZ => Jrz,
            OP_JRNZ => Jrnz,
            OP_LOAD8 => Load8,
            OP_LOAD16 => Load16,
            OP_LOAD32 => Load32,
            OP_LOAD64 => Load64,
            OP_STORE8 => Store8,
            OP_STORE16 => Store16,
            OP_STORE32 => Store32,
            OP_STORE64 => Store64,
            OP_JMP => Jmp,
            OP_JZ => Jz,
            OP_JNZ => Jnz,
            OP_CALL => Call,
            OP_PUSH16 => Push16,
            OP_PUSH32 => Push32,
            _ => return None,
        })
    }

    /// The raw opcode byte.
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// The operand width this opcode was decoded with. Always agrees with
    /// [`OperandWidth::of_raw_opcode`] for this opcode's raw byte.
    pub const fn operand_width(self) -> OperandWidth {
        OperandWidth::of_raw_opcode(self.raw())
    }

    /// `true` for the opcodes that can transfer control outside of the
    /// "advance PC by the instruction's length" default (used by the
    /// debug channel to decide whether an `opcode` frame should include
    /// the post-execution `pc`, and by tests).
    pub const fn is_control_flow(self) -> bool {
        matches!(
            self,
            Opcode::Jr
                | Opcode::Jrz
                | Opcode::Jrnz
                | Opcode::Jmp
                | Opcode::Jz
                | Opcode::Jnz
                | Opcode::Call
                | Opcode::Ret
                | Opcode::Halt
                | Opcode::Break
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(OP_NOP, OperandWidth::None)]
    #[case(OP_ABS, OperandWidth::None)]
    #[case(OP_PUSH8, OperandWidth::One)]
    #[case(OP_JRNZ, OperandWidth::One)]
    #[case(OP_LOAD32, OperandWidth::Two)]
    #[case(OP_CALL, OperandWidth::Two)]
    #[case(OP_PUSH32, OperandWidth::Four)]
    #[case(0xFF, OperandWidth::Four)]
    fn operand_width_matches_high_bits(#[case] raw: u8, #[case] expected: OperandWidth) {
        assert_eq!(OperandWidth::of_raw_opcode(raw), expected);
    }

    #[test]
    fn holes_do_not_decode() {
        // 0x2D is inside the 0-byte range but not assigned to any opcode.
        assert!(Opcode::from_raw(0x2D).is_none());
        assert!(Opcode::from_raw(0x7F).is_none());
        assert!(Opcode::from_raw(0xFF).is_none());
    }

    #[test]
    fn every_opcode_round_trips_through_its_raw_byte() {
        for raw in 0u8..=0xFF {
            if let Some(op) = Opcode::from_raw(raw) {
                assert_eq!(op.raw(), raw);
            }
        }
    }
}
