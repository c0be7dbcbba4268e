use crate::{Fault, Opcode, OperandWidth};

/// A decoded immediate operand. The width actually present is implied by
/// the opcode (see [`OperandWidth`]) so this carries no tag of its own
/// beyond which constructor was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Immediate {
    /// No operand (the `0x00..=0x3F` family).
    None,
    /// A raw byte, used both as an 8-bit push value and as a signed
    /// relative branch offset — the consuming opcode decides which.
    Byte(u8),
    /// A little-endian 16-bit operand.
    Word16(u16),
    /// A little-endian 32-bit operand.
    Word32(u32),
}

impl Immediate {
    /// The raw byte, reinterpreted as a signed relative offset. Only
    /// meaningful for `JR`/`JRZ`/`JRNZ`.
    pub fn as_relative_offset(self) -> Option<i8> {
        match self {
            Immediate::Byte(b) => Some(b as i8),
            _ => None,
        }
    }

    /// The operand widened to a 32-bit cell, for `PUSH8`/`PUSH16`/`PUSH32`.
    /// `PUSH8`/`PUSH16` zero-extend; explicit sign-extension is the job of
    /// `EXT8`/`EXT16` afterwards (§4.2).
    pub fn as_push_cell(self) -> Option<u32> {
        match self {
            Immediate::Byte(b) => Some(b as u32),
            Immediate::Word16(w) => Some(w as u32),
            Immediate::Word32(w) => Some(w),
            Immediate::None => None,
        }
    }

    /// The operand as an absolute 16-bit address, for loads/stores/jumps/calls.
    pub fn as_address(self) -> Option<u16> {
        match self {
            Immediate::Word16(w) => Some(w),
            _ => None,
        }
    }
}

/// One fully decoded instruction: an opcode plus its immediate, and how
/// many bytes it occupied in CODE (`1 + operand width`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// The decoded opcode.
    pub opcode: Opcode,
    /// Its immediate operand, if any.
    pub immediate: Immediate,
    /// Total encoded length in bytes, including the opcode byte.
    pub len: u16,
}

/// Decode one instruction starting at `code[pc as usize..]`.
///
/// Order of checks, both mandated by §4.2/§8: the operand width is a pure
/// function of the opcode byte's high bits regardless of whether the byte
/// is a known opcode (see [`OperandWidth::of_raw_opcode`]), so truncation
/// is checked first — reading `code[pc]` itself out of bounds is also
/// truncation, not a silent panic. Only once enough bytes are known to be
/// present is the opcode byte matched against the closed opcode table,
/// with an unmatched byte producing [`Fault::IllegalInstruction`].
pub fn decode(code: &[u8], pc: u16) -> Result<Instruction, Fault> {
    let pc_usize = pc as usize;
    let raw = *code.get(pc_usize).ok_or(Fault::TruncatedInstruction)?;
    let width = OperandWidth::of_raw_opcode(raw);
    let operand_end = pc_usize
        .checked_add(1 + width.bytes())
        .ok_or(Fault::TruncatedInstruction)?;
    if operand_end > code.len() {
        return Err(Fault::TruncatedInstruction);
    }

    let opcode = Opcode::from_raw(raw).ok_or(Fault::IllegalInstruction)?;
    let operand = &code[pc_usize + 1..operand_end];
    let immediate = match width {
        OperandWidth::None => Immediate::None,
        OperandWidth::One => Immediate::Byte(operand[0]),
        OperandWidth::Two => {
            Immediate::Word16(u16::from_le_bytes([operand[0], operand[1]]))
        }
        OperandWidth::Four => Immediate::Word32(u32::from_le_bytes([
            operand[0], operand[1], operand[2], operand[3],
        ])),
    };

    Ok(Instruction {
        opcode,
        immediate,
        len: (1 + width.bytes()) as u16,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;

    #[test]
    fn decodes_no_operand_instruction() {
        let code = [OP_ADD, OP_HALT];
        let ins = decode(&code, 0).unwrap();
        assert_eq!(ins.opcode, Opcode::Add);
        assert_eq!(ins.immediate, Immediate::None);
        assert_eq!(ins.len, 1);
    }

    #[test]
    fn decodes_two_byte_little_endian_operand() {
        let code = [OP_PUSH16, 0x34, 0x12];
        let ins = decode(&code, 0).unwrap();
        assert_eq!(ins.opcode, Opcode::Push16);
        assert_eq!(ins.immediate.as_push_cell(), Some(0x1234));
        assert_eq!(ins.len, 3);
    }

    #[test]
    fn decodes_four_byte_little_endian_operand() {
        let code = [OP_PUSH32, 0x78, 0x56, 0x34, 0x12];
        let ins = decode(&code, 0).unwrap();
        assert_eq!(ins.immediate.as_push_cell(), Some(0x1234_5678));
    }

    #[test]
    fn truncated_operand_is_a_fault_not_a_panic() {
        let code = [OP_PUSH16, 0x01]; // missing the second operand byte
        assert_eq!(decode(&code, 0), Err(Fault::TruncatedInstruction));
    }

    #[test]
    fn reading_past_the_end_of_code_is_truncated() {
        let code = [OP_NOP];
        assert_eq!(decode(&code, 5), Err(Fault::TruncatedInstruction));
    }

    #[test]
    fn unknown_opcode_byte_is_illegal_instruction() {
        let code = [0x2D]; // a hole in the 0-operand range
        assert_eq!(decode(&code, 0), Err(Fault::IllegalInstruction));
    }

    #[test]
    fn relative_offset_is_sign_interpreted() {
        let code = [OP_JR, 0xFE]; // -2
        let ins = decode(&code, 0).unwrap();
        assert_eq!(ins.immediate.as_relative_offset(), Some(-2));
    }
}
