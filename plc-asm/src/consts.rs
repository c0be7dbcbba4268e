//! Raw opcode byte assignments.
//!
//! Kept separate from [`crate::opcode::Opcode`]: the discriminants are
//! defined here once and reused both by the enum itself and by anything
//! that needs the raw byte without constructing an `Opcode` (the
//! decoder's truncation check, in particular).

// --- system (0x00-0x3F, no operand) ---
pub const OP_NOP: u8 = 0x00;
pub const OP_HALT: u8 = 0x01;
pub const OP_BREAK: u8 = 0x02;
pub const OP_GET_TICKS: u8 = 0x03;

// --- stack manipulation (no operand) ---
pub const OP_DUP: u8 = 0x04;
pub const OP_DROP: u8 = 0x05;
pub const OP_SWAP: u8 = 0x06;
pub const OP_OVER: u8 = 0x07;
pub const OP_ROT: u8 = 0x08;

// --- integer arithmetic (no operand) ---
pub const OP_ADD: u8 = 0x09;
pub const OP_SUB: u8 = 0x0A;
pub const OP_MUL: u8 = 0x0B;
pub const OP_DIV: u8 = 0x0C;
pub const OP_MOD: u8 = 0x0D;
pub const OP_NEG: u8 = 0x0E;
pub const OP_ABS: u8 = 0x0F;

// --- float arithmetic (no operand) ---
pub const OP_ADDF: u8 = 0x10;
pub const OP_SUBF: u8 = 0x11;
pub const OP_MULF: u8 = 0x12;
pub const OP_DIVF: u8 = 0x13;
pub const OP_NEGF: u8 = 0x14;
pub const OP_ABSF: u8 = 0x15;

// --- logic / bitwise (no operand) ---
pub const OP_AND: u8 = 0x16;
pub const OP_OR: u8 = 0x17;
pub const OP_XOR: u8 = 0x18;
pub const OP_NOT: u8 = 0x19;
pub const OP_SHL: u8 = 0x1A;
pub const OP_SHR: u8 = 0x1B;
pub const OP_SAR: u8 = 0x1C;

// --- comparison (no operand) ---
pub const OP_EQ: u8 = 0x1D;
pub const OP_NE: u8 = 0x1E;
pub const OP_LT: u8 = 0x1F;
pub const OP_LE: u8 = 0x20;
pub const OP_GT: u8 = 0x21;
pub const OP_GE: u8 = 0x22;
pub const OP_LTU: u8 = 0x23;
pub const OP_GTU: u8 = 0x24;

// --- conversion (no operand) ---
pub const OP_I2F: u8 = 0x25;
pub const OP_F2I: u8 = 0x26;
pub const OP_I2B: u8 = 0x27;
pub const OP_EXT8: u8 = 0x28;
pub const OP_EXT16: u8 = 0x29;
pub const OP_ZEXT8: u8 = 0x2A;
pub const OP_ZEXT16: u8 = 0x2B;

// --- control flow, no-operand half (RET pops its target, no immediate) ---
pub const OP_RET: u8 = 0x2C;

// --- 1-byte operand (0x40-0x7F): short push, short relative jumps ---
pub const OP_PUSH8: u8 = 0x40;
pub const OP_JR: u8 = 0x41;
pub const OP_JRZ: u8 = 0x42;
pub const OP_JRNZ: u8 = 0x43;

// --- 2-byte operand (0x80-0xBF): absolute loads/stores, jumps, calls, push16 ---
pub const OP_LOAD8: u8 = 0x80;
pub const OP_LOAD16: u8 = 0x81;
pub const OP_LOAD32: u8 = 0x82;
pub const OP_LOAD64: u8 = 0x83;
pub const OP_STORE8: u8 = 0x84;
pub const OP_STORE16: u8 = 0x85;
pub const OP_STORE32: u8 = 0x86;
pub const OP_STORE64: u8 = 0x87;
pub const OP_JMP: u8 = 0x88;
pub const OP_JZ: u8 = 0x89;
pub const OP_JNZ: u8 = 0x8A;
pub const OP_CALL: u8 = 0x8B;
pub const OP_PUSH16: u8 = 0x8C;

// --- 4-byte operand (0xC0-0xFF): push32 ---
pub const OP_PUSH32: u8 = 0xC0;

/// High-order-bit range boundaries from §4.2's instruction encoding table.
pub const RANGE_0_BYTES_END: u8 = 0x3F;
pub const RANGE_1_BYTE_START: u8 = 0x40;
pub const RANGE_1_BYTE_END: u8 = 0x7F;
pub const RANGE_2_BYTES_START: u8 = 0x80;
pub const RANGE_2_BYTES_END: u8 = 0xBF;
pub const RANGE_4_BYTES_START: u8 = 0xC0;
