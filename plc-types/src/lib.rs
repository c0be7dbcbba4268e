//! Elementary types shared by the ZPLC runtime core.
//!
//! This crate has no notion of memory regions, opcodes or faults — it is
//! the leaf of the workspace, underneath both the ISA crate and the
//! runtime core. Everything here is `Copy`, alloc-free and has no
//! opinion about how it is stored, only about how it is encoded.

#![cfg_attr(not(feature = "std"), no_std)]

mod address;
mod elementary;
mod ext;
mod string_view;
mod time;

pub use address::Address;
pub use elementary::ElementaryType;
pub use ext::{sign_extend8, sign_extend16, zero_extend8, zero_extend16};
pub use string_view::StringView;
pub use time::Time;

/// A single operand-stack cell. The VM's stack is untyped: a cell is
/// reinterpreted as signed, unsigned or (for a pair of cells) as part of
/// a 64-bit or floating value depending on the opcode that touches it.
pub type Cell = u32;

/// Number of bytes in one stack cell.
pub const CELL_SIZE: usize = core::mem::size_of::<Cell>();
