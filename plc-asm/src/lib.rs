//! Instruction encoding and fault taxonomy for the ZPLC bytecode VM.
//!
//! Owns exactly the part of §4.2 that is pure data/decode logic and has
//! no notion of a running interpreter: the opcode table, the
//! variable-length decoder, and the closed `Fault` taxonomy the VM raises
//! while decoding or executing. `plc-vm` is the crate that actually runs
//! instructions against memory.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod consts;
mod fault;
mod instruction;
mod opcode;

pub use fault::{Fault, FaultedAt, MemoryFaultKind};
pub use instruction::{decode, Immediate, Instruction};
pub use opcode::{Opcode, OperandWidth};
