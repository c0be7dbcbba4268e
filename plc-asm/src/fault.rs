use core::fmt;

use plc_types::Address;

/// Why a memory access was rejected (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemoryFaultKind {
    /// The access falls outside every region, or straddles two regions.
    OutOfBounds,
    /// The access targets a region that does not allow this operation
    /// (a write to IPI or CODE).
    WriteProtected,
    /// Reserved for a future region with an alignment requirement.
    /// §4.1 is explicit that none of today's regions require alignment,
    /// so this variant is never raised by the current memory model.
    Misaligned,
}

impl fmt::Display for MemoryFaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryFaultKind::OutOfBounds => write!(f, "out of bounds"),
            MemoryFaultKind::WriteProtected => write!(f, "write protected"),
            MemoryFaultKind::Misaligned => write!(f, "misaligned"),
        }
    }
}

/// The closed taxonomy of faults the VM itself can raise while decoding
/// or executing one instruction (§7's VM-originated rows). Every variant
/// carries a stable numeric [`Fault::code`] that the debug channel's
/// `error` frame and a CLI host's exit-code mapping can rely on across
/// versions.
///
/// A closed, numbered, `Display`-able reason enum owned by the ISA
/// crate rather than the interpreter, deriving `thiserror::Error`
/// directly so every variant gets a stable `Display` impl for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Fault {
    /// Unknown opcode (a hole in the encoding map).
    #[error("illegal instruction")]
    IllegalInstruction,
    /// Out-of-bounds, write-protected, or region-straddling access.
    #[error("memory fault: {0}")]
    MemoryFault(MemoryFaultKind),
    /// Integer `DIV`/`MOD` with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,
    /// Operand stack push with no room left.
    #[error("operand stack overflow")]
    StackOverflow,
    /// Operand stack pop (or peek) with fewer cells present than required.
    #[error("operand stack underflow")]
    StackUnderflow,
    /// `CALL` nesting exceeded the configured limit.
    #[error("call stack overflow")]
    CallStackOverflow,
    /// A jump/call target lies outside CODE.
    #[error("illegal branch target")]
    IllegalBranch,
    /// An opcode's immediate operand would read past `code_size`.
    #[error("truncated instruction")]
    TruncatedInstruction,
}

impl Fault {
    /// Stable numeric code, independent of variant ordering, suitable for
    /// the debug channel's `error.code` field and for a CLI host's exit
    /// status mapping.
    pub const fn code(self) -> u16 {
        match self {
            Fault::IllegalInstruction => 1,
            Fault::MemoryFault(_) => 2,
            Fault::DivisionByZero => 3,
            Fault::StackOverflow => 4,
            Fault::StackUnderflow => 5,
            Fault::CallStackOverflow => 6,
            Fault::IllegalBranch => 7,
            Fault::TruncatedInstruction => 8,
        }
    }

    /// Short machine-readable name, used as the `error.msg`/frame tag
    /// distinct from the human `Display` sentence.
    pub const fn name(self) -> &'static str {
        match self {
            Fault::IllegalInstruction => "IllegalInstruction",
            Fault::MemoryFault(_) => "MemoryFault",
            Fault::DivisionByZero => "DivisionByZero",
            Fault::StackOverflow => "StackOverflow",
            Fault::StackUnderflow => "StackUnderflow",
            Fault::CallStackOverflow => "CallStackOverflow",
            Fault::IllegalBranch => "IllegalBranch",
            Fault::TruncatedInstruction => "TruncatedInstruction",
        }
    }

    /// Out-of-bounds convenience constructor, used throughout the memory
    /// accessors.
    pub const fn out_of_bounds() -> Self {
        Fault::MemoryFault(MemoryFaultKind::OutOfBounds)
    }

    /// Write-protected convenience constructor.
    pub const fn write_protected() -> Self {
        Fault::MemoryFault(MemoryFaultKind::WriteProtected)
    }
}

/// A fault paired with the program counter of the instruction that
/// raised it — per §8's invariant 3, `pc` is the address of the
/// *faulting* instruction, never the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FaultedAt {
    /// The fault itself.
    pub fault: Fault,
    /// Program counter at the time of the fault.
    pub pc: Address,
}

impl fmt::Display for FaultedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.fault, self.pc)
    }
}
