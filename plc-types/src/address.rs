use core::fmt;
use core::ops::{Add, Sub};

/// A 16-bit address in the VM's single flat address space.
///
/// An `Address` does not by itself know which memory region it falls in —
/// that mapping is `plc_vm::memory::MemoryMap`'s job. This type exists so
/// addresses are never accidentally mixed up with plain offsets or with
/// stack [`Cell`](crate::Cell) values at the type level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address(pub u16);

impl Address {
    /// Construct an address from a raw `u16`.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// The raw `u16` value.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Address `self + offset`, saturating at `u16::MAX` rather than
    /// wrapping — wraparound would silently alias a high address onto a
    /// low one, which bounds checking must never be fooled by.
    pub const fn saturating_add(self, offset: u16) -> Self {
        Self(self.0.saturating_add(offset))
    }
}

impl From<u16> for Address {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Address> for u16 {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl From<Address> for usize {
    fn from(addr: Address) -> Self {
        addr.0 as usize
    }
}

impl Add<u16> for Address {
    type Output = Address;

    fn add(self, rhs: u16) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl Sub<u16> for Address {
    type Output = Address;

    fn sub(self, rhs: u16) -> Self::Output {
        Self(self.0 - rhs)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}
