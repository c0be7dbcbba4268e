/// Elementary IEC 61131-3 type tags.
///
/// The VM's operand stack itself is untyped (§4.2); these tags are used by
/// the loader's `DATA` segment, by the debug channel's `watch`/`peek`
/// framing, and by the function-block library to describe the width and
/// signedness of a value without the VM needing a richer value
/// representation on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ElementaryType {
    /// Single bit, stored as one byte (0 or 1).
    Bool = 0x01,
    /// Signed 8-bit integer.
    Sint = 0x02,
    /// Unsigned 8-bit integer.
    Usint = 0x03,
    /// Signed 16-bit integer.
    Int = 0x04,
    /// Unsigned 16-bit integer.
    Uint = 0x05,
    /// Signed 32-bit integer.
    Dint = 0x06,
    /// Unsigned 32-bit integer.
    Udint = 0x07,
    /// Signed 64-bit integer.
    Lint = 0x08,
    /// Unsigned 64-bit integer.
    Ulint = 0x09,
    /// IEEE-754 32-bit float.
    Real = 0x0a,
    /// IEEE-754 64-bit float.
    Lreal = 0x0b,
    /// Derived type: a duration, stored as microseconds (see [`crate::Time`]).
    Time = 0x0c,
    /// Derived type: a length-prefixed byte buffer (see [`crate::StringView`]).
    String = 0x0d,
}

impl ElementaryType {
    /// Width in bytes of a value of this type when stored in memory.
    ///
    /// `String` has no fixed width in the abstract — its width depends on
    /// the compiler-chosen maximum length `N` (`2 + N` bytes, see
    /// [`crate::StringView`]) — callers needing a concrete width for a
    /// `String` instance must consult the declared capacity separately.
    pub const fn fixed_width(self) -> Option<u8> {
        use ElementaryType::*;
        match self {
            Bool | Sint | Usint => Some(1),
            Int | Uint => Some(2),
            Dint | Udint | Real => Some(4),
            Lint | Ulint | Lreal | Time => Some(8),
            String => None,
        }
    }

    /// Decode a 1-byte type tag, as used in `DATA`/`watch_add` framing.
    pub fn from_tag(tag: u8) -> Option<Self> {
        use ElementaryType::*;
        Some(match tag {
            0x01 => Bool,
            0x02 => Sint,
            0x03 => Usint,
            0x04 => Int,
            0x05 => Uint,
            0x06 => Dint,
            0x07 => Udint,
            0x08 => Lint,
            0x09 => Ulint,
            0x0a => Real,
            0x0b => Lreal,
            0x0c => Time,
            0x0d => String,
            _ => return None,
        })
    }

    /// Encode back to the 1-byte type tag.
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn tag_round_trips_for_every_variant() {
        for ty in ElementaryType::iter() {
            assert_eq!(ElementaryType::from_tag(ty.tag()), Some(ty));
        }
    }

    #[test]
    fn unknown_tag_is_none() {
        assert_eq!(ElementaryType::from_tag(0xff), None);
    }

    #[test]
    fn string_has_no_fixed_width() {
        assert_eq!(ElementaryType::String.fixed_width(), None);
        assert_eq!(ElementaryType::Lreal.fixed_width(), Some(8));
    }
}
