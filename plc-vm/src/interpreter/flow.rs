//! Control-flow helpers shared by [`super::dispatch`]: branch-target
//! validation and relative-offset arithmetic. The jump/call/ret opcodes
//! themselves are dispatched inline in `dispatch.rs` since each needs to
//! decide whether to commit the new `pc`, but the "is this address
//! actually in CODE" check (§4.2: "branch targets outside CODE fault with
//! `IllegalBranch` *before* the branch is taken") is common to all of
//! them and lives here.

use plc_asm::Fault;
use plc_types::Address;

use crate::hal::Hal;
use crate::memory::Region;

use super::Vm;

/// `true` only if `target` resolves into the CODE region — not merely
/// "below `code_size`", since CODE does not start at address 0 (§3).
pub(super) fn check_branch<H: Hal>(vm: &Vm<H>, target: Address) -> Result<(), Fault> {
    match vm.memory().resolve(target, 1) {
        Ok(range) if range.region() == Region::Code => Ok(()),
        _ => Err(Fault::IllegalBranch),
    }
}

/// Apply a signed 8-bit relative offset to the *post-decode* program
/// counter (§4.2's `JR`/`JRZ`/`JRNZ` contract). Arithmetic happens in
/// `i32` and is cast back down; an out-of-range result is still caught by
/// [`check_branch`] at the call site, since it cannot resolve into CODE.
pub(super) fn relative_target(post_decode_pc: Address, offset: i8) -> Address {
    let raw = post_decode_pc.raw() as i32 + offset as i32;
    Address::from(raw.rem_euclid(1 << 16) as u16)
}
