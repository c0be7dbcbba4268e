//! Memory & Type System (§4.1): five disjoint, fixed-size regions behind
//! one 16-bit address space, and region-checked typed load/store.
//!
//! Never expose raw pointers to callers: route every access through a
//! checked accessor, and represent "does this range fall inside a
//! region" as its own small value type
//! ([`MemoryRange`](crate::memory::range::MemoryRange)) rather than as
//! ad hoc arithmetic scattered through the interpreter.

mod range;
mod region;

pub use range::MemoryRange;
pub use region::Region;

use plc_asm::Fault;
use plc_types::Address;

use crate::config::MemoryConfig;

/// Owns the five region buffers and knows how to resolve an [`Address`]
/// to `(region, offset-within-region)`.
#[derive(Debug, Clone)]
pub struct MemoryMap {
    config: MemoryConfig,
    ipi: Vec<u8>,
    opi: Vec<u8>,
    work: Vec<u8>,
    retain: Vec<u8>,
    code: Vec<u8>,
}

impl MemoryMap {
    /// Allocate all five regions, zero-initialised, per `config`.
    /// This is the only allocation the core ever performs: regions are
    /// never resized after this call (§1, "no heap").
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            ipi: vec![0u8; config.ipi.size as usize],
            opi: vec![0u8; config.opi.size as usize],
            work: vec![0u8; config.work.size as usize],
            retain: vec![0u8; config.retain.size as usize],
            code: vec![0u8; config.code.size as usize],
            config,
        }
    }

    /// The configuration this map was built from.
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    fn buf(&self, region: Region) -> &[u8] {
        match region {
            Region::Ipi => &self.ipi,
            Region::Opi => &self.opi,
            Region::Work => &self.work,
            Region::Retain => &self.retain,
            Region::Code => &self.code,
        }
    }

    fn buf_mut(&mut self, region: Region) -> &mut [u8] {
        match region {
            Region::Ipi => &mut self.ipi,
            Region::Opi => &mut self.opi,
            Region::Work => &mut self.work,
            Region::Retain => &mut self.retain,
            Region::Code => &mut self.code,
        }
    }

    /// Locate the single region containing `[addr, addr+len)`, or
    /// `OutOfBounds` if the range straddles two regions or fits in none.
    pub fn resolve(&self, addr: Address, len: u16) -> Result<MemoryRange, Fault> {
        for region in Region::ALL {
            let base = self.config.base_of(region);
            let size = self.config.size_of(region);
            if let Some(range) = MemoryRange::try_new(region, base, size, addr, len) {
                return Ok(range);
            }
        }
        Err(Fault::out_of_bounds())
    }

    fn slice(&self, range: MemoryRange) -> &[u8] {
        let buf = self.buf(range.region());
        &buf[range.offset()..range.offset() + range.len()]
    }

    fn slice_mut(&mut self, range: MemoryRange) -> &mut [u8] {
        let buf = self.buf_mut(range.region());
        &mut buf[range.offset()..range.offset() + range.len()]
    }

    /// Read `N` little-endian bytes at `addr`, failing if the range is
    /// out of bounds or straddles regions. Does not check write
    /// protection — every region is VM-readable (§4.1's access column
    /// only ever restricts *writes*).
    fn read_bytes<const N: usize>(&self, addr: Address) -> Result<[u8; N], Fault> {
        let range = self.resolve(addr, N as u16)?;
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(range));
        Ok(out)
    }

    fn write_bytes(&mut self, addr: Address, bytes: &[u8]) -> Result<(), Fault> {
        let range = self.resolve(addr, bytes.len() as u16)?;
        if !range.region().is_writable() {
            return Err(Fault::write_protected());
        }
        self.slice_mut(range).copy_from_slice(bytes);
        Ok(())
    }

    /// Read an unsigned byte.
    pub fn read_u8(&self, addr: Address) -> Result<u8, Fault> {
        Ok(self.read_bytes::<1>(addr)?[0])
    }
    /// Read a little-endian unsigned 16-bit word.
    pub fn read_u16(&self, addr: Address) -> Result<u16, Fault> {
        Ok(u16::from_le_bytes(self.read_bytes::<2>(addr)?))
    }
    /// Read a little-endian unsigned 32-bit word.
    pub fn read_u32(&self, addr: Address) -> Result<u32, Fault> {
        Ok(u32::from_le_bytes(self.read_bytes::<4>(addr)?))
    }
    /// Read a little-endian unsigned 64-bit word.
    pub fn read_u64(&self, addr: Address) -> Result<u64, Fault> {
        Ok(u64::from_le_bytes(self.read_bytes::<8>(addr)?))
    }
    /// Read a signed byte.
    pub fn read_i8(&self, addr: Address) -> Result<i8, Fault> {
        Ok(self.read_u8(addr)? as i8)
    }
    /// Read a little-endian signed 16-bit word.
    pub fn read_i16(&self, addr: Address) -> Result<i16, Fault> {
        Ok(self.read_u16(addr)? as i16)
    }
    /// Read a little-endian signed 32-bit word.
    pub fn read_i32(&self, addr: Address) -> Result<i32, Fault> {
        Ok(self.read_u32(addr)? as i32)
    }
    /// Read a little-endian signed 64-bit word.
    pub fn read_i64(&self, addr: Address) -> Result<i64, Fault> {
        Ok(self.read_u64(addr)? as i64)
    }
    /// Read a little-endian IEEE-754 32-bit float.
    pub fn read_f32(&self, addr: Address) -> Result<f32, Fault> {
        Ok(f32::from_bits(self.read_u32(addr)?))
    }
    /// Read a little-endian IEEE-754 64-bit float.
    pub fn read_f64(&self, addr: Address) -> Result<f64, Fault> {
        Ok(f64::from_bits(self.read_u64(addr)?))
    }

    /// Write an unsigned byte.
    pub fn write_u8(&mut self, addr: Address, v: u8) -> Result<(), Fault> {
        self.write_bytes(addr, &[v])
    }
    /// Write a little-endian unsigned 16-bit word.
    pub fn write_u16(&mut self, addr: Address, v: u16) -> Result<(), Fault> {
        self.write_bytes(addr, &v.to_le_bytes())
    }
    /// Write a little-endian unsigned 32-bit word.
    pub fn write_u32(&mut self, addr: Address, v: u32) -> Result<(), Fault> {
        self.write_bytes(addr, &v.to_le_bytes())
    }
    /// Write a little-endian unsigned 64-bit word.
    pub fn write_u64(&mut self, addr: Address, v: u64) -> Result<(), Fault> {
        self.write_bytes(addr, &v.to_le_bytes())
    }
    /// Write a signed byte.
    pub fn write_i8(&mut self, addr: Address, v: i8) -> Result<(), Fault> {
        self.write_u8(addr, v as u8)
    }
    /// Write a little-endian signed 16-bit word.
    pub fn write_i16(&mut self, addr: Address, v: i16) -> Result<(), Fault> {
        self.write_u16(addr, v as u16)
    }
    /// Write a little-endian signed 32-bit word.
    pub fn write_i32(&mut self, addr: Address, v: i32) -> Result<(), Fault> {
        self.write_u32(addr, v as u32)
    }
    /// Write a little-endian signed 64-bit word.
    pub fn write_i64(&mut self, addr: Address, v: i64) -> Result<(), Fault> {
        self.write_u64(addr, v as u64)
    }
    /// Write a little-endian IEEE-754 32-bit float.
    pub fn write_f32(&mut self, addr: Address, v: f32) -> Result<(), Fault> {
        self.write_u32(addr, v.to_bits())
    }
    /// Write a little-endian IEEE-754 64-bit float.
    pub fn write_f64(&mut self, addr: Address, v: f64) -> Result<(), Fault> {
        self.write_u64(addr, v.to_bits())
    }

    /// Copy `src` into `region` starting at its base, for HAL I/O
    /// exchange (`read_inputs`/`write_outputs`). Bypasses the region's
    /// normal write-protection check, which exists to stop the *VM*
    /// writing IPI/CODE — the HAL boundary is the one collaborator
    /// allowed to populate IPI and flush OPI.
    pub fn bulk_copy_in(&mut self, region: Region, src: &[u8]) {
        let buf = self.buf_mut(region);
        let len = src.len().min(buf.len());
        buf[..len].copy_from_slice(&src[..len]);
    }

    /// Copy the full contents of `region` out, for HAL I/O exchange.
    pub fn bulk_copy_out(&self, region: Region, dst: &mut [u8]) {
        let buf = self.buf(region);
        let len = buf.len().min(dst.len());
        dst[..len].copy_from_slice(&buf[..len]);
    }

    /// The full contents of `region`, for the debug channel's `mem` /
    /// `peek` commands and for RETAIN persistence.
    pub fn region_bytes(&self, region: Region) -> &[u8] {
        self.buf(region)
    }

    /// Overwrite CODE from `bytes`, truncated/zero-padded to the
    /// configured CODE size. Bypasses the VM's normal write protection —
    /// only the loader calls this, never the interpreter.
    pub fn install_code(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(self.code.len());
        self.code[..len].copy_from_slice(&bytes[..len]);
        for b in &mut self.code[len..] {
            *b = 0;
        }
    }

    /// Overwrite a sub-range of `region` (WORK or RETAIN) from `bytes`,
    /// for the loader's `DATA` segment. Rejects CODE/IPI, and any range
    /// that does not fit — mirrors [`Self::write_bytes`]'s bounds check
    /// but for a region-relative offset supplied directly by the loader
    /// rather than a VM address.
    pub fn write_region(&mut self, region: Region, offset: u16, bytes: &[u8]) -> Result<(), Fault> {
        if !region.is_writable() {
            return Err(Fault::write_protected());
        }
        let buf = self.buf_mut(region);
        let start = offset as usize;
        let end = start
            .checked_add(bytes.len())
            .ok_or(Fault::out_of_bounds())?;
        if end > buf.len() {
            return Err(Fault::out_of_bounds());
        }
        buf[start..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Zero IPI, OPI and WORK. Used by `reset`; RETAIN is left untouched
    /// unless the caller explicitly asks for a full wipe (§5, "clears
    /// IPI/OPI/WORK (optionally RETAIN)").
    pub fn clear_volatile(&mut self) {
        self.ipi.iter_mut().for_each(|b| *b = 0);
        self.opi.iter_mut().for_each(|b| *b = 0);
        self.work.iter_mut().for_each(|b| *b = 0);
    }

    /// Zero RETAIN as well, for a full factory reset.
    pub fn clear_retain(&mut self) {
        self.retain.iter_mut().for_each(|b| *b = 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> MemoryMap {
        MemoryMap::new(MemoryConfig::default())
    }

    #[test]
    fn round_trip_scalars_in_work() {
        let mut m = map();
        let addr = Address::from(m.config().work.base);
        m.write_u32(addr, 0xDEAD_BEEF).unwrap();
        assert_eq!(m.read_u32(addr).unwrap(), 0xDEAD_BEEF);

        m.write_u8(addr, 0x7F).unwrap();
        assert_eq!(m.read_u8(addr).unwrap(), 0x7F);
    }

    #[test]
    fn ipi_is_read_only_to_store() {
        let mut m = map();
        let addr = Address::from(m.config().ipi.base);
        assert_eq!(m.write_u8(addr, 1), Err(Fault::write_protected()));
        assert_eq!(m.read_u8(addr).unwrap(), 0);
    }

    #[test]
    fn code_is_read_only_to_store_but_readable() {
        let mut m = map();
        m.install_code(&[0xAA, 0xBB]);
        let addr = Address::from(m.config().code.base);
        assert_eq!(m.read_u8(addr).unwrap(), 0xAA);
        assert_eq!(m.write_u8(addr, 1), Err(Fault::write_protected()));
    }

    #[test]
    fn straddling_two_regions_is_out_of_bounds() {
        let m = map();
        // One byte before the end of IPI, reading 2 bytes spills into OPI.
        let addr = Address::from(m.config().ipi.base + m.config().ipi.size - 1);
        assert_eq!(m.read_u16(addr), Err(Fault::out_of_bounds()));
    }

    #[test]
    fn one_past_region_end_faults_boundary_exact_succeeds() {
        let m = map();
        let last_valid = Address::from(m.config().ipi.base + m.config().ipi.size - 1);
        assert!(m.read_u8(last_valid).is_ok());
        let one_past = Address::from(m.config().ipi.base + m.config().ipi.size);
        // one_past lands exactly on OPI's base, which is in-bounds for OPI
        // itself but is a different region than IPI was addressing.
        assert!(m.read_u8(one_past).is_ok());
    }

    #[test]
    fn address_entirely_outside_every_region_is_out_of_bounds() {
        let m = map();
        let past_code = Address::from(
            m.config().code.base + m.config().code.size.saturating_add(1),
        );
        assert_eq!(m.read_u8(past_code), Err(Fault::out_of_bounds()));
    }
}
