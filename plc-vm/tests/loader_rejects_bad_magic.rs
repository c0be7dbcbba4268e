//! §8 scenario 3: a file whose first four bytes are `ZPLX` returns
//! `LoaderError::BadMagic` with zero side effects on CODE/tasks.

use plc_vm::config::MemoryConfig;
use plc_vm::loader::{self, LoaderError};
use plc_vm::memory::{MemoryMap, Region};

fn well_formed_file(code: &[u8]) -> Vec<u8> {
    let mut header = vec![0u8; 32];
    header[0..4].copy_from_slice(b"ZPLC");
    header[4] = 1;
    header[12..16].copy_from_slice(&(code.len() as u32).to_le_bytes());
    header[22..24].copy_from_slice(&1u16.to_le_bytes()); // segment_count

    let mut table = Vec::new();
    table.extend_from_slice(&0u16.to_le_bytes()); // CODE segment type
    table.extend_from_slice(&0u16.to_le_bytes()); // flags
    table.extend_from_slice(&(code.len() as u32).to_le_bytes());

    let mut file = header;
    file.extend_from_slice(&table);
    file.extend_from_slice(code);

    let mut zeroed = file.clone();
    zeroed[8..12].copy_from_slice(&[0, 0, 0, 0]);
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&zeroed);
    file[8..12].copy_from_slice(&hasher.finalize().to_le_bytes());
    file
}

#[test]
fn bad_magic_is_rejected_with_zero_side_effects() {
    let mut memory = MemoryMap::new(MemoryConfig::default());
    let mut file = well_formed_file(&[0xDE, 0xAD, 0xBE, 0xEF]);
    file[0..4].copy_from_slice(b"ZPLX");

    let code_before = memory.region_bytes(Region::Code).to_vec();
    let err = loader::load(&file, &mut memory).unwrap_err();

    assert_eq!(err, LoaderError::BadMagic);
    assert_eq!(err.code(), 2);
    assert_eq!(memory.region_bytes(Region::Code), code_before.as_slice());
}
