//! Binary program loader (§4.4): parses a segmented file, validates it
//! fail-fast, installs CODE and produces task definitions for the
//! scheduler. A plain, allocation-light parser over a byte slice that
//! returns a structured error the moment anything looks wrong — no
//! partial state escapes on failure (§7, "loader errors never leave
//! partial state").

use plc_types::Address;

use crate::config::{TASK_INTERVAL_MIN_US, TASK_STACK_MAX, TASK_STACK_MIN};
use crate::memory::{MemoryMap, Region};
use crate::scheduler::{TaskDef, TaskKind};

/// Magic bytes identifying a program file: `"ZPLC"`.
pub const MAGIC: [u8; 4] = [0x5A, 0x50, 0x4C, 0x43];

const HEADER_LEN: usize = 32;
const SEGMENT_ENTRY_LEN: usize = 8;
const TASK_ENTRY_LEN: usize = 16;
const IOMAP_ENTRY_LEN: usize = 8;

const SEG_TYPE_CODE: u16 = 0;
const SEG_TYPE_TASK: u16 = 1;
const SEG_TYPE_IOMAP: u16 = 2;
const SEG_TYPE_DATA: u16 = 3;

const SUPPORTED_MAJOR_VERSION: u8 = 1;

/// Why the loader rejected a file (§4.4's fail-fast sequence, §7's row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LoaderError {
    /// Buffer shorter than the fixed 32-byte header.
    #[error("file too small to hold a header")]
    TooSmall,
    /// First four bytes are not `ZPLC`.
    #[error("bad magic")]
    BadMagic,
    /// Header's major version is newer than this implementation.
    #[error("unsupported version")]
    UnsupportedVersion,
    /// A segment-table entry claims a payload extending past the buffer.
    #[error("truncated segment payload")]
    Truncated,
    /// More than one `CODE` segment, or one exceeding the CODE region.
    #[error("bad code segment")]
    BadCode,
    /// CRC-32 over the file (with the header's CRC field zeroed) did not
    /// match the stored value.
    #[error("checksum failed")]
    ChecksumFailed,
    /// No `CODE` segment was present at all.
    #[error("no code segment")]
    NoCode,
}

impl LoaderError {
    /// Stable numeric code, offset by [`crate::error::Error::code`] by
    /// 200 so it never collides with [`plc_asm::Fault::code`]'s `1..=8`.
    pub const fn code(self) -> u16 {
        match self {
            LoaderError::TooSmall => 1,
            LoaderError::BadMagic => 2,
            LoaderError::UnsupportedVersion => 3,
            LoaderError::Truncated => 4,
            LoaderError::BadCode => 5,
            LoaderError::ChecksumFailed => 6,
            LoaderError::NoCode => 7,
        }
    }
}

/// One raw `IOMAP` entry, exposed to the HAL boundary uninterpreted
/// (§4.4 supplement — the core attaches no semantics to it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoMapEntry {
    pub channel: u16,
    pub addr: u16,
    pub flags: u16,
}

/// Everything a successful load produces.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// Entry point from the header, regardless of whether any task uses it.
    pub entry_point: Address,
    /// Task definitions parsed from the `TASK` segment, or the single
    /// backward-compatibility fallback task.
    pub tasks: Vec<TaskDef>,
    /// Raw `IOMAP` entries, if an `IOMAP` segment was present.
    pub io_map: Vec<IoMapEntry>,
}

struct Header {
    crc32: u32,
    entry_point: u16,
    segment_count: u16,
}

fn parse_header(buf: &[u8]) -> Result<Header, LoaderError> {
    if buf.len() < HEADER_LEN {
        return Err(LoaderError::TooSmall);
    }
    if buf[0..4] != MAGIC {
        return Err(LoaderError::BadMagic);
    }
    if buf[4] > SUPPORTED_MAJOR_VERSION {
        return Err(LoaderError::UnsupportedVersion);
    }
    let crc32 = u32::from_le_bytes(buf[8..12].try_into().unwrap());
    let entry_point = u16::from_le_bytes(buf[20..22].try_into().unwrap());
    let segment_count = u16::from_le_bytes(buf[22..24].try_into().unwrap());
    Ok(Header { crc32, entry_point, segment_count })
}

struct SegmentEntry {
    kind: u16,
}

/// Parse the segment table and slice out each payload in order, failing
/// fast the moment one is truncated.
fn parse_segments<'a>(
    buf: &'a [u8],
    segment_count: u16,
) -> Result<Vec<(SegmentEntry, &'a [u8])>, LoaderError> {
    let table_start = HEADER_LEN;
    let table_len = segment_count as usize * SEGMENT_ENTRY_LEN;
    let table_end = table_start.checked_add(table_len).ok_or(LoaderError::Truncated)?;
    if table_end > buf.len() {
        return Err(LoaderError::Truncated);
    }

    let mut entries = Vec::with_capacity(segment_count as usize);
    let mut cursor = table_end;
    for i in 0..segment_count as usize {
        let entry_off = table_start + i * SEGMENT_ENTRY_LEN;
        let kind = u16::from_le_bytes(buf[entry_off..entry_off + 2].try_into().unwrap());
        let size = u32::from_le_bytes(buf[entry_off + 4..entry_off + 8].try_into().unwrap());

        let payload_start = cursor;
        let payload_end = payload_start.checked_add(size as usize).ok_or(LoaderError::Truncated)?;
        if payload_end > buf.len() {
            return Err(LoaderError::Truncated);
        }
        entries.push((SegmentEntry { kind }, &buf[payload_start..payload_end]));
        cursor = payload_end;
    }
    Ok(entries)
}

fn verify_checksum(buf: &[u8], expected: u32) -> Result<(), LoaderError> {
    let mut zeroed = buf.to_vec();
    zeroed[8..12].copy_from_slice(&[0, 0, 0, 0]);
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&zeroed);
    if hasher.finalize() == expected {
        Ok(())
    } else {
        Err(LoaderError::ChecksumFailed)
    }
}

fn parse_tasks(payload: &[u8]) -> Result<Vec<TaskDef>, LoaderError> {
    if payload.len() % TASK_ENTRY_LEN != 0 {
        return Err(LoaderError::Truncated);
    }
    let mut tasks = Vec::with_capacity(payload.len() / TASK_ENTRY_LEN);
    for chunk in payload.chunks_exact(TASK_ENTRY_LEN) {
        let id = u16::from_le_bytes(chunk[0..2].try_into().unwrap());
        let kind_tag = chunk[2];
        let priority = chunk[3];
        let interval_us = u32::from_le_bytes(chunk[4..8].try_into().unwrap());
        let entry_point = u16::from_le_bytes(chunk[8..10].try_into().unwrap());
        let stack_size = u16::from_le_bytes(chunk[10..12].try_into().unwrap());

        let kind = match kind_tag {
            0 => TaskKind::Cyclic,
            1 => TaskKind::Event,
            _ => return Err(LoaderError::BadCode),
        };
        tasks.push(TaskDef {
            id,
            kind,
            priority,
            interval_us: interval_us.max(TASK_INTERVAL_MIN_US),
            entry_point: Address::new(entry_point),
            stack_size: stack_size.clamp(TASK_STACK_MIN, TASK_STACK_MAX),
        });
    }
    Ok(tasks)
}

fn parse_io_map(payload: &[u8]) -> Result<Vec<IoMapEntry>, LoaderError> {
    if payload.len() % IOMAP_ENTRY_LEN != 0 {
        return Err(LoaderError::Truncated);
    }
    Ok(payload
        .chunks_exact(IOMAP_ENTRY_LEN)
        .map(|c| IoMapEntry {
            channel: u16::from_le_bytes(c[0..2].try_into().unwrap()),
            addr: u16::from_le_bytes(c[2..4].try_into().unwrap()),
            flags: u16::from_le_bytes(c[4..6].try_into().unwrap()),
        })
        .collect())
}

/// One `(region, offset, len, bytes)` record from a `DATA` segment
/// (§4.4 supplement).
struct DataRecord<'a> {
    region: u8,
    offset: u16,
    bytes: &'a [u8],
}

fn parse_data_records(mut payload: &[u8]) -> Result<Vec<DataRecord<'_>>, LoaderError> {
    let mut records = Vec::new();
    while !payload.is_empty() {
        if payload.len() < 5 {
            return Err(LoaderError::Truncated);
        }
        let region = payload[0];
        let offset = u16::from_le_bytes(payload[1..3].try_into().unwrap());
        let len = u16::from_le_bytes(payload[3..5].try_into().unwrap()) as usize;
        let body_end = 5usize.checked_add(len).ok_or(LoaderError::Truncated)?;
        if body_end > payload.len() {
            return Err(LoaderError::Truncated);
        }
        records.push(DataRecord { region, offset, bytes: &payload[5..body_end] });
        payload = &payload[body_end..];
    }
    Ok(records)
}

/// Parse, validate and install `buf` into `memory`, in the exact
/// fail-fast order of §4.4. On any error `memory` is left untouched —
/// every check below that can fail runs before the first mutation.
pub fn load(buf: &[u8], memory: &mut MemoryMap) -> Result<LoadReport, LoaderError> {
    load_inner(buf, memory).inspect_err(|err| {
        tracing::warn!(code = err.code(), %err, "loader rejected program");
    })
}

fn load_inner(buf: &[u8], memory: &mut MemoryMap) -> Result<LoadReport, LoaderError> {
    let header = parse_header(buf)?;

    let segments = parse_segments(buf, header.segment_count)?;

    let mut code_payload: Option<&[u8]> = None;
    for (entry, payload) in &segments {
        if entry.kind == SEG_TYPE_CODE {
            if code_payload.is_some() {
                return Err(LoaderError::BadCode);
            }
            if payload.len() > memory.config().code.size as usize {
                return Err(LoaderError::BadCode);
            }
            code_payload = Some(payload);
        }
    }
    let code_payload = code_payload.ok_or(LoaderError::NoCode)?;

    verify_checksum(buf, header.crc32)?;

    let mut task_segment: Option<&[u8]> = None;
    let mut io_map = Vec::new();
    let mut data_segments: Vec<&[u8]> = Vec::new();
    for (entry, payload) in &segments {
        match entry.kind {
            SEG_TYPE_CODE => {}
            SEG_TYPE_TASK => task_segment = Some(payload),
            SEG_TYPE_IOMAP => io_map = parse_io_map(payload)?,
            SEG_TYPE_DATA => data_segments.push(payload),
            _ => {}
        }
    }

    let tasks = match task_segment {
        Some(payload) => parse_tasks(payload)?,
        None if header.segment_count > 0 => vec![TaskDef {
            id: 99,
            kind: TaskKind::Cyclic,
            priority: 3,
            interval_us: 50_000,
            entry_point: Address::new(header.entry_point),
            stack_size: TASK_STACK_MIN,
        }],
        None => Vec::new(),
    };

    let mut records = Vec::new();
    for payload in &data_segments {
        records.extend(parse_data_records(payload)?);
    }
    for record in &records {
        let region = match record.region {
            2 => Region::Work,
            3 => Region::Retain,
            _ => return Err(LoaderError::BadCode),
        };
        memory
            .write_region(region, record.offset, record.bytes)
            .map_err(|_| LoaderError::BadCode)?;
    }

    memory.install_code(code_payload);

    Ok(LoadReport { entry_point: Address::new(header.entry_point), tasks, io_map })
}
