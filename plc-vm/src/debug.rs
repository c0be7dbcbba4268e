//! Live debug/inspection protocol (§4.6): verbosity-gated frames encoded
//! as one line of JSON each, and a small command parser for the ingress
//! side. Frames are produced structurally everywhere else in this crate
//! (the VM, the scheduler, the loader); this module only ever encodes
//! them — serialization lives at the edge, never inside the
//! interpreter core.
//!
//! Gated behind the `serde` feature (on by default) since its whole
//! purpose is wire encoding.

use serde::Serialize;

use crate::interpreter::FbFrame;
use crate::scheduler::CycleOutcome;

/// How much the debug channel emits. Ordered so `self >= Summary` reads
/// naturally for "does this level include summary-or-louder frames".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Off,
    Summary,
    Verbose,
}

/// One debug-channel record (§4.6's frame table). Internally tagged so
/// the wire form is `{"t": "cycle", "n": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "t")]
pub enum Frame {
    #[serde(rename = "ready")]
    Ready { fw: String, caps: Vec<String> },
    #[serde(rename = "cycle")]
    Cycle { n: u64, us: i64, tasks: u16 },
    #[serde(rename = "task")]
    Task { id: u16, start: i64, end: i64, us: i64, ovr: bool },
    #[serde(rename = "opcode")]
    Opcode { op: String, pc: u16, sp: u16, tos: Option<u32> },
    #[serde(rename = "fb")]
    Fb { name: String, id: u16, q: bool, et: Option<u32>, cv: Option<i32> },
    #[serde(rename = "error")]
    Error { code: u16, msg: String, pc: u16 },
    #[serde(rename = "ack")]
    Ack { cmd: String, val: String, ok: bool, err: Option<String> },
    #[serde(rename = "watch")]
    Watch { addr: u16, r#type: String, val: i64 },
    #[serde(rename = "status")]
    Status { mode: String, cycles: u64, uptime: i64 },
}

impl Frame {
    pub fn from_fb(fb: &FbFrame) -> Self {
        Frame::Fb { name: fb.name.to_string(), id: fb.id, q: fb.q, et: fb.et, cv: fb.cv }
    }

    pub fn from_cycle_outcome(task_id: u16, outcome: &CycleOutcome) -> Option<Self> {
        match outcome {
            CycleOutcome::Completed { elapsed_us, overrun } => Some(Frame::Task {
                id: task_id,
                start: 0,
                end: *elapsed_us,
                us: *elapsed_us,
                ovr: *overrun,
            }),
            CycleOutcome::WatchdogExpired => Some(Frame::Error {
                code: crate::error::Error::WatchdogExpired.code(),
                msg: "watchdog expired".to_string(),
                pc: 0,
            }),
            CycleOutcome::Faulted => None,
            CycleOutcome::Breakpoint(_) => None,
        }
    }
}

/// A parsed ingress command (§4.6's command surface). Unknown verbs are
/// rejected by the caller with an `ack{ok: false}`, not by this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load { total: usize },
    Data { hex: String },
    Start,
    Stop,
    Reset,
    Pause,
    Resume,
    Step,
    Peek { addr: u16, len: u16 },
    Poke { addr: u16, value: u8 },
    SetBp { pc: u16 },
    ClearBp { pc: u16 },
    WatchAdd { addr: u16, kind: String },
    WatchRemove,
    HilMode { verbosity: Verbosity },
    SchedStatus,
    SchedTasks,
    Status,
    Version,
    PersistInfo,
    PersistClear,
}

/// Error parsing one ingress line.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown verb {0:?}")]
    UnknownVerb(String),
    #[error("malformed argument")]
    BadArgument,
}

/// Parse one `verb [args...]` line (already stripped of its trailing
/// CR-LF, §6). Every command the channel accepts maps to exactly one
/// [`Command`] or one [`CommandError`] — there is no partial parse.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().ok_or(CommandError::Empty)?;
    let args: Vec<&str> = parts.collect();

    let parse_u16 = |s: &str| s.parse::<u16>().map_err(|_| CommandError::BadArgument);
    let parse_u8 = |s: &str| s.parse::<u8>().map_err(|_| CommandError::BadArgument);

    match verb {
        "load" => {
            let total = args.first().ok_or(CommandError::BadArgument)?;
            Ok(Command::Load {
                total: total.parse().map_err(|_| CommandError::BadArgument)?,
            })
        }
        "data" => {
            let hex = args.first().ok_or(CommandError::BadArgument)?;
            Ok(Command::Data { hex: (*hex).to_string() })
        }
        "start" => Ok(Command::Start),
        "stop" => Ok(Command::Stop),
        "reset" => Ok(Command::Reset),
        "pause" => Ok(Command::Pause),
        "resume" => Ok(Command::Resume),
        "step" => Ok(Command::Step),
        "peek" => {
            let addr = parse_u16(args.first().ok_or(CommandError::BadArgument)?)?;
            let len = parse_u16(args.get(1).ok_or(CommandError::BadArgument)?)?;
            Ok(Command::Peek { addr, len })
        }
        "poke" => {
            let addr = parse_u16(args.first().ok_or(CommandError::BadArgument)?)?;
            let value = parse_u8(args.get(1).ok_or(CommandError::BadArgument)?)?;
            Ok(Command::Poke { addr, value })
        }
        "set_bp" => Ok(Command::SetBp { pc: parse_u16(args.first().ok_or(CommandError::BadArgument)?)? }),
        "clear_bp" => {
            Ok(Command::ClearBp { pc: parse_u16(args.first().ok_or(CommandError::BadArgument)?)? })
        }
        "watch_add" => {
            let addr = parse_u16(args.first().ok_or(CommandError::BadArgument)?)?;
            let kind = args.get(1).ok_or(CommandError::BadArgument)?;
            Ok(Command::WatchAdd { addr, kind: (*kind).to_string() })
        }
        "watch_remove" => Ok(Command::WatchRemove),
        "hil" => {
            if args.first() != Some(&"mode") {
                return Err(CommandError::BadArgument);
            }
            let verbosity = match args.get(1) {
                Some(&"off") => Verbosity::Off,
                Some(&"summary") => Verbosity::Summary,
                Some(&"verbose") => Verbosity::Verbose,
                _ => return Err(CommandError::BadArgument),
            };
            Ok(Command::HilMode { verbosity })
        }
        "sched" => match args.first() {
            Some(&"status") => Ok(Command::SchedStatus),
            Some(&"tasks") => Ok(Command::SchedTasks),
            _ => Err(CommandError::BadArgument),
        },
        "status" => Ok(Command::Status),
        "version" => Ok(Command::Version),
        "persist" => match args.first() {
            Some(&"info") => Ok(Command::PersistInfo),
            Some(&"clear") => Ok(Command::PersistClear),
            _ => Err(CommandError::BadArgument),
        },
        other => Err(CommandError::UnknownVerb(other.to_string())),
    }
}

/// Ties verbosity gating to JSON encoding. Holds no execution state of
/// its own — the VM/scheduler/loader produce [`Frame`]s, this only
/// decides whether to emit them and how to encode the ones that pass.
pub struct DebugChannel {
    verbosity: Verbosity,
}

impl DebugChannel {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.verbosity = verbosity;
    }

    /// `true` if a frame at `level` should be emitted right now.
    pub fn should_emit(&self, level: Verbosity) -> bool {
        self.verbosity >= level
    }

    /// Serialize one frame to a single line of JSON (no trailing
    /// newline — the transport adds line termination).
    pub fn encode(&self, frame: &Frame) -> String {
        serde_json::to_string(frame).expect("Frame serialization is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_is_tagged_internally() {
        let frame = Frame::Cycle { n: 1, us: 500, tasks: 2 };
        let channel = DebugChannel::new(Verbosity::Summary);
        let json = channel.encode(&frame);
        assert!(json.starts_with(r#"{"t":"cycle""#));
    }

    #[test]
    fn verbose_includes_summary_level() {
        let channel = DebugChannel::new(Verbosity::Verbose);
        assert!(channel.should_emit(Verbosity::Summary));
        assert!(channel.should_emit(Verbosity::Verbose));
    }

    #[test]
    fn off_suppresses_everything() {
        let channel = DebugChannel::new(Verbosity::Off);
        assert!(!channel.should_emit(Verbosity::Summary));
    }

    #[test]
    fn parses_peek_and_poke() {
        assert_eq!(
            parse_command("peek 100 4"),
            Ok(Command::Peek { addr: 100, len: 4 })
        );
        assert_eq!(
            parse_command("poke 100 255"),
            Ok(Command::Poke { addr: 100, value: 255 })
        );
    }

    #[test]
    fn parses_hil_mode() {
        assert_eq!(
            parse_command("hil mode verbose"),
            Ok(Command::HilMode { verbosity: Verbosity::Verbose })
        );
    }

    #[test]
    fn unknown_verb_is_rejected() {
        assert_eq!(
            parse_command("frobnicate"),
            Err(CommandError::UnknownVerb("frobnicate".to_string()))
        );
    }

    #[test]
    fn empty_line_is_rejected() {
        assert_eq!(parse_command(""), Err(CommandError::Empty));
    }
}
