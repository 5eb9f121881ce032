// CTF token-stream format.
//
// A CTF file is a 6-byte ASCII magic (`ctf2.1`) followed by a flat
// token stream: one opcode byte per token, with a big-endian 16-bit id
// payload after the five id-bearing opcodes, and a 4-byte timestamp plus
// NUL-terminated path after FILENAME.  Streams are produced by external
// tokenizers and are read-only once written.
//
// # Modules
//
// - `token`  — the opcode alphabet, classification, display table
// - `handle` — memory-mapped random-access reader

pub mod handle;
pub mod token;

pub use handle::{CtfHandle, Token};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error taxonomy for the whole engine.
///
/// Decoder and tuple-builder failures abort the current stream and are
/// surfaced to the caller; runs already completed from prior streams
/// stay valid.
#[derive(Debug)]
pub enum CtfError {
    /// I/O error (open, map, read).
    Io(std::io::Error),
    /// Bad or missing `ctf2.1` header.
    Format(String),
    /// A token decode ran past the end of the buffer, or an embedded
    /// filename is missing its NUL terminator.
    Truncated { offset: usize },
    /// Stream-id space (4096 files) or line-number space (2^20 lines)
    /// exhausted.
    CapacityExceeded(&'static str),
    /// Storage for TDNs or runs is unavailable.
    ResourceExhausted(&'static str),
    /// A run resolved across a FILENAME boundary.  Runs are completed at
    /// file boundaries, so this is an internal invariant violation, never
    /// a property of the input.
    SpansFiles { offset: usize },
}

impl std::fmt::Display for CtfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Format(msg) => write!(f, "bad CTF header: {msg}"),
            Self::Truncated { offset } => {
                write!(f, "truncated stream: token at offset {offset} runs past end")
            }
            Self::CapacityExceeded(what) => write!(f, "capacity exceeded: {what}"),
            Self::ResourceExhausted(what) => write!(f, "resource exhausted: {what}"),
            Self::SpansFiles { offset } => {
                write!(f, "run at offset {offset} spans a FILENAME boundary")
            }
        }
    }
}

impl std::error::Error for CtfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CtfError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
