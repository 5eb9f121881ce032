// Memory-mapped CTF stream reader.
//
// A `CtfHandle` maps one CTF file read-only and decodes tokens at
// arbitrary offsets.  Returned filename slices borrow from the map and
// must not outlive the handle; no token decode copies stream bytes.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use super::CtfError;
use super::token::{self, EOFTOKEN, FILENAME, LINE};

/// The 6-byte ASCII magic at the start of every CTF file.
pub const CTF_MAGIC: &[u8; 6] = b"ctf2.1";

// ---------------------------------------------------------------------------
// Decoded token
// ---------------------------------------------------------------------------

/// One decoded token.  Filename paths borrow from the mapped stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// End-of-stream opcode.
    Eof,
    /// Line marker: increments the running line counter, zero width in
    /// every tuple.
    Line,
    /// Start of a new logical source file within the stream.
    Filename { mtime: u32, path: &'a [u8] },
    /// Id-bearing token (identifier, label, string/char/int literal).
    Id { op: u8, value: u16 },
    /// Any other opcode.
    Plain { op: u8 },
}

impl Token<'_> {
    /// The raw opcode byte.
    pub fn op(&self) -> u8 {
        match *self {
            Token::Eof => EOFTOKEN,
            Token::Line => LINE,
            Token::Filename { .. } => FILENAME,
            Token::Id { op, .. } | Token::Plain { op } => op,
        }
    }

    /// The 16-bit id payload, or 0 for tokens that carry none.
    pub fn id_value(&self) -> u16 {
        match *self {
            Token::Id { value, .. } => value,
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Mapped(m) => m,
            Backing::Owned(v) => v,
        }
    }
}

/// Handle to an open, immutable CTF stream.
#[derive(Debug)]
pub struct CtfHandle {
    backing: Backing,
}

impl CtfHandle {
    /// Open and map a CTF file read-only, validating the magic header.
    pub fn open(path: &Path) -> Result<Self, CtfError> {
        let file = File::open(path)?;
        let map = unsafe { Mmap::map(&file)? };
        Self::validate(map.as_ref()).map_err(|e| match e {
            CtfError::Format(msg) => CtfError::Format(format!("{}: {msg}", path.display())),
            other => other,
        })?;
        Ok(Self {
            backing: Backing::Mapped(map),
        })
    }

    /// Wrap an in-memory CTF stream, validating the magic header.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CtfError> {
        Self::validate(&bytes)?;
        Ok(Self {
            backing: Backing::Owned(bytes),
        })
    }

    fn validate(bytes: &[u8]) -> Result<(), CtfError> {
        if bytes.len() < CTF_MAGIC.len() {
            return Err(CtfError::Format("stream shorter than magic".into()));
        }
        // TDNs store stream offsets in 32 bits.
        if u32::try_from(bytes.len()).is_err() {
            return Err(CtfError::CapacityExceeded("stream larger than 4 GiB"));
        }
        if &bytes[..CTF_MAGIC.len()] != CTF_MAGIC {
            return Err(CtfError::Format(format!(
                "expected {:02X?}, got {:02X?}",
                CTF_MAGIC,
                &bytes[..CTF_MAGIC.len()]
            )));
        }
        Ok(())
    }

    /// The full mapped byte view, magic included.
    pub fn bytes(&self) -> &[u8] {
        self.backing.bytes()
    }

    /// Offset of the first token: just past the magic.
    pub fn first_token_offset(&self) -> usize {
        CTF_MAGIC.len()
    }

    /// Total stream length in bytes.
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    /// True for a stream holding nothing past the magic.
    pub fn is_empty(&self) -> bool {
        self.len() <= CTF_MAGIC.len()
    }

    /// Decode exactly one token starting at `offset`.  Returns the token
    /// and the offset of the next one.
    ///
    /// Any decode that would run past the end of the buffer, including a
    /// filename missing its NUL terminator, is `CtfError::Truncated`.
    pub fn read_token_at(&self, offset: usize) -> Result<(Token<'_>, usize), CtfError> {
        let buf = self.bytes();
        let op = *buf.get(offset).ok_or(CtfError::Truncated { offset })?;
        let mut next = offset + 1;

        if token::carries_id(op) {
            let hi = buf.get(next).ok_or(CtfError::Truncated { offset })?;
            let lo = buf.get(next + 1).ok_or(CtfError::Truncated { offset })?;
            let value = u16::from_be_bytes([*hi, *lo]);
            return Ok((Token::Id { op, value }, next + 2));
        }

        match op {
            EOFTOKEN => Ok((Token::Eof, next)),
            LINE => Ok((Token::Line, next)),
            FILENAME => {
                let ts = buf
                    .get(next..next + 4)
                    .ok_or(CtfError::Truncated { offset })?;
                let mtime = u32::from_be_bytes([ts[0], ts[1], ts[2], ts[3]]);
                next += 4;
                let rest = &buf[next..];
                let nul = rest
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or(CtfError::Truncated { offset })?;
                let path = &rest[..nul];
                Ok((Token::Filename { mtime, path }, next + nul + 1))
            }
            _ => Ok((Token::Plain { op }, next)),
        }
    }

    /// The path embedded in the FILENAME token at `name_offset`, lossily
    /// decoded for display.
    pub fn filename_at(&self, name_offset: usize) -> Result<String, CtfError> {
        match self.read_token_at(name_offset)? {
            (Token::Filename { path, .. }, _) => Ok(String::from_utf8_lossy(path).into_owned()),
            _ => Err(CtfError::Format(format!(
                "no FILENAME token at offset {name_offset}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
