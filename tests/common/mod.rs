// Shared CTF stream builder for the integration tests.
//
// The real tokenizers are out of scope for the library, so tests
// synthesize streams byte by byte in the documented wire format.
#![allow(dead_code)]

use oxicompare::ctf::token;

/// Builds a CTF byte stream: magic, then tokens, then EOF.
pub struct CtfWriter {
    buf: Vec<u8>,
}

impl CtfWriter {
    pub fn new() -> Self {
        Self {
            buf: b"ctf2.1".to_vec(),
        }
    }

    /// Start a new source file: FILENAME opcode, 4-byte timestamp,
    /// NUL-terminated path.
    pub fn file(&mut self, name: &str, mtime: u32) -> &mut Self {
        self.buf.push(token::FILENAME);
        self.buf.extend_from_slice(&mtime.to_be_bytes());
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.push(0);
        self
    }

    /// One plain opcode.
    pub fn tok(&mut self, op: u8) -> &mut Self {
        self.buf.push(op);
        self
    }

    /// An id-bearing opcode with its big-endian 16-bit payload.
    pub fn id(&mut self, op: u8, value: u16) -> &mut Self {
        self.buf.push(op);
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// A LINE marker.
    pub fn line(&mut self) -> &mut Self {
        self.buf.push(token::LINE);
        self
    }

    /// Terminate with EOF and return the stream bytes.
    pub fn finish(&mut self) -> Vec<u8> {
        let mut out = std::mem::take(&mut self.buf);
        out.push(token::EOFTOKEN);
        out
    }
}

/// The token body of a tiny two-argument max() function, with the
/// inner local's id as a parameter so tests can rename it.
pub fn max_function(name_id: u16, x_id: u16, y_id: u16) -> Vec<(u8, u16)> {
    use oxicompare::ctf::token::*;
    vec![
        (INT, 0),
        (IDENTIFIER, name_id),
        (OPENPAREN, 0),
        (INT, 0),
        (IDENTIFIER, x_id),
        (COMMA, 0),
        (INT, 0),
        (IDENTIFIER, y_id),
        (CLOSEPAREN, 0),
        (OPENCURLY, 0),
        (IF, 0),
        (OPENPAREN, 0),
        (IDENTIFIER, x_id),
        (GT, 0),
        (IDENTIFIER, y_id),
        (CLOSEPAREN, 0),
        (RETURN, 0),
        (IDENTIFIER, x_id),
        (SEMICOLON, 0),
        (RETURN, 0),
        (IDENTIFIER, y_id),
        (SEMICOLON, 0),
        (CLOSECURLY, 0),
    ]
}

/// Write a single-file stream with a LINE marker after every third
/// token, roughly one statement per line.
pub fn stream_of(file: &str, body: &[(u8, u16)]) -> Vec<u8> {
    let mut w = CtfWriter::new();
    w.file(file, 1_600_000_000);
    for (i, &(op, value)) in body.iter().enumerate() {
        if token::carries_id(op) {
            w.id(op, value);
        } else {
            w.tok(op);
        }
        if i % 3 == 2 {
            w.line();
        }
    }
    w.finish()
}
