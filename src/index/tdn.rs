// Tuple description nodes and the tuple builder.
//
// A TDN summarizes one window of `tuple_size - 1` consecutive non-line
// tokens: a CRC over the window, the byte offset of its first token,
// the offset of the enclosing FILENAME token, and a packed
// (stream-id, line-number) pair.  Windows overlap, advancing one token
// at a time, which is what gives single-token run boundaries later.
//
// The window is deliberately one token short of the reported minimum
// match length: with 32-bit CRCs a single colliding tuple could seed a
// spurious match, but a run only becomes reportable once a *second*,
// independently hashed tuple extends it, roughly squaring the collision
// probability.  Treat the -1 as a tuned constant, not a parameter.

use rand::Rng;
use rand::rngs::ThreadRng;

use crate::ctf::token::{COMMA, INTVAL};
use crate::ctf::{CtfError, CtfHandle, Token};
use crate::params::{Params, SearchFlags};

/// Streams per session: 12 bits of packed id, slot 0 reserved.
pub const MAX_STREAMS: usize = 1 << 12;
/// Lines per source file: 20 bits of packed line number.
pub const MAX_LINES: u32 = 1 << 20;

// ---------------------------------------------------------------------------
// Arena handles
// ---------------------------------------------------------------------------

/// Stable handle to a TDN in the session arena.  Handles are assigned
/// from a monotonically increasing counter, so hashing a handle pair is
/// stable where hashing node addresses would not be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TdnId(u32);

impl TdnId {
    /// The arena slot.
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The raw counter value, used by the run-extension hash.
    #[inline(always)]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Growable arena owning every TDN of a comparison session.
#[derive(Default)]
pub struct TdnArena {
    nodes: Vec<Tdn>,
}

impl TdnArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of TDNs allocated so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Store a TDN, returning its handle.
    pub fn alloc(&mut self, tdn: Tdn) -> Result<TdnId, CtfError> {
        let id = u32::try_from(self.nodes.len())
            .map_err(|_| CtfError::ResourceExhausted("TDN arena"))?;
        self.nodes.push(tdn);
        Ok(TdnId(id))
    }

    /// Drop every TDN between independent comparison sessions.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

impl std::ops::Index<TdnId> for TdnArena {
    type Output = Tdn;

    #[inline(always)]
    fn index(&self, id: TdnId) -> &Tdn {
        &self.nodes[id.index()]
    }
}

impl std::ops::IndexMut<TdnId> for TdnArena {
    #[inline(always)]
    fn index_mut(&mut self, id: TdnId) -> &mut Tdn {
        &mut self.nodes[id.index()]
    }
}

// ---------------------------------------------------------------------------
// TDN
// ---------------------------------------------------------------------------

/// One tuple description node.  Immutable once built, except that the
/// scan loop links each node to its predecessor from the same stream.
#[derive(Debug, Clone, Copy)]
pub struct Tdn {
    /// CRC over the window: token kinds only in isomorphic mode, kinds
    /// plus id values otherwise.
    pub crc: u32,
    /// Byte offset of the window's first token.
    pub offset: u32,
    /// Byte offset of the enclosing FILENAME token.
    pub name_offset: u32,
    /// Packed 12-bit stream id / 20-bit line number.
    file_line: u32,
    /// The TDN built immediately before this one from the same stream.
    /// Used only for run-extension hashing.
    pub prev: Option<TdnId>,
}

impl Tdn {
    /// Assemble a TDN, packing the (stream id, line) pair.
    pub fn new(
        crc: u32,
        offset: u32,
        name_offset: u32,
        stream_id: u16,
        line: u32,
        prev: Option<TdnId>,
    ) -> Result<Self, CtfError> {
        Ok(Self {
            crc,
            offset,
            name_offset,
            file_line: Self::pack(stream_id, line)?,
            prev,
        })
    }

    fn pack(stream_id: u16, line: u32) -> Result<u32, CtfError> {
        if line >= MAX_LINES {
            return Err(CtfError::CapacityExceeded("line number space (2^20)"));
        }
        debug_assert!((stream_id as usize) < MAX_STREAMS);
        Ok(u32::from(stream_id) << 20 | line)
    }

    /// Stream id of the CTF file this tuple came from.
    #[inline(always)]
    pub fn stream_id(&self) -> u16 {
        (self.file_line >> 20) as u16
    }

    /// Line number of the window's first token.
    #[inline(always)]
    pub fn line(&self) -> u32 {
        self.file_line & (MAX_LINES - 1)
    }
}

// ---------------------------------------------------------------------------
// Tuple builder
// ---------------------------------------------------------------------------

/// Builds overlapping tuple windows from a CTF stream, one call per
/// window.  Holds the forward cursor, the running line counter, and the
/// current FILENAME anchor.
pub struct TupleBuilder<'a> {
    ctf: &'a CtfHandle,
    /// Resume offset: the second token of the previous window.
    cursor: usize,
    /// Line number in effect at `cursor`.
    linenum: u32,
    /// Offset of the FILENAME token enclosing the current position.
    name_offset: u32,
    kinds: Vec<u8>,
    vals: Vec<u8>,
    rng: ThreadRng,
}

impl<'a> TupleBuilder<'a> {
    pub fn new(ctf: &'a CtfHandle) -> Self {
        Self {
            ctf,
            cursor: ctf.first_token_offset(),
            linenum: 1,
            name_offset: 0,
            kinds: Vec::new(),
            vals: Vec::new(),
            rng: rand::rng(),
        }
    }

    /// Build the next tuple description, or `None` once fewer than
    /// `tuple_size - 1` tokens remain.  The short trailing window is
    /// discarded, never matched.
    pub fn next_tdn(
        &mut self,
        stream_id: u16,
        params: &mut Params,
    ) -> Result<Option<Tdn>, CtfError> {
        let window = params.window_len();
        let isomorphic = params.flags.contains(SearchFlags::ISOMORPHIC);
        let heuristics = params.flags.contains(SearchFlags::COMP_HEUR);

        let ctf = self.ctf;
        let mut posn = self.cursor;
        let mut linenum = self.linenum;
        let mut first_offset = 0usize;
        let mut first_line = 0u32;
        let mut accumulated = 0usize;
        let (mut ptok, mut pptok) = (0u8, 0u8);
        self.kinds.clear();
        self.vals.clear();

        while accumulated < window && posn < ctf.len() {
            let (tok, next) = ctf.read_token_at(posn)?;
            match tok {
                Token::Eof => break,

                Token::Filename { .. } => {
                    // New source file: discard the partial window and
                    // anchor the next one here.
                    accumulated = 0;
                    self.kinds.clear();
                    self.vals.clear();
                    self.name_offset = posn as u32;
                    linenum = 1;
                }

                Token::Line => linenum += 1,

                Token::Id { op, value } => {
                    if accumulated == 0 {
                        first_offset = posn;
                        first_line = linenum;
                    }
                    if accumulated == 1 {
                        self.cursor = posn;
                        self.linenum = linenum;
                    }
                    // Runs of comma-separated integer literals (big
                    // initializer tables) match each other constantly
                    // and mean nothing.  Scrambling the id value breaks
                    // those matches at the cost of a controlled false
                    // negative.
                    let value = if heuristics && pptok == INTVAL && ptok == COMMA && op == INTVAL {
                        self.rng.random::<u16>()
                    } else {
                        value
                    };
                    self.kinds.push(op);
                    self.vals.extend_from_slice(&value.to_be_bytes());
                    accumulated += 1;
                    pptok = ptok;
                    ptok = op;
                }

                Token::Plain { op } => {
                    if accumulated == 0 {
                        first_offset = posn;
                        first_line = linenum;
                    }
                    if accumulated == 1 {
                        self.cursor = posn;
                        self.linenum = linenum;
                    }
                    self.kinds.push(op);
                    self.vals.extend_from_slice(&[0, 0]);
                    accumulated += 1;
                    pptok = ptok;
                    ptok = op;
                }
            }
            posn = next;
        }

        if accumulated < window {
            return Ok(None);
        }

        // Kinds-only CRC when an isomorphic pass will compare the id
        // values under substitution; otherwise the values are part of
        // the match identity.
        let mut crc = crc32c::crc32c(&self.kinds);
        if !isomorphic {
            crc = crc32c::crc32c_append(crc, &self.vals);
        }

        params.tdn_count += 1;
        Ok(Some(Tdn {
            crc,
            offset: first_offset as u32,
            name_offset: self.name_offset,
            file_line: Tdn::pack(stream_id, first_line)?,
            prev: None,
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctf::handle::CTF_MAGIC;
    use crate::ctf::token::{FILENAME, IDENTIFIER, LINE, SEMICOLON};

    fn stream(body: &[u8]) -> CtfHandle {
        let mut v = CTF_MAGIC.to_vec();
        v.extend_from_slice(body);
        CtfHandle::from_bytes(v).unwrap()
    }

    fn file_marker(name: &[u8]) -> Vec<u8> {
        let mut v = vec![FILENAME, 0, 0, 0, 0];
        v.extend_from_slice(name);
        v.push(0);
        v
    }

    fn ident(value: u16) -> Vec<u8> {
        let [hi, lo] = value.to_be_bytes();
        vec![IDENTIFIER, hi, lo]
    }

    fn small_params() -> Params {
        Params {
            tuple_size: 4,
            ..Params::default()
        }
    }

    #[test]
    fn windows_overlap_one_token_at_a_time() {
        let mut body = file_marker(b"a.c");
        for v in 0..6u16 {
            body.extend_from_slice(&ident(v));
        }
        let ctf = stream(&body);
        let mut b = TupleBuilder::new(&ctf);
        let mut p = small_params();

        let offsets: Vec<u32> = std::iter::from_fn(|| b.next_tdn(1, &mut p).unwrap())
            .map(|t| t.offset)
            .collect();
        // 6 tokens, window 3: windows start at tokens 0..=3, each 3 bytes
        // past the previous.
        assert_eq!(offsets.len(), 4);
        for w in offsets.windows(2) {
            assert_eq!(w[1] - w[0], 3);
        }
        assert_eq!(p.tdn_count, 4);
    }

    #[test]
    fn line_tokens_are_zero_width() {
        let mut body = file_marker(b"a.c");
        body.extend_from_slice(&ident(1));
        body.push(LINE);
        body.extend_from_slice(&ident(2));
        body.push(LINE);
        body.extend_from_slice(&ident(3));
        let ctf = stream(&body);
        let mut b = TupleBuilder::new(&ctf);
        let mut p = small_params();

        let tdn = b.next_tdn(1, &mut p).unwrap().unwrap();
        assert_eq!(tdn.line(), 1);
        // Window completed despite the interleaved LINE tokens.
        assert!(b.next_tdn(1, &mut p).unwrap().is_none());
    }

    #[test]
    fn filename_resets_accumulation() {
        let mut body = file_marker(b"a.c");
        body.extend_from_slice(&ident(1));
        body.extend_from_slice(&ident(2));
        let marker_at = CTF_MAGIC.len() + body.len();
        body.extend_from_slice(&file_marker(b"b.c"));
        for v in 3..6u16 {
            body.extend_from_slice(&ident(v));
        }
        let ctf = stream(&body);
        let mut b = TupleBuilder::new(&ctf);
        let mut p = small_params();

        // The only complete window lives entirely in b.c.
        let tdn = b.next_tdn(1, &mut p).unwrap().unwrap();
        assert_eq!(tdn.name_offset as usize, marker_at);
        assert_eq!(tdn.line(), 1);
    }

    #[test]
    fn short_tail_is_discarded() {
        let mut body = file_marker(b"a.c");
        body.push(SEMICOLON);
        body.push(SEMICOLON);
        let ctf = stream(&body);
        let mut b = TupleBuilder::new(&ctf);
        let mut p = small_params();
        assert!(b.next_tdn(1, &mut p).unwrap().is_none());
    }

    #[test]
    fn isomorphic_crc_ignores_id_values() {
        let mut body_a = file_marker(b"a.c");
        let mut body_b = file_marker(b"a.c");
        for v in 0..3u16 {
            body_a.extend_from_slice(&ident(v));
            body_b.extend_from_slice(&ident(v + 100));
        }
        let ctf_a = stream(&body_a);
        let ctf_b = stream(&body_b);

        let mut iso = Params {
            flags: SearchFlags::ISOMORPHIC,
            ..small_params()
        };
        let ta = TupleBuilder::new(&ctf_a)
            .next_tdn(1, &mut iso)
            .unwrap()
            .unwrap();
        let tb = TupleBuilder::new(&ctf_b)
            .next_tdn(2, &mut iso)
            .unwrap()
            .unwrap();
        assert_eq!(ta.crc, tb.crc);

        let mut full = small_params();
        let ta = TupleBuilder::new(&ctf_a)
            .next_tdn(1, &mut full)
            .unwrap()
            .unwrap();
        let tb = TupleBuilder::new(&ctf_b)
            .next_tdn(2, &mut full)
            .unwrap()
            .unwrap();
        assert_ne!(ta.crc, tb.crc);
    }

    #[test]
    fn heuristic_scrambles_comma_separated_intvals() {
        // INTVAL , INTVAL , INTVAL ... with heuristics on, two
        // identical streams should (almost surely) hash differently.
        let mut body = file_marker(b"a.c");
        for _ in 0..8 {
            body.extend_from_slice(&[INTVAL, 0, 5, COMMA]);
        }
        let mut p = Params {
            tuple_size: 8,
            flags: SearchFlags::COMP_HEUR,
            ..Params::default()
        };
        let ctf = stream(&body);
        let a = TupleBuilder::new(&ctf)
            .next_tdn(1, &mut p)
            .unwrap()
            .unwrap();
        let b = TupleBuilder::new(&ctf)
            .next_tdn(1, &mut p)
            .unwrap()
            .unwrap();
        assert_ne!(a.crc, b.crc);
    }

    #[test]
    fn packed_file_line_boundary() {
        let packed = Tdn::pack((MAX_STREAMS - 1) as u16, MAX_LINES - 1).unwrap();
        let tdn = Tdn {
            crc: 0,
            offset: 0,
            name_offset: 0,
            file_line: packed,
            prev: None,
        };
        assert_eq!(tdn.stream_id() as usize, MAX_STREAMS - 1);
        assert_eq!(tdn.line(), MAX_LINES - 1);
    }

    #[test]
    fn line_overflow_is_capacity_error() {
        assert!(matches!(
            Tdn::pack(1, MAX_LINES),
            Err(CtfError::CapacityExceeded(_))
        ));
    }
}
