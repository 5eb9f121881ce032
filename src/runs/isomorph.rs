// Renaming-tolerant comparison of two completed run windows.
//
// Two regions are isomorphic when their token kinds match position by
// position and a single consistent bijection maps each side's
// identifier ids onto the other's.  Literal ids (strings, chars, ints)
// are never remapped: the isomorphic-mode tuple CRC excluded all id
// values from the digest, so literal equality has to be re-checked here.

use crate::ctf::token::{self, FILENAME, LINE};
use crate::ctf::{CtfError, CtfHandle};

const ID_SPACE: usize = 1 << 16;

// ---------------------------------------------------------------------------
// Mapping tables
// ---------------------------------------------------------------------------

/// The two directional identifier maps plus the list of slots used,
/// so clearing costs O(entries used) rather than O(table size).
///
/// Entries store `id + 1`; 0 is the empty sentinel, which keeps id
/// value 0 mappable.
pub struct IsoMaps {
    dst_to_src: Vec<u32>,
    src_to_dst: Vec<u32>,
    seen: Vec<u16>,
}

impl Default for IsoMaps {
    fn default() -> Self {
        Self::new()
    }
}

impl IsoMaps {
    pub fn new() -> Self {
        Self {
            dst_to_src: vec![0; ID_SPACE],
            src_to_dst: vec![0; ID_SPACE],
            seen: Vec::new(),
        }
    }

    /// Zero only the slots touched since the last clear.
    pub fn clear(&mut self) {
        for id in self.seen.drain(..) {
            self.dst_to_src[id as usize] = 0;
            self.src_to_dst[id as usize] = 0;
        }
    }

    /// Distinct relations recorded (both directions counted).
    pub fn relations(&self) -> usize {
        self.seen.len()
    }

    /// The source id mapped to `dst`, if any.
    pub fn src_for(&self, dst: u16) -> Option<u16> {
        match self.dst_to_src[dst as usize] {
            0 => None,
            v => Some((v - 1) as u16),
        }
    }

    /// The destination id mapped to `src`, if any.
    pub fn dst_for(&self, src: u16) -> Option<u16> {
        match self.src_to_dst[src as usize] {
            0 => None,
            v => Some((v - 1) as u16),
        }
    }
}

// ---------------------------------------------------------------------------
// The check
// ---------------------------------------------------------------------------

/// Walk `length` non-line tokens of both windows, verifying a
/// consistent bijective identifier renaming.  `relation_budget` is the
/// caller's threshold already doubled for the two-way mapping.
///
/// Rejection is a normal negative outcome, not an error; `maps` holds
/// the recorded bijection when the result is `Ok(true)`.
pub fn check_isomorphic_run(
    maps: &mut IsoMaps,
    src: &CtfHandle,
    src_offset: usize,
    dst: &CtfHandle,
    dst_offset: usize,
    length: usize,
    relation_budget: usize,
) -> Result<bool, CtfError> {
    maps.clear();

    let mut s = src_offset;
    let mut d = dst_offset;
    let mut walked = 0usize;

    while walked < length {
        // Line markers are zero-width on each side independently.
        let (mut stok, mut snext) = src.read_token_at(s)?;
        while stok.op() == LINE {
            s = snext;
            (stok, snext) = src.read_token_at(s)?;
        }
        let (mut dtok, mut dnext) = dst.read_token_at(d)?;
        while dtok.op() == LINE {
            d = dnext;
            (dtok, dnext) = dst.read_token_at(d)?;
        }

        // Runs never cross files; a FILENAME here means the run was
        // built wrong, and the pair is rejected outright.
        if stok.op() == FILENAME || dtok.op() == FILENAME {
            return Ok(false);
        }
        if stok.op() != dtok.op() {
            return Ok(false);
        }

        if token::carries_id(stok.op()) {
            let src_id = stok.id_value();
            let dst_id = dtok.id_value();
            if src_id != dst_id {
                if !token::remappable(stok.op()) {
                    return Ok(false);
                }
                if maps.dst_to_src[dst_id as usize] == 0 {
                    maps.dst_to_src[dst_id as usize] = u32::from(src_id) + 1;
                    maps.seen.push(dst_id);
                }
                if maps.src_to_dst[src_id as usize] == 0 {
                    maps.src_to_dst[src_id as usize] = u32::from(dst_id) + 1;
                    maps.seen.push(src_id);
                }
                if maps.dst_to_src[dst_id as usize] != u32::from(src_id) + 1 {
                    return Ok(false);
                }
                if maps.src_to_dst[src_id as usize] != u32::from(dst_id) + 1 {
                    return Ok(false);
                }
                if maps.seen.len() > relation_budget {
                    return Ok(false);
                }
            }
        }

        s = snext;
        d = dnext;
        walked += 1;
    }

    Ok(true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
