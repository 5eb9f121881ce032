// CRC-bucketed tuple index.
//
// A fixed table of 2^24 chain heads, indexed by the top 24 bits of a
// tuple's CRC.  Each chain entry caches the bottom 8 CRC bits and the
// stream id, so a candidate scan touches the TDN arena only on a real
// match: within a bucket the top 24 bits are already equal, making the
// cached low byte the full 32-bit equality test.
//
// Entries are never removed individually; the whole table clears in
// bulk between independent comparison sessions.

use super::tdn::TdnId;
use crate::ctf::CtfError;

/// CRC prefix bits used to select a bucket.  24 keeps chains short at
/// realistic corpus sizes while the head table stays one flat 64 MiB
/// allocation.
pub const BUCKET_BITS: u32 = 24;
const TABLE_SLOTS: usize = 1 << BUCKET_BITS;
const EMPTY: u32 = u32::MAX;

/// Handle to a chain entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryId(u32);

impl EntryId {
    #[inline(always)]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One chain node: a TDN handle plus the cached match-filter fields.
#[derive(Debug, Clone, Copy)]
pub struct BucketEntry {
    /// Bottom 8 bits of the TDN's CRC.
    pub crc_low: u8,
    /// Stream id the TDN came from.
    pub stream_id: u16,
    /// The indexed TDN.
    pub node: TdnId,
    next: u32,
}

/// The 2^24-slot tuple index.
pub struct BucketIndex {
    heads: Vec<u32>,
    entries: Vec<BucketEntry>,
}

impl Default for BucketIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl BucketIndex {
    pub fn new() -> Self {
        Self {
            heads: vec![EMPTY; TABLE_SLOTS],
            entries: Vec::new(),
        }
    }

    #[inline(always)]
    fn slot(crc: u32) -> usize {
        (crc >> (32 - BUCKET_BITS)) as usize
    }

    /// Number of indexed tuples.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline(always)]
    pub fn entry(&self, id: EntryId) -> &BucketEntry {
        &self.entries[id.index()]
    }

    /// Iterate the chain for a CRC's bucket in insertion-adjacency order.
    pub fn chain(&self, crc: u32) -> Chain<'_> {
        Chain {
            index: self,
            cur: self.heads[Self::slot(crc)],
        }
    }

    /// Insert a TDN into its bucket: at the chain head, or immediately
    /// after `after`.  Callers pass `after` to keep entries from the
    /// same stream adjacent, which lets a candidate scan stop at the
    /// first same-stream entry.
    pub fn insert(
        &mut self,
        node: TdnId,
        crc: u32,
        stream_id: u16,
        after: Option<EntryId>,
    ) -> Result<EntryId, CtfError> {
        let id = u32::try_from(self.entries.len())
            .ok()
            .filter(|&v| v != EMPTY)
            .ok_or(CtfError::ResourceExhausted("bucket index"))?;

        let next = match after {
            Some(prev) => {
                let prev = &mut self.entries[prev.index()];
                std::mem::replace(&mut prev.next, id)
            }
            None => {
                let slot = Self::slot(crc);
                std::mem::replace(&mut self.heads[slot], id)
            }
        };

        self.entries.push(BucketEntry {
            crc_low: (crc & 0xff) as u8,
            stream_id,
            node,
            next,
        });
        Ok(EntryId(id))
    }

    /// Drop every entry and chain between independent sessions.
    pub fn clear(&mut self) {
        self.heads.fill(EMPTY);
        self.entries.clear();
    }
}

/// Iterator over the entries of one bucket chain.
pub struct Chain<'a> {
    index: &'a BucketIndex,
    cur: u32,
}

impl Iterator for Chain<'_> {
    type Item = EntryId;

    fn next(&mut self) -> Option<EntryId> {
        if self.cur == EMPTY {
            return None;
        }
        let id = EntryId(self.cur);
        self.cur = self.index.entries[id.index()].next;
        Some(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
