// Incremental run tracking.
//
// A run is a maximal-so-far matching region between two streams.  Runs
// live in exactly one of two lists: *incomplete* (still extendable) or
// *completed* (finalized, eligible for reporting), and move between
// them exactly once.
//
// Extension is O(1): a 2^24-slot table maps the hash of a run's two
// current end handles to the run.  A new matching pair `(t, u)` can
// only extend a run whose ends are exactly `(t.prev, u.prev)`, so one
// probe with the pair's predecessors replaces a scan of every
// incomplete run.  A probe hit is verified against the run's actual
// ends; hash collisions fall back to run creation.

use log::{debug, trace};

use crate::ctf::CtfError;
use crate::index::tdn::{TdnArena, TdnId};

const EXT_BITS: u32 = 24;
const EXT_SLOTS: usize = 1 << EXT_BITS;
const EXT_MASK: u32 = (EXT_SLOTS as u32) - 1;
const EMPTY: u32 = u32::MAX;

/// Handle to a run in the tracker's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunId(u32);

impl RunId {
    #[inline(always)]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One matching region.  The two start nodes are fixed for the run's
/// lifetime; the end nodes advance monotonically as the run extends.
#[derive(Debug, Clone, Copy)]
pub struct Run {
    /// First TDN of the stream being scanned.
    pub src_start: TdnId,
    /// First TDN of the already-indexed stream.
    pub dst_start: TdnId,
    /// Current last TDN on the scanned side.
    pub src_end: TdnId,
    /// Current last TDN on the indexed side.
    pub dst_end: TdnId,
    /// Length in tokens, seeded at `tuple_size - 1`.
    pub length: u32,
    /// Set when this run was created or extended while processing the
    /// current incoming TDN; cleared before the next one.
    touched: bool,
}

fn end_hash(a: TdnId, b: TdnId) -> usize {
    let h = a.raw().wrapping_mul(0x9E37_79B1) ^ b.raw().wrapping_mul(0x85EB_CA77);
    (h & EXT_MASK) as usize
}

/// The two run lists plus the extension lookup table.
pub struct RunTracker {
    runs: Vec<Run>,
    incomplete: Vec<RunId>,
    completed: Vec<RunId>,
    ext_table: Vec<u32>,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            runs: Vec::new(),
            incomplete: Vec::new(),
            completed: Vec::new(),
            ext_table: vec![EMPTY; EXT_SLOTS],
        }
    }

    #[inline(always)]
    pub fn run(&self, id: RunId) -> &Run {
        &self.runs[id.index()]
    }

    /// Completed runs in completion order.
    pub fn completed(&self) -> impl Iterator<Item = &Run> {
        self.completed.iter().map(|&id| &self.runs[id.index()])
    }

    /// Number of runs still open.
    pub fn incomplete_len(&self) -> usize {
        self.incomplete.len()
    }

    /// Move the completed runs out, leaving the list empty.  Used by
    /// partial reporting to bound memory between streams.
    pub fn take_completed(&mut self) -> Vec<Run> {
        self.completed
            .drain(..)
            .map(|id| self.runs[id.index()])
            .collect()
    }

    /// Clear the touched marks before processing the next incoming TDN.
    pub fn unmark_all(&mut self) {
        for &id in &self.incomplete {
            self.runs[id.index()].touched = false;
        }
    }

    /// Discard any incomplete runs outright (fresh stream start).
    pub fn discard_incomplete(&mut self) {
        while let Some(id) = self.incomplete.pop() {
            self.clear_slot(id);
        }
    }

    fn slot_of(&self, id: RunId) -> usize {
        let run = &self.runs[id.index()];
        end_hash(run.src_end, run.dst_end)
    }

    /// Clear the run's extension slot, but only if it still owns it;
    /// a colliding newer run may have overwritten it.
    fn clear_slot(&mut self, id: RunId) {
        let slot = self.slot_of(id);
        if self.ext_table[slot] == id.0 {
            self.ext_table[slot] = EMPTY;
        }
    }

    fn set_slot(&mut self, id: RunId) {
        let slot = self.slot_of(id);
        self.ext_table[slot] = id.0;
    }

    /// Record that TDNs `t` (scanned stream) and `u` (indexed stream)
    /// match: extend the run ending at their predecessors if one
    /// exists, otherwise seed a new run of length `seed_len`.
    pub fn add_or_extend(
        &mut self,
        t: TdnId,
        u: TdnId,
        arena: &TdnArena,
        seed_len: u32,
    ) -> Result<(), CtfError> {
        if let (Some(tp), Some(up)) = (arena[t].prev, arena[u].prev) {
            let slot = end_hash(tp, up);
            let cand = self.ext_table[slot];
            if cand != EMPTY {
                let run = &self.runs[cand as usize];
                if run.src_end == tp && run.dst_end == up {
                    self.extend(RunId(cand), t, u);
                    return Ok(());
                }
            }
        }
        self.create(t, u, seed_len)
    }

    fn extend(&mut self, id: RunId, t: TdnId, u: TdnId) {
        self.clear_slot(id);
        let run = &mut self.runs[id.index()];
        run.src_end = t;
        run.dst_end = u;
        run.length += 1;
        run.touched = true;
        trace!("extended run {} to length {}", id.0, run.length);
        self.set_slot(id);
    }

    fn create(&mut self, t: TdnId, u: TdnId, seed_len: u32) -> Result<(), CtfError> {
        let id = u32::try_from(self.runs.len())
            .ok()
            .filter(|&v| v != EMPTY)
            .ok_or(CtfError::ResourceExhausted("run arena"))?;
        self.runs.push(Run {
            src_start: t,
            dst_start: u,
            src_end: t,
            dst_end: u,
            length: seed_len,
            touched: true,
        });
        let id = RunId(id);
        trace!("new run {} seeded at length {seed_len}", id.0);
        self.set_slot(id);
        self.incomplete.push(id);
        Ok(())
    }

    /// Move runs from incomplete to completed.  With `only_untouched`,
    /// runs touched this pass stay open; otherwise everything
    /// completes (file boundary or end of stream; a run never spans
    /// two source files).
    ///
    /// `keep` decides whether a completing run is promoted or dropped
    /// (the isomorphism check); dropping is a normal negative outcome.
    /// Returns the number of runs promoted.
    pub fn complete_pass<F>(&mut self, only_untouched: bool, mut keep: F) -> Result<usize, CtfError>
    where
        F: FnMut(&Run) -> Result<bool, CtfError>,
    {
        let drained = std::mem::take(&mut self.incomplete);
        let mut moved = 0usize;
        for id in drained {
            if only_untouched && self.runs[id.index()].touched {
                self.incomplete.push(id);
                continue;
            }
            self.clear_slot(id);
            if !keep(&self.runs[id.index()])? {
                continue;
            }
            debug!(
                "completed run {} at length {}",
                id.0,
                self.runs[id.index()].length
            );
            self.completed.push(id);
            moved += 1;
        }
        Ok(moved)
    }

    /// Drop all run state between independent sessions.
    pub fn clear(&mut self) {
        self.runs.clear();
        self.incomplete.clear();
        self.completed.clear();
        self.ext_table.fill(EMPTY);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
