// A comparison session.
//
// The session owns every piece of shared mutable state the original
// algorithm kept in globals: the open stream handles, the TDN arena,
// the bucket index, the run tracker, and the isomorphism maps.
// Sessions are constructed fresh per comparison run and are strictly
// single-threaded; independent sessions may run on separate threads.
//
// Streams are scanned one at a time, each fully before the next:
// run-extension correctness depends on every TDN from earlier streams
// being indexed before the current stream is walked.

use std::path::Path;

use crate::ctf::{CtfError, CtfHandle};
use crate::index::bucket::BucketIndex;
use crate::index::tdn::{MAX_STREAMS, TdnArena, TdnId, TupleBuilder};
use crate::params::{Params, SearchFlags};
use crate::runs::isomorph::{IsoMaps, check_isomorphic_run};
use crate::runs::tracker::{Run, RunTracker};

/// All state for one comparison run over an ordered list of streams.
pub struct Session {
    /// Open handles, indexed by stream id.  Slot 0 is unused: list
    /// position is the 1-based file id embedded in TDNs.
    handles: Vec<Option<CtfHandle>>,
    names: Vec<String>,
    arena: TdnArena,
    index: BucketIndex,
    tracker: RunTracker,
    iso: IsoMaps,
    /// Whether any stream's tuples have been indexed yet; the first
    /// stream of a cross-tree-only session skips the search entirely.
    any_indexed: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            handles: vec![None],
            names: vec![String::new()],
            arena: TdnArena::new(),
            index: BucketIndex::new(),
            tracker: RunTracker::new(),
            iso: IsoMaps::new(),
            any_indexed: false,
        }
    }

    /// Open a CTF file and register it, returning its stream id.
    pub fn add_stream(&mut self, path: &Path) -> Result<u16, CtfError> {
        let handle = CtfHandle::open(path)?;
        self.register(path.display().to_string(), handle)
    }

    /// Register an in-memory stream (testing and embedding).
    pub fn add_stream_bytes(&mut self, name: &str, bytes: Vec<u8>) -> Result<u16, CtfError> {
        let handle = CtfHandle::from_bytes(bytes)?;
        self.register(name.to_string(), handle)
    }

    fn register(&mut self, name: String, handle: CtfHandle) -> Result<u16, CtfError> {
        if self.handles.len() >= MAX_STREAMS {
            return Err(CtfError::CapacityExceeded("stream id space (4096)"));
        }
        let id = self.handles.len() as u16;
        self.handles.push(Some(handle));
        self.names.push(name);
        Ok(id)
    }

    /// Number of registered streams.
    pub fn stream_count(&self) -> usize {
        self.handles.len() - 1
    }

    /// The handle for a stream id.
    pub fn handle(&self, id: u16) -> Result<&CtfHandle, CtfError> {
        self.handles
            .get(id as usize)
            .and_then(|h| h.as_ref())
            .ok_or(CtfError::ResourceExhausted("unknown stream id"))
    }

    /// The registered name for a stream id.
    pub fn name(&self, id: u16) -> &str {
        &self.names[id as usize]
    }

    /// The TDN behind a handle (used by reporting).
    pub fn tdn(&self, id: TdnId) -> &crate::index::tdn::Tdn {
        &self.arena[id]
    }

    /// Completed runs so far, in completion order.
    pub fn completed(&self) -> impl Iterator<Item = &Run> {
        self.tracker.completed()
    }

    /// Move the completed runs out (partial reporting).
    pub fn take_completed(&mut self) -> Vec<Run> {
        self.tracker.take_completed()
    }

    /// Drop all comparison state, keeping the registered streams.
    pub fn reset(&mut self) {
        self.arena.clear();
        self.index.clear();
        self.tracker.clear();
        self.iso.clear();
        self.any_indexed = false;
    }

    /// Walk one stream's tuples: match each against the index, create
    /// and extend runs, then index the tuples for later streams.
    ///
    /// Errors abort this stream only; runs completed from prior input
    /// remain valid.
    pub fn scan_stream(&mut self, stream_id: u16, params: &mut Params) -> Result<(), CtfError> {
        let no_search = params.flags.contains(SearchFlags::NO_SEARCH);
        let all_matches = params.flags.contains(SearchFlags::WITHIN_TREE) && !no_search;
        let same_file = params.flags.contains(SearchFlags::SAME_FILE);
        let last_file = params.flags.contains(SearchFlags::LAST_FILE);
        let iso_on = params.flags.contains(SearchFlags::ISOMORPHIC);
        // Doubled: every relation is recorded in both directions.
        let budget = 2 * params.isomorph_count_threshold;
        let seed_len = params.window_len() as u32;

        let handle = self
            .handles
            .get(stream_id as usize)
            .and_then(|h| h.as_ref())
            .ok_or(CtfError::ResourceExhausted("unknown stream id"))?;

        self.tracker.discard_incomplete();
        if no_search {
            self.any_indexed = false;
        }

        let mut builder = TupleBuilder::new(handle);
        let mut last_tdn: Option<TdnId> = None;

        // First stream of a cross-tree-only session: nothing to compare
        // against yet, just index.
        if !all_matches && !self.any_indexed {
            while let Some(mut tdn) = builder.next_tdn(stream_id, params)? {
                tdn.prev = last_tdn;
                let crc = tdn.crc;
                let tid = self.arena.alloc(tdn)?;
                last_tdn = Some(tid);
                let after = self.index.chain(crc).next();
                self.index.insert(tid, crc, stream_id, after)?;
            }
            self.any_indexed = true;
            return Ok(());
        }

        let mut cur_name_offset = 0u32;

        while let Some(mut tdn) = builder.next_tdn(stream_id, params)? {
            // Link to the previous TDN first, so a run found for this
            // pair can extend through it.
            tdn.prev = last_tdn;
            let tid = self.arena.alloc(tdn)?;
            last_tdn = Some(tid);

            // A new enclosing source file: every open run is complete,
            // because a run can never span two source files.
            if cur_name_offset != tdn.name_offset {
                params.run_count += complete_runs(
                    &mut self.tracker,
                    &self.arena,
                    &self.handles,
                    &mut self.iso,
                    false,
                    iso_on,
                    budget,
                )?;
                cur_name_offset = tdn.name_offset;
            }

            self.tracker.unmark_all();

            let crc_low = (tdn.crc & 0xff) as u8;
            let mut last_entry = None;
            for entry_id in self.index.chain(tdn.crc) {
                let entry = *self.index.entry(entry_id);
                // Same-stream entries are clustered; when cross-tree
                // matching only, the first one ends the scan.
                if !all_matches && entry.stream_id == stream_id {
                    break;
                }
                last_entry = Some(entry_id);
                // Top 24 CRC bits match by bucket; the cached low byte
                // completes the 32-bit equality test.
                if entry.crc_low != crc_low {
                    continue;
                }
                // Self-matches inside one source file are not reported
                // unless explicitly requested.
                if entry.stream_id == stream_id
                    && !same_file
                    && self.arena[entry.node].name_offset == tdn.name_offset
                {
                    continue;
                }
                params.cmp_count += 1;
                self.tracker
                    .add_or_extend(tid, entry.node, &self.arena, seed_len)?;
            }

            params.run_count += complete_runs(
                &mut self.tracker,
                &self.arena,
                &self.handles,
                &mut self.iso,
                true,
                iso_on,
                budget,
            )?;

            // Index this tuple for later streams (and for this one,
            // when searching within the tree).  The final stream's
            // tuples have no future readers.
            if all_matches || !last_file {
                self.index
                    .insert(tid, self.arena[tid].crc, stream_id, last_entry)?;
            }
        }

        params.run_count += complete_runs(
            &mut self.tracker,
            &self.arena,
            &self.handles,
            &mut self.iso,
            false,
            iso_on,
            budget,
        )?;
        self.any_indexed = true;
        Ok(())
    }
}

/// Promote finished runs, filtering through the isomorphism check when
/// it is enabled.
fn complete_runs(
    tracker: &mut RunTracker,
    arena: &TdnArena,
    handles: &[Option<CtfHandle>],
    maps: &mut IsoMaps,
    only_untouched: bool,
    iso_on: bool,
    budget: usize,
) -> Result<usize, CtfError> {
    tracker.complete_pass(only_untouched, |run| {
        if !iso_on {
            return Ok(true);
        }
        let src = &arena[run.src_start];
        let dst = &arena[run.dst_start];
        let sh = handles[src.stream_id() as usize]
            .as_ref()
            .ok_or(CtfError::ResourceExhausted("closed stream handle"))?;
        let dh = handles[dst.stream_id() as usize]
            .as_ref()
            .ok_or(CtfError::ResourceExhausted("closed stream handle"))?;
        check_isomorphic_run(
            maps,
            sh,
            src.offset as usize,
            dh,
            dst.offset as usize,
            run.length as usize,
            budget,
        )
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
