// Comparison parameters and counters.
//
// One `Params` record threads every knob and statistic through the
// engine explicitly; there is no hidden global configuration.

use bitflags::bitflags;

/// Default tokens per reported match, and the minimum accepted.
pub const TUPLE_SIZE: usize = 16;

/// Default cap on distinct isomorphic identifier relations.  The engine
/// doubles it internally because every relation is recorded both ways.
pub const ISOMORPH_COUNT_THRESHOLD: usize = 3;

bitflags! {
    /// Search and printing flag bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SearchFlags: u32 {
        /// Compare token windows up to a consistent identifier renaming.
        const ISOMORPHIC    = 0x01;
        /// Also search for runs between files of the same stream.
        const WITHIN_TREE   = 0x02;
        /// Print the tokens of each reported run.
        const PRINT_TOKENS  = 0x04;
        /// Print the matched source lines of each reported run.
        const PRINT_CODE    = 0x08;
        /// Print the matched source lines side by side.
        const SIDE_BY_SIDE  = 0x10;
        /// Sort reported runs by descending length.
        const SORT_RESULTS  = 0x20;
        /// Index the stream's tuples without searching for runs.
        const NO_SEARCH     = 0x40;
        /// The stream being scanned is the last of the session; its
        /// tuples need not be indexed for later streams.
        const LAST_FILE     = 0x80;
        /// Drain and print completed runs while scanning instead of
        /// accumulating them.  Incompatible with SORT_RESULTS.
        const PART_PRINT    = 0x100;
        /// Scramble ids in `INTVAL COMMA INTVAL` contexts to suppress
        /// coincidental matches across numeric initializer lists.
        const COMP_HEUR     = 0x200;
        /// Report self-matches within a single source file.  Off by
        /// default even when WITHIN_TREE is set.
        const SAME_FILE     = 0x400;
    }
}

/// Parameters passed to every engine operation, plus running counters.
#[derive(Debug, Clone)]
pub struct Params {
    /// Tokens per reported match.  Tuple windows are built one token
    /// shorter (see `index::tdn`).
    pub tuple_size: usize,
    /// Cap on distinct isomorphic relations before a run is rejected.
    pub isomorph_count_threshold: usize,
    /// Search and printing flags.
    pub flags: SearchFlags,

    /// Runs of similarity found so far.
    pub run_count: usize,
    /// TDNs built so far.
    pub tdn_count: usize,
    /// Pairwise tuple comparisons performed so far.
    pub cmp_count: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            tuple_size: TUPLE_SIZE,
            isomorph_count_threshold: ISOMORPH_COUNT_THRESHOLD,
            flags: SearchFlags::empty(),
            run_count: 0,
            tdn_count: 0,
            cmp_count: 0,
        }
    }
}

impl Params {
    /// Tuple window length: one token short of the reported minimum, so
    /// a run must be seeded *and* extended before it is reportable.
    pub fn window_len(&self) -> usize {
        self.tuple_size - 1
    }

    /// Reset the statistics counters, keeping the knobs.
    pub fn reset_counters(&mut self) {
        self.run_count = 0;
        self.tdn_count = 0;
        self.cmp_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_ctcompare() {
        let p = Params::default();
        assert_eq!(p.tuple_size, 16);
        assert_eq!(p.isomorph_count_threshold, 3);
        assert!(p.flags.is_empty());
        assert_eq!(p.window_len(), 15);
    }
}
