// Run tracking and the renaming-tolerant comparison pass.
//
// - `tracker`  — incomplete/completed run lists and the O(1) extension table
// - `isomorph` — bijective identifier-renaming check on completed runs

pub mod isomorph;
pub mod tracker;

pub use isomorph::{IsoMaps, check_isomorphic_run};
pub use tracker::{Run, RunId, RunTracker};
