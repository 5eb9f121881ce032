// Tuple indexing: description nodes and the CRC-bucketed lookup table.
//
// - `tdn`    — tuple description nodes, arena handles, the tuple builder
// - `bucket` — 2^24-slot CRC-prefix index over all tuples seen so far

pub mod bucket;
pub mod tdn;

pub use bucket::{BucketEntry, BucketIndex, EntryId};
pub use tdn::{Tdn, TdnArena, TdnId, TupleBuilder};
