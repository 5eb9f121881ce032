//! Oxicompare: token-stream code similarity detection.
//!
//! The crate finds near-duplicate and renamed-identifier-equivalent
//! code fragments across CTF token streams:
//! - The CTF stream format and decoder (`ctf`)
//! - Tuple description nodes and the CRC-bucketed index (`index`)
//! - Incremental run tracking and isomorphic comparison (`runs`)
//! - Per-session state (`session`), reporting (`report`), the stream
//!   list (`filelist`), and an optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use oxicompare::params::Params;
//! use oxicompare::report;
//! use oxicompare::session::Session;
//!
//! let mut session = Session::new();
//! let a = session.add_stream(Path::new("tree-a.ctf")).unwrap();
//! let b = session.add_stream(Path::new("tree-b.ctf")).unwrap();
//!
//! let mut params = Params::default();
//! session.scan_stream(a, &mut params).unwrap();
//! session.scan_stream(b, &mut params).unwrap();
//!
//! for run in report::reports(&session, &params).unwrap() {
//!     println!(
//!         "{}  {}:{}-{}  {}:{}-{}",
//!         run.length,
//!         run.src.file, run.src.start_line, run.src.end_line,
//!         run.dst.file, run.dst.start_line, run.dst.end_line,
//!     );
//! }
//! ```

pub mod ctf;
pub mod filelist;
pub mod index;
pub mod params;
pub mod report;
pub mod runs;
pub mod session;

#[cfg(feature = "cli")]
pub mod cli;
