// Idiomatic Rust CLI for Oxicompare.
//
// Preserves ctcompare's single-command option set (short flags and
// all) while adding long-form aliases and JSON stats output.

use std::io::Write;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use crate::ctf::CtfError;
use crate::filelist::{CTFLIST_DB, CtfList};
use crate::params::{Params, SearchFlags};
use crate::report;
use crate::session::Session;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Find and report code similarities between CTF token streams.
#[derive(Parser, Debug)]
#[command(
    name = "oxicompare",
    version,
    about = "Token-stream code similarity detector",
    arg_required_else_help = false
)]
struct Cli {
    /// Minimum matching run length in tokens.
    #[arg(short = 'n', long = "min-run", value_parser = clap::value_parser!(u32).range(16..), default_value_t = 16)]
    min_run: u32,

    /// Print results sorted by run length, descending.
    #[arg(short = 'r', long = "sorted", conflicts_with = "partial")]
    sorted: bool,

    /// Print matching source lines side by side.
    #[arg(short = 's', long = "side-by-side")]
    side_by_side: bool,

    /// Show matching source lines when a match is found.
    #[arg(short = 'x', long = "show-code")]
    show_code: bool,

    /// Show matching tokens when a match is found.
    #[arg(short = 't', long = "show-tokens")]
    show_tokens: bool,

    /// Enable isomorphic (renaming-tolerant) code comparison.
    #[arg(short = 'i', long = "isomorphic")]
    isomorphic: bool,

    /// Limit the number of isomorphic relations; implies -i.
    #[arg(short = 'I', long = "isomorph-limit", value_parser = clap::value_parser!(u32).range(1..))]
    isomorph_limit: Option<u32>,

    /// Show all matches, even within the same tree.
    #[arg(short = 'a', long = "within-tree")]
    within_tree: bool,

    /// Quiet: print only the number of matches found.
    #[arg(short = 'q', long = "quiet", conflicts_with = "partial")]
    quiet: bool,

    /// Print partial results after each stream to conserve memory.
    #[arg(short = 'p', long = "partial")]
    partial: bool,

    /// Enable heuristics that suppress unwanted matches.
    #[arg(short = 'u', long = "heuristics")]
    heuristics: bool,

    /// CTF list file augmented by the positional arguments.
    #[arg(long = "db", default_value = CTFLIST_DB)]
    db: PathBuf,

    /// Output stats as JSON to stderr.
    #[arg(long = "json")]
    json_output: bool,

    /// CTF files to compare, in addition to those in the list file.
    #[arg(value_name = "CTF_FILE")]
    files: Vec<PathBuf>,
}

impl Cli {
    fn params(&self) -> Params {
        let mut flags = SearchFlags::empty();
        if self.isomorphic || self.isomorph_limit.is_some() {
            flags |= SearchFlags::ISOMORPHIC;
        }
        if self.within_tree {
            flags |= SearchFlags::WITHIN_TREE;
        }
        if self.show_tokens {
            flags |= SearchFlags::PRINT_TOKENS;
        }
        if self.show_code {
            flags |= SearchFlags::PRINT_CODE;
        }
        if self.side_by_side {
            flags |= SearchFlags::SIDE_BY_SIDE;
        }
        if self.sorted {
            flags |= SearchFlags::SORT_RESULTS;
        }
        if self.partial {
            flags |= SearchFlags::PART_PRINT;
        }
        if self.heuristics {
            flags |= SearchFlags::COMP_HEUR;
        }
        Params {
            tuple_size: self.min_run as usize,
            isomorph_count_threshold: self
                .isomorph_limit
                .map(|v| v as usize)
                .unwrap_or(crate::params::ISOMORPH_COUNT_THRESHOLD),
            flags,
            ..Params::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse arguments and run; never returns.
pub fn run() -> ! {
    env_logger::init();
    let cli = Cli::parse();
    match compare(&cli) {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("oxicompare: {e}");
            process::exit(1);
        }
    }
}

fn compare(cli: &Cli) -> Result<(), CtfError> {
    // The on-disk list first, then the command line, duplicates merged.
    let mut list = CtfList::load(&cli.db)?;
    for path in &cli.files {
        list.add(&path.display().to_string())?;
    }
    if list.is_empty() {
        eprintln!(
            "oxicompare: no CTF files given as arguments or in {}",
            cli.db.display()
        );
        process::exit(1);
    }

    let mut session = Session::new();
    for (_, name) in list.iter() {
        session.add_stream(std::path::Path::new(name))?;
    }

    let mut params = cli.params();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let count = session.stream_count() as u16;
    for id in 1..=count {
        if id == count {
            params.flags |= SearchFlags::LAST_FILE;
        }
        session.scan_stream(id, &mut params)?;

        if params.flags.contains(SearchFlags::PART_PRINT) {
            let finished = session.take_completed();
            report::print_runs(&mut out, &session, &finished, &params)?;
        }
    }

    if cli.quiet {
        let reportable = session
            .completed()
            .filter(|r| r.length >= params.tuple_size as u32)
            .count();
        writeln!(out, "Number of runs found:       {reportable}")?;
        writeln!(out, "Number of TDNs used:        {}", params.tdn_count)?;
        writeln!(out, "Number of TDN comparisons:  {}", params.cmp_count)?;
    } else if !params.flags.contains(SearchFlags::PART_PRINT) {
        let runs: Vec<_> = session.completed().copied().collect();
        report::print_runs(&mut out, &session, &runs, &params)?;
    }

    if cli.json_output {
        let json = serde_json::json!({
            "streams": session.stream_count(),
            "runs_found": params.run_count,
            "tdns_built": params.tdn_count,
            "comparisons": params.cmp_count,
        });
        eprintln!("{}", serde_json::to_string_pretty(&json).unwrap());
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
