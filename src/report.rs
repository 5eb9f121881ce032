// Reporting completed runs.
//
// A run's TDNs record the line of each window's *first* token, so the
// reported end line is found by replaying one window forward from the
// end TDN, counting LINE markers.  Hitting a FILENAME marker during
// that replay means a run crossed a file boundary, which the tracker
// must never allow; it is surfaced as a defect, not swallowed.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use crate::ctf::token;
use crate::ctf::{CtfError, CtfHandle, Token};
use crate::index::tdn::Tdn;
use crate::params::{Params, SearchFlags};
use crate::runs::tracker::Run;
use crate::session::Session;

// ---------------------------------------------------------------------------
// Line ranges
// ---------------------------------------------------------------------------

/// One side of a reported run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Side {
    /// Source file path as embedded in the stream.
    pub file: String,
    /// Line of the run's first token.
    pub start_line: u32,
    /// Line of the run's last token.
    pub end_line: u32,
}

/// A reported run: match length in tokens plus both sides' ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub length: u32,
    pub src: Side,
    pub dst: Side,
}

/// Line number of the last token of the window starting at `tdn`.
///
/// Replays `tuple_size - 1` non-line tokens forward, counting LINE
/// markers.  A FILENAME marker inside the window is `SpansFiles`.
pub fn last_line_for(ctf: &CtfHandle, tdn: &Tdn, params: &Params) -> Result<u32, CtfError> {
    let mut linenum = tdn.line();
    let mut posn = tdn.offset as usize;
    let mut walked = 0usize;

    while walked < params.window_len() {
        let (tok, next) = ctf.read_token_at(posn)?;
        match tok {
            Token::Line => linenum += 1,
            Token::Filename { .. } => return Err(CtfError::SpansFiles { offset: posn }),
            Token::Eof => return Err(CtfError::Truncated { offset: posn }),
            _ => walked += 1,
        }
        posn = next;
    }
    Ok(linenum)
}

fn side_for(session: &Session, start: &Tdn, end: &Tdn, params: &Params) -> Result<Side, CtfError> {
    let ctf = session.handle(start.stream_id())?;
    Ok(Side {
        file: ctf.filename_at(start.name_offset as usize)?,
        start_line: start.line(),
        end_line: last_line_for(ctf, end, params)?,
    })
}

/// Resolve one run into file names and line ranges.
pub fn report_for(session: &Session, run: &Run, params: &Params) -> Result<RunReport, CtfError> {
    let src_start = session.tdn(run.src_start);
    let dst_start = session.tdn(run.dst_start);
    Ok(RunReport {
        length: run.length,
        src: side_for(session, src_start, session.tdn(run.src_end), params)?,
        dst: side_for(session, dst_start, session.tdn(run.dst_end), params)?,
    })
}

/// Resolve every reportable completed run, dropping runs below
/// `tuple_size` (the seeded-but-never-extended case) and sorting by
/// descending length when requested.
pub fn reports(session: &Session, params: &Params) -> Result<Vec<RunReport>, CtfError> {
    let mut out = Vec::new();
    for run in session.completed() {
        if run.length < params.tuple_size as u32 {
            continue;
        }
        out.push(report_for(session, run, params)?);
    }
    if params.flags.contains(SearchFlags::SORT_RESULTS) {
        out.sort_by(|a, b| b.length.cmp(&a.length));
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Printing
// ---------------------------------------------------------------------------

/// Print the tokens of a run, detok style.
pub fn print_tokens<W: Write>(w: &mut W, session: &Session, run: &Run) -> Result<(), CtfError> {
    let start = session.tdn(run.src_start);
    let ctf = session.handle(start.stream_id())?;
    let mut offset = start.offset as usize;
    let mut line = start.line();
    let mut remaining = run.length;

    write!(w, "{line:5}:   ")?;
    while remaining > 0 {
        let (tok, next) = ctf.read_token_at(offset)?;
        match tok {
            Token::Eof => break,
            Token::Filename { .. } => line = 1,
            Token::Line => line += 1,
            _ => remaining -= 1,
        }
        token::write_token(w, tok.op(), line, u32::from(tok.id_value()), "")?;
        offset = next;
    }
    writeln!(w, "\n")?;
    Ok(())
}

/// Read a 1-based, inclusive line range of a source file.
fn read_lines(path: &str, start: u32, end: u32) -> io::Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let lineno = idx as u32 + 1;
        if lineno > end {
            break;
        }
        let line = line?;
        if lineno >= start {
            out.push(line);
        }
    }
    Ok(out)
}

/// Expand tabs to 8-column stops and clip/pad to exactly `width`.
fn pad_to_width(line: &str, width: usize) -> String {
    let mut out = String::with_capacity(width);
    for ch in line.chars() {
        if out.len() >= width {
            break;
        }
        if ch == '\t' {
            let next_stop = (out.len() + 8) & !7;
            if next_stop >= width {
                break;
            }
            while out.len() < next_stop {
                out.push(' ');
            }
        } else {
            out.push(ch);
        }
    }
    while out.len() < width {
        out.push(' ');
    }
    out
}

/// Print the matched source lines of both sides, side by side in two
/// 80-column panes or sequentially.  Falls back to token printing when
/// neither source file can be read.
fn paste_files<W: Write>(
    w: &mut W,
    session: &Session,
    run: &Run,
    report: &RunReport,
    side_by_side: bool,
) -> Result<(), CtfError> {
    let left = read_lines(&report.src.file, report.src.start_line, report.src.end_line);
    let right = read_lines(&report.dst.file, report.dst.start_line, report.dst.end_line);

    match (left, right) {
        (Err(_), Err(_)) => print_tokens(w, session, run),
        (left, right) => {
            let left = left.unwrap_or_default();
            let right = right.unwrap_or_default();
            if side_by_side {
                let rows = left.len().max(right.len());
                for i in 0..rows {
                    match (left.get(i), right.get(i)) {
                        (Some(l), Some(r)) => writeln!(w, "{} {r}", pad_to_width(l, 80))?,
                        (Some(l), None) => writeln!(w, "{l}")?,
                        (None, Some(r)) => writeln!(w, "{:80} {r}", "")?,
                        (None, None) => unreachable!(),
                    }
                }
            } else {
                for l in &left {
                    writeln!(w, "{l}")?;
                }
                writeln!(w, "=====================================")?;
                for r in &right {
                    writeln!(w, "{r}")?;
                }
            }
            writeln!(w)?;
            Ok(())
        }
    }
}

/// Print one run according to the printing flags.  Runs below
/// `tuple_size` are suppressed here, not at creation: creation is
/// cheap, and this is where the externally promised minimum applies.
pub fn print_run<W: Write>(
    w: &mut W,
    session: &Session,
    run: &Run,
    params: &Params,
) -> Result<(), CtfError> {
    if run.length < params.tuple_size as u32 {
        return Ok(());
    }
    let report = report_for(session, run, params)?;
    writeln!(
        w,
        "{}  {}:{}-{}  {}:{}-{}",
        report.length,
        report.src.file,
        report.src.start_line,
        report.src.end_line,
        report.dst.file,
        report.dst.start_line,
        report.dst.end_line,
    )?;

    if params.flags.contains(SearchFlags::SIDE_BY_SIDE) {
        paste_files(w, session, run, &report, true)?;
    } else if params.flags.contains(SearchFlags::PRINT_CODE) {
        paste_files(w, session, run, &report, false)?;
    } else if params.flags.contains(SearchFlags::PRINT_TOKENS) {
        print_tokens(w, session, run)?;
    }

    if params
        .flags
        .intersects(SearchFlags::PRINT_TOKENS | SearchFlags::SIDE_BY_SIDE)
    {
        writeln!(w, "=====================================")?;
    }
    Ok(())
}

/// Print a list of runs, sorted by descending length when requested.
pub fn print_runs<W: Write>(
    w: &mut W,
    session: &Session,
    runs: &[Run],
    params: &Params,
) -> Result<(), CtfError> {
    if params.flags.contains(SearchFlags::SORT_RESULTS) {
        let mut sorted: Vec<&Run> = runs.iter().collect();
        sorted.sort_by(|a, b| b.length.cmp(&a.length));
        for run in sorted {
            print_run(w, session, run, params)?;
        }
    } else {
        for run in runs {
            print_run(w, session, run, params)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctf::handle::CTF_MAGIC;
    use crate::ctf::token::{EOFTOKEN, FILENAME, IDENTIFIER, LINE};

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

    #[test]
    fn end_line_counts_line_markers() {
        // marker, id, LINE, id, LINE, id: a window of 3 ends on line 3.
        let mut v = CTF_MAGIC.to_vec();
        v.extend_from_slice(&file_marker(b"a.c"));
        let tdn_offset = v.len();
        v.extend_from_slice(&ident(1));
        v.push(LINE);
        v.extend_from_slice(&ident(2));
        v.push(LINE);
        v.extend_from_slice(&ident(3));
        v.push(EOFTOKEN);
        let ctf = CtfHandle::from_bytes(v).unwrap();
        let tdn = Tdn::new(0, tdn_offset as u32, 6, 1, 1, None).unwrap();
        let params = Params {
            tuple_size: 4,
            ..Params::default()
        };
        assert_eq!(last_line_for(&ctf, &tdn, &params).unwrap(), 3);
    }

    #[test]
    fn end_line_refuses_to_cross_files() {
        let mut v = CTF_MAGIC.to_vec();
        v.extend_from_slice(&file_marker(b"a.c"));
        let tdn_offset = v.len();
        v.extend_from_slice(&ident(1));
        v.extend_from_slice(&file_marker(b"b.c"));
        v.extend_from_slice(&ident(2));
        v.extend_from_slice(&ident(3));
        v.push(EOFTOKEN);
        let ctf = CtfHandle::from_bytes(v).unwrap();
        let tdn = Tdn::new(0, tdn_offset as u32, 6, 1, 1, None).unwrap();
        let params = Params {
            tuple_size: 4,
            ..Params::default()
        };
        assert!(matches!(
            last_line_for(&ctf, &tdn, &params),
            Err(CtfError::SpansFiles { .. })
        ));
    }

    fn two_identical_streams() -> (Session, Params) {
        let mut body = CTF_MAGIC.to_vec();
        body.extend_from_slice(&file_marker(b"src/x.c"));
        for v in 0..30u16 {
            body.extend_from_slice(&ident(v));
            if v % 4 == 3 {
                body.push(LINE);
            }
        }
        body.push(EOFTOKEN);

        let mut s = Session::new();
        let a = s.add_stream_bytes("a.ctf", body.clone()).unwrap();
        let b = s.add_stream_bytes("b.ctf", body).unwrap();
        let mut p = Params::default();
        s.scan_stream(a, &mut p).unwrap();
        s.scan_stream(b, &mut p).unwrap();
        (s, p)
    }

    #[test]
    fn report_resolves_names_and_ranges() {
        let (s, p) = two_identical_streams();
        let reps = reports(&s, &p).unwrap();
        assert_eq!(reps.len(), 1);
        let r = &reps[0];
        assert_eq!(r.length, 30);
        assert_eq!(r.src.file, "src/x.c");
        assert_eq!(r.dst.file, "src/x.c");
        assert_eq!(r.src.start_line, 1);
        // 30 tokens with a newline after every 4th: last token on line 8.
        assert_eq!(r.src.end_line, 8);
        assert_eq!(r.src, r.dst);
    }

    #[test]
    fn short_runs_are_suppressed() {
        let (mut s, p) = two_identical_streams();
        // Everything reportable already checked; now verify the filter
        // by printing a fabricated below-minimum run.
        let runs = s.take_completed();
        let mut short = runs[0];
        short.length = p.tuple_size as u32 - 1;
        let mut out = Vec::new();
        print_run(&mut out, &s, &short, &p).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn summary_line_format() {
        let (s, p) = two_identical_streams();
        let runs: Vec<Run> = s.completed().copied().collect();
        let mut out = Vec::new();
        print_runs(&mut out, &s, &runs, &p).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "30  src/x.c:1-8  src/x.c:1-8\n");
    }

    #[test]
    fn sorted_printing_orders_by_length_descending() {
        let (s, p) = two_identical_streams();
        let mut runs: Vec<Run> = s.completed().copied().collect();
        let mut shorter = runs[0];
        shorter.length = 20;
        runs.insert(0, shorter);
        let sorted_params = Params {
            flags: SearchFlags::SORT_RESULTS,
            ..p.clone()
        };
        let mut out = Vec::new();
        print_runs(&mut out, &s, &runs, &sorted_params).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lengths: Vec<&str> = text
            .lines()
            .map(|l| l.split_whitespace().next().unwrap())
            .collect();
        assert_eq!(lengths, vec!["30", "20"]);
    }

    #[test]
    fn pad_to_width_expands_tabs() {
        assert_eq!(pad_to_width("a\tb", 12), "a       b   ");
        assert_eq!(pad_to_width("", 4), "    ");
        let long = "x".repeat(100);
        assert_eq!(pad_to_width(&long, 10).len(), 10);
    }

    #[test]
    fn print_tokens_walks_the_run() {
        let (s, p) = two_identical_streams();
        let runs: Vec<Run> = s.completed().copied().collect();
        let mut out = Vec::new();
        let tok_params = Params {
            flags: SearchFlags::PRINT_TOKENS,
            ..p.clone()
        };
        print_run(&mut out, &s, &runs[0], &tok_params).unwrap();
        let text = String::from_utf8(out).unwrap();
        // Summary line, then ids 0..30 in detok form.
        assert!(text.contains("id0 "));
        assert!(text.contains("id29 "));
        assert!(text.contains("====="));
    }

    #[test]
    fn end_line_replay_never_hits_eof_for_real_runs() {
        let (s, p) = two_identical_streams();
        for run in s.completed() {
            let rep = report_for(&s, run, &p).unwrap();
            assert!(rep.src.end_line >= rep.src.start_line);
        }
    }
}
