// End-to-end scenarios over whole comparison sessions.

mod common;

use common::{CtfWriter, max_function, stream_of};
use oxicompare::ctf::token::{COMMA, INTVAL};
use oxicompare::params::{Params, SearchFlags};
use oxicompare::report;
use oxicompare::session::Session;

fn scan_all(session: &mut Session, params: &mut Params) {
    let count = session.stream_count() as u16;
    for id in 1..=count {
        if id == count {
            params.flags |= SearchFlags::LAST_FILE;
        }
        session.scan_stream(id, params).unwrap();
    }
}

// ---------------------------------------------------------------------------
// Renamed-variable scenario
// ---------------------------------------------------------------------------

#[test]
fn renamed_local_matches_only_under_isomorphism() {
    // The same function body in two trees, one local variable renamed
    // consistently (x: id 100 -> id 700).
    let a = stream_of("tree-a/max.c", &max_function(10, 100, 101));
    let b = stream_of("tree-b/max.c", &max_function(10, 700, 101));

    // Isomorphic comparison: exactly one run over the whole function.
    let mut s = Session::new();
    s.add_stream_bytes("a.ctf", a.clone()).unwrap();
    s.add_stream_bytes("b.ctf", b.clone()).unwrap();
    let mut p = Params {
        flags: SearchFlags::ISOMORPHIC,
        ..Params::default()
    };
    scan_all(&mut s, &mut p);
    let reps = report::reports(&s, &p).unwrap();
    assert_eq!(reps.len(), 1);
    assert_eq!(reps[0].length, 23);
    assert_eq!(reps[0].src.file, "tree-b/max.c");
    assert_eq!(reps[0].dst.file, "tree-a/max.c");
    assert_eq!(reps[0].src.start_line, 1);
    assert_eq!(reps[0].src.end_line, 8);

    // Exact comparison: the rename breaks every window.
    let mut s = Session::new();
    s.add_stream_bytes("a.ctf", a).unwrap();
    s.add_stream_bytes("b.ctf", b).unwrap();
    let mut p = Params::default();
    scan_all(&mut s, &mut p);
    assert_eq!(report::reports(&s, &p).unwrap().len(), 0);
}

#[test]
fn identical_function_matches_in_both_modes() {
    let a = stream_of("tree-a/max.c", &max_function(10, 100, 101));
    let b = stream_of("tree-b/max.c", &max_function(10, 100, 101));

    for flags in [SearchFlags::empty(), SearchFlags::ISOMORPHIC] {
        let mut s = Session::new();
        s.add_stream_bytes("a.ctf", a.clone()).unwrap();
        s.add_stream_bytes("b.ctf", b.clone()).unwrap();
        let mut p = Params {
            flags,
            ..Params::default()
        };
        scan_all(&mut s, &mut p);
        let reps = report::reports(&s, &p).unwrap();
        assert_eq!(reps.len(), 1, "flags {flags:?}");
        assert_eq!(reps[0].length, 23);
    }
}

// ---------------------------------------------------------------------------
// Numeric-list heuristic scenario
// ---------------------------------------------------------------------------

fn int_list_stream(file: &str, count: usize) -> Vec<u8> {
    let mut w = CtfWriter::new();
    w.file(file, 0);
    for _ in 0..count {
        w.id(INTVAL, 5);
        w.tok(COMMA);
    }
    w.finish()
}

#[test]
fn heuristic_suppresses_initializer_list_matches() {
    // Two unrelated files that both contain `5, 5, 5, ...`.
    let a = int_list_stream("a/table.c", 20);
    let b = int_list_stream("b/other.c", 20);

    // Without the heuristic the coincidence is reported.
    let mut s = Session::new();
    s.add_stream_bytes("a.ctf", a.clone()).unwrap();
    s.add_stream_bytes("b.ctf", b.clone()).unwrap();
    let mut p = Params::default();
    scan_all(&mut s, &mut p);
    assert!(!report::reports(&s, &p).unwrap().is_empty());

    // With it, the scrambled id values keep the windows from hashing
    // alike (statistically: a 2^-32 CRC collision could still slip in).
    let mut s = Session::new();
    s.add_stream_bytes("a.ctf", a).unwrap();
    s.add_stream_bytes("b.ctf", b).unwrap();
    let mut p = Params {
        flags: SearchFlags::COMP_HEUR,
        ..Params::default()
    };
    scan_all(&mut s, &mut p);
    assert!(report::reports(&s, &p).unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Idempotence
// ---------------------------------------------------------------------------

#[test]
fn rerunning_a_session_yields_identical_reports() {
    let streams = [
        stream_of("a/f.c", &max_function(1, 2, 3)),
        stream_of("b/g.c", &max_function(1, 20, 30)),
        stream_of("c/h.c", &max_function(1, 2, 3)),
    ];

    let run_once = || {
        let mut s = Session::new();
        for (i, bytes) in streams.iter().enumerate() {
            s.add_stream_bytes(&format!("{i}.ctf"), bytes.clone()).unwrap();
        }
        let mut p = Params {
            flags: SearchFlags::ISOMORPHIC,
            ..Params::default()
        };
        scan_all(&mut s, &mut p);
        let mut reps: Vec<_> = report::reports(&s, &p)
            .unwrap()
            .into_iter()
            .map(|r| {
                (
                    r.length,
                    r.src.file,
                    r.src.start_line,
                    r.src.end_line,
                    r.dst.file,
                    r.dst.start_line,
                    r.dst.end_line,
                )
            })
            .collect();
        reps.sort();
        reps
    };

    let first = run_once();
    let second = run_once();
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

// ---------------------------------------------------------------------------
// Partial draining
// ---------------------------------------------------------------------------

#[test]
fn partial_draining_sees_the_same_runs() {
    let a = stream_of("a/f.c", &max_function(1, 2, 3));
    let b = stream_of("b/g.c", &max_function(1, 2, 3));
    let c = stream_of("c/h.c", &max_function(1, 2, 3));

    let mut accumulated = Session::new();
    for (n, bytes) in [("a", &a), ("b", &b), ("c", &c)] {
        accumulated.add_stream_bytes(n, bytes.clone()).unwrap();
    }
    let mut p = Params::default();
    scan_all(&mut accumulated, &mut p);
    let total = accumulated.completed().count();

    let mut drained = Session::new();
    for (n, bytes) in [("a", &a), ("b", &b), ("c", &c)] {
        drained.add_stream_bytes(n, bytes.clone()).unwrap();
    }
    let mut p = Params::default();
    let mut seen = 0usize;
    for id in 1..=3u16 {
        if id == 3 {
            p.flags |= SearchFlags::LAST_FILE;
        }
        drained.scan_stream(id, &mut p).unwrap();
        seen += drained.take_completed().len();
    }
    assert_eq!(seen, total);
}

// ---------------------------------------------------------------------------
// Stream-id boundary
// ---------------------------------------------------------------------------

#[test]
fn stream_id_4095_reports_correctly() {
    let empty = CtfWriter::new().finish();
    let body = max_function(1, 2, 3);
    let a = stream_of("deep/a.c", &body);
    let b = stream_of("deep/b.c", &body);

    let mut s = Session::new();
    // 4093 empty streams push the real pair to ids 4094 and 4095, the
    // last usable slot of the 12-bit id field.
    for i in 0..4093usize {
        s.add_stream_bytes(&format!("empty{i}.ctf"), empty.clone())
            .unwrap();
    }
    let first = s.add_stream_bytes("a.ctf", a).unwrap();
    let last = s.add_stream_bytes("b.ctf", b).unwrap();
    assert_eq!(first, 4094);
    assert_eq!(last, 4095);

    let mut p = Params::default();
    scan_all(&mut s, &mut p);

    let reps = report::reports(&s, &p).unwrap();
    assert_eq!(reps.len(), 1);
    assert_eq!(reps[0].length, 23);
    assert_eq!(reps[0].src.file, "deep/b.c");
    assert_eq!(reps[0].dst.file, "deep/a.c");
    // Line numbers survived the packing next to the maximal file id.
    assert_eq!(reps[0].src.start_line, 1);
    assert_eq!(reps[0].src.end_line, 8);
}
