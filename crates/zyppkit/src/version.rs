//! Segmented version comparison.
//!
//! Splits version strings into runs of digits and runs of letters
//! (separators such as `.` and `-` only delimit) and compares run by run:
//! numeric runs numerically, everything else lexically. A sequence that is
//! a prefix of a longer one orders before it.
//!
//! This approximates rpm's native ordering and is deliberately inexact: it
//! knows nothing about epochs or tilde pre-release ordering. What it does
//! guarantee is a deterministic total order, so snapshot comparison and
//! exact-pin matching are stable.

use std::cmp::Ordering;

/// One maximal run of digits or letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment<'a> {
    text: &'a str,
    numeric: bool,
}

/// Compare two version strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    let a_segs = segment(a);
    let b_segs = segment(b);
    let len = a_segs.len().max(b_segs.len());

    for idx in 0..len {
        let ord = match (a_segs.get(idx), b_segs.get(idx)) {
            (Some(x), Some(y)) => compare_segments(*x, *y),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => unreachable!(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    Ordering::Equal
}

fn segment(version: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let bytes = version.as_bytes();
    let mut start = 0;

    while start < bytes.len() {
        let c = bytes[start];
        if c.is_ascii_digit() {
            let end = run_end(bytes, start, |b| b.is_ascii_digit());
            segments.push(Segment {
                text: &version[start..end],
                numeric: true,
            });
            start = end;
        } else if c.is_ascii_alphabetic() {
            let end = run_end(bytes, start, |b| b.is_ascii_alphabetic());
            segments.push(Segment {
                text: &version[start..end],
                numeric: false,
            });
            start = end;
        } else {
            // separator
            start += 1;
        }
    }

    segments
}

fn run_end(bytes: &[u8], start: usize, pred: impl Fn(u8) -> bool) -> usize {
    let mut end = start;
    while end < bytes.len() && pred(bytes[end]) {
        end += 1;
    }
    end
}

fn compare_segments(a: Segment<'_>, b: Segment<'_>) -> Ordering {
    if a.numeric && b.numeric {
        compare_numeric(a.text, b.text)
    } else {
        a.text.cmp(b.text)
    }
}

/// Numeric comparison without parsing, so arbitrarily long digit runs
/// cannot overflow: strip leading zeros, then a longer run is greater and
/// equal lengths compare lexically.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
