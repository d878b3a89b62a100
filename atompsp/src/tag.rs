//! Block markers and 4-per-line numeric arrays of the tag-delimited format.

use crate::cursor::{parse_f64, sci, LineCursor};
use psperror::{try_alloc, PspError, Result};

use itertools::Itertools;
use log::debug;
use std::io::Write;

pub const VALUES_PER_LINE: usize = 4;

fn opens(line: &str, tag: &str) -> bool {
    line.trim_start()
        .to_lowercase()
        .starts_with(&format!("<{}>", tag.to_lowercase()))
}

fn closes(line: &str, tag: &str) -> bool {
    line.trim_start()
        .to_lowercase()
        .starts_with(&format!("</{}>", tag.to_lowercase()))
}

/// Move just past the line opening `<tag>`, scanning from the start of the
/// stream if `rewind` is set, otherwise from the current position.
///
/// A tag that never opens is `MalformedFormat`, and the cursor is left at
/// the end of the stream.
pub fn locate_open_tag(cur: &mut LineCursor, tag: &str, rewind: bool) -> Result<()> {
    if rewind {
        cur.rewind();
    }

    while let Some(line) = cur.next_line() {
        if opens(line, tag) {
            debug!("found <{}> at line {}", tag, cur.position());
            return Ok(());
        }
    }

    Err(PspError::malformed(format!("<{}> not found", tag)))
}

/// Read exactly one line and require it to close `tag`.
pub fn expect_close_tag(cur: &mut LineCursor, tag: &str) -> Result<()> {
    let line = cur
        .next_line()
        .ok_or_else(|| PspError::malformed(format!("stream ended before </{}>", tag)))?;

    if closes(line, tag) {
        Ok(())
    } else {
        Err(PspError::malformed(format!(
            "expected </{}>, found '{}'",
            tag,
            line.trim()
        )))
    }
}

/// Whether `<tag>` opens anywhere in the stream. The cursor is left at the
/// start of the stream.
pub fn tag_is_present(cur: &mut LineCursor, tag: &str) -> bool {
    let found = locate_open_tag(cur, tag, true).is_ok();
    cur.rewind();

    found
}

/// Read exactly `n` values laid out at most four per line.
///
/// A short final line is accepted; a line holding values beyond `n`, or a
/// marker reached before `n` values, is an error.
pub fn read_values(cur: &mut LineCursor, n: usize, what: &str) -> Result<Vec<f64>> {
    if n > VALUES_PER_LINE * cur.remaining() {
        return Err(PspError::malformed(format!(
            "{}: {} values declared but only {} lines left",
            what,
            n,
            cur.remaining()
        )));
    }

    let mut values = try_alloc::<f64>(n)?;

    while values.len() < n {
        let line = cur.expect_line(what)?;

        if line.trim_start().starts_with('<') {
            return Err(PspError::malformed(format!(
                "{}: block ends after {} of {} values",
                what,
                values.len(),
                n
            )));
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();

        if values.len() + tokens.len() > n {
            return Err(PspError::corrupt(format!(
                "{}: more than the {} declared values",
                what, n
            )));
        }

        for tok in tokens {
            values.push(parse_f64(tok)?);
        }
    }

    Ok(values)
}

/// Values four per line, one line per chunk.
pub fn format_values(values: &[f64]) -> String {
    values
        .chunks(VALUES_PER_LINE)
        .map(|chunk| chunk.iter().map(|&x| format!("{:>20}", sci(x, 12))).join(""))
        .join("\n")
}

pub fn write_values(w: &mut dyn Write, values: &[f64]) -> Result<()> {
    if !values.is_empty() {
        writeln!(w, "{}", format_values(values))?;
    }

    Ok(())
}
