use psperror::{PspError, Result};

use std::{io::Read, str::FromStr};

/// A pseudopotential file held in memory as lines, with a read position.
///
/// Every codec attempt works on its own cursor, so rewinding or failing in
/// one attempt never moves the position seen by another.
#[derive(Debug, Clone, Default)]
pub struct LineCursor {
    lines: Vec<String>,
    pos: usize,
}

impl LineCursor {
    /// Slurp a stream; bytes that are not UTF-8 are replaced.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<LineCursor> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        Ok(LineCursor::from_text(&String::from_utf8_lossy(&bytes)))
    }

    pub fn from_text(text: &str) -> LineCursor {
        LineCursor {
            lines: text
                .lines()
                .map(|l| l.trim_end_matches('\r').to_string())
                .collect(),
            pos: 0,
        }
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.lines.len());
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines left after the current position.
    pub fn remaining(&self) -> usize {
        self.lines.len() - self.pos
    }

    pub fn peek(&self) -> Option<&str> {
        self.lines.get(self.pos).map(|s| s.as_str())
    }

    pub fn next_line(&mut self) -> Option<&str> {
        let line = self.lines.get(self.pos)?;
        self.pos += 1;

        Some(line.as_str())
    }

    /// Next line, or `MalformedFormat` naming what was expected.
    pub fn expect_line(&mut self, what: &str) -> Result<String> {
        match self.next_line() {
            Some(line) => Ok(line.to_string()),
            None => Err(PspError::malformed(format!(
                "unexpected end of stream while reading {}",
                what
            ))),
        }
    }

    pub fn skip_lines(&mut self, n: usize, what: &str) -> Result<()> {
        for _ in 0..n {
            self.expect_line(what)?;
        }

        Ok(())
    }

    /// True if any line from the current position on holds something other
    /// than whitespace.
    pub fn has_more_data(&self) -> bool {
        self.lines[self.pos..].iter().any(|l| !l.trim().is_empty())
    }

    /// The whole stream joined back together.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Split a line and require at least `n` fields.
pub fn fields<'a>(line: &'a str, n: usize, what: &str) -> Result<Vec<&'a str>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    if tokens.len() < n {
        return Err(PspError::corrupt(format!(
            "{}: expected {} fields, found {} in '{}'",
            what,
            n,
            tokens.len(),
            line.trim()
        )));
    }

    Ok(tokens)
}

/// Parse a real number, accepting Fortran `D` exponents.
pub fn parse_f64(token: &str) -> Result<f64> {
    let token = token.trim();

    token
        .replace(|c: char| c == 'D' || c == 'd', "E")
        .parse::<f64>()
        .map_err(|_| PspError::corrupt(format!("'{}' is not a real number", token)))
}

pub fn parse_int<T: FromStr>(token: &str) -> Result<T> {
    let token = token.trim();

    token
        .parse::<T>()
        .map_err(|_| PspError::corrupt(format!("'{}' is not an integer", token)))
}

/// Fortran logical: `T`, `.true.`, `true` and their false forms.
pub fn parse_bool(token: &str) -> Result<bool> {
    match token.trim().trim_matches('.').to_lowercase().as_str() {
        "t" | "true" => Ok(true),
        "f" | "false" => Ok(false),
        _ => Err(PspError::corrupt(format!("'{}' is not a logical", token))),
    }
}

/// Scientific notation with a signed two-digit exponent, as Fortran writes it.
pub fn sci(x: f64, prec: usize) -> String {
    let s = format!("{:.*E}", prec, x);

    match s.split_once('E') {
        Some((mantissa, exp)) => {
            let e: i32 = exp.parse().unwrap_or(0);
            let sign = if e < 0 { '-' } else { '+' };

            format!("{}E{}{:02}", mantissa, sign, e.abs())
        }

        None => s,
    }
}
