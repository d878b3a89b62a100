use pspconsts::EPS6;
use psperror::{PspError, Result};

use std::fmt;

/// Quantum numbers (n, l, j) of a channel. `j` is 0 when spin-orbit
/// coupling is not resolved; `n` is 0 when the format does not give it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantumNumber {
    n: u32,
    l: usize,
    j: f64,
}

/// Hashable form of a quantum number, with j stored as 2j.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QnKey {
    pub n: u32,
    pub l: usize,
    pub j2: u32,
}

impl QuantumNumber {
    pub fn new(n: u32, l: usize, j: f64) -> Result<QuantumNumber> {
        if !(j >= 0.0) {
            return Err(PspError::invalid(format!("j = {} must not be negative", j)));
        }

        if j > EPS6 {
            let lf = l as f64;
            let down = (j - (lf - 0.5)).abs() < EPS6 && l > 0;
            let up = (j - (lf + 0.5)).abs() < EPS6;

            if !(down || up) {
                return Err(PspError::invalid(format!(
                    "j = {} is not l +/- 1/2 for l = {}",
                    j, l
                )));
            }
        }

        Ok(QuantumNumber { n, l, j })
    }

    /// Channel without spin-orbit resolution.
    pub fn scalar(n: u32, l: usize) -> QuantumNumber {
        QuantumNumber { n, l, j: 0.0 }
    }

    pub fn get_n(&self) -> u32 {
        self.n
    }

    pub fn get_l(&self) -> usize {
        self.l
    }

    pub fn get_j(&self) -> f64 {
        self.j
    }

    pub fn has_j(&self) -> bool {
        self.j > EPS6
    }

    pub fn key(&self) -> QnKey {
        QnKey {
            n: self.n,
            l: self.l,
            j2: (2.0 * self.j).round() as u32,
        }
    }

    /// Key that ignores the principal number, for channels indexed by (l, j).
    pub fn lj_key(&self) -> (usize, u32) {
        (self.l, (2.0 * self.j).round() as u32)
    }

    /// Spectroscopic label such as `3S`, or `S` when n is unknown.
    pub fn label(&self) -> String {
        let letter = l_letter(self.l);

        if self.n == 0 {
            letter.to_string()
        } else {
            format!("{}{}", self.n, letter)
        }
    }
}

impl fmt::Display for QuantumNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.has_j() {
            write!(f, "(n={}, l={}, j={:.1})", self.n, self.l, self.j)
        } else {
            write!(f, "(n={}, l={})", self.n, self.l)
        }
    }
}

pub fn l_letter(l: usize) -> char {
    match l {
        0 => 'S',
        1 => 'P',
        2 => 'D',
        3 => 'F',
        4 => 'G',
        5 => 'H',
        _ => 'X',
    }
}

pub fn letter_to_l(c: char) -> Option<usize> {
    match c.to_ascii_uppercase() {
        'S' => Some(0),
        'P' => Some(1),
        'D' => Some(2),
        'F' => Some(3),
        'G' => Some(4),
        'H' => Some(5),
        _ => None,
    }
}

#[test]
fn test_qn_validation() {
    assert!(QuantumNumber::new(2, 1, 0.5).is_ok());
    assert!(QuantumNumber::new(2, 1, 1.5).is_ok());
    assert!(QuantumNumber::new(1, 0, 0.5).is_ok());
    assert!(QuantumNumber::new(1, 0, 0.0).is_ok());

    assert!(QuantumNumber::new(1, 0, -0.5).is_err());
    assert!(QuantumNumber::new(2, 1, 1.0).is_err());
    assert!(QuantumNumber::new(2, 2, 0.5).is_err());
}

#[test]
fn test_qn_keys_and_labels() {
    let qn = QuantumNumber::new(3, 2, 2.5).unwrap();

    assert_eq!(qn.key(), QnKey { n: 3, l: 2, j2: 5 });
    assert_eq!(qn.lj_key(), (2, 5));
    assert_eq!(qn.label(), "3D");
    assert_eq!(QuantumNumber::scalar(0, 1).label(), "P");
    assert_eq!(letter_to_l('d'), Some(2));
}
