use psperror::{PspError, Result};

use chrono::NaiveDate;
use std::{fmt, str::FromStr};

/// Pseudopotential code numbers of the abinit family.
pub const ABINIT_CODES: [u32; 12] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 17];

/// On-disk grammar of a pseudopotential file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    #[default]
    Unknown,
    /// fixed-column abinit file, tagged by its pspcod
    Abinit(u32),
    /// fhi98pp output
    Fhi,
    /// tag-delimited UPF, version 1
    Upf,
    /// XML UPF, version 2
    Upf2,
}

impl Format {
    pub fn abinit(pspcod: u32) -> Result<Format> {
        if ABINIT_CODES.contains(&pspcod) {
            Ok(Format::Abinit(pspcod))
        } else {
            Err(PspError::unsupported(format!("abinit pspcod {}", pspcod)))
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Format::Unknown
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Format::Unknown => write!(f, "unknown"),
            Format::Abinit(code) => write!(f, "abinit-{}", code),
            Format::Fhi => write!(f, "fhi"),
            Format::Upf => write!(f, "upf"),
            Format::Upf2 => write!(f, "upf2"),
        }
    }
}

impl FromStr for Format {
    type Err = PspError;

    fn from_str(s: &str) -> Result<Format> {
        let s = s.trim().to_lowercase();

        match s.as_str() {
            "unknown" | "auto" => Ok(Format::Unknown),
            "fhi" => Ok(Format::Fhi),
            "upf" => Ok(Format::Upf),
            "upf2" => Ok(Format::Upf2),
            _ => {
                let code = s
                    .strip_prefix("abinit-")
                    .and_then(|c| c.parse::<u32>().ok())
                    .ok_or_else(|| PspError::invalid(format!("unknown format '{}'", s)))?;

                Format::abinit(code)
            }
        }
    }
}

/// Pseudization scheme used to generate the potentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Unknown,
    /// Troullier-Martins
    TroullierMartins,
    /// Hamann, Schlueter and Chiang
    Hsc,
    /// optimized norm-conserving Vanderbilt
    Oncv,
}

/// Wave equation solved for the reference atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaveEq {
    #[default]
    Schrodinger,
    ScalarRelativistic,
    Dirac,
}

/// Provenance of a pseudopotential.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PspInfo {
    pub author: String,
    /// generating code
    pub code: String,
    pub date: Option<NaiveDate>,
    pub description: String,
}

#[test]
fn test_format_names() {
    for fmt in [Format::Unknown, Format::Abinit(8), Format::Fhi, Format::Upf, Format::Upf2] {
        assert_eq!(fmt.to_string().parse::<Format>().unwrap(), fmt);
    }

    assert_eq!("ABINIT-6".parse::<Format>().unwrap(), Format::Abinit(6));
    assert!("abinit-12".parse::<Format>().is_err());
    assert!("psml".parse::<Format>().is_err());
}
