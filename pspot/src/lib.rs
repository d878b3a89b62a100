use pspdata::{Format, PspData};
use psperror::{PspError, Result};

use log::info;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

/// One line of a species table.
#[derive(Debug, Clone, PartialEq)]
pub struct PspEntry {
    pub species: String,
    pub file: PathBuf,
    pub format: Format,
}

#[derive(Default)]
pub struct PSPot {
    pots: HashMap<String, PspData>,
    atpsp_file: HashMap<String, PathBuf>,
}

impl PSPot {
    /// Load every pseudopotential listed in the table at `path`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<PSPot> {
        let path = path.as_ref();
        let dir = path.parent().unwrap_or_else(|| Path::new("."));

        let entries = get_psp_files(path)?;

        let mut pots = HashMap::new();
        let mut atpsp_file = HashMap::new();

        for entry in entries.iter() {
            let file = dir.join(&entry.file);

            let psp = atompsp::read_file(&file, entry.format)?;

            pots.insert(entry.species.clone(), psp);

            atpsp_file.insert(entry.species.clone(), file);
        }

        Ok(PSPot { pots, atpsp_file })
    }

    pub fn get_psp(&self, sp: &str) -> Option<&PspData> {
        self.pots.get(sp)
    }

    pub fn get_species(&self) -> Vec<&str> {
        let mut species: Vec<&str> = self.pots.keys().map(|s| s.as_str()).collect();
        species.sort_unstable();

        species
    }

    pub fn get_max_lmax(&self) -> usize {
        let mut max_lmax = 0;

        for (_, psp) in self.pots.iter() {
            let lmax = psp.get_l_max();

            if lmax > max_lmax {
                max_lmax = lmax;
            }
        }

        max_lmax
    }

    pub fn display(&self) {
        for sp in self.get_species() {
            let psp = &self.pots[sp];

            info!(
                "   {} : {} ({})",
                sp,
                self.atpsp_file[sp].display(),
                psp.get_format_guessed()
            );
        }
    }
}

/// Parse a species table: `<species> <file> [<format>]` per line, `#` starts
/// a comment line.
pub fn get_psp_files<P: AsRef<Path>>(inpfile: P) -> Result<Vec<PspEntry>> {
    let text = fs::read_to_string(inpfile)?;

    parse_psp_table(&text)
}

pub fn parse_psp_table(text: &str) -> Result<Vec<PspEntry>> {
    let mut entries: Vec<PspEntry> = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let s: Vec<&str> = line.split_whitespace().collect();

        if s.len() < 2 || s.len() > 3 {
            return Err(PspError::corrupt(format!(
                "species table line {}: expected '<species> <file> [<format>]', found '{}'",
                i + 1,
                line
            )));
        }

        let format = match s.get(2) {
            Some(f) => f.parse::<Format>()?,
            None => Format::Unknown,
        };

        if entries.iter().any(|e| e.species == s[0]) {
            return Err(PspError::inconsistent(format!(
                "species '{}' listed twice",
                s[0]
            )));
        }

        entries.push(PspEntry {
            species: s[0].to_string(),
            file: PathBuf::from(s[1]),
            format,
        });
    }

    Ok(entries)
}
