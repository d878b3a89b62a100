//! Chemical symbols and atomic numbers. UPF files name the element but do
//! not carry its atomic number.

use pspdata::PspData;
use psperror::{PspError, Result};

pub trait ElementTable {
    fn symbol_to_z(&self, symbol: &str) -> Result<u32>;
    fn z_to_symbol(&self, z: u32) -> Result<String>;
}

/// The 118 named elements, indexed by `z - 1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodicTable;

const SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

impl ElementTable for PeriodicTable {
    /// Case-insensitive, surrounding blanks ignored.
    fn symbol_to_z(&self, symbol: &str) -> Result<u32> {
        let symbol = symbol.trim();

        SYMBOLS
            .iter()
            .position(|s| s.eq_ignore_ascii_case(symbol))
            .map(|i| i as u32 + 1)
            .ok_or_else(|| PspError::corrupt(format!("unknown element '{}'", symbol)))
    }

    fn z_to_symbol(&self, z: u32) -> Result<String> {
        match z {
            1..=118 => Ok(SYMBOLS[z as usize - 1].to_string()),
            _ => Err(PspError::invalid(format!("no element with z = {}", z))),
        }
    }
}

/// Symbol to write for `psp`: its own, or the one its atomic number names.
pub fn element_symbol(elements: &dyn ElementTable, psp: &PspData) -> Result<String> {
    if !psp.get_symbol().is_empty() {
        return Ok(psp.get_symbol().to_string());
    }

    let z = psp.get_z();
    if z < 0.5 {
        return Err(PspError::invalid(
            "dataset has neither an element symbol nor an atomic number",
        ));
    }

    elements.z_to_symbol(z.round() as u32)
}
