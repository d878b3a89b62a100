use crate::{Format, Potential, Projector, PspInfo, QnKey, QuantumNumber, Scheme, State, WaveEq, Xc};
use integral::simpson_rab;
use psperror::{PspError, Result};
use radial::{Mesh, MeshFunc};

use log::debug;
use std::{collections::HashMap, fmt};

/// A norm-conserving pseudopotential in canonical form. Energies are in
/// Hartree, radii in Bohr.
///
/// The dataset owns every child entity; each mesh function carries its own
/// copy of the radial mesh.
#[derive(Debug, Clone, Default)]
pub struct PspData {
    format_guessed: Format,
    info: String,
    symbol: String,
    z: f64,
    zvalence: f64,
    nelvalence: f64,
    l_max: usize,
    wave_eq: WaveEq,
    total_energy: f64,
    pspinfo: PspInfo,
    scheme: Scheme,

    mesh: Option<Mesh>,

    states: Vec<State>,
    potentials: Vec<Potential>,
    kb_projectors: Vec<Projector>,
    l_local: Option<usize>,
    kb_l_max: Option<usize>,
    vlocal: Option<Potential>,

    xc: Xc,
    rho_valence: Option<MeshFunc>,

    state_index: HashMap<QnKey, usize>,
    potential_index: HashMap<(usize, u32), usize>,
    projector_index: HashMap<usize, Vec<usize>>,
}

impl PspData {
    pub fn new() -> PspData {
        PspData::default()
    }

    pub fn set_format_guessed(&mut self, format: Format) {
        self.format_guessed = format;
    }

    pub fn get_format_guessed(&self) -> Format {
        self.format_guessed
    }

    pub fn set_info(&mut self, info: &str) {
        self.info = info.to_string();
    }

    pub fn get_info(&self) -> &str {
        &self.info
    }

    pub fn set_symbol(&mut self, symbol: &str) {
        self.symbol = symbol.trim().to_string();
    }

    pub fn get_symbol(&self) -> &str {
        &self.symbol
    }

    pub fn set_z(&mut self, z: f64) {
        self.z = z;
    }

    pub fn get_z(&self) -> f64 {
        self.z
    }

    pub fn set_zvalence(&mut self, zvalence: f64) {
        self.zvalence = zvalence;
    }

    pub fn get_zvalence(&self) -> f64 {
        self.zvalence
    }

    pub fn set_nelvalence(&mut self, nelvalence: f64) {
        self.nelvalence = nelvalence;
    }

    pub fn get_nelvalence(&self) -> f64 {
        self.nelvalence
    }

    pub fn set_l_max(&mut self, l_max: usize) {
        self.l_max = l_max;
    }

    pub fn get_l_max(&self) -> usize {
        self.l_max
    }

    pub fn set_wave_eq(&mut self, wave_eq: WaveEq) {
        self.wave_eq = wave_eq;
    }

    pub fn get_wave_eq(&self) -> WaveEq {
        self.wave_eq
    }

    pub fn set_total_energy(&mut self, etot: f64) {
        self.total_energy = etot;
    }

    pub fn get_total_energy(&self) -> f64 {
        self.total_energy
    }

    pub fn set_pspinfo(&mut self, pspinfo: PspInfo) {
        self.pspinfo = pspinfo;
    }

    pub fn get_pspinfo(&self) -> &PspInfo {
        &self.pspinfo
    }

    pub fn set_scheme(&mut self, scheme: Scheme) {
        self.scheme = scheme;
    }

    pub fn get_scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn set_mesh(&mut self, mesh: Mesh) {
        self.mesh = Some(mesh);
    }

    pub fn get_mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    /// The dataset mesh, or `InvalidArgument` if none was set.
    pub fn mesh(&self) -> Result<&Mesh> {
        self.mesh
            .as_ref()
            .ok_or_else(|| PspError::invalid("dataset has no radial mesh"))
    }

    pub fn set_states(&mut self, states: Vec<State>) {
        self.state_index = states
            .iter()
            .enumerate()
            .map(|(i, s)| (s.get_qn().key(), i))
            .collect();
        self.states = states;
    }

    pub fn get_states(&self) -> &[State] {
        &self.states
    }

    pub fn get_n_states(&self) -> usize {
        self.states.len()
    }

    pub fn state_for(&self, qn: &QuantumNumber) -> Option<&State> {
        self.state_index.get(&qn.key()).map(|&i| &self.states[i])
    }

    pub fn set_potentials(&mut self, potentials: Vec<Potential>) {
        self.potential_index = potentials
            .iter()
            .enumerate()
            .map(|(i, p)| (p.get_qn().lj_key(), i))
            .collect();
        self.potentials = potentials;
    }

    pub fn get_potentials(&self) -> &[Potential] {
        &self.potentials
    }

    pub fn get_n_potentials(&self) -> usize {
        self.potentials.len()
    }

    /// Semi-local potential of channel (l, j); j is 0 without spin-orbit.
    pub fn potential_for(&self, l: usize, j: f64) -> Option<&Potential> {
        let key = (l, (2.0 * j).round() as u32);

        self.potential_index.get(&key).map(|&i| &self.potentials[i])
    }

    /// Replaces the projectors; `kb_l_max` follows the largest l.
    pub fn set_kb_projectors(&mut self, projectors: Vec<Projector>) {
        let mut index: HashMap<usize, Vec<usize>> = HashMap::new();

        for (i, p) in projectors.iter().enumerate() {
            index.entry(p.get_l()).or_default().push(i);
        }

        self.kb_l_max = projectors.iter().map(|p| p.get_l()).max();
        self.projector_index = index;
        self.kb_projectors = projectors;
    }

    pub fn get_kb_projectors(&self) -> &[Projector] {
        &self.kb_projectors
    }

    pub fn get_n_kbproj(&self) -> usize {
        self.kb_projectors.len()
    }

    pub fn get_kb_l_max(&self) -> Option<usize> {
        self.kb_l_max
    }

    /// Projectors of angular momentum l, in file order.
    pub fn projectors_for(&self, l: usize) -> Vec<&Projector> {
        match self.projector_index.get(&l) {
            Some(idx) => idx.iter().map(|&i| &self.kb_projectors[i]).collect(),
            None => Vec::new(),
        }
    }

    pub fn set_l_local(&mut self, l_local: Option<usize>) {
        self.l_local = l_local;
    }

    pub fn get_l_local(&self) -> Option<usize> {
        self.l_local
    }

    /// Highest l not above l_max that carries no projector.
    pub fn resolve_l_local(&mut self) -> Option<usize> {
        self.l_local = (0..=self.l_max)
            .rev()
            .find(|l| !self.projector_index.contains_key(l));

        debug!("resolved l_local = {:?}", self.l_local);

        self.l_local
    }

    pub fn set_vlocal(&mut self, vlocal: Option<Potential>) {
        self.vlocal = vlocal;
    }

    pub fn get_vlocal(&self) -> Option<&Potential> {
        self.vlocal.as_ref()
    }

    pub fn set_xc(&mut self, xc: Xc) {
        self.xc = xc;
    }

    pub fn get_xc(&self) -> &Xc {
        &self.xc
    }

    pub fn get_xc_mut(&mut self) -> &mut Xc {
        &mut self.xc
    }

    pub fn set_rho_valence(&mut self, rho: Option<MeshFunc>) {
        self.rho_valence = rho;
    }

    pub fn get_rho_valence(&self) -> Option<&MeshFunc> {
        self.rho_valence.as_ref()
    }

    /// Integral of the tabulated valence density (4 pi r^2 rho) over the mesh.
    pub fn valence_charge(&self) -> Result<f64> {
        let rho = self
            .rho_valence
            .as_ref()
            .ok_or_else(|| PspError::invalid("dataset has no valence density"))?;

        Ok(simpson_rab(rho.get_values(), rho.get_mesh().get_rab()))
    }

    /// Check the cross-field invariants of a populated dataset.
    pub fn validate(&self) -> Result<()> {
        let mesh = self.mesh()?;
        let np = mesh.get_np();

        if let Some(l_local) = self.l_local {
            if l_local > self.l_max {
                return Err(PspError::inconsistent(format!(
                    "l_local = {} exceeds l_max = {}",
                    l_local, self.l_max
                )));
            }

            if self.projector_index.contains_key(&l_local) {
                return Err(PspError::inconsistent(format!(
                    "local channel l = {} has non-local projectors",
                    l_local
                )));
            }
        }

        let funcs = self
            .states
            .iter()
            .map(|s| ("state", s.get_wf()))
            .chain(self.potentials.iter().map(|p| ("potential", p.get_v())))
            .chain(self.kb_projectors.iter().map(|p| ("projector", p.get_proj())))
            .chain(self.vlocal.iter().map(|p| ("local potential", p.get_v())))
            .chain(self.rho_valence.iter().map(|f| ("valence density", f)))
            .chain(self.xc.get_core_density().map(|f| ("core density", f)));

        for (what, f) in funcs {
            if f.get_np() != np {
                return Err(PspError::inconsistent(format!(
                    "{} has {} points, the mesh has {}",
                    what,
                    f.get_np(),
                    np
                )));
            }
        }

        if self.state_index.len() != self.states.len() {
            return Err(PspError::inconsistent("duplicate quantum numbers among states"));
        }

        if self.potential_index.len() != self.potentials.len() {
            return Err(PspError::inconsistent("duplicate (l, j) among potentials"));
        }

        let kb_l_max = self.kb_projectors.iter().map(|p| p.get_l()).max();
        if kb_l_max != self.kb_l_max {
            return Err(PspError::inconsistent(format!(
                "kb_l_max = {:?} but projectors reach l = {:?}",
                self.kb_l_max, kb_l_max
            )));
        }

        Ok(())
    }
}

impl fmt::Display for PspData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            " symbol = {} z = {} zvalence = {} format = {}",
            self.symbol, self.z, self.zvalence, self.format_guessed
        )?;
        writeln!(
            f,
            " l_max = {} l_local = {:?} kb_l_max = {:?}",
            self.l_max, self.l_local, self.kb_l_max
        )?;
        writeln!(
            f,
            " n_states = {} n_potentials = {} n_kbproj = {}",
            self.states.len(),
            self.potentials.len(),
            self.kb_projectors.len()
        )?;
        writeln!(
            f,
            " xc = {:?} nlcc = {}",
            self.xc.get_pair(),
            self.xc.has_nlcc()
        )?;

        match &self.mesh {
            Some(mesh) => write!(f, "{}", mesh),
            None => write!(f, " no mesh"),
        }
    }
}
