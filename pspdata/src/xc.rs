use psperror::{PspError, Result};
use radial::{Mesh, MeshFunc};

/// How the non-linear core correction was specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NlccScheme {
    Unknown,
    /// tabulated core density of the fhi98pp code
    Fhi,
    /// abinit model charge controlled by rchrg and fchrg
    Abinit,
    /// tabulated core density of a UPF file
    Upf,
}

/// Non-linear core correction: the abinit prefactors (rchrg, fchrg, qchrg),
/// a tabulated core density, or both.
#[derive(Debug, Clone)]
pub struct Nlcc {
    scheme: NlccScheme,
    prefactors: Option<(f64, f64, f64)>,
    density: Option<MeshFunc>,
}

impl Nlcc {
    pub fn new(scheme: NlccScheme) -> Nlcc {
        Nlcc {
            scheme,
            prefactors: None,
            density: None,
        }
    }

    pub fn with_prefactors(mut self, rchrg: f64, fchrg: f64, qchrg: f64) -> Nlcc {
        self.prefactors = Some((rchrg, fchrg, qchrg));
        self
    }

    pub fn with_density(mut self, mesh: &Mesh, rho: &[f64]) -> Result<Nlcc> {
        self.density = Some(MeshFunc::build(mesh, rho)?);
        Ok(self)
    }

    pub fn get_scheme(&self) -> NlccScheme {
        self.scheme
    }

    pub fn get_prefactors(&self) -> Option<(f64, f64, f64)> {
        self.prefactors
    }

    pub fn get_density(&self) -> Option<&MeshFunc> {
        self.density.as_ref()
    }
}

/// Exchange-correlation descriptor. The functional is a canonical
/// (exchange, correlation) pair of libxc identifiers; 0 means none/unknown.
#[derive(Debug, Clone, Default)]
pub struct Xc {
    exchange: i32,
    correlation: i32,
    nlcc: Option<Nlcc>,
}

impl Xc {
    pub fn new(exchange: i32, correlation: i32) -> Xc {
        Xc {
            exchange,
            correlation,
            nlcc: None,
        }
    }

    pub fn with_nlcc(mut self, nlcc: Nlcc) -> Xc {
        self.nlcc = Some(nlcc);
        self
    }

    pub fn set(&mut self, exchange: i32, correlation: i32) {
        self.exchange = exchange;
        self.correlation = correlation;
    }

    pub fn set_nlcc(&mut self, nlcc: Option<Nlcc>) {
        self.nlcc = nlcc;
    }

    pub fn get_exchange(&self) -> i32 {
        self.exchange
    }

    pub fn get_correlation(&self) -> i32 {
        self.correlation
    }

    pub fn get_pair(&self) -> (i32, i32) {
        (self.exchange, self.correlation)
    }

    pub fn has_nlcc(&self) -> bool {
        self.nlcc.is_some()
    }

    pub fn get_nlcc(&self) -> Option<&Nlcc> {
        self.nlcc.as_ref()
    }

    /// Tabulated core density, if the correction carries one.
    pub fn get_core_density(&self) -> Option<&MeshFunc> {
        self.nlcc.as_ref().and_then(|n| n.get_density())
    }

    pub fn core_density_eval(&self, r: f64) -> Result<f64> {
        self.get_core_density()
            .map(|rho| rho.eval(r))
            .ok_or_else(|| PspError::invalid("no tabulated core density"))
    }
}
