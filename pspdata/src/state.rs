use crate::QuantumNumber;
use psperror::{PspError, Result};
use radial::{Mesh, MeshFunc};

/// An electronic state of the reference atom. The wavefunction is the
/// reduced radial function u(r) = r R(r).
#[derive(Debug, Clone)]
pub struct State {
    label: String,
    qn: QuantumNumber,
    occ: f64,
    eigenval: f64,
    rc: Option<f64>,
    wf: MeshFunc,
}

impl State {
    pub fn new(
        label: &str,
        qn: QuantumNumber,
        occ: f64,
        eigenval: f64,
        mesh: &Mesh,
        wf: &[f64],
    ) -> Result<State> {
        if !(occ >= 0.0) {
            return Err(PspError::invalid(format!(
                "state {} has negative occupation {}",
                qn, occ
            )));
        }

        Ok(State {
            label: label.to_string(),
            qn,
            occ,
            eigenval,
            rc: None,
            wf: MeshFunc::build(mesh, wf)?,
        })
    }

    pub fn with_rc(mut self, rc: f64) -> State {
        self.rc = Some(rc);
        self
    }

    pub fn get_label(&self) -> &str {
        &self.label
    }

    pub fn get_qn(&self) -> &QuantumNumber {
        &self.qn
    }

    pub fn get_occ(&self) -> f64 {
        self.occ
    }

    pub fn get_eigenval(&self) -> f64 {
        self.eigenval
    }

    pub fn get_rc(&self) -> Option<f64> {
        self.rc
    }

    pub fn get_wf(&self) -> &MeshFunc {
        &self.wf
    }

    pub fn wf_eval(&self, r: f64) -> f64 {
        self.wf.eval(r)
    }

    pub fn wf_eval_deriv(&self, r: f64) -> f64 {
        self.wf.eval_deriv(r)
    }
}
