use crate::QuantumNumber;
use psperror::Result;
use radial::{Mesh, MeshFunc};

/// Semi-local (or local) potential of one channel.
#[derive(Debug, Clone)]
pub struct Potential {
    qn: QuantumNumber,
    v: MeshFunc,
}

impl Potential {
    pub fn new(qn: QuantumNumber, mesh: &Mesh, v: &[f64]) -> Result<Potential> {
        Ok(Potential {
            qn,
            v: MeshFunc::build(mesh, v)?,
        })
    }

    pub fn get_qn(&self) -> &QuantumNumber {
        &self.qn
    }

    pub fn get_v(&self) -> &MeshFunc {
        &self.v
    }

    pub fn eval(&self, r: f64) -> f64 {
        self.v.eval(r)
    }

    pub fn eval_deriv(&self, r: f64) -> f64 {
        self.v.eval_deriv(r)
    }

    pub fn eval_deriv2(&self, r: f64) -> f64 {
        self.v.eval_deriv2(r)
    }
}

/// Kleinman-Bylander projector with its coupling energy (Hartree).
#[derive(Debug, Clone)]
pub struct Projector {
    qn: QuantumNumber,
    energy: f64,
    proj: MeshFunc,
}

impl Projector {
    pub fn new(qn: QuantumNumber, energy: f64, mesh: &Mesh, proj: &[f64]) -> Result<Projector> {
        Ok(Projector {
            qn,
            energy,
            proj: MeshFunc::build(mesh, proj)?,
        })
    }

    pub fn get_qn(&self) -> &QuantumNumber {
        &self.qn
    }

    pub fn get_l(&self) -> usize {
        self.qn.get_l()
    }

    pub fn get_energy(&self) -> f64 {
        self.energy
    }

    pub fn get_proj(&self) -> &MeshFunc {
        &self.proj
    }

    pub fn eval(&self, r: f64) -> f64 {
        self.proj.eval(r)
    }
}
