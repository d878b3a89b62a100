use crate::{CubicSpline, Mesh};
use psperror::{PspError, Result};

/// A function sampled on its own copy of a radial mesh, with a cubic-spline
/// interpolant rebuilt whenever the samples change.
#[derive(Debug, Clone)]
pub struct MeshFunc {
    mesh: Mesh,
    f: Vec<f64>,
    spl: CubicSpline,
}

impl MeshFunc {
    pub fn build(mesh: &Mesh, f: &[f64]) -> Result<MeshFunc> {
        if f.len() != mesh.get_np() {
            return Err(PspError::invalid(format!(
                "{} samples for a mesh of {} points",
                f.len(),
                mesh.get_np()
            )));
        }

        let spl = CubicSpline::new(mesh.get_rad(), f)?;

        Ok(MeshFunc {
            mesh: mesh.clone(),
            f: f.to_vec(),
            spl,
        })
    }

    /// Replace the samples, keeping the mesh.
    pub fn set_values(&mut self, f: &[f64]) -> Result<()> {
        *self = MeshFunc::build(&self.mesh, f)?;

        Ok(())
    }

    pub fn get_mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn get_np(&self) -> usize {
        self.mesh.get_np()
    }

    pub fn get_values(&self) -> &[f64] {
        &self.f
    }

    /// Interpolated value; extrapolates the boundary cubic outside the mesh.
    pub fn eval(&self, r: f64) -> f64 {
        self.spl.eval(r)
    }

    pub fn eval_deriv(&self, r: f64) -> f64 {
        self.spl.eval_deriv(r)
    }

    pub fn eval_deriv2(&self, r: f64) -> f64 {
        self.spl.eval_deriv2(r)
    }

    /// Values at the points of another mesh.
    pub fn resample(&self, mesh: &Mesh) -> Result<MeshFunc> {
        let f: Vec<f64> = mesh.get_rad().iter().map(|&r| self.eval(r)).collect();

        MeshFunc::build(mesh, &f)
    }

    /// Same mesh and samples within the relative tolerance `tol`.
    pub fn is_close(&self, other: &MeshFunc, tol: f64) -> bool {
        self.mesh.is_close(&other.mesh, tol)
            && self
                .f
                .iter()
                .zip(other.f.iter())
                .all(|(x, y)| (x - y).abs() <= tol * x.abs().max(y.abs()).max(1.0))
    }
}
