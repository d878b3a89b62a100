use pspconsts::*;
use psperror::{PspError, Result};

use itertools::Itertools;
use std::fmt;

/// Generating law of a radial mesh, with i counted from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshType {
    /// r_i = b * exp(a * i)
    LogExp,
    /// r_i = b * (exp(a * i) - 1)
    LogExpShifted,
    /// r_i = a * i + b
    Linear,
    Unknown,
}

impl MeshType {
    fn point(&self, a: f64, b: f64, i: usize) -> f64 {
        let x = i as f64;

        match self {
            MeshType::LogExp => b * (a * x).exp(),
            MeshType::LogExpShifted => b * ((a * x).exp() - 1.0),
            MeshType::Linear => a * x + b,
            MeshType::Unknown => f64::NAN,
        }
    }

    fn rab(&self, a: f64, b: f64, r: f64) -> f64 {
        match self {
            MeshType::LogExp => a * r,
            MeshType::LogExpShifted => a * (r + b),
            MeshType::Linear => a,
            MeshType::Unknown => f64::NAN,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    mtype: MeshType,
    a: f64,
    b: f64,
    r: Vec<f64>,
    rab: Vec<f64>,
}

impl Mesh {
    /// A mesh of `np` points, all at the origin until set.
    pub fn alloc(np: usize) -> Result<Mesh> {
        if np <= 1 {
            return Err(PspError::invalid(format!(
                "a mesh needs at least 2 points, got {}",
                np
            )));
        }

        let mut r = psperror::try_alloc::<f64>(np)?;
        r.resize(np, 0.0);

        let mut rab = psperror::try_alloc::<f64>(np)?;
        rab.resize(np, 0.0);

        Ok(Mesh {
            mtype: MeshType::Unknown,
            a: 0.0,
            b: 0.0,
            r,
            rab,
        })
    }

    /// Convenience for `alloc` followed by `init_from_points`.
    pub fn from_points(r: &[f64], rab: Option<&[f64]>) -> Result<Mesh> {
        let mut mesh = Mesh::alloc(r.len())?;

        mesh.init_from_points(r, rab)?;

        Ok(mesh)
    }

    /// Convenience for `alloc` followed by `init_from_parameters`.
    pub fn from_parameters(mtype: MeshType, a: f64, b: f64, np: usize) -> Result<Mesh> {
        let mut mesh = Mesh::alloc(np)?;

        mesh.init_from_parameters(mtype, a, b)?;

        Ok(mesh)
    }

    /// Store the points together with an explicit law. The derivative is
    /// taken from the law, or from finite differences for `Unknown`.
    pub fn set(&mut self, mtype: MeshType, a: f64, b: f64, r: &[f64]) -> Result<()> {
        self.check_points(r)?;

        self.mtype = mtype;
        self.a = a;
        self.b = b;
        self.r.copy_from_slice(r);
        self.rab = self.derived_rab();

        Ok(())
    }

    /// Store the points and work out which law, if any, generated them.
    pub fn init_from_points(&mut self, r: &[f64], rab: Option<&[f64]>) -> Result<()> {
        self.check_points(r)?;

        if let Some(rab) = rab {
            if rab.len() != r.len() {
                return Err(PspError::invalid(format!(
                    "mesh derivative has {} values for {} points",
                    rab.len(),
                    r.len()
                )));
            }
        }

        let (mtype, a, b) = infer_law(r);

        self.mtype = mtype;
        self.a = a;
        self.b = b;
        self.r.copy_from_slice(r);

        self.rab = match rab {
            Some(rab) => rab.to_vec(),
            None => self.derived_rab(),
        };

        Ok(())
    }

    /// Generate every point from the law.
    pub fn init_from_parameters(&mut self, mtype: MeshType, a: f64, b: f64) -> Result<()> {
        if mtype == MeshType::Unknown {
            return Err(PspError::invalid("cannot generate a mesh of unknown type"));
        }

        let r: Vec<f64> = (0..self.r.len()).map(|i| mtype.point(a, b, i)).collect();

        self.set(mtype, a, b, &r)
    }

    pub fn copy_from(&mut self, src: &Mesh) {
        self.clone_from(src);
    }

    pub fn get_type(&self) -> MeshType {
        self.mtype
    }

    pub fn get_a(&self) -> f64 {
        self.a
    }

    pub fn get_b(&self) -> f64 {
        self.b
    }

    pub fn get_np(&self) -> usize {
        self.r.len()
    }

    pub fn get_rad(&self) -> &[f64] {
        &self.r
    }

    pub fn get_rab(&self) -> &[f64] {
        &self.rab
    }

    pub fn r_min(&self) -> f64 {
        self.r[0]
    }

    pub fn r_max(&self) -> f64 {
        self.r[self.r.len() - 1]
    }

    /// Same point count and the same radii within `tol` (relative).
    pub fn is_close(&self, other: &Mesh, tol: f64) -> bool {
        self.get_np() == other.get_np()
            && self
                .r
                .iter()
                .zip(other.r.iter())
                .all(|(x, y)| (x - y).abs() <= tol * x.abs().max(y.abs()).max(1.0))
    }

    fn check_points(&self, r: &[f64]) -> Result<()> {
        if r.len() != self.r.len() {
            return Err(PspError::invalid(format!(
                "mesh holds {} points, got {}",
                self.r.len(),
                r.len()
            )));
        }

        if let Some((i, _)) = r
            .iter()
            .tuple_windows()
            .enumerate()
            .find(|(_, (x, y))| !(y > x))
        {
            return Err(PspError::invalid(format!(
                "mesh points must increase strictly (r[{}] = {}, r[{}] = {})",
                i,
                r[i],
                i + 1,
                r[i + 1]
            )));
        }

        Ok(())
    }

    fn derived_rab(&self) -> Vec<f64> {
        match self.mtype {
            MeshType::Unknown => finite_difference(&self.r),
            law => self.r.iter().map(|&r| law.rab(self.a, self.b, r)).collect(),
        }
    }
}

impl fmt::Display for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            " mesh type = {:?} a = {:.10E} b = {:.10E} np = {} r = [{:.6E}, {:.6E}]",
            self.mtype,
            self.a,
            self.b,
            self.get_np(),
            self.r_min(),
            self.r_max()
        )
    }
}

fn matches_law(r: &[f64], mtype: MeshType, a: f64, b: f64) -> bool {
    if !a.is_finite() || !b.is_finite() {
        return false;
    }

    r.iter().enumerate().all(|(i, &ri)| {
        let law = mtype.point(a, b, i);

        (law - ri).abs() <= MESH_LAW_TOLERANCE * ri.abs().max(law.abs()).max(EPS10)
    })
}

fn infer_law(r: &[f64]) -> (MeshType, f64, f64) {
    let np = r.len();

    // linear: constant spacing
    let a = r[1] - r[0];
    let b = r[0];
    if matches_law(r, MeshType::Linear, a, b) {
        return (MeshType::Linear, a, b);
    }

    // logarithmic: constant ratio
    if r[0] > 0.0 {
        let a = (r[1] / r[0]).ln();
        let b = r[0];
        if matches_law(r, MeshType::LogExp, a, b) {
            return (MeshType::LogExp, a, b);
        }
    }

    // shifted logarithmic: starts at the origin, r2/r1 = exp(a) + 1
    if np >= 3 && r[0].abs() <= EPS12 && r[1] > 0.0 {
        let ea = r[2] / r[1] - 1.0;
        if ea > 1.0 {
            let a = ea.ln();
            let b = r[1] / (ea - 1.0);
            if matches_law(r, MeshType::LogExpShifted, a, b) {
                return (MeshType::LogExpShifted, a, b);
            }
        }
    }

    (MeshType::Unknown, 0.0, 0.0)
}

fn finite_difference(r: &[f64]) -> Vec<f64> {
    let np = r.len();

    (0..np)
        .map(|i| {
            if i == 0 {
                r[1] - r[0]
            } else if i == np - 1 {
                r[np - 1] - r[np - 2]
            } else {
                0.5 * (r[i + 1] - r[i - 1])
            }
        })
        .collect()
}
