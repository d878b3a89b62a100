use std::f64;

// units : length

pub const BOHR_TO_ANG: f64 = 0.529177249;
pub const ANG_TO_BOHR: f64 = 1.0 / BOHR_TO_ANG;

// units : energy

pub const RY_TO_EV: f64 = 13.605698066;
pub const HA_TO_EV: f64 = 2.0 * RY_TO_EV;
pub const HA_TO_RY: f64 = 2.0;
pub const EV_TO_HA: f64 = 1.0 / HA_TO_EV;
pub const RY_TO_HA: f64 = 1.0 / HA_TO_RY;

// pi

pub const PI: f64 = f64::consts::PI;
pub const TWOPI: f64 = 2.0 * f64::consts::PI;
pub const FOURPI: f64 = 4.0 * f64::consts::PI;

// numerical tolerances

pub const EPS5: f64 = 1E-5;
pub const EPS6: f64 = 1E-6;
pub const EPS8: f64 = 1E-8;
pub const EPS10: f64 = 1E-10;
pub const EPS12: f64 = 1E-12;
pub const EPS14: f64 = 1E-14;

// abinit treats a core-charge prefactor below this magnitude as no core correction

pub const NLCC_FCHRG_THRESHOLD: f64 = EPS14;

// mesh laws are recognized when every point matches within this relative tolerance

pub const MESH_LAW_TOLERANCE: f64 = EPS8;
