//! Canonical in-memory representation of a norm-conserving pseudopotential.

mod qn;
pub use qn::*;

mod state;
pub use state::*;

mod potential;
pub use potential::*;

mod xc;
pub use xc::*;

mod format;
pub use format::*;

mod pspdata;
pub use pspdata::*;

pub use radial::{Mesh, MeshFunc, MeshType};
