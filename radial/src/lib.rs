//! Radial meshes and the functions tabulated on them.

mod mesh;
pub use mesh::*;

mod spline;
pub use spline::*;

mod meshfunc;
pub use meshfunc::*;
