//! Compute module - Numerical core of the wave propagation engine.

mod acoustic;
mod boundary;
mod coupling;
mod cpml;
mod elastic;
mod engine;
mod fields;
mod gradient;
mod grid;
mod materials;
mod spectral;
mod stencil;

pub use acoustic::*;
pub use boundary::*;
pub use coupling::*;
pub use cpml::*;
pub use elastic::*;
pub use engine::*;
pub use fields::*;
pub use gradient::*;
pub use grid::*;
pub use materials::*;
pub use spectral::*;
pub use stencil::*;
