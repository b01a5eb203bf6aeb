//! Elastic (velocity-stress) staggered-grid time stepper.

use super::acoustic::dirichlet_walls;
use super::cpml::{CpmlProfile, Stagger};
use super::fields::ElasticFields;
use super::grid::SimGrid;
use super::materials::PaddedMedium;
use super::stencil;

/// One-shot view over everything an elastic time step reads.
pub struct ElasticStepper<'a> {
    pub grid: &'a SimGrid,
    pub medium: &'a PaddedMedium,
    pub prof_z: &'a CpmlProfile,
    pub prof_x: &'a CpmlProfile,
    pub dt: f64,
}

impl<'a> ElasticStepper<'a> {
    /// Advance the elastic field by one time step.
    ///
    /// Same skeleton as the acoustic step with the velocity update driven
    /// by the stress divergence and the pressure update replaced by the
    /// normal- and shear-stress updates. In 2D the out-of-plane strain
    /// rate is identically zero and never enters the normal-stress
    /// coupling.
    pub fn step_forward(&self, f: &mut ElasticFields) {
        let g = self.grid;
        let m = self.medium;
        let lambda = m.lambda.as_ref().expect("elastic medium");
        let big_m = m.m.as_ref().expect("elastic medium");
        let mu_xz = m.mu_xz.as_ref().expect("elastic medium");

        // Stress derivatives onto the velocity grids.
        stencil::d_x_forward(g, &f.txx, &mut f.dtxxdx);
        stencil::d_z_backward(g, &f.txz, &mut f.dtxzdz);
        stencil::d_z_forward(g, &f.tzz, &mut f.dtzzdz);
        stencil::d_x_backward(g, &f.txz, &mut f.dtxzdx);
        self.prof_x
            .absorb_x(g, Stagger::Half, &mut f.dtxxdx, &mut f.mem_dtxxdx);
        self.prof_z
            .absorb_z(g, Stagger::Integer, &mut f.dtxzdz, &mut f.mem_dtxzdz);
        self.prof_z
            .absorb_z(g, Stagger::Half, &mut f.dtzzdz, &mut f.mem_dtzzdz);
        self.prof_x
            .absorb_x(g, Stagger::Integer, &mut f.dtxzdx, &mut f.mem_dtxzdx);

        for i in 0..g.size() {
            f.vx[i] += self.dt * m.rho_inv_vx[i] * (f.dtxxdx[i] + f.dtxzdz[i]);
            f.vz[i] += self.dt * m.rho_inv_vz[i] * (f.dtzzdz[i] + f.dtxzdx[i]);
        }
        dirichlet_walls(g, &mut f.vx, &mut f.vz);

        // Velocity derivatives onto the stress grids.
        stencil::d_x_backward(g, &f.vx, &mut f.dvxdx);
        stencil::d_z_backward(g, &f.vz, &mut f.dvzdz);
        stencil::d_z_forward(g, &f.vx, &mut f.dvxdz);
        stencil::d_x_forward(g, &f.vz, &mut f.dvzdx);
        self.prof_x
            .absorb_x(g, Stagger::Integer, &mut f.dvxdx, &mut f.mem_dvxdx);
        self.prof_z
            .absorb_z(g, Stagger::Integer, &mut f.dvzdz, &mut f.mem_dvzdz);
        self.prof_z
            .absorb_z(g, Stagger::Half, &mut f.dvxdz, &mut f.mem_dvxdz);
        self.prof_x
            .absorb_x(g, Stagger::Half, &mut f.dvzdx, &mut f.mem_dvzdx);

        for i in 0..g.size() {
            f.txx[i] += self.dt * (big_m[i] * f.dvxdx[i] + lambda[i] * f.dvzdz[i]);
            f.tzz[i] += self.dt * (big_m[i] * f.dvzdz[i] + lambda[i] * f.dvxdx[i]);
            f.txz[i] += self.dt * mu_xz[i] * (f.dvxdz[i] + f.dvzdx[i]);
        }
    }
}
