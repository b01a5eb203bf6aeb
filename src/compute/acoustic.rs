//! Acoustic staggered-grid time stepper.

use super::cpml::{CpmlProfile, Stagger};
use super::fields::AcousticFields;
use super::grid::SimGrid;
use super::materials::PaddedMedium;
use super::stencil;

/// One-shot view over everything a time step reads.
///
/// Construction is free; the engine builds one per shot and calls the
/// step methods `nt` times.
pub struct Stepper<'a> {
    pub grid: &'a SimGrid,
    pub medium: &'a PaddedMedium,
    pub prof_z: &'a CpmlProfile,
    pub prof_x: &'a CpmlProfile,
    pub dt: f64,
}

impl<'a> Stepper<'a> {
    /// Advance the acoustic field by one time step.
    ///
    /// Order is fixed: pressure derivatives, CPML recursion, velocity
    /// update, Dirichlet walls, velocity derivatives, CPML recursion,
    /// pressure update. Source injection and receiver sampling happen
    /// outside, between steps.
    pub fn step_forward(&self, f: &mut AcousticFields) {
        let g = self.grid;
        stencil::d_x_forward(g, &f.p, &mut f.dpdx);
        stencil::d_z_forward(g, &f.p, &mut f.dpdz);
        self.prof_x.absorb_x(g, Stagger::Half, &mut f.dpdx, &mut f.mem_dpdx);
        self.prof_z.absorb_z(g, Stagger::Half, &mut f.dpdz, &mut f.mem_dpdz);

        for i in 0..g.size() {
            f.vx[i] -= self.dt * self.medium.rho_inv_vx[i] * f.dpdx[i];
            f.vz[i] -= self.dt * self.medium.rho_inv_vz[i] * f.dpdz[i];
        }
        dirichlet_walls(g, &mut f.vx, &mut f.vz);

        stencil::d_x_backward(g, &f.vx, &mut f.dvxdx);
        stencil::d_z_backward(g, &f.vz, &mut f.dvzdz);
        self.prof_x
            .absorb_x(g, Stagger::Integer, &mut f.dvxdx, &mut f.mem_dvxdx);
        self.prof_z
            .absorb_z(g, Stagger::Integer, &mut f.dvzdz, &mut f.mem_dvzdz);

        for i in 0..g.size() {
            f.p[i] -= self.dt * self.medium.k[i] * (f.dvxdx[i] + f.dvzdz[i]);
        }
    }

    /// Undo one time step: from `(p, v)` at step `it` recover step `it-1`.
    ///
    /// The update order inverts the forward step (pressure first, then
    /// velocities, both with negated `dt`). No CPML recursion and no wall
    /// handling: inside the boundary layer the forward dynamics are
    /// dissipative and not invertible, which is why the recorded shell is
    /// forced back in before each call.
    pub fn step_reverse(&self, f: &mut AcousticFields) {
        let g = self.grid;
        stencil::d_x_backward(g, &f.vx, &mut f.dvxdx);
        stencil::d_z_backward(g, &f.vz, &mut f.dvzdz);
        for i in 0..g.size() {
            f.p[i] += self.dt * self.medium.k[i] * (f.dvxdx[i] + f.dvzdz[i]);
        }

        stencil::d_x_forward(g, &f.p, &mut f.dpdx);
        stencil::d_z_forward(g, &f.p, &mut f.dpdz);
        for i in 0..g.size() {
            f.vx[i] += self.dt * self.medium.rho_inv_vx[i] * f.dpdx[i];
            f.vz[i] += self.dt * self.medium.rho_inv_vz[i] * f.dpdz[i];
        }
    }

    /// Advance a background/scattered pair by one Born-linearized step.
    ///
    /// The background propagates exactly as [`Stepper::step_forward`];
    /// the scattered field sees the same operator plus the perturbation
    /// acting on the background derivatives.
    pub fn step_born(
        &self,
        pert: &BornPerturbation,
        bg: &mut AcousticFields,
        sc: &mut AcousticFields,
    ) {
        let g = self.grid;
        self.step_forward(bg);

        stencil::d_x_forward(g, &sc.p, &mut sc.dpdx);
        stencil::d_z_forward(g, &sc.p, &mut sc.dpdz);
        self.prof_x
            .absorb_x(g, Stagger::Half, &mut sc.dpdx, &mut sc.mem_dpdx);
        self.prof_z
            .absorb_z(g, Stagger::Half, &mut sc.dpdz, &mut sc.mem_dpdz);

        for i in 0..g.size() {
            sc.vx[i] -= self.dt
                * (self.medium.rho_inv_vx[i] * sc.dpdx[i] + pert.d_rho_inv_vx[i] * bg.dpdx[i]);
            sc.vz[i] -= self.dt
                * (self.medium.rho_inv_vz[i] * sc.dpdz[i] + pert.d_rho_inv_vz[i] * bg.dpdz[i]);
        }
        dirichlet_walls(g, &mut sc.vx, &mut sc.vz);

        stencil::d_x_backward(g, &sc.vx, &mut sc.dvxdx);
        stencil::d_z_backward(g, &sc.vz, &mut sc.dvzdz);
        self.prof_x
            .absorb_x(g, Stagger::Integer, &mut sc.dvxdx, &mut sc.mem_dvxdx);
        self.prof_z
            .absorb_z(g, Stagger::Integer, &mut sc.dvzdz, &mut sc.mem_dvzdz);

        for i in 0..g.size() {
            sc.p[i] -= self.dt
                * (self.medium.k[i] * (sc.dvxdx[i] + sc.dvzdz[i])
                    + pert.d_k[i] * (bg.dvxdx[i] + bg.dvzdz[i]));
        }
    }
}

/// Material perturbation driving the Born-scattered field, on the padded
/// grid and already staggered like the side parameters it perturbs.
#[derive(Debug, Clone)]
pub struct BornPerturbation {
    pub d_k: Vec<f64>,
    pub d_rho_inv_vx: Vec<f64>,
    pub d_rho_inv_vz: Vec<f64>,
}

impl BornPerturbation {
    /// Difference of a perturbed padded medium against the background.
    pub fn new(background: &PaddedMedium, perturbed: &PaddedMedium) -> Self {
        let diff = |a: &[f64], b: &[f64]| a.iter().zip(b.iter()).map(|(&p, &q)| p - q).collect();
        Self {
            d_k: diff(&perturbed.k, &background.k),
            d_rho_inv_vx: diff(&perturbed.rho_inv_vx, &background.rho_inv_vx),
            d_rho_inv_vz: diff(&perturbed.rho_inv_vz, &background.rho_inv_vz),
        }
    }
}

/// Zero-velocity walls on the outermost faces.
///
/// Tangential components vanish on the wall planes; the normal component
/// is reflected through the wall with a sign flip, which makes the outer
/// face rigid for anything the absorbing layer has not killed.
pub fn dirichlet_walls(grid: &SimGrid, vx: &mut [f64], vz: &mut [f64]) {
    let (npz, npx) = (grid.npz, grid.npx);
    for iz in 0..npz {
        let row = iz * npx;
        vx[row] = -vx[row + 1];
        vx[row + npx - 1] = -vx[row + npx - 2];
        vz[row] = 0.0;
        vz[row + npx - 1] = 0.0;
    }
    let last = (npz - 1) * npx;
    for ix in 0..npx {
        vz[ix] = -vz[npx + ix];
        vz[last + ix] = -vz[last - npx + ix];
        vx[ix] = 0.0;
        vx[last + ix] = 0.0;
    }
}
