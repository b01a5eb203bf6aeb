//! Per-worker wavefield state.

use super::cpml::SlabPair;
use super::grid::SimGrid;

/// Acoustic wavefield: pressure, particle velocities, derivative scratch,
/// and the CPML memory slabs of each derivative.
///
/// One instance per worker per propagating wavefield; zeroed at the start
/// of every shot.
#[derive(Debug, Clone)]
pub struct AcousticFields {
    pub p: Vec<f64>,
    pub vx: Vec<f64>,
    pub vz: Vec<f64>,
    pub dpdx: Vec<f64>,
    pub dpdz: Vec<f64>,
    pub dvxdx: Vec<f64>,
    pub dvzdz: Vec<f64>,
    pub mem_dpdx: SlabPair,
    pub mem_dpdz: SlabPair,
    pub mem_dvxdx: SlabPair,
    pub mem_dvzdz: SlabPair,
}

impl AcousticFields {
    pub fn new(grid: &SimGrid) -> Self {
        let n = grid.size();
        Self {
            p: vec![0.0; n],
            vx: vec![0.0; n],
            vz: vec![0.0; n],
            dpdx: vec![0.0; n],
            dpdz: vec![0.0; n],
            dvxdx: vec![0.0; n],
            dvzdz: vec![0.0; n],
            mem_dpdx: SlabPair::for_x(grid),
            mem_dpdz: SlabPair::for_z(grid),
            mem_dvxdx: SlabPair::for_x(grid),
            mem_dvzdz: SlabPair::for_z(grid),
        }
    }

    pub fn zero(&mut self) {
        self.p.fill(0.0);
        self.vx.fill(0.0);
        self.vz.fill(0.0);
        self.dpdx.fill(0.0);
        self.dpdz.fill(0.0);
        self.dvxdx.fill(0.0);
        self.dvzdz.fill(0.0);
        self.mem_dpdx.zero();
        self.mem_dpdz.zero();
        self.mem_dvxdx.zero();
        self.mem_dvzdz.zero();
    }
}

/// Elastic wavefield: stress tensor components, velocities, and the full
/// derivative/memory set.
///
/// Staggering: `txx`/`tzz` on the integer grid, `txz` at half steps in
/// both axes, velocities at a half step in their own direction.
#[derive(Debug, Clone)]
pub struct ElasticFields {
    pub txx: Vec<f64>,
    pub tzz: Vec<f64>,
    pub txz: Vec<f64>,
    pub vx: Vec<f64>,
    pub vz: Vec<f64>,
    pub dtxxdx: Vec<f64>,
    pub dtxzdz: Vec<f64>,
    pub dtzzdz: Vec<f64>,
    pub dtxzdx: Vec<f64>,
    pub dvxdx: Vec<f64>,
    pub dvzdz: Vec<f64>,
    pub dvxdz: Vec<f64>,
    pub dvzdx: Vec<f64>,
    pub mem_dtxxdx: SlabPair,
    pub mem_dtxzdz: SlabPair,
    pub mem_dtzzdz: SlabPair,
    pub mem_dtxzdx: SlabPair,
    pub mem_dvxdx: SlabPair,
    pub mem_dvzdz: SlabPair,
    pub mem_dvxdz: SlabPair,
    pub mem_dvzdx: SlabPair,
}

impl ElasticFields {
    pub fn new(grid: &SimGrid) -> Self {
        let n = grid.size();
        Self {
            txx: vec![0.0; n],
            tzz: vec![0.0; n],
            txz: vec![0.0; n],
            vx: vec![0.0; n],
            vz: vec![0.0; n],
            dtxxdx: vec![0.0; n],
            dtxzdz: vec![0.0; n],
            dtzzdz: vec![0.0; n],
            dtxzdx: vec![0.0; n],
            dvxdx: vec![0.0; n],
            dvzdz: vec![0.0; n],
            dvxdz: vec![0.0; n],
            dvzdx: vec![0.0; n],
            mem_dtxxdx: SlabPair::for_x(grid),
            mem_dtxzdz: SlabPair::for_z(grid),
            mem_dtzzdz: SlabPair::for_z(grid),
            mem_dtxzdx: SlabPair::for_x(grid),
            mem_dvxdx: SlabPair::for_x(grid),
            mem_dvzdz: SlabPair::for_z(grid),
            mem_dvxdz: SlabPair::for_z(grid),
            mem_dvzdx: SlabPair::for_x(grid),
        }
    }

    pub fn zero(&mut self) {
        self.txx.fill(0.0);
        self.tzz.fill(0.0);
        self.txz.fill(0.0);
        self.vx.fill(0.0);
        self.vz.fill(0.0);
        self.dtxxdx.fill(0.0);
        self.dtxzdz.fill(0.0);
        self.dtzzdz.fill(0.0);
        self.dtxzdx.fill(0.0);
        self.dvxdx.fill(0.0);
        self.dvzdz.fill(0.0);
        self.dvxdz.fill(0.0);
        self.dvzdx.fill(0.0);
        self.mem_dtxxdx.zero();
        self.mem_dtxzdz.zero();
        self.mem_dtzzdz.zero();
        self.mem_dtxzdx.zero();
        self.mem_dvxdx.zero();
        self.mem_dvzdz.zero();
        self.mem_dvxdz.zero();
        self.mem_dvzdx.zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_clears_everything() {
        let grid = SimGrid::new(10, 10, 3, 1.0, 1.0);
        let mut fields = AcousticFields::new(&grid);
        fields.p[5] = 1.0;
        fields.mem_dpdx.lo[2] = 3.0;
        fields.zero();
        assert!(fields.p.iter().all(|&v| v == 0.0));
        assert!(fields.mem_dpdx.lo.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_allocation_sizes() {
        let grid = SimGrid::new(10, 12, 3, 1.0, 1.0);
        let fields = ElasticFields::new(&grid);
        assert_eq!(fields.txz.len(), grid.size());
        assert_eq!(fields.mem_dtxxdx.lo.len(), grid.npz * grid.npml);
        assert_eq!(fields.mem_dtzzdz.lo.len(), grid.npml * grid.npx);
    }
}
