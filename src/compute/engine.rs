//! Shot orchestration: configuration updates, the per-shot loop, and
//! output assembly.

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{
    resample_linear, Acquisition, ConfigError, Medium, Physics, RecordField, Shot,
    SimulationConfig, SourceField, Wavelet,
};

use super::acoustic::{BornPerturbation, Stepper};
use super::boundary::BoundaryStore;
use super::coupling::CellWeights;
use super::cpml::CpmlProfile;
use super::elastic::ElasticStepper;
use super::fields::{AcousticFields, ElasticFields};
use super::gradient::{ShotAccumulator, ShotGradient};
use super::grid::SimGrid;
use super::materials::PaddedMedium;

/// Errors surfaced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Engine is not configured: missing {0}")]
    NotConfigured(&'static str),
}

/// Recorded traces for one shot, resampled to the output interval.
///
/// `data` is row-major over `(sample, receiver)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShotGather {
    pub shot: usize,
    pub field: RecordField,
    pub dt: f64,
    pub n_samples: usize,
    pub n_receivers: usize,
    pub data: Vec<f64>,
}

impl ShotGather {
    /// Sample `it` of receiver `ir`.
    #[inline]
    pub fn value(&self, it: usize, ir: usize) -> f64 {
        self.data[it * self.n_receivers + ir]
    }

    /// Copy out one receiver trace.
    pub fn trace(&self, ir: usize) -> Vec<f64> {
        (0..self.n_samples).map(|it| self.value(it, ir)).collect()
    }
}

/// Stacked gradient on the physical grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientOutput {
    pub nz: usize,
    pub nx: usize,
    /// Gradient with respect to inverse bulk modulus.
    pub bulk_inv: Vec<f64>,
    /// Gradient with respect to inverse density.
    pub rho_inv: Vec<f64>,
    /// Stacked source-side illumination, when requested.
    pub illumination: Option<Vec<f64>>,
}

/// Interior pressure captured at a requested step of one shot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotOutput {
    pub shot: usize,
    pub step: usize,
    pub pressure: Vec<f64>,
}

/// Everything a run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub gathers: Vec<ShotGather>,
    pub gradient: Option<GradientOutput>,
    pub misfit: Option<f64>,
    pub snapshots: Vec<SnapshotOutput>,
}

/// The simulation engine.
///
/// Holds the validated configuration plus everything derived from the
/// latest `update_*` calls. Updates are copy-then-commit: a failed update
/// leaves the previous state untouched. `run` is synchronous and shares
/// nothing mutable between shots, so per-shot results are deterministic
/// regardless of worker count.
pub struct Engine {
    config: SimulationConfig,
    medium: Option<Medium>,
    grid: Option<SimGrid>,
    padded: Option<PaddedMedium>,
    prof_z: Option<CpmlProfile>,
    prof_x: Option<CpmlProfile>,
    acquisition: Option<Acquisition>,
    coupling: Option<Vec<ShotCoupling>>,
    /// Per shot, per source: wavelet resampled to `(dt, nt)` with the
    /// source-flag preprocessing already applied.
    wavelets: Option<Vec<Vec<Vec<f64>>>>,
    /// Per shot: observed traces at the internal `(dt, nt)` sampling,
    /// row-major over `(sample, receiver)`.
    observed: Option<Vec<Vec<f64>>>,
    perturbation: Option<Medium>,
}

/// Coupling weights of one shot.
#[derive(Debug, Clone)]
struct ShotCoupling {
    sources: Vec<CellWeights>,
    receivers: Vec<CellWeights>,
}

impl Engine {
    /// Create an engine from a validated configuration.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            medium: None,
            grid: None,
            padded: None,
            prof_z: None,
            prof_x: None,
            acquisition: None,
            coupling: None,
            wavelets: None,
            observed: None,
            perturbation: None,
        })
    }

    /// Current configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Swap in a new medium; re-derives the padded arrays, the absorbing
    /// profiles, and (when an acquisition is set) the coupling weights.
    pub fn update_medium(&mut self, medium: Medium) -> Result<(), EngineError> {
        medium.validate()?;
        if self.config.physics == Physics::Elastic && !medium.is_elastic() {
            return Err(ConfigError::ElasticParamsIncomplete.into());
        }
        let grid = SimGrid::new(
            medium.nz(),
            medium.nx(),
            self.config.npml,
            medium.dz(),
            medium.dx(),
        );
        let padded = PaddedMedium::new(&medium, &grid);
        let prof_z = CpmlProfile::new(
            self.config.npml,
            grid.dz,
            self.config.dt,
            padded.vp_max,
            &self.config.cpml,
        );
        let prof_x = CpmlProfile::new(
            self.config.npml,
            grid.dx,
            self.config.dt,
            padded.vp_max,
            &self.config.cpml,
        );
        let coupling = match &self.acquisition {
            Some(acq) => Some(build_coupling(&grid, acq)?),
            None => None,
        };
        if let Some(pert) = &self.perturbation {
            check_perturbation(&medium, pert)?;
        }

        self.medium = Some(medium);
        self.grid = Some(grid);
        self.padded = Some(padded);
        self.prof_z = Some(prof_z);
        self.prof_x = Some(prof_x);
        self.coupling = coupling;
        Ok(())
    }

    /// Swap in a new acquisition; recomputes coupling weights against the
    /// current grid when one exists.
    pub fn update_acquisition(&mut self, acquisition: Acquisition) -> Result<(), EngineError> {
        acquisition.validate()?;
        let coupling = match &self.grid {
            Some(grid) => Some(build_coupling(grid, &acquisition)?),
            None => None,
        };
        self.acquisition = Some(acquisition);
        self.coupling = coupling;
        Ok(())
    }

    /// Copy source wavelets in: one per source per shot, resampled to the
    /// internal step, with rate-flagged wavelets integrated.
    pub fn update_wavelets(&mut self, wavelets: &[Vec<Wavelet>]) -> Result<(), EngineError> {
        let acquisition = self
            .acquisition
            .as_ref()
            .ok_or(EngineError::NotConfigured("acquisition"))?;
        if wavelets.len() != acquisition.n_shots() {
            return Err(ConfigError::WaveletShotMismatch {
                expected: acquisition.n_shots(),
                got: wavelets.len(),
            }
            .into());
        }
        let (dt, nt) = (self.config.dt, self.config.nt);
        let mut table = Vec::with_capacity(wavelets.len());
        for (s, shot) in acquisition.shots.iter().enumerate() {
            if wavelets[s].len() != shot.sources.len() {
                return Err(ConfigError::WaveletSourceMismatch {
                    shot: s,
                    expected: shot.sources.len(),
                    got: wavelets[s].len(),
                }
                .into());
            }
            let mut per_source = Vec::with_capacity(shot.sources.len());
            for (i, wavelet) in wavelets[s].iter().enumerate() {
                wavelet.validate()?;
                let available = (wavelet.duration() / dt + 1e-9).floor() as usize + 1;
                if available < nt {
                    return Err(ConfigError::WaveletTooShort {
                        shot: s,
                        source_index: i,
                        needed: nt,
                        got: available,
                    }
                    .into());
                }
                let prepared = match shot.sources[i].field {
                    SourceField::PressureRate => Wavelet::new(wavelet.dt, wavelet.integrated()),
                    _ => wavelet.clone(),
                };
                per_source.push(prepared.resample(dt, nt));
            }
            table.push(per_source);
        }
        self.wavelets = Some(table);
        Ok(())
    }

    /// Supply observed data for misfit and gradient computation, sampled
    /// at the internal step: `nt x n_receivers` per shot.
    pub fn update_observed(&mut self, observed: Vec<Vec<f64>>) -> Result<(), EngineError> {
        let acquisition = self
            .acquisition
            .as_ref()
            .ok_or(EngineError::NotConfigured("acquisition"))?;
        if observed.len() != acquisition.n_shots() {
            return Err(ConfigError::ObservedShotMismatch {
                expected: acquisition.n_shots(),
                got: observed.len(),
            }
            .into());
        }
        for (s, shot) in acquisition.shots.iter().enumerate() {
            let expected = self.config.nt * shot.receivers.len();
            if observed[s].len() != expected {
                return Err(ConfigError::ObservedShapeMismatch {
                    shot: s,
                    expected,
                    got: observed[s].len(),
                }
                .into());
            }
        }
        self.observed = Some(observed);
        Ok(())
    }

    /// Supply the perturbation medium for Born runs; same grid as the
    /// background.
    pub fn update_perturbation(&mut self, perturbation: Medium) -> Result<(), EngineError> {
        let medium = self
            .medium
            .as_ref()
            .ok_or(EngineError::NotConfigured("medium"))?;
        perturbation.validate()?;
        check_perturbation(medium, &perturbation)?;
        self.perturbation = Some(perturbation);
        Ok(())
    }

    /// Execute all shots and assemble gathers, optional gradient and
    /// illumination, misfit, and snapshots.
    ///
    /// Shots are partitioned over workers; results land at deterministic
    /// indices and the gradient is stacked in shot order, so output is
    /// identical for any worker count.
    pub fn run(&mut self) -> Result<Output, EngineError> {
        if self.coupling.is_none() {
            let grid = self.grid.as_ref().ok_or(EngineError::NotConfigured("medium"))?;
            let acquisition = self
                .acquisition
                .as_ref()
                .ok_or(EngineError::NotConfigured("acquisition"))?;
            self.coupling = Some(build_coupling(grid, acquisition)?);
        }

        let grid = self.grid.as_ref().ok_or(EngineError::NotConfigured("medium"))?;
        let padded = self.padded.as_ref().ok_or(EngineError::NotConfigured("medium"))?;
        let prof_z = self.prof_z.as_ref().ok_or(EngineError::NotConfigured("medium"))?;
        let prof_x = self.prof_x.as_ref().ok_or(EngineError::NotConfigured("medium"))?;
        let acquisition = self
            .acquisition
            .as_ref()
            .ok_or(EngineError::NotConfigured("acquisition"))?;
        let coupling = self.coupling.as_ref().expect("built above");
        let wavelets = self
            .wavelets
            .as_ref()
            .ok_or(EngineError::NotConfigured("wavelets"))?;

        // The wavelet table may predate an acquisition swap.
        if wavelets.len() != acquisition.n_shots() {
            return Err(ConfigError::WaveletShotMismatch {
                expected: acquisition.n_shots(),
                got: wavelets.len(),
            }
            .into());
        }
        for (s, shot) in acquisition.shots.iter().enumerate() {
            if wavelets[s].len() != shot.sources.len() {
                return Err(ConfigError::WaveletSourceMismatch {
                    shot: s,
                    expected: shot.sources.len(),
                    got: wavelets[s].len(),
                }
                .into());
            }
        }

        if self.config.gradient {
            if self.config.physics != Physics::Acoustic {
                return Err(ConfigError::GradientRequiresAcoustic.into());
            }
            if self.observed.is_none() {
                return Err(ConfigError::GradientRequiresObserved.into());
            }
        }
        let born = match self.config.physics {
            Physics::AcousticBorn => {
                let pert = self
                    .perturbation
                    .as_ref()
                    .ok_or(ConfigError::BornRequiresPerturbation)?;
                Some(BornPerturbation::new(padded, &PaddedMedium::new(pert, grid)))
            }
            _ => None,
        };

        let ctx = RunContext {
            config: &self.config,
            grid,
            padded,
            prof_z,
            prof_x,
            shots: &acquisition.shots,
            record: acquisition.record,
            coupling,
            wavelets,
            observed: self.observed.as_deref(),
            born: born.as_ref(),
        };

        let n_shots = acquisition.n_shots();
        info!(
            "running {} shot(s), physics {:?}, {} steps",
            n_shots, self.config.physics, self.config.nt
        );
        let results: Vec<ShotResult> = (0..n_shots)
            .into_par_iter()
            .map_init(
                || WorkerFields::for_physics(ctx.config.physics, ctx.grid),
                |fields, s| run_shot(&ctx, fields, s),
            )
            .collect();

        Ok(assemble_output(&ctx, results))
    }
}

fn check_perturbation(medium: &Medium, perturbation: &Medium) -> Result<(), ConfigError> {
    if perturbation.nz() != medium.nz()
        || perturbation.nx() != medium.nx()
        || perturbation.dz() != medium.dz()
        || perturbation.dx() != medium.dx()
    {
        return Err(ConfigError::PerturbationShapeMismatch);
    }
    Ok(())
}

fn build_coupling(grid: &SimGrid, acquisition: &Acquisition) -> Result<Vec<ShotCoupling>, ConfigError> {
    acquisition
        .shots
        .iter()
        .enumerate()
        .map(|(s, shot)| {
            let sources = shot
                .sources
                .iter()
                .enumerate()
                .map(|(i, src)| CellWeights::locate(grid, src.position, s, "source", i))
                .collect::<Result<Vec<_>, _>>()?;
            let receivers = shot
                .receivers
                .iter()
                .enumerate()
                .map(|(i, &pos)| CellWeights::locate(grid, pos, s, "receiver", i))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ShotCoupling { sources, receivers })
        })
        .collect()
}

/// Read-only view shared by all shot workers.
struct RunContext<'a> {
    config: &'a SimulationConfig,
    grid: &'a SimGrid,
    padded: &'a PaddedMedium,
    prof_z: &'a CpmlProfile,
    prof_x: &'a CpmlProfile,
    shots: &'a [Shot],
    record: RecordField,
    coupling: &'a [ShotCoupling],
    wavelets: &'a [Vec<Vec<f64>>],
    observed: Option<&'a [Vec<f64>]>,
    born: Option<&'a BornPerturbation>,
}

/// Private per-shot results before assembly.
struct ShotResult {
    traces: Vec<f64>,
    snapshots: Vec<(usize, Vec<f64>)>,
    gradient: Option<ShotGradient>,
    misfit: f64,
}

/// Reusable wavefield state owned by one worker and shared by none.
///
/// Each worker allocates once and zeroes at the start of every shot it
/// is handed, so the run stays deterministic under any shot-to-worker
/// assignment.
enum WorkerFields {
    Acoustic(AcousticFields),
    Born(AcousticFields, AcousticFields),
    Elastic(ElasticFields),
}

impl WorkerFields {
    fn for_physics(physics: Physics, grid: &SimGrid) -> Self {
        match physics {
            Physics::Acoustic => Self::Acoustic(AcousticFields::new(grid)),
            Physics::AcousticBorn => {
                Self::Born(AcousticFields::new(grid), AcousticFields::new(grid))
            }
            Physics::Elastic => Self::Elastic(ElasticFields::new(grid)),
        }
    }
}

fn run_shot(ctx: &RunContext, fields: &mut WorkerFields, s: usize) -> ShotResult {
    debug!("shot {}: starting", s);
    match fields {
        WorkerFields::Acoustic(f) => run_shot_acoustic(ctx, s, f),
        WorkerFields::Born(bg, sc) => run_shot_born(ctx, s, bg, sc),
        WorkerFields::Elastic(f) => run_shot_elastic(ctx, s, f),
    }
}

/// Add every source of shot `s` at step `it` into an acoustic field.
///
/// Pressure sources scale by `dt K / cell area`, velocity sources by
/// `dt / (rho cell area)`; `sign = -1` removes a previous injection
/// during time reversal.
fn inject_acoustic(ctx: &RunContext, s: usize, f: &mut AcousticFields, it: usize, sign: f64) {
    let area = ctx.grid.cell_area();
    let dt = ctx.config.dt;
    for (i, src) in ctx.shots[s].sources.iter().enumerate() {
        let amp = sign * ctx.wavelets[s][i][it] * dt;
        let cw = &ctx.coupling[s].sources[i];
        match src.field {
            SourceField::Pressure | SourceField::PressureRate => {
                cw.spray(&mut f.p, &ctx.padded.k, amp, area);
            }
            SourceField::Vx => cw.spray(&mut f.vx, &ctx.padded.rho_inv_vx, amp, area),
            SourceField::Vz => cw.spray(&mut f.vz, &ctx.padded.rho_inv_vz, amp, area),
        }
    }
}

fn sample_acoustic(record: RecordField, f: &AcousticFields, cw: &CellWeights) -> f64 {
    match record {
        RecordField::Pressure => cw.interp(&f.p),
        RecordField::Vx => cw.interp(&f.vx),
        RecordField::Vz => cw.interp(&f.vz),
        RecordField::NormalStress => -cw.interp(&f.p),
    }
}

fn run_shot_acoustic(ctx: &RunContext, s: usize, f: &mut AcousticFields) -> ShotResult {
    let grid = ctx.grid;
    let (nt, dt) = (ctx.config.nt, ctx.config.dt);
    let cpl = &ctx.coupling[s];
    let nr = cpl.receivers.len();
    let stepper = Stepper {
        grid,
        medium: ctx.padded,
        prof_z: ctx.prof_z,
        prof_x: ctx.prof_x,
        dt,
    };

    f.zero();
    let mut store = ctx.config.gradient.then(|| BoundaryStore::new(grid, nt));
    let mut traces = vec![0.0; nt * nr];
    let mut snapshots = Vec::new();

    for it in 0..nt {
        stepper.step_forward(f);
        inject_acoustic(ctx, s, f, it, 1.0);
        if let Some(store) = store.as_mut() {
            store.save_shell(it, f);
        }
        for (ir, rc) in cpl.receivers.iter().enumerate() {
            traces[it * nr + ir] = sample_acoustic(ctx.record, f, rc);
        }
        if ctx.config.snapshot_steps.contains(&it) {
            snapshots.push((it, grid.extract_interior(&f.p)));
        }
    }

    let (gradient, misfit) = match store {
        Some(mut store) => {
            store.save_terminal(f);
            let (g, m) = reverse_pass_acoustic(ctx, s, &traces, &mut store, f);
            (Some(g), m)
        }
        None => (None, 0.0),
    };

    ShotResult {
        traces,
        snapshots,
        gradient,
        misfit,
    }
}

/// Reverse pass: reconstruct the source wavefield backwards from the
/// boundary record while propagating the adjoint wavefield driven by the
/// data residual, correlating the two into the gradient accumulators.
///
/// `fwd` is the worker's forward field, re-initialized here from the
/// terminal snapshot and stepped backwards in place.
fn reverse_pass_acoustic(
    ctx: &RunContext,
    s: usize,
    synthetic: &[f64],
    store: &mut BoundaryStore,
    fwd: &mut AcousticFields,
) -> (ShotGradient, f64) {
    let grid = ctx.grid;
    let (nt, dt) = (ctx.config.nt, ctx.config.dt);
    let cpl = &ctx.coupling[s];
    let nr = cpl.receivers.len();
    let area = grid.cell_area();
    let observed = &ctx.observed.expect("validated before stepping")[s];

    let mut residual = vec![0.0; nt * nr];
    let mut misfit = 0.0;
    for (i, r) in residual.iter_mut().enumerate() {
        *r = synthetic[i] - observed[i];
        misfit += 0.5 * *r * *r * dt;
    }

    let stepper = Stepper {
        grid,
        medium: ctx.padded,
        prof_z: ctx.prof_z,
        prof_x: ctx.prof_x,
        dt,
    };
    store.restore_terminal(fwd);
    let mut adj = AcousticFields::new(grid);
    let mut acc = ShotAccumulator::new(grid);

    for it in (0..nt).rev() {
        // Adjoint field: forward dynamics in reversed time, driven by the
        // time-reversed residual at the receiver positions.
        stepper.step_forward(&mut adj);
        for (ir, rc) in cpl.receivers.iter().enumerate() {
            let amp = residual[it * nr + ir] * dt;
            match ctx.record {
                RecordField::Pressure => rc.spray(&mut adj.p, &ctx.padded.k, amp, area),
                RecordField::NormalStress => rc.spray(&mut adj.p, &ctx.padded.k, -amp, area),
                RecordField::Vx => rc.spray(&mut adj.vx, &ctx.padded.rho_inv_vx, amp, area),
                RecordField::Vz => rc.spray(&mut adj.vz, &ctx.padded.rho_inv_vz, amp, area),
            }
        }

        acc.record_pressure(dt, &fwd.p, &adj.p);
        if ctx.config.illumination {
            acc.record_illumination(&fwd.p);
        }

        // Source field: force the recorded shell, remove this step's
        // injection, and undo the step.
        store.force_shell(it, fwd);
        inject_acoustic(ctx, s, fwd, it, -1.0);
        stepper.step_reverse(fwd);
        acc.record_density(grid, dt, &fwd.dpdx, &fwd.dpdz, &adj.dpdx, &adj.dpdz);
    }

    (acc.finish(grid), misfit)
}

fn run_shot_born(
    ctx: &RunContext,
    s: usize,
    bg: &mut AcousticFields,
    sc: &mut AcousticFields,
) -> ShotResult {
    let grid = ctx.grid;
    let (nt, dt) = (ctx.config.nt, ctx.config.dt);
    let cpl = &ctx.coupling[s];
    let nr = cpl.receivers.len();
    let pert = ctx.born.expect("validated before stepping");
    let stepper = Stepper {
        grid,
        medium: ctx.padded,
        prof_z: ctx.prof_z,
        prof_x: ctx.prof_x,
        dt,
    };

    bg.zero();
    sc.zero();
    let mut traces = vec![0.0; nt * nr];
    let mut snapshots = Vec::new();

    for it in 0..nt {
        stepper.step_born(pert, bg, sc);
        inject_acoustic(ctx, s, bg, it, 1.0);
        for (ir, rc) in cpl.receivers.iter().enumerate() {
            traces[it * nr + ir] = sample_acoustic(ctx.record, sc, rc);
        }
        if ctx.config.snapshot_steps.contains(&it) {
            snapshots.push((it, grid.extract_interior(&sc.p)));
        }
    }

    ShotResult {
        traces,
        snapshots,
        gradient: None,
        misfit: 0.0,
    }
}

fn sample_elastic(record: RecordField, f: &ElasticFields, cw: &CellWeights) -> f64 {
    match record {
        RecordField::Pressure => -0.5 * (cw.interp(&f.txx) + cw.interp(&f.tzz)),
        RecordField::Vx => cw.interp(&f.vx),
        RecordField::Vz => cw.interp(&f.vz),
        RecordField::NormalStress => cw.interp(&f.tzz),
    }
}

fn run_shot_elastic(ctx: &RunContext, s: usize, f: &mut ElasticFields) -> ShotResult {
    let grid = ctx.grid;
    let (nt, dt) = (ctx.config.nt, ctx.config.dt);
    let cpl = &ctx.coupling[s];
    let nr = cpl.receivers.len();
    let area = grid.cell_area();
    let stepper = ElasticStepper {
        grid,
        medium: ctx.padded,
        prof_z: ctx.prof_z,
        prof_x: ctx.prof_x,
        dt,
    };

    f.zero();
    let mut traces = vec![0.0; nt * nr];
    let mut snapshots = Vec::new();

    for it in 0..nt {
        stepper.step_forward(f);
        for (i, src) in ctx.shots[s].sources.iter().enumerate() {
            let amp = ctx.wavelets[s][i][it] * dt;
            let cw = &cpl.sources[i];
            match src.field {
                // An explosive source loads every normal stress equally.
                SourceField::Pressure | SourceField::PressureRate => {
                    cw.spray(&mut f.txx, &ctx.padded.k, amp, area);
                    cw.spray(&mut f.tzz, &ctx.padded.k, amp, area);
                }
                SourceField::Vx => cw.spray(&mut f.vx, &ctx.padded.rho_inv_vx, amp, area),
                SourceField::Vz => cw.spray(&mut f.vz, &ctx.padded.rho_inv_vz, amp, area),
            }
        }
        for (ir, rc) in cpl.receivers.iter().enumerate() {
            traces[it * nr + ir] = sample_elastic(ctx.record, f, rc);
        }
        if ctx.config.snapshot_steps.contains(&it) {
            let mut pressure = grid.extract_interior(&f.txx);
            let tzz = grid.extract_interior(&f.tzz);
            for (p, t) in pressure.iter_mut().zip(tzz.iter()) {
                *p = -0.5 * (*p + t);
            }
            snapshots.push((it, pressure));
        }
    }

    ShotResult {
        traces,
        snapshots,
        gradient: None,
        misfit: 0.0,
    }
}

fn assemble_output(ctx: &RunContext, results: Vec<ShotResult>) -> Output {
    let (nt, dt) = (ctx.config.nt, ctx.config.dt);
    let dt_out = ctx.config.dt_out();
    let n_out = ((nt - 1) as f64 * dt / dt_out + 1e-9).floor() as usize + 1;
    let gradient_mode = ctx.config.gradient;

    let mut gathers = Vec::with_capacity(results.len());
    let mut snapshots = Vec::new();
    let mut misfit = 0.0;
    let mut stacked: Option<GradientOutput> = None;

    for (s, result) in results.into_iter().enumerate() {
        let nr = ctx.coupling[s].receivers.len();
        let mut data = vec![0.0; n_out * nr];
        for ir in 0..nr {
            let column: Vec<f64> = (0..nt).map(|it| result.traces[it * nr + ir]).collect();
            let resampled = resample_linear(&column, dt, dt_out, n_out);
            for (jt, &v) in resampled.iter().enumerate() {
                data[jt * nr + ir] = v;
            }
        }
        gathers.push(ShotGather {
            shot: s,
            field: ctx.record,
            dt: dt_out,
            n_samples: n_out,
            n_receivers: nr,
            data,
        });

        for (step, pressure) in result.snapshots {
            snapshots.push(SnapshotOutput {
                shot: s,
                step,
                pressure,
            });
        }

        misfit += result.misfit;
        if let Some(g) = result.gradient {
            // Plain sum in shot order keeps stacking reproducible.
            match stacked.as_mut() {
                None => {
                    stacked = Some(GradientOutput {
                        nz: ctx.grid.nz(),
                        nx: ctx.grid.nx(),
                        bulk_inv: g.g_k_inv,
                        rho_inv: g.g_rho_inv,
                        illumination: ctx.config.illumination.then_some(g.illum),
                    });
                }
                Some(total) => {
                    for (acc, v) in total.bulk_inv.iter_mut().zip(g.g_k_inv.iter()) {
                        *acc += v;
                    }
                    for (acc, v) in total.rho_inv.iter_mut().zip(g.g_rho_inv.iter()) {
                        *acc += v;
                    }
                    if let Some(illum) = total.illumination.as_mut() {
                        for (acc, v) in illum.iter_mut().zip(g.illum.iter()) {
                            *acc += v;
                        }
                    }
                }
            }
        }
    }

    if ctx.config.illumination_normalize {
        if let Some(total) = stacked.as_mut() {
            if let Some(illum) = &total.illumination {
                let floor = illum.iter().cloned().fold(0.0f64, f64::max) * 1e-9 + f64::MIN_POSITIVE;
                for (g, &w) in total.bulk_inv.iter_mut().zip(illum.iter()) {
                    *g /= w + floor;
                }
                for (g, &w) in total.rho_inv.iter_mut().zip(illum.iter()) {
                    *g /= w + floor;
                }
            }
        }
    }

    Output {
        gathers,
        gradient: stacked,
        misfit: gradient_mode.then_some(misfit),
        snapshots,
    }
}
