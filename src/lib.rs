//! Staggered-grid finite-difference seismic wave propagation.
//!
//! This crate propagates acoustic or elastic wavefields through a 2D
//! heterogeneous medium, records synthetic traces at arbitrary receiver
//! positions, and optionally computes adjoint-state sensitivity gradients
//! via boundary-replay time reversal. Absorbing boundaries use the
//! convolutional PML formulation.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: configuration, medium, acquisition, and wavelet inputs
//! - `compute`: the numerical core (grid, CPML, steppers, orchestrator)
//!
//! # Example
//!
//! ```rust,no_run
//! use seiswave::{
//!     compute::Engine,
//!     schema::{Acquisition, Medium, Position, Shot, SimulationConfig, Wavelet},
//! };
//!
//! let config = SimulationConfig {
//!     dt: 2e-3,
//!     nt: 500,
//!     npml: 20,
//!     ..Default::default()
//! };
//!
//! let mut engine = Engine::new(config)?;
//! engine.update_medium(Medium::homogeneous(100, 100, 10.0, 10.0, 2000.0, 2000.0))?;
//! engine.update_acquisition(Acquisition::new(vec![Shot::point_source(
//!     Position::new(500.0, 500.0),
//!     vec![Position::new(700.0, 500.0)],
//! )]))?;
//! engine.update_wavelets(&[vec![Wavelet::ricker(10.0, 2e-3, 500, 0.15)]])?;
//!
//! let output = engine.run()?;
//! println!("first trace sample: {}", output.gathers[0].value(0, 0));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{Engine, EngineError, Output, ShotGather};
pub use schema::{Acquisition, ConfigError, Medium, Physics, SimulationConfig, Wavelet};
