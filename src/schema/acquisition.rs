//! Shot geometry: source and receiver positions per experiment.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// A world coordinate on the physical grid, in meters.
///
/// The origin is the first physical cell. Positions need not coincide
/// with grid nodes; coupling uses bilinear weights over the enclosing
/// cell corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }
}

/// Field a source injects into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceField {
    /// Inject into pressure (acoustic) or all normal stresses (elastic).
    Pressure,
    /// Like [`SourceField::Pressure`], but the wavelet samples are the
    /// time derivative of the desired source; the engine integrates them
    /// before injection.
    PressureRate,
    /// Inject into the horizontal particle velocity.
    Vx,
    /// Inject into the vertical particle velocity.
    Vz,
}

/// Field recorded at receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordField {
    /// Pressure; in elastic runs `-(txx + tzz) / 2`.
    Pressure,
    /// Horizontal particle velocity.
    Vx,
    /// Vertical particle velocity.
    Vz,
    /// Vertical normal stress `tzz`; pressure sign-flipped in acoustic runs.
    NormalStress,
}

/// One active source within a shot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SourceSpec {
    pub position: Position,
    pub field: SourceField,
}

/// One experiment: simultaneously active sources and their receivers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shot {
    pub sources: Vec<SourceSpec>,
    pub receivers: Vec<Position>,
}

impl Shot {
    /// Single pressure source with a line of receivers.
    pub fn point_source(source: Position, receivers: Vec<Position>) -> Self {
        Self {
            sources: vec![SourceSpec {
                position: source,
                field: SourceField::Pressure,
            }],
            receivers,
        }
    }
}

/// Full survey geometry: independent shots plus the recorded field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acquisition {
    pub shots: Vec<Shot>,
    /// Field sampled at every receiver of every shot.
    #[serde(default = "default_record")]
    pub record: RecordField,
}

fn default_record() -> RecordField {
    RecordField::Pressure
}

impl Acquisition {
    pub fn new(shots: Vec<Shot>) -> Self {
        Self {
            shots,
            record: RecordField::Pressure,
        }
    }

    /// Number of shots.
    #[inline]
    pub fn n_shots(&self) -> usize {
        self.shots.len()
    }

    /// Structural validation; position-in-domain checks happen when the
    /// coupling weights are built against a concrete grid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shots.is_empty() {
            return Err(ConfigError::EmptyAcquisition);
        }
        for (i, shot) in self.shots.iter().enumerate() {
            if shot.sources.is_empty() {
                return Err(ConfigError::EmptyShot {
                    shot: i,
                    what: "sources",
                });
            }
            if shot.receivers.is_empty() {
                return Err(ConfigError::EmptyShot {
                    shot: i,
                    what: "receivers",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_source_shape() {
        let shot = Shot::point_source(
            Position::new(500.0, 500.0),
            vec![Position::new(700.0, 500.0)],
        );
        assert_eq!(shot.sources.len(), 1);
        assert_eq!(shot.sources[0].field, SourceField::Pressure);
    }

    #[test]
    fn test_rejects_empty_acquisition() {
        let acq = Acquisition::new(vec![]);
        assert!(matches!(acq.validate(), Err(ConfigError::EmptyAcquisition)));
    }

    #[test]
    fn test_rejects_shot_without_receivers() {
        let acq = Acquisition::new(vec![Shot {
            sources: vec![SourceSpec {
                position: Position::new(0.0, 0.0),
                field: SourceField::Pressure,
            }],
            receivers: vec![],
        }]);
        assert!(matches!(
            acq.validate(),
            Err(ConfigError::EmptyShot {
                shot: 0,
                what: "receivers"
            })
        ));
    }
}
