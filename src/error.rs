//! Error types for photon_mc

use thiserror::Error;

/// Crate-wide error taxonomy.
///
/// Construction-time failures (`DataLoad`, `Configuration`,
/// `SamplingDegeneracy`) surface before any particle history runs. The
/// transport loop itself never returns an error; range handling inside it is
/// governed by [`crate::interaction_data::RangePolicy`].
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("data load error: {0}")]
    DataLoad(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("energy {energy} eV outside tabulated range [{min}, {max}] eV")]
    EnergyOutOfRange { energy: f64, min: f64, max: f64 },

    #[error("sampling degeneracy: {0}")]
    SamplingDegeneracy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
