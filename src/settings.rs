//! Run settings.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransportError};
use crate::interaction_data::RangePolicy;

/// Knobs for one simulation run. Serializable so a run can be described in
/// a JSON file alongside the volume and library inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Number of particle histories.
    pub histories: u64,
    /// Base RNG seed; per-history streams are strided from it.
    pub seed: u64,
    /// Photons at or below this energy (eV) deposit their remaining energy
    /// locally and stop.
    pub energy_cutoff: f64,
    /// Hard bound on transport steps in one history. Histories hitting it
    /// are terminated and reported as pathological.
    pub max_steps_per_history: u32,
    pub range_policy: RangePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            histories: 10_000,
            seed: 42,
            energy_cutoff: 1e3,
            max_steps_per_history: 1_000_000,
            range_policy: RangePolicy::Clamp,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.histories == 0 {
            return Err(TransportError::Configuration(
                "histories must be positive".to_string(),
            ));
        }
        if self.energy_cutoff < 0.0 || !self.energy_cutoff.is_finite() {
            return Err(TransportError::Configuration(format!(
                "energy cutoff must be finite and non-negative, got {}",
                self.energy_cutoff
            )));
        }
        if self.max_steps_per_history == 0 {
            return Err(TransportError::Configuration(
                "max_steps_per_history must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
