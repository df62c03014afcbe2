//! Composed interaction data for a set of materials.
//!
//! [`InteractionData`] owns one [`Material`] per name requested at
//! construction and a majorant table: the maximum total cross section over
//! all loaded materials, tabulated on the merged energy grid. The majorant
//! drives delta tracking — free paths are sampled against it regardless of
//! which material the photon actually lands in.
//!
//! The majorant grid contains every node of every material's total table, so
//! between adjacent majorant nodes each material's log-log interpolant is
//! linear in log space and the interpolated majorant dominates it exactly.

use std::collections::HashMap;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransportError};
use crate::interpolate::{check_in_range, interpolate_log_log, map_scalar, merge_grids};
use crate::library::CrossSectionLibrary;
use crate::material::Material;

/// Out-of-range handling for interpolation queries (spec-level policy; the
/// per-history hot loop always uses the clamped form).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    /// Clamp to the nearest tabulated boundary value. Default; keeps long
    /// runs robust.
    #[default]
    Clamp,
    /// Fail fast on queries outside the tabulated grid. Pre-run validation
    /// rejects sources whose spectrum can leave the grid.
    Strict,
}

/// Read-only interaction data shared by all particle histories.
#[derive(Debug, Clone)]
pub struct InteractionData {
    materials: HashMap<u8, Material>,
    max_energy_grid: Vec<f64>,
    max_sigma: Vec<f64>,
    policy: RangePolicy,
}

impl InteractionData {
    /// Builds interaction data for `material_names` out of `library`.
    ///
    /// Fails with a data-load error if any name is absent from the library,
    /// and with a configuration error if two materials share an id.
    pub fn from_library(
        material_names: &[&str],
        library: &CrossSectionLibrary,
        policy: RangePolicy,
    ) -> Result<Self> {
        if material_names.is_empty() {
            return Err(TransportError::Configuration(
                "no materials requested".to_string(),
            ));
        }
        let mut materials: HashMap<u8, Material> = HashMap::new();
        for &name in material_names {
            let record = library.get(name)?;
            let material = Material::from_record(name, record);
            if let Some(existing) = materials.get(&material.id) {
                return Err(TransportError::Configuration(format!(
                    "materials '{}' and '{}' share id {}",
                    existing.name, material.name, material.id
                )));
            }
            materials.insert(material.id, material);
        }

        let (max_energy_grid, max_sigma) = Self::build_majorant(&materials);
        info!(
            "interaction data loaded: {} materials, majorant grid {} nodes over [{:.3e}, {:.3e}] eV",
            materials.len(),
            max_energy_grid.len(),
            max_energy_grid[0],
            max_energy_grid[max_energy_grid.len() - 1],
        );

        Ok(Self {
            materials,
            max_energy_grid,
            max_sigma,
            policy,
        })
    }

    fn build_majorant(materials: &HashMap<u8, Material>) -> (Vec<f64>, Vec<f64>) {
        let grids: Vec<&[f64]> = materials.values().map(|m| m.total_energy_grid()).collect();
        let merged = merge_grids(&grids);
        let max_sigma = merged
            .iter()
            .map(|&e| {
                materials
                    .values()
                    .map(|m| m.total_cross_section(e))
                    .fold(0.0_f64, f64::max)
            })
            .collect();
        (merged, max_sigma)
    }

    pub fn material(&self, id: u8) -> Option<&Material> {
        self.materials.get(&id)
    }

    pub fn material_by_name(&self, name: &str) -> Option<&Material> {
        self.materials.values().find(|m| m.name == name)
    }

    pub fn material_ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.materials.keys().copied()
    }

    pub fn range_policy(&self) -> RangePolicy {
        self.policy
    }

    /// Macroscopic total cross section for `material_id` at `energy`,
    /// honoring the range policy.
    pub fn total_cross_section(&self, material_id: u8, energy: f64) -> Result<f64> {
        let material = self.materials.get(&material_id).ok_or_else(|| {
            TransportError::Configuration(format!("unknown material id {material_id}"))
        })?;
        if self.policy == RangePolicy::Strict {
            check_in_range(material.total_energy_grid(), energy)?;
        }
        Ok(material.total_cross_section(energy))
    }

    /// Majorant Σ_max at `energy`, clamped interpolation. Hot-loop entry
    /// point; dominates every material's total on the tabulated range.
    pub fn max_total_cross_section(&self, energy: f64) -> f64 {
        interpolate_log_log(&self.max_energy_grid, &self.max_sigma, energy)
    }

    /// Element-wise convenience form of [`Self::max_total_cross_section`]:
    /// same-shape output, identical numerical semantics per element.
    pub fn max_total_cross_sections(&self, energies: &[f64]) -> Vec<f64> {
        map_scalar(energies, |e| self.max_total_cross_section(e))
    }

    /// Majorant query honoring the range policy, for boundary/API use.
    pub fn try_max_total_cross_section(&self, energy: f64) -> Result<f64> {
        if self.policy == RangePolicy::Strict {
            check_in_range(&self.max_energy_grid, energy)?;
        }
        Ok(self.max_total_cross_section(energy))
    }

    /// Pre-run validation over the reachable energy window
    /// `[min_energy, max_energy]`:
    ///
    /// * every requested material id in `used_ids` must be loaded;
    /// * the majorant must be strictly positive at every grid node inside
    ///   the window (a zero majorant makes free-path sampling degenerate);
    /// * under the strict policy the window must lie inside the tabulated
    ///   grid.
    pub fn validate(
        &self,
        min_energy: f64,
        max_energy: f64,
        used_ids: impl IntoIterator<Item = u8>,
    ) -> Result<()> {
        self.validate_for(min_energy, max_energy, used_ids, self.policy)
    }

    /// Like [`Self::validate`], with the run's range policy supplied by the
    /// caller. The window check is strict when either this data's own policy
    /// or `run_policy` is strict.
    pub fn validate_for(
        &self,
        min_energy: f64,
        max_energy: f64,
        used_ids: impl IntoIterator<Item = u8>,
        run_policy: RangePolicy,
    ) -> Result<()> {
        for id in used_ids {
            if !self.materials.contains_key(&id) {
                return Err(TransportError::Configuration(format!(
                    "voxel grid references material id {id} which is not loaded"
                )));
            }
        }
        if self.policy == RangePolicy::Strict || run_policy == RangePolicy::Strict {
            check_in_range(&self.max_energy_grid, min_energy)?;
            check_in_range(&self.max_energy_grid, max_energy)?;
        }
        for (&e, &sigma) in self.max_energy_grid.iter().zip(self.max_sigma.iter()) {
            if e >= min_energy && e <= max_energy && sigma <= 0.0 {
                return Err(TransportError::SamplingDegeneracy(format!(
                    "majorant cross section is zero at {e} eV inside the reachable window"
                )));
            }
        }
        // endpoints of the window are reachable even between grid nodes
        for e in [min_energy, max_energy] {
            if self.max_total_cross_section(e) <= 0.0 {
                return Err(TransportError::SamplingDegeneracy(format!(
                    "majorant cross section is zero at reachable energy {e} eV"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{ChannelTable, MaterialRecord};

    fn library() -> CrossSectionLibrary {
        let mut library = CrossSectionLibrary::new();
        library
            .insert(
                "aluminum",
                MaterialRecord {
                    id: 1,
                    density: 2.699,
                    atomic_weight: 26.982,
                    photoelectric: ChannelTable::new(vec![1e3, 3e4, 1e5], vec![1e4, 8.0, 0.2]),
                    coherent: ChannelTable::new(vec![1e3, 3e4, 1e5], vec![1e2, 2.0, 0.1]),
                    incoherent: ChannelTable::new(vec![1e3, 3e4, 1e5], vec![1.0, 10.0, 9.0]),
                },
            )
            .unwrap();
        library
            .insert(
                "water",
                MaterialRecord {
                    id: 2,
                    density: 1.0,
                    atomic_weight: 18.015,
                    photoelectric: ChannelTable::new(vec![2e3, 2e4, 2e5], vec![3e3, 2.0, 0.05]),
                    coherent: ChannelTable::new(vec![2e3, 2e4, 2e5], vec![50.0, 1.5, 0.08]),
                    incoherent: ChannelTable::new(vec![2e3, 2e4, 2e5], vec![2.0, 8.0, 6.0]),
                },
            )
            .unwrap();
        library
    }

    #[test]
    fn test_unknown_material_fails() {
        let err = InteractionData::from_library(&["gold"], &library(), RangePolicy::Clamp);
        assert!(err.is_err());
    }

    #[test]
    fn test_majorant_dominates_all_materials() {
        let data =
            InteractionData::from_library(&["aluminum", "water"], &library(), RangePolicy::Clamp)
                .unwrap();
        let mut e = 2e3;
        while e < 1e5 {
            let max = data.max_total_cross_section(e);
            for id in [1u8, 2u8] {
                let total = data.total_cross_section(id, e).unwrap();
                assert!(
                    max >= total * (1.0 - 1e-12),
                    "majorant {max} < total {total} for material {id} at {e} eV"
                );
            }
            e *= 1.07;
        }
    }

    #[test]
    fn test_array_form_matches_scalar_form() {
        let data =
            InteractionData::from_library(&["aluminum", "water"], &library(), RangePolicy::Clamp)
                .unwrap();
        let energies: Vec<f64> = (1..40).map(|i| 1.5e3 * 1.12f64.powi(i)).collect();
        let mapped = data.max_total_cross_sections(&energies);
        assert_eq!(mapped.len(), energies.len());
        for (i, &e) in energies.iter().enumerate() {
            assert_eq!(mapped[i], data.max_total_cross_section(e));
        }
    }

    #[test]
    fn test_strict_policy_rejects_out_of_range() {
        let data =
            InteractionData::from_library(&["aluminum"], &library(), RangePolicy::Strict).unwrap();
        assert!(data.total_cross_section(1, 3e4).is_ok());
        assert!(data.total_cross_section(1, 1.0).is_err());
        assert!(data.try_max_total_cross_section(1e9).is_err());
    }

    #[test]
    fn test_validate_rejects_missing_grid_material() {
        let data =
            InteractionData::from_library(&["aluminum"], &library(), RangePolicy::Clamp).unwrap();
        assert!(data.validate(1e4, 5e4, [1u8]).is_ok());
        assert!(data.validate(1e4, 5e4, [9u8]).is_err());
    }

    #[test]
    fn test_validate_for_honors_run_policy() {
        // data built with Clamp, strictness requested per run
        let data =
            InteractionData::from_library(&["aluminum"], &library(), RangePolicy::Clamp).unwrap();
        assert!(data
            .validate_for(1e4, 1e6, [1u8], RangePolicy::Clamp)
            .is_ok());
        assert!(data
            .validate_for(1e4, 1e6, [1u8], RangePolicy::Strict)
            .is_err());
        assert!(data
            .validate_for(1e4, 5e4, [1u8], RangePolicy::Strict)
            .is_ok());
    }

    #[test]
    fn test_validate_strict_window() {
        let data =
            InteractionData::from_library(&["aluminum"], &library(), RangePolicy::Strict).unwrap();
        assert!(data.validate(1e4, 5e4, [1u8]).is_ok());
        assert!(data.validate(1.0, 5e4, [1u8]).is_err());
    }
}
