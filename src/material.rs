//! Material view of the cross-section library.
//!
//! A [`Material`] converts the microscopic per-channel tables of a
//! [`MaterialRecord`](crate::library::MaterialRecord) into macroscopic cross
//! sections (1/cm) on construction, builds a summed total table on the merged
//! channel energy grid, and answers the "what happens next" queries the
//! transport loop needs: interpolated totals and single-draw channel
//! selection.

use serde::{Deserialize, Serialize};

use crate::interpolate::{interpolate_log_log, merge_grids};
use crate::library::MaterialRecord;

const AVOGADRO: f64 = 6.02214076e23; // 1/mol
const BARN_TO_CM2: f64 = 1e-24;

/// Physical interaction channels for photons in this energy regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Photoelectric,
    Coherent,
    Incoherent,
}

impl Channel {
    pub const ALL: [Channel; 3] = [
        Channel::Photoelectric,
        Channel::Coherent,
        Channel::Incoherent,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Photoelectric => "photoelectric",
            Channel::Coherent => "coherent",
            Channel::Incoherent => "incoherent",
        }
    }
}

/// One macroscopic channel table: parallel energy / Σ arrays.
#[derive(Debug, Clone)]
struct MacroTable {
    energy: Vec<f64>,
    sigma: Vec<f64>,
}

impl MacroTable {
    fn from_channel(table: &crate::library::ChannelTable, number_density: f64) -> Self {
        let sigma = table
            .cross_section
            .iter()
            .map(|&barns| barns * BARN_TO_CM2 * number_density)
            .collect();
        Self {
            energy: table.energy.clone(),
            sigma,
        }
    }

    fn interpolate(&self, energy: f64) -> f64 {
        interpolate_log_log(&self.energy, &self.sigma, energy)
    }
}

/// A material ready for transport queries. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub id: u8,
    /// Mass density in g/cm³.
    pub density: f64,
    /// Atom number density in 1/cm³.
    pub number_density: f64,
    photoelectric: MacroTable,
    coherent: MacroTable,
    incoherent: MacroTable,
    total: MacroTable,
}

impl Material {
    /// Builds a material from a validated library record.
    pub fn from_record(name: impl Into<String>, record: &MaterialRecord) -> Self {
        let number_density = AVOGADRO * record.density / record.atomic_weight;
        let photoelectric = MacroTable::from_channel(&record.photoelectric, number_density);
        let coherent = MacroTable::from_channel(&record.coherent, number_density);
        let incoherent = MacroTable::from_channel(&record.incoherent, number_density);

        // Total on the merged channel grid so that every tabulated node of
        // every channel is an exact node of the total.
        let grid = merge_grids(&[&photoelectric.energy, &coherent.energy, &incoherent.energy]);
        let sigma = grid
            .iter()
            .map(|&e| {
                photoelectric.interpolate(e) + coherent.interpolate(e) + incoherent.interpolate(e)
            })
            .collect();
        let total = MacroTable { energy: grid, sigma };

        Self {
            name: name.into(),
            id: record.id,
            density: record.density,
            number_density,
            photoelectric,
            coherent,
            incoherent,
            total,
        }
    }

    /// Macroscopic total cross section Σ_t in 1/cm, clamped interpolation.
    pub fn total_cross_section(&self, energy: f64) -> f64 {
        self.total.interpolate(energy)
    }

    /// Macroscopic channel cross section in 1/cm, clamped interpolation.
    pub fn channel_cross_section(&self, channel: Channel, energy: f64) -> f64 {
        match channel {
            Channel::Photoelectric => self.photoelectric.interpolate(energy),
            Channel::Coherent => self.coherent.interpolate(energy),
            Channel::Incoherent => self.incoherent.interpolate(energy),
        }
    }

    /// Selects an interaction channel from one uniform draw `u ∈ [0, 1)` by
    /// cumulative inversion over channel shares of the total at `energy`.
    ///
    /// Returns `None` when the total vanishes at `energy`, the defined
    /// "no interaction" fallback; reachable zero totals are rejected during
    /// pre-run validation.
    pub fn sample_channel(&self, energy: f64, u: f64) -> Option<Channel> {
        let total = self.total_cross_section(energy);
        if total <= 0.0 {
            return None;
        }
        let p_coherent = self.coherent.interpolate(energy) / total;
        let p_incoherent = self.incoherent.interpolate(energy) / total;

        if u < p_coherent {
            Some(Channel::Coherent)
        } else if u < p_coherent + p_incoherent {
            Some(Channel::Incoherent)
        } else {
            Some(Channel::Photoelectric)
        }
    }

    /// Tabulated energy range of the total table.
    pub fn energy_range(&self) -> (f64, f64) {
        (
            self.total.energy[0],
            self.total.energy[self.total.energy.len() - 1],
        )
    }

    /// Energy grid of the total table (merged over channels).
    pub fn total_energy_grid(&self) -> &[f64] {
        &self.total.energy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::ChannelTable;
    use approx::assert_relative_eq;

    fn record() -> MaterialRecord {
        MaterialRecord {
            id: 2,
            density: 2.699,
            atomic_weight: 26.982,
            photoelectric: ChannelTable::new(vec![1e3, 3e4, 1e5], vec![1e4, 8.0, 0.2]),
            coherent: ChannelTable::new(vec![1e3, 3e4, 1e5], vec![1e2, 2.0, 0.1]),
            incoherent: ChannelTable::new(vec![1e3, 3e4, 1e5], vec![1.0, 10.0, 9.0]),
        }
    }

    #[test]
    fn test_number_density() {
        let material = Material::from_record("aluminum", &record());
        // N_A * rho / A for aluminum, ~6.02e22 atoms/cm3
        assert_relative_eq!(material.number_density, 6.024e22, max_relative = 1e-3);
    }

    #[test]
    fn test_total_is_sum_of_channels_at_nodes() {
        let material = Material::from_record("aluminum", &record());
        for &e in &[1e3, 3e4, 1e5] {
            let sum = Channel::ALL
                .iter()
                .map(|&c| material.channel_cross_section(c, e))
                .sum::<f64>();
            assert_relative_eq!(material.total_cross_section(e), sum, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_total_at_30kev_matches_reference() {
        // barns -> 1/cm: sigma * 1e-24 * n
        let material = Material::from_record("aluminum", &record());
        let n = material.number_density;
        let expected = (8.0 + 2.0 + 10.0) * 1e-24 * n;
        assert_relative_eq!(
            material.total_cross_section(3e4),
            expected,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_sample_channel_partitions_unit_interval() {
        let material = Material::from_record("aluminum", &record());
        let e = 3e4;
        let total = material.total_cross_section(e);
        let p_coh = material.channel_cross_section(Channel::Coherent, e) / total;
        let p_inc = material.channel_cross_section(Channel::Incoherent, e) / total;

        assert_eq!(
            material.sample_channel(e, p_coh * 0.5),
            Some(Channel::Coherent)
        );
        assert_eq!(
            material.sample_channel(e, p_coh + p_inc * 0.5),
            Some(Channel::Incoherent)
        );
        assert_eq!(
            material.sample_channel(e, p_coh + p_inc + 1e-6),
            Some(Channel::Photoelectric)
        );
    }

    #[test]
    fn test_sample_channel_zero_total_is_none() {
        let zero = MaterialRecord {
            id: 0,
            density: 1.0,
            atomic_weight: 1.0,
            photoelectric: ChannelTable::new(vec![1e3, 1e5], vec![0.0, 0.0]),
            coherent: ChannelTable::new(vec![1e3, 1e5], vec![0.0, 0.0]),
            incoherent: ChannelTable::new(vec![1e3, 1e5], vec![0.0, 0.0]),
        };
        let material = Material::from_record("vacuum-like", &zero);
        assert_eq!(material.sample_channel(1e4, 0.3), None);
    }
}
