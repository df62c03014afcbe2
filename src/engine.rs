//! Delta-tracking transport engine.
//!
//! Free paths are sampled against the global majorant cross section, so the
//! flight never has to stop at voxel boundaries; the photon is moved in one
//! jump and the collision at the endpoint is accepted as real with
//! probability Σ_local / Σ_max, otherwise it is virtual and the flight
//! continues unchanged. One [`TallyStep`] is recorded per flight either way;
//! tallies consume the step list after the history ends.

use log::warn;

use crate::grid::VoxelGrid;
use crate::interaction_data::InteractionData;
use crate::particle::Photon;
use crate::physics::interact;
use crate::rng::HistoryRng;
use crate::settings::Settings;
use crate::tally::TallyStep;

/// How a history ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// Photoelectric absorption (or forced termination of a pathological
    /// history).
    Absorbed,
    /// Left the voxel grid.
    Escaped,
    /// Dropped to or below the energy cutoff; the remainder was deposited
    /// locally.
    EnergyCutoff,
}

/// Result of transporting one photon to termination.
#[derive(Debug)]
pub struct HistoryOutcome {
    pub terminal: Terminal,
    pub steps: Vec<TallyStep>,
    /// True when the step bound fired and the history was cut short.
    pub pathological: bool,
}

/// Shared read-only transport engine. One instance serves all worker
/// threads; per-history mutable state lives in the photon, the RNG and the
/// caller's dose buffer.
pub struct PhysicsEngine<'a> {
    interaction_data: &'a InteractionData,
    grid: &'a VoxelGrid,
    energy_cutoff: f64,
    max_steps: u32,
}

impl<'a> PhysicsEngine<'a> {
    pub fn new(
        interaction_data: &'a InteractionData,
        grid: &'a VoxelGrid,
        settings: &Settings,
    ) -> Self {
        Self {
            interaction_data,
            grid,
            energy_cutoff: settings.energy_cutoff,
            max_steps: settings.max_steps_per_history,
        }
    }

    /// Runs one photon to termination. Deposited energy is accumulated into
    /// `dose`, indexed like the grid's voxels.
    pub fn transport(
        &self,
        photon: &mut Photon,
        rng: &mut HistoryRng,
        dose: &mut [f64],
    ) -> HistoryOutcome {
        let mut steps = Vec::new();

        for _ in 0..self.max_steps {
            if photon.energy <= self.energy_cutoff {
                self.deposit_remainder(photon, &mut steps, dose);
                return HistoryOutcome {
                    terminal: Terminal::EnergyCutoff,
                    steps,
                    pathological: false,
                };
            }

            let sigma_max = self.interaction_data.max_total_cross_section(photon.energy);
            if sigma_max <= 0.0 {
                // pre-run validation rejects this; nothing to collide with
                return HistoryOutcome {
                    terminal: Terminal::Escaped,
                    steps,
                    pathological: false,
                };
            }

            // u in (0, 1] keeps ln finite
            let u = 1.0 - rng.random();
            let free_path = -u.ln() / sigma_max;

            let start_position = photon.position;
            let direction = photon.direction;
            let energy = photon.energy;
            let history = photon.scatter_history();
            photon.move_by(free_path);

            let Some(material_id) = self.grid.material_at(&photon.position) else {
                steps.push(TallyStep {
                    start_position,
                    direction,
                    energy,
                    free_path,
                    interacted: false,
                    energy_deposited: 0.0,
                    history,
                });
                return HistoryOutcome {
                    terminal: Terminal::Escaped,
                    steps,
                    pathological: false,
                };
            };
            let Some(material) = self.interaction_data.material(material_id) else {
                // unreachable after validation; treat the photon as escaped
                debug_assert!(false, "material id {material_id} not loaded");
                return HistoryOutcome {
                    terminal: Terminal::Escaped,
                    steps,
                    pathological: false,
                };
            };

            let sigma_local = material.total_cross_section(photon.energy);
            let accepted = rng.random() * sigma_max <= sigma_local;

            let mut interacted = false;
            let mut energy_deposited = 0.0;
            if accepted {
                if let Some(channel) = material.sample_channel(photon.energy, rng.random()) {
                    interacted = true;
                    energy_deposited = interact(photon, channel, rng);
                    if energy_deposited > 0.0 {
                        if let Some(index) = self.grid.dose_index(&photon.position) {
                            dose[index] += energy_deposited;
                        }
                    }
                }
            }

            steps.push(TallyStep {
                start_position,
                direction,
                energy,
                free_path,
                interacted,
                energy_deposited,
                history,
            });

            if photon.is_terminated() {
                return HistoryOutcome {
                    terminal: Terminal::Absorbed,
                    steps,
                    pathological: false,
                };
            }
        }

        warn!(
            "history exceeded {} steps at {:?}, terminating",
            self.max_steps, photon.position
        );
        self.deposit_remainder(photon, &mut steps, dose);
        HistoryOutcome {
            terminal: Terminal::Absorbed,
            steps,
            pathological: true,
        }
    }

    /// Deposits the photon's remaining energy at its current position and
    /// terminates it, recording a zero-length step so tallies see the
    /// deposit.
    fn deposit_remainder(&self, photon: &mut Photon, steps: &mut Vec<TallyStep>, dose: &mut [f64]) {
        let deposited = photon.energy;
        if deposited > 0.0 {
            if let Some(index) = self.grid.dose_index(&photon.position) {
                dose[index] += deposited;
            }
            steps.push(TallyStep {
                start_position: photon.position,
                direction: photon.direction,
                energy: photon.energy,
                free_path: 0.0,
                interacted: false,
                energy_deposited: deposited,
                history: photon.scatter_history(),
            });
        }
        photon.energy = 0.0;
        photon.terminate();
    }
}
