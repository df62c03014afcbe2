//! Simulation driver: validation, parallel history loop, result merging.
//!
//! Histories are embarrassingly parallel. Each rayon worker folds over its
//! share of history indices with private tally copies and a private dose
//! buffer; every accumulator is a commutative sum, so the reduction order
//! chosen by the scheduler cannot change the result, and per-history RNG
//! streams are derived from the history index alone, so neither can thread
//! placement.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;
use rayon::prelude::*;

use crate::engine::{PhysicsEngine, Terminal};
use crate::error::Result;
use crate::grid::VoxelGrid;
use crate::interaction_data::InteractionData;
use crate::rng::HistoryRng;
use crate::settings::Settings;
use crate::source::PhotonSource;
use crate::tally::{SurfaceTally, VolumeTally};

/// Cooperative cancellation handle. Checked at history boundaries only, so
/// a stopped run still holds exact results for every history it finished.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    flag: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Aggregate counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Histories actually transported (equals the requested count unless the
    /// run was stopped).
    pub histories: u64,
    pub absorbed: u64,
    pub escaped: u64,
    pub cutoff: u64,
    /// Histories cut short by the per-history step bound.
    pub pathological_histories: u64,
}

impl RunSummary {
    fn count(&mut self, terminal: Terminal, pathological: bool) {
        self.histories += 1;
        match terminal {
            Terminal::Absorbed => self.absorbed += 1,
            Terminal::Escaped => self.escaped += 1,
            Terminal::EnergyCutoff => self.cutoff += 1,
        }
        if pathological {
            self.pathological_histories += 1;
        }
    }

    fn merge(&mut self, other: &RunSummary) {
        self.histories += other.histories;
        self.absorbed += other.absorbed;
        self.escaped += other.escaped;
        self.cutoff += other.cutoff;
        self.pathological_histories += other.pathological_histories;
    }
}

/// Worker-local accumulation state.
struct Worker {
    surface: Vec<SurfaceTally>,
    volume: Vec<VolumeTally>,
    dose: Vec<f64>,
    summary: RunSummary,
}

impl Worker {
    fn merge(mut self, other: Worker) -> Worker {
        for (mine, theirs) in self.surface.iter_mut().zip(other.surface.iter()) {
            mine.merge(theirs);
        }
        for (mine, theirs) in self.volume.iter_mut().zip(other.volume.iter()) {
            mine.merge(theirs);
        }
        for (acc, &value) in self.dose.iter_mut().zip(other.dose.iter()) {
            *acc += value;
        }
        self.summary.merge(&other.summary);
        self
    }
}

/// A complete simulation: geometry, physics data, source, settings and
/// tallies, run as one unit.
pub struct Simulation {
    interaction_data: InteractionData,
    grid: VoxelGrid,
    source: PhotonSource,
    settings: Settings,
    surface_tallies: Vec<SurfaceTally>,
    volume_tallies: Vec<VolumeTally>,
}

impl Simulation {
    pub fn new(
        interaction_data: InteractionData,
        grid: VoxelGrid,
        source: PhotonSource,
        settings: Settings,
    ) -> Self {
        Self {
            interaction_data,
            grid,
            source,
            settings,
            surface_tallies: Vec::new(),
            volume_tallies: Vec::new(),
        }
    }

    pub fn add_surface_tally(&mut self, tally: SurfaceTally) {
        self.surface_tallies.push(tally);
    }

    pub fn add_volume_tally(&mut self, tally: VolumeTally) {
        self.volume_tallies.push(tally);
    }

    /// Pre-run validation: settings, source/grid/material consistency, and
    /// a non-degenerate majorant over the reachable energy window. The
    /// window spans from the energy cutoff (scatters only lose energy) up to
    /// the highest emittable source energy. `Settings::range_policy` governs
    /// the window check alongside the policy the interaction data carries.
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;
        let (_, max_energy) = self.source.energy_range();
        let min_energy = self.settings.energy_cutoff.max(f64::MIN_POSITIVE);
        self.interaction_data.validate_for(
            min_energy.min(max_energy),
            max_energy,
            self.grid.material_ids_in_use(),
            self.settings.range_policy,
        )
    }

    /// Runs all histories to completion.
    pub fn run(&mut self) -> Result<RunSummary> {
        self.run_with_stop(&StopToken::new())
    }

    /// Runs histories until done or until `stop` fires. Finished histories
    /// are always fully scored; a stop never tears a history apart.
    pub fn run_with_stop(&mut self, stop: &StopToken) -> Result<RunSummary> {
        self.validate()?;
        self.grid.reset_dose();
        for tally in &mut self.surface_tallies {
            tally.reset();
        }
        for tally in &mut self.volume_tallies {
            tally.reset();
        }
        info!(
            "starting run: {} histories, seed {}",
            self.settings.histories, self.settings.seed
        );

        let engine = PhysicsEngine::new(&self.interaction_data, &self.grid, &self.settings);
        let source = &self.source;
        let seed = self.settings.seed;
        let surface_proto = &self.surface_tallies;
        let volume_proto = &self.volume_tallies;
        let num_voxels = self.grid.num_voxels();

        let make_worker = || Worker {
            surface: surface_proto.clone(),
            volume: volume_proto.clone(),
            dose: vec![0.0; num_voxels],
            summary: RunSummary::default(),
        };

        let merged = (0..self.settings.histories)
            .into_par_iter()
            .fold(make_worker, |mut worker, index| {
                if stop.is_stopped() {
                    return worker;
                }
                let mut rng = HistoryRng::for_history(seed, index);
                let mut photon = source.sample(&mut rng);
                let outcome = engine.transport(&mut photon, &mut rng, &mut worker.dose);

                for step in &outcome.steps {
                    for tally in &mut worker.surface {
                        tally.process_step(step);
                    }
                    for tally in &mut worker.volume {
                        tally.process_step(step);
                    }
                }
                for tally in &mut worker.surface {
                    tally.end_history();
                }
                for tally in &mut worker.volume {
                    tally.end_history();
                }

                worker.summary.count(outcome.terminal, outcome.pathological);
                worker
            })
            .reduce(make_worker, Worker::merge);

        for (mine, theirs) in self.surface_tallies.iter_mut().zip(merged.surface.iter()) {
            mine.merge(theirs);
        }
        for (mine, theirs) in self.volume_tallies.iter_mut().zip(merged.volume.iter()) {
            mine.merge(theirs);
        }
        self.grid.merge_dose(&merged.dose);

        info!(
            "run finished: {} histories ({} absorbed, {} escaped, {} cutoff, {} pathological)",
            merged.summary.histories,
            merged.summary.absorbed,
            merged.summary.escaped,
            merged.summary.cutoff,
            merged.summary.pathological_histories,
        );
        Ok(merged.summary)
    }

    pub fn surface_tallies(&self) -> &[SurfaceTally] {
        &self.surface_tallies
    }

    pub fn volume_tallies(&self) -> &[VolumeTally] {
        &self.volume_tallies
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction_data::RangePolicy;
    use crate::library::{ChannelTable, CrossSectionLibrary, MaterialRecord};
    use crate::source::{Directionality, EnergySpectrum, SourceGeometry};
    use nalgebra::Vector3;

    fn build_simulation(histories: u64, seed: u64) -> Simulation {
        let mut library = CrossSectionLibrary::new();
        library
            .insert(
                "aluminum",
                MaterialRecord {
                    id: 1,
                    density: 2.699,
                    atomic_weight: 26.982,
                    photoelectric: ChannelTable::new(vec![1e3, 1e5], vec![8e3, 8.0]),
                    coherent: ChannelTable::new(vec![1e3, 1e5], vec![1e2, 0.5]),
                    incoherent: ChannelTable::new(vec![1e3, 1e5], vec![2.0, 9.0]),
                },
            )
            .unwrap();
        let data =
            InteractionData::from_library(&["aluminum"], &library, RangePolicy::Clamp).unwrap();
        let grid = VoxelGrid::homogeneous(
            [2, 2, 2],
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::zeros(),
            1,
        )
        .unwrap();
        let source = PhotonSource::new(
            SourceGeometry::Point {
                position: Vector3::new(1.0, 1.0, 0.001),
            },
            EnergySpectrum::monoenergetic(3e4).unwrap(),
            Directionality::beam(Vector3::new(0.0, 0.0, 1.0)).unwrap(),
        );
        let settings = Settings {
            histories,
            seed,
            ..Default::default()
        };
        Simulation::new(data, grid, source, settings)
    }

    #[test]
    fn test_terminal_counts_sum_to_histories() {
        let mut sim = build_simulation(500, 7);
        let summary = sim.run().unwrap();
        assert_eq!(summary.histories, 500);
        assert_eq!(
            summary.absorbed + summary.escaped + summary.cutoff,
            summary.histories
        );
        assert_eq!(summary.pathological_histories, 0);
    }

    #[test]
    fn test_same_seed_same_summary_and_dose() {
        let mut a = build_simulation(400, 99);
        let mut b = build_simulation(400, 99);
        let summary_a = a.run().unwrap();
        let summary_b = b.run().unwrap();
        assert_eq!(summary_a, summary_b);
        assert_eq!(
            a.grid().total_energy_deposited(),
            b.grid().total_energy_deposited()
        );
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut a = build_simulation(400, 1);
        let mut b = build_simulation(400, 2);
        a.run().unwrap();
        b.run().unwrap();
        assert_ne!(
            a.grid().total_energy_deposited(),
            b.grid().total_energy_deposited()
        );
    }

    #[test]
    fn test_stop_token_halts_early() {
        let mut sim = build_simulation(100_000, 5);
        let stop = StopToken::new();
        stop.stop();
        let summary = sim.run_with_stop(&stop).unwrap();
        assert!(summary.histories < 100_000);
    }

    #[test]
    fn test_validation_failure_surfaces_before_running() {
        let mut sim = build_simulation(0, 1);
        assert!(sim.run().is_err());
    }

    #[test]
    fn test_strict_settings_reject_source_beyond_tabulated_range() {
        // tables end at 100 keV; a 1 MeV source must fail fast when the run
        // settings ask for strict range handling, even though the
        // interaction data itself was built with Clamp
        let build = |policy| {
            let mut library = CrossSectionLibrary::new();
            library
                .insert(
                    "aluminum",
                    MaterialRecord {
                        id: 1,
                        density: 2.699,
                        atomic_weight: 26.982,
                        photoelectric: ChannelTable::new(vec![1e3, 1e5], vec![8e3, 8.0]),
                        coherent: ChannelTable::new(vec![1e3, 1e5], vec![1e2, 0.5]),
                        incoherent: ChannelTable::new(vec![1e3, 1e5], vec![2.0, 9.0]),
                    },
                )
                .unwrap();
            let data =
                InteractionData::from_library(&["aluminum"], &library, RangePolicy::Clamp)
                    .unwrap();
            let grid = VoxelGrid::homogeneous(
                [2, 2, 2],
                Vector3::new(1.0, 1.0, 1.0),
                Vector3::zeros(),
                1,
            )
            .unwrap();
            let source = PhotonSource::new(
                SourceGeometry::Point {
                    position: Vector3::new(1.0, 1.0, 0.001),
                },
                EnergySpectrum::monoenergetic(1e6).unwrap(),
                Directionality::beam(Vector3::new(0.0, 0.0, 1.0)).unwrap(),
            );
            let settings = Settings {
                histories: 10,
                range_policy: policy,
                ..Default::default()
            };
            Simulation::new(data, grid, source, settings)
        };

        assert!(build(RangePolicy::Strict).run().is_err());
        // clamped settings keep the permissive behavior
        assert!(build(RangePolicy::Clamp).run().is_ok());
    }
}
