//! Scored quantities and their provenance breakdown.
//!
//! Tallies decide *when* to score; quantities decide *what* is accumulated.
//! Every score is binned by the photon's provenance at scoring time, so a
//! report can separate the primary beam from single-scattered and
//! multiply-scattered contributions.

use serde::{Deserialize, Serialize};

use crate::particle::ScatterHistory;

/// Scatter provenance of a photon at the moment it is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    Primary,
    SingleCoherent,
    SingleIncoherent,
    Multiple,
}

impl Provenance {
    pub const ALL: [Provenance; 4] = [
        Provenance::Primary,
        Provenance::SingleCoherent,
        Provenance::SingleIncoherent,
        Provenance::Multiple,
    ];

    pub fn of(history: ScatterHistory) -> Self {
        match (history.coherent, history.incoherent) {
            (0, 0) => Provenance::Primary,
            (1, 0) => Provenance::SingleCoherent,
            (0, 1) => Provenance::SingleIncoherent,
            _ => Provenance::Multiple,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provenance::Primary => "primary",
            Provenance::SingleCoherent => "single_coherent",
            Provenance::SingleIncoherent => "single_incoherent",
            Provenance::Multiple => "multiple",
        }
    }

    fn index(&self) -> usize {
        match self {
            Provenance::Primary => 0,
            Provenance::SingleCoherent => 1,
            Provenance::SingleIncoherent => 2,
            Provenance::Multiple => 3,
        }
    }
}

/// Event counter binned by provenance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountValue {
    bins: [u64; 4],
}

impl CountValue {
    pub fn add(&mut self, provenance: Provenance) {
        self.bins[provenance.index()] += 1;
    }

    pub fn total(&self) -> u64 {
        self.bins.iter().sum()
    }

    pub fn count(&self, provenance: Provenance) -> u64 {
        self.bins[provenance.index()]
    }

    pub fn merge(&mut self, other: &CountValue) {
        for (acc, &value) in self.bins.iter_mut().zip(other.bins.iter()) {
            *acc += value;
        }
    }

    pub fn reset(&mut self) {
        self.bins = [0; 4];
    }
}

/// Accumulated scalar samples binned by provenance. Stores sums and counts;
/// means are derived at report time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValueAccumulator {
    sums: [f64; 4],
    sum_squares: [f64; 4],
    counts: [u64; 4],
}

impl ValueAccumulator {
    pub fn add(&mut self, value: f64, provenance: Provenance) {
        let i = provenance.index();
        self.sums[i] += value;
        self.sum_squares[i] += value * value;
        self.counts[i] += 1;
    }

    pub fn sum(&self) -> f64 {
        self.sums.iter().sum()
    }

    pub fn sum_for(&self, provenance: Provenance) -> f64 {
        self.sums[provenance.index()]
    }

    pub fn count(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        let n = self.count();
        if n == 0 {
            0.0
        } else {
            self.sum() / n as f64
        }
    }

    /// Population variance of all accumulated samples.
    pub fn variance(&self) -> f64 {
        let n = self.count();
        if n == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let mean_square = self.sum_squares.iter().sum::<f64>() / n as f64;
        (mean_square - mean * mean).max(0.0)
    }

    pub fn merge(&mut self, other: &ValueAccumulator) {
        for i in 0..4 {
            self.sums[i] += other.sums[i];
            self.sum_squares[i] += other.sum_squares[i];
            self.counts[i] += other.counts[i];
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One scorable quantity. Surface tallies use the crossing quantities,
/// volume tallies the interaction and deposition ones; a container may mix
/// them freely and unsupported events are simply not scored.
#[derive(Debug, Clone)]
pub enum Quantity {
    /// Number of photons scored (once per photon per tally).
    PhotonCount(CountValue),
    /// Number of interactions inside a volume tally's region.
    InteractionCount(CountValue),
    /// Energy (eV) carried by photons when scored.
    IncidentEnergy(ValueAccumulator),
    /// |cosine| between photon direction and surface normal at crossing.
    EntranceCosine(ValueAccumulator),
    /// Energy (eV) deposited inside a volume tally's region.
    EnergyDeposited(ValueAccumulator),
}

impl Quantity {
    pub fn photon_count() -> Self {
        Quantity::PhotonCount(CountValue::default())
    }

    pub fn interaction_count() -> Self {
        Quantity::InteractionCount(CountValue::default())
    }

    pub fn incident_energy() -> Self {
        Quantity::IncidentEnergy(ValueAccumulator::default())
    }

    pub fn entrance_cosine() -> Self {
        Quantity::EntranceCosine(ValueAccumulator::default())
    }

    pub fn energy_deposited() -> Self {
        Quantity::EnergyDeposited(ValueAccumulator::default())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Quantity::PhotonCount(_) => "photon_count",
            Quantity::InteractionCount(_) => "interaction_count",
            Quantity::IncidentEnergy(_) => "incident_energy",
            Quantity::EntranceCosine(_) => "entrance_cosine",
            Quantity::EnergyDeposited(_) => "energy_deposited",
        }
    }

    fn merge(&mut self, other: &Quantity) {
        match (self, other) {
            (Quantity::PhotonCount(a), Quantity::PhotonCount(b)) => a.merge(b),
            (Quantity::InteractionCount(a), Quantity::InteractionCount(b)) => a.merge(b),
            (Quantity::IncidentEnergy(a), Quantity::IncidentEnergy(b)) => a.merge(b),
            (Quantity::EntranceCosine(a), Quantity::EntranceCosine(b)) => a.merge(b),
            (Quantity::EnergyDeposited(a), Quantity::EnergyDeposited(b)) => a.merge(b),
            _ => debug_assert!(false, "merging mismatched quantity variants"),
        }
    }

    fn reset(&mut self) {
        match self {
            Quantity::PhotonCount(count) | Quantity::InteractionCount(count) => count.reset(),
            Quantity::IncidentEnergy(acc)
            | Quantity::EntranceCosine(acc)
            | Quantity::EnergyDeposited(acc) => acc.reset(),
        }
    }
}

/// Ordered collection of quantities sharing one tally's scoring events.
#[derive(Debug, Clone, Default)]
pub struct QuantityContainer {
    quantities: Vec<Quantity>,
}

impl QuantityContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, quantity: Quantity) -> Self {
        self.quantities.push(quantity);
        self
    }

    pub fn add(&mut self, quantity: Quantity) {
        self.quantities.push(quantity);
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    /// Scores a surface crossing: photon count, carried energy, entrance
    /// cosine.
    pub fn score_crossing(&mut self, energy: f64, cosine: f64, provenance: Provenance) {
        for quantity in &mut self.quantities {
            match quantity {
                Quantity::PhotonCount(count) => count.add(provenance),
                Quantity::IncidentEnergy(acc) => acc.add(energy, provenance),
                Quantity::EntranceCosine(acc) => acc.add(cosine.abs(), provenance),
                _ => {}
            }
        }
    }

    /// Scores a photon seen by a volume tally (at most once per history).
    pub fn score_photon(&mut self, energy: f64, provenance: Provenance) {
        for quantity in &mut self.quantities {
            match quantity {
                Quantity::PhotonCount(count) => count.add(provenance),
                Quantity::IncidentEnergy(acc) => acc.add(energy, provenance),
                _ => {}
            }
        }
    }

    /// Scores one interaction inside a volume tally's region.
    pub fn score_interaction(&mut self, provenance: Provenance) {
        for quantity in &mut self.quantities {
            if let Quantity::InteractionCount(count) = quantity {
                count.add(provenance);
            }
        }
    }

    /// Scores energy deposited inside a volume tally's region.
    pub fn score_deposit(&mut self, energy: f64, provenance: Provenance) {
        for quantity in &mut self.quantities {
            if let Quantity::EnergyDeposited(acc) = quantity {
                acc.add(energy, provenance);
            }
        }
    }

    /// Merges a same-shaped container (worker-local copy) into this one.
    /// All accumulators are commutative sums, so merge order cannot change
    /// the result.
    pub fn merge(&mut self, other: &QuantityContainer) {
        debug_assert_eq!(self.quantities.len(), other.quantities.len());
        for (mine, theirs) in self.quantities.iter_mut().zip(other.quantities.iter()) {
            mine.merge(theirs);
        }
    }

    /// Ordered report: for each quantity its headline value followed by the
    /// per-provenance breakdown. Counts report totals, energies report sums,
    /// the entrance cosine reports its mean.
    pub fn report(&self) -> Vec<(String, f64)> {
        let mut lines = Vec::new();
        for quantity in &self.quantities {
            let name = quantity.name();
            match quantity {
                Quantity::PhotonCount(count) | Quantity::InteractionCount(count) => {
                    lines.push((name.to_string(), count.total() as f64));
                    for p in Provenance::ALL {
                        lines.push((format!("{name}.{}", p.name()), count.count(p) as f64));
                    }
                }
                Quantity::EntranceCosine(acc) => {
                    lines.push((name.to_string(), acc.mean()));
                }
                Quantity::IncidentEnergy(acc) | Quantity::EnergyDeposited(acc) => {
                    lines.push((name.to_string(), acc.sum()));
                    for p in Provenance::ALL {
                        lines.push((format!("{name}.{}", p.name()), acc.sum_for(p)));
                    }
                }
            }
        }
        lines
    }

    /// Clears all accumulators, keeping the container's shape.
    pub fn reset(&mut self) {
        for quantity in &mut self.quantities {
            quantity.reset();
        }
    }

    pub fn quantities(&self) -> &[Quantity] {
        &self.quantities
    }
}
