//! Surface and volume tallies.
//!
//! The engine records one [`TallyStep`] per transport step; tallies consume
//! the step stream after a history ends and score their quantities. A step's
//! segment is half-open, `t ∈ [0, free_path)`: the endpoint belongs to the
//! next step, so a crossing exactly at an interaction point is scored by
//! exactly one step.

use nalgebra::Vector3;

use crate::error::{Result, TransportError};
use crate::particle::ScatterHistory;
use crate::quantity::{Provenance, QuantityContainer};

/// One transport step as seen by the tallies: straight flight from
/// `start_position` over `free_path`, then possibly a real interaction at
/// the endpoint.
#[derive(Debug, Clone)]
pub struct TallyStep {
    pub start_position: Vector3<f64>,
    /// Unit flight direction.
    pub direction: Vector3<f64>,
    /// Photon energy (eV) during the flight.
    pub energy: f64,
    /// Length of the flight in cm.
    pub free_path: f64,
    /// True when the endpoint is a real (non-virtual) interaction.
    pub interacted: bool,
    /// Energy (eV) deposited at the endpoint.
    pub energy_deposited: f64,
    /// Scatter history at the start of the step.
    pub history: ScatterHistory,
}

impl TallyStep {
    pub fn end_position(&self) -> Vector3<f64> {
        self.start_position + self.free_path * self.direction
    }

    fn provenance(&self) -> Provenance {
        Provenance::of(self.history)
    }
}

/// Planar scoring surface.
#[derive(Debug, Clone)]
enum SurfaceShape {
    Disc {
        center: Vector3<f64>,
        normal: Vector3<f64>,
        radius: f64,
    },
    Rectangle {
        center: Vector3<f64>,
        edge_u: Vector3<f64>,
        edge_v: Vector3<f64>,
        normal: Vector3<f64>,
    },
}

impl SurfaceShape {
    /// Entrance cosine for a step's segment crossing the surface, or `None`
    /// if the segment misses it. Scoring is one-sided: only crossings along
    /// the surface normal count, crossings against it are ignored.
    fn intersect(&self, step: &TallyStep) -> Option<f64> {
        let (center, normal) = match self {
            SurfaceShape::Disc { center, normal, .. } => (center, normal),
            SurfaceShape::Rectangle { center, normal, .. } => (center, normal),
        };
        let denom = step.direction.dot(normal);
        if denom < 1e-12 {
            return None;
        }
        let t = (center - step.start_position).dot(normal) / denom;
        // segment is half-open at the interaction end
        if t < 0.0 || t >= step.free_path {
            return None;
        }
        let hit = step.start_position + t * step.direction;
        let inside = match self {
            SurfaceShape::Disc { center, radius, .. } => (hit - center).norm() <= *radius,
            SurfaceShape::Rectangle {
                center,
                edge_u,
                edge_v,
                ..
            } => {
                let local = hit - center;
                let u = local.dot(edge_u) / edge_u.norm_squared();
                let v = local.dot(edge_v) / edge_v.norm_squared();
                u.abs() <= 0.5 && v.abs() <= 0.5
            }
        };
        inside.then_some(denom)
    }
}

/// Tally scoring photons that cross a planar surface.
#[derive(Debug, Clone)]
pub struct SurfaceTally {
    pub name: String,
    shape: SurfaceShape,
    quantities: QuantityContainer,
}

impl SurfaceTally {
    pub fn disc(
        name: impl Into<String>,
        center: Vector3<f64>,
        normal: Vector3<f64>,
        radius: f64,
        quantities: QuantityContainer,
    ) -> Result<Self> {
        if radius <= 0.0 {
            return Err(TransportError::Configuration(format!(
                "disc tally radius must be positive, got {radius}"
            )));
        }
        let norm = normal.norm();
        if norm <= 0.0 || !norm.is_finite() {
            return Err(TransportError::Configuration(
                "disc tally normal must be a non-zero vector".to_string(),
            ));
        }
        Ok(Self {
            name: name.into(),
            shape: SurfaceShape::Disc {
                center,
                normal: normal / norm,
                radius,
            },
            quantities,
        })
    }

    pub fn rectangle(
        name: impl Into<String>,
        center: Vector3<f64>,
        edge_u: Vector3<f64>,
        edge_v: Vector3<f64>,
        quantities: QuantityContainer,
    ) -> Result<Self> {
        if edge_u.norm() <= 0.0 || edge_v.norm() <= 0.0 {
            return Err(TransportError::Configuration(
                "rectangle tally edges must be non-zero vectors".to_string(),
            ));
        }
        let cos = edge_u.dot(&edge_v) / (edge_u.norm() * edge_v.norm());
        if cos.abs() > 1e-9 {
            return Err(TransportError::Configuration(
                "rectangle tally edge vectors must be orthogonal".to_string(),
            ));
        }
        let normal = edge_u.cross(&edge_v).normalize();
        Ok(Self {
            name: name.into(),
            shape: SurfaceShape::Rectangle {
                center,
                edge_u,
                edge_v,
                normal,
            },
            quantities,
        })
    }

    /// Scores one step. The entrance cosine is the dot product of flight
    /// direction and surface normal; crossings against the normal do not
    /// score.
    pub fn process_step(&mut self, step: &TallyStep) {
        if let Some(cosine) = self.shape.intersect(step) {
            self.quantities
                .score_crossing(step.energy, cosine, step.provenance());
        }
    }

    pub fn end_history(&mut self) {}

    /// Clears accumulated scores; called at run start.
    pub fn reset(&mut self) {
        self.quantities.reset();
    }

    pub fn merge(&mut self, other: &SurfaceTally) {
        self.quantities.merge(&other.quantities);
    }

    pub fn report(&self) -> Vec<(String, f64)> {
        self.quantities.report()
    }
}

/// Axis-aligned cuboid region, half-open on the maximum faces like the voxel
/// grid.
#[derive(Debug, Clone)]
pub struct AACuboid {
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
}

impl AACuboid {
    pub fn new(min: Vector3<f64>, max: Vector3<f64>) -> Result<Self> {
        if (0..3).any(|axis| max[axis] <= min[axis]) {
            return Err(TransportError::Configuration(format!(
                "cuboid max must exceed min on every axis: min {min:?}, max {max:?}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, position: &Vector3<f64>) -> bool {
        (0..3).all(|axis| position[axis] >= self.min[axis] && position[axis] < self.max[axis])
    }

    /// Slab-method test of whether a segment of length `length` from
    /// `start` along `direction` intersects the cuboid.
    fn intersects_segment(
        &self,
        start: &Vector3<f64>,
        direction: &Vector3<f64>,
        length: f64,
    ) -> bool {
        let mut t_enter = 0.0f64;
        let mut t_exit = length;
        for axis in 0..3 {
            let d = direction[axis];
            if d.abs() < 1e-12 {
                if start[axis] < self.min[axis] || start[axis] >= self.max[axis] {
                    return false;
                }
                continue;
            }
            let mut t1 = (self.min[axis] - start[axis]) / d;
            let mut t2 = (self.max[axis] - start[axis]) / d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_enter = t_enter.max(t1);
            t_exit = t_exit.min(t2);
            if t_enter > t_exit {
                return false;
            }
        }
        true
    }
}

/// How one step's segment relates to a volume region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    Misses,
    LandsInside,
    PassesThrough,
    StartsInsideExits,
    StartsInsideStays,
}

/// Tally scoring photons and events inside a cuboid region.
#[derive(Debug, Clone)]
pub struct VolumeTally {
    pub name: String,
    region: AACuboid,
    quantities: QuantityContainer,
    counted_this_history: bool,
}

impl VolumeTally {
    pub fn cuboid(
        name: impl Into<String>,
        region: AACuboid,
        quantities: QuantityContainer,
    ) -> Self {
        Self {
            name: name.into(),
            region,
            quantities,
            counted_this_history: false,
        }
    }

    pub fn classify(&self, step: &TallyStep) -> Traversal {
        let start_inside = self.region.contains(&step.start_position);
        let end_inside = self.region.contains(&step.end_position());
        match (start_inside, end_inside) {
            (true, true) => Traversal::StartsInsideStays,
            (true, false) => Traversal::StartsInsideExits,
            (false, true) => Traversal::LandsInside,
            (false, false) => {
                if self.region.intersects_segment(
                    &step.start_position,
                    &step.direction,
                    step.free_path,
                ) {
                    Traversal::PassesThrough
                } else {
                    Traversal::Misses
                }
            }
        }
    }

    /// Scores one step. A photon is counted at most once per history, on
    /// its first contact with the region; interactions and deposits are
    /// scored whenever the step's endpoint lies inside.
    pub fn process_step(&mut self, step: &TallyStep) {
        let traversal = self.classify(step);
        if traversal == Traversal::Misses {
            return;
        }
        let provenance = step.provenance();
        if !self.counted_this_history {
            self.counted_this_history = true;
            self.quantities.score_photon(step.energy, provenance);
        }
        let end_inside = matches!(
            traversal,
            Traversal::LandsInside | Traversal::StartsInsideStays
        );
        if end_inside {
            if step.interacted {
                self.quantities.score_interaction(provenance);
            }
            if step.energy_deposited > 0.0 {
                self.quantities.score_deposit(step.energy_deposited, provenance);
            }
        }
    }

    /// Resets per-history state. Must be called between histories.
    pub fn end_history(&mut self) {
        self.counted_this_history = false;
    }

    /// Clears accumulated scores; called at run start.
    pub fn reset(&mut self) {
        self.quantities.reset();
        self.counted_this_history = false;
    }

    pub fn merge(&mut self, other: &VolumeTally) {
        self.quantities.merge(&other.quantities);
    }

    pub fn report(&self) -> Vec<(String, f64)> {
        self.quantities.report()
    }
}
