//! Photon source: where histories start, with what energy, toward where.

use nalgebra::Vector3;
use rand::Rng;

use crate::distributions::DiscreteInversion;
use crate::error::{Result, TransportError};
use crate::particle::Photon;

/// Initial photon energy model.
#[derive(Debug, Clone)]
pub enum EnergySpectrum {
    /// Every photon starts at the same energy (eV).
    Monoenergetic(f64),
    /// Energies drawn from a tabulated discrete spectrum.
    Tabulated(DiscreteInversion),
}

impl EnergySpectrum {
    pub fn monoenergetic(energy: f64) -> Result<Self> {
        if energy <= 0.0 || !energy.is_finite() {
            return Err(TransportError::Configuration(format!(
                "source energy must be positive, got {energy} eV"
            )));
        }
        Ok(Self::Monoenergetic(energy))
    }

    pub fn tabulated(energies: Vec<f64>, weights: Vec<f64>) -> Result<Self> {
        if energies.iter().any(|&e| e <= 0.0) {
            return Err(TransportError::Configuration(
                "tabulated spectrum contains non-positive energies".to_string(),
            ));
        }
        Ok(Self::Tabulated(DiscreteInversion::new(energies, weights)?))
    }

    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        match self {
            Self::Monoenergetic(energy) => *energy,
            Self::Tabulated(dist) => dist.sample(rng),
        }
    }

    /// Lowest and highest emittable energy, for pre-run validation.
    pub fn energy_range(&self) -> (f64, f64) {
        match self {
            Self::Monoenergetic(energy) => (*energy, *energy),
            Self::Tabulated(dist) => dist.support(),
        }
    }
}

/// Initial direction model.
#[derive(Debug, Clone)]
pub enum Directionality {
    /// Uniform over the full sphere.
    Isotropic,
    /// Fixed unit direction.
    Beam { direction: Vector3<f64> },
    /// Direction toward a uniformly sampled point on a disc.
    TowardDisc {
        center: Vector3<f64>,
        /// Unit normal of the disc plane.
        normal: Vector3<f64>,
        radius: f64,
    },
    /// Direction toward a uniformly sampled point on a rectangle spanned by
    /// two orthogonal edge vectors around its center.
    TowardRectangle {
        center: Vector3<f64>,
        edge_u: Vector3<f64>,
        edge_v: Vector3<f64>,
    },
}

impl Directionality {
    pub fn beam(direction: Vector3<f64>) -> Result<Self> {
        let norm = direction.norm();
        if norm <= 0.0 || !norm.is_finite() {
            return Err(TransportError::Configuration(
                "beam direction must be a non-zero vector".to_string(),
            ));
        }
        Ok(Self::Beam {
            direction: direction / norm,
        })
    }

    pub fn toward_disc(center: Vector3<f64>, normal: Vector3<f64>, radius: f64) -> Result<Self> {
        if radius <= 0.0 {
            return Err(TransportError::Configuration(format!(
                "disc radius must be positive, got {radius}"
            )));
        }
        let norm = normal.norm();
        if norm <= 0.0 || !norm.is_finite() {
            return Err(TransportError::Configuration(
                "disc normal must be a non-zero vector".to_string(),
            ));
        }
        Ok(Self::TowardDisc {
            center,
            normal: normal / norm,
            radius,
        })
    }

    pub fn toward_rectangle(
        center: Vector3<f64>,
        edge_u: Vector3<f64>,
        edge_v: Vector3<f64>,
    ) -> Result<Self> {
        if edge_u.norm() <= 0.0 || edge_v.norm() <= 0.0 {
            return Err(TransportError::Configuration(
                "rectangle edges must be non-zero vectors".to_string(),
            ));
        }
        let cos = edge_u.dot(&edge_v) / (edge_u.norm() * edge_v.norm());
        if cos.abs() > 1e-9 {
            return Err(TransportError::Configuration(
                "rectangle edge vectors must be orthogonal".to_string(),
            ));
        }
        Ok(Self::TowardRectangle {
            center,
            edge_u,
            edge_v,
        })
    }

    /// Samples an initial unit direction for a photon born at `origin`.
    pub fn sample(&self, origin: &Vector3<f64>, rng: &mut impl Rng) -> Vector3<f64> {
        match self {
            Self::Isotropic => {
                let mu: f64 = 2.0 * rng.gen::<f64>() - 1.0;
                let phi = 2.0 * std::f64::consts::PI * rng.gen::<f64>();
                let sin_theta = (1.0 - mu * mu).sqrt();
                Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), mu)
            }
            Self::Beam { direction } => *direction,
            Self::TowardDisc {
                center,
                normal,
                radius,
            } => {
                let (e1, e2) = orthonormal_basis(normal);
                let r = radius * rng.gen::<f64>().sqrt();
                let phi = 2.0 * std::f64::consts::PI * rng.gen::<f64>();
                let target = center + r * (phi.cos() * e1 + phi.sin() * e2);
                (target - origin).normalize()
            }
            Self::TowardRectangle {
                center,
                edge_u,
                edge_v,
            } => {
                let u: f64 = rng.gen::<f64>() - 0.5;
                let v: f64 = rng.gen::<f64>() - 0.5;
                let target = center + u * edge_u + v * edge_v;
                (target - origin).normalize()
            }
        }
    }
}

/// Two unit vectors completing `normal` to a right-handed orthonormal frame.
fn orthonormal_basis(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let helper = if normal.x.abs() < 0.9 {
        Vector3::new(1.0, 0.0, 0.0)
    } else {
        Vector3::new(0.0, 1.0, 0.0)
    };
    let e1 = normal.cross(&helper).normalize();
    let e2 = normal.cross(&e1);
    (e1, e2)
}

/// Spatial origin of emitted photons.
#[derive(Debug, Clone)]
pub enum SourceGeometry {
    Point { position: Vector3<f64> },
}

impl SourceGeometry {
    pub fn sample(&self, _rng: &mut impl Rng) -> Vector3<f64> {
        match self {
            Self::Point { position } => *position,
        }
    }
}

/// Complete photon source: geometry, spectrum and directionality composed.
#[derive(Debug, Clone)]
pub struct PhotonSource {
    pub geometry: SourceGeometry,
    pub spectrum: EnergySpectrum,
    pub directionality: Directionality,
}

impl PhotonSource {
    pub fn new(
        geometry: SourceGeometry,
        spectrum: EnergySpectrum,
        directionality: Directionality,
    ) -> Self {
        Self {
            geometry,
            spectrum,
            directionality,
        }
    }

    /// Emits one primary photon.
    pub fn sample(&self, rng: &mut impl Rng) -> Photon {
        let position = self.geometry.sample(rng);
        let energy = self.spectrum.sample(rng);
        let direction = self.directionality.sample(&position, rng);
        Photon::new(position, direction, energy)
    }

    pub fn energy_range(&self) -> (f64, f64) {
        self.spectrum.energy_range()
    }
}
