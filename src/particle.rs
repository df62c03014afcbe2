//! Photon state during one transport history.

use nalgebra::Vector3;

/// How many times and how a photon has scattered so far. Tallies bin their
/// scores by this history (primary vs single/multiple scatter).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScatterHistory {
    pub coherent: u32,
    pub incoherent: u32,
}

impl ScatterHistory {
    pub fn total(&self) -> u32 {
        self.coherent + self.incoherent
    }
}

/// A photon in flight. Mutated exclusively by the physics engine inside one
/// history; never shared across histories.
#[derive(Debug, Clone)]
pub struct Photon {
    pub position: Vector3<f64>,
    /// Unit vector.
    pub direction: Vector3<f64>,
    /// Energy in eV.
    pub energy: f64,
    /// Statistical weight; constant 1.0 in the base design, kept for
    /// variance-reduction extensions.
    pub weight: f64,
    terminated: bool,
    primary: bool,
    scatter_history: ScatterHistory,
}

impl Photon {
    pub fn new(position: Vector3<f64>, direction: Vector3<f64>, energy: f64) -> Self {
        Self {
            position,
            direction,
            energy,
            weight: 1.0,
            terminated: false,
            primary: true,
            scatter_history: ScatterHistory::default(),
        }
    }

    /// Advances the photon by `distance` along its direction.
    pub fn move_by(&mut self, distance: f64) {
        self.position += distance * self.direction;
    }

    /// Rotates the direction by polar angle `theta` and azimuthal angle
    /// `phi`, both relative to the current direction.
    pub fn rotate(&mut self, theta: f64, phi: f64) {
        self.direction = rotate_direction(&self.direction, theta, phi);
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// Marks the photon as having interacted at least once.
    pub fn set_scattered(&mut self) {
        self.primary = false;
    }

    pub fn add_coherent_scatter(&mut self) {
        self.scatter_history.coherent += 1;
    }

    pub fn add_incoherent_scatter(&mut self) {
        self.scatter_history.incoherent += 1;
    }

    pub fn scatter_history(&self) -> ScatterHistory {
        self.scatter_history
    }
}

/// Rotates a unit vector by `theta` (polar, relative to the vector itself)
/// and `phi` (azimuthal around it), returning a unit vector.
///
/// The closed form is singular when the vector is parallel to z; that case
/// reduces to a rotation measured from the z axis directly.
pub fn rotate_direction(direction: &Vector3<f64>, theta: f64, phi: f64) -> Vector3<f64> {
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let w = direction.z;

    let one_minus_w2 = 1.0 - w * w;
    if one_minus_w2 < 1e-12 {
        let sign = if w >= 0.0 { 1.0 } else { -1.0 };
        return Vector3::new(
            sign * sin_theta * cos_phi,
            sign * sin_theta * sin_phi,
            sign * cos_theta,
        );
    }

    let denom = one_minus_w2.sqrt();
    let u = direction.x;
    let v = direction.y;
    Vector3::new(
        u * cos_theta + sin_theta / denom * (u * w * cos_phi - v * sin_phi),
        v * cos_theta + sin_theta / denom * (v * w * cos_phi + u * sin_phi),
        w * cos_theta - denom * sin_theta * cos_phi,
    )
}
