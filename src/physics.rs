//! Photon interaction physics.
//!
//! Each channel mutates the photon in place and returns the energy (eV) it
//! deposited locally. Angular sampling uses rejection methods: the Thomson
//! law for coherent scatter and Kahn's method for the Klein-Nishina
//! incoherent cross section.

use rand::Rng;

use crate::material::Channel;
use crate::particle::Photon;

/// Electron rest energy in eV.
pub const ELECTRON_REST_MASS: f64 = 510_998.9461;

/// Dispatches one sampled interaction, returning the energy deposited.
pub fn interact(photon: &mut Photon, channel: Channel, rng: &mut impl Rng) -> f64 {
    match channel {
        Channel::Photoelectric => photoelectric(photon),
        Channel::Coherent => coherent_scatter(photon, rng),
        Channel::Incoherent => incoherent_scatter(photon, rng),
    }
}

/// Photoelectric absorption: the photon's full energy is deposited and the
/// history ends. Fluorescence and Auger relaxation are not modeled.
pub fn photoelectric(photon: &mut Photon) -> f64 {
    let deposited = photon.energy;
    photon.energy = 0.0;
    photon.terminate();
    deposited
}

/// Coherent (Rayleigh) scatter: direction changes by an angle drawn from the
/// Thomson law, energy unchanged, nothing deposited.
pub fn coherent_scatter(photon: &mut Photon, rng: &mut impl Rng) -> f64 {
    let mu = sample_thomson_cosine(rng);
    let phi = 2.0 * std::f64::consts::PI * rng.gen::<f64>();
    photon.rotate(mu.acos(), phi);
    photon.set_scattered();
    photon.add_coherent_scatter();
    0.0
}

/// Incoherent (Compton) scatter on a free electron at rest: Klein-Nishina
/// angle via Kahn's method, energy dropped accordingly, the difference
/// deposited locally.
pub fn incoherent_scatter(photon: &mut Photon, rng: &mut impl Rng) -> f64 {
    let k = photon.energy / ELECTRON_REST_MASS;
    let x = sample_kahn_energy_ratio(k, rng);
    let mu = 1.0 + 1.0 / k - x / k;

    let scattered_energy = photon.energy / x;
    let deposited = photon.energy - scattered_energy;

    let phi = 2.0 * std::f64::consts::PI * rng.gen::<f64>();
    photon.rotate(mu.clamp(-1.0, 1.0).acos(), phi);
    photon.energy = scattered_energy;
    photon.set_scattered();
    photon.add_incoherent_scatter();
    deposited
}

/// Scattering-angle cosine from the Thomson law p(mu) ∝ 1 + mu², by
/// rejection against the envelope 2.
fn sample_thomson_cosine(rng: &mut impl Rng) -> f64 {
    loop {
        let mu: f64 = 2.0 * rng.gen::<f64>() - 1.0;
        if 2.0 * rng.gen::<f64>() <= 1.0 + mu * mu {
            return mu;
        }
    }
}

/// Kahn's rejection method for the Klein-Nishina distribution. Returns the
/// energy ratio x = E/E' >= 1, with k the incident energy in electron rest
/// mass units.
fn sample_kahn_energy_ratio(k: f64, rng: &mut impl Rng) -> f64 {
    let branch_probability = (1.0 + 2.0 * k) / (9.0 + 2.0 * k);
    loop {
        let r1: f64 = rng.gen();
        let r2: f64 = rng.gen();
        let r3: f64 = rng.gen();
        if r1 <= branch_probability {
            let x = 1.0 + 2.0 * k * r2;
            if r3 <= 4.0 * (1.0 / x - 1.0 / (x * x)) {
                return x;
            }
        } else {
            let x = (1.0 + 2.0 * k) / (1.0 + 2.0 * k * r2);
            let mu = 1.0 + 1.0 / k - x / k;
            if r3 <= 0.5 * (mu * mu + 1.0 / x) {
                return x;
            }
        }
    }
}
