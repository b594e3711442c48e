use crate::flight_control::{
    common::Vec3D,
    orbit::{BodyOrbit, BodyState},
};
use std::f64::consts::TAU;

/// A celestial body of the simulated system.
///
/// Moons move on circular orbits around their parent in the `x`/`z` plane,
/// the root body sits at the origin.
#[derive(Debug, Clone)]
pub struct SimBody {
    state: BodyState,
    /// Planar angle around the parent at `ut = 0`.
    initial_phase: f64,
}

impl SimBody {
    pub fn root(name: &str, mu: f64, radius: f64) -> Self {
        Self {
            state: BodyState {
                name: name.to_string(),
                gravitational_parameter: mu,
                equatorial_radius: radius,
                sphere_of_influence: f64::INFINITY,
                orbit: None,
            },
            initial_phase: 0.0,
        }
    }

    /// A moon on a circular orbit, its sphere of influence follows from the
    /// Laplace radius `a * (m / M)^(2/5)`.
    pub fn moon(
        name: &str,
        mu: f64,
        radius: f64,
        parent: &SimBody,
        orbit_radius: f64,
        initial_phase: f64,
    ) -> Self {
        let parent_mu = parent.state.gravitational_parameter;
        let period = TAU * (orbit_radius.powi(3) / parent_mu).sqrt();
        Self {
            state: BodyState {
                name: name.to_string(),
                gravitational_parameter: mu,
                equatorial_radius: radius,
                sphere_of_influence: orbit_radius * (mu / parent_mu).powf(0.4),
                orbit: Some(BodyOrbit {
                    parent: parent.state.name.clone(),
                    radius: orbit_radius,
                    period,
                }),
            },
            initial_phase,
        }
    }

    /// Kerbin-like home world.
    pub fn kerbin() -> Self { Self::root("Kerbin", 3.5316e12, 600_000.0) }

    /// Mun-like moon of [`SimBody::kerbin`].
    pub fn mun(parent: &SimBody, initial_phase: f64) -> Self {
        Self::moon("Mun", 6.5138e10, 200_000.0, parent, 1.2e7, initial_phase)
    }

    pub fn state(&self) -> &BodyState { &self.state }
    pub fn name(&self) -> &str { &self.state.name }
    pub fn mu(&self) -> f64 { self.state.gravitational_parameter }
    pub fn parent(&self) -> Option<&str> { self.state.orbit.as_ref().map(|o| o.parent.as_str()) }

    fn phase_at(&self, ut: f64) -> Option<(f64, f64)> {
        self.state.orbit.as_ref().map(|o| (o.radius, self.initial_phase + ut * TAU / o.period))
    }

    /// Position relative to the parent body, zero for the root.
    pub fn position(&self, ut: f64) -> Vec3D<f64> {
        self.phase_at(ut).map_or(Vec3D::zero(), |(r, phi)| Vec3D::new(r * phi.cos(), 0.0, r * phi.sin()))
    }

    /// Velocity relative to the parent body, zero for the root.
    pub fn velocity(&self, ut: f64) -> Vec3D<f64> {
        match (self.phase_at(ut), self.state.orbit.as_ref()) {
            (Some((r, phi)), Some(orbit)) => {
                let speed = r * TAU / orbit.period;
                Vec3D::new(-speed * phi.sin(), 0.0, speed * phi.cos())
            }
            _ => Vec3D::zero(),
        }
    }
}

/// The simulated planetary system, a root body with its moons.
#[derive(Debug, Clone)]
pub struct SimSystem {
    bodies: Vec<SimBody>,
}

impl SimSystem {
    pub fn new(bodies: Vec<SimBody>) -> Self { Self { bodies } }

    /// Kerbin with the Mun starting at `mun_phase`.
    pub fn kerbin_mun(mun_phase: f64) -> Self {
        let kerbin = SimBody::kerbin();
        let mun = SimBody::mun(&kerbin, mun_phase);
        Self::new(vec![kerbin, mun])
    }

    pub fn body(&self, name: &str) -> Option<&SimBody> { self.bodies.iter().find(|b| b.name() == name) }

    /// Moons orbiting `parent`.
    pub fn children<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a SimBody> + 'a {
        self.bodies.iter().filter(move |b| b.parent() == Some(parent))
    }

    /// Position of `name` relative to the root body.
    pub fn absolute_position(&self, name: &str, ut: f64) -> Option<Vec3D<f64>> {
        let body = self.body(name)?;
        match body.parent() {
            Some(parent) => Some(self.absolute_position(parent, ut)? + body.position(ut)),
            None => Some(Vec3D::zero()),
        }
    }

    /// Velocity of `name` relative to the root body.
    pub fn absolute_velocity(&self, name: &str, ut: f64) -> Option<Vec3D<f64>> {
        let body = self.body(name)?;
        match body.parent() {
            Some(parent) => Some(self.absolute_velocity(parent, ut)? + body.velocity(ut)),
            None => Some(Vec3D::zero()),
        }
    }
}
