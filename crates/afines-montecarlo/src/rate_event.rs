use rand::rngs::SmallRng;
use rand::Rng;

/// A first-order kinetic event (motor attach, detach, filament growth...) that
/// fires within a time step `dt` with probability `1 - exp(-k·dt)`.
///
/// This is the kinetic analogue of a Metropolis criterion: instead of
/// accepting a move based on an energy difference, it accepts an event based
/// on a rate constant and the step size.
#[derive(Clone, Copy, Debug)]
pub struct RateEvent {
    pub rate: f64,
}

impl RateEvent {
    pub fn new(rate: f64) -> RateEvent {
        RateEvent { rate }
    }

    /// Probability that this event occurs during a step of length `dt`.
    pub fn probability(&self, dt: f64) -> f64 {
        if self.rate <= 0.0 {
            return 0.0;
        }
        1.0 - (-self.rate * dt).exp()
    }

    /// Draws a single Bernoulli trial for this event over a step of length `dt`.
    pub fn fires(&self, dt: f64, rng: &mut SmallRng) -> bool {
        if self.rate <= 0.0 {
            return false;
        }
        rng.gen_range(0.0..1.0) < self.probability(dt)
    }
}
