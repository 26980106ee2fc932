use crate::traits::{DynamicalSystem, Scalar, Steppable};

/// Forward (explicit) Euler solver.
///
/// Every rate of a step is written into `rates` from the pre-step state
/// before any population is updated, so no component of the state ever
/// sees another component's value from the same step.
pub struct ExplicitEuler<T: Scalar> {
    rates: Vec<T>,
}

impl<T: Scalar> ExplicitEuler<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            rates: vec![T::zero(); dim],
        }
    }

    /// A solver whose rate buffer matches `system`.
    pub fn for_system(system: &impl DynamicalSystem<T>) -> Self {
        Self::new(system.dimension())
    }
}

impl<T: Scalar> Steppable<T> for ExplicitEuler<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        debug_assert_eq!(state.len(), system.dimension());
        debug_assert_eq!(self.rates.len(), system.dimension());
        let t0 = *t;

        // dN/dt = f(t, N) for every component, all from the old state
        system.apply(t0, state, &mut self.rates);

        // N_next = N + dt * dN/dt
        for (value, rate) in state.iter_mut().zip(&self.rates) {
            *value = *value + dt * *rate;
        }

        *t = t0 + dt;
    }
}
