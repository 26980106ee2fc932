use num_traits::Float;
use std::fmt::Debug;

/// Floating-point type used for populations and rates.
pub trait Scalar: Float + Debug + 'static {}

impl<T: Float + Debug + 'static> Scalar for T {}

/// A coupled system of first-order rate equations dN/dt = f(t, N).
pub trait DynamicalSystem<T: Scalar> {
    /// Number of coupled populations.
    fn dimension(&self) -> usize;

    /// Evaluates every rate from `x` alone.
    /// t: current time
    /// x: populations at the start of the step
    /// out: buffer receiving dN/dt for every population
    fn apply(&self, t: T, x: &[T], out: &mut [T]);
}

/// A trait for fixed-step solvers that advance a system forward.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dt.
    /// t: current time (updated after step)
    /// state: current populations (updated after step)
    /// dt: step size
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T);
}
