//! Closed-form populations used to verify integrator output.

use crate::nuclide::Nuclide;

/// n(t) = n0·e^{−λt} + (P/λ)(1 − e^{−λt}) for a nuclide without parents.
pub fn single_population(n0: f64, decay_constant: f64, production_rate: f64, t: f64) -> f64 {
    let survival = (-decay_constant * t).exp();
    n0 * survival + (production_rate / decay_constant) * (1.0 - survival)
}

/// Daughter population for a produced parent feeding one daughter, both starting empty.
///
/// Undefined when the two decay constants coincide.
pub fn daughter_population(
    daughter_decay_constant: f64,
    parent_decay_constant: f64,
    parent_production_rate: f64,
    t: f64,
) -> f64 {
    let lam_b = daughter_decay_constant;
    let lam_a = parent_decay_constant;
    let own = (1.0 - (-lam_b * t).exp()) / lam_b;
    let transfer = ((-lam_a * t).exp() - (-lam_b * t).exp()) / (lam_b - lam_a);
    parent_production_rate * (own - transfer)
}

/// P/λ, the population at which production balances decay.
pub fn equilibrium_population(production_rate: f64, decay_constant: f64) -> f64 {
    production_rate / decay_constant
}

pub fn nuclide_population(nuclide: &Nuclide, t: f64) -> f64 {
    single_population(
        nuclide.initial_population(),
        nuclide.decay_constant(),
        nuclide.production_rate(),
        t,
    )
}

pub fn chain_daughter_population(daughter: &Nuclide, parent: &Nuclide, t: f64) -> f64 {
    daughter_population(
        daughter.decay_constant(),
        parent.decay_constant(),
        parent.production_rate(),
        t,
    )
}

pub fn nuclide_equilibrium(nuclide: &Nuclide) -> f64 {
    equilibrium_population(nuclide.production_rate(), nuclide.decay_constant())
}

/// Daughter equilibrium P_parent/λ_daughter in a two-member chain.
pub fn daughter_equilibrium(daughter: &Nuclide, parent: &Nuclide) -> f64 {
    equilibrium_population(parent.production_rate(), daughter.decay_constant())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nuclide::NuclideSpec;
    use crate::units::TimeUnit;
    use approx::assert_relative_eq;
    use std::f64::consts::LN_2;

    #[test]
    fn single_population_limits() {
        assert_eq!(single_population(5.0, 0.1, 0.0, 0.0), 5.0);
        assert_relative_eq!(single_population(8.0, LN_2, 0.0, 1.0), 4.0);
        assert_relative_eq!(single_population(0.0, 0.5, 2.0, 1e3), 4.0);
    }

    #[test]
    fn daughter_population_starts_at_zero_and_saturates() {
        let lam_a = LN_2 / 72.0;
        let lam_b = LN_2 / 120.0;
        let p = 20000.0 / 60.0;
        assert_relative_eq!(daughter_population(lam_b, lam_a, p, 0.0), 0.0);
        assert_relative_eq!(
            daughter_population(lam_b, lam_a, p, 1e5),
            equilibrium_population(p, lam_b),
            max_relative = 1e-9
        );
    }

    #[test]
    fn daughter_population_satisfies_rate_equation() {
        let lam_a = 0.3;
        let lam_b = 0.1;
        let p = 10.0;
        let t = 4.0;
        let h = 1e-5;
        let derivative = (daughter_population(lam_b, lam_a, p, t + h)
            - daughter_population(lam_b, lam_a, p, t - h))
            / (2.0 * h);
        let parent = single_population(0.0, lam_a, p, t);
        let expected = lam_a * parent - lam_b * daughter_population(lam_b, lam_a, p, t);
        assert_relative_eq!(derivative, expected, max_relative = 1e-6);
    }

    #[test]
    fn nuclide_wrappers_use_converted_parameters() {
        let a = NuclideSpec::new("A", 1.2, TimeUnit::Minutes)
            .with_production(20000.0, TimeUnit::Minutes)
            .build()
            .unwrap();
        let b = NuclideSpec::new("B", 2.0, TimeUnit::Minutes)
            .with_parents(["A"])
            .build()
            .unwrap();
        assert_relative_eq!(nuclide_equilibrium(&a), 34_624.68, max_relative = 1e-6);
        assert_relative_eq!(daughter_equilibrium(&b, &a), (20000.0 / 60.0) * 120.0 / LN_2);
        assert!(nuclide_population(&a, 300.0) < nuclide_equilibrium(&a));
        assert!(chain_daughter_population(&b, &a, 300.0) > 0.0);
    }
}
