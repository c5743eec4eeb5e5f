use std::f32::consts::PI;

/// Spring frequency and damping ratio of a soft constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringSettings {
    /// Target number of undamped oscillations per unit of time.
    pub frequency: f32,
    /// Ratio of the spring's actual damping to its critical damping.
    pub damping_ratio: f32,
}

impl Default for SpringSettings {
    /// Settings stiff enough to behave as a rigid constraint at typical step rates.
    fn default() -> Self {
        Self {
            frequency: JacobianUtilities::DEFAULT_SPRING_FREQUENCY,
            damping_ratio: JacobianUtilities::DEFAULT_DAMPING_RATIO,
        }
    }
}

impl SpringSettings {
    #[inline(always)]
    pub fn new(frequency: f32, damping_ratio: f32) -> Self {
        Self {
            frequency,
            damping_ratio,
        }
    }

    #[inline(always)]
    pub fn tau_and_damping(&self, timestep: f32, iterations: u32) -> (f32, f32) {
        JacobianUtilities::calculate_constraint_tau_and_damping(self.frequency, self.damping_ratio, timestep, iterations)
    }
}

/// Shared math for building and solving constraint rows.
pub struct JacobianUtilities;

impl JacobianUtilities {
    pub const DEFAULT_SPRING_FREQUENCY: f32 = 74341.31;
    pub const DEFAULT_DAMPING_RATIO: f32 = 2530.126;

    /// Computes the per iteration position correction `tau` and velocity `damping` that make `iterations`
    /// Gauss-Seidel passes over a constraint match one implicit Euler step of a spring with the given
    /// frequency and damping ratio.
    ///
    /// Implicit Euler scales velocity by `a_exp = 1 / (1 + h^2 w^2 + 2 z h w)` per step. Each iteration scales
    /// by `a = a_exp^(1/n)`, so `damping = 1 - a`, and `tau` is spread over the geometric series of iterations.
    pub fn calculate_constraint_tau_and_damping(
        spring_frequency: f32,
        damping_ratio: f32,
        timestep: f32,
        iterations: u32,
    ) -> (f32, f32) {
        let iterations = iterations.max(1);
        let h = timestep;
        let w = spring_frequency * 2.0 * PI;
        let z = damping_ratio;
        let hw = h * w;
        let hhww = hw * hw;

        let a_exp = 1.0 / (1.0 + hhww + 2.0 * hw * z);
        let a = a_exp.powf(1.0 / iterations as f32);
        let mut a_sum = 1.0;
        let mut a_pow = 1.0;
        for _ in 1..iterations {
            a_pow *= a;
            a_sum += a_pow;
        }

        let damping = 1.0 - a;
        let tau = hhww * a_exp / a_sum;
        (tau, damping)
    }

    /// Distance of `x` outside `[min, max]`: zero inside, `x - max` above, `x - min` below.
    #[inline(always)]
    pub fn calculate_error(x: f32, min: f32, max: f32) -> f32 {
        if x > max {
            x - max
        } else if x < min {
            x - min
        } else {
            0.0
        }
    }

    /// Portion of the error to remove in one iteration, given the error predicted at the end of the step and
    /// the error at its start.
    #[inline(always)]
    pub fn calculate_correction(predicted_error: f32, initial_error: f32, tau: f32, damping: f32) -> f32 {
        damping * predicted_error - (damping - tau) * initial_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_distance_outside_range() {
        assert_eq!(JacobianUtilities::calculate_error(0.5, 0.0, 1.0), 0.0);
        assert_eq!(JacobianUtilities::calculate_error(1.5, 0.0, 1.0), 0.5);
        assert_eq!(JacobianUtilities::calculate_error(-0.25, 0.0, 1.0), -0.25);
        assert_eq!(JacobianUtilities::calculate_error(2.0, 2.0, 2.0), 0.0);
    }

    #[test]
    fn zero_frequency_is_inert() {
        let (tau, damping) = JacobianUtilities::calculate_constraint_tau_and_damping(0.0, 1.0, 1.0 / 60.0, 4);
        assert_eq!(tau, 0.0);
        assert_eq!(damping, 0.0);
    }

    #[test]
    fn default_spring_is_stiff() {
        let (tau, damping) = SpringSettings::default().tau_and_damping(1.0 / 50.0, 4);
        assert!(tau > 0.5 && tau < 1.0);
        assert!(damping > 0.95 && damping <= 1.0);
    }

    fn assert_close(actual: f32, expected: f32, what: &str) {
        let tolerance = 1e-3 * actual.abs().max(expected.abs()) + 1e-5;
        assert!(
            (actual - expected).abs() <= tolerance,
            "{what}: gauss-seidel {actual} vs implicit euler {expected}"
        );
    }

    /// A body hanging off a soft 1D constraint. Solving the constraint with the derived coefficients for `n`
    /// iterations must reproduce an implicit Euler spring-damper step by step.
    #[test]
    fn constraint_regularization_matches_implicit_euler() {
        for &fps in &[30.0f32, 60.0, 120.0] {
            for &iterations in &[1u32, 4, 20] {
                for &mass in &[1.0f32, 10.0] {
                    for &frequency in &[100.0f32, 1000.0] {
                        for &damping_ratio in &[0.0f32, 0.8, 100.0] {
                            let h = 1.0 / fps;
                            let (tau, damping) = JacobianUtilities::calculate_constraint_tau_and_damping(
                                frequency,
                                damping_ratio,
                                h,
                                iterations,
                            );
                            let w = 2.0 * PI * frequency;
                            let inverse_mass = 1.0 / mass;
                            let effective_mass = 1.0 / inverse_mass;

                            let (mut x_gs, mut v_gs) = (1.0f32, -0.5f32);
                            let (mut x_ie, mut v_ie) = (x_gs, v_gs);
                            let steps = (2.0 * fps) as usize;
                            for step in 0..steps {
                                let initial_error = JacobianUtilities::calculate_error(x_gs, 0.0, 0.0);
                                for _ in 0..iterations {
                                    let predicted = JacobianUtilities::calculate_error(x_gs + v_gs * h, 0.0, 0.0);
                                    let correction =
                                        JacobianUtilities::calculate_correction(predicted, initial_error, tau, damping);
                                    let impulse = -correction / h * effective_mass;
                                    v_gs += impulse * inverse_mass;
                                }
                                x_gs += v_gs * h;

                                v_ie = (v_ie - h * w * w * x_ie) / (1.0 + h * h * w * w + 2.0 * damping_ratio * h * w);
                                x_ie += v_ie * h;

                                let context = format!(
                                    "fps {fps} iterations {iterations} mass {mass} frequency {frequency} ratio {damping_ratio} step {step}"
                                );
                                assert_close(v_gs, v_ie, &context);
                                assert_close(x_gs, x_ie, &context);
                            }
                        }
                    }
                }
            }
        }
    }
}
