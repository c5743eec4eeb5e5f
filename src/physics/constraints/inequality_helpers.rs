/// Helpers for inequality constraint clamping.
pub struct InequalityHelpers;

impl InequalityHelpers {
    /// Accumulates `impulse` while keeping the total non-negative. Returns the impulse to actually apply.
    #[inline(always)]
    pub fn clamp_positive(accumulated_impulse: &mut f32, impulse: f32) -> f32 {
        let previous = *accumulated_impulse;
        *accumulated_impulse = (previous + impulse).max(0.0);
        *accumulated_impulse - previous
    }

    /// Accumulates `impulse` while keeping the total within `[-maximum, maximum]`. Returns the impulse to
    /// actually apply.
    #[inline(always)]
    pub fn clamp_symmetric(accumulated_impulse: &mut f32, impulse: f32, maximum: f32) -> f32 {
        let previous = *accumulated_impulse;
        *accumulated_impulse = (previous + impulse).clamp(-maximum, maximum);
        *accumulated_impulse - previous
    }

    /// Velocity that removes `error` within one step, limited to `max_velocity` when the error is a
    /// penetration.
    #[inline(always)]
    pub fn compute_bias_velocity(error: f32, inverse_dt: f32, max_velocity: f32) -> f32 {
        (error * inverse_dt).min(max_velocity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_clamp_returns_applied_delta() {
        let mut accumulated = 1.0;
        assert_eq!(InequalityHelpers::clamp_positive(&mut accumulated, -3.0), -1.0);
        assert_eq!(accumulated, 0.0);
        assert_eq!(InequalityHelpers::clamp_positive(&mut accumulated, 2.0), 2.0);
    }

    #[test]
    fn symmetric_clamp() {
        let mut accumulated = 0.0;
        assert_eq!(InequalityHelpers::clamp_symmetric(&mut accumulated, 5.0, 2.0), 2.0);
        assert_eq!(InequalityHelpers::clamp_symmetric(&mut accumulated, -5.0, 2.0), -4.0);
        assert_eq!(accumulated, -2.0);
    }
}
